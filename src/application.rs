//! Application layer
//!
//! Ties the infrastructure together: the skimmer extracts metadata for one
//! address, sources feed addresses in and take results out, and the runner
//! drives the whole command line.

pub mod runner;
pub mod skimmer;
pub mod sources;

pub use runner::{ExitStatus, Runner};
pub use skimmer::Skimmer;
pub use sources::{Entry, MetadataSource, SourceKind, classify, open_source};
