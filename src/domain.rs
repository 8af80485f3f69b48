//! Domain module - metadata records and catalogue profiles
//!
//! Plain data types shared by the profile store, the parsing engine and the
//! extraction orchestrator. Nothing in here performs I/O.

pub mod metadata;
pub mod profile;

pub use metadata::{
    EMPTY_KEY_PLACEHOLDER, KEY_TERMINATOR, MULTIDATA_SEPARATOR, MULTIVALUE_SEPARATOR, Metadata,
    MetadataCollector,
};
pub use profile::{ParserConfig, ParserKind, Pattern, Profile, URL_PATTERN_KEY};
