//! Infrastructure layer for settings, logging, profiles, retrieval and parsing
//!
//! Everything that touches the outside world (files, the network, the
//! terminal) lives here, together with the streaming metadata parser.

pub mod address_resolver;
pub mod config;
pub mod errors;
pub mod logging;
pub mod parsing;
pub mod profile_store;
pub mod transport;

// Re-export commonly used items
pub use address_resolver::{AddressResolver, Resolution, Retrieved, is_accepted_address};
pub use config::Settings;
pub use errors::{ProfilesError, RetrievalError, SkimmingError, SourceError};
pub use logging::{LogGuards, init_logging, report_error, report_warning};
pub use parsing::{MetadataParser, parse_metadata};
pub use profile_store::ProfileStore;
pub use transport::{Fetched, HttpTransport, MemoryTransport, Transport};
