//! Streaming metadata parsing
//!
//! Markup is scanned into start/end/text events which drive one of the two
//! key/value recognition strategies. The parser never fails on malformed
//! input; at worst it produces empty metadata.

pub mod attribute_marker;
pub mod engine;
pub mod markup;
pub mod metadata_block;

pub use attribute_marker::AttributeMarker;
pub use engine::{MetadataParser, ParserCore, Strategy, parse_metadata};
pub use markup::{MarkupEvent, MarkupScanner};
pub use metadata_block::MetadataBlock;
