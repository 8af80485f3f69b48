//! Metadata sources and sinks
//!
//! A source yields the addresses to skim, one [`Entry`] at a time, and takes
//! back the metadata obtained for each of them. Every source owns its sink.

pub mod single_url;
pub mod spreadsheet;
pub mod text_file;

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::metadata::Metadata;
use crate::infrastructure::address_resolver::is_accepted_address;
use crate::infrastructure::errors::SourceError;

pub use single_url::SingleUrlSource;
pub use spreadsheet::SpreadsheetSource;
pub use text_file::TextFileSource;

pub const TEXT_FILE_SUFFIX: &str = "txt";
pub const SPREADSHEET_SUFFIX: &str = "xlsx";
const SINK_STEM_SUFFIX: &str = "_out";

/// One address produced by a source, with the row it came from when that matters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub address: String,
    pub row: Option<u32>,
}

impl Entry {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            row: None,
        }
    }

    pub fn at_row(address: impl Into<String>, row: u32) -> Self {
        Self {
            address: address.into(),
            row: Some(row),
        }
    }
}

pub trait MetadataSource {
    /// Next address to skim, in source order
    fn next_entry(&mut self) -> Option<Entry>;

    /// Persist the metadata obtained for `entry`; empty metadata is allowed.
    fn store(&mut self, entry: &Entry, metadata: &Metadata) -> Result<(), SourceError>;

    /// Flush the sink. Called once, after the last entry.
    fn finish(&mut self) -> Result<(), SourceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    SingleUrl,
    TextFile,
    Spreadsheet,
}

/// Classify a command line argument, `None` for unsupported ones.
pub fn classify(argument: &str) -> Option<SourceKind> {
    if is_accepted_address(argument) {
        return Some(SourceKind::SingleUrl);
    }
    let extension = Path::new(argument).extension()?.to_str()?;
    if extension.eq_ignore_ascii_case(TEXT_FILE_SUFFIX) {
        Some(SourceKind::TextFile)
    } else if extension.eq_ignore_ascii_case(SPREADSHEET_SUFFIX) {
        Some(SourceKind::Spreadsheet)
    } else {
        None
    }
}

/// Open the source named by `argument` together with its sink.
pub fn open_source(argument: &str) -> Result<Box<dyn MetadataSource>, SourceError> {
    debug!("Processing argument «{argument}».");
    match classify(argument) {
        Some(SourceKind::SingleUrl) => {
            debug!("The argument is a single URL source.");
            Ok(Box::new(SingleUrlSource::open(argument)?))
        }
        Some(SourceKind::TextFile) => {
            debug!("The argument is a text file source.");
            Ok(Box::new(TextFileSource::open(Path::new(argument))?))
        }
        Some(SourceKind::Spreadsheet) => {
            debug!("The argument is a spreadsheet source.");
            Ok(Box::new(SpreadsheetSource::open(Path::new(argument))?))
        }
        None => {
            debug!("The argument is not a supported source.");
            Err(SourceError::Unsupported)
        }
    }
}

/// `<stem>_out.<extension>` next to `source`.
pub fn sink_path(source: &Path) -> PathBuf {
    let stem = source.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    let mut name = format!("{stem}{SINK_STEM_SUFFIX}");
    if let Some(extension) = source.extension() {
        name.push('.');
        name.push_str(&extension.to_string_lossy());
    }
    source.with_file_name(name)
}

/// Map an error opening the input file.
pub(crate) fn input_error(error: io::Error) -> SourceError {
    match error.kind() {
        io::ErrorKind::NotFound => SourceError::InputNotFound,
        io::ErrorKind::PermissionDenied => SourceError::InputNoPermission,
        _ => SourceError::Io(error),
    }
}

/// Map an error creating the sink file.
pub(crate) fn output_error(error: io::Error) -> SourceError {
    match error.kind() {
        io::ErrorKind::PermissionDenied => SourceError::OutputNoPermission,
        _ => SourceError::Io(error),
    }
}

/// Write one text sink record: address, indented pairs, blank line.
pub(crate) fn write_text_record<W: Write>(sink: &mut W, address: &str, metadata: &Metadata) -> io::Result<()> {
    if metadata.is_empty() {
        return Ok(());
    }
    writeln!(sink, "{address}")?;
    for (key, value) in metadata.iter() {
        debug!("Dumping metadata «{key}: {value}».");
        writeln!(sink, "  {key}: {value}")?;
    }
    writeln!(sink)
}
