//! Single address given directly on the command line.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use tracing::{debug, info};

use crate::application::sources::{Entry, MetadataSource, output_error, write_text_record};
use crate::domain::metadata::Metadata;
use crate::infrastructure::errors::SourceError;

const SINK_SUFFIX: &str = "_out.txt";

pub struct SingleUrlSource {
    pending: Option<Entry>,
    sink: BufWriter<File>,
}

impl SingleUrlSource {
    pub fn open(address: &str) -> Result<Self, SourceError> {
        let sink_path = sink_path_for(address);
        let sink = File::create(&sink_path).map_err(output_error)?;
        debug!("Dumping metadata to «{}».", sink_path.display());
        Ok(Self {
            pending: Some(Entry::new(address)),
            sink: BufWriter::new(sink),
        })
    }
}

/// Sink file named after the address, every ASCII non-word character replaced by `_`.
pub fn sink_path_for(address: &str) -> PathBuf {
    let stem: String = address
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || !c.is_ascii() { c } else { '_' })
        .collect();
    PathBuf::from(format!("{stem}{SINK_SUFFIX}"))
}

impl MetadataSource for SingleUrlSource {
    fn next_entry(&mut self) -> Option<Entry> {
        self.pending.take()
    }

    fn store(&mut self, entry: &Entry, metadata: &Metadata) -> Result<(), SourceError> {
        for (key, value) in metadata.iter() {
            info!("  {key}: {value}");
        }
        write_text_record(&mut self.sink, &entry.address, metadata)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SourceError> {
        self.sink.flush()?;
        Ok(())
    }
}
