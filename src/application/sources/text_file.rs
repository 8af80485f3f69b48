//! Text file with one address per line.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::vec::IntoIter;

use tracing::debug;

use crate::application::sources::{
    Entry, MetadataSource, input_error, output_error, sink_path, write_text_record,
};
use crate::domain::metadata::Metadata;
use crate::infrastructure::address_resolver::is_accepted_address;
use crate::infrastructure::errors::SourceError;

pub struct TextFileSource {
    entries: IntoIter<Entry>,
    sink: BufWriter<File>,
}

impl TextFileSource {
    /// Read every accepted address from `path` and create `<stem>_out.txt` beside it.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let raw = fs::read(path).map_err(input_error)?;
        let text = String::from_utf8_lossy(&raw);
        let entries: Vec<Entry> = text
            .lines()
            .map(str::trim)
            .filter(|line| {
                let accepted = is_accepted_address(line);
                if !accepted && !line.is_empty() {
                    debug!("Skipping non address line «{line}».");
                }
                accepted
            })
            .map(Entry::new)
            .collect();

        let sink_path = sink_path(path);
        let sink = File::create(&sink_path).map_err(output_error)?;
        debug!(
            "Read {} addresses, dumping metadata to «{}».",
            entries.len(),
            sink_path.display()
        );
        Ok(Self {
            entries: entries.into_iter(),
            sink: BufWriter::new(sink),
        })
    }
}

impl MetadataSource for TextFileSource {
    fn next_entry(&mut self) -> Option<Entry> {
        self.entries.next()
    }

    fn store(&mut self, entry: &Entry, metadata: &Metadata) -> Result<(), SourceError> {
        write_text_record(&mut self.sink, &entry.address, metadata)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SourceError> {
        self.sink.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn metadata(pairs: &[(&str, &str)]) -> Metadata {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_reads_only_accepted_addresses() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("urls.txt");
        fs::write(
            &input,
            "  http://a.example/1  \n\nnot an address\nftp://b.example/\nfile:///tmp/c.html\n",
        )
        .unwrap();

        let mut source = TextFileSource::open(&input).unwrap();
        let mut addresses = Vec::new();
        while let Some(entry) = source.next_entry() {
            addresses.push(entry.address);
        }
        assert_eq!(addresses, vec!["http://a.example/1", "file:///tmp/c.html"]);
    }

    #[test]
    fn test_sink_gets_records_with_metadata_only() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("urls.txt");
        fs::write(&input, "http://a.example/1\nhttp://a.example/2\n").unwrap();

        let mut source = TextFileSource::open(&input).unwrap();
        let first = source.next_entry().unwrap();
        source
            .store(&first, &metadata(&[("Autor", "Cervantes")]))
            .unwrap();
        let second = source.next_entry().unwrap();
        source.store(&second, &Metadata::new()).unwrap();
        assert!(source.next_entry().is_none());
        source.finish().unwrap();

        let written = fs::read_to_string(dir.path().join("urls_out.txt")).unwrap();
        assert_eq!(written, "http://a.example/1\n  Autor: Cervantes\n\n");
    }

    #[test]
    fn test_missing_input() {
        let dir = TempDir::new().unwrap();
        let result = TextFileSource::open(&dir.path().join("absent.txt"));
        assert!(matches!(result, Err(SourceError::InputNotFound)));
    }
}
