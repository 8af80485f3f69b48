//! Metadata parser engine
//!
//! [`ParserCore`] owns the state every strategy shares: the key/value region
//! flags, the text buffers, the last key seen and the collected metadata.
//! [`Strategy`] is the closed set of ways to recognize key and value regions;
//! [`MetadataParser`] ties a strategy, its core and a markup scanner together.

use tracing::debug;

use crate::domain::metadata::{
    EMPTY_KEY_PLACEHOLDER, KEY_TERMINATOR, MULTIDATA_SEPARATOR, Metadata, MetadataCollector,
};
use crate::domain::profile::{ParserConfig, ParserKind};
use crate::infrastructure::parsing::attribute_marker::AttributeMarker;
use crate::infrastructure::parsing::markup::{MarkupEvent, MarkupScanner};
use crate::infrastructure::parsing::metadata_block::MetadataBlock;

/// Bytes handed to the markup scanner per write.
const FEED_CHUNK_SIZE: usize = 8 * 1024;

/// State shared by every parsing strategy.
#[derive(Debug, Default)]
pub struct ParserCore {
    pub(crate) in_key: bool,
    pub(crate) in_value: bool,
    pub(crate) current_key: String,
    pub(crate) current_value: String,
    last_key: Option<String>,
    collected: MetadataCollector,
}

impl ParserCore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Accumulate text seen inside a key or value region.
    pub fn handle_text(&mut self, data: &str) {
        if !self.in_key && !self.in_value {
            return;
        }
        let cleaned = data.split_whitespace().collect::<Vec<_>>().join(" ");
        if cleaned.is_empty() {
            return;
        }
        if self.in_key {
            debug!("Key found «{cleaned}».");
            let chunk = cleaned.strip_suffix(KEY_TERMINATOR).unwrap_or(&cleaned);
            self.current_key.push_str(chunk);
            if !self.current_key.is_empty() {
                self.last_key = Some(self.current_key.clone());
            }
            return;
        }
        debug!("Value found «{cleaned}».");
        if !self.current_value.is_empty() {
            self.current_value.push_str(MULTIDATA_SEPARATOR);
        }
        self.current_value.push_str(&cleaned);
    }

    /// Record the current key/value pair, handling missing halves, then clear both buffers.
    pub fn store(&mut self) {
        match (self.current_key.is_empty(), self.current_value.is_empty()) {
            (true, true) => debug!("Empty metadata."),
            (false, true) => debug!("Incomplete metadata «{}», ignoring.", self.current_key),
            (key_missing, false) => {
                if key_missing {
                    self.current_key = self
                        .last_key
                        .clone()
                        .unwrap_or_else(|| EMPTY_KEY_PLACEHOLDER.to_string());
                    debug!("No key found, using «{}».", self.current_key);
                }
                self.collected.record(&self.current_key, &self.current_value);
                debug!("Metadata stored «{}: {}».", self.current_key, self.current_value);
            }
        }
        self.current_key.clear();
        self.current_value.clear();
    }

    /// Drop a partially gathered value and leave the value region.
    pub(crate) fn abandon_value(&mut self) {
        self.in_value = false;
        self.current_value.clear();
    }

    pub fn metadata(&self) -> Metadata {
        self.collected.to_metadata()
    }
}

/// Key/value region recognition rules.
#[derive(Debug, Clone)]
pub enum Strategy {
    AttributeMarker(AttributeMarker),
    MetadataBlock(MetadataBlock),
}

impl Strategy {
    pub fn from_config(config: &ParserConfig) -> Self {
        match config {
            ParserConfig::AttributeMarker {
                key_class,
                value_class,
            } => Self::AttributeMarker(AttributeMarker::new(key_class.clone(), value_class.clone())),
            ParserConfig::MetadataBlock {
                tag,
                attribute,
                value,
            } => Self::MetadataBlock(MetadataBlock::new(tag.clone(), attribute.clone(), value.clone())),
        }
    }

    pub fn kind(&self) -> ParserKind {
        match self {
            Self::AttributeMarker(_) => ParserKind::AttributeMarker,
            Self::MetadataBlock(_) => ParserKind::MetadataBlock,
        }
    }

    fn reset(&mut self) {
        match self {
            Self::AttributeMarker(strategy) => strategy.reset(),
            Self::MetadataBlock(strategy) => strategy.reset(),
        }
    }

    fn start_tag(&mut self, core: &mut ParserCore, tag: &str, attributes: &[(String, String)]) {
        match self {
            Self::AttributeMarker(strategy) => strategy.start_tag(core, tag, attributes),
            Self::MetadataBlock(strategy) => strategy.start_tag(core, tag, attributes),
        }
    }

    fn end_tag(&mut self, core: &mut ParserCore, tag: &str) {
        match self {
            Self::AttributeMarker(strategy) => strategy.end_tag(core, tag),
            Self::MetadataBlock(strategy) => strategy.end_tag(core, tag),
        }
    }
}

/// Streaming metadata parser for one profile.
pub struct MetadataParser {
    core: ParserCore,
    strategy: Strategy,
    scanner: MarkupScanner,
}

impl MetadataParser {
    pub fn new(config: &ParserConfig) -> Self {
        Self {
            core: ParserCore::new(),
            strategy: Strategy::from_config(config),
            scanner: MarkupScanner::new(),
        }
    }

    /// Switch to `config`, discarding every bit of state.
    pub fn configure(&mut self, config: &ParserConfig) {
        self.strategy = Strategy::from_config(config);
        self.reset();
    }

    pub fn reset(&mut self) {
        self.core.reset();
        self.strategy.reset();
        self.scanner = MarkupScanner::new();
    }

    pub fn kind(&self) -> ParserKind {
        self.strategy.kind()
    }

    /// Feed decoded page contents; may be called repeatedly.
    pub fn feed(&mut self, contents: &str) {
        for chunk in contents.as_bytes().chunks(FEED_CHUNK_SIZE) {
            let events = self.scanner.feed(chunk);
            self.handle_events(&events);
        }
    }

    /// Flush any buffered markup.
    pub fn close(&mut self) {
        let events = self.scanner.finish();
        self.handle_events(&events);
    }

    pub fn handle_events(&mut self, events: &[MarkupEvent]) {
        for event in events {
            self.handle_event(event);
        }
    }

    pub fn handle_event(&mut self, event: &MarkupEvent) {
        match event {
            MarkupEvent::Start { tag, attributes } => {
                debug!(
                    "HTML <{tag}{}{}>",
                    if attributes.is_empty() { "" } else { " " },
                    attributes
                        .iter()
                        .map(|(name, value)| format!("{name}=\"{value}\""))
                        .collect::<Vec<_>>()
                        .join(" ")
                );
                self.strategy.start_tag(&mut self.core, tag, attributes);
            }
            MarkupEvent::End { tag } => self.strategy.end_tag(&mut self.core, tag),
            MarkupEvent::Text(text) => self.core.handle_text(text),
        }
    }

    /// Metadata gathered so far, one joined value per key.
    pub fn metadata(&self) -> Metadata {
        self.core.metadata()
    }
}

/// Parse a whole page with `config` and return its metadata.
pub fn parse_metadata(config: &ParserConfig, contents: &str) -> Metadata {
    let mut parser = MetadataParser::new(config);
    parser.feed(contents);
    parser.close();
    parser.metadata()
}
