//! Metadata-block strategy
//!
//! A marker element (tag, attribute name and attribute value all given by
//! patterns) opens a metadata block. Inside it, `<dt>` elements hold keys and
//! `<dd>` elements hold values. The block ends at the first closing tag whose
//! name matches the marker tag pattern.

use tracing::debug;

use crate::domain::profile::Pattern;
use crate::infrastructure::parsing::engine::ParserCore;

const KEY_TAG: &str = "dt";
const VALUE_TAG: &str = "dd";

#[derive(Debug, Clone)]
pub struct MetadataBlock {
    tag: Pattern,
    attribute: Pattern,
    value: Pattern,
    in_block: bool,
}

impl MetadataBlock {
    pub fn new(tag: Pattern, attribute: Pattern, value: Pattern) -> Self {
        Self {
            tag,
            attribute,
            value,
            in_block: false,
        }
    }

    pub fn reset(&mut self) {
        self.in_block = false;
    }

    fn is_marker<'a>(&self, tag: &str, attributes: &'a [(String, String)]) -> Option<&'a str> {
        if !self.tag.matches_whole(tag) {
            return None;
        }
        attributes
            .iter()
            .find(|(name, value)| self.attribute.matches_whole(name) && self.value.is_match(value))
            .map(|(_, value)| value.as_str())
    }

    pub fn start_tag(&mut self, core: &mut ParserCore, tag: &str, attributes: &[(String, String)]) {
        if !self.in_block {
            if let Some(marker) = self.is_marker(tag, attributes) {
                debug!("Metadata marker found «{marker}».");
                self.in_block = true;
            }
            return;
        }
        match tag {
            KEY_TAG => {
                debug!("Key marker found «{tag}».");
                core.in_key = true;
                if core.in_value {
                    debug!("Nesting problem (key inside value), resetting parser.");
                    core.abandon_value();
                }
            }
            VALUE_TAG => {
                debug!("Value marker found «{tag}».");
                core.in_value = true;
                if core.in_key {
                    debug!("Nesting problem (value inside key), resetting parser.");
                    core.in_key = false;
                    if core.current_key.is_empty() {
                        core.in_value = false;
                    }
                }
            }
            _ => {}
        }
    }

    pub fn end_tag(&mut self, core: &mut ParserCore, tag: &str) {
        if self.in_block && self.tag.matches_whole(tag) {
            self.in_block = false;
            return;
        }
        if core.in_key && tag == KEY_TAG {
            core.in_key = false;
            return;
        }
        if core.in_value && tag == VALUE_TAG {
            core.in_value = false;
            core.store();
        }
    }
}
