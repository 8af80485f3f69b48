//! Attribute-marker strategy
//!
//! Key and value regions start at any element whose `class` attribute matches
//! the configured key or value pattern, and end at the next closing tag with
//! the same name as the element that opened them.

use tracing::debug;

use crate::domain::profile::Pattern;
use crate::infrastructure::parsing::engine::ParserCore;

const MARKER_ATTRIBUTE: &str = "class";

#[derive(Debug, Clone)]
pub struct AttributeMarker {
    key_class: Pattern,
    value_class: Pattern,
    key_tag: Option<String>,
    value_tag: Option<String>,
}

impl AttributeMarker {
    pub fn new(key_class: Pattern, value_class: Pattern) -> Self {
        Self {
            key_class,
            value_class,
            key_tag: None,
            value_tag: None,
        }
    }

    pub fn reset(&mut self) {
        self.key_tag = None;
        self.value_tag = None;
    }

    pub fn start_tag(&mut self, core: &mut ParserCore, tag: &str, attributes: &[(String, String)]) {
        for (_, class) in attributes.iter().filter(|(name, _)| name == MARKER_ATTRIBUTE) {
            if let Some(marker) = self.key_class.find(class) {
                debug!("Key marker found «{marker}».");
                core.in_key = true;
                core.current_key.clear();
                self.key_tag = Some(tag.to_string());
                if core.in_value {
                    debug!("Nesting problem (key inside value), resetting parser.");
                    core.abandon_value();
                    self.value_tag = None;
                }
                return;
            }
            if let Some(marker) = self.value_class.find(class) {
                debug!("Value marker found «{marker}».");
                core.in_value = true;
                core.current_value.clear();
                self.value_tag = Some(tag.to_string());
                if core.in_key {
                    debug!("Nesting problem (value inside key), resetting parser.");
                    core.in_key = false;
                    self.key_tag = None;
                    if core.current_key.is_empty() {
                        core.in_value = false;
                        self.value_tag = None;
                    }
                }
                return;
            }
        }
    }

    pub fn end_tag(&mut self, core: &mut ParserCore, tag: &str) {
        if core.in_key && self.key_tag.as_deref() == Some(tag) {
            core.in_key = false;
            self.key_tag = None;
            return;
        }
        if core.in_value && self.value_tag.as_deref() == Some(tag) {
            core.in_value = false;
            self.value_tag = None;
            core.store();
        }
    }
}
