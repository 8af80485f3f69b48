//! Markup event stream built on `lol_html`.
//!
//! Turns decoded page contents into a flat sequence of start tag, end tag and
//! text events. No tree is ever built; events are drained as chunks are fed.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use html_escape::decode_html_entities;
use lol_html::{EndTagHandler, HtmlRewriter, OutputSink, Settings, doc_text, element};
use tracing::warn;

/// One markup event. Tag and attribute names are ASCII lower-case; text and
/// attribute values have their character references decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupEvent {
    Start {
        tag: String,
        attributes: Vec<(String, String)>,
    },
    End {
        tag: String,
    },
    Text(String),
}

impl MarkupEvent {
    /// Value of attribute `name` on a start tag
    pub fn attribute(&self, name: &str) -> Option<&str> {
        match self {
            Self::Start { attributes, .. } => attributes
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }
}

#[derive(Default)]
struct ScanState {
    events: VecDeque<MarkupEvent>,
    pending_text: String,
}

impl ScanState {
    fn flush_text(&mut self) {
        if self.pending_text.is_empty() {
            return;
        }
        let raw = std::mem::take(&mut self.pending_text);
        self.events
            .push_back(MarkupEvent::Text(decode_html_entities(&raw).into_owned()));
    }

    fn push(&mut self, event: MarkupEvent) {
        self.flush_text();
        self.events.push_back(event);
    }
}

struct NoopSink;

impl OutputSink for NoopSink {
    fn handle_chunk(&mut self, _chunk: &[u8]) {}
}

/// Incremental scanner: feed chunks, drain the events they produced.
pub struct MarkupScanner {
    rewriter: Option<HtmlRewriter<'static, NoopSink>>,
    state: Rc<RefCell<ScanState>>,
}

impl MarkupScanner {
    pub fn new() -> Self {
        let state = Rc::new(RefCell::new(ScanState::default()));
        let element_state = Rc::clone(&state);
        let text_state = Rc::clone(&state);

        let element_handler = element!("*", move |el| {
            let tag = el.tag_name().to_ascii_lowercase();
            let attributes = el
                .attributes()
                .iter()
                .map(|attr| {
                    (
                        attr.name().to_ascii_lowercase(),
                        decode_html_entities(&attr.value()).into_owned(),
                    )
                })
                .collect();
            element_state.borrow_mut().push(MarkupEvent::Start {
                tag: tag.clone(),
                attributes,
            });

            let end_state = Rc::clone(&element_state);
            if let Some(handlers) = el.end_tag_handlers() {
                let handler: EndTagHandler<'static> = Box::new(move |end| {
                    let tag = end.name().to_ascii_lowercase();
                    end_state.borrow_mut().push(MarkupEvent::End { tag });
                    Ok(())
                });
                handlers.push(handler);
            }
            Ok(())
        });

        let text_handler = doc_text!(move |chunk| {
            let mut state = text_state.borrow_mut();
            state.pending_text.push_str(chunk.as_str());
            if chunk.last_in_text_node() {
                state.flush_text();
            }
            Ok(())
        });

        let rewriter = HtmlRewriter::new(
            Settings {
                element_content_handlers: vec![element_handler],
                document_content_handlers: vec![text_handler],
                strict: false,
                ..Settings::default()
            },
            NoopSink,
        );

        Self {
            rewriter: Some(rewriter),
            state,
        }
    }

    /// Feed one chunk and return the events completed so far.
    ///
    /// Malformed input never fails: a rewriter error is logged and the
    /// scanner stops accepting input.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<MarkupEvent> {
        if let Some(rewriter) = self.rewriter.as_mut() {
            if let Err(error) = rewriter.write(chunk) {
                warn!("Markup scanning stopped: {error}");
                self.rewriter = None;
            }
        }
        self.drain()
    }

    /// Flush the scanner and return the remaining events.
    pub fn finish(&mut self) -> Vec<MarkupEvent> {
        if let Some(rewriter) = self.rewriter.take() {
            if let Err(error) = rewriter.end() {
                warn!("Markup scanning stopped: {error}");
            }
        }
        self.state.borrow_mut().flush_text();
        self.drain()
    }

    fn drain(&mut self) -> Vec<MarkupEvent> {
        self.state.borrow_mut().events.drain(..).collect()
    }
}

impl Default for MarkupScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for in-memory markup.
pub fn scan(markup: &str) -> Vec<MarkupEvent> {
    let mut scanner = MarkupScanner::new();
    let mut events = scanner.feed(markup.as_bytes());
    events.extend(scanner.finish());
    events
}
