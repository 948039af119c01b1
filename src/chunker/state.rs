//! Item State Machine
//!
//! Reconstructs item boundaries from the event stream. While inside an item
//! every event is re-serialised into the item's markup; registered fields
//! collect their text and are validated when they close. A closed item is
//! either accepted (its markup goes to the chunk) or excluded.
//!
//! The state is `Outside` when no element is open, `InItem` otherwise, and
//! `InCapturedField` while at least one capture is active.

use crate::chunker::gate::ValidationGate;
use crate::core::attributes::is_namespace_declaration;
use crate::error::PredicateError;
use crate::reader::XmlEvent;

/// Namespace declarations the output root always carries
const FIXED_NAMESPACES: [&str; 2] = ["xmlns:xsd", "xmlns:xsi"];

/// What an event did to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing the session has to act on
    Continue,
    /// The document's root element started; carries its namespace declarations
    RootOpened { namespaces: Vec<(String, String)> },
    /// An item closed and passed validation
    Accepted {
        markup: String,
        /// The per-chunk limit was reached with this item
        chunk_full: bool,
    },
    /// An item closed with at least one failed field
    Excluded,
}

/// Text collected for one open registered field
#[derive(Debug)]
struct Capture {
    field: String,
    /// Index of the field element in the open-element stack
    level: usize,
    text: String,
}

/// Per-run parse state
#[derive(Debug)]
pub struct ParseState {
    root: String,
    item: String,
    chunk_limit: usize,
    /// Markup of the current item
    markup: String,
    /// Elements open inside the current item, the item itself first
    open: Vec<String>,
    captures: Vec<Capture>,
    excluded: bool,
    root_seen: bool,
    chunk_items: usize,
    total_accepted: usize,
    total_excluded: usize,
}

impl ParseState {
    pub fn new(root: impl Into<String>, item: impl Into<String>, chunk_limit: usize) -> Self {
        ParseState {
            root: root.into(),
            item: item.into(),
            chunk_limit: chunk_limit.max(1),
            markup: String::with_capacity(1024),
            open: Vec::with_capacity(16),
            captures: Vec::new(),
            excluded: false,
            root_seen: false,
            chunk_items: 0,
            total_accepted: 0,
            total_excluded: 0,
        }
    }

    /// Apply one event. A predicate error leaves the current item unfinished.
    pub fn apply(&mut self, event: &XmlEvent, gate: &ValidationGate<'_>) -> Result<Outcome, PredicateError> {
        match event {
            XmlEvent::StartTag { name, attributes } => {
                if self.in_item() {
                    self.open_element(event, name, gate);
                } else if *name == self.item {
                    self.markup.clear();
                    self.captures.clear();
                    self.excluded = false;
                    self.open_element(event, name, gate);
                } else if *name == self.root && !self.root_seen {
                    self.root_seen = true;
                    let namespaces = attributes
                        .iter()
                        .filter(|(attr, _)| {
                            is_namespace_declaration(attr) && !FIXED_NAMESPACES.contains(&attr.as_str())
                        })
                        .cloned()
                        .collect();
                    return Ok(Outcome::RootOpened { namespaces });
                }
                Ok(Outcome::Continue)
            }
            XmlEvent::Text(content) => {
                if self.in_item() {
                    event.write_markup(&mut self.markup);
                    for capture in &mut self.captures {
                        capture.text.push_str(content);
                    }
                }
                Ok(Outcome::Continue)
            }
            XmlEvent::EndTag { name } => {
                // Stray end tags are dropped; a mismatched one closes everything
                // opened after its start tag
                let Some(level) = self.open.iter().rposition(|open| open == name) else {
                    return Ok(Outcome::Continue);
                };
                while self.open.len() > level {
                    self.close_element(gate)?;
                }

                if self.in_item() {
                    Ok(Outcome::Continue)
                } else {
                    Ok(self.finish_item())
                }
            }
        }
    }

    fn open_element(&mut self, event: &XmlEvent, name: &str, gate: &ValidationGate<'_>) {
        event.write_markup(&mut self.markup);
        if gate.is_registered(name) {
            self.captures.push(Capture {
                field: name.to_string(),
                level: self.open.len(),
                text: String::new(),
            });
        }
        self.open.push(name.to_string());
    }

    /// Close the innermost open element, validating it if it is a field
    fn close_element(&mut self, gate: &ValidationGate<'_>) -> Result<(), PredicateError> {
        let Some(name) = self.open.pop() else {
            return Ok(());
        };

        if self.captures.last().is_some_and(|c| c.level == self.open.len()) {
            if let Some(capture) = self.captures.pop() {
                if !gate.check(&capture.text, &capture.field)? {
                    self.excluded = true;
                }
            }
        }

        self.markup.push_str("</");
        self.markup.push_str(&name);
        self.markup.push('>');
        Ok(())
    }

    fn finish_item(&mut self) -> Outcome {
        self.captures.clear();
        if self.excluded {
            self.excluded = false;
            self.markup.clear();
            self.total_excluded += 1;
            return Outcome::Excluded;
        }

        self.total_accepted += 1;
        self.chunk_items += 1;
        let chunk_full = self.chunk_items >= self.chunk_limit;
        if chunk_full {
            self.chunk_items = 0;
        }
        Outcome::Accepted {
            markup: std::mem::take(&mut self.markup),
            chunk_full,
        }
    }

    /// Whether an item is open
    pub fn in_item(&self) -> bool {
        !self.open.is_empty()
    }

    /// Whether a registered field of the current item is being captured
    pub fn in_captured_field(&self) -> bool {
        !self.captures.is_empty()
    }

    /// Drop an item left open at end of input
    pub fn discard_open_item(&mut self) -> bool {
        let was_open = self.in_item();
        self.open.clear();
        self.captures.clear();
        self.markup.clear();
        self.excluded = false;
        was_open
    }

    /// Items accepted in the current, not yet flushed chunk
    pub fn chunk_items(&self) -> usize {
        self.chunk_items
    }

    pub fn total_accepted(&self) -> usize {
        self.total_accepted
    }

    pub fn total_excluded(&self) -> usize {
        self.total_excluded
    }
}
