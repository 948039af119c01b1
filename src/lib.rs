//! xmlchunker - split large XML feeds into bounded, well-formed chunk files
//!
//! The document is read in fixed-size buffers and parsed incrementally, so
//! memory use does not grow with the input. Every repeated item element is
//! re-serialised; items whose registered fields fail the predicate are
//! dropped, the rest are written `chunk_size` at a time into
//! `{prefix}{index}.xml` files under the document's root element.
//!
//! Layers:
//! - `core`: scanner, tokenizer, entities, attributes and charsets
//! - `reader`: buffered source reads and the streaming event source
//! - `chunker`: validation gate, item state machine, chunk writer, session log
//!   and the session/driver on top
//! - `rules`: a configurable predicate for the common checks
//!
//! ```no_run
//! use xmlchunker::{ChunkOptions, Chunker};
//!
//! let options = ChunkOptions {
//!     chunk_size: 1000,
//!     prefix: "output-".to_string(),
//!     fields: vec!["weight_kg".to_string()],
//!     ..ChunkOptions::default()
//! };
//! let predicate = |data: &str, _field: &str| data.trim().parse::<u32>().map_or(false, |kg| kg > 0);
//! let report = Chunker::new("feed.xml", options, &predicate)?.run()?;
//! println!("{}", report.log);
//! # Ok::<(), xmlchunker::ChunkerError>(())
//! ```

pub mod chunker;
pub mod config;
pub mod core;
pub mod error;
pub mod reader;
pub mod rules;

pub use chunker::{ChunkSession, Chunker, FieldPredicate, RunReport, SessionLog, SessionStatus};
pub use config::{ChunkOptions, ChunkerConfig};
pub use crate::core::encoding::Charset;
pub use crate::core::tokenizer::ParseError;
pub use error::{ChunkerError, ConfigError, PredicateError};
pub use reader::{StreamingParser, XmlEvent};
pub use rules::{FieldRule, RuleCheck, RuleSet};
