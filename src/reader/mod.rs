//! XML Reader Module
//!
//! Turns a byte source into XML events:
//! - BufferedReader: fixed-size reads from any `Read`
//! - StreamingParser: incremental decode + tokenize with safe boundaries
//! - Events: owned XML event types

pub mod buffered;
pub mod events;
pub mod streaming;

pub use buffered::{BufferedReader, DEFAULT_BUFFER_SIZE};
pub use events::XmlEvent;
pub use streaming::StreamingParser;
