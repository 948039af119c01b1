//! Streaming chunking engine
//!
//! [`ChunkSession`] is the push side: feed it byte buffers in order and call
//! [`ChunkSession::finish`] at end of input. [`Chunker`] drives a session
//! from a file.
//!
//! Within a session every event from the [`StreamingParser`] goes through the
//! [`ParseState`]; accepted items are appended to the [`ChunkWriter`], which
//! writes a file each time the per-chunk limit is reached and once more for
//! the remainder at the end.

pub mod gate;
pub mod log;
pub mod state;
pub mod writer;

use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use tracing::trace;

use crate::config::ChunkOptions;
use crate::core::encoding::Charset;
use crate::error::{ChunkerError, ConfigError};
use crate::reader::{BufferedReader, StreamingParser};

pub use gate::{FieldPredicate, ValidationGate};
pub use log::SessionLog;
pub use state::{Outcome, ParseState};
pub use writer::ChunkWriter;

/// Lifecycle of a session. A finished session is consumed, its result is the
/// [`RunReport`]. A failed session refuses further input; the run has to be
/// started over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    NotStarted,
    Running,
    Failed,
}

/// Result of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Rendered session log
    pub log: String,
    pub total_accepted: usize,
    pub total_excluded: usize,
    /// Chunk files in the order they were written
    pub chunks: Vec<PathBuf>,
    /// Malformed fragments skipped
    pub parse_errors: usize,
}

/// One chunking run over a stream of bytes
pub struct ChunkSession<'p> {
    item: String,
    charset: Charset,
    gate: ValidationGate<'p>,
    parser: StreamingParser,
    state: ParseState,
    writer: ChunkWriter,
    log: SessionLog,
    status: SessionStatus,
    parse_errors: usize,
    encoding_checked: bool,
}

impl<'p> ChunkSession<'p> {
    pub fn new(options: ChunkOptions, predicate: &'p dyn FieldPredicate) -> Result<Self, ConfigError> {
        options.validate()?;
        let charset = options.charset()?;

        let mut log = SessionLog::new();
        log.start("Starting new chunking");
        log.record(&format!("Created XML parser for {} input", charset.label()));

        Ok(ChunkSession {
            item: options.item.clone(),
            charset,
            gate: ValidationGate::new(options.fields.iter().cloned(), predicate),
            parser: StreamingParser::new(charset),
            state: ParseState::new(options.root.clone(), options.item.clone(), options.chunk_size),
            writer: ChunkWriter::new(options, charset),
            log,
            status: SessionStatus::NotStarted,
            parse_errors: 0,
            encoding_checked: false,
        })
    }

    /// Feed the next buffer of the document. Buffers may split the document
    /// anywhere.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<(), ChunkerError> {
        self.start()?;
        trace!(bytes = bytes.len(), "feeding buffer");
        self.parser.feed(bytes, false);
        let result = self.drain();
        self.track(result)
    }

    /// Process what is left of the input, write the last chunk and report.
    pub fn finish(mut self) -> Result<RunReport, ChunkerError> {
        self.start()?;
        self.parser.feed(&[], true);
        let result = self.complete();
        self.track(result)?;

        Ok(RunReport {
            log: self.log.render(),
            total_accepted: self.state.total_accepted(),
            total_excluded: self.state.total_excluded(),
            chunks: self.writer.into_written(),
            parse_errors: self.parse_errors,
        })
    }

    fn start(&mut self) -> Result<(), ChunkerError> {
        if self.status == SessionStatus::Failed {
            return Err(ChunkerError::SessionFailed);
        }
        self.status = SessionStatus::Running;
        Ok(())
    }

    /// Any fatal error ends the session for good
    fn track<T>(&mut self, result: Result<T, ChunkerError>) -> Result<T, ChunkerError> {
        if let Err(e) = &result {
            self.status = SessionStatus::Failed;
            self.log.error(&format!("Chunking aborted: {}", e));
        }
        result
    }

    fn complete(&mut self) -> Result<(), ChunkerError> {
        self.drain()?;

        if self.state.discard_open_item() {
            self.log
                .warn(&format!("Unclosed '{}' element at end of input, discarded", self.item));
        }
        self.flush(true)?;
        self.log.record(&format!(
            "Ended chunking. Total processed '{}' objects: {}",
            self.item,
            self.state.total_accepted()
        ));
        Ok(())
    }

    /// Route everything the parser produced so far
    fn drain(&mut self) -> Result<(), ChunkerError> {
        self.check_declared_encoding()?;

        for error in self.parser.take_errors() {
            self.parse_errors += 1;
            self.log
                .warn(&format!("Could not parse XML ({}), skipping malformed fragment", error));
        }

        for event in self.parser.take_events() {
            match self.state.apply(&event, &self.gate)? {
                Outcome::Continue => {}
                Outcome::RootOpened { namespaces } => self.writer.set_root_namespaces(namespaces),
                Outcome::Accepted { markup, chunk_full } => {
                    self.writer.append(&markup);
                    if chunk_full {
                        self.log.record("Chunk limit reached, writing chunk...");
                        self.flush(false)?;
                    }
                }
                Outcome::Excluded => {
                    self.log
                        .record(&format!("Excluded item found, skipping current {}..", self.item));
                }
            }
        }
        Ok(())
    }

    fn flush(&mut self, is_final: bool) -> Result<(), ChunkerError> {
        if let Some(path) = self.writer.flush(is_final)? {
            self.log.record(&format!("Written {}", path.display()));
        }
        Ok(())
    }

    /// The declared encoding must name the charset the session decodes with
    fn check_declared_encoding(&mut self) -> Result<(), ChunkerError> {
        if self.encoding_checked {
            return Ok(());
        }
        let Some(declared) = self.parser.declared_encoding() else {
            return Ok(());
        };
        if self.charset.matches_label(declared) {
            self.encoding_checked = true;
            return Ok(());
        }
        Err(ChunkerError::Encoding {
            declared: declared.to_string(),
            configured: self.charset.label().to_string(),
        })
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Log recorded so far
    pub fn log(&self) -> &SessionLog {
        &self.log
    }

    /// Items accepted so far, including ones not yet written
    pub fn total_accepted(&self) -> usize {
        self.state.total_accepted()
    }
}

/// Chunks one XML file
pub struct Chunker<'p> {
    source: PathBuf,
    options: ChunkOptions,
    predicate: &'p dyn FieldPredicate,
}

impl<'p> Chunker<'p> {
    pub fn new(
        source: impl Into<PathBuf>,
        options: ChunkOptions,
        predicate: &'p dyn FieldPredicate,
    ) -> Result<Self, ConfigError> {
        let source = source.into();
        if source.as_os_str().is_empty() {
            return Err(ConfigError::MissingSource);
        }
        options.validate()?;
        Ok(Chunker {
            source,
            options,
            predicate,
        })
    }

    pub fn options(&self) -> &ChunkOptions {
        &self.options
    }

    /// Run the whole file through a new session
    pub fn run(&self) -> Result<RunReport, ChunkerError> {
        let mut session = ChunkSession::new(self.options.clone(), self.predicate)?;

        let file = File::open(&self.source).map_err(|source| ChunkerError::OpenSource {
            path: self.source.clone(),
            source,
        })?;
        session
            .log
            .record(&format!("Opened XML file {}", self.source.display()));

        drive(session, file, self.options.read_buffer_size)
    }
}

/// Feed `source` through `session` buffer by buffer, then finish it
fn drive<R: Read>(mut session: ChunkSession<'_>, source: R, buffer_size: usize) -> Result<RunReport, ChunkerError> {
    let mut reader = BufferedReader::with_capacity(source, buffer_size);
    loop {
        let offset = reader.bytes_read();
        let buffer = match reader.next_buffer() {
            Ok(Some(buffer)) => buffer,
            Ok(None) => break,
            Err(source) => return Err(ChunkerError::Read { offset, source }),
        };
        session.feed(buffer)?;
    }

    session.finish()
}
