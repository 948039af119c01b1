//! Chunk Writer
//!
//! Buffers accepted item markup and writes it out as self-contained XML
//! files named `{prefix}{index}.xml`, counting from 0.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use tracing::debug;

use crate::config::ChunkOptions;
use crate::core::encoding::Charset;
use crate::core::entities::escape_attribute;
use crate::error::ChunkerError;

const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Accumulates one chunk and rotates output files
pub struct ChunkWriter {
    options: ChunkOptions,
    charset: Charset,
    payload: String,
    /// Extra namespace declarations for the output root
    namespaces: Vec<(String, String)>,
    index: usize,
    written: Vec<PathBuf>,
}

impl ChunkWriter {
    pub fn new(options: ChunkOptions, charset: Charset) -> Self {
        ChunkWriter {
            options,
            charset,
            payload: String::new(),
            namespaces: Vec::new(),
            index: 0,
            written: Vec::new(),
        }
    }

    /// Append the markup of one accepted item
    pub fn append(&mut self, markup: &str) {
        self.payload.push_str(markup);
    }

    /// Namespace declarations copied onto every root written from now on
    pub fn set_root_namespaces(&mut self, namespaces: Vec<(String, String)>) {
        self.namespaces = namespaces;
    }

    pub fn into_written(self) -> Vec<PathBuf> {
        self.written
    }

    /// Write the buffered payload to the next chunk file.
    ///
    /// Returns `Ok(None)` without touching the filesystem when nothing is
    /// buffered. `is_final` marks the flush at end of input; the file is
    /// closed the same way either way.
    pub fn flush(&mut self, is_final: bool) -> Result<Option<PathBuf>, ChunkerError> {
        if self.payload.is_empty() {
            debug!(is_final, "empty payload, no chunk written");
            return Ok(None);
        }

        let path = self.options.chunk_path(self.index);
        let write_error = |source| ChunkerError::Write {
            path: path.clone(),
            source,
        };

        if !self.options.output_dir.as_os_str().is_empty() {
            fs::create_dir_all(&self.options.output_dir).map_err(write_error)?;
        }

        {
            let file = File::create(&path).map_err(write_error)?;
            let mut out = BufWriter::new(file);
            out.write_all(&self.charset.encode(&self.header()))
                .and_then(|_| out.write_all(&self.charset.encode(&self.payload)))
                .and_then(|_| out.write_all(&self.charset.encode(&format!("</{}>", self.options.root))))
                .and_then(|_| out.flush())
                .map_err(write_error)?;
        }

        debug!(path = %path.display(), bytes = self.payload.len(), is_final, "chunk written");
        self.payload.clear();
        self.index += 1;
        self.written.push(path.clone());
        Ok(Some(path))
    }

    /// XML declaration plus the opening root tag
    fn header(&self) -> String {
        let mut header = format!(
            "<?xml version=\"1.0\" encoding=\"{}\"?>\n<{} xmlns:xsd=\"{}\" xmlns:xsi=\"{}\"",
            self.options.encoding.to_lowercase(),
            self.options.root,
            XSD_NAMESPACE,
            XSI_NAMESPACE
        );
        for (name, value) in &self.namespaces {
            header.push(' ');
            header.push_str(name);
            header.push_str("=\"");
            header.push_str(&escape_attribute(value));
            header.push('"');
        }
        header.push('>');
        header
    }
}
