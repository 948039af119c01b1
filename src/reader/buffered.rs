//! Buffered Source Reader
//!
//! Reads the source document in fixed-size buffers from any `Read`
//! implementation. Each call hands out the next filled slice; a `None` marks
//! the end of input, which is when the driver performs its final feed.

use std::io::{ErrorKind, Read};

/// Buffer size for reading chunks
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Fixed-buffer reader for streaming input
pub struct BufferedReader<R: Read> {
    reader: R,
    buffer: Vec<u8>,
    bytes_read: u64,
    eof: bool,
}

impl<R: Read> BufferedReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_capacity(reader, DEFAULT_BUFFER_SIZE)
    }

    /// Create a reader handing out buffers of at most `capacity` bytes
    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        BufferedReader {
            reader,
            buffer: vec![0u8; capacity.max(1)],
            bytes_read: 0,
            eof: false,
        }
    }

    /// Read the next buffer. Returns `Ok(None)` once the source is exhausted.
    pub fn next_buffer(&mut self) -> std::io::Result<Option<&[u8]>> {
        if self.eof {
            return Ok(None);
        }

        loop {
            match self.reader.read(&mut self.buffer) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(None);
                }
                Ok(n) => {
                    self.bytes_read += n as u64;
                    return Ok(Some(&self.buffer[..n]));
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Check if we've reached end of input
    pub fn is_eof(&self) -> bool {
        self.eof
    }

    /// Total bytes read so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}
