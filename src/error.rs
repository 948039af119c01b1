//! Error types
//!
//! Configuration problems surface at construction, everything else during a
//! run. Malformed XML is not an error of the run: it is recovered from and
//! reported as a [`ParseError`](crate::core::tokenizer::ParseError).

use std::path::PathBuf;

/// Fatal errors of a chunking run
#[derive(Debug, thiserror::Error)]
pub enum ChunkerError {
    /// Invalid session configuration
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// The source document could not be opened
    #[error("could not open XML file {}: {source}", .path.display())]
    OpenSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading the source failed mid-stream
    #[error("read failed after {offset} bytes: {source}")]
    Read {
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    /// The validation predicate itself failed
    #[error("predicate error: {0}")]
    Predicate(#[from] PredicateError),

    /// Creating or writing an output chunk failed
    #[error("could not write chunk {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document declares a different encoding than the session decodes
    #[error("document declares encoding '{declared}' but is read as {configured}")]
    Encoding { declared: String, configured: String },

    /// The session already failed; the run must be restarted
    #[error("chunking session already failed, restart the run")]
    SessionFailed,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No source path, or an empty one
    #[error("no XML file specified")]
    MissingSource,

    /// An option outside its allowed range
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// Encoding label not among the supported charsets
    #[error("unknown encoding '{0}', expected UTF-8, ISO-8859-1 or US-ASCII")]
    UnknownEncoding(String),

    /// Config file does not exist
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// Config file is not valid TOML for this schema
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },
}

/// A predicate could not decide on a field value
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("validation of '{field}' failed: {reason}")]
pub struct PredicateError {
    pub field: String,
    pub reason: String,
}

impl PredicateError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        PredicateError {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_converts() {
        let err: ChunkerError = ConfigError::MissingSource.into();
        assert!(matches!(err, ChunkerError::Config(ConfigError::MissingSource)));
        assert_eq!(err.to_string(), "config error: no XML file specified");
    }

    #[test]
    fn test_predicate_error_display() {
        let err = PredicateError::new("weight_kg", "lookup table unavailable");
        assert_eq!(
            ChunkerError::from(err).to_string(),
            "predicate error: validation of 'weight_kg' failed: lookup table unavailable"
        );
    }
}
