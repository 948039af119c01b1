//! Chunker configuration
//!
//! [`ChunkOptions`] holds everything a run needs besides the source path and
//! the predicate. [`ChunkerConfig`] is the on-disk TOML form, which adds the
//! rule list the command-line tool turns into a predicate:
//!
//! ```toml
//! [chunker]
//! root = "Shop"
//! item = "shopItem"
//! chunk_size = 1000
//! prefix = "output-"
//!
//! [[rules]]
//! field = "weight_kg"
//! check = "positive_integer"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::encoding::Charset;
use crate::error::ConfigError;
use crate::reader::DEFAULT_BUFFER_SIZE;
use crate::rules::FieldRule;

/// Options of one chunking session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkOptions {
    /// Root element wrapping the items, in the source and in every chunk
    pub root: String,
    /// Repeating element counted and bounded per chunk
    pub item: String,
    /// Charset label of the source, also used for the chunks
    pub encoding: String,
    /// Maximum number of items per chunk
    pub chunk_size: usize,
    /// Chunk files are named `{prefix}{index}.xml`
    pub prefix: String,
    /// Directory the chunk files are written to
    pub output_dir: PathBuf,
    /// Elements whose text must pass the predicate
    pub fields: Vec<String>,
    /// Bytes read from the source per feed
    pub read_buffer_size: usize,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            root: "Shop".to_owned(),
            item: "shopItem".to_owned(),
            encoding: "UTF-8".to_owned(),
            chunk_size: 100,
            prefix: "out-".to_owned(),
            output_dir: PathBuf::from("."),
            fields: Vec::new(),
            read_buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl ChunkOptions {
    /// Check every option is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(invalid("chunk_size", "must be greater than 0"));
        }
        if self.read_buffer_size == 0 {
            return Err(invalid("read_buffer_size", "must be greater than 0"));
        }
        if !is_element_name(&self.root) {
            return Err(invalid("root", format!("'{}' is not an element name", self.root)));
        }
        if !is_element_name(&self.item) {
            return Err(invalid("item", format!("'{}' is not an element name", self.item)));
        }
        if let Some(field) = self.fields.iter().find(|f| !is_element_name(f)) {
            return Err(invalid("fields", format!("'{}' is not an element name", field)));
        }
        self.charset()?;
        Ok(())
    }

    /// Resolve the configured encoding label
    pub fn charset(&self) -> Result<Charset, ConfigError> {
        Charset::from_label(&self.encoding).ok_or_else(|| ConfigError::UnknownEncoding(self.encoding.clone()))
    }

    /// Path of the chunk file with the given index
    pub fn chunk_path(&self, index: usize) -> PathBuf {
        self.output_dir.join(format!("{}{}.xml", self.prefix, index))
    }
}

/// On-disk configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    #[serde(default)]
    pub chunker: ChunkOptions,
    #[serde(default)]
    pub rules: Vec<FieldRule>,
}

impl ChunkerConfig {
    /// Load and validate a TOML config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                ConfigError::ParseFailed {
                    reason: format!("{}: {}", path.display(), e),
                }
            }
        })?;
        let config = Self::from_toml_str(&content)?;
        config.chunker.validate()?;
        Ok(config)
    }

    /// Parse a TOML string without validating the options
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseFailed { reason: e.to_string() })
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
}

/// Whether `name` could be matched against tag names from the tokenizer
fn is_element_name(name: &str) -> bool {
    use crate::core::scanner::{is_name_char, is_name_start_char};

    let bytes = name.as_bytes();
    match bytes.first() {
        Some(&first) => is_name_start_char(first) && bytes[1..].iter().all(|&b| is_name_char(b)),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleCheck;

    #[test]
    fn test_defaults() {
        let options = ChunkOptions::default();
        assert_eq!(options.root, "Shop");
        assert_eq!(options.item, "shopItem");
        assert_eq!(options.chunk_size, 100);
        assert_eq!(options.prefix, "out-");
        assert_eq!(options.read_buffer_size, 8192);
        assert!(options.validate().is_ok());
        assert_eq!(options.chunk_path(3), PathBuf::from("./out-3.xml"));
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let options = ChunkOptions {
            chunk_size: 0,
            ..ChunkOptions::default()
        };
        assert!(matches!(
            options.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "chunk_size"
        ));
    }

    #[test]
    fn test_unknown_encoding_rejected() {
        let options = ChunkOptions {
            encoding: "UTF-16".to_owned(),
            ..ChunkOptions::default()
        };
        assert!(matches!(options.validate(), Err(ConfigError::UnknownEncoding(label)) if label == "UTF-16"));
    }

    #[test]
    fn test_bad_element_name_rejected() {
        let options = ChunkOptions {
            item: "1item".to_owned(),
            ..ChunkOptions::default()
        };
        assert!(options.validate().is_err());

        let options = ChunkOptions {
            fields: vec!["ok".to_owned(), "".to_owned()],
            ..ChunkOptions::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_parse_toml() {
        let config = ChunkerConfig::from_toml_str(
            r#"
            [chunker]
            chunk_size = 1000
            prefix = "output-"

            [[rules]]
            field = "weight_kg"
            check = "positive_integer"

            [[rules]]
            field = "serie"
            check = { exclude_substrings = ["WOODY desky"] }
            "#,
        )
        .unwrap();

        assert_eq!(config.chunker.chunk_size, 1000);
        assert_eq!(config.chunker.prefix, "output-");
        assert_eq!(config.chunker.root, "Shop");
        assert_eq!(config.rules.len(), 2);
        assert_eq!(config.rules[0].check, RuleCheck::PositiveInteger);
        assert_eq!(
            config.rules[1].check,
            RuleCheck::ExcludeSubstrings(vec!["WOODY desky".to_owned()])
        );
    }

    #[test]
    fn test_parse_empty_toml() {
        let config = ChunkerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ChunkerConfig::default());
    }

    #[test]
    fn test_parse_invalid_toml() {
        let result = ChunkerConfig::from_toml_str("[chunker]\nchunk_size = \"many\"");
        assert!(matches!(result, Err(ConfigError::ParseFailed { .. })));
    }

    #[test]
    fn test_from_file_not_found() {
        let result = ChunkerConfig::from_file("/nonexistent/xmlchunker.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_from_file_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunker.toml");
        std::fs::write(&path, "[chunker]\nchunk_size = 0\n").unwrap();
        assert!(matches!(
            ChunkerConfig::from_file(&path),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
