//! xmlchunker command-line tool
//!
//! Splits one XML file into chunk files, validating fields with the rules
//! from the config file, and prints the session log.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use xmlchunker::{ChunkerConfig, Chunker, RuleSet};

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Split a large XML feed into bounded, well-formed chunk files
#[derive(Parser)]
#[command(name = "xmlchunker", version, about)]
struct Cli {
    /// XML file to split
    source: PathBuf,

    /// TOML config with a [chunker] table and [[rules]]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Repeating element to count per chunk
    #[arg(long)]
    item: Option<String>,

    /// Root element wrapping the items
    #[arg(long)]
    root: Option<String>,

    /// Source and output encoding (UTF-8, ISO-8859-1, US-ASCII)
    #[arg(long)]
    encoding: Option<String>,

    /// Maximum items per chunk file
    #[arg(short = 'n', long)]
    chunk_size: Option<usize>,

    /// Chunk file name prefix
    #[arg(short, long)]
    prefix: Option<String>,

    /// Directory for the chunk files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Log level, overridden by RUST_LOG
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

impl Cli {
    /// Config file contents with the command-line overrides applied
    fn load_config(&self) -> Result<ChunkerConfig> {
        let mut config = match &self.config {
            Some(path) => ChunkerConfig::from_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => ChunkerConfig::default(),
        };

        let options = &mut config.chunker;
        if let Some(item) = &self.item {
            options.item.clone_from(item);
        }
        if let Some(root) = &self.root {
            options.root.clone_from(root);
        }
        if let Some(encoding) = &self.encoding {
            options.encoding.clone_from(encoding);
        }
        if let Some(chunk_size) = self.chunk_size {
            options.chunk_size = chunk_size;
        }
        if let Some(prefix) = &self.prefix {
            options.prefix.clone_from(prefix);
        }
        if let Some(output_dir) = &self.output_dir {
            options.output_dir.clone_from(output_dir);
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.load_config()?;
    let rules = RuleSet::new(config.rules);
    let mut options = config.chunker;
    for field in rules.fields() {
        if !options.fields.iter().any(|f| f == field) {
            options.fields.push(field.to_string());
        }
    }
    if rules.is_empty() && !options.fields.is_empty() {
        tracing::warn!("fields are registered but no rules are configured, every item will be excluded");
    }

    tracing::debug!(source = %cli.source.display(), fields = ?options.fields, "starting");
    let chunker = Chunker::new(&cli.source, options, &rules).context("invalid configuration")?;
    let report = chunker
        .run()
        .with_context(|| format!("chunking {} failed", cli.source.display()))?;

    println!("{}", report.log);
    Ok(())
}
