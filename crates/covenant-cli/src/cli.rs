//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use covenant_extractor::ChunkOverrides;
use std::path::PathBuf;

/// Covenant CLI - Answer a question catalogue over long credit agreements.
#[derive(Debug, Parser)]
#[command(name = "covenant")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path (defaults to ~/.covenant/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run an extraction pass over a document
    Extract(ExtractArgs),

    /// Show how a document would be chunked
    Chunks(ChunksArgs),

    /// List the question catalogue
    Questions(QuestionsArgs),

    /// Route a free-form question to catalogue categories
    Route(RouteArgs),
}

/// Chunking overrides shared by commands that chunk a document.
#[derive(Debug, Clone, Copy, Default, clap::Args)]
pub struct ChunkingArgs {
    /// Chunk size in characters
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Characters shared by consecutive chunks
    #[arg(long)]
    pub overlap: Option<usize>,
}

impl From<ChunkingArgs> for ChunkOverrides {
    fn from(args: ChunkingArgs) -> Self {
        ChunkOverrides {
            chunk_size: args.chunk_size,
            chunk_overlap: args.overlap,
        }
    }
}

/// Arguments for the extract command.
#[derive(Debug, Parser)]
pub struct ExtractArgs {
    /// Document file (.json page array, form-feed text, or page-marked text)
    pub document: PathBuf,

    /// Question catalogue (TOML)
    #[arg(short, long, env = "COVENANT_QUESTIONS")]
    pub questions: PathBuf,

    #[command(flatten)]
    pub chunking: ChunkingArgs,

    /// Directory to write `<document_id>.json` into
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Document identifier (defaults to the file stem)
    #[arg(long)]
    pub document_id: Option<String>,
}

/// Arguments for the chunks command.
#[derive(Debug, Parser)]
pub struct ChunksArgs {
    /// Document file
    pub document: PathBuf,

    #[command(flatten)]
    pub chunking: ChunkingArgs,
}

/// Arguments for the questions command.
#[derive(Debug, Parser)]
pub struct QuestionsArgs {
    /// Question catalogue (TOML)
    #[arg(short, long, env = "COVENANT_QUESTIONS")]
    pub questions: PathBuf,
}

/// Arguments for the route command.
#[derive(Debug, Parser)]
pub struct RouteArgs {
    /// Free-form question text
    pub question: String,

    /// Question catalogue (TOML)
    #[arg(short, long, env = "COVENANT_QUESTIONS")]
    pub questions: PathBuf,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_command() {
        let cli = Cli::parse_from([
            "covenant",
            "extract",
            "acme.txt",
            "--questions",
            "catalogue.toml",
            "--chunk-size",
            "20000",
            "--overlap",
            "2000",
            "--format",
            "json",
        ]);
        assert_eq!(cli.format, Some(CliFormat::Json));
        match cli.command {
            Command::Extract(args) => {
                assert_eq!(args.document, PathBuf::from("acme.txt"));
                let overrides: ChunkOverrides = args.chunking.into();
                assert_eq!(overrides.chunk_size, Some(20000));
                assert_eq!(overrides.chunk_overlap, Some(2000));
                assert!(args.output.is_none());
            }
            _ => panic!("Expected Extract command"),
        }
    }

    #[test]
    fn test_chunks_command_without_overrides() {
        let cli = Cli::parse_from(["covenant", "chunks", "acme.txt"]);
        match cli.command {
            Command::Chunks(args) => {
                let overrides: ChunkOverrides = args.chunking.into();
                assert_eq!(overrides, ChunkOverrides::default());
            }
            _ => panic!("Expected Chunks command"),
        }
    }

    #[test]
    fn test_route_command() {
        let cli = Cli::parse_from([
            "covenant",
            "--verbose",
            "route",
            "what is the MFN sunset?",
            "-q",
            "catalogue.toml",
        ]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Route(ref args) if args.question.contains("MFN")));
    }

    #[test]
    fn test_format_conversion() {
        let format: crate::config::OutputFormat = CliFormat::Table.into();
        assert!(matches!(format, crate::config::OutputFormat::Table));
    }
}
