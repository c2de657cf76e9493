//! CLI command definitions and argument parsing.

use crate::config::OutputFormat;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// adoq - Ask questions about work items in plain language.
#[derive(Debug, Parser)]
#[command(name = "adoq")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Configuration file path
    #[arg(short, long, global = true, env = "ADOQ_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
}

impl From<CliFormat> for OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => OutputFormat::Table,
            CliFormat::Json => OutputFormat::Json,
        }
    }
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the queryable fields
    Fields(FieldsArgs),

    /// Compile a filter or a WHERE fragment into a query
    Compile(CompileArgs),

    /// Classify an utterance
    Classify(ClassifyArgs),

    /// Show or create the configuration file
    Config(ConfigArgs),
}

/// Arguments for the fields command.
#[derive(Debug, Parser)]
pub struct FieldsArgs {
    /// Only show fields whose reference contains this text
    #[arg(short, long)]
    pub search: Option<String>,
}

/// Arguments for the compile command.
#[derive(Debug, Parser)]
pub struct CompileArgs {
    /// JSON filter file, or `-` for stdin
    #[arg(short, long, conflicts_with = "fragment", required_unless_present = "fragment")]
    pub spec: Option<String>,

    /// WHERE clause to complete (the WHERE keyword is optional)
    #[arg(long)]
    pub fragment: Option<String>,

    /// Team project to scope to (defaults to @Project)
    #[arg(short, long, env = "ADOQ_PROJECT")]
    pub project: Option<String>,

    /// Date quarter boundaries are computed from (YYYY-MM-DD)
    #[arg(long)]
    pub today: Option<NaiveDate>,
}

/// Arguments for the classify command.
#[derive(Debug, Parser)]
pub struct ClassifyArgs {
    /// The utterance
    #[arg(required = true, num_args = 1..)]
    pub utterance: Vec<String>,

    /// Skip the oracle and use keyword cues only
    #[arg(long)]
    pub heuristic: bool,

    /// Team project to scope the compiled query to
    #[arg(short, long, env = "ADOQ_PROJECT")]
    pub project: Option<String>,
}

/// Arguments for the config command.
#[derive(Debug, Parser)]
pub struct ConfigArgs {
    /// Action to perform
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the configuration file path
    Path,
}
