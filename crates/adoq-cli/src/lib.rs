//! adoq CLI
//!
//! Command-line front end over the compiler and the classifier.
//!
//! # Commands
//!
//! - `fields`: list the queryable fields and the operators each accepts
//! - `compile`: compile a JSON filter or a WHERE fragment into a query
//! - `classify`: classify an utterance and show the query it compiles to
//! - `config`: show or initialize `~/.adoq/config.toml`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::{Cli, Command};
pub use config::{AppConfig, OutputFormat};
pub use error::{CliError, Result};
pub use output::Formatter;
