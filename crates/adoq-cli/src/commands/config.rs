//! Config command implementation.

use crate::cli::{ConfigAction, ConfigArgs};
use crate::config::AppConfig;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use std::path::Path;

/// Execute the config command.
pub fn execute_config(args: ConfigArgs, config: &AppConfig, path: &Path, formatter: &Formatter) -> Result<()> {
    match args.action {
        ConfigAction::Show => {
            print!("{}", config.to_toml()?);
        }
        ConfigAction::Init { force } => {
            init_config(path, force)?;
            println!("{}", formatter.success(&format!("Wrote {}", path.display())));
        }
        ConfigAction::Path => {
            println!("{}", path.display());
        }
    }
    Ok(())
}

/// Write a default configuration file.
pub fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        )));
    }
    AppConfig::default().save_to(path)
}
