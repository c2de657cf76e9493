//! adoq - ask questions about work items in plain language.

use adoq_cli::commands;
use adoq_cli::{AppConfig, Cli, Command, Formatter};
use adoq_domain::FieldRegistry;
use adoq_wiql::Compiler;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays pipeable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => AppConfig::default_path()?,
    };
    let config = AppConfig::load_from(&config_path)?;
    if !matches!(cli.command, Command::Config(_)) {
        config.validate()?;
    }

    let format = cli.format.map(Into::into).unwrap_or(config.format);
    let formatter = Formatter::new(format);

    let registry = Arc::new(FieldRegistry::standard());
    let compiler = Arc::new(Compiler::new(Arc::clone(&registry), config.compiler.clone()));

    match cli.command {
        Command::Fields(args) => commands::execute_fields(args, &registry, &formatter)?,
        Command::Compile(args) => commands::execute_compile(args, &compiler, &config, &formatter)?,
        Command::Classify(args) => commands::execute_classify(args, compiler, &config, &formatter)?,
        Command::Config(args) => commands::execute_config(args, &config, &config_path, &formatter)?,
    }

    Ok(())
}
