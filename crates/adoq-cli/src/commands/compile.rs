//! Compile command implementation.

use crate::cli::CompileArgs;
use crate::config::AppConfig;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use adoq_domain::FilterSpec;
use adoq_wiql::{CompileContext, Compiler, QueryInput};
use std::fs;
use std::io::{self, Read};
use tracing::debug;

/// Execute the compile command.
pub fn execute_compile(
    args: CompileArgs,
    compiler: &Compiler,
    config: &AppConfig,
    formatter: &Formatter,
) -> Result<()> {
    let mut ctx = CompileContext::new(args.project.or_else(|| config.project.clone()));
    if let Some(today) = args.today {
        ctx = ctx.with_today(today);
    }

    let input = match (args.spec, args.fragment) {
        (_, Some(fragment)) => QueryInput::Fragment(fragment),
        (Some(source), None) => QueryInput::Filter(parse_spec(&read_source(&source)?)?),
        (None, None) => {
            return Err(CliError::InvalidInput(
                "Either --spec or --fragment is required".to_string(),
            ))
        }
    };

    let query = compiler.compile_input(&input, &ctx)?;
    debug!(cap = query.result_cap(), "Compiled query");
    println!("{}", formatter.format_query(&query)?);
    Ok(())
}

fn read_source(source: &str) -> Result<String> {
    if source == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        Ok(fs::read_to_string(source)?)
    }
}

/// Parse a JSON filter.
pub fn parse_spec(text: &str) -> Result<FilterSpec> {
    if text.trim().is_empty() {
        return Err(CliError::InvalidInput("Filter is empty".to_string()));
    }
    Ok(serde_json::from_str(text)?)
}
