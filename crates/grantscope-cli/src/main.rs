//! GrantScope CLI - declarative Snowflake permission reconciler

use grantscope_cli::cli;
use grantscope_cli::config::{resolve_connection_string, BotSettings};
use grantscope_cli::connector;
use grantscope_cli::output;

use anyhow::{Context, Result};
use clap::Parser;
use grantscope_core::{
    check_spec, execute_plan, load_spec, plan, Connector, ExecuteOptions, ExecutionSummary,
    SpecDocument,
};
use std::io::{self, Write};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use cli::{Args, OutputFormat};
use output::{format_json, format_text, TextOptions};

/// At least one statement failed.
const EXIT_FAILURE: u8 = 1;
/// The spec, the state file or the connection settings are unusable.
const EXIT_CONFIG_ERROR: u8 = 66;

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args) {
        Ok(has_failures) => {
            if has_failures {
                ExitCode::from(EXIT_FAILURE)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("grantscope: error: {e:#}");
            ExitCode::from(EXIT_CONFIG_ERROR)
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
        .ok();
}

/// Returns whether any statement failed.
fn run(args: Args) -> Result<bool> {
    if args.print_schema {
        let schema = schemars::schema_for!(SpecDocument);
        write_output(&serde_json::to_string_pretty(&schema)?)?;
        return Ok(false);
    }

    let Some(spec_path) = args.spec.as_deref() else {
        anyhow::bail!("no spec file given");
    };
    let spec = load_spec(spec_path)
        .with_context(|| format!("Failed to load spec: {}", spec_path.display()))?;
    let connector = open_connector(&args)?;

    if args.spec_test {
        check_spec(&spec, connector.as_ref())?;
        if !args.quiet {
            write_output(&format!("Spec test passed: {}\n", spec_path.display()))?;
        }
        return Ok(false);
    }

    let statements = plan(&spec, connector.as_ref(), &args.filters())?;
    tracing::info!(statements = statements.len(), dry_run = args.dry, "plan ready");

    let results = execute_plan(
        connector.as_ref(),
        statements,
        ExecuteOptions { dry_run: args.dry },
    );

    let rendered = match args.format {
        OutputFormat::Json => format_json(&results, args.dry, args.compact)?,
        OutputFormat::Text => {
            let options = TextOptions {
                diff: args.diff,
                quiet: args.quiet,
                dry_run: args.dry,
            };
            format_text(&results, options, std::env::var_os("NO_COLOR").is_none())?
        }
    };
    write_output(&rendered)?;

    Ok(ExecutionSummary::from_results(&results).has_failures())
}

fn open_connector(args: &Args) -> Result<Box<dyn Connector>> {
    if let Some(path) = &args.state {
        return Ok(Box::new(connector::load_state(path)?));
    }
    let connection_string =
        resolve_connection_string(args.connection_string.as_deref(), &BotSettings::from_env())?;
    connector::connect(&connection_string)
}

fn write_output(content: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(content.as_bytes())
        .context("Failed to write output")?;
    if !content.ends_with('\n') {
        writeln!(stdout)?;
    }
    Ok(())
}
