//! Human-readable run output with optional colors.

use grantscope_core::{ExecutedStatement, ExecutionSummary, RunStatus};
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;
use std::fmt::{self, Write};
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Debug, Clone, Copy, Default)]
pub struct TextOptions {
    /// Show already-granted statements too, with `+ ` marking new ones.
    pub diff: bool,
    /// Only failures and the summary.
    pub quiet: bool,
    pub dry_run: bool,
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Outcome")]
    outcome: &'static str,
    #[tabled(rename = "Statements")]
    count: usize,
}

/// Format the executed plan, one line per statement followed by a summary.
pub fn format_text(
    results: &[ExecutedStatement],
    options: TextOptions,
    use_colors: bool,
) -> Result<String, fmt::Error> {
    let colored = use_colors && std::io::stdout().is_terminal();
    let mut out = String::new();

    if options.dry_run && !options.quiet {
        let banner = "Dry run: no statements were executed";
        if colored {
            writeln!(out, "{}", banner.yellow())?;
        } else {
            writeln!(out, "{banner}")?;
        }
    }

    for result in results.iter().filter(|r| is_visible(r, options)) {
        write_statement(&mut out, result, options, colored)?;
    }

    writeln!(out)?;
    write_summary(&mut out, &ExecutionSummary::from_results(results))?;
    Ok(out)
}

fn is_visible(result: &ExecutedStatement, options: TextOptions) -> bool {
    if options.quiet {
        return matches!(result.status, RunStatus::Failed(_));
    }
    options.diff || !result.statement.already_granted
}

fn write_statement(
    out: &mut String,
    result: &ExecutedStatement,
    options: TextOptions,
    colored: bool,
) -> fmt::Result {
    if options.diff {
        let marker = if result.statement.already_granted { "  " } else { "+ " };
        if colored && !result.statement.already_granted {
            write!(out, "{}", marker.green())?;
        } else {
            write!(out, "{marker}")?;
        }
    }

    let label = format!("[{}]", result.status.label());
    if colored {
        match result.status {
            RunStatus::Success => write!(out, "{}", label.green().bold())?,
            RunStatus::Failed(_) => write!(out, "{}", label.red().bold())?,
            RunStatus::Skipped => write!(out, "{}", label.dimmed())?,
        }
    } else {
        write!(out, "{label}")?;
    }
    writeln!(out, " {}", result.statement.sql)?;

    if let RunStatus::Failed(message) = &result.status {
        if colored {
            writeln!(out, "    {}", message.red())?;
        } else {
            writeln!(out, "    {message}")?;
        }
    }
    Ok(())
}

fn write_summary(out: &mut String, summary: &ExecutionSummary) -> fmt::Result {
    let rows = [
        SummaryRow {
            outcome: "succeeded",
            count: summary.succeeded,
        },
        SummaryRow {
            outcome: "failed",
            count: summary.failed,
        },
        SummaryRow {
            outcome: "skipped",
            count: summary.skipped,
        },
    ];
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    writeln!(out, "{table}")
}
