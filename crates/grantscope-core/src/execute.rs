//! Statement execution.
//!
//! Statements run one at a time in plan order. A failing statement is
//! recorded and the rest still run.

use crate::connector::Connector;
use crate::types::Statement;
use serde::Serialize;
#[cfg(feature = "tracing")]
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecuteOptions {
    /// Report what would run without touching the warehouse.
    pub dry_run: bool,
}

/// Outcome of one statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Failed(String),
    /// Already in effect, or not run because of a dry run.
    Skipped,
}

impl RunStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RunStatus::Success => "SUCCESS",
            RunStatus::Failed(_) => "ERROR",
            RunStatus::Skipped => "SKIPPED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutedStatement {
    #[serde(flatten)]
    pub statement: Statement,
    #[serde(flatten)]
    pub status: RunStatus,
}

/// Counts per outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl ExecutionSummary {
    pub fn from_results(results: &[ExecutedStatement]) -> Self {
        let mut summary = Self::default();
        for result in results {
            match result.status {
                RunStatus::Success => summary.succeeded += 1,
                RunStatus::Failed(_) => summary.failed += 1,
                RunStatus::Skipped => summary.skipped += 1,
            }
        }
        summary
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Runs every statement that is not already in effect.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(statements = statements.len())))]
pub fn execute_plan<C: Connector + ?Sized>(
    connector: &C,
    statements: Vec<Statement>,
    options: ExecuteOptions,
) -> Vec<ExecutedStatement> {
    statements
        .into_iter()
        .map(|statement| {
            let status = if statement.already_granted || options.dry_run {
                RunStatus::Skipped
            } else {
                match connector.execute(&statement.sql) {
                    Ok(()) => {
                        #[cfg(feature = "tracing")]
                        debug!(sql = %statement.sql, "executed");
                        RunStatus::Success
                    }
                    Err(err) => {
                        #[cfg(feature = "tracing")]
                        warn!(sql = %statement.sql, error = %err, "statement failed");
                        RunStatus::Failed(err.to_string())
                    }
                }
            };
            ExecutedStatement { statement, status }
        })
        .collect()
}
