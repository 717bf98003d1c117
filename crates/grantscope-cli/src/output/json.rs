//! JSON output formatting.

use grantscope_core::{ExecutedStatement, ExecutionSummary};
use serde::Serialize;

#[derive(Serialize)]
struct Report<'a> {
    dry_run: bool,
    summary: ExecutionSummary,
    statements: &'a [ExecutedStatement],
}

/// Format the run as a JSON document.
///
/// If `compact` is true, outputs minified JSON without whitespace.
pub fn format_json(
    results: &[ExecutedStatement],
    dry_run: bool,
    compact: bool,
) -> serde_json::Result<String> {
    let report = Report {
        dry_run,
        summary: ExecutionSummary::from_results(results),
        statements: results,
    };
    if compact {
        serde_json::to_string(&report)
    } else {
        serde_json::to_string_pretty(&report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grantscope_core::{Action, Grantee, RunStatus, Statement};

    fn results() -> Vec<ExecutedStatement> {
        let grant = Action::GrantRole {
            role: "loader".to_string(),
            grantee: Grantee::User("bot".to_string()),
        };
        vec![
            ExecutedStatement {
                statement: Statement::new(grant.clone(), false),
                status: RunStatus::Failed("insufficient privileges".to_string()),
            },
            ExecutedStatement {
                statement: Statement::new(grant, true),
                status: RunStatus::Skipped,
            },
        ]
    }

    #[test]
    fn pretty_report_carries_statuses() {
        let json = format_json(&results(), false, false).unwrap();
        assert!(json.contains('\n'));

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["summary"]["failed"], 1);
        assert_eq!(value["summary"]["skipped"], 1);
        assert_eq!(value["statements"][0]["sql"], "GRANT ROLE loader TO user bot");
        assert_eq!(value["statements"][0]["status"], "failed");
        assert_eq!(value["statements"][0]["error"], "insufficient privileges");
        assert_eq!(value["statements"][1]["already_granted"], true);
    }

    #[test]
    fn compact_report() {
        let json = format_json(&results(), true, true).unwrap();
        assert!(!json.contains('\n'));
        assert!(json.starts_with(r#"{"dry_run":true"#));
    }
}
