//! CLI argument parsing using clap.

use clap::{ArgAction, Parser, ValueEnum};
use grantscope_core::{RunFilters, RunList};
use std::path::PathBuf;

/// GrantScope - declarative Snowflake permission reconciler
#[derive(Parser, Debug)]
#[command(name = "grantscope")]
#[command(about = "Reconcile Snowflake grants with a YAML spec", long_about = None)]
#[command(version)]
pub struct Args {
    /// Spec file describing the desired permissions
    #[arg(value_name = "SPEC", required_unless_present = "print_schema")]
    pub spec: Option<PathBuf>,

    /// Plan only; print the statements without running them
    #[arg(long)]
    pub dry: bool,

    /// Also show statements that are already in effect, diff-style
    #[arg(long)]
    pub diff: bool,

    /// Only process this role (can be repeated)
    #[arg(long = "role", value_name = "ROLE")]
    pub roles: Vec<String>,

    /// Only process this user (can be repeated)
    #[arg(long = "user", value_name = "USER")]
    pub users: Vec<String>,

    /// Entity kinds to process
    #[arg(long, value_name = "LIST", default_value = "roles,users")]
    pub run_list: RunList,

    /// Never grant or revoke role memberships
    #[arg(long)]
    pub ignore_memberships: bool,

    /// Validate the spec and the warehouse preconditions, then stop
    #[arg(long)]
    pub spec_test: bool,

    /// Offline warehouse description (JSON) to plan against instead of a live connection
    #[arg(long, value_name = "FILE")]
    pub state: Option<PathBuf>,

    /// ODBC connection string for the Snowflake driver
    #[arg(long, value_name = "DSN", env = "GRANTSCOPE_CONNECTION_STRING", hide_env_values = true)]
    pub connection_string: Option<String>,

    /// Output format
    #[arg(short, long, default_value = "text", value_enum)]
    pub format: OutputFormat,

    /// Compact JSON output (no pretty-printing)
    #[arg(short, long)]
    pub compact: bool,

    /// Only print failures and the summary
    #[arg(short, long)]
    pub quiet: bool,

    /// Print the JSON Schema of the spec document and exit
    #[arg(long)]
    pub print_schema: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn filters(&self) -> RunFilters {
        RunFilters {
            roles: self.roles.clone(),
            users: self.users.clone(),
            run_list: self.run_list,
            ignore_memberships: self.ignore_memberships,
        }
    }
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Status lines followed by a summary table
    Text,
    /// JSON document with every statement and its status
    Json,
}
