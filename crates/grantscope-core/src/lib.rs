//! Declarative Snowflake permission reconciliation.
//!
//! A run loads a YAML spec document ([`loader`]), validates it and collects
//! the entities it mentions ([`entities`]), checks the live warehouse
//! ([`preflight`]), reads the grants currently in effect ([`snapshot`]) and
//! diffs the two ([`diff`], [`reconcile`]). The result is an ordered list of
//! [`Statement`]s that [`execute`] can run through a [`Connector`].
//!
//! ```
//! use grantscope_core::{parse_spec, plan, MemoryConnector, RunFilters, WarehouseState};
//!
//! let spec = parse_spec("warehouses:\n  - loading: {size: small}\n").unwrap();
//! let connector = MemoryConnector::new(WarehouseState {
//!     current_role: "securityadmin".to_string(),
//!     warehouses: vec!["LOADING".to_string()],
//!     ..Default::default()
//! });
//! assert!(plan(&spec, &connector, &RunFilters::default()).unwrap().is_empty());
//! ```

pub mod connector;
pub mod diff;
pub mod entities;
pub mod error;
pub mod execute;
pub mod identifiers;
pub mod loader;
pub mod preflight;
pub mod reconcile;
pub mod snapshot;
pub mod types;

pub use connector::{Connector, GrantRow, MemoryConnector, RoleInfo, Scope, WarehouseState};
pub use diff::{DiffEngine, SYSTEM_ROLES};
pub use entities::{extract, inspect, EntityCatalogue};
pub use error::{ConnectorError, LoadError, LoadErrorKind, PlanError, SpecLoadError};
pub use execute::{execute_plan, ExecuteOptions, ExecutedStatement, ExecutionSummary, RunStatus};
pub use loader::{load_spec, parse_spec};
pub use preflight::{check_preconditions, ADMIN_ROLE};
pub use reconcile::{check_spec, dedupe, plan, Reconciler, RunFilters, RunList};
pub use snapshot::{fetch_snapshot, GrantSnapshot};

// Re-export types explicitly
pub use types::{
    Action, Container, DatabaseConfig, FutureScope, GrantTarget, Grantee, IntegrationConfig,
    MemberOf, Named, ObjectKind, Owns, Privilege, Privileges, ReadWrite, RoleConfig, SpecDocument,
    Statement, UserConfig, WarehouseConfig,
};
