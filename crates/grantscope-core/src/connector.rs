//! The warehouse access seam.
//!
//! The core never opens connections. Everything it needs from the warehouse
//! goes through [`Connector`]: read-only enumeration while planning, and a
//! single statement-execution entry point used by [`crate::execute`].
//!
//! Implementations must return canonical names (see [`crate::identifiers`])
//! and must report future grants as [`GrantTarget::Future`] rather than as
//! placeholder strings. [`parse_grant_target`] does that conversion for raw
//! `SHOW GRANTS` output.

mod cache;
mod memory;

pub use cache::EnumerationCache;
pub use memory::{GrantRow, MemoryConnector, WarehouseState};

use crate::error::ConnectorError;
use crate::identifiers::canonical_principal;
use crate::types::{Container, FutureScope, GrantTarget, ObjectKind, Privilege};
use serde::{Deserialize, Serialize};

/// Where to enumerate tables or views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    Account,
    Database(&'a str),
    /// Fully qualified `db.schema`.
    Schema(&'a str),
}

/// A role and the role that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleInfo {
    pub name: String,
    #[serde(default)]
    pub owner: String,
}

/// One privilege a role currently holds on a concrete object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub privilege: Privilege,
    pub kind: ObjectKind,
    pub target: GrantTarget,
}

/// One standing future grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FutureGrant {
    pub role: String,
    pub privilege: Privilege,
    pub scope: FutureScope,
}

/// Read-only warehouse enumeration plus statement execution.
pub trait Connector {
    fn list_databases(&self) -> Result<Vec<String>, ConnectorError>;

    fn list_warehouses(&self) -> Result<Vec<String>, ConnectorError>;

    /// Every role together with its owner.
    fn list_roles(&self) -> Result<Vec<RoleInfo>, ConnectorError>;

    fn list_users(&self) -> Result<Vec<String>, ConnectorError>;

    /// Fully qualified `db.schema` names, account-wide or in one database.
    fn list_schemas(&self, database: Option<&str>) -> Result<Vec<String>, ConnectorError>;

    /// Fully qualified `db.schema.table` names.
    fn list_tables(&self, scope: Scope<'_>) -> Result<Vec<String>, ConnectorError>;

    /// Fully qualified `db.schema.view` names.
    fn list_views(&self, scope: Scope<'_>) -> Result<Vec<String>, ConnectorError>;

    /// Grants held by `role` on concrete objects.
    fn grants_to_role(&self, role: &str) -> Result<Vec<Grant>, ConnectorError>;

    /// Future grants defined directly on `container`.
    fn future_grants(&self, container: &Container) -> Result<Vec<FutureGrant>, ConnectorError>;

    /// Roles currently granted to `user`.
    fn roles_of_user(&self, user: &str) -> Result<Vec<String>, ConnectorError>;

    fn current_user(&self) -> Result<String, ConnectorError>;

    fn current_role(&self) -> Result<String, ConnectorError>;

    /// Runs one statement against the warehouse.
    fn execute(&self, sql: &str) -> Result<(), ConnectorError>;
}

/// Converts a `SHOW GRANTS` name column into a canonical target.
///
/// Principals are compared as whole names; everything else is split into
/// segments, with `<schema>`/`<table>`/`<view>` placeholders turned into
/// future scopes.
pub fn parse_grant_target(kind: &ObjectKind, raw: &str) -> GrantTarget {
    match kind {
        ObjectKind::Role | ObjectKind::User => GrantTarget::Concrete(canonical_principal(raw)),
        _ => GrantTarget::parse(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_targets_are_not_split_on_dots() {
        assert_eq!(
            parse_grant_target(&ObjectKind::Role, "Data.Eng"),
            GrantTarget::concrete("\"Data.Eng\"")
        );
    }

    #[test]
    fn object_targets_detect_placeholders() {
        assert_eq!(
            parse_grant_target(&ObjectKind::Table, "RAW.EVENTS.<TABLE>"),
            GrantTarget::future_in_schema(ObjectKind::Table, "raw.events")
        );
        assert_eq!(
            parse_grant_target(&ObjectKind::Database, "RAW"),
            GrantTarget::concrete("raw")
        );
    }
}
