//! An in-memory [`Connector`] backed by a serializable warehouse description.
//!
//! Used for offline plans (`--state`) and throughout the test suite.

use super::{parse_grant_target, Connector, FutureGrant, Grant, RoleInfo, Scope};
use crate::error::ConnectorError;
use crate::identifiers::{canonical_name, canonical_principal, database_of, schema_of};
use crate::types::{Container, GrantTarget, ObjectKind, Privilege};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};

/// One row of `SHOW GRANTS TO ROLE` or `SHOW FUTURE GRANTS IN ...`.
///
/// Future grants use the warehouse's placeholder names, e.g.
/// `raw.<schema>` or `raw.events.<table>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantRow {
    pub role: String,
    pub privilege: Privilege,
    pub granted_on: ObjectKind,
    pub name: String,
}

impl GrantRow {
    pub fn new(
        role: &str,
        privilege: Privilege,
        granted_on: ObjectKind,
        name: &str,
    ) -> Self {
        Self {
            role: role.to_string(),
            privilege,
            granted_on,
            name: name.to_string(),
        }
    }

    fn target(&self) -> GrantTarget {
        parse_grant_target(&self.granted_on, &self.name)
    }
}

/// Everything [`MemoryConnector`] knows about the warehouse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseState {
    pub current_user: String,
    pub current_role: String,
    pub databases: Vec<String>,
    pub warehouses: Vec<String>,
    pub users: Vec<String>,
    pub roles: Vec<RoleInfo>,
    /// `db.schema` names.
    pub schemas: Vec<String>,
    /// `db.schema.table` names.
    pub tables: Vec<String>,
    /// `db.schema.view` names.
    pub views: Vec<String>,
    pub grants: Vec<GrantRow>,
    /// Roles granted to each user.
    pub user_roles: IndexMap<String, Vec<String>>,
}

/// Serves a [`WarehouseState`] through the [`Connector`] trait and records
/// executed statements.
#[derive(Debug, Default)]
pub struct MemoryConnector {
    state: WarehouseState,
    failing: Vec<String>,
    executed: RefCell<Vec<String>>,
    queries: Cell<usize>,
}

impl MemoryConnector {
    pub fn new(state: WarehouseState) -> Self {
        Self {
            state,
            ..Default::default()
        }
    }

    /// Makes [`Connector::execute`] fail for any statement containing `fragment`.
    pub fn fail_on(mut self, fragment: impl Into<String>) -> Self {
        self.failing.push(fragment.into());
        self
    }

    pub fn state(&self) -> &WarehouseState {
        &self.state
    }

    /// Statements passed to [`Connector::execute`], in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed.borrow().clone()
    }

    /// Number of enumeration calls served so far.
    pub fn query_count(&self) -> usize {
        self.queries.get()
    }

    fn count(&self) {
        self.queries.set(self.queries.get() + 1);
    }

    fn names(&self, names: &[String]) -> Vec<String> {
        self.count();
        names.iter().map(|name| canonical_name(name)).collect()
    }

    fn scoped(&self, names: &[String], scope: Scope<'_>) -> Vec<String> {
        self.names(names)
            .into_iter()
            .filter(|name| match scope {
                Scope::Account => true,
                Scope::Database(database) => database_of(name) == database,
                Scope::Schema(schema) => schema_of(name) == schema,
            })
            .collect()
    }
}

impl Connector for MemoryConnector {
    fn list_databases(&self) -> Result<Vec<String>, ConnectorError> {
        Ok(self.names(&self.state.databases))
    }

    fn list_warehouses(&self) -> Result<Vec<String>, ConnectorError> {
        Ok(self.names(&self.state.warehouses))
    }

    fn list_roles(&self) -> Result<Vec<RoleInfo>, ConnectorError> {
        self.count();
        Ok(self
            .state
            .roles
            .iter()
            .map(|role| RoleInfo {
                name: canonical_principal(&role.name),
                owner: canonical_principal(&role.owner),
            })
            .collect())
    }

    fn list_users(&self) -> Result<Vec<String>, ConnectorError> {
        self.count();
        Ok(self
            .state
            .users
            .iter()
            .map(|user| canonical_principal(user))
            .collect())
    }

    fn list_schemas(&self, database: Option<&str>) -> Result<Vec<String>, ConnectorError> {
        let scope = database.map_or(Scope::Account, Scope::Database);
        Ok(self.scoped(&self.state.schemas, scope))
    }

    fn list_tables(&self, scope: Scope<'_>) -> Result<Vec<String>, ConnectorError> {
        Ok(self.scoped(&self.state.tables, scope))
    }

    fn list_views(&self, scope: Scope<'_>) -> Result<Vec<String>, ConnectorError> {
        Ok(self.scoped(&self.state.views, scope))
    }

    fn grants_to_role(&self, role: &str) -> Result<Vec<Grant>, ConnectorError> {
        self.count();
        Ok(self
            .state
            .grants
            .iter()
            .filter(|row| canonical_principal(&row.role) == role)
            .filter_map(|row| match row.target() {
                GrantTarget::Future(_) => None,
                target => Some(Grant {
                    privilege: row.privilege.clone(),
                    kind: row.granted_on.clone(),
                    target,
                }),
            })
            .collect())
    }

    fn future_grants(&self, container: &Container) -> Result<Vec<FutureGrant>, ConnectorError> {
        self.count();
        Ok(self
            .state
            .grants
            .iter()
            .filter_map(|row| match row.target() {
                GrantTarget::Future(scope) if &scope.container == container => Some(FutureGrant {
                    role: canonical_principal(&row.role),
                    privilege: row.privilege.clone(),
                    scope,
                }),
                _ => None,
            })
            .collect())
    }

    fn roles_of_user(&self, user: &str) -> Result<Vec<String>, ConnectorError> {
        self.count();
        Ok(self
            .state
            .user_roles
            .iter()
            .filter(|(name, _)| canonical_principal(name) == user)
            .flat_map(|(_, roles)| roles.iter().map(|role| canonical_principal(role)))
            .collect())
    }

    fn current_user(&self) -> Result<String, ConnectorError> {
        Ok(canonical_principal(&self.state.current_user))
    }

    fn current_role(&self) -> Result<String, ConnectorError> {
        Ok(canonical_principal(&self.state.current_role))
    }

    fn execute(&self, sql: &str) -> Result<(), ConnectorError> {
        self.executed.borrow_mut().push(sql.to_string());
        match self.failing.iter().find(|fragment| sql.contains(fragment.as_str())) {
            Some(fragment) => Err(ConnectorError::query(
                sql,
                format!("simulated failure on `{fragment}`"),
            )),
            None => Ok(()),
        }
    }
}
