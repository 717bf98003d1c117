//! The reconciliation orchestrator.
//!
//! [`Reconciler`] walks the declared roles and users in document order,
//! runs the diff families for each one and concatenates the results.
//! [`plan`] is the end-to-end pipeline from a parsed document to a
//! de-duplicated statement list.

use crate::connector::Connector;
use crate::diff::DiffEngine;
use crate::entities::{inspect, EntityCatalogue, ROLE_WILDCARD};
use crate::error::{ConnectorError, PlanError, SpecLoadError};
use crate::identifiers::canonical_principal;
use crate::preflight::check_preconditions;
use crate::snapshot::{fetch_snapshot, GrantSnapshot};
use crate::types::{Action, Grantee, MemberOf, ObjectKind, RoleConfig, SpecDocument, Statement};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "tracing")]
use tracing::{debug, info};

/// Which entity kinds a run processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunList {
    pub roles: bool,
    pub users: bool,
}

impl Default for RunList {
    fn default() -> Self {
        Self {
            roles: true,
            users: true,
        }
    }
}

impl FromStr for RunList {
    type Err = String;

    /// Parses a comma-separated list such as `roles,users`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut list = RunList {
            roles: false,
            users: false,
        };
        for item in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match item {
                "roles" => list.roles = true,
                "users" => list.users = true,
                other => return Err(format!("unknown run-list entry `{other}` (expected roles or users)")),
            }
        }
        if !list.roles && !list.users {
            return Err("run-list must name roles, users or both".to_string());
        }
        Ok(list)
    }
}

impl fmt::Display for RunList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.roles, self.users) {
            (true, true) => f.write_str("roles,users"),
            (true, false) => f.write_str("roles"),
            (false, true) => f.write_str("users"),
            (false, false) => Ok(()),
        }
    }
}

/// Narrows a run to some roles and users.
///
/// Empty `roles`/`users` lists select everything of that kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunFilters {
    pub roles: Vec<String>,
    pub users: Vec<String>,
    pub run_list: RunList,
    pub ignore_memberships: bool,
}

impl RunFilters {
    pub fn selects_role(&self, role: &str) -> bool {
        self.roles.is_empty() || self.roles.iter().any(|r| canonical_principal(r) == role)
    }

    pub fn selects_user(&self, user: &str) -> bool {
        self.users.is_empty() || self.users.iter().any(|u| canonical_principal(u) == user)
    }
}

/// Runs every diff family for the declared roles and users.
pub struct Reconciler<'a, C: Connector + ?Sized> {
    spec: &'a SpecDocument,
    catalogue: &'a EntityCatalogue,
    connector: &'a C,
    filters: RunFilters,
}

impl<'a, C: Connector + ?Sized> Reconciler<'a, C> {
    pub fn new(spec: &'a SpecDocument, catalogue: &'a EntityCatalogue, connector: &'a C) -> Self {
        Self {
            spec,
            catalogue,
            connector,
            filters: RunFilters::default(),
        }
    }

    pub fn with_filters(mut self, filters: RunFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Produces the statements for one run, in processing order.
    ///
    /// Roles come first, then users. Per role: membership, ownership,
    /// warehouses, integrations, databases, schemas, tables. Per user: login,
    /// then membership. Roles with an empty configuration are skipped.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    pub fn reconcile(&self, snapshot: &GrantSnapshot) -> Result<Vec<Statement>, ConnectorError> {
        let engine = DiffEngine::new(self.catalogue, snapshot, self.connector)
            .ignore_memberships(self.filters.ignore_memberships);
        let mut live_roles: Option<Vec<String>> = None;
        let mut statements = Vec::new();

        if self.filters.run_list.roles {
            for entry in &self.spec.roles {
                let role = canonical_principal(&entry.name);
                if !self.filters.selects_role(&role) {
                    continue;
                }
                let config = &entry.config;
                if *config == RoleConfig::default() {
                    #[cfg(feature = "tracing")]
                    debug!(%role, "empty configuration, skipping");
                    continue;
                }
                #[cfg(feature = "tracing")]
                info!(%role, "processing role");

                let roles = self.live_roles_for(config.member_of.as_ref(), &mut live_roles)?;
                statements.extend(engine.diff_membership(
                    &Grantee::Role(role.clone()),
                    config.member_of.as_ref(),
                    roles,
                )?);
                statements.extend(engine.diff_ownership(&role, &config.owns)?);
                statements.extend(engine.diff_warehouses(&role, &config.warehouses)?);
                statements.extend(engine.diff_integrations(&role, &config.integrations)?);
                statements.extend(engine.diff_databases(&role, &config.privileges.databases)?);
                statements.extend(engine.diff_schemas(&role, &config.privileges.schemas)?);
                statements.extend(engine.diff_tables_and_views(&role, &config.privileges.tables)?);
            }
        }

        if self.filters.run_list.users {
            for entry in &self.spec.users {
                let user = canonical_principal(&entry.name);
                if !self.filters.selects_user(&user) {
                    continue;
                }
                #[cfg(feature = "tracing")]
                info!(%user, "processing user");

                let config = &entry.config;
                statements.extend(engine.diff_user_login(&user, config.can_login)?);
                let roles = self.live_roles_for(config.member_of.as_ref(), &mut live_roles)?;
                statements.extend(engine.diff_membership(
                    &Grantee::User(user.clone()),
                    config.member_of.as_ref(),
                    roles,
                )?);
            }
        }

        Ok(statements)
    }

    /// The live role list, fetched at most once and only for a `*` include.
    fn live_roles_for<'r>(
        &self,
        member_of: Option<&MemberOf>,
        cache: &'r mut Option<Vec<String>>,
    ) -> Result<&'r [String], ConnectorError> {
        let wildcard = member_of.is_some_and(|m| matches!(m.include(), [only] if only == ROLE_WILDCARD));
        if !wildcard || self.filters.ignore_memberships {
            return Ok(&[]);
        }
        if cache.is_none() {
            let roles = self
                .connector
                .list_roles()?
                .into_iter()
                .map(|role| role.name)
                .collect();
            *cache = Some(roles);
        }
        Ok(cache.as_deref().unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum DedupeKey {
    Ownership(ObjectKind, String),
    Revoke(String),
}

/// Keeps only the last ownership grant per object and the last copy of each
/// revoke. Everything else passes through in order.
pub fn dedupe(statements: Vec<Statement>) -> Vec<Statement> {
    let mut seen = HashSet::new();
    let mut kept: Vec<Statement> = statements
        .into_iter()
        .rev()
        .filter(|statement| {
            let key = match &statement.action {
                Action::GrantOwnership { kind, name, .. } => DedupeKey::Ownership(kind.clone(), name.clone()),
                Action::Revoke { .. } => DedupeKey::Revoke(statement.sql.clone()),
                _ => return true,
            };
            seen.insert(key)
        })
        .collect();
    kept.reverse();
    kept
}

/// Validates `spec` against itself and the warehouse.
pub fn check_spec<C: Connector + ?Sized>(
    spec: &SpecDocument,
    connector: &C,
) -> Result<EntityCatalogue, SpecLoadError> {
    let catalogue = inspect(spec)?;
    check_preconditions(connector, spec, &catalogue)?;
    Ok(catalogue)
}

/// Validates, fetches the snapshot, reconciles and de-duplicates.
pub fn plan<C: Connector + ?Sized>(
    spec: &SpecDocument,
    connector: &C,
    filters: &RunFilters,
) -> Result<Vec<Statement>, PlanError> {
    let catalogue = check_spec(spec, connector)?;
    let snapshot = fetch_snapshot(connector, &catalogue, filters)?;
    let statements = Reconciler::new(spec, &catalogue, connector)
        .with_filters(filters.clone())
        .reconcile(&snapshot)?;
    Ok(dedupe(statements))
}
