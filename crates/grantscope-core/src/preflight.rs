//! Checks against the live warehouse that gate planning.
//!
//! Connector failures while checking are reported as load errors so that one
//! report still lists everything that went wrong.

use crate::connector::{Connector, Scope};
use crate::entities::EntityCatalogue;
use crate::error::{ConnectorError, LoadError, LoadErrorKind, SpecLoadError};
use crate::identifiers::{canonical_principal, split_name};
use crate::types::SpecDocument;
use std::collections::{BTreeMap, BTreeSet};
#[cfg(feature = "tracing")]
use tracing::{debug, info};

/// The role every run must use.
pub const ADMIN_ROLE: &str = "securityadmin";

/// Runs every precondition and returns all failures together.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
pub fn check_preconditions<C: Connector + ?Sized>(
    connector: &C,
    spec: &SpecDocument,
    catalogue: &EntityCatalogue,
) -> Result<(), SpecLoadError> {
    let mut errors = Vec::new();

    collect(&mut errors, check_session(connector));
    collect(&mut errors, check_named(connector.list_warehouses(), "Warehouse", &catalogue.warehouses));
    collect(&mut errors, check_named(connector.list_databases(), "Database", &catalogue.databases));
    collect(&mut errors, check_schema_refs(connector, catalogue));
    collect(&mut errors, check_table_refs(connector, catalogue));
    collect(&mut errors, check_roles(connector, spec, catalogue));
    collect(&mut errors, check_named(connector.list_users(), "User", &catalogue.users));

    SpecLoadError::check(errors)
}

fn collect(errors: &mut Vec<LoadError>, result: Result<Vec<LoadError>, ConnectorError>) {
    match result {
        Ok(found) => errors.extend(found),
        Err(err) => errors.push(LoadError::new(LoadErrorKind::MissingEntity, err.to_string())),
    }
}

fn missing(kind: &str, name: &str) -> LoadError {
    LoadError::missing_entity(format!(
        "Missing Entity Error: {kind} {name} was not found on Snowflake Server. \
         Please create it before continuing."
    ))
}

fn check_session<C: Connector + ?Sized>(connector: &C) -> Result<Vec<LoadError>, ConnectorError> {
    let role = connector.current_role()?;
    #[cfg(feature = "tracing")]
    info!(user = %connector.current_user()?, %role, "session identity");

    if role == ADMIN_ROLE {
        return Ok(Vec::new());
    }
    Ok(vec![LoadError::new(
        LoadErrorKind::Permission,
        format!(
            "Current role is not {ADMIN_ROLE}! grantscope expects to run as {ADMIN_ROLE}, \
             please update your connection settings."
        ),
    )])
}

fn check_named(
    live: Result<Vec<String>, ConnectorError>,
    kind: &str,
    declared: &BTreeSet<String>,
) -> Result<Vec<LoadError>, ConnectorError> {
    if declared.is_empty() {
        #[cfg(feature = "tracing")]
        debug!(kind, "nothing declared, skipping lookup");
        return Ok(Vec::new());
    }
    let live: BTreeSet<String> = live?.into_iter().collect();
    Ok(declared
        .iter()
        .filter(|name| !live.contains(*name))
        .map(|name| missing(kind, name))
        .collect())
}

fn has_wildcard(name: &str) -> bool {
    split_name(name).iter().any(|segment| segment.contains('*'))
}

fn check_schema_refs<C: Connector + ?Sized>(
    connector: &C,
    catalogue: &EntityCatalogue,
) -> Result<Vec<LoadError>, ConnectorError> {
    let wanted: Vec<&String> = catalogue
        .schema_refs
        .iter()
        .filter(|name| !has_wildcard(name))
        .collect();
    if wanted.is_empty() {
        return Ok(Vec::new());
    }
    let live: BTreeSet<String> = connector.list_schemas(None)?.into_iter().collect();
    Ok(wanted
        .into_iter()
        .filter(|name| !live.contains(*name))
        .map(|name| missing("Schema", name))
        .collect())
}

fn check_table_refs<C: Connector + ?Sized>(
    connector: &C,
    catalogue: &EntityCatalogue,
) -> Result<Vec<LoadError>, ConnectorError> {
    let wanted: Vec<&String> = catalogue
        .table_refs
        .iter()
        .filter(|name| !has_wildcard(name))
        .collect();
    if wanted.is_empty() {
        return Ok(Vec::new());
    }
    let mut live: BTreeSet<String> = connector.list_tables(Scope::Account)?.into_iter().collect();
    live.extend(connector.list_views(Scope::Account)?);
    Ok(wanted
        .into_iter()
        .filter(|name| !live.contains(*name))
        .map(|name| missing("Table/View", name))
        .collect())
}

fn check_roles<C: Connector + ?Sized>(
    connector: &C,
    spec: &SpecDocument,
    catalogue: &EntityCatalogue,
) -> Result<Vec<LoadError>, ConnectorError> {
    if catalogue.roles.is_empty() {
        return Ok(Vec::new());
    }
    let live: BTreeMap<String, String> = connector
        .list_roles()?
        .into_iter()
        .map(|role| (role.name, role.owner))
        .collect();

    let mut errors = Vec::new();
    for entry in &spec.roles {
        let name = canonical_principal(&entry.name);
        match (live.get(&name), &entry.config.owner) {
            (None, _) => errors.push(missing("Role", &name)),
            (Some(actual), Some(declared)) if *actual != canonical_principal(declared) => {
                errors.push(LoadError::new(
                    LoadErrorKind::OwnerMismatch,
                    format!(
                        "Role {name} has owner {actual} on snowflake, but has owner {declared} \
                         defined in the spec file."
                    ),
                ));
            }
            _ => {}
        }
    }
    Ok(errors)
}
