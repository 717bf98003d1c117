//! Entity extraction and semantic validation.
//!
//! [`extract`] walks a structurally valid [`SpecDocument`] and builds the
//! [`EntityCatalogue`]: every declared entity, every entity mentioned by a
//! privilege, ownership or membership entry, and the derived database and
//! schema references. It then checks name shapes, reference resolution,
//! privilege consistency and (optionally) owner presence. Extraction never
//! stops early; all problems are returned together.

use crate::error::{LoadError, SpecLoadError};
use crate::identifiers::{canonical_name, canonical_principal, split_name};
use crate::types::{Named, RoleConfig, SpecDocument};
use std::collections::{BTreeMap, BTreeSet};
#[cfg(feature = "tracing")]
use tracing::debug;

/// The role wildcard accepted in `member_of`.
pub const ROLE_WILDCARD: &str = "*";

/// Normalized view of every entity a spec declares or mentions.
///
/// All names are canonical (see [`crate::identifiers`]).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityCatalogue {
    pub databases: BTreeSet<String>,
    pub shared_databases: BTreeSet<String>,
    pub warehouses: BTreeSet<String>,
    pub integrations: BTreeSet<String>,
    pub roles: BTreeSet<String>,
    pub users: BTreeSet<String>,

    pub database_refs: BTreeSet<String>,
    pub schema_refs: BTreeSet<String>,
    pub table_refs: BTreeSet<String>,
    pub role_refs: BTreeSet<String>,
    pub warehouse_refs: BTreeSet<String>,
    pub integration_refs: BTreeSet<String>,

    /// Table references grouped by their leading database segment.
    pub tables_by_database: BTreeMap<String, BTreeSet<String>>,

    pub require_owner: bool,
}

impl EntityCatalogue {
    pub fn is_shared(&self, database: &str) -> bool {
        self.shared_databases.contains(database)
    }

    pub fn declares_database(&self, database: &str) -> bool {
        self.databases.contains(database)
    }
}

/// Builds the catalogue and returns it together with every validation error.
#[cfg_attr(feature = "tracing", tracing::instrument(skip(spec)))]
pub fn extract(spec: &SpecDocument) -> (EntityCatalogue, Vec<LoadError>) {
    let mut catalogue = EntityCatalogue {
        require_owner: spec.require_owner,
        ..Default::default()
    };
    let mut errors = Vec::new();

    for entry in &spec.databases {
        let name = canonical_name(&entry.name);
        if entry.config.shared {
            catalogue.shared_databases.insert(name.clone());
        }
        catalogue.databases.insert(name);
    }
    for entry in &spec.warehouses {
        catalogue.warehouses.insert(canonical_name(&entry.name));
    }
    for entry in &spec.integrations {
        catalogue.integrations.insert(canonical_name(&entry.name));
    }

    for entry in &spec.roles {
        collect_role(entry, &mut catalogue, &mut errors);
    }

    for entry in &spec.users {
        catalogue.users.insert(canonical_principal(&entry.name));
        let config = &entry.config;
        if let Some(member_of) = &config.member_of {
            for role in member_of.mentioned() {
                catalogue.role_refs.insert(canonical_principal(role));
            }
        }
        collect_owns(&config.owns, &mut catalogue);
    }

    derive_implicit_refs(&mut catalogue);

    errors.extend(validate_names(&catalogue));
    errors.extend(validate_references(&catalogue));
    if catalogue.require_owner {
        errors.extend(validate_owners(spec));
    }

    (catalogue, errors)
}

/// Runs [`extract`] and fails if any validation error was found.
pub fn inspect(spec: &SpecDocument) -> Result<EntityCatalogue, SpecLoadError> {
    let (catalogue, errors) = extract(spec);
    SpecLoadError::check(errors)?;
    Ok(catalogue)
}

fn collect_role(entry: &Named<RoleConfig>, catalogue: &mut EntityCatalogue, errors: &mut Vec<LoadError>) {
    let role_name = &entry.name;
    let config = &entry.config;
    catalogue.roles.insert(canonical_principal(role_name));

    if let Some(member_of) = &config.member_of {
        for role in member_of.mentioned() {
            catalogue.role_refs.insert(canonical_principal(role));
        }
    }
    for warehouse in &config.warehouses {
        catalogue.warehouse_refs.insert(canonical_name(warehouse));
    }
    for integration in &config.integrations {
        catalogue.integration_refs.insert(canonical_name(integration));
    }

    let databases = &config.privileges.databases;
    for database in databases.all() {
        catalogue.database_refs.insert(canonical_name(database));
    }

    let read_databases: BTreeSet<String> = databases.read.iter().map(|d| canonical_name(d)).collect();
    let any_databases: BTreeSet<String> = databases.all().map(|d| canonical_name(d)).collect();

    let checks = [
        ("schema", "read", &config.privileges.schemas.read, &read_databases),
        ("schema", "write", &config.privileges.schemas.write, &any_databases),
        ("table", "read", &config.privileges.tables.read, &read_databases),
        ("table", "write", &config.privileges.tables.write, &any_databases),
    ];

    for (object, access, names, granted) in checks {
        for name in names {
            let canonical = canonical_name(name);
            let database = leading(&canonical);
            if !granted.contains(&database) {
                errors.push(LoadError::privilege(format!(
                    "Privilege Error: Database {database} referenced in {object} {access} \
                     privileges but not in database privileges for role {role_name}"
                )));
            }
            if object == "schema" {
                catalogue.schema_refs.insert(canonical);
            } else {
                catalogue.table_refs.insert(canonical);
            }
        }
    }

    collect_owns(&config.owns, catalogue);

    #[cfg(feature = "tracing")]
    debug!(
        role = %role_name,
        warehouses = config.warehouses.len(),
        databases = databases.read.len() + databases.write.len(),
        "collected role references"
    );
}

fn collect_owns(owns: &crate::types::Owns, catalogue: &mut EntityCatalogue) {
    for database in &owns.databases {
        catalogue.database_refs.insert(canonical_name(database));
    }
    for schema in &owns.schemas {
        catalogue.schema_refs.insert(canonical_name(schema));
    }
    for table in &owns.tables {
        catalogue.table_refs.insert(canonical_name(table));
    }
}

/// Every schema reference implies its database; every table reference
/// implies its schema and database.
fn derive_implicit_refs(catalogue: &mut EntityCatalogue) {
    for schema in &catalogue.schema_refs {
        let database = leading(schema);
        if database != "*" {
            catalogue.database_refs.insert(database);
        }
    }

    let mut implied_schemas = Vec::new();
    for table in &catalogue.table_refs {
        let parts = split_name(table);
        if parts[0] == "*" {
            continue;
        }
        catalogue.database_refs.insert(parts[0].clone());
        catalogue
            .tables_by_database
            .entry(parts[0].clone())
            .or_default()
            .insert(table.clone());
        if parts.len() >= 2 {
            implied_schemas.push(format!("{}.{}", parts[0], parts[1]));
        }
    }
    catalogue.schema_refs.extend(implied_schemas);
}

fn leading(name: &str) -> String {
    split_name(name).into_iter().next().unwrap_or_default()
}

fn validate_names(catalogue: &EntityCatalogue) -> Vec<LoadError> {
    let mut errors = Vec::new();

    for database in catalogue.databases.union(&catalogue.database_refs) {
        if split_name(database).len() != 1 {
            errors.push(LoadError::name(format!(
                "Name error: Not a valid database name: {database} (Proper definition: DB)"
            )));
        }
    }

    for schema in &catalogue.schema_refs {
        let parts = split_name(schema);
        if parts.len() != 2 || parts[0] == "*" {
            errors.push(LoadError::name(format!(
                "Name error: Not a valid schema name: {schema} (Proper definition: DB.[SCHEMA | *])"
            )));
        }
    }

    for table in &catalogue.table_refs {
        let parts = split_name(table);
        if parts.len() != 3 || parts[0] == "*" {
            errors.push(LoadError::name(format!(
                "Name error: Not a valid table name: {table} \
                 (Proper definition: DB.[SCHEMA | *].[TABLE | *])"
            )));
        } else if parts[1] == "*" && parts[2] != "*" {
            errors.push(LoadError::name(format!(
                "Name error: Not a valid table name: {table} (Can't have a Table name after \
                 selecting all schemas with *: DB.SCHEMA.[TABLE | *])"
            )));
        }
    }

    errors
}

fn validate_references(catalogue: &EntityCatalogue) -> Vec<LoadError> {
    let mut errors = Vec::new();

    for database in catalogue.database_refs.difference(&catalogue.databases) {
        errors.push(LoadError::reference(format!(
            "Reference error: Database {database} is referenced in the spec but not defined"
        )));
    }
    for role in catalogue.role_refs.difference(&catalogue.roles) {
        if role != ROLE_WILDCARD {
            errors.push(LoadError::reference(format!(
                "Reference error: Role {role} is referenced in the spec but not defined"
            )));
        }
    }
    for warehouse in catalogue.warehouse_refs.difference(&catalogue.warehouses) {
        errors.push(LoadError::reference(format!(
            "Reference error: Warehouse {warehouse} is referenced in the spec but not defined"
        )));
    }
    for integration in catalogue.integration_refs.difference(&catalogue.integrations) {
        errors.push(LoadError::reference(format!(
            "Reference error: Integration {integration} is referenced in the spec but not defined"
        )));
    }

    errors
}

fn validate_owners(spec: &SpecDocument) -> Vec<LoadError> {
    fn missing<'a, T>(
        kind: &'static str,
        entries: &'a [Named<T>],
        owner: impl Fn(&T) -> Option<&String> + 'a,
    ) -> impl Iterator<Item = LoadError> + 'a {
        entries
            .iter()
            .filter(move |entry| owner(&entry.config).is_none())
            .map(move |entry| {
                LoadError::owner(format!(
                    "Spec Error: Owner not defined for {kind} {} and require-owner is set!",
                    entry.name
                ))
            })
    }

    missing("databases", &spec.databases, |c| c.owner.as_ref())
        .chain(missing("roles", &spec.roles, |c| c.owner.as_ref()))
        .chain(missing("users", &spec.users, |c| c.owner.as_ref()))
        .chain(missing("warehouses", &spec.warehouses, |c| c.owner.as_ref()))
        .chain(missing("integrations", &spec.integrations, |c| c.owner.as_ref()))
        .collect()
}
