//! The grant/revoke diff engine.
//!
//! Each resource family has its own diff procedure in a submodule, all with
//! the same shape: expand the desired expressions into concrete targets (and
//! future-grant scopes where wildcards are used), emit a grant for every
//! desired target with `already_granted` computed from the snapshot, then
//! emit a revoke for every tracked target the snapshot holds that is no
//! longer desired.
//!
//! The engine reads the catalogue and snapshot and never mutates them.
//! Wildcard expansion goes through an [`EnumerationCache`] owned by the
//! engine, so one engine sees one consistent view of the warehouse.

mod databases;
mod login;
mod membership;
mod ownership;
mod schemas;
mod tables;
mod usage;

pub use membership::SYSTEM_ROLES;

use crate::connector::{Connector, EnumerationCache};
use crate::entities::EntityCatalogue;
use crate::error::ConnectorError;
use crate::identifiers::{canonical_name, database_of, is_wildcard, schema_of, split_name};
use crate::snapshot::GrantSnapshot;
use crate::types::{Action, GrantTarget, ObjectKind, Privilege, Statement};
use indexmap::IndexSet;
use std::rc::Rc;

const INFORMATION_SCHEMA: &str = "information_schema";

/// Compares desired state against a [`GrantSnapshot`] and produces statements.
pub struct DiffEngine<'a, C: Connector + ?Sized> {
    catalogue: &'a EntityCatalogue,
    snapshot: &'a GrantSnapshot,
    live: EnumerationCache<'a, C>,
    ignore_memberships: bool,
}

impl<'a, C: Connector + ?Sized> DiffEngine<'a, C> {
    pub fn new(catalogue: &'a EntityCatalogue, snapshot: &'a GrantSnapshot, connector: &'a C) -> Self {
        Self {
            catalogue,
            snapshot,
            live: EnumerationCache::new(connector),
            ignore_memberships: false,
        }
    }

    /// Suppresses every GRANT ROLE / REVOKE ROLE statement and the user
    /// login toggle.
    pub fn ignore_memberships(mut self, ignore: bool) -> Self {
        self.ignore_memberships = ignore;
        self
    }

    /// A grant whose `already_granted` flag is the AND over every privilege.
    fn grant(&self, role: &str, privileges: &[Privilege], kind: ObjectKind, target: GrantTarget) -> Statement {
        let already_granted = self.snapshot.has_all(role, privileges, &kind, &target);
        Statement::new(
            Action::Grant {
                privileges: privileges.to_vec(),
                kind,
                target,
                role: role.to_string(),
            },
            already_granted,
        )
    }

    fn revoke(&self, role: &str, privileges: &[Privilege], kind: ObjectKind, target: GrantTarget) -> Statement {
        Statement::pending(Action::Revoke {
            privileges: privileges.to_vec(),
            kind,
            target,
            role: role.to_string(),
        })
    }

    /// The union of the snapshot's targets for several privileges, in order.
    fn held_targets(&self, role: &str, privileges: &[Privilege], kind: &ObjectKind) -> IndexSet<GrantTarget> {
        privileges
            .iter()
            .flat_map(|privilege| self.snapshot.targets(role, privilege, kind))
            .cloned()
            .collect()
    }

    /// Held targets that are no longer desired and may be revoked.
    ///
    /// Targets in shared or undeclared databases are left alone, and a
    /// concrete object is kept while a desired future grant covers it (see
    /// [`covering_future`]).
    fn stale_targets(
        &self,
        role: &str,
        privileges: &[Privilege],
        kind: &ObjectKind,
        desired: &IndexSet<GrantTarget>,
    ) -> Vec<GrantTarget> {
        self.held_targets(role, privileges, kind)
            .into_iter()
            .filter(|target| {
                if desired.contains(target) {
                    return false;
                }
                let database = target.database();
                if self.catalogue.is_shared(&database) || !self.catalogue.declares_database(&database) {
                    return false;
                }
                match target {
                    GrantTarget::Future(_) => true,
                    GrantTarget::Concrete(name) => !desired.contains(&covering_future(kind, name)),
                }
            })
            .collect()
    }

    /// Expands a `db.schema` expression into concrete schema names.
    ///
    /// `db.*` yields every schema in the database and `db.prefix*` every
    /// schema whose name starts with the prefix; both skip the information
    /// schema. Anything else is returned unchanged.
    fn expand_schemas(&self, expression: &str) -> Result<Rc<Vec<String>>, ConnectorError> {
        let parts = split_name(expression);
        let (database, schema) = match parts.as_slice() {
            [database, schema] => (database, schema),
            _ => return Ok(Rc::new(vec![expression.to_string()])),
        };
        if !is_wildcard(schema) {
            return Ok(Rc::new(vec![expression.to_string()]));
        }

        let prefix = schema.trim_end_matches('*');
        let live = self.live.schemas(database)?;
        Ok(Rc::new(
            live.iter()
                .filter(|name| {
                    let segment = split_name(name).pop().unwrap_or_default();
                    segment != INFORMATION_SCHEMA && segment.starts_with(prefix)
                })
                .cloned()
                .collect(),
        ))
    }
}

/// The future grant that covers a concrete object `name`: the database
/// future for a schema, the schema future for a table or view.
fn covering_future(kind: &ObjectKind, name: &str) -> GrantTarget {
    if split_name(name).len() >= 3 {
        GrantTarget::future_in_schema(kind.clone(), schema_of(name))
    } else {
        GrantTarget::future_in_database(kind.clone(), database_of(name))
    }
}

/// Canonicalizes a list of names, dropping duplicates but keeping order.
fn canonical_list(names: &[String]) -> IndexSet<String> {
    names.iter().map(|name| canonical_name(name)).collect()
}
