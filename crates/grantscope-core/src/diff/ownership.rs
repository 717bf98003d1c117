//! Ownership assertions. Ownership is granted (with `COPY CURRENT GRANTS`)
//! but never revoked.

use super::DiffEngine;
use crate::connector::Connector;
use crate::error::ConnectorError;
use crate::identifiers::{canonical_name, is_wildcard, schema_of, split_name};
use crate::types::{Action, GrantTarget, ObjectKind, Owns, Privilege, Statement};

impl<C: Connector + ?Sized> DiffEngine<'_, C> {
    pub fn diff_ownership(&self, role: &str, owns: &Owns) -> Result<Vec<Statement>, ConnectorError> {
        let mut statements = Vec::new();

        for database in &owns.databases {
            statements.push(self.grant_ownership(role, ObjectKind::Database, canonical_name(database)));
        }

        for expression in &owns.schemas {
            for schema in self.expand_schemas(&canonical_name(expression))?.iter() {
                statements.push(self.grant_ownership(role, ObjectKind::Schema, schema.clone()));
            }
        }

        for expression in &owns.tables {
            for (kind, name) in self.owned_objects(&canonical_name(expression))? {
                statements.push(self.grant_ownership(role, kind, name));
            }
        }

        Ok(statements)
    }

    /// Resolves a table expression into (table|view, name) pairs.
    ///
    /// An exact name that is not a known view is treated as a table; the
    /// warehouse reports it if it does not exist.
    fn owned_objects(&self, expression: &str) -> Result<Vec<(ObjectKind, String)>, ConnectorError> {
        let parts = split_name(expression);
        let [database, schema, table] = parts.as_slice() else {
            return Ok(Vec::new());
        };

        if !is_wildcard(table) {
            let views = self.live.views(&schema_of(expression))?;
            let kind = if views.contains(&expression.to_string()) {
                ObjectKind::View
            } else {
                ObjectKind::Table
            };
            return Ok(vec![(kind, expression.to_string())]);
        }

        let prefix = table.trim_end_matches('*');
        let matches = |name: &String| {
            split_name(name)
                .last()
                .is_some_and(|segment| segment.starts_with(prefix))
        };
        let mut objects = Vec::new();
        for schema in self.expand_schemas(&format!("{database}.{schema}"))?.iter() {
            for name in self.live.tables(schema)?.iter().filter(|n| matches(n)) {
                objects.push((ObjectKind::Table, name.clone()));
            }
            for name in self.live.views(schema)?.iter().filter(|n| matches(n)) {
                objects.push((ObjectKind::View, name.clone()));
            }
        }
        Ok(objects)
    }

    fn grant_ownership(&self, role: &str, kind: ObjectKind, name: String) -> Statement {
        let already_granted = self.snapshot.has(
            role,
            &Privilege::Ownership,
            &kind,
            &GrantTarget::concrete(name.clone()),
        );
        Statement::new(
            Action::GrantOwnership {
                kind,
                name,
                role: role.to_string(),
            },
            already_granted,
        )
    }
}
