//! Table and view privileges, including future grants at database and schema
//! granularity.
//!
//! Views only ever carry `select`, whatever list the expression came from.
//! Whether an object is a table or a view is decided from the same cached
//! enumeration that drove the wildcard expansion.

use super::DiffEngine;
use crate::connector::Connector;
use crate::error::ConnectorError;
use crate::identifiers::{canonical_name, is_wildcard, split_name};
use crate::types::{GrantTarget, ObjectKind, Privilege, ReadWrite, Statement};
use indexmap::IndexSet;
#[cfg(feature = "tracing")]
use tracing::debug;

static SELECT: [Privilege; 1] = [Privilege::Select];
static WRITE: [Privilege; 6] = [
    Privilege::Select,
    Privilege::Insert,
    Privilege::Update,
    Privilege::Delete,
    Privilege::Truncate,
    Privilege::References,
];

fn write_only() -> &'static [Privilege] {
    &WRITE[1..]
}

/// Everything one access level (read or write) ends up covering.
#[derive(Default)]
struct Desired {
    tables: IndexSet<GrantTarget>,
    views: IndexSet<GrantTarget>,
}

impl<C: Connector + ?Sized> DiffEngine<'_, C> {
    /// Diffs `privileges.tables` for one role.
    ///
    /// Expressions are exact (`db.schema.table`), schema wildcards
    /// (`db.schema.*`) or database wildcards (`db.*.*`). Revocation compares
    /// three things on their own: `select` on tables, `select` on views and
    /// the write-only table privileges.
    pub fn diff_tables_and_views(&self, role: &str, tables: &ReadWrite) -> Result<Vec<Statement>, ConnectorError> {
        let mut statements = Vec::new();
        let mut read = Desired::default();
        let mut write = Desired::default();

        for expression in &tables.read {
            self.grant_table_expression(role, expression, &SELECT, &mut statements, &mut read)?;
        }
        for expression in &tables.write {
            self.grant_table_expression(role, expression, &WRITE, &mut statements, &mut write)?;
        }

        let all_tables: IndexSet<GrantTarget> = read.tables.union(&write.tables).cloned().collect();
        let all_views: IndexSet<GrantTarget> = read.views.union(&write.views).cloned().collect();

        for target in self.stale_targets(role, &SELECT, &ObjectKind::Table, &all_tables) {
            statements.push(self.revoke(role, &SELECT, ObjectKind::Table, target));
        }
        for target in self.stale_targets(role, &SELECT, &ObjectKind::View, &all_views) {
            statements.push(self.revoke(role, &SELECT, ObjectKind::View, target));
        }
        for target in self.stale_targets(role, write_only(), &ObjectKind::Table, &write.tables) {
            statements.push(self.revoke(role, write_only(), ObjectKind::Table, target));
        }

        Ok(statements)
    }

    fn grant_table_expression(
        &self,
        role: &str,
        expression: &str,
        table_privileges: &[Privilege],
        statements: &mut Vec<Statement>,
        desired: &mut Desired,
    ) -> Result<(), ConnectorError> {
        let expression = canonical_name(expression);
        let parts = split_name(&expression);
        let [database, schema, table] = parts.as_slice() else {
            return Ok(());
        };
        if self.catalogue.is_shared(database) {
            #[cfg(feature = "tracing")]
            debug!(%role, table = %expression, "skipping table in shared database");
            return Ok(());
        }

        if schema == "*" && table == "*" {
            let future_table = GrantTarget::future_in_database(ObjectKind::Table, database.clone());
            let future_view = GrantTarget::future_in_database(ObjectKind::View, database.clone());
            statements.push(self.grant(role, table_privileges, ObjectKind::Table, future_table.clone()));
            statements.push(self.grant(role, &SELECT, ObjectKind::View, future_view.clone()));
            desired.tables.insert(future_table);
            desired.views.insert(future_view);
        }

        let schemas = self.expand_schemas(&format!("{database}.{schema}"))?;
        let mut tables = Vec::new();
        let mut views = Vec::new();

        if is_wildcard(table) {
            let prefix = table.trim_end_matches('*');
            let matches = |name: &String| {
                split_name(name)
                    .last()
                    .is_some_and(|segment| segment.starts_with(prefix))
            };
            for schema in schemas.iter() {
                tables.extend(self.live.tables(schema)?.iter().filter(|n| matches(n)).cloned());
                views.extend(self.live.views(schema)?.iter().filter(|n| matches(n)).cloned());

                if table == "*" {
                    let future_table = GrantTarget::future_in_schema(ObjectKind::Table, schema.clone());
                    let future_view = GrantTarget::future_in_schema(ObjectKind::View, schema.clone());
                    statements.push(self.grant(role, table_privileges, ObjectKind::Table, future_table.clone()));
                    statements.push(self.grant(role, &SELECT, ObjectKind::View, future_view.clone()));
                    desired.tables.insert(future_table);
                    desired.views.insert(future_view);
                }
            }
        } else {
            for schema in schemas.iter() {
                if self.live.tables(schema)?.contains(&expression) {
                    tables.push(expression.clone());
                }
                if self.live.views(schema)?.contains(&expression) {
                    views.push(expression.clone());
                }
            }
        }

        for name in tables {
            let target = GrantTarget::concrete(name);
            statements.push(self.grant(role, table_privileges, ObjectKind::Table, target.clone()));
            desired.tables.insert(target);
        }
        for name in views {
            let target = GrantTarget::concrete(name);
            statements.push(self.grant(role, &SELECT, ObjectKind::View, target.clone()));
            desired.views.insert(target);
        }
        Ok(())
    }
}
