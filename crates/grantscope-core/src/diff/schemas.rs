//! Schema-level privileges, including future schemas.

use super::DiffEngine;
use crate::connector::Connector;
use crate::error::ConnectorError;
use crate::identifiers::{canonical_name, database_of, split_name};
use crate::types::{GrantTarget, ObjectKind, Privilege, ReadWrite, Statement};
use indexmap::IndexSet;
#[cfg(feature = "tracing")]
use tracing::debug;

static READ: [Privilege; 1] = [Privilege::Usage];
static WRITE: [Privilege; 9] = [
    Privilege::Usage,
    Privilege::Monitor,
    Privilege::CreateTable,
    Privilege::CreateView,
    Privilege::CreateStage,
    Privilege::CreateFileFormat,
    Privilege::CreateSequence,
    Privilege::CreateFunction,
    Privilege::CreatePipe,
];

fn write_only() -> &'static [Privilege] {
    &WRITE[1..]
}

impl<C: Connector + ?Sized> DiffEngine<'_, C> {
    /// Diffs `privileges.schemas` for one role.
    ///
    /// `db.*` grants on future schemas in the database plus every schema that
    /// exists today. Schemas in shared databases are skipped entirely.
    pub fn diff_schemas(&self, role: &str, schemas: &ReadWrite) -> Result<Vec<Statement>, ConnectorError> {
        let mut statements = Vec::new();
        let mut granted = IndexSet::new();
        let mut write_granted = IndexSet::new();

        for expression in &schemas.read {
            self.grant_schema_expression(role, expression, &READ, &mut statements, &mut granted)?;
        }
        for expression in &schemas.write {
            self.grant_schema_expression(role, expression, &WRITE, &mut statements, &mut write_granted)?;
        }
        granted.extend(write_granted.iter().cloned());

        for target in self.stale_targets(role, &READ, &ObjectKind::Schema, &granted) {
            statements.push(self.revoke(role, &READ, ObjectKind::Schema, target));
        }
        for target in self.stale_targets(role, write_only(), &ObjectKind::Schema, &write_granted) {
            statements.push(self.revoke(role, write_only(), ObjectKind::Schema, target));
        }

        Ok(statements)
    }

    fn grant_schema_expression(
        &self,
        role: &str,
        expression: &str,
        privileges: &[Privilege],
        statements: &mut Vec<Statement>,
        granted: &mut IndexSet<GrantTarget>,
    ) -> Result<(), ConnectorError> {
        let expression = canonical_name(expression);
        let database = database_of(&expression);
        if self.catalogue.is_shared(&database) {
            #[cfg(feature = "tracing")]
            debug!(%role, schema = %expression, "skipping schema in shared database");
            return Ok(());
        }

        if split_name(&expression).get(1).is_some_and(|segment| segment == "*") {
            let future = GrantTarget::future_in_database(ObjectKind::Schema, database);
            statements.push(self.grant(role, privileges, ObjectKind::Schema, future.clone()));
            granted.insert(future);
        }

        for schema in self.expand_schemas(&expression)?.iter() {
            let target = GrantTarget::concrete(schema.clone());
            statements.push(self.grant(role, privileges, ObjectKind::Schema, target.clone()));
            granted.insert(target);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::connector::{MemoryConnector, WarehouseState};
    use crate::diff::DiffEngine;
    use crate::entities::{inspect, EntityCatalogue};
    use crate::loader::parse_spec;
    use crate::snapshot::GrantSnapshot;
    use crate::types::{GrantTarget, ObjectKind, Privilege, ReadWrite, Statement};

    fn catalogue() -> EntityCatalogue {
        inspect(
            &parse_spec(
                r#"
databases:
  - raw: {shared: false}
  - share: {shared: true}
"#,
            )
            .unwrap(),
        )
        .unwrap()
    }

    fn connector() -> MemoryConnector {
        MemoryConnector::new(WarehouseState {
            schemas: vec![
                "raw.events".to_string(),
                "raw.staging".to_string(),
                "raw.information_schema".to_string(),
                "share.public".to_string(),
            ],
            ..Default::default()
        })
    }

    fn rw(read: &[&str], write: &[&str]) -> ReadWrite {
        ReadWrite {
            read: read.iter().map(|s| s.to_string()).collect(),
            write: write.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn sql(statements: &[Statement]) -> Vec<&str> {
        statements.iter().map(|s| s.sql.as_str()).collect()
    }

    #[test]
    fn database_wildcard_grants_future_and_existing_schemas() {
        let connector = connector();
        let catalogue = catalogue();
        let snapshot = GrantSnapshot::new();
        let engine = DiffEngine::new(&catalogue, &snapshot, &connector);

        let statements = engine.diff_schemas("r1", &rw(&["raw.*"], &[])).unwrap();
        assert_eq!(
            sql(&statements),
            vec![
                "GRANT usage ON FUTURE schemas IN database raw TO ROLE r1",
                "GRANT usage ON schema raw.events TO ROLE r1",
                "GRANT usage ON schema raw.staging TO ROLE r1",
            ]
        );
    }

    #[test]
    fn write_schema_grant_lists_every_privilege() {
        let connector = connector();
        let catalogue = catalogue();
        let snapshot = GrantSnapshot::new();
        let engine = DiffEngine::new(&catalogue, &snapshot, &connector);

        let statements = engine.diff_schemas("r1", &rw(&[], &["raw.events"])).unwrap();
        assert_eq!(
            sql(&statements),
            vec![
                "GRANT usage, monitor, create table, create view, create stage, create file format, \
                 create sequence, create function, create pipe ON schema raw.events TO ROLE r1"
            ]
        );
    }

    #[test]
    fn shared_database_schemas_are_skipped() {
        let connector = connector();
        let catalogue = catalogue();
        let mut snapshot = GrantSnapshot::new();
        snapshot.record_grant("r1", Privilege::Usage, ObjectKind::Schema, GrantTarget::concrete("share.public"));
        let engine = DiffEngine::new(&catalogue, &snapshot, &connector);

        let statements = engine.diff_schemas("r1", &rw(&["share.*"], &[])).unwrap();
        assert!(statements.is_empty(), "{:?}", sql(&statements));
    }

    #[test]
    fn schemas_covered_by_a_desired_future_grant_are_kept() {
        let connector = MemoryConnector::new(WarehouseState::default());
        let catalogue = catalogue();
        let mut snapshot = GrantSnapshot::new();
        snapshot.record_grant("r1", Privilege::Usage, ObjectKind::Schema, GrantTarget::concrete("raw.dropped"));
        let engine = DiffEngine::new(&catalogue, &snapshot, &connector);

        let statements = engine.diff_schemas("r1", &rw(&["raw.*"], &[])).unwrap();
        assert_eq!(
            sql(&statements),
            vec!["GRANT usage ON FUTURE schemas IN database raw TO ROLE r1"]
        );
    }

    #[test]
    fn stale_future_and_write_tier_grants_are_revoked() {
        let connector = connector();
        let catalogue = catalogue();
        let mut snapshot = GrantSnapshot::new();
        let future = GrantTarget::future_in_database(ObjectKind::Schema, "raw");
        snapshot.record_grant("r1", Privilege::Usage, ObjectKind::Schema, future.clone());
        snapshot.record_grant("r1", Privilege::Usage, ObjectKind::Schema, GrantTarget::concrete("raw.events"));
        snapshot.record_grant("r1", Privilege::Monitor, ObjectKind::Schema, GrantTarget::concrete("raw.events"));
        snapshot.record_grant("r1", Privilege::CreateTable, ObjectKind::Schema, GrantTarget::concrete("raw.events"));
        let engine = DiffEngine::new(&catalogue, &snapshot, &connector);

        let statements = engine.diff_schemas("r1", &rw(&["raw.events"], &[])).unwrap();
        assert_eq!(
            sql(&statements),
            vec![
                "GRANT usage ON schema raw.events TO ROLE r1",
                "REVOKE usage ON FUTURE schemas IN database raw FROM ROLE r1",
                "REVOKE monitor, create table, create view, create stage, create file format, \
                 create sequence, create function, create pipe ON schema raw.events FROM ROLE r1",
            ]
        );
        assert!(statements[0].already_granted);
    }
}
