//! Database-level privileges.

use super::{canonical_list, DiffEngine};
use crate::connector::Connector;
use crate::error::ConnectorError;
use crate::types::{Action, GrantTarget, ObjectKind, Privilege, ReadWrite, Statement};
#[cfg(feature = "tracing")]
use tracing::debug;

static READ: [Privilege; 1] = [Privilege::Usage];
static WRITE: [Privilege; 3] = [Privilege::Usage, Privilege::Monitor, Privilege::CreateSchema];
static WRITE_ONLY: [Privilege; 2] = [Privilege::Monitor, Privilege::CreateSchema];

impl<C: Connector + ?Sized> DiffEngine<'_, C> {
    /// Diffs `privileges.databases` for one role.
    ///
    /// Shared databases only ever see `imported privileges`. Revocation runs
    /// in two independent tiers: `usage` against read ∪ write, then
    /// `monitor, create schema` against write alone, so a write → read
    /// downgrade keeps `usage`. Only databases declared in the document are
    /// ever revoked.
    pub fn diff_databases(&self, role: &str, databases: &ReadWrite) -> Result<Vec<Statement>, ConnectorError> {
        let read = canonical_list(&databases.read);
        let write = canonical_list(&databases.write);
        let mut statements = Vec::new();

        for (database, privileges) in read
            .iter()
            .map(|db| (db, &READ[..]))
            .chain(write.iter().map(|db| (db, &WRITE[..])))
        {
            let target = GrantTarget::concrete(database.clone());
            if self.catalogue.is_shared(database) {
                statements.push(self.grant_imported(role, target));
            } else {
                statements.push(self.grant(role, privileges, ObjectKind::Database, target));
            }
        }

        for target in self.held_targets(role, &READ, &ObjectKind::Database) {
            let Some(database) = target.as_concrete() else {
                continue;
            };
            if !self.catalogue.declares_database(database) || read.contains(database) || write.contains(database) {
                continue;
            }
            let privileges = if self.catalogue.is_shared(database) {
                vec![Privilege::ImportedPrivileges]
            } else {
                READ.to_vec()
            };
            statements.push(self.revoke(role, &privileges, ObjectKind::Database, target));
        }

        for target in self.held_targets(role, &WRITE_ONLY, &ObjectKind::Database) {
            let Some(database) = target.as_concrete() else {
                continue;
            };
            if !self.catalogue.declares_database(database) || write.contains(database) {
                continue;
            }
            if self.catalogue.is_shared(database) {
                #[cfg(feature = "tracing")]
                debug!(%role, %database, "shared database has no write tier to revoke");
                continue;
            }
            statements.push(self.revoke(role, &WRITE_ONLY, ObjectKind::Database, target));
        }

        Ok(statements)
    }

    /// Shared databases report `imported privileges` as `usage`.
    fn grant_imported(&self, role: &str, target: GrantTarget) -> Statement {
        let already_granted = self
            .snapshot
            .has(role, &Privilege::Usage, &ObjectKind::Database, &target);
        Statement::new(
            Action::Grant {
                privileges: vec![Privilege::ImportedPrivileges],
                kind: ObjectKind::Database,
                target,
                role: role.to_string(),
            },
            already_granted,
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::connector::{MemoryConnector, WarehouseState};
    use crate::diff::DiffEngine;
    use crate::entities::inspect;
    use crate::loader::parse_spec;
    use crate::snapshot::GrantSnapshot;
    use crate::types::{GrantTarget, ObjectKind, Privilege, ReadWrite};

    fn catalogue() -> crate::entities::EntityCatalogue {
        inspect(
            &parse_spec(
                r#"
databases:
  - db1: {shared: false}
  - db2: {shared: false}
  - share: {shared: true}
"#,
            )
            .unwrap(),
        )
        .unwrap()
    }

    fn rw(read: &[&str], write: &[&str]) -> ReadWrite {
        ReadWrite {
            read: read.iter().map(|s| s.to_string()).collect(),
            write: write.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn render(statements: &[crate::types::Statement]) -> Vec<(String, bool)> {
        statements
            .iter()
            .map(|s| (s.sql.clone(), s.already_granted))
            .collect()
    }

    #[test]
    fn downgrade_from_write_to_read_keeps_usage() {
        let connector = MemoryConnector::new(WarehouseState::default());
        let catalogue = catalogue();
        let mut snapshot = GrantSnapshot::new();
        for privilege in [Privilege::Usage, Privilege::Monitor, Privilege::CreateSchema] {
            snapshot.record_grant("r1", privilege, ObjectKind::Database, GrantTarget::concrete("db1"));
        }
        let engine = DiffEngine::new(&catalogue, &snapshot, &connector);

        let statements = engine.diff_databases("r1", &rw(&["db1"], &[])).unwrap();
        assert_eq!(
            render(&statements),
            vec![
                ("GRANT usage ON database db1 TO ROLE r1".to_string(), true),
                ("REVOKE monitor, create schema ON database db1 FROM ROLE r1".to_string(), false),
            ]
        );
    }

    #[test]
    fn write_grant_is_already_granted_only_when_every_privilege_is_held() {
        let connector = MemoryConnector::new(WarehouseState::default());
        let catalogue = catalogue();
        let mut snapshot = GrantSnapshot::new();
        snapshot.record_grant("r1", Privilege::Usage, ObjectKind::Database, GrantTarget::concrete("db1"));
        snapshot.record_grant("r1", Privilege::Monitor, ObjectKind::Database, GrantTarget::concrete("db1"));
        let engine = DiffEngine::new(&catalogue, &snapshot, &connector);

        let statements = engine.diff_databases("r1", &rw(&[], &["db1"])).unwrap();
        assert_eq!(
            render(&statements),
            vec![(
                "GRANT usage, monitor, create schema ON database db1 TO ROLE r1".to_string(),
                false
            )]
        );
    }

    #[test]
    fn shared_databases_collapse_to_imported_privileges() {
        let connector = MemoryConnector::new(WarehouseState::default());
        let catalogue = catalogue();
        let mut snapshot = GrantSnapshot::new();
        snapshot.record_grant("r1", Privilege::Usage, ObjectKind::Database, GrantTarget::concrete("share"));
        let engine = DiffEngine::new(&catalogue, &snapshot, &connector);

        let statements = engine.diff_databases("r1", &rw(&[], &["share"])).unwrap();
        assert_eq!(
            render(&statements),
            vec![("GRANT imported privileges ON database share TO ROLE r1".to_string(), true)]
        );

        let statements = engine.diff_databases("r1", &rw(&[], &[])).unwrap();
        assert_eq!(
            render(&statements),
            vec![("REVOKE imported privileges ON database share FROM ROLE r1".to_string(), false)]
        );
    }

    #[test]
    fn undeclared_databases_are_never_revoked() {
        let connector = MemoryConnector::new(WarehouseState::default());
        let catalogue = catalogue();
        let mut snapshot = GrantSnapshot::new();
        snapshot.record_grant("r1", Privilege::Usage, ObjectKind::Database, GrantTarget::concrete("elsewhere"));
        snapshot.record_grant("r1", Privilege::Usage, ObjectKind::Database, GrantTarget::concrete("db2"));
        let engine = DiffEngine::new(&catalogue, &snapshot, &connector);

        let statements = engine.diff_databases("r1", &rw(&[], &[])).unwrap();
        assert_eq!(
            render(&statements),
            vec![("REVOKE usage ON database db2 FROM ROLE r1".to_string(), false)]
        );
    }
}
