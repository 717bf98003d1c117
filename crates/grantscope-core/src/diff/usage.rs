//! Warehouse and integration usage.

use super::{canonical_list, DiffEngine};
use crate::connector::Connector;
use crate::error::ConnectorError;
use crate::types::{GrantTarget, ObjectKind, Privilege, Statement};

static WAREHOUSE_PRIVILEGES: [Privilege; 3] = [Privilege::Usage, Privilege::Operate, Privilege::Monitor];

impl<C: Connector + ?Sized> DiffEngine<'_, C> {
    /// Each warehouse privilege is granted and revoked on its own, so a role
    /// can lose `operate` and keep `usage`.
    pub fn diff_warehouses(&self, role: &str, warehouses: &[String]) -> Result<Vec<Statement>, ConnectorError> {
        Ok(self.diff_usage(role, warehouses, ObjectKind::Warehouse, &WAREHOUSE_PRIVILEGES))
    }

    pub fn diff_integrations(&self, role: &str, integrations: &[String]) -> Result<Vec<Statement>, ConnectorError> {
        Ok(self.diff_usage(role, integrations, ObjectKind::Integration, &[Privilege::Usage]))
    }

    fn diff_usage(&self, role: &str, names: &[String], kind: ObjectKind, privileges: &[Privilege]) -> Vec<Statement> {
        let desired = canonical_list(names);
        let mut statements = Vec::new();

        for name in &desired {
            for privilege in privileges {
                statements.push(self.grant(
                    role,
                    std::slice::from_ref(privilege),
                    kind.clone(),
                    GrantTarget::concrete(name.clone()),
                ));
            }
        }

        for privilege in privileges {
            let stale: Vec<GrantTarget> = self
                .snapshot
                .targets(role, privilege, &kind)
                .filter(|target| target.as_concrete().is_some_and(|name| !desired.contains(name)))
                .cloned()
                .collect();
            for target in stale {
                statements.push(self.revoke(role, std::slice::from_ref(privilege), kind.clone(), target));
            }
        }

        statements
    }
}

#[cfg(test)]
mod tests {
    use crate::connector::{MemoryConnector, WarehouseState};
    use crate::diff::DiffEngine;
    use crate::entities::EntityCatalogue;
    use crate::snapshot::GrantSnapshot;
    use crate::types::{GrantTarget, ObjectKind, Privilege};

    #[test]
    fn warehouse_privileges_are_granted_one_by_one() {
        let connector = MemoryConnector::new(WarehouseState::default());
        let catalogue = EntityCatalogue::default();
        let mut snapshot = GrantSnapshot::new();
        snapshot.record_grant("loader", Privilege::Usage, ObjectKind::Warehouse, GrantTarget::concrete("loading"));
        let engine = DiffEngine::new(&catalogue, &snapshot, &connector);

        let statements = engine
            .diff_warehouses("loader", &["LOADING".to_string()])
            .unwrap();
        let rendered: Vec<_> = statements
            .iter()
            .map(|s| (s.sql.as_str(), s.already_granted))
            .collect();
        assert_eq!(
            rendered,
            vec![
                ("GRANT usage ON warehouse loading TO ROLE loader", true),
                ("GRANT operate ON warehouse loading TO ROLE loader", false),
                ("GRANT monitor ON warehouse loading TO ROLE loader", false),
            ]
        );
    }

    #[test]
    fn each_warehouse_privilege_is_revoked_independently() {
        let connector = MemoryConnector::new(WarehouseState::default());
        let catalogue = EntityCatalogue::default();
        let mut snapshot = GrantSnapshot::new();
        snapshot.record_grant("loader", Privilege::Usage, ObjectKind::Warehouse, GrantTarget::concrete("adhoc"));
        snapshot.record_grant("loader", Privilege::Monitor, ObjectKind::Warehouse, GrantTarget::concrete("adhoc"));
        let engine = DiffEngine::new(&catalogue, &snapshot, &connector);

        let statements = engine.diff_warehouses("loader", &[]).unwrap();
        let sql: Vec<_> = statements.iter().map(|s| s.sql.as_str()).collect();
        assert_eq!(
            sql,
            vec![
                "REVOKE usage ON warehouse adhoc FROM ROLE loader",
                "REVOKE monitor ON warehouse adhoc FROM ROLE loader",
            ]
        );
    }

    #[test]
    fn integrations_only_carry_usage() {
        let connector = MemoryConnector::new(WarehouseState::default());
        let catalogue = EntityCatalogue::default();
        let mut snapshot = GrantSnapshot::new();
        snapshot.record_grant("loader", Privilege::Usage, ObjectKind::Integration, GrantTarget::concrete("old_int"));
        let engine = DiffEngine::new(&catalogue, &snapshot, &connector);

        let statements = engine
            .diff_integrations("loader", &["s3_int".to_string()])
            .unwrap();
        let sql: Vec<_> = statements.iter().map(|s| s.sql.as_str()).collect();
        assert_eq!(
            sql,
            vec![
                "GRANT usage ON integration s3_int TO ROLE loader",
                "REVOKE usage ON integration old_int FROM ROLE loader",
            ]
        );
    }
}
