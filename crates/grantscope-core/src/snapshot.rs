//! The actual-state snapshot the diff engine compares against.
//!
//! A [`GrantSnapshot`] is assembled once per run by [`fetch_snapshot`] and is
//! read-only while diffing. Every lookup treats a missing role, privilege or
//! object kind as "nothing granted".

use crate::connector::{Connector, Grant};
use crate::entities::EntityCatalogue;
use crate::error::ConnectorError;
use crate::reconcile::RunFilters;
use crate::types::{Action, Container, GrantTarget, Grantee, ObjectKind, Privilege};
use indexmap::{IndexMap, IndexSet};
#[cfg(feature = "tracing")]
use tracing::{debug, info};

/// Grants held by one role, keyed by (privilege, object kind).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleGrants {
    entries: IndexMap<(Privilege, ObjectKind), IndexSet<GrantTarget>>,
}

impl RoleGrants {
    pub fn insert(&mut self, privilege: Privilege, kind: ObjectKind, target: GrantTarget) -> bool {
        self.entries.entry((privilege, kind)).or_default().insert(target)
    }

    pub fn remove(&mut self, privilege: &Privilege, kind: &ObjectKind, target: &GrantTarget) -> bool {
        self.entries
            .get_mut(&(privilege.clone(), kind.clone()))
            .is_some_and(|targets| targets.shift_remove(target))
    }

    pub fn targets(&self, privilege: &Privilege, kind: &ObjectKind) -> impl Iterator<Item = &GrantTarget> {
        self.entries
            .get(&(privilege.clone(), kind.clone()))
            .into_iter()
            .flatten()
    }

    pub fn contains(&self, privilege: &Privilege, kind: &ObjectKind, target: &GrantTarget) -> bool {
        self.entries
            .get(&(privilege.clone(), kind.clone()))
            .is_some_and(|targets| targets.contains(target))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(IndexSet::is_empty)
    }
}

/// Grants per role and role memberships per user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantSnapshot {
    roles: IndexMap<String, RoleGrants>,
    user_roles: IndexMap<String, IndexSet<String>>,
}

impl GrantSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `role` holds `privilege` on `target`.
    pub fn record_grant(&mut self, role: &str, privilege: Privilege, kind: ObjectKind, target: GrantTarget) {
        self.roles
            .entry(role.to_string())
            .or_default()
            .insert(privilege, kind, target);
    }

    /// Records that `user` holds `role`.
    pub fn record_user_role(&mut self, user: &str, role: &str) {
        self.user_roles
            .entry(user.to_string())
            .or_default()
            .insert(role.to_string());
    }

    pub fn role(&self, role: &str) -> Option<&RoleGrants> {
        self.roles.get(role)
    }

    /// Targets of `privilege` on `kind` held by `role`, in fetch order.
    pub fn targets<'s>(
        &'s self,
        role: &str,
        privilege: &Privilege,
        kind: &ObjectKind,
    ) -> impl Iterator<Item = &'s GrantTarget> + 's {
        let privilege = privilege.clone();
        let kind = kind.clone();
        self.roles
            .get(role)
            .into_iter()
            .flat_map(move |grants| grants.targets(&privilege, &kind).collect::<Vec<_>>())
    }

    pub fn has(&self, role: &str, privilege: &Privilege, kind: &ObjectKind, target: &GrantTarget) -> bool {
        self.roles
            .get(role)
            .is_some_and(|grants| grants.contains(privilege, kind, target))
    }

    /// True when every privilege in `privileges` is held.
    pub fn has_all(
        &self,
        role: &str,
        privileges: &[Privilege],
        kind: &ObjectKind,
        target: &GrantTarget,
    ) -> bool {
        privileges
            .iter()
            .all(|privilege| self.has(role, privilege, kind, target))
    }

    /// Roles currently granted to `user`, in fetch order.
    pub fn roles_of_user(&self, user: &str) -> impl Iterator<Item = &String> {
        self.user_roles.get(user).into_iter().flatten()
    }

    pub fn user_has_role(&self, user: &str, role: &str) -> bool {
        self.user_roles
            .get(user)
            .is_some_and(|roles| roles.contains(role))
    }

    /// Applies the effect of a statement, as if it had run successfully.
    ///
    /// Shared databases report `imported privileges` as `usage`, so that is
    /// how it is recorded here too.
    pub fn apply(&mut self, action: &Action) {
        match action {
            Action::GrantRole { role, grantee } => match grantee {
                Grantee::Role(name) => self.record_grant(
                    name,
                    Privilege::Usage,
                    ObjectKind::Role,
                    GrantTarget::concrete(role.clone()),
                ),
                Grantee::User(name) => self.record_user_role(name, role),
            },
            Action::RevokeRole { role, grantee } => match grantee {
                Grantee::Role(name) => {
                    if let Some(grants) = self.roles.get_mut(name) {
                        grants.remove(
                            &Privilege::Usage,
                            &ObjectKind::Role,
                            &GrantTarget::concrete(role.clone()),
                        );
                    }
                }
                Grantee::User(name) => {
                    if let Some(roles) = self.user_roles.get_mut(name) {
                        roles.shift_remove(role);
                    }
                }
            },
            Action::Grant {
                privileges,
                kind,
                target,
                role,
            } => {
                for privilege in privileges {
                    self.record_grant(role, as_recorded(privilege), kind.clone(), target.clone());
                }
            }
            Action::Revoke {
                privileges,
                kind,
                target,
                role,
            } => {
                if let Some(grants) = self.roles.get_mut(role) {
                    for privilege in privileges {
                        grants.remove(&as_recorded(privilege), kind, target);
                    }
                }
            }
            Action::GrantOwnership { kind, name, role } => {
                let target = GrantTarget::concrete(name.clone());
                for grants in self.roles.values_mut() {
                    grants.remove(&Privilege::Ownership, kind, &target);
                }
                self.record_grant(role, Privilege::Ownership, kind.clone(), target);
            }
            Action::SetLoginDisabled { .. } => {}
        }
    }
}

fn as_recorded(privilege: &Privilege) -> Privilege {
    match privilege {
        Privilege::ImportedPrivileges => Privilege::Usage,
        other => other.clone(),
    }
}

/// Whether a grant on `target` concerns something the spec manages.
///
/// Databases, warehouses and integrations must be referenced by the spec;
/// database-scoped objects must live in a referenced database. Account-level
/// grants and grants on principals are always kept.
pub fn is_tracked(catalogue: &EntityCatalogue, kind: &ObjectKind, target: &GrantTarget) -> bool {
    match kind {
        ObjectKind::Account | ObjectKind::Role | ObjectKind::User => true,
        ObjectKind::Database => target
            .as_concrete()
            .is_some_and(|name| catalogue.database_refs.contains(name)),
        ObjectKind::Warehouse => target
            .as_concrete()
            .is_some_and(|name| catalogue.warehouse_refs.contains(name)),
        ObjectKind::Integration => target
            .as_concrete()
            .is_some_and(|name| catalogue.integration_refs.contains(name)),
        _ => catalogue.database_refs.contains(&target.database()),
    }
}

/// Reads the current grants for everything the run will diff.
///
/// User memberships are read for the selected users unless memberships are
/// ignored. Future grants are read for every referenced database and every
/// schema inside it, then ordinary grants for every selected role. Grants on
/// objects the spec does not reference are dropped.
#[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
pub fn fetch_snapshot<C: Connector + ?Sized>(
    connector: &C,
    catalogue: &EntityCatalogue,
    filters: &RunFilters,
) -> Result<GrantSnapshot, ConnectorError> {
    let mut snapshot = GrantSnapshot::new();

    if filters.run_list.users && !filters.ignore_memberships {
        #[cfg(feature = "tracing")]
        info!("fetching user memberships");
        for user in catalogue.users.iter().filter(|u| filters.selects_user(u)) {
            for role in connector.roles_of_user(user)? {
                snapshot.record_user_role(user, &role);
            }
        }
    }

    if !filters.run_list.roles {
        return Ok(snapshot);
    }

    #[cfg(feature = "tracing")]
    info!("fetching role privileges");
    for database in &catalogue.database_refs {
        let mut containers = vec![Container::Database(database.clone())];
        containers.extend(
            connector
                .list_schemas(Some(database))?
                .into_iter()
                .map(Container::Schema),
        );

        for container in &containers {
            for future in connector.future_grants(container)? {
                if !filters.selects_role(&future.role) {
                    continue;
                }
                let kind = future.scope.kind.clone();
                snapshot.record_grant(&future.role, future.privilege, kind, GrantTarget::Future(future.scope));
            }
        }
    }

    for role in catalogue.roles.iter().filter(|r| filters.selects_role(r)) {
        let grants = connector.grants_to_role(role)?;
        #[cfg(feature = "tracing")]
        debug!(%role, grants = grants.len(), "fetched grants");
        for Grant {
            privilege,
            kind,
            target,
        } in grants
        {
            if is_tracked(catalogue, &kind, &target) {
                snapshot.record_grant(role, privilege, kind, target);
            }
        }
    }

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::{GrantRow, MemoryConnector, WarehouseState};
    use crate::entities::inspect;
    use crate::loader::parse_spec;
    use indexmap::IndexMap;

    fn catalogue() -> EntityCatalogue {
        inspect(
            &parse_spec(
                r#"
databases:
  - raw: {shared: false}
warehouses:
  - loading: {size: small}
roles:
  - loader:
      warehouses: [loading]
      privileges:
        databases: {read: [raw]}
  - analyst: {}
users:
  - bot: {can_login: true, member_of: [loader]}
"#,
            )
            .unwrap(),
        )
        .unwrap()
    }

    fn connector() -> MemoryConnector {
        MemoryConnector::new(WarehouseState {
            schemas: vec!["raw.events".to_string()],
            grants: vec![
                GrantRow::new("loader", Privilege::Usage, ObjectKind::Database, "RAW"),
                GrantRow::new("loader", Privilege::Usage, ObjectKind::Database, "OTHER"),
                GrantRow::new("loader", Privilege::Usage, ObjectKind::Warehouse, "LOADING"),
                GrantRow::new("loader", Privilege::Usage, ObjectKind::Warehouse, "ADHOC"),
                GrantRow::new("loader", Privilege::Select, ObjectKind::Table, "OTHER.S.T"),
                GrantRow::new("loader", Privilege::Usage, ObjectKind::Role, "ANALYST"),
                GrantRow::new("loader", Privilege::Select, ObjectKind::Table, "RAW.EVENTS.<TABLE>"),
                GrantRow::new("analyst", Privilege::Usage, ObjectKind::Schema, "RAW.<SCHEMA>"),
            ],
            user_roles: IndexMap::from([("bot".to_string(), vec!["loader".to_string()])]),
            ..Default::default()
        })
    }

    #[test]
    fn keeps_only_tracked_grants() {
        let snapshot = fetch_snapshot(&connector(), &catalogue(), &RunFilters::default()).unwrap();
        let usage_dbs: Vec<_> = snapshot
            .targets("loader", &Privilege::Usage, &ObjectKind::Database)
            .collect();
        assert_eq!(usage_dbs, vec![&GrantTarget::concrete("raw")]);

        let warehouses: Vec<_> = snapshot
            .targets("loader", &Privilege::Usage, &ObjectKind::Warehouse)
            .collect();
        assert_eq!(warehouses, vec![&GrantTarget::concrete("loading")]);

        assert!(snapshot.has(
            "loader",
            &Privilege::Usage,
            &ObjectKind::Role,
            &GrantTarget::concrete("analyst")
        ));
        assert_eq!(
            snapshot
                .targets("loader", &Privilege::Select, &ObjectKind::Table)
                .count(),
            1
        );
    }

    #[test]
    fn merges_future_grants_as_typed_targets() {
        let snapshot = fetch_snapshot(&connector(), &catalogue(), &RunFilters::default()).unwrap();
        assert!(snapshot.has(
            "loader",
            &Privilege::Select,
            &ObjectKind::Table,
            &GrantTarget::future_in_schema(ObjectKind::Table, "raw.events")
        ));
        assert!(snapshot.has(
            "analyst",
            &Privilege::Usage,
            &ObjectKind::Schema,
            &GrantTarget::future_in_database(ObjectKind::Schema, "raw")
        ));
        assert!(snapshot.user_has_role("bot", "loader"));
    }

    #[test]
    fn role_filter_limits_fetching() {
        let filters = RunFilters {
            roles: vec!["analyst".to_string()],
            ..Default::default()
        };
        let snapshot = fetch_snapshot(&connector(), &catalogue(), &filters).unwrap();
        assert!(snapshot.role("loader").is_none());
        assert!(snapshot.role("analyst").is_some());
    }

    #[test]
    fn ignoring_memberships_skips_user_roles() {
        let filters = RunFilters {
            ignore_memberships: true,
            ..Default::default()
        };
        let snapshot = fetch_snapshot(&connector(), &catalogue(), &filters).unwrap();
        assert_eq!(snapshot.roles_of_user("bot").count(), 0);
    }

    #[test]
    fn missing_entries_read_as_empty() {
        let snapshot = GrantSnapshot::new();
        assert_eq!(
            snapshot
                .targets("nobody", &Privilege::Usage, &ObjectKind::Database)
                .count(),
            0
        );
        assert!(!snapshot.has_all(
            "nobody",
            &[Privilege::Usage],
            &ObjectKind::Database,
            &GrantTarget::concrete("raw")
        ));
    }

    #[test]
    fn apply_simulates_grants_revokes_and_ownership() {
        let mut snapshot = GrantSnapshot::new();
        let target = GrantTarget::concrete("raw");
        snapshot.apply(&Action::Grant {
            privileges: vec![Privilege::Usage, Privilege::Monitor],
            kind: ObjectKind::Database,
            target: target.clone(),
            role: "loader".to_string(),
        });
        assert!(snapshot.has_all(
            "loader",
            &[Privilege::Usage, Privilege::Monitor],
            &ObjectKind::Database,
            &target
        ));

        snapshot.apply(&Action::Revoke {
            privileges: vec![Privilege::Monitor],
            kind: ObjectKind::Database,
            target: target.clone(),
            role: "loader".to_string(),
        });
        assert!(!snapshot.has("loader", &Privilege::Monitor, &ObjectKind::Database, &target));
        assert!(snapshot.has("loader", &Privilege::Usage, &ObjectKind::Database, &target));

        snapshot.apply(&Action::GrantOwnership {
            kind: ObjectKind::Database,
            name: "raw".to_string(),
            role: "analyst".to_string(),
        });
        snapshot.apply(&Action::GrantOwnership {
            kind: ObjectKind::Database,
            name: "raw".to_string(),
            role: "loader".to_string(),
        });
        assert!(!snapshot.has("analyst", &Privilege::Ownership, &ObjectKind::Database, &target));
        assert!(snapshot.has("loader", &Privilege::Ownership, &ObjectKind::Database, &target));

        snapshot.apply(&Action::GrantRole {
            role: "analyst".to_string(),
            grantee: Grantee::User("bot".to_string()),
        });
        assert!(snapshot.user_has_role("bot", "analyst"));
        snapshot.apply(&Action::RevokeRole {
            role: "analyst".to_string(),
            grantee: Grantee::User("bot".to_string()),
        });
        assert!(!snapshot.user_has_role("bot", "analyst"));
    }

    #[test]
    fn imported_privileges_are_recorded_as_usage() {
        let mut snapshot = GrantSnapshot::new();
        snapshot.apply(&Action::Grant {
            privileges: vec![Privilege::ImportedPrivileges],
            kind: ObjectKind::Database,
            target: GrantTarget::concrete("share"),
            role: "loader".to_string(),
        });
        assert!(snapshot.has(
            "loader",
            &Privilege::Usage,
            &ObjectKind::Database,
            &GrantTarget::concrete("share")
        ));
    }
}
