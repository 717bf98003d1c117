use super::DiffEngine;
use crate::connector::Connector;
use crate::entities::ROLE_WILDCARD;
use crate::error::ConnectorError;
use crate::identifiers::canonical_principal;
use crate::types::{Action, GrantTarget, Grantee, MemberOf, ObjectKind, Privilege, Statement};
use indexmap::IndexSet;

/// Built-in roles whose mutual grants the warehouse manages itself.
pub const SYSTEM_ROLES: [&str; 5] = ["accountadmin", "securityadmin", "sysadmin", "useradmin", "public"];

fn is_system_role(name: &str) -> bool {
    SYSTEM_ROLES.contains(&name)
}

impl<C: Connector + ?Sized> DiffEngine<'_, C> {
    /// Role memberships of a role or user.
    ///
    /// `live_roles` resolves a `["*"]` include list and is only consulted in
    /// that case. Grants and revokes between two system roles are never
    /// emitted.
    pub fn diff_membership(
        &self,
        grantee: &Grantee,
        member_of: Option<&MemberOf>,
        live_roles: &[String],
    ) -> Result<Vec<Statement>, ConnectorError> {
        if self.ignore_memberships {
            return Ok(Vec::new());
        }

        let entity = grantee.name();
        let include: Vec<String> = member_of
            .map(|m| m.include().iter().map(|r| canonical_principal(r)).collect())
            .unwrap_or_default();
        let exclude: IndexSet<String> = member_of
            .map(|m| m.exclude().iter().map(|r| canonical_principal(r)).collect())
            .unwrap_or_default();

        let include = if include.len() == 1 && include[0] == ROLE_WILDCARD {
            live_roles
                .iter()
                .filter(|role| role.as_str() != entity)
                .cloned()
                .collect()
        } else {
            include
        };

        let desired: IndexSet<String> = include
            .into_iter()
            .filter(|role| !exclude.contains(role))
            .collect();

        let exempt = |role: &str| matches!(grantee, Grantee::Role(_)) && is_system_role(entity) && is_system_role(role);

        let mut statements = Vec::new();
        for role in &desired {
            if exempt(role) {
                continue;
            }
            let already_granted = match grantee {
                Grantee::User(user) => self.snapshot.user_has_role(user, role),
                Grantee::Role(name) => self.snapshot.has(
                    name,
                    &Privilege::Usage,
                    &ObjectKind::Role,
                    &GrantTarget::concrete(role.clone()),
                ),
            };
            statements.push(Statement::new(
                Action::GrantRole {
                    role: role.clone(),
                    grantee: grantee.clone(),
                },
                already_granted,
            ));
        }

        let held: Vec<String> = match grantee {
            Grantee::User(user) => self.snapshot.roles_of_user(user).cloned().collect(),
            Grantee::Role(name) => self
                .snapshot
                .targets(name, &Privilege::Usage, &ObjectKind::Role)
                .filter_map(|target| target.as_concrete().map(str::to_string))
                .collect(),
        };
        for role in held {
            if desired.contains(&role) || exempt(&role) {
                continue;
            }
            statements.push(Statement::pending(Action::RevokeRole {
                role,
                grantee: grantee.clone(),
            }));
        }

        Ok(statements)
    }
}
