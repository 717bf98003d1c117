//! Statement descriptors produced by the diff engine.

use super::grant::{GrantTarget, ObjectKind, Privilege};
use serde::Serialize;
use std::fmt;

/// The principal a role is granted to or revoked from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Grantee {
    Role(String),
    User(String),
}

impl Grantee {
    pub fn name(&self) -> &str {
        match self {
            Grantee::Role(name) | Grantee::User(name) => name,
        }
    }

    fn keyword(&self) -> &'static str {
        match self {
            Grantee::Role(_) => "role",
            Grantee::User(_) => "user",
        }
    }
}

/// The typed meaning of a statement. [`Statement::sql`] is rendered from it.
///
/// Names are expected to be canonical (see [`crate::identifiers`]), which
/// makes them safe to splice into SQL as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    GrantRole {
        role: String,
        grantee: Grantee,
    },
    RevokeRole {
        role: String,
        grantee: Grantee,
    },
    Grant {
        privileges: Vec<Privilege>,
        kind: ObjectKind,
        target: GrantTarget,
        role: String,
    },
    Revoke {
        privileges: Vec<Privilege>,
        kind: ObjectKind,
        target: GrantTarget,
        role: String,
    },
    GrantOwnership {
        kind: ObjectKind,
        name: String,
        role: String,
    },
    SetLoginDisabled {
        user: String,
        disabled: bool,
    },
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::GrantRole { role, grantee } => write!(
                f,
                "GRANT ROLE {role} TO {} {}",
                grantee.keyword(),
                grantee.name()
            ),
            Action::RevokeRole { role, grantee } => write!(
                f,
                "REVOKE ROLE {role} FROM {} {}",
                grantee.keyword(),
                grantee.name()
            ),
            Action::Grant {
                privileges,
                kind,
                target,
                role,
            } => {
                write!(f, "GRANT {} ON ", Privilege::join(privileges))?;
                write_target(f, kind, target)?;
                write!(f, " TO ROLE {role}")
            }
            Action::Revoke {
                privileges,
                kind,
                target,
                role,
            } => {
                write!(f, "REVOKE {} ON ", Privilege::join(privileges))?;
                write_target(f, kind, target)?;
                write!(f, " FROM ROLE {role}")
            }
            Action::GrantOwnership { kind, name, role } => write!(
                f,
                "GRANT OWNERSHIP ON {kind} {name} TO ROLE {role} COPY CURRENT GRANTS"
            ),
            Action::SetLoginDisabled { user, disabled } => {
                let value = if *disabled { "TRUE" } else { "FALSE" };
                write!(f, "ALTER USER {user} SET DISABLED = {value}")
            }
        }
    }
}

fn write_target(f: &mut fmt::Formatter<'_>, kind: &ObjectKind, target: &GrantTarget) -> fmt::Result {
    match target {
        GrantTarget::Concrete(name) => write!(f, "{kind} {name}"),
        GrantTarget::Future(scope) => write!(
            f,
            "FUTURE {}s IN {} {}",
            scope.kind,
            scope.container.keyword(),
            scope.container.name()
        ),
    }
}

/// One unit of output: a SQL statement and whether the snapshot shows it is
/// already in effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statement {
    pub sql: String,
    pub already_granted: bool,
    #[serde(skip)]
    pub action: Action,
}

impl Statement {
    pub fn new(action: Action, already_granted: bool) -> Self {
        Self {
            sql: action.to_string(),
            already_granted,
            action,
        }
    }

    /// Revokes and role removals are never already in effect.
    pub fn pending(action: Action) -> Self {
        Self::new(action, false)
    }

    pub fn is_revoke(&self) -> bool {
        matches!(
            self.action,
            Action::Revoke { .. } | Action::RevokeRole { .. }
        )
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}
