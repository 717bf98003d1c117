use super::DiffEngine;
use crate::connector::Connector;
use crate::error::ConnectorError;
use crate::types::{Action, Statement};

impl<C: Connector + ?Sized> DiffEngine<'_, C> {
    /// `can_login` is asserted on every run rather than diffed, so the
    /// statement is never already granted. Nothing is emitted while
    /// memberships are ignored.
    pub fn diff_user_login(&self, user: &str, can_login: bool) -> Result<Vec<Statement>, ConnectorError> {
        if self.ignore_memberships {
            return Ok(Vec::new());
        }
        Ok(vec![Statement::pending(Action::SetLoginDisabled {
            user: user.to_string(),
            disabled: !can_login,
        })])
    }
}
