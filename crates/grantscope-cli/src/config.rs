//! Connection configuration.
//!
//! An explicit connection string (flag or `GRANTSCOPE_CONNECTION_STRING`)
//! wins. Otherwise one is assembled for the Snowflake ODBC driver from the
//! `PERMISSION_BOT_*` environment variables.

use thiserror::Error;

const DRIVER: &str = "SnowflakeDSIIDriver";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Validation Error: {0} not set. Please ensure environment variables are set.")]
    MissingVariable(&'static str),
}

/// Settings read from the `PERMISSION_BOT_*` variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BotSettings {
    pub user: Option<String>,
    pub password: Option<String>,
    pub account: Option<String>,
    pub database: Option<String>,
    pub role: Option<String>,
    pub warehouse: Option<String>,
    pub authenticator: Option<String>,
}

impl BotSettings {
    /// Reads the settings through `lookup`, usually [`std::env::var`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(&format!("PERMISSION_BOT_{name}")).filter(|v| !v.is_empty());
        Self {
            user: var("USER"),
            password: var("PASSWORD"),
            account: var("ACCOUNT"),
            database: var("DATABASE"),
            role: var("ROLE"),
            warehouse: var("WAREHOUSE"),
            authenticator: var("AUTHENTICATOR"),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds an ODBC connection string.
    pub fn connection_string(&self) -> Result<String, ConfigError> {
        let user = self
            .user
            .as_ref()
            .ok_or(ConfigError::MissingVariable("PERMISSION_BOT_USER"))?;
        let account = self
            .account
            .as_ref()
            .ok_or(ConfigError::MissingVariable("PERMISSION_BOT_ACCOUNT"))?;

        let mut parts = vec![
            format!("Driver={{{DRIVER}}}"),
            format!("Server={account}.snowflakecomputing.com"),
            format!("UID={user}"),
        ];
        match (&self.authenticator, &self.password) {
            (Some(authenticator), _) => parts.push(format!("Authenticator={authenticator}")),
            (None, Some(password)) => parts.push(format!("PWD={{{}}}", password.replace('}', "}}"))),
            (None, None) => return Err(ConfigError::MissingVariable("PERMISSION_BOT_PASSWORD")),
        }
        for (key, value) in [
            ("Database", &self.database),
            ("Role", &self.role),
            ("Warehouse", &self.warehouse),
        ] {
            if let Some(value) = value {
                parts.push(format!("{key}={value}"));
            }
        }
        Ok(parts.join(";"))
    }
}

/// The connection string to use for a live run.
pub fn resolve_connection_string(
    explicit: Option<&str>,
    settings: &BotSettings,
) -> Result<String, ConfigError> {
    match explicit.map(str::trim).filter(|s| !s.is_empty()) {
        Some(explicit) => Ok(explicit.to_string()),
        None => settings.connection_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> BotSettings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BotSettings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn assembles_password_connection_string() {
        let settings = settings(&[
            ("PERMISSION_BOT_USER", "permission_bot"),
            ("PERMISSION_BOT_PASSWORD", "s3cr}t"),
            ("PERMISSION_BOT_ACCOUNT", "ab12345.eu-west-1"),
            ("PERMISSION_BOT_ROLE", "securityadmin"),
            ("PERMISSION_BOT_WAREHOUSE", "admin_wh"),
        ]);
        assert_eq!(
            settings.connection_string().unwrap(),
            "Driver={SnowflakeDSIIDriver};Server=ab12345.eu-west-1.snowflakecomputing.com;\
             UID=permission_bot;PWD={s3cr}}t};Role=securityadmin;Warehouse=admin_wh"
        );
    }

    #[test]
    fn authenticator_replaces_password() {
        let settings = settings(&[
            ("PERMISSION_BOT_USER", "me@example.com"),
            ("PERMISSION_BOT_ACCOUNT", "acct"),
            ("PERMISSION_BOT_AUTHENTICATOR", "externalbrowser"),
        ]);
        let conn = settings.connection_string().unwrap();
        assert!(conn.contains("Authenticator=externalbrowser"));
        assert!(!conn.contains("PWD="));
    }

    #[test]
    fn missing_user_is_reported() {
        let err = settings(&[("PERMISSION_BOT_ACCOUNT", "acct")])
            .connection_string()
            .unwrap_err();
        assert!(err.to_string().contains("PERMISSION_BOT_USER not set"));
    }

    #[test]
    fn explicit_string_wins() {
        let resolved = resolve_connection_string(Some("DSN=snowflake"), &BotSettings::default()).unwrap();
        assert_eq!(resolved, "DSN=snowflake");
        assert_eq!(
            resolve_connection_string(Some("  "), &BotSettings::default()),
            Err(ConfigError::MissingVariable("PERMISSION_BOT_USER"))
        );
    }
}
