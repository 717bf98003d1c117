//! Snowflake access through the ODBC driver manager.
//!
//! Every enumeration is a `SHOW ...` command whose rows are read by column
//! name. Names coming back are turned into their canonical form before they
//! leave this module.

use ::odbc::odbc_safe::AutocommitOn;
use ::odbc::{create_environment_v3, Connection, Data, NoData, Statement};
use anyhow::{anyhow, Result};
use grantscope_core::connector::{parse_grant_target, FutureGrant, Grant, RoleInfo, Scope};
use grantscope_core::identifiers::{canonical_from_parts, canonical_principal, quote_principal};
use grantscope_core::{Connector, ConnectorError, Container, GrantTarget, ObjectKind, Privilege};
use std::collections::HashMap;
use tracing::{debug, info};

type Row = HashMap<String, Option<String>>;

pub struct OdbcConnector {
    conn: Connection<'static, AutocommitOn>,
}

impl OdbcConnector {
    /// Opens a connection. The ODBC environment lives for the rest of the
    /// process.
    pub fn connect(connection_string: &str) -> Result<Self> {
        let env = create_environment_v3()
            .map_err(|e| anyhow!("Failed to create ODBC environment: {:?}", e))?;
        let env = Box::leak(Box::new(env));
        let conn = env
            .connect_with_connection_string(connection_string)
            .map_err(|e| anyhow!("Failed to connect: {e}"))?;
        info!("connected to snowflake");
        Ok(Self { conn })
    }

    fn query(&self, sql: &str) -> Result<Vec<Row>, ConnectorError> {
        debug!(%sql, "running query");
        let failed = |e: ::odbc::DiagnosticRecord| ConnectorError::query(sql, e.to_string());

        let stmt = Statement::with_parent(&self.conn).map_err(failed)?;
        match stmt.exec_direct(sql).map_err(failed)? {
            Data(mut stmt) => {
                let cols = stmt.num_result_cols().map_err(failed)?;
                let mut names = Vec::with_capacity(cols.max(0) as usize);
                for idx in 1..=cols {
                    let column = stmt.describe_col(idx as u16).map_err(failed)?;
                    names.push(column.name.to_lowercase());
                }

                let mut rows = Vec::new();
                while let Some(mut cursor) = stmt.fetch().map_err(failed)? {
                    let mut row = Row::with_capacity(names.len());
                    for (idx, name) in names.iter().enumerate() {
                        let value = cursor.get_data::<String>(idx as u16 + 1).map_err(failed)?;
                        row.insert(name.clone(), value);
                    }
                    rows.push(row);
                }
                Ok(rows)
            }
            NoData(_) => Ok(Vec::new()),
        }
    }

    fn names(&self, sql: &str) -> Result<Vec<String>, ConnectorError> {
        self.query(sql)?
            .iter()
            .map(|row| column(row, "name", sql).map(|name| canonical_from_parts([name.as_str()])))
            .collect()
    }

    /// Objects reported with `database_name`, `schema_name` and `name`.
    fn qualified(&self, sql: &str, columns: &[&str]) -> Result<Vec<String>, ConnectorError> {
        self.query(sql)?
            .iter()
            .map(|row| {
                let parts = columns
                    .iter()
                    .map(|col| column(row, col, sql))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(canonical_from_parts(parts.iter().map(String::as_str)))
            })
            .collect()
    }

    fn scalar(&self, sql: &str, col: &str) -> Result<String, ConnectorError> {
        let rows = self.query(sql)?;
        let row = rows.first().ok_or_else(|| ConnectorError::Shape {
            query: sql.to_string(),
            message: "no rows returned".to_string(),
        })?;
        column(row, col, sql)
    }
}

fn column(row: &Row, name: &str, sql: &str) -> Result<String, ConnectorError> {
    row.get(name)
        .cloned()
        .flatten()
        .ok_or_else(|| ConnectorError::Shape {
            query: sql.to_string(),
            message: format!("missing column `{name}`"),
        })
}

fn scope_clause(scope: Scope<'_>) -> String {
    match scope {
        Scope::Account => "IN ACCOUNT".to_string(),
        Scope::Database(database) => format!("IN DATABASE {database}"),
        Scope::Schema(schema) => format!("IN SCHEMA {schema}"),
    }
}

impl Connector for OdbcConnector {
    fn list_databases(&self) -> Result<Vec<String>, ConnectorError> {
        self.names("SHOW DATABASES")
    }

    fn list_warehouses(&self) -> Result<Vec<String>, ConnectorError> {
        self.names("SHOW WAREHOUSES")
    }

    fn list_roles(&self) -> Result<Vec<RoleInfo>, ConnectorError> {
        let sql = "SHOW ROLES";
        self.query(sql)?
            .iter()
            .map(|row| {
                Ok(RoleInfo {
                    name: canonical_principal(&column(row, "name", sql)?),
                    owner: canonical_principal(&column(row, "owner", sql).unwrap_or_default()),
                })
            })
            .collect()
    }

    fn list_users(&self) -> Result<Vec<String>, ConnectorError> {
        let sql = "SHOW USERS";
        self.query(sql)?
            .iter()
            .map(|row| column(row, "name", sql).map(|name| canonical_principal(&name)))
            .collect()
    }

    fn list_schemas(&self, database: Option<&str>) -> Result<Vec<String>, ConnectorError> {
        let scope = database.map_or(Scope::Account, Scope::Database);
        let sql = format!("SHOW TERSE SCHEMAS {}", scope_clause(scope));
        self.qualified(&sql, &["database_name", "name"])
    }

    fn list_tables(&self, scope: Scope<'_>) -> Result<Vec<String>, ConnectorError> {
        let sql = format!("SHOW TERSE TABLES {}", scope_clause(scope));
        self.qualified(&sql, &["database_name", "schema_name", "name"])
    }

    fn list_views(&self, scope: Scope<'_>) -> Result<Vec<String>, ConnectorError> {
        let sql = format!("SHOW TERSE VIEWS {}", scope_clause(scope));
        self.qualified(&sql, &["database_name", "schema_name", "name"])
    }

    fn grants_to_role(&self, role: &str) -> Result<Vec<Grant>, ConnectorError> {
        let sql = format!("SHOW GRANTS TO ROLE {}", quote_principal(role));
        let mut grants = Vec::new();
        for row in self.query(&sql)? {
            let kind = ObjectKind::from(column(&row, "granted_on", &sql)?);
            let target = parse_grant_target(&kind, &column(&row, "name", &sql)?);
            grants.push(Grant {
                privilege: Privilege::from(column(&row, "privilege", &sql)?),
                kind,
                target,
            });
        }
        Ok(grants)
    }

    fn future_grants(&self, container: &Container) -> Result<Vec<FutureGrant>, ConnectorError> {
        let sql = format!(
            "SHOW FUTURE GRANTS IN {} {}",
            container.keyword().to_uppercase(),
            container.name()
        );
        let mut grants = Vec::new();
        for row in self.query(&sql)? {
            if column(&row, "grant_to", &sql)? != "ROLE" {
                continue;
            }
            let kind = ObjectKind::from(column(&row, "grant_on", &sql)?);
            let GrantTarget::Future(scope) = parse_grant_target(&kind, &column(&row, "name", &sql)?) else {
                continue;
            };
            grants.push(FutureGrant {
                role: canonical_principal(&column(&row, "grantee_name", &sql)?),
                privilege: Privilege::from(column(&row, "privilege", &sql)?),
                scope,
            });
        }
        Ok(grants)
    }

    fn roles_of_user(&self, user: &str) -> Result<Vec<String>, ConnectorError> {
        let sql = format!("SHOW GRANTS TO USER {}", quote_principal(user));
        self.query(&sql)?
            .iter()
            .map(|row| column(row, "role", &sql).map(|role| canonical_principal(&role)))
            .collect()
    }

    fn current_user(&self) -> Result<String, ConnectorError> {
        self.scalar("SELECT CURRENT_USER() AS USER", "user")
            .map(|user| canonical_principal(&user))
    }

    fn current_role(&self) -> Result<String, ConnectorError> {
        self.scalar("SELECT CURRENT_ROLE() AS ROLE", "role")
            .map(|role| canonical_principal(&role))
    }

    fn execute(&self, sql: &str) -> Result<(), ConnectorError> {
        self.query(sql).map(|_| ())
    }
}
