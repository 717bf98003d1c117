//! Opening a warehouse connection.

#[cfg(feature = "odbc")]
mod odbc;

#[cfg(feature = "odbc")]
pub use self::odbc::OdbcConnector;

use anyhow::{Context, Result};
use grantscope_core::{Connector, MemoryConnector, WarehouseState};
use std::path::Path;

/// Loads an offline warehouse description.
pub fn load_state(path: &Path) -> Result<MemoryConnector> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read state file: {}", path.display()))?;
    let state: WarehouseState = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse state file: {}", path.display()))?;
    Ok(MemoryConnector::new(state))
}

/// Connects to Snowflake through the ODBC driver manager.
#[cfg(feature = "odbc")]
pub fn connect(connection_string: &str) -> Result<Box<dyn Connector>> {
    Ok(Box::new(OdbcConnector::connect(connection_string)?))
}

#[cfg(not(feature = "odbc"))]
pub fn connect(_connection_string: &str) -> Result<Box<dyn Connector>> {
    anyhow::bail!(
        "grantscope was built without ODBC support; rebuild with `--features odbc` \
         or plan offline with --state FILE"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_state_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"current_role": "SECURITYADMIN", "databases": ["RAW"]}}"#
        )
        .unwrap();

        let connector = load_state(file.path()).unwrap();
        assert_eq!(connector.list_databases().unwrap(), vec!["raw"]);
        assert_eq!(connector.current_role().unwrap(), "securityadmin");
    }

    #[test]
    fn reports_bad_state_files() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = load_state(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse state file"));
    }
}
