//! Spec file loading and structural validation.
//!
//! The document is first parsed into an untyped YAML tree, then each entity
//! entry is deserialized on its own. A bad entry therefore produces one error
//! naming that entry and does not hide problems in the entries after it.

use crate::error::{LoadError, SpecLoadError};
use crate::types::{
    DatabaseConfig, IntegrationConfig, Named, RoleConfig, SpecDocument, UserConfig,
    WarehouseConfig,
};
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};
use std::path::Path;

/// Reads and validates a spec file.
pub fn load_spec(path: &Path) -> Result<SpecDocument, SpecLoadError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        LoadError::syntax(format!(
            "Spec error: could not read {}: {e}",
            path.display()
        ))
    })?;
    parse_spec(&text)
}

/// Parses and validates spec text.
pub fn parse_spec(text: &str) -> Result<SpecDocument, SpecLoadError> {
    let root: Value = serde_yaml::from_str(text)
        .map_err(|e| LoadError::syntax(format!("Spec error: invalid YAML: {e}")))?;

    let mapping = match root {
        Value::Mapping(mapping) => mapping,
        Value::Null => Mapping::new(),
        _ => {
            return Err(LoadError::syntax("Spec error: the document must be a mapping").into());
        }
    };

    let mut errors = Vec::new();
    let mut spec = SpecDocument::default();

    for (key, value) in mapping {
        let Some(key) = key.as_str() else {
            errors.push(LoadError::syntax(format!(
                "Spec error: top-level keys must be strings, found {key:?}"
            )));
            continue;
        };

        match key {
            "version" => match value {
                Value::Null => {}
                Value::String(s) => spec.version = Some(s),
                Value::Number(n) => spec.version = Some(n.to_string()),
                _ => errors.push(LoadError::syntax(
                    "Spec error: field \"version\": must be of string type",
                )),
            },
            "require_owner" | "require-owner" => match value {
                Value::Bool(flag) => spec.require_owner = flag,
                Value::Null => {}
                _ => errors.push(LoadError::syntax(format!(
                    "Spec error: field \"{key}\": must be of boolean type"
                ))),
            },
            "databases" => spec.databases = entries::<DatabaseConfig>(key, value, &mut errors),
            "roles" => spec.roles = entries::<RoleConfig>(key, value, &mut errors),
            "users" => spec.users = entries::<UserConfig>(key, value, &mut errors),
            "warehouses" => spec.warehouses = entries::<WarehouseConfig>(key, value, &mut errors),
            "integrations" => {
                spec.integrations = entries::<IntegrationConfig>(key, value, &mut errors)
            }
            other => errors.push(LoadError::syntax(format!(
                "Spec error: unknown field \"{other}\""
            ))),
        }
    }

    SpecLoadError::check(errors)?;
    Ok(spec)
}

/// Deserializes one entity list, collecting a message per bad entry.
fn entries<T: DeserializeOwned>(
    kind: &str,
    value: Value,
    errors: &mut Vec<LoadError>,
) -> Vec<Named<T>> {
    let items = match value {
        Value::Null => return Vec::new(),
        Value::Sequence(items) => items,
        _ => {
            errors.push(LoadError::syntax(format!(
                "Spec error: field \"{kind}\": must be of list type"
            )));
            return Vec::new();
        }
    };

    let mut parsed = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        let Value::Mapping(entry) = item else {
            errors.push(LoadError::syntax(format!(
                "Spec error: {kind} entry {idx}: must be a single-key mapping of name to configuration"
            )));
            continue;
        };
        if entry.len() != 1 {
            errors.push(LoadError::syntax(format!(
                "Spec error: {kind} entry {idx}: must be a single-key mapping of name to configuration"
            )));
            continue;
        }

        for (name, config) in entry {
            let name = match name {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                other => {
                    errors.push(LoadError::syntax(format!(
                        "Spec error: {kind} entry {idx}: name must be a string, found {other:?}"
                    )));
                    continue;
                }
            };

            let config = match config {
                Value::Null => Value::Mapping(Mapping::new()),
                other => other,
            };

            match serde_yaml::from_value::<T>(config) {
                Ok(config) => parsed.push(Named::new(name, config)),
                Err(e) => errors.push(LoadError::syntax(format!(
                    "Spec error: {kind} \"{name}\": {e}"
                ))),
            }
        }
    }
    parsed
}
