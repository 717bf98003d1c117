//! Declarative spec document types.
//!
//! A spec document is a YAML mapping whose entity sections are ordered lists
//! of single-key mappings (`- name: {config}`). [`Named`] models one such
//! entry; the per-kind configuration structs model the value side.

use super::serde_utils::null_as_default;
use schemars::{json_schema, JsonSchema, Schema, SchemaGenerator};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::borrow::Cow;

/// The validated desired-state document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, JsonSchema)]
pub struct SpecDocument {
    /// Free-form document version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// When set, every declared entity must name an `owner`.
    /// `require-owner` is accepted as an alias when loading.
    pub require_owner: bool,

    pub databases: Vec<Named<DatabaseConfig>>,
    pub roles: Vec<Named<RoleConfig>>,
    pub users: Vec<Named<UserConfig>>,
    pub warehouses: Vec<Named<WarehouseConfig>>,
    pub integrations: Vec<Named<IntegrationConfig>>,
}

/// One `- name: {config}` entry of an entity list.
#[derive(Debug, Clone, PartialEq)]
pub struct Named<T> {
    pub name: String,
    pub config: T,
}

impl<T> Named<T> {
    pub fn new(name: impl Into<String>, config: T) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }
}

impl<T: Serialize> Serialize for Named<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.name, &self.config)?;
        map.end()
    }
}

impl<T: JsonSchema> JsonSchema for Named<T> {
    fn schema_name() -> Cow<'static, str> {
        format!("Named{}", T::schema_name()).into()
    }

    fn json_schema(generator: &mut SchemaGenerator) -> Schema {
        let config = generator.subschema_for::<T>();
        json_schema!({
            "type": "object",
            "minProperties": 1,
            "maxProperties": 1,
            "additionalProperties": config,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Shared (imported) databases only accept `imported privileges`.
    pub shared: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct RoleConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub warehouses: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub integrations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_of: Option<MemberOf>,
    #[serde(deserialize_with = "null_as_default")]
    pub privileges: Privileges,
    #[serde(deserialize_with = "null_as_default")]
    pub owns: Owns,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct UserConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// `false` disables the user on every run; `true` re-enables it.
    pub can_login: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_of: Option<MemberOf>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub owns: Owns,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct WarehouseConfig {
    pub size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IntegrationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Role membership, either a plain list or include/exclude rules.
///
/// A literal `"*"` include list means every role on the warehouse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum MemberOf {
    List(Vec<String>),
    Rules {
        include: Vec<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        exclude: Vec<String>,
    },
}

impl MemberOf {
    pub fn include(&self) -> &[String] {
        match self {
            MemberOf::List(roles) => roles,
            MemberOf::Rules { include, .. } => include,
        }
    }

    pub fn exclude(&self) -> &[String] {
        match self {
            MemberOf::List(_) => &[],
            MemberOf::Rules { exclude, .. } => exclude,
        }
    }

    /// Every role name mentioned on either side.
    pub fn mentioned(&self) -> impl Iterator<Item = &String> {
        self.include().iter().chain(self.exclude())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct Privileges {
    #[serde(deserialize_with = "null_as_default")]
    pub databases: ReadWrite,
    #[serde(deserialize_with = "null_as_default")]
    pub schemas: ReadWrite,
    #[serde(deserialize_with = "null_as_default")]
    pub tables: ReadWrite,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct ReadWrite {
    #[serde(deserialize_with = "null_as_default")]
    pub read: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub write: Vec<String>,
}

impl ReadWrite {
    pub fn all(&self) -> impl Iterator<Item = &String> {
        self.read.iter().chain(&self.write)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct Owns {
    #[serde(deserialize_with = "null_as_default")]
    pub databases: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub schemas: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub tables: Vec<String>,
}

impl Owns {
    pub fn is_empty(&self) -> bool {
        self.databases.is_empty() && self.schemas.is_empty() && self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_of_list_form_has_no_excludes() {
        let member_of: MemberOf = serde_yaml::from_str("[analyst, loader]").unwrap();
        assert_eq!(member_of.include(), ["analyst", "loader"]);
        assert!(member_of.exclude().is_empty());
    }

    #[test]
    fn member_of_rules_form_splits_lists() {
        let member_of: MemberOf =
            serde_yaml::from_str("include: ['*']\nexclude: [sysadmin]").unwrap();
        assert_eq!(member_of.include(), ["*"]);
        assert_eq!(member_of.exclude(), ["sysadmin"]);
        assert_eq!(member_of.mentioned().count(), 2);
    }

    #[test]
    fn role_config_accepts_null_sections() {
        let config: RoleConfig =
            serde_yaml::from_str("warehouses:\nprivileges:\n  databases:\n    read:\n").unwrap();
        assert!(config.warehouses.is_empty());
        assert!(config.privileges.databases.read.is_empty());
    }

    #[test]
    fn role_config_rejects_unknown_fields() {
        let err = serde_yaml::from_str::<RoleConfig>("privilege: {}").unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn named_entry_serializes_as_single_key_map() {
        let entry = Named::new(
            "analytics",
            DatabaseConfig {
                shared: false,
                owner: None,
            },
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json, serde_json::json!({"analytics": {"shared": false}}));
    }
}
