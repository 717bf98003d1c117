//! Privileges, object kinds and the targets grants are attached to.

use crate::identifiers::{canonical_name, split_name};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A warehouse privilege, rendered in the lower-case form used by
/// `SHOW GRANTS` and by generated statements.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Privilege {
    Usage,
    Operate,
    Monitor,
    Select,
    Insert,
    Update,
    Delete,
    Truncate,
    References,
    Ownership,
    ImportedPrivileges,
    CreateSchema,
    CreateTable,
    CreateView,
    CreateStage,
    CreateFileFormat,
    CreateSequence,
    CreateFunction,
    CreatePipe,
    /// Any privilege this crate never emits but may observe on the warehouse.
    Other(String),
}

impl Privilege {
    pub fn as_str(&self) -> &str {
        match self {
            Privilege::Usage => "usage",
            Privilege::Operate => "operate",
            Privilege::Monitor => "monitor",
            Privilege::Select => "select",
            Privilege::Insert => "insert",
            Privilege::Update => "update",
            Privilege::Delete => "delete",
            Privilege::Truncate => "truncate",
            Privilege::References => "references",
            Privilege::Ownership => "ownership",
            Privilege::ImportedPrivileges => "imported privileges",
            Privilege::CreateSchema => "create schema",
            Privilege::CreateTable => "create table",
            Privilege::CreateView => "create view",
            Privilege::CreateStage => "create stage",
            Privilege::CreateFileFormat => "create file format",
            Privilege::CreateSequence => "create sequence",
            Privilege::CreateFunction => "create function",
            Privilege::CreatePipe => "create pipe",
            Privilege::Other(name) => name,
        }
    }

    /// Renders a privilege list the way GRANT statements expect it.
    pub fn join(privileges: &[Privilege]) -> String {
        privileges
            .iter()
            .map(Privilege::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl From<&str> for Privilege {
    fn from(value: &str) -> Self {
        let normalized = value.trim().to_lowercase().replace('_', " ");
        match normalized.as_str() {
            "usage" => Privilege::Usage,
            "operate" => Privilege::Operate,
            "monitor" => Privilege::Monitor,
            "select" => Privilege::Select,
            "insert" => Privilege::Insert,
            "update" => Privilege::Update,
            "delete" => Privilege::Delete,
            "truncate" => Privilege::Truncate,
            "references" => Privilege::References,
            "ownership" => Privilege::Ownership,
            "imported privileges" => Privilege::ImportedPrivileges,
            "create schema" => Privilege::CreateSchema,
            "create table" => Privilege::CreateTable,
            "create view" => Privilege::CreateView,
            "create stage" => Privilege::CreateStage,
            "create file format" => Privilege::CreateFileFormat,
            "create sequence" => Privilege::CreateSequence,
            "create function" => Privilege::CreateFunction,
            "create pipe" => Privilege::CreatePipe,
            _ => Privilege::Other(normalized),
        }
    }
}

impl From<String> for Privilege {
    fn from(value: String) -> Self {
        Privilege::from(value.as_str())
    }
}

impl From<Privilege> for String {
    fn from(value: Privilege) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of object a grant is attached to (`granted_on` in `SHOW GRANTS`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ObjectKind {
    Account,
    Database,
    Schema,
    Table,
    View,
    Warehouse,
    Integration,
    Role,
    User,
    Other(String),
}

impl ObjectKind {
    pub fn as_str(&self) -> &str {
        match self {
            ObjectKind::Account => "account",
            ObjectKind::Database => "database",
            ObjectKind::Schema => "schema",
            ObjectKind::Table => "table",
            ObjectKind::View => "view",
            ObjectKind::Warehouse => "warehouse",
            ObjectKind::Integration => "integration",
            ObjectKind::Role => "role",
            ObjectKind::User => "user",
            ObjectKind::Other(name) => name,
        }
    }

    /// Kinds that live inside a database and are named `db.…`.
    pub fn is_database_scoped(&self) -> bool {
        !matches!(
            self,
            ObjectKind::Account
                | ObjectKind::Warehouse
                | ObjectKind::Integration
                | ObjectKind::Role
                | ObjectKind::User
        )
    }
}

impl From<&str> for ObjectKind {
    fn from(value: &str) -> Self {
        let normalized = value.trim().to_lowercase();
        match normalized.as_str() {
            "account" => ObjectKind::Account,
            "database" => ObjectKind::Database,
            "schema" => ObjectKind::Schema,
            "table" => ObjectKind::Table,
            "view" => ObjectKind::View,
            "warehouse" => ObjectKind::Warehouse,
            "integration" => ObjectKind::Integration,
            "role" => ObjectKind::Role,
            "user" => ObjectKind::User,
            _ => ObjectKind::Other(normalized),
        }
    }
}

impl From<String> for ObjectKind {
    fn from(value: String) -> Self {
        ObjectKind::from(value.as_str())
    }
}

impl From<ObjectKind> for String {
    fn from(value: ObjectKind) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The database or schema a future grant applies within.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Container {
    Database(String),
    /// Fully qualified `db.schema`.
    Schema(String),
}

impl Container {
    pub fn keyword(&self) -> &'static str {
        match self {
            Container::Database(_) => "database",
            Container::Schema(_) => "schema",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Container::Database(name) | Container::Schema(name) => name,
        }
    }

    pub fn database(&self) -> String {
        leading_segment(self.name())
    }
}

/// A standing rule: every `kind` object created later inside `container`
/// receives the grant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FutureScope {
    pub kind: ObjectKind,
    pub container: Container,
}

impl FutureScope {
    pub fn new(kind: ObjectKind, container: Container) -> Self {
        Self { kind, container }
    }
}

/// What a grant points at: a concrete object or a future-grant scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GrantTarget {
    Concrete(String),
    Future(FutureScope),
}

impl GrantTarget {
    pub fn concrete(name: impl Into<String>) -> Self {
        GrantTarget::Concrete(name.into())
    }

    pub fn future_in_database(kind: ObjectKind, database: impl Into<String>) -> Self {
        GrantTarget::Future(FutureScope::new(kind, Container::Database(database.into())))
    }

    pub fn future_in_schema(kind: ObjectKind, schema: impl Into<String>) -> Self {
        GrantTarget::Future(FutureScope::new(kind, Container::Schema(schema.into())))
    }

    /// Parses a name as reported by the warehouse, turning the placeholder
    /// forms `db.<schema>` and `db.schema.<table>` into [`GrantTarget::Future`].
    /// Concrete names are canonicalized.
    pub fn parse(raw: &str) -> Self {
        let mut segments = split_name(raw);
        let placeholder = segments
            .last()
            .and_then(|last| last.strip_prefix('<'))
            .and_then(|rest| rest.strip_suffix('>'))
            .map(ObjectKind::from);

        match placeholder {
            Some(kind) if segments.len() == 2 => {
                segments.pop();
                GrantTarget::future_in_database(kind, canonical_name(&segments[0]))
            }
            Some(kind) if segments.len() == 3 => {
                segments.pop();
                GrantTarget::future_in_schema(kind, canonical_name(&segments.join(".")))
            }
            _ => GrantTarget::Concrete(canonical_name(raw)),
        }
    }

    /// The leading database segment of the target.
    pub fn database(&self) -> String {
        match self {
            GrantTarget::Concrete(name) => leading_segment(name),
            GrantTarget::Future(scope) => scope.container.database(),
        }
    }

    pub fn as_concrete(&self) -> Option<&str> {
        match self {
            GrantTarget::Concrete(name) => Some(name),
            GrantTarget::Future(_) => None,
        }
    }

    pub fn is_future(&self) -> bool {
        matches!(self, GrantTarget::Future(_))
    }
}

impl fmt::Display for GrantTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrantTarget::Concrete(name) => f.write_str(name),
            GrantTarget::Future(scope) => {
                write!(f, "{}.<{}>", scope.container.name(), scope.kind)
            }
        }
    }
}

fn leading_segment(name: &str) -> String {
    split_name(name).into_iter().next().unwrap_or_default()
}
