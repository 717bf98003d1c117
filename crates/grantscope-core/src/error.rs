//! Error types for spec loading and warehouse access.
//!
//! # Error Handling Strategy
//!
//! This crate separates two kinds of failure:
//!
//! - [`SpecLoadError`]: a batch of [`LoadError`]s found while loading,
//!   validating or pre-checking a spec. Every check runs to completion before
//!   the batch is returned, so a single report lists every problem. No plan is
//!   produced while any load error exists.
//!
//! - [`ConnectorError`]: a failure talking to the warehouse. Enumeration
//!   failures abort the run through `?`; statement failures during execution
//!   are recorded per statement by [`crate::execute`] and never abort the
//!   remaining statements.

use std::fmt;
use thiserror::Error;

/// Category of load error, for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadErrorKind {
    /// Malformed YAML or a structural schema violation.
    Syntax,
    /// A database, schema or table name with the wrong shape.
    Name,
    /// A reference to an entity that is not declared.
    Reference,
    /// A schema/table privilege whose database is not granted to the role.
    Privilege,
    /// A declared entity missing its owner while `require_owner` is set.
    Owner,
    /// A declared or referenced entity that does not exist on the warehouse.
    MissingEntity,
    /// A role whose warehouse owner differs from the declared owner.
    OwnerMismatch,
    /// The session is not running with the required administrative role.
    Permission,
}

/// A single validation problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadError {
    pub kind: LoadErrorKind,
    pub message: String,
}

impl LoadError {
    pub fn new(kind: LoadErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(LoadErrorKind::Syntax, message)
    }

    pub fn name(message: impl Into<String>) -> Self {
        Self::new(LoadErrorKind::Name, message)
    }

    pub fn reference(message: impl Into<String>) -> Self {
        Self::new(LoadErrorKind::Reference, message)
    }

    pub fn privilege(message: impl Into<String>) -> Self {
        Self::new(LoadErrorKind::Privilege, message)
    }

    pub fn owner(message: impl Into<String>) -> Self {
        Self::new(LoadErrorKind::Owner, message)
    }

    pub fn missing_entity(message: impl Into<String>) -> Self {
        Self::new(LoadErrorKind::MissingEntity, message)
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Every load error found in one pass, reported together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecLoadError {
    pub errors: Vec<LoadError>,
}

impl SpecLoadError {
    pub fn new(errors: Vec<LoadError>) -> Self {
        Self { errors }
    }

    /// Returns `Ok(())` when the batch is empty.
    pub fn check(errors: Vec<LoadError>) -> Result<(), SpecLoadError> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Self::new(errors))
        }
    }

    pub fn count(&self, kind: LoadErrorKind) -> usize {
        self.errors.iter().filter(|e| e.kind == kind).count()
    }
}

impl fmt::Display for SpecLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Spec validation failed with error(s):")?;
        for (idx, error) in self.errors.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "    {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for SpecLoadError {}

impl From<LoadError> for SpecLoadError {
    fn from(error: LoadError) -> Self {
        Self::new(vec![error])
    }
}

/// Failure reported by a [`crate::Connector`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectorError {
    /// The warehouse rejected or failed a query.
    #[error("query failed: {query}: {message}")]
    Query { query: String, message: String },

    /// The connection could not be established or was lost.
    #[error("connection error: {0}")]
    Connection(String),

    /// A result row was missing an expected column or had an unexpected shape.
    #[error("unexpected result from `{query}`: {message}")]
    Shape { query: String, message: String },
}

impl ConnectorError {
    pub fn query(query: impl Into<String>, message: impl Into<String>) -> Self {
        ConnectorError::Query {
            query: query.into(),
            message: message.into(),
        }
    }
}

/// Failure of the end-to-end planning pipeline.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Load(#[from] SpecLoadError),

    #[error(transparent)]
    Connector(#[from] ConnectorError),
}
