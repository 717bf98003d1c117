//! Per-run memo of schema/table/view enumeration.

use super::{Connector, Scope};
use crate::error::ConnectorError;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
#[cfg(feature = "tracing")]
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Listing {
    Schemas,
    Tables,
    Views,
}

/// Caches enumeration results by (listing, scope) for the lifetime of one
/// diff run.
///
/// Wildcard expansion asks the same question many times (every table
/// expression in a schema needs that schema's table list). A cache lives
/// exactly as long as the engine that owns it; the warehouse may change
/// between runs, so it is never shared across them.
pub struct EnumerationCache<'c, C: Connector + ?Sized> {
    connector: &'c C,
    entries: RefCell<HashMap<(Listing, String), Rc<Vec<String>>>>,
}

impl<'c, C: Connector + ?Sized> EnumerationCache<'c, C> {
    pub fn new(connector: &'c C) -> Self {
        Self {
            connector,
            entries: RefCell::new(HashMap::new()),
        }
    }

    /// Schemas of one database.
    pub fn schemas(&self, database: &str) -> Result<Rc<Vec<String>>, ConnectorError> {
        self.lookup(Listing::Schemas, database, |c| c.list_schemas(Some(database)))
    }

    /// Tables of one `db.schema`.
    pub fn tables(&self, schema: &str) -> Result<Rc<Vec<String>>, ConnectorError> {
        self.lookup(Listing::Tables, schema, |c| c.list_tables(Scope::Schema(schema)))
    }

    /// Views of one `db.schema`.
    pub fn views(&self, schema: &str) -> Result<Rc<Vec<String>>, ConnectorError> {
        self.lookup(Listing::Views, schema, |c| c.list_views(Scope::Schema(schema)))
    }

    fn lookup(
        &self,
        listing: Listing,
        scope: &str,
        fetch: impl FnOnce(&C) -> Result<Vec<String>, ConnectorError>,
    ) -> Result<Rc<Vec<String>>, ConnectorError> {
        let key = (listing, scope.to_string());
        if let Some(hit) = self.entries.borrow().get(&key) {
            #[cfg(feature = "tracing")]
            trace!(?listing, scope, "enumeration cache hit");
            return Ok(Rc::clone(hit));
        }

        let fetched = Rc::new(fetch(self.connector)?);
        self.entries.borrow_mut().insert(key, Rc::clone(&fetched));
        Ok(fetched)
    }
}
