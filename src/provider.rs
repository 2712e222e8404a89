use crate::column::ColumnRegistry;
use crate::error::{Error, Result};
use crate::row::Rows;
use std::collections::HashMap;
use std::sync::Arc;

/// The contract an in-process data source implements to be queryable as a
/// SQL table.
///
/// `produce` may be called more than once per query (self-joins, `Tee`
/// fan-out without re-entrant buffering) and must return a fresh, independent
/// iterator each time.
pub trait TableProvider: Send + Sync {
    fn name(&self) -> &str;

    /// True if rows are already delivered in ascending order of every
    /// column named in `column_metadata`, left to right. The lowerer relies
    /// on this to skip an explicit `Sort` ahead of a merge join.
    fn sorted(&self) -> bool {
        false
    }

    fn column_metadata(&self) -> Option<ColumnRegistry>;

    fn produce(&self) -> Rows;
}

/// Maps registered names to providers. Read-only and provider-backed: there
/// is no DDL path for creating or dropping tables at runtime.
///
/// Multi-segment names (`"pkg.Table"`) are supported as plain string keys —
/// registered directly by the caller rather than resolved through a
/// plugin-loading mechanism. See DESIGN.md.
#[derive(Default)]
pub struct TableCatalog {
    providers: HashMap<String, Arc<dyn TableProvider>>,
}

impl TableCatalog {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Registers a provider under its own `name()`.
    pub fn register(&mut self, provider: Arc<dyn TableProvider>) {
        let name = provider.name().to_string();
        self.providers.insert(name, provider);
    }

    /// Registers a provider under an explicit alias, distinct from its own
    /// `name()`. Used for multi-segment keys and `AS` aliasing at the
    /// catalog level.
    pub fn register_as(&mut self, alias: impl Into<String>, provider: Arc<dyn TableProvider>) {
        self.providers.insert(alias.into(), provider);
    }

    /// Looks up a provider by name. Backtick quoting is stripped before
    /// lookup; identifiers are otherwise case-sensitive.
    pub fn get(&self, name: &str) -> Result<Arc<dyn TableProvider>> {
        let stripped = name.trim_matches('`');
        self.providers
            .get(stripped)
            .cloned()
            .ok_or_else(|| Error::TableDoesNotExist(stripped.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name.trim_matches('`'))
    }
}
