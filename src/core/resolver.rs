//! Table identity resolution
//!
//! Maps a storage key to the table it belongs to. Pure and deterministic: the
//! same key always resolves to the same identity.

use crate::config::CatalogConfig;
use crate::domain::ids::TableId;
use crate::domain::table::TableIdentity;
use crate::domain::{GateError, Result};
use std::collections::BTreeMap;

/// Markers separating a table's prefix from its files
const LAYOUT_MARKERS: [&str; 2] = ["/data/", "/metadata/"];

/// Resolves storage keys and table ids to [`TableIdentity`]
#[derive(Debug, Clone)]
pub struct TableResolver {
    catalog_name: String,
    mappings: BTreeMap<String, String>,
}

impl TableResolver {
    /// Creates a resolver with a catalog name and static table id -> name mappings
    pub fn new(catalog_name: impl Into<String>, mappings: BTreeMap<String, String>) -> Self {
        Self {
            catalog_name: catalog_name.into(),
            mappings,
        }
    }

    /// Creates a resolver from the `[catalog]` section
    pub fn from_config(config: &CatalogConfig) -> Self {
        Self::new(config.name.clone(), config.table_mappings.clone())
    }

    /// Derives the table id from a storage key
    ///
    /// The prefix before the first `/data/` marker, else before the first
    /// `/metadata/` marker, else the key's parent path (the key itself when it
    /// has no `/`).
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Validation`] when the derived id is empty.
    pub fn table_id_from_key(key: &str) -> Result<TableId> {
        let prefix = LAYOUT_MARKERS
            .iter()
            .find_map(|marker| key.find(marker).map(|pos| &key[..pos]))
            .unwrap_or_else(|| key.rsplit_once('/').map_or(key, |(parent, _)| parent));

        TableId::new(prefix).map_err(|e| {
            GateError::Validation(format!("cannot derive table id from key '{key}': {e}"))
        })
    }

    /// Resolves a storage key to a table identity
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Validation`] when no table id can be derived.
    pub fn resolve(&self, key: &str) -> Result<TableIdentity> {
        Ok(self.identity_for(Self::table_id_from_key(key)?))
    }

    /// Builds the identity of a known table id
    ///
    /// A static mapping wins; otherwise `/` separators become `.`.
    pub fn identity_for(&self, table_id: TableId) -> TableIdentity {
        let name = match self.mappings.get(table_id.as_str()) {
            Some(mapped) => mapped.clone(),
            None => table_id.as_str().replace('/', "."),
        };
        let fully_qualified_name = format!("{}.{}", self.catalog_name, name);
        TableIdentity::new(table_id, fully_qualified_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn resolver() -> TableResolver {
        let mut mappings = BTreeMap::new();
        mappings.insert("warehouse/events".to_string(), "analytics.events".to_string());
        TableResolver::new("cat", mappings)
    }

    #[test_case("sales/orders/data/0001-deletes.parquet", "sales/orders" ; "data marker")]
    #[test_case("sales/orders/metadata/snap-1.avro", "sales/orders" ; "metadata marker")]
    #[test_case("sales/orders/data/dt=2024/data/x", "sales/orders" ; "first occurrence wins")]
    #[test_case("t/metadata/x/data/y", "t/metadata/x" ; "data marker takes precedence")]
    #[test_case("a/b/c/file-deletes.parquet", "a/b/c" ; "parent path fallback")]
    #[test_case("file-deletes.parquet", "file-deletes.parquet" ; "key without separator")]
    fn test_table_id_from_key(key: &str, expected: &str) {
        assert_eq!(TableResolver::table_id_from_key(key).unwrap().as_str(), expected);
    }

    #[test_case("/data/0001-deletes.parquet" ; "empty prefix before marker")]
    #[test_case("/file-deletes.parquet" ; "empty parent path")]
    fn test_table_id_from_key_rejects_empty(key: &str) {
        assert!(matches!(
            TableResolver::table_id_from_key(key),
            Err(GateError::Validation(_))
        ));
    }

    #[test]
    fn test_resolve_derives_name_from_table_id() {
        let identity = resolver()
            .resolve("sales/orders/data/0001-deletes.parquet")
            .unwrap();
        assert_eq!(identity.table_id.as_str(), "sales/orders");
        assert_eq!(identity.fully_qualified_name, "cat.sales.orders");
    }

    #[test]
    fn test_resolve_uses_static_mapping() {
        let identity = resolver()
            .resolve("warehouse/events/data/part-deletes.parquet")
            .unwrap();
        assert_eq!(identity.fully_qualified_name, "cat.analytics.events");
    }

    #[test]
    fn test_resolve_is_deterministic_across_keys_of_one_table() {
        let resolver = resolver();
        let first = resolver.resolve("sales/orders/data/a-deletes.parquet").unwrap();
        let second = resolver.resolve("sales/orders/data/b/c-deletes.parquet").unwrap();
        let third = resolver.resolve("sales/orders/metadata/v3.json").unwrap();
        assert_eq!(first, second);
        assert_eq!(first, third);
        assert_eq!(first, resolver.clone().resolve("sales/orders/data/a-deletes.parquet").unwrap());
    }
}
