//! Name → type resolution for work requests.
//!
//! A work request names its output type with a string. The catalog maps those
//! names to [`TypeKey`]s. Every type seen in a registration is recorded under
//! its Rust type name; callers add friendlier aliases on top.

use indexmap::IndexMap;

use crate::types::TypeKey;

/// Names known to a registry, in the order they were added.
#[derive(Debug, Clone, Default)]
pub struct TypeCatalog {
    names: IndexMap<String, TypeKey>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a type under its Rust type name.
    ///
    /// Does nothing if the name is already present.
    pub fn record(&mut self, key: TypeKey) {
        self.names.entry(key.name().to_string()).or_insert(key);
    }

    /// Bind `name` to `key`, replacing any earlier binding of that name.
    pub fn alias(&mut self, name: impl Into<String>, key: TypeKey) {
        self.record(key);
        self.names.insert(name.into(), key);
    }

    /// Look up a type by name or alias.
    pub fn resolve(&self, name: &str) -> Option<TypeKey> {
        self.names.get(name).copied()
    }

    /// All names bound to `key`, in insertion order.
    pub fn names_of(&self, key: TypeKey) -> Vec<&str> {
        self.names
            .iter()
            .filter(|(_, k)| **k == key)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Preferred display name for `key`: the last alias bound to it, falling
    /// back to the Rust type name.
    pub fn display_name(&self, key: TypeKey) -> &str {
        self.names
            .iter()
            .rev()
            .find(|(_, k)| **k == key)
            .map(|(name, _)| name.as_str())
            .unwrap_or(key.name())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_uses_rust_type_name() {
        let mut catalog = TypeCatalog::new();
        catalog.record(TypeKey::of::<i64>());

        assert_eq!(catalog.resolve("i64"), Some(TypeKey::of::<i64>()));
        assert_eq!(catalog.resolve("Integer"), None);
    }

    #[test]
    fn test_alias_records_type_too() {
        let mut catalog = TypeCatalog::new();
        catalog.alias("Integer", TypeKey::of::<i64>());

        assert_eq!(catalog.resolve("Integer"), Some(TypeKey::of::<i64>()));
        assert_eq!(catalog.resolve("i64"), Some(TypeKey::of::<i64>()));
        assert_eq!(catalog.names_of(TypeKey::of::<i64>()), vec!["i64", "Integer"]);
    }

    #[test]
    fn test_alias_rebinds_name() {
        let mut catalog = TypeCatalog::new();
        catalog.alias("Number", TypeKey::of::<i64>());
        catalog.alias("Number", TypeKey::of::<f64>());

        assert_eq!(catalog.resolve("Number"), Some(TypeKey::of::<f64>()));
    }

    #[test]
    fn test_display_name_prefers_alias() {
        let mut catalog = TypeCatalog::new();
        catalog.record(TypeKey::of::<bool>());
        assert_eq!(catalog.display_name(TypeKey::of::<bool>()), "bool");

        catalog.alias("Boolean", TypeKey::of::<bool>());
        assert_eq!(catalog.display_name(TypeKey::of::<bool>()), "Boolean");

        assert_eq!(catalog.display_name(TypeKey::of::<u8>()), "u8");
    }
}
