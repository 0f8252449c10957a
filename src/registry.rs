// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Statically declared settings and the per-namespace resolver registry.
//!
//! Settings are declared once at startup instead of being discovered from
//! program structure:
//!
//! ```
//! use setting_engine::{SettingDefinition, SettingRegistry, ValueKind};
//!
//! let mut registry = SettingRegistry::new();
//! registry.register(
//!     SettingDefinition::builder("Db.Timeout")
//!         .description("Command timeout in seconds")
//!         .kind(ValueKind::Integer)
//!         .default("30")
//!         .build()
//!         .unwrap(),
//! ).unwrap();
//! registry.register(
//!     SettingDefinition::builder("Ui.Theme").optional(true).build().unwrap(),
//! ).unwrap();
//!
//! assert_eq!(registry.len(), 2);
//! assert_eq!(registry.get("Db.Timeout").unwrap().kind, ValueKind::Integer);
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::ConfigError;
use crate::resolver::SettingResolver;
use crate::value::ValueKind;

/// Declaration of one setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingDefinition {
    pub name: String,
    pub kind: ValueKind,
    /// Stored form of the default value
    pub default: Option<String>,
    /// Absent values are acceptable
    pub optional: bool,
    pub description: Option<String>,
}

impl SettingDefinition {
    pub fn builder(name: impl Into<String>) -> SettingDefinitionBuilder {
        SettingDefinitionBuilder {
            name: name.into(),
            kind: ValueKind::Text,
            default: None,
            optional: false,
            description: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SettingDefinitionBuilder {
    name: String,
    kind: ValueKind,
    default: Option<String>,
    optional: bool,
    description: Option<String>,
}

impl SettingDefinitionBuilder {
    #[must_use]
    pub fn kind(mut self, kind: ValueKind) -> Self {
        self.kind = kind;
        self
    }

    /// Default in stored (string) form.
    #[must_use]
    pub fn default(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    #[must_use]
    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// # Errors
    ///
    /// Fails for an empty name or a default that is not a valid value of the
    /// declared kind.
    pub fn build(self) -> Result<SettingDefinition, ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::EmptySettingName);
        }
        if let Some(ref default) = self.default {
            if self.kind.parse(default).is_err() {
                return Err(ConfigError::InvalidDefault {
                    setting: self.name,
                    kind: self.kind,
                    value: default.clone(),
                });
            }
        }
        Ok(SettingDefinition {
            name: self.name,
            kind: self.kind,
            default: self.default,
            optional: self.optional,
            description: self.description,
        })
    }
}

/// Settings known to the application, by name.
#[derive(Debug, Clone, Default)]
pub struct SettingRegistry {
    definitions: BTreeMap<String, SettingDefinition>,
}

impl SettingRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// Fails if a setting with the same name is already registered.
    pub fn register(&mut self, definition: SettingDefinition) -> Result<&mut Self, ConfigError> {
        if self.definitions.contains_key(&definition.name) {
            return Err(ConfigError::DuplicateSetting(definition.name));
        }
        self.definitions.insert(definition.name.clone(), definition);
        Ok(self)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SettingDefinition> {
        self.definitions.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SettingDefinition> {
        self.definitions.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Resolvers by namespace (one per configuration area).
///
/// Constructed once per process and passed by reference; tests tear it down
/// with [`ResolverRegistry::clear`].
#[derive(Default)]
pub struct ResolverRegistry {
    resolvers: DashMap<String, Arc<SettingResolver>>,
}

impl ResolverRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resolver, returning the one it replaces.
    pub fn insert(&self, namespace: impl Into<String>, resolver: Arc<SettingResolver>) -> Option<Arc<SettingResolver>> {
        self.resolvers.insert(namespace.into(), resolver)
    }

    #[must_use]
    pub fn get(&self, namespace: &str) -> Option<Arc<SettingResolver>> {
        self.resolvers.get(namespace).map(|r| Arc::clone(r.value()))
    }

    pub fn remove(&self, namespace: &str) -> Option<Arc<SettingResolver>> {
        self.resolvers.remove(namespace).map(|(_, r)| r)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    pub fn clear(&self) {
        self.resolvers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::InMemoryStore;

    #[test]
    fn test_builder_defaults() {
        let def = SettingDefinition::builder("Foo").build().unwrap();
        assert_eq!(def.kind, ValueKind::Text);
        assert!(def.default.is_none());
        assert!(!def.optional);
    }

    #[test]
    fn test_invalid_default_rejected() {
        let err = SettingDefinition::builder("Port")
            .kind(ValueKind::Integer)
            .default("eighty")
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidDefault {
                setting: "Port".into(),
                kind: ValueKind::Integer,
                value: "eighty".into(),
            }
        );
    }

    #[test]
    fn test_empty_name_rejected() {
        assert_eq!(
            SettingDefinition::builder("").build().unwrap_err(),
            ConfigError::EmptySettingName
        );
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = SettingRegistry::new();
        registry
            .register(SettingDefinition::builder("Foo").build().unwrap())
            .unwrap();
        let err = registry
            .register(SettingDefinition::builder("Foo").build().unwrap())
            .unwrap_err();
        assert_eq!(err, ConfigError::DuplicateSetting("Foo".into()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_resolver_registry_lifecycle() {
        let registry = ResolverRegistry::new();
        let resolver = Arc::new(
            SettingResolver::builder(Arc::new(InMemoryStore::new()))
                .build()
                .unwrap(),
        );

        assert!(registry.insert("billing", Arc::clone(&resolver)).is_none());
        assert!(registry.insert("billing", Arc::clone(&resolver)).is_some());
        assert!(registry.get("billing").is_some());
        assert!(registry.get("shipping").is_none());

        assert!(registry.remove("billing").is_some());
        registry.insert("shipping", resolver);
        registry.clear();
        assert!(registry.is_empty());
    }
}
