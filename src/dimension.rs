//! Dimension keys and the declared dimension set.
//!
//! The default key ([`DEFAULT_KEY_NAME`]) is the setting's own name. It is
//! always evaluated first; every other dimension follows in ordinal order of
//! its name.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::filter::FilterStrategy;

/// Reserved name of the default key.
pub const DEFAULT_KEY_NAME: &str = "Name";

/// Stored value meaning "applies regardless of the requested value".
pub const WILDCARD: &str = "*";

/// One dimension of a resolution: its name, the value requested for it and
/// the strategy that applies it.
#[derive(Clone)]
pub struct DimensionKey {
    pub name: String,
    pub requested: String,
    pub strategy: Arc<dyn FilterStrategy>,
}

impl fmt::Debug for DimensionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DimensionKey")
            .field("name", &self.name)
            .field("requested", &self.requested)
            .field("strategy", &self.strategy.name())
            .finish()
    }
}

/// Custom dimensions declared on a resolver, in evaluation order.
#[derive(Debug, Clone, Default)]
pub struct Dimensions {
    declared: BTreeMap<String, Arc<dyn FilterStrategy>>,
}

impl Dimensions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a dimension.
    ///
    /// # Errors
    ///
    /// Fails for an empty name, the reserved default-key name or a name
    /// declared twice.
    pub fn declare(
        &mut self,
        name: impl Into<String>,
        strategy: Arc<dyn FilterStrategy>,
    ) -> Result<(), ConfigError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ConfigError::EmptyDimensionName);
        }
        if name == DEFAULT_KEY_NAME {
            return Err(ConfigError::ReservedDimension(name));
        }
        if self.declared.contains_key(&name) {
            return Err(ConfigError::DuplicateDimension(name));
        }
        self.declared.insert(name, strategy);
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.declared.contains_key(name)
    }

    /// Declared names in evaluation order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.declared.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.declared.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.declared.is_empty()
    }

    /// Ordered dimension keys for one resolution.
    ///
    /// Declared dimensions without a requested value are not filtered.
    ///
    /// # Errors
    ///
    /// Fails if `requested` names the default key or an undeclared dimension.
    pub fn keys_for(&self, requested: &BTreeMap<String, String>) -> Result<Vec<DimensionKey>, ConfigError> {
        for name in requested.keys() {
            if name == DEFAULT_KEY_NAME {
                return Err(ConfigError::ReservedDimension(name.clone()));
            }
            if !self.declared.contains_key(name) {
                return Err(ConfigError::UnknownDimension(name.clone()));
            }
        }

        Ok(self
            .declared
            .iter()
            .filter_map(|(name, strategy)| {
                requested.get(name).map(|value| DimensionKey {
                    name: name.clone(),
                    requested: value.clone(),
                    strategy: Arc::clone(strategy),
                })
            })
            .collect())
    }

    /// Check that an update addresses exactly the declared dimensions.
    pub(crate) fn check_assignment(
        &self,
        setting: &str,
        assigned: &BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        let matches = assigned.len() == self.declared.len()
            && assigned.keys().all(|k| self.declared.contains_key(k));
        if matches {
            return Ok(());
        }
        Err(ConfigError::DimensionMismatch {
            setting: setting.to_string(),
            expected: self.names().collect::<Vec<_>>().join(", "),
            actual: assigned.keys().map(String::as_str).collect::<Vec<_>>().join(", "),
        })
    }
}
