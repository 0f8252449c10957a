//! Public types returned by the resolver.

use std::collections::BTreeMap;
use std::fmt;

use crate::value::SettingValue;

/// Where a loaded value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    /// Resolved from a stored row
    Store,
    /// No row matched; the registered default was used
    Default,
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store => write!(f, "Store"),
            Self::Default => write!(f, "Default"),
        }
    }
}

/// One loaded setting.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSetting {
    pub value: SettingValue,
    pub source: ValueSource,
}

/// Result of loading a whole registry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedSettings {
    pub(super) values: BTreeMap<String, LoadedSetting>,
    /// Optional settings that had neither a row nor a default
    pub(super) absent: Vec<String>,
}

impl LoadedSettings {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SettingValue> {
        self.values.get(name).map(|s| &s.value)
    }

    #[must_use]
    pub fn source(&self, name: &str) -> Option<ValueSource> {
        self.values.get(name).map(|s| s.source)
    }

    #[must_use]
    pub fn is_absent(&self, name: &str) -> bool {
        self.absent.iter().any(|a| a == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LoadedSetting)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of settings holding a value.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
