//! Error kinds surfaced by the resolution engine.
//!
//! Adapter failures stay [`StorageError`]s at the store seam and are wrapped
//! into [`ResolveError::Store`] with the setting name and the attempted
//! dimension values, so an operator can tell which row was expected.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::storage::traits::StorageError;
use crate::value::ValueKind;

/// Dimension values attempted during one resolution or update.
///
/// Renders as `Environment=ABC, Version=1.1.3` (or `<none>`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttemptedDimensions(pub BTreeMap<String, String>);

impl fmt::Display for AttemptedDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<none>");
        }
        let mut first = true;
        for (name, value) in &self.0 {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, value)?;
            first = false;
        }
        Ok(())
    }
}

impl From<&BTreeMap<String, String>> for AttemptedDimensions {
    fn from(map: &BTreeMap<String, String>) -> Self {
        Self(map.clone())
    }
}

/// Registration and addressing mistakes made by the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Dimension name '{0}' is reserved for the setting name")]
    ReservedDimension(String),
    #[error("Dimension '{0}' is declared more than once")]
    DuplicateDimension(String),
    #[error("Dimension names must not be empty")]
    EmptyDimensionName,
    #[error("Dimension '{0}' is not declared on this resolver")]
    UnknownDimension(String),
    #[error("Setting '{setting}' must address dimensions [{expected}] exactly, got [{actual}]")]
    DimensionMismatch {
        setting: String,
        expected: String,
        actual: String,
    },
    #[error("No context value for dimension '{0}'")]
    MissingContext(String),
    #[error("Setting '{0}' is registered more than once")]
    DuplicateSetting(String),
    #[error("Setting names must not be empty")]
    EmptySettingName,
    #[error("Default value '{value}' of setting '{setting}' is not a valid {kind}")]
    InvalidDefault {
        setting: String,
        kind: ValueKind,
        value: String,
    },
}

/// Failures of a single resolution, update or conversion.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Setting '{setting}' not found for dimensions: {dimensions}")]
    SettingNotFound {
        setting: String,
        dimensions: AttemptedDimensions,
    },

    #[error("Setting '{setting}' is ambiguous for dimensions: {dimensions} ({candidates} candidates remain)")]
    AmbiguousResolution {
        setting: String,
        dimensions: AttemptedDimensions,
        candidates: usize,
    },

    #[error("Invalid version '{value}' for dimension '{dimension}': {reason}")]
    InvalidVersionFormat {
        dimension: String,
        value: String,
        reason: String,
    },

    #[error("Store failed for setting '{setting}' with dimensions: {dimensions}: {source}")]
    Store {
        setting: String,
        dimensions: AttemptedDimensions,
        #[source]
        source: StorageError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Setting '{setting}' value '{value}' is not a valid {kind}: {reason}")]
    Conversion {
        setting: String,
        kind: ValueKind,
        value: String,
        reason: String,
    },
}

impl ResolveError {
    /// True for [`ResolveError::SettingNotFound`]; callers use it to apply
    /// their own default-or-fail policy.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SettingNotFound { .. })
    }

    /// Short label used for metrics and log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SettingNotFound { .. } => "not_found",
            Self::AmbiguousResolution { .. } => "ambiguous",
            Self::InvalidVersionFormat { .. } => "invalid_version",
            Self::Store { .. } => "store",
            Self::Config(_) => "config",
            Self::Conversion { .. } => "conversion",
        }
    }
}

/// Every failure collected while loading a registry of settings.
#[derive(Error, Debug)]
#[error("Could not load {} setting(s): {}", .failures.len(), summarize(.failures))]
pub struct LoadError {
    pub failures: Vec<ResolveError>,
}

fn summarize(failures: &[ResolveError]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(pairs: &[(&str, &str)]) -> AttemptedDimensions {
        AttemptedDimensions(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_not_found_message_names_setting_and_dimensions() {
        let err = ResolveError::SettingNotFound {
            setting: "Db.Timeout".into(),
            dimensions: dims(&[("Version", "1.1.3"), ("Environment", "ABC")]),
        };
        assert_eq!(
            err.to_string(),
            "Setting 'Db.Timeout' not found for dimensions: Environment=ABC, Version=1.1.3"
        );
        assert!(err.is_not_found());
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn test_empty_dimensions_render_none() {
        assert_eq!(AttemptedDimensions::default().to_string(), "<none>");
    }

    #[test]
    fn test_store_error_keeps_source() {
        use std::error::Error as _;

        let err = ResolveError::Store {
            setting: "Foo".into(),
            dimensions: dims(&[("Environment", "XYZ")]),
            source: StorageError::Backend("connection refused".into()),
        };
        assert!(err.to_string().contains("Environment=XYZ"));
        assert!(err.source().is_some());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_load_error_lists_every_failure() {
        let err = LoadError {
            failures: vec![
                ResolveError::SettingNotFound {
                    setting: "A".into(),
                    dimensions: AttemptedDimensions::default(),
                },
                ResolveError::Config(ConfigError::UnknownDimension("Region".into())),
            ],
        };
        let message = err.to_string();
        assert!(message.starts_with("Could not load 2 setting(s)"));
        assert!(message.contains("'A' not found"));
        assert!(message.contains("Region"));
    }
}
