//! Candidate records and exact dimension assignments.
//!
//! A [`CandidateRecord`] is one stored row: a setting name, its serialized
//! value and one value per declared dimension. A [`DimensionAssignment`] is
//! the precise address of a row, used by writes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One stored row for a setting.
///
/// # Example
///
/// ```
/// use setting_engine::CandidateRecord;
///
/// let record = CandidateRecord::new("Db.Timeout", "30")
///     .with_dimension("Environment", "*")
///     .with_dimension("Version", "1.3.0");
///
/// assert_eq!(record.dimension("Environment"), Some("*"));
/// assert!(record.dimension("Region").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub setting_name: String,
    pub value: String,
    #[serde(default)]
    pub dimensions: BTreeMap<String, String>,
}

impl CandidateRecord {
    pub fn new(setting_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            setting_name: setting_name.into(),
            value: value.into(),
            dimensions: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_dimension(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.dimensions.insert(name.into(), value.into());
        self
    }

    /// Stored value for a dimension, if the row carries one.
    #[must_use]
    pub fn dimension(&self, name: &str) -> Option<&str> {
        self.dimensions.get(name).map(String::as_str)
    }

    /// The address this row occupies.
    #[must_use]
    pub fn assignment(&self) -> DimensionAssignment {
        DimensionAssignment {
            setting_name: self.setting_name.clone(),
            dimensions: self.dimensions.clone(),
        }
    }
}

/// Full addressing key of one row: the setting name plus a value for every
/// declared dimension, wildcards included.
///
/// Matching is plain string equality; there is no wildcard expansion and no
/// version-range matching on the write path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DimensionAssignment {
    pub setting_name: String,
    #[serde(default)]
    pub dimensions: BTreeMap<String, String>,
}

impl DimensionAssignment {
    pub fn new(setting_name: impl Into<String>) -> Self {
        Self {
            setting_name: setting_name.into(),
            dimensions: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_dimension(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.dimensions.insert(name.into(), value.into());
        self
    }

    /// True if `record` sits at exactly this address.
    #[must_use]
    pub fn matches_exactly(&self, record: &CandidateRecord) -> bool {
        record.setting_name == self.setting_name && record.dimensions == self.dimensions
    }

    /// Build the record this assignment would store.
    #[must_use]
    pub fn to_record(&self, value: impl Into<String>) -> CandidateRecord {
        CandidateRecord {
            setting_name: self.setting_name.clone(),
            value: value.into(),
            dimensions: self.dimensions.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_requires_every_dimension() {
        let assignment = DimensionAssignment::new("Foo")
            .with_dimension("Environment", "*")
            .with_dimension("Version", "1.0.0");

        let same = CandidateRecord::new("Foo", "a")
            .with_dimension("Environment", "*")
            .with_dimension("Version", "1.0.0");
        let other_version = CandidateRecord::new("Foo", "a")
            .with_dimension("Environment", "*")
            .with_dimension("Version", "1.0.1");
        let missing_version = CandidateRecord::new("Foo", "a").with_dimension("Environment", "*");

        assert!(assignment.matches_exactly(&same));
        assert!(!assignment.matches_exactly(&other_version));
        assert!(!assignment.matches_exactly(&missing_version));
    }

    #[test]
    fn test_wildcard_is_not_expanded_on_write_path() {
        let assignment = DimensionAssignment::new("Foo").with_dimension("Environment", "ABC");
        let wildcard_row = CandidateRecord::new("Foo", "a").with_dimension("Environment", "*");
        assert!(!assignment.matches_exactly(&wildcard_row));
    }

    #[test]
    fn test_record_assignment_round_trip() {
        let record = CandidateRecord::new("Foo", "bar").with_dimension("Environment", "XYZ");
        let rebuilt = record.assignment().to_record("bar");
        assert_eq!(rebuilt, record);
    }

    #[test]
    fn test_deserialize_without_dimensions() {
        let record: CandidateRecord =
            serde_json::from_str(r#"{"setting_name":"Foo","value":"1"}"#).unwrap();
        assert!(record.dimensions.is_empty());
    }
}
