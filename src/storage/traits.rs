use async_trait::async_trait;
use thiserror::Error;

use crate::candidate::{CandidateRecord, DimensionAssignment};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Constraint violated: {0}")]
    Constraint(String),
    #[error("Invalid identifier '{0}' (expected [A-Za-z_][A-Za-z0-9_]*)")]
    InvalidIdentifier(String),
}

/// Boundary contract every setting store implements.
///
/// Stores never filter by dimension on reads; that is the pipeline's job.
/// Writes are exact-address upserts and must be atomic per call.
#[async_trait]
pub trait SettingStore: Send + Sync {
    /// Every stored row whose setting name equals `setting_name`, regardless
    /// of its dimension values. May be empty.
    async fn select(&self, setting_name: &str) -> Result<Vec<CandidateRecord>, StorageError>;

    /// Overwrite the value of the row at exactly `assignment`, or insert it.
    /// Returns the number of affected rows.
    async fn update(&self, assignment: &DimensionAssignment, value: &str) -> Result<usize, StorageError>;

    /// Upsert many rows as one all-or-nothing operation.
    async fn save_many(&self, rows: &[(DimensionAssignment, String)]) -> Result<usize, StorageError>;

    /// Whether a row sits at exactly `assignment`.
    /// Default implementation filters the result of [`SettingStore::select`].
    async fn exists(&self, assignment: &DimensionAssignment) -> Result<bool, StorageError> {
        let rows = self.select(&assignment.setting_name).await?;
        Ok(rows.iter().any(|r| assignment.matches_exactly(r)))
    }

    /// Label used in logs and metrics.
    fn kind(&self) -> &'static str;
}
