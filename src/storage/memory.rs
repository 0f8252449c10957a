use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::candidate::{CandidateRecord, DimensionAssignment};
use super::traits::{SettingStore, StorageError};

const NO_FAULT: usize = usize::MAX;

/// Process-local setting rows.
///
/// All rows live behind one lock, so a [`SettingStore::save_many`] batch is
/// staged on a copy and swapped in whole: either every row lands or none.
pub struct InMemoryStore {
    rows: RwLock<Vec<CandidateRecord>>,
    fail_after: AtomicUsize,
    fail_reads: AtomicBool,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            fail_after: AtomicUsize::new(NO_FAULT),
            fail_reads: AtomicBool::new(false),
        }
    }

    /// Seed the store with existing rows.
    #[must_use]
    pub fn with_rows(rows: impl IntoIterator<Item = CandidateRecord>) -> Self {
        let store = Self::new();
        store.rows.write().extend(rows);
        store
    }

    /// Get current row count
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Check if empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Clear all rows
    pub fn clear(&self) {
        self.rows.write().clear();
    }

    /// Snapshot of every stored row.
    #[must_use]
    pub fn rows(&self) -> Vec<CandidateRecord> {
        self.rows.read().clone()
    }

    /// Make every write call fail once `applied` rows of it were staged.
    /// Used to exercise batch atomicity.
    pub fn fail_writes_after(&self, applied: usize) {
        self.fail_after.store(applied, Ordering::SeqCst);
    }

    /// Make every `select` fail until [`InMemoryStore::heal`].
    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    /// Remove every injected fault.
    pub fn heal(&self) {
        self.fail_after.store(NO_FAULT, Ordering::SeqCst);
        self.fail_reads.store(false, Ordering::SeqCst);
    }

    fn upsert(rows: &mut Vec<CandidateRecord>, assignment: &DimensionAssignment, value: &str) -> Result<(), StorageError> {
        if assignment.setting_name.is_empty() {
            return Err(StorageError::Constraint("setting name must not be empty".into()));
        }
        match rows.iter_mut().find(|r| assignment.matches_exactly(r)) {
            Some(existing) => existing.value = value.to_string(),
            None => rows.push(assignment.to_record(value)),
        }
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SettingStore for InMemoryStore {
    async fn select(&self, setting_name: &str) -> Result<Vec<CandidateRecord>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Backend("injected read failure".into()));
        }
        Ok(self
            .rows
            .read()
            .iter()
            .filter(|r| r.setting_name == setting_name)
            .cloned()
            .collect())
    }

    async fn update(&self, assignment: &DimensionAssignment, value: &str) -> Result<usize, StorageError> {
        self.save_many(&[(assignment.clone(), value.to_string())]).await
    }

    async fn save_many(&self, rows: &[(DimensionAssignment, String)]) -> Result<usize, StorageError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let fail_after = self.fail_after.load(Ordering::SeqCst);
        let mut guard = self.rows.write();
        let mut staged = guard.clone();

        for (applied, (assignment, value)) in rows.iter().enumerate() {
            if applied >= fail_after {
                return Err(StorageError::Backend(format!(
                    "injected failure after {} row(s)",
                    applied
                )));
            }
            Self::upsert(&mut staged, assignment, value)?;
        }

        *guard = staged;
        Ok(rows.len())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}
