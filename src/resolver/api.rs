//! Resolution and persistence operations.
//!
//! - `resolve()` / `resolve_record()` / `resolve_as()` - read one setting
//! - `persist()` / `persist_many()` - exact-address upserts
//! - `assignment_for()` / `persist_value()` - write at the ambient context

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::candidate::{CandidateRecord, DimensionAssignment};
use crate::error::{AttemptedDimensions, ConfigError, ResolveError};
use crate::metrics;
use crate::pipeline::{self, ResolutionRequest};
use crate::storage::traits::StorageError;
use crate::value::{SettingValue, ValueKind};

use super::SettingResolver;

impl SettingResolver {
    // ═══════════════════════════════════════════════════════════════════════════
    // API: Resolution
    // ═══════════════════════════════════════════════════════════════════════════

    /// Resolve the stored value of one setting.
    ///
    /// Requested values in `request` override the resolver's context.
    ///
    /// # Errors
    ///
    /// See [`SettingResolver::resolve_record`].
    pub async fn resolve(&self, request: &ResolutionRequest) -> Result<String, ResolveError> {
        self.resolve_record(request).await.map(|record| record.value)
    }

    /// Resolve one setting and return the winning row.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::SettingNotFound`] when no row survives a step
    /// - [`ResolveError::AmbiguousResolution`] when several rows survive
    /// - [`ResolveError::InvalidVersionFormat`] for a malformed version
    /// - [`ResolveError::Store`] when the store read fails
    /// - [`ResolveError::Config`] for an undeclared requested dimension
    #[tracing::instrument(skip(self, request), fields(setting = %request.setting_name, store = self.store.kind()))]
    pub async fn resolve_record(&self, request: &ResolutionRequest) -> Result<CandidateRecord, ResolveError> {
        let _timer = metrics::LatencyTimer::new("resolve");
        let result = self.resolve_inner(request).await;
        match &result {
            Ok(record) => {
                metrics::record_resolution("resolved");
                debug!(value = %record.value, "Setting resolved");
            }
            Err(e) => {
                metrics::record_resolution(e.kind());
                if !e.is_not_found() {
                    warn!(error = %e, "Setting resolution failed");
                }
            }
        }
        result
    }

    async fn resolve_inner(&self, request: &ResolutionRequest) -> Result<CandidateRecord, ResolveError> {
        let requested = self.merged(&request.requested);
        let keys = self.dimensions.keys_for(&requested)?;

        let store_kind = self.store.kind();
        let candidates = match self.store.select(&request.setting_name).await {
            Ok(rows) => {
                metrics::record_store_operation(store_kind, "select", "success");
                rows
            }
            Err(source) => {
                metrics::record_store_operation(store_kind, "select", "error");
                return Err(self.store_error(&request.setting_name, &requested, source));
            }
        };
        metrics::record_candidates(candidates.len());

        pipeline::resolve_candidates(&request.setting_name, &keys, candidates)
    }

    /// Resolve one setting and convert it to `kind`.
    ///
    /// # Errors
    ///
    /// Everything [`SettingResolver::resolve`] returns, plus
    /// [`ResolveError::Conversion`] when the stored value is not a valid `kind`.
    pub async fn resolve_as(&self, request: &ResolutionRequest, kind: ValueKind) -> Result<SettingValue, ResolveError> {
        let value = self.resolve(request).await?;
        kind.parse(&value).map_err(|reason| ResolveError::Conversion {
            setting: request.setting_name.clone(),
            kind,
            value,
            reason,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // API: Persistence
    // ═══════════════════════════════════════════════════════════════════════════

    /// Write `value` at exactly `assignment`, overwriting any row already
    /// there. Repeating the call leaves the store unchanged.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::Config`] when the assignment does not name every
    ///   declared dimension exactly once
    /// - [`ResolveError::Store`] when the store write fails
    #[tracing::instrument(skip(self, assignment, value), fields(setting = %assignment.setting_name, store = self.store.kind()))]
    pub async fn persist(&self, assignment: &DimensionAssignment, value: &str) -> Result<usize, ResolveError> {
        let _timer = metrics::LatencyTimer::new("persist");
        self.check(assignment)?;

        let store_kind = self.store.kind();
        match self.store.update(assignment, value).await {
            Ok(rows) => {
                metrics::record_store_operation(store_kind, "update", "success");
                metrics::record_rows_written(store_kind, rows);
                debug!(rows, "Setting persisted");
                Ok(rows)
            }
            Err(source) => {
                metrics::record_store_operation(store_kind, "update", "error");
                warn!(error = %source, "Setting persist failed");
                Err(self.store_error(&assignment.setting_name, &assignment.dimensions, source))
            }
        }
    }

    /// Write many rows in one all-or-nothing store call.
    ///
    /// Every assignment is checked before anything is written.
    ///
    /// # Errors
    ///
    /// Same as [`SettingResolver::persist`]; a store failure names the first
    /// row of the batch.
    #[tracing::instrument(skip(self, rows), fields(rows = rows.len(), store = self.store.kind()))]
    pub async fn persist_many(&self, rows: &[(DimensionAssignment, String)]) -> Result<usize, ResolveError> {
        let _timer = metrics::LatencyTimer::new("persist_many");
        for (assignment, _) in rows {
            self.check(assignment)?;
        }
        let Some((first, _)) = rows.first() else {
            return Ok(0);
        };

        let store_kind = self.store.kind();
        match self.store.save_many(rows).await {
            Ok(written) => {
                metrics::record_store_operation(store_kind, "save_many", "success");
                metrics::record_rows_written(store_kind, written);
                debug!(written, "Batch persisted");
                Ok(written)
            }
            Err(source) => {
                metrics::record_store_operation(store_kind, "save_many", "error");
                warn!(error = %source, "Batch persist failed, nothing written");
                Err(self.store_error(&first.setting_name, &first.dimensions, source))
            }
        }
    }

    /// The address of `setting_name` at the resolver's context.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingContext`] when a declared dimension has no
    /// context value.
    pub fn assignment_for(&self, setting_name: &str) -> Result<DimensionAssignment, ConfigError> {
        let mut assignment = DimensionAssignment::new(setting_name);
        for name in self.dimensions.names() {
            let value = self
                .context
                .get(name)
                .ok_or_else(|| ConfigError::MissingContext(name.to_string()))?;
            assignment = assignment.with_dimension(name, value.clone());
        }
        Ok(assignment)
    }

    /// Persist a typed value at the resolver's context.
    ///
    /// # Errors
    ///
    /// Same as [`SettingResolver::assignment_for`] and
    /// [`SettingResolver::persist`].
    pub async fn persist_value(&self, setting_name: &str, value: &SettingValue) -> Result<usize, ResolveError> {
        let assignment = self.assignment_for(setting_name)?;
        self.persist(&assignment, &value.to_stored()).await
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Helpers
    // ═══════════════════════════════════════════════════════════════════════════

    fn merged(&self, requested: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        let mut merged = self.context.clone();
        merged.extend(requested.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    fn check(&self, assignment: &DimensionAssignment) -> Result<(), ConfigError> {
        if assignment.setting_name.is_empty() {
            return Err(ConfigError::EmptySettingName);
        }
        self.dimensions
            .check_assignment(&assignment.setting_name, &assignment.dimensions)
    }

    fn store_error(&self, setting: &str, dimensions: &BTreeMap<String, String>, source: StorageError) -> ResolveError {
        ResolveError::Store {
            setting: setting.to_string(),
            dimensions: AttemptedDimensions::from(dimensions),
            source,
        }
    }
}
