// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for setting-engine.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The embedding application chooses the exporter (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `setting_engine_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `outcome`: resolved, not_found, ambiguous, invalid_version, store, config, conversion
//! - `store`: memory, sql, ...
//! - `operation`: select, update, save_many
//! - `status`: success, error

use metrics::{counter, histogram};
use std::time::{Duration, Instant};

/// Record the outcome of one resolution
pub fn record_resolution(outcome: &'static str) {
    counter!("setting_engine_resolutions_total", "outcome" => outcome).increment(1);
}

/// Record how many candidate rows a store returned for one setting
pub fn record_candidates(count: usize) {
    histogram!("setting_engine_candidates_fetched").record(count as f64);
}

/// Record a store call
pub fn record_store_operation(store: &'static str, operation: &'static str, status: &'static str) {
    counter!(
        "setting_engine_store_operations_total",
        "store" => store,
        "operation" => operation,
        "status" => status
    )
    .increment(1);
}

/// Record rows written by one persist call
pub fn record_rows_written(store: &'static str, rows: usize) {
    counter!("setting_engine_rows_written_total", "store" => store).increment(rows as u64);
}

/// Record operation latency
pub fn record_latency(operation: &'static str, duration: Duration) {
    histogram!("setting_engine_operation_seconds", "operation" => operation).record(duration.as_secs_f64());
}

/// Record the number of defaults seeded by initialization
pub fn record_defaults_initialized(count: usize) {
    counter!("setting_engine_defaults_initialized_total").increment(count as u64);
}

/// Timer guard that records latency on drop
pub struct LatencyTimer {
    operation: &'static str,
    start: Instant,
}

impl LatencyTimer {
    /// Start a new latency timer
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_latency(self.operation, self.start.elapsed());
    }
}
