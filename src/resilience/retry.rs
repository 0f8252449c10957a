// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Retry with exponential backoff for store operations.
//!
//! The resolution pipeline itself never retries. Adapters wrap their own
//! connection and query calls so transient backend failures stay invisible
//! to filtering.
//!
//! # Example
//!
//! ```
//! use setting_engine::RetryConfig;
//!
//! // Connecting: fail fast on a wrong URL
//! assert_eq!(RetryConfig::connect().max_attempts, 5);
//!
//! // Reads: a couple of quick retries, then surface the error
//! assert_eq!(RetryConfig::query().max_attempts, 3);
//!
//! // Transactions roll back on failure, so they may be replayed once
//! assert_eq!(RetryConfig::write().max_attempts, 2);
//! ```

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

/// Backoff schedule for one kind of store call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub factor: f64,
    /// Total attempts, first one included. Always at least 1.
    pub max_attempts: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::query()
    }
}

impl RetryConfig {
    /// Opening a pool or creating the schema.
    #[must_use]
    pub fn connect() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
            factor: 2.0,
        }
    }

    /// Single `SELECT`s.
    #[must_use]
    pub fn query() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            factor: 2.0,
        }
    }

    /// Whole write transactions.
    #[must_use]
    pub fn write() -> Self {
        Self {
            max_attempts: 2,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_millis(250),
            factor: 1.0,
        }
    }

    /// Minimal delays for unit tests.
    #[cfg(test)]
    pub fn test() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            factor: 2.0,
        }
    }

    /// Delay to wait after `delay`.
    #[must_use]
    pub fn next_delay(&self, delay: Duration) -> Duration {
        delay.mul_f64(self.factor).min(self.max_delay)
    }
}

/// Run `operation` until it succeeds or the attempts are used up; the last
/// error is returned.
pub async fn retry<F, Fut, T, E>(operation_name: &str, config: &RetryConfig, operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    retry_if(operation_name, config, |_| true, operation).await
}

/// Like [`retry`], but an error for which `is_transient` returns false is
/// returned at once.
pub async fn retry_if<F, Fut, T, E, P>(
    operation_name: &str,
    config: &RetryConfig,
    is_transient: P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let max_attempts = config.max_attempts.max(1);
    let mut delay = config.initial_delay;
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    info!(operation = operation_name, attempt, "Store operation recovered");
                }
                return Ok(value);
            }
            Err(err) if !is_transient(&err) => {
                warn!(operation = operation_name, attempt, error = %err, "Store operation failed permanently");
                return Err(err);
            }
            Err(err) if attempt >= max_attempts => {
                warn!(operation = operation_name, attempt, error = %err, "Store operation gave up");
                return Err(err);
            }
            Err(err) => {
                warn!(
                    operation = operation_name,
                    attempt,
                    max_attempts,
                    error = %err,
                    retry_in = ?delay,
                    "Store operation failed, retrying"
                );
                sleep(delay).await;
                delay = config.next_delay(delay);
                attempt += 1;
            }
        }
    }
}
