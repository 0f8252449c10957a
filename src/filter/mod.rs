// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Per-dimension filter strategies.
//!
//! A strategy receives the current candidate set and the requested value of
//! one dimension and returns a subset of it. It never adds records.
//!
//! ```text
//! candidates ──► ExactMatch("Environment", "ABC") ──► VersionUpperBound("Version", "2.0.0") ──► …
//! ```
//!
//! Two strategies ship with the crate:
//!
//! - [`ExactMatch`]: exact value (ASCII case-insensitive), else wildcard rows
//! - [`VersionUpperBound`]: closest semantic version at or below the request,
//!   else wildcard rows
//!
//! New dimensions can bring their own strategy by implementing
//! [`FilterStrategy`].

mod exact;
mod version;

pub use exact::ExactMatch;
pub use version::VersionUpperBound;

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::candidate::CandidateRecord;
use crate::error::ResolveError;

/// Narrows a candidate set by one dimension.
pub trait FilterStrategy: Send + Sync + fmt::Debug {
    /// Label used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Keep the candidates that best satisfy `requested` for `dimension`.
    ///
    /// An empty result means the dimension cannot be satisfied.
    fn apply(
        &self,
        dimension: &str,
        requested: &str,
        candidates: Vec<CandidateRecord>,
    ) -> Result<Vec<CandidateRecord>, ResolveError>;
}

/// Built-in strategies, selectable from configuration.
///
/// ```
/// use setting_engine::filter::Strategy;
///
/// let strategy: Strategy = serde_json::from_str("\"version\"").unwrap();
/// assert_eq!(strategy, Strategy::Version);
/// assert_eq!(strategy.into_filter().name(), "version_upper_bound");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Exact,
    Version,
}

impl Strategy {
    #[must_use]
    pub fn into_filter(self) -> Arc<dyn FilterStrategy> {
        match self {
            Self::Exact => Arc::new(ExactMatch),
            Self::Version => Arc::new(VersionUpperBound),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Version => write!(f, "version"),
        }
    }
}
