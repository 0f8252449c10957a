// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Resolution pipeline.
//!
//! Narrows the candidates fetched for one setting down to a single record:
//!
//! ```text
//! Start ─► DefaultKey ─► Dimension(Environment) ─► Dimension(Version) ─► … ─┬─► Resolved
//!              │                  │                        │                ├─► Ambiguous
//!              └──────────────────┴────────────────────────┴──── empty ─────┴─► NotFound
//! ```
//!
//! The pipeline holds no state between calls. Every resolution re-runs all
//! steps against a freshly fetched candidate set.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, trace, warn};

use crate::candidate::CandidateRecord;
use crate::dimension::DimensionKey;
use crate::error::{AttemptedDimensions, ResolveError};

/// A caller's request: the setting name and the values wanted for each
/// dimension. The default key's value is always the setting name.
///
/// ```
/// use setting_engine::ResolutionRequest;
///
/// let request = ResolutionRequest::new("Db.Timeout")
///     .with("Environment", "ABC")
///     .with("Version", "1.1.3");
///
/// assert_eq!(request.requested.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRequest {
    pub setting_name: String,
    pub requested: BTreeMap<String, String>,
}

impl ResolutionRequest {
    pub fn new(setting_name: impl Into<String>) -> Self {
        Self {
            setting_name: setting_name.into(),
            requested: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, dimension: impl Into<String>, value: impl Into<String>) -> Self {
        self.requested.insert(dimension.into(), value.into());
        self
    }
}

/// Where the pipeline currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionState {
    Start,
    DefaultKey,
    Dimension(String),
    Resolved,
    NotFound,
    Ambiguous,
}

impl fmt::Display for ResolutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "Start"),
            Self::DefaultKey => write!(f, "DefaultKey"),
            Self::Dimension(name) => write!(f, "Dimension({})", name),
            Self::Resolved => write!(f, "Resolved"),
            Self::NotFound => write!(f, "NotFound"),
            Self::Ambiguous => write!(f, "Ambiguous"),
        }
    }
}

/// Narrow `candidates` to the single record matching `setting_name` and
/// every key in `keys` (already in evaluation order).
///
/// # Errors
///
/// - [`ResolveError::SettingNotFound`] when a step leaves nothing
/// - [`ResolveError::AmbiguousResolution`] when more than one record survives
/// - whatever a strategy reports (e.g. [`ResolveError::InvalidVersionFormat`])
pub fn resolve_candidates(
    setting_name: &str,
    keys: &[DimensionKey],
    candidates: Vec<CandidateRecord>,
) -> Result<CandidateRecord, ResolveError> {
    let attempted = || {
        AttemptedDimensions(
            keys.iter()
                .map(|k| (k.name.clone(), k.requested.clone()))
                .collect(),
        )
    };
    let not_found = |state: &ResolutionState| {
        debug!(setting = %setting_name, state = %state, "No candidate survived");
        ResolveError::SettingNotFound {
            setting: setting_name.to_string(),
            dimensions: attempted(),
        }
    };

    trace!(setting = %setting_name, state = %ResolutionState::Start, candidates = candidates.len());

    let state = ResolutionState::DefaultKey;
    let mut remaining: Vec<CandidateRecord> = candidates
        .into_iter()
        .filter(|c| c.setting_name == setting_name)
        .collect();
    trace!(setting = %setting_name, state = %state, remaining = remaining.len());
    if remaining.is_empty() {
        return Err(not_found(&state));
    }

    for key in keys {
        let state = ResolutionState::Dimension(key.name.clone());
        remaining = key.strategy.apply(&key.name, &key.requested, remaining)?;
        trace!(
            setting = %setting_name,
            state = %state,
            requested = %key.requested,
            strategy = key.strategy.name(),
            remaining = remaining.len()
        );
        if remaining.is_empty() {
            return Err(not_found(&state));
        }
    }

    if remaining.len() > 1 {
        warn!(
            setting = %setting_name,
            state = %ResolutionState::Ambiguous,
            candidates = remaining.len(),
            "Refusing to pick one of several equally matching rows"
        );
        return Err(ResolveError::AmbiguousResolution {
            setting: setting_name.to_string(),
            dimensions: attempted(),
            candidates: remaining.len(),
        });
    }

    trace!(setting = %setting_name, state = %ResolutionState::Resolved);
    remaining.pop().ok_or_else(|| not_found(&ResolutionState::NotFound))
}
