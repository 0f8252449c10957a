// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Semantic-version upper bound with wildcard fallback.
//!
//! Picks the rows stored for the closest version at or below the requested
//! one, not the newest available:
//!
//! ```text
//! stored:    1.3.0   2.4.0   3.0.0   *
//! request:              2.4.1
//! result:            2.4.0
//! ```
//!
//! Precedence follows SemVer 2.0: pre-releases sort below their release and
//! build metadata is ignored. Every stored value is parsed before any
//! comparison so corrupt rows surface even when they would lose anyway.

use semver::{BuildMetadata, Version};
use tracing::trace;

use crate::candidate::CandidateRecord;
use crate::dimension::WILDCARD;
use crate::error::ResolveError;

use super::FilterStrategy;

#[derive(Debug, Clone, Copy, Default)]
pub struct VersionUpperBound;

/// Parse a version for ordering purposes (build metadata stripped).
pub(crate) fn parse_version(dimension: &str, raw: &str) -> Result<Version, ResolveError> {
    let mut version = Version::parse(raw.trim()).map_err(|e| ResolveError::InvalidVersionFormat {
        dimension: dimension.to_string(),
        value: raw.to_string(),
        reason: e.to_string(),
    })?;
    version.build = BuildMetadata::EMPTY;
    Ok(version)
}

impl FilterStrategy for VersionUpperBound {
    fn name(&self) -> &'static str {
        "version_upper_bound"
    }

    fn apply(
        &self,
        dimension: &str,
        requested: &str,
        candidates: Vec<CandidateRecord>,
    ) -> Result<Vec<CandidateRecord>, ResolveError> {
        let upper = parse_version(dimension, requested)?;

        let mut wildcards = Vec::new();
        let mut qualifying: Vec<(Version, CandidateRecord)> = Vec::new();

        for candidate in candidates {
            let version = match candidate.dimension(dimension) {
                Some(WILDCARD) => {
                    wildcards.push(candidate);
                    continue;
                }
                Some(raw) => parse_version(dimension, raw)?,
                None => continue,
            };
            if version <= upper {
                qualifying.push((version, candidate));
            }
        }

        let best = qualifying.iter().map(|(v, _)| v).max().cloned();
        match best {
            Some(best) => {
                trace!(dimension, requested, best = %best, "Closest version at or below request");
                Ok(qualifying
                    .into_iter()
                    .filter(|(v, _)| *v == best)
                    .map(|(_, c)| c)
                    .collect())
            }
            None => Ok(wildcards),
        }
    }
}
