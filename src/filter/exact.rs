use crate::candidate::CandidateRecord;
use crate::dimension::WILDCARD;
use crate::error::ResolveError;

use super::FilterStrategy;

/// Exact match with wildcard fallback, for string-valued dimensions such as
/// an environment.
///
/// Returns the rows whose value equals the request (ASCII case-insensitive);
/// only if there are none, the rows stored with `*`. The two are never mixed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatch;

impl FilterStrategy for ExactMatch {
    fn name(&self) -> &'static str {
        "exact_match"
    }

    fn apply(
        &self,
        dimension: &str,
        requested: &str,
        candidates: Vec<CandidateRecord>,
    ) -> Result<Vec<CandidateRecord>, ResolveError> {
        let (exact, rest): (Vec<_>, Vec<_>) = candidates.into_iter().partition(|c| {
            c.dimension(dimension)
                .is_some_and(|v| v.eq_ignore_ascii_case(requested))
        });

        if !exact.is_empty() {
            return Ok(exact);
        }

        Ok(rest
            .into_iter()
            .filter(|c| c.dimension(dimension) == Some(WILDCARD))
            .collect())
    }
}
