//! Property-based tests for the resolution pipeline and the in-memory store.
//!
//! Uses proptest to generate random candidate tables and checks the
//! filtering guarantees hold for every one of them.
//!
//! Run with: `cargo test --test proptest_props`

use std::sync::Arc;

use proptest::prelude::*;
use semver::Version;

use setting_engine::{
    resolve_candidates, CandidateRecord, DimensionAssignment, ExactMatch, FilterStrategy, InMemoryStore,
    ResolveError, SettingStore, VersionUpperBound, WILDCARD,
};

// =============================================================================
// Strategies for generating test data
// =============================================================================

fn environment() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(WILDCARD.to_string()),
        "[A-C]",
        "[a-c]",
    ]
}

fn version() -> impl Strategy<Value = (u64, u64, u64)> {
    (0u64..4, 0u64..4, 0u64..4)
}

fn stored_version() -> impl Strategy<Value = String> {
    prop_oneof![
        1 => Just(WILDCARD.to_string()),
        4 => version().prop_map(|(a, b, c)| format!("{a}.{b}.{c}")),
    ]
}

fn env_rows() -> impl Strategy<Value = Vec<CandidateRecord>> {
    prop::collection::vec(environment(), 0..12).prop_map(|envs| {
        envs.into_iter()
            .enumerate()
            .map(|(i, env)| CandidateRecord::new("name", format!("r{i}")).with_dimension("Environment", env))
            .collect()
    })
}

fn version_rows() -> impl Strategy<Value = Vec<CandidateRecord>> {
    prop::collection::vec(stored_version(), 0..12).prop_map(|versions| {
        versions
            .into_iter()
            .enumerate()
            .map(|(i, v)| CandidateRecord::new("name", format!("r{i}")).with_dimension("Version", v))
            .collect()
    })
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    /// Exact rows win; wildcard rows only when there are none; never both.
    #[test]
    fn exact_match_never_mixes_exact_and_wildcard(rows in env_rows(), requested in "[A-D]") {
        let result = ExactMatch.apply("Environment", &requested, rows.clone()).unwrap();

        let exact: Vec<_> = rows
            .iter()
            .filter(|r| r.dimension("Environment").is_some_and(|v| v.eq_ignore_ascii_case(&requested)))
            .cloned()
            .collect();
        let wildcard: Vec<_> = rows
            .iter()
            .filter(|r| r.dimension("Environment") == Some(WILDCARD))
            .cloned()
            .collect();

        if exact.is_empty() {
            prop_assert_eq!(result, wildcard);
        } else {
            prop_assert_eq!(result, exact);
        }
    }

    /// The survivors all carry the greatest stored version at or below the
    /// request; wildcard rows only come back when no version qualifies.
    #[test]
    fn version_filter_returns_max_at_or_below(rows in version_rows(), (a, b, c) in version()) {
        let requested = Version::new(a, b, c);
        let result = VersionUpperBound.apply("Version", &requested.to_string(), rows.clone()).unwrap();

        let best = rows
            .iter()
            .filter_map(|r| r.dimension("Version"))
            .filter(|v| *v != WILDCARD)
            .filter_map(|v| Version::parse(v).ok())
            .filter(|v| *v <= requested)
            .max();

        match best {
            Some(best) => {
                prop_assert!(!result.is_empty());
                for r in &result {
                    let v = Version::parse(r.dimension("Version").unwrap()).unwrap();
                    prop_assert_eq!(&v, &best);
                }
            }
            None => {
                prop_assert!(result.iter().all(|r| r.dimension("Version") == Some(WILDCARD)));
                let wildcards = rows.iter().filter(|r| r.dimension("Version") == Some(WILDCARD)).count();
                prop_assert_eq!(result.len(), wildcards);
            }
        }
    }

    /// Strategies only ever narrow the candidate set.
    #[test]
    fn filters_never_add_candidates(rows in env_rows(), requested in "[A-D]") {
        let result = ExactMatch.apply("Environment", &requested, rows.clone()).unwrap();
        prop_assert!(result.len() <= rows.len());
        prop_assert!(result.iter().all(|r| rows.contains(r)));
    }

    /// The pipeline either yields exactly one record or a clean error.
    #[test]
    fn pipeline_outcome_matches_survivor_count(rows in env_rows(), requested in "[A-D]") {
        let keys = {
            let mut dims = setting_engine::Dimensions::new();
            dims.declare("Environment", Arc::new(ExactMatch)).unwrap();
            let mut requested_map = std::collections::BTreeMap::new();
            requested_map.insert("Environment".to_string(), requested.clone());
            dims.keys_for(&requested_map).unwrap()
        };
        let survivors = ExactMatch.apply("Environment", &requested, rows.clone()).unwrap().len();

        match resolve_candidates("name", &keys, rows) {
            Ok(_) => prop_assert_eq!(survivors, 1),
            Err(ResolveError::SettingNotFound { .. }) => prop_assert_eq!(survivors, 0),
            Err(ResolveError::AmbiguousResolution { candidates, .. }) => {
                prop_assert!(survivors > 1);
                prop_assert_eq!(candidates, survivors);
            }
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }

    /// Writing the same value at the same address twice leaves the store as
    /// it was after the first write.
    #[test]
    fn update_is_idempotent(
        envs in prop::collection::vec("[A-C]", 1..6),
        value in "[a-z0-9]{0,8}",
    ) {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            let store = InMemoryStore::new();
            for env in &envs {
                let assignment = DimensionAssignment::new("name").with_dimension("Environment", env.clone());
                store.update(&assignment, &value).await.unwrap();
            }
            let once = store.rows();

            for env in &envs {
                let assignment = DimensionAssignment::new("name").with_dimension("Environment", env.clone());
                store.update(&assignment, &value).await.unwrap();
            }
            prop_assert_eq!(store.rows(), once);
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// A malformed stored version is reported, never silently skipped.
    #[test]
    fn malformed_stored_version_is_an_error(garbage in "[a-z]{1,6}") {
        let rows = vec![
            CandidateRecord::new("name", "ok").with_dimension("Version", "1.0.0"),
            CandidateRecord::new("name", "bad").with_dimension("Version", garbage),
        ];
        let result = VersionUpperBound.apply("Version", "2.0.0", rows);
        let is_invalid_version = matches!(result, Err(ResolveError::InvalidVersionFormat { .. }));
        prop_assert!(is_invalid_version);
    }
}
