//! # Setting Engine
//!
//! Resolves the single applicable value of a named setting from a set of
//! stored rows, each scoped by dimension values (environment, version, ...).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      SettingResolver                        │
//! │  • resolve(request) / persist(assignment, value)           │
//! │  • merges ambient context under requested values           │
//! │  • load(registry) / initialize_defaults(registry)          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                   (one select per resolution)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Resolution Pipeline                      │
//! │  • default key (setting name) first                        │
//! │  • then each dimension in ordinal name order               │
//! │  • ExactMatch / VersionUpperBound strategies               │
//! │  • empty set → NotFound, >1 survivor → Ambiguous           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      SettingStore                           │
//! │  • InMemoryStore (process-local rows)                      │
//! │  • SqlStore (SQLite / MySQL, one column per dimension)     │
//! │  • exact-address upserts, atomic batches                   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use setting_engine::{
//!     ResolutionRequest, ResolverConfig, SettingResolver, SqlStore,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let config: ResolverConfig = serde_json::from_str(r#"{
//!         "sql_url": "sqlite://settings.db?mode=rwc",
//!         "dimensions": { "Environment": "exact", "Version": "version" },
//!         "context": { "Environment": "PROD", "Version": "2.1.0" }
//!     }"#).expect("valid config");
//!
//!     let store = SqlStore::new(
//!         config.sql_url.as_deref().unwrap_or("sqlite::memory:"),
//!         config.table.clone(),
//!         config.dimensions.keys().cloned(),
//!     )
//!     .await
//!     .expect("Failed to connect");
//!
//!     let resolver = SettingResolver::from_config(Arc::new(store), &config)
//!         .expect("valid dimensions");
//!
//!     // Context supplies Environment and Version; the request may override them
//!     let timeout = resolver
//!         .resolve(&ResolutionRequest::new("Db.Timeout").with("Environment", "TEST"))
//!         .await;
//!     println!("{:?}", timeout);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`resolver`]: The [`SettingResolver`] facade
//! - [`pipeline`]: Stateless narrowing of candidates to one record
//! - [`filter`]: Per-dimension strategies
//! - [`storage`]: Store trait and backends (Memory, SQL)
//! - [`registry`]: Declared settings and per-namespace resolvers
//! - [`resilience`]: Retry with exponential backoff

pub mod candidate;
pub mod config;
pub mod dimension;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod pipeline;
pub mod registry;
pub mod resilience;
pub mod resolver;
pub mod storage;
pub mod value;

pub use candidate::{CandidateRecord, DimensionAssignment};
pub use config::{ResolverConfig, SettingTableConfig};
pub use dimension::{DimensionKey, Dimensions, DEFAULT_KEY_NAME, WILDCARD};
pub use error::{AttemptedDimensions, ConfigError, LoadError, ResolveError};
pub use filter::{ExactMatch, FilterStrategy, Strategy, VersionUpperBound};
// `crate::` disambiguates the module from the `metrics` dependency
pub use crate::metrics::LatencyTimer;
pub use pipeline::{resolve_candidates, ResolutionRequest, ResolutionState};
pub use registry::{ResolverRegistry, SettingDefinition, SettingRegistry};
pub use resilience::retry::RetryConfig;
pub use resolver::{LoadedSetting, LoadedSettings, SettingResolver, SettingResolverBuilder, ValueSource};
pub use storage::memory::InMemoryStore;
pub use storage::sql::SqlStore;
pub use storage::traits::{SettingStore, StorageError};
pub use value::{SettingValue, ValueKind};
