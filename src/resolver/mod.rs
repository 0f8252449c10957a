// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Setting resolver.
//!
//! The [`SettingResolver`] ties a store to the declared dimensions and the
//! ambient context (current environment, current version, ...):
//!
//! ```text
//! resolve(request) ─► merge context ─► store.select(name) ─► pipeline ─► value
//! persist(assignment, value) ─► check dimensions ─► store.update(assignment, value)
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use setting_engine::{CandidateRecord, ResolutionRequest, SettingResolver};
//! use setting_engine::filter::{ExactMatch, VersionUpperBound};
//! use setting_engine::storage::memory::InMemoryStore;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = Arc::new(InMemoryStore::with_rows(vec![
//!     CandidateRecord::new("Greeting", "hello")
//!         .with_dimension("Environment", "*")
//!         .with_dimension("Version", "1.0.0"),
//!     CandidateRecord::new("Greeting", "hi")
//!         .with_dimension("Environment", "*")
//!         .with_dimension("Version", "2.0.0"),
//! ]));
//!
//! let resolver = SettingResolver::builder(store)
//!     .dimension("Environment", Arc::new(ExactMatch))
//!     .dimension("Version", Arc::new(VersionUpperBound))
//!     .context("Environment", "PROD")
//!     .context("Version", "1.5.0")
//!     .build()
//!     .unwrap();
//!
//! let value = resolver.resolve(&ResolutionRequest::new("Greeting")).await.unwrap();
//! assert_eq!(value, "hello");
//! # }
//! ```

mod api;
mod lifecycle;
mod types;

pub use types::{LoadedSetting, LoadedSettings, ValueSource};

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::config::ResolverConfig;
use crate::dimension::{Dimensions, DEFAULT_KEY_NAME};
use crate::error::ConfigError;
use crate::filter::FilterStrategy;
use crate::storage::traits::SettingStore;

/// Resolves and persists settings against one store.
///
/// Holds no state between calls besides its configuration, so it can be
/// shared across tasks behind an `Arc`.
pub struct SettingResolver {
    store: Arc<dyn SettingStore>,
    dimensions: Dimensions,
    context: BTreeMap<String, String>,
    initialize_defaults: bool,
}

impl fmt::Debug for SettingResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingResolver")
            .field("store", &self.store.kind())
            .field("dimensions", &self.dimensions.names().collect::<Vec<_>>())
            .field("context", &self.context)
            .field("initialize_defaults", &self.initialize_defaults)
            .finish()
    }
}

impl SettingResolver {
    pub fn builder(store: Arc<dyn SettingStore>) -> SettingResolverBuilder {
        SettingResolverBuilder {
            store,
            dimensions: Vec::new(),
            context: BTreeMap::new(),
            initialize_defaults: false,
        }
    }

    /// Build a resolver from configuration.
    ///
    /// # Errors
    ///
    /// Same as [`SettingResolverBuilder::build`].
    pub fn from_config(store: Arc<dyn SettingStore>, config: &ResolverConfig) -> Result<Self, ConfigError> {
        let mut builder = Self::builder(store).initialize_defaults(config.initialize_defaults);
        for (name, strategy) in &config.dimensions {
            builder = builder.dimension(name.clone(), strategy.into_filter());
        }
        for (name, value) in &config.context {
            builder = builder.context(name.clone(), value.clone());
        }
        builder.build()
    }

    /// Declared dimension names, in evaluation order.
    pub fn dimension_names(&self) -> impl Iterator<Item = &str> {
        self.dimensions.names()
    }

    /// Ambient requested values.
    #[must_use]
    pub fn context(&self) -> &BTreeMap<String, String> {
        &self.context
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn SettingStore> {
        &self.store
    }
}

pub struct SettingResolverBuilder {
    store: Arc<dyn SettingStore>,
    dimensions: Vec<(String, Arc<dyn FilterStrategy>)>,
    context: BTreeMap<String, String>,
    initialize_defaults: bool,
}

impl SettingResolverBuilder {
    /// Declare a dimension and the strategy that filters it.
    #[must_use]
    pub fn dimension(mut self, name: impl Into<String>, strategy: Arc<dyn FilterStrategy>) -> Self {
        self.dimensions.push((name.into(), strategy));
        self
    }

    /// Requested value used when a request does not name the dimension.
    #[must_use]
    pub fn context(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(name.into(), value.into());
        self
    }

    /// Seed missing defaults before [`SettingResolver::load`].
    #[must_use]
    pub fn initialize_defaults(mut self, enabled: bool) -> Self {
        self.initialize_defaults = enabled;
        self
    }

    /// # Errors
    ///
    /// Fails on a reserved, empty or duplicate dimension name, and on a
    /// context value for an undeclared dimension.
    pub fn build(self) -> Result<SettingResolver, ConfigError> {
        let mut dimensions = Dimensions::new();
        for (name, strategy) in self.dimensions {
            dimensions.declare(name, strategy)?;
        }

        for name in self.context.keys() {
            if name == DEFAULT_KEY_NAME {
                return Err(ConfigError::ReservedDimension(name.clone()));
            }
            if !dimensions.contains(name) {
                return Err(ConfigError::UnknownDimension(name.clone()));
            }
        }

        Ok(SettingResolver {
            store: self.store,
            dimensions,
            context: self.context,
            initialize_defaults: self.initialize_defaults,
        })
    }
}
