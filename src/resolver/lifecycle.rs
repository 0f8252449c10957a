// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Loading a registry of settings and seeding missing defaults.

use tracing::{debug, info, warn};

use crate::error::{AttemptedDimensions, LoadError, ResolveError};
use crate::metrics;
use crate::pipeline::ResolutionRequest;
use crate::registry::{SettingDefinition, SettingRegistry};

use super::{LoadedSetting, LoadedSettings, SettingResolver, ValueSource};

impl SettingResolver {
    /// Resolve and convert every registered setting.
    ///
    /// When no row matches, the registered default is used; an optional
    /// setting without a default is reported absent. Every other failure is
    /// collected, so one bad setting does not hide the rest.
    ///
    /// If the resolver was built with `initialize_defaults(true)`, missing
    /// defaults are seeded first.
    ///
    /// # Errors
    ///
    /// [`LoadError`] carrying one [`ResolveError`] per failed setting.
    #[tracing::instrument(skip(self, registry), fields(settings = registry.len()))]
    pub async fn load(&self, registry: &SettingRegistry) -> Result<LoadedSettings, LoadError> {
        let _timer = metrics::LatencyTimer::new("load");
        let mut failures = Vec::new();

        if self.initialize_defaults {
            if let Err(e) = self.initialize_defaults(registry).await {
                warn!(error = %e, "Default initialization failed");
                failures.push(e);
            }
        }

        let mut loaded = LoadedSettings::default();
        for definition in registry.iter() {
            match self.load_one(definition).await {
                Ok(Some(setting)) => {
                    loaded.values.insert(definition.name.clone(), setting);
                }
                Ok(None) => {
                    debug!(setting = %definition.name, "Optional setting absent");
                    loaded.absent.push(definition.name.clone());
                }
                Err(e) => failures.push(e),
            }
        }

        if !failures.is_empty() {
            warn!(failed = failures.len(), "Settings failed to load");
            return Err(LoadError { failures });
        }

        info!(loaded = loaded.len(), absent = loaded.absent.len(), "Settings loaded");
        Ok(loaded)
    }

    async fn load_one(&self, definition: &SettingDefinition) -> Result<Option<LoadedSetting>, ResolveError> {
        let request = ResolutionRequest::new(definition.name.clone());
        let (raw, source) = match self.resolve(&request).await {
            Ok(raw) => (raw, ValueSource::Store),
            Err(e) if e.is_not_found() => match &definition.default {
                Some(default) => (default.clone(), ValueSource::Default),
                None if definition.optional => return Ok(None),
                None => return Err(e),
            },
            Err(e) => return Err(e),
        };

        let value = definition
            .kind
            .parse(&raw)
            .map_err(|reason| ResolveError::Conversion {
                setting: definition.name.clone(),
                kind: definition.kind,
                value: raw,
                reason,
            })?;
        Ok(Some(LoadedSetting { value, source }))
    }

    /// Write the default of every registered setting whose row at the
    /// resolver's context is missing. Existing rows are never overwritten.
    ///
    /// All inserts go to the store in one all-or-nothing call. Returns the
    /// number of rows written.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::Config`] when a declared dimension has no context
    ///   value
    /// - [`ResolveError::Store`] when a read or the batch write fails
    #[tracing::instrument(skip(self, registry), fields(settings = registry.len()))]
    pub async fn initialize_defaults(&self, registry: &SettingRegistry) -> Result<usize, ResolveError> {
        let mut missing = Vec::new();
        for definition in registry.iter() {
            let Some(default) = &definition.default else {
                continue;
            };
            let assignment = self.assignment_for(&definition.name)?;
            let exists = self
                .store
                .exists(&assignment)
                .await
                .map_err(|source| ResolveError::Store {
                    setting: definition.name.clone(),
                    dimensions: AttemptedDimensions::from(&assignment.dimensions),
                    source,
                })?;
            if !exists {
                missing.push((assignment, default.clone()));
            }
        }

        if missing.is_empty() {
            debug!("Every default already stored");
            return Ok(0);
        }

        let written = self.persist_many(&missing).await?;
        metrics::record_defaults_initialized(written);
        info!(written, "Defaults initialized");
        Ok(written)
    }
}
