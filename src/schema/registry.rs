//! Field type registry
//!
//! Maps each field name to exactly one [`FieldConfig`] for the lifetime of a
//! run. Configured fields are installed up front; any other name is resolved
//! on first use from the run's [`FieldDefaults`] and installed with
//! insert-if-absent, so racing first callers all get the winning instance.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, warn};

use super::field_config::{lookup, lookup_analyzer, FieldConfig, FieldConfigBuilder, FieldDefaults};
use crate::analysis::AnalyzerCatalog;
use crate::config::{keys, Settings};

/// Concurrent field-name → config cache
#[derive(Debug)]
pub struct TypeRegistry {
    defaults: Arc<FieldDefaults>,
    configs: DashMap<String, Arc<FieldConfig>>,
}

impl TypeRegistry {
    /// Registry with no explicitly configured fields
    pub fn new(defaults: FieldDefaults) -> Self {
        Self {
            defaults: Arc::new(defaults),
            configs: DashMap::new(),
        }
    }

    /// Registry seeded with explicit field configs
    pub fn with_configs(
        defaults: FieldDefaults,
        configs: impl IntoIterator<Item = FieldConfig>,
    ) -> Self {
        let registry = Self::new(defaults);
        for config in configs {
            registry
                .configs
                .insert(config.name().to_string(), Arc::new(config));
        }
        registry
    }

    /// Derive defaults, then per-field configs, from the settings
    pub fn from_settings(settings: &Settings, analyzers: &AnalyzerCatalog) -> Self {
        let defaults = FieldDefaults::from_settings(settings, analyzers);
        let configs = parse_field_configs(settings, &defaults, analyzers);
        Self::with_configs(defaults, configs.into_values())
    }

    /// Config for `field_name`, installing a default one on first use
    pub fn resolve(&self, field_name: &str) -> Arc<FieldConfig> {
        if let Some(config) = self.configs.get(field_name) {
            return Arc::clone(config.value());
        }

        let entry = self
            .configs
            .entry(field_name.to_string())
            .or_insert_with(|| {
                debug!("Field '{}' not configured, using defaults", field_name);
                Arc::new(self.defaults.config_for(field_name))
            });
        Arc::clone(entry.value())
    }

    /// Config for `field_name` if it has been configured or resolved
    pub fn get(&self, field_name: &str) -> Option<Arc<FieldConfig>> {
        self.configs
            .get(field_name)
            .map(|config| Arc::clone(config.value()))
    }

    pub fn defaults(&self) -> &FieldDefaults {
        &self.defaults
    }

    /// Snapshot of every known config, ordered by field name
    pub fn configs(&self) -> Vec<Arc<FieldConfig>> {
        let mut configs: Vec<_> = self
            .configs
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        configs.sort_by(|a, b| a.name().cmp(b.name()));
        configs
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

/// Build a config for every field named under `indexer.field.<name>.*`.
///
/// Each attribute is parsed independently; a malformed value is logged and
/// that attribute falls back to `defaults`.
pub fn parse_field_configs(
    settings: &Settings,
    defaults: &FieldDefaults,
    analyzers: &AnalyzerCatalog,
) -> HashMap<String, FieldConfig> {
    let mut configs = HashMap::new();

    for key in settings.keys_with_prefix(keys::FIELD_PREFIX) {
        let rest = &key[keys::FIELD_PREFIX.len()..];
        let Some((field_name, _)) = rest.split_once('.') else {
            warn!("Ignoring setting {} with no field attribute", key);
            continue;
        };
        if field_name.is_empty() || configs.contains_key(field_name) {
            continue;
        }

        let prefix = format!("{}{}", keys::FIELD_PREFIX, field_name);
        let attr = |suffix: &str| format!("{}{}", prefix, suffix);

        let mut builder = FieldConfigBuilder::new(field_name);
        if let Some(analyzer) = lookup_analyzer(settings, &attr(keys::SUFFIX_ANALYZER), analyzers) {
            builder = builder.analyzer(analyzer);
        }
        if let Some(store) = lookup(settings, &attr(keys::SUFFIX_STORE)) {
            builder = builder.store(store);
        }
        if let Some(index) = lookup(settings, &attr(keys::SUFFIX_INDEX)) {
            builder = builder.index(index);
        }
        if let Some(term_vector) = lookup(settings, &attr(keys::SUFFIX_TERM_VECTOR)) {
            builder = builder.term_vector(term_vector);
        }
        if let Some(field_type) = lookup(settings, &attr(keys::SUFFIX_FIELD_TYPE)) {
            builder = builder.field_type(field_type);
        }

        configs.insert(field_name.to_string(), builder.build(defaults));
    }

    configs
}
