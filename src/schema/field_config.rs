//! Per-field indexing configuration
//!
//! A [`FieldConfig`] is immutable once built. Attributes left unset on the
//! [`FieldConfigBuilder`] fall back, one by one, to the run's
//! [`FieldDefaults`].

use std::str::FromStr;

use serde::Serialize;
use tracing::warn;

use super::field_type::{FieldType, IndexMode, StoreMode, TermVectorMode};
use crate::analysis::{AnalyzerCatalog, AnalyzerRef, Construction};
use crate::config::{keys, Settings};

/// Fallback attributes for fields without an explicit override
///
/// Built once per run, before the first field is resolved, and shared
/// read-only from then on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldDefaults {
    pub analyzer: AnalyzerRef,
    pub store: StoreMode,
    pub index: IndexMode,
    pub term_vector: TermVectorMode,
    pub field_type: FieldType,
}

impl Default for FieldDefaults {
    fn default() -> Self {
        Self {
            analyzer: AnalyzerRef::new("keyword", Construction::Plain),
            store: StoreMode::Yes,
            index: IndexMode::NotAnalyzedNoNorms,
            term_vector: TermVectorMode::No,
            field_type: FieldType::Text,
        }
    }
}

impl FieldDefaults {
    /// Read the `indexer.default.*` keys.
    ///
    /// A missing or malformed value leaves the built-in default in place.
    pub fn from_settings(settings: &Settings, analyzers: &AnalyzerCatalog) -> Self {
        let builtin = Self::default();
        Self {
            analyzer: lookup_analyzer(settings, keys::DEFAULT_ANALYZER, analyzers)
                .unwrap_or(builtin.analyzer),
            store: lookup(settings, keys::DEFAULT_STORE).unwrap_or(builtin.store),
            index: lookup(settings, keys::DEFAULT_INDEX).unwrap_or(builtin.index),
            term_vector: lookup(settings, keys::DEFAULT_TERM_VECTOR)
                .unwrap_or(builtin.term_vector),
            field_type: lookup(settings, keys::DEFAULT_FIELD_TYPE).unwrap_or(builtin.field_type),
        }
    }

    /// Config for a field nobody configured explicitly
    pub fn config_for(&self, field_name: impl Into<String>) -> FieldConfig {
        FieldConfigBuilder::new(field_name).build(self)
    }
}

/// Parse an enumerated setting, warning about (and discarding) bad values
pub(crate) fn lookup<T>(settings: &Settings, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = settings.get(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring {} for {}: {}", raw, key, e);
            None
        }
    }
}

pub(crate) fn lookup_analyzer(
    settings: &Settings,
    key: &str,
    analyzers: &AnalyzerCatalog,
) -> Option<AnalyzerRef> {
    let raw = settings.get(key)?;
    let resolved = analyzers.resolve(raw);
    if resolved.is_none() {
        warn!("Ignoring unknown analyzer '{}' for {}", raw, key);
    }
    resolved
}

/// Immutable indexing configuration for one field name
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldConfig {
    name: String,
    analyzer: AnalyzerRef,
    store: StoreMode,
    index: IndexMode,
    term_vector: TermVectorMode,
    field_type: FieldType,
}

impl FieldConfig {
    pub fn builder(name: impl Into<String>) -> FieldConfigBuilder {
        FieldConfigBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn analyzer(&self) -> &AnalyzerRef {
        &self.analyzer
    }

    pub fn store(&self) -> StoreMode {
        self.store
    }

    pub fn index(&self) -> IndexMode {
        self.index
    }

    pub fn term_vector(&self) -> TermVectorMode {
        self.term_vector
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }
}

/// Builder for [`FieldConfig`]; unset attributes come from [`FieldDefaults`]
#[derive(Clone, Debug)]
pub struct FieldConfigBuilder {
    name: String,
    analyzer: Option<AnalyzerRef>,
    store: Option<StoreMode>,
    index: Option<IndexMode>,
    term_vector: Option<TermVectorMode>,
    field_type: Option<FieldType>,
}

impl FieldConfigBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            analyzer: None,
            store: None,
            index: None,
            term_vector: None,
            field_type: None,
        }
    }

    pub fn analyzer(mut self, analyzer: AnalyzerRef) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn store(mut self, store: StoreMode) -> Self {
        self.store = Some(store);
        self
    }

    pub fn index(mut self, index: IndexMode) -> Self {
        self.index = Some(index);
        self
    }

    pub fn term_vector(mut self, term_vector: TermVectorMode) -> Self {
        self.term_vector = Some(term_vector);
        self
    }

    pub fn field_type(mut self, field_type: FieldType) -> Self {
        self.field_type = Some(field_type);
        self
    }

    pub fn build(self, defaults: &FieldDefaults) -> FieldConfig {
        FieldConfig {
            name: self.name,
            analyzer: self.analyzer.unwrap_or_else(|| defaults.analyzer.clone()),
            store: self.store.unwrap_or(defaults.store),
            index: self.index.unwrap_or(defaults.index),
            term_vector: self.term_vector.unwrap_or(defaults.term_vector),
            field_type: self.field_type.unwrap_or(defaults.field_type),
        }
    }
}
