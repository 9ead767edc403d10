//! Analyzer catalog
//!
//! Analyzers are looked up by name in an [`AnalyzerCatalog`]. Each entry is
//! registered either as version-aware (its token chain depends on the
//! configured [`EngineVersion`]) or plain. That tag is fixed when the
//! configuration is parsed and travels with the field's [`AnalyzerRef`], so
//! callers can see whether a field's analysis changes across engine versions.

mod builtin;
mod version;

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use tantivy::tokenizer::TextAnalyzer;

use crate::error::{IndexerError, Result};

pub use builtin::ENGLISH_STOP_WORDS;
pub use version::EngineVersion;

/// How an analyzer is constructed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Construction {
    /// Built from the configured engine version
    Versioned,
    /// Built without arguments; identical across engine versions
    Plain,
}

/// A resolved analyzer selection: catalog name plus construction shape
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct AnalyzerRef {
    name: String,
    construction: Construction,
}

impl AnalyzerRef {
    pub fn new(name: impl Into<String>, construction: Construction) -> Self {
        Self {
            name: name.into(),
            construction,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn construction(&self) -> Construction {
        self.construction
    }

    pub fn is_version_sensitive(&self) -> bool {
        self.construction == Construction::Versioned
    }

    /// Name under which the built analyzer is registered with the engine
    pub fn tokenizer_name(&self) -> String {
        format!("ci_{}", self.name)
    }
}

impl fmt::Display for AnalyzerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Factory for one named analyzer
#[derive(Clone, Copy)]
pub enum AnalyzerFactory {
    Versioned(fn(EngineVersion) -> TextAnalyzer),
    Plain(fn() -> TextAnalyzer),
}

impl AnalyzerFactory {
    pub fn construction(&self) -> Construction {
        match self {
            AnalyzerFactory::Versioned(_) => Construction::Versioned,
            AnalyzerFactory::Plain(_) => Construction::Plain,
        }
    }

    fn build(&self, version: EngineVersion) -> TextAnalyzer {
        match self {
            AnalyzerFactory::Versioned(factory) => factory(version),
            AnalyzerFactory::Plain(factory) => factory(),
        }
    }
}

impl fmt::Debug for AnalyzerFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnalyzerFactory::{:?}", self.construction())
    }
}

/// Name → analyzer factory registry
#[derive(Clone, Debug, Default)]
pub struct AnalyzerCatalog {
    factories: HashMap<String, AnalyzerFactory>,
}

impl AnalyzerCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the built-in analyzers (`keyword`, `whitespace`,
    /// `simple`, `standard`, `english`)
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        builtin::register_all(&mut catalog);
        catalog
    }

    /// Register (or replace) a named analyzer
    pub fn register(&mut self, name: impl Into<String>, factory: AnalyzerFactory) {
        self.factories.insert(name.into().to_ascii_lowercase(), factory);
    }

    /// Resolve a configured analyzer name to a tagged reference.
    ///
    /// Names are matched case-insensitively. Returns `None` when the catalog
    /// has no such analyzer.
    pub fn resolve(&self, name: &str) -> Option<AnalyzerRef> {
        let key = name.trim().to_ascii_lowercase();
        self.factories
            .get(&key)
            .map(|factory| AnalyzerRef::new(key, factory.construction()))
    }

    /// Instantiate an analyzer for the engine
    pub fn build(&self, analyzer: &AnalyzerRef, version: EngineVersion) -> Result<TextAnalyzer> {
        let factory = self
            .factories
            .get(analyzer.name())
            .ok_or_else(|| IndexerError::UnknownAnalyzer(analyzer.name().to_string()))?;
        if factory.construction() != analyzer.construction() {
            return Err(IndexerError::Config(format!(
                "analyzer '{}' was resolved as {:?} but is registered as {:?}",
                analyzer.name(),
                analyzer.construction(),
                factory.construction()
            )));
        }
        Ok(factory.build(version))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}
