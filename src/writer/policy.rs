use std::collections::BTreeMap;

use tantivy::tokenizer::TokenizerManager;
use tracing::debug;

use crate::analysis::{AnalyzerCatalog, AnalyzerRef, EngineVersion};
use crate::error::Result;
use crate::schema::TypeRegistry;

/// Which analyzer each field is tokenized with
///
/// One default analyzer plus an override per field whose configured
/// analyzer differs from it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalyzerPolicy {
    default: AnalyzerRef,
    overrides: BTreeMap<String, AnalyzerRef>,
}

impl AnalyzerPolicy {
    pub fn new(default: AnalyzerRef) -> Self {
        Self {
            default,
            overrides: BTreeMap::new(),
        }
    }

    /// Policy covering every field the registry currently knows
    pub fn from_registry(registry: &TypeRegistry) -> Self {
        let mut policy = Self::new(registry.defaults().analyzer.clone());
        for config in registry.configs() {
            policy.set_override(config.name(), config.analyzer().clone());
        }
        policy
    }

    /// Use `analyzer` for `field_name`; a no-op when it is the default
    pub fn set_override(&mut self, field_name: impl Into<String>, analyzer: AnalyzerRef) {
        let field_name = field_name.into();
        if analyzer == self.default {
            self.overrides.remove(&field_name);
        } else {
            self.overrides.insert(field_name, analyzer);
        }
    }

    pub fn default_analyzer(&self) -> &AnalyzerRef {
        &self.default
    }

    pub fn analyzer_for(&self, field_name: &str) -> &AnalyzerRef {
        self.overrides.get(field_name).unwrap_or(&self.default)
    }

    pub fn overrides(&self) -> &BTreeMap<String, AnalyzerRef> {
        &self.overrides
    }

    /// Each distinct analyzer in use, default first
    pub fn analyzers(&self) -> Vec<&AnalyzerRef> {
        let mut distinct = vec![&self.default];
        for analyzer in self.overrides.values() {
            if !distinct.contains(&analyzer) {
                distinct.push(analyzer);
            }
        }
        distinct
    }

    /// Instantiate every analyzer in use and register it with the engine
    /// under its tokenizer name
    pub fn register(
        &self,
        tokenizers: &TokenizerManager,
        catalog: &AnalyzerCatalog,
        version: EngineVersion,
    ) -> Result<()> {
        for analyzer in self.analyzers() {
            let built = catalog.build(analyzer, version)?;
            debug!(
                "Registering analyzer {} as {} ({:?}, {})",
                analyzer,
                analyzer.tokenizer_name(),
                analyzer.construction(),
                version
            );
            tokenizers.register(&analyzer.tokenizer_name(), built);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Construction;
    use crate::config::Settings;

    fn registry() -> TypeRegistry {
        let settings = Settings::new()
            .with("indexer.default.analyzer", "standard")
            .with("indexer.field.title.analyzer", "english")
            .with("indexer.field.body.analyzer", "standard")
            .with("indexer.field.tag.analyzer", "keyword")
            .with("indexer.field.year.fieldtype", "INT");
        TypeRegistry::from_settings(&settings, &AnalyzerCatalog::with_builtins())
    }

    #[test]
    fn test_overrides_only_for_non_default() {
        let policy = AnalyzerPolicy::from_registry(&registry());

        assert_eq!(policy.default_analyzer().name(), "standard");
        assert_eq!(policy.overrides().len(), 2);
        assert_eq!(policy.analyzer_for("title").name(), "english");
        assert_eq!(policy.analyzer_for("tag").name(), "keyword");
        assert_eq!(policy.analyzer_for("body").name(), "standard");
        assert_eq!(policy.analyzer_for("unseen").name(), "standard");
    }

    #[test]
    fn test_distinct_analyzers() {
        let mut policy = AnalyzerPolicy::new(AnalyzerRef::new("keyword", Construction::Plain));
        let english = AnalyzerRef::new("english", Construction::Versioned);
        policy.set_override("a", english.clone());
        policy.set_override("b", english);

        let analyzers = policy.analyzers();
        let names: Vec<_> = analyzers.iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["keyword", "english"]);
    }

    #[test]
    fn test_register_with_engine() {
        let policy = AnalyzerPolicy::from_registry(&registry());
        let tokenizers = TokenizerManager::default();
        policy
            .register(
                &tokenizers,
                &AnalyzerCatalog::with_builtins(),
                EngineVersion::Latest,
            )
            .unwrap();

        assert!(tokenizers.get("ci_standard").is_some());
        assert!(tokenizers.get("ci_english").is_some());
        assert!(tokenizers.get("ci_keyword").is_some());
        assert!(tokenizers.get("ci_simple").is_none());
    }

    #[test]
    fn test_register_unknown_analyzer_fails() {
        let policy = AnalyzerPolicy::new(AnalyzerRef::new("klingon", Construction::Plain));
        let result = policy.register(
            &TokenizerManager::default(),
            &AnalyzerCatalog::with_builtins(),
            EngineVersion::Latest,
        );
        assert!(result.is_err());
    }
}
