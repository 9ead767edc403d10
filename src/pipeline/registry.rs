use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::basic::BasicConsumer;
use super::jsonl::JsonLinesProducer;
use super::plugin::{Consumer, Producer};
use crate::analysis::{AnalyzerCatalog, AnalyzerFactory};
use crate::error::{IndexerError, Result};

pub type ProducerFactory = Arc<dyn Fn() -> Box<dyn Producer> + Send + Sync>;
pub type ConsumerFactory = Arc<dyn Fn() -> Box<dyn Consumer> + Send + Sync>;

/// Name → factory lookup for producers, consumers and analyzers
///
/// Names are matched case-insensitively. The built-ins are the `jsonl`
/// producer, the `basic` consumer, and the analyzers of
/// [`AnalyzerCatalog::with_builtins`].
#[derive(Clone, Default)]
pub struct PluginRegistry {
    producers: HashMap<String, ProducerFactory>,
    consumers: HashMap<String, ConsumerFactory>,
    analyzers: AnalyzerCatalog,
}

impl PluginRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self {
            analyzers: AnalyzerCatalog::with_builtins(),
            ..Self::default()
        };
        registry.register_producer(JsonLinesProducer::NAME, || {
            Box::new(JsonLinesProducer::default())
        });
        registry.register_consumer(BasicConsumer::NAME, || Box::new(BasicConsumer::default()));
        registry
    }

    pub fn register_producer<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn Producer> + Send + Sync + 'static,
    {
        self.producers.insert(normalize(name), Arc::new(factory));
    }

    pub fn register_consumer<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn Consumer> + Send + Sync + 'static,
    {
        self.consumers.insert(normalize(name), Arc::new(factory));
    }

    pub fn register_analyzer(&mut self, name: &str, factory: AnalyzerFactory) {
        self.analyzers.register(name, factory);
    }

    pub fn create_producer(&self, name: &str) -> Result<Box<dyn Producer>> {
        self.producers
            .get(&normalize(name))
            .map(|factory| factory())
            .ok_or_else(|| IndexerError::UnknownPlugin {
                kind: "producer",
                name: name.to_string(),
            })
    }

    pub fn create_consumer(&self, name: &str) -> Result<Box<dyn Consumer>> {
        self.consumers
            .get(&normalize(name))
            .map(|factory| factory())
            .ok_or_else(|| IndexerError::UnknownPlugin {
                kind: "consumer",
                name: name.to_string(),
            })
    }

    pub fn analyzers(&self) -> &AnalyzerCatalog {
        &self.analyzers
    }

    pub fn producer_names(&self) -> Vec<&str> {
        sorted_names(self.producers.keys())
    }

    pub fn consumer_names(&self) -> Vec<&str> {
        sorted_names(self.consumers.keys())
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("producers", &self.producer_names())
            .field("consumers", &self.consumer_names())
            .field("analyzers", &self.analyzers)
            .finish()
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

fn sorted_names<'a>(keys: impl Iterator<Item = &'a String>) -> Vec<&'a str> {
    let mut names: Vec<&str> = keys.map(String::as_str).collect();
    names.sort_unstable();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::EngineVersion;
    use tantivy::tokenizer::{RawTokenizer, TextAnalyzer};

    #[test]
    fn test_builtins() {
        let registry = PluginRegistry::with_builtins();
        assert_eq!(registry.producer_names(), vec!["jsonl"]);
        assert_eq!(registry.consumer_names(), vec!["basic"]);
        assert!(registry.analyzers().contains("english"));

        assert!(registry.create_producer("JSONL").is_ok());
        assert!(registry.create_consumer(" basic ").is_ok());
    }

    #[test]
    fn test_unknown_plugin() {
        let registry = PluginRegistry::with_builtins();
        match registry.create_producer("csv") {
            Err(IndexerError::UnknownPlugin { kind, name }) => {
                assert_eq!(kind, "producer");
                assert_eq!(name, "csv");
            }
            Err(e) => panic!("unexpected error {}", e),
            Ok(_) => panic!("csv producer should not exist"),
        }
        assert!(registry.create_consumer("fancy").is_err());
    }

    #[test]
    fn test_custom_registration() {
        let mut registry = PluginRegistry::new();
        registry.register_consumer("Quiet", || Box::new(BasicConsumer::default()));
        registry.register_analyzer(
            "exact",
            AnalyzerFactory::Plain(|| TextAnalyzer::builder(RawTokenizer::default()).build()),
        );

        assert_eq!(registry.consumer_names(), vec!["quiet"]);
        assert!(registry.create_consumer("quiet").is_ok());
        let exact = registry.analyzers().resolve("exact").unwrap();
        assert!(registry
            .analyzers()
            .build(&exact, EngineVersion::Latest)
            .is_ok());
    }
}
