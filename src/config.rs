//! Run configuration
//!
//! Settings arrive as a TOML file and are flattened into a dotted key space,
//! so `[indexer.field.title] store = "YES"` and
//! `"indexer.field.title.store" = "YES"` are the same setting. Everything the
//! indexer reads lives under the `indexer.` prefix; producers and consumers
//! are free to read their own keys from the same map.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::analysis::EngineVersion;
use crate::error::{IndexerError, Result};

/// Setting keys understood by the indexer
pub mod keys {
    pub const DOC_BUFFER_SIZE: &str = "indexer.docbuffersize";
    pub const BATCH_SIZE: &str = "indexer.batchsize";
    pub const RAM_BUFFER_SIZE_MB: &str = "indexer.rambuffersizemb";
    pub const INDEX_DIR: &str = "indexer.indexdir";
    pub const PRODUCER: &str = "indexer.producer";
    pub const CONSUMER: &str = "indexer.consumer";
    pub const CONSUMER_THREADS: &str = "indexer.consumerthreads";
    pub const ENGINE_VERSION: &str = "indexer.version";
    pub const POOL_CAPACITY: &str = "indexer.poolcapacity";
    pub const FORCE_MERGE: &str = "indexer.forcemerge";
    pub const VERBOSE: &str = "indexer.verbose";

    pub const DEFAULT_ANALYZER: &str = "indexer.default.analyzer";
    pub const DEFAULT_STORE: &str = "indexer.default.store";
    pub const DEFAULT_INDEX: &str = "indexer.default.index";
    pub const DEFAULT_TERM_VECTOR: &str = "indexer.default.termvector";
    pub const DEFAULT_FIELD_TYPE: &str = "indexer.default.fieldtype";

    pub const FIELD_PREFIX: &str = "indexer.field.";
    pub const SUFFIX_ANALYZER: &str = ".analyzer";
    pub const SUFFIX_STORE: &str = ".store";
    pub const SUFFIX_INDEX: &str = ".index";
    pub const SUFFIX_TERM_VECTOR: &str = ".termvector";
    pub const SUFFIX_FIELD_TYPE: &str = ".fieldtype";

    /// Corpus file read by the `jsonl` producer
    pub const JSONL_PATH: &str = "indexer.jsonl.path";
}

/// Default capacity of every pool free-list
pub const DEFAULT_POOL_CAPACITY: usize = 128;

/// Default number of records buffered between producer and consumers
pub const DEFAULT_DOC_BUFFER_SIZE: usize = 10_000;

/// Default upper bound on records handed to one `consume` call
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Default writer memory budget per writer thread, in megabytes
pub const DEFAULT_RAM_BUFFER_SIZE_MB: usize = 16;

/// Default consumer count: one thread per core, minus the producer's
pub fn default_consumer_threads() -> usize {
    num_cpus::get().saturating_sub(1).max(1)
}

/// Flat key/value configuration space
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Settings {
    entries: BTreeMap<String, String>,
}

impl Settings {
    /// Create an empty settings map
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and flatten a TOML settings file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Flatten a TOML document into dotted keys
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(text)?;
        let mut entries = BTreeMap::new();
        for (key, value) in &table {
            flatten_into(key, value, &mut entries);
        }
        Ok(Self { entries })
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Parse an integer setting, falling back to `default` when the key is
    /// absent or malformed
    pub fn get_usize(&self, key: &str, default: usize) -> usize {
        match self.get(key) {
            None => default,
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!("Ignoring non-numeric value '{}' for {}", raw, key);
                default
            }),
        }
    }

    /// A flag is set only when its value is `true` (any case)
    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .map(|raw| raw.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    /// Iterate over all keys beginning with `prefix`
    pub fn keys_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .range::<str, _>((std::ops::Bound::Included(prefix), std::ops::Bound::Unbounded))
            .map(|(k, _)| k.as_str())
            .take_while(move |k| k.starts_with(prefix))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Settings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn flatten_into(key: &str, value: &toml::Value, out: &mut BTreeMap<String, String>) {
    let scalar = match value {
        toml::Value::Table(table) => {
            for (child, value) in table {
                flatten_into(&format!("{}.{}", key, child), value, out);
            }
            return;
        }
        toml::Value::String(s) => s.clone(),
        toml::Value::Integer(i) => i.to_string(),
        toml::Value::Float(f) => f.to_string(),
        toml::Value::Boolean(b) => b.to_string(),
        toml::Value::Datetime(d) => d.to_string(),
        toml::Value::Array(_) => {
            warn!("Ignoring array value for setting {}", key);
            return;
        }
    };
    out.insert(key.to_string(), scalar);
}

/// Typed view of the run-level settings
#[derive(Clone, Debug)]
pub struct IndexerConfig {
    pub index_dir: PathBuf,
    pub producer: String,
    pub consumer: String,
    pub consumer_threads: usize,
    pub doc_buffer_size: usize,
    pub batch_size: usize,
    pub ram_buffer_size_mb: usize,
    pub pool_capacity: usize,
    pub engine_version: EngineVersion,
    pub force_merge: bool,
    pub verbose: bool,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            index_dir: PathBuf::from("./index"),
            producer: "jsonl".to_string(),
            consumer: "basic".to_string(),
            consumer_threads: default_consumer_threads(),
            doc_buffer_size: DEFAULT_DOC_BUFFER_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            ram_buffer_size_mb: DEFAULT_RAM_BUFFER_SIZE_MB,
            pool_capacity: DEFAULT_POOL_CAPACITY,
            engine_version: EngineVersion::default(),
            force_merge: false,
            verbose: false,
        }
    }
}

impl IndexerConfig {
    /// Build the typed view; the index directory and producer are required
    /// and an unknown engine version is rejected
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let index_dir = settings
            .get(keys::INDEX_DIR)
            .map(PathBuf::from)
            .ok_or(IndexerError::MissingSetting(keys::INDEX_DIR))?;
        let producer = settings
            .get(keys::PRODUCER)
            .ok_or(IndexerError::MissingSetting(keys::PRODUCER))?
            .to_string();
        let engine_version = match settings.get(keys::ENGINE_VERSION) {
            Some(raw) => raw.parse()?,
            None => EngineVersion::default(),
        };

        let defaults = Self::default();
        Ok(Self {
            index_dir,
            producer,
            consumer: settings
                .get(keys::CONSUMER)
                .map(str::to_string)
                .unwrap_or(defaults.consumer),
            consumer_threads: settings
                .get_usize(keys::CONSUMER_THREADS, defaults.consumer_threads)
                .max(1),
            doc_buffer_size: settings
                .get_usize(keys::DOC_BUFFER_SIZE, defaults.doc_buffer_size)
                .max(1),
            batch_size: settings
                .get_usize(keys::BATCH_SIZE, defaults.batch_size)
                .max(1),
            ram_buffer_size_mb: settings
                .get_usize(keys::RAM_BUFFER_SIZE_MB, defaults.ram_buffer_size_mb),
            pool_capacity: settings
                .get_usize(keys::POOL_CAPACITY, defaults.pool_capacity)
                .max(1),
            engine_version,
            force_merge: settings.get_bool(keys::FORCE_MERGE),
            verbose: settings.get_bool(keys::VERBOSE),
        })
    }

    /// Set the number of consumer threads
    pub fn with_consumer_threads(mut self, threads: usize) -> Self {
        self.consumer_threads = threads.max(1);
        self
    }

    /// Enable or disable the post-commit force merge
    pub fn with_force_merge(mut self, force_merge: bool) -> Self {
        self.force_merge = force_merge;
        self
    }

    /// Set the pool free-list capacity
    pub fn with_pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity.max(1);
        self
    }
}
