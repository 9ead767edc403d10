//! Run orchestration
//!
//! An [`Indexer`] is built in the `Init` state from a settings map: the field
//! registry, record pool, writer session, producer and consumers are all
//! created up front, so any configuration problem surfaces before a single
//! record moves. [`Indexer::create_index`] then drives the run through
//! `Running → Committed → (Merged) → Closed`.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{IndexerConfig, Settings};
use crate::error::{IndexerError, Result};
use crate::pipeline::{Consumer, Pipeline, PluginRegistry, Producer};
use crate::pool::RecordPool;
use crate::schema::TypeRegistry;
use crate::writer::{open_session, IndexSession, OpenMode};

/// Name the settings file is copied to inside the index directory
pub const SETTINGS_COPY_NAME: &str = "index.toml";

/// Where a run is in its lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Init,
    Running,
    Committed,
    Merged,
    Closed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Init => "INIT",
            LifecycleState::Running => "RUNNING",
            LifecycleState::Committed => "COMMITTED",
            LifecycleState::Merged => "MERGED",
            LifecycleState::Closed => "CLOSED",
        };
        f.write_str(name)
    }
}

/// Outcome of a completed run
#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    pub index_dir: PathBuf,
    /// Documents visible in the index after the final commit
    pub documents: u64,
    pub documents_added: u64,
    pub documents_failed: u64,
    pub records_produced: u64,
    pub coercion_failures: u64,
    pub commits: u64,
    pub merges: u64,
    pub segments: usize,
    pub elapsed_ms: u128,
}

/// Drives one indexing run
pub struct Indexer {
    config: IndexerConfig,
    registry: Arc<TypeRegistry>,
    pool: Arc<RecordPool>,
    session: Arc<IndexSession>,
    producer: Option<Box<dyn Producer>>,
    consumers: Vec<Box<dyn Consumer>>,
    state: LifecycleState,
}

impl fmt::Debug for Indexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Indexer")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("consumers", &self.consumers.len())
            .field("session", &self.session)
            .finish()
    }
}

impl Indexer {
    /// Resolve the configuration and build every component of the run.
    ///
    /// Any failure here is fatal; nothing has been indexed yet.
    pub fn new(settings: Settings, plugins: &PluginRegistry, mode: OpenMode) -> Result<Self> {
        let config = IndexerConfig::from_settings(&settings)?;
        info!(
            "Initializing indexer: producer={}, consumer={} x{}, version={}",
            config.producer, config.consumer, config.consumer_threads, config.engine_version
        );

        let registry = Arc::new(TypeRegistry::from_settings(&settings, plugins.analyzers()));
        debug!(
            "{} configured fields, defaults {:?}",
            registry.len(),
            registry.defaults()
        );
        let pool = Arc::new(RecordPool::new(Arc::clone(&registry), config.pool_capacity));
        let session = Arc::new(open_session(
            &config,
            &registry,
            plugins.analyzers(),
            mode,
        )?);

        let mut producer = plugins.create_producer(&config.producer)?;
        producer.initialize(Arc::clone(&pool), &settings)?;

        let mut consumers = Vec::with_capacity(config.consumer_threads);
        for _ in 0..config.consumer_threads {
            let mut consumer = plugins.create_consumer(&config.consumer)?;
            consumer.initialize(Arc::clone(&session), Arc::clone(&pool), &settings)?;
            consumers.push(consumer);
        }

        Ok(Self {
            config,
            registry,
            pool,
            session,
            producer: Some(producer),
            consumers,
            state: LifecycleState::Init,
        })
    }

    /// Run the pipeline, commit, optionally merge, and close the session.
    ///
    /// Can only be called once per indexer.
    pub fn create_index(&mut self) -> Result<RunSummary> {
        if self.state != LifecycleState::Init {
            return Err(IndexerError::Pipeline(format!(
                "indexer already ran (state {})",
                self.state
            )));
        }
        let producer = self
            .producer
            .take()
            .ok_or_else(|| IndexerError::Pipeline("producer already consumed".to_string()))?;
        let consumers = std::mem::take(&mut self.consumers);
        let start = Instant::now();

        self.transition(LifecycleState::Running);
        let report = Pipeline::from_config(&self.config).run(producer, consumers)?;

        self.session.commit()?;
        self.transition(LifecycleState::Committed);

        if self.config.force_merge {
            self.session.force_merge()?;
            self.session.commit()?;
            self.transition(LifecycleState::Merged);
        }

        self.session.close()?;
        self.transition(LifecycleState::Closed);

        let elapsed = start.elapsed();
        let summary = self.summarize(report.records_produced, elapsed)?;
        info!(
            "Indexed {} documents in {:?} ({} failed, {} coercion fallbacks)",
            summary.documents, elapsed, summary.documents_failed, summary.coercion_failures
        );
        Ok(summary)
    }

    /// Copy the settings file the run was configured from into the index
    /// directory
    pub fn copy_settings_to_index_dir(&self, source: &Path) -> Result<PathBuf> {
        let target = self.config.index_dir.join(SETTINGS_COPY_NAME);
        fs::copy(source, &target)?;
        debug!("Copied {} to {}", source.display(), target.display());
        Ok(target)
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn pool(&self) -> &Arc<RecordPool> {
        &self.pool
    }

    pub fn session(&self) -> &Arc<IndexSession> {
        &self.session
    }

    fn transition(&mut self, next: LifecycleState) {
        info!("Indexer {} -> {}", self.state, next);
        self.state = next;
    }

    fn summarize(&self, records_produced: u64, elapsed: Duration) -> Result<RunSummary> {
        let session = self.session.stats();
        Ok(RunSummary {
            index_dir: self.config.index_dir.clone(),
            documents: self.session.num_docs()?,
            documents_added: session.documents_added,
            documents_failed: session.documents_failed,
            records_produced,
            coercion_failures: self.pool.stats().coercion_failures,
            commits: session.commits,
            merges: session.merges,
            segments: self.session.segment_count()?,
            elapsed_ms: elapsed.as_millis(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::keys;
    use std::io::Write;
    use tempfile::TempDir;

    fn corpus(dir: &Path, lines: usize) -> PathBuf {
        let path = dir.join("corpus.jsonl");
        let mut file = fs::File::create(&path).unwrap();
        for i in 0..lines {
            writeln!(file, "{{\"id\": \"{}\", \"body\": \"record number {}\"}}", i, i).unwrap();
        }
        path
    }

    fn settings(dir: &Path, lines: usize) -> Settings {
        Settings::new()
            .with(keys::INDEX_DIR, dir.join("idx").to_string_lossy())
            .with(keys::PRODUCER, "jsonl")
            .with(keys::CONSUMER_THREADS, "2")
            .with(keys::JSONL_PATH, corpus(dir, lines).to_string_lossy())
    }

    #[test]
    fn test_lifecycle_without_merge() {
        let dir = TempDir::new().unwrap();
        let mut indexer = Indexer::new(
            settings(dir.path(), 50),
            &PluginRegistry::with_builtins(),
            OpenMode::Overwrite,
        )
        .unwrap();
        assert_eq!(indexer.state(), LifecycleState::Init);

        let summary = indexer.create_index().unwrap();
        assert_eq!(indexer.state(), LifecycleState::Closed);
        assert_eq!(summary.documents, 50);
        assert_eq!(summary.records_produced, 50);
        assert_eq!(summary.commits, 1);
        assert_eq!(summary.merges, 0);
        assert!(indexer.create_index().is_err());
    }

    #[test]
    fn test_lifecycle_with_merge() {
        let dir = TempDir::new().unwrap();
        let settings = settings(dir.path(), 50).with(keys::FORCE_MERGE, "true");
        let mut indexer =
            Indexer::new(settings, &PluginRegistry::with_builtins(), OpenMode::Overwrite).unwrap();

        let summary = indexer.create_index().unwrap();
        assert_eq!(summary.commits, 2);
        assert_eq!(summary.merges, 1);
        assert_eq!(summary.segments, 1);
        assert_eq!(summary.documents, 50);
    }

    #[test]
    fn test_unknown_producer_fails_at_init() {
        let dir = TempDir::new().unwrap();
        let settings = settings(dir.path(), 1).with(keys::PRODUCER, "csv");
        let err = Indexer::new(settings, &PluginRegistry::with_builtins(), OpenMode::Overwrite)
            .unwrap_err();
        assert!(matches!(err, IndexerError::UnknownPlugin { kind: "producer", .. }));
    }

    #[test]
    fn test_copy_settings() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("run.toml");
        fs::write(&source, "[indexer]\nproducer = \"jsonl\"\n").unwrap();

        let indexer = Indexer::new(
            settings(dir.path(), 1),
            &PluginRegistry::with_builtins(),
            OpenMode::Overwrite,
        )
        .unwrap();
        let copied = indexer.copy_settings_to_index_dir(&source).unwrap();
        assert_eq!(copied, dir.path().join("idx").join(SETTINGS_COPY_NAME));
        assert_eq!(
            fs::read_to_string(copied).unwrap(),
            "[indexer]\nproducer = \"jsonl\"\n"
        );
    }
}
