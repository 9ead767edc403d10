use std::sync::Arc;

use tracing::{debug, error};

use super::plugin::{Consumer, RecordBatch};
use crate::config::Settings;
use crate::error::{IndexerError, Result};
use crate::pool::RecordPool;
use crate::writer::{IndexSession, RecordWriter};

/// Adds each record to the shared session and recycles it
///
/// Documents the engine rejects are logged and skipped; the run continues.
#[derive(Debug, Default)]
pub struct BasicConsumer {
    writer: Option<Arc<dyn RecordWriter>>,
    pool: Option<Arc<RecordPool>>,
    indexed: u64,
    failed: u64,
}

impl BasicConsumer {
    pub const NAME: &'static str = "basic";

    /// A consumer already bound to `writer` and `pool`
    pub fn with_writer(writer: Arc<dyn RecordWriter>, pool: Arc<RecordPool>) -> Self {
        Self {
            writer: Some(writer),
            pool: Some(pool),
            ..Self::default()
        }
    }

    pub fn indexed(&self) -> u64 {
        self.indexed
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }
}

impl Consumer for BasicConsumer {
    fn initialize(
        &mut self,
        session: Arc<IndexSession>,
        pool: Arc<RecordPool>,
        _settings: &Settings,
    ) -> Result<()> {
        self.writer = Some(session);
        self.pool = Some(pool);
        Ok(())
    }

    fn consume(&mut self, batch: RecordBatch) -> Result<()> {
        let (Some(writer), Some(pool)) = (&self.writer, &self.pool) else {
            return Err(IndexerError::Pipeline(
                "basic consumer used before initialize".to_string(),
            ));
        };

        let mut indexed = 0;
        let mut failed = 0;
        for record in batch {
            let result = writer.add_record(&record);
            pool.release(record);
            match result {
                Ok(()) => indexed += 1,
                Err(e) if !e.is_fatal() => {
                    failed += 1;
                    error!("Failed to index document: {}", e);
                }
                Err(e) => return Err(e),
            }
        }

        self.indexed += indexed;
        self.failed += failed;
        debug!("Indexed batch of {} ({} failed)", indexed + failed, failed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalyzerCatalog;
    use crate::config::IndexerConfig;
    use crate::pool::Record;
    use crate::schema::{FieldDefaults, TypeRegistry};
    use crate::writer::{open_session, OpenMode};
    use parking_lot::Mutex;
    use tempfile::TempDir;

    /// Rejects records whose `name` is "bad", remembers the rest
    #[derive(Debug, Default)]
    struct PickyWriter {
        accepted: Mutex<Vec<String>>,
    }

    impl RecordWriter for PickyWriter {
        fn add_record(&self, record: &Record) -> Result<()> {
            let name = record
                .get("name")
                .map(|f| f.value().to_string())
                .unwrap_or_default();
            if name == "bad" {
                return Err(IndexerError::Document("rejected".to_string()));
            }
            self.accepted.lock().push(name);
            Ok(())
        }
    }

    #[test]
    fn test_uninitialized_consumer_errors() {
        let mut consumer = BasicConsumer::default();
        assert!(consumer.consume(RecordBatch::default()).is_err());
    }

    #[test]
    fn test_indexes_and_recycles() {
        let dir = TempDir::new().unwrap();
        let registry = Arc::new(TypeRegistry::new(FieldDefaults::default()));
        let config = IndexerConfig {
            index_dir: dir.path().to_path_buf(),
            consumer_threads: 1,
            ..IndexerConfig::default()
        };
        let session = Arc::new(
            open_session(
                &config,
                &registry,
                &AnalyzerCatalog::with_builtins(),
                OpenMode::Overwrite,
            )
            .unwrap(),
        );
        let pool = Arc::new(RecordPool::new(Arc::clone(&registry), 8));

        let mut consumer = BasicConsumer::default();
        consumer
            .initialize(Arc::clone(&session), Arc::clone(&pool), &Settings::new())
            .unwrap();

        let records = (0..3)
            .map(|i| {
                let mut record = pool.acquire_record();
                pool.add_field(&mut record, "name", &format!("doc-{}", i));
                record
            })
            .collect::<Vec<_>>();
        consumer.consume(RecordBatch::new(records)).unwrap();

        assert_eq!(consumer.indexed(), 3);
        assert_eq!(consumer.failed(), 0);
        assert_eq!(pool.free_records(), 3);
        assert_eq!(pool.free_fields("name"), 3);

        session.commit().unwrap();
        assert_eq!(session.num_docs().unwrap(), 3);
    }

    #[test]
    fn test_rejected_document_skipped_and_recycled() {
        let registry = Arc::new(TypeRegistry::new(FieldDefaults::default()));
        let pool = Arc::new(RecordPool::new(Arc::clone(&registry), 8));
        let writer = Arc::new(PickyWriter::default());
        let mut consumer = BasicConsumer::with_writer(writer.clone(), Arc::clone(&pool));

        let records = ["first", "bad", "third", "fourth"]
            .iter()
            .map(|name| {
                let mut record = pool.acquire_record();
                pool.add_field(&mut record, "name", name);
                record
            })
            .collect::<Vec<_>>();
        consumer.consume(RecordBatch::new(records)).unwrap();

        assert_eq!(consumer.indexed(), 3);
        assert_eq!(consumer.failed(), 1);
        assert_eq!(*writer.accepted.lock(), ["first", "third", "fourth"]);
        assert_eq!(pool.free_records(), 4);
        assert_eq!(pool.free_fields("name"), 4);
    }

    #[test]
    fn test_closed_session_is_fatal_but_recycles() {
        let dir = TempDir::new().unwrap();
        let registry = Arc::new(TypeRegistry::new(FieldDefaults::default()));
        let config = IndexerConfig {
            index_dir: dir.path().to_path_buf(),
            consumer_threads: 1,
            ..IndexerConfig::default()
        };
        let session = Arc::new(
            open_session(
                &config,
                &registry,
                &AnalyzerCatalog::with_builtins(),
                OpenMode::Append,
            )
            .unwrap(),
        );
        let pool = Arc::new(RecordPool::new(Arc::clone(&registry), 8));
        let mut consumer = BasicConsumer::default();
        consumer
            .initialize(Arc::clone(&session), Arc::clone(&pool), &Settings::new())
            .unwrap();
        session.close().unwrap();

        let record = pool.acquire_record();
        let err = consumer.consume(RecordBatch::new(vec![record])).unwrap_err();
        assert!(matches!(err, IndexerError::SessionClosed));
        assert_eq!(pool.free_records(), 1);
    }
}
