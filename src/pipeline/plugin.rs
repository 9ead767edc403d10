use std::sync::Arc;

use crate::config::Settings;
use crate::error::{IndexerError, Result};
use crate::pool::{Record, RecordPool};
use crate::writer::IndexSession;

/// Source of raw records
///
/// Runs on the pipeline's single producer thread. `produce` pushes records
/// into the sink until the input is exhausted and then returns; returning
/// signals end of input to the consumers.
pub trait Producer: Send {
    fn initialize(&mut self, pool: Arc<RecordPool>, settings: &Settings) -> Result<()>;

    fn produce(&mut self, sink: &mut RecordSink) -> Result<()>;
}

/// Sink for batches of records
///
/// Each consumer runs on its own thread. `consume` must index every record
/// in the batch and release each one back to the pool, including records
/// that failed to index. An error returned from `consume` stops this
/// consumer and fails the run.
pub trait Consumer: Send {
    fn initialize(
        &mut self,
        session: Arc<IndexSession>,
        pool: Arc<RecordPool>,
        settings: &Settings,
    ) -> Result<()>;

    fn consume(&mut self, batch: RecordBatch) -> Result<()>;
}

/// Producer side of the record buffer
pub struct RecordSink {
    tx: crossbeam::channel::Sender<Record>,
    pushed: u64,
}

impl RecordSink {
    pub(crate) fn new(tx: crossbeam::channel::Sender<Record>) -> Self {
        Self { tx, pushed: 0 }
    }

    /// Hand a record to the consumers, blocking while the buffer is full.
    ///
    /// Fails with [`IndexerError::BufferClosed`] once every consumer has
    /// stopped.
    pub fn push(&mut self, record: Record) -> Result<()> {
        self.tx
            .send(record)
            .map_err(|_| IndexerError::BufferClosed)?;
        self.pushed += 1;
        Ok(())
    }

    /// Records pushed so far
    pub fn pushed(&self) -> u64 {
        self.pushed
    }
}

/// Records pulled from the buffer in one go, in arrival order
#[derive(Debug, Default)]
pub struct RecordBatch {
    records: Vec<Record>,
}

impl RecordBatch {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }
}

impl IntoIterator for RecordBatch {
    type Item = Record;
    type IntoIter = std::vec::IntoIter<Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl From<Vec<Record>> for RecordBatch {
    fn from(records: Vec<Record>) -> Self {
        Self::new(records)
    }
}
