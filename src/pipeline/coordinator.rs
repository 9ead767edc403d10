//! Single-producer, multi-consumer execution over a bounded record buffer

use std::any::Any;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{bounded, Receiver};
use serde::Serialize;
use tracing::{debug, error, info};

use super::plugin::{Consumer, Producer, RecordBatch, RecordSink};
use crate::config::IndexerConfig;
use crate::error::{IndexerError, Result};
use crate::pool::Record;

/// What one pipeline run moved through the buffer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub records_produced: u64,
    pub records_consumed: u64,
    pub batches: u64,
    pub consumers: usize,
    #[serde(skip)]
    pub elapsed: Duration,
}

#[derive(Clone, Copy, Debug, Default)]
struct ConsumerReport {
    records: u64,
    batches: u64,
}

/// Bounded pipeline configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pipeline {
    buffer_size: usize,
    batch_size: usize,
}

impl Pipeline {
    pub fn new(buffer_size: usize, batch_size: usize) -> Self {
        Self {
            buffer_size: buffer_size.max(1),
            batch_size: batch_size.max(1),
        }
    }

    pub fn from_config(config: &IndexerConfig) -> Self {
        Self::new(config.doc_buffer_size, config.batch_size)
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Run `producer` against `consumers` until the producer is exhausted
    /// and the buffer drained.
    ///
    /// Blocks the calling thread. Every spawned thread is joined before
    /// returning; the first producer or consumer failure (error or panic)
    /// is then reported.
    pub fn run(
        &self,
        producer: Box<dyn Producer>,
        consumers: Vec<Box<dyn Consumer>>,
    ) -> Result<PipelineReport> {
        if consumers.is_empty() {
            return Err(IndexerError::Pipeline("no consumers to run".to_string()));
        }

        let start = Instant::now();
        let consumer_count = consumers.len();
        let (tx, rx) = bounded::<Record>(self.buffer_size);
        info!(
            "Starting pipeline: 1 producer, {} consumers, buffer {}, batch {}",
            consumer_count, self.buffer_size, self.batch_size
        );

        let mut consumer_handles = Vec::with_capacity(consumer_count);
        for (id, consumer) in consumers.into_iter().enumerate() {
            let rx = rx.clone();
            let batch_size = self.batch_size;
            let handle = thread::Builder::new()
                .name(format!("consumer-{}", id))
                .spawn(move || consume_loop(consumer, rx, batch_size))?;
            consumer_handles.push(handle);
        }
        // Consumers hold the only receivers: if they all stop, pushes fail
        // instead of blocking forever.
        drop(rx);

        let producer_handle = thread::Builder::new()
            .name("producer".to_string())
            .spawn(move || produce(producer, tx))?;

        let mut report = PipelineReport {
            consumers: consumer_count,
            ..PipelineReport::default()
        };

        let producer_error = match join("producer", producer_handle) {
            Ok(produced) => {
                report.records_produced = produced;
                None
            }
            Err(e) => Some(e),
        };
        let mut consumer_error = None;
        for (id, handle) in consumer_handles.into_iter().enumerate() {
            match join(&format!("consumer-{}", id), handle) {
                Ok(consumed) => {
                    report.records_consumed += consumed.records;
                    report.batches += consumed.batches;
                }
                Err(e) => {
                    consumer_error.get_or_insert(e);
                }
            }
        }
        report.elapsed = start.elapsed();

        // A closed buffer only means the consumers stopped first.
        match (producer_error, consumer_error) {
            (Some(IndexerError::BufferClosed), Some(e)) | (None, Some(e)) => return Err(e),
            (Some(e), _) => return Err(e),
            (None, None) => {}
        }
        info!(
            "Pipeline finished: {} records in {} batches ({:?})",
            report.records_consumed, report.batches, report.elapsed
        );
        Ok(report)
    }
}

fn produce(
    mut producer: Box<dyn Producer>,
    tx: crossbeam::channel::Sender<Record>,
) -> Result<u64> {
    let mut sink = RecordSink::new(tx);
    producer.produce(&mut sink)?;
    debug!("Producer exhausted after {} records", sink.pushed());
    Ok(sink.pushed())
}

fn consume_loop(
    mut consumer: Box<dyn Consumer>,
    rx: Receiver<Record>,
    batch_size: usize,
) -> Result<ConsumerReport> {
    let mut report = ConsumerReport::default();

    // recv fails only once the producer is gone and the buffer is empty
    while let Ok(first) = rx.recv() {
        let mut records = Vec::with_capacity(batch_size);
        records.push(first);
        records.extend(rx.try_iter().take(batch_size - 1));

        report.records += records.len() as u64;
        report.batches += 1;
        consumer.consume(RecordBatch::new(records))?;
    }
    Ok(report)
}

fn join<T>(name: &str, handle: JoinHandle<Result<T>>) -> Result<T> {
    match handle.join() {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            error!("{} failed: {}", name, e);
            Err(e)
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!("{} panicked: {}", name, message);
            Err(IndexerError::Pipeline(format!(
                "{} panicked: {}",
                name, message
            )))
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
