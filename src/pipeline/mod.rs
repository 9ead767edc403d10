//! Producer/consumer pipeline
//!
//! A single [`Producer`] fills records from the pool and pushes them into a
//! bounded buffer; a fixed set of [`Consumer`]s pull them in batches, index
//! them and hand them back to the pool. Producers and consumers are looked up
//! by name in a [`PluginRegistry`].

mod basic;
mod coordinator;
mod jsonl;
mod plugin;
mod registry;

pub use basic::BasicConsumer;
pub use coordinator::{Pipeline, PipelineReport};
pub use jsonl::JsonLinesProducer;
pub use plugin::{Consumer, Producer, RecordBatch, RecordSink};
pub use registry::{ConsumerFactory, PluginRegistry, ProducerFactory};

