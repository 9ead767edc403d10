pub mod analysis;
pub mod config;
pub mod error;
pub mod indexer;
pub mod pipeline;
pub mod pool;
pub mod schema;
pub mod writer;

pub use analysis::{AnalyzerCatalog, AnalyzerFactory, AnalyzerRef, Construction, EngineVersion};
pub use config::{IndexerConfig, Settings};
pub use error::{IndexerError, Result};
pub use indexer::{Indexer, LifecycleState, RunSummary};
pub use pipeline::{Consumer, Pipeline, PluginRegistry, Producer, RecordBatch, RecordSink};
pub use pool::{FieldValue, Record, RecordPool, Value};
pub use schema::{
    FieldConfig, FieldDefaults, FieldType, IndexMode, StoreMode, TermVectorMode, TypeRegistry,
};
pub use writer::{open_session, IndexSession, OpenMode};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
