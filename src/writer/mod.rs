//! Index writer adapter
//!
//! Turns the field registry into an engine schema and analyzer setup, opens
//! the index location, and hands out one [`IndexSession`] shared by every
//! consumer.

mod layout;
mod policy;
mod session;

pub use layout::{SchemaLayout, BOOST_FIELD, DYNAMIC_FIELD};
pub use policy::AnalyzerPolicy;
pub use session::{
    open_session, IndexSession, OpenMode, RecordWriter, SessionStats, WriterLimits, MAX_WRITER_THREADS,
    MIN_MEMORY_PER_THREAD,
};
