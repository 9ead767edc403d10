//! Recyclable records and field values
//!
//! Producers fill records from the pool, consumers hand them back once the
//! index has taken them. Field values are recycled per field name so a
//! recycled value always carries its own field's config.

mod record;
mod recycler;
mod value;

pub use record::{Record, DEFAULT_BOOST};
pub use recycler::{PoolStats, RecordPool};
pub use value::{CoercionError, FieldValue, Value};
