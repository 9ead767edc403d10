use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam::queue::ArrayQueue;
use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, warn};

use super::record::Record;
use super::value::FieldValue;
use crate::config::DEFAULT_POOL_CAPACITY;
use crate::schema::TypeRegistry;

type FreeList<T> = Arc<ArrayQueue<T>>;

/// Snapshot of pool activity counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub fields_created: u64,
    pub fields_reused: u64,
    pub records_created: u64,
    pub records_reused: u64,
    pub fields_dropped: u64,
    pub records_dropped: u64,
    pub coercion_failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    fields_created: AtomicU64,
    fields_reused: AtomicU64,
    records_created: AtomicU64,
    records_reused: AtomicU64,
    fields_dropped: AtomicU64,
    records_dropped: AtomicU64,
    coercion_failures: AtomicU64,
}

/// Recycling allocator for records and field values
///
/// One bounded lock-free free-list per field name plus one shared free-list
/// of records. Every operation is non-blocking: an empty list means a fresh
/// allocation, a full list means the released instance is dropped.
#[derive(Debug)]
pub struct RecordPool {
    registry: Arc<TypeRegistry>,
    capacity: usize,
    fields: DashMap<String, FreeList<FieldValue>>,
    records: ArrayQueue<Record>,
    counters: Counters,
}

impl RecordPool {
    /// Create a pool whose free-lists each hold at most `capacity` entries
    pub fn new(registry: Arc<TypeRegistry>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            registry,
            capacity,
            fields: DashMap::new(),
            records: ArrayQueue::new(capacity),
            counters: Counters::default(),
        }
    }

    pub fn with_default_capacity(registry: Arc<TypeRegistry>) -> Self {
        Self::new(registry, DEFAULT_POOL_CAPACITY)
    }

    /// A field value for `field_name` holding `raw` coerced to the field's
    /// declared type.
    ///
    /// A value that does not parse as the declared numeric type is logged and
    /// kept as text for this call only.
    pub fn acquire_field(&self, field_name: &str, raw: &str) -> FieldValue {
        let mut field = match self.free_list(field_name).pop() {
            Some(field) => {
                self.counters.fields_reused.fetch_add(1, Ordering::Relaxed);
                field
            }
            None => {
                self.counters.fields_created.fetch_add(1, Ordering::Relaxed);
                FieldValue::new(self.registry.resolve(field_name))
            }
        };

        if let Err(e) = field.assign(raw) {
            self.counters.coercion_failures.fetch_add(1, Ordering::Relaxed);
            warn!("{}. Adding as text.", e);
        }
        field
    }

    /// An empty record with the default boost
    pub fn acquire_record(&self) -> Record {
        match self.records.pop() {
            Some(record) => {
                self.counters.records_reused.fetch_add(1, Ordering::Relaxed);
                record
            }
            None => {
                self.counters.records_created.fetch_add(1, Ordering::Relaxed);
                Record::new()
            }
        }
    }

    /// Convenience for `acquire_field` + `Record::add`
    pub fn add_field(&self, record: &mut Record, field_name: &str, raw: &str) {
        record.add(self.acquire_field(field_name, raw));
    }

    /// Return a record and all its field values to the pool.
    ///
    /// Field values go back to their own field's free-list, the record is
    /// emptied and its boost reset. Anything that does not fit is dropped.
    pub fn release(&self, mut record: Record) {
        let mut current: Option<(String, FreeList<FieldValue>)> = None;

        for field in record.drain_fields() {
            // Records usually carry runs of the same field; skip the map
            // lookup while the name repeats.
            let list = match &current {
                Some((name, list)) if name == field.name() => Arc::clone(list),
                _ => {
                    let list = self.free_list(field.name());
                    current = Some((field.name().to_string(), Arc::clone(&list)));
                    list
                }
            };
            if list.push(field).is_err() {
                self.counters.fields_dropped.fetch_add(1, Ordering::Relaxed);
            }
        }

        record.reset();
        if self.records.push(record).is_err() {
            self.counters.records_dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Capacity of every free-list
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Field values currently pooled for `field_name`
    pub fn free_fields(&self, field_name: &str) -> usize {
        self.fields
            .get(field_name)
            .map(|list| list.len())
            .unwrap_or(0)
    }

    /// Records currently pooled
    pub fn free_records(&self) -> usize {
        self.records.len()
    }

    pub fn stats(&self) -> PoolStats {
        let c = &self.counters;
        PoolStats {
            fields_created: c.fields_created.load(Ordering::Relaxed),
            fields_reused: c.fields_reused.load(Ordering::Relaxed),
            records_created: c.records_created.load(Ordering::Relaxed),
            records_reused: c.records_reused.load(Ordering::Relaxed),
            fields_dropped: c.fields_dropped.load(Ordering::Relaxed),
            records_dropped: c.records_dropped.load(Ordering::Relaxed),
            coercion_failures: c.coercion_failures.load(Ordering::Relaxed),
        }
    }

    // Free-list for a field name, installed on first use.
    fn free_list(&self, field_name: &str) -> FreeList<FieldValue> {
        if let Some(list) = self.fields.get(field_name) {
            return Arc::clone(list.value());
        }
        let entry = self
            .fields
            .entry(field_name.to_string())
            .or_insert_with(|| {
                debug!(
                    "Creating free-list for field '{}' (capacity {})",
                    field_name, self.capacity
                );
                Arc::new(ArrayQueue::new(self.capacity))
            });
        Arc::clone(entry.value())
    }
}
