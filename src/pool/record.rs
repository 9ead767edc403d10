use std::vec::Drain;

use super::value::FieldValue;

/// Weight of a freshly acquired record
pub const DEFAULT_BOOST: f32 = 1.0;

/// An unordered bag of field values plus a document weight
///
/// Records normally come from [`RecordPool::acquire_record`] and go back
/// through [`RecordPool::release`] once indexed.
///
/// [`RecordPool::acquire_record`]: super::RecordPool::acquire_record
/// [`RecordPool::release`]: super::RecordPool::release
#[derive(Debug)]
pub struct Record {
    fields: Vec<FieldValue>,
    boost: f32,
}

impl Default for Record {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            boost: DEFAULT_BOOST,
        }
    }
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: FieldValue) {
        self.fields.push(field);
    }

    pub fn fields(&self) -> &[FieldValue] {
        &self.fields
    }

    /// First value for `name`
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// Every value for `name`, in insertion order
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FieldValue> + 'a {
        self.fields.iter().filter(move |f| f.name() == name)
    }

    pub fn boost(&self) -> f32 {
        self.boost
    }

    pub fn set_boost(&mut self, boost: f32) {
        self.boost = boost;
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn drain_fields(&mut self) -> Drain<'_, FieldValue> {
        self.fields.drain(..)
    }

    pub(crate) fn reset(&mut self) {
        self.fields.clear();
        self.boost = DEFAULT_BOOST;
    }
}
