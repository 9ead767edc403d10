//! Record → engine document mapping
//!
//! Every configured field gets its own schema field. Fields first seen while
//! indexing, and text fallbacks of numeric fields, land in a JSON catch-all
//! keyed by field name. The record weight is kept in a fast `_boost` column.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};

use tantivy::schema::{
    Field, IndexRecordOption, JsonObjectOptions, NumericOptions, OwnedValue, Schema,
    TextFieldIndexing, TextOptions,
};
use tantivy::TantivyDocument;

use super::policy::AnalyzerPolicy;
use crate::error::{IndexerError, Result};
use crate::pool::{FieldValue, Record, Value};
use crate::schema::{FieldConfig, FieldDefaults, FieldType, IndexMode, TypeRegistry};

/// Catch-all JSON field for fields without a schema slot
pub const DYNAMIC_FIELD: &str = "_dynamic";

/// Per-document weight column
pub const BOOST_FIELD: &str = "_boost";

const RAW_TOKENIZER: &str = "raw";

/// Schema plus the handles needed to turn records into documents
#[derive(Clone, Debug)]
pub struct SchemaLayout {
    schema: Schema,
    fields: HashMap<String, Field>,
    dynamic: Field,
    boost: Field,
}

impl SchemaLayout {
    /// Lay out one schema field per configured field
    pub fn build(registry: &TypeRegistry, policy: &AnalyzerPolicy) -> Result<Self> {
        let mut builder = Schema::builder();
        let mut fields = HashMap::new();

        for config in registry.configs() {
            validate_field_name(config.name())?;
            let analyzer = policy.analyzer_for(config.name()).tokenizer_name();
            let field = match config.field_type() {
                FieldType::Text => {
                    builder.add_text_field(config.name(), text_options(&config, &analyzer))
                }
                FieldType::Int | FieldType::Long => {
                    builder.add_i64_field(config.name(), numeric_options(&config))
                }
                FieldType::Float | FieldType::Double => {
                    builder.add_f64_field(config.name(), numeric_options(&config))
                }
            };
            fields.insert(config.name().to_string(), field);
        }

        let dynamic = builder.add_json_field(
            DYNAMIC_FIELD,
            dynamic_options(registry.defaults(), policy),
        );
        let boost = builder.add_f64_field(
            BOOST_FIELD,
            NumericOptions::default().set_stored().set_fast(),
        );

        Ok(Self {
            schema: builder.build(),
            fields,
            dynamic,
            boost,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Schema field for a configured field name
    pub fn field(&self, name: &str) -> Option<Field> {
        self.fields.get(name).copied()
    }

    pub fn dynamic_field(&self) -> Field {
        self.dynamic
    }

    pub fn boost_field(&self) -> Field {
        self.boost
    }

    /// Number of configured fields with their own schema slot
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Build the engine document for a record
    pub fn to_document(&self, record: &Record) -> TantivyDocument {
        let mut doc = TantivyDocument::new();
        let mut dynamic: BTreeMap<String, OwnedValue> = BTreeMap::new();

        for field_value in record.fields() {
            match self.field(field_value.name()) {
                Some(field) if !field_value.is_fallback() => {
                    add_typed(&mut doc, field, field_value.value());
                }
                _ => add_dynamic(&mut dynamic, field_value),
            }
        }

        if !dynamic.is_empty() {
            doc.add_object(self.dynamic, dynamic);
        }
        doc.add_f64(self.boost, f64::from(record.boost()));
        doc
    }
}

fn validate_field_name(name: &str) -> Result<()> {
    if name.is_empty() || name.starts_with('-') {
        return Err(IndexerError::Config(format!(
            "'{}' is not a valid field name",
            name
        )));
    }
    if name == DYNAMIC_FIELD || name == BOOST_FIELD {
        return Err(IndexerError::Config(format!(
            "field name '{}' is reserved",
            name
        )));
    }
    Ok(())
}

fn record_option(config: &FieldConfig) -> IndexRecordOption {
    let term_vector = config.term_vector();
    if config.index().is_analyzed() || term_vector.with_positions() {
        IndexRecordOption::WithFreqsAndPositions
    } else if term_vector.is_enabled() {
        IndexRecordOption::WithFreqs
    } else {
        IndexRecordOption::Basic
    }
}

fn tokenizer_for(index: IndexMode, analyzer: &str) -> &str {
    if index.is_analyzed() {
        analyzer
    } else {
        RAW_TOKENIZER
    }
}

fn text_options(config: &FieldConfig, analyzer: &str) -> TextOptions {
    let mut options = TextOptions::default();
    if config.store().is_stored() {
        options = options.set_stored();
    }
    if config.index().is_indexed() {
        let indexing = TextFieldIndexing::default()
            .set_tokenizer(tokenizer_for(config.index(), analyzer))
            .set_index_option(record_option(config))
            .set_fieldnorms(config.index().has_norms());
        options = options.set_indexing_options(indexing);
    }
    options
}

fn numeric_options(config: &FieldConfig) -> NumericOptions {
    let mut options = NumericOptions::default().set_fast();
    if config.store().is_stored() {
        options = options.set_stored();
    }
    if config.index().is_indexed() {
        options = options.set_indexed();
        if config.index().has_norms() {
            options = options.set_fieldnorm();
        }
    }
    options
}

fn dynamic_options(defaults: &FieldDefaults, policy: &AnalyzerPolicy) -> JsonObjectOptions {
    let mut options = JsonObjectOptions::default();
    if defaults.store.is_stored() {
        options = options.set_stored();
    }
    if defaults.index.is_indexed() {
        let analyzer = policy.default_analyzer().tokenizer_name();
        let record = if defaults.index.is_analyzed() {
            IndexRecordOption::WithFreqsAndPositions
        } else {
            IndexRecordOption::Basic
        };
        let indexing = TextFieldIndexing::default()
            .set_tokenizer(tokenizer_for(defaults.index, &analyzer))
            .set_index_option(record);
        options = options.set_indexing_options(indexing);
    }
    options
}

fn add_typed(doc: &mut TantivyDocument, field: Field, value: &Value) {
    match value {
        Value::Text(text) => doc.add_text(field, text),
        Value::Int(v) => doc.add_i64(field, i64::from(*v)),
        Value::Long(v) => doc.add_i64(field, *v),
        Value::Float(v) => doc.add_f64(field, f64::from(*v)),
        Value::Double(v) => doc.add_f64(field, *v),
    }
}

fn owned(value: &Value) -> OwnedValue {
    match value {
        Value::Text(text) => OwnedValue::Str(text.clone()),
        Value::Int(v) => OwnedValue::I64(i64::from(*v)),
        Value::Long(v) => OwnedValue::I64(*v),
        Value::Float(v) => OwnedValue::F64(f64::from(*v)),
        Value::Double(v) => OwnedValue::F64(*v),
    }
}

// Repeated names collect into an array, in record order.
fn add_dynamic(dynamic: &mut BTreeMap<String, OwnedValue>, field_value: &FieldValue) {
    let value = owned(field_value.value());
    match dynamic.entry(field_value.name().to_string()) {
        Entry::Vacant(slot) => {
            slot.insert(value);
        }
        Entry::Occupied(mut slot) => match slot.get_mut() {
            OwnedValue::Array(values) => values.push(value),
            existing => {
                let first = std::mem::replace(existing, OwnedValue::Null);
                *existing = OwnedValue::Array(vec![first, value]);
            }
        },
    }
}
