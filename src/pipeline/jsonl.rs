use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::{info, warn};

use super::plugin::{Producer, RecordSink};
use crate::config::{keys, Settings};
use crate::error::{IndexerError, Result};
use crate::pool::{Record, RecordPool};

/// Reads one record per line from a JSON-lines file
///
/// Every key of a line's object is a field name. Strings, numbers and
/// booleans become raw field values, arrays become repeated values, and
/// `null` is skipped. Lines that are not JSON objects are logged and skipped.
#[derive(Debug, Default)]
pub struct JsonLinesProducer {
    pool: Option<Arc<RecordPool>>,
    path: Option<PathBuf>,
    skipped: u64,
}

impl JsonLinesProducer {
    pub const NAME: &'static str = "jsonl";

    /// Reserved key carrying the record weight
    pub const BOOST_KEY: &'static str = "_boost";

    /// Lines skipped as malformed so far
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    fn fill(pool: &RecordPool, record: &mut Record, name: &str, value: &JsonValue) {
        match value {
            JsonValue::Null => {}
            JsonValue::String(s) => pool.add_field(record, name, s),
            JsonValue::Number(n) => pool.add_field(record, name, &n.to_string()),
            JsonValue::Bool(b) => pool.add_field(record, name, if *b { "true" } else { "false" }),
            JsonValue::Array(values) => {
                for value in values {
                    Self::fill(pool, record, name, value);
                }
            }
            JsonValue::Object(_) => pool.add_field(record, name, &value.to_string()),
        }
    }
}

impl Producer for JsonLinesProducer {
    fn initialize(&mut self, pool: Arc<RecordPool>, settings: &Settings) -> Result<()> {
        let path = settings
            .get(keys::JSONL_PATH)
            .ok_or(IndexerError::MissingSetting(keys::JSONL_PATH))?;
        self.path = Some(PathBuf::from(path));
        self.pool = Some(pool);
        Ok(())
    }

    fn produce(&mut self, sink: &mut RecordSink) -> Result<()> {
        let (Some(pool), Some(path)) = (&self.pool, &self.path) else {
            return Err(IndexerError::Pipeline(
                "jsonl producer used before initialize".to_string(),
            ));
        };

        let mut reader = BufReader::new(File::open(path)?);
        let mut buf = Vec::new();
        let mut skipped = 0;
        let mut line_no = 0;
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            line_no += 1;

            let line = match std::str::from_utf8(&buf) {
                Ok(line) => line.trim(),
                Err(e) => {
                    warn!("{}:{}: {}, skipping", path.display(), line_no, e);
                    skipped += 1;
                    continue;
                }
            };
            if line.is_empty() {
                continue;
            }

            let object = match serde_json::from_str::<JsonValue>(line) {
                Ok(JsonValue::Object(object)) => object,
                Ok(_) => {
                    warn!("{}:{}: not a JSON object, skipping", path.display(), line_no);
                    skipped += 1;
                    continue;
                }
                Err(e) => {
                    warn!("{}:{}: {}, skipping", path.display(), line_no, e);
                    skipped += 1;
                    continue;
                }
            };

            let mut record = pool.acquire_record();
            for (name, value) in &object {
                if name == Self::BOOST_KEY {
                    match value.as_f64() {
                        Some(boost) => record.set_boost(boost as f32),
                        None => warn!(
                            "{}:{}: ignoring non-numeric {}",
                            path.display(),
                            line_no,
                            Self::BOOST_KEY
                        ),
                    }
                    continue;
                }
                Self::fill(pool, &mut record, name, value);
            }
            sink.push(record)?;
        }

        self.skipped += skipped;
        info!(
            "Read {} records from {} ({} lines skipped)",
            sink.pushed(),
            path.display(),
            skipped
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Value;
    use crate::schema::{FieldConfig, FieldDefaults, FieldType, TypeRegistry};
    use crossbeam::channel::bounded;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn pool() -> Arc<RecordPool> {
        let defaults = FieldDefaults::default();
        let year = FieldConfig::builder("year")
            .field_type(FieldType::Int)
            .build(&defaults);
        Arc::new(RecordPool::new(
            Arc::new(TypeRegistry::with_configs(defaults, [year])),
            8,
        ))
    }

    fn run(contents: &str) -> (JsonLinesProducer, Vec<Record>) {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();

        let settings = Settings::new().with(keys::JSONL_PATH, file.path().to_string_lossy());
        let mut producer = JsonLinesProducer::default();
        producer.initialize(pool(), &settings).unwrap();

        let (tx, rx) = bounded(64);
        let mut sink = RecordSink::new(tx);
        producer.produce(&mut sink).unwrap();
        drop(sink);
        (producer, rx.iter().collect())
    }

    #[test]
    fn test_reads_records() {
        let (_, records) = run(concat!(
            "{\"title\": \"First\", \"year\": 1999, \"_boost\": 2.5}\n",
            "\n",
            "{\"title\": \"Second\", \"tags\": [\"a\", \"b\"], \"draft\": false, \"note\": null}\n",
        ));
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.boost(), 2.5);
        assert_eq!(first.get("year").unwrap().value(), &Value::Int(1999));
        assert!(first.get(JsonLinesProducer::BOOST_KEY).is_none());

        let second = &records[1];
        assert_eq!(second.boost(), 1.0);
        assert_eq!(second.get_all("tags").count(), 2);
        assert_eq!(
            second.get("draft").unwrap().value(),
            &Value::Text("false".to_string())
        );
        assert!(second.get("note").is_none());
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let (producer, records) = run(concat!(
            "{\"title\": \"ok\"}\n",
            "{not json\n",
            "[1, 2, 3]\n",
            "{\"title\": \"also ok\"}\n",
        ));
        assert_eq!(records.len(), 2);
        assert_eq!(producer.skipped(), 2);
    }

    #[test]
    fn test_invalid_utf8_line_skipped() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{\"id\": \"1\"}\n{\"id\": \"\xff\xfe\"}\n{\"id\": \"3\"}")
            .unwrap();

        let settings = Settings::new().with(keys::JSONL_PATH, file.path().to_string_lossy());
        let mut producer = JsonLinesProducer::default();
        producer.initialize(pool(), &settings).unwrap();

        let (tx, rx) = bounded(8);
        let mut sink = RecordSink::new(tx);
        producer.produce(&mut sink).unwrap();
        drop(sink);

        let ids = rx
            .iter()
            .map(|record| record.get("id").unwrap().value().to_string())
            .collect::<Vec<_>>();
        assert_eq!(ids, ["1", "3"]);
        assert_eq!(producer.skipped(), 1);
    }

    #[test]
    fn test_missing_path_setting() {
        let mut producer = JsonLinesProducer::default();
        let err = producer.initialize(pool(), &Settings::new()).unwrap_err();
        assert!(matches!(err, IndexerError::MissingSetting(keys::JSONL_PATH)));
    }

    #[test]
    fn test_missing_file_is_error() {
        let settings = Settings::new().with(keys::JSONL_PATH, "/nonexistent/corpus.jsonl");
        let mut producer = JsonLinesProducer::default();
        producer.initialize(pool(), &settings).unwrap();

        let (tx, _rx) = bounded(1);
        let mut sink = RecordSink::new(tx);
        assert!(matches!(
            producer.produce(&mut sink),
            Err(IndexerError::Io(_))
        ));
    }
}
