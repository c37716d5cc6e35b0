//! Decoding of usage API payloads into [`CostRecord`]s.
//!
//! Payloads are either a bare JSON array of records or an object carrying
//! the array under `records`. Every element must be an object with an
//! `id`; other fields are optional and decode to empty values. Numbers and
//! timestamps are accepted as JSON numbers or strings, and a field of the
//! wrong type is dropped with a warning rather than failing the payload.
//! JSON lines files (`.jsonl`) hold one record per line, and malformed
//! lines are skipped with a warning.

use std::path::Path;

use chrono::{DateTime, SecondsFormat};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{CostError, Result, ValidationError};
use crate::models::CostRecord;

/// Decode a JSON payload.
pub fn decode_records(json: &str) -> Result<Vec<CostRecord>> {
    let value: Value = serde_json::from_str(json)?;
    Ok(decode_value(value)?)
}

/// Decode an already-parsed JSON payload.
pub fn decode_value(value: Value) -> std::result::Result<Vec<CostRecord>, ValidationError> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("records") {
            Some(Value::Array(items)) => items,
            _ => return Err(ValidationError::NotAnArray { found: "object" }),
        },
        other => {
            return Err(ValidationError::NotAnArray {
                found: json_kind(&other),
            });
        }
    };

    let records = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| decode_record(index, item))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    debug!(count = records.len(), "decoded record payload");
    Ok(records)
}

/// Decode a single array element.
pub fn decode_record(index: usize, item: Value) -> std::result::Result<CostRecord, ValidationError> {
    let mut map: Map<String, Value> = match item {
        Value::Object(map) => map,
        other => {
            return Err(ValidationError::NotAnObject {
                index,
                found: json_kind(&other),
            });
        }
    };

    // Ids are opaque; numeric ids are accepted and kept as text.
    let id = match map.get("id") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(ValidationError::MissingId { index }),
    };
    map.insert("id".to_string(), Value::String(id));

    for (key, value) in map.iter_mut() {
        let Some(shape) = FieldShape::of(key) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        let found = json_kind(value);
        match shape.coerce(value.take()) {
            Some(coerced) => *value = coerced,
            None => warn!(index, field = %key, found, "ignoring wrong-typed record field"),
        }
    }

    serde_json::from_value(Value::Object(map)).map_err(|e| ValidationError::InvalidField {
        index,
        message: e.to_string(),
    })
}

/// Load records from a `.json` or `.jsonl` file.
pub fn load_records_file<P: AsRef<Path>>(path: P) -> Result<Vec<CostRecord>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| CostError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let records = if path.extension().is_some_and(|ext| ext == "jsonl") {
        decode_lines(&content)
    } else {
        decode_records(&content)?
    };

    info!(path = %path.display(), count = records.len(), "records loaded");
    Ok(records)
}

/// Decode JSON lines, skipping blank and malformed lines.
pub fn decode_lines(content: &str) -> Vec<CostRecord> {
    let mut records = Vec::new();
    for (line_number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let decoded = serde_json::from_str::<Value>(line)
            .map_err(|e| e.to_string())
            .and_then(|value| decode_record(records.len(), value).map_err(|e| e.to_string()));
        match decoded {
            Ok(record) => records.push(record),
            Err(message) => warn!(line = line_number + 1, %message, "skipping malformed record line"),
        }
    }
    records
}

/// JSON shape each optional record field is normalized to before decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldShape {
    Text,
    Integer,
    Float,
    Timestamp,
    TextList,
}

impl FieldShape {
    fn of(key: &str) -> Option<Self> {
        match key {
            "account" | "project" | "modelProvider" | "modelId" | "billingType" => Some(Self::Text),
            "inferenceCount" | "tokensIn" | "tokensOut" => Some(Self::Integer),
            "gpu" | "latency" | "cost" => Some(Self::Float),
            "inferenceDate" => Some(Self::Timestamp),
            "tags" => Some(Self::TextList),
            _ => None,
        }
    }

    /// Normalized value, or `None` when the value cannot take this shape.
    fn coerce(self, value: Value) -> Option<Value> {
        match (self, value) {
            (Self::Text, Value::String(s)) => Some(Value::String(s)),
            (Self::Text, Value::Number(n)) => Some(Value::String(n.to_string())),
            (Self::Integer, Value::Number(n)) => {
                n.as_i64().or_else(|| n.as_f64().and_then(integral)).map(Value::from)
            }
            (Self::Integer, Value::String(s)) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(integral))
                    .map(Value::from)
            }
            (Self::Float, Value::Number(n)) => n.as_f64().map(Value::from),
            (Self::Float, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Value::from),
            (Self::Timestamp, Value::String(s)) => Some(Value::String(s)),
            // Numeric timestamps are epoch milliseconds
            (Self::Timestamp, Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
                .and_then(DateTime::from_timestamp_millis)
                .map(|dt| Value::String(dt.to_rfc3339_opts(SecondsFormat::Millis, true))),
            (Self::TextList, Value::Array(items)) => Some(Value::Array(
                items
                    .into_iter()
                    .filter_map(|item| Self::Text.coerce(item))
                    .collect(),
            )),
            (Self::TextList, Value::String(s)) => Some(Value::Array(vec![Value::String(s)])),
            _ => None,
        }
    }
}

fn integral(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn test_decode_full_record() {
        let records = decode_records(
            r#"[{"id":"r1","account":"acme","project":"A","modelProvider":"openai",
                "modelId":"gpt-4o","billingType":"on-demand","inferenceDate":"2024-03-05",
                "inferenceCount":2,"tokensIn":10,"tokensOut":5,"gpu":1.5,"latency":120.0,
                "cost":0.25,"tags":["prod"]}]"#,
        )
        .unwrap();

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.model_provider, "openai");
        assert_eq!(r.model_id, "gpt-4o");
        assert_eq!(r.tokens_in, 10);
        assert_eq!(r.gpu, Some(1.5));
        assert!(r.inference_date.is_some());
        assert_eq!(r.tags, vec!["prod"]);
    }

    #[test]
    fn test_missing_fields_degrade_to_empty() {
        let records = decode_value(json!([{"id": "r1", "project": null, "gpu": null}])).unwrap();
        let r = &records[0];
        assert_eq!(r.project, "");
        assert_eq!(r.cost, 0.0);
        assert_eq!(r.gpu, None);
        assert_eq!(r.inference_date, None);
    }

    #[test]
    fn test_unparseable_date_is_none() {
        let records = decode_value(json!([{"id": "r1", "inferenceDate": "soon"}])).unwrap();
        assert_eq!(records[0].inference_date, None);
    }

    #[test]
    fn test_wrapped_payload() {
        let records = decode_value(json!({"records": [{"id": 7}]})).unwrap();
        assert_eq!(records[0].id, "7");
    }

    #[test]
    fn test_rejects_non_array() {
        assert_eq!(
            decode_value(json!("nope")).unwrap_err(),
            ValidationError::NotAnArray { found: "string" }
        );
        assert_eq!(
            decode_value(json!({"items": []})).unwrap_err(),
            ValidationError::NotAnArray { found: "object" }
        );
    }

    #[test]
    fn test_rejects_bad_elements_with_index() {
        let err = decode_value(json!([{"id": "a"}, 3])).unwrap_err();
        assert_eq!(err, ValidationError::NotAnObject { index: 1, found: "number" });

        let err = decode_value(json!([{"id": "a"}, {"id": ""}])).unwrap_err();
        assert_eq!(err, ValidationError::MissingId { index: 1 });
    }

    #[test]
    fn test_wrong_typed_fields_fall_back_to_default() {
        let records = decode_value(json!([
            {"id": "a", "tokensIn": "lots", "cost": true, "project": ["x"], "gpu": {}},
            {"id": "b", "inferenceDate": false, "tags": 3, "modelId": "gpt"}
        ]))
        .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].tokens_in, 0);
        assert_eq!(records[0].cost, 0.0);
        assert_eq!(records[0].project, "");
        assert_eq!(records[0].gpu, None);
        assert_eq!(records[1].inference_date, None);
        assert!(records[1].tags.is_empty());
        assert_eq!(records[1].model_id, "gpt");
    }

    #[test]
    fn test_epoch_millis_timestamp() {
        let records = decode_records(
            r#"[{"id":"a","inferenceDate":"2024-03-05"},{"id":"b","inferenceDate":1709596800000}]"#,
        )
        .unwrap();
        assert_eq!(records[1].inference_date, records[0].inference_date);
        assert_eq!(
            records[1].inference_date,
            Some(Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_string_encoded_cost() {
        let records = decode_records(r#"[{"id":"a","cost":"0.25","gpu":"1.5","latency":" 80 "}]"#)
            .unwrap();
        assert_eq!(records[0].cost, 0.25);
        assert_eq!(records[0].gpu, Some(1.5));
        assert_eq!(records[0].latency, Some(80.0));
    }

    #[test]
    fn test_integral_float_counts() {
        let records = decode_records(
            r#"[{"id":"a","tokensIn":10.0,"tokensOut":"7","inferenceCount":"3.0"},
                {"id":"b","tokensIn":10.5}]"#,
        )
        .unwrap();
        assert_eq!(records[0].tokens_in, 10);
        assert_eq!(records[0].tokens_out, 7);
        assert_eq!(records[0].inference_count, 3);
        // Fractional counts are not counts
        assert_eq!(records[1].tokens_in, 0);
    }

    #[test]
    fn test_numeric_labels_and_mixed_tags() {
        let records = decode_value(json!([
            {"id": "a", "project": 42, "tags": ["prod", 7, null, {"k": 1}]},
            {"id": "b", "tags": "solo"}
        ]))
        .unwrap();
        assert_eq!(records[0].project, "42");
        assert_eq!(records[0].tags, vec!["prod", "7"]);
        assert_eq!(records[1].tags, vec!["solo"]);
    }

    #[test]
    fn test_syntax_error_is_json_error() {
        assert!(matches!(decode_records("[{"), Err(CostError::Json(_))));
    }

    #[test]
    fn test_decode_lines_skips_malformed() {
        let content = "{\"id\":\"a\",\"cost\":1}\n\nnot json\n{\"cost\":2}\n{\"id\":\"b\"}\n";
        let records = decode_lines(content);
        let ids: Vec<_> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
