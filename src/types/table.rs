//! Table Types
//!
//! Reshaping of API responses into flat, typed tables. Data reads yield
//! `(ts_key, time, value)` rows; metadata reads yield `(ts_key, key, value)`
//! rows. Empty responses yield empty tables, never errors.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{TsdbError, TsdbResult};

/// One observation of a time series vintage.
#[derive(Clone, Debug, PartialEq)]
pub struct TsObservation {
    pub ts_key: String,
    pub time: NaiveDate,
    pub value: Option<f64>,
}

/// One localized metadata entry of a time series.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TsMetadataEntry {
    pub ts_key: String,
    pub key: String,
    pub value: String,
}

/// Per-key record as returned by the `ts` endpoints: parallel arrays of
/// observation dates and values.
#[derive(Clone, Debug, Deserialize)]
struct TsRecord {
    ts_key: String,
    time: Vec<NaiveDate>,
    value: Vec<Option<f64>>,
}

/// Flatten a `ts` response (array of per-key records) into observation rows.
pub fn ts_data_to_rows(data: serde_json::Value) -> TsdbResult<Vec<TsObservation>> {
    let records: Vec<TsRecord> =
        serde_json::from_value(data).map_err(|e| TsdbError::InvalidResponse {
            message: format!("unexpected time series response shape: {e}"),
        })?;

    let mut rows = Vec::with_capacity(records.iter().map(|r| r.time.len()).sum());
    for record in records {
        if record.time.len() != record.value.len() {
            return Err(TsdbError::InvalidResponse {
                message: format!(
                    "time/value length mismatch for {}: {} vs {}",
                    record.ts_key,
                    record.time.len(),
                    record.value.len()
                ),
            });
        }
        for (time, value) in record.time.into_iter().zip(record.value) {
            rows.push(TsObservation {
                ts_key: record.ts_key.clone(),
                time,
                value,
            });
        }
    }
    Ok(rows)
}

/// Flatten a `ts/metadata` response (object keyed by time series key, each
/// value an object of metadata key/value pairs) into metadata rows.
pub fn ts_metadata_to_rows(data: serde_json::Value) -> TsdbResult<Vec<TsMetadataEntry>> {
    let map = match data {
        serde_json::Value::Object(map) => map,
        other => {
            return Err(TsdbError::InvalidResponse {
                message: format!("expected metadata object, got {}", json_kind(&other)),
            })
        }
    };

    let mut rows = Vec::new();
    for (ts_key, entries) in map {
        let entries = match entries {
            serde_json::Value::Object(entries) => entries,
            other => {
                return Err(TsdbError::InvalidResponse {
                    message: format!(
                        "expected metadata map for {ts_key}, got {}",
                        json_kind(&other)
                    ),
                })
            }
        };
        for (key, value) in entries {
            rows.push(TsMetadataEntry {
                ts_key: ts_key.clone(),
                key,
                value: stringify(value),
            });
        }
    }
    Ok(rows)
}

/// Metadata values are strings in practice; anything else is rendered as
/// compact JSON so no information is dropped.
fn stringify(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
