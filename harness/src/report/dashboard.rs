//! Data file for the static dashboard page.
//!
//! The page loads a script that assigns `window.EVAL_DATA`. Each entry is the
//! persisted record plus `_filename`, `_is_pass` and `_total_score`, newest
//! first.

use super::markdown::sort_newest_first;
use crate::record::LoadedRecord;
use serde_json::Value;

pub fn dashboard_entries(records: &[LoadedRecord]) -> Result<Vec<Value>, serde_json::Error> {
    sort_newest_first(records)
        .into_iter()
        .map(|loaded| {
            let mut value = serde_json::to_value(&loaded.record)?;
            if let Value::Object(map) = &mut value {
                map.insert("_filename".to_string(), Value::from(loaded.file_name.clone()));
                map.insert("_is_pass".to_string(), Value::from(loaded.record.passed()));
                map.insert("_total_score".to_string(), Value::from(loaded.record.score()));
            }
            Ok(value)
        })
        .collect()
}

pub fn render_dashboard_data(records: &[LoadedRecord]) -> Result<String, serde_json::Error> {
    let entries = dashboard_entries(records)?;
    Ok(format!(
        "window.EVAL_DATA = {};",
        serde_json::to_string_pretty(&entries)?
    ))
}
