use serde_json::Value;
use std::io;

use super::{flatten, format_unit_mix};

/// Write output as CSV to stdout.
///
/// Batches become one row per listing with flattened `listing.*` and
/// `analysis.*` columns; single results become `field,value` pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let body = value.get("result").unwrap_or(value);
    match body.get("results") {
        Some(Value::Array(rows)) => write_rows(&mut wtr, rows),
        _ => match body {
            Value::Array(rows) => write_rows(&mut wtr, rows),
            Value::Object(_) => {
                let _ = wtr.write_record(["field", "value"]);
                for (key, val) in flatten(body) {
                    let _ = wtr.write_record([key, format_csv_value(&val)]);
                }
            }
            other => {
                let _ = wtr.write_record([format_csv_value(other)]);
            }
        },
    }

    let _ = wtr.flush();
}

fn write_rows<W: io::Write>(wtr: &mut csv::Writer<W>, rows: &[Value]) {
    let Some(first) = rows.first() else {
        return;
    };

    let headers: Vec<String> = flatten(first).keys().cloned().collect();
    let _ = wtr.write_record(&headers);

    for row in rows {
        let flat = flatten(row);
        let record: Vec<String> = headers
            .iter()
            .map(|h| flat.get(h).map(format_csv_value).unwrap_or_default())
            .collect();
        let _ = wtr.write_record(&record);
    }
}

fn format_csv_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(arr) => {
            format_unit_mix(arr).unwrap_or_else(|| serde_json::to_string(value).unwrap_or_default())
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
