pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::{Map, Value};

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Flatten nested objects into dotted keys (`opex.pm`, `analysis.noi`).
///
/// Arrays are left in place for the formatter to render.
pub fn flatten(value: &Value) -> Map<String, Value> {
    let mut out = Map::new();
    if let Value::Object(map) = value {
        flatten_into(&mut out, "", map);
    }
    out
}

fn flatten_into(out: &mut Map<String, Value>, prefix: &str, map: &Map<String, Value>) {
    for (key, val) in map {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match val {
            Value::Object(inner) => flatten_into(out, &name, inner),
            other => {
                out.insert(name, other.clone());
            }
        }
    }
}

/// Render unit mixes as `2BRx4` instead of raw JSON.
pub fn format_unit_mix(arr: &[Value]) -> Option<String> {
    let parts: Option<Vec<String>> = arr
        .iter()
        .map(|e| {
            let bedrooms = e.get("bedrooms")?.as_u64()?;
            let count = e.get("count")?.as_u64()?;
            Some(format!("{bedrooms}BRx{count}"))
        })
        .collect();
    parts.filter(|p| !p.is_empty()).map(|p| p.join(" + "))
}
