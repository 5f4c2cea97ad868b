use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{flatten, format_unit_mix};

/// Columns shown per listing when printing a batch.
const BATCH_COLUMNS: [(&str, &str); 10] = [
    ("listing.list_no", "List #"),
    ("listing.zip", "ZIP"),
    ("analysis.market_tier", "Tier"),
    ("listing.list_price", "Price"),
    ("listing.units", "Units"),
    ("analysis.monthly_gross", "Rent/mo"),
    ("analysis.noi", "NOI"),
    ("analysis.loan", "Loan"),
    ("analysis.dscr", "DSCR"),
    ("analysis.cap_at_ask_pct", "Cap %"),
];

/// Format output as a table using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_field_table(value);
            }
        }
        Value::Array(arr) => print_batch_table(arr),
        _ => println!("{}", value),
    }
}

fn print_result_table(result: &Value, envelope: &Map<String, Value>) {
    match result.get("results") {
        Some(Value::Array(rows)) => {
            print_batch_table(rows);
            if let Some(summary) = result.get("summary") {
                println!();
                print_field_table(summary);
            }
        }
        _ => print_field_table(result),
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_field_table(value: &Value) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in flatten(value) {
        builder.push_record([key, format_value(&val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_batch_table(rows: &[Value]) {
    if rows.is_empty() {
        println!("(no listings)");
        return;
    }

    let mut builder = Builder::default();
    builder.push_record(BATCH_COLUMNS.iter().map(|(_, header)| header.to_string()));
    for row in rows {
        let flat = flatten(row);
        builder.push_record(BATCH_COLUMNS.iter().map(|(key, _)| {
            flat.get(*key).map(format_value).unwrap_or_default()
        }));
    }
    println!("{}", Table::from(builder));
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "—".to_string(),
        Value::Array(arr) => format_unit_mix(arr).unwrap_or_else(|| {
            arr.iter().map(format_value).collect::<Vec<_>>().join(", ")
        }),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
