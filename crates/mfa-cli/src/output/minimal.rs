use serde_json::Value;

use super::flatten;

/// Key figures in priority order: single analysis, batch summary, loan sizing.
const PRIORITY_KEYS: [&str; 6] = [
    "noi",
    "summary.total_noi",
    "loan",
    "dscr",
    "cap_at_ask_pct",
    "monthly_gross",
];

/// Print just the key answer value from the output.
pub fn print_minimal(value: &Value) {
    let result_obj = value.get("result").unwrap_or(value);
    let flat = flatten(result_obj);

    for key in PRIORITY_KEYS {
        if let Some(val) = flat.get(key).filter(|v| !v.is_null()) {
            println!("{}", format_minimal(val));
            return;
        }
    }

    if let Some((key, val)) = flat.iter().next() {
        println!("{}: {}", key, format_minimal(val));
        return;
    }

    println!("{}", format_minimal(result_obj));
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
