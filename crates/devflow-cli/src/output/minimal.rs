use serde_json::Value;

use super::{format_value, result_of, split_sections};

/// Dotted paths of the headline figure, in priority order.
const PRIORITY_KEYS: [&str; 6] = [
    "metrics.npv",
    "summary.npv.mean",
    "base_case_npv",
    "npv",
    "irr",
    "kind",
];

/// Print just the key answer value from the output.
pub fn print_minimal(value: &Value) {
    let result = result_of(value);
    let sections = split_sections(result);

    for key in PRIORITY_KEYS {
        if let Some((_, val)) = sections.fields.iter().find(|(k, v)| k == key && !v.is_empty()) {
            println!("{val}");
            return;
        }
    }

    if let Some((key, val)) = sections.fields.first() {
        println!("{key}: {val}");
        return;
    }

    // Record lists such as the preset catalog print their length.
    if let Some((name, records)) = sections.tables.first() {
        if name.is_empty() {
            println!("{}", records.len());
        } else {
            println!("{name}: {}", records.len());
        }
        return;
    }

    println!("{}", format_value(result));
}
