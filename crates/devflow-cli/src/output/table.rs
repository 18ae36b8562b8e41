use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::{flatten_record, format_value, result_of, split_sections};

/// Format output as tables: scalar fields first, then one table per record
/// list and grid in the result.
pub fn print_table(value: &Value) {
    let sections = split_sections(result_of(value));

    if !sections.fields.is_empty() {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in &sections.fields {
            builder.push_record([key.as_str(), val.as_str()]);
        }
        println!("{}", Table::from(builder));
    }

    for (name, records) in &sections.tables {
        if !name.is_empty() {
            println!("\n{name}:");
        }
        print_records(records);
    }

    for (name, rows) in &sections.grids {
        println!("\n{name}:");
        print_grid(rows, value);
    }

    if let Some(envelope) = value.as_object() {
        if let Some(Value::Array(warnings)) = envelope.get("warnings") {
            if !warnings.is_empty() {
                println!("\nWarnings:");
                for w in warnings {
                    if let Value::String(s) = w {
                        println!("  - {}", s);
                    }
                }
            }
        }
        if let Some(Value::String(meth)) = envelope.get("methodology") {
            println!("\nMethodology: {}", meth);
        }
    }
}

fn print_records(records: &[Value]) {
    if records.is_empty() {
        println!("(empty)");
        return;
    }
    let headers: Vec<String> = flatten_record(&records[0])
        .into_iter()
        .map(|(k, _)| k)
        .collect();
    let mut builder = Builder::default();
    builder.push_record(headers.iter().map(String::as_str));
    for record in records {
        let cols = flatten_record(record);
        let row: Vec<String> = headers
            .iter()
            .map(|h| {
                cols.iter()
                    .find(|(k, _)| k == h)
                    .map(|(_, v)| v.clone())
                    .unwrap_or_default()
            })
            .collect();
        builder.push_record(row);
    }
    println!("{}", Table::from(builder));
}

/// Sensitivity grids are labelled with the price (rows) and cost (columns)
/// changes when the result carries them.
fn print_grid(rows: &[Value], envelope: &Value) {
    let result = result_of(envelope);
    let labels = |key: &str| -> Option<Vec<String>> {
        result
            .get(key)
            .and_then(Value::as_array)
            .map(|a| a.iter().map(format_value).collect())
    };
    let row_labels = labels("price_changes");
    let col_labels = labels("cost_changes");

    let mut builder = Builder::default();
    if let Some(cols) = &col_labels {
        let mut header = vec!["price \\ cost".to_string()];
        header.extend(cols.iter().cloned());
        builder.push_record(header);
    }
    for (i, row) in rows.iter().enumerate() {
        let mut record = Vec::new();
        if let Some(labels) = &row_labels {
            record.push(labels.get(i).cloned().unwrap_or_default());
        }
        if let Value::Array(cells) = row {
            record.extend(cells.iter().map(format_value));
        }
        builder.push_record(record);
    }
    println!("{}", Table::from(builder));
}
