pub mod csv_out;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use colored::Colorize;
use serde_json::{Map, Value};

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => match serde_json::to_string_pretty(value) {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("{}: cannot render JSON output: {e}", "error".red().bold()),
        },
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// The `result` of a computation envelope, or the value itself.
pub(crate) fn result_of(value: &Value) -> &Value {
    value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value)
}

/// A result split into scalar fields, record tables and numeric grids,
/// each keyed by its dotted path.
#[derive(Default)]
pub(crate) struct Sections<'a> {
    pub fields: Vec<(String, String)>,
    pub tables: Vec<(String, &'a [Value])>,
    pub grids: Vec<(String, &'a [Value])>,
}

pub(crate) fn split_sections(value: &Value) -> Sections<'_> {
    let mut sections = Sections::default();
    match value {
        Value::Object(map) => walk(map, "", &mut sections),
        Value::Array(arr) => sections.tables.push((String::new(), arr.as_slice())),
        other => sections.fields.push((String::new(), format_value(other))),
    }
    sections
}

fn walk<'a>(map: &'a Map<String, Value>, prefix: &str, sections: &mut Sections<'a>) {
    for (key, val) in map {
        let path = join(prefix, key);
        match val {
            Value::Object(inner) => walk(inner, &path, sections),
            Value::Array(arr) if arr.first().is_some_and(Value::is_object) => {
                sections.tables.push((path, arr.as_slice()))
            }
            Value::Array(arr) if arr.first().is_some_and(Value::is_array) => {
                sections.grids.push((path, arr.as_slice()))
            }
            other => sections.fields.push((path, format_value(other))),
        }
    }
}

/// Flatten one record into dotted columns.
pub(crate) fn flatten_record(value: &Value) -> Vec<(String, String)> {
    let mut out = Vec::new();
    if let Value::Object(map) = value {
        flatten_into(map, "", &mut out);
    }
    out
}

fn flatten_into(map: &Map<String, Value>, prefix: &str, out: &mut Vec<(String, String)>) {
    for (key, val) in map {
        let path = join(prefix, key);
        match val {
            Value::Object(inner) => flatten_into(inner, &path, out),
            other => out.push((path, format_value(other))),
        }
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

pub(crate) fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
