use serde_json::Value;
use std::io;

use super::{flatten_record, format_value, result_of, split_sections};

type StdoutWriter = csv::Writer<io::StdoutLock<'static>>;

/// Write output as CSV to stdout.
///
/// The largest record list in the result (ledger rows, fan chart, draws) is
/// written as a table; a grid is written with its change labels; anything
/// else falls back to `field,value` pairs.
pub fn print_csv(value: &Value) {
    let result = result_of(value);
    let sections = split_sections(result);
    let mut wtr = csv::Writer::from_writer(io::stdout().lock());

    if let Some((_, records)) = sections.tables.iter().max_by_key(|(_, r)| r.len()) {
        write_records(&mut wtr, records);
    } else if let Some((_, rows)) = sections.grids.first() {
        write_grid(&mut wtr, rows, result);
    } else {
        let _ = wtr.write_record(["field", "value"]);
        for (key, val) in &sections.fields {
            let _ = wtr.write_record([key.as_str(), val.as_str()]);
        }
    }

    let _ = wtr.flush();
}

fn write_records(wtr: &mut StdoutWriter, records: &[Value]) {
    let Some(first) = records.first() else {
        return;
    };
    let headers: Vec<String> = flatten_record(first).into_iter().map(|(k, _)| k).collect();
    let _ = wtr.write_record(&headers);
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
        let _ = wtr.write_record(&row);
    }
}

fn write_grid(wtr: &mut StdoutWriter, rows: &[Value], result: &Value) {
    let labels = |key: &str| -> Vec<String> {
        result
            .get(key)
            .and_then(Value::as_array)
            .map(|a| a.iter().map(format_value).collect())
            .unwrap_or_default()
    };
    let row_labels = labels("price_changes");
    let mut header = vec!["price_change".to_string()];
    header.extend(labels("cost_changes"));
    let _ = wtr.write_record(&header);

    for (i, row) in rows.iter().enumerate() {
        let mut record = vec![row_labels.get(i).cloned().unwrap_or_default()];
        if let Value::Array(cells) = row {
            record.extend(cells.iter().map(format_value));
        }
        let _ = wtr.write_record(&record);
    }
}
