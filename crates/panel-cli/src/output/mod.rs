use std::io::IsTerminal;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::cli::OutputFormat;

pub mod table;

use table::{Table, TableStyle};

/// Columns shown first, in this order, when present.
const LEADING_COLUMNS: &[&str] = &["id", "status", "title", "item_id", "reviewer_id", "slot", "round"];

/// Render a serializable response to a string in the requested format.
pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Raw => Ok(serde_json::to_string(value)?),
        OutputFormat::Table => Ok(render_table(&serde_json::to_value(value)?, terminal_style())),
    }
}

/// Print a serializable response in the requested format.
pub fn output<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    let rendered = render(value, format)?;
    println!("{rendered}");
    Ok(())
}

fn terminal_style() -> TableStyle {
    let max_width = std::env::var("COLUMNS")
        .ok()
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .filter(|width| *width > 0);
    let color = std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none();
    TableStyle { max_width, color }
}

fn render_table(value: &Value, style: TableStyle) -> String {
    match value {
        Value::Array(rows) => render_rows(rows, style),
        Value::Object(map) => render_record(map, style),
        scalar => {
            let mut table = Table::new(vec!["value".to_string()]);
            table.push(vec![cell(scalar)]);
            table.render(style)
        }
    }
}

fn render_record(map: &Map<String, Value>, style: TableStyle) -> String {
    let mut table = Table::new(vec!["field".to_string(), "value".to_string()]);
    for key in ordered_columns(map.keys()) {
        if let Some(value) = map.get(&key) {
            table.push(vec![key, cell(value)]);
        }
    }
    table.render(style)
}

fn render_rows(rows: &[Value], style: TableStyle) -> String {
    if rows.is_empty() {
        return String::from("(no rows)");
    }

    if !rows.iter().all(Value::is_object) {
        let mut table = Table::new(vec!["value".to_string()]);
        for row in rows {
            table.push(vec![cell(row)]);
        }
        return table.render(style);
    }

    let columns = ordered_columns(rows.iter().filter_map(Value::as_object).flat_map(Map::keys));
    let mut table = Table::new(columns.clone());
    for map in rows.iter().filter_map(Value::as_object) {
        table.push(
            columns
                .iter()
                .map(|column| map.get(column).map_or_else(|| String::from("-"), cell))
                .collect(),
        );
    }
    table.render(style)
}

/// Deduplicate keys, leading columns first and the rest alphabetical.
fn ordered_columns<'a>(keys: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut rest: Vec<String> = Vec::new();
    let mut leading: Vec<&str> = Vec::new();
    for key in keys {
        if let Some(known) = LEADING_COLUMNS.iter().find(|known| **known == key.as_str()) {
            if !leading.contains(known) {
                leading.push(*known);
            }
        } else if !rest.contains(key) {
            rest.push(key.clone());
        }
    }
    leading.sort_by_key(|column| LEADING_COLUMNS.iter().position(|known| known == column));
    rest.sort();
    leading.into_iter().map(str::to_string).chain(rest).collect()
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::from("-"),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.clone(),
        Value::Array(items) if items.is_empty() => String::from("[]"),
        nested => serde_json::to_string(nested).unwrap_or_else(|_| String::from("<invalid-json>")),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde::Serialize;
    use serde_json::json;

    use super::*;

    #[derive(Serialize)]
    struct Row {
        title: &'static str,
        id: &'static str,
        version: u32,
    }

    const PLAIN: TableStyle = TableStyle {
        max_width: None,
        color: false,
    };

    #[test]
    fn json_render_is_pretty_and_parseable() {
        let out = render(&Row { title: "Algebra", id: "itm-1", version: 2 }, OutputFormat::Json)
            .expect("json render should work");
        let parsed: Value = serde_json::from_str(&out).expect("json should parse");
        assert_eq!(parsed["id"], "itm-1");
        assert!(out.contains('\n'));
    }

    #[test]
    fn raw_render_is_one_line() {
        let out = render(&vec![Row { title: "Algebra", id: "itm-1", version: 2 }], OutputFormat::Raw)
            .expect("raw render should work");
        assert!(!out.contains('\n'));
        assert!(out.starts_with('['));
    }

    #[test]
    fn row_tables_lead_with_id() {
        let rows = json!([
            {"title": "Algebra", "id": "itm-1", "version": 1},
            {"title": "Geometry", "id": "itm-2", "version": 3, "subject": "math"},
        ]);
        let out = render_table(&rows, PLAIN);
        let header = out.lines().next().expect("header line");
        let columns: Vec<&str> = header.split_whitespace().collect();
        assert_eq!(columns, vec!["id", "title", "subject", "version"]);
        assert!(out.lines().nth(2).is_some_and(|line| line.contains("itm-1") && line.contains(" - ")));
    }

    #[test]
    fn records_render_as_field_value_pairs() {
        let out = render_table(&json!({"status": "approved", "id": "itm-9", "parent_id": null}), PLAIN);
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with("field"));
        assert!(lines[2].starts_with("id"));
        assert!(lines[3].starts_with("status"));
        assert!(lines[4].contains("parent_id") && lines[4].trim_end().ends_with('-'));
    }

    #[test]
    fn empty_list_has_placeholder() {
        assert_eq!(render_table(&json!([]), PLAIN), "(no rows)");
    }

    #[test]
    fn nested_values_render_as_compact_json() {
        assert_eq!(cell(&json!({"passed": true})), r#"{"passed":true}"#);
        assert_eq!(cell(&json!([])), "[]");
        assert_eq!(cell(&Value::Null), "-");
    }
}
