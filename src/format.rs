//! CSV and Markdown-table output formatters wrapping a `Physical`'s row
//! stream. Grounded in `sqlhild/iterator.py`'s `CSVOutput`/`TableOutput`:
//! CSV streams one line per row, header first; the table formatter
//! materializes every row up front (the way `TableOutput` does) so column
//! widths can be computed before anything is rendered.
//!
//! Both formatters narrow the output to a single anonymous text column —
//! the rendered line — since neither produces rows in the source schema
//! any more.

use crate::column::{ColumnDescriptor, ColumnRegistry, LogicalType};
use crate::error::Result;
use crate::plan::Physical;
use crate::row::{Row, Rows};
use crate::value::Value;

fn line_registry() -> ColumnRegistry {
    ColumnRegistry::new(vec![ColumnDescriptor::anonymous("line", LogicalType::Text)])
}

fn line_row(line: String) -> Row {
    Row::new(vec![Value::Text(line)])
}

/// Renders `source` as CSV text per RFC 4180: fields containing a comma,
/// double quote, or newline are quoted, with embedded quotes doubled.
pub fn csv(source: Physical) -> (ColumnRegistry, Rows) {
    let header = csv_line(source.registry.iter().map(|d| d.identifier.to_string()));
    let mut header = Some(Ok(line_row(header)));
    let body = source.rows.map(|item| item.map(|row| line_row(csv_line(row.iter().map(|v| v.to_string())))));
    let rows: Rows = Box::new(std::iter::from_fn(move || header.take()).chain(body));
    (line_registry(), rows)
}

fn csv_line(fields: impl Iterator<Item = String>) -> String {
    fields.map(|f| csv_field(&f)).collect::<Vec<_>>().join(",")
}

fn csv_field(raw: &str) -> String {
    if raw.contains(',') || raw.contains('"') || raw.contains('\n') {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

/// Renders `source` as a GitHub-flavored Markdown table.
pub fn table(source: Physical) -> Result<(ColumnRegistry, Rows)> {
    let headers: Vec<String> = source.registry.iter().map(|d| d.identifier.to_string()).collect();
    let mut cells = Vec::new();
    for item in source.rows {
        let row = item?;
        cells.push(row.iter().map(|v| v.to_string()).collect::<Vec<_>>());
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &cells {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut lines = Vec::with_capacity(cells.len() + 2);
    lines.push(render_row(&headers, &widths));
    lines.push(render_separator(&widths));
    for row in &cells {
        lines.push(render_row(row, &widths));
    }

    let rows: Rows = Box::new(lines.into_iter().map(|line| Ok(line_row(line))));
    Ok((line_registry(), rows))
}

fn render_row(cells: &[String], widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{c:width$}", width = widths[i]))
        .collect();
    format!("| {} |", padded.join(" | "))
}

fn render_separator(widths: &[usize]) -> String {
    format!("| {} |", widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join(" | "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::LogicalType;
    use crate::error::Result as RaResult;

    fn physical() -> Physical {
        let registry = ColumnRegistry::new(vec![
            ColumnDescriptor::new("t", "name", LogicalType::Text),
            ColumnDescriptor::new("t", "val", LogicalType::Int64),
        ]);
        let rows: Vec<RaResult<Row>> = vec![
            Ok(Row::new(vec![Value::Text("a, b".into()), Value::Int64(1)])),
            Ok(Row::new(vec![Value::Text("c".into()), Value::Int64(22)])),
        ];
        Physical::new(registry, false, Box::new(rows.into_iter()))
    }

    #[test]
    fn csv_quotes_fields_containing_commas() {
        let (_, rows) = csv(physical());
        let lines: Vec<String> = rows.map(|r| r.unwrap()[0].to_string()).collect();
        assert_eq!(lines[0], "t.name,t.val");
        assert_eq!(lines[1], "\"a, b\",1");
        assert_eq!(lines[2], "c,22");
    }

    #[test]
    fn table_pads_columns_to_the_widest_cell() {
        let (_, rows) = table(physical()).unwrap();
        let lines: Vec<String> = rows.map(|r| r.unwrap()[0].to_string()).collect();
        assert_eq!(lines[0], "| t.name | t.val |");
        assert_eq!(lines[1], "| ------ | ----- |");
        assert_eq!(lines[2], "| a, b   | 1     |");
        assert_eq!(lines[3], "| c      | 22    |");
    }
}
