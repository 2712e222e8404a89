use itertools::Itertools;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use sqlra::column::{ColumnDescriptor, ColumnRegistry, LogicalType};
use sqlra::provider::{TableCatalog, TableProvider};
use sqlra::row::{Row, Rows};
use sqlra::value::Value;
use sqlra::{execute, ExecuteOptions};
use std::sync::Arc;

/// A handful of small in-memory tables so the REPL is runnable without a
/// caller wiring up its own `TableProvider`s first, grounded in spec.md
/// §8's end-to-end scenario fixtures (`OneToFive`, `OneToTen`, `TableC`).
struct IntRange {
    name: &'static str,
    values: Vec<i64>,
}

impl TableProvider for IntRange {
    fn name(&self) -> &str {
        self.name
    }

    fn sorted(&self) -> bool {
        true
    }

    fn column_metadata(&self) -> Option<ColumnRegistry> {
        Some(ColumnRegistry::new(vec![ColumnDescriptor::new(
            self.name,
            "val",
            LogicalType::Int64,
        )]))
    }

    fn produce(&self) -> Rows {
        let values = self.values.clone();
        Box::new(values.into_iter().map(|v| Ok(Row::new(vec![Value::Int64(v)]))))
    }
}

struct TextRows {
    name: &'static str,
    values: Vec<&'static str>,
}

impl TableProvider for TextRows {
    fn name(&self) -> &str {
        self.name
    }

    fn sorted(&self) -> bool {
        true
    }

    fn column_metadata(&self) -> Option<ColumnRegistry> {
        Some(ColumnRegistry::new(vec![ColumnDescriptor::new(
            self.name,
            "val",
            LogicalType::Text,
        )]))
    }

    fn produce(&self) -> Rows {
        let values = self.values.clone();
        Box::new(values.into_iter().map(|v| Ok(Row::new(vec![Value::Text(v.to_string())]))))
    }
}

fn demo_catalog() -> TableCatalog {
    let mut catalog = TableCatalog::new();
    catalog.register(Arc::new(IntRange {
        name: "OneToFive",
        values: (1..=5).collect(),
    }));
    catalog.register(Arc::new(IntRange {
        name: "OneToTen",
        values: (1..=10).collect(),
    }));
    catalog.register(Arc::new(TextRows {
        name: "TableC",
        values: vec!["A", "A", "B", "C", "D"],
    }));
    catalog
}

fn main() {
    env_logger::init();
    let catalog = demo_catalog();
    let mut options = ExecuteOptions {
        emit_table: true,
        ..ExecuteOptions::default()
    };

    let mut editor = DefaultEditor::new().expect("failed to initialize line editor");
    loop {
        match editor.readline("sqlra> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line);
                if let Some(directive) = line.strip_prefix('\\') {
                    handle_directive(directive, &mut options);
                    continue;
                }
                run_query(&catalog, line, &options);
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("readline error: {err}");
                break;
            }
        }
    }
}

/// REPL meta-commands: `\opt N` sets the optimization level, `\csv`/`\table`
/// pick the output formatter, `\ra` toggles dumping the rewritten RA tree.
fn handle_directive(directive: &str, options: &mut ExecuteOptions) {
    let mut parts = directive.split_whitespace();
    match parts.next() {
        Some("opt") => match parts.next().and_then(|s| s.parse::<u8>().ok()) {
            Some(level) => options.optimization_level = level,
            None => eprintln!("usage: \\opt <0-5>"),
        },
        Some("csv") => {
            options.emit_csv = true;
            options.emit_table = false;
        }
        Some("table") => {
            options.emit_csv = false;
            options.emit_table = true;
        }
        Some("ra") => options.dump_ra = !options.dump_ra,
        Some(other) => eprintln!("unknown directive: \\{other}"),
        None => {}
    }
}

fn run_query(catalog: &TableCatalog, sql_text: &str, options: &ExecuteOptions) {
    match execute(catalog, sql_text, options.clone()) {
        Ok(result) => {
            if !options.emit_csv && !options.emit_table {
                print_header(&result.columns);
            }
            for row in result.rows {
                match row {
                    Ok(row) => println!("{}", row.iter().join(", ")),
                    Err(err) => {
                        eprintln!("runtime error: {err}");
                        return;
                    }
                }
            }
        }
        Err(err) => eprintln!("error: {err}"),
    }
}

fn print_header(columns: &ColumnRegistry) {
    println!("[{}]", columns.iter().map(|c| c.identifier.to_string()).join(", "));
}
