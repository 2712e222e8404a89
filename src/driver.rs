//! The top-level query entry point: parse, rewrite, lower, optionally sort
//! for presentation, optionally format.

use crate::column::ColumnRegistry;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::format;
use crate::iter::order_by;
use crate::plan;
use crate::provider::TableCatalog;
use crate::rewrite;
use crate::row::Rows;
use crate::sql2ra;

/// Per-query knobs layered on top of `EngineConfig`.
#[derive(Clone, Debug)]
pub struct ExecuteOptions {
    /// 0 disables the rewriter; see `EngineConfig::optimization_level`.
    pub optimization_level: u8,
    pub emit_csv: bool,
    pub emit_table: bool,
    /// Logs the rewritten RA tree at `info` level before lowering.
    pub dump_ra: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            optimization_level: EngineConfig::default().optimization_level,
            emit_csv: false,
            emit_table: false,
            dump_ra: false,
        }
    }
}

pub struct QueryResult {
    pub columns: ColumnRegistry,
    pub rows: Rows,
}

/// Parses `sql_text` against `catalog`, rewrites and lowers it to a row
/// stream, and applies `ORDER BY`/output formatting. `emit_csv` and
/// `emit_table` are mutually exclusive; `emit_csv` wins if both are set.
pub fn execute(catalog: &TableCatalog, sql_text: &str, options: ExecuteOptions) -> Result<QueryResult> {
    let parsed = sql2ra::parse(catalog, sql_text)?;

    let config = EngineConfig {
        optimization_level: options.optimization_level,
        ..EngineConfig::default()
    };

    let tree = rewrite::rewrite(parsed.relation, &config);
    if options.dump_ra {
        log::info!("RA:\n{tree:#?}");
    }

    let mut physical = plan::lower(&tree, catalog, &config)?;
    if !parsed.order_by.is_empty() {
        physical = order_by::order_by(physical, parsed.order_by)?;
    }

    let (columns, rows) = if options.emit_csv {
        format::csv(physical)
    } else if options.emit_table {
        format::table(physical)?
    } else {
        (physical.registry.clone(), physical.rows)
    };

    Ok(QueryResult { columns, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnDescriptor, LogicalType};
    use crate::error::Error;
    use crate::row::Row;
    use crate::value::Value;
    use std::sync::Arc;

    struct Ints {
        name: &'static str,
        values: Vec<i64>,
    }

    impl crate::provider::TableProvider for Ints {
        fn name(&self) -> &str {
            self.name
        }

        fn sorted(&self) -> bool {
            true
        }

        fn column_metadata(&self) -> Option<ColumnRegistry> {
            Some(ColumnRegistry::new(vec![ColumnDescriptor::new(self.name, "val", LogicalType::Int64)]))
        }

        fn produce(&self) -> Rows {
            let values = self.values.clone();
            Box::new(values.into_iter().map(|v| Ok(Row::new(vec![Value::Int64(v)]))))
        }
    }

    fn catalog() -> TableCatalog {
        let mut catalog = TableCatalog::new();
        catalog.register(Arc::new(Ints {
            name: "OneToFive",
            values: (1..=5).collect(),
        }));
        catalog.register(Arc::new(Ints {
            name: "OneToTen",
            values: (1..=10).collect(),
        }));
        catalog
    }

    #[test]
    fn select_with_where_and_limit() {
        let result = execute(
            &catalog(),
            "SELECT val FROM OneToTen WHERE val > 2 LIMIT 3",
            ExecuteOptions::default(),
        )
        .unwrap();
        let rows: Vec<_> = result.rows.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(rows, vec![Row::new(vec![Value::Int64(3)]), Row::new(vec![Value::Int64(4)]), Row::new(vec![Value::Int64(5)])]);
    }

    #[test]
    fn order_by_desc_reorders_the_stream() {
        let result = execute(
            &catalog(),
            "SELECT val FROM OneToFive ORDER BY val DESC",
            ExecuteOptions::default(),
        )
        .unwrap();
        let rows: Vec<_> = result.rows.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(rows[0], Row::new(vec![Value::Int64(5)]));
        assert_eq!(rows[4], Row::new(vec![Value::Int64(1)]));
    }

    #[test]
    fn inner_join_on_shared_key() {
        let result = execute(
            &catalog(),
            "SELECT a.val FROM OneToFive a JOIN OneToTen b ON a.val = b.val",
            ExecuteOptions::default(),
        )
        .unwrap();
        let rows: Vec<_> = result.rows.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(rows.len(), 5);
    }

    #[test]
    fn csv_output_includes_a_header_line() {
        let result = execute(
            &catalog(),
            "SELECT val FROM OneToFive LIMIT 2",
            ExecuteOptions {
                emit_csv: true,
                ..ExecuteOptions::default()
            },
        )
        .unwrap();
        let lines: Vec<_> = result.rows.map(|r| r.unwrap()[0].to_string()).collect();
        assert_eq!(lines[0], "OneToFive.val");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn unknown_table_surfaces_as_an_error() {
        let err = execute(&catalog(), "SELECT val FROM ghost", ExecuteOptions::default()).unwrap_err();
        assert_eq!(err, Error::TableDoesNotExist("ghost".into()));
    }

    #[test]
    fn optimization_level_zero_still_produces_correct_results() {
        let result = execute(
            &catalog(),
            "SELECT val FROM OneToFive WHERE val > 10",
            ExecuteOptions {
                optimization_level: 0,
                ..ExecuteOptions::default()
            },
        )
        .unwrap();
        assert_eq!(result.rows.count(), 0);
    }
}
