//! End-to-end query scenarios against the public `execute` entry point.
//!
//! The runner shape (`execute`/`select_expect`, semicolon-separated expected
//! output with column names on the first line) is grounded in the teacher's
//! `sql/tests/utility.rs` (`SqlStudentRunner`/`handle`), adapted to a
//! read-only, provider-backed catalog instead of a session over a mutable
//! storage engine: there is no `CREATE TABLE`/`INSERT` step here, so the
//! runner is built directly against a fixture `TableCatalog` (spec.md §8's
//! `OneToFive`/`OneToTen`/`TableC` tables).

use itertools::Itertools;
use sqlra::column::{ColumnDescriptor, ColumnRegistry, LogicalType};
use sqlra::provider::{TableCatalog, TableProvider};
use sqlra::row::{Row, Rows};
use sqlra::value::Value;
use sqlra::{execute, ExecuteOptions};
use std::sync::Arc;

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

/// Holds a fixture catalog and the options the next query runs with.
/// Mirrors the teacher's `SqlStudentRunner` builder shape (`execute`,
/// `select_expect` returning `&mut Self` for chaining) without the
/// mutable-session half that runner needs for `CREATE TABLE`/`INSERT`.
struct SqlTestRunner {
    catalog: TableCatalog,
    options: ExecuteOptions,
}

impl SqlTestRunner {
    fn new() -> Self {
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
        Self {
            catalog,
            options: ExecuteOptions::default(),
        }
    }

    fn with_optimization_level(mut self, level: u8) -> Self {
        self.options.optimization_level = level;
        self
    }

    /// Runs `sql`, compares the output against `expected` formatted as the
    /// teacher's runner expects: `"col1, col2 ; v1, v2 ; v1, v2"` — the
    /// first semicolon-separated segment is the expected column list, every
    /// segment after is one expected row, each comma-separated.
    fn select_expect(&self, sql: &str, expected: &str) -> &Self {
        let result = execute(&self.catalog, sql, self.options.clone()).expect("query failed");
        let mut segments = expected.split(';').map(str::trim);

        let expected_columns = segments.next().unwrap_or("");
        let actual_columns = result
            .columns
            .iter()
            .map(|c| c.identifier.to_string())
            .join(", ");
        assert_eq!(actual_columns, expected_columns, "column list mismatch for `{sql}`");

        let actual_rows: Vec<String> = result
            .rows
            .map(|r| r.unwrap().iter().map(|v| v.to_string()).join(", "))
            .collect();
        let expected_rows: Vec<String> = segments.map(str::to_string).collect();
        assert_eq!(actual_rows, expected_rows, "row mismatch for `{sql}`");
        self
    }
}

// --- spec.md §8 end-to-end scenarios, in order ------------------------------

#[test]
fn scenario_1_select_star() {
    SqlTestRunner::new().select_expect(
        "SELECT * FROM OneToFive",
        "OneToFive.val ; 1 ; 2 ; 3 ; 4 ; 5",
    );
}

#[test]
fn scenario_2_where_greater_than() {
    SqlTestRunner::new().select_expect(
        "SELECT * FROM OneToFive WHERE val > 3",
        "OneToFive.val ; 4 ; 5",
    );
}

#[test]
fn scenario_3_where_or_equality() {
    SqlTestRunner::new().select_expect(
        "SELECT * FROM OneToTen WHERE val = 5 OR val = 6",
        "OneToTen.val ; 5 ; 6",
    );
}

#[test]
fn scenario_4_select_distinct() {
    SqlTestRunner::new().select_expect(
        "SELECT DISTINCT val FROM TableC",
        "TableC.val ; A ; B ; C ; D",
    );
}

#[test]
fn scenario_5_inner_join() {
    SqlTestRunner::new().select_expect(
        "SELECT * FROM OneToFive a INNER JOIN OneToTen b ON a.val = b.val",
        "OneToFive.val, OneToTen.val ; 1, 1 ; 2, 2 ; 3, 3 ; 4, 4 ; 5, 5",
    );
}

#[test]
fn scenario_6_right_outer_join() {
    SqlTestRunner::new().select_expect(
        "SELECT * FROM OneToFive a RIGHT OUTER JOIN OneToTen b ON a.val = b.val",
        "OneToFive.val, OneToTen.val ; 1, 1 ; 2, 2 ; 3, 3 ; 4, 4 ; 5, 5 ; NULL, 6 ; NULL, 7 ; NULL, 8 ; NULL, 9 ; NULL, 10",
    );
}

#[test]
fn scenario_7_mysql_style_limit_offset() {
    SqlTestRunner::new().select_expect("SELECT * FROM OneToFive LIMIT 3, 2", "OneToFive.val ; 4 ; 5");
}

#[test]
fn scenario_8_where_false_is_empty() {
    SqlTestRunner::new().select_expect("SELECT * FROM TableC WHERE false", "TableC.val");
}

// --- additional coverage beyond the eight canonical scenarios ---------------

#[test]
fn left_join_pads_unmatched_right_with_null() {
    SqlTestRunner::new().select_expect(
        "SELECT * FROM OneToTen a LEFT OUTER JOIN OneToFive b ON a.val = b.val",
        "OneToTen.val, OneToFive.val ; 1, 1 ; 2, 2 ; 3, 3 ; 4, 4 ; 5, 5 ; 6, NULL ; 7, NULL ; 8, NULL ; 9, NULL ; 10, NULL",
    );
}

#[test]
fn self_join_fans_out_through_a_single_tee() {
    SqlTestRunner::new().select_expect(
        "SELECT a.val FROM OneToFive a JOIN OneToFive b ON a.val = b.val",
        "OneToFive.val ; 1 ; 2 ; 3 ; 4 ; 5",
    );
}

#[test]
fn like_pattern_matches_with_percent_wildcard() {
    SqlTestRunner::new().select_expect("SELECT val FROM TableC WHERE val LIKE 'A%'", "TableC.val ; A ; A");
}

#[test]
fn in_list_desugars_and_still_matches() {
    SqlTestRunner::new().select_expect(
        "SELECT val FROM TableC WHERE val IN ('B', 'D')",
        "TableC.val ; B ; D",
    );
}

#[test]
fn group_by_emits_one_row_per_distinct_key() {
    SqlTestRunner::new().select_expect("SELECT val FROM TableC GROUP BY val", "TableC.val ; A ; B ; C ; D");
}

#[test]
fn union_of_two_selects_is_sorted_and_deduplicated() {
    SqlTestRunner::new().select_expect(
        "SELECT val FROM OneToFive WHERE val <= 3 UNION SELECT val FROM OneToTen WHERE val >= 2 AND val <= 4",
        "OneToFive.val ; 1 ; 2 ; 3 ; 4",
    );
}

#[test]
fn optimization_level_zero_still_returns_correct_rows() {
    SqlTestRunner::new()
        .with_optimization_level(0)
        .select_expect("SELECT * FROM OneToFive WHERE val > 3", "OneToFive.val ; 4 ; 5");
}

#[test]
fn unknown_table_is_rejected_before_any_row_is_produced() {
    let catalog = SqlTestRunner::new().catalog;
    let err = execute(&catalog, "SELECT * FROM ghost", ExecuteOptions::default()).unwrap_err();
    assert_eq!(err, sqlra::Error::TableDoesNotExist("ghost".into()));
}
