use crate::error::Result;
use crate::eval;
use crate::plan::Physical;
use crate::ra::expression::Expr;
use crate::ra::project_schema;
use crate::row::Row;
use std::collections::HashSet;

/// `GroupByHash(source, cols)`: builds a hash set keyed by the projected
/// columns and emits one row per distinct key, narrowing the registry to
/// those columns. No aggregation; grouping here is key-only deduplication,
/// not `SUM`/`COUNT`-style aggregation.
///
/// Output order is first-occurrence order rather than hash-bucket order,
/// so that identical inputs always yield identical output; a `HashSet`'s
/// iteration order is not stable across runs.
pub fn group_by(source: Physical, cols: Vec<Expr>) -> Result<Physical> {
    let registry = project_schema(&source.registry, &cols)?;
    let input_registry = source.registry;
    let mut seen: HashSet<Row> = HashSet::new();
    let mut ordered = Vec::new();
    for item in source.rows {
        let row = item?;
        let key: Result<Vec<_>> = cols.iter().map(|c| eval::eval(c, &input_registry, &row)).collect();
        let key = Row::new(key?);
        if seen.insert(key.clone()) {
            ordered.push(key);
        }
    }
    let rows = Box::new(ordered.into_iter().map(Ok));
    Ok(Physical::new(registry, false, rows))
}
