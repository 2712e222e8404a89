use crate::error::Result;
use crate::plan::Physical;
use crate::row::Row;
use std::collections::HashSet;

/// Materializes the smaller side's rows into a set and streams the larger
/// side, passing through rows present in both. Not currently selected by
/// the lowerer, which uses `DistinctSortedMerge` for `Intersection` since
/// it can rely on both sides already being sorted; kept here for a future
/// cost-aware lowerer to pick between the two strategies.
pub fn hash_intersect(a: Physical, b: Physical) -> Result<Physical> {
    let a_rows: Vec<Row> = a.rows.collect::<Result<Vec<_>>>()?;
    let b_rows: Vec<Row> = b.rows.collect::<Result<Vec<_>>>()?;
    let (probe_side, stream_side, registry) = if a_rows.len() <= b_rows.len() {
        (a_rows, b_rows, a.registry)
    } else {
        (b_rows, a_rows, b.registry)
    };
    let probe_set: HashSet<Row> = probe_side.into_iter().collect();
    let rows = Box::new(
        stream_side
            .into_iter()
            .filter(move |row| probe_set.contains(row))
            .map(Ok),
    );
    Ok(Physical::new(registry, false, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnDescriptor, ColumnRegistry, LogicalType};
    use crate::value::Value;

    fn physical(values: &[i64]) -> Physical {
        let registry = ColumnRegistry::new(vec![ColumnDescriptor::new("t", "val", LogicalType::Int64)]);
        let rows: Vec<_> = values.iter().map(|v| Ok(Row::new(vec![Value::Int64(*v)]))).collect();
        Physical::new(registry, false, Box::new(rows.into_iter()))
    }

    #[test]
    fn keeps_only_rows_present_on_both_sides() {
        let result = hash_intersect(physical(&[1, 2, 3]), physical(&[2, 3, 4])).unwrap();
        let mut rows: Vec<_> = result
            .rows
            .collect::<Result<Vec<_>>>()
            .unwrap()
            .into_iter()
            .map(|r| r[0].clone())
            .collect();
        rows.sort();
        assert_eq!(rows, vec![Value::Int64(2), Value::Int64(3)]);
    }
}
