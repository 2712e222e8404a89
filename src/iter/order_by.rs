use crate::eval;
use crate::error::Result;
use crate::plan::Physical;
use crate::ra::expression::Expr;
use crate::row::Row;
use std::cmp::Ordering;

/// A single `ORDER BY` key: an expression to sort by and whether it sorts
/// ascending.
#[derive(Clone, Debug)]
pub struct SortKey {
    pub expr: Expr,
    pub ascending: bool,
}

/// Sorts `source` by the tuple of `keys`' values, per key direction. Ties
/// within the key fall back to source order (a stable sort). A full
/// materialize-then-sort is used rather than a heap, since `ORDER BY`
/// output is never consumed partially here.
pub fn order_by(source: Physical, keys: Vec<SortKey>) -> Result<Physical> {
    let registry = source.registry;
    let mut decorated: Vec<(Vec<crate::value::Value>, Row)> = Vec::new();
    for item in source.rows {
        let row = item?;
        let key: Result<Vec<_>> = keys
            .iter()
            .map(|k| eval::eval(&k.expr, &registry, &row))
            .collect();
        decorated.push((key?, row));
    }
    decorated.sort_by(|(a, _), (b, _)| compare_keys(a, b, &keys));
    let rows = Box::new(decorated.into_iter().map(|(_, row)| Ok(row)));
    Ok(Physical::new(registry, false, rows))
}

fn compare_keys(a: &[crate::value::Value], b: &[crate::value::Value], keys: &[SortKey]) -> Ordering {
    for (i, key) in keys.iter().enumerate() {
        let ordering = a[i].cmp(&b[i]);
        let ordering = if key.ascending { ordering } else { ordering.reverse() };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnDescriptor, ColumnRegistry, LogicalType};
    use crate::ra::col;
    use crate::value::Value;

    #[test]
    fn sorts_descending_when_requested() {
        let registry = ColumnRegistry::new(vec![ColumnDescriptor::new("t", "val", LogicalType::Int64)]);
        let rows = vec![1, 3, 2].into_iter().map(|v| Ok(Row::new(vec![Value::Int64(v)])));
        let physical = Physical::new(registry, false, Box::new(rows));
        let result = order_by(
            physical,
            vec![SortKey {
                expr: col("val"),
                ascending: false,
            }],
        )
        .unwrap();
        let values: Vec<_> = result.rows.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(
            values,
            vec![
                Row::new(vec![Value::Int64(3)]),
                Row::new(vec![Value::Int64(2)]),
                Row::new(vec![Value::Int64(1)]),
            ]
        );
    }
}
