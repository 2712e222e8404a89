use crate::column::ColumnRegistry;
use crate::error::Result;
use crate::plan::Physical;
use crate::row::Row;

/// For each row of `left`, iterates every row of `right`; `right` is
/// materialized on first use so it can be replayed once per `left` row.
/// Composite row order is `left`'s columns then `right`'s.
///
/// Sortedness is only preserved in the degenerate case where `right` has
/// at most one row, so the output is just `left`'s order, possibly with a
/// constant tail appended; in any other case a cross product is not
/// generally sorted even when both inputs are.
pub fn cross(left: Physical, right: Physical) -> Result<Physical> {
    let registry = ColumnRegistry::concat(&left.registry, &right.registry);
    let right_rows: Vec<Row> = right.rows.collect::<Result<Vec<_>>>()?;
    let sorted = left.sorted && right_rows.len() <= 1;

    let mut left_rows = left.rows;
    let mut current_left: Option<Row> = None;
    let mut right_idx = 0usize;

    let rows = Box::new(std::iter::from_fn(move || loop {
        if current_left.is_none() {
            match left_rows.next() {
                Some(Ok(row)) => {
                    current_left = Some(row);
                    right_idx = 0;
                }
                Some(Err(err)) => return Some(Err(err)),
                None => return None,
            }
        }
        if right_idx < right_rows.len() {
            let l = current_left.as_ref().unwrap();
            let r = &right_rows[right_idx];
            right_idx += 1;
            return Some(Ok(Row::concat(l, r)));
        }
        current_left = None;
    }));
    Ok(Physical::new(registry, sorted, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnDescriptor, LogicalType};
    use crate::value::Value;

    fn physical(name: &str, values: &[i64]) -> Physical {
        let registry = ColumnRegistry::new(vec![ColumnDescriptor::new(name, "val", LogicalType::Int64)]);
        let rows: Vec<_> = values.iter().map(|v| Ok(Row::new(vec![Value::Int64(*v)]))).collect();
        Physical::new(registry, true, Box::new(rows.into_iter()))
    }

    #[test]
    fn produces_full_cartesian_product() {
        let result = cross(physical("a", &[1, 2]), physical("b", &[10, 20])).unwrap();
        let rows: Vec<_> = result.rows.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0], Row::new(vec![Value::Int64(1), Value::Int64(10)]));
        assert_eq!(rows[3], Row::new(vec![Value::Int64(2), Value::Int64(20)]));
    }

    #[test]
    fn empty_right_side_yields_no_rows() {
        let result = cross(physical("a", &[1, 2]), physical("b", &[])).unwrap();
        assert_eq!(result.rows.count(), 0);
    }
}
