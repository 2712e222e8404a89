use crate::error::Result;
use crate::plan::Physical;
use crate::row::Row;

/// Gathers every row and sorts by the total order over `Value` applied
/// lexicographically across the row (Null < Bool < Int64 < Float64 <
/// Text, then natural order within a kind).
pub fn sort(source: Physical) -> Result<Physical> {
    let mut rows: Vec<Row> = source.rows.collect::<Result<Vec<_>>>()?;
    rows.sort();
    Ok(Physical::new(source.registry, true, Box::new(rows.into_iter().map(Ok))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnDescriptor, ColumnRegistry, LogicalType};
    use crate::value::Value;

    #[test]
    fn sorts_rows_into_ascending_order() {
        let registry = ColumnRegistry::new(vec![ColumnDescriptor::new("t", "val", LogicalType::Int64)]);
        let rows = vec![3, 1, 2].into_iter().map(|v| Ok(Row::new(vec![Value::Int64(v)])));
        let physical = Physical::new(registry, false, Box::new(rows));
        let sorted = sort(physical).unwrap();
        assert!(sorted.sorted);
        let values: Vec<_> = sorted.rows.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(
            values,
            vec![
                Row::new(vec![Value::Int64(1)]),
                Row::new(vec![Value::Int64(2)]),
                Row::new(vec![Value::Int64(3)]),
            ]
        );
    }
}
