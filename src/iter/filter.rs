use crate::eval;
use crate::plan::Physical;
use crate::ra::Expr;

/// Yields rows of `source` for which `predicate` holds. Preserves
/// sortedness and the registry unchanged.
pub fn filter(source: Physical, predicate: Expr) -> Physical {
    let registry = source.registry;
    let eval_registry = registry.clone();
    let rows = Box::new(source.rows.filter_map(move |item| match item {
        Ok(row) => match eval::eval_bool(&predicate, &eval_registry, &row) {
            Ok(true) => Some(Ok(row)),
            Ok(false) => None,
            Err(err) => Some(Err(err)),
        },
        Err(err) => Some(Err(err)),
    }));
    Physical::new(registry, source.sorted, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnDescriptor, ColumnRegistry, LogicalType};
    use crate::ra::col;
    use crate::row::Row;
    use crate::value::Value;

    fn physical(values: &[i64]) -> Physical {
        let registry = ColumnRegistry::new(vec![ColumnDescriptor::new("t", "val", LogicalType::Int64)]);
        let rows: Vec<_> = values.iter().map(|v| Ok(Row::new(vec![Value::Int64(*v)]))).collect();
        Physical::new(registry, true, Box::new(rows.into_iter()))
    }

    #[test]
    fn keeps_rows_matching_predicate() {
        let predicate = crate::ra::expression::Expr::Gt(
            Box::new(col("val")),
            Box::new(crate::ra::expression::Expr::Literal(Value::Int64(3))),
        );
        let result = filter(physical(&[1, 2, 3, 4, 5]), predicate);
        let rows: Vec<_> = result.rows.collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(rows, vec![Row::new(vec![Value::Int64(4)]), Row::new(vec![Value::Int64(5)])]);
    }
}
