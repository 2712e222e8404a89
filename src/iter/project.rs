use crate::eval;
use crate::error::Result;
use crate::plan::Physical;
use crate::ra::expression::Expr;
use crate::ra::project_schema;
use crate::row::Row;

/// Evaluates `exprs` against every row of `source` and narrows the registry
/// to the projected identifiers. Function evaluation and column selection
/// happen as a single pass here, since every projected value (column
/// reference or otherwise) is produced the same way.
pub fn project(source: Physical, exprs: Vec<Expr>) -> Result<Physical> {
    let registry = project_schema(&source.registry, &exprs)?;
    let input_registry = source.registry;
    let sorted = source.sorted && is_identity_prefix(&exprs, &input_registry);
    let rows = Box::new(source.rows.map(move |item| {
        let row = item?;
        let values: Result<Vec<_>> = exprs
            .iter()
            .map(|e| eval::eval(e, &input_registry, &row))
            .collect();
        Ok(Row::new(values?))
    }));
    Ok(Physical::new(registry, sorted, rows))
}

/// A projection preserves sortedness only when it is literally the
/// identity mapping over the source's leading columns (dropping trailing
/// columns keeps ascending order; reordering or computing new values does
/// not).
fn is_identity_prefix(exprs: &[Expr], registry: &crate::column::ColumnRegistry) -> bool {
    exprs.iter().enumerate().all(|(i, e)| match e {
        Expr::Column(c) => registry.resolve(c).map(|idx| idx == i).unwrap_or(false),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnDescriptor, ColumnRegistry, LogicalType};
    use crate::ra::col;
    use crate::value::Value;

    #[test]
    fn projects_selected_columns_in_order() {
        let registry = ColumnRegistry::new(vec![
            ColumnDescriptor::new("t", "a", LogicalType::Int64),
            ColumnDescriptor::new("t", "b", LogicalType::Int64),
        ]);
        let rows = vec![Ok(Row::new(vec![Value::Int64(1), Value::Int64(2)]))];
        let source = Physical::new(registry, true, Box::new(rows.into_iter()));
        let result = project(source, vec![col("b")]).unwrap();
        assert_eq!(result.registry.len(), 1);
        let rows: Vec<_> = result.rows.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(rows, vec![Row::new(vec![Value::Int64(2)])]);
    }
}
