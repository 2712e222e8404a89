use crate::errinput;
use crate::error::Result;
use crate::plan::Physical;
use crate::row::Row;

/// Requires a sorted source. Emits a row only if it differs from the
/// previously emitted row.
pub fn distinct(source: Physical) -> Result<Physical> {
    if !source.sorted {
        errinput!("Distinct requires a sorted source");
    }
    let mut last: Option<Row> = None;
    let rows = Box::new(source.rows.filter_map(move |item| match item {
        Ok(row) => {
            if last.as_ref() == Some(&row) {
                None
            } else {
                last = Some(row.clone());
                Some(Ok(row))
            }
        }
        Err(err) => Some(Err(err)),
    }));
    Ok(Physical::new(source.registry, true, rows))
}
