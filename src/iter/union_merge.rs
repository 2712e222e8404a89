use crate::column::ColumnRegistry;
use crate::error::Result;
use crate::errinput;
use crate::plan::Physical;
use crate::row::Row;

/// `Union(a, b)`: both sources sorted; k-way (here: pairwise, left-folded
/// by the caller) merge yielding each distinct row once.
pub fn distinct_sorted_union(left: Physical, right: Physical) -> Result<Physical> {
    let (left, right) = align_registries(left, right)?;
    let registry = left.registry.clone();
    let mut l = left.rows.peekable();
    let mut r = right.rows.peekable();
    let mut last_emitted: Option<Row> = None;

    let rows = Box::new(std::iter::from_fn(move || loop {
        let candidate = match (l.peek(), r.peek()) {
            (Some(Err(_)), _) => return l.next(),
            (_, Some(Err(_))) => return r.next(),
            (Some(Ok(lv)), Some(Ok(rv))) => {
                if lv <= rv {
                    l.next().unwrap().unwrap()
                } else {
                    r.next().unwrap().unwrap()
                }
            }
            (Some(Ok(_)), None) => l.next().unwrap().unwrap(),
            (None, Some(Ok(_))) => r.next().unwrap().unwrap(),
            (None, None) => return None,
        };
        if last_emitted.as_ref() == Some(&candidate) {
            continue;
        }
        last_emitted = Some(candidate.clone());
        return Some(Ok(candidate));
    }));
    Ok(Physical::new(registry, true, rows))
}

/// `Intersection(a, b)` as lowered: sort-merge set intersection over whole
/// rows, both sides sorted ascending.
pub fn sorted_merge_intersect(left: Physical, right: Physical) -> Result<Physical> {
    let (left, right) = align_registries(left, right)?;
    let registry = left.registry.clone();
    let mut l = left.rows.peekable();
    let mut r = right.rows.peekable();

    let rows = Box::new(std::iter::from_fn(move || loop {
        match (l.peek(), r.peek()) {
            (Some(Err(_)), _) => return l.next(),
            (_, Some(Err(_))) => return r.next(),
            (Some(Ok(lv)), Some(Ok(rv))) => {
                if lv < rv {
                    l.next();
                } else if lv > rv {
                    r.next();
                } else {
                    let row = l.next().unwrap().unwrap();
                    r.next();
                    return Some(Ok(row));
                }
            }
            _ => return None,
        }
    }));
    Ok(Physical::new(registry, true, rows))
}

/// If the two sides' registries differ but overlap, projects the wider
/// side down to the narrower's columns; fails if neither contains the
/// other.
fn align_registries(left: Physical, right: Physical) -> Result<(Physical, Physical)> {
    if left.registry.len() == right.registry.len() {
        return Ok((left, right));
    }
    if left.registry.len() < right.registry.len() {
        let narrow = left.registry.clone();
        let right = narrow_to(right, &narrow)?;
        Ok((left, right))
    } else {
        let narrow = right.registry.clone();
        let left = narrow_to(left, &narrow)?;
        Ok((left, right))
    }
}

fn narrow_to(wide: Physical, narrow: &ColumnRegistry) -> Result<Physical> {
    let mut indices = Vec::with_capacity(narrow.len());
    for descriptor in narrow.iter() {
        match wide.registry.resolve(&descriptor.identifier) {
            Ok(idx) => indices.push(idx),
            Err(_) => errinput!(
                "cannot align union/intersection operands: column '{}' has no match on the wider side",
                descriptor.identifier
            ),
        }
    }
    let registry = narrow.clone();
    let sorted = wide.sorted;
    let rows = Box::new(wide.rows.map(move |item| {
        let row = item?;
        Ok(Row::new(indices.iter().map(|&i| row[i].clone()).collect()))
    }));
    Ok(Physical::new(registry, sorted, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnDescriptor, LogicalType};
    use crate::value::Value;

    fn physical(name: &str, values: &[&str]) -> Physical {
        let registry = ColumnRegistry::new(vec![ColumnDescriptor::new(name, "val", LogicalType::Text)]);
        let rows: Vec<_> = values.iter().map(|v| Ok(Row::new(vec![Value::Text(v.to_string())]))).collect();
        Physical::new(registry, true, Box::new(rows.into_iter()))
    }

    #[test]
    fn union_merges_and_dedups_sorted_inputs() {
        let a = physical("a", &["A", "B", "D"]);
        let b = physical("b", &["A", "C"]);
        let rows: Vec<_> = distinct_sorted_union(a, b)
            .unwrap()
            .rows
            .collect::<Result<Vec<_>>>()
            .unwrap()
            .into_iter()
            .map(|r| r[0].to_string())
            .collect();
        assert_eq!(rows, vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn intersection_keeps_only_shared_rows() {
        let a = physical("a", &["A", "B", "C"]);
        let b = physical("b", &["B", "C", "D"]);
        let rows: Vec<_> = sorted_merge_intersect(a, b)
            .unwrap()
            .rows
            .collect::<Result<Vec<_>>>()
            .unwrap()
            .into_iter()
            .map(|r| r[0].to_string())
            .collect();
        assert_eq!(rows, vec!["B", "C"]);
    }
}
