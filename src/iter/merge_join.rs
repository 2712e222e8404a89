use crate::column::ColumnRegistry;
use crate::error::Result;
use crate::plan::Physical;
use crate::row::Row;
use crate::value::Value;
use std::collections::VecDeque;

/// Sort-merge inner join. Both sources must already be sorted ascending on
/// their respective join columns (the lowerer guarantees this by inserting
/// an `OrderBy` ahead of any side that isn't). Rows whose join key is Null
/// never match.
///
/// Produces the full Cartesian product of rows sharing an equal key on
/// both sides. See DESIGN.md for why this crate chose that over a
/// narrower "pairs plus singletons" pattern for two-sided duplicates.
pub fn merge_inner_join(left: Physical, right: Physical, left_idx: usize, right_idx: usize) -> Physical {
    let out_registry = ColumnRegistry::concat(&left.registry, &right.registry);
    let mut left_iter = left.rows.peekable();
    let mut right_iter = right.rows.peekable();
    let mut pending: VecDeque<Result<Row>> = VecDeque::new();

    let rows = Box::new(std::iter::from_fn(move || loop {
        if let Some(item) = pending.pop_front() {
            return Some(item);
        }
        loop {
            let left_key = match left_iter.peek() {
                Some(Ok(row)) => row[left_idx].clone(),
                Some(Err(_)) => return left_iter.next(),
                None => return None,
            };
            if left_key.is_unjoinable() {
                left_iter.next();
                continue;
            }
            let right_key = match right_iter.peek() {
                Some(Ok(row)) => row[right_idx].clone(),
                Some(Err(_)) => return right_iter.next(),
                None => return None,
            };
            if right_key.is_unjoinable() {
                right_iter.next();
                continue;
            }
            match left_key.cmp(&right_key) {
                std::cmp::Ordering::Less => {
                    left_iter.next();
                }
                std::cmp::Ordering::Greater => {
                    right_iter.next();
                }
                std::cmp::Ordering::Equal => {
                    let group_a = collect_run(&mut left_iter, left_idx, &left_key);
                    let group_b = collect_run(&mut right_iter, right_idx, &right_key);
                    for a in &group_a {
                        for b in &group_b {
                            pending.push_back(Ok(Row::concat(a, b)));
                        }
                    }
                    break;
                }
            }
        }
    }));
    Physical::new(out_registry, true, rows)
}

/// As `merge_inner_join`, but every row of `left` is emitted at least once:
/// when the driving (`left`) row has no match, it is padded with Nulls for
/// the entirety of `right`'s width.
pub fn merge_left_join(left: Physical, right: Physical, left_idx: usize, right_idx: usize) -> Physical {
    let right_width = right.registry.len();
    let out_registry = ColumnRegistry::concat(&left.registry, &right.registry);
    let mut left_iter = left.rows.peekable();
    let mut right_iter = right.rows.peekable();
    let mut pending: VecDeque<Result<Row>> = VecDeque::new();

    let rows = Box::new(std::iter::from_fn(move || loop {
        if let Some(item) = pending.pop_front() {
            return Some(item);
        }
        let left_key = match left_iter.peek() {
            Some(Ok(row)) => row[left_idx].clone(),
            Some(Err(_)) => return left_iter.next(),
            None => return None,
        };
        if left_key.is_unjoinable() {
            let row = left_iter.next().unwrap().unwrap();
            return Some(Ok(pad(&row, right_width)));
        }
        loop {
            match right_iter.peek() {
                Some(Ok(row)) => {
                    let key = row[right_idx].clone();
                    if key.is_unjoinable() || key < left_key {
                        right_iter.next();
                        continue;
                    }
                    break;
                }
                Some(Err(_)) => return right_iter.next(),
                None => break,
            }
        }
        let matched = matches!(right_iter.peek(), Some(Ok(row)) if row[right_idx] == left_key);
        if matched {
            let group_a = collect_run(&mut left_iter, left_idx, &left_key);
            let group_b = collect_run(&mut right_iter, right_idx, &left_key);
            for a in &group_a {
                for b in &group_b {
                    pending.push_back(Ok(Row::concat(a, b)));
                }
            }
        } else {
            let row = left_iter.next().unwrap().unwrap();
            pending.push_back(Ok(pad(&row, right_width)));
        }
    }));
    Physical::new(out_registry, true, rows)
}

/// As `merge_left_join` with the driving side reversed: every row of
/// `right` is emitted, padded on the left when unmatched. Column order in
/// the output remains left-then-right.
pub fn merge_right_join(left: Physical, right: Physical, left_idx: usize, right_idx: usize) -> Physical {
    let left_width = left.registry.len();
    let out_registry = ColumnRegistry::concat(&left.registry, &right.registry);
    let mut left_iter = left.rows.peekable();
    let mut right_iter = right.rows.peekable();
    let mut pending: VecDeque<Result<Row>> = VecDeque::new();

    let rows = Box::new(std::iter::from_fn(move || loop {
        if let Some(item) = pending.pop_front() {
            return Some(item);
        }
        let right_key = match right_iter.peek() {
            Some(Ok(row)) => row[right_idx].clone(),
            Some(Err(_)) => return right_iter.next(),
            None => return None,
        };
        if right_key.is_unjoinable() {
            let row = right_iter.next().unwrap().unwrap();
            return Some(Ok(pad_left(&row, left_width)));
        }
        loop {
            match left_iter.peek() {
                Some(Ok(row)) => {
                    let key = row[left_idx].clone();
                    if key.is_unjoinable() || key < right_key {
                        left_iter.next();
                        continue;
                    }
                    break;
                }
                Some(Err(_)) => return left_iter.next(),
                None => break,
            }
        }
        let matched = matches!(left_iter.peek(), Some(Ok(row)) if row[left_idx] == right_key);
        if matched {
            let group_a = collect_run(&mut left_iter, left_idx, &right_key);
            let group_b = collect_run(&mut right_iter, right_idx, &right_key);
            for a in &group_a {
                for b in &group_b {
                    pending.push_back(Ok(Row::concat(a, b)));
                }
            }
        } else {
            let row = right_iter.next().unwrap().unwrap();
            pending.push_back(Ok(pad_left(&row, left_width)));
        }
    }));
    Physical::new(out_registry, true, rows)
}

type PeekableRows = std::iter::Peekable<Box<dyn Iterator<Item = Result<Row>>>>;

/// Pulls every immediately-following row whose join column equals `key`,
/// including the one already at the front of the iterator.
fn collect_run(iter: &mut PeekableRows, idx: usize, key: &Value) -> Vec<Row> {
    let mut group = Vec::new();
    while let Some(Ok(row)) = iter.peek() {
        if &row[idx] != key {
            break;
        }
        group.push(iter.next().unwrap().unwrap());
    }
    group
}

fn pad(row: &Row, extra: usize) -> Row {
    let mut values = row.to_vec();
    values.extend(std::iter::repeat(Value::Null).take(extra));
    Row::new(values)
}

fn pad_left(row: &Row, extra: usize) -> Row {
    let mut values: Vec<Value> = std::iter::repeat(Value::Null).take(extra).collect();
    values.extend(row.iter().cloned());
    Row::new(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnDescriptor, LogicalType};

    fn physical(name: &str, values: &[i64]) -> Physical {
        let registry = ColumnRegistry::new(vec![ColumnDescriptor::new(name, "val", LogicalType::Int64)]);
        let rows: Vec<_> = values.iter().map(|v| Ok(Row::new(vec![Value::Int64(*v)]))).collect();
        Physical::new(registry, true, Box::new(rows.into_iter()))
    }

    #[test]
    fn inner_join_matches_equal_keys() {
        let result = merge_inner_join(physical("a", &[1, 2, 3, 4, 5]), physical("b", &(1..=10).collect::<Vec<_>>()), 0, 0);
        let rows: Vec<_> = result.rows.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0], Row::new(vec![Value::Int64(1), Value::Int64(1)]));
        assert_eq!(rows[4], Row::new(vec![Value::Int64(5), Value::Int64(5)]));
    }

    #[test]
    fn inner_join_skips_null_keys() {
        let a = Physical::new(
            ColumnRegistry::new(vec![ColumnDescriptor::new("a", "val", LogicalType::Int64)]),
            true,
            Box::new(vec![Ok(Row::new(vec![Value::Null])), Ok(Row::new(vec![Value::Int64(1)]))].into_iter()),
        );
        let b = physical("b", &[1]);
        let rows: Vec<_> = merge_inner_join(a, b, 0, 0).rows.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(rows, vec![Row::new(vec![Value::Int64(1), Value::Int64(1)])]);
    }

    #[test]
    fn inner_join_duplicate_keys_on_both_sides_are_full_cartesian() {
        let a = physical("a", &[1, 1]);
        let b = physical("b", &[1, 1]);
        let rows: Vec<_> = merge_inner_join(a, b, 0, 0).rows.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(rows.len(), 4);
    }

    #[test]
    fn right_join_pads_unmatched_left_side() {
        let a = physical("a", &[1, 2, 3, 4, 5]);
        let b = physical("b", &(1..=10).collect::<Vec<_>>());
        let rows: Vec<_> = merge_right_join(a, b, 0, 0).rows.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[0], Row::new(vec![Value::Int64(1), Value::Int64(1)]));
        assert_eq!(rows[5], Row::new(vec![Value::Null, Value::Int64(6)]));
        assert_eq!(rows[9], Row::new(vec![Value::Null, Value::Int64(10)]));
    }

    #[test]
    fn left_join_pads_unmatched_right_side() {
        let a = physical("a", &(1..=10).collect::<Vec<_>>());
        let b = physical("b", &[1, 2, 3]);
        let rows: Vec<_> = merge_left_join(a, b, 0, 0).rows.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[3], Row::new(vec![Value::Int64(4), Value::Null]));
    }
}
