use crate::plan::Physical;

/// Discards the first `n` rows of `source`.
pub fn offset(source: Physical, n: i64) -> Physical {
    let n = n.max(0) as usize;
    let rows = Box::new(source.rows.skip(n));
    Physical::new(source.registry, source.sorted, rows)
}

/// Emits at most `n` rows of `source` then stops.
pub fn limit(source: Physical, n: i64) -> Physical {
    let n = n.max(0) as usize;
    let rows = Box::new(source.rows.take(n));
    Physical::new(source.registry, source.sorted, rows)
}
