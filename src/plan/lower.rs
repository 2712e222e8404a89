//! Dispatch from an RA `Node` to a `Physical` pipeline.

use super::tee::Tee;
use crate::column::{ColumnDescriptor, ColumnRegistry, LogicalType};
use crate::config::EngineConfig;
use crate::errinput;
use crate::error::{Error, Result};
use crate::iter;
use crate::iter::order_by::SortKey;
use crate::plan::Physical;
use crate::provider::{TableCatalog, TableProvider};
use crate::ra::expression::Expr;
use crate::ra::{Node, Theta};
use crate::row::Rows;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

enum JoinKind {
    Inner,
    Left,
    Right,
}

struct Lowerer<'a> {
    catalog: &'a TableCatalog,
    occurrences: HashMap<String, usize>,
    /// Shared Tees keyed by table id: `(registry, provider-declared
    /// sortedness, the Tee itself)`. Populated lazily the first time a
    /// multiply-referenced table is lowered.
    tees: RefCell<HashMap<String, (ColumnRegistry, bool, Rc<Tee>)>>,
    /// Passed straight through to every `Tee` this lowering constructs; see
    /// `EngineConfig::tee_buffer_rows`.
    tee_capacity: usize,
}

/// Lowers `node` into an executable pipeline, resolving table references
/// against `catalog`. `config` controls Tee buffering (`tee_buffer_rows`);
/// the rewriter, not this function, is what `optimization_level` controls.
pub fn lower(node: &Node, catalog: &TableCatalog, config: &EngineConfig) -> Result<Physical> {
    let occurrences = count_table_occurrences(node);
    let lowerer = Lowerer {
        catalog,
        occurrences,
        tees: RefCell::new(HashMap::new()),
        tee_capacity: config.tee_buffer_rows,
    };
    lower_node(node, &lowerer)
}

fn count_table_occurrences(node: &Node) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    walk_count(node, &mut counts);
    counts
}

fn walk_count(node: &Node, counts: &mut HashMap<String, usize>) {
    match node {
        Node::Table(id) => *counts.entry(id.clone()).or_insert(0) += 1,
        // The EmptySet witness is never itself scanned (it only exists for
        // schema derivation), so it must not count towards Tee fan-out.
        Node::EmptySet(_) | Node::OneRowSet | Node::UniverseSet => {}
        Node::Select(rel, _)
        | Node::Project(rel, _)
        | Node::Distinct(rel)
        | Node::GroupBy(rel, _)
        | Node::Limit(rel, _)
        | Node::Offset(rel, _) => walk_count(rel, counts),
        Node::Cross(rels) | Node::Union(rels) | Node::Intersection(rels) => {
            for rel in rels {
                walk_count(rel, counts);
            }
        }
        Node::Join(a, b) | Node::LeftJoin(a, b) | Node::RightJoin(a, b) => {
            walk_count(&a.rel, counts);
            walk_count(&b.rel, counts);
        }
    }
}

fn lower_node(node: &Node, lowerer: &Lowerer) -> Result<Physical> {
    match node {
        Node::Table(id) => lower_table(id, lowerer),
        Node::EmptySet(witness) => {
            let registry = witness.schema(lowerer.catalog)?;
            Ok(iter::values::empty_set(registry))
        }
        Node::OneRowSet => Ok(iter::values::one_row_set()),
        Node::UniverseSet => {
            errinput!("UniverseSet has no physical realization; the rewriter should have eliminated it (rule 1)")
        }
        Node::Select(rel, pred) => {
            let input = lower_node(rel, lowerer)?;
            Ok(iter::filter::filter(input, pred.clone()))
        }
        Node::Project(rel, cols) => {
            let input = lower_node(rel, lowerer)?;
            iter::project::project(input, cols.clone())
        }
        Node::Cross(rels) => lower_cross(rels, lowerer),
        Node::Join(a, b) => lower_join(a, b, lowerer, JoinKind::Inner),
        Node::LeftJoin(a, b) => lower_join(a, b, lowerer, JoinKind::Left),
        Node::RightJoin(a, b) => lower_join(a, b, lowerer, JoinKind::Right),
        Node::Union(rels) => fold_binary(rels, lowerer, iter::union_merge::distinct_sorted_union),
        Node::Intersection(rels) => fold_binary(rels, lowerer, iter::union_merge::sorted_merge_intersect),
        Node::Distinct(rel) => {
            let input = ensure_sorted(lower_node(rel, lowerer)?)?;
            iter::distinct::distinct(input)
        }
        Node::GroupBy(rel, cols) => {
            let input = lower_node(rel, lowerer)?;
            iter::group_by::group_by(input, cols.clone())
        }
        Node::Limit(rel, n) => Ok(iter::limit_offset::limit(lower_node(rel, lowerer)?, *n)),
        Node::Offset(rel, n) => Ok(iter::limit_offset::offset(lower_node(rel, lowerer)?, *n)),
    }
}

fn lower_cross(rels: &[Node], lowerer: &Lowerer) -> Result<Physical> {
    let mut rels = rels.iter();
    let first = rels
        .next()
        .ok_or_else(|| Error::InvalidInput("Cross requires at least one operand".into()))?;
    let mut acc = lower_node(first, lowerer)?;
    for rel in rels {
        let next = lower_node(rel, lowerer)?;
        acc = iter::cross::cross(acc, next)?;
    }
    Ok(acc)
}

fn fold_binary(
    rels: &[Node],
    lowerer: &Lowerer,
    op: impl Fn(Physical, Physical) -> Result<Physical>,
) -> Result<Physical> {
    let mut rels = rels.iter();
    let first = rels
        .next()
        .ok_or_else(|| Error::InvalidInput("Union/Intersection requires at least one operand".into()))?;
    let mut acc = ensure_sorted(lower_node(first, lowerer)?)?;
    for rel in rels {
        let next = ensure_sorted(lower_node(rel, lowerer)?)?;
        acc = op(acc, next)?;
    }
    Ok(acc)
}

fn ensure_sorted(physical: Physical) -> Result<Physical> {
    if physical.sorted {
        Ok(physical)
    } else {
        iter::sort::sort(physical)
    }
}

/// Lowers a Join's side, then guarantees it is sorted ascending on its
/// join column specifically. A source already declared whole-row-sorted
/// (`physical.sorted`) only guarantees this for free when the join column
/// is the leading column; otherwise an explicit `OrderBy` is inserted on
/// that join column.
fn sorted_on_key(physical: Physical, col: &Expr) -> Result<Physical> {
    let column = col
        .column()
        .ok_or(Error::JoinHasNoOnClause)?;
    let index = physical.registry.resolve(column)?;
    if physical.sorted && index == 0 {
        return Ok(physical);
    }
    let key = SortKey {
        expr: Expr::Column(column.clone()),
        ascending: true,
    };
    let mut ordered = iter::order_by::order_by(physical, vec![key])?;
    ordered.sorted = true;
    Ok(ordered)
}

fn lower_join(a: &Theta, b: &Theta, lowerer: &Lowerer, kind: JoinKind) -> Result<Physical> {
    let left = lower_node(&a.rel, lowerer)?;
    let right = lower_node(&b.rel, lowerer)?;
    let left = sorted_on_key(left, &a.key)?;
    let right = sorted_on_key(right, &b.key)?;
    let left_idx = left.registry.resolve(a.key.column().ok_or(Error::JoinHasNoOnClause)?)?;
    let right_idx = right.registry.resolve(b.key.column().ok_or(Error::JoinHasNoOnClause)?)?;
    Ok(match kind {
        JoinKind::Inner => iter::merge_join::merge_inner_join(left, right, left_idx, right_idx),
        JoinKind::Left => iter::merge_join::merge_left_join(left, right, left_idx, right_idx),
        JoinKind::Right => iter::merge_join::merge_right_join(left, right, left_idx, right_idx),
    })
}

fn lower_table(id: &str, lowerer: &Lowerer) -> Result<Physical> {
    let occurrences = *lowerer.occurrences.get(id).unwrap_or(&1);
    if occurrences <= 1 {
        let provider = lowerer.catalog.get(id)?;
        let sorted = provider.sorted();
        let (registry, rows) = resolve_schema(id, &provider)?;
        return Ok(Physical::new(registry, sorted, rows));
    }

    // Multiply-referenced (self-join): fan out a single scan via a Tee so
    // the provider is only driven once.
    if let Some((registry, sorted, tee)) = lowerer.tees.borrow().get(id) {
        return Ok(Physical::new(registry.clone(), *sorted, tee.tap()));
    }
    let provider = lowerer.catalog.get(id)?;
    let sorted = provider.sorted();
    let (registry, rows) = resolve_schema(id, &provider)?;
    let tee = Tee::new(rows, lowerer.tee_capacity);
    let tap = tee.tap();
    lowerer
        .tees
        .borrow_mut()
        .insert(id.to_string(), (registry.clone(), sorted, tee));
    Ok(Physical::new(registry, sorted, tap))
}

/// Resolves a provider's schema, falling back to first-row inference when
/// `column_metadata()` returns `None`: a row-inspection step infers columns
/// from the first row. `ColumnMetadataUndefined` only surfaces when even
/// that inference is impossible (the provider yields zero rows).
fn resolve_schema(id: &str, provider: &Arc<dyn TableProvider>) -> Result<(ColumnRegistry, Rows)> {
    if let Some(registry) = provider.column_metadata() {
        return Ok((registry, provider.produce()));
    }
    let mut rows = provider.produce();
    match rows.next() {
        None => Err(Error::ColumnMetadataUndefined(id.to_string())),
        Some(Err(err)) => Err(err),
        Some(Ok(first)) => {
            let registry = ColumnRegistry::new(
                (0..first.len())
                    .map(|i| ColumnDescriptor::anonymous(format!("column{i}"), LogicalType::Unknown))
                    .collect(),
            );
            let rewound: Rows = Box::new(std::iter::once(Ok(first)).chain(rows));
            Ok((registry, rewound))
        }
    }
}
