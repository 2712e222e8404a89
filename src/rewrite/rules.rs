//! The rewrite rule library, numbered per the canonical list these were
//! drawn from. Rule 9 (`Intersection(T, a, s…)`) and rule 19
//! (`Cross(a,a,s…) -> Cross(a,s…)`) are intentionally not implemented; see
//! DESIGN.md.

use crate::column::ColumnRef;
use crate::ra::expression::Expr;
use crate::ra::{Node, Theta};
use crate::value::Value;
use std::collections::HashSet;

/// One bottom-up traversal of the tree: every expression is offered to
/// `rewrite_expr`, then every node is offered to `rewrite_node`, both
/// innermost-first. Equivalent to "walk the tree, attempt each rule on
/// every node" for one pass; the caller loops this to fixpoint.
pub(super) fn apply_pass(node: Node, changed: &mut bool) -> Node {
    let node = node.transform_expressions(&mut |e| rewrite_expr(e, changed));
    node.transform(&mut |n| rewrite_node(n, changed))
}

fn rewrite_node(node: Node, changed: &mut bool) -> Node {
    match node {
        Node::Cross(rels) => rewrite_cross(rels, changed),
        Node::Select(rel, pred) => rewrite_select(rel, pred, changed),
        Node::Union(rels) => rewrite_union(rels, changed),
        Node::Intersection(rels) => rewrite_intersection(rels, changed),
        other => other,
    }
}

fn rewrite_expr(expr: Expr, changed: &mut bool) -> Expr {
    match expr {
        Expr::Equal(l, r) => rewrite_equal(l, r, changed),
        Expr::Gt(l, r) => rewrite_gt(l, r, changed),
        Expr::Not(inner) => rewrite_not(inner, changed),
        Expr::And(args) => rewrite_and(args, changed),
        Expr::Or(args) => rewrite_or(args, changed),
        Expr::In(x, list) => rewrite_in(x, list, changed),
        other => other,
    }
}

// --- Rule 1: universe identity under cross ---------------------------------

fn rewrite_cross(rels: Vec<Node>, changed: &mut bool) -> Node {
    let before = rels.len();
    let mut rels: Vec<Node> = rels.into_iter().filter(|r| *r != Node::UniverseSet).collect();
    if rels.len() != before {
        *changed = true;
    }
    // Rule 19 (self-cross dedup) deliberately omitted: relation instances
    // carry no provenance tag here, so `Cross(a, a)` cannot be
    // distinguished from a genuine self-join.
    match rels.len() {
        0 => {
            *changed = true;
            Node::UniverseSet
        }
        1 => {
            *changed = true;
            rels.pop().unwrap()
        }
        _ => Node::Cross(rels),
    }
}

// --- Select-rooted rules: 2, 3, 17, 18, 22, 25 ------------------------------

fn rewrite_select(rel: Box<Node>, pred: Expr, changed: &mut bool) -> Node {
    // Rule 3: σ(R, T) → R
    if pred.is_true() {
        *changed = true;
        return *rel;
    }
    // Rule 22: F → ⊥ (a relation selected by a literal false predicate
    // produces no rows). `rel` is kept as the resulting EmptySet's schema
    // witness so a wrapping Project/Distinct still reports the right
    // columns over zero rows.
    if pred.is_false() {
        *changed = true;
        return Node::EmptySet(rel);
    }
    // Rule 2: σ(R, ∧()) → R (empty predicate)
    if matches!(&pred, Expr::And(args) if args.is_empty()) {
        *changed = true;
        return *rel;
    }

    if let Node::Cross(rels) = rel.as_ref() {
        // Rules 17 + 18: equi-join introduction, and its multi-way
        // extension for free — each firing peels one equi-join out of the
        // cross and the fixpoint loop keeps folding until none remain.
        if let Some((left_idx, right_idx, left_key, right_key, remaining_pred)) =
            find_equijoin(rels, &pred)
        {
            *changed = true;
            let join = Node::Join(
                Theta::new(rels[left_idx].clone(), left_key),
                Theta::new(rels[right_idx].clone(), right_key),
            );
            let mut remaining: Vec<Node> = rels
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != left_idx && *i != right_idx)
                .map(|(_, n)| n.clone())
                .collect();
            remaining.push(join);
            let new_rel = if remaining.len() == 1 {
                remaining.pop().unwrap()
            } else {
                Node::Cross(remaining)
            };
            return Node::select(new_rel, remaining_pred);
        }

        // Rule 25: selection push-down past cross, generalized to n-ary
        // cross (the binary case is one instance of this).
        if let Some((idx, pushed, remaining_pred)) = find_pushdown(rels, &pred) {
            *changed = true;
            let mut rels = rels.clone();
            rels[idx] = Node::select(rels[idx].clone(), pushed);
            let new_rel = Node::Cross(rels);
            return Node::select(new_rel, remaining_pred);
        }
    }

    Node::Select(rel, pred)
}

fn primary_table_name(node: &Node) -> Option<&str> {
    match node {
        Node::Table(id) => Some(id),
        Node::Select(rel, _)
        | Node::Project(rel, _)
        | Node::Distinct(rel)
        | Node::Limit(rel, _)
        | Node::Offset(rel, _) => primary_table_name(rel),
        _ => None,
    }
}

fn conjuncts_of(pred: &Expr) -> Vec<Expr> {
    match pred {
        Expr::And(args) => args.clone(),
        other => vec![other.clone()],
    }
}

fn rebuild_and(mut remaining: Vec<Expr>) -> Expr {
    match remaining.len() {
        0 => Expr::And(Vec::new()),
        1 => remaining.pop().unwrap(),
        _ => Expr::And(remaining),
    }
}

fn find_equijoin(rels: &[Node], pred: &Expr) -> Option<(usize, usize, Expr, Expr, Expr)> {
    let conjuncts = conjuncts_of(pred);
    for (k, conjunct) in conjuncts.iter().enumerate() {
        let Expr::Equal(l, r) = conjunct else { continue };
        let (Expr::Column(lc), Expr::Column(rc)) = (l.as_ref(), r.as_ref()) else {
            continue;
        };
        let (Some(lt), Some(rt)) = (&lc.table, &rc.table) else {
            continue;
        };
        let left_idx = rels.iter().position(|n| primary_table_name(n) == Some(lt.as_str()));
        let right_idx = rels.iter().position(|n| primary_table_name(n) == Some(rt.as_str()));
        if let (Some(li), Some(ri)) = (left_idx, right_idx) {
            if li != ri {
                let mut remaining = conjuncts.clone();
                remaining.remove(k);
                return Some((li, ri, (**l).clone(), (**r).clone(), rebuild_and(remaining)));
            }
        }
    }
    None
}

fn collect_columns<'a>(expr: &'a Expr, out: &mut Vec<&'a ColumnRef>) {
    match expr {
        Expr::Column(c) => out.push(c),
        Expr::Literal(_) => {}
        Expr::Function(_, args) | Expr::And(args) | Expr::Or(args) | Expr::List(args) => {
            for a in args {
                collect_columns(a, out);
            }
        }
        Expr::Not(a) => collect_columns(a, out),
        Expr::Equal(a, b)
        | Expr::NotEqual(a, b)
        | Expr::Lt(a, b)
        | Expr::Le(a, b)
        | Expr::Gt(a, b)
        | Expr::Ge(a, b)
        | Expr::Like(a, b)
        | Expr::In(a, b) => {
            collect_columns(a, out);
            collect_columns(b, out);
        }
    }
}

/// Finds a conjunct that references exactly one relation in `rels` (by
/// qualified column table name) and can therefore be pushed down into that
/// relation's own `Select`.
fn find_pushdown(rels: &[Node], pred: &Expr) -> Option<(usize, Expr, Expr)> {
    let conjuncts = conjuncts_of(pred);
    for (k, conjunct) in conjuncts.iter().enumerate() {
        let mut cols = Vec::new();
        collect_columns(conjunct, &mut cols);
        if cols.is_empty() {
            continue;
        }
        let tables: HashSet<&str> = cols.iter().filter_map(|c| c.table.as_deref()).collect();
        if tables.len() != 1 {
            continue;
        }
        let table = *tables.iter().next().unwrap();
        if let Some(idx) = rels.iter().position(|n| primary_table_name(n) == Some(table)) {
            let mut remaining = conjuncts.clone();
            let pushed = remaining.remove(k);
            return Some((idx, pushed, rebuild_and(remaining)));
        }
    }
    None
}

// --- Union / Intersection rules: 10, 11, 12, 13, 14, 15, 16, 23, 24 --------

fn rewrite_union(rels: Vec<Node>, changed: &mut bool) -> Node {
    let before = rels.len();
    // Rule 23: Union(⊥, p…) → Union(p…). Keep the first dropped EmptySet
    // around as a schema witness in case every operand turns out empty.
    let mut empty_witness: Option<Node> = None;
    let mut rels: Vec<Node> = rels
        .into_iter()
        .filter(|r| {
            if matches!(r, Node::EmptySet(_)) {
                empty_witness.get_or_insert_with(|| r.clone());
                false
            } else {
                true
            }
        })
        .collect();
    if rels.len() != before {
        *changed = true;
    }
    // Rule 10: Union(a, σ(a, _), s…) → Union(a, s…)
    remove_subsumed_selects(&mut rels, changed);
    // Rule 13: Union(σ(a,b), σ(a,b), s…) → Union(σ(a,b), s…)
    dedup_preserve_first(&mut rels, changed);
    // Rule 15: Union(σ(a,b), σ(a,c)) → σ(a, ∨(b,c)) — applies only when
    // exactly two operands remain, both selections over the same base.
    if rels.len() == 2 {
        if let (Node::Select(a1, b), Node::Select(a2, c)) = (&rels[0], &rels[1]) {
            if a1 == a2 {
                *changed = true;
                return Node::select((**a1).clone(), Expr::Or(vec![b.clone(), c.clone()]));
            }
        }
    }
    match rels.len() {
        0 => empty_witness.unwrap_or_else(|| Node::EmptySet(Box::new(Node::UniverseSet))),
        1 => {
            *changed = true;
            rels.pop().unwrap()
        }
        _ => Node::Union(rels),
    }
}

fn rewrite_intersection(rels: Vec<Node>, changed: &mut bool) -> Node {
    // Rule 24: Intersection(⊥, …) → ⊥. Return the empty operand itself
    // (rather than a fresh schema-less one) so its witnessed schema
    // survives the collapse.
    if let Some(empty) = rels.iter().find(|r| matches!(r, Node::EmptySet(_))) {
        *changed = true;
        return empty.clone();
    }
    // Rule 9 (`Intersection(T, a, s…) → Intersection(a, s…)`) is omitted:
    // it treats a bare boolean literal as a relational operand, which has
    // no representation once predicates and relations are separate types.
    let mut rels = rels;
    // Rule 11: Intersection(a, σ(a,p), s…) → Intersection(σ(a,p), s…)
    remove_base_when_select_present(&mut rels, changed);
    // Rules 12 & 14: exact-duplicate operand removal.
    dedup_preserve_first(&mut rels, changed);
    // Rule 16: Intersection(σ(X,∧(a)), σ(X,b), s…) → Intersection(σ(X,
    // ∧(a,b)), s…) where X is itself a Cross.
    merge_selects_over_same_cross(&mut rels, changed);
    match rels.len() {
        0 => Node::UniverseSet,
        1 => {
            *changed = true;
            rels.pop().unwrap()
        }
        _ => Node::Intersection(rels),
    }
}

fn remove_subsumed_selects(rels: &mut Vec<Node>, changed: &mut bool) {
    let bases: Vec<Node> = rels
        .iter()
        .filter(|r| !matches!(r, Node::Select(_, _)))
        .cloned()
        .collect();
    let before = rels.len();
    rels.retain(|r| match r {
        Node::Select(base, _) => !bases.contains(base),
        _ => true,
    });
    if rels.len() != before {
        *changed = true;
    }
}

fn remove_base_when_select_present(rels: &mut Vec<Node>, changed: &mut bool) {
    let selected_bases: Vec<Node> = rels
        .iter()
        .filter_map(|r| match r {
            Node::Select(base, _) => Some((**base).clone()),
            _ => None,
        })
        .collect();
    let before = rels.len();
    rels.retain(|r| matches!(r, Node::Select(_, _)) || !selected_bases.contains(r));
    if rels.len() != before {
        *changed = true;
    }
}

fn merge_selects_over_same_cross(rels: &mut Vec<Node>, changed: &mut bool) {
    let mut i = 0;
    'outer: while i < rels.len() {
        if let Node::Select(base_i, pred_i) = rels[i].clone() {
            if matches!(*base_i, Node::Cross(_)) {
                let mut j = i + 1;
                while j < rels.len() {
                    if let Node::Select(base_j, pred_j) = rels[j].clone() {
                        if base_j == base_i {
                            let merged = merge_and(pred_i, pred_j);
                            rels[i] = Node::select(*base_i, merged);
                            rels.remove(j);
                            *changed = true;
                            continue 'outer;
                        }
                    }
                    j += 1;
                }
            }
        }
        i += 1;
    }
}

fn merge_and(a: Expr, b: Expr) -> Expr {
    match a {
        Expr::And(mut args) => {
            args.push(b);
            Expr::And(args)
        }
        other => Expr::And(vec![other, b]),
    }
}

fn dedup_preserve_first<T: PartialEq + Clone>(items: &mut Vec<T>, changed: &mut bool) {
    let before = items.len();
    let mut seen: Vec<T> = Vec::with_capacity(items.len());
    items.retain(|item| {
        if seen.contains(item) {
            false
        } else {
            seen.push(item.clone());
            true
        }
    });
    if items.len() != before {
        *changed = true;
    }
}

// --- Predicate rules: 4, 5, 6, 7, 8, 20, 21, 26, 27, 28 ---------------------

fn rewrite_equal(l: Box<Expr>, r: Box<Expr>, changed: &mut bool) -> Expr {
    // Rule 4: Equal(c, c) → T
    if let (Expr::Column(lc), Expr::Column(rc)) = (l.as_ref(), r.as_ref()) {
        if lc == rc {
            *changed = true;
            return Expr::bool(true);
        }
    }
    Expr::Equal(l, r)
}

fn rewrite_gt(l: Box<Expr>, r: Box<Expr>, changed: &mut bool) -> Expr {
    // Rule 20: Gt(Column(a,c), Column(b,d)) → Lt(Column(b,d), Column(a,c))
    if matches!(l.as_ref(), Expr::Column(_)) && matches!(r.as_ref(), Expr::Column(_)) {
        *changed = true;
        return Expr::Lt(r, l);
    }
    Expr::Gt(l, r)
}

fn rewrite_not(inner: Box<Expr>, changed: &mut bool) -> Expr {
    // Rule 28: ¬(¬a) → a
    if let Expr::Not(inner2) = *inner {
        *changed = true;
        return *inner2;
    }
    Expr::Not(inner)
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Int64(i) => Some(*i as f64),
        Value::Float64(f) => Some(*f),
        _ => None,
    }
}

fn numeric_bound(e: &Expr) -> Option<(&Expr, f64)> {
    if let Expr::Lt(x, n) | Expr::Gt(x, n) = e {
        if let Expr::Literal(v) = n.as_ref() {
            if let Some(f) = as_f64(v) {
                return Some((x, f));
            }
        }
    }
    None
}

/// Rule 21: redundant comparator fusion. Keeps the tightest bound among
/// `Lt`s sharing the same probe expression, and the tightest among `Gt`s.
fn fuse_comparators(args: &mut Vec<Expr>, changed: &mut bool) {
    let mut tightest_lt: Vec<(Expr, f64, usize)> = Vec::new();
    let mut tightest_gt: Vec<(Expr, f64, usize)> = Vec::new();
    let mut drop: Vec<usize> = Vec::new();

    for (idx, arg) in args.iter().enumerate() {
        match arg {
            Expr::Lt(x, _) => {
                if let Some((probe, bound)) = numeric_bound(arg) {
                    if let Some(existing) = tightest_lt.iter_mut().find(|(e, ..)| e == probe) {
                        if bound < existing.1 {
                            drop.push(existing.2);
                            existing.1 = bound;
                            existing.2 = idx;
                        } else {
                            drop.push(idx);
                        }
                    } else {
                        tightest_lt.push(((**x).clone(), bound, idx));
                    }
                }
            }
            Expr::Gt(x, _) => {
                if let Some((probe, bound)) = numeric_bound(arg) {
                    if let Some(existing) = tightest_gt.iter_mut().find(|(e, ..)| e == probe) {
                        if bound > existing.1 {
                            drop.push(existing.2);
                            existing.1 = bound;
                            existing.2 = idx;
                        } else {
                            drop.push(idx);
                        }
                    } else {
                        tightest_gt.push(((**x).clone(), bound, idx));
                    }
                }
            }
            _ => {}
        }
    }
    if drop.is_empty() {
        return;
    }
    drop.sort_unstable();
    drop.dedup();
    for idx in drop.into_iter().rev() {
        args.remove(idx);
    }
    *changed = true;
}

fn rewrite_and(args: Vec<Expr>, changed: &mut bool) -> Expr {
    // Rule 7: ∧(F, …) → F
    if args.iter().any(|a| a.is_false()) {
        *changed = true;
        return Expr::bool(false);
    }
    // Rule 5: ∧(T, p…) → ∧(p…)
    let before = args.len();
    let mut args: Vec<Expr> = args.into_iter().filter(|a| !a.is_true()).collect();
    if args.len() != before {
        *changed = true;
    }
    // Rule 28: ∧(a, a, s…) → ∧(a, s…)
    dedup_preserve_first(&mut args, changed);
    // Rule 21: redundant comparator fusion.
    fuse_comparators(&mut args, changed);
    match args.len() {
        // Design notes §9: rather than treat an empty ∧ as "identity true"
        // ambiguously, construction of an empty `And` is forbidden by
        // always collapsing it to a literal true here.
        0 => Expr::bool(true),
        1 => {
            *changed = true;
            args.pop().unwrap()
        }
        _ => Expr::And(args),
    }
}

fn rewrite_or(args: Vec<Expr>, changed: &mut bool) -> Expr {
    // Rule 6: ∨(T, p…) → T
    if args.iter().any(|a| a.is_true()) {
        *changed = true;
        return Expr::bool(true);
    }
    // Rule 8: ∨(F, p…) → ∨(p…)
    let before = args.len();
    let mut args: Vec<Expr> = args.into_iter().filter(|a| !a.is_false()).collect();
    if args.len() != before {
        *changed = true;
    }
    // Rule 28: ∨(a, a, s…) → ∨(a, s…)
    dedup_preserve_first(&mut args, changed);
    match args.len() {
        0 => Expr::bool(false),
        1 => {
            *changed = true;
            args.pop().unwrap()
        }
        _ => Expr::Or(args),
    }
}

fn rewrite_in(x: Box<Expr>, list: Box<Expr>, changed: &mut bool) -> Expr {
    match *list {
        Expr::List(mut items) => {
            if items.is_empty() {
                // Rule 27: In(x, List()) → F
                *changed = true;
                Expr::bool(false)
            } else {
                // Rule 26: In(x, List(v, s…)) → ∨(Equal(x,v), In(x, List(s…)))
                *changed = true;
                let first = items.remove(0);
                Expr::Or(vec![
                    Expr::Equal(x.clone(), Box::new(first)),
                    Expr::In(x, Box::new(Expr::List(items))),
                ])
            }
        }
        other => Expr::In(x, Box::new(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ra::{col, qcol};

    fn run(mut node: Node) -> Node {
        let mut changed = true;
        while changed {
            changed = false;
            node = apply_pass(node, &mut changed);
        }
        node
    }

    #[test]
    fn and_short_circuits_on_false() {
        let e = Expr::And(vec![Expr::bool(true), Expr::bool(false), col("x")]);
        let mut changed = false;
        assert_eq!(rewrite_expr(e, &mut changed), Expr::bool(false));
    }

    #[test]
    fn or_short_circuits_on_true() {
        let e = Expr::Or(vec![col("x"), Expr::bool(true)]);
        let mut changed = false;
        assert_eq!(rewrite_expr(e, &mut changed), Expr::bool(true));
    }

    #[test]
    fn in_list_desugars_to_or_chain() {
        let e = Expr::In(
            Box::new(col("x")),
            Box::new(Expr::List(vec![Expr::Literal(Value::Int64(1)), Expr::Literal(Value::Int64(2))])),
        );
        let result = run(Node::select(Node::Table("t".into()), e));
        match result {
            Node::Select(_, Expr::Or(args)) => assert_eq!(args.len(), 2),
            other => panic!("expected an Or chain, got {other:?}"),
        }
    }

    #[test]
    fn empty_in_list_is_false() {
        let e = Expr::In(Box::new(col("x")), Box::new(Expr::List(vec![])));
        let mut changed = false;
        assert_eq!(rewrite_expr(e, &mut changed), Expr::bool(false));
    }

    #[test]
    fn comparator_fusion_keeps_tightest_bound() {
        let args = vec![
            Expr::Lt(Box::new(col("x")), Box::new(Expr::Literal(Value::Int64(10)))),
            Expr::Lt(Box::new(col("x")), Box::new(Expr::Literal(Value::Int64(3)))),
        ];
        let mut changed = false;
        let fused = rewrite_and(args, &mut changed);
        assert!(changed);
        assert_eq!(
            fused,
            Expr::Lt(Box::new(col("x")), Box::new(Expr::Literal(Value::Int64(3))))
        );
    }

    #[test]
    fn equijoin_introduction_folds_cross_into_join() {
        let cross = Node::Cross(vec![Node::Table("a".into()), Node::Table("b".into())]);
        let pred = Expr::Equal(Box::new(qcol("a", "id")), Box::new(qcol("b", "id")));
        let result = run(Node::select(cross, pred));
        assert!(matches!(result, Node::Join(_, _)), "got {result:?}");
    }

    #[test]
    fn pushdown_moves_single_table_predicate_into_cross_branch() {
        let cross = Node::Cross(vec![Node::Table("a".into()), Node::Table("b".into())]);
        let pred = Expr::Equal(Box::new(qcol("a", "id")), Box::new(Expr::Literal(Value::Int64(1))));
        let result = run(Node::select(cross, pred));
        match result {
            Node::Cross(rels) => {
                assert!(rels.iter().any(|r| matches!(r, Node::Select(base, _) if **base == Node::Table("a".into()))));
            }
            other => panic!("expected Cross with pushed-down Select, got {other:?}"),
        }
    }
}
