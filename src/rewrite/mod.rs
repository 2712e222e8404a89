//! Fixpoint term rewriting over the RA tree.
//!
//! Rather than a dedicated ACM (associative-commutative) pattern matcher,
//! commutative operators (`And`/`Or`/`Cross`/`Union`/`Intersection`) are
//! matched structurally and duplicate/subsumed operands are found by a
//! full scan rather than by requiring canonical adjacency, which is
//! equivalent in power for the rule set given here and much simpler to get
//! right.

mod rules;

use crate::config::EngineConfig;
use crate::ra::Node;

/// Rewrites `tree` to fixpoint under the rule library in `rules`, unless
/// `config.optimization_level` is 0 (rewriting disabled, tree passed
/// through unchanged).
pub fn rewrite(tree: Node, config: &EngineConfig) -> Node {
    if config.optimization_level == 0 {
        log::trace!("rewriter disabled (optimization_level = 0)");
        return tree;
    }
    let mut current = tree;
    for iteration in 0..config.max_rewrite_iterations {
        let mut changed = false;
        current = rules::apply_pass(current, &mut changed);
        if !changed {
            log::debug!("rewriter reached fixpoint after {iteration} pass(es)");
            return current;
        }
    }
    log::debug!(
        "rewriter hit max_rewrite_iterations ({}) without reaching fixpoint",
        config.max_rewrite_iterations
    );
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ra::expression::Expr;
    use crate::ra::{col, Node};

    fn config() -> EngineConfig {
        EngineConfig::default()
    }

    #[test]
    fn select_true_collapses_to_relation() {
        let tree = Node::select(Node::Table("t".into()), Expr::bool(true));
        assert_eq!(rewrite(tree, &config()), Node::Table("t".into()));
    }

    #[test]
    fn select_false_collapses_to_empty_set() {
        let tree = Node::select(Node::Table("t".into()), Expr::bool(false));
        assert_eq!(
            rewrite(tree, &config()),
            Node::EmptySet(Box::new(Node::Table("t".into())))
        );
    }

    #[test]
    fn self_equality_is_tautology() {
        let tree = Node::select(Node::Table("t".into()), Expr::Equal(
            Box::new(col("x")),
            Box::new(col("x")),
        ));
        assert_eq!(rewrite(tree, &config()), Node::Table("t".into()));
    }

    #[test]
    fn optimization_level_zero_disables_rewriting() {
        let tree = Node::select(Node::Table("t".into()), Expr::bool(true));
        let mut cfg = config();
        cfg.optimization_level = 0;
        assert_eq!(rewrite(tree.clone(), &cfg), tree);
    }

    #[test]
    fn rewrite_is_idempotent() {
        let tree = Node::select(
            Node::Cross(vec![Node::Table("t".into()), Node::UniverseSet]),
            Expr::And(vec![Expr::bool(true), Expr::bool(true)]),
        );
        let once = rewrite(tree, &config());
        let twice = rewrite(once.clone(), &config());
        assert_eq!(once, twice);
    }
}
