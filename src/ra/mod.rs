//! The relational-algebra intermediate representation: a flat `Node` enum
//! with operand vectors for variadic operators, indexed by operator kind
//! rather than a class hierarchy per node type.

pub mod expression;

pub use expression::Expr;

use crate::column::{ColumnDescriptor, ColumnRegistry, ColumnRef, LogicalType};
use crate::error::{Error, Result};
use crate::provider::TableCatalog;

/// Pairs a relation with the column expression used as its join key (a
/// "theta" in the usual relational-algebra sense).
#[derive(Clone, Debug, PartialEq)]
pub struct Theta {
    pub rel: Box<Node>,
    pub key: Expr,
}

impl Theta {
    pub fn new(rel: Node, key: Expr) -> Self {
        Self {
            rel: Box::new(rel),
            key,
        }
    }
}

/// A tagged algebraic term covering every relational operator this engine
/// supports, collapsed into one enum. Every node is immutable; rewrites
/// build new trees rather than mutate in place.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Table(String),
    /// Zero rows. Carries the relation it replaced during rewriting (rule
    /// 22, `F → ⊥`, and its propagation through `Union`/`Intersection`) so
    /// a wrapping `Project`/`Distinct`/`Union` can still derive the right
    /// output columns over zero rows — see `schema` below.
    EmptySet(Box<Node>),
    OneRowSet,
    UniverseSet,
    Select(Box<Node>, Expr),
    Project(Box<Node>, Vec<Expr>),
    Cross(Vec<Node>),
    Join(Theta, Theta),
    LeftJoin(Theta, Theta),
    RightJoin(Theta, Theta),
    Union(Vec<Node>),
    Intersection(Vec<Node>),
    Distinct(Box<Node>),
    GroupBy(Box<Node>, Vec<Expr>),
    Limit(Box<Node>, i64),
    Offset(Box<Node>, i64),
}

impl Node {
    pub fn select(rel: Node, pred: Expr) -> Node {
        Node::Select(Box::new(rel), pred)
    }

    pub fn project(rel: Node, cols: Vec<Expr>) -> Node {
        Node::Project(Box::new(rel), cols)
    }

    pub fn distinct(rel: Node) -> Node {
        Node::Distinct(Box::new(rel))
    }

    pub fn limit(rel: Node, n: i64) -> Node {
        Node::Limit(Box::new(rel), n)
    }

    pub fn offset(rel: Node, n: i64) -> Node {
        Node::Offset(Box::new(rel), n)
    }

    pub fn group_by(rel: Node, cols: Vec<Expr>) -> Node {
        Node::GroupBy(Box::new(rel), cols)
    }

    /// Depth-first, bottom-up rewrite of the tree: children are transformed
    /// first, then `f` is applied to the rebuilt node. Mirrors the
    /// teacher's `Node::transform`.
    pub fn transform(self, f: &mut impl FnMut(Node) -> Node) -> Node {
        let rebuilt = match self {
            Node::Table(_) | Node::EmptySet(_) | Node::OneRowSet | Node::UniverseSet => self,
            Node::Select(rel, pred) => Node::Select(Box::new(rel.transform(f)), pred),
            Node::Project(rel, cols) => Node::Project(Box::new(rel.transform(f)), cols),
            Node::Cross(rels) => {
                Node::Cross(rels.into_iter().map(|r| r.transform(f)).collect())
            }
            Node::Join(a, b) => Node::Join(a.transform_rel(f), b.transform_rel(f)),
            Node::LeftJoin(a, b) => Node::LeftJoin(a.transform_rel(f), b.transform_rel(f)),
            Node::RightJoin(a, b) => Node::RightJoin(a.transform_rel(f), b.transform_rel(f)),
            Node::Union(rels) => {
                Node::Union(rels.into_iter().map(|r| r.transform(f)).collect())
            }
            Node::Intersection(rels) => {
                Node::Intersection(rels.into_iter().map(|r| r.transform(f)).collect())
            }
            Node::Distinct(rel) => Node::Distinct(Box::new(rel.transform(f))),
            Node::GroupBy(rel, cols) => Node::GroupBy(Box::new(rel.transform(f)), cols),
            Node::Limit(rel, n) => Node::Limit(Box::new(rel.transform(f)), n),
            Node::Offset(rel, n) => Node::Offset(Box::new(rel.transform(f)), n),
        };
        f(rebuilt)
    }

    /// Depth-first rewrite of every `Expr` reachable from this node,
    /// leaving the node shape untouched.
    pub fn transform_expressions(self, f: &mut impl FnMut(Expr) -> Expr) -> Node {
        match self {
            Node::Table(_) | Node::EmptySet(_) | Node::OneRowSet | Node::UniverseSet => self,
            Node::Select(rel, pred) => {
                Node::Select(Box::new(rel.transform_expressions(f)), pred.transform(f))
            }
            Node::Project(rel, cols) => Node::Project(
                Box::new(rel.transform_expressions(f)),
                cols.into_iter().map(|c| c.transform(f)).collect(),
            ),
            Node::Cross(rels) => Node::Cross(
                rels.into_iter().map(|r| r.transform_expressions(f)).collect(),
            ),
            Node::Join(a, b) => Node::Join(a.transform_expr(f), b.transform_expr(f)),
            Node::LeftJoin(a, b) => Node::LeftJoin(a.transform_expr(f), b.transform_expr(f)),
            Node::RightJoin(a, b) => Node::RightJoin(a.transform_expr(f), b.transform_expr(f)),
            Node::Union(rels) => Node::Union(
                rels.into_iter().map(|r| r.transform_expressions(f)).collect(),
            ),
            Node::Intersection(rels) => Node::Intersection(
                rels.into_iter().map(|r| r.transform_expressions(f)).collect(),
            ),
            Node::Distinct(rel) => Node::Distinct(Box::new(rel.transform_expressions(f))),
            Node::GroupBy(rel, cols) => Node::GroupBy(
                Box::new(rel.transform_expressions(f)),
                cols.into_iter().map(|c| c.transform(f)).collect(),
            ),
            Node::Limit(rel, n) => Node::Limit(Box::new(rel.transform_expressions(f)), n),
            Node::Offset(rel, n) => Node::Offset(Box::new(rel.transform_expressions(f)), n),
        }
    }

    /// Derives the output schema of this node, resolving `Table` leaves
    /// against `catalog`. Used by the rewriter's equi-join introduction rule
    /// (needs to know which side a column belongs to) and by the lowerer.
    pub fn schema(&self, catalog: &TableCatalog) -> Result<ColumnRegistry> {
        match self {
            Node::Table(id) => {
                let provider = catalog.get(id)?;
                provider
                    .column_metadata()
                    .ok_or_else(|| Error::ColumnMetadataUndefined(id.clone()))
            }
            // The witness carries the schema the replaced relation would
            // have produced; `OneRowSet`/`UniverseSet` are genuinely
            // zero-width (no relation precedes them).
            Node::EmptySet(witness) => witness.schema(catalog),
            Node::OneRowSet | Node::UniverseSet => Ok(ColumnRegistry::empty()),
            Node::Select(rel, _) => rel.schema(catalog),
            Node::Project(rel, cols) => project_schema(&rel.schema(catalog)?, cols),
            Node::Cross(rels) => {
                let mut acc = ColumnRegistry::empty();
                for rel in rels {
                    acc = ColumnRegistry::concat(&acc, &rel.schema(catalog)?);
                }
                Ok(acc)
            }
            Node::Join(a, b) | Node::LeftJoin(a, b) | Node::RightJoin(a, b) => {
                let left = a.rel.schema(catalog)?;
                let right = b.rel.schema(catalog)?;
                Ok(ColumnRegistry::concat(&left, &right))
            }
            Node::Union(rels) | Node::Intersection(rels) => rels
                .first()
                .map(|r| r.schema(catalog))
                .unwrap_or(Ok(ColumnRegistry::empty())),
            Node::Distinct(rel) => rel.schema(catalog),
            Node::GroupBy(rel, cols) => project_schema(&rel.schema(catalog)?, cols),
            Node::Limit(rel, _) | Node::Offset(rel, _) => rel.schema(catalog),
        }
    }
}

impl Theta {
    fn transform_rel(self, f: &mut impl FnMut(Node) -> Node) -> Theta {
        Theta {
            rel: Box::new(self.rel.transform(f)),
            key: self.key,
        }
    }

    fn transform_expr(self, f: &mut impl FnMut(Expr) -> Expr) -> Theta {
        Theta {
            rel: Box::new(self.rel.transform_expressions(f)),
            key: self.key.transform(f),
        }
    }
}

/// Derives the output registry of projecting `exprs` over `input`: a
/// directly-referenced column keeps its original descriptor, anything else
/// (a literal, a function call) gets an anonymous descriptor named after
/// its canonical textual form.
pub(crate) fn project_schema(input: &ColumnRegistry, exprs: &[Expr]) -> Result<ColumnRegistry> {
    let mut out = Vec::with_capacity(exprs.len());
    for expr in exprs {
        out.push(project_descriptor(input, expr)?);
    }
    Ok(ColumnRegistry::new(out))
}

fn project_descriptor(input: &ColumnRegistry, expr: &Expr) -> Result<ColumnDescriptor> {
    match expr {
        Expr::Column(c) => {
            let index = input.resolve(c)?;
            Ok(input.get(index).cloned().unwrap())
        }
        _ => Ok(ColumnDescriptor::anonymous(
            expr.canonical_key(),
            LogicalType::Unknown,
        )),
    }
}

/// Unqualified column reference, a small convenience used widely by the
/// lowerer and by rule construction.
pub fn col(name: impl Into<String>) -> Expr {
    Expr::Column(ColumnRef::unqualified(name))
}

pub fn qcol(table: impl Into<String>, name: impl Into<String>) -> Expr {
    Expr::Column(ColumnRef::qualified(table, name))
}
