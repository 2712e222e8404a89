use crate::column::ColumnRef;
use crate::value::Value;
use std::fmt;

/// A scalar predicate/term node. Kept as a sibling of `Node` rather than
/// folded into it, since a predicate and a relation are different kinds of
/// thing in a statically typed tree (see DESIGN.md).
///
/// `Literal` collapses `Number`/`String`/`Bool`/`Null` from the term table
/// into one variant holding a `Value` — they are all constant terms
/// differing only in tag.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Column(ColumnRef),
    Literal(Value),
    Function(String, Vec<Expr>),
    Not(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Equal(Box<Expr>, Box<Expr>),
    NotEqual(Box<Expr>, Box<Expr>),
    Lt(Box<Expr>, Box<Expr>),
    Le(Box<Expr>, Box<Expr>),
    Gt(Box<Expr>, Box<Expr>),
    Ge(Box<Expr>, Box<Expr>),
    Like(Box<Expr>, Box<Expr>),
    In(Box<Expr>, Box<Expr>),
    /// Only ever appears as the second operand of `In`.
    List(Vec<Expr>),
}

impl Expr {
    pub fn bool(b: bool) -> Expr {
        Expr::Literal(Value::Bool(b))
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Expr::Literal(Value::Bool(true)))
    }

    pub fn is_false(&self) -> bool {
        matches!(self, Expr::Literal(Value::Bool(false)))
    }

    pub fn column(&self) -> Option<&ColumnRef> {
        match self {
            Expr::Column(c) => Some(c),
            _ => None,
        }
    }

    /// Depth-first rewrite of every child expression, bottom-up.
    pub fn transform(self, f: &mut impl FnMut(Expr) -> Expr) -> Expr {
        let rebuilt = match self {
            Expr::Column(_) | Expr::Literal(_) => self,
            Expr::Function(name, args) => {
                Expr::Function(name, args.into_iter().map(|a| a.transform(f)).collect())
            }
            Expr::Not(a) => Expr::Not(Box::new(a.transform(f))),
            Expr::And(args) => Expr::And(args.into_iter().map(|a| a.transform(f)).collect()),
            Expr::Or(args) => Expr::Or(args.into_iter().map(|a| a.transform(f)).collect()),
            Expr::Equal(a, b) => Expr::Equal(Box::new(a.transform(f)), Box::new(b.transform(f))),
            Expr::NotEqual(a, b) => {
                Expr::NotEqual(Box::new(a.transform(f)), Box::new(b.transform(f)))
            }
            Expr::Lt(a, b) => Expr::Lt(Box::new(a.transform(f)), Box::new(b.transform(f))),
            Expr::Le(a, b) => Expr::Le(Box::new(a.transform(f)), Box::new(b.transform(f))),
            Expr::Gt(a, b) => Expr::Gt(Box::new(a.transform(f)), Box::new(b.transform(f))),
            Expr::Ge(a, b) => Expr::Ge(Box::new(a.transform(f)), Box::new(b.transform(f))),
            Expr::Like(a, b) => Expr::Like(Box::new(a.transform(f)), Box::new(b.transform(f))),
            Expr::In(a, b) => Expr::In(Box::new(a.transform(f)), Box::new(b.transform(f))),
            Expr::List(args) => Expr::List(args.into_iter().map(|a| a.transform(f)).collect()),
        };
        f(rebuilt)
    }

    /// A stable sort key used to canonicalize operand order of commutative
    /// node kinds (`And`/`Or`) instead of implementing full ACM matching,
    /// per design notes §9 option (b).
    pub fn canonical_key(&self) -> String {
        format!("{self}")
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(c) => write!(f, "{c}"),
            Expr::Literal(v) => write!(f, "{v:?}"),
            Expr::Function(name, args) => {
                write!(f, "{name}(")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{a}")?;
                }
                write!(f, ")")
            }
            Expr::Not(a) => write!(f, "NOT {a}"),
            Expr::And(args) => write!(f, "AND({})", join(args)),
            Expr::Or(args) => write!(f, "OR({})", join(args)),
            Expr::Equal(a, b) => write!(f, "{a} = {b}"),
            Expr::NotEqual(a, b) => write!(f, "{a} <> {b}"),
            Expr::Lt(a, b) => write!(f, "{a} < {b}"),
            Expr::Le(a, b) => write!(f, "{a} <= {b}"),
            Expr::Gt(a, b) => write!(f, "{a} > {b}"),
            Expr::Ge(a, b) => write!(f, "{a} >= {b}"),
            Expr::Like(a, b) => write!(f, "{a} LIKE {b}"),
            Expr::In(a, b) => write!(f, "{a} IN {b}"),
            Expr::List(args) => write!(f, "LIST({})", join(args)),
        }
    }
}

fn join(args: &[Expr]) -> String {
    args.iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
