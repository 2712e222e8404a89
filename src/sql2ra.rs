//! SQL text -> RA conversion: walks a `sqlparser` AST and builds the
//! equivalent `Node`/`Expr` tree, tracking alias resolution order
//! (FROM-list declaration order) and `SELECT *` expansion along the way.
//!
//! Column references are translated but deliberately left unvalidated here:
//! a qualified `a.c` becomes `qcol(real_table_for(a), c)` and an unqualified
//! `c` becomes `col(c)`. Whether either actually resolves, including the
//! ambiguous-unqualified-name case, is decided later by
//! `ColumnRegistry::resolve` during lowering, which is the single place the
//! qualified/unqualified/ambiguity contract is implemented.

use crate::column::ColumnRef;
use crate::errinput;
use crate::error::{Error, Result};
use crate::iter::order_by::SortKey;
use crate::provider::TableCatalog;
use crate::ra::expression::Expr as RaExpr;
use crate::ra::{col, qcol, Node, Theta};
use crate::value::Value;
use sqlparser::ast::{
    self, BinaryOperator, Expr as SqlExpr, GroupByExpr, Join, JoinConstraint, JoinOperator, Query,
    Select, SelectItem, SetExpr, SetOperator, SetQuantifier, Statement, TableFactor,
    TableWithJoins, UnaryOperator, Value as SqlValue,
};
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;
use std::collections::HashMap;

/// A converted statement: the relational tree plus any `ORDER BY` keys.
/// Spec.md's RA has no Sort node (§3.6's operator table stops at `Offset`);
/// `ORDER BY` is a presentation concern applied by the driver after
/// lowering, not a rewritable algebraic operator.
pub struct ParsedQuery {
    pub relation: Node,
    pub order_by: Vec<SortKey>,
}

/// Parses `sql_text` as a single statement and converts it to RA. `catalog`
/// is consulted only to expand `SELECT *`/`alias.*` into concrete columns.
pub fn parse(catalog: &TableCatalog, sql_text: &str) -> Result<ParsedQuery> {
    // sqlparser's `ParserError` does not expose a separate line/column pair
    // in this version (positional info, when available, is folded into the
    // message text already); see DESIGN.md for why both are recorded as 0
    // rather than parsed back out of that text.
    let statements = Parser::parse_sql(&MySqlDialect {}, sql_text)
        .map_err(|err| Error::SyntaxError(0, 0, err.to_string()))?;
    let [statement] = statements.as_slice() else {
        errinput!("expected exactly one SQL statement, got {}", statements.len());
    };
    let Statement::Query(query) = statement else {
        errinput!("only SELECT statements are supported");
    };
    convert_query(query, catalog)
}

/// Tracks the FROM-list as it's parsed: which real table each alias (or
/// bare table name) refers to, and the declaration order — including
/// repeats, since a self-join lists its table twice. Mirrors
/// `RelationalAlgebraParser.table_aliases`/`table_order`.
#[derive(Default)]
struct Scope {
    aliases: HashMap<String, String>,
    order: Vec<String>,
}

impl Scope {
    fn register(&mut self, real_name: &str, alias: Option<&str>) {
        let key = alias.unwrap_or(real_name).to_string();
        self.aliases.insert(key, real_name.to_string());
        self.order.push(real_name.to_string());
    }

    fn resolve_alias(&self, alias: &str) -> Result<&str> {
        self.aliases
            .get(alias)
            .map(String::as_str)
            .ok_or_else(|| Error::UnknownColumn(alias.to_string()))
    }
}

fn convert_query(query: &Query, catalog: &TableCatalog) -> Result<ParsedQuery> {
    let (mut relation, scope) = convert_set_expr(&query.body, catalog)?;

    let order_by = match &query.order_by {
        Some(order) => order
            .exprs
            .iter()
            .map(|item| {
                Ok(SortKey {
                    expr: translate_expr(&item.expr, &scope)?,
                    ascending: item.asc.unwrap_or(true),
                })
            })
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };

    // Offset is applied before limit (spec.md §8's "LIMIT 2 OFFSET 3" test
    // expects `Limit(Offset(rel, 3), 2)`), matching the original's MySQL
    // `LIMIT offset, count` handling in `_parse_SELECT`.
    if let Some(offset) = &query.offset {
        relation = Node::offset(relation, expr_to_i64(&offset.value)?);
    }
    if let Some(limit) = &query.limit {
        relation = Node::limit(relation, expr_to_i64(limit)?);
    }

    Ok(ParsedQuery { relation, order_by })
}

fn expr_to_i64(expr: &SqlExpr) -> Result<i64> {
    let SqlExpr::Value(SqlValue::Number(n, _)) = expr else {
        errinput!("LIMIT/OFFSET must be a literal integer");
    };
    n.parse::<i64>()
        .map_err(|_| Error::InvalidInput(format!("invalid LIMIT/OFFSET value '{n}'")))
}

fn convert_set_expr(set_expr: &SetExpr, catalog: &TableCatalog) -> Result<(Node, Scope)> {
    match set_expr {
        SetExpr::Select(select) => convert_select(select, catalog),
        SetExpr::SetOperation {
            op,
            set_quantifier,
            left,
            right,
        } => {
            let (left_rel, _) = convert_set_expr(left, catalog)?;
            let (right_rel, _) = convert_set_expr(right, catalog)?;
            let relation = match op {
                SetOperator::Union => {
                    if matches!(set_quantifier, SetQuantifier::All) {
                        errinput!("UNION ALL is not supported; Union always deduplicates (spec.md §3.6)");
                    }
                    Node::Union(vec![left_rel, right_rel])
                }
                SetOperator::Intersect => Node::Intersection(vec![left_rel, right_rel]),
                SetOperator::Except => errinput!("EXCEPT is not supported"),
            };
            Ok((relation, Scope::default()))
        }
        // A parenthesized nested query used as a set-operation operand;
        // its own ORDER BY/LIMIT (rare in this position) are not honored.
        SetExpr::Query(nested) => convert_set_expr(&nested.body, catalog),
        other => errinput!("unsupported query body: {other}"),
    }
}

fn convert_select(select: &Select, catalog: &TableCatalog) -> Result<(Node, Scope)> {
    let mut scope = Scope::default();

    let mut relation = if select.from.is_empty() {
        Node::OneRowSet
    } else {
        let mut parts = Vec::with_capacity(select.from.len());
        for twj in &select.from {
            parts.push(convert_table_with_joins(twj, &mut scope)?);
        }
        if parts.len() == 1 {
            parts.into_iter().next().unwrap()
        } else {
            Node::Cross(parts)
        }
    };

    if let Some(where_clause) = &select.selection {
        relation = Node::select(relation, translate_expr(where_clause, &scope)?);
    }

    if let GroupByExpr::Expressions(exprs, _) = &select.group_by {
        if !exprs.is_empty() {
            let cols = exprs
                .iter()
                .map(|e| translate_expr(e, &scope))
                .collect::<Result<Vec<_>>>()?;
            relation = Node::group_by(relation, cols);
        }
    }

    if select.having.is_some() {
        errinput!("HAVING is not supported");
    }

    let projection = convert_projection(&select.projection, &scope, catalog)?;
    relation = Node::project(relation, projection);

    if select.distinct.is_some() {
        relation = Node::distinct(relation);
    }

    Ok((relation, scope))
}

fn convert_table_with_joins(twj: &TableWithJoins, scope: &mut Scope) -> Result<Node> {
    let (mut relation, _) = convert_table_factor(&twj.relation, scope)?;
    for join in &twj.joins {
        let (join_relation, join_name) = convert_table_factor(&join.relation, scope)?;
        relation = convert_join(relation, join_relation, &join_name, &join.join_operator, scope)?;
    }
    Ok(relation)
}

fn convert_table_factor(factor: &TableFactor, scope: &mut Scope) -> Result<(Node, String)> {
    match factor {
        TableFactor::Table { name, alias, .. } => {
            let real_name = name.to_string();
            let alias_name = alias.as_ref().map(|a| a.name.value.clone());
            scope.register(&real_name, alias_name.as_deref());
            Ok((Node::Table(real_name.clone()), real_name))
        }
        other => errinput!("unsupported FROM item: {other} (derived tables/subqueries are out of scope)"),
    }
}

fn convert_join(left: Node, right: Node, right_name: &str, op: &JoinOperator, scope: &Scope) -> Result<Node> {
    match op {
        JoinOperator::CrossJoin(_) => Ok(Node::Cross(vec![left, right])),
        JoinOperator::Inner(constraint) | JoinOperator::Join(constraint) => {
            // spec.md §7: `JoinHasNoOnClause` is not a hard error for a
            // plain (inner) join — the lowerer falls back to a cross
            // product. A malformed (non-equality) ON clause still errors.
            match extract_equi_join(constraint, right_name, scope) {
                Ok((lk, rk)) => Ok(Node::Join(Theta::new(left, lk), Theta::new(right, rk))),
                Err(Error::JoinHasNoOnClause) => Ok(Node::Cross(vec![left, right])),
                Err(other) => Err(other),
            }
        }
        JoinOperator::LeftOuter(constraint) | JoinOperator::Left(constraint) => {
            let (lk, rk) = extract_equi_join(constraint, right_name, scope)?;
            Ok(Node::LeftJoin(Theta::new(left, lk), Theta::new(right, rk)))
        }
        JoinOperator::RightOuter(constraint) | JoinOperator::Right(constraint) => {
            let (lk, rk) = extract_equi_join(constraint, right_name, scope)?;
            Ok(Node::RightJoin(Theta::new(left, lk), Theta::new(right, rk)))
        }
        other => errinput!("unsupported join type: {other:?}"),
    }
}

/// Extracts the two sides of a single-column equi-join from `ON a = b`.
/// Mirrors `_parse_JOIN`'s single swap-if-needed heuristic: whichever
/// operand is qualified with the just-joined table's real name is the
/// right-hand key, the other is the left-hand key. An unqualified operand
/// is assumed to already be on the side matching its syntactic position.
fn extract_equi_join(constraint: &JoinConstraint, right_name: &str, scope: &Scope) -> Result<(RaExpr, RaExpr)> {
    let JoinConstraint::On(expr) = constraint else {
        return Err(Error::JoinHasNoOnClause);
    };
    let SqlExpr::BinaryOp {
        left,
        op: BinaryOperator::Eq,
        right,
    } = expr
    else {
        errinput!("JOIN ON clause must be a single column equality");
    };
    let left_key = translate_expr(left, scope)?;
    let right_key = translate_expr(right, scope)?;
    let left_is_right_side = column_table(&left_key) == Some(right_name);
    if left_is_right_side {
        Ok((right_key, left_key))
    } else {
        Ok((left_key, right_key))
    }
}

fn column_table(expr: &RaExpr) -> Option<&str> {
    expr.column()?.table.as_deref()
}

fn convert_projection(items: &[SelectItem], scope: &Scope, catalog: &TableCatalog) -> Result<Vec<RaExpr>> {
    let mut out = Vec::new();
    for item in items {
        match item {
            SelectItem::UnnamedExpr(expr) => out.push(translate_expr(expr, scope)?),
            // The alias is not tracked: spec.md's Column Descriptor naming
            // for a projected expression comes from the source column (for
            // a bare `Expr::Column`) or its canonical textual form, with no
            // slot for a user-supplied rename (see DESIGN.md).
            SelectItem::ExprWithAlias { expr, .. } => out.push(translate_expr(expr, scope)?),
            SelectItem::Wildcard(_) => {
                for real_name in &scope.order {
                    out.extend(expand_table_columns(real_name, catalog)?);
                }
            }
            SelectItem::QualifiedWildcard(kind, _) => {
                let alias = kind.to_string();
                let real_name = scope.resolve_alias(&alias)?.to_string();
                out.extend(expand_table_columns(&real_name, catalog)?);
            }
        }
    }
    Ok(out)
}

fn expand_table_columns(real_name: &str, catalog: &TableCatalog) -> Result<Vec<RaExpr>> {
    let provider = catalog.get(real_name)?;
    let registry = provider
        .column_metadata()
        .ok_or_else(|| Error::ColumnMetadataUndefined(real_name.to_string()))?;
    Ok(registry.iter().map(|d| RaExpr::Column(d.identifier.clone())).collect())
}

fn translate_expr(expr: &SqlExpr, scope: &Scope) -> Result<RaExpr> {
    match expr {
        SqlExpr::Identifier(ident) => Ok(col(ident.value.clone())),
        SqlExpr::CompoundIdentifier(parts) => {
            let [.., table, column] = parts.as_slice() else {
                errinput!("empty compound identifier");
            };
            let real_name = scope.resolve_alias(&table.value)?;
            Ok(qcol(real_name.to_string(), column.value.clone()))
        }
        SqlExpr::Value(value) => Ok(RaExpr::Literal(translate_value(value)?)),
        SqlExpr::Nested(inner) => translate_expr(inner, scope),
        SqlExpr::UnaryOp {
            op: UnaryOperator::Not,
            expr: inner,
        } => Ok(RaExpr::Not(Box::new(translate_expr(inner, scope)?))),
        SqlExpr::UnaryOp {
            op: UnaryOperator::Minus,
            expr: inner,
        } => match translate_expr(inner, scope)? {
            RaExpr::Literal(Value::Int64(i)) => Ok(RaExpr::Literal(Value::Int64(-i))),
            RaExpr::Literal(Value::Float64(f)) => Ok(RaExpr::Literal(Value::Float64(-f))),
            _ => errinput!("unary minus is only supported on numeric literals"),
        },
        SqlExpr::BinaryOp { left, op, right } => translate_binary_op(left, op, right, scope),
        SqlExpr::Like {
            negated,
            expr: inner,
            pattern,
            ..
        } => {
            let like = RaExpr::Like(Box::new(translate_expr(inner, scope)?), Box::new(translate_expr(pattern, scope)?));
            Ok(if *negated { RaExpr::Not(Box::new(like)) } else { like })
        }
        SqlExpr::InList { expr: inner, list, negated } => {
            let items = list.iter().map(|e| translate_expr(e, scope)).collect::<Result<Vec<_>>>()?;
            let in_expr = RaExpr::In(Box::new(translate_expr(inner, scope)?), Box::new(RaExpr::List(items)));
            Ok(if *negated { RaExpr::Not(Box::new(in_expr)) } else { in_expr })
        }
        SqlExpr::Function(func) => translate_function(func, scope),
        other => errinput!("unsupported expression: {other}"),
    }
}

fn translate_binary_op(left: &SqlExpr, op: &BinaryOperator, right: &SqlExpr, scope: &Scope) -> Result<RaExpr> {
    let l = translate_expr(left, scope)?;
    let r = translate_expr(right, scope)?;
    Ok(match op {
        BinaryOperator::Eq => RaExpr::Equal(Box::new(l), Box::new(r)),
        BinaryOperator::NotEq => RaExpr::NotEqual(Box::new(l), Box::new(r)),
        BinaryOperator::Lt => RaExpr::Lt(Box::new(l), Box::new(r)),
        BinaryOperator::LtEq => RaExpr::Le(Box::new(l), Box::new(r)),
        BinaryOperator::Gt => RaExpr::Gt(Box::new(l), Box::new(r)),
        BinaryOperator::GtEq => RaExpr::Ge(Box::new(l), Box::new(r)),
        BinaryOperator::And => RaExpr::And(vec![l, r]),
        BinaryOperator::Or => RaExpr::Or(vec![l, r]),
        other => errinput!("unsupported operator: {other} (ra::Expr has no arithmetic operators)"),
    })
}

fn translate_value(value: &SqlValue) -> Result<Value> {
    match value {
        SqlValue::Number(n, _) => {
            if let Ok(i) = n.parse::<i64>() {
                Ok(Value::Int64(i))
            } else if let Ok(f) = n.parse::<f64>() {
                Ok(Value::Float64(f))
            } else {
                errinput!("unparseable numeric literal: {n}")
            }
        }
        SqlValue::SingleQuotedString(s) | SqlValue::DoubleQuotedString(s) => Ok(Value::Text(s.clone())),
        SqlValue::Boolean(b) => Ok(Value::Bool(*b)),
        SqlValue::Null => Ok(Value::Null),
        other => errinput!("unsupported literal: {other}"),
    }
}

fn translate_function(func: &ast::Function, scope: &Scope) -> Result<RaExpr> {
    let name = func.name.to_string();
    let args = translate_function_args(&func.args, scope)?;
    Ok(RaExpr::Function(name, args))
}

fn translate_function_args(args: &ast::FunctionArguments, scope: &Scope) -> Result<Vec<RaExpr>> {
    match args {
        ast::FunctionArguments::None => Ok(Vec::new()),
        ast::FunctionArguments::List(list) => list
            .args
            .iter()
            .map(|arg| match arg {
                ast::FunctionArg::Unnamed(ast::FunctionArgExpr::Expr(e))
                | ast::FunctionArg::Named {
                    arg: ast::FunctionArgExpr::Expr(e),
                    ..
                } => translate_expr(e, scope),
                _ => errinput!("unsupported function argument"),
            })
            .collect(),
        ast::FunctionArguments::Subquery(_) => errinput!("subquery arguments are not supported"),
    }
}
