//! Evaluates a compiled `Expr` against a `Row`, given the `ColumnRegistry`
//! that defines its column indices.
//!
//! Function calls are opaque to the RA layer: the rewriter and lowerer
//! never look inside them. At evaluation time this module still needs to
//! produce a concrete `Value` for a handful of commonly used builtins so a
//! query that projects or filters on one of them actually runs; everything
//! else surfaces as `UnknownOperator`.

use crate::column::ColumnRegistry;
use crate::errinput;
use crate::error::{Error, Result};
use crate::ra::expression::Expr;
use crate::row::Row;
use crate::value::Value;

pub fn eval(expr: &Expr, registry: &ColumnRegistry, row: &Row) -> Result<Value> {
    match expr {
        Expr::Column(c) => {
            let index = registry.resolve(c)?;
            Ok(row[index].clone())
        }
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Function(name, args) => eval_function(name, args, registry, row),
        Expr::Not(inner) => Ok(Value::Bool(!truthy(&eval(inner, registry, row)?))),
        Expr::And(args) => eval_and(args, registry, row),
        Expr::Or(args) => eval_or(args, registry, row),
        Expr::Equal(l, r) => cmp(expr, l, r, registry, row, |o| o == std::cmp::Ordering::Equal),
        Expr::NotEqual(l, r) => cmp(expr, l, r, registry, row, |o| o != std::cmp::Ordering::Equal),
        Expr::Lt(l, r) => cmp(expr, l, r, registry, row, |o| o == std::cmp::Ordering::Less),
        Expr::Le(l, r) => cmp(expr, l, r, registry, row, |o| o != std::cmp::Ordering::Greater),
        Expr::Gt(l, r) => cmp(expr, l, r, registry, row, |o| o == std::cmp::Ordering::Greater),
        Expr::Ge(l, r) => cmp(expr, l, r, registry, row, |o| o != std::cmp::Ordering::Less),
        Expr::Like(l, r) => eval_like(l, r, registry, row),
        Expr::In(x, list) => eval_in(x, list, registry, row),
        Expr::List(_) => errinput!("List may only appear as the right-hand side of IN"),
    }
}

/// Evaluates a predicate under SQL three-valued logic: `Null` does not
/// satisfy a `WHERE`/`ON` clause.
pub fn eval_bool(expr: &Expr, registry: &ColumnRegistry, row: &Row) -> Result<bool> {
    Ok(truthy(&eval(expr, registry, row)?))
}

fn truthy(value: &Value) -> bool {
    matches!(value, Value::Bool(true))
}

fn cmp(
    origin: &Expr,
    l: &Expr,
    r: &Expr,
    registry: &ColumnRegistry,
    row: &Row,
    accept: impl Fn(std::cmp::Ordering) -> bool,
) -> Result<Value> {
    let left = eval(l, registry, row)?;
    let right = eval(r, registry, row)?;
    if left.is_null() || right.is_null() {
        let _ = origin;
        return Ok(Value::Null);
    }
    Ok(Value::Bool(accept(left.cmp(&right))))
}

fn eval_and(args: &[Expr], registry: &ColumnRegistry, row: &Row) -> Result<Value> {
    let mut saw_null = false;
    for arg in args {
        match eval(arg, registry, row)? {
            Value::Bool(false) => return Ok(Value::Bool(false)),
            Value::Null => saw_null = true,
            _ => {}
        }
    }
    Ok(if saw_null { Value::Null } else { Value::Bool(true) })
}

fn eval_or(args: &[Expr], registry: &ColumnRegistry, row: &Row) -> Result<Value> {
    let mut saw_null = false;
    for arg in args {
        match eval(arg, registry, row)? {
            Value::Bool(true) => return Ok(Value::Bool(true)),
            Value::Null => saw_null = true,
            _ => {}
        }
    }
    Ok(if saw_null { Value::Null } else { Value::Bool(false) })
}

fn eval_like(l: &Expr, r: &Expr, registry: &ColumnRegistry, row: &Row) -> Result<Value> {
    let left = eval(l, registry, row)?;
    let right = eval(r, registry, row)?;
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    let (Value::Text(text), Value::Text(pattern)) = (&left, &right) else {
        errinput!("LIKE requires text operands, got {} and {}", left.type_name(), right.type_name());
    };
    Ok(Value::Bool(like_matches(text, pattern)))
}

/// `%` matches any run of characters, `_` matches exactly one. Translated
/// to an anchored `regex` rather than hand-rolled, since `regex` is already
/// part of the dependency stack.
fn like_matches(text: &str, pattern: &str) -> bool {
    regex::Regex::new(&like_to_regex(pattern))
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}

fn like_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 2);
    out.push('^');
    for c in pattern.chars() {
        match c {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out.push('$');
    out
}

fn eval_in(x: &Expr, list: &Expr, registry: &ColumnRegistry, row: &Row) -> Result<Value> {
    let Expr::List(items) = list else {
        errinput!("IN requires a literal list on the right-hand side");
    };
    let probe = eval(x, registry, row)?;
    if probe.is_null() {
        return Ok(Value::Null);
    }
    let mut saw_null = false;
    for item in items {
        let candidate = eval(item, registry, row)?;
        if candidate.is_null() {
            saw_null = true;
            continue;
        }
        if probe == candidate {
            return Ok(Value::Bool(true));
        }
    }
    Ok(if saw_null { Value::Null } else { Value::Bool(false) })
}

fn eval_function(name: &str, args: &[Expr], registry: &ColumnRegistry, row: &Row) -> Result<Value> {
    let values: Result<Vec<Value>> = args.iter().map(|a| eval(a, registry, row)).collect();
    let values = values?;
    match name.to_ascii_uppercase().as_str() {
        "UPPER" => text_fn(&values, name, |s| s.to_uppercase()),
        "LOWER" => text_fn(&values, name, |s| s.to_lowercase()),
        "LENGTH" => match values.as_slice() {
            [Value::Text(s)] => Ok(Value::Int64(s.chars().count() as i64)),
            [Value::Null] => Ok(Value::Null),
            _ => errinput!("LENGTH expects a single text argument"),
        },
        "ABS" => match values.as_slice() {
            [Value::Int64(i)] => Ok(Value::Int64(i.abs())),
            [Value::Float64(f)] => Ok(Value::Float64(f.abs())),
            [Value::Null] => Ok(Value::Null),
            _ => errinput!("ABS expects a single numeric argument"),
        },
        "COALESCE" => Ok(values.into_iter().find(|v| !v.is_null()).unwrap_or(Value::Null)),
        "CONCAT" => {
            if values.iter().any(Value::is_null) {
                return Ok(Value::Null);
            }
            let mut out = String::new();
            for v in &values {
                out.push_str(&v.to_string());
            }
            Ok(Value::Text(out))
        }
        other => Err(Error::UnknownOperator(other.to_string())),
    }
}

fn text_fn(values: &[Value], name: &str, f: impl Fn(&str) -> String) -> Result<Value> {
    match values {
        [Value::Text(s)] => Ok(Value::Text(f(s))),
        [Value::Null] => Ok(Value::Null),
        _ => errinput!("{name} expects a single text argument"),
    }
}
