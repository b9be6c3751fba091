//! Condition translation: [`Expr`] → WHERE fragments plus bind values.

use crate::arg::Arg;
use crate::ast::{And, Column, ColumnValue, Literal, OperatorToken, Or, Predicate, Raw, Where};
use crate::condition::{Comparison, Constraint, Expr, LogicalOp, Operand, Operator};
use crate::error::{SqlError, SqlResult};
use crate::expand::{expand, placeholder_group};
use crate::value::Value;

/// Translate a condition into a WHERE fragment and the values it binds.
pub fn to_where(expr: &Expr) -> SqlResult<(Where, Vec<Value>)> {
    let (predicate, args) = to_predicate(expr)?;
    let items = if predicate.is_empty() {
        Vec::new()
    } else {
        vec![predicate]
    };
    Ok((Where::new(items), args))
}

/// Translate a condition into a single predicate.
///
/// Constraint-yielding inputs (`Cond`, constraint lists) are handled before
/// logical trees; a tree recurses into its children and is grouped only
/// when it has more than one.
pub fn to_predicate(expr: &Expr) -> SqlResult<(Predicate, Vec<Value>)> {
    match expr {
        Expr::Raw(raw) => {
            let (sql, args) = expand(&raw.sql, &raw.args)?;
            Ok((Predicate::Raw(Raw::new(sql)), args))
        }
        Expr::Cond(cond) => constraints(&cond.constraints()),
        Expr::Constraints(list) => constraints(list),
        Expr::Logical(logical) => {
            let mut items = Vec::with_capacity(logical.exprs.len());
            let mut args = Vec::new();
            for child in &logical.exprs {
                let (predicate, child_args) = to_predicate(child)?;
                if !predicate.is_empty() {
                    items.push(predicate);
                    args.extend(child_args);
                }
            }
            Ok((group(logical.op, items), args))
        }
        Expr::Constraint(c) => constraint(c),
        Expr::Subquery(query) => {
            let (sql, args) = query.compile_grouped()?;
            Ok((Predicate::Raw(Raw::new(sql)), args))
        }
        Expr::Literal(value) => Ok((Predicate::Literal(Literal::new(value.clone())), Vec::new())),
    }
}

fn group(op: LogicalOp, mut items: Vec<Predicate>) -> Predicate {
    match items.len() {
        0 => Predicate::Raw(Raw::default()),
        1 => items.remove(0),
        _ => match op {
            LogicalOp::Or => Predicate::Or(Or::new(items)),
            LogicalOp::And | LogicalOp::None => Predicate::And(And::new(items)),
        },
    }
}

fn constraints(list: &[Constraint]) -> SqlResult<(Predicate, Vec<Value>)> {
    let mut items = Vec::with_capacity(list.len());
    let mut args = Vec::new();
    for c in list {
        let (predicate, c_args) = constraint(c)?;
        items.push(predicate);
        args.extend(c_args);
    }
    Ok((group(LogicalOp::And, items), args))
}

/// An operator written inline in a constraint key.
enum KeyOperator {
    Known(Operator),
    Custom(String),
}

/// Operator written inline in a key: `"age >="` → `Some(Known(Gte))`.
fn split_key(key: &str) -> SqlResult<(Column, Option<KeyOperator>)> {
    let mut parts = key.split_whitespace();
    let column = parts
        .next()
        .ok_or_else(|| SqlError::translation("constraint key is empty"))?;
    let op = parts.collect::<Vec<_>>().join(" ");
    let token = if op.is_empty() {
        None
    } else {
        Some(match Operator::parse(&op) {
            Some(known) => KeyOperator::Known(known),
            None => KeyOperator::Custom(op),
        })
    };
    Ok((Column::new(column), token))
}

fn constraint(c: &Constraint) -> SqlResult<(Predicate, Vec<Value>)> {
    let (column, key_op) = split_key(&c.key)?;

    let (operator, value, args) = match (&c.value, key_op) {
        (Operand::Comparison(_), Some(_)) => {
            return Err(SqlError::translation(format!(
                "key {:?} has an inline operator and a comparison value",
                c.key
            )));
        }
        (Operand::Comparison(cmp), None) => comparison(cmp)?,
        (Operand::Arg(arg), None) => default_comparison(arg)?,
        (Operand::Arg(arg), Some(KeyOperator::Known(Operator::NotEq))) if arg.is_null() => {
            (OperatorToken::Known(Operator::IsNot), "NULL".to_string(), Vec::new())
        }
        (Operand::Arg(arg), Some(KeyOperator::Known(op))) => {
            comparison(&Comparison::new(op, vec![arg.clone()]))?
        }
        (Operand::Arg(arg), Some(KeyOperator::Custom(token))) => {
            let (value, args) = expand("?", std::slice::from_ref(arg))?;
            (OperatorToken::Custom(token), value, args)
        }
    };

    Ok((
        Predicate::ColumnValue(ColumnValue::new(column, operator, Raw::new(value))),
        args,
    ))
}

/// A bare value under the default operator: NULL → `IS NULL`, list → `IN`.
fn default_comparison(arg: &Arg) -> SqlResult<(OperatorToken, String, Vec<Value>)> {
    match arg {
        Arg::Value(Value::Null) => Ok((
            OperatorToken::Known(Operator::Is),
            "NULL".to_string(),
            Vec::new(),
        )),
        Arg::List(_) => comparison(&Comparison::new(Operator::In, vec![arg.clone()])),
        other => {
            let (value, args) = expand("?", std::slice::from_ref(other))?;
            Ok((OperatorToken::Default, value, args))
        }
    }
}

/// Expand a comparison into its operator, right-hand side text and values.
pub fn comparison(cmp: &Comparison) -> SqlResult<(OperatorToken, String, Vec<Value>)> {
    let op = cmp.operator;
    let known = OperatorToken::Known(op);

    match op {
        Operator::In | Operator::NotIn => {
            let items: Vec<Arg> = match cmp.values.as_slice() {
                [Arg::List(items)] => items.clone(),
                [nested @ (Arg::Query(_) | Arg::Raw(_))] => {
                    let (value, args) = expand("?", std::slice::from_ref(nested))?;
                    return Ok((known, value, args));
                }
                values => values.to_vec(),
            };
            if items.is_empty() {
                return Ok((known, "(NULL)".to_string(), Vec::new()));
            }
            let (value, args) = expand(&placeholder_group(items.len()), &items)?;
            Ok((known, value, args))
        }
        Operator::Between | Operator::NotBetween => {
            let bounds: &[Arg] = match cmp.values.as_slice() {
                [Arg::List(items)] => items.as_slice(),
                values => values,
            };
            if bounds.len() != 2 {
                return Err(SqlError::translation(format!(
                    "{op} expects two values, got {}",
                    bounds.len()
                )));
            }
            let (value, args) = expand("? AND ?", bounds)?;
            Ok((known, value, args))
        }
        Operator::Is | Operator::IsNot => {
            let literal = match cmp.values.as_slice() {
                [] | [Arg::Value(Value::Null)] => "NULL",
                [Arg::Value(Value::Bool(true))] => "TRUE",
                [Arg::Value(Value::Bool(false))] => "FALSE",
                other => {
                    return Err(SqlError::translation(format!(
                        "{op} accepts only NULL, true or false, got {other:?}"
                    )));
                }
            };
            Ok((known, literal.to_string(), Vec::new()))
        }
        Operator::Custom => {
            let token = cmp
                .token
                .clone()
                .ok_or_else(|| SqlError::translation("custom operator without a token"))?;
            let (value, args) = match cmp.values.as_slice() {
                [] => (String::new(), Vec::new()),
                [single] => expand("?", std::slice::from_ref(single))?,
                many => expand("?", &[Arg::List(many.to_vec())])?,
            };
            Ok((OperatorToken::Custom(token), value, args))
        }
        Operator::Eq | Operator::NotEq => {
            let value = single_value(cmp)?;
            let coerced = match value {
                Arg::Value(Value::Bytes(bytes)) => {
                    Arg::Value(Value::Text(String::from_utf8_lossy(bytes).into_owned()))
                }
                other => other.clone(),
            };
            let (value, args) = expand("?", &[coerced])?;
            Ok((known, value, args))
        }
        _ => {
            let value = single_value(cmp)?;
            let (value, args) = expand("?", std::slice::from_ref(value))?;
            Ok((known, value, args))
        }
    }
}

fn single_value(cmp: &Comparison) -> SqlResult<&Arg> {
    match cmp.values.as_slice() {
        [value] => Ok(value),
        other => Err(SqlError::translation(format!(
            "{} expects one value, got {}",
            cmp.operator,
            other.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Fragment;
    use crate::condition::{Cond, between, eq, is, is_in, is_not_null, like, not_in, op, or};
    use crate::dialect::Dialect;
    use crate::template::{Template, TemplateOptions};
    use crate::{args, cond, raw};

    fn pg() -> Template {
        Dialect::Postgres.template(TemplateOptions::default()).unwrap()
    }

    fn compile(expr: impl Into<Expr>) -> (String, Vec<Value>) {
        let (w, args) = to_where(&expr.into()).unwrap();
        (w.compile(&pg()).unwrap(), args)
    }

    #[test]
    fn raw_condition_expands() {
        let (sql, args) = compile(("id IN ?", vec![1, 2]));
        assert_eq!(sql, "WHERE id IN (?, ?)");
        assert_eq!(args, vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn key_value_shorthand() {
        let (sql, args) = compile(("age >", 18));
        assert_eq!(sql, "WHERE \"age\" > ?");
        assert_eq!(args, vec![Value::Int(18)]);
    }

    #[test]
    fn empty_in_renders_null_group() {
        let (sql, args) = compile(Constraint::new("id", is_in(Vec::<i64>::new())));
        assert_eq!(sql, "WHERE \"id\" IN (NULL)");
        assert!(args.is_empty());

        let (sql, _) = compile(Constraint::new("id", not_in(vec![1, 2, 3])));
        assert_eq!(sql, "WHERE \"id\" NOT IN (?, ?, ?)");
    }

    #[test]
    fn between_binds_two_values() {
        let (sql, args) = compile(Constraint::new("age", between(18, 65)));
        assert_eq!(sql, "WHERE \"age\" BETWEEN ? AND ?");
        assert_eq!(args.len(), 2);
        let one_bound = Constraint::new("age", Comparison::new(Operator::Between, args![1]));
        assert!(to_where(&one_bound.into()).is_err());
    }

    #[test]
    fn is_uses_literals() {
        assert_eq!(
            compile(Constraint::new("deleted_at", is(None::<i32>))).0,
            "WHERE \"deleted_at\" IS NULL"
        );
        assert_eq!(compile(Constraint::new("active", is(true))).0, "WHERE \"active\" IS TRUE");
        assert_eq!(compile(Constraint::new("x", is_not_null())).0, "WHERE \"x\" IS NOT NULL");
        let err = to_where(&Constraint::new("x", is(5)).into()).unwrap_err();
        assert!(matches!(err, SqlError::Translation(_)));
    }

    #[test]
    fn default_operator_adapts_to_value() {
        assert_eq!(
            compile(cond! { "deleted_at" => None::<i32> }).0,
            "WHERE \"deleted_at\" IS NULL"
        );
        assert_eq!(
            compile(cond! { "deleted_at !=" => None::<i32> }).0,
            "WHERE \"deleted_at\" IS NOT NULL"
        );
        let (sql, args) = compile(cond! { "role" => vec!["a", "b"] });
        assert_eq!(sql, "WHERE \"role\" IN (?, ?)");
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn cond_is_sorted_and_grouped() {
        let (sql, args) = compile(cond! { "name" => "bob", "age >=" => 18 });
        assert_eq!(sql, "WHERE (\"age\" >= ? AND \"name\" = ?)");
        assert_eq!(args, vec![Value::Int(18), Value::Text("bob".into())]);

        let (sql, _) = compile(Cond::new().with("id", 1));
        assert_eq!(sql, "WHERE \"id\" = ?");
    }

    #[test]
    fn logical_tree_keeps_argument_order() {
        let expr = or([
            Expr::from(cond! { "a" => 1 }),
            Expr::from(raw!("b = ? OR c = ?", 2, 3)),
        ])
        .and(Constraint::new("d", like("x%")));
        let (sql, args) = compile(expr);
        assert_eq!(sql, "WHERE ((\"a\" = ? OR b = ? OR c = ?) AND \"d\" LIKE ?)");
        assert_eq!(
            args,
            vec![
                Value::Int(1),
                Value::Int(2),
                Value::Int(3),
                Value::Text("x%".into())
            ]
        );
    }

    #[test]
    fn comparison_with_inline_operator_is_rejected() {
        let err = to_where(&Constraint::new("age >", between(1, 2)).into()).unwrap_err();
        assert!(matches!(err, SqlError::Translation(_)));
    }

    #[test]
    fn custom_operator_with_column_slot() {
        let (sql, args) = compile(Constraint::new("data", op(":column->>'name' =", "alice")));
        assert_eq!(sql, "WHERE \"data\"->>'name' = ?");
        assert_eq!(args, vec![Value::Text("alice".into())]);

        let (sql, _) = compile(("tags @>", "{a}"));
        assert_eq!(sql, "WHERE \"tags\" @> ?");
    }

    #[test]
    fn bytes_compare_as_text() {
        let (_, args) = compile(Constraint::new("name", eq(Value::Bytes(b"bob".to_vec()))));
        assert_eq!(args, vec![Value::Text("bob".into())]);
    }

    #[test]
    fn literal_and_empty_inputs() {
        let (sql, args) = compile(Value::Bool(true));
        assert_eq!(sql, "WHERE TRUE");
        assert!(args.is_empty());

        let (w, _) = to_where(&Expr::from(crate::condition::LogicalExpr::default())).unwrap();
        assert!(w.is_empty());
    }
}
