//! Condition expressions for WHERE and ON clauses.
//!
//! This module is the driver-independent expression model: [`Comparison`]
//! helpers (`eq`, `between`, `is_in`, ...), single-column [`Constraint`]s,
//! map-shaped [`Cond`] literals and AND/OR [`LogicalExpr`] trees. Everything
//! a builder accepts as a condition converts into the closed [`Expr`] union,
//! which [`crate::translate`] turns into WHERE fragments.
//!
//! # Example
//! ```ignore
//! use sqlcraft::{cond, or, gt, is_in, Constraint};
//!
//! // status = ? AND age >= ?
//! cond! { "status" => "active", "age >=" => 18 };
//!
//! // (role IN (?, ?) OR score > ?)
//! or([
//!     Constraint::new("role", is_in(vec!["admin", "owner"])),
//!     Constraint::new("score", gt(90)),
//! ]);
//! ```

use crate::arg::{Arg, Func, RawExpr, Subquery};
use crate::error::{SqlError, SqlResult};
use crate::value::{Value, for_each_scalar};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Comparison operators known to every dialect.
///
/// `Custom` is the escape hatch for dialect-specific operators; its token
/// travels with the [`Comparison`] rather than the dialect table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    Gt,
    Lte,
    Gte,
    Between,
    NotBetween,
    In,
    NotIn,
    Is,
    IsNot,
    Like,
    NotLike,
    Regexp,
    NotRegexp,
    Custom,
}

impl Operator {
    /// Every operator a dialect must provide a token for.
    pub const ALL: [Operator; 16] = [
        Operator::Eq,
        Operator::NotEq,
        Operator::Lt,
        Operator::Gt,
        Operator::Lte,
        Operator::Gte,
        Operator::Between,
        Operator::NotBetween,
        Operator::In,
        Operator::NotIn,
        Operator::Is,
        Operator::IsNot,
        Operator::Like,
        Operator::NotLike,
        Operator::Regexp,
        Operator::NotRegexp,
    ];

    /// Recognize an operator token written inline in a condition key
    /// (`"age >="`, `"name NOT LIKE"`). Case-insensitive.
    pub fn parse(token: &str) -> Option<Operator> {
        let normalized = token.split_whitespace().collect::<Vec<_>>().join(" ");
        let op = match normalized.to_ascii_uppercase().as_str() {
            "=" | "==" => Operator::Eq,
            "<>" | "!=" => Operator::NotEq,
            "<" => Operator::Lt,
            ">" => Operator::Gt,
            "<=" => Operator::Lte,
            ">=" => Operator::Gte,
            "BETWEEN" => Operator::Between,
            "NOT BETWEEN" => Operator::NotBetween,
            "IN" => Operator::In,
            "NOT IN" => Operator::NotIn,
            "IS" => Operator::Is,
            "IS NOT" => Operator::IsNot,
            "LIKE" => Operator::Like,
            "NOT LIKE" => Operator::NotLike,
            "REGEXP" => Operator::Regexp,
            "NOT REGEXP" => Operator::NotRegexp,
            _ => return None,
        };
        Some(op)
    }

    /// Standard SQL spelling, used by dialects that do not override it.
    pub fn sql(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Lte => "<=",
            Operator::Gte => ">=",
            Operator::Between => "BETWEEN",
            Operator::NotBetween => "NOT BETWEEN",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Is => "IS",
            Operator::IsNot => "IS NOT",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::Regexp => "REGEXP",
            Operator::NotRegexp => "NOT REGEXP",
            Operator::Custom => "",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Custom => f.write_str("CUSTOM"),
            other => f.write_str(other.sql()),
        }
    }
}

/// An operator applied to one or more values, e.g. `between(1, 10)`.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub operator: Operator,
    /// Operator text for [`Operator::Custom`]; may contain `:column`.
    pub token: Option<String>,
    pub values: Vec<Arg>,
}

impl Comparison {
    pub fn new(operator: Operator, values: Vec<Arg>) -> Self {
        Self {
            operator,
            token: None,
            values,
        }
    }
}

fn single(operator: Operator, value: impl Into<Arg>) -> Comparison {
    Comparison::new(operator, vec![value.into()])
}

/// `column = value`
pub fn eq(value: impl Into<Arg>) -> Comparison {
    single(Operator::Eq, value)
}

/// `column != value`
pub fn not_eq(value: impl Into<Arg>) -> Comparison {
    single(Operator::NotEq, value)
}

/// `column < value`
pub fn lt(value: impl Into<Arg>) -> Comparison {
    single(Operator::Lt, value)
}

/// `column > value`
pub fn gt(value: impl Into<Arg>) -> Comparison {
    single(Operator::Gt, value)
}

/// `column <= value`
pub fn lte(value: impl Into<Arg>) -> Comparison {
    single(Operator::Lte, value)
}

/// `column >= value`
pub fn gte(value: impl Into<Arg>) -> Comparison {
    single(Operator::Gte, value)
}

/// `column BETWEEN low AND high`
pub fn between(low: impl Into<Arg>, high: impl Into<Arg>) -> Comparison {
    Comparison::new(Operator::Between, vec![low.into(), high.into()])
}

/// `column NOT BETWEEN low AND high`
pub fn not_between(low: impl Into<Arg>, high: impl Into<Arg>) -> Comparison {
    Comparison::new(Operator::NotBetween, vec![low.into(), high.into()])
}

/// `column IN (...)`. An empty list renders `IN (NULL)`.
pub fn is_in(values: impl Into<Arg>) -> Comparison {
    single(Operator::In, values)
}

/// `column NOT IN (...)`
pub fn not_in(values: impl Into<Arg>) -> Comparison {
    single(Operator::NotIn, values)
}

/// `column IS NULL|TRUE|FALSE`, chosen by `None`/`true`/`false`.
pub fn is(value: impl Into<Arg>) -> Comparison {
    single(Operator::Is, value)
}

/// `column IS NOT NULL|TRUE|FALSE`
pub fn is_not(value: impl Into<Arg>) -> Comparison {
    single(Operator::IsNot, value)
}

pub fn is_null() -> Comparison {
    single(Operator::Is, Value::Null)
}

pub fn is_not_null() -> Comparison {
    single(Operator::IsNot, Value::Null)
}

pub fn like(pattern: impl Into<Arg>) -> Comparison {
    single(Operator::Like, pattern)
}

pub fn not_like(pattern: impl Into<Arg>) -> Comparison {
    single(Operator::NotLike, pattern)
}

pub fn regexp(pattern: impl Into<Arg>) -> Comparison {
    single(Operator::Regexp, pattern)
}

pub fn not_regexp(pattern: impl Into<Arg>) -> Comparison {
    single(Operator::NotRegexp, pattern)
}

/// A dialect-specific operator written verbatim.
///
/// The token is placed between column and value, unless it contains
/// `:column`, in which case it is used as the whole left-hand side:
/// `op(":column->>'name' =", "alice")` → `"data"->>'name' = ?`.
pub fn op(token: impl Into<String>, value: impl Into<Arg>) -> Comparison {
    Comparison {
        operator: Operator::Custom,
        token: Some(token.into()),
        values: vec![value.into()],
    }
}

/// The right-hand side of a [`Constraint`]: a plain argument or a comparison.
#[derive(Debug, Clone)]
pub enum Operand {
    Arg(Arg),
    Comparison(Comparison),
}

macro_rules! operand_from_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Operand {
                fn from(v: $ty) -> Self {
                    Operand::Arg(Arg::from(v))
                }
            }
        )*
    };
}

for_each_scalar!(operand_from_scalar);

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Arg(Arg::Value(v))
    }
}

impl From<Arg> for Operand {
    fn from(v: Arg) -> Self {
        Operand::Arg(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Operand {
    fn from(v: Option<T>) -> Self {
        Operand::Arg(Arg::from(v))
    }
}

impl<T: Into<Arg>> From<Vec<T>> for Operand {
    fn from(v: Vec<T>) -> Self {
        Operand::Arg(Arg::from(v))
    }
}

impl<T: Into<Arg>, const N: usize> From<[T; N]> for Operand {
    fn from(v: [T; N]) -> Self {
        Operand::Arg(Arg::from(v))
    }
}

impl From<RawExpr> for Operand {
    fn from(v: RawExpr) -> Self {
        Operand::Arg(Arg::Raw(v))
    }
}

impl From<Func> for Operand {
    fn from(v: Func) -> Self {
        Operand::Arg(Arg::from(v))
    }
}

impl From<Subquery> for Operand {
    fn from(v: Subquery) -> Self {
        Operand::Arg(Arg::Query(v))
    }
}

impl From<Comparison> for Operand {
    fn from(v: Comparison) -> Self {
        Operand::Comparison(v)
    }
}

/// A single `column [operator]` key bound to a value.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub key: String,
    pub value: Operand,
}

impl Constraint {
    pub fn new(key: impl Into<String>, value: impl Into<Operand>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A map-shaped condition: every entry must hold (AND-joined).
///
/// Keys are kept sorted so the compiled text is deterministic.
#[derive(Debug, Clone, Default)]
pub struct Cond(BTreeMap<String, Operand>);

impl Cond {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, replacing any previous value under the same key.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Operand>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The entries as constraints, in key order.
    pub fn constraints(&self) -> Vec<Constraint> {
        self.0
            .iter()
            .map(|(key, value)| Constraint {
                key: key.clone(),
                value: value.clone(),
            })
            .collect()
    }
}

/// How the children of a [`LogicalExpr`] are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogicalOp {
    /// A plain sequence; rendered like AND.
    #[default]
    None,
    And,
    Or,
}

/// An ordered tree of AND/OR-combined expressions.
#[derive(Debug, Clone, Default)]
pub struct LogicalExpr {
    pub op: LogicalOp,
    pub exprs: Vec<Expr>,
}

impl LogicalExpr {
    pub fn new(op: LogicalOp, exprs: Vec<Expr>) -> Self {
        Self { op, exprs }
    }

    /// `self AND expr`. Extends an existing AND group instead of nesting.
    pub fn and(self, expr: impl Into<Expr>) -> Self {
        self.combine(LogicalOp::And, expr.into())
    }

    /// `self OR expr`. Extends an existing OR group instead of nesting.
    pub fn or(self, expr: impl Into<Expr>) -> Self {
        self.combine(LogicalOp::Or, expr.into())
    }

    fn combine(mut self, op: LogicalOp, expr: Expr) -> Self {
        if self.op == op || (self.op == LogicalOp::None && self.exprs.len() <= 1) {
            self.op = op;
            self.exprs.push(expr);
            self
        } else {
            LogicalExpr::new(op, vec![Expr::Logical(self), expr])
        }
    }
}

/// `a AND b AND ...`
pub fn and<I, E>(exprs: I) -> LogicalExpr
where
    I: IntoIterator<Item = E>,
    E: Into<Expr>,
{
    LogicalExpr::new(LogicalOp::And, exprs.into_iter().map(Into::into).collect())
}

/// `a OR b OR ...`
pub fn or<I, E>(exprs: I) -> LogicalExpr
where
    I: IntoIterator<Item = E>,
    E: Into<Expr>,
{
    LogicalExpr::new(LogicalOp::Or, exprs.into_iter().map(Into::into).collect())
}

/// Every shape of condition input a builder accepts.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Raw SQL, `?` placeholders expanded against its args.
    Raw(RawExpr),
    Constraint(Constraint),
    Cond(Cond),
    Constraints(Vec<Constraint>),
    Logical(LogicalExpr),
    /// A nested query inlined as `(subquery)`.
    Subquery(Subquery),
    /// A bare value rendered as a literal.
    Literal(Value),
}

impl Expr {
    /// Interpret a positional argument list the way `where("...", args..)`
    /// does.
    ///
    /// A leading string containing `?` (or standing alone) is raw SQL with
    /// the remaining items as its arguments. A leading string without `?`
    /// followed by values is a `key, value[, value..]` constraint; more than
    /// one value binds the key to a list.
    pub fn positional(mut args: Vec<Arg>) -> SqlResult<Expr> {
        if args.is_empty() {
            return Ok(Expr::Logical(LogicalExpr::default()));
        }
        let rest = args.split_off(1);
        let first = args.remove(0);

        match first {
            Arg::Value(Value::Text(sql)) if rest.is_empty() || sql.contains('?') => {
                Ok(Expr::Raw(RawExpr::new(sql, rest)))
            }
            Arg::Value(Value::Text(key)) => {
                let mut rest = rest;
                let value = if rest.len() == 1 {
                    rest.remove(0)
                } else {
                    Arg::List(rest)
                };
                Ok(Expr::Constraint(Constraint::new(key, value)))
            }
            Arg::Raw(raw) if rest.is_empty() => Ok(Expr::Raw(raw)),
            Arg::Query(query) if rest.is_empty() => Ok(Expr::Subquery(query)),
            Arg::Value(value) if rest.is_empty() => Ok(Expr::Literal(value)),
            other => Err(SqlError::translation(format!(
                "unsupported positional condition starting with {other:?}"
            ))),
        }
    }

    /// `self AND expr`
    pub fn and(self, expr: impl Into<Expr>) -> LogicalExpr {
        LogicalExpr::from(self).and(expr)
    }

    /// `self OR expr`
    pub fn or(self, expr: impl Into<Expr>) -> LogicalExpr {
        LogicalExpr::from(self).or(expr)
    }
}

impl From<Expr> for LogicalExpr {
    fn from(expr: Expr) -> Self {
        match expr {
            Expr::Logical(logical) => logical,
            other => LogicalExpr::new(LogicalOp::None, vec![other]),
        }
    }
}

fn keyed(sql: String, args: Vec<Arg>) -> Expr {
    if sql.contains('?') {
        Expr::Raw(RawExpr::new(sql, args))
    } else {
        let mut args = args;
        let value = if args.len() == 1 {
            args.remove(0)
        } else {
            Arg::List(args)
        };
        Expr::Constraint(Constraint::new(sql, value))
    }
}

impl From<&str> for Expr {
    fn from(sql: &str) -> Self {
        Expr::Raw(RawExpr::new(sql, Vec::new()))
    }
}

impl From<String> for Expr {
    fn from(sql: String) -> Self {
        Expr::Raw(RawExpr::new(sql, Vec::new()))
    }
}

impl<A: Into<Arg>> From<(&str, A)> for Expr {
    fn from((sql, a): (&str, A)) -> Self {
        keyed(sql.to_string(), vec![a.into()])
    }
}

impl<A: Into<Arg>, B: Into<Arg>> From<(&str, A, B)> for Expr {
    fn from((sql, a, b): (&str, A, B)) -> Self {
        keyed(sql.to_string(), vec![a.into(), b.into()])
    }
}

impl From<RawExpr> for Expr {
    fn from(raw: RawExpr) -> Self {
        Expr::Raw(raw)
    }
}

impl From<Func> for Expr {
    fn from(func: Func) -> Self {
        Expr::Raw(func.into())
    }
}

impl From<Constraint> for Expr {
    fn from(c: Constraint) -> Self {
        Expr::Constraint(c)
    }
}

impl From<Vec<Constraint>> for Expr {
    fn from(c: Vec<Constraint>) -> Self {
        Expr::Constraints(c)
    }
}

impl From<Cond> for Expr {
    fn from(c: Cond) -> Self {
        Expr::Cond(c)
    }
}

impl From<LogicalExpr> for Expr {
    fn from(l: LogicalExpr) -> Self {
        Expr::Logical(l)
    }
}

impl From<Subquery> for Expr {
    fn from(q: Subquery) -> Self {
        Expr::Subquery(q)
    }
}

impl From<Value> for Expr {
    fn from(v: Value) -> Self {
        Expr::Literal(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;

    #[test]
    fn parse_inline_operators() {
        assert_eq!(Operator::parse(">="), Some(Operator::Gte));
        assert_eq!(Operator::parse("not  like"), Some(Operator::NotLike));
        assert_eq!(Operator::parse("!="), Some(Operator::NotEq));
        assert_eq!(Operator::parse("@>"), None);
    }

    #[test]
    fn cond_keys_are_sorted() {
        let c = Cond::new().with("z", 1).with("a", 2).with("m >", 3);
        let keys: Vec<_> = c.constraints().into_iter().map(|c| c.key).collect();
        assert_eq!(keys, vec!["a", "m >", "z"]);
    }

    #[test]
    fn positional_dispatch() {
        assert!(matches!(
            Expr::positional(args!["id = ?", 1]).unwrap(),
            Expr::Raw(r) if r.args.len() == 1
        ));
        assert!(matches!(
            Expr::positional(args!["active"]).unwrap(),
            Expr::Raw(r) if r.sql == "active"
        ));
        assert!(matches!(
            Expr::positional(args!["id", 1]).unwrap(),
            Expr::Constraint(c) if c.key == "id"
        ));
        assert!(matches!(
            Expr::positional(args!["id", 1, 2]).unwrap(),
            Expr::Constraint(Constraint {
                value: Operand::Arg(Arg::List(items)),
                ..
            }) if items.len() == 2
        ));
        assert!(Expr::positional(args![1, 2]).is_err());
    }

    #[test]
    fn chained_and_extends_group() {
        let expr = Expr::from("a").and("b").and("c");
        assert_eq!(expr.op, LogicalOp::And);
        assert_eq!(expr.exprs.len(), 3);

        let mixed = Expr::from("a").and("b").or("c");
        assert_eq!(mixed.op, LogicalOp::Or);
        assert_eq!(mixed.exprs.len(), 2);
        assert!(matches!(&mixed.exprs[0], Expr::Logical(l) if l.op == LogicalOp::And));
    }
}
