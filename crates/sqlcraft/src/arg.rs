//! Positional arguments as supplied by callers, before expansion.
//!
//! An [`Arg`] is what sits behind a single `?` in caller-written SQL. Unlike a
//! [`Value`], it may still be structured: a list that expands into
//! `(?, ?, ?)`, a raw SQL fragment carrying its own arguments, or a nested
//! query that is inlined as a parenthesized subquery.

use crate::error::SqlResult;
use crate::value::{Value, for_each_scalar};
use std::fmt;
use std::sync::Arc;

/// Anything that compiles to SQL text plus its bind arguments.
///
/// Builders implement this so they can be nested inside other queries.
pub trait Compilable: Send + Sync {
    /// Compile to SQL text with `?` placeholders.
    fn compile(&self) -> SqlResult<String>;

    /// Bind arguments aligned with the placeholders of [`compile`](Self::compile).
    fn arguments(&self) -> SqlResult<Vec<Value>>;
}

/// A shared handle to a nested query.
#[derive(Clone)]
pub struct Subquery(Arc<dyn Compilable>);

impl Subquery {
    pub fn new<C: Compilable + 'static>(query: C) -> Self {
        Self(Arc::new(query))
    }

    /// Compile the nested query wrapped in parentheses.
    pub fn compile_grouped(&self) -> SqlResult<(String, Vec<Value>)> {
        let sql = self.0.compile()?;
        let args = self.0.arguments()?;
        Ok((format!("({sql})"), args))
    }
}

impl Compilable for Subquery {
    fn compile(&self) -> SqlResult<String> {
        self.0.compile()
    }

    fn arguments(&self) -> SqlResult<Vec<Value>> {
        self.0.arguments()
    }
}

impl fmt::Debug for Subquery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.compile() {
            Ok(sql) => f.debug_tuple("Subquery").field(&sql).finish(),
            Err(_) => f.write_str("Subquery(<invalid>)"),
        }
    }
}

/// Raw SQL with its own positional arguments.
///
/// The text may contain further `?` placeholders; they are expanded against
/// `args` wherever the fragment is inlined.
#[derive(Debug, Clone)]
pub struct RawExpr {
    pub sql: String,
    pub args: Vec<Arg>,
}

impl RawExpr {
    pub fn new(sql: impl Into<String>, args: Vec<Arg>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }
}

/// A SQL function call, e.g. `Func::new("COALESCE", args![name, "n/a"])`.
///
/// Compiles as `COALESCE(?, ?)` bound to the given arguments.
#[derive(Debug, Clone)]
pub struct Func {
    pub name: String,
    pub args: Vec<Arg>,
}

impl Func {
    pub fn new(name: impl Into<String>, args: Vec<Arg>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

impl From<Func> for RawExpr {
    fn from(func: Func) -> Self {
        let placeholders = vec!["?"; func.args.len()].join(", ");
        RawExpr::new(format!("{}({})", func.name, placeholders), func.args)
    }
}

/// One positional argument.
#[derive(Debug, Clone)]
pub enum Arg {
    /// A plain bind value.
    Value(Value),
    /// Expands into a parenthesized placeholder group.
    List(Vec<Arg>),
    /// Raw SQL inlined in place of the placeholder.
    Raw(RawExpr),
    /// A nested query inlined as `(subquery)`.
    Query(Subquery),
}

impl Arg {
    /// The plain value, if this argument is one.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Arg::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Arg::Value(Value::Null))
    }
}

macro_rules! arg_from_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Arg {
                fn from(v: $ty) -> Self {
                    Arg::Value(Value::from(v))
                }
            }
        )*
    };
}

for_each_scalar!(arg_from_scalar);

impl From<Value> for Arg {
    fn from(v: Value) -> Self {
        Arg::Value(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Arg {
    fn from(v: Option<T>) -> Self {
        Arg::Value(v.map_or(Value::Null, Into::into))
    }
}

impl<T: Into<Arg>> From<Vec<T>> for Arg {
    fn from(items: Vec<T>) -> Self {
        Arg::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Arg>, const N: usize> From<[T; N]> for Arg {
    fn from(items: [T; N]) -> Self {
        Arg::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<RawExpr> for Arg {
    fn from(raw: RawExpr) -> Self {
        Arg::Raw(raw)
    }
}

impl From<Func> for Arg {
    fn from(func: Func) -> Self {
        Arg::Raw(func.into())
    }
}

impl From<Subquery> for Arg {
    fn from(query: Subquery) -> Self {
        Arg::Query(query)
    }
}

/// Build a `Vec<Arg>` from heterogeneous values.
///
/// ```ignore
/// let args = args![1, "alice", vec![2, 3], None::<i32>];
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Arg>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::Arg::from($value)),+]
    };
}

/// Build a [`RawExpr`](crate::RawExpr): `raw!("lower(?)", name)`.
#[macro_export]
macro_rules! raw {
    ($sql:expr) => {
        $crate::RawExpr::new($sql, ::std::vec::Vec::new())
    };
    ($sql:expr, $($value:expr),+ $(,)?) => {
        $crate::RawExpr::new($sql, $crate::args![$($value),+])
    };
}

/// Build a [`Cond`](crate::Cond) map literal.
///
/// ```ignore
/// let c = cond! { "status" => "active", "age >=" => 18 };
/// ```
#[macro_export]
macro_rules! cond {
    () => {
        $crate::Cond::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        $crate::Cond::new()$(.with($key, $value))+
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn func_becomes_raw_call() {
        let raw: RawExpr = Func::new("COALESCE", args!["a", 1]).into();
        assert_eq!(raw.sql, "COALESCE(?, ?)");
        assert_eq!(raw.args.len(), 2);
    }

    #[test]
    fn nested_vectors_become_lists() {
        let arg = Arg::from(vec![vec![1, 2], vec![3]]);
        match arg {
            Arg::List(outer) => {
                assert_eq!(outer.len(), 2);
                assert!(matches!(&outer[0], Arg::List(inner) if inner.len() == 2));
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn none_is_null() {
        assert!(Arg::from(None::<i64>).is_null());
        assert!(!Arg::from(0).is_null());
    }
}
