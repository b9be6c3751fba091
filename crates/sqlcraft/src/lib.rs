//! # sqlcraft
//!
//! A database-agnostic SQL construction engine.
//!
//! ## Features
//!
//! - **Fragment AST**: every statement is a tree of small nodes that compile
//!   through per-dialect templates
//! - **Compile cache**: identical fragments compile once per template (LRU,
//!   keyed by a content hash)
//! - **Persistent builders**: each fluent call returns a new builder, so a
//!   shared prefix can branch freely and cross threads
//! - **Condition maps**: `cond! { "age >=" => 18 }` style maps, comparisons and
//!   nested `and`/`or` groups translate to parenthesized WHERE terms
//! - **Recursive `?` expansion**: lists, raw fragments and subqueries are
//!   inlined at their placeholder with their arguments in order
//! - **Executor boundary**: terminals hand SQL and values to any [`Executor`];
//!   tokio-postgres clients implement it behind the `postgres` feature
//!
//! ## Quick start
//!
//! ```ignore
//! use sqlcraft::{Dialect, SqlBuilder, cond, gte};
//!
//! let sql = SqlBuilder::dialect(Dialect::Postgres)?;
//!
//! let (query, args) = sql
//!     .select(["id", "name"])
//!     .from("users")
//!     .r#where(cond! { "status" => "active", "age" => gte(18) })
//!     .order_by("-created_at")
//!     .limit(10)
//!     .build()?;
//!
//! let affected = sql
//!     .update("users")
//!     .set("status", "inactive")
//!     .r#where(cond! { "id" => 7 })
//!     .exec(&client)
//!     .await?;
//! ```

pub mod arg;
pub mod ast;
pub mod builder;
pub mod cache;
pub mod condition;
pub mod dialect;
pub mod error;
pub mod exec;
pub mod expand;
pub mod row;
pub mod template;
pub mod translate;
pub mod value;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use arg::{Arg, Compilable, Func, RawExpr, Subquery};
pub use builder::{
    Deleter, Field, Inserter, IntoArgs, IntoFields, Paginator, Selector, SqlBuilder, Updater,
};
pub use cache::CompileCache;
pub use condition::{
    Comparison, Cond, Constraint, Expr, LogicalExpr, LogicalOp, Operand, Operator, and, between,
    eq, gt, gte, is, is_in, is_not, is_not_null, is_null, like, lt, lte, not_between, not_eq,
    not_in, not_like, not_regexp, op, or, regexp,
};
pub use dialect::{Dialect, DialectSpec};
pub use error::{SqlError, SqlResult};
pub use exec::{Executor, NoopTyper, ResultMapper, Typer};
pub use expand::expand;
pub use row::{FromRow, Row};
pub use template::{Clause, Template, TemplateOptions};
pub use translate::to_where;
pub use value::{FromValue, Value};

#[cfg(feature = "derive")]
pub use sqlcraft_derive::FromRow;
