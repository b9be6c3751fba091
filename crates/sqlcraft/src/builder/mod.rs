//! Persistent query builders.
//!
//! Every builder is a cheap handle over a shared [`Template`] and an
//! immutable chain of recorded mutations. Fluent methods never change the
//! receiver: they return a new builder whose chain has one more frame, so a
//! common prefix can be extended in several directions (even across
//! threads) without any variant seeing another's changes.
//!
//! Mistakes such as a second `on()` for the same join are recorded and
//! surface when the chain is replayed by a terminal (`compile`, `arguments`,
//! `build`, `exec`, ...). The first failing frame wins.
//!
//! ## Example
//! ```ignore
//! use sqlcraft::{Dialect, SqlBuilder, TemplateOptions, cond};
//!
//! let sql = SqlBuilder::new(Dialect::Postgres.template(TemplateOptions::default())?);
//! let active = sql.select(["id", "name"]).from("users").r#where(cond! { "active" => true });
//! let recent = active.order_by("-created_at").limit(10);
//!
//! assert_eq!(
//!     recent.compile()?,
//!     r#"SELECT "id", "name" FROM "users" WHERE "active" = ? ORDER BY "created_at" DESC LIMIT 10"#
//! );
//! ```

mod chain;
mod delete;
mod insert;
mod paginate;
mod select;
mod update;

pub use delete::Deleter;
pub use insert::Inserter;
pub use paginate::Paginator;
pub use select::Selector;
pub use update::Updater;

use crate::arg::{Arg, Func, RawExpr, Subquery};
use crate::ast::{
    Column, Database, Fragment, Predicate, Statement, StatementKind, Table, Tables, Where,
};
use crate::condition::Expr;
use crate::dialect::Dialect;
use crate::error::SqlResult;
use crate::expand::expand;
use crate::template::{Template, TemplateOptions};
use crate::translate::to_predicate;
use crate::value::{Value, for_each_scalar};
use std::sync::Arc;

/// Entry point for building statements against one dialect.
#[derive(Debug, Clone)]
pub struct SqlBuilder {
    template: Arc<Template>,
}

impl SqlBuilder {
    pub fn new(template: Template) -> Self {
        Self {
            template: Arc::new(template),
        }
    }

    /// Share an existing template (and its compilation cache).
    pub fn with_template(template: Arc<Template>) -> Self {
        Self { template }
    }

    /// A builder over a built-in dialect with default options.
    pub fn dialect(dialect: Dialect) -> SqlResult<Self> {
        Ok(Self::new(dialect.template(TemplateOptions::default())?))
    }

    pub fn template(&self) -> &Arc<Template> {
        &self.template
    }

    /// `SELECT fields`
    pub fn select(&self, fields: impl IntoFields) -> Selector {
        Selector::new(self.template.clone()).columns(fields)
    }

    /// `SELECT * FROM tables`
    pub fn select_from(&self, tables: impl IntoFields) -> Selector {
        Selector::new(self.template.clone()).from(tables)
    }

    pub fn insert_into(&self, table: &str) -> Inserter {
        Inserter::new(self.template.clone(), table)
    }

    pub fn update(&self, table: &str) -> Updater {
        Updater::new(self.template.clone(), table)
    }

    pub fn delete_from(&self, table: &str) -> Deleter {
        Deleter::new(self.template.clone(), table)
    }

    /// `TRUNCATE TABLE table`, compiled immediately.
    pub fn truncate(&self, table: &str) -> SqlResult<String> {
        self.one_shot(StatementKind::Truncate, table)
    }

    /// `DROP TABLE table`, compiled immediately.
    pub fn drop_table(&self, table: &str) -> SqlResult<String> {
        self.one_shot(StatementKind::DropTable, table)
    }

    /// `DROP DATABASE name`, compiled immediately.
    pub fn drop_database(&self, name: &str) -> SqlResult<String> {
        Statement::new(StatementKind::DropDatabase)
            .with_database(Some(Database::new(name)))
            .compile(&self.template)
    }

    fn one_shot(&self, kind: StatementKind, table: &str) -> SqlResult<String> {
        Statement::new(kind)
            .with_table(Tables::new(vec![Table::new(table)]))
            .compile(&self.template)
    }
}

/// WHERE terms plus the values they bind.
#[derive(Debug, Clone, Default)]
pub(crate) struct Conditions {
    items: Vec<Predicate>,
    args: Vec<Value>,
}

impl Conditions {
    /// Drop everything recorded so far, then add `expr`.
    pub(crate) fn replace(&mut self, expr: &Expr) -> SqlResult<()> {
        self.items.clear();
        self.args.clear();
        self.add(expr)
    }

    pub(crate) fn add(&mut self, expr: &Expr) -> SqlResult<()> {
        let (predicate, args) = to_predicate(expr)?;
        if !predicate.is_empty() {
            self.items.push(predicate);
            self.args.extend(args);
        }
        Ok(())
    }

    pub(crate) fn to_where(&self) -> Where {
        Where::new(self.items.clone())
    }

    pub(crate) fn args(&self) -> &[Value] {
        &self.args
    }
}

/// A column or table term: a name, a raw expression, or a nested query.
#[derive(Debug, Clone)]
pub enum Field {
    /// Parsed as a (possibly qualified, possibly aliased) reference.
    Name(String),
    /// Emitted verbatim after placeholder expansion.
    Raw(RawExpr),
    /// Inlined as `(subquery) AS alias`.
    Query {
        query: Subquery,
        alias: Option<String>,
    },
}

impl Field {
    /// A nested query with an alias, e.g. a derived table.
    pub fn query(query: impl Into<Subquery>, alias: impl Into<String>) -> Self {
        Field::Query {
            query: query.into(),
            alias: Some(alias.into()),
        }
    }

    /// Lower into a column reference plus the values it binds.
    pub(crate) fn into_column(self) -> SqlResult<(Column, Vec<Value>)> {
        match self {
            Field::Name(name) => Ok((Column::new(&name), Vec::new())),
            Field::Raw(raw) => {
                let (sql, args) = expand(&raw.sql, &raw.args)?;
                Ok((Column::raw(sql), args))
            }
            Field::Query { query, alias } => {
                let (sql, args) = query.compile_grouped()?;
                let column = Column::raw(sql);
                Ok(match alias {
                    Some(alias) => (column.with_alias(alias), args),
                    None => (column, args),
                })
            }
        }
    }

    /// Lower into a table reference plus the values it binds.
    pub(crate) fn into_table(self) -> SqlResult<(Table, Vec<Value>)> {
        match self {
            Field::Name(name) => Ok((Table::new(&name), Vec::new())),
            Field::Raw(raw) => {
                let (sql, args) = expand(&raw.sql, &raw.args)?;
                Ok((Table::raw(sql), args))
            }
            Field::Query { query, alias } => {
                let (sql, args) = query.compile_grouped()?;
                let table = Table::raw(sql);
                Ok(match alias {
                    Some(alias) => (table.with_alias(alias), args),
                    None => (table, args),
                })
            }
        }
    }
}

impl From<&str> for Field {
    fn from(name: &str) -> Self {
        Field::Name(name.to_string())
    }
}

impl From<String> for Field {
    fn from(name: String) -> Self {
        Field::Name(name)
    }
}

impl From<&String> for Field {
    fn from(name: &String) -> Self {
        Field::Name(name.clone())
    }
}

impl From<RawExpr> for Field {
    fn from(raw: RawExpr) -> Self {
        Field::Raw(raw)
    }
}

impl From<Func> for Field {
    fn from(func: Func) -> Self {
        Field::Raw(func.into())
    }
}

impl From<Subquery> for Field {
    fn from(query: Subquery) -> Self {
        Field::Query { query, alias: None }
    }
}

/// One or more [`Field`]s.
pub trait IntoFields {
    fn into_fields(self) -> Vec<Field>;
}

macro_rules! into_single_field {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoFields for $ty {
                fn into_fields(self) -> Vec<Field> {
                    vec![Field::from(self)]
                }
            }
        )*
    };
}

into_single_field!(&str, String, &String, Field, RawExpr, Func, Subquery, Selector);

impl<T: Into<Field>> IntoFields for Vec<T> {
    fn into_fields(self) -> Vec<Field> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<T: Into<Field>, const N: usize> IntoFields for [T; N] {
    fn into_fields(self) -> Vec<Field> {
        self.into_iter().map(Into::into).collect()
    }
}

impl IntoFields for &[&str] {
    fn into_fields(self) -> Vec<Field> {
        self.iter().map(|name| Field::from(*name)).collect()
    }
}

/// No fields: `SELECT *`.
impl IntoFields for () {
    fn into_fields(self) -> Vec<Field> {
        Vec::new()
    }
}

/// One row of positional values: a single value or an [`args!`](crate::args) list.
pub trait IntoArgs {
    fn into_args(self) -> Vec<Arg>;
}

macro_rules! into_single_arg {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoArgs for $ty {
                fn into_args(self) -> Vec<Arg> {
                    vec![Arg::from(self)]
                }
            }
        )*
    };
}

for_each_scalar!(into_single_arg);
into_single_arg!(Value, Arg, RawExpr, Func, Subquery, Selector);

impl<T: Into<Value>> IntoArgs for Option<T> {
    fn into_args(self) -> Vec<Arg> {
        vec![Arg::from(self)]
    }
}

impl IntoArgs for Vec<Arg> {
    fn into_args(self) -> Vec<Arg> {
        self
    }
}

impl<const N: usize> IntoArgs for [Arg; N] {
    fn into_args(self) -> Vec<Arg> {
        self.into()
    }
}

#[cfg(test)]
mod tests;
