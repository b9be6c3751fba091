use super::chain::Chain;
use super::{Conditions, Field, IntoFields, Paginator};
use crate::arg::{Arg, Compilable, Subquery};
use crate::ast::{
    Amend, Column, Columns, Fragment, GroupBy, Join, JoinKind, Joins, On, OrderBy, SortColumn,
    Statement, StatementKind, Table, Tables, Using,
};
use crate::condition::{Expr, Operand};
use crate::error::{SqlError, SqlResult};
use crate::exec::impl_exec;
use crate::template::Template;
use crate::translate::to_predicate;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Accumulated SELECT state.
///
/// Arguments are kept per clause and concatenated in render order, so the
/// order methods were called in never matters.
#[derive(Debug, Clone, Default)]
pub(crate) struct SelectQuery {
    columns: Vec<Column>,
    column_args: Vec<Value>,
    tables: Vec<Table>,
    table_args: Vec<Value>,
    joins: Vec<Join>,
    join_args: Vec<Value>,
    conditions: Conditions,
    group_by: Vec<Column>,
    group_args: Vec<Value>,
    pub(crate) order_by: Vec<SortColumn>,
    order_args: Vec<Value>,
    distinct: bool,
    limit: Option<u64>,
    offset: Option<u64>,
    amend: Option<Amend>,
}

impl SelectQuery {
    fn last_join(&mut self, method: &str) -> SqlResult<&mut Join> {
        let join = self
            .joins
            .last_mut()
            .ok_or_else(|| SqlError::construction(format!("{method}() called without a join")))?;
        if join.is_constrained() {
            return Err(SqlError::construction(format!(
                "{method}() called on a join that already has ON or USING"
            )));
        }
        Ok(join)
    }

    fn arguments(&self) -> Vec<Value> {
        [
            self.column_args.as_slice(),
            self.table_args.as_slice(),
            self.join_args.as_slice(),
            self.conditions.args(),
            self.group_args.as_slice(),
            self.order_args.as_slice(),
        ]
        .into_iter()
        .flatten()
        .cloned()
        .collect()
    }

    fn statement(&self) -> Statement {
        Statement::new(StatementKind::Select)
            .with_columns(Columns::new(self.columns.clone()))
            .with_table(Tables::new(self.tables.clone()))
            .with_joins(Joins::new(self.joins.clone()))
            .with_where(self.conditions.to_where())
            .with_group_by(GroupBy::new(Columns::new(self.group_by.clone())))
            .with_order_by(OrderBy::new(self.order_by.clone()))
            .with_limit(self.limit)
            .with_offset(self.offset)
            .with_distinct(self.distinct)
            .with_amend(self.amend.clone())
    }

    /// `SELECT COUNT(1) AS _t ...` over the same rows, ignoring ordering and
    /// paging. Queries whose row set a plain count cannot reproduce are
    /// wrapped as a derived table.
    fn count(&self, template: &Template) -> SqlResult<(String, Vec<Value>)> {
        if !self.joins.is_empty() || !self.group_by.is_empty() || self.distinct {
            let inner = Self {
                order_by: Vec::new(),
                order_args: Vec::new(),
                limit: None,
                offset: None,
                amend: None,
                ..self.clone()
            };
            let sql = inner.statement().compile(template)?;
            let table = Table::raw(format!("({sql})")).with_alias("_c");
            let count = Statement::new(StatementKind::Count).with_table(Tables::new(vec![table]));
            return Ok((count.compile(template)?, inner.arguments()));
        }

        let count = Statement::new(StatementKind::Count)
            .with_table(Tables::new(self.tables.clone()))
            .with_where(self.conditions.to_where());
        let mut args = self.table_args.clone();
        args.extend_from_slice(self.conditions.args());
        Ok((count.compile(template)?, args))
    }
}

/// Persistent SELECT builder.
///
/// Cloning is cheap and every method returns a new value; see the
/// [module docs](crate::builder).
#[derive(Clone)]
pub struct Selector {
    template: Arc<Template>,
    chain: Chain<SelectQuery>,
}

impl Selector {
    pub(crate) fn new(template: Arc<Template>) -> Self {
        Self {
            template,
            chain: Chain::default(),
        }
    }

    pub(crate) fn push<F>(&self, delta: F) -> Self
    where
        F: Fn(&mut SelectQuery) -> SqlResult<()> + Send + Sync + 'static,
    {
        Self {
            template: self.template.clone(),
            chain: self.chain.push(delta),
        }
    }

    pub(crate) fn template(&self) -> &Arc<Template> {
        &self.template
    }

    /// Add result columns. No columns means `*`.
    pub fn columns(&self, fields: impl IntoFields) -> Self {
        let fields = fields.into_fields();
        self.push(move |q| {
            for field in fields.iter().cloned() {
                let (column, args) = field.into_column()?;
                q.columns.push(column);
                q.column_args.extend(args);
            }
            Ok(())
        })
    }

    /// Add tables (or derived tables) to the FROM list.
    pub fn from(&self, tables: impl IntoFields) -> Self {
        let tables = tables.into_fields();
        self.push(move |q| {
            for field in tables.iter().cloned() {
                let (table, args) = field.into_table()?;
                q.tables.push(table);
                q.table_args.extend(args);
            }
            Ok(())
        })
    }

    pub fn distinct(&self) -> Self {
        self.push(|q| {
            q.distinct = true;
            Ok(())
        })
    }

    /// Alias the most recently added table.
    pub fn alias(&self, alias: impl Into<String>) -> Self {
        let alias = alias.into();
        self.push(move |q| {
            let table = q.tables.last_mut().ok_or_else(|| {
                SqlError::construction(format!("alias {alias:?} set without a table"))
            })?;
            *table = table.with_alias(alias.clone());
            Ok(())
        })
    }

    /// Replace every condition recorded so far with `expr`.
    pub fn r#where(&self, expr: impl Into<Expr>) -> Self {
        let expr = expr.into();
        self.push(move |q| q.conditions.replace(&expr))
    }

    /// Add `expr` to the existing conditions.
    pub fn and(&self, expr: impl Into<Expr>) -> Self {
        let expr = expr.into();
        self.push(move |q| q.conditions.add(&expr))
    }

    pub fn join(&self, table: impl Into<Field>) -> Self {
        self.join_kind(JoinKind::Join, table.into())
    }

    pub fn inner_join(&self, table: impl Into<Field>) -> Self {
        self.join_kind(JoinKind::Inner, table.into())
    }

    pub fn left_join(&self, table: impl Into<Field>) -> Self {
        self.join_kind(JoinKind::Left, table.into())
    }

    pub fn right_join(&self, table: impl Into<Field>) -> Self {
        self.join_kind(JoinKind::Right, table.into())
    }

    pub fn full_join(&self, table: impl Into<Field>) -> Self {
        self.join_kind(JoinKind::Full, table.into())
    }

    pub fn cross_join(&self, table: impl Into<Field>) -> Self {
        self.join_kind(JoinKind::Cross, table.into())
    }

    fn join_kind(&self, kind: JoinKind, table: Field) -> Self {
        self.push(move |q| {
            let (table, args) = table.clone().into_table()?;
            q.joins.push(Join::new(kind, table));
            q.join_args.extend(args);
            Ok(())
        })
    }

    /// `ON expr` for the most recent join.
    pub fn on(&self, expr: impl Into<Expr>) -> Self {
        let expr = expr.into();
        self.push(move |q| {
            let (predicate, args) = to_predicate(&expr)?;
            let join = q.last_join("on")?;
            *join = join.with_on(On::new(vec![predicate]));
            q.join_args.extend(args);
            Ok(())
        })
    }

    /// `USING (columns)` for the most recent join.
    pub fn using(&self, columns: impl IntoFields) -> Self {
        let fields = columns.into_fields();
        self.push(move |q| {
            let mut columns = Vec::with_capacity(fields.len());
            let mut args = Vec::new();
            for field in fields.iter().cloned() {
                let (column, column_args) = field.into_column()?;
                columns.push(column);
                args.extend(column_args);
            }
            let join = q.last_join("using")?;
            *join = join.with_using(Using::new(Columns::new(columns)));
            q.join_args.extend(args);
            Ok(())
        })
    }

    pub fn group_by(&self, fields: impl IntoFields) -> Self {
        let fields = fields.into_fields();
        self.push(move |q| {
            for field in fields.iter().cloned() {
                let (column, args) = field.into_column()?;
                q.group_by.push(column);
                q.group_args.extend(args);
            }
            Ok(())
        })
    }

    /// Add sort terms: `"name"`, `"-created_at"`, `"score DESC"`, or raw
    /// expressions.
    pub fn order_by(&self, fields: impl IntoFields) -> Self {
        let fields = fields.into_fields();
        self.push(move |q| {
            for field in fields.iter().cloned() {
                match field {
                    Field::Name(name) => q.order_by.push(SortColumn::parse(&name)),
                    other => {
                        let (column, args) = other.into_column()?;
                        q.order_by.push(SortColumn::new(column, None));
                        q.order_args.extend(args);
                    }
                }
            }
            Ok(())
        })
    }

    pub fn limit(&self, limit: u64) -> Self {
        self.push(move |q| {
            q.limit = Some(limit);
            Ok(())
        })
    }

    pub fn offset(&self, offset: u64) -> Self {
        self.push(move |q| {
            q.offset = Some(offset);
            Ok(())
        })
    }

    /// Transform the final SQL text, e.g. to append `FOR UPDATE`.
    pub fn amend<F>(&self, f: F) -> Self
    where
        F: Fn(String) -> String + Send + Sync + 'static,
    {
        let amend = Amend::new(f);
        self.push(move |q| {
            q.amend = Some(amend.clone());
            Ok(())
        })
    }

    /// Page through the results, `per_page` rows at a time.
    pub fn paginate(&self, per_page: u64) -> Paginator {
        Paginator::new(self.clone(), per_page)
    }

    pub(crate) fn replay(&self) -> SqlResult<SelectQuery> {
        self.chain.replay(SelectQuery::default())
    }

    /// The fragment tree this chain describes.
    pub fn statement(&self) -> SqlResult<Statement> {
        Ok(self.replay()?.statement())
    }

    pub fn compile(&self) -> SqlResult<String> {
        self.statement()?.compile(&self.template)
    }

    pub fn arguments(&self) -> SqlResult<Vec<Value>> {
        Ok(self.replay()?.arguments())
    }

    /// SQL text and its bind values from a single replay.
    pub fn build(&self) -> SqlResult<(String, Vec<Value>)> {
        let query = self.replay()?;
        let sql = query.statement().compile(&self.template)?;
        Ok((sql, query.arguments()))
    }

    /// The row count query used for pagination totals.
    pub(crate) fn count_query(&self) -> SqlResult<(String, Vec<Value>)> {
        self.replay()?.count(&self.template)
    }

    impl_exec!(rows);
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector")
            .field("frames", &self.chain.len())
            .finish_non_exhaustive()
    }
}

/// Renders the compiled SQL. A deferred construction error is reported as
/// [`fmt::Error`], so `to_string()` panics on it; use
/// [`compile`](Selector::compile) to handle errors.
impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sql = self.compile().map_err(|_| fmt::Error)?;
        f.write_str(&sql)
    }
}

impl Compilable for Selector {
    fn compile(&self) -> SqlResult<String> {
        Selector::compile(self)
    }

    fn arguments(&self) -> SqlResult<Vec<Value>> {
        Selector::arguments(self)
    }
}

impl From<Selector> for Subquery {
    fn from(query: Selector) -> Self {
        Subquery::new(query)
    }
}

impl From<Selector> for Arg {
    fn from(query: Selector) -> Self {
        Arg::Query(query.into())
    }
}

impl From<Selector> for Operand {
    fn from(query: Selector) -> Self {
        Operand::Arg(query.into())
    }
}

impl From<Selector> for Expr {
    fn from(query: Selector) -> Self {
        Expr::Subquery(query.into())
    }
}

impl From<Selector> for Field {
    fn from(query: Selector) -> Self {
        Field::Query {
            query: query.into(),
            alias: None,
        }
    }
}
