use super::chain::Chain;
use super::{Conditions, IntoFields};
use crate::arg::{Arg, RawExpr};
use crate::ast::{
    Amend, Assignment, Column, ColumnValue, ColumnValues, Columns, Fragment, OperatorToken, Raw,
    Returning, Statement, StatementKind, Table, Tables,
};
use crate::condition::Expr;
use crate::error::{SqlError, SqlResult};
use crate::exec::impl_exec;
use crate::expand::expand;
use crate::template::Template;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub(crate) struct UpdateQuery {
    table: Option<Table>,
    assignments: Vec<Assignment>,
    set_args: Vec<Value>,
    conditions: Conditions,
    returning: Vec<Column>,
    returning_args: Vec<Value>,
    amend: Option<Amend>,
}

impl UpdateQuery {
    fn assign(&mut self, column: &str, value: &Arg) -> SqlResult<()> {
        let (sql, args) = expand("?", std::slice::from_ref(value))?;
        self.assignments
            .push(ColumnValue::assign(Column::new(column), Raw::new(sql)));
        self.set_args.extend(args);
        Ok(())
    }

    fn finish(self) -> SqlResult<(Statement, Vec<Value>)> {
        let table = self
            .table
            .ok_or_else(|| SqlError::construction("update has no table"))?;
        let statement = Statement::new(StatementKind::Update)
            .with_table(Tables::new(vec![table]))
            .with_column_values(ColumnValues::new(self.assignments))
            .with_where(self.conditions.to_where())
            .with_returning(Returning::new(Columns::new(self.returning)))
            .with_amend(self.amend);
        let mut args = self.set_args;
        args.extend_from_slice(self.conditions.args());
        args.extend(self.returning_args);
        Ok((statement, args))
    }
}

/// Persistent UPDATE builder.
#[derive(Clone)]
pub struct Updater {
    template: Arc<Template>,
    chain: Chain<UpdateQuery>,
}

impl Updater {
    pub(crate) fn new(template: Arc<Template>, table: &str) -> Self {
        let table = Table::new(table);
        Self {
            template,
            chain: Chain::default(),
        }
        .push(move |q| {
            q.table = Some(table.clone());
            Ok(())
        })
    }

    fn push<F>(&self, delta: F) -> Self
    where
        F: Fn(&mut UpdateQuery) -> SqlResult<()> + Send + Sync + 'static,
    {
        Self {
            template: self.template.clone(),
            chain: self.chain.push(delta),
        }
    }

    /// `SET column = value`
    pub fn set(&self, column: &str, value: impl Into<Arg>) -> Self {
        let column = column.to_string();
        let value = value.into();
        self.push(move |q| q.assign(&column, &value))
    }

    /// A whole assignment written by hand, e.g.
    /// `set_raw(raw!("hits = hits + ?", 1))`.
    pub fn set_raw(&self, expr: impl Into<RawExpr>) -> Self {
        let expr = expr.into();
        self.push(move |q| {
            let (sql, args) = expand(&expr.sql, &expr.args)?;
            q.assignments.push(ColumnValue::new(
                Column::raw(sql),
                OperatorToken::Custom(String::new()),
                Raw::default(),
            ));
            q.set_args.extend(args);
            Ok(())
        })
    }

    /// `SET` from `(column, value)` pairs.
    pub fn set_pairs<I, K, V>(&self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Arg>,
    {
        let pairs: Vec<(String, Arg)> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.push(move |q| {
            for (column, value) in &pairs {
                q.assign(column, value)?;
            }
            Ok(())
        })
    }

    /// `SET` from an alternating `column, value, column, value, ..` list.
    ///
    /// An odd number of items or a non-text column is recorded as an error.
    pub fn set_list(&self, items: Vec<Arg>) -> Self {
        self.push(move |q| {
            if items.len() % 2 != 0 {
                return Err(SqlError::construction(format!(
                    "set_list expects column/value pairs, got {} items",
                    items.len()
                )));
            }
            for pair in items.chunks_exact(2) {
                let column = match &pair[0] {
                    Arg::Value(Value::Text(column)) => column,
                    other => {
                        return Err(SqlError::construction(format!(
                            "set_list column must be text, got {other:?}"
                        )));
                    }
                };
                q.assign(column, &pair[1])?;
            }
            Ok(())
        })
    }

    /// Replace every condition recorded so far with `expr`.
    pub fn r#where(&self, expr: impl Into<Expr>) -> Self {
        let expr = expr.into();
        self.push(move |q| q.conditions.replace(&expr))
    }

    pub fn and(&self, expr: impl Into<Expr>) -> Self {
        let expr = expr.into();
        self.push(move |q| q.conditions.add(&expr))
    }

    pub fn returning(&self, columns: impl IntoFields) -> Self {
        let fields = columns.into_fields();
        self.push(move |q| {
            for field in fields.iter().cloned() {
                let (column, args) = field.into_column()?;
                q.returning.push(column);
                q.returning_args.extend(args);
            }
            Ok(())
        })
    }

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

    pub fn statement(&self) -> SqlResult<Statement> {
        Ok(self.finish()?.0)
    }

    pub fn compile(&self) -> SqlResult<String> {
        Ok(self.build()?.0)
    }

    pub fn arguments(&self) -> SqlResult<Vec<Value>> {
        Ok(self.finish()?.1)
    }

    pub fn build(&self) -> SqlResult<(String, Vec<Value>)> {
        let (statement, args) = self.finish()?;
        Ok((statement.compile(&self.template)?, args))
    }

    fn finish(&self) -> SqlResult<(Statement, Vec<Value>)> {
        self.chain.replay(UpdateQuery::default())?.finish()
    }

    impl_exec!();
}

impl fmt::Debug for Updater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Updater")
            .field("frames", &self.chain.len())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Updater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sql = self.compile().map_err(|_| fmt::Error)?;
        f.write_str(&sql)
    }
}
