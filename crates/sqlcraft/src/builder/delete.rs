use super::chain::Chain;
use super::{Conditions, IntoFields};
use crate::ast::{
    Amend, Column, Columns, Fragment, Returning, Statement, StatementKind, Table, Tables,
};
use crate::condition::Expr;
use crate::error::{SqlError, SqlResult};
use crate::exec::impl_exec;
use crate::template::Template;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub(crate) struct DeleteQuery {
    table: Option<Table>,
    conditions: Conditions,
    returning: Vec<Column>,
    returning_args: Vec<Value>,
    amend: Option<Amend>,
}

impl DeleteQuery {
    fn finish(self) -> SqlResult<(Statement, Vec<Value>)> {
        let table = self
            .table
            .ok_or_else(|| SqlError::construction("delete has no table"))?;
        let statement = Statement::new(StatementKind::Delete)
            .with_table(Tables::new(vec![table]))
            .with_where(self.conditions.to_where())
            .with_returning(Returning::new(Columns::new(self.returning)))
            .with_amend(self.amend);
        let mut args = self.conditions.args().to_vec();
        args.extend(self.returning_args);
        Ok((statement, args))
    }
}

/// Persistent DELETE builder.
///
/// A delete without conditions removes every row; nothing guards against it.
#[derive(Clone)]
pub struct Deleter {
    template: Arc<Template>,
    chain: Chain<DeleteQuery>,
}

impl Deleter {
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
        F: Fn(&mut DeleteQuery) -> SqlResult<()> + Send + Sync + 'static,
    {
        Self {
            template: self.template.clone(),
            chain: self.chain.push(delta),
        }
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
        self.chain.replay(DeleteQuery::default())?.finish()
    }

    impl_exec!();
}

impl fmt::Debug for Deleter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deleter")
            .field("frames", &self.chain.len())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Deleter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sql = self.compile().map_err(|_| fmt::Error)?;
        f.write_str(&sql)
    }
}
