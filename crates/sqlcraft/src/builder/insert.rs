use super::chain::Chain;
use super::{IntoArgs, IntoFields};
use crate::arg::Arg;
use crate::ast::{
    Amend, Column, Columns, Fragment, Raw, Returning, Statement, StatementKind, Table, Tables,
    ValueGroup, ValueGroups,
};
use crate::error::{SqlError, SqlResult};
use crate::exec::impl_exec;
use crate::expand::expand;
use crate::template::Template;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub(crate) struct InsertQuery {
    table: Option<Table>,
    columns: Vec<Column>,
    rows: Vec<Vec<Arg>>,
    returning: Vec<Column>,
    returning_args: Vec<Value>,
    amend: Option<Amend>,
}

impl InsertQuery {
    fn finish(self) -> SqlResult<(Statement, Vec<Value>)> {
        let table = self
            .table
            .ok_or_else(|| SqlError::construction("insert has no table"))?;

        if self.rows.is_empty() && !self.columns.is_empty() {
            return Err(SqlError::construction(
                "insert lists columns but has no values",
            ));
        }

        let width = if self.columns.is_empty() {
            self.rows.first().map_or(0, Vec::len)
        } else {
            self.columns.len()
        };

        let mut groups = Vec::with_capacity(self.rows.len());
        let mut args = Vec::new();
        for (index, row) in self.rows.iter().enumerate() {
            if row.len() != width {
                return Err(SqlError::construction(format!(
                    "row {index} has {} values, expected {width}",
                    row.len()
                )));
            }
            let mut values = Vec::with_capacity(row.len());
            for arg in row {
                let (sql, arg_values) = expand("?", std::slice::from_ref(arg))?;
                values.push(Raw::new(sql));
                args.extend(arg_values);
            }
            groups.push(ValueGroup::new(values));
        }

        let statement = Statement::new(StatementKind::Insert)
            .with_table(Tables::new(vec![table]))
            .with_columns(Columns::new(self.columns))
            .with_values(ValueGroups::new(groups))
            .with_returning(Returning::new(Columns::new(self.returning)))
            .with_amend(self.amend);
        args.extend(self.returning_args);
        Ok((statement, args))
    }
}

/// Persistent INSERT builder.
#[derive(Clone)]
pub struct Inserter {
    template: Arc<Template>,
    chain: Chain<InsertQuery>,
}

impl Inserter {
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
        F: Fn(&mut InsertQuery) -> SqlResult<()> + Send + Sync + 'static,
    {
        Self {
            template: self.template.clone(),
            chain: self.chain.push(delta),
        }
    }

    pub fn columns(&self, columns: impl IntoFields) -> Self {
        let fields = columns.into_fields();
        self.push(move |q| {
            for field in fields.iter().cloned() {
                let (column, args) = field.into_column()?;
                if !args.is_empty() {
                    return Err(SqlError::construction("insert columns cannot bind values"));
                }
                q.columns.push(column);
            }
            Ok(())
        })
    }

    /// Add one row. Its length must match the column list.
    pub fn values(&self, row: impl IntoArgs) -> Self {
        let row = row.into_args();
        self.push(move |q| {
            q.rows.push(row.clone());
            Ok(())
        })
    }

    /// Add one row from `(column, value)` pairs.
    ///
    /// The first record defines the column list when none was given; later
    /// records must use the same columns in the same order.
    pub fn record<I, K, V>(&self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Arg>,
    {
        let (keys, row): (Vec<String>, Vec<Arg>) =
            pairs.into_iter().map(|(k, v)| (k.into(), v.into())).unzip();
        let columns: Vec<Column> = keys.iter().map(|k| Column::new(k)).collect();
        self.push(move |q| {
            if q.columns.is_empty() {
                q.columns = columns.clone();
            } else if q.columns != columns {
                return Err(SqlError::construction(format!(
                    "record columns {keys:?} do not match the insert column list"
                )));
            }
            q.rows.push(row.clone());
            Ok(())
        })
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
        self.chain.replay(InsertQuery::default())?.finish()
    }

    impl_exec!();
}

impl fmt::Debug for Inserter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inserter")
            .field("frames", &self.chain.len())
            .finish_non_exhaustive()
    }
}

/// Panics through `to_string()` on a deferred error, like [`Selector`](super::Selector).
impl fmt::Display for Inserter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sql = self.compile().map_err(|_| fmt::Error)?;
        f.write_str(&sql)
    }
}
