//! The execution boundary.
//!
//! sqlcraft never talks to a database itself. Builders compile to SQL text
//! plus [`Value`] arguments and hand both to an [`Executor`]; every terminal
//! issues exactly one executor call and never retries it.

use crate::error::{SqlError, SqlResult};
use crate::row::{FromRow, Row};
use crate::value::Value;
use std::future::Future;

/// Adapts values to and from a driver's native representation.
///
/// Both hooks default to passthrough.
pub trait Typer: Send + Sync {
    /// Convert a bind argument before it is handed to the driver.
    fn valuer(&self, value: Value) -> Value {
        value
    }

    /// Convert a scanned column value before row mapping.
    fn scanner(&self, column: &str, value: Value) -> Value {
        let _ = column;
        value
    }
}

/// Passthrough [`Typer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTyper;

impl Typer for NoopTyper {}

/// Runs compiled SQL against a live connection.
///
/// `sql` uses `?` placeholders; implementations rewrite them to the driver's
/// syntax if needed.
pub trait Executor: Send + Sync {
    /// Driver handle returned by [`prepare`](Self::prepare).
    type Prepared: Send + Sync;

    /// Execute a statement and return the affected row count.
    fn exec(&self, sql: &str, args: &[Value]) -> impl Future<Output = SqlResult<u64>> + Send;

    /// Execute a query and return all rows.
    fn query(&self, sql: &str, args: &[Value]) -> impl Future<Output = SqlResult<Vec<Row>>> + Send;

    /// Execute a query and return the **first** row.
    ///
    /// Returns [`SqlError::NotFound`] when no rows come back.
    fn query_row(&self, sql: &str, args: &[Value]) -> impl Future<Output = SqlResult<Row>> + Send {
        async move {
            self.query(sql, args)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| SqlError::not_found("query returned no rows"))
        }
    }

    /// Prepare a statement for repeated execution.
    fn prepare(&self, sql: &str) -> impl Future<Output = SqlResult<Self::Prepared>> + Send;

    fn typer(&self) -> &dyn Typer {
        &NoopTyper
    }
}

/// Rows returned by a query, ready to be mapped.
#[derive(Debug, Clone, Default)]
pub struct ResultMapper {
    rows: Vec<Row>,
}

impl ResultMapper {
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Map every row into `T`.
    pub fn all<T: FromRow>(&self) -> SqlResult<Vec<T>> {
        self.rows.iter().map(T::from_row).collect()
    }

    /// Map the first row into `T`; [`SqlError::NotFound`] if there is none.
    pub fn one<T: FromRow>(&self) -> SqlResult<T> {
        let row = self
            .rows
            .first()
            .ok_or_else(|| SqlError::not_found("query returned no rows"))?;
        T::from_row(row)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

impl IntoIterator for ResultMapper {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultMapper {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

#[cfg(feature = "tracing")]
fn log_sql(operation: &'static str, sql: &str, args: usize) {
    const MAX_SQL_LEN: usize = 200;
    let shown = if sql.len() > MAX_SQL_LEN {
        let mut end = MAX_SQL_LEN;
        while !sql.is_char_boundary(end) {
            end -= 1;
        }
        &sql[..end]
    } else {
        sql
    };
    tracing::debug!(target: "sqlcraft.sql", operation, args, sql = %shown, "executing");
}

fn bind(executor: &(impl Executor + ?Sized), args: Vec<Value>) -> Vec<Value> {
    let typer = executor.typer();
    args.into_iter().map(|v| typer.valuer(v)).collect()
}

fn scan(executor: &(impl Executor + ?Sized), row: Row) -> Row {
    let typer = executor.typer();
    row.map_values(|column, value| typer.scanner(column, value))
}

pub(crate) async fn run_exec<E: Executor>(
    executor: &E,
    sql: &str,
    args: Vec<Value>,
) -> SqlResult<u64> {
    #[cfg(feature = "tracing")]
    log_sql("exec", sql, args.len());
    let args = bind(executor, args);
    executor.exec(sql, &args).await
}

pub(crate) async fn run_query<E: Executor>(
    executor: &E,
    sql: &str,
    args: Vec<Value>,
) -> SqlResult<ResultMapper> {
    #[cfg(feature = "tracing")]
    log_sql("query", sql, args.len());
    let args = bind(executor, args);
    let rows = executor.query(sql, &args).await?;
    Ok(ResultMapper::new(
        rows.into_iter().map(|row| scan(executor, row)).collect(),
    ))
}

pub(crate) async fn run_query_row<E: Executor>(
    executor: &E,
    sql: &str,
    args: Vec<Value>,
) -> SqlResult<Row> {
    #[cfg(feature = "tracing")]
    log_sql("query_row", sql, args.len());
    let args = bind(executor, args);
    let row = executor.query_row(sql, &args).await?;
    Ok(scan(executor, row))
}

/// Generate the execution terminals for a builder with a
/// `build(&self) -> SqlResult<(String, Vec<Value>)>` method.
///
/// `rows` adds `all`/`one` mapping helpers on top of `exec`/`iterate`.
macro_rules! impl_exec {
    () => {
        /// Execute the statement and return the affected row count.
        pub async fn exec<E: $crate::exec::Executor>(&self, executor: &E) -> $crate::error::SqlResult<u64> {
            let (sql, args) = self.build()?;
            $crate::exec::run_exec(executor, &sql, args).await
        }

        /// Run the statement and collect its rows (e.g. `RETURNING` output).
        pub async fn iterate<E: $crate::exec::Executor>(
            &self,
            executor: &E,
        ) -> $crate::error::SqlResult<$crate::exec::ResultMapper> {
            let (sql, args) = self.build()?;
            $crate::exec::run_query(executor, &sql, args).await
        }
    };
    (rows) => {
        $crate::exec::impl_exec!();

        /// Run the query and map every row into `T`.
        pub async fn all<T: $crate::row::FromRow, E: $crate::exec::Executor>(
            &self,
            executor: &E,
        ) -> $crate::error::SqlResult<Vec<T>> {
            self.iterate(executor).await?.all()
        }

        /// Run the query and map the first row into `T`.
        ///
        /// Returns [`SqlError::NotFound`](crate::SqlError::NotFound) when
        /// there are no rows.
        pub async fn one<T: $crate::row::FromRow, E: $crate::exec::Executor>(
            &self,
            executor: &E,
        ) -> $crate::error::SqlResult<T> {
            let (sql, args) = self.build()?;
            let row = $crate::exec::run_query_row(executor, &sql, args).await?;
            T::from_row(&row)
        }
    };
}

pub(crate) use impl_exec;


#[cfg(test)]
mod tests {
    use super::mock::{Call, MockExecutor, row};
    use super::*;

    struct UpperTyper;

    impl Typer for UpperTyper {
        fn valuer(&self, value: Value) -> Value {
            match value {
                Value::Text(s) => Value::Text(s.to_uppercase()),
                other => other,
            }
        }
    }

    struct TypedExecutor(MockExecutor);

    impl Executor for TypedExecutor {
        type Prepared = String;

        fn exec(&self, sql: &str, args: &[Value]) -> impl Future<Output = SqlResult<u64>> + Send {
            self.0.exec(sql, args)
        }

        fn query(
            &self,
            sql: &str,
            args: &[Value],
        ) -> impl Future<Output = SqlResult<Vec<Row>>> + Send {
            self.0.query(sql, args)
        }

        fn prepare(&self, sql: &str) -> impl Future<Output = SqlResult<String>> + Send {
            self.0.prepare(sql)
        }

        fn typer(&self) -> &dyn Typer {
            &UpperTyper
        }
    }

    #[tokio::test]
    async fn query_row_defaults_to_not_found() {
        let exec = MockExecutor::default();
        let err = exec.query_row("SELECT 1", &[]).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn typer_adapts_arguments() {
        let exec = TypedExecutor(MockExecutor::default());
        run_exec(&exec, "UPDATE t SET a = ?", vec![Value::Text("x".into())])
            .await
            .unwrap();
        assert_eq!(
            exec.0.calls(),
            vec![Call::Exec(
                "UPDATE t SET a = ?".into(),
                vec![Value::Text("X".into())]
            )]
        );
    }

    #[tokio::test]
    async fn result_mapper_maps_rows() {
        let exec = MockExecutor::returning(vec![
            row(&[("id", Value::Int(1))]),
            row(&[("id", Value::Int(2))]),
        ]);
        let mapper = run_query(&exec, "SELECT id FROM t", vec![]).await.unwrap();
        assert_eq!(mapper.len(), 2);
        let ids: Vec<i64> = mapper.iter().map(|r| r.try_get("id").unwrap()).collect();
        assert_eq!(ids, vec![1, 2]);
        let first: Row = mapper.one().unwrap();
        assert_eq!(first.try_get::<i64>("id").unwrap(), 1);

        let empty = ResultMapper::default();
        assert!(empty.one::<Row>().unwrap_err().is_not_found());
    }
}
