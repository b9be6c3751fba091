//! [`Executor`] for tokio-postgres clients and transactions.
//!
//! Compiled SQL uses `?` placeholders; they are rewritten to `$n` before the
//! statement reaches the server. Result columns are decoded into [`Value`]s
//! by their Postgres type.

use crate::error::{SqlError, SqlResult};
use crate::exec::Executor;
use crate::expand::to_numbered_placeholders;
use crate::row::Row;
use crate::value::Value;
use bytes::BytesMut;
use std::error::Error;
use std::sync::Arc;
use tokio_postgres::types::{IsNull, ToSql, Type};

impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => v.to_sql(ty, out),
            Value::Int(v) if *ty == Type::INT2 => i16::try_from(*v)?.to_sql(ty, out),
            Value::Int(v) if *ty == Type::INT4 => i32::try_from(*v)?.to_sql(ty, out),
            Value::Int(v) if *ty == Type::OID => u32::try_from(*v)?.to_sql(ty, out),
            Value::Int(v) => v.to_sql(ty, out),
            Value::Float(v) if *ty == Type::FLOAT4 => (*v as f32).to_sql(ty, out),
            Value::Float(v) => v.to_sql(ty, out),
            Value::Text(v) => v.to_sql(ty, out),
            Value::Bytes(v) => v.to_sql(ty, out),
            Value::Uuid(v) => v.to_sql(ty, out),
            Value::Timestamp(v) => v.to_sql(ty, out),
            Value::DateTime(v) => v.to_sql(ty, out),
            Value::Date(v) => v.to_sql(ty, out),
            Value::Json(v) => v.to_sql(ty, out),
        }
    }

    // The server decides the parameter type; narrowing happens in `to_sql`.
    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

fn params(args: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    args.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

fn decode_rows(rows: Vec<tokio_postgres::Row>) -> SqlResult<Vec<Row>> {
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };
    let columns: Arc<[String]> = first
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();

    rows.iter()
        .map(|row| {
            let values = (0..row.len())
                .map(|idx| decode_value(row, idx))
                .collect::<SqlResult<Vec<_>>>()?;
            Row::new(columns.clone(), values)
        })
        .collect()
}

fn decode_value(row: &tokio_postgres::Row, idx: usize) -> SqlResult<Value> {
    let column = &row.columns()[idx];
    let ty = column.type_();
    let err = |e: tokio_postgres::Error| SqlError::decode(column.name(), e.to_string());

    let value = if *ty == Type::BOOL {
        row.try_get::<_, Option<bool>>(idx).map(Value::from)
    } else if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(idx).map(Value::from)
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(idx).map(Value::from)
    } else if *ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(idx).map(Value::from)
    } else if *ty == Type::OID {
        row.try_get::<_, Option<u32>>(idx).map(Value::from)
    } else if *ty == Type::FLOAT4 {
        row.try_get::<_, Option<f32>>(idx).map(Value::from)
    } else if *ty == Type::FLOAT8 {
        row.try_get::<_, Option<f64>>(idx).map(Value::from)
    } else if [Type::TEXT, Type::VARCHAR, Type::BPCHAR, Type::NAME, Type::UNKNOWN].contains(ty) {
        row.try_get::<_, Option<String>>(idx).map(Value::from)
    } else if *ty == Type::BYTEA {
        row.try_get::<_, Option<Vec<u8>>>(idx).map(Value::from)
    } else if *ty == Type::UUID {
        row.try_get::<_, Option<uuid::Uuid>>(idx).map(Value::from)
    } else if *ty == Type::TIMESTAMPTZ {
        row.try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(idx).map(Value::from)
    } else if *ty == Type::TIMESTAMP {
        row.try_get::<_, Option<chrono::NaiveDateTime>>(idx).map(Value::from)
    } else if *ty == Type::DATE {
        row.try_get::<_, Option<chrono::NaiveDate>>(idx).map(Value::from)
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        row.try_get::<_, Option<serde_json::Value>>(idx).map(Value::from)
    } else {
        return Err(SqlError::decode(column.name(), format!("unsupported column type {ty}")));
    };

    value.map_err(err)
}

macro_rules! impl_executor {
    ($($client:ty),* $(,)?) => {
        $(
            impl Executor for $client {
                type Prepared = tokio_postgres::Statement;

                async fn exec(&self, sql: &str, args: &[Value]) -> SqlResult<u64> {
                    let sql = to_numbered_placeholders(sql);
                    self.execute(sql.as_str(), &params(args))
                        .await
                        .map_err(SqlError::from_db_error)
                }

                async fn query(&self, sql: &str, args: &[Value]) -> SqlResult<Vec<Row>> {
                    let sql = to_numbered_placeholders(sql);
                    let rows = <$client>::query(self, sql.as_str(), &params(args))
                        .await
                        .map_err(SqlError::from_db_error)?;
                    decode_rows(rows)
                }

                async fn prepare(&self, sql: &str) -> SqlResult<tokio_postgres::Statement> {
                    let sql = to_numbered_placeholders(sql);
                    <$client>::prepare(self, sql.as_str())
                        .await
                        .map_err(SqlError::from_db_error)
                }
            }
        )*
    };
}

impl_executor!(tokio_postgres::Client, tokio_postgres::Transaction<'_>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_binds_as_sql_null() {
        let mut buf = BytesMut::new();
        let is_null = Value::Null.to_sql(&Type::INT4, &mut buf).unwrap();
        assert!(matches!(is_null, IsNull::Yes));
        assert!(buf.is_empty());
    }

    #[test]
    fn int_narrows_to_column_width() {
        let mut buf = BytesMut::new();
        Value::Int(7).to_sql(&Type::INT2, &mut buf).unwrap();
        assert_eq!(buf.len(), 2);

        let mut buf = BytesMut::new();
        Value::Int(7).to_sql(&Type::INT4, &mut buf).unwrap();
        assert_eq!(buf.len(), 4);

        let mut buf = BytesMut::new();
        Value::Int(7).to_sql(&Type::INT8, &mut buf).unwrap();
        assert_eq!(buf.len(), 8);
    }

    #[test]
    fn int_out_of_range_is_rejected() {
        let mut buf = BytesMut::new();
        assert!(Value::Int(70_000).to_sql(&Type::INT2, &mut buf).is_err());
    }

    #[test]
    fn float_narrows_for_real_columns() {
        let mut buf = BytesMut::new();
        Value::Float(1.5).to_sql(&Type::FLOAT4, &mut buf).unwrap();
        assert_eq!(buf.len(), 4);
    }

    #[test]
    fn params_borrow_every_value() {
        let args = vec![Value::Int(1), Value::from("a"), Value::Null];
        assert_eq!(params(&args).len(), 3);
    }
}
