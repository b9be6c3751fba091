#![allow(dead_code)]

use sqlcraft::{Dialect, FromRow, Row, SqlBuilder, SqlError, Value};
use std::sync::Arc;

#[derive(Debug, FromRow)]
struct User {
    id: i64,
    name: String,
    #[sql(column = "email_address")]
    email: Option<String>,
    #[sql(skip)]
    score: f64,
}

fn row(pairs: &[(&str, Value)]) -> Row {
    let columns: Arc<[String]> = pairs.iter().map(|(c, _)| c.to_string()).collect();
    let values = pairs.iter().map(|(_, v)| v.clone()).collect();
    Row::new(columns, values).unwrap()
}

#[test]
fn columns_list_mapped_fields() {
    assert_eq!(User::COLUMNS, &["id", "name", "email_address"]);
}

#[test]
fn maps_renamed_and_skipped_fields() {
    let user = User::from_row(&row(&[
        ("id", Value::Int(3)),
        ("name", Value::from("ann")),
        ("email_address", Value::Null),
    ]))
    .unwrap();

    assert_eq!(user.id, 3);
    assert_eq!(user.name, "ann");
    assert_eq!(user.email, None);
    assert_eq!(user.score, 0.0);
}

#[test]
fn missing_column_is_an_error() {
    let err = User::from_row(&row(&[("id", Value::Int(3))])).unwrap_err();
    assert!(matches!(err, SqlError::Decode { ref column, .. } if column == "name"));
}

#[test]
fn type_mismatch_names_the_column() {
    let err = User::from_row(&row(&[
        ("id", Value::from("three")),
        ("name", Value::from("ann")),
        ("email_address", Value::Null),
    ]))
    .unwrap_err();

    assert!(err.to_string().contains("id"));
}

#[test]
fn columns_drive_a_select() {
    let sql = SqlBuilder::dialect(Dialect::Postgres).unwrap();
    let query = sql.select(User::COLUMNS).from("users");

    assert_eq!(
        query.compile().unwrap(),
        r#"SELECT "id", "name", "email_address" FROM "users""#
    );
}
