use super::*;
use crate::condition::{Constraint, is_in};
use crate::error::SqlError;
use crate::exec::mock::{Call, MockExecutor, row};
use crate::row::Row;
use crate::{args, cond, raw};
use std::collections::BTreeMap;

fn sql() -> SqlBuilder {
    SqlBuilder::dialect(Dialect::Postgres).unwrap()
}

#[test]
fn select_round_trip() {
    let q = sql().select("name").from("users").r#where(("id = ?", 1));
    assert_eq!(q.to_string(), r#"SELECT "name" FROM "users" WHERE id = ?"#);
    assert_eq!(q.arguments().unwrap(), vec![Value::Int(1)]);
}

#[test]
fn select_defaults_to_star() {
    assert_eq!(sql().select_from("users").compile().unwrap(), r#"SELECT * FROM "users""#);
    assert_eq!(
        sql().select(["u.id", "u.name AS n"]).from("users").alias("u").compile().unwrap(),
        r#"SELECT "u"."id", "u"."name" AS "n" FROM "users" AS "u""#
    );
}

#[test]
fn derived_chains_are_independent() {
    let q1 = sql().select("a").from("t");
    let before = q1.to_string();
    let q2 = q1.r#where(("x = ?", 1)).limit(5);
    let q3 = q1.order_by("-a");

    assert_eq!(q1.to_string(), before);
    assert_eq!(q2.to_string(), r#"SELECT "a" FROM "t" WHERE x = ? LIMIT 5"#);
    assert_eq!(q3.to_string(), r#"SELECT "a" FROM "t" ORDER BY "a" DESC"#);
    assert!(q1.arguments().unwrap().is_empty());
}

#[test]
fn where_replaces_and_appends() {
    let q = sql()
        .select_from("t")
        .r#where(("a = ?", 1))
        .r#where(("b = ?", 2))
        .and(("c = ?", 3));
    assert_eq!(q.compile().unwrap(), r#"SELECT * FROM "t" WHERE b = ? AND c = ?"#);
    assert_eq!(q.arguments().unwrap(), vec![Value::Int(2), Value::Int(3)]);
}

#[test]
fn arguments_follow_clause_order() {
    let inner = sql().select("id").from("t").r#where(("x = ?", 2));
    let q = sql()
        .select(())
        .order_by(raw!("score > ?", 5))
        .and(("a = ?", 4))
        .left_join("orders o")
        .on(("o.kind = ?", 3))
        .from(Field::query(inner, "s"))
        .columns(raw!("COALESCE(name, ?)", 1));

    assert_eq!(
        q.compile().unwrap(),
        r#"SELECT COALESCE(name, ?) FROM (SELECT "id" FROM "t" WHERE x = ?) AS "s" LEFT JOIN "orders" AS "o" ON o.kind = ? WHERE a = ? ORDER BY score > ?"#
    );
    assert_eq!(
        q.arguments().unwrap(),
        (1..=5).map(Value::Int).collect::<Vec<_>>()
    );
}

#[test]
fn conditions_translate() {
    let q = sql()
        .select_from("users")
        .r#where(cond! { "status" => "active", "age >=" => 18 })
        .and(Constraint::new("role", is_in(vec!["admin", "owner"])));
    assert_eq!(
        q.compile().unwrap(),
        r#"SELECT * FROM "users" WHERE ("age" >= ? AND "status" = ?) AND "role" IN (?, ?)"#
    );
    assert_eq!(q.arguments().unwrap().len(), 4);
}

#[test]
fn subquery_inlines_with_its_arguments() {
    let paid = sql()
        .select("user_id")
        .from("orders")
        .r#where(("total > ?", 100));
    let q = sql()
        .select_from("users")
        .r#where(Constraint::new("id", is_in(paid)))
        .and(("active = ?", true));
    assert_eq!(
        q.compile().unwrap(),
        r#"SELECT * FROM "users" WHERE "id" IN (SELECT "user_id" FROM "orders" WHERE total > ?) AND active = ?"#
    );
    assert_eq!(q.arguments().unwrap(), vec![Value::Int(100), Value::Bool(true)]);
}

#[test]
fn joins_with_using_and_grouping() {
    let q = sql()
        .select(["u.id", "COUNT(*) AS orders"])
        .from("users u")
        .join("orders")
        .using("user_id")
        .group_by("u.id")
        .distinct();
    assert_eq!(
        q.compile().unwrap(),
        r#"SELECT DISTINCT "u"."id", COUNT(*) AS "orders" FROM "users" AS "u" JOIN "orders" USING ("user_id") GROUP BY "u"."id""#
    );
}

#[test]
fn amend_rewrites_final_text() {
    let q = sql()
        .select_from("jobs")
        .r#where(("state = ?", "queued"))
        .limit(1)
        .amend(|sql| format!("{sql} FOR UPDATE SKIP LOCKED"));
    assert_eq!(
        q.compile().unwrap(),
        r#"SELECT * FROM "jobs" WHERE state = ? LIMIT 1 FOR UPDATE SKIP LOCKED"#
    );
}

#[test]
fn construction_errors_surface_at_replay() {
    let err = sql().select_from("t").on("a = b").compile().unwrap_err();
    assert!(matches!(err, SqlError::Construction(_)));

    let twice = sql().select_from("t").join("u").on("t.id = u.id").using("id");
    assert!(matches!(twice.compile().unwrap_err(), SqlError::Construction(_)));

    let alias = sql().select("1").alias("x");
    assert!(matches!(alias.arguments().unwrap_err(), SqlError::Construction(_)));

    // The first failing frame wins.
    let first = sql().select("1").alias("x").on("y");
    assert!(first.compile().unwrap_err().to_string().contains("alias"));
}

#[test]
#[should_panic]
fn display_panics_on_deferred_error() {
    let _ = sql().select("1").alias("x").to_string();
}

#[test]
fn insert_with_returning() {
    let q = sql()
        .insert_into("users")
        .columns("name")
        .values("alice")
        .returning("id");
    assert_eq!(
        q.compile().unwrap(),
        r#"INSERT INTO "users" ("name") VALUES (?) RETURNING "id""#
    );
    assert_eq!(q.arguments().unwrap(), vec![Value::Text("alice".into())]);
}

#[test]
fn insert_rows_and_records() {
    let q = sql()
        .insert_into("users")
        .columns(["name", "age"])
        .values(args!["a", 1])
        .values(args!["b", raw!("DEFAULT")]);
    assert_eq!(
        q.compile().unwrap(),
        r#"INSERT INTO "users" ("name", "age") VALUES (?, ?), (?, DEFAULT)"#
    );
    assert_eq!(q.arguments().unwrap().len(), 3);

    let mismatch = sql().insert_into("users").columns(["name", "age"]).values("a");
    assert!(matches!(mismatch.build().unwrap_err(), SqlError::Construction(_)));

    let record = BTreeMap::from([("age", Value::Int(3)), ("name", Value::Text("c".into()))]);
    let q = sql().insert_into("users").record(record.clone()).record(record);
    assert_eq!(
        q.compile().unwrap(),
        r#"INSERT INTO "users" ("age", "name") VALUES (?, ?), (?, ?)"#
    );

    let q = sql().insert_into("counters");
    assert_eq!(q.compile().unwrap(), r#"INSERT INTO "counters" DEFAULT VALUES"#);
}

#[test]
fn update_assignments() {
    let q = sql()
        .update("users")
        .set("name", "bob")
        .set_raw(raw!("hits = hits + ?", 1))
        .set_pairs([("age", 30)])
        .set_list(args!["email", None::<String>])
        .r#where(cond! { "id" => 7 })
        .returning("id");
    assert_eq!(
        q.compile().unwrap(),
        r#"UPDATE "users" SET "name" = ?, hits = hits + ?, "age" = ?, "email" = ? WHERE "id" = ? RETURNING "id""#
    );
    assert_eq!(
        q.arguments().unwrap(),
        vec![
            Value::Text("bob".into()),
            Value::Int(1),
            Value::Int(30),
            Value::Null,
            Value::Int(7),
        ]
    );
}

#[test]
fn update_errors() {
    let odd = sql().update("users").set_list(args!["name", "x", "age"]);
    assert!(matches!(odd.compile().unwrap_err(), SqlError::Construction(_)));

    let bad_key = sql().update("users").set_list(args![1, "x"]);
    assert!(matches!(bad_key.compile().unwrap_err(), SqlError::Construction(_)));

    let no_set = sql().update("users").r#where(("id = ?", 1));
    assert!(matches!(no_set.compile().unwrap_err(), SqlError::Compile(_)));
}

#[test]
fn delete_statement() {
    let q = sql()
        .delete_from("sessions")
        .r#where(("expires_at < ?", "2024-01-01"))
        .returning("id");
    assert_eq!(
        q.compile().unwrap(),
        r#"DELETE FROM "sessions" WHERE expires_at < ? RETURNING "id""#
    );
    assert_eq!(
        sql().delete_from("sessions").compile().unwrap(),
        r#"DELETE FROM "sessions""#
    );
}

#[test]
fn returning_values_bind_last() {
    let q = sql()
        .update("t")
        .set("a", 1)
        .r#where(("id = ?", 2))
        .returning(raw!("a + ?", 5));
    assert_eq!(
        q.compile().unwrap(),
        r#"UPDATE "t" SET "a" = ? WHERE id = ? RETURNING a + ?"#
    );
    assert_eq!(q.arguments().unwrap(), vec![Value::Int(1), Value::Int(2), Value::Int(5)]);

    let q = sql()
        .insert_into("t")
        .columns("a")
        .values(1)
        .returning([Field::from("id"), Field::from(raw!("a + ?", 9))]);
    assert_eq!(
        q.compile().unwrap(),
        r#"INSERT INTO "t" ("a") VALUES (?) RETURNING "id", a + ?"#
    );
    assert_eq!(q.arguments().unwrap(), vec![Value::Int(1), Value::Int(9)]);

    let q = sql()
        .delete_from("t")
        .returning(raw!("coalesce(a, ?)", 0))
        .r#where(("id = ?", 3));
    assert_eq!(
        q.compile().unwrap(),
        r#"DELETE FROM "t" WHERE id = ? RETURNING coalesce(a, ?)"#
    );
    assert_eq!(q.arguments().unwrap(), vec![Value::Int(3), Value::Int(0)]);
}

#[test]
fn insert_columns_without_values_is_an_error() {
    let q = sql().insert_into("t").columns(["a", "b"]);
    assert!(matches!(q.build().unwrap_err(), SqlError::Construction(_)));

    let q = sql().insert_into("t");
    assert_eq!(q.compile().unwrap(), r#"INSERT INTO "t" DEFAULT VALUES"#);
}

#[test]
fn raw_or_terms_keep_their_grouping() {
    let q = sql()
        .select_from("t")
        .r#where(("a = ? OR b = ?", 1, 2))
        .and(("c = ?", 3));
    assert_eq!(
        q.compile().unwrap(),
        r#"SELECT * FROM "t" WHERE (a = ? OR b = ?) AND c = ?"#
    );
    assert_eq!(q.arguments().unwrap(), vec![Value::Int(1), Value::Int(2), Value::Int(3)]);

    let alone = sql().select_from("t").r#where(("a = ? OR b = ?", 1, 2));
    assert_eq!(alone.compile().unwrap(), r#"SELECT * FROM "t" WHERE a = ? OR b = ?"#);
}

#[test]
fn one_shot_statements() {
    let b = sql();
    assert_eq!(b.truncate("logs").unwrap(), r#"TRUNCATE TABLE "logs""#);
    assert_eq!(b.drop_table("logs").unwrap(), r#"DROP TABLE "logs""#);
    assert_eq!(b.drop_database("app").unwrap(), r#"DROP DATABASE "app""#);
}

#[test]
fn offset_pagination() {
    let pages = sql().select_from("users").order_by("id").paginate(10);
    assert_eq!(
        pages.page(3).compile().unwrap(),
        r#"SELECT * FROM "users" ORDER BY "id" LIMIT 10 OFFSET 20"#
    );
}

#[test]
fn page_offset_overflow_is_an_error() {
    let pages = sql().select_from("users").paginate(10);
    let err = pages.page(u64::MAX).compile().unwrap_err();
    assert!(matches!(err, SqlError::Construction(_)));

    let err = pages.cursor("id").page(u64::MAX).build().unwrap_err();
    assert!(matches!(err, SqlError::Construction(_)));

    let last = sql().select_from("users").paginate(1).page(u64::MAX);
    assert_eq!(
        last.compile().unwrap(),
        format!(r#"SELECT * FROM "users" LIMIT 1 OFFSET {}"#, u64::MAX - 1)
    );
}

#[test]
fn cursor_pagination() {
    let pages = sql().select_from("users").paginate(10);

    let next = pages.cursor("-id").next_page(100);
    assert_eq!(
        next.compile().unwrap(),
        r#"SELECT * FROM "users" WHERE "id" < ? ORDER BY "id" DESC LIMIT 10"#
    );
    assert_eq!(next.arguments().unwrap(), vec![Value::Int(100)]);

    let prev = pages.cursor("id").prev_page(50);
    assert_eq!(
        prev.compile().unwrap(),
        r#"SELECT * FROM (SELECT * FROM "users" WHERE "id" < ? ORDER BY "id" DESC LIMIT 10) AS "p0" ORDER BY "id""#
    );

    let no_cursor = pages.next_page(1);
    assert!(matches!(no_cursor.compile().unwrap_err(), SqlError::Construction(_)));
}

#[tokio::test]
async fn pagination_totals() {
    let exec = MockExecutor::returning(vec![row(&[("_t", Value::Int(42))])]);
    let pages = sql()
        .select_from("users")
        .r#where(cond! { "active" => true })
        .paginate(10);

    assert_eq!(pages.total_entries(&exec).await.unwrap(), 42);
    assert_eq!(pages.total_pages(&exec).await.unwrap(), 5);
    assert_eq!(
        exec.calls()[0],
        Call::Query(
            r#"SELECT COUNT(1) AS _t FROM "users" WHERE "active" = ?"#.into(),
            vec![Value::Bool(true)]
        )
    );

    let joined = sql()
        .select("u.id")
        .from("users u")
        .join("orders o")
        .on("o.user_id = u.id")
        .paginate(10);
    joined.total_entries(&exec).await.unwrap();
    assert_eq!(
        exec.calls()[2],
        Call::Query(
            r#"SELECT COUNT(1) AS _t FROM (SELECT "u"."id" FROM "users" AS "u" JOIN "orders" AS "o" ON o.user_id = u.id) AS "_c""#.into(),
            vec![]
        )
    );
}

#[tokio::test]
async fn terminals_issue_one_call() {
    let exec = MockExecutor::returning(vec![
        row(&[("id", Value::Int(1)), ("name", Value::Text("a".into()))]),
        row(&[("id", Value::Int(2)), ("name", Value::Text("b".into()))]),
    ]);

    let q = sql().select(["id", "name"]).from("users");
    let rows: Vec<BTreeMap<String, Value>> = q.all(&exec).await.unwrap();
    assert_eq!(rows.len(), 2);
    let first: Row = q.one(&exec).await.unwrap();
    assert_eq!(first.try_get::<String>("name").unwrap(), "a");

    sql()
        .delete_from("users")
        .r#where(("id = ?", 1))
        .exec(&exec)
        .await
        .unwrap();

    let calls = exec.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(
        calls[2],
        Call::Exec(r#"DELETE FROM "users" WHERE id = ?"#.into(), vec![Value::Int(1)])
    );
}

#[test]
fn chains_are_shareable_across_threads() {
    let base = sql().select_from("events");
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let base = base.clone();
            std::thread::spawn(move || base.r#where(("kind = ?", i)).build().unwrap())
        })
        .collect();
    for handle in handles {
        let (sql, args) = handle.join().unwrap();
        assert_eq!(sql, r#"SELECT * FROM "events" WHERE kind = ?"#);
        assert_eq!(args.len(), 1);
    }
    assert!(base.arguments().unwrap().is_empty());
}
