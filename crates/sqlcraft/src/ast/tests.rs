use super::*;
use crate::condition::Operator;
use crate::dialect::Dialect;
use crate::error::SqlError;
use crate::template::TemplateOptions;

fn pg() -> Template {
    Dialect::Postgres.template(TemplateOptions::default()).unwrap()
}

fn raw(sql: &str) -> Predicate {
    Predicate::Raw(Raw::new(sql))
}

#[test]
fn compile_is_idempotent_and_cached() {
    let t = pg();
    let stmt = Statement::new(StatementKind::Select)
        .with_columns(Columns::parse(["name", "email"]))
        .with_table(Tables::new(vec![Table::new("users")]))
        .with_where(Where::new(vec![raw("id = ?")]));

    let first = stmt.compile(&t).unwrap();
    let renders = t.renders();
    let second = stmt.compile(&t).unwrap();

    assert_eq!(first, second);
    assert_eq!(t.renders(), renders, "second compile must not render any layout");

    // An equal value built independently hits the same cache entry.
    let again = Statement::new(StatementKind::Select)
        .with_columns(Columns::parse(["name", "email"]))
        .with_table(Tables::new(vec![Table::new("users")]))
        .with_where(Where::new(vec![raw("id = ?")]));
    assert_eq!(again.identity(), stmt.identity());
    assert_eq!(again.compile(&t).unwrap(), first);
    assert_eq!(t.renders(), renders);
}

#[test]
fn disabled_cache_renders_every_time() {
    let t = Dialect::Postgres
        .template(TemplateOptions::new().with_cache_capacity(0))
        .unwrap();
    let col = Column::new("name");
    col.compile(&t).unwrap();
    let renders = t.renders();
    col.compile(&t).unwrap();
    assert!(t.renders() > renders);
}

#[test]
fn logical_grouping_parenthesizes() {
    let t = pg();
    let tree = And::new(vec![
        raw("a"),
        Predicate::Or(Or::new(vec![raw("b"), raw("c")])),
    ]);
    assert_eq!(tree.compile(&t).unwrap(), "(a AND (b OR c))");

    let single = Or::new(vec![raw("x")]);
    assert_eq!(single.compile(&t).unwrap(), "x");
    assert_eq!(And::default().compile(&t).unwrap(), "");
}

#[test]
fn raw_or_terms_are_grouped_under_and() {
    let t = pg();
    assert_eq!(
        Where::new(vec![raw("a = ? OR b = ?"), raw("c = ?")]).compile(&t).unwrap(),
        "WHERE (a = ? OR b = ?) AND c = ?"
    );
    assert_eq!(
        And::new(vec![raw("x or y"), raw("z")]).compile(&t).unwrap(),
        "((x or y) AND z)"
    );
    // A lone term, OR groups and words merely containing "or" stay as written.
    assert_eq!(Where::new(vec![raw("a OR b")]).compile(&t).unwrap(), "WHERE a OR b");
    assert_eq!(
        Or::new(vec![raw("a OR b"), raw("c")]).compile(&t).unwrap(),
        "(a OR b OR c)"
    );
    assert_eq!(
        Where::new(vec![raw("orders.id = ?"), raw("color = ?")]).compile(&t).unwrap(),
        "WHERE orders.id = ? AND color = ?"
    );
}

#[test]
fn empty_where_emits_nothing() {
    let t = pg();
    assert_eq!(Where::default().compile(&t).unwrap(), "");
    assert_eq!(Where::new(vec![raw("")]).compile(&t).unwrap(), "");
    assert_eq!(
        Where::new(vec![raw("a = ?"), raw("b = ?")]).compile(&t).unwrap(),
        "WHERE a = ? AND b = ?"
    );
}

#[test]
fn append_yields_new_identity() {
    let t = pg();
    let cols = Columns::parse(["a"]);
    let before = cols.compile(&t).unwrap();
    let more = cols.append([Column::new("b")]);

    assert_ne!(cols.identity(), more.identity());
    assert_eq!(cols.compile(&t).unwrap(), before);
    assert_eq!(more.compile(&t).unwrap(), "\"a\", \"b\"");
}

#[test]
fn derived_nodes_never_reuse_a_compiled_identity() {
    let t = pg();
    let col = Column::new("a");
    assert_eq!(col.compile(&t).unwrap(), "\"a\"");

    let aliased = col.with_alias("b");
    assert_ne!(aliased.identity(), col.identity());
    assert_eq!(aliased.compile(&t).unwrap(), "\"a\" AS \"b\"");
    assert_eq!(col.compile(&t).unwrap(), "\"a\"");
    assert_eq!(aliased.alias(), Some("b"));
    assert_eq!(col.alias(), None);
    assert_eq!(aliased.name(), &Name::Ident(vec!["a".to_string()]));

    let bare = Join::new(JoinKind::Join, Table::new("orders"));
    assert_eq!(bare.compile(&t).unwrap(), "JOIN \"orders\"");
    let joined = bare.with_on(On::new(vec![raw("orders.user_id = users.id")]));
    assert_ne!(joined.identity(), bare.identity());
    assert_eq!(
        joined.compile(&t).unwrap(),
        "JOIN \"orders\" ON orders.user_id = users.id"
    );
    assert_eq!(joined.kind(), JoinKind::Join);
    assert_eq!(joined.table().alias(), None);
    assert!(bare.on().is_none());
}

#[test]
fn column_references() {
    let t = pg();
    let cases = [
        ("name", "\"name\""),
        ("u.name", "\"u\".\"name\""),
        ("*", "*"),
        ("u.*", "\"u\".*"),
        ("name AS n", "\"name\" AS \"n\""),
        ("COUNT(*) AS total", "COUNT(*) AS \"total\""),
        ("LOWER(name)", "LOWER(name)"),
    ];
    for (input, expected) in cases {
        assert_eq!(Column::new(input).compile(&t).unwrap(), expected, "{input}");
    }
}

#[test]
fn table_aliases() {
    let t = pg();
    assert_eq!(Table::new("users u").compile(&t).unwrap(), "\"users\" AS \"u\"");
    assert_eq!(
        Table::new("public.users AS u").compile(&t).unwrap(),
        "\"public\".\"users\" AS \"u\""
    );
    assert_eq!(
        Table::raw("(SELECT 1)").with_alias("s").compile(&t).unwrap(),
        "(SELECT 1) AS \"s\""
    );
}

#[test]
fn column_value_operators() {
    let t = pg();
    let cv = |op, value: &str| ColumnValue::new(Column::new("name"), op, Raw::new(value));

    assert_eq!(cv(OperatorToken::Default, "?").compile(&t).unwrap(), "\"name\" = ?");
    assert_eq!(
        cv(OperatorToken::Known(Operator::Regexp), "?").compile(&t).unwrap(),
        "\"name\" ~ ?"
    );
    assert_eq!(
        cv(OperatorToken::Known(Operator::Is), "NULL").compile(&t).unwrap(),
        "\"name\" IS NULL"
    );
    assert_eq!(
        cv(OperatorToken::Custom("@>".into()), "?").compile(&t).unwrap(),
        "\"name\" @> ?"
    );
    assert_eq!(
        cv(OperatorToken::Custom(":column->>'first' =".into()), "?")
            .compile(&t)
            .unwrap(),
        "\"name\"->>'first' = ?"
    );
}

#[test]
fn literal_values() {
    let t = pg();
    let lit = |v: crate::Value| Literal::new(v).compile(&t).unwrap();
    assert_eq!(lit(crate::Value::Null), "NULL");
    assert_eq!(lit(crate::Value::Bool(true)), "TRUE");
    assert_eq!(lit(crate::Value::Int(42)), "42");
    assert_eq!(lit(crate::Value::Text("O'Brien".into())), "'O''Brien'");
}

#[test]
fn sort_columns() {
    let t = pg();
    let order = OrderBy::new(vec![
        SortColumn::parse("-created_at"),
        SortColumn::parse("name asc"),
        SortColumn::parse("id"),
    ]);
    assert_eq!(
        order.compile(&t).unwrap(),
        "ORDER BY \"created_at\" DESC, \"name\" ASC, \"id\""
    );
    assert_eq!(
        order.reversed().compile(&t).unwrap(),
        "ORDER BY \"created_at\" ASC, \"name\" DESC, \"id\" DESC"
    );
}

#[test]
fn joins_compile() {
    let t = pg();
    let join = Join::new(JoinKind::Left, Table::new("orders o"))
        .with_on(On::new(vec![raw("o.user_id = u.id")]));
    let using = Join::new(JoinKind::Join, Table::new("profiles"))
        .with_using(Using::new(Columns::parse(["user_id"])));
    assert!(join.is_constrained());
    assert_eq!(
        Joins::new(vec![join, using]).compile(&t).unwrap(),
        "LEFT JOIN \"orders\" AS \"o\" ON o.user_id = u.id JOIN \"profiles\" USING (\"user_id\")"
    );
}

#[test]
fn select_without_table_omits_from() {
    let t = pg();
    let stmt =
        Statement::new(StatementKind::Select).with_columns(Columns::new(vec![Column::raw("1")]));
    assert_eq!(stmt.compile(&t).unwrap(), "SELECT 1");

    let star = Statement::new(StatementKind::Select)
        .with_table(Tables::new(vec![Table::new("users")]))
        .with_distinct(true)
        .with_limit(Some(0))
        .with_offset(Some(20));
    assert_eq!(
        star.compile(&t).unwrap(),
        "SELECT DISTINCT * FROM \"users\" LIMIT 0 OFFSET 20"
    );
}

#[test]
fn insert_update_delete_layouts() {
    let t = pg();
    let users = Tables::new(vec![Table::new("users")]);

    let insert = Statement::new(StatementKind::Insert)
        .with_table(users.clone())
        .with_columns(Columns::parse(["name", "age"]))
        .with_values(ValueGroups::new(vec![
            ValueGroup::new(vec![Raw::new("?"), Raw::new("?")]),
            ValueGroup::new(vec![Raw::new("?"), Raw::new("DEFAULT")]),
        ]))
        .with_returning(Returning::new(Columns::parse(["id"])));
    assert_eq!(
        insert.compile(&t).unwrap(),
        "INSERT INTO \"users\" (\"name\", \"age\") VALUES (?, ?), (?, DEFAULT) RETURNING \"id\""
    );

    let defaults = Statement::new(StatementKind::Insert).with_table(users.clone());
    assert_eq!(defaults.compile(&t).unwrap(), "INSERT INTO \"users\" DEFAULT VALUES");

    let update = Statement::new(StatementKind::Update)
        .with_table(users.clone())
        .with_column_values(ColumnValues::new(vec![Assignment::assign(
            Column::new("name"),
            Raw::new("?"),
        )]))
        .with_where(Where::new(vec![raw("id = ?")]));
    assert_eq!(
        update.compile(&t).unwrap(),
        "UPDATE \"users\" SET \"name\" = ? WHERE id = ?"
    );

    let delete = Statement::new(StatementKind::Delete).with_table(users);
    assert_eq!(delete.compile(&t).unwrap(), "DELETE FROM \"users\"");
}

#[test]
fn count_and_ddl_layouts() {
    let t = pg();
    let users = Tables::new(vec![Table::new("users")]);
    let count = Statement::new(StatementKind::Count)
        .with_table(users.clone())
        .with_where(Where::new(vec![raw("active")]));
    assert_eq!(
        count.compile(&t).unwrap(),
        "SELECT COUNT(1) AS _t FROM \"users\" WHERE active"
    );
    assert_eq!(
        Statement::new(StatementKind::Truncate)
            .with_table(users.clone())
            .compile(&t)
            .unwrap(),
        "TRUNCATE TABLE \"users\""
    );
    assert_eq!(
        Statement::new(StatementKind::DropTable)
            .with_table(users)
            .compile(&t)
            .unwrap(),
        "DROP TABLE \"users\""
    );
    assert_eq!(
        Statement::new(StatementKind::DropDatabase)
            .with_database(Some(Database::new("app")))
            .compile(&t)
            .unwrap(),
        "DROP DATABASE \"app\""
    );
}

#[test]
fn invalid_statements_are_compile_errors() {
    let t = pg();
    let err = Statement::default().compile(&t).unwrap_err();
    assert!(matches!(err, SqlError::Compile(_)));

    let err = Statement::new(StatementKind::Update)
        .with_table(Tables::new(vec![Table::new("users")]))
        .compile(&t)
        .unwrap_err();
    assert!(matches!(err, SqlError::Compile(_)));

    let err = Statement::new(StatementKind::Delete).compile(&t).unwrap_err();
    assert!(matches!(err, SqlError::Compile(_)));
}

#[test]
fn amend_runs_after_cache() {
    let t = pg();
    let base =
        Statement::new(StatementKind::Select).with_table(Tables::new(vec![Table::new("jobs")]));
    let locked = base
        .clone()
        .with_amend(Some(Amend::new(|sql| format!("{sql} FOR UPDATE"))));

    assert_eq!(base.identity(), locked.identity());
    assert_eq!(base.compile(&t).unwrap(), "SELECT * FROM \"jobs\"");
    assert_eq!(locked.compile(&t).unwrap(), "SELECT * FROM \"jobs\" FOR UPDATE");
}

#[test]
fn mysql_quotes_with_backticks() {
    let t = Dialect::MySql.template(TemplateOptions::default()).unwrap();
    let stmt = Statement::new(StatementKind::Insert).with_table(Tables::new(vec![Table::new("t")]));
    assert_eq!(Column::new("a.b").compile(&t).unwrap(), "`a`.`b`");
    assert_eq!(stmt.compile(&t).unwrap(), "INSERT INTO `t` () VALUES ()");
}
