use super::{
    ColumnValues, Columns, Database, Fragment, GroupBy, Identity, Joins, OrderBy, Returning, Tables,
    ValueGroups, Where, fingerprint,
};
use crate::error::{SqlError, SqlResult};
use crate::template::{Clause, Template};
use serde_json::json;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Which statement layout to compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Select,
    /// `SELECT COUNT(1) AS _t ...`, used for pagination totals.
    Count,
    Insert,
    Update,
    Delete,
    Truncate,
    DropTable,
    DropDatabase,
}

/// A post-compile text transform applied to the finished statement.
///
/// Not part of the statement's identity: the cached body is shared and the
/// transform runs after every lookup.
#[derive(Clone)]
pub struct Amend(Arc<dyn Fn(String) -> String + Send + Sync>);

impl Amend {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(String) -> String + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn apply(&self, sql: String) -> String {
        (self.0)(sql)
    }
}

impl Hash for Amend {
    fn hash<H: Hasher>(&self, _state: &mut H) {}
}

impl PartialEq for Amend {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Amend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Amend(..)")
    }
}

/// Root fragment of one complete query.
#[derive(Debug, Clone, Default, PartialEq, Hash)]
pub struct Statement {
    kind: Option<StatementKind>,
    table: Tables,
    database: Option<Database>,
    columns: Columns,
    values: ValueGroups,
    column_values: ColumnValues,
    r#where: Where,
    group_by: GroupBy,
    order_by: OrderBy,
    joins: Joins,
    returning: Returning,
    limit: Option<u64>,
    offset: Option<u64>,
    distinct: bool,
    amend: Option<Amend>,
    id: Identity,
}

macro_rules! setters {
    ($($(#[$meta:meta])* $fn:ident => $field:ident: $ty:ty),* $(,)?) => {
        $(
            $(#[$meta])*
            pub fn $fn(mut self, value: $ty) -> Self {
                self.$field = value;
                self.id = Identity::default();
                self
            }
        )*
    };
}

impl Statement {
    pub fn new(kind: StatementKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    setters! {
        with_kind => kind: Option<StatementKind>,
        with_table => table: Tables,
        with_database => database: Option<Database>,
        with_columns => columns: Columns,
        with_values => values: ValueGroups,
        with_column_values => column_values: ColumnValues,
        with_where => r#where: Where,
        with_group_by => group_by: GroupBy,
        with_order_by => order_by: OrderBy,
        with_joins => joins: Joins,
        with_returning => returning: Returning,
        with_limit => limit: Option<u64>,
        with_offset => offset: Option<u64>,
        with_distinct => distinct: bool,
        /// Identity is unaffected; only the final text changes.
        with_amend => amend: Option<Amend>,
    }

    pub fn kind(&self) -> Option<StatementKind> {
        self.kind
    }

    pub fn table(&self) -> &Tables {
        &self.table
    }

    pub fn where_clause(&self) -> &Where {
        &self.r#where
    }

    pub fn order_by(&self) -> &OrderBy {
        &self.order_by
    }

    pub fn joins(&self) -> &Joins {
        &self.joins
    }

    pub fn group_by(&self) -> &GroupBy {
        &self.group_by
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    fn require_table(&self, template: &Template, kind: StatementKind) -> SqlResult<String> {
        if self.table.is_empty() {
            return Err(SqlError::compile(format!("{kind:?} statement has no table")));
        }
        self.table.compile(template)
    }

    fn render(&self, kind: StatementKind, template: &Template) -> SqlResult<String> {
        let limit = self.limit.map(|n| n.to_string());
        let offset = self.offset.map(|n| n.to_string());

        match kind {
            StatementKind::Select => template.render(
                Clause::Select,
                &json!({
                    "Distinct": self.distinct,
                    "Columns": self.columns.compile(template)?,
                    "HasTable": !self.table.is_empty(),
                    "Table": self.table.compile(template)?,
                    "Joins": self.joins.compile(template)?,
                    "Where": self.r#where.compile(template)?,
                    "GroupBy": self.group_by.compile(template)?,
                    "OrderBy": self.order_by.compile(template)?,
                    "Limit": limit,
                    "Offset": offset,
                }),
            ),
            StatementKind::Count => template.render(
                Clause::Count,
                &json!({
                    "Table": self.require_table(template, kind)?,
                    "Joins": self.joins.compile(template)?,
                    "Where": self.r#where.compile(template)?,
                    "Limit": limit,
                    "Offset": offset,
                }),
            ),
            StatementKind::Insert => template.render(
                Clause::Insert,
                &json!({
                    "Table": self.require_table(template, kind)?,
                    "Columns": self.columns.compile(template)?,
                    "Values": self.values.compile(template)?,
                    "Returning": self.returning.compile(template)?,
                }),
            ),
            StatementKind::Update => {
                if self.column_values.is_empty() {
                    return Err(SqlError::compile("Update statement has no assignments"));
                }
                template.render(
                    Clause::Update,
                    &json!({
                        "Table": self.require_table(template, kind)?,
                        "ColumnValues": self.column_values.compile(template)?,
                        "Where": self.r#where.compile(template)?,
                        "Returning": self.returning.compile(template)?,
                    }),
                )
            }
            StatementKind::Delete => template.render(
                Clause::Delete,
                &json!({
                    "Table": self.require_table(template, kind)?,
                    "Where": self.r#where.compile(template)?,
                    "Returning": self.returning.compile(template)?,
                }),
            ),
            StatementKind::Truncate => template.render(
                Clause::Truncate,
                &json!({ "Table": self.require_table(template, kind)? }),
            ),
            StatementKind::DropTable => template.render(
                Clause::DropTable,
                &json!({ "Table": self.require_table(template, kind)? }),
            ),
            StatementKind::DropDatabase => {
                let database = self
                    .database
                    .as_ref()
                    .ok_or_else(|| SqlError::compile("DropDatabase statement has no database"))?;
                template.render(
                    Clause::DropDatabase,
                    &json!({ "Database": database.compile(template)? }),
                )
            }
        }
    }
}

impl Fragment for Statement {
    fn identity(&self) -> &str {
        self.id.get_or_init(|| fingerprint("Statement", self))
    }

    fn compile(&self, template: &Template) -> SqlResult<String> {
        let kind = self
            .kind
            .ok_or_else(|| SqlError::compile("statement has no kind"))?;
        let body = template.cached(self.identity(), || self.render(kind, template))?;
        Ok(match &self.amend {
            Some(amend) => amend.apply(body),
            None => body,
        })
    }
}
