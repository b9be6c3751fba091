//! Dialect definitions.
//!
//! A [`DialectSpec`] is pure data: clause layouts, keyword tokens and
//! operator tokens. It is serializable so a dialect can also be loaded from
//! a config file instead of the built-in tables below.

use crate::condition::Operator;
use crate::error::SqlResult;
use crate::template::{Clause, Template, TemplateOptions};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The per-dialect surface consumed by [`Template::new`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialectSpec {
    /// Layout text for layout clauses, verbatim token for keyword clauses.
    pub layouts: BTreeMap<Clause, String>,
    pub operators: BTreeMap<Operator, String>,
}

impl DialectSpec {
    pub fn with_layout(mut self, clause: Clause, text: impl Into<String>) -> Self {
        self.layouts.insert(clause, text.into());
        self
    }

    pub fn with_operator(mut self, op: Operator, token: impl Into<String>) -> Self {
        self.operators.insert(op, token.into());
        self
    }
}

/// Built-in dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    MySql,
    Sqlite,
}

impl Dialect {
    pub fn spec(self) -> DialectSpec {
        match self {
            Dialect::Postgres => postgres(),
            Dialect::MySql => mysql(),
            Dialect::Sqlite => sqlite(),
        }
    }

    /// Parse this dialect into a ready [`Template`].
    pub fn template(self, options: TemplateOptions) -> SqlResult<Template> {
        Template::new(self.spec(), options)
    }
}

const SELECT: &str = "SELECT{{#if Distinct}} DISTINCT{{/if}} {{#if Columns}}{{Columns}}{{else}}*{{/if}}\
{{#if HasTable}} FROM {{Table}}{{/if}}{{#if Joins}} {{Joins}}{{/if}}{{#if Where}} {{Where}}{{/if}}\
{{#if GroupBy}} {{GroupBy}}{{/if}}{{#if OrderBy}} {{OrderBy}}{{/if}}\
{{#if Limit}} LIMIT {{Limit}}{{/if}}{{#if Offset}} OFFSET {{Offset}}{{/if}}";

const COUNT: &str = "SELECT COUNT(1) AS _t FROM {{Table}}{{#if Joins}} {{Joins}}{{/if}}{{#if Where}} {{Where}}{{/if}}\
{{#if Limit}} LIMIT {{Limit}}{{/if}}{{#if Offset}} OFFSET {{Offset}}{{/if}}";

const UPDATE: &str =
    "UPDATE {{Table}} SET {{ColumnValues}}{{#if Where}} {{Where}}{{/if}}{{#if Returning}} {{Returning}}{{/if}}";

const DELETE: &str = "DELETE FROM {{Table}}{{#if Where}} {{Where}}{{/if}}{{#if Returning}} {{Returning}}{{/if}}";

fn base() -> DialectSpec {
    let mut spec = DialectSpec::default()
        .with_layout(Clause::Select, SELECT)
        .with_layout(Clause::Count, COUNT)
        .with_layout(
            Clause::Insert,
            "INSERT INTO {{Table}}{{#if Columns}} ({{Columns}}){{/if}}\
{{#if Values}} VALUES {{Values}}{{else}} DEFAULT VALUES{{/if}}{{#if Returning}} {{Returning}}{{/if}}",
        )
        .with_layout(Clause::Update, UPDATE)
        .with_layout(Clause::Delete, DELETE)
        .with_layout(Clause::Truncate, "TRUNCATE TABLE {{Table}}")
        .with_layout(Clause::DropTable, "DROP TABLE {{Table}}")
        .with_layout(Clause::DropDatabase, "DROP DATABASE {{Database}}")
        .with_layout(Clause::Where, "WHERE {{Conditions}}")
        .with_layout(Clause::On, "ON {{Conditions}}")
        .with_layout(Clause::Using, "USING ({{Columns}})")
        .with_layout(
            Clause::Join,
            "{{#if Kind}}{{Kind}} {{/if}}JOIN {{Table}}{{#if On}} {{On}}{{/if}}{{#if Using}} {{Using}}{{/if}}",
        )
        .with_layout(Clause::GroupBy, "GROUP BY {{Columns}}")
        .with_layout(Clause::OrderBy, "ORDER BY {{Columns}}")
        .with_layout(Clause::SortColumn, "{{Column}}{{#if Order}} {{Order}}{{/if}}")
        .with_layout(Clause::Returning, "RETURNING {{Columns}}")
        .with_layout(Clause::ValueGroup, "({{Values}})")
        .with_layout(
            Clause::ColumnValue,
            "{{Column}}{{#if Operator}} {{Operator}}{{/if}}{{#if Value}} {{Value}}{{/if}}",
        )
        .with_layout(Clause::ClauseGroup, "({{Clause}})")
        .with_layout(Clause::IdentifierQuote, "\"{{Name}}\"")
        .with_layout(Clause::ValueQuote, "'{{Value}}'")
        .with_layout(Clause::TableAlias, "{{Table}} AS {{Alias}}")
        .with_layout(Clause::ColumnAlias, "{{Column}} AS {{Alias}}")
        .with_layout(Clause::AndKeyword, "AND")
        .with_layout(Clause::OrKeyword, "OR")
        .with_layout(Clause::AscKeyword, "ASC")
        .with_layout(Clause::DescKeyword, "DESC")
        .with_layout(Clause::ColumnSeparator, ", ")
        .with_layout(Clause::ValueSeparator, ", ")
        .with_layout(Clause::IdentifierSeparator, ".")
        .with_layout(Clause::NullValue, "NULL")
        .with_layout(Clause::DefaultOperator, "=")
        .with_layout(Clause::AssignmentOperator, "=");

    for op in Operator::ALL {
        spec = spec.with_operator(op, op.sql());
    }
    spec
}

fn postgres() -> DialectSpec {
    base()
        .with_operator(Operator::Regexp, "~")
        .with_operator(Operator::NotRegexp, "!~")
}

fn mysql() -> DialectSpec {
    base()
        .with_layout(
            Clause::Insert,
            "INSERT INTO {{Table}}{{#if Columns}} ({{Columns}}){{/if}}\
{{#if Values}} VALUES {{Values}}{{else}} () VALUES (){{/if}}",
        )
        .with_layout(
            Clause::Update,
            "UPDATE {{Table}} SET {{ColumnValues}}{{#if Where}} {{Where}}{{/if}}",
        )
        .with_layout(Clause::Delete, "DELETE FROM {{Table}}{{#if Where}} {{Where}}{{/if}}")
        .with_layout(Clause::IdentifierQuote, "`{{Name}}`")
}

fn sqlite() -> DialectSpec {
    base()
        .with_layout(Clause::Truncate, "DELETE FROM {{Table}}")
        .with_layout(Clause::DropDatabase, "DETACH DATABASE {{Database}}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_dialects_parse() {
        for dialect in [Dialect::Postgres, Dialect::MySql, Dialect::Sqlite] {
            assert!(dialect.template(TemplateOptions::default()).is_ok(), "{dialect:?}");
        }
    }

    #[test]
    fn spec_round_trips_through_json() {
        let spec = Dialect::MySql.spec();
        let json = serde_json::to_string(&spec).unwrap();
        let back: DialectSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(spec, back);
    }

    #[test]
    fn regexp_tokens_differ_per_dialect() {
        let pg = Dialect::Postgres.spec();
        let my = Dialect::MySql.spec();
        assert_eq!(pg.operators[&Operator::Regexp], "~");
        assert_eq!(my.operators[&Operator::Regexp], "REGEXP");
    }
}
