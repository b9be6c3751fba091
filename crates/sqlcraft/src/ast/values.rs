use super::{Column, Fragment, Identity, Raw, compile_joined, fingerprint};
use crate::condition::Operator;
use crate::error::SqlResult;
use crate::template::{Clause, Template};
use serde_json::json;

/// The operator between a column and its value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OperatorToken {
    /// The dialect's default comparison (`=`).
    Default,
    /// The dialect's assignment operator, for `SET`.
    Assign,
    Known(Operator),
    /// Verbatim; `:column` is replaced by the compiled column.
    Custom(String),
}

/// `column <op> value`, used both for predicates and assignments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnValue {
    column: Column,
    operator: OperatorToken,
    value: Raw,
    id: Identity,
}

/// A `SET column = value` pair.
pub type Assignment = ColumnValue;

impl ColumnValue {
    pub fn new(column: Column, operator: OperatorToken, value: Raw) -> Self {
        Self {
            column,
            operator,
            value,
            id: Identity::default(),
        }
    }

    pub fn assign(column: Column, value: Raw) -> Self {
        Self::new(column, OperatorToken::Assign, value)
    }

    pub fn column(&self) -> &Column {
        &self.column
    }

    pub fn operator(&self) -> &OperatorToken {
        &self.operator
    }

    pub fn value(&self) -> &Raw {
        &self.value
    }
}

impl Fragment for ColumnValue {
    fn identity(&self) -> &str {
        self.id.get_or_init(|| fingerprint("ColumnValue", self))
    }

    fn compile(&self, template: &Template) -> SqlResult<String> {
        template.cached(self.identity(), || {
            let column = self.column.compile(template)?;
            let (column, operator) = match &self.operator {
                OperatorToken::Default => (column, template.keyword(Clause::DefaultOperator)?),
                OperatorToken::Assign => (column, template.keyword(Clause::AssignmentOperator)?),
                OperatorToken::Known(op) => (column, template.operator(*op)?),
                OperatorToken::Custom(token) if token.contains(":column") => {
                    (token.replace(":column", &column), "")
                }
                OperatorToken::Custom(token) => (column, token.as_str()),
            };
            template.render(
                Clause::ColumnValue,
                &json!({
                    "Column": column,
                    "Operator": operator,
                    "Value": self.value.sql(),
                }),
            )
        })
    }
}

/// Comma-separated assignments of an UPDATE.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ColumnValues {
    items: Vec<ColumnValue>,
    id: Identity,
}

impl ColumnValues {
    pub fn new(items: Vec<ColumnValue>) -> Self {
        Self {
            items,
            id: Identity::default(),
        }
    }

    pub fn append(&self, more: impl IntoIterator<Item = ColumnValue>) -> Self {
        let mut items = self.items.clone();
        items.extend(more);
        Self::new(items)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Fragment for ColumnValues {
    fn identity(&self) -> &str {
        self.id.get_or_init(|| fingerprint("ColumnValues", self))
    }

    fn compile(&self, template: &Template) -> SqlResult<String> {
        if self.items.is_empty() {
            return Ok(String::new());
        }
        template.cached(self.identity(), || {
            compile_joined(
                template,
                &self.items,
                template.keyword(Clause::ColumnSeparator)?,
            )
        })
    }
}

/// One parenthesized row of an INSERT.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ValueGroup {
    values: Vec<Raw>,
    id: Identity,
}

impl ValueGroup {
    pub fn new(values: Vec<Raw>) -> Self {
        Self {
            values,
            id: Identity::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Fragment for ValueGroup {
    fn identity(&self) -> &str {
        self.id.get_or_init(|| fingerprint("ValueGroup", self))
    }

    fn compile(&self, template: &Template) -> SqlResult<String> {
        template.cached(self.identity(), || {
            let values = self
                .values
                .iter()
                .map(Raw::sql)
                .collect::<Vec<_>>()
                .join(template.keyword(Clause::ValueSeparator)?);
            template.render(Clause::ValueGroup, &json!({ "Values": values }))
        })
    }
}

/// All rows of an INSERT.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ValueGroups {
    groups: Vec<ValueGroup>,
    id: Identity,
}

impl ValueGroups {
    pub fn new(groups: Vec<ValueGroup>) -> Self {
        Self {
            groups,
            id: Identity::default(),
        }
    }

    pub fn append(&self, group: ValueGroup) -> Self {
        let mut groups = self.groups.clone();
        groups.push(group);
        Self::new(groups)
    }

    pub fn groups(&self) -> &[ValueGroup] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl Fragment for ValueGroups {
    fn identity(&self) -> &str {
        self.id.get_or_init(|| fingerprint("ValueGroups", self))
    }

    fn compile(&self, template: &Template) -> SqlResult<String> {
        if self.groups.is_empty() {
            return Ok(String::new());
        }
        template.cached(self.identity(), || {
            compile_joined(
                template,
                &self.groups,
                template.keyword(Clause::ValueSeparator)?,
            )
        })
    }
}
