use super::column::{Name, parse_reference, quote_identifier};
use super::{Fragment, Identity, compile_joined, fingerprint};
use crate::error::SqlResult;
use crate::template::{Clause, Template};
use serde_json::json;

/// A table reference: a name or a parenthesized subquery, optionally aliased.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Table {
    name: Name,
    alias: Option<String>,
    id: Identity,
}

impl Table {
    /// Parse `"schema.users AS u"`, `"users u"` or `"users"`.
    pub fn new(input: &str) -> Self {
        let (name, alias) = parse_reference(input);
        Self {
            name,
            alias,
            id: Identity::default(),
        }
    }

    /// A table expression emitted verbatim, e.g. a compiled subquery.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            name: Name::Raw(sql.into()),
            alias: None,
            id: Identity::default(),
        }
    }

    pub fn with_alias(&self, alias: impl Into<String>) -> Self {
        Self {
            name: self.name.clone(),
            alias: Some(alias.into()),
            id: Identity::default(),
        }
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }
}

impl Fragment for Table {
    fn identity(&self) -> &str {
        self.id.get_or_init(|| fingerprint("Table", self))
    }

    fn compile(&self, template: &Template) -> SqlResult<String> {
        template.cached(self.identity(), || {
            let table = self.name.compile(template)?;
            match &self.alias {
                None => Ok(table),
                Some(alias) => template.render(
                    Clause::TableAlias,
                    &json!({
                        "Table": table,
                        "Alias": quote_identifier(template, alias)?,
                    }),
                ),
            }
        })
    }
}

/// The comma-separated FROM list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Tables {
    items: Vec<Table>,
    id: Identity,
}

impl Tables {
    pub fn new(items: Vec<Table>) -> Self {
        Self {
            items,
            id: Identity::default(),
        }
    }

    pub fn append(&self, more: impl IntoIterator<Item = Table>) -> Self {
        let mut items = self.items.clone();
        items.extend(more);
        Self::new(items)
    }

    /// A new list with the last table aliased. `None` if the list is empty.
    pub fn alias_last(&self, alias: &str) -> Option<Self> {
        let (last, rest) = self.items.split_last()?;
        let mut items = rest.to_vec();
        items.push(last.with_alias(alias));
        Some(Self::new(items))
    }

    pub fn items(&self) -> &[Table] {
        &self.items
    }

    pub fn first(&self) -> Option<&Table> {
        self.items.first()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Fragment for Tables {
    fn identity(&self) -> &str {
        self.id.get_or_init(|| fingerprint("Tables", self))
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

/// A database name, as used by `DROP DATABASE`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Database {
    name: String,
    id: Identity,
}

impl Database {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: Identity::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Fragment for Database {
    fn identity(&self) -> &str {
        self.id.get_or_init(|| fingerprint("Database", self))
    }

    fn compile(&self, template: &Template) -> SqlResult<String> {
        template.cached(self.identity(), || quote_identifier(template, &self.name))
    }
}
