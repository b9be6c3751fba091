use super::{Fragment, Identity, compile_joined, fingerprint};
use crate::error::SqlResult;
use crate::template::{Clause, Template};
use regex::Regex;
use serde_json::json;
use std::sync::OnceLock;

/// A possibly qualified object name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Name {
    /// Dot-separated identifier parts, each quoted on output (`*` excepted).
    Ident(Vec<String>),
    /// Emitted verbatim: expressions, function calls, subqueries.
    Raw(String),
}

impl Name {
    /// Classify a bare name: anything that is not a plain dotted
    /// identifier is kept raw.
    pub fn parse(input: &str) -> Name {
        let input = input.trim();
        let plain = !input.is_empty()
            && !input.contains([
                '(', ')', ' ', '\t', '\n', '"', '`', '\'', '?', ':', '+', '-', '/', '|',
            ])
            && input.split('.').all(|part| !part.is_empty());
        if plain {
            Name::Ident(input.split('.').map(str::to_string).collect())
        } else {
            Name::Raw(input.to_string())
        }
    }

    pub(crate) fn compile(&self, template: &Template) -> SqlResult<String> {
        match self {
            Name::Raw(sql) => Ok(sql.clone()),
            Name::Ident(parts) => {
                let separator = template.keyword(Clause::IdentifierSeparator)?;
                let mut quoted = Vec::with_capacity(parts.len());
                for part in parts {
                    if part == "*" {
                        quoted.push(part.clone());
                    } else {
                        quoted.push(quote_identifier(template, part)?);
                    }
                }
                Ok(quoted.join(separator))
            }
        }
    }
}

pub(crate) fn quote_identifier(template: &Template, name: &str) -> SqlResult<String> {
    template.render(Clause::IdentifierQuote, &json!({ "Name": name }))
}

fn alias_pattern() -> &'static Regex {
    static ALIAS_RE: OnceLock<Regex> = OnceLock::new();
    ALIAS_RE.get_or_init(|| {
        Regex::new(r"(?is)^(.+)\s+AS\s+(\S+)$").expect("invalid built-in alias regex")
    })
}

/// Split `"name AS alias"` (or `"name alias"` for plain names) into parts.
pub(crate) fn parse_reference(input: &str) -> (Name, Option<String>) {
    let input = input.trim();
    if let Some(caps) = alias_pattern().captures(input) {
        let alias = caps[2].trim_matches(['"', '`']).to_string();
        return (Name::parse(&caps[1]), Some(alias));
    }
    if !input.contains('(') {
        let parts: Vec<&str> = input.split_whitespace().collect();
        if let [name, alias] = parts.as_slice() {
            return (Name::parse(name), Some(alias.trim_matches(['"', '`']).to_string()));
        }
    }
    (Name::parse(input), None)
}

/// A column reference, optionally aliased.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Column {
    name: Name,
    alias: Option<String>,
    id: Identity,
}

impl Column {
    /// Parse `"t.name AS n"`, `"name"`, `"*"`, `"COUNT(*) AS c"`.
    pub fn new(input: &str) -> Self {
        let (name, alias) = parse_reference(input);
        Self {
            name,
            alias,
            id: Identity::default(),
        }
    }

    /// A column expression emitted verbatim.
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

impl Fragment for Column {
    fn identity(&self) -> &str {
        self.id.get_or_init(|| fingerprint("Column", self))
    }

    fn compile(&self, template: &Template) -> SqlResult<String> {
        template.cached(self.identity(), || {
            let column = self.name.compile(template)?;
            match &self.alias {
                None => Ok(column),
                Some(alias) => template.render(
                    Clause::ColumnAlias,
                    &json!({
                        "Column": column,
                        "Alias": quote_identifier(template, alias)?,
                    }),
                ),
            }
        })
    }
}

/// A comma-separated column list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Columns {
    items: Vec<Column>,
    id: Identity,
}

impl Columns {
    pub fn new(items: Vec<Column>) -> Self {
        Self {
            items,
            id: Identity::default(),
        }
    }

    /// Parse each name with [`Column::new`].
    pub fn parse<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self::new(names.into_iter().map(Column::new).collect())
    }

    /// A new list with `more` appended.
    pub fn append(&self, more: impl IntoIterator<Item = Column>) -> Self {
        let mut items = self.items.clone();
        items.extend(more);
        Self::new(items)
    }

    pub fn items(&self) -> &[Column] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Fragment for Columns {
    fn identity(&self) -> &str {
        self.id.get_or_init(|| fingerprint("Columns", self))
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
