//! Per-dialect template compiler.
//!
//! A [`Template`] owns one pre-parsed handlebars layout per clause kind, the
//! dialect's keyword and operator tokens, and the [`CompileCache`] shared by
//! every fragment compiled against it. Layouts are parsed once in
//! [`Template::new`]; rendering never re-parses.

use crate::cache::{CompileCache, DEFAULT_CACHE_CAPACITY};
use crate::condition::Operator;
use crate::dialect::DialectSpec;
use crate::error::{SqlError, SqlResult};
use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Clause kinds a dialect defines.
///
/// Layout clauses are handlebars templates rendered against a data record;
/// keyword clauses are plain tokens used verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Clause {
    // layouts
    Select,
    Count,
    Insert,
    Update,
    Delete,
    Truncate,
    DropTable,
    DropDatabase,
    Where,
    On,
    Using,
    Join,
    GroupBy,
    OrderBy,
    SortColumn,
    Returning,
    ValueGroup,
    ColumnValue,
    ClauseGroup,
    IdentifierQuote,
    ValueQuote,
    TableAlias,
    ColumnAlias,
    // keywords
    AndKeyword,
    OrKeyword,
    AscKeyword,
    DescKeyword,
    ColumnSeparator,
    ValueSeparator,
    IdentifierSeparator,
    NullValue,
    DefaultOperator,
    AssignmentOperator,
}

impl Clause {
    pub const LAYOUTS: [Clause; 23] = [
        Clause::Select,
        Clause::Count,
        Clause::Insert,
        Clause::Update,
        Clause::Delete,
        Clause::Truncate,
        Clause::DropTable,
        Clause::DropDatabase,
        Clause::Where,
        Clause::On,
        Clause::Using,
        Clause::Join,
        Clause::GroupBy,
        Clause::OrderBy,
        Clause::SortColumn,
        Clause::Returning,
        Clause::ValueGroup,
        Clause::ColumnValue,
        Clause::ClauseGroup,
        Clause::IdentifierQuote,
        Clause::ValueQuote,
        Clause::TableAlias,
        Clause::ColumnAlias,
    ];

    pub const KEYWORDS: [Clause; 10] = [
        Clause::AndKeyword,
        Clause::OrKeyword,
        Clause::AscKeyword,
        Clause::DescKeyword,
        Clause::ColumnSeparator,
        Clause::ValueSeparator,
        Clause::IdentifierSeparator,
        Clause::NullValue,
        Clause::DefaultOperator,
        Clause::AssignmentOperator,
    ];

    pub fn is_layout(self) -> bool {
        Self::LAYOUTS.contains(&self)
    }

    fn name(self) -> &'static str {
        match self {
            Clause::Select => "Select",
            Clause::Count => "Count",
            Clause::Insert => "Insert",
            Clause::Update => "Update",
            Clause::Delete => "Delete",
            Clause::Truncate => "Truncate",
            Clause::DropTable => "DropTable",
            Clause::DropDatabase => "DropDatabase",
            Clause::Where => "Where",
            Clause::On => "On",
            Clause::Using => "Using",
            Clause::Join => "Join",
            Clause::GroupBy => "GroupBy",
            Clause::OrderBy => "OrderBy",
            Clause::SortColumn => "SortColumn",
            Clause::Returning => "Returning",
            Clause::ValueGroup => "ValueGroup",
            Clause::ColumnValue => "ColumnValue",
            Clause::ClauseGroup => "ClauseGroup",
            Clause::IdentifierQuote => "IdentifierQuote",
            Clause::ValueQuote => "ValueQuote",
            Clause::TableAlias => "TableAlias",
            Clause::ColumnAlias => "ColumnAlias",
            Clause::AndKeyword => "AndKeyword",
            Clause::OrKeyword => "OrKeyword",
            Clause::AscKeyword => "AscKeyword",
            Clause::DescKeyword => "DescKeyword",
            Clause::ColumnSeparator => "ColumnSeparator",
            Clause::ValueSeparator => "ValueSeparator",
            Clause::IdentifierSeparator => "IdentifierSeparator",
            Clause::NullValue => "NullValue",
            Clause::DefaultOperator => "DefaultOperator",
            Clause::AssignmentOperator => "AssignmentOperator",
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Options for [`Template`] construction.
#[derive(Debug, Clone)]
pub struct TemplateOptions {
    /// Compiled fragments kept in the LRU cache. 0 disables caching.
    pub cache_capacity: usize,
}

impl Default for TemplateOptions {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl TemplateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }
}

/// A dialect's parsed layouts, tokens and compilation cache.
///
/// Long-lived and shared (`Arc<Template>`) by every builder of a session.
pub struct Template {
    registry: Handlebars<'static>,
    keywords: BTreeMap<Clause, String>,
    operators: BTreeMap<Operator, String>,
    cache: CompileCache,
    renders: AtomicU64,
}

impl Template {
    /// Parse every layout of `spec`.
    ///
    /// Fails with [`SqlError::Template`] if a layout does not parse or a
    /// clause or operator token is missing.
    pub fn new(spec: DialectSpec, options: TemplateOptions) -> SqlResult<Self> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);

        let DialectSpec {
            mut layouts,
            operators,
        } = spec;

        for clause in Clause::LAYOUTS {
            let text = layouts
                .remove(&clause)
                .ok_or_else(|| SqlError::Template(format!("missing layout for {clause}")))?;
            registry
                .register_template_string(clause.name(), text)
                .map_err(|e| SqlError::Template(format!("malformed layout for {clause}: {e}")))?;
        }

        let mut keywords = BTreeMap::new();
        for clause in Clause::KEYWORDS {
            let token = layouts
                .remove(&clause)
                .ok_or_else(|| SqlError::Template(format!("missing keyword for {clause}")))?;
            keywords.insert(clause, token);
        }

        for op in Operator::ALL {
            if !operators.contains_key(&op) {
                return Err(SqlError::Template(format!("missing token for operator {op:?}")));
            }
        }

        Ok(Self {
            registry,
            keywords,
            operators,
            cache: CompileCache::new(options.cache_capacity),
            renders: AtomicU64::new(0),
        })
    }

    /// Execute the pre-parsed layout for `clause` against `data`.
    pub fn render(&self, clause: Clause, data: &serde_json::Value) -> SqlResult<String> {
        let name = clause.name();
        if !self.registry.has_template(name) {
            return Err(SqlError::compile(format!("{clause} has no layout")));
        }
        self.renders.fetch_add(1, Ordering::Relaxed);

        #[cfg(feature = "tracing")]
        tracing::trace!(target: "sqlcraft.template", clause = name, "render layout");

        self.registry
            .render(name, data)
            .map_err(|e| SqlError::compile(format!("rendering {clause}: {e}")))
    }

    /// The verbatim token of a keyword clause.
    pub fn keyword(&self, clause: Clause) -> SqlResult<&str> {
        self.keywords
            .get(&clause)
            .map(String::as_str)
            .ok_or_else(|| SqlError::compile(format!("{clause} is not a keyword")))
    }

    /// The dialect token for a comparison operator.
    pub fn operator(&self, op: Operator) -> SqlResult<&str> {
        self.operators
            .get(&op)
            .map(String::as_str)
            .ok_or_else(|| SqlError::compile(format!("no token for operator {op:?}")))
    }

    /// Look up `identity` in the compilation cache, compiling and storing
    /// the text on a miss.
    pub fn cached<F>(&self, identity: &str, compile: F) -> SqlResult<String>
    where
        F: FnOnce() -> SqlResult<String>,
    {
        if let Some(hit) = self.cache.get(identity) {
            return Ok(hit);
        }
        let text = compile()?;
        self.cache.set(identity.to_string(), text.clone());
        Ok(text)
    }

    pub fn cache(&self) -> &CompileCache {
        &self.cache
    }

    /// Number of layout executions so far.
    pub fn renders(&self) -> u64 {
        self.renders.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("keywords", &self.keywords)
            .field("operators", &self.operators)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use serde_json::json;

    fn postgres() -> Template {
        Template::new(Dialect::Postgres.spec(), TemplateOptions::default()).unwrap()
    }

    #[test]
    fn renders_layout_without_escaping() {
        let t = postgres();
        let out = t
            .render(Clause::IdentifierQuote, &json!({ "Name": "a<b>&" }))
            .unwrap();
        assert_eq!(out, "\"a<b>&\"");
    }

    #[test]
    fn undefined_children_are_omitted() {
        let t = postgres();
        let out = t
            .render(Clause::Select, &json!({ "Columns": "\"a\"", "HasTable": false }))
            .unwrap();
        assert_eq!(out, "SELECT \"a\"");
    }

    #[test]
    fn keyword_clause_is_not_renderable() {
        let t = postgres();
        let err = t.render(Clause::AndKeyword, &json!({})).unwrap_err();
        assert!(matches!(err, SqlError::Compile(_)));
        assert_eq!(t.keyword(Clause::AndKeyword).unwrap(), "AND");
        assert!(t.keyword(Clause::Select).is_err());
    }

    #[test]
    fn malformed_layout_fails_fast() {
        let mut spec = Dialect::Postgres.spec();
        spec.layouts.insert(Clause::Where, "WHERE {{#if Conditions}}".into());
        let err = Template::new(spec, TemplateOptions::default()).unwrap_err();
        assert!(matches!(err, SqlError::Template(_)));
    }

    #[test]
    fn missing_clause_fails_fast() {
        let mut spec = Dialect::Postgres.spec();
        spec.layouts.remove(&Clause::Returning);
        let err = Template::new(spec, TemplateOptions::default()).unwrap_err();
        assert!(err.to_string().contains("Returning"));
    }

    #[test]
    fn cached_runs_compile_once() {
        let t = postgres();
        let mut calls = 0;
        let a = t.cached("k", || {
            calls += 1;
            Ok("x".to_string())
        });
        let b = t.cached("k", || {
            calls += 1;
            Ok("y".to_string())
        });
        assert_eq!(a.unwrap(), "x");
        assert_eq!(b.unwrap(), "x");
        assert_eq!(calls, 1);
    }
}
