use super::where_::compile_conjunction;
use super::{Columns, Fragment, Identity, Predicate, Table, fingerprint};
use crate::error::SqlResult;
use crate::template::{Clause, Template};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JoinKind {
    /// Plain `JOIN`
    #[default]
    Join,
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl JoinKind {
    fn keyword(self) -> &'static str {
        match self {
            JoinKind::Join => "",
            JoinKind::Inner => "INNER",
            JoinKind::Left => "LEFT",
            JoinKind::Right => "RIGHT",
            JoinKind::Full => "FULL",
            JoinKind::Cross => "CROSS",
        }
    }
}

/// `ON a AND b`
#[derive(Debug, Clone, Default, PartialEq, Hash)]
pub struct On {
    items: Vec<Predicate>,
    id: Identity,
}

impl On {
    pub fn new(items: Vec<Predicate>) -> Self {
        Self {
            items,
            id: Identity::default(),
        }
    }
}

impl Fragment for On {
    fn identity(&self) -> &str {
        self.id.get_or_init(|| fingerprint("On", self))
    }

    fn compile(&self, template: &Template) -> SqlResult<String> {
        template.cached(self.identity(), || {
            let conditions = compile_conjunction(template, &self.items)?;
            if conditions.is_empty() {
                return Ok(String::new());
            }
            template.render(Clause::On, &json!({ "Conditions": conditions }))
        })
    }
}

/// `USING (a, b)`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Using {
    columns: Columns,
    id: Identity,
}

impl Using {
    pub fn new(columns: Columns) -> Self {
        Self {
            columns,
            id: Identity::default(),
        }
    }
}

impl Fragment for Using {
    fn identity(&self) -> &str {
        self.id.get_or_init(|| fingerprint("Using", self))
    }

    fn compile(&self, template: &Template) -> SqlResult<String> {
        if self.columns.is_empty() {
            return Ok(String::new());
        }
        template.cached(self.identity(), || {
            let columns = self.columns.compile(template)?;
            template.render(Clause::Using, &json!({ "Columns": columns }))
        })
    }
}

/// One `[kind] JOIN table [ON ...|USING (...)]`.
#[derive(Debug, Clone, PartialEq, Hash)]
pub struct Join {
    kind: JoinKind,
    table: Table,
    on: Option<On>,
    using: Option<Using>,
    id: Identity,
}

impl Join {
    pub fn new(kind: JoinKind, table: Table) -> Self {
        Self {
            kind,
            table,
            on: None,
            using: None,
            id: Identity::default(),
        }
    }

    pub fn with_on(&self, on: On) -> Self {
        Self {
            on: Some(on),
            id: Identity::default(),
            ..self.clone()
        }
    }

    pub fn with_using(&self, using: Using) -> Self {
        Self {
            using: Some(using),
            id: Identity::default(),
            ..self.clone()
        }
    }

    pub fn kind(&self) -> JoinKind {
        self.kind
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn on(&self) -> Option<&On> {
        self.on.as_ref()
    }

    pub fn using(&self) -> Option<&Using> {
        self.using.as_ref()
    }

    /// True once an ON or USING clause has been attached.
    pub fn is_constrained(&self) -> bool {
        self.on.is_some() || self.using.is_some()
    }
}

impl Fragment for Join {
    fn identity(&self) -> &str {
        self.id.get_or_init(|| fingerprint("Join", self))
    }

    fn compile(&self, template: &Template) -> SqlResult<String> {
        template.cached(self.identity(), || {
            let on = match &self.on {
                Some(on) => on.compile(template)?,
                None => String::new(),
            };
            let using = match &self.using {
                Some(using) => using.compile(template)?,
                None => String::new(),
            };
            template.render(
                Clause::Join,
                &json!({
                    "Kind": self.kind.keyword(),
                    "Table": self.table.compile(template)?,
                    "On": on,
                    "Using": using,
                }),
            )
        })
    }
}

/// All joins of a SELECT, space separated.
#[derive(Debug, Clone, Default, PartialEq, Hash)]
pub struct Joins {
    items: Vec<Join>,
    id: Identity,
}

impl Joins {
    pub fn new(items: Vec<Join>) -> Self {
        Self {
            items,
            id: Identity::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Fragment for Joins {
    fn identity(&self) -> &str {
        self.id.get_or_init(|| fingerprint("Joins", self))
    }

    fn compile(&self, template: &Template) -> SqlResult<String> {
        if self.items.is_empty() {
            return Ok(String::new());
        }
        template.cached(self.identity(), || {
            let mut parts = Vec::with_capacity(self.items.len());
            for join in &self.items {
                parts.push(join.compile(template)?);
            }
            Ok(parts.join(" "))
        })
    }
}
