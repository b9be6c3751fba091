use super::{ColumnValue, Fragment, Identity, Literal, Raw, fingerprint};
use crate::error::SqlResult;
use crate::template::{Clause, Template};
use regex::Regex;
use serde_json::json;
use std::sync::OnceLock;

/// One boolean term of a WHERE or ON clause.
#[derive(Debug, Clone, PartialEq, Hash)]
pub enum Predicate {
    Raw(Raw),
    Literal(Literal),
    ColumnValue(ColumnValue),
    And(And),
    Or(Or),
}

impl Predicate {
    /// True for terms that compile to nothing (an empty raw or group).
    pub fn is_empty(&self) -> bool {
        match self {
            Predicate::Raw(raw) => raw.is_empty(),
            Predicate::And(group) => group.items.iter().all(Predicate::is_empty),
            Predicate::Or(group) => group.items.iter().all(Predicate::is_empty),
            Predicate::Literal(_) | Predicate::ColumnValue(_) => false,
        }
    }
}

impl Fragment for Predicate {
    fn identity(&self) -> &str {
        match self {
            Predicate::Raw(f) => f.identity(),
            Predicate::Literal(f) => f.identity(),
            Predicate::ColumnValue(f) => f.identity(),
            Predicate::And(f) => f.identity(),
            Predicate::Or(f) => f.identity(),
        }
    }

    fn compile(&self, template: &Template) -> SqlResult<String> {
        match self {
            Predicate::Raw(f) => f.compile(template),
            Predicate::Literal(f) => f.compile(template),
            Predicate::ColumnValue(f) => f.compile(template),
            Predicate::And(f) => f.compile(template),
            Predicate::Or(f) => f.compile(template),
        }
    }
}

fn or_keyword() -> &'static Regex {
    static OR_RE: OnceLock<Regex> = OnceLock::new();
    OR_RE.get_or_init(|| Regex::new(r"(?i)\bOR\b").expect("invalid built-in OR regex"))
}

/// Compile each term, dropping the ones that come out empty.
///
/// With `conjunction` set and more than one term left, raw terms that
/// contain `OR` are parenthesized so the surrounding `AND` cannot rebind
/// them.
fn compile_terms(
    template: &Template,
    items: &[Predicate],
    conjunction: bool,
) -> SqlResult<Vec<String>> {
    let mut parts = Vec::with_capacity(items.len());
    for item in items {
        let text = item.compile(template)?;
        if !text.is_empty() {
            parts.push((text, matches!(item, Predicate::Raw(_))));
        }
    }
    if !conjunction || parts.len() < 2 {
        return Ok(parts.into_iter().map(|(text, _)| text).collect());
    }
    parts
        .into_iter()
        .map(|(text, raw)| {
            if raw && or_keyword().is_match(&text) {
                template.render(Clause::ClauseGroup, &json!({ "Clause": text }))
            } else {
                Ok(text)
            }
        })
        .collect()
}

fn compile_group(template: &Template, items: &[Predicate], keyword: Clause) -> SqlResult<String> {
    let mut parts = compile_terms(template, items, keyword == Clause::AndKeyword)?;
    match parts.len() {
        0 => Ok(String::new()),
        1 => Ok(parts.remove(0)),
        _ => {
            let joined = parts.join(&format!(" {} ", template.keyword(keyword)?));
            template.render(Clause::ClauseGroup, &json!({ "Clause": joined }))
        }
    }
}

macro_rules! logical_group {
    ($name:ident, $tag:literal, $keyword:expr, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Default, PartialEq, Hash)]
        pub struct $name {
            pub(crate) items: Vec<Predicate>,
            id: Identity,
        }

        impl $name {
            pub fn new(items: Vec<Predicate>) -> Self {
                Self {
                    items,
                    id: Identity::default(),
                }
            }

            pub fn append(&self, more: impl IntoIterator<Item = Predicate>) -> Self {
                let mut items = self.items.clone();
                items.extend(more);
                Self::new(items)
            }

            pub fn items(&self) -> &[Predicate] {
                &self.items
            }
        }

        impl Fragment for $name {
            fn identity(&self) -> &str {
                self.id.get_or_init(|| fingerprint($tag, self))
            }

            fn compile(&self, template: &Template) -> SqlResult<String> {
                template.cached(self.identity(), || compile_group(template, &self.items, $keyword))
            }
        }
    };
}

logical_group!(
    And,
    "And",
    Clause::AndKeyword,
    "AND-joined terms, parenthesized when there is more than one."
);
logical_group!(
    Or,
    "Or",
    Clause::OrKeyword,
    "OR-joined terms, parenthesized when there is more than one."
);

/// `WHERE a AND b ...`; compiles to nothing when it has no terms.
#[derive(Debug, Clone, Default, PartialEq, Hash)]
pub struct Where {
    items: Vec<Predicate>,
    id: Identity,
}

impl Where {
    pub fn new(items: Vec<Predicate>) -> Self {
        Self {
            items,
            id: Identity::default(),
        }
    }

    pub fn append(&self, more: impl IntoIterator<Item = Predicate>) -> Self {
        let mut items = self.items.clone();
        items.extend(more);
        Self::new(items)
    }

    pub fn items(&self) -> &[Predicate] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.iter().all(Predicate::is_empty)
    }
}

/// Join terms with the AND keyword, without an outer group.
pub(crate) fn compile_conjunction(template: &Template, items: &[Predicate]) -> SqlResult<String> {
    let parts = compile_terms(template, items, true)?;
    Ok(parts.join(&format!(" {} ", template.keyword(Clause::AndKeyword)?)))
}

impl Fragment for Where {
    fn identity(&self) -> &str {
        self.id.get_or_init(|| fingerprint("Where", self))
    }

    fn compile(&self, template: &Template) -> SqlResult<String> {
        template.cached(self.identity(), || {
            let conditions = compile_conjunction(template, &self.items)?;
            if conditions.is_empty() {
                return Ok(String::new());
            }
            template.render(Clause::Where, &json!({ "Conditions": conditions }))
        })
    }
}
