use super::{Fragment, Identity, fingerprint};
use crate::error::SqlResult;
use crate::template::{Clause, Template};
use crate::value::Value;
use serde_json::json;

/// SQL text emitted verbatim. Placeholders in it have already been expanded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Raw {
    sql: String,
    id: Identity,
}

impl Raw {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            id: Identity::default(),
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

impl Fragment for Raw {
    fn identity(&self) -> &str {
        self.id.get_or_init(|| fingerprint("Raw", self))
    }

    fn compile(&self, _template: &Template) -> SqlResult<String> {
        Ok(self.sql.clone())
    }
}

/// A value inlined as a SQL literal instead of being bound.
#[derive(Debug, Clone, PartialEq, Hash)]
pub struct Literal {
    value: Value,
    id: Identity,
}

impl Literal {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            id: Identity::default(),
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl Fragment for Literal {
    fn identity(&self) -> &str {
        self.id.get_or_init(|| fingerprint("Literal", self))
    }

    fn compile(&self, template: &Template) -> SqlResult<String> {
        template.cached(self.identity(), || match &self.value {
            Value::Null => Ok(template.keyword(Clause::NullValue)?.to_string()),
            Value::Bool(true) => Ok("TRUE".to_string()),
            Value::Bool(false) => Ok("FALSE".to_string()),
            Value::Int(v) => Ok(v.to_string()),
            Value::Float(v) => Ok(v.to_string()),
            other => {
                let text = other.to_string().replace('\'', "''");
                template.render(Clause::ValueQuote, &json!({ "Value": text }))
            }
        })
    }
}
