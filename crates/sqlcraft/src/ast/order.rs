use super::{Column, Columns, Fragment, Identity, compile_joined, fingerprint};
use crate::error::SqlResult;
use crate::template::{Clause, Template};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn reverse(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

/// One ORDER BY term.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortColumn {
    column: Column,
    order: Option<SortOrder>,
    id: Identity,
}

impl SortColumn {
    pub fn new(column: Column, order: Option<SortOrder>) -> Self {
        Self {
            column,
            order,
            id: Identity::default(),
        }
    }

    /// Parse `"-name"` (descending), `"name DESC"`, `"name ASC"` or `"name"`.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if let Some(rest) = input.strip_prefix('-') {
            return Self::new(Column::new(rest), Some(SortOrder::Desc));
        }
        let upper = input.to_ascii_uppercase();
        for (suffix, order) in [(" DESC", SortOrder::Desc), (" ASC", SortOrder::Asc)] {
            if upper.ends_with(suffix) {
                let column = input[..input.len() - suffix.len()].trim_end();
                return Self::new(Column::new(column), Some(order));
            }
        }
        Self::new(Column::new(input), None)
    }

    pub fn column(&self) -> &Column {
        &self.column
    }

    pub fn order(&self) -> Option<SortOrder> {
        self.order
    }

    /// The same column sorted the other way; unspecified counts as ascending.
    pub fn reversed(&self) -> Self {
        let order = self.order.unwrap_or(SortOrder::Asc).reverse();
        Self::new(self.column.clone(), Some(order))
    }
}

impl Fragment for SortColumn {
    fn identity(&self) -> &str {
        self.id.get_or_init(|| fingerprint("SortColumn", self))
    }

    fn compile(&self, template: &Template) -> SqlResult<String> {
        template.cached(self.identity(), || {
            let order = match self.order {
                Some(SortOrder::Asc) => template.keyword(Clause::AscKeyword)?,
                Some(SortOrder::Desc) => template.keyword(Clause::DescKeyword)?,
                None => "",
            };
            template.render(
                Clause::SortColumn,
                &json!({
                    "Column": self.column.compile(template)?,
                    "Order": order,
                }),
            )
        })
    }
}

/// `ORDER BY a, b DESC`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct OrderBy {
    items: Vec<SortColumn>,
    id: Identity,
}

impl OrderBy {
    pub fn new(items: Vec<SortColumn>) -> Self {
        Self {
            items,
            id: Identity::default(),
        }
    }

    pub fn append(&self, more: impl IntoIterator<Item = SortColumn>) -> Self {
        let mut items = self.items.clone();
        items.extend(more);
        Self::new(items)
    }

    /// Every term with its direction flipped.
    pub fn reversed(&self) -> Self {
        Self::new(self.items.iter().map(SortColumn::reversed).collect())
    }

    pub fn items(&self) -> &[SortColumn] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Fragment for OrderBy {
    fn identity(&self) -> &str {
        self.id.get_or_init(|| fingerprint("OrderBy", self))
    }

    fn compile(&self, template: &Template) -> SqlResult<String> {
        if self.items.is_empty() {
            return Ok(String::new());
        }
        template.cached(self.identity(), || {
            let columns = compile_joined(
                template,
                &self.items,
                template.keyword(Clause::ColumnSeparator)?,
            )?;
            template.render(Clause::OrderBy, &json!({ "Columns": columns }))
        })
    }
}

macro_rules! column_clause {
    ($name:ident, $tag:literal, $clause:expr, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
        pub struct $name {
            columns: Columns,
            id: Identity,
        }

        impl $name {
            pub fn new(columns: Columns) -> Self {
                Self {
                    columns,
                    id: Identity::default(),
                }
            }

            pub fn append(&self, more: impl IntoIterator<Item = Column>) -> Self {
                Self::new(self.columns.append(more))
            }

            pub fn columns(&self) -> &Columns {
                &self.columns
            }

            pub fn is_empty(&self) -> bool {
                self.columns.is_empty()
            }
        }

        impl Fragment for $name {
            fn identity(&self) -> &str {
                self.id.get_or_init(|| fingerprint($tag, self))
            }

            fn compile(&self, template: &Template) -> SqlResult<String> {
                if self.columns.is_empty() {
                    return Ok(String::new());
                }
                template.cached(self.identity(), || {
                    let columns = self.columns.compile(template)?;
                    template.render($clause, &json!({ "Columns": columns }))
                })
            }
        }
    };
}

column_clause!(GroupBy, "GroupBy", Clause::GroupBy, "`GROUP BY a, b`");
column_clause!(Returning, "Returning", Clause::Returning, "`RETURNING a, b`");
