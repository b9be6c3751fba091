//! Offset and cursor pagination over a [`Selector`].
//!
//! Offset mode pages with `LIMIT`/`OFFSET`. Cursor mode orders by one column
//! and continues from the last (or first) value seen: `next_page(v)` adds
//! `column > v`, `prev_page(v)` adds `column < v` with the sort reversed and
//! re-sorts the page in an outer query (both flipped for descending
//! cursors).

use super::{Field, Selector};
use crate::arg::Arg;
use crate::ast::SortColumn;
use crate::condition::Constraint;
use crate::error::{SqlError, SqlResult};
use crate::exec::{Executor, run_query_row};
use crate::row::FromRow;
use crate::value::Value;

#[derive(Debug, Clone)]
enum Position {
    /// 1-based page number.
    Page(u64),
    After(Arg),
    Before(Arg),
}

#[derive(Debug, Clone)]
struct Cursor {
    column: String,
    descending: bool,
}

impl Cursor {
    fn parse(spec: &str) -> Self {
        let spec = spec.trim();
        match spec.strip_prefix('-') {
            Some(column) => Self {
                column: column.trim().to_string(),
                descending: true,
            },
            None => Self {
                column: spec.to_string(),
                descending: false,
            },
        }
    }

    fn sort(&self, column: &str) -> SortColumn {
        if self.descending {
            SortColumn::parse(&format!("-{column}"))
        } else {
            SortColumn::parse(column)
        }
    }

    /// The comparison selecting rows after (`forward`) or before the cursor.
    fn constraint(&self, forward: bool, value: Arg) -> Constraint {
        let op = if forward != self.descending { ">" } else { "<" };
        Constraint::new(format!("{} {op}", self.column), value)
    }
}

/// LIMIT/OFFSET for a 1-based page. An offset past `u64::MAX` is recorded
/// as an error.
fn paged(selector: &Selector, page: u64, per_page: u64) -> Selector {
    match page.saturating_sub(1).checked_mul(per_page) {
        Some(offset) => selector.limit(per_page).offset(offset),
        None => selector.push(move |_| {
            Err(SqlError::construction(format!(
                "page {page} with {per_page} rows per page overflows the offset"
            )))
        }),
    }
}

/// A paginated view of a [`Selector`]. Created by [`Selector::paginate`].
#[derive(Debug, Clone)]
pub struct Paginator {
    selector: Selector,
    per_page: u64,
    cursor: Option<Cursor>,
    position: Position,
}

impl Paginator {
    pub(crate) fn new(selector: Selector, per_page: u64) -> Self {
        Self {
            selector,
            per_page: per_page.max(1),
            cursor: None,
            position: Position::Page(1),
        }
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    /// Jump to a 1-based page. Page 0 is treated as page 1.
    pub fn page(&self, page: u64) -> Self {
        Self {
            position: Position::Page(page.max(1)),
            ..self.clone()
        }
    }

    /// Paginate by `column`; a leading `-` sorts descending.
    pub fn cursor(&self, column: &str) -> Self {
        Self {
            cursor: Some(Cursor::parse(column)),
            ..self.clone()
        }
    }

    /// The page following the row whose cursor column equals `value`.
    pub fn next_page(&self, value: impl Into<Arg>) -> Self {
        Self {
            position: Position::After(value.into()),
            ..self.clone()
        }
    }

    /// The page preceding the row whose cursor column equals `value`.
    pub fn prev_page(&self, value: impl Into<Arg>) -> Self {
        Self {
            position: Position::Before(value.into()),
            ..self.clone()
        }
    }

    /// The selector for the current page.
    pub fn query(&self) -> Selector {
        let per_page = self.per_page;
        let Some(cursor) = &self.cursor else {
            return match &self.position {
                Position::Page(page) => paged(&self.selector, *page, per_page),
                Position::After(_) | Position::Before(_) => self.selector.push(|_| {
                    Err(SqlError::construction(
                        "next_page/prev_page require a cursor column",
                    ))
                }),
            };
        };

        let sort = cursor.sort(&cursor.column);
        let ordered = self.selector.push(move |q| {
            q.order_by.insert(0, sort.clone());
            Ok(())
        });

        match &self.position {
            Position::Page(page) => paged(&ordered, *page, per_page),
            Position::After(value) => ordered
                .and(cursor.constraint(true, value.clone()))
                .limit(per_page),
            Position::Before(value) => {
                let inner = ordered
                    .and(cursor.constraint(false, value.clone()))
                    .push(|q| {
                        q.order_by = q.order_by.iter().map(SortColumn::reversed).collect();
                        Ok(())
                    })
                    .limit(per_page);
                let column = cursor
                    .column
                    .rsplit('.')
                    .next()
                    .unwrap_or(&cursor.column)
                    .to_string();
                let outer = cursor.sort(&column);
                Selector::new(self.selector.template().clone())
                    .from(Field::query(inner, "p0"))
                    .push(move |q| {
                        q.order_by.push(outer.clone());
                        Ok(())
                    })
            }
        }
    }

    pub fn compile(&self) -> SqlResult<String> {
        self.query().compile()
    }

    pub fn arguments(&self) -> SqlResult<Vec<Value>> {
        self.query().arguments()
    }

    pub fn build(&self) -> SqlResult<(String, Vec<Value>)> {
        self.query().build()
    }

    /// Number of rows across all pages.
    pub async fn total_entries<E: Executor>(&self, executor: &E) -> SqlResult<u64> {
        let (sql, args) = self.selector.count_query()?;
        let row = run_query_row(executor, &sql, args).await?;
        let total: i64 = row.try_get("_t")?;
        Ok(u64::try_from(total).unwrap_or(0))
    }

    pub async fn total_pages<E: Executor>(&self, executor: &E) -> SqlResult<u64> {
        Ok(self.total_entries(executor).await?.div_ceil(self.per_page))
    }

    /// Fetch the current page mapped into `T`.
    pub async fn all<T: FromRow, E: Executor>(&self, executor: &E) -> SqlResult<Vec<T>> {
        self.query().all(executor).await
    }
}
