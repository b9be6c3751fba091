//! SQL fragment tree.
//!
//! Every node implements [`Fragment`]: a memoized structural identity and a
//! compile step that consults the [`Template`] cache before running any
//! layout. Nodes are immutable once built; operations that "append" return a
//! new node with a fresh identity, so a cached entry can never go stale.

mod column;
mod join;
mod order;
mod raw;
mod statement;
mod table;
mod values;
mod where_;

pub use column::{Column, Columns, Name};
pub use join::{Join, JoinKind, Joins, On, Using};
pub use order::{GroupBy, OrderBy, Returning, SortColumn, SortOrder};
pub use raw::{Literal, Raw};
pub use statement::{Amend, Statement, StatementKind};
pub use table::{Database, Table, Tables};
pub use values::{Assignment, ColumnValue, ColumnValues, OperatorToken, ValueGroup, ValueGroups};
pub use where_::{And, Or, Predicate, Where};

use crate::error::SqlResult;
use crate::template::Template;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

/// A compilable, hashable piece of SQL.
pub trait Fragment {
    /// Structural fingerprint: type tag plus a digest of the node's fields.
    fn identity(&self) -> &str;

    /// Compile to SQL text under `template`.
    fn compile(&self, template: &Template) -> SqlResult<String>;
}

/// Lazily computed identity cell.
///
/// Excluded from the node's own structural hash and equality, so nodes can
/// derive `Hash`/`PartialEq` over all their fields.
#[derive(Clone, Default)]
pub struct Identity(OnceLock<String>);

impl Identity {
    pub fn get_or_init(&self, compute: impl FnOnce() -> String) -> &str {
        self.0.get_or_init(compute)
    }
}

impl Hash for Identity {
    fn hash<H: Hasher>(&self, _state: &mut H) {}
}

impl PartialEq for Identity {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Eq for Identity {}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.get() {
            Some(id) => f.write_str(id),
            None => f.write_str("<pending>"),
        }
    }
}

struct DigestHasher(blake3::Hasher);

impl Hasher for DigestHasher {
    fn write(&mut self, bytes: &[u8]) {
        self.0.update(bytes);
    }

    fn finish(&self) -> u64 {
        let digest = self.0.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest.as_bytes()[..8]);
        u64::from_le_bytes(head)
    }
}

/// `Tag:<blake3 hex>` over the structural hash of `node`.
pub(crate) fn fingerprint<T: Hash + ?Sized>(tag: &str, node: &T) -> String {
    let mut hasher = DigestHasher(blake3::Hasher::new());
    hasher.write(tag.as_bytes());
    node.hash(&mut hasher);
    format!("{tag}:{}", hasher.0.finalize().to_hex())
}

/// Compile each fragment, dropping empty results, and join them.
pub(crate) fn compile_joined<'a, F, I>(
    template: &Template,
    items: I,
    separator: &str,
) -> SqlResult<String>
where
    F: Fragment + 'a,
    I: IntoIterator<Item = &'a F>,
{
    let mut parts = Vec::new();
    for item in items {
        let text = item.compile(template)?;
        if !text.is_empty() {
            parts.push(text);
        }
    }
    Ok(parts.join(separator))
}

#[cfg(test)]
mod tests;
