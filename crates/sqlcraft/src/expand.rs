//! Placeholder/argument expansion.
//!
//! [`expand`] walks `?` tokens left to right, pairing each with the next
//! argument. Lists become parenthesized placeholder groups, raw fragments are
//! inlined and expanded against their own arguments, and nested queries are
//! inlined already compiled. The result is SQL in which every remaining `?`
//! lines up with exactly one [`Value`].

use crate::arg::Arg;
use crate::error::{SqlError, SqlResult};
use crate::value::Value;

/// Maximum nesting of lists/raw fragments accepted by [`expand`].
pub const MAX_EXPANSION_DEPTH: usize = 32;

/// Expand `sql` against `args`.
///
/// Scanning stops substituting once arguments run out: remaining `?` are
/// left in place. Arguments beyond the last `?` are appended unchanged and
/// must be plain values.
pub fn expand(sql: &str, args: &[Arg]) -> SqlResult<(String, Vec<Value>)> {
    let mut out = String::with_capacity(sql.len());
    let mut values = Vec::with_capacity(args.len());
    expand_into(sql, args, 0, &mut out, &mut values)?;
    Ok((out, values))
}

fn expand_into(
    sql: &str,
    args: &[Arg],
    depth: usize,
    out: &mut String,
    values: &mut Vec<Value>,
) -> SqlResult<()> {
    if depth > MAX_EXPANSION_DEPTH {
        return Err(SqlError::expansion(format!(
            "argument nesting exceeds {MAX_EXPANSION_DEPTH} levels"
        )));
    }

    let mut pending = args.iter();
    let mut rest = sql;

    while let Some(pos) = rest.find('?') {
        let Some(arg) = pending.next() else {
            break;
        };
        out.push_str(&rest[..pos]);
        rest = &rest[pos + 1..];

        match arg {
            Arg::Value(value) => {
                out.push('?');
                values.push(value.clone());
            }
            Arg::List(items) if items.is_empty() => out.push_str("(NULL)"),
            Arg::List(items) => {
                let group = placeholder_group(items.len());
                expand_into(&group, items, depth + 1, out, values)?;
            }
            Arg::Raw(raw) => expand_into(&raw.sql, &raw.args, depth + 1, out, values)?,
            Arg::Query(query) => {
                let (sql, args) = query.compile_grouped()?;
                out.push_str(&sql);
                values.extend(args);
            }
        }
    }
    out.push_str(rest);

    for extra in pending {
        match extra {
            Arg::Value(value) => values.push(value.clone()),
            other => {
                return Err(SqlError::expansion(format!(
                    "trailing argument has no placeholder to expand into: {other:?}"
                )));
            }
        }
    }
    Ok(())
}

/// `(?, ?, ?)` with `n` placeholders.
pub fn placeholder_group(n: usize) -> String {
    format!("({})", vec!["?"; n].join(", "))
}

/// Rewrite `?` placeholders to numbered `$1, $2, ...` form.
///
/// Question marks inside single-quoted literals or double-quoted identifiers
/// are left alone.
pub fn to_numbered_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut n = 0usize;
    let mut quote: Option<char> = None;

    for c in sql.chars() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
                out.push(c);
            }
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    out.push(c);
                }
                '?' => {
                    n += 1;
                    out.push('$');
                    out.push_str(&n.to_string());
                }
                _ => out.push(c),
            },
        }
    }
    out
}
