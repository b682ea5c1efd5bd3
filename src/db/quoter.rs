//! Identifier and value quoting for MySQL.
//!
//! SQL templates may reference tables as `{{name}}` (or `{{%name}}` to apply
//! the table prefix) and columns as `[[name]]`. The quoter rewrites those
//! macros into backtick-quoted identifiers. Every operation is idempotent:
//! names that already carry a backtick or an unresolved macro pass through.

use crate::models::DbValue;
use regex::{Captures, Regex};
use std::sync::LazyLock;

const QUOTE: char = '`';

static MACRO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{(%?[\w\-. ]+%?)\}\}|\[\[([\w\-. ]+)\]\]").expect("valid macro regex")
});

static RAW_TABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(.*?)\}\}").expect("valid table macro regex"));

/// Quote a string literal the way `mysql_real_escape_string` does.
pub fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\x1A' => out.push_str("\\Z"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Quoter {
    table_prefix: String,
}

impl Quoter {
    pub fn new(table_prefix: impl Into<String>) -> Self {
        Self {
            table_prefix: table_prefix.into(),
        }
    }

    pub fn table_prefix(&self) -> &str {
        &self.table_prefix
    }

    /// Quote a value for use in a query. Non-string values are returned unchanged.
    pub fn quote_value(&self, value: DbValue) -> DbValue {
        match value {
            DbValue::String(s) => DbValue::String(quote_string(&s)),
            other => other,
        }
    }

    /// Quote a table name. Names with a macro or a quote character are kept.
    pub fn quote_table_name(&self, name: &str) -> String {
        if name.contains("{{") || name.contains(QUOTE) {
            return name.to_string();
        }
        format!("{QUOTE}{name}{QUOTE}")
    }

    /// Quote a column name, quoting a `table.` qualifier separately.
    pub fn quote_column_name(&self, name: &str) -> String {
        if name.contains("[[") {
            return name.to_string();
        }

        let (prefix, name) = match name.rfind('.') {
            Some(pos) => (
                format!("{}.", self.quote_table_name(&name[..pos])),
                &name[pos + 1..],
            ),
            None => (String::new(), name),
        };

        if name.contains("{{") {
            return name.to_string();
        }

        format!("{}{}", prefix, Self::quote_simple_column_name(name))
    }

    fn quote_simple_column_name(name: &str) -> String {
        if name == "*" || name.contains(QUOTE) {
            return name.to_string();
        }
        format!("{QUOTE}{name}{QUOTE}")
    }

    /// Rewrite `{{table}}`, `{{%table}}` and `[[column]]` macros into quoted names.
    pub fn quote_sql(&self, sql: &str) -> String {
        MACRO_RE
            .replace_all(sql, |caps: &Captures<'_>| {
                if let Some(column) = caps.get(2) {
                    return self.quote_column_name(column.as_str());
                }
                let table = caps.get(1).map_or("", |m| m.as_str());
                self.quote_table_name(table)
                    .replace('%', &self.table_prefix)
            })
            .into_owned()
    }

    /// Strip `{{ }}` delimiters and apply the table prefix.
    ///
    /// Names without a macro are returned unchanged.
    pub fn raw_table_name(&self, name: &str) -> String {
        if !name.contains("{{") {
            return name.to_string();
        }
        RAW_TABLE_RE
            .replace_all(name, "$1")
            .replace('%', &self.table_prefix)
    }
}
