//! Core data types shared by the engine and its targets

mod statement;
mod table;

pub use statement::{Kind, Statement};
pub use table::{ColumnDef, ColumnType, TableSchema};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Value read back from a target connection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Value {
    /// Integer value
    Integer(i64),

    /// Floating point value
    Float(f64),

    /// Boolean value
    Bool(bool),

    /// Text string
    Text(String),

    /// Calendar date, `YYYY-MM-DD`
    Date(String),

    /// RFC 3339 timestamp
    Timestamp(String),

    /// Null value
    Null,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Renders the value as a GoogleSQL literal that can be interpolated into SQL text.
    pub fn to_sql_literal(&self) -> String {
        self.to_sql_literal_in(QuoteStyle::Backslash)
    }

    /// Same, with string escaping for the given dialect
    pub fn to_sql_literal_in(&self, style: QuoteStyle) -> String {
        match self {
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Bool(true) => "TRUE".to_string(),
            Value::Bool(false) => "FALSE".to_string(),
            Value::Text(s) => style.quote(s),
            Value::Date(d) => format!("DATE {}", style.quote(d)),
            Value::Timestamp(ts) => format!("TIMESTAMP {}", style.quote(ts)),
            Value::Null => "NULL".to_string(),
        }
    }

    /// GoogleSQL type name, used in target error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "INT64",
            Value::Float(_) => "FLOAT64",
            Value::Bool(_) => "BOOL",
            Value::Text(_) => "STRING",
            Value::Date(_) => "DATE",
            Value::Timestamp(_) => "TIMESTAMP",
            Value::Null => "NULL",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", format_float(*v)),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Text(s) | Value::Date(s) | Value::Timestamp(s) => write!(f, "{}", s),
            Value::Null => write!(f, "NULL"),
        }
    }
}

/// How a dialect escapes quotes inside string literals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStyle {
    /// GoogleSQL / MySQL: `\'` and `\\`
    #[default]
    Backslash,
    /// Standard SQL / PostgreSQL: `''`, backslash is literal
    Doubled,
}

impl QuoteStyle {
    /// Wraps text in single quotes, escaped for this dialect
    pub fn quote(self, s: &str) -> String {
        let mut out = String::with_capacity(s.len() + 2);
        out.push('\'');
        for ch in s.chars() {
            match (self, ch) {
                (QuoteStyle::Backslash, '\\') => out.push_str("\\\\"),
                (QuoteStyle::Backslash, '\'') => out.push_str("\\'"),
                (QuoteStyle::Doubled, '\'') => out.push_str("''"),
                _ => out.push(ch),
            }
        }
        out.push('\'');
        out
    }
}

fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 {
        format!("{:.1}", f)
    } else {
        f.to_string()
    }
}

/// A row returned by a target connection
pub type Row = Vec<Value>;
