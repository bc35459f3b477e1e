//! Value synthesizer
//!
//! Replaces `@name` and `$N` placeholders with literal SQL values. Named
//! placeholders go through a fixed chain, first hit wins:
//!
//! 1. identifier propagation for foreign-key-shaped names
//! 2. schema-type tier (declared column type from the schema tracker)
//! 3. name-heuristic tier
//! 4. generic default
//!
//! Positional placeholders are mapped to a column name (INSERT column list,
//! then known column order) and resolved like named ones; without a column
//! they take the next value of a fallback sample list.

use crate::catalog::{IdentifierRegistry, SchemaTracker};
use crate::config::EngineConfig;
use crate::sql::evaluator::generate_uuid;
use crate::types::{ColumnType, QuoteStyle};
use ahash::AHashMap;
use regex::Regex;
use std::sync::OnceLock;

const DEFAULT_LITERAL: &str = "'sample_value'";

const SAMPLE_DATE: &str = "2024-01-01";
const SAMPLE_TIMESTAMP: &str = "2024-01-01T00:00:00Z";

/// Positional values used when no column is known
const FALLBACK_SAMPLES: &[&str] = &[
    "'Sample Name'",
    "'New York'",
    "'test@example.com'",
    "'2024-01-01'",
    "75000",
    "1",
    "'ACTIVE'",
    "'Developer'",
    "40",
    "'555-1234'",
];

/// How a name rule looks at a (lower-cased) placeholder name
#[derive(Debug, Clone, Copy)]
enum NameMatch {
    /// Every fragment occurs somewhere in the name
    Contains(&'static [&'static str]),
    Suffix(&'static str),
}

impl NameMatch {
    fn matches(&self, name: &str) -> bool {
        match self {
            NameMatch::Contains(parts) => parts.iter().all(|p| name.contains(p)),
            NameMatch::Suffix(suffix) => name.ends_with(suffix),
        }
    }
}

/// Key-shaped column name: `id`, `*_id`, `id_*`
fn is_key_column(name: &str) -> bool {
    name == "id" || name.ends_with("_id") || name.starts_with("id_")
}

/// Name-heuristic tier, in priority order
const NAME_RULES: &[(NameMatch, &str)] = &[
    (NameMatch::Contains(&["first", "name"]), "'John'"),
    (NameMatch::Contains(&["last", "name"]), "'Doe'"),
    (NameMatch::Contains(&["dept", "name"]), "'Engineering'"),
    (NameMatch::Contains(&["project", "name"]), "'Test Project'"),
    (NameMatch::Contains(&["name"]), "'Sample Name'"),
    (NameMatch::Contains(&["email"]), "'test@example.com'"),
    (NameMatch::Contains(&["location"]), "'New York'"),
    // `updated_at` contains "date"; timestamps first
    (NameMatch::Suffix("_at"), "'2024-01-01T00:00:00Z'"),
    (NameMatch::Suffix("_time"), "'2024-01-01T00:00:00Z'"),
    (NameMatch::Contains(&["timestamp"]), "'2024-01-01T00:00:00Z'"),
    (NameMatch::Contains(&["date"]), "'2024-01-01'"),
    (NameMatch::Contains(&["salary"]), "75000"),
    (NameMatch::Contains(&["budget"]), "50000"),
    (NameMatch::Contains(&["hours"]), "40"),
    // any name containing "id" (`empId`, `userid`) after the more specific rules
    (NameMatch::Contains(&["id"]), "1"),
    (NameMatch::Contains(&["status"]), "'ACTIVE'"),
    (NameMatch::Contains(&["role"]), "'Developer'"),
    (NameMatch::Contains(&["phone"]), "'555-1234'"),
];

/// Name-heuristic tier alone
fn name_literal(name: &str) -> Option<&'static str> {
    let lower = name.to_ascii_lowercase();
    NAME_RULES
        .iter()
        .find(|(rule, _)| rule.matches(&lower))
        .map(|(_, literal)| *literal)
}

/// Schema-type tier alone
fn typed_literal(name: &str, col_type: ColumnType, style: QuoteStyle) -> String {
    match col_type {
        ColumnType::Int => "1".to_string(),
        ColumnType::Float => "100.0".to_string(),
        ColumnType::Bool => "TRUE".to_string(),
        ColumnType::Date => format!("DATE '{}'", SAMPLE_DATE),
        ColumnType::Timestamp => format!("TIMESTAMP '{}'", SAMPLE_TIMESTAMP),
        ColumnType::String => {
            if is_key_column(&name.to_ascii_lowercase()) {
                return style.quote(&generate_uuid());
            }
            match name_literal(name) {
                Some(literal) if literal.starts_with('\'') => literal.to_string(),
                Some(literal) => style.quote(literal),
                None => DEFAULT_LITERAL.to_string(),
            }
        }
    }
}

static INSERT_COLUMNS_RE: OnceLock<Regex> = OnceLock::new();

fn insert_columns_re() -> &'static Regex {
    INSERT_COLUMNS_RE.get_or_init(|| {
        Regex::new(r#"(?is)\bINSERT\s+(?:INTO\s+)?[`"]?\w+[`"]?\s*\(([^)]*)\)\s*(?:VALUES|SELECT)\b"#)
            .expect("valid INSERT column list regex")
    })
}

/// Explicit column list of an INSERT (lower-cased, unquoted)
fn insert_columns(sql: &str) -> Vec<String> {
    insert_columns_re()
        .captures(sql)
        .and_then(|caps| caps.get(1))
        .map(|list| {
            list.as_str()
                .split(',')
                .map(|c| c.trim().trim_matches(|q| q == '`' || q == '"').to_ascii_lowercase())
                .filter(|c| !c.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Placeholder occurrence found while scanning
enum Placeholder {
    Named(String),
    Positional(usize),
}

/// Resolves placeholders of one statement at a time.
///
/// Borrows the engine's per-batch knowledge; never mutates it.
pub struct ValueSynthesizer<'a> {
    schema: &'a SchemaTracker,
    registry: &'a IdentifierRegistry,
    config: &'a EngineConfig,
}

impl<'a> ValueSynthesizer<'a> {
    pub fn new(
        schema: &'a SchemaTracker,
        registry: &'a IdentifierRegistry,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            schema,
            registry,
            config,
        }
    }

    /// Returns `sql` with every placeholder outside string literals replaced.
    ///
    /// `table` is the statement's target; it decides which identifiers are
    /// propagated and which schema entry is consulted.
    pub fn populate_parameters(&self, sql: &str, table: Option<&str>) -> String {
        let columns = insert_columns(sql);
        let mut cache: AHashMap<String, String> = AHashMap::new();
        let mut fallback_cursor = 0usize;

        substitute(sql, |placeholder| {
            let key = match &placeholder {
                Placeholder::Named(name) => format!("@{}", name.to_ascii_lowercase()),
                Placeholder::Positional(n) => format!("${}", n),
            };
            if let Some(value) = cache.get(&key) {
                return value.clone();
            }

            let value = match placeholder {
                Placeholder::Named(name) => self.resolve_named(&name, table),
                Placeholder::Positional(n) => match self.positional_column(n, &columns, table) {
                    Some(column) => self.resolve_named(&column, table),
                    None => {
                        let value = FALLBACK_SAMPLES
                            .get(fallback_cursor)
                            .copied()
                            .unwrap_or(DEFAULT_LITERAL);
                        fallback_cursor += 1;
                        value.to_string()
                    }
                },
            };
            cache.insert(key, value.clone());
            value
        })
    }

    /// Full chain for one column / parameter name
    pub fn resolve_named(&self, name: &str, table: Option<&str>) -> String {
        if let Some(literal) = self.propagated_identifier(name, table) {
            return literal;
        }
        if let Some(col_type) = table.and_then(|t| self.schema.column_type(t, name)) {
            return typed_literal(name, col_type, self.config.quote_style);
        }
        if let Some(literal) = name_literal(name) {
            return literal.to_string();
        }
        DEFAULT_LITERAL.to_string()
    }

    /// Captured identifier of the referenced table, or the NULL sentinel when
    /// nothing was captured. `None` when the name is not foreign-key shaped or
    /// references the insert target itself.
    fn propagated_identifier(&self, name: &str, table: Option<&str>) -> Option<String> {
        let referenced = self.config.referenced_table(name)?;

        if table.is_some_and(|t| t.eq_ignore_ascii_case(referenced)) {
            return None;
        }

        Some(match self.registry.lookup(referenced) {
            Some(literal) => literal.to_string(),
            None => self.config.null_sentinel.clone(),
        })
    }

    /// Column a `$n` placeholder stands for
    fn positional_column(&self, n: usize, columns: &[String], table: Option<&str>) -> Option<String> {
        let idx = n.checked_sub(1)?;
        if !columns.is_empty() {
            return columns.get(idx).cloned();
        }
        let schema = self.schema.get(table?)?;
        schema.columns.get(idx).map(|col| col.name.clone())
    }
}

/// Walks `sql`, calling `resolve` for each placeholder outside quotes
fn substitute(sql: &str, mut resolve: impl FnMut(Placeholder) -> String) -> String {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len());
    let mut quote: Option<char> = None;
    let mut i = 0;

    let is_ident = |c: char| c.is_alphanumeric() || c == '_';

    while i < chars.len() {
        let ch = chars[i];

        if let Some(q) = quote {
            out.push(ch);
            if ch == '\\' {
                if let Some(&escaped) = chars.get(i + 1) {
                    out.push(escaped);
                    i += 1;
                }
            } else if ch == q {
                quote = None;
            }
            i += 1;
            continue;
        }

        let prev_ident = i > 0 && (is_ident(chars[i - 1]) || chars[i - 1] == '@');
        match ch {
            '\'' | '"' | '`' => {
                quote = Some(ch);
                out.push(ch);
                i += 1;
            }
            '@' if !prev_ident && chars.get(i + 1).is_some_and(|&c| is_ident(c)) => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && is_ident(chars[end]) {
                    end += 1;
                }
                let name: String = chars[start..end].iter().collect();
                out.push_str(&resolve(Placeholder::Named(name)));
                i = end;
            }
            '$' if !prev_ident && chars.get(i + 1).is_some_and(|c| c.is_ascii_digit()) => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && chars[end].is_ascii_digit() {
                    end += 1;
                }
                let digits: String = chars[start..end].iter().collect();
                match digits.parse::<usize>() {
                    Ok(n) => out.push_str(&resolve(Placeholder::Positional(n))),
                    Err(_) => out.push_str(&chars[i..end].iter().collect::<String>()),
                }
                i = end;
            }
            _ => {
                out.push(ch);
                i += 1;
            }
        }
    }

    out
}
