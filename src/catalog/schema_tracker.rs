/// Schema tracker: learns table / column / type information from CREATE TABLE text
use crate::types::{ColumnDef, ColumnType, TableSchema};
use ahash::AHashMap;
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

static CREATE_TABLE_RE: OnceLock<Regex> = OnceLock::new();

fn create_table_re() -> &'static Regex {
    CREATE_TABLE_RE.get_or_init(|| {
        Regex::new(r#"(?i)\bCREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?[`"]?(\w+)[`"]?"#)
            .expect("valid CREATE TABLE regex")
    })
}

/// Words that open a table-level element rather than a column
const TABLE_ELEMENT_WORDS: &[&str] = &[
    "CONSTRAINT", "PRIMARY", "FOREIGN", "UNIQUE", "CHECK", "KEY", "INDEX",
];

/// Extracts the table name of a CREATE TABLE statement (lower-cased)
pub fn extract_table_name(sql: &str) -> Option<String> {
    create_table_re()
        .captures(sql)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
}

/// Per-engine schema knowledge. Grows monotonically; never pre-seeded.
#[derive(Debug, Default)]
pub struct SchemaTracker {
    tables: AHashMap<String, TableSchema>,
}

impl SchemaTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the schema declared by `create_sql`.
    ///
    /// Returns `false` when nothing could be extracted; an existing entry is
    /// then left untouched. Known tables only gain columns.
    pub fn record_schema(&mut self, create_sql: &str) -> bool {
        let Some(name) = extract_table_name(create_sql) else {
            return false;
        };
        let Some(body) = table_body(create_sql) else {
            return false;
        };

        let columns: Vec<ColumnDef> = split_top_level(body)
            .into_iter()
            .filter_map(parse_column)
            .enumerate()
            .map(|(position, (column, col_type))| ColumnDef::new(column, col_type, position))
            .collect();

        if columns.is_empty() {
            return false;
        }

        let schema = TableSchema::new(name.clone(), columns);
        debug!(table = %name, columns = schema.column_count(), "recorded table schema");

        match self.tables.get_mut(&name) {
            Some(existing) => existing.merge(schema),
            None => {
                self.tables.insert(name, schema);
            }
        }
        true
    }

    pub fn get(&self, table: &str) -> Option<&TableSchema> {
        self.tables.get(&table.to_ascii_lowercase())
    }

    pub fn column_type(&self, table: &str, column: &str) -> Option<ColumnType> {
        self.get(table).and_then(|schema| schema.column_type(column))
    }

    pub fn contains(&self, table: &str) -> bool {
        self.tables.contains_key(&table.to_ascii_lowercase())
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

/// Text between the first `(` after the table name and its matching `)`
fn table_body(sql: &str) -> Option<&str> {
    let name_end = create_table_re().find(sql)?.end();
    let rest = &sql[name_end..];
    let open = rest.find('(')?;

    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (idx, ch) in rest.char_indices().skip_while(|(i, _)| *i < open) {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None => match ch {
                '\'' | '"' | '`' => quote = Some(ch),
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(&rest[open + 1..idx]);
                    }
                }
                _ => {}
            },
        }
    }
    None
}

/// Splits at commas that are outside parentheses and quotes
fn split_top_level(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (idx, ch) in body.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None => match ch {
                '\'' | '"' | '`' => quote = Some(ch),
                '(' => depth += 1,
                ')' => depth -= 1,
                ',' if depth == 0 => {
                    parts.push(&body[start..idx]);
                    start = idx + 1;
                }
                _ => {}
            },
        }
    }
    parts.push(&body[start..]);
    parts
}

/// `name TYPE ...` -> (name, coarse type); table-level elements yield `None`
fn parse_column(element: &str) -> Option<(String, Option<ColumnType>)> {
    let mut words = element.split_whitespace();
    let first = words.next()?;
    if TABLE_ELEMENT_WORDS
        .iter()
        .any(|w| w.eq_ignore_ascii_case(first))
    {
        return None;
    }

    let name = first.trim_matches(|c| c == '`' || c == '"');
    if name.is_empty() {
        return None;
    }
    let declared = words.next().unwrap_or("");
    Some((name.to_ascii_lowercase(), ColumnType::from_declared(declared)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPLOYEES: &str = "CREATE TABLE IF NOT EXISTS Employees (
        emp_id INT64 NOT NULL AUTO_INCREMENT,
        first_name STRING(50) NOT NULL,
        salary NUMERIC(10, 2),
        hire_date DATE,
        active BOOL DEFAULT (TRUE),
        note STRING(MAX) DEFAULT ('a, b'),
        location GEOGRAPHY,
        CONSTRAINT fk_dept FOREIGN KEY (dept_id) REFERENCES departments (dept_id),
        CHECK (salary > 0)
    ) PRIMARY KEY (emp_id)";

    #[test]
    fn test_extract_table_name() {
        assert_eq!(extract_table_name(EMPLOYEES), Some("employees".into()));
        assert_eq!(extract_table_name("create table `t1` (a INT64)"), Some("t1".into()));
        assert_eq!(extract_table_name("CREATE INDEX idx ON t (a)"), None);
    }

    #[test]
    fn test_record_schema() {
        let mut tracker = SchemaTracker::new();
        assert!(tracker.record_schema(EMPLOYEES));

        let schema = tracker.get("EMPLOYEES").unwrap();
        assert_eq!(
            schema.column_names().collect::<Vec<_>>(),
            vec!["emp_id", "first_name", "salary", "hire_date", "active", "note", "location"]
        );
        assert_eq!(tracker.column_type("employees", "emp_id"), Some(ColumnType::Int));
        assert_eq!(tracker.column_type("employees", "salary"), Some(ColumnType::Float));
        assert_eq!(tracker.column_type("employees", "hire_date"), Some(ColumnType::Date));
        assert_eq!(tracker.column_type("employees", "active"), Some(ColumnType::Bool));
        assert_eq!(tracker.column_type("employees", "location"), None);
    }

    #[test]
    fn test_failed_extraction_keeps_existing() {
        let mut tracker = SchemaTracker::new();
        tracker.record_schema("CREATE TABLE t (a INT64) PRIMARY KEY (a)");

        assert!(!tracker.record_schema("CREATE TABLE t"));
        assert!(!tracker.record_schema("CREATE INDEX i ON t (a)"));
        assert_eq!(tracker.column_type("t", "a"), Some(ColumnType::Int));
        assert_eq!(tracker.table_count(), 1);
    }

    #[test]
    fn test_record_schema_is_additive() {
        let mut tracker = SchemaTracker::new();
        tracker.record_schema("CREATE TABLE t (a INT64) PRIMARY KEY (a)");
        tracker.record_schema("CREATE TABLE IF NOT EXISTS t (a STRING(10), b BOOL) PRIMARY KEY (a)");

        assert_eq!(tracker.column_type("t", "a"), Some(ColumnType::Int));
        assert_eq!(tracker.column_type("t", "b"), Some(ColumnType::Bool));
    }
}
