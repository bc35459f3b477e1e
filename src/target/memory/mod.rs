//! In-process Spanner-flavoured target
//!
//! Parses each statement with [`crate::sql::parse_sql`], runs it against an
//! in-memory catalog and reports failures with the same wrappers a Spanner
//! driver uses, so the error taxonomy sees realistic text.

mod catalog;
mod dml;
mod query;

use super::{Connection, RowStream};
use crate::error::{DriverError, DriverResult, EngineError};
use crate::sql::ast::SqlStatement;
use crate::sql::evaluator::EvalError;
use crate::types::Row;
use catalog::Catalog;
use tracing::debug;

/// Commit timestamp reported by CURRENT_TIMESTAMP() and friends
pub const COMMIT_TIMESTAMP: &str = "2024-01-01T00:00:00Z";

/// Wrapper used when rendering driver errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorStyle {
    /// `rpc error: code = X desc = ...`
    #[default]
    Rpc,
    /// `spanner: code = "X", desc = "..."`
    SpannerClient,
}

/// Failure inside the memory target, before it is wrapped for the caller
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Failure {
    code: &'static str,
    desc: String,
}

impl Failure {
    pub(crate) fn invalid(desc: impl Into<String>) -> Self {
        Self { code: "InvalidArgument", desc: desc.into() }
    }

    pub(crate) fn not_found(desc: impl Into<String>) -> Self {
        Self { code: "NotFound", desc: desc.into() }
    }

    pub(crate) fn precondition(desc: impl Into<String>) -> Self {
        Self { code: "FailedPrecondition", desc: desc.into() }
    }

    pub(crate) fn already_exists(desc: impl Into<String>) -> Self {
        Self { code: "AlreadyExists", desc: desc.into() }
    }
}

impl From<EvalError> for Failure {
    fn from(err: EvalError) -> Self {
        Failure::invalid(err.to_string())
    }
}

pub(crate) type MemResult<T> = std::result::Result<T, Failure>;

/// Result of one statement
#[derive(Debug)]
pub(crate) enum Outcome {
    /// SELECT, or DML with THEN RETURN
    Rows(Vec<Row>),
    /// INSERT/UPDATE/DELETE without returned rows
    Modified(u64),
    /// DDL
    Definition,
}

/// In-memory [`Connection`]
pub struct MemoryConnection {
    catalog: Catalog,
    style: ErrorStyle,
    faults: Vec<(String, DriverError)>,
    log: Vec<String>,
}

impl Default for MemoryConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryConnection {
    /// Empty database whose `default_sequence_kind` is `bit_reversed_positive`
    pub fn new() -> Self {
        Self {
            catalog: Catalog::new(COMMIT_TIMESTAMP),
            style: ErrorStyle::default(),
            faults: Vec::new(),
            log: Vec::new(),
        }
    }

    pub fn with_error_style(mut self, style: ErrorStyle) -> Self {
        self.style = style;
        self
    }

    /// Identity columns then need an explicit sequence kind
    pub fn without_default_sequence_kind(mut self) -> Self {
        self.catalog.set_default_sequence_kind(None);
        self
    }

    /// Every later statement containing `needle` (case-insensitive) fails with `error`
    pub fn fail_on(&mut self, needle: impl Into<String>, error: DriverError) {
        self.faults.push((needle.into().to_lowercase(), error));
    }

    /// Every statement received, in order (including failed ones)
    pub fn statement_log(&self) -> &[String] {
        &self.log
    }

    /// Names of existing tables, sorted
    pub fn table_names(&self) -> Vec<String> {
        self.catalog.table_names()
    }

    /// Stored rows of `table`, in insertion order
    pub fn table_rows(&self, table: &str) -> Option<&[Row]> {
        self.catalog.table_rows(table)
    }

    fn run(&mut self, sql: &str) -> DriverResult<Outcome> {
        self.log.push(sql.to_string());

        let lower = sql.to_lowercase();
        if let Some((_, error)) = self.faults.iter().find(|(needle, _)| lower.contains(needle)) {
            debug!(statement = %sql, "injected fault");
            return Err(error.clone());
        }

        self.dispatch(sql).map_err(|failure| {
            debug!(code = failure.code, desc = %failure.desc, "memory target rejected statement");
            match self.style {
                ErrorStyle::Rpc => DriverError::status(failure.code, &failure.desc),
                ErrorStyle::SpannerClient => DriverError::spanner_client(failure.code, &failure.desc),
            }
        })
    }

    fn dispatch(&mut self, sql: &str) -> MemResult<Outcome> {
        let stmt = crate::sql::parse_sql(sql).map_err(|e| match e {
            EngineError::ParseError(msg) => Failure::invalid(format!("Syntax error: {}", msg)),
            other => Failure::invalid(other.to_string()),
        })?;

        match stmt {
            SqlStatement::CreateTable(s) => self.catalog.create_table(s),
            SqlStatement::CreateIndex(s) => self.catalog.create_index(s),
            SqlStatement::CreateView(s) => self.catalog.create_view(s),
            SqlStatement::CreateSequence(s) => self.catalog.create_sequence(s),
            SqlStatement::Drop(s) => self.catalog.drop_object(s),
            SqlStatement::AlterTable(s) => self.catalog.alter_table(s),
            SqlStatement::AlterDatabase(options) => self.catalog.alter_database(options),
            SqlStatement::Insert(s) => self.catalog.insert(s),
            SqlStatement::Update(s) => self.catalog.update(s),
            SqlStatement::Delete(s) => self.catalog.delete(s),
            SqlStatement::Select(s) => {
                let (_, rows) = self.catalog.select(&s)?;
                Ok(Outcome::Rows(rows))
            }
        }
    }
}

impl Connection for MemoryConnection {
    fn execute(&mut self, sql: &str) -> DriverResult<u64> {
        Ok(match self.run(sql)? {
            Outcome::Rows(rows) => rows.len() as u64,
            Outcome::Modified(n) => n,
            Outcome::Definition => 0,
        })
    }

    fn query_row(&mut self, sql: &str) -> DriverResult<Option<Row>> {
        Ok(match self.run(sql)? {
            Outcome::Rows(rows) => rows.into_iter().next(),
            Outcome::Modified(_) | Outcome::Definition => None,
        })
    }

    fn query(&mut self, sql: &str) -> DriverResult<RowStream<'_>> {
        match self.run(sql)? {
            Outcome::Rows(rows) => Ok(Box::new(rows.into_iter().map(Ok))),
            Outcome::Modified(_) | Outcome::Definition => Ok(Box::new(std::iter::empty())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;

    const DEPARTMENTS: &str = "CREATE TABLE departments (
        dept_id STRING(36) NOT NULL DEFAULT (GENERATE_UUID()),
        dept_name STRING(100) NOT NULL,
        location STRING(100)
    ) PRIMARY KEY (dept_id)";

    #[test]
    fn test_syntax_error_is_wrapped() {
        let mut conn = MemoryConnection::new();
        let err = conn
            .execute("CREATE TABLE t (id INT64 PRIMARY KEY, name STRING(10))")
            .unwrap_err();
        assert!(err.message().starts_with("rpc error: code = InvalidArgument desc = Syntax error: Expected ')'"));
    }

    #[test]
    fn test_spanner_client_style() {
        let mut conn = MemoryConnection::new().with_error_style(ErrorStyle::SpannerClient);
        let err = conn.execute("INSERT INTO ghost (a) VALUES (1)").unwrap_err();
        assert_eq!(
            err.message(),
            r#"spanner: code = "InvalidArgument", desc = "Table not found: ghost""#
        );
    }

    #[test]
    fn test_returning_insert_and_query() {
        let mut conn = MemoryConnection::new();
        conn.execute(DEPARTMENTS).unwrap();

        let row = conn
            .query_row("INSERT INTO departments (dept_name, location) VALUES ('Eng', 'NY') THEN RETURN dept_id")
            .unwrap()
            .unwrap();
        assert!(matches!(&row[0], Value::Text(id) if id.len() == 36));

        let rows: Vec<Row> = conn
            .query("SELECT dept_name FROM departments WHERE location = 'NY'")
            .unwrap()
            .collect::<DriverResult<_>>()
            .unwrap();
        assert_eq!(rows, vec![vec![Value::Text("Eng".into())]]);
    }

    #[test]
    fn test_execute_counts_rows() {
        let mut conn = MemoryConnection::new();
        conn.execute(DEPARTMENTS).unwrap();
        let n = conn
            .execute("INSERT INTO departments (dept_id, dept_name) VALUES ('D1', 'a'), ('D2', 'b')")
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(conn.execute("DELETE FROM departments WHERE TRUE").unwrap(), 2);
    }

    #[test]
    fn test_fault_injection_and_log() {
        let mut conn = MemoryConnection::new();
        conn.fail_on("departments", DriverError::status("PermissionDenied", "no access"));
        let err = conn.execute(DEPARTMENTS).unwrap_err();
        assert_eq!(err.message(), "rpc error: code = PermissionDenied desc = no access");
        assert_eq!(conn.statement_log().len(), 1);
        assert!(conn.table_names().is_empty());
    }
}
