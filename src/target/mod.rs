//! Target database seams
//!
//! The engine only talks to a target through [`Connection`]; a [`Repository`]
//! may take over teardown of the fixed business schema it owns.

pub mod memory;

pub use memory::{ErrorStyle, MemoryConnection};

use crate::error::{DriverError, DriverResult};
use crate::types::Row;
use tracing::debug;

/// Row iterator returned by [`Connection::query`]
pub type RowStream<'a> = Box<dyn Iterator<Item = DriverResult<Row>> + 'a>;

/// Live connection to a target database
pub trait Connection {
    /// Executes a statement that returns no rows; yields the affected row count
    fn execute(&mut self, sql: &str) -> DriverResult<u64>;

    /// Runs a statement and returns its first row, if any
    fn query_row(&mut self, sql: &str) -> DriverResult<Option<Row>>;

    /// Runs a query and iterates its rows
    fn query(&mut self, sql: &str) -> DriverResult<RowStream<'_>>;
}

/// Owner of a fixed schema, able to tear it down
pub trait Repository {
    fn cleanup_db(&self, conn: &mut dyn Connection) -> DriverResult<()>;
}

/// Drops a fixed list of objects, tolerating ones that are already gone.
///
/// Every statement is attempted; the first failure is returned.
#[derive(Debug, Clone)]
pub struct FixtureCleanup {
    statements: Vec<String>,
}

impl FixtureCleanup {
    pub fn new(statements: Vec<String>) -> Self {
        Self { statements }
    }

    /// Teardown of the employees/departments/projects example schema
    pub fn for_spanner_fixture() -> Self {
        let statements = [
            "DROP VIEW IF EXISTS employee_details",
            "DROP INDEX IF EXISTS idx_project_status",
            "DROP INDEX IF EXISTS idx_dept_location",
            "DROP INDEX IF EXISTS idx_emp_name",
            "DROP INDEX IF EXISTS idx_emp_email",
            "DROP TABLE IF EXISTS project_assignments",
            "DROP TABLE IF EXISTS projects",
            "DROP TABLE IF EXISTS employees",
            "DROP TABLE IF EXISTS departments",
        ];
        Self::new(statements.iter().map(|s| s.to_string()).collect())
    }

    pub fn statements(&self) -> &[String] {
        &self.statements
    }
}

impl Repository for FixtureCleanup {
    fn cleanup_db(&self, conn: &mut dyn Connection) -> DriverResult<()> {
        let mut first_error: Option<DriverError> = None;
        for sql in &self.statements {
            if let Err(e) = conn.execute(sql) {
                debug!(statement = %sql, error = %e, "fixture cleanup statement failed");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_cleanup_on_empty_target() {
        let mut conn = MemoryConnection::new();
        let cleanup = FixtureCleanup::for_spanner_fixture();
        cleanup.cleanup_db(&mut conn).unwrap();
        assert_eq!(conn.statement_log().len(), cleanup.statements().len());
    }

    #[test]
    fn test_fixture_cleanup_drops_schema() {
        let mut conn = MemoryConnection::new();
        conn.execute("CREATE TABLE departments (dept_id STRING(36) NOT NULL, name STRING(100)) PRIMARY KEY (dept_id)")
            .unwrap();
        conn.execute("CREATE INDEX idx_dept_location ON departments (name)").unwrap();

        FixtureCleanup::for_spanner_fixture().cleanup_db(&mut conn).unwrap();
        let err = conn.query_row("SELECT * FROM departments").unwrap_err();
        assert!(err.message().contains("Table not found: departments"));
    }

    #[test]
    fn test_fixture_cleanup_reports_first_error() {
        let mut conn = MemoryConnection::new();
        conn.fail_on("idx_emp_name", DriverError::status("Unavailable", "try later"));
        let err = FixtureCleanup::for_spanner_fixture()
            .cleanup_db(&mut conn)
            .unwrap_err();
        assert!(err.message().contains("Unavailable"));
        // later statements were still attempted
        assert!(conn.statement_log().iter().any(|s| s.contains("departments")));
    }
}
