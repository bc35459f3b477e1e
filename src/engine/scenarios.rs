//! End-to-end batches against the memory target

use super::*;
use crate::config::EngineConfig;
use crate::report::FileReport;
use crate::sql::split_statements;
use crate::target::{Connection, FixtureCleanup, MemoryConnection};
use crate::taxonomy::{classify, ErrorCode};
use crate::types::{Kind, Value};
use std::time::Duration;

const DEPARTMENTS: &str = "CREATE TABLE departments (
    dept_id STRING(36) NOT NULL DEFAULT (GENERATE_UUID()),
    dept_name STRING(100) NOT NULL,
    location STRING(100)
) PRIMARY KEY (dept_id)";

const EMPLOYEES: &str = "CREATE TABLE employees (
    emp_id STRING(36) NOT NULL DEFAULT (GENERATE_UUID()),
    first_name STRING(50),
    last_name STRING(50),
    email STRING(100),
    hire_date DATE,
    salary FLOAT64,
    dept_id STRING(36),
    CONSTRAINT fk_emp_dept FOREIGN KEY (dept_id) REFERENCES departments (dept_id)
) PRIMARY KEY (emp_id)";

const INSERT_DEPARTMENT: &str =
    "INSERT INTO departments (dept_name, location) VALUES (@dept_name, @location) THEN RETURN dept_id";

const INSERT_EMPLOYEE: &str = "INSERT INTO employees (first_name, last_name, email, hire_date, salary, dept_id) \
     VALUES (@first_name, @last_name, @email, @hire_date, @salary, @dept_id) THEN RETURN emp_id";

#[test]
fn test_drop_of_missing_table_is_clean() {
    let mut conn = MemoryConnection::new();
    let mut engine = ExecutionEngine::new(&mut conn, EngineConfig::for_spanner()).unwrap();
    let result = engine.execute_statements(&["DROP TABLE ghost"]).unwrap();
    assert_eq!(result.executed_count, 1);
    assert!(result.errors.is_empty());
    assert_eq!(result.drop_statements, 1);
}

#[test]
fn test_repeated_drop_of_existing_table() {
    let mut conn = MemoryConnection::new();
    conn.execute("CREATE TABLE t (id INT64 NOT NULL) PRIMARY KEY (id)").unwrap();
    {
        let mut engine = ExecutionEngine::new(&mut conn, EngineConfig::for_spanner()).unwrap();
        let result = engine.execute_statements(&["DROP TABLE t", "DROP TABLE t"]).unwrap();
        assert_eq!(result.executed_count, 2);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
    }
    assert!(conn.table_names().is_empty());
}

#[test]
fn test_generated_key_flows_into_child_insert() {
    let mut conn = MemoryConnection::new();
    let mut engine = ExecutionEngine::new(&mut conn, EngineConfig::for_spanner()).unwrap();
    let result = engine
        .execute_statements(&[DEPARTMENTS, EMPLOYEES, INSERT_DEPARTMENT, INSERT_EMPLOYEE])
        .unwrap();

    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert_eq!(result.create_statements, 2);
    assert_eq!(result.executed_count, 4);
    assert!(result.inserted_records.iter().all(InsertResult::is_ok));

    let dept_id = engine.registry().lookup("departments").unwrap().to_string();
    let employee = &result.inserted_records[1];
    assert!(employee.statement.contains("@dept_id"));
    assert!(employee.executed.contains(&dept_id), "{}", employee.executed);
    assert!(!employee.executed.contains("NULL"));
    assert!(engine.registry().lookup("employees").is_some());
}

#[test]
fn test_explicit_key_is_propagated_verbatim() {
    let mut conn = MemoryConnection::new();
    {
        let mut engine = ExecutionEngine::new(&mut conn, EngineConfig::for_spanner()).unwrap();
        let result = engine
            .execute_statements(&[
                DEPARTMENTS,
                EMPLOYEES,
                "INSERT INTO departments (dept_id, dept_name) VALUES ('D1', @dept_name) THEN RETURN dept_id",
                INSERT_EMPLOYEE,
            ])
            .unwrap();
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(engine.registry().lookup("departments"), Some("'D1'"));
    }

    let rows = conn.table_rows("employees").unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].contains(&Value::Text("D1".into())));
}

#[test]
fn test_inserts_run_in_dependency_order() {
    // child insert listed first; the foreign key only holds if the parent row goes in first
    let mut conn = MemoryConnection::new();
    let mut engine = ExecutionEngine::new(&mut conn, EngineConfig::for_spanner()).unwrap();
    let result = engine
        .execute_statements(&[INSERT_EMPLOYEE, INSERT_DEPARTMENT, DEPARTMENTS, EMPLOYEES])
        .unwrap();

    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert!(result.inserted_records[0].statement.starts_with("INSERT INTO departments"));
    assert!(result.inserted_records[1].statement.starts_with("INSERT INTO employees"));
}

#[test]
fn test_insert_into_unknown_table() {
    let mut conn = MemoryConnection::new();
    let mut engine = ExecutionEngine::new(&mut conn, EngineConfig::for_spanner()).unwrap();
    let result = engine
        .execute_statements(&[DEPARTMENTS, "INSERT INTO offices (office_name) VALUES (@office_name)"])
        .unwrap();

    assert_eq!(result.executed_count, 1);
    assert_eq!(result.skipped_count, 1);
    assert_eq!(result.errors.len(), 1);

    let error = &result.errors[0];
    assert_eq!(error.stage, Kind::Insert);
    let taxonomy = error.taxonomy();
    assert!(matches!(
        taxonomy.code,
        Some(ErrorCode::NotFound) | Some(ErrorCode::InvalidArgument)
    ));
    assert_eq!(result.inserted_records[0].error.as_deref(), Some(error.message.as_str()));
}

#[test]
fn test_missing_paren_is_a_syntax_error() {
    let taxonomy = classify("rpc error: code = InvalidArgument desc = Syntax error: Expected ')'");
    assert_eq!(taxonomy.code_str(), "InvalidArgument");
    assert_eq!(taxonomy.category_str(), "Syntax Error: Missing Closing Parentheses");

    // the memory target produces the same message for an unterminated column list
    let mut conn = MemoryConnection::new();
    let mut engine = ExecutionEngine::new(&mut conn, EngineConfig::for_spanner()).unwrap();
    let result = engine
        .execute_statements(&["CREATE TABLE broken (id INT64 NOT NULL PRIMARY KEY (id)"])
        .unwrap();
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].taxonomy().code_str(), "InvalidArgument");
}

#[test]
fn test_script_round_trip_with_report() {
    let script = format!(
        "-- fixture\n{};\n{};\n{};\n{};\nSELECT e.first_name, d.dept_name FROM employees e \
         JOIN departments d ON e.dept_id = d.dept_id;\nDROP TABLE missing_one;\n",
        DEPARTMENTS, EMPLOYEES, INSERT_DEPARTMENT, INSERT_EMPLOYEE
    );
    let statements = split_statements(&script);
    assert_eq!(statements.len(), 6);

    let mut conn = MemoryConnection::new();
    let mut engine = ExecutionEngine::new(&mut conn, EngineConfig::for_spanner()).unwrap();
    let result = engine.execute_statements(statements.as_slice()).unwrap();
    assert!(!result.has_errors(), "{:?}", result.errors);
    assert_eq!(result.query_results[0].row_count, 1);

    let report = FileReport::from_execution("fixture.sql", &result, Duration::from_millis(5));
    assert!(!report.has_errors());
    assert_eq!(report.error_rate, 0.0);

    engine.cleanup().unwrap();
    drop(engine);
    assert!(conn.table_names().is_empty());
}

#[test]
fn test_fixture_cleanup_tolerates_missing_objects() {
    let mut conn = MemoryConnection::new();
    let fixture = FixtureCleanup::for_spanner_fixture();
    {
        let mut engine = ExecutionEngine::new(&mut conn, EngineConfig::for_spanner())
            .unwrap()
            .with_repository(&fixture);
        engine.execute_statements(&[DEPARTMENTS, EMPLOYEES]).unwrap();
        engine.cleanup().unwrap();
    }
    assert!(conn.table_names().is_empty());
}
