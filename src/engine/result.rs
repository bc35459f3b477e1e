/// Execution outcomes
use crate::taxonomy::{self, Taxonomy};
use crate::types::Kind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One recorded statement failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionError {
    /// Stage the statement ran in
    pub stage: Kind,
    /// Statement text as submitted
    pub statement: String,
    /// Driver message, verbatim
    pub message: String,
}

impl ExecutionError {
    pub fn new(stage: Kind, statement: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            stage,
            statement: statement.into(),
            message: message.into(),
        }
    }

    pub fn taxonomy(&self) -> Taxonomy {
        taxonomy::classify(&self.message)
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.message)
    }
}

/// What a successful INSERT produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum InsertId {
    /// Identifier returned by the returning clause, as an SQL literal
    Generated(String),
    /// Row written, nothing returned
    Success,
}

/// Outcome of one INSERT
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertResult {
    pub statement: String,
    /// Text actually sent (placeholders substituted)
    pub executed: String,
    pub id: Option<InsertId>,
    pub error: Option<String>,
}

impl InsertResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of one SELECT
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    pub statement: String,
    pub row_count: usize,
    pub error: Option<String>,
}

/// Outcome of one UPDATE / DELETE / ALTER / other statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherResult {
    pub statement: String,
    pub affected_rows: u64,
    pub error: Option<String>,
}

/// Aggregate result of one batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub total_statements: usize,
    pub create_statements: usize,
    pub insert_statements: usize,
    pub select_statements: usize,
    pub drop_statements: usize,
    pub other_statements: usize,
    pub executed_count: usize,
    pub skipped_count: usize,
    pub errors: Vec<ExecutionError>,
    pub inserted_records: Vec<InsertResult>,
    pub query_results: Vec<QueryResult>,
    pub other_results: Vec<OtherResult>,
}

impl ExecutionResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub(crate) fn record_error(&mut self, error: ExecutionError) {
        self.errors.push(error);
    }
}
