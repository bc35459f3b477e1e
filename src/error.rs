//! Error types for the sqlport execution engine

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Setup-level failures.
///
/// Per-statement failures never surface here: they are recorded inside
/// [`crate::ExecutionResult`]. An `EngineError` means no statement of the batch
/// could be attempted (or that a collaborator such as cleanup failed).
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Engine already executed a batch; construct a new engine per evaluation unit")]
    AlreadyExecuted,

    #[error("Cleanup failed: {0}")]
    Cleanup(String),

    #[error("Evaluation worker for unit {0} panicked")]
    WorkerPanicked(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}

/// Raw error reported by a target connection.
///
/// The message is kept verbatim (including wrappers like
/// `rpc error: code = NotFound desc = ...`) because the error taxonomy reads it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct DriverError {
    message: String,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    /// Builds a message in the gRPC status wrapper used by Spanner drivers.
    pub fn status(code: &str, desc: impl AsRef<str>) -> Self {
        Self::new(format!("rpc error: code = {} desc = {}", code, desc.as_ref()))
    }

    /// Builds a message in the Spanner client wrapper (`spanner: code = "X", desc = ...`).
    pub fn spanner_client(code: &str, desc: impl AsRef<str>) -> Self {
        Self::new(format!("spanner: code = \"{}\", desc = \"{}\"", code, desc.as_ref()))
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub type DriverResult<T> = std::result::Result<T, DriverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_error_wrappers() {
        let err = DriverError::status("NotFound", "Table not found: ghost");
        assert_eq!(err.to_string(), "rpc error: code = NotFound desc = Table not found: ghost");

        let err = DriverError::spanner_client("AlreadyExists", "Duplicate name in schema: t");
        assert_eq!(
            err.message(),
            "spanner: code = \"AlreadyExists\", desc = \"Duplicate name in schema: t\""
        );
    }

    #[test]
    fn test_engine_error_from_driver() {
        let err: EngineError = DriverError::new("boom").into();
        assert!(matches!(err, EngineError::Driver(_)));
        assert_eq!(err.to_string(), "Driver error: boom");
    }
}
