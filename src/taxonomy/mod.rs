//! Error taxonomy: maps raw driver error text to a stable `(code, category)`
//!
//! The code is read from the driver wrapper (`rpc error: code = X desc = ...` or
//! `spanner: code = "X", desc = ...`). Only `InvalidArgument` is subdivided;
//! every other code is its own category.

mod describe;
mod rules;

use serde::{Serialize, Serializer};
use std::fmt;

pub use rules::ArgumentCategory;

const RPC_PREFIX: &str = "rpc error: code = ";
const RPC_DESC: &str = " desc = ";
const CLIENT_PREFIX: &str = "spanner: code = ";

/// gRPC-style status code reported by the target
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidArgument,
    NotFound,
    FailedPrecondition,
    AlreadyExists,
    PermissionDenied,
    Unimplemented,
    Internal,
    Unavailable,
    DeadlineExceeded,
    ResourceExhausted,
    Cancelled,
    Unknown,
    /// Code present in the wrapper but outside the known set
    Other(String),
}

impl ErrorCode {
    pub fn parse(code: &str) -> Self {
        match code {
            "InvalidArgument" => ErrorCode::InvalidArgument,
            "NotFound" => ErrorCode::NotFound,
            "FailedPrecondition" => ErrorCode::FailedPrecondition,
            "AlreadyExists" => ErrorCode::AlreadyExists,
            "PermissionDenied" => ErrorCode::PermissionDenied,
            "Unimplemented" => ErrorCode::Unimplemented,
            "Internal" => ErrorCode::Internal,
            "Unavailable" => ErrorCode::Unavailable,
            "DeadlineExceeded" => ErrorCode::DeadlineExceeded,
            "ResourceExhausted" => ErrorCode::ResourceExhausted,
            "Cancelled" => ErrorCode::Cancelled,
            "Unknown" => ErrorCode::Unknown,
            other => ErrorCode::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::InvalidArgument => "InvalidArgument",
            ErrorCode::NotFound => "NotFound",
            ErrorCode::FailedPrecondition => "FailedPrecondition",
            ErrorCode::AlreadyExists => "AlreadyExists",
            ErrorCode::PermissionDenied => "PermissionDenied",
            ErrorCode::Unimplemented => "Unimplemented",
            ErrorCode::Internal => "Internal",
            ErrorCode::Unavailable => "Unavailable",
            ErrorCode::DeadlineExceeded => "DeadlineExceeded",
            ErrorCode::ResourceExhausted => "ResourceExhausted",
            ErrorCode::Cancelled => "Cancelled",
            ErrorCode::Unknown => "Unknown",
            ErrorCode::Other(code) => code,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Category of a classified error
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Finer bucket of an `InvalidArgument` error
    Argument(ArgumentCategory),
    /// Any other code is its own category
    Code(ErrorCode),
}

impl ErrorCategory {
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCategory::Argument(category) => category.as_str(),
            ErrorCategory::Code(code) => code.as_str(),
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Classification of one raw error. Both fields are `None` for unrecognised wrappers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Taxonomy {
    pub code: Option<ErrorCode>,
    pub category: Option<ErrorCategory>,
}

impl Taxonomy {
    /// Code as text, empty when no wrapper was recognised
    pub fn code_str(&self) -> &str {
        self.code.as_ref().map(ErrorCode::as_str).unwrap_or("")
    }

    pub fn category_str(&self) -> &str {
        self.category.as_ref().map(ErrorCategory::as_str).unwrap_or("")
    }
}

/// Extracts the status code from a driver message
pub fn extract_code(raw: &str) -> Option<&str> {
    if let Some(start) = raw.find(RPC_PREFIX).map(|i| i + RPC_PREFIX.len()) {
        if let Some(end) = raw[start..].find(RPC_DESC) {
            return Some(&raw[start..start + end]);
        }
    }

    let start = raw.find(CLIENT_PREFIX)? + CLIENT_PREFIX.len();
    let quoted = raw[start..].strip_prefix('"')?;
    let end = quoted.find('"')?;
    Some(&quoted[..end])
}

/// Total mapping from raw driver text to `(code, category)`; never fails
pub fn classify(raw: &str) -> Taxonomy {
    let Some(code) = extract_code(raw).filter(|c| !c.is_empty()).map(ErrorCode::parse) else {
        return Taxonomy { code: None, category: None };
    };

    let category = match code {
        ErrorCode::InvalidArgument => ErrorCategory::Argument(rules::categorize(raw)),
        ref other => ErrorCategory::Code(other.clone()),
    };

    Taxonomy { code: Some(code), category: Some(category) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_code_rpc_wrapper() {
        let raw = "rpc error: code = NotFound desc = Table not found: ghost";
        assert_eq!(extract_code(raw), Some("NotFound"));
    }

    #[test]
    fn test_extract_code_client_wrapper() {
        let raw = r#"spanner: code = "AlreadyExists", desc = "Duplicate name in schema: t""#;
        assert_eq!(extract_code(raw), Some("AlreadyExists"));
        assert_eq!(extract_code("spanner: code = AlreadyExists"), None);
    }

    #[test]
    fn test_unrecognised_wrapper() {
        let taxonomy = classify("connection reset by peer");
        assert_eq!(taxonomy.code, None);
        assert_eq!(taxonomy.category, None);
        assert_eq!(taxonomy.code_str(), "");
        assert_eq!(taxonomy.category_str(), "");
    }

    #[test]
    fn test_closing_parenthesis_syntax_error() {
        let taxonomy =
            classify("rpc error: code = InvalidArgument desc = Syntax error: Expected ')'");
        assert_eq!(taxonomy.code, Some(ErrorCode::InvalidArgument));
        assert_eq!(taxonomy.category_str(), "Syntax Error: Missing Closing Parentheses");
    }

    #[test]
    fn test_non_argument_code_is_its_own_category() {
        for code in ["NotFound", "FailedPrecondition", "AlreadyExists", "PermissionDenied", "Unimplemented"] {
            let taxonomy = classify(&format!("rpc error: code = {} desc = whatever", code));
            assert_eq!(taxonomy.code_str(), code);
            assert_eq!(taxonomy.category_str(), code);
        }
    }

    #[test]
    fn test_unknown_code_kept_verbatim() {
        let taxonomy = classify("rpc error: code = Aborted desc = transaction aborted");
        assert_eq!(taxonomy.code, Some(ErrorCode::Other("Aborted".into())));
        assert_eq!(taxonomy.category_str(), "Aborted");
    }

    #[test]
    fn test_taxonomy_serializes_as_strings() {
        let taxonomy = classify("rpc error: code = InvalidArgument desc = Function not found: NEXTVAL");
        let json = serde_json::to_value(&taxonomy).unwrap();
        assert_eq!(json["code"], "InvalidArgument");
        assert_eq!(json["category"], "Function Not Found: NEXTVAL");
    }
}
