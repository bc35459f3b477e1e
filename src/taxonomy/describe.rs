//! Human-readable descriptions with fix guidance, used by the file report

use super::{ArgumentCategory, ErrorCategory, ErrorCode};

impl ErrorCode {
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::InvalidArgument => "Invalid SQL syntax or unsupported features. FIX: Check for target-specific syntax requirements (e.g. (CURRENT_TIMESTAMP()) defaults, required clauses in views)",
            ErrorCode::NotFound => "Referenced table, column, or object not found. FIX: Ensure all tables/columns exist before referencing them, or create them first in dependency order",
            ErrorCode::FailedPrecondition => "Constraint violations or prerequisite not met. FIX: Check for NOT NULL constraints, foreign key violations, or missing required data",
            ErrorCode::AlreadyExists => "Object already exists (duplicate creation). FIX: Use CREATE OR REPLACE, or check if object exists before creating",
            ErrorCode::PermissionDenied => "Insufficient permissions for operation. FIX: Verify the user has the required permissions for the database operation",
            ErrorCode::Unimplemented => "Feature not implemented by the target. FIX: Use alternative supported syntax or features",
            ErrorCode::Internal => "Internal target error. FIX: Retry the operation or contact support",
            ErrorCode::Unavailable => "Service temporarily unavailable. FIX: Retry with exponential backoff",
            ErrorCode::DeadlineExceeded => "Operation timeout. FIX: Optimize query performance or increase timeout settings",
            ErrorCode::ResourceExhausted => "Resource limits exceeded. FIX: Reduce query complexity, add pagination, or increase quotas",
            ErrorCode::Cancelled => "Operation was cancelled. FIX: Check for client-side cancellation or timeouts",
            ErrorCode::Unknown => "Unknown error occurred. FIX: Check error details for more specific information",
            ErrorCode::Other(_) => "Unknown error code",
        }
    }
}

impl ArgumentCategory {
    pub fn description(&self) -> &'static str {
        match self {
            ArgumentCategory::SyntaxCurrentTimestamp => "DEFAULT values must be between parentheses. FIX: Use (CURRENT_TIMESTAMP()) for timestamp defaults",
            ArgumentCategory::SyntaxMissingParentheses => "Statement is missing a required opening parenthesis. FIX: Add the missing '(' where the parser expects it",
            ArgumentCategory::SyntaxMissingClosingParentheses => "Statement is missing a required closing parenthesis. FIX: Add the missing ')'; PRIMARY KEY goes after the column list",
            ArgumentCategory::SyntaxGeneral => "Syntax errors not matching a specific pattern. FIX: Check statement structure against the target SQL reference",
            ArgumentCategory::TypeMismatchGenerateUuid => "GENERATE_UUID() yields STRING and cannot fill an INT64 column. FIX: Use STRING(36) DEFAULT (GENERATE_UUID()) for UUID keys",
            ArgumentCategory::TypeMismatchGeneral => "Data type mismatch between expected and provided types. FIX: Verify column types match inserted/compared values",
            ArgumentCategory::UnsupportedSequenceKind => "The sequence was not properly defined. FIX: Avoid sequences, use GENERATE_UUID() for primary keys",
            ArgumentCategory::UnsupportedGeneral => "Feature unsupported by the target. FIX: Replace with a compatible alternative",
            ArgumentCategory::MissingSqlSecurity => "VIEW definition missing the required SQL SECURITY clause. FIX: Add 'SQL SECURITY INVOKER' to the view definition",
            ArgumentCategory::MissingClauseGeneral => "Statement missing a required clause. FIX: Add the clauses the target syntax requires",
            ArgumentCategory::FunctionNotFoundNextval => "NEXTVAL() is not available. FIX: Use GENERATE_UUID() or application-generated values",
            ArgumentCategory::FunctionNotFoundGeneral => "Function not available on the target. FIX: Check the function reference for a supported alternative",
            ArgumentCategory::IdentityMissingSequenceKind => "Identity columns require an explicit sequence kind. FIX: Avoid identity columns, use GENERATE_UUID() for primary keys",
            ArgumentCategory::TableNotFound => "Table reference rejected as InvalidArgument rather than NotFound. FIX: Usually the table's CREATE failed earlier; fix that first",
            ArgumentCategory::ForeignKeySyntax => "Foreign key constraint syntax error. FIX: Use CONSTRAINT name FOREIGN KEY (col) REFERENCES table (col)",
            ArgumentCategory::DefaultValueParsing => "Default value expression cannot be parsed. FIX: Use simple literals or supported functions in parentheses",
            ArgumentCategory::ConstraintUnsupported => "Constraint definition rejected by the target. FIX: Simplify the CHECK expression or drop the constraint",
            ArgumentCategory::ViewDefinition => "Error in view definition. FIX: Ensure the view uses a SELECT and includes SQL SECURITY",
            ArgumentCategory::Other => "InvalidArgument errors not matching a specific pattern. FIX: Review the message for the specific syntax issue",
        }
    }
}

impl ErrorCategory {
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCategory::Argument(category) => category.description(),
            ErrorCategory::Code(ErrorCode::NotFound) => "Referenced objects not found. FIX: Usually an earlier CREATE failed; fix that first and ignore this error",
            ErrorCategory::Code(ErrorCode::FailedPrecondition) => "Constraint violations or prerequisites not met. FIX: Ensure data meets NOT NULL, foreign key, and other constraints",
            ErrorCategory::Code(ErrorCode::AlreadyExists) => "Attempting to create objects that already exist. FIX: Use CREATE OR REPLACE or check existence first",
            ErrorCategory::Code(code) => code.description(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::classify;

    #[test]
    fn test_every_category_described() {
        let raw = [
            "rpc error: code = InvalidArgument desc = Syntax error: Expected ')'",
            "rpc error: code = NotFound desc = Table not found: t",
            "rpc error: code = Internal desc = boom",
            "rpc error: code = Aborted desc = retry",
        ];
        for msg in raw {
            let taxonomy = classify(msg);
            let category = taxonomy.category.unwrap();
            assert!(!category.description().is_empty());
        }
        assert_eq!(ErrorCode::Other("Aborted".into()).description(), "Unknown error code");
    }
}
