//! Per-file report: totals, ranked error tallies, errors and correction hints

use super::tally::{Tally, TallyEntry};
use crate::engine::ExecutionResult;
use crate::taxonomy::{ArgumentCategory, ErrorCategory, ErrorCode, Taxonomy};
use crate::types::Kind;
use ahash::AHashMap;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Tally key for messages outside both driver wrappers
const UNRECOGNIZED: &str = "Unrecognized";
const UNRECOGNIZED_DESCRIPTION: &str = "Message did not match a known driver error format";

/// Ranked tally row with its description
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedItem {
    pub key: String,
    pub count: usize,
    pub description: &'static str,
}

/// One error as shown in the report
#[derive(Debug, Clone, Serialize)]
pub struct ReportedError {
    pub stage: Kind,
    pub statement: String,
    pub message: String,
    pub taxonomy: Taxonomy,
}

impl fmt::Display for ReportedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.message)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub name: String,
    pub total_statements: usize,
    pub executed_count: usize,
    pub failed_count: usize,
    /// Failed statements as a percentage of all statements
    pub error_rate: f64,
    pub elapsed: Duration,
    pub code_tally: Vec<RankedItem>,
    pub category_tally: Vec<RankedItem>,
    /// DROP/CREATE failures first, then the rest in execution order
    pub errors: Vec<ReportedError>,
}

impl FileReport {
    pub fn from_execution(name: impl Into<String>, result: &ExecutionResult, elapsed: Duration) -> Self {
        let mut errors: Vec<ReportedError> = result
            .errors
            .iter()
            .map(|e| ReportedError {
                stage: e.stage,
                statement: e.statement.clone(),
                message: e.message.clone(),
                taxonomy: e.taxonomy(),
            })
            .collect();
        // 根因（DROP/CREATE）排在前面，级联错误在后
        errors.sort_by_key(|e| !is_root_stage(e.stage));

        let mut codes = Tally::new();
        let mut categories = Tally::new();
        let mut descriptions: AHashMap<String, &'static str> = AHashMap::new();
        for error in &errors {
            match &error.taxonomy.code {
                Some(code) => {
                    codes.add(code.as_str());
                    descriptions.insert(code.as_str().to_string(), code.description());
                }
                None => codes.add(UNRECOGNIZED),
            }
            if let Some(category) = &error.taxonomy.category {
                categories.add(category.as_str());
                descriptions.insert(category.as_str().to_string(), category.description());
            }
        }

        let failed_count = errors.len();
        let error_rate = if result.total_statements == 0 {
            0.0
        } else {
            failed_count as f64 / result.total_statements as f64 * 100.0
        };

        Self {
            name: name.into(),
            total_statements: result.total_statements,
            executed_count: result.executed_count,
            failed_count,
            error_rate,
            elapsed,
            code_tally: describe(codes.ranked(), &descriptions),
            category_tally: describe(categories.ranked(), &descriptions),
            errors,
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    fn code_count(&self, code: &ErrorCode) -> usize {
        self.code_tally
            .iter()
            .find(|item| item.key == code.as_str())
            .map(|item| item.count)
            .unwrap_or(0)
    }

    fn has_category(&self, pred: impl Fn(&ErrorCategory) -> bool) -> bool {
        self.errors
            .iter()
            .filter_map(|e| e.taxonomy.category.as_ref())
            .any(pred)
    }

    /// Fix suggestions derived from the error patterns; empty when nothing failed
    pub fn correction_hints(&self) -> Vec<String> {
        if !self.has_errors() {
            return Vec::new();
        }
        let mut hints: Vec<String> = Vec::new();
        let root_failures = self.errors.iter().any(|e| is_root_stage(e.stage));

        if self.has_category(|c| c.as_str().starts_with("Syntax Error")) {
            hints.extend(lines(&[
                "SYNTAX ERROR PATTERNS DETECTED:",
                "- Syntax errors found. Common issues:",
                "  - DEFAULT CURRENT_TIMESTAMP() must be written DEFAULT (CURRENT_TIMESTAMP())",
                "  - Views require an SQL SECURITY INVOKER clause after the view name",
                "  - RETURNING must be replaced with THEN RETURN",
                "  - PRIMARY KEY goes after the closing parenthesis of the column list",
            ]));
        }

        let mut execution: Vec<String> = Vec::new();
        if self.code_count(&ErrorCode::NotFound) > 0 {
            if root_failures {
                execution.push("- Table/column not found errors (likely cascading):".into());
                execution.push("  - An earlier DROP/CREATE failed; fix that statement first and ignore these".into());
            } else {
                execution.extend(lines(&[
                    "- Table/column not found errors:",
                    "  - Create tables in dependency order (referenced tables first)",
                    "  - Verify table and column names match exactly",
                    "  - Check for typos in table/column references",
                ]));
            }
        }
        if self.code_count(&ErrorCode::FailedPrecondition) > 0 {
            execution.extend(lines(&[
                "- Constraint violation errors:",
                "  - Make primary keys generated, e.g. `key STRING(36) DEFAULT (GENERATE_UUID())`",
                "  - Give NOT NULL columns values in INSERT statements",
                "  - Insert referenced rows before the rows pointing at them",
                "  - Check that values match the declared column types",
            ]));
        }
        if self.code_count(&ErrorCode::InvalidArgument) > 0 {
            execution.extend(lines(&[
                "- Invalid argument errors (often dialect related):",
                "  - Use syntax and functions the target supports",
                "  - Replace unsupported features with target alternatives",
                "  - Check function signatures and argument types",
            ]));
        }
        if self.has_category(|c| matches!(c, ErrorCategory::Argument(ArgumentCategory::TableNotFound))) {
            execution.extend(lines(&[
                "- Table references rejected as InvalidArgument:",
                "  - Usually the table's CREATE failed earlier",
                "  - Fix table creation first, then retry the queries",
            ]));
        }
        if !execution.is_empty() {
            hints.push("EXECUTION ERROR PATTERNS DETECTED:".into());
            hints.extend(execution);
        }

        hints.extend(lines(&[
            "BEST PRACTICES:",
            "- PRIMARY KEY must be outside the column definitions: ') PRIMARY KEY (column_name)'",
            "- Use GENERATE_UUID() for primary keys instead of auto-increment",
            "- Create tables before referencing them in foreign keys or queries",
            "- Use STRING(36) with generated UUIDs for primary keys",
            "- Include SQL SECURITY INVOKER in every view definition",
            "- Use ARRAY<TYPE> for array columns",
        ]));
        hints
    }

    /// Plain-text rendering for a terminal
    pub fn render_terminal(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "File: {}", self.name)?;
        writeln!(f, "Total statements: {}", self.total_statements)?;
        writeln!(f, "Executed: {}", self.executed_count)?;
        writeln!(f, "Execution errors: {}", self.failed_count)?;
        writeln!(f, "Error rate: {:.1}%", self.error_rate)?;
        writeln!(f, "Total time: {}ms", self.elapsed.as_millis())?;

        if !self.code_tally.is_empty() {
            writeln!(f)?;
            writeln!(f, "Execution Error Code Summary:")?;
            for item in &self.code_tally {
                writeln!(f, "- {}: {} ({})", item.key, item.count, item.description)?;
            }
        }
        if !self.category_tally.is_empty() {
            writeln!(f)?;
            writeln!(f, "Execution Error Categories:")?;
            for item in &self.category_tally {
                writeln!(f, "- {}: {} ({})", item.key, item.count, item.description)?;
            }
        }
        if !self.errors.is_empty() {
            writeln!(f)?;
            writeln!(f, "Execution Errors:")?;
            for (i, error) in self.errors.iter().enumerate() {
                writeln!(f, "{}. {}", i + 1, error)?;
                writeln!(f, "   Statement: {}", error.statement.trim())?;
            }

            writeln!(f)?;
            writeln!(f, "=== CORRECTION HINTS ===")?;
            for hint in self.correction_hints() {
                writeln!(f, "{}", hint)?;
            }
        }
        Ok(())
    }
}

fn is_root_stage(stage: Kind) -> bool {
    matches!(stage, Kind::Drop | Kind::Create)
}

fn describe(entries: Vec<TallyEntry>, descriptions: &AHashMap<String, &'static str>) -> Vec<RankedItem> {
    entries
        .into_iter()
        .map(|entry| {
            let description = descriptions
                .get(&entry.key)
                .copied()
                .unwrap_or(UNRECOGNIZED_DESCRIPTION);
            RankedItem {
                key: entry.key,
                count: entry.count,
                description,
            }
        })
        .collect()
}

fn lines(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ExecutionError;

    fn result_with(errors: Vec<ExecutionError>, total: usize) -> ExecutionResult {
        ExecutionResult {
            total_statements: total,
            executed_count: total - errors.len(),
            skipped_count: errors.len(),
            errors,
            ..Default::default()
        }
    }

    #[test]
    fn test_root_causes_first_and_tallies() {
        let result = result_with(
            vec![
                ExecutionError::new(Kind::Insert, "INSERT INTO e ...", "rpc error: code = NotFound desc = Table not found: e"),
                ExecutionError::new(Kind::Select, "SELECT * FROM e", "rpc error: code = NotFound desc = Table not found: e"),
                ExecutionError::new(
                    Kind::Create,
                    "CREATE TABLE e (id INT64 PRIMARY KEY)",
                    "rpc error: code = InvalidArgument desc = Syntax error: Expected ')'",
                ),
            ],
            4,
        );
        let report = FileReport::from_execution("schema.sql", &result, Duration::from_millis(12));

        assert_eq!(report.errors[0].stage, Kind::Create);
        assert_eq!(report.errors[1].stage, Kind::Insert);
        assert_eq!(report.failed_count, 3);
        assert!((report.error_rate - 75.0).abs() < f64::EPSILON);

        assert_eq!(report.code_tally[0].key, "NotFound");
        assert_eq!(report.code_tally[0].count, 2);
        assert_eq!(report.code_tally[1].key, "InvalidArgument");
        assert_eq!(report.category_tally[0].key, "NotFound");
        assert_eq!(report.category_tally[1].key, "Syntax Error: Missing Closing Parentheses");
    }

    #[test]
    fn test_unrecognized_messages() {
        let result = result_with(
            vec![ExecutionError::new(Kind::Other, "TRUNCATE t", "unsupported statement type: TRUNCATE")],
            1,
        );
        let report = FileReport::from_execution("x.sql", &result, Duration::ZERO);
        assert_eq!(report.code_tally[0].key, UNRECOGNIZED);
        assert_eq!(report.code_tally[0].description, UNRECOGNIZED_DESCRIPTION);
        assert!(report.category_tally.is_empty());
    }

    #[test]
    fn test_hints_follow_error_patterns() {
        let clean = FileReport::from_execution("ok.sql", &result_with(Vec::new(), 2), Duration::ZERO);
        assert!(clean.correction_hints().is_empty());

        let result = result_with(
            vec![ExecutionError::new(
                Kind::Insert,
                "INSERT INTO employees ...",
                "rpc error: code = FailedPrecondition desc = Foreign key constraint `fk` is violated",
            )],
            3,
        );
        let hints = FileReport::from_execution("fk.sql", &result, Duration::ZERO).correction_hints();
        assert_eq!(hints[0], "EXECUTION ERROR PATTERNS DETECTED:");
        assert!(hints.iter().any(|h| h.contains("GENERATE_UUID()")));
        assert!(!hints.iter().any(|h| h.contains("not found")));
        assert_eq!(hints.last().map(String::as_str), Some("- Use ARRAY<TYPE> for array columns"));
    }

    #[test]
    fn test_not_found_hint_mentions_cascade() {
        let result = result_with(
            vec![
                ExecutionError::new(Kind::Create, "CREATE ...", "rpc error: code = AlreadyExists desc = Duplicate name in schema: t"),
                ExecutionError::new(Kind::Insert, "INSERT ...", "rpc error: code = NotFound desc = Table not found: u"),
            ],
            2,
        );
        let hints = FileReport::from_execution("c.sql", &result, Duration::ZERO).correction_hints();
        assert!(hints.iter().any(|h| h.contains("likely cascading")));
    }

    #[test]
    fn test_render_terminal() {
        let result = result_with(
            vec![ExecutionError::new(
                Kind::Create,
                "CREATE TABLE t (id INT64 PRIMARY KEY)",
                "rpc error: code = InvalidArgument desc = Syntax error: Expected ')'",
            )],
            1,
        );
        let text = FileReport::from_execution("t.sql", &result, Duration::from_millis(3)).render_terminal();
        assert!(text.starts_with("File: t.sql\nTotal statements: 1\n"));
        assert!(text.contains("- InvalidArgument: 1 ("));
        assert!(text.contains("1. CREATE failed: rpc error: code = InvalidArgument"));
        assert!(text.contains("SYNTAX ERROR PATTERNS DETECTED:"));
        assert!(text.contains("=== CORRECTION HINTS ==="));
    }
}
