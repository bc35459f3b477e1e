//! Engine configuration
//!
//! All heuristic tables of the engine live here so that a run against another
//! dialect (or another business schema) only needs a different config file.

use crate::error::{EngineError, Result};
use crate::types::QuoteStyle;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Insert priority of one table (lower runs first)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TablePriority {
    pub table: String,
    pub priority: u32,
}

impl TablePriority {
    pub fn new(table: impl Into<String>, priority: u32) -> Self {
        Self {
            table: table.into(),
            priority,
        }
    }
}

/// Foreign-key-shaped column name and the table it references
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyHint {
    pub column: String,
    pub table: String,
}

impl ForeignKeyHint {
    pub fn new(column: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            table: table.into(),
        }
    }
}

/// Execution engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// DROP 失败信息中包含这些片段时视为成功（对象本来就不存在）
    pub drop_lenient_markers: Vec<String>,

    /// Markers of an INSERT that returns generated columns
    pub returning_markers: Vec<String>,

    /// First keywords accepted for UPDATE/DELETE/ALTER/other statements
    pub supported_other_keywords: Vec<String>,

    /// Tables whose generated primary key is captured into the identifier registry
    pub identifier_tables: Vec<String>,

    /// Static insert priority table
    pub insert_priorities: Vec<TablePriority>,

    /// Priority of tables missing from `insert_priorities`
    pub unknown_priority: u32,

    /// Column names that reference another table's generated identifier
    pub foreign_key_hints: Vec<ForeignKeyHint>,

    /// Literal used when a referenced identifier was never captured
    pub null_sentinel: String,

    /// String-literal escaping of the target dialect (synthesized and captured values)
    pub quote_style: QuoteStyle,

    /// Log full statement text at debug level
    pub log_statement_text: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            drop_lenient_markers: strings(&["not found", "does not exist", "unknown table"]),
            returning_markers: strings(&["THEN RETURN", "RETURNING"]),
            supported_other_keywords: strings(&["UPDATE", "DELETE", "ALTER"]),
            identifier_tables: strings(&["departments", "employees", "projects"]),
            insert_priorities: vec![
                TablePriority::new("departments", 1),
                TablePriority::new("projects", 1),
                TablePriority::new("employees", 2),
                TablePriority::new("project_assignments", 3),
            ],
            unknown_priority: 999,
            foreign_key_hints: vec![
                ForeignKeyHint::new("dept_id", "departments"),
                ForeignKeyHint::new("emp_id", "employees"),
                ForeignKeyHint::new("project_id", "projects"),
                ForeignKeyHint::new("manager_id", "employees"),
            ],
            null_sentinel: "NULL".to_string(),
            quote_style: QuoteStyle::Backslash,
            log_statement_text: false,
        }
    }
}

impl EngineConfig {
    /// Spanner (GoogleSQL) target: `THEN RETURN`
    pub fn for_spanner() -> Self {
        Self {
            returning_markers: strings(&["THEN RETURN"]),
            ..Default::default()
        }
    }

    /// PostgreSQL-compatible target: `RETURNING`
    pub fn for_postgres() -> Self {
        Self {
            returning_markers: strings(&["RETURNING"]),
            quote_style: QuoteStyle::Doubled,
            ..Default::default()
        }
    }

    /// Tests: defaults plus full statement logging
    pub fn for_testing() -> Self {
        Self {
            log_statement_text: true,
            ..Default::default()
        }
    }

    /// Load a config from a JSON file. Missing fields take their default.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: EngineConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.returning_markers.iter().any(|m| m.trim().is_empty()) {
            return Err(EngineError::InvalidConfig(
                "returning_markers must not contain empty markers".into(),
            ));
        }
        if self.drop_lenient_markers.iter().any(|m| m.trim().is_empty()) {
            return Err(EngineError::InvalidConfig(
                "drop_lenient_markers must not contain empty markers".into(),
            ));
        }
        if self.null_sentinel.trim().is_empty() {
            return Err(EngineError::InvalidConfig("null_sentinel must not be empty".into()));
        }
        for entry in &self.insert_priorities {
            if entry.table.trim().is_empty() {
                return Err(EngineError::InvalidConfig(
                    "insert_priorities contains an empty table name".into(),
                ));
            }
            if entry.priority > self.unknown_priority {
                return Err(EngineError::InvalidConfig(format!(
                    "priority {} of table '{}' exceeds unknown_priority {}",
                    entry.priority, entry.table, self.unknown_priority
                )));
            }
        }
        for hint in &self.foreign_key_hints {
            if hint.column.trim().is_empty() || hint.table.trim().is_empty() {
                return Err(EngineError::InvalidConfig(
                    "foreign_key_hints entries need both column and table".into(),
                ));
            }
        }
        Ok(())
    }

    /// Insert priority of `table` (case-insensitive)
    pub fn priority_for(&self, table: &str) -> u32 {
        self.insert_priorities
            .iter()
            .find(|entry| entry.table.eq_ignore_ascii_case(table))
            .map(|entry| entry.priority)
            .unwrap_or(self.unknown_priority)
    }

    pub fn is_identifier_table(&self, table: &str) -> bool {
        self.identifier_tables
            .iter()
            .any(|t| t.eq_ignore_ascii_case(table))
    }

    /// Table referenced by a foreign-key-shaped name: the first hint whose
    /// column occurs in `name` (case-insensitive), so `@new_dept_id` counts
    pub fn referenced_table(&self, name: &str) -> Option<&str> {
        let lower = name.to_ascii_lowercase();
        self.foreign_key_hints
            .iter()
            .find(|hint| lower.contains(&hint.column.to_ascii_lowercase()))
            .map(|hint| hint.table.as_str())
    }

    /// Whether a DROP failure message means "the object was already gone"
    pub fn is_lenient_drop_error(&self, message: &str) -> bool {
        let lower = message.to_lowercase();
        self.drop_lenient_markers
            .iter()
            .any(|marker| lower.contains(&marker.to_lowercase()))
    }

    /// Whether an INSERT carries a returning clause
    pub fn has_returning_clause(&self, sql: &str) -> bool {
        let upper = sql.to_uppercase();
        self.returning_markers
            .iter()
            .any(|marker| upper.contains(&marker.to_uppercase()))
    }

    /// Whether the first keyword of a non-core statement is in the supported subset
    pub fn supports_keyword(&self, keyword: &str) -> bool {
        self.supported_other_keywords
            .iter()
            .any(|k| k.eq_ignore_ascii_case(keyword))
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_presets() {
        let spanner = EngineConfig::for_spanner();
        assert!(spanner.has_returning_clause("INSERT INTO t (a) VALUES (1) THEN RETURN a"));
        assert!(!spanner.has_returning_clause("INSERT INTO t (a) VALUES (1) RETURNING a"));

        let postgres = EngineConfig::for_postgres();
        assert!(postgres.has_returning_clause("insert into t (a) values (1) returning a"));

        let testing = EngineConfig::for_testing();
        assert!(testing.log_statement_text);
        assert!(testing.validate().is_ok());
    }

    #[test]
    fn test_default_priorities() {
        let config = EngineConfig::default();
        assert_eq!(config.priority_for("departments"), 1);
        assert_eq!(config.priority_for("PROJECTS"), 1);
        assert_eq!(config.priority_for("employees"), 2);
        assert_eq!(config.priority_for("project_assignments"), 3);
        assert_eq!(config.priority_for("audit_log"), 999);
    }

    #[test]
    fn test_lenient_drop_markers() {
        let config = EngineConfig::default();
        assert!(config.is_lenient_drop_error("rpc error: code = NotFound desc = Table not found: ghost"));
        assert!(config.is_lenient_drop_error("relation \"ghost\" does not exist"));
        assert!(!config.is_lenient_drop_error("Cannot drop table with indexes"));
    }

    #[test]
    fn test_validate_rejects_bad_priorities() {
        let mut config = EngineConfig::default();
        config.insert_priorities.push(TablePriority::new("huge", 5000));
        assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));

        let mut config = EngineConfig::default();
        config.null_sentinel = " ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"returning_markers": ["RETURNING"], "unknown_priority": 50}}"#
        )
        .unwrap();

        let config = EngineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.returning_markers, vec!["RETURNING".to_string()]);
        assert_eq!(config.unknown_priority, 50);
        assert_eq!(config.priority_for("employees"), 2);
        assert_eq!(config.referenced_table("DEPT_ID"), Some("departments"));
        assert_eq!(config.referenced_table("new_manager_id"), Some("employees"));
        assert_eq!(config.referenced_table("dept_name"), None);
    }
}
