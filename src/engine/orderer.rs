/// Dependency orderer: parents before children by a fixed priority table
use crate::config::EngineConfig;
use regex::Regex;
use std::sync::OnceLock;

static INSERT_TARGET_RE: OnceLock<Regex> = OnceLock::new();

fn insert_target_re() -> &'static Regex {
    INSERT_TARGET_RE.get_or_init(|| {
        Regex::new(r#"(?i)\bINSERT\s+(?:OR\s+\w+\s+)?(?:INTO\s+)?[`"]?(\w+)[`"]?"#)
            .expect("valid INSERT target regex")
    })
}

/// Target table of an INSERT (lower-cased)
pub fn insert_target(sql: &str) -> Option<String> {
    insert_target_re()
        .captures(sql)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
}

/// Stable sort ascending by the configured priority of each INSERT's target.
///
/// Tables missing from the table (or statements without a readable target)
/// get `unknown_priority` and keep their relative order.
pub fn order_inserts<S: AsRef<str>>(inserts: &mut [S], config: &EngineConfig) {
    inserts.sort_by_key(|sql| match insert_target(sql.as_ref()) {
        Some(table) => config.priority_for(&table),
        None => config.unknown_priority,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TablePriority;

    #[test]
    fn test_insert_target() {
        assert_eq!(insert_target("INSERT INTO Departments (a) VALUES (1)").as_deref(), Some("departments"));
        assert_eq!(insert_target("insert `employees` (a) values (1)").as_deref(), Some("employees"));
        assert_eq!(insert_target("-- seed\nINSERT INTO projects VALUES (1)").as_deref(), Some("projects"));
        assert_eq!(insert_target("SELECT 1"), None);
    }

    #[test]
    fn test_reverse_dependency_order() {
        let mut inserts = vec![
            "INSERT INTO project_assignments (emp_id) VALUES (@emp_id)",
            "INSERT INTO employees (dept_id) VALUES (@dept_id)",
            "INSERT INTO departments (dept_name) VALUES (@dept_name)",
        ];
        order_inserts(&mut inserts, &EngineConfig::default());
        let tables: Vec<_> = inserts.iter().filter_map(|s| insert_target(s)).collect();
        assert_eq!(tables, vec!["departments", "employees", "project_assignments"]);
    }

    #[test]
    fn test_ties_and_unknown_tables_are_stable() {
        let mut inserts = vec![
            "INSERT INTO audit_log (a) VALUES (1)",
            "INSERT INTO projects (a) VALUES (1)",
            "INSERT INTO notes (a) VALUES (1)",
            "INSERT INTO departments (a) VALUES (1)",
        ];
        order_inserts(&mut inserts, &EngineConfig::default());
        let tables: Vec<_> = inserts.iter().filter_map(|s| insert_target(s)).collect();
        assert_eq!(tables, vec!["projects", "departments", "audit_log", "notes"]);
    }

    #[test]
    fn test_configured_priorities() {
        let config = EngineConfig {
            insert_priorities: vec![TablePriority::new("orders", 2), TablePriority::new("customers", 1)],
            ..Default::default()
        };
        let mut inserts = vec!["INSERT INTO orders VALUES (1)", "INSERT INTO customers VALUES (1)"];
        order_inserts(&mut inserts, &config);
        assert_eq!(inserts[0], "INSERT INTO customers VALUES (1)");
    }
}
