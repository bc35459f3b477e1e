/// Identifier registry: last generated primary key per table
use ahash::AHashMap;
use tracing::debug;

/// Maps `<table>_pk` to the last captured identifier literal.
///
/// Literals are stored ready for interpolation (`'D1'`, `42`). Last write wins.
#[derive(Debug, Default)]
pub struct IdentifierRegistry {
    identifiers: AHashMap<String, String>,
}

impl IdentifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(table: &str) -> String {
        format!("{}_pk", table.to_ascii_lowercase())
    }

    /// Stores the identifier generated by the last insert into `table`
    pub fn capture(&mut self, table: &str, literal: impl Into<String>) {
        let literal = literal.into();
        debug!(table = %table, identifier = %literal, "captured generated identifier");
        self.identifiers.insert(Self::key(table), literal);
    }

    pub fn lookup(&self, table: &str) -> Option<&str> {
        self.identifiers.get(&Self::key(table)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_and_lookup() {
        let mut registry = IdentifierRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.lookup("departments"), None);

        registry.capture("Departments", "'D1'");
        assert_eq!(registry.lookup("departments"), Some("'D1'"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_last_write_wins() {
        let mut registry = IdentifierRegistry::new();
        registry.capture("employees", "1");
        registry.capture("employees", "2");
        assert_eq!(registry.lookup("employees"), Some("2"));
        assert_eq!(registry.len(), 1);
    }
}
