/// Statement kinds and classified statements
use crate::sql::classifier::classify;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Statement kind, assigned once by [`classify`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    Create,
    Insert,
    Select,
    Drop,
    Update,
    Delete,
    Alter,
    Other,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Create => "CREATE",
            Kind::Insert => "INSERT",
            Kind::Select => "SELECT",
            Kind::Drop => "DROP",
            Kind::Update => "UPDATE",
            Kind::Delete => "DELETE",
            Kind::Alter => "ALTER",
            Kind::Other => "OTHER",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw SQL text plus its inferred kind. Immutable once classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    text: String,
    kind: Kind,
}

impl Statement {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let kind = classify(&text);
        Self { text, kind }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_is_classified_on_construction() {
        let stmt = Statement::new("-- seed\nINSERT INTO departments (dept_name) VALUES ('x')");
        assert_eq!(stmt.kind(), Kind::Insert);
        assert!(stmt.text().starts_with("-- seed"));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(Kind::Drop.to_string(), "DROP");
        assert_eq!(Kind::Other.as_str(), "OTHER");
    }
}
