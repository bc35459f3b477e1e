/// Ordered InvalidArgument category rules (first match wins)
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgumentCategory {
    SyntaxCurrentTimestamp,
    SyntaxMissingParentheses,
    SyntaxMissingClosingParentheses,
    SyntaxGeneral,
    TypeMismatchGenerateUuid,
    TypeMismatchGeneral,
    UnsupportedSequenceKind,
    UnsupportedGeneral,
    MissingSqlSecurity,
    MissingClauseGeneral,
    FunctionNotFoundNextval,
    FunctionNotFoundGeneral,
    IdentityMissingSequenceKind,
    TableNotFound,
    ForeignKeySyntax,
    DefaultValueParsing,
    ConstraintUnsupported,
    ViewDefinition,
    Other,
}

impl ArgumentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArgumentCategory::SyntaxCurrentTimestamp => "Syntax Error: CURRENT_TIMESTAMP",
            ArgumentCategory::SyntaxMissingParentheses => "Syntax Error: Missing Parentheses",
            ArgumentCategory::SyntaxMissingClosingParentheses => {
                "Syntax Error: Missing Closing Parentheses"
            }
            ArgumentCategory::SyntaxGeneral => "Syntax Error: General",
            ArgumentCategory::TypeMismatchGenerateUuid => "Type Mismatch: GENERATE_UUID on INT64",
            ArgumentCategory::TypeMismatchGeneral => "Type Mismatch: General",
            ArgumentCategory::UnsupportedSequenceKind => "Unsupported Feature: Sequence Kind",
            ArgumentCategory::UnsupportedGeneral => "Unsupported Feature: General",
            ArgumentCategory::MissingSqlSecurity => "Missing Clause: SQL SECURITY",
            ArgumentCategory::MissingClauseGeneral => "Missing Clause: General",
            ArgumentCategory::FunctionNotFoundNextval => "Function Not Found: NEXTVAL",
            ArgumentCategory::FunctionNotFoundGeneral => "Function Not Found: General",
            ArgumentCategory::IdentityMissingSequenceKind => "Identity Column: Missing Sequence Kind",
            ArgumentCategory::TableNotFound => "Table Not Found (InvalidArgument)",
            ArgumentCategory::ForeignKeySyntax => "Foreign Key: Syntax Error",
            ArgumentCategory::DefaultValueParsing => "Default Value: Parsing Error",
            ArgumentCategory::ConstraintUnsupported => "Constraint: Unsupported",
            ArgumentCategory::ViewDefinition => "View Definition: Error",
            ArgumentCategory::Other => "InvalidArgument: Other",
        }
    }
}

impl fmt::Display for ArgumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a rule decides it applies to a lower-cased message
enum Trigger {
    /// Every needle present
    All(&'static [&'static str]),
    /// At least one needle present
    Any(&'static [&'static str]),
}

impl Trigger {
    fn matches(&self, msg: &str) -> bool {
        match self {
            Trigger::All(needles) => needles.iter().all(|n| msg.contains(n)),
            Trigger::Any(needles) => needles.iter().any(|n| msg.contains(n)),
        }
    }
}

struct Rule {
    trigger: Trigger,
    /// Checked in order once the trigger matched
    refinements: &'static [(Trigger, ArgumentCategory)],
    fallback: ArgumentCategory,
}

static RULES: &[Rule] = &[
    Rule {
        trigger: Trigger::All(&["syntax error"]),
        refinements: &[
            (Trigger::All(&["current_timestamp"]), ArgumentCategory::SyntaxCurrentTimestamp),
            (
                Trigger::Any(&["expecting '('", "expected '('"]),
                ArgumentCategory::SyntaxMissingParentheses,
            ),
            (
                Trigger::Any(&["expecting ')'", "expected ')'"]),
                ArgumentCategory::SyntaxMissingClosingParentheses,
            ),
        ],
        fallback: ArgumentCategory::SyntaxGeneral,
    },
    Rule {
        trigger: Trigger::All(&["expected type", "found"]),
        refinements: &[(Trigger::All(&["generate_uuid"]), ArgumentCategory::TypeMismatchGenerateUuid)],
        fallback: ArgumentCategory::TypeMismatchGeneral,
    },
    Rule {
        trigger: Trigger::All(&["unsupported"]),
        refinements: &[(Trigger::All(&["sequence kind"]), ArgumentCategory::UnsupportedSequenceKind)],
        fallback: ArgumentCategory::UnsupportedGeneral,
    },
    Rule {
        trigger: Trigger::All(&["missing"]),
        refinements: &[(Trigger::All(&["sql security"]), ArgumentCategory::MissingSqlSecurity)],
        fallback: ArgumentCategory::MissingClauseGeneral,
    },
    Rule {
        trigger: Trigger::All(&["function not found"]),
        refinements: &[(Trigger::All(&["nextval"]), ArgumentCategory::FunctionNotFoundNextval)],
        fallback: ArgumentCategory::FunctionNotFoundGeneral,
    },
    Rule {
        trigger: Trigger::All(&["sequence kind", "not specified"]),
        refinements: &[],
        fallback: ArgumentCategory::IdentityMissingSequenceKind,
    },
    Rule {
        trigger: Trigger::All(&["table not found"]),
        refinements: &[],
        fallback: ArgumentCategory::TableNotFound,
    },
    Rule {
        trigger: Trigger::All(&["foreign key"]),
        refinements: &[],
        fallback: ArgumentCategory::ForeignKeySyntax,
    },
    Rule {
        trigger: Trigger::All(&["default value"]),
        refinements: &[],
        fallback: ArgumentCategory::DefaultValueParsing,
    },
    Rule {
        trigger: Trigger::Any(&["constraint", "check"]),
        refinements: &[],
        fallback: ArgumentCategory::ConstraintUnsupported,
    },
    Rule {
        trigger: Trigger::All(&["definition of view"]),
        refinements: &[],
        fallback: ArgumentCategory::ViewDefinition,
    },
];

/// Category of an InvalidArgument message (case-insensitive)
pub fn categorize(raw: &str) -> ArgumentCategory {
    let msg = raw.to_lowercase();
    RULES
        .iter()
        .find(|rule| rule.trigger.matches(&msg))
        .map(|rule| {
            rule.refinements
                .iter()
                .find(|(trigger, _)| trigger.matches(&msg))
                .map(|(_, category)| *category)
                .unwrap_or(rule.fallback)
        })
        .unwrap_or(ArgumentCategory::Other)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cat(desc: &str) -> &'static str {
        categorize(&format!("rpc error: code = InvalidArgument desc = {}", desc)).as_str()
    }

    #[test]
    fn test_syntax_refinements() {
        assert_eq!(
            cat("Syntax error: Expected '(' but got keyword CURRENT_TIMESTAMP [at 1:40]"),
            "Syntax Error: CURRENT_TIMESTAMP"
        );
        assert_eq!(
            cat("Syntax error: Expecting '('. Got: VALUES"),
            "Syntax Error: Missing Parentheses"
        );
        assert_eq!(
            cat("Syntax error: Expected ')' or ',' but got keyword PRIMARY [at 1:30]"),
            "Syntax Error: Missing Closing Parentheses"
        );
        assert_eq!(
            cat("Syntax error: Expected end of input but got keyword RETURNING"),
            "Syntax Error: General"
        );
    }

    #[test]
    fn test_type_mismatch() {
        assert_eq!(
            cat("Expected type INT64 for column t.id; found STRING from GENERATE_UUID()"),
            "Type Mismatch: GENERATE_UUID on INT64"
        );
        assert_eq!(
            cat("Expected type INT64 for column t.id; found STRING"),
            "Type Mismatch: General"
        );
    }

    #[test]
    fn test_rule_order_first_match_wins() {
        // "unsupported" precedes the identity rule even though both mention sequence kind
        assert_eq!(cat("Unsupported sequence kind: serial"), "Unsupported Feature: Sequence Kind");
        assert_eq!(
            cat("The sequence kind of an identity column id is not specified"),
            "Identity Column: Missing Sequence Kind"
        );
        assert_eq!(
            cat("Error parsing the definition of view `v`: missing SQL SECURITY clause"),
            "Missing Clause: SQL SECURITY"
        );
        assert_eq!(cat("Error parsing the definition of view `v`"), "View Definition: Error");
    }

    #[test]
    fn test_remaining_rules() {
        assert_eq!(cat("Function not found: NEXTVAL"), "Function Not Found: NEXTVAL");
        assert_eq!(cat("Function not found: SYSDATE"), "Function Not Found: General");
        assert_eq!(cat("Table not found: projects"), "Table Not Found (InvalidArgument)");
        assert_eq!(cat("Foreign key fk_x references bad column"), "Foreign Key: Syntax Error");
        assert_eq!(cat("Cannot parse default value"), "Default Value: Parsing Error");
        assert_eq!(cat("Check constraint expression is invalid"), "Constraint: Unsupported");
        assert_eq!(cat("Something else entirely"), "InvalidArgument: Other");
    }
}
