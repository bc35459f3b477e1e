/// Statement classifier: assigns a [`Kind`] from keywords found anywhere in the text
use crate::types::Kind;
use regex::Regex;
use std::sync::OnceLock;

/// Ordered rule table, first match wins
static RULES: OnceLock<Vec<(Regex, Kind)>> = OnceLock::new();

fn rules() -> &'static [(Regex, Kind)] {
    RULES.get_or_init(|| {
        [
            (
                r"\bCREATE\s+(TABLE|INDEX|UNIQUE\s+INDEX|UNIQUE\s+NULL_FILTERED\s+INDEX|NULL_FILTERED\s+INDEX|VIEW|SEQUENCE|OR\s+REPLACE)\b",
                Kind::Create,
            ),
            (r"\bINSERT\b", Kind::Insert),
            (r"\bSELECT\b", Kind::Select),
            (r"\bDROP\s+(TABLE|INDEX|VIEW|SEQUENCE)\b", Kind::Drop),
            // any other leading DROP (SCHEMA, ROLE, CHANGE STREAM ...); ALTER ... DROP COLUMN stays Alter
            (r"^DROP\s+\w+", Kind::Drop),
            (r"\bALTER\b", Kind::Alter),
            (r"\bUPDATE\b", Kind::Update),
            (r"\bDELETE\b", Kind::Delete),
        ]
        .into_iter()
        .map(|(pattern, kind)| {
            (Regex::new(pattern).expect("valid classifier regex"), kind)
        })
        .collect()
    })
}

/// Classifies a statement. Never fails: unmatched text is [`Kind::Other`].
///
/// Comments and string literal contents are ignored, so `-- create later` or
/// `'select one'` cannot change the kind.
pub fn classify(sql: &str) -> Kind {
    let upper = mask_literals(&super::cleaner::clean_statement(sql)).to_uppercase();
    rules()
        .iter()
        .find(|(re, _)| re.is_match(&upper))
        .map(|(_, kind)| *kind)
        .unwrap_or(Kind::Other)
}

/// First keyword of the statement, upper-cased (`UPDATE`, `TRUNCATE`, ...)
pub fn leading_keyword(sql: &str) -> String {
    super::cleaner::clean_statement(sql)
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .find(|word| !word.is_empty())
        .unwrap_or("")
        .to_uppercase()
}

fn mask_literals(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut quote: Option<char> = None;
    let mut chars = sql.chars();
    while let Some(ch) = chars.next() {
        match quote {
            Some(q) => {
                if ch == '\\' {
                    chars.next();
                    out.push(' ');
                } else if ch == q {
                    quote = None;
                    out.push(ch);
                    continue;
                }
                out.push(' ');
            }
            None => {
                if ch == '\'' || ch == '"' {
                    quote = Some(ch);
                }
                out.push(ch);
            }
        }
    }
    out
}
