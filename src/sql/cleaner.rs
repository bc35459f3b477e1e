//! Statement cleaning and script splitting
//!
//! Both passes are quote-aware: `--`, `/*` and `;` inside string literals or
//! quoted identifiers are kept as text.

/// Lexical state while walking SQL text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Code,
    Quoted(char),
    LineComment,
    BlockComment,
}

/// Strips comments, collapses whitespace runs outside literals into one space,
/// trims, and drops a trailing semicolon.
pub fn clean_statement(sql: &str) -> String {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len());
    let mut mode = Mode::Code;
    let mut pending_space = false;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        let next = chars.get(i + 1).copied();

        match mode {
            Mode::Code => {
                if ch == '-' && next == Some('-') {
                    mode = Mode::LineComment;
                    pending_space = true;
                    i += 2;
                    continue;
                }
                if ch == '/' && next == Some('*') {
                    mode = Mode::BlockComment;
                    pending_space = true;
                    i += 2;
                    continue;
                }
                if ch.is_whitespace() {
                    pending_space = true;
                    i += 1;
                    continue;
                }
                if pending_space && !out.is_empty() {
                    out.push(' ');
                }
                pending_space = false;
                if matches!(ch, '\'' | '"' | '`') {
                    mode = Mode::Quoted(ch);
                }
                out.push(ch);
            }
            Mode::Quoted(quote) => {
                out.push(ch);
                if ch == '\\' {
                    if let Some(escaped) = next {
                        out.push(escaped);
                        i += 2;
                        continue;
                    }
                } else if ch == quote {
                    mode = Mode::Code;
                }
            }
            Mode::LineComment => {
                if ch == '\n' {
                    mode = Mode::Code;
                }
            }
            Mode::BlockComment => {
                if ch == '*' && next == Some('/') {
                    mode = Mode::Code;
                    i += 2;
                    continue;
                }
            }
        }
        i += 1;
    }

    let trimmed = out.trim_end();
    let trimmed = trimmed.strip_suffix(';').unwrap_or(trimmed);
    trimmed.trim_end().to_string()
}

/// Splits a script into statements on `;` outside literals and comments.
///
/// Pieces that are empty once cleaned (blank or comment-only) are dropped; the
/// returned text keeps its comments so classification stays comment-tolerant.
pub fn split_statements(script: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut mode = Mode::Code;
    let mut chars = script.chars().peekable();

    while let Some(ch) = chars.next() {
        let next = chars.peek().copied();
        match mode {
            Mode::Code => {
                if ch == ';' {
                    push_statement(&mut statements, &mut current);
                    continue;
                }
                if ch == '-' && next == Some('-') {
                    mode = Mode::LineComment;
                } else if ch == '/' && next == Some('*') {
                    mode = Mode::BlockComment;
                    current.push(ch);
                    if let Some(star) = chars.next() {
                        current.push(star);
                    }
                    continue;
                } else if matches!(ch, '\'' | '"' | '`') {
                    mode = Mode::Quoted(ch);
                }
            }
            Mode::Quoted(quote) => {
                if ch == '\\' {
                    current.push(ch);
                    if let Some(escaped) = chars.next() {
                        current.push(escaped);
                    }
                    continue;
                }
                if ch == quote {
                    mode = Mode::Code;
                }
            }
            Mode::LineComment => {
                if ch == '\n' {
                    mode = Mode::Code;
                }
            }
            Mode::BlockComment => {
                if ch == '*' && next == Some('/') {
                    mode = Mode::Code;
                    current.push(ch);
                    if let Some(slash) = chars.next() {
                        current.push(slash);
                    }
                    continue;
                }
            }
        }
        current.push(ch);
    }
    push_statement(&mut statements, &mut current);

    statements
}

fn push_statement(statements: &mut Vec<String>, current: &mut String) {
    let text = std::mem::take(current);
    if !clean_statement(&text).is_empty() {
        statements.push(text.trim().to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_statement_strips_comments() {
        let sql = "-- header\nINSERT INTO t (a)   VALUES (1) -- trailing\n/* note */ ;";
        assert_eq!(clean_statement(sql), "INSERT INTO t (a) VALUES (1)");
    }

    #[test]
    fn test_clean_statement_keeps_literals() {
        let sql = "SELECT '--  not a comment', \"a;b\" FROM t";
        assert_eq!(clean_statement(sql), sql);

        let escaped = "SELECT 'it\\'s  -- here'";
        assert_eq!(clean_statement(escaped), escaped);
    }

    #[test]
    fn test_clean_statement_comment_only() {
        assert_eq!(clean_statement("-- nothing here\n/* or here */"), "");
    }

    #[test]
    fn test_split_statements() {
        let script = "\
-- schema
CREATE TABLE t (a INT64) PRIMARY KEY (a);
INSERT INTO t (a) VALUES (1); -- seed
/* ; inside comment */
SELECT ';' FROM t;
-- trailing comment only
";
        let statements = split_statements(script);
        assert_eq!(statements.len(), 3);
        assert!(statements[0].ends_with("PRIMARY KEY (a)"));
        assert_eq!(clean_statement(&statements[1]), "INSERT INTO t (a) VALUES (1)");
        assert_eq!(clean_statement(&statements[2]), "SELECT ';' FROM t");
    }

    #[test]
    fn test_split_without_terminator() {
        let statements = split_statements("SELECT 1");
        assert_eq!(statements, vec!["SELECT 1".to_string()]);
    }
}
