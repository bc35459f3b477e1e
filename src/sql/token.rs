/// Token types for the GoogleSQL-subset lexer

/// Words that can never be used as bare identifiers
static RESERVED: &[&str] = &[
    "ALL", "AND", "ANY", "ARRAY", "AS", "ASC", "BETWEEN", "BY", "CASE", "CAST", "CREATE",
    "CROSS", "CURRENT", "DEFAULT", "DESC", "DISTINCT", "ELSE", "END", "EXISTS", "FALSE",
    "FROM", "FULL", "GROUP", "HAVING", "IF", "IN", "INNER", "INTERVAL", "INTO", "IS", "JOIN",
    "LEFT", "LIKE", "LIMIT", "NOT", "NULL", "ON", "OR", "ORDER", "OUTER", "RIGHT", "SELECT",
    "SET", "THEN", "TRUE", "UNION", "USING", "WHEN", "WHERE", "WITH",
];

/// Non-reserved words that error messages still report as keywords
static KEYWORDS: &[&str] = &[
    "ALTER", "AUTO_INCREMENT", "CHECK", "COLUMN", "CONSTRAINT", "CURRENT_DATE",
    "CURRENT_TIMESTAMP", "DATABASE", "DELETE", "DROP", "FOREIGN", "INDEX", "INSERT", "KEY",
    "OFFSET", "OPTIONS", "PRIMARY", "REFERENCES", "REPLACE", "RETURN", "RETURNING", "SECURITY",
    "SEQUENCE", "SERIAL", "TABLE", "UNIQUE", "UPDATE", "VALUES", "VIEW",
];

#[derive(Debug, Clone, PartialEq)]
pub enum TokenType {
    /// Bare word: identifier or keyword, original spelling
    Word(String),
    /// `quoted identifier`
    QuotedIdent(String),
    /// String literal (escapes resolved)
    String(String),
    /// Numeric literal, raw text
    Number(String),
    /// @name
    Param(String),
    /// $N
    Positional(usize),

    // Operators
    Eq,      // =
    Ne,      // != or <>
    Lt,      // <
    Gt,      // >
    Le,      // <=
    Ge,      // >=
    Plus,    // +
    Minus,   // -
    Star,    // *
    Slash,   // /
    Concat,  // ||
    Cast,    // ::

    // Delimiters
    LParen,    // (
    RParen,    // )
    Comma,     // ,
    Semicolon, // ;
    Dot,       // .

    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub token_type: TokenType,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(token_type: TokenType, line: usize, column: usize) -> Self {
        Self { token_type, line, column }
    }

    /// Case-insensitive keyword check
    pub fn is_word(&self, keyword: &str) -> bool {
        matches!(&self.token_type, TokenType::Word(w) if w.eq_ignore_ascii_case(keyword))
    }

    /// How the token is named in syntax errors: `keyword PRIMARY`, `identifier foo`, `")"` ...
    pub fn describe(&self) -> String {
        match &self.token_type {
            TokenType::Word(w) if TokenType::is_keyword(w) => {
                format!("keyword {}", w.to_ascii_uppercase())
            }
            TokenType::Word(w) => format!("identifier {}", w),
            TokenType::QuotedIdent(w) => format!("identifier `{}`", w),
            TokenType::String(s) => format!("string literal '{}'", s),
            TokenType::Number(n) => format!("integer literal {}", n),
            TokenType::Param(p) => format!("parameter @{}", p),
            TokenType::Positional(n) => format!("positional parameter ${}", n),
            TokenType::Eof => "end of input".to_string(),
            other => format!("'{}'", other.symbol()),
        }
    }
}

impl TokenType {
    pub fn is_reserved(word: &str) -> bool {
        RESERVED.iter().any(|k| k.eq_ignore_ascii_case(word))
    }

    pub fn is_keyword(word: &str) -> bool {
        Self::is_reserved(word) || KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(word))
    }

    /// Source spelling of operators and delimiters
    pub fn symbol(&self) -> &'static str {
        match self {
            TokenType::Eq => "=",
            TokenType::Ne => "!=",
            TokenType::Lt => "<",
            TokenType::Gt => ">",
            TokenType::Le => "<=",
            TokenType::Ge => ">=",
            TokenType::Plus => "+",
            TokenType::Minus => "-",
            TokenType::Star => "*",
            TokenType::Slash => "/",
            TokenType::Concat => "||",
            TokenType::Cast => "::",
            TokenType::LParen => "(",
            TokenType::RParen => ")",
            TokenType::Comma => ",",
            TokenType::Semicolon => ";",
            TokenType::Dot => ".",
            _ => "",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_tokens() {
        let primary = Token::new(TokenType::Word("primary".into()), 1, 1);
        assert_eq!(primary.describe(), "keyword PRIMARY");
        assert!(primary.is_word("PRIMARY"));

        let ident = Token::new(TokenType::Word("dept_name".into()), 1, 1);
        assert_eq!(ident.describe(), "identifier dept_name");

        let rparen = Token::new(TokenType::RParen, 1, 1);
        assert_eq!(rparen.describe(), "')'");
        assert_eq!(Token::new(TokenType::Eof, 1, 1).describe(), "end of input");
    }

    #[test]
    fn test_reserved_words() {
        assert!(TokenType::is_reserved("select"));
        assert!(!TokenType::is_reserved("table"));
        assert!(TokenType::is_keyword("table"));
        assert!(!TokenType::is_keyword("employees"));
    }
}
