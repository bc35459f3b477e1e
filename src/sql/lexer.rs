/// SQL Lexer - converts SQL string into tokens

use super::token::{Token, TokenType};
use crate::error::{EngineError, Result};

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            let is_eof = matches!(token.token_type, TokenType::Eof);
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        Ok(tokens)
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();

        let line = self.line;
        let column = self.column;

        if self.is_eof() {
            return Ok(Token::new(TokenType::Eof, line, column));
        }

        let ch = self.current_char();

        // Skip comments
        if (ch == '-' && self.peek_char() == Some('-')) || ch == '#' {
            self.skip_line_comment();
            return self.next_token();
        }

        if ch == '/' && self.peek_char() == Some('*') {
            self.skip_block_comment()?;
            return self.next_token();
        }

        let token_type = match ch {
            // String literals (GoogleSQL accepts both quote styles)
            '\'' | '"' => self.read_string(ch)?,

            '`' => self.read_quoted_identifier()?,

            '0'..='9' => self.read_number(),

            'a'..='z' | 'A'..='Z' | '_' => TokenType::Word(self.read_word()),

            '@' => {
                self.advance();
                let name = self.read_word();
                if name.is_empty() {
                    return Err(self.error("Expected parameter name after '@'", line, column));
                }
                TokenType::Param(name)
            }
            '$' => {
                self.advance();
                let digits = self.read_digits();
                match digits.parse::<usize>() {
                    Ok(n) => TokenType::Positional(n),
                    Err(_) => return Err(self.error("Illegal input character '$'", line, column)),
                }
            }

            '=' => {
                self.advance();
                TokenType::Eq
            }
            '!' => {
                self.advance();
                if self.current_char() == '=' {
                    self.advance();
                    TokenType::Ne
                } else {
                    return Err(self.error("Illegal input character '!'", line, column));
                }
            }
            '<' => {
                self.advance();
                match self.current_char() {
                    '=' => {
                        self.advance();
                        TokenType::Le
                    }
                    '>' => {
                        self.advance();
                        TokenType::Ne
                    }
                    _ => TokenType::Lt,
                }
            }
            '>' => {
                self.advance();
                if self.current_char() == '=' {
                    self.advance();
                    TokenType::Ge
                } else {
                    TokenType::Gt
                }
            }
            '|' => {
                self.advance();
                if self.current_char() == '|' {
                    self.advance();
                    TokenType::Concat
                } else {
                    return Err(self.error("Illegal input character '|'", line, column));
                }
            }
            ':' => {
                self.advance();
                if self.current_char() == ':' {
                    self.advance();
                    TokenType::Cast
                } else {
                    return Err(self.error("Illegal input character ':'", line, column));
                }
            }
            '+' => {
                self.advance();
                TokenType::Plus
            }
            '-' => {
                self.advance();
                TokenType::Minus
            }
            '*' => {
                self.advance();
                TokenType::Star
            }
            '/' => {
                self.advance();
                TokenType::Slash
            }
            '(' => {
                self.advance();
                TokenType::LParen
            }
            ')' => {
                self.advance();
                TokenType::RParen
            }
            ',' => {
                self.advance();
                TokenType::Comma
            }
            ';' => {
                self.advance();
                TokenType::Semicolon
            }
            '.' => {
                self.advance();
                TokenType::Dot
            }
            _ => {
                return Err(self.error(&format!("Illegal input character '{}'", ch), line, column));
            }
        };

        Ok(Token::new(token_type, line, column))
    }

    fn error(&self, msg: &str, line: usize, column: usize) -> EngineError {
        EngineError::ParseError(format!("{} [at {}:{}]", msg, line, column))
    }

    fn current_char(&self) -> char {
        if self.is_eof() {
            '\0'
        } else {
            self.input[self.position]
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn advance(&mut self) {
        if !self.is_eof() {
            if self.input[self.position] == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.position += 1;
        }
    }

    fn is_eof(&self) -> bool {
        self.position >= self.input.len()
    }

    fn skip_whitespace(&mut self) {
        while !self.is_eof() && self.current_char().is_whitespace() {
            self.advance();
        }
    }

    fn skip_line_comment(&mut self) {
        while !self.is_eof() && self.current_char() != '\n' {
            self.advance();
        }
        if !self.is_eof() {
            self.advance(); // skip newline
        }
    }

    fn skip_block_comment(&mut self) -> Result<()> {
        let (line, column) = (self.line, self.column);
        self.advance(); // skip '/'
        self.advance(); // skip '*'

        while !self.is_eof() {
            if self.current_char() == '*' && self.peek_char() == Some('/') {
                self.advance();
                self.advance();
                return Ok(());
            }
            self.advance();
        }

        Err(self.error("Unclosed comment", line, column))
    }

    fn read_string(&mut self, quote: char) -> Result<TokenType> {
        let (line, column) = (self.line, self.column);
        self.advance(); // skip opening quote
        let mut value = String::new();

        while !self.is_eof() && self.current_char() != quote {
            if self.current_char() == '\\' {
                self.advance();
                if self.is_eof() {
                    break;
                }
                let escaped = match self.current_char() {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    c => c,
                };
                value.push(escaped);
            } else {
                value.push(self.current_char());
            }
            self.advance();
        }

        if self.is_eof() {
            return Err(self.error("Unclosed string literal", line, column));
        }

        self.advance(); // skip closing quote
        Ok(TokenType::String(value))
    }

    fn read_quoted_identifier(&mut self) -> Result<TokenType> {
        let (line, column) = (self.line, self.column);
        self.advance();
        let mut value = String::new();
        while !self.is_eof() && self.current_char() != '`' {
            value.push(self.current_char());
            self.advance();
        }
        if self.is_eof() {
            return Err(self.error("Unclosed identifier literal", line, column));
        }
        self.advance();
        Ok(TokenType::QuotedIdent(value))
    }

    fn read_number(&mut self) -> TokenType {
        let mut value = self.read_digits();

        if self.current_char() == '.' && self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            value.push('.');
            self.advance();
            value.push_str(&self.read_digits());
        }

        // 科学计数法 (1.5e10)
        if matches!(self.current_char(), 'e' | 'E')
            && self
                .peek_char()
                .is_some_and(|c| c.is_ascii_digit() || c == '+' || c == '-')
        {
            value.push(self.current_char());
            self.advance();
            if matches!(self.current_char(), '+' | '-') {
                value.push(self.current_char());
                self.advance();
            }
            value.push_str(&self.read_digits());
        }

        TokenType::Number(value)
    }

    fn read_digits(&mut self) -> String {
        let mut value = String::new();
        while !self.is_eof() && self.current_char().is_ascii_digit() {
            value.push(self.current_char());
            self.advance();
        }
        value
    }

    fn read_word(&mut self) -> String {
        let mut value = String::new();

        while !self.is_eof() {
            let ch = self.current_char();
            if ch.is_alphanumeric() || ch == '_' {
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(sql: &str) -> Vec<TokenType> {
        Lexer::new(sql)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.token_type)
            .collect()
    }

    #[test]
    fn test_lexer_simple_select() {
        let tokens = types("SELECT * FROM employees");
        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[0], TokenType::Word("SELECT".into()));
        assert_eq!(tokens[1], TokenType::Star);
        assert_eq!(tokens[3], TokenType::Word("employees".into()));
        assert_eq!(tokens[4], TokenType::Eof);
    }

    #[test]
    fn test_lexer_parameters() {
        let tokens = types("VALUES (@dept_name, $2)");
        assert_eq!(tokens[2], TokenType::Param("dept_name".into()));
        assert_eq!(tokens[4], TokenType::Positional(2));
    }

    #[test]
    fn test_lexer_string_literal() {
        let tokens = types("'O\\'Brien' \"x\"");
        assert_eq!(tokens[0], TokenType::String("O'Brien".into()));
        assert_eq!(tokens[1], TokenType::String("x".into()));
    }

    #[test]
    fn test_lexer_operators() {
        let tokens = types("a <> b <= c || d::int");
        assert_eq!(tokens[1], TokenType::Ne);
        assert_eq!(tokens[3], TokenType::Le);
        assert_eq!(tokens[5], TokenType::Concat);
        assert_eq!(tokens[7], TokenType::Cast);
    }

    #[test]
    fn test_lexer_numbers() {
        let tokens = types("75000 1.5 2e3 t.c");
        assert_eq!(tokens[0], TokenType::Number("75000".into()));
        assert_eq!(tokens[1], TokenType::Number("1.5".into()));
        assert_eq!(tokens[2], TokenType::Number("2e3".into()));
        assert_eq!(tokens[4], TokenType::Dot);
    }

    #[test]
    fn test_lexer_comment() {
        let tokens = types("SELECT 1 -- trailing\n/* block */ FROM t");
        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[2], TokenType::Word("FROM".into()));
    }

    #[test]
    fn test_lexer_errors_carry_location() {
        let err = Lexer::new("SELECT ?").tokenize().unwrap_err();
        assert!(err.to_string().contains("Illegal input character '?' [at 1:8]"));

        assert!(Lexer::new("'open").tokenize().is_err());
    }
}
