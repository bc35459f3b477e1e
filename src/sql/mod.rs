/// SQL text handling
///
/// - Cleaner: comment stripping and script splitting
/// - Classifier: statement kinds
/// - Lexer / Parser: GoogleSQL subset understood by the memory target
/// - Evaluator: expression evaluation over memory-target rows

pub mod token;
pub mod lexer;
pub mod ast;
pub mod parser;
pub mod evaluator;
pub mod cleaner;
pub mod classifier;

pub use token::{Token, TokenType};
pub use lexer::Lexer;
pub use parser::Parser;
pub use cleaner::{clean_statement, split_statements};
pub use classifier::{classify, leading_keyword};

use crate::error::Result;

/// Lex and parse one statement
pub fn parse_sql(sql: &str) -> Result<ast::SqlStatement> {
    let mut lexer = Lexer::new(sql);
    let tokens = lexer.tokenize()?;
    let mut parser = Parser::new(tokens);
    parser.parse()
}
