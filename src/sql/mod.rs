//! SQL front end: tokens, lexer, parser and the statement AST

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::Statement;
pub use lexer::Lexer;
pub use parser::Parser;
pub use token::Token;

/// Parse a single SQL statement
pub fn parse(sql: &str) -> crate::error::Result<Statement> {
    Parser::new(sql)?.parse()
}
