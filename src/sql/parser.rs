//! SQL Parser
//!
//! Recursive descent over the token stream for the five supported
//! statements. A statement may end with one `;`; anything after it is an
//! error.

use super::ast::*;
use super::lexer::Lexer;
use super::token::Token;
use crate::catalog::Column;
use crate::error::{Error, Result};
use crate::storage::Value;

/// SQL Parser
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    /// Create a new parser from a SQL string
    pub fn new(sql: &str) -> Result<Self> {
        let mut lexer = Lexer::new(sql);
        let tokens = lexer.tokenize()?;

        Ok(Self {
            tokens,
            position: 0,
        })
    }

    /// Parse exactly one SQL statement
    pub fn parse(&mut self) -> Result<Statement> {
        if self.is_at_end() {
            return Err(Error::ParseError("empty statement".to_string()));
        }

        let stmt = self.parse_statement()?;

        // Consume optional semicolon
        if self.check(&Token::Semicolon) {
            self.advance();
        }

        if !self.is_at_end() {
            return Err(Error::UnexpectedToken {
                expected: "end of statement".to_string(),
                found: format!("{}", self.current()),
            });
        }

        Ok(stmt)
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        match self.current() {
            Token::Create => self.parse_create_table().map(Statement::CreateTable),
            Token::Insert => self.parse_insert().map(Statement::Insert),
            Token::Select => self.parse_select().map(Statement::Select),
            Token::Delete => self.parse_delete().map(Statement::Delete),
            Token::Describe | Token::Desc => self.parse_describe().map(Statement::Describe),
            _ => Err(Error::UnexpectedToken {
                expected: "CREATE, INSERT, SELECT, DELETE or DESCRIBE".to_string(),
                found: format!("{}", self.current()),
            }),
        }
    }

    // ========== CREATE TABLE Statement ==========

    fn parse_create_table(&mut self) -> Result<CreateTableStatement> {
        self.expect(&Token::Create)?;
        self.expect(&Token::Table)?;

        let table_name = self.expect_identifier()?;

        self.expect(&Token::LParen)?;
        let mut columns = Vec::new();
        loop {
            columns.push(self.parse_column_def()?);

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }
        self.expect(&Token::RParen)?;

        Ok(CreateTableStatement {
            table_name,
            columns,
        })
    }

    /// `name TYPE[(args)] [constraint tokens...]`
    fn parse_column_def(&mut self) -> Result<Column> {
        let name = self.expect_identifier()?;
        let mut column = Column::new(name, self.parse_data_type()?);

        let mut depth = 0usize;
        loop {
            match self.current() {
                Token::Eof => break,
                Token::Comma | Token::RParen if depth == 0 => break,
                Token::LParen => depth += 1,
                Token::RParen => depth -= 1,
                _ => {}
            }
            column = column.constraint(self.current().to_string());
            self.advance();
        }

        Ok(column)
    }

    /// Upper-cased type name, keeping any parenthesized arguments
    fn parse_data_type(&mut self) -> Result<String> {
        let mut data_type = match self.current() {
            Token::Identifier(name) => name.to_uppercase(),
            _ => {
                return Err(Error::UnexpectedToken {
                    expected: "data type".to_string(),
                    found: format!("{}", self.current()),
                })
            }
        };
        self.advance();

        if self.check(&Token::LParen) {
            self.advance();
            let mut args = Vec::new();
            while !self.check(&Token::RParen) {
                match self.current() {
                    Token::IntegerLiteral(n) => args.push(n.to_string()),
                    Token::Comma => {}
                    _ => {
                        return Err(Error::UnexpectedToken {
                            expected: "type argument".to_string(),
                            found: format!("{}", self.current()),
                        })
                    }
                }
                self.advance();
            }
            self.advance();
            data_type = format!("{}({})", data_type, args.join(","));
        }

        Ok(data_type)
    }

    // ========== INSERT Statement ==========

    fn parse_insert(&mut self) -> Result<InsertStatement> {
        self.expect(&Token::Insert)?;
        self.expect(&Token::Into)?;

        let table_name = self.expect_identifier()?;

        self.expect(&Token::Values)?;
        self.expect(&Token::LParen)?;
        let mut values = Vec::new();
        loop {
            values.push(self.parse_literal()?);

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance();
        }
        self.expect(&Token::RParen)?;

        Ok(InsertStatement { table_name, values })
    }

    // ========== SELECT Statement ==========

    fn parse_select(&mut self) -> Result<SelectStatement> {
        self.expect(&Token::Select)?;

        let projection = if self.check(&Token::Asterisk) {
            self.advance();
            Projection::Wildcard
        } else {
            Projection::Columns(self.parse_identifier_list()?)
        };

        self.expect(&Token::From)?;
        let table_name = self.expect_identifier()?;
        let predicate = self.parse_where_clause()?;

        Ok(SelectStatement {
            projection,
            table_name,
            predicate,
        })
    }

    // ========== DELETE Statement ==========

    fn parse_delete(&mut self) -> Result<DeleteStatement> {
        self.expect(&Token::Delete)?;
        self.expect(&Token::From)?;

        let table_name = self.expect_identifier()?;
        let predicate = self.parse_where_clause()?;

        Ok(DeleteStatement {
            table_name,
            predicate,
        })
    }

    // ========== DESCRIBE Statement ==========

    fn parse_describe(&mut self) -> Result<DescribeStatement> {
        // DESCRIBE or DESC
        self.advance();
        let table_name = self.expect_identifier()?;
        Ok(DescribeStatement { table_name })
    }

    // ========== Clauses ==========

    /// Optional `WHERE column op literal`
    fn parse_where_clause(&mut self) -> Result<Option<Predicate>> {
        if !self.check(&Token::Where) {
            return Ok(None);
        }
        self.advance();

        let column = self.expect_identifier()?;
        let op = match self.current() {
            Token::Eq => CompareOp::Eq,
            Token::Neq => CompareOp::Neq,
            Token::Lt => CompareOp::Lt,
            Token::Lte => CompareOp::Lte,
            Token::Gt => CompareOp::Gt,
            Token::Gte => CompareOp::Gte,
            _ => {
                return Err(Error::UnexpectedToken {
                    expected: "comparison operator".to_string(),
                    found: format!("{}", self.current()),
                })
            }
        };
        self.advance();
        let value = self.parse_literal()?;

        Ok(Some(Predicate { column, op, value }))
    }

    fn parse_literal(&mut self) -> Result<Value> {
        let value = match self.current() {
            Token::IntegerLiteral(n) => Value::Integer(*n),
            Token::FloatLiteral(n) => Value::Real(*n),
            Token::StringLiteral(s) => Value::Text(s.clone()),
            _ => {
                return Err(Error::UnexpectedToken {
                    expected: "literal".to_string(),
                    found: format!("{}", self.current()),
                })
            }
        };
        self.advance();
        Ok(value)
    }

    fn parse_identifier_list(&mut self) -> Result<Vec<String>> {
        let mut identifiers = vec![self.expect_identifier()?];

        while self.check(&Token::Comma) {
            self.advance();
            identifiers.push(self.expect_identifier()?);
        }

        Ok(identifiers)
    }

    // ========== Helpers ==========

    fn current(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current(), Token::Eof)
    }

    fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(self.current()) == std::mem::discriminant(token)
    }

    fn expect(&mut self, token: &Token) -> Result<()> {
        if self.check(token) {
            self.advance();
            Ok(())
        } else {
            Err(Error::UnexpectedToken {
                expected: format!("{}", token),
                found: format!("{}", self.current()),
            })
        }
    }

    fn expect_identifier(&mut self) -> Result<String> {
        match self.current().clone() {
            Token::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(Error::UnexpectedToken {
                expected: "identifier".to_string(),
                found: format!("{}", self.current()),
            }),
        }
    }
}
