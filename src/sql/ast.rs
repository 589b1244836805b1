//! SQL Abstract Syntax Tree (AST)
//!
//! This module defines the typed statements produced by the parser and
//! consumed by the execution engine.

use std::cmp::Ordering;
use std::fmt;

use super::token::Token;
use crate::catalog::Column;
use crate::error::{Error, Result};
use crate::storage::Value;

/// A SQL statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// CREATE TABLE statement
    CreateTable(CreateTableStatement),
    /// INSERT statement
    Insert(InsertStatement),
    /// SELECT statement
    Select(SelectStatement),
    /// DELETE statement
    Delete(DeleteStatement),
    /// DESCRIBE / DESC statement
    Describe(DescribeStatement),
}

impl Statement {
    /// Name of the table the statement targets
    pub fn table_name(&self) -> &str {
        match self {
            Statement::CreateTable(s) => &s.table_name,
            Statement::Insert(s) => &s.table_name,
            Statement::Select(s) => &s.table_name,
            Statement::Delete(s) => &s.table_name,
            Statement::Describe(s) => &s.table_name,
        }
    }
}

/// Canonical SQL text; parsing it yields the same statement
impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::CreateTable(s) => s.fmt(f),
            Statement::Insert(s) => s.fmt(f),
            Statement::Select(s) => s.fmt(f),
            Statement::Delete(s) => s.fmt(f),
            Statement::Describe(s) => s.fmt(f),
        }
    }
}

/// Write a name bare when it lexes back as the same identifier, quoted
/// otherwise
fn write_identifier(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    let mut chars = name.chars();
    let bare = chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
        && Token::from_keyword(name).is_none();

    if bare {
        f.write_str(name)
    } else {
        write!(f, "\"{}\"", name.replace('"', "\"\""))
    }
}

fn write_list<T>(
    f: &mut fmt::Formatter<'_>,
    items: &[T],
    mut write_item: impl FnMut(&mut fmt::Formatter<'_>, &T) -> fmt::Result,
) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write_item(f, item)?;
    }
    Ok(())
}

fn literal(value: &Value) -> Token {
    match value {
        Value::Integer(n) => Token::IntegerLiteral(*n),
        Value::Real(n) => Token::FloatLiteral(*n),
        Value::Text(s) => Token::StringLiteral(s.clone()),
    }
}

/// CREATE TABLE statement
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStatement {
    /// Table name
    pub table_name: String,
    /// Column definitions
    pub columns: Vec<Column>,
}

impl fmt::Display for CreateTableStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CREATE TABLE ")?;
        write_identifier(f, &self.table_name)?;
        f.write_str(" (")?;
        write_list(f, &self.columns, |f, column| {
            write_identifier(f, &column.name)?;
            write!(f, " {}", column.data_type)?;
            for constraint in &column.constraints {
                write!(f, " {}", constraint)?;
            }
            Ok(())
        })?;
        f.write_str(")")
    }
}

/// INSERT statement (positional values only)
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    /// Target table name
    pub table_name: String,
    /// Values to insert, one per column
    pub values: Vec<Value>,
}

impl fmt::Display for InsertStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("INSERT INTO ")?;
        write_identifier(f, &self.table_name)?;
        f.write_str(" VALUES (")?;
        write_list(f, &self.values, |f, value| write!(f, "{}", literal(value)))?;
        f.write_str(")")
    }
}

/// SELECT statement
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    /// Select list
    pub projection: Projection,
    /// FROM table
    pub table_name: String,
    /// WHERE clause
    pub predicate: Option<Predicate>,
}

impl fmt::Display for SelectStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SELECT ")?;
        match &self.projection {
            Projection::Wildcard => f.write_str("*")?,
            Projection::Columns(names) => write_list(f, names, |f, n| write_identifier(f, n))?,
        }
        f.write_str(" FROM ")?;
        write_identifier(f, &self.table_name)?;
        if let Some(predicate) = &self.predicate {
            write!(f, " WHERE {}", predicate)?;
        }
        Ok(())
    }
}

/// DELETE statement
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    /// Target table name
    pub table_name: String,
    /// WHERE clause; `None` deletes every live row
    pub predicate: Option<Predicate>,
}

impl fmt::Display for DeleteStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DELETE FROM ")?;
        write_identifier(f, &self.table_name)?;
        if let Some(predicate) = &self.predicate {
            write!(f, " WHERE {}", predicate)?;
        }
        Ok(())
    }
}

/// DESCRIBE statement
#[derive(Debug, Clone, PartialEq)]
pub struct DescribeStatement {
    /// Table name
    pub table_name: String,
}

impl fmt::Display for DescribeStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DESCRIBE ")?;
        write_identifier(f, &self.table_name)
    }
}

/// The select list
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// All columns (*)
    Wildcard,
    /// Named columns in the requested order
    Columns(Vec<String>),
}

/// Single-column comparison: `column op value`
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    /// Column name
    pub column: String,
    /// Comparison operator
    pub op: CompareOp,
    /// Literal to compare against
    pub value: Value,
}

impl Predicate {
    pub fn new(column: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op,
            value: value.into(),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_identifier(f, &self.column)?;
        write!(f, " {} {}", self.op, literal(&self.value))
    }
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareOp {
    /// Evaluate `left op right`.
    ///
    /// Equality across a number and text is simply false (true for `!=`);
    /// ordering comparisons across them are a type error.
    pub fn evaluate(&self, left: &Value, right: &Value) -> Result<bool> {
        let ordering = match left.compare(right) {
            Some(ordering) => ordering,
            None => {
                return match self {
                    CompareOp::Eq => Ok(false),
                    CompareOp::Neq => Ok(true),
                    _ => Err(Error::TypeMismatch {
                        left: left.type_name(),
                        right: right.type_name(),
                        op: self.to_string(),
                    }),
                }
            }
        };

        Ok(match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Neq => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Lte => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Gte => ordering != Ordering::Less,
        })
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            CompareOp::Eq => "=",
            CompareOp::Neq => "!=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
        };
        f.write_str(symbol)
    }
}
