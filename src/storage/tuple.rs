//! Value and Row types for LayerDB
//!
//! This module defines how data values are represented in memory and on the
//! snapshot.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identifier of a row inside its table. Strictly increasing, never reused.
pub type RowId = u64;

/// A value in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    /// Integer value (64-bit)
    Integer(i64),
    /// Floating point value (64-bit)
    Real(f64),
    /// String value
    Text(String),
}

impl Value {
    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "INTEGER",
            Value::Real(_) => "REAL",
            Value::Text(_) => "TEXT",
        }
    }

    /// Compare two values for predicate evaluation.
    ///
    /// Integers and reals compare by exact numeric value. Returns `None`
    /// when a number is compared with text.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Real(b)) => Some(compare_int_real(*a, *b)),
            (Value::Real(a), Value::Integer(b)) => Some(compare_int_real(*b, *a).reverse()),
            (Value::Real(a), Value::Real(b)) => {
                Some(a.partial_cmp(b).unwrap_or_else(|| a.total_cmp(b)))
            }
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Text(_), _) | (_, Value::Text(_)) => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Integer(_) | Value::Real(_) => 0,
            Value::Text(_) => 1,
        }
    }
}

/// `-2^63` and `2^63` as reals; every real in `[MIN_I64_F, MAX_I64_F)` has an
/// exact `i64` floor.
const MIN_I64_F: f64 = -9_223_372_036_854_775_808.0;
const MAX_I64_F: f64 = 9_223_372_036_854_775_808.0;

/// Exact `i` vs `r`, without rounding `i` through `f64`
fn compare_int_real(i: i64, r: f64) -> Ordering {
    if r.is_nan() || r >= MAX_I64_F {
        return Ordering::Less;
    }
    if r < MIN_I64_F {
        return Ordering::Greater;
    }

    let floor = r.floor();
    match i.cmp(&(floor as i64)) {
        Ordering::Equal if r > floor => Ordering::Less,
        ordering => ordering,
    }
}

// Index keys need a total order: numbers first, then text.
impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
            .unwrap_or_else(|| self.rank().cmp(&other.rank()))
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Integer(i) => {
                0u8.hash(state);
                i.hash(state);
            }
            // Integral reals must land in the same bucket as the equal integer.
            Value::Real(f) if f.fract() == 0.0 && (MIN_I64_F..MAX_I64_F).contains(f) => {
                0u8.hash(state);
                (*f as i64).hash(state);
            }
            Value::Real(f) => {
                1u8.hash(state);
                f.to_bits().hash(state);
            }
            Value::Text(s) => {
                2u8.hash(state);
                s.hash(state);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

/// A stored row: one value per column plus an explicit tombstone flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Row identifier
    pub id: RowId,
    /// Values in column declaration order
    pub values: Vec<Value>,
    /// Set once the row has been logically deleted
    pub deleted: bool,
}

impl Row {
    /// Create a new live row
    pub fn new(id: RowId, values: Vec<Value>) -> Self {
        Self {
            id,
            values,
            deleted: false,
        }
    }

    /// Get a value by column position
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Whether the row is still visible to reads
    pub fn is_live(&self) -> bool {
        !self.deleted
    }

    /// Number of values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
