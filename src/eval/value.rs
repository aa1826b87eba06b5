//! Values produced by the expression evaluator

use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use std::fmt;

/// Result of evaluating an expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// Integers have no fixed width
    Int(BigInt),
    /// Text string
    Str(Vec<u8>),
    /// Byte string from a `$"..."` literal
    Bytes(Vec<u8>),
}

impl Value {
    pub fn int(n: impl Into<BigInt>) -> Self {
        Value::Int(n.into())
    }

    /// C truth value: 1 or 0
    pub fn from_bool(b: bool) -> Self {
        Value::Int(BigInt::from(u8::from(b)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Str(_) => "string",
            Value::Bytes(_) => "hex string",
        }
    }

    pub fn as_int(&self) -> Option<&BigInt> {
        match self {
            Value::Int(n) => Some(n),
            _ => None,
        }
    }

    /// The integer, if it is one and fits in 64 bits
    pub fn to_i64(&self) -> Option<i64> {
        self.as_int()?.to_i64()
    }

    /// Nonzero integers are true; strings are never conditions
    pub fn is_truthy(&self) -> Option<bool> {
        self.as_int().map(|n| !n.is_zero())
    }

    /// Contents of either string kind
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Str(bytes) | Value::Bytes(bytes) => Some(bytes),
            Value::Int(_) => None,
        }
    }

    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Value::Str(bytes) | Value::Bytes(bytes) => Some(bytes),
            Value::Int(_) => None,
        }
    }

    pub fn is_string(&self) -> bool {
        !matches!(self, Value::Int(_))
    }

    /// Join two strings. The result is a byte string only when both sides are.
    pub fn concat(self, other: Value) -> Option<Value> {
        match (self, other) {
            (Value::Bytes(mut a), Value::Bytes(b)) => {
                a.extend(b);
                Some(Value::Bytes(a))
            }
            (Value::Str(mut a), Value::Str(b) | Value::Bytes(b))
            | (Value::Bytes(mut a), Value::Str(b)) => {
                a.extend(b);
                Some(Value::Str(a))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Str(bytes) => {
                write!(f, "\"")?;
                for &b in bytes {
                    match b {
                        b'"' => write!(f, "\\\"")?,
                        b'\\' => write!(f, "\\\\")?,
                        0x20..=0x7E => write!(f, "{}", b as char)?,
                        _ => write!(f, "\\0x{:02X}", b)?,
                    }
                }
                write!(f, "\"")
            }
            Value::Bytes(bytes) => {
                write!(f, "$\"")?;
                for b in bytes {
                    write!(f, "{:02X}", b)?;
                }
                write!(f, "\"")
            }
        }
    }
}
