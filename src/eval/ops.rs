//! Operator semantics
//!
//! Integers have no fixed width, so `+ - *` never overflow. Division truncates
//! toward zero and the remainder takes the sign of the dividend. A negative
//! shift count shifts the other way. Left shifts are capped at
//! [`MAX_SHIFT_BITS`]; a larger count is an overflow error.

use super::value::Value;
use crate::constants::MAX_SHIFT_BITS;
use crate::errors::EvalError;
use crate::parser::ast::{BinOp, SourceLocation, UnOp};
use num_bigint::{BigInt, Sign};
use num_traits::{ToPrimitive, Zero};

fn expect_int(value: &Value, location: SourceLocation) -> Result<&BigInt, EvalError> {
    value.as_int().ok_or_else(|| EvalError::TypeMismatch {
        expected: "integer".to_string(),
        found: value.type_name().to_string(),
        location,
    })
}

fn overflow(a: &BigInt, op: BinOp, b: &BigInt, location: SourceLocation) -> EvalError {
    EvalError::Overflow {
        operation: format!("{} {} {}", a, op.symbol(), b),
        location,
    }
}

/// Apply a non-short-circuit binary operator.
pub fn binary(op: BinOp, left: Value, right: Value, location: SourceLocation) -> Result<Value, EvalError> {
    // Strings only support joining and equality
    if left.is_string() && right.is_string() {
        return match op {
            BinOp::Add => left.concat(right).ok_or_else(|| string_mismatch(location)),
            BinOp::Eq => Ok(Value::from_bool(left.as_bytes() == right.as_bytes())),
            BinOp::Ne => Ok(Value::from_bool(left.as_bytes() != right.as_bytes())),
            _ => Err(EvalError::TypeMismatch {
                expected: "integer".to_string(),
                found: left.type_name().to_string(),
                location,
            }),
        };
    }

    let a = expect_int(&left, location)?;
    let b = expect_int(&right, location)?;

    let result = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div | BinOp::Mod => {
            if b.is_zero() {
                return Err(EvalError::DivisionByZero {
                    operation: format!("{} {} {}", a, op.symbol(), b),
                    location,
                });
            }
            // BigInt `/` and `%` truncate toward zero like the primitive types
            if op == BinOp::Div {
                a / b
            } else {
                a % b
            }
        }
        BinOp::BitShl => shift(a, b, true).ok_or_else(|| overflow(a, op, b, location))?,
        BinOp::BitShr => shift(a, b, false).ok_or_else(|| overflow(a, op, b, location))?,
        BinOp::BitAnd => a & b,
        BinOp::BitOr => a | b,
        BinOp::BitXor => a ^ b,
        BinOp::Eq => return Ok(Value::from_bool(a == b)),
        BinOp::Ne => return Ok(Value::from_bool(a != b)),
        BinOp::Lt => return Ok(Value::from_bool(a < b)),
        BinOp::Le => return Ok(Value::from_bool(a <= b)),
        BinOp::Gt => return Ok(Value::from_bool(a > b)),
        BinOp::Ge => return Ok(Value::from_bool(a >= b)),
        BinOp::And => return Ok(Value::from_bool(!a.is_zero() && !b.is_zero())),
        BinOp::Or => return Ok(Value::from_bool(!a.is_zero() || !b.is_zero())),
    };

    Ok(Value::Int(result))
}

fn string_mismatch(location: SourceLocation) -> EvalError {
    EvalError::TypeMismatch {
        expected: "string".to_string(),
        found: "integer".to_string(),
        location,
    }
}

/// Shift `value` by `count` bits; `left` picks the direction for a positive count.
///
/// Right shifts are arithmetic. Returns `None` for a left shift of more than
/// [`MAX_SHIFT_BITS`] on a nonzero value.
pub fn shift(value: &BigInt, count: &BigInt, left: bool) -> Option<BigInt> {
    let to_left = left == (count.sign() != Sign::Minus);
    let amount = count.magnitude().to_usize();

    if to_left {
        if value.is_zero() {
            return Some(BigInt::zero());
        }
        let amount = amount.filter(|&n| n <= MAX_SHIFT_BITS)?;
        Some(value << amount)
    } else {
        match amount {
            Some(n) => Some(value >> n),
            None if value.sign() == Sign::Minus => Some(BigInt::from(-1)),
            None => Some(BigInt::zero()),
        }
    }
}

pub fn unary(op: UnOp, value: Value, location: SourceLocation) -> Result<Value, EvalError> {
    let n = expect_int(&value, location)?;
    let result = match op {
        UnOp::Neg => -n,
        UnOp::Not => return Ok(Value::from_bool(n.is_zero())),
        UnOp::BitNot => !n,
    };
    Ok(Value::Int(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(op: BinOp, a: i64, b: i64) -> BigInt {
        binary(op, Value::int(a), Value::int(b), SourceLocation::default())
            .unwrap()
            .as_int()
            .unwrap()
            .clone()
    }

    #[test]
    fn test_truncating_division() {
        assert_eq!(int(BinOp::Mod, -7, 5), BigInt::from(-2));
        assert_eq!(int(BinOp::Mod, 7, -5), BigInt::from(2));
        assert_eq!(int(BinOp::Mod, -7, -5), BigInt::from(-2));
        assert_eq!(int(BinOp::Div, -3, 2), BigInt::from(-1));
        assert_eq!(int(BinOp::Div, 3, -2), BigInt::from(-1));
        assert_eq!(int(BinOp::Div, -3, -2), BigInt::from(1));
    }

    #[test]
    fn test_division_by_zero() {
        for op in [BinOp::Div, BinOp::Mod] {
            let err = binary(op, Value::int(1), Value::int(0), SourceLocation::new(2, 5)).unwrap_err();
            assert!(matches!(err, EvalError::DivisionByZero { .. }));
        }
    }

    #[test]
    fn test_negative_shift_reverses_direction() {
        assert_eq!(int(BinOp::BitShl, 8, -2), BigInt::from(2));
        assert_eq!(int(BinOp::BitShr, 8, 2), BigInt::from(2));
        assert_eq!(int(BinOp::BitShr, 8, -2), BigInt::from(32));
        assert_eq!(int(BinOp::BitShl, 8, 2), BigInt::from(32));
        assert_eq!(int(BinOp::BitShr, -8, 70), BigInt::from(-1));
    }

    #[test]
    fn test_results_wider_than_64_bits() {
        assert_eq!(int(BinOp::BitShl, 1, 64), BigInt::from(u64::MAX) + 1u32);
        assert_eq!(int(BinOp::Add, i64::MAX, 1), BigInt::from(i64::MAX) + 1u32);
        assert_eq!(int(BinOp::Div, i64::MIN, -1), -BigInt::from(i64::MIN));
        assert_eq!(int(BinOp::Mul, i64::MAX, i64::MAX), BigInt::from(i64::MAX).pow(2));
        assert_eq!(int(BinOp::BitShr, 1, -100) >> 100usize, BigInt::from(1));
    }

    #[test]
    fn test_huge_left_shift_is_reported() {
        let loc = SourceLocation::default();
        let too_far = Value::int(MAX_SHIFT_BITS as u64 + 1);
        assert!(matches!(
            binary(BinOp::BitShl, Value::int(1), too_far.clone(), loc),
            Err(EvalError::Overflow { .. })
        ));
        assert_eq!(
            binary(BinOp::BitShl, Value::int(0), too_far.clone(), loc).unwrap(),
            Value::int(0)
        );
        assert_eq!(
            binary(BinOp::BitShr, Value::int(-5), too_far, loc).unwrap(),
            Value::int(-1)
        );
    }

    #[test]
    fn test_string_operators() {
        let loc = SourceLocation::default();
        let a = Value::Str(b"ab".to_vec());
        let b = Value::Str(b"cd".to_vec());
        assert_eq!(
            binary(BinOp::Add, a.clone(), b.clone(), loc).unwrap(),
            Value::Str(b"abcd".to_vec())
        );
        assert_eq!(binary(BinOp::Eq, a.clone(), a.clone(), loc).unwrap(), Value::int(1));
        assert_eq!(binary(BinOp::Ne, a.clone(), b.clone(), loc).unwrap(), Value::int(1));
        assert!(matches!(
            binary(BinOp::Lt, a.clone(), b, loc),
            Err(EvalError::TypeMismatch { .. })
        ));
        assert!(matches!(
            binary(BinOp::Add, a, Value::int(1), loc),
            Err(EvalError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_unary() {
        let loc = SourceLocation::default();
        assert_eq!(unary(UnOp::Neg, Value::int(5), loc).unwrap(), Value::int(-5));
        assert_eq!(unary(UnOp::Not, Value::int(0), loc).unwrap(), Value::int(1));
        assert_eq!(unary(UnOp::BitNot, Value::int(0), loc).unwrap(), Value::int(-1));
        assert_eq!(
            unary(UnOp::Neg, Value::int(i64::MIN), loc).unwrap(),
            Value::int(BigInt::from(i64::MAX) + 1u32)
        );
    }
}
