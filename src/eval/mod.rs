//! Constant-expression evaluator
//!
//! Walks an [`Expr`] tree and produces a [`Value`]. The same evaluator serves
//! `#if` conditions (scope = macro table), resource body folding (scope = the
//! resource header) and any later pass that knows template labels.
//!
//! - [`value`]: the result type
//! - [`scope`]: what an expression may look up
//! - [`ops`]: operator semantics
//! - [`builtins`]: `$$` pseudo-functions and the `printf` formatter

pub mod builtins;
pub mod ops;
pub mod scope;
pub mod value;

pub use scope::{EmptyScope, EvalScope, ResourceContext, Scope};
pub use value::Value;

use crate::errors::{EvalError, RezError};
use crate::host::{BuildMetadata, FileReader, Host};
use crate::parser::ast::{BinOp, Expr};
use crate::parser::lexer::Token;
use crate::parser::Parser;
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

/// Evaluates expressions against a scope and the host's collaborators.
pub struct Evaluator<'a> {
    pub(crate) scope: &'a dyn Scope,
    pub(crate) reader: &'a dyn FileReader,
    pub(crate) metadata: &'a dyn BuildMetadata,
}

impl<'a> Evaluator<'a> {
    pub fn new(scope: &'a dyn Scope, host: &'a Host) -> Self {
        Evaluator {
            scope,
            reader: host.reader.as_ref(),
            metadata: host.metadata.as_ref(),
        }
    }

    pub fn with_parts(
        scope: &'a dyn Scope,
        reader: &'a dyn FileReader,
        metadata: &'a dyn BuildMetadata,
    ) -> Self {
        Evaluator {
            scope,
            reader,
            metadata,
        }
    }

    pub fn eval(&self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Int(n, _) => Ok(Value::Int(n.clone())),
            Expr::Str(bytes, _) => Ok(Value::Str(bytes.clone())),
            Expr::Bytes(bytes, _) => Ok(Value::Bytes(bytes.clone())),

            Expr::Symbol(name, location) => {
                self.scope
                    .label_value(name, &[])
                    .ok_or_else(|| EvalError::UnknownIdentifier {
                        name: name.clone(),
                        location: *location,
                    })
            }

            Expr::Subscript {
                name,
                indices,
                location,
            } => {
                let indices = indices
                    .iter()
                    .map(|index| self.eval_i64(index, "array index"))
                    .collect::<Result<Vec<_>, _>>()?;
                self.scope
                    .label_value(name, &indices)
                    .ok_or_else(|| EvalError::UnknownIdentifier {
                        name: name.clone(),
                        location: *location,
                    })
            }

            Expr::Defined(name, _) => Ok(Value::from_bool(self.scope.is_macro_defined(name))),

            Expr::Unary {
                op,
                operand,
                location,
            } => {
                let value = self.eval(operand)?;
                ops::unary(*op, value, *location)
            }

            // && and || only evaluate the right side when it matters
            Expr::Binary {
                op: op @ (BinOp::And | BinOp::Or),
                left,
                right,
                ..
            } => {
                let lhs = self.eval_truth(left)?;
                if (*op == BinOp::And && !lhs) || (*op == BinOp::Or && lhs) {
                    return Ok(Value::from_bool(lhs));
                }
                Ok(Value::from_bool(self.eval_truth(right)?))
            }

            Expr::Binary {
                op,
                left,
                right,
                location,
            } => {
                let lhs = self.eval(left)?;
                let rhs = self.eval(right)?;
                ops::binary(*op, lhs, rhs, *location)
            }

            Expr::Ternary {
                condition,
                then_expr,
                else_expr,
                ..
            } => {
                if self.eval_truth(condition)? {
                    self.eval(then_expr)
                } else {
                    self.eval(else_expr)
                }
            }

            Expr::Concat(parts, location) => {
                let mut result = Value::Str(Vec::new());
                let mut all_hex = true;
                for part in parts {
                    let value = self.eval(part)?;
                    if !value.is_string() {
                        return Err(EvalError::TypeMismatch {
                            expected: "string".to_string(),
                            found: value.type_name().to_string(),
                            location: part.location(),
                        });
                    }
                    all_hex &= matches!(value, Value::Bytes(_));
                    result = result.concat(value).ok_or_else(|| EvalError::TypeMismatch {
                        expected: "string".to_string(),
                        found: "integer".to_string(),
                        location: *location,
                    })?;
                }
                // Only hex pieces joined together stay a byte string
                match result {
                    Value::Str(bytes) if all_hex && !parts.is_empty() => Ok(Value::Bytes(bytes)),
                    other => Ok(other),
                }
            }

            Expr::Call {
                function,
                args,
                location,
            } => self.call_builtin(*function, args, *location),
        }
    }

    pub fn eval_int(&self, expr: &Expr) -> Result<BigInt, EvalError> {
        match self.eval(expr)? {
            Value::Int(n) => Ok(n),
            other => Err(EvalError::TypeMismatch {
                expected: "integer".to_string(),
                found: other.type_name().to_string(),
                location: expr.location(),
            }),
        }
    }

    /// Evaluate an integer that must fit in 64 bits; `what` names it in the error.
    pub fn eval_i64(&self, expr: &Expr, what: &str) -> Result<i64, EvalError> {
        let n = self.eval_int(expr)?;
        n.to_i64().ok_or_else(|| EvalError::OutOfRange {
            value: n.to_string(),
            what: what.to_string(),
            location: expr.location(),
        })
    }

    fn eval_truth(&self, expr: &Expr) -> Result<bool, EvalError> {
        Ok(!self.eval_int(expr)?.is_zero())
    }

    /// Evaluate to the bytes of a text or hex string.
    pub fn eval_bytes(&self, expr: &Expr) -> Result<Vec<u8>, EvalError> {
        let value = self.eval(expr)?;
        let found = value.type_name();
        value.into_bytes().ok_or_else(|| EvalError::TypeMismatch {
            expected: "string".to_string(),
            found: found.to_string(),
            location: expr.location(),
        })
    }
}

/// Evaluate an already parsed expression.
pub fn evaluate(expr: &Expr, scope: &dyn Scope, host: &Host) -> Result<Value, EvalError> {
    Evaluator::new(scope, host).eval(expr)
}

/// Parse a token span as one expression and evaluate it.
///
/// The span must hold exactly one expression; a trailing `Eof` token is allowed.
pub fn evaluate_tokens(tokens: Vec<Token>, scope: &dyn Scope, host: &Host) -> Result<Value, RezError> {
    let expr = Parser::from_tokens(tokens).parse_standalone_expression()?;
    Ok(evaluate(&expr, scope, host)?)
}
