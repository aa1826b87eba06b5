//! Expression parsing implementation
//!
//! Rez expressions use the C operator table:
//!
//! | Level | Operators              |
//! |-------|------------------------|
//! | 1     | `?:`                   |
//! | 2     | `\|\|`                 |
//! | 3     | `&&`                   |
//! | 4     | `\|`                   |
//! | 5     | `^`                    |
//! | 6     | `&`                    |
//! | 7     | `==` `!=`              |
//! | 8     | `<` `<=` `>` `>=`      |
//! | 9     | `<<` `>>`              |
//! | 10    | `+` `-`                |
//! | 11    | `*` `/` `%`            |
//! | 12    | unary `-` `!` `~` `+`  |
//!
//! Primaries are integer literals, runs of adjacent strings, `defined NAME`,
//! identifiers (optionally subscripted), `$$` pseudo-function calls and
//! parenthesized expressions.
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::errors::{EvalError, RezError};
use crate::parser::ast::*;
use crate::parser::lexer::{Punct, Token, TokenKind};
use crate::parser::parse::Parser;

const EQUALITY: &[(Punct, BinOp)] = &[(Punct::EqEq, BinOp::Eq), (Punct::NotEq, BinOp::Ne)];
const RELATIONAL: &[(Punct, BinOp)] = &[
    (Punct::Lt, BinOp::Lt),
    (Punct::Le, BinOp::Le),
    (Punct::Gt, BinOp::Gt),
    (Punct::Ge, BinOp::Ge),
];
const SHIFT: &[(Punct, BinOp)] = &[(Punct::LtLt, BinOp::BitShl), (Punct::GtGt, BinOp::BitShr)];
const ADDITIVE: &[(Punct, BinOp)] = &[(Punct::Plus, BinOp::Add), (Punct::Minus, BinOp::Sub)];
const MULTIPLICATIVE: &[(Punct, BinOp)] = &[
    (Punct::Star, BinOp::Mul),
    (Punct::Slash, BinOp::Div),
    (Punct::Percent, BinOp::Mod),
];

/// Pseudo-functions that produce strings and so may sit in a run of adjacent strings
pub(crate) fn is_string_function(function: Builtin) -> bool {
    matches!(
        function,
        Builtin::Date
            | Builtin::Time
            | Builtin::Version
            | Builtin::Format
            | Builtin::Name
            | Builtin::Shell
            | Builtin::Read
            | Builtin::Resource
    )
}

impl Parser {
    /// Parse expression (top-level entry point)
    pub(crate) fn parse_expression(&mut self) -> Result<Expr, RezError> {
        self.parse_ternary()
    }

    /// Parse ternary: condition ? then_expr : else_expr
    fn parse_ternary(&mut self) -> Result<Expr, RezError> {
        let condition = self.parse_logical_or()?;

        if self.match_punct(Punct::Question) {
            let location = self.previous_location();
            let then_expr = Box::new(self.parse_expression()?);
            self.expect_punct(Punct::Colon, "conditional expression")?;
            let else_expr = Box::new(self.parse_ternary()?);

            return Ok(Expr::Ternary {
                condition: Box::new(condition),
                then_expr,
                else_expr,
                location,
            });
        }

        Ok(condition)
    }

    /// One left-associative binary level: `next (op next)*`
    fn parse_binary_level(
        &mut self,
        operators: &[(Punct, BinOp)],
        next: fn(&mut Self) -> Result<Expr, RezError>,
    ) -> Result<Expr, RezError> {
        let mut left = next(self)?;

        'outer: loop {
            for &(punct, op) in operators {
                if self.match_punct(punct) {
                    let location = self.previous_location();
                    let right = next(self)?;
                    left = Expr::Binary {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                        location,
                    };
                    continue 'outer;
                }
            }
            return Ok(left);
        }
    }

    /// Parse logical OR (||)
    fn parse_logical_or(&mut self) -> Result<Expr, RezError> {
        self.parse_binary_level(&[(Punct::OrOr, BinOp::Or)], Self::parse_logical_and)
    }

    /// Parse logical AND (&&)
    fn parse_logical_and(&mut self) -> Result<Expr, RezError> {
        self.parse_binary_level(&[(Punct::AndAnd, BinOp::And)], Self::parse_bitwise_or)
    }

    fn parse_bitwise_or(&mut self) -> Result<Expr, RezError> {
        self.parse_binary_level(&[(Punct::Pipe, BinOp::BitOr)], Self::parse_bitwise_xor)
    }

    fn parse_bitwise_xor(&mut self) -> Result<Expr, RezError> {
        self.parse_binary_level(&[(Punct::Caret, BinOp::BitXor)], Self::parse_bitwise_and)
    }

    fn parse_bitwise_and(&mut self) -> Result<Expr, RezError> {
        self.parse_binary_level(&[(Punct::Amp, BinOp::BitAnd)], Self::parse_equality)
    }

    fn parse_equality(&mut self) -> Result<Expr, RezError> {
        self.parse_binary_level(EQUALITY, Self::parse_relational)
    }

    fn parse_relational(&mut self) -> Result<Expr, RezError> {
        self.parse_binary_level(RELATIONAL, Self::parse_shift)
    }

    fn parse_shift(&mut self) -> Result<Expr, RezError> {
        self.parse_binary_level(SHIFT, Self::parse_additive)
    }

    fn parse_additive(&mut self) -> Result<Expr, RezError> {
        self.parse_binary_level(ADDITIVE, Self::parse_multiplicative)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, RezError> {
        self.parse_binary_level(MULTIPLICATIVE, Self::parse_unary)
    }

    /// Parse unary operators: -x, !x, ~x, +x
    fn parse_unary(&mut self) -> Result<Expr, RezError> {
        let op = if self.match_punct(Punct::Minus) {
            Some(UnOp::Neg)
        } else if self.match_punct(Punct::Bang) {
            Some(UnOp::Not)
        } else if self.match_punct(Punct::Tilde) {
            Some(UnOp::BitNot)
        } else if self.match_punct(Punct::Plus) {
            // Unary plus changes nothing
            return self.parse_unary();
        } else {
            None
        };

        match op {
            Some(op) => {
                let location = self.previous_location();
                let operand = Box::new(self.parse_unary()?);
                Ok(Expr::Unary {
                    op,
                    operand,
                    location,
                })
            }
            None => self.parse_primary(),
        }
    }

    /// Parse primary expressions
    fn parse_primary(&mut self) -> Result<Expr, RezError> {
        let token = self.peek().clone();

        match &token.kind {
            TokenKind::Int(n) => {
                self.advance();
                Ok(Expr::Int(n.clone(), token.location))
            }

            TokenKind::Str(_) | TokenKind::HexStr(_) => self.parse_string_run(),

            TokenKind::Function => match Builtin::from_name(&token.text) {
                Some(function) if is_string_function(function) => self.parse_string_run(),
                _ => {
                    self.advance();
                    self.parse_call(&token)
                }
            },

            TokenKind::Punct(Punct::LParen) => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_punct(Punct::RParen, "parenthesized expression")?;
                Ok(expr)
            }

            TokenKind::Ident if token.is_keyword("defined") => {
                self.advance();
                self.parse_defined(token.location)
            }

            TokenKind::Ident => {
                // Attribute names are usable as plain numbers
                if let Some(value) = ResourceAttributes::keyword_value(&token.text) {
                    self.advance();
                    return Ok(Expr::Int(value.into(), token.location));
                }
                if !token.is_plain_ident() {
                    return Err(self.unexpected("expression", "expression"));
                }
                self.advance();
                if self.check_punct(Punct::LBracket) {
                    return self.parse_subscript(token);
                }
                Ok(Expr::Symbol(token.text, token.location))
            }

            _ => Err(self.unexpected("expression", "expression")),
        }
    }

    /// `defined NAME` or `defined(NAME)`; any identifier is accepted as the name.
    fn parse_defined(&mut self, location: SourceLocation) -> Result<Expr, RezError> {
        let parenthesized = self.match_punct(Punct::LParen);
        if !self.peek().is_ident() {
            return Err(self.unexpected("macro name", "defined expression"));
        }
        let name = self.advance().text;
        if parenthesized {
            self.expect_punct(Punct::RParen, "defined expression")?;
        }
        Ok(Expr::Defined(name, location))
    }

    /// `label[i, j]`
    fn parse_subscript(&mut self, name: Token) -> Result<Expr, RezError> {
        self.expect_punct(Punct::LBracket, "label subscript")?;
        let mut indices = vec![self.parse_expression()?];
        while self.match_punct(Punct::Comma) {
            indices.push(self.parse_expression()?);
        }
        self.expect_punct(Punct::RBracket, "label subscript")?;
        Ok(Expr::Subscript {
            name: name.text,
            indices,
            location: name.location,
        })
    }

    /// Adjacent string literals and string-valued pseudo-functions.
    ///
    /// A run made only of literals folds into one literal; anything else
    /// becomes a [`Expr::Concat`].
    fn parse_string_run(&mut self) -> Result<Expr, RezError> {
        let location = self.current_location();
        let mut parts = Vec::new();

        loop {
            let token = self.peek().clone();
            match token.kind {
                TokenKind::Str(bytes) => {
                    self.advance();
                    parts.push(Expr::Str(bytes, token.location));
                }
                TokenKind::HexStr(bytes) => {
                    self.advance();
                    parts.push(Expr::Bytes(bytes, token.location));
                }
                TokenKind::Function
                    if Builtin::from_name(&token.text).is_some_and(is_string_function) =>
                {
                    self.advance();
                    parts.push(self.parse_call(&token)?);
                }
                _ => break,
            }
        }

        if parts.len() == 1 {
            return Ok(parts.remove(0));
        }

        let all_literal = parts
            .iter()
            .all(|part| matches!(part, Expr::Str(..) | Expr::Bytes(..)));
        if !all_literal {
            return Ok(Expr::Concat(parts, location));
        }

        let all_hex = parts.iter().all(|part| matches!(part, Expr::Bytes(..)));
        let mut bytes = Vec::new();
        for part in parts {
            if let Expr::Str(b, _) | Expr::Bytes(b, _) = part {
                bytes.extend(b);
            }
        }
        Ok(if all_hex {
            Expr::Bytes(bytes, location)
        } else {
            Expr::Str(bytes, location)
        })
    }

    /// Arguments of a pseudo-function whose name token was just consumed.
    fn parse_call(&mut self, name: &Token) -> Result<Expr, RezError> {
        let location = name.location;
        let function = Builtin::from_name(&name.text).ok_or_else(|| EvalError::UnknownFunction {
            name: name.text.clone(),
            location,
        })?;

        let parenthesized = self.match_punct(Punct::LParen);
        let mut args = Vec::new();
        if parenthesized {
            while !self.check_punct(Punct::RParen) {
                args.push(self.parse_expression()?);
                if !self.match_punct(Punct::Comma) {
                    break;
                }
            }
            self.expect_punct(Punct::RParen, "function call")?;
        }

        // Zero-argument functions may be written with or without `()`
        let expected = function.arity().unwrap_or(1);
        let arity_ok = match function.arity() {
            Some(0) => args.is_empty(),
            Some(n) => parenthesized && args.len() == n,
            None => !args.is_empty(),
        };
        if !arity_ok {
            return Err(EvalError::Arity {
                function: function.name().to_string(),
                expected,
                found: args.len(),
                location,
            }
            .into());
        }

        Ok(Expr::Call {
            function,
            args,
            location,
        })
    }
}
