//! Object-like macro definitions and their expansion
//!
//! Expansion substitutes every free macro name until none is left. A name is
//! never expanded inside its own replacement, directly or through other macros,
//! so every chain terminates. Tokens coming out of an expansion carry the
//! location of the name they replaced.

use crate::constants::{DEREZ_MACRO, PREDEFINED_FALSE, PREDEFINED_TRUE, REZ_MACRO};
use crate::errors::LexError;
use crate::eval::Scope;
use crate::parser::ast::SourceLocation;
use crate::parser::lexer::{Lexer, Punct, Token, TokenKind};
use num_bigint::BigInt;
use rustc_hash::FxHashMap;
use tracing::trace;

/// A `#define NAME body` entry
#[derive(Debug, Clone, PartialEq)]
pub struct MacroDefinition {
    pub name: String,
    pub body: Vec<Token>,
    pub location: SourceLocation,
}

impl MacroDefinition {
    /// Same replacement tokens, wherever they were written
    fn same_body(&self, body: &[Token]) -> bool {
        self.body.len() == body.len()
            && self
                .body
                .iter()
                .zip(body)
                .all(|(a, b)| a.kind == b.kind && a.text == b.text)
    }
}

/// What `define` did to an existing entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefineOutcome {
    New,
    /// Redefined with an identical body
    Unchanged,
    /// Redefined with a different body
    Changed,
}

#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    macros: FxHashMap<String, MacroDefinition>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table holding `true`, `false`, `rez` and `derez`.
    pub fn with_predefined(derez: bool) -> Self {
        let mut table = Self::new();
        table.define_int(PREDEFINED_TRUE.0, PREDEFINED_TRUE.1, SourceLocation::default());
        table.define_int(PREDEFINED_FALSE.0, PREDEFINED_FALSE.1, SourceLocation::default());
        table.define_int(REZ_MACRO, (!derez) as i64, SourceLocation::default());
        table.define_int(DEREZ_MACRO, derez as i64, SourceLocation::default());
        table
    }

    pub fn define(&mut self, name: &str, body: Vec<Token>, location: SourceLocation) -> DefineOutcome {
        let outcome = match self.macros.get(name) {
            None => DefineOutcome::New,
            Some(existing) if existing.same_body(&body) => DefineOutcome::Unchanged,
            Some(_) => DefineOutcome::Changed,
        };
        self.macros.insert(
            name.to_string(),
            MacroDefinition {
                name: name.to_string(),
                body,
                location,
            },
        );
        outcome
    }

    /// Define `name` as a single integer token.
    pub fn define_int(&mut self, name: &str, value: i64, location: SourceLocation) -> DefineOutcome {
        let token = Token::new(TokenKind::Int(BigInt::from(value)), value.to_string(), location);
        self.define(name, vec![token], location)
    }

    /// Define `name` from replacement text, as given on a command line.
    pub fn define_value(&mut self, name: &str, text: &str) -> Result<DefineOutcome, LexError> {
        let mut body = Lexer::new(text).tokenize()?;
        body.retain(|token| !token.is_eof());
        Ok(self.define(name, body, SourceLocation::default()))
    }

    /// Remove a definition; unknown names are ignored. Returns whether one existed.
    pub fn undef(&mut self, name: &str) -> bool {
        self.macros.remove(name).is_some()
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&MacroDefinition> {
        self.macros.get(name)
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// One substitution step: the replacement of `token`, if it names a macro.
    /// Keywords are never macro names.
    pub fn expand_once(&self, token: &Token) -> Option<&[Token]> {
        if !token.is_plain_ident() {
            return None;
        }
        self.macros.get(&token.text).map(|def| def.body.as_slice())
    }

    /// Fully expand one token into `out`. Names in `active` are being expanded
    /// further up and stay as they are.
    pub fn expand_token(&self, token: &Token, active: &mut Vec<String>, out: &mut Vec<Token>) {
        self.expand_at(token, token.location, active, out);
    }

    fn expand_at(
        &self,
        token: &Token,
        site: SourceLocation,
        active: &mut Vec<String>,
        out: &mut Vec<Token>,
    ) {
        let body = match self.expand_once(token) {
            Some(body) if !active.iter().any(|name| *name == token.text) => body,
            _ => {
                out.push(token.relocated(site));
                return;
            }
        };

        trace!(name = %token.text, depth = active.len(), "expanding macro");
        active.push(token.text.clone());
        for inner in body {
            self.expand_at(inner, site, active, out);
        }
        active.pop();
    }

    /// Expand every macro name in `tokens` and join adjacent string literals.
    pub fn expand(&self, tokens: &[Token]) -> Vec<Token> {
        let mut out = Vec::with_capacity(tokens.len());
        let mut active = Vec::new();
        for token in tokens {
            self.expand_token(token, &mut active, &mut out);
        }
        merge_strings(out)
    }

    /// Like [`expand`](Self::expand), but the operand of `defined` stays unexpanded.
    pub fn expand_directive(&self, tokens: &[Token]) -> Vec<Token> {
        let mut out = Vec::with_capacity(tokens.len());
        let mut active = Vec::new();
        let mut iter = tokens.iter().peekable();

        while let Some(token) = iter.next() {
            if !token.is_keyword("defined") {
                self.expand_token(token, &mut active, &mut out);
                continue;
            }
            out.push(token.clone());
            if let Some(next) = iter.next_if(|t| t.is_punct(Punct::LParen)) {
                out.push(next.clone());
            }
            if let Some(name) = iter.next_if(|t| t.is_ident()) {
                out.push(name.clone());
            }
        }
        merge_strings(out)
    }
}

impl Scope for MacroTable {
    fn is_macro_defined(&self, name: &str) -> bool {
        self.is_defined(name)
    }
}

/// Join two adjacent string tokens. Two hex strings stay a hex string.
pub fn merge_pair(first: Token, second: Token) -> Token {
    let kind = match (first.kind, second.kind) {
        (TokenKind::HexStr(mut a), TokenKind::HexStr(b)) => {
            a.extend(b);
            TokenKind::HexStr(a)
        }
        (TokenKind::Str(mut a) | TokenKind::HexStr(mut a), TokenKind::Str(b) | TokenKind::HexStr(b)) => {
            a.extend(b);
            TokenKind::Str(a)
        }
        (kind, _) => kind,
    };
    Token::new(kind, format!("{} {}", first.text, second.text), first.location)
}

/// Collapse each run of adjacent string literals into one token.
pub fn merge_strings(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    for token in tokens {
        match out.last() {
            Some(prev) if prev.is_string() && token.is_string() => {
                if let Some(prev) = out.pop() {
                    out.push(merge_pair(prev, token));
                }
            }
            _ => out.push(token),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lex(source: &str) -> Vec<Token> {
        let mut tokens = Lexer::new(source).tokenize().unwrap();
        tokens.retain(|t| !t.is_eof());
        tokens
    }

    fn texts(tokens: &[Token]) -> Vec<String> {
        tokens.iter().map(|t| t.text.clone()).collect()
    }

    fn table(defs: &[(&str, &str)]) -> MacroTable {
        let mut table = MacroTable::new();
        for (name, body) in defs {
            table.define_value(name, body).unwrap();
        }
        table
    }

    #[test]
    fn test_predefined() {
        let rez = MacroTable::with_predefined(false);
        assert_eq!(rez.get("rez").unwrap().body[0].kind, TokenKind::Int(BigInt::from(1)));
        assert_eq!(rez.get("derez").unwrap().body[0].kind, TokenKind::Int(BigInt::from(0)));
        assert_eq!(rez.get("true").unwrap().body[0].kind, TokenKind::Int(BigInt::from(1)));

        let derez = MacroTable::with_predefined(true);
        assert_eq!(derez.get("rez").unwrap().body[0].kind, TokenKind::Int(BigInt::from(0)));
        assert_eq!(derez.len(), 4);
    }

    #[test]
    fn test_adjacent_strings_are_joined() {
        let table = table(&[("abc", "\"abc\""), ("def", "\"def\""), ("abcdef", "abc def")]);
        let out = table.expand(&lex("abcdef"));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, TokenKind::Str(b"abcdef".to_vec()));
    }

    #[test]
    fn test_self_reference_terminates() {
        let table = table(&[("A", "A + 1")]);
        assert_eq!(texts(&table.expand(&lex("A"))), vec!["A", "+", "1"]);
    }

    #[test]
    fn test_mutual_recursion_terminates() {
        let table = table(&[("A", "B"), ("B", "A x")]);
        assert_eq!(texts(&table.expand(&lex("A"))), vec!["A", "x"]);
        assert_eq!(texts(&table.expand(&lex("B"))), vec!["B", "x"]);
    }

    #[test]
    fn test_names_are_case_sensitive_keywords_never_expand() {
        let table = table(&[("Foo", "1"), ("integer", "2")]);
        assert_eq!(texts(&table.expand(&lex("Foo foo integer"))), vec!["1", "foo", "integer"]);
    }

    #[test]
    fn test_expanded_tokens_take_invocation_location() {
        let table = table(&[("X", "1 + 2")]);
        let out = table.expand(&lex("\n  X"));
        assert!(out.iter().all(|t| t.location.line == 2 && t.location.column == 3));
    }

    #[test]
    fn test_expansion_is_idempotent() {
        let table = table(&[("A", "B 1"), ("B", "2")]);
        let once = table.expand(&lex("A + B"));
        let twice = table.expand(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_directive_expansion_keeps_defined_operand() {
        let table = table(&[("FOO", "BAR"), ("N", "3")]);
        let out = table.expand_directive(&lex("defined FOO && defined(FOO) && N"));
        assert_eq!(
            texts(&out),
            vec!["defined", "FOO", "&&", "defined", "(", "FOO", ")", "&&", "3"]
        );
    }

    #[test]
    fn test_define_outcomes_and_undef() {
        let mut table = MacroTable::new();
        assert_eq!(table.define_value("X", "1").unwrap(), DefineOutcome::New);
        assert_eq!(table.define_value("X", "1").unwrap(), DefineOutcome::Unchanged);
        assert_eq!(table.define_value("X", "2").unwrap(), DefineOutcome::Changed);
        assert!(table.undef("X"));
        assert!(!table.undef("X"));
        assert!(!table.is_defined("X"));
    }

    #[test]
    fn test_merge_kinds() {
        let merged = merge_strings(lex("$\"01\" $\"02\" 5 \"a\" $\"41\""));
        assert_eq!(merged[0].kind, TokenKind::HexStr(vec![1, 2]));
        assert_eq!(merged[1].kind, TokenKind::Int(BigInt::from(5)));
        assert_eq!(merged[2].kind, TokenKind::Str(b"aA".to_vec()));
    }
}
