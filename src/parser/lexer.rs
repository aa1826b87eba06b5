//! Lexer (tokenizer) for Rez source code
//!
//! Converts raw source text into a lazy [`Token`] stream consumed by the
//! preprocessor. Directive lines produce a [`TokenKind::Directive`] marker, the
//! ordinary tokens of the line, and a closing [`TokenKind::DirectiveEnd`]; outside
//! directives newlines are plain whitespace.
//!
//! The lexer never gets stuck after an error: every failing scan consumes the
//! offending text, so the caller can keep pulling tokens (the preprocessor does
//! this inside inactive conditional branches).

use super::ast::SourceLocation;
use super::escapes;
use crate::errors::LexError;
use num_bigint::{BigInt, Sign};
use num_traits::Num;
use std::fmt;

/// Keywords of the Rez language, all matched case-insensitively.
///
/// These are lexed as identifiers but are never macro-expanded.
pub const KEYWORDS: &[&str] = &[
    // Top-level structures
    "as", "change", "data", "delete", "enum", "include", "not", "type", "read", "resource", "to",
    // Primitive types
    "bit", "bitstring", "boolean", "byte", "char", "cstring", "nibble", "int", "integer", "long",
    "longint", "point", "pstring", "rect", "string", "word", "wstring",
    // Type modifiers
    "binary", "decimal", "hex", "key", "literal", "octal", "signed", "unsigned",
    // Type-ish things
    "align", "array", "case", "fill", "switch", "wide",
    // Named resource attributes
    "appheap", "changed", "compressed", "locked", "nonpreload", "nonpurgeable", "preload",
    "protected", "purgeable", "sysheap", "unchanged", "uncompressed", "unlocked", "unprotected",
    // Only meaningful in preprocessor conditions
    "defined",
];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(word))
}

/// Punctuation and operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punct {
    LBrace,    // {
    RBrace,    // }
    LBracket,  // [
    RBracket,  // ]
    LParen,    // (
    RParen,    // )
    Semicolon, // ;
    Colon,     // :
    Comma,     // ,
    Question,  // ?
    Assign,    // =

    // Arithmetic
    Plus,    // +
    Minus,   // -
    Star,    // *
    Slash,   // /
    Percent, // %

    // Comparison
    EqEq,  // ==
    NotEq, // !=
    Lt,    // <
    Le,    // <=
    Gt,    // >
    Ge,    // >=

    // Logical
    AndAnd, // &&
    OrOr,   // ||
    Bang,   // !

    // Bitwise
    Amp,   // &
    Pipe,  // |
    Caret, // ^
    Tilde, // ~
    LtLt,  // <<
    GtGt,  // >>
}

impl Punct {
    pub fn as_str(&self) -> &'static str {
        match self {
            Punct::LBrace => "{",
            Punct::RBrace => "}",
            Punct::LBracket => "[",
            Punct::RBracket => "]",
            Punct::LParen => "(",
            Punct::RParen => ")",
            Punct::Semicolon => ";",
            Punct::Colon => ":",
            Punct::Comma => ",",
            Punct::Question => "?",
            Punct::Assign => "=",
            Punct::Plus => "+",
            Punct::Minus => "-",
            Punct::Star => "*",
            Punct::Slash => "/",
            Punct::Percent => "%",
            Punct::EqEq => "==",
            Punct::NotEq => "!=",
            Punct::Lt => "<",
            Punct::Le => "<=",
            Punct::Gt => ">",
            Punct::Ge => ">=",
            Punct::AndAnd => "&&",
            Punct::OrOr => "||",
            Punct::Bang => "!",
            Punct::Amp => "&",
            Punct::Pipe => "|",
            Punct::Caret => "^",
            Punct::Tilde => "~",
            Punct::LtLt => "<<",
            Punct::GtGt => ">>",
        }
    }
}

/// Preprocessor directive keywords
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Define,
    Undef,
    Include,
    Import,
    If,
    Ifdef,
    Ifndef,
    Elif,
    Else,
    Endif,
    Printf,
    /// A `#` with nothing after it
    Empty,
    Unknown(String),
}

impl Directive {
    fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "define" => Directive::Define,
            "undef" => Directive::Undef,
            "include" => Directive::Include,
            "import" => Directive::Import,
            "if" => Directive::If,
            "ifdef" => Directive::Ifdef,
            "ifndef" => Directive::Ifndef,
            "elif" => Directive::Elif,
            "else" => Directive::Else,
            "endif" => Directive::Endif,
            "printf" => Directive::Printf,
            _ => Directive::Unknown(name.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Directive::Define => "define",
            Directive::Undef => "undef",
            Directive::Include => "include",
            Directive::Import => "import",
            Directive::If => "if",
            Directive::Ifdef => "ifdef",
            Directive::Ifndef => "ifndef",
            Directive::Elif => "elif",
            Directive::Else => "else",
            Directive::Endif => "endif",
            Directive::Printf => "printf",
            Directive::Empty => "",
            Directive::Unknown(name) => name,
        }
    }

    /// Directives whose arguments are ignored entirely
    fn ignores_arguments(&self) -> bool {
        matches!(self, Directive::Else | Directive::Endif | Directive::Empty)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Identifier or keyword
    Ident,
    /// `$$Name` pseudo-function
    Function,
    /// Integer literal, including `'TEXT'` character constants
    Int(BigInt),
    /// Decoded string literal
    Str(Vec<u8>),
    /// Decoded `$"..."` literal
    HexStr(Vec<u8>),
    Punct(Punct),
    Directive(Directive),
    /// End of a directive line
    DirectiveEnd,
    Eof,
}

/// A token with its original spelling and location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub location: SourceLocation,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, location: SourceLocation) -> Self {
        Token {
            kind,
            text: text.into(),
            location,
        }
    }

    pub fn is_punct(&self, punct: Punct) -> bool {
        self.kind == TokenKind::Punct(punct)
    }

    pub fn is_ident(&self) -> bool {
        self.kind == TokenKind::Ident
    }

    /// Case-insensitive keyword test
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Ident && self.text.eq_ignore_ascii_case(keyword)
    }

    /// An identifier that is not a reserved word
    pub fn is_plain_ident(&self) -> bool {
        self.kind == TokenKind::Ident && !is_keyword(&self.text)
    }

    pub fn is_string(&self) -> bool {
        matches!(self.kind, TokenKind::Str(_) | TokenKind::HexStr(_))
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }

    /// Same token at a different location (used when splicing macro bodies).
    pub fn relocated(&self, location: SourceLocation) -> Token {
        Token {
            kind: self.kind.clone(),
            text: self.text.clone(),
            location,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TokenKind::Ident if is_keyword(&self.text) => write!(f, "'{}'", self.text),
            TokenKind::Ident => write!(f, "identifier '{}'", self.text),
            TokenKind::Function => write!(f, "function '{}'", self.text),
            TokenKind::Int(n) => write!(f, "integer {}", n),
            TokenKind::Str(_) => write!(f, "string literal {}", self.text),
            TokenKind::HexStr(_) => write!(f, "hex string {}", self.text),
            TokenKind::Punct(p) => write!(f, "'{}'", p.as_str()),
            TokenKind::Directive(d) => write!(f, "'#{}'", d.name()),
            TokenKind::DirectiveEnd => write!(f, "end of line"),
            TokenKind::Eof => write!(f, "end of file"),
        }
    }
}

/// Lexer for Rez source code
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    file: usize,
    /// Only whitespace seen since the last newline
    at_line_start: bool,
    in_directive: bool,
    /// Next token may be a `<path>` include argument
    expect_angle_path: bool,
    finished: bool,
}

impl Lexer {
    /// Create a new lexer for the given source string.
    pub fn new(input: &str) -> Self {
        Self::with_file(input, 0)
    }

    /// Create a lexer whose locations refer to file table entry `file`.
    pub fn with_file(input: &str, file: usize) -> Self {
        // Classic Mac sources use bare CR line endings
        let normalized = input.replace("\r\n", "\n").replace('\r', "\n");
        Self {
            input: normalized.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            file,
            at_line_start: true,
            in_directive: false,
            expect_angle_path: false,
            finished: false,
        }
    }

    /// Rewind to the start of the input.
    pub fn reset(&mut self) {
        self.position = 0;
        self.line = 1;
        self.column = 1;
        self.at_line_start = true;
        self.in_directive = false;
        self.expect_angle_path = false;
        self.finished = false;
    }

    pub fn file(&self) -> usize {
        self.file
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.is_eof();
            tokens.push(token);
            if done {
                break;
            }
        }
        Ok(tokens)
    }

    /// Produce the next token. Once the input is exhausted this keeps returning `Eof`.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace_and_comments()?;

        if self.in_directive && matches!(self.peek(), Some('\n') | None) {
            let loc = self.current_location();
            self.in_directive = false;
            self.expect_angle_path = false;
            return Ok(Token::new(TokenKind::DirectiveEnd, "", loc));
        }

        if self.is_at_end() {
            return Ok(Token::new(TokenKind::Eof, "", self.current_location()));
        }

        let starts_line = self.at_line_start;
        self.at_line_start = false;

        if self.peek() == Some('#') && starts_line {
            return Ok(self.directive());
        }

        if self.expect_angle_path {
            self.expect_angle_path = false;
            if self.peek() == Some('<') {
                return self.angle_path();
            }
        }

        let loc = self.current_location();
        let start = self.position;
        let kind = self.scan(loc)?;
        Ok(Token::new(kind, self.text_from(start), loc))
    }

    /// Skip the remainder of the current directive line; the next token is `DirectiveEnd`.
    pub fn skip_rest_of_line(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            if ch == '/' && self.peek_ahead(1) == Some('*') {
                // A block comment may carry the directive onto later lines
                if self.skip_block_comment().is_err() {
                    break;
                }
                continue;
            }
            if ch == '\\' && self.peek_ahead(1) == Some('\n') {
                self.advance();
            }
            self.advance();
        }
    }

    fn directive(&mut self) -> Token {
        let loc = self.current_location();
        let start = self.position;
        self.advance(); // skip '#'
        while matches!(self.peek(), Some(' ') | Some('\t')) {
            self.advance();
        }

        let mut name = String::new();
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                name.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let directive = if name.is_empty() {
            Directive::Empty
        } else {
            Directive::from_name(&name)
        };

        self.in_directive = true;
        if directive.ignores_arguments() {
            self.skip_rest_of_line();
        }
        self.expect_angle_path = matches!(directive, Directive::Include | Directive::Import);

        let text = self.text_from(start);
        Token::new(TokenKind::Directive(directive), text, loc)
    }

    /// `<path>` argument of `#include`/`#import`, kept verbatim including the brackets.
    fn angle_path(&mut self) -> Result<Token, LexError> {
        let loc = self.current_location();
        let start = self.position;
        self.advance(); // skip '<'
        let mut path = Vec::new();
        loop {
            match self.peek() {
                Some('>') => {
                    self.advance();
                    break;
                }
                Some('\n') | None => return Err(LexError::UnterminatedString { location: loc }),
                Some(ch) => {
                    let mut buf = [0u8; 4];
                    path.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                    self.advance();
                }
            }
        }
        Ok(Token::new(TokenKind::Str(path), self.text_from(start), loc))
    }

    fn scan(&mut self, loc: SourceLocation) -> Result<TokenKind, LexError> {
        let ch = self
            .advance()
            .ok_or(LexError::UnexpectedChar { ch: '\0', location: loc })?;

        let kind = match ch {
            '"' => TokenKind::Str(self.string_body('"', loc)?),
            '\'' => self.char_literal(loc)?,
            '0'..='9' => self.number_literal(ch, loc)?,
            'a'..='z' | 'A'..='Z' | '_' => {
                self.identifier_tail();
                TokenKind::Ident
            }
            '$' => match self.peek() {
                Some('$') => {
                    self.advance();
                    self.identifier_tail();
                    TokenKind::Function
                }
                Some('"') => {
                    self.advance();
                    TokenKind::HexStr(self.hex_string(loc)?)
                }
                Some(c) if c.is_ascii_hexdigit() => self.radix_literal(16, 1, loc)?,
                _ => return Err(LexError::UnexpectedChar { ch, location: loc }),
            },

            // Operators and punctuation
            '=' => self.either('=', Punct::EqEq, Punct::Assign),
            '!' => self.either('=', Punct::NotEq, Punct::Bang),
            '&' => self.either('&', Punct::AndAnd, Punct::Amp),
            '|' => self.either('|', Punct::OrOr, Punct::Pipe),
            '<' => {
                if self.peek() == Some('<') {
                    self.advance();
                    TokenKind::Punct(Punct::LtLt)
                } else {
                    self.either('=', Punct::Le, Punct::Lt)
                }
            }
            '>' => {
                if self.peek() == Some('>') {
                    self.advance();
                    TokenKind::Punct(Punct::GtGt)
                } else {
                    self.either('=', Punct::Ge, Punct::Gt)
                }
            }
            '+' => TokenKind::Punct(Punct::Plus),
            '-' => TokenKind::Punct(Punct::Minus),
            '*' => TokenKind::Punct(Punct::Star),
            '/' => TokenKind::Punct(Punct::Slash),
            '%' => TokenKind::Punct(Punct::Percent),
            '^' => TokenKind::Punct(Punct::Caret),
            '~' => TokenKind::Punct(Punct::Tilde),
            '?' => TokenKind::Punct(Punct::Question),
            ':' => TokenKind::Punct(Punct::Colon),
            '(' => TokenKind::Punct(Punct::LParen),
            ')' => TokenKind::Punct(Punct::RParen),
            '{' => TokenKind::Punct(Punct::LBrace),
            '}' => TokenKind::Punct(Punct::RBrace),
            '[' => TokenKind::Punct(Punct::LBracket),
            ']' => TokenKind::Punct(Punct::RBracket),
            ';' => TokenKind::Punct(Punct::Semicolon),
            ',' => TokenKind::Punct(Punct::Comma),

            _ => return Err(LexError::UnexpectedChar { ch, location: loc }),
        };

        Ok(kind)
    }

    fn either(&mut self, next: char, double: Punct, single: Punct) -> TokenKind {
        if self.peek() == Some(next) {
            self.advance();
            TokenKind::Punct(double)
        } else {
            TokenKind::Punct(single)
        }
    }

    /// Scan a quoted literal up to `quote` and decode its escapes.
    ///
    /// The whole literal is consumed before decoding so that a bad escape
    /// leaves the lexer positioned after the closing quote.
    fn string_body(&mut self, quote: char, loc: SourceLocation) -> Result<Vec<u8>, LexError> {
        let mut raw = String::new();
        loop {
            match self.peek() {
                Some(ch) if ch == quote => {
                    self.advance();
                    break;
                }
                Some('\\') if !matches!(self.peek_ahead(1), Some('\n') | None) => {
                    raw.push('\\');
                    self.advance();
                    if let Some(escaped) = self.advance() {
                        raw.push(escaped);
                    }
                }
                Some('\n') | Some('\\') | None => {
                    return Err(if quote == '"' {
                        LexError::UnterminatedString { location: loc }
                    } else {
                        LexError::UnterminatedChar { location: loc }
                    });
                }
                Some(ch) => {
                    raw.push(ch);
                    self.advance();
                }
            }
        }

        escapes::unescape(&raw).map_err(|e| LexError::InvalidEscape {
            sequence: e.sequence,
            reason: e.reason,
            location: loc,
        })
    }

    /// `'TEXT'` packs its bytes big-endian into an integer (how type codes are written).
    fn char_literal(&mut self, loc: SourceLocation) -> Result<TokenKind, LexError> {
        let bytes = self.string_body('\'', loc)?;
        Ok(TokenKind::Int(BigInt::from_bytes_be(Sign::Plus, &bytes)))
    }

    fn hex_string(&mut self, loc: SourceLocation) -> Result<Vec<u8>, LexError> {
        let mut digits = Vec::new();
        let mut bad_char = None;
        loop {
            match self.peek() {
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\n') | None => return Err(LexError::UnterminatedHexString { location: loc }),
                Some(ch) => {
                    self.advance();
                    if let Some(d) = ch.to_digit(16) {
                        digits.push(d as u8);
                    } else if ch != ' ' && ch != '\t' && bad_char.is_none() {
                        bad_char = Some(ch);
                    }
                }
            }
        }

        if let Some(ch) = bad_char {
            return Err(LexError::InvalidHexString {
                reason: format!("'{}' is not a hex digit", ch),
                location: loc,
            });
        }
        if digits.len() % 2 != 0 {
            return Err(LexError::InvalidHexString {
                reason: "odd number of hex digits".to_string(),
                location: loc,
            });
        }
        Ok(digits.chunks(2).map(|pair| (pair[0] << 4) | pair[1]).collect())
    }

    /// Parse a decimal, octal (`0` prefix), hex (`0x`) or binary (`0b`) literal
    fn number_literal(&mut self, first_digit: char, loc: SourceLocation) -> Result<TokenKind, LexError> {
        if first_digit == '0' {
            match self.peek() {
                Some('x') | Some('X') => {
                    self.advance();
                    return self.radix_literal(16, 2, loc);
                }
                Some('b') | Some('B') => {
                    self.advance();
                    return self.radix_literal(2, 2, loc);
                }
                Some(c) if c.is_ascii_digit() => return self.radix_literal(8, 1, loc),
                _ => {}
            }
        }
        self.radix_literal(10, 1, loc)
    }

    /// Consume the digits of a literal; `prefix_len` characters have already been read.
    fn radix_literal(&mut self, radix: u32, prefix_len: usize, loc: SourceLocation) -> Result<TokenKind, LexError> {
        let start = self.position - prefix_len;
        // Back up over a decimal/octal leading digit so it is part of the run
        let digits_start = if radix == 10 || (radix == 8 && prefix_len == 1) {
            self.position - 1
        } else {
            self.position
        };
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let digits: String = self.input[digits_start..self.position].iter().collect();
        let invalid = || LexError::InvalidNumber {
            text: self.text_from(start),
            location: loc,
        };
        // BigInt would accept `_` separators; Rez does not
        if digits.is_empty() || digits.contains('_') {
            return Err(invalid());
        }
        BigInt::from_str_radix(&digits, radix)
            .map(TokenKind::Int)
            .map_err(|_| invalid())
    }

    fn identifier_tail(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Skip whitespace, comments and line continuations.
    /// Newlines end a directive, so they are left in place while inside one.
    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\x0c') | Some('\x0b') => {
                    self.advance();
                }
                Some('\n') if !self.in_directive => {
                    self.advance();
                }
                Some('\\') if self.peek_ahead(1) == Some('\n') => {
                    self.advance();
                    self.advance();
                }
                Some('/') => {
                    if self.peek_ahead(1) == Some('/') {
                        self.skip_line_comment();
                    } else if self.peek_ahead(1) == Some('*') {
                        self.skip_block_comment()?;
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Skip single-line comment (// ...), leaving the newline
    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    /// Skip multi-line comment (/* ... */); escapes mean nothing inside comments
    fn skip_block_comment(&mut self) -> Result<(), LexError> {
        let start_loc = self.current_location();
        self.advance(); // skip '/'
        self.advance(); // skip '*'

        while !self.is_at_end() {
            if self.peek() == Some('*') && self.peek_ahead(1) == Some('/') {
                self.advance(); // skip '*'
                self.advance(); // skip '/'
                return Ok(());
            }
            self.advance();
        }

        Err(LexError::UnterminatedComment {
            location: start_loc,
        })
    }

    fn text_from(&self, start: usize) -> String {
        self.input[start..self.position].iter().collect()
    }

    /// Peek at current character without consuming
    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    /// Peek ahead n characters
    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    /// Advance to next character
    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += 1;

        if ch == '\n' {
            self.line += 1;
            self.column = 1;
            self.at_line_start = true;
        } else {
            self.column += 1;
        }

        Some(ch)
    }

    /// Check if at end of input
    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Get current source location
    pub fn current_location(&self) -> SourceLocation {
        SourceLocation::in_file(self.file, self.line, self.column, self.position)
    }
}

impl Iterator for Lexer {
    type Item = Result<Token, LexError>;

    /// Yields every token up to and including `Eof`, then stops.
    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let result = self.next_token();
        if matches!(&result, Ok(token) if token.is_eof()) {
            self.finished = true;
        }
        Some(result)
    }
}
