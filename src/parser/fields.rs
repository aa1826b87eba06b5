//! Field parsing for `type` templates
//!
//! ```text
//! field      ::= ";" | label ":" | modifier* simple ";" | fill | align | array | switch
//! modifier   ::= "key" | "unsigned" | "signed" | "binary" | "octal" | "decimal" | "hex" | "literal"
//! simple     ::= type ( "=" expr | constant ("," constant)* ","? )?
//! constant   ::= ident ("=" expr)?
//! fill       ::= "fill" ("bit" | "nibble" | "byte" | "word" | "long") ("[" expr "]")? ";"
//! align      ::= "align" ("nibble" | "byte" | "word" | "long") ";"
//! array      ::= "wide"? "array" (ident | "[" expr "]")? "{" fields "}" ";"
//! switch     ::= "switch" "{" ("case" ident ":" fields)+ "}" ";"
//! ```
//!
//! Labels must be unique within one field list; nested arrays and switch
//! cases start a new scope.

use crate::errors::RezError;
use crate::parser::ast::*;
use crate::parser::lexer::Punct;
use crate::parser::parse::Parser;
use rustc_hash::FxHashSet;

/// Modifiers seen in front of a field type, before validation
#[derive(Debug, Default)]
struct ModifierWords {
    is_key: bool,
    unsigned: bool,
    signed: bool,
    base: Option<(NumberBase, String)>,
}

impl ModifierWords {
    fn numeric_only(&self) -> Option<&str> {
        if self.unsigned {
            Some("unsigned")
        } else if self.signed {
            Some("signed")
        } else {
            None
        }
    }

    fn into_modifiers(self) -> Modifiers {
        Modifiers {
            signed: !self.unsigned,
            base: self.base.map_or(NumberBase::Decimal, |(base, _)| base),
            is_key: self.is_key,
        }
    }
}

impl Parser {
    /// Fields up to `}` (or up to the next `case` inside a switch). The
    /// closing token is left for the caller.
    pub(crate) fn parse_field_list(
        &mut self,
        production: &str,
        stop_at_case: bool,
    ) -> Result<Vec<Field>, RezError> {
        let mut fields = Vec::new();
        let mut labels = FxHashSet::default();
        let mut pending: Option<(String, SourceLocation)> = None;

        loop {
            let token = self.peek().clone();
            let at_end = token.is_punct(Punct::RBrace)
                || token.is_eof()
                || (stop_at_case && token.is_keyword("case"));

            if at_end || token.is_punct(Punct::Semicolon) {
                if let Some((label, location)) = pending.take() {
                    fields.push(marker(label, location));
                }
                if at_end {
                    break;
                }
                self.advance();
                continue;
            }

            if token.is_plain_ident() && self.peek_ahead(1).is_punct(Punct::Colon) {
                self.advance();
                self.advance();
                if let Some((label, location)) = pending.take() {
                    fields.push(marker(label, location));
                }
                if !labels.insert(token.text.clone()) {
                    return Err(self.syntax_error(
                        format!("duplicate label '{}'", token.text),
                        production,
                        token.location,
                    ));
                }
                pending = Some((token.text, token.location));
                continue;
            }

            let mut field = self.parse_field()?;
            if let Some((label, location)) = pending.take() {
                field.label = Some(label);
                field.location = location;
            }
            fields.push(field);
        }

        Ok(fields)
    }

    fn parse_field(&mut self) -> Result<Field, RezError> {
        let location = self.current_location();

        let kind = if self.match_keyword("fill") {
            self.parse_fill()?
        } else if self.match_keyword("align") {
            self.parse_align()?
        } else if self.check_keyword("wide") || self.check_keyword("array") {
            self.parse_array()?
        } else if self.match_keyword("switch") {
            self.parse_switch()?
        } else {
            self.parse_simple_field()?
        };

        Ok(Field {
            label: None,
            kind,
            location,
        })
    }

    fn parse_modifiers(&mut self) -> Result<ModifierWords, RezError> {
        let mut words = ModifierWords::default();

        loop {
            let token = self.peek().clone();
            if !token.is_ident() {
                break;
            }
            let word = token.text.to_ascii_lowercase();
            let base = match word.as_str() {
                "binary" => Some(NumberBase::Binary),
                "octal" => Some(NumberBase::Octal),
                "decimal" => Some(NumberBase::Decimal),
                "hex" => Some(NumberBase::Hex),
                "literal" => Some(NumberBase::Literal),
                _ => None,
            };

            let duplicate = match word.as_str() {
                "key" => std::mem::replace(&mut words.is_key, true),
                "unsigned" => std::mem::replace(&mut words.unsigned, true),
                "signed" => std::mem::replace(&mut words.signed, true),
                _ => match base {
                    Some(base) => match words.base.replace((base, word.clone())) {
                        Some((_, previous)) if previous == word => true,
                        Some((_, previous)) => {
                            return Err(self.syntax_error(
                                format!("conflicting modifiers '{}' and '{}'", previous, word),
                                "field",
                                token.location,
                            ))
                        }
                        None => false,
                    },
                    None => break,
                },
            };
            if duplicate {
                return Err(self.syntax_error(
                    format!("duplicate modifier '{}'", word),
                    "field",
                    token.location,
                ));
            }
            if words.signed && words.unsigned {
                return Err(self.syntax_error(
                    "conflicting modifiers 'signed' and 'unsigned'",
                    "field",
                    token.location,
                ));
            }
            self.advance();
        }

        Ok(words)
    }

    /// Modifiers, a scalar type and its value or constants
    fn parse_simple_field(&mut self) -> Result<FieldKind, RezError> {
        let words = self.parse_modifiers()?;
        let type_token = self.peek().clone();
        let type_name = type_token.text.to_ascii_lowercase();
        if !type_token.is_ident() {
            return Err(self.unexpected("field type", "field"));
        }

        let string_kind = match type_name.as_str() {
            "string" => Some(StringKind::Plain),
            "cstring" => Some(StringKind::C),
            "pstring" => Some(StringKind::Pascal),
            "wstring" => Some(StringKind::Wide),
            _ => None,
        };
        let scalar = match type_name.as_str() {
            "boolean" => Some(ScalarType::Boolean),
            "byte" => Some(ScalarType::Byte),
            "char" => Some(ScalarType::Char),
            "int" | "integer" => Some(ScalarType::Integer),
            "long" | "longint" => Some(ScalarType::LongInt),
            "point" => Some(ScalarType::Point),
            "rect" => Some(ScalarType::Rect),
            _ => None,
        };
        let is_bitstring = type_name == "bitstring";

        if scalar.is_none() && string_kind.is_none() && !is_bitstring {
            return Err(self.unexpected("field type", "field"));
        }
        self.advance();

        // Number formatting only applies to integer fields, except `hex string`
        let numeric = is_bitstring || scalar.as_ref().is_some_and(ScalarType::is_numeric);
        let hex_string = string_kind == Some(StringKind::Plain)
            && matches!(words.base, Some((NumberBase::Hex, _)));
        if !numeric {
            let misplaced = words
                .numeric_only()
                .or_else(|| match (&words.base, hex_string) {
                    (Some((_, word)), false) => Some(word.as_str()),
                    _ => None,
                });
            if let Some(word) = misplaced {
                return Err(self.syntax_error(
                    format!("'{}' cannot modify '{}'", word, type_token.text),
                    "field",
                    type_token.location,
                ));
            }
        }

        if is_bitstring {
            self.expect_punct(Punct::LBracket, "bitstring field")?;
            let length = self.parse_expression()?;
            self.expect_punct(Punct::RBracket, "bitstring field")?;
            let value = self.parse_field_value()?;
            return Ok(FieldKind::BitString(BitStringField {
                length,
                modifiers: words.into_modifiers(),
                value,
            }));
        }

        if let Some(kind) = string_kind {
            let length = if self.match_punct(Punct::LBracket) {
                let length = self.parse_expression()?;
                self.expect_punct(Punct::RBracket, "string field")?;
                Some(length)
            } else {
                None
            };
            let value = self.parse_field_value()?;

            if hex_string {
                if let Some(offsets) = literal_offsets(&value) {
                    return Ok(FieldKind::HexLiteral(HexLiteralField {
                        length,
                        is_key: words.is_key,
                        offsets,
                    }));
                }
            }
            return Ok(FieldKind::Scalar(ScalarField {
                ty: ScalarType::String { kind, length },
                modifiers: words.into_modifiers(),
                value,
            }));
        }

        let ty = scalar.unwrap_or(ScalarType::Integer);
        let value = self.parse_field_value()?;
        Ok(FieldKind::Scalar(ScalarField {
            ty,
            modifiers: words.into_modifiers(),
            value,
        }))
    }

    /// `;`, `= expr ;` or `NAME [= expr], ... ;`
    fn parse_field_value(&mut self) -> Result<FieldValue, RezError> {
        let mut value = FieldValue::default();

        if self.match_punct(Punct::Assign) {
            value.init = Some(self.parse_expression()?);
        } else {
            while self.peek().is_plain_ident() {
                let (name, _) = self.expect_ident("symbolic constant")?;
                let constant_value = if self.match_punct(Punct::Assign) {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                value.constants.push(SymbolicConstant {
                    name,
                    value: constant_value,
                });
                if !self.match_punct(Punct::Comma) {
                    break;
                }
            }
        }

        self.expect_punct(Punct::Semicolon, "field")?;
        Ok(value)
    }

    /// `fill unit [count];`, after `fill`
    fn parse_fill(&mut self) -> Result<FieldKind, RezError> {
        let word = self.peek().text.to_ascii_lowercase();
        let unit = match word.as_str() {
            "bit" => FillUnit::Bit,
            "nibble" => FillUnit::Nibble,
            "byte" => FillUnit::Byte,
            "word" => FillUnit::Word,
            "long" => FillUnit::Long,
            _ => return Err(self.unexpected("fill unit", "fill field")),
        };
        if !self.peek().is_ident() {
            return Err(self.unexpected("fill unit", "fill field"));
        }
        self.advance();

        let count = if self.match_punct(Punct::LBracket) {
            let count = self.parse_expression()?;
            self.expect_punct(Punct::RBracket, "fill field")?;
            Some(count)
        } else {
            None
        };
        self.expect_punct(Punct::Semicolon, "fill field")?;
        Ok(FieldKind::Fill(FillField { unit, count }))
    }

    /// `align unit;`, after `align`
    fn parse_align(&mut self) -> Result<FieldKind, RezError> {
        let word = self.peek().text.to_ascii_lowercase();
        let unit = match word.as_str() {
            "nibble" => AlignUnit::Nibble,
            "byte" => AlignUnit::Byte,
            "word" => AlignUnit::Word,
            "long" => AlignUnit::Long,
            _ => return Err(self.unexpected("alignment unit", "align field")),
        };
        if !self.peek().is_ident() {
            return Err(self.unexpected("alignment unit", "align field"));
        }
        self.advance();
        self.expect_punct(Punct::Semicolon, "align field")?;
        Ok(FieldKind::Align(unit))
    }

    fn parse_array(&mut self) -> Result<FieldKind, RezError> {
        let wide = self.match_keyword("wide");
        if wide && self.check_keyword("wide") {
            let location = self.current_location();
            return Err(self.syntax_error("duplicate 'wide'", "array field", location));
        }
        self.expect_keyword("array", "array field")?;

        let mut name = None;
        let mut count = None;
        if self.peek().is_plain_ident() {
            name = Some(self.advance().text);
        } else if self.match_punct(Punct::LBracket) {
            count = Some(self.parse_expression()?);
            self.expect_punct(Punct::RBracket, "array field")?;
        }

        self.expect_punct(Punct::LBrace, "array field")?;
        let fields = self.parse_field_list("array field", false)?;
        self.expect_punct(Punct::RBrace, "array field")?;
        self.expect_punct(Punct::Semicolon, "array field")?;

        Ok(FieldKind::Array(ArrayField {
            wide,
            name,
            count,
            fields,
        }))
    }

    /// `switch { case A: ... case B: ... };`, after `switch`
    fn parse_switch(&mut self) -> Result<FieldKind, RezError> {
        self.expect_punct(Punct::LBrace, "switch field")?;

        let mut cases: Vec<SwitchCase> = Vec::new();
        if !self.check_keyword("case") {
            return Err(self.unexpected("'case'", "switch field"));
        }
        while self.match_keyword("case") {
            let (label, location) = self.expect_ident("switch case")?;
            if cases.iter().any(|c| c.label.eq_ignore_ascii_case(&label)) {
                return Err(self.syntax_error(
                    format!("duplicate case '{}'", label),
                    "switch field",
                    location,
                ));
            }
            self.expect_punct(Punct::Colon, "switch case")?;
            let fields = self.parse_field_list("switch case", true)?;
            cases.push(SwitchCase {
                label,
                key: case_key(&fields),
                fields,
                location,
            });
        }

        self.expect_punct(Punct::RBrace, "switch field")?;
        self.expect_punct(Punct::Semicolon, "switch field")?;
        Ok(FieldKind::Switch(SwitchField { cases }))
    }
}

fn marker(label: String, location: SourceLocation) -> Field {
    Field {
        label: Some(label),
        kind: FieldKind::Marker,
        location,
    }
}

/// Value of the first `key` field of a switch case
fn case_key(fields: &[Field]) -> Option<Expr> {
    fields.iter().find_map(|field| match &field.kind {
        FieldKind::Scalar(f) if f.modifiers.is_key => f.value.init.clone(),
        FieldKind::BitString(f) if f.modifiers.is_key => f.value.init.clone(),
        _ => None,
    })
}

/// Named byte strings of a `hex string` whose constants are all literals
fn literal_offsets(value: &FieldValue) -> Option<Vec<NamedBytes>> {
    if value.init.is_some() || value.constants.is_empty() {
        return None;
    }
    value
        .constants
        .iter()
        .map(|constant| match &constant.value {
            Some(Expr::Bytes(bytes, _)) => Some(NamedBytes {
                name: constant.name.clone(),
                bytes: bytes.clone(),
            }),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;
    use pretty_assertions::assert_eq;

    fn fields(body: &str) -> Vec<Field> {
        let source = format!("type 'TEST' {{ {} }};", body);
        let decls = Parser::new(&source).parse_file().into_result().unwrap();
        match decls.into_iter().next() {
            Some(Declaration::Type(def)) => def.fields,
            other => panic!("expected type, got {other:?}"),
        }
    }

    fn field_err(body: &str) -> String {
        let source = format!("type 'TEST' {{ {} }};", body);
        Parser::new(&source)
            .parse_file()
            .into_result()
            .unwrap_err()
            .to_string()
    }

    #[test]
    fn test_scalar_types_and_modifiers() {
        let fields = fields("unsigned hex integer; key byte = 3; literal longint; int; long;");
        let FieldKind::Scalar(first) = &fields[0].kind else {
            panic!("expected scalar");
        };
        assert_eq!(first.ty, ScalarType::Integer);
        assert_eq!(
            first.modifiers,
            Modifiers {
                signed: false,
                base: NumberBase::Hex,
                is_key: false,
            }
        );
        assert!(matches!(fields[1].init_expr(), Some(Expr::Int(n, _)) if *n == BigInt::from(3)));
        assert!(matches!(&fields[1].kind, FieldKind::Scalar(f) if f.modifiers.is_key));
        assert!(matches!(&fields[2].kind, FieldKind::Scalar(f) if f.modifiers.base == NumberBase::Literal));
        assert!(matches!(&fields[3].kind, FieldKind::Scalar(f) if f.ty == ScalarType::Integer));
        assert!(matches!(&fields[4].kind, FieldKind::Scalar(f) if f.ty == ScalarType::LongInt));
    }

    #[test]
    fn test_stray_semicolons_are_skipped() {
        assert_eq!(fields(";; byte; ;;; char;").len(), 2);
    }

    #[test]
    fn test_labels_and_markers() {
        let fields = fields("start: integer; middle: ; end:");
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].label.as_deref(), Some("start"));
        assert!(matches!(fields[0].kind, FieldKind::Scalar(_)));
        assert_eq!(fields[1].kind, FieldKind::Marker);
        assert_eq!(fields[2].label.as_deref(), Some("end"));
        assert_eq!(fields[2].kind, FieldKind::Marker);
    }

    #[test]
    fn test_duplicate_labels() {
        assert!(field_err("a: byte; a: byte;").contains("duplicate label 'a'"));
        // A nested array is its own scope
        assert_eq!(fields("a: byte; array { a: byte; };").len(), 2);
    }

    #[test]
    fn test_modifier_errors() {
        assert!(field_err("unsigned unsigned byte;").contains("duplicate modifier"));
        assert!(field_err("hex octal byte;").contains("conflicting modifiers"));
        assert!(field_err("unsigned cstring;").contains("cannot modify"));
        assert!(field_err("hex pstring;").contains("cannot modify"));
        assert!(field_err("binary rect;").contains("cannot modify"));
    }

    #[test]
    fn test_signed_is_not_macro_expanded() {
        let source = "#define signed unsigned\ntype 'TEST' { signed hex byte; };";
        let decls = Parser::new(source).parse_file().into_result().unwrap();
        let Some(Declaration::Type(def)) = decls.first() else {
            panic!("expected type");
        };
        let FieldKind::Scalar(field) = &def.fields[0].kind else {
            panic!("expected scalar");
        };
        assert!(field.modifiers.signed);
        assert_eq!(field.modifiers.base, NumberBase::Hex);
    }

    #[test]
    fn test_strings() {
        let fields = fields("cstring; pstring[31]; wstring = \"w\"; hex string[4];");
        assert!(matches!(&fields[0].kind, FieldKind::Scalar(ScalarField {
            ty: ScalarType::String { kind: StringKind::C, length: None }, ..
        })));
        assert!(matches!(&fields[1].kind, FieldKind::Scalar(ScalarField {
            ty: ScalarType::String { kind: StringKind::Pascal, length: Some(_) }, ..
        })));
        assert!(matches!(&fields[3].kind, FieldKind::Scalar(f) if f.modifiers.base == NumberBase::Hex));
    }

    #[test]
    fn test_hex_literal_field() {
        let fields = fields("hex string a = $\"0102\", b = $\"03\",;");
        match &fields[0].kind {
            FieldKind::HexLiteral(hex) => {
                assert_eq!(hex.get("a"), Some(&[1u8, 2][..]));
                assert_eq!(hex.get("b"), Some(&[3u8][..]));
                assert_eq!(hex.get("c"), None);
            }
            other => panic!("expected hex literal, got {other:?}"),
        }
    }

    #[test]
    fn test_symbolic_constants() {
        let fields = fields("integer first = 1, second = 2, third;");
        match &fields[0].kind {
            FieldKind::Scalar(f) => {
                let names: Vec<&str> = f.value.constants.iter().map(|c| c.name.as_str()).collect();
                assert_eq!(names, vec!["first", "second", "third"]);
                assert!(f.value.constants[2].value.is_none());
            }
            other => panic!("expected scalar, got {other:?}"),
        }
    }

    #[test]
    fn test_bitstring_fill_align() {
        let fields = fields("bitstring[3] = 5; fill bit[5]; fill word; align long;");
        assert!(matches!(&fields[0].kind, FieldKind::BitString(b) if b.value.init.is_some()));
        assert!(matches!(&fields[1].kind, FieldKind::Fill(FillField { unit: FillUnit::Bit, count: Some(_) })));
        assert!(matches!(&fields[2].kind, FieldKind::Fill(FillField { unit: FillUnit::Word, count: None })));
        assert_eq!(fields[3].kind, FieldKind::Align(AlignUnit::Long));
    }

    #[test]
    fn test_arrays() {
        let fields = fields("wide array items { byte; }; array [4] { integer; }; array { char; };");
        assert!(matches!(&fields[0].kind, FieldKind::Array(a)
            if a.wide && a.name.as_deref() == Some("items") && a.fields.len() == 1));
        assert!(matches!(&fields[1].kind, FieldKind::Array(a) if !a.wide && a.count.is_some()));
        assert!(matches!(&fields[2].kind, FieldKind::Array(a) if a.name.is_none() && a.count.is_none()));
        assert!(field_err("wide wide array { byte; };").contains("duplicate 'wide'"));
    }

    #[test]
    fn test_switch() {
        let fields = fields(
            "switch {\n\
             case Text: key integer = 1; pstring;\n\
             case Picture: key integer = 2; rect; integer;\n\
             };",
        );
        let FieldKind::Switch(switch) = &fields[0].kind else {
            panic!("expected switch");
        };
        assert_eq!(switch.cases.len(), 2);
        let picture = switch.case("picture").unwrap();
        assert_eq!(picture.fields.len(), 3);
        assert!(matches!(picture.key, Some(Expr::Int(ref n, _)) if *n == BigInt::from(2)));
        assert!(field_err("switch { case A: byte; case a: byte; };").contains("duplicate case"));
        assert!(field_err("switch { };").contains("expected 'case'"));
    }

    #[test]
    fn test_unknown_type() {
        assert!(field_err("float;").contains("expected field type"));
    }
}
