//! Declaration parsing implementation
//!
//! This module handles the top-level statements of a Rez source:
//!
//! - Type templates: `type 'CODE' (id) { fields };` and aliases `type 'A' as 'B';`
//! - Resources: `resource 'CODE' (id, "name", attrs) { values };`
//! - Raw data: `data 'CODE' (id) { "bytes" };`
//! - `enum`, `read`, `include`, `delete` and `change`
//!
//! # Grammar
//!
//! ```text
//! statement      ::= ";" | type | resource | data | enum | read | include | delete | change
//! type           ::= "type" code id_filter? ( "{" fields "}" | "as" code ("(" expr ")")? ) ";"
//! resource       ::= "resource" spec_def "{" values ";"? "}" ";"
//! data           ::= "data" spec_def "{" expr? ";"? "}" ";"
//! enum           ::= "enum" ident? "{" (ident ("=" expr)? ",")* "}" ";"
//! read           ::= "read" spec_def expr ";"
//! include        ::= "include" expr (spec_use | "not" code)? ("as" (code | spec_def))? ";"
//! delete         ::= "delete" spec_use ";"
//! change         ::= "change" spec_use "to" spec_def ";"
//! spec_def       ::= code "(" expr ("," (string | attrs))* ")"
//! spec_use       ::= code ("(" (expr | expr ":" expr | string) ")")?
//! value          ::= "{" values (";" values)* "}" | ident "{" values ";"? "}" | expr
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::errors::{EvalError, RezError};
use crate::eval::{ResourceContext, Value};
use crate::parser::ast::*;
use crate::parser::expressions::is_string_function;
use crate::parser::lexer::{Punct, TokenKind};
use crate::parser::parse::Parser;

impl Parser {
    /// Parse one top-level statement. A stray `;` yields `None`.
    pub(crate) fn parse_statement(&mut self) -> Result<Option<Declaration>, RezError> {
        if self.match_punct(Punct::Semicolon) {
            return Ok(None);
        }

        let token = self.peek().clone();
        let keyword = if token.kind == TokenKind::Ident {
            token.text.to_ascii_lowercase()
        } else {
            String::new()
        };

        let declaration = match keyword.as_str() {
            "type" => self.parse_type_statement()?,
            "resource" => Declaration::Resource(self.parse_resource_statement()?),
            "data" => Declaration::Data(self.parse_data_statement()?),
            "enum" => Declaration::Enum(self.parse_enum_statement()?),
            "read" => Declaration::Read(self.parse_read_statement()?),
            "include" => Declaration::Include(self.parse_include_statement()?),
            "delete" => Declaration::Delete(self.parse_delete_statement()?),
            "change" => Declaration::Change(self.parse_change_statement()?),
            _ => return Err(self.unexpected("statement", "statement")),
        };
        Ok(Some(declaration))
    }

    // ===== Resource types and headers =====

    /// A four-character type code, usually written `'CODE'`
    pub(crate) fn parse_type_code(&mut self, production: &str) -> Result<ResType, RezError> {
        let (value, location) = self.parse_int_constant()?;
        u32::try_from(value).map(ResType).map_err(|_| {
            self.syntax_error(
                format!("type code {} does not fit in 32 bits", value),
                production,
                location,
            )
        })
    }

    /// `(id)` or `(low:high)` after a template's type code.
    ///
    /// A name or attributes after the ID are accepted and ignored; they
    /// do not affect which resources the template applies to.
    fn parse_id_filter(&mut self) -> Result<Option<IdFilter>, RezError> {
        if !self.match_punct(Punct::LParen) {
            return Ok(None);
        }

        let (low, location) = self.parse_int_constant()?;
        let filter = if self.match_punct(Punct::Colon) {
            let (high, _) = self.parse_int_constant()?;
            if low > high {
                return Err(self.syntax_error(
                    format!("empty ID range {}:{}", low, high),
                    "type declaration",
                    location,
                ));
            }
            IdFilter::Range(low, high)
        } else {
            IdFilter::Single(low)
        };

        while self.match_punct(Punct::Comma) {
            self.parse_expression()?;
        }
        self.expect_punct(Punct::RParen, "type declaration")?;
        Ok(Some(filter))
    }

    /// `'CODE' (id [, "name"] [, attributes])`
    pub(crate) fn parse_resource_spec(&mut self, production: &str) -> Result<ResourceSpec, RezError> {
        let type_code = self.parse_type_code(production)?;
        self.parse_resource_spec_tail(type_code, production)
    }

    fn parse_resource_spec_tail(
        &mut self,
        type_code: ResType,
        production: &str,
    ) -> Result<ResourceSpec, RezError> {
        self.expect_punct(Punct::LParen, production)?;
        let (id, _) = self.parse_int_constant()?;

        let mut spec = ResourceSpec {
            type_code,
            id,
            name: None,
            attributes: ResourceAttributes::empty(),
        };

        let mut bits = 0i64;
        while self.match_punct(Punct::Comma) {
            if self.at_string_expression() {
                spec.name = Some(self.parse_string_constant()?);
                continue;
            }
            let (value, location) = self.parse_int_constant()?;
            bits |= value;
            if !(0..=0xFF).contains(&bits) {
                return Err(self.syntax_error(
                    format!("resource attributes {} out of range", value),
                    production,
                    location,
                ));
            }
        }
        self.expect_punct(Punct::RParen, production)?;

        spec.attributes = ResourceAttributes::from_bits_retain(bits as u8);
        Ok(spec)
    }

    /// `'CODE' [(id) | (low:high) | ("name")]`
    pub(crate) fn parse_resource_selector(
        &mut self,
        production: &str,
    ) -> Result<ResourceSelector, RezError> {
        let type_code = self.parse_type_code(production)?;
        if !self.match_punct(Punct::LParen) {
            return Ok(ResourceSelector {
                type_code,
                selector: None,
            });
        }

        let selector = if self.at_string_expression() {
            Selector::Name(self.parse_string_constant()?)
        } else {
            let (low, location) = self.parse_int_constant()?;
            if self.match_punct(Punct::Colon) {
                let (high, _) = self.parse_int_constant()?;
                if low > high {
                    return Err(self.syntax_error(
                        format!("empty ID range {}:{}", low, high),
                        production,
                        location,
                    ));
                }
                Selector::Range(low, high)
            } else {
                Selector::Id(low)
            }
        };
        self.expect_punct(Punct::RParen, production)?;

        Ok(ResourceSelector {
            type_code,
            selector: Some(selector),
        })
    }

    /// A string literal or a string-valued pseudo-function comes next
    fn at_string_expression(&mut self) -> bool {
        let token = self.peek();
        token.is_string()
            || (token.kind == TokenKind::Function
                && Builtin::from_name(&token.text).is_some_and(is_string_function))
    }

    // ===== Statements =====

    /// Parse `type` declaration: a template or an alias
    fn parse_type_statement(&mut self) -> Result<Declaration, RezError> {
        let location = self.expect_keyword("type", "type declaration")?.location;
        let type_code = self.parse_type_code("type declaration")?;
        let id_filter = self.parse_id_filter()?;

        if self.match_keyword("as") {
            let target_code = self.parse_type_code("type declaration")?;
            let target_id = if self.match_punct(Punct::LParen) {
                let (id, _) = self.parse_int_constant()?;
                self.expect_punct(Punct::RParen, "type declaration")?;
                Some(id)
            } else {
                None
            };
            self.expect_punct(Punct::Semicolon, "type declaration")?;

            return Ok(Declaration::Alias(AliasDef {
                type_code,
                id_filter,
                target: TypeKey {
                    type_code: target_code,
                    id: target_id,
                },
                location,
            }));
        }

        self.expect_punct(Punct::LBrace, "type declaration")?;
        let fields = self.parse_field_list("type declaration", false)?;
        self.expect_punct(Punct::RBrace, "type declaration")?;
        self.expect_punct(Punct::Semicolon, "type declaration")?;

        Ok(Declaration::Type(TypeDef {
            type_code,
            id_filter,
            fields,
            location,
        }))
    }

    /// Parse `resource` statement
    fn parse_resource_statement(&mut self) -> Result<ResourceDef, RezError> {
        let location = self.expect_keyword("resource", "resource statement")?.location;
        let spec = self.parse_resource_spec("resource statement")?;
        self.expect_punct(Punct::LBrace, "resource statement")?;

        self.resource = Some(resource_context(&spec));
        let body = self.parse_value_list("resource statement");
        self.resource = None;
        let body = body?;

        self.match_punct(Punct::Semicolon);
        self.expect_punct(Punct::RBrace, "resource statement")?;
        self.expect_punct(Punct::Semicolon, "resource statement")?;

        Ok(ResourceDef {
            spec,
            body,
            location,
        })
    }

    /// Parse `data` statement: the body is at most one string expression
    fn parse_data_statement(&mut self) -> Result<DataDef, RezError> {
        let location = self.expect_keyword("data", "data statement")?.location;
        let spec = self.parse_resource_spec("data statement")?;
        self.expect_punct(Punct::LBrace, "data statement")?;

        self.resource = Some(resource_context(&spec));
        let body = self.parse_data_body();
        self.resource = None;
        let body = body?;

        self.match_punct(Punct::Semicolon);
        self.expect_punct(Punct::RBrace, "data statement")?;
        self.expect_punct(Punct::Semicolon, "data statement")?;

        Ok(DataDef {
            spec,
            body,
            location,
        })
    }

    fn parse_data_body(&mut self) -> Result<Vec<ResourceValue>, RezError> {
        if self.check_punct(Punct::Semicolon) || self.check_punct(Punct::RBrace) {
            return Ok(Vec::new());
        }

        let expr = self.parse_expression()?;
        if !expr.is_constant() {
            return Ok(vec![ResourceValue::Deferred(expr)]);
        }

        let location = expr.location();
        match self.evaluate(&expr)? {
            Value::Int(_) => Err(EvalError::TypeMismatch {
                expected: "string".to_string(),
                found: "integer".to_string(),
                location,
            }
            .into()),
            value => Ok(vec![ResourceValue::Value(value, location)]),
        }
    }

    /// Parse `enum`: every constant becomes a macro as soon as it is read
    fn parse_enum_statement(&mut self) -> Result<EnumDef, RezError> {
        let location = self.expect_keyword("enum", "enum declaration")?.location;
        let name = if self.peek().is_plain_ident() {
            Some(self.advance().text)
        } else {
            None
        };
        self.expect_punct(Punct::LBrace, "enum declaration")?;

        let mut constants = Vec::new();
        let mut next = Some(0i64);
        while !self.check_punct(Punct::RBrace) {
            let (constant, constant_location) = self.expect_ident("enum declaration")?;
            let value = if self.match_punct(Punct::Assign) {
                self.parse_int_constant()?.0
            } else {
                next.ok_or_else(|| EvalError::Overflow {
                    operation: format!("enum value of '{}'", constant),
                    location: constant_location,
                })?
            };

            self.define_constant(&constant, value, constant_location);
            next = value.checked_add(1);
            constants.push(EnumConstant {
                name: constant,
                value,
            });

            if !self.match_punct(Punct::Comma) {
                break;
            }
        }

        self.expect_punct(Punct::RBrace, "enum declaration")?;
        self.expect_punct(Punct::Semicolon, "enum declaration")?;

        Ok(EnumDef {
            name,
            constants,
            location,
        })
    }

    /// Parse `read 'CODE' (id) "path";`
    fn parse_read_statement(&mut self) -> Result<ReadDef, RezError> {
        let location = self.expect_keyword("read", "read statement")?.location;
        let spec = self.parse_resource_spec("read statement")?;
        let path = self.parse_string_constant()?;
        self.expect_punct(Punct::Semicolon, "read statement")?;
        Ok(ReadDef {
            spec,
            path,
            location,
        })
    }

    /// Parse `include "file" [selection] [as target];`
    fn parse_include_statement(&mut self) -> Result<IncludeDef, RezError> {
        let location = self.expect_keyword("include", "include statement")?.location;
        let path = self.parse_string_constant()?;

        let mut selection = IncludeSelection::All;
        let mut rename = None;

        if self.match_keyword("not") {
            selection = IncludeSelection::AllExcept(self.parse_type_code("include statement")?);
        } else if !self.check_punct(Punct::Semicolon) {
            selection = IncludeSelection::Matching(self.parse_resource_selector("include statement")?);
            if self.match_keyword("as") {
                let type_code = self.parse_type_code("include statement")?;
                rename = Some(if self.check_punct(Punct::LParen) {
                    IncludeRename::Spec(self.parse_resource_spec_tail(type_code, "include statement")?)
                } else {
                    IncludeRename::Type(type_code)
                });
            }
        }
        self.expect_punct(Punct::Semicolon, "include statement")?;

        Ok(IncludeDef {
            path,
            selection,
            rename,
            location,
        })
    }

    /// Parse `delete 'CODE' [(selector)];`
    fn parse_delete_statement(&mut self) -> Result<DeleteDef, RezError> {
        let location = self.expect_keyword("delete", "delete statement")?.location;
        let target = self.parse_resource_selector("delete statement")?;
        self.expect_punct(Punct::Semicolon, "delete statement")?;
        Ok(DeleteDef { target, location })
    }

    /// Parse `change 'CODE' [(selector)] to 'CODE' (id, ...);`
    fn parse_change_statement(&mut self) -> Result<ChangeDef, RezError> {
        let location = self.expect_keyword("change", "change statement")?.location;
        let from = self.parse_resource_selector("change statement")?;
        self.expect_keyword("to", "change statement")?;
        let to = self.parse_resource_spec("change statement")?;
        self.expect_punct(Punct::Semicolon, "change statement")?;
        Ok(ChangeDef { from, to, location })
    }

    // ===== Resource values =====

    /// Comma-separated values up to `;` or `}`. A trailing comma is allowed.
    pub(crate) fn parse_value_list(&mut self, production: &str) -> Result<Vec<ResourceValue>, RezError> {
        let mut values = Vec::new();
        while !self.check_punct(Punct::Semicolon)
            && !self.check_punct(Punct::RBrace)
            && !self.peek().is_eof()
        {
            values.push(self.parse_resource_value(production)?);
            if !self.match_punct(Punct::Comma) {
                break;
            }
        }
        Ok(values)
    }

    fn parse_resource_value(&mut self, production: &str) -> Result<ResourceValue, RezError> {
        let location = self.current_location();

        // Array body: groups of values separated by `;`
        if self.match_punct(Punct::LBrace) {
            let mut groups = Vec::new();
            while !self.check_punct(Punct::RBrace) {
                groups.push(self.parse_value_list(production)?);
                if !self.match_punct(Punct::Semicolon) {
                    break;
                }
            }
            self.expect_punct(Punct::RBrace, production)?;
            return Ok(ResourceValue::Array(groups, location));
        }

        // Switch case: `Label { values }`
        if self.peek().is_plain_ident() && self.peek_ahead(1).is_punct(Punct::LBrace) {
            let label = self.advance().text;
            self.advance();
            let values = self.parse_value_list(production)?;
            self.match_punct(Punct::Semicolon);
            self.expect_punct(Punct::RBrace, production)?;
            return Ok(ResourceValue::Switch {
                label,
                values,
                location,
            });
        }

        let expr = self.parse_expression()?;
        Ok(match expr {
            Expr::Symbol(name, location) => ResourceValue::Symbol(name, location),
            expr if expr.is_constant() => {
                let value = self.evaluate(&expr)?;
                ResourceValue::Value(value, expr.location())
            }
            expr => ResourceValue::Deferred(expr),
        })
    }
}

fn resource_context(spec: &ResourceSpec) -> ResourceContext {
    ResourceContext {
        type_code: spec.type_code,
        id: spec.id,
        name: spec.name.clone(),
        attributes: spec.attributes,
        data: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Vec<Declaration> {
        Parser::new(source).parse_file().into_result().unwrap()
    }

    fn parse_err(source: &str) -> RezError {
        Parser::new(source).parse_file().into_result().unwrap_err()
    }

    fn code(text: &[u8; 4]) -> ResType {
        ResType::from_bytes(*text)
    }

    #[test]
    fn test_stray_semicolons() {
        assert!(parse(";;\n;").is_empty());
    }

    #[test]
    fn test_type_with_id_range_and_ignored_header() {
        let decls = parse("type 'MENU' (128:255, \"menus\", purgeable) { integer; };");
        match &decls[0] {
            Declaration::Type(def) => {
                assert_eq!(def.type_code, code(b"MENU"));
                assert_eq!(def.id_filter, Some(IdFilter::Range(128, 255)));
                assert_eq!(def.fields.len(), 1);
            }
            other => panic!("expected type, got {other:?}"),
        }
    }

    #[test]
    fn test_type_alias() {
        let decls = parse("type 'cicn' as 'ICN#' (5);");
        assert_eq!(
            decls,
            vec![Declaration::Alias(AliasDef {
                type_code: code(b"cicn"),
                id_filter: None,
                target: TypeKey {
                    type_code: code(b"ICN#"),
                    id: Some(5),
                },
                location: SourceLocation::in_file(0, 1, 1, 0),
            })]
        );
    }

    #[test]
    fn test_resource_header() {
        let decls = parse("resource 'STR ' (128, \"Hello\", purgeable, locked) { \"hi\" };");
        match &decls[0] {
            Declaration::Resource(def) => {
                assert_eq!(def.spec.type_code, code(b"STR "));
                assert_eq!(def.spec.id, 128);
                assert_eq!(def.spec.name.as_deref(), Some(&b"Hello"[..]));
                assert_eq!(
                    def.spec.attributes,
                    ResourceAttributes::PURGEABLE | ResourceAttributes::LOCKED
                );
                assert_eq!(def.body, vec![ResourceValue::Value(
                    Value::Str(b"hi".to_vec()),
                    def.body[0].location()
                )]);
            }
            other => panic!("expected resource, got {other:?}"),
        }
    }

    #[test]
    fn test_numeric_attributes() {
        let decls = parse("resource 'X   ' (1, $20 | 64) { };");
        match &decls[0] {
            Declaration::Resource(def) => {
                assert_eq!(def.spec.attributes.bits(), 0x60);
                assert!(def.body.is_empty());
            }
            other => panic!("expected resource, got {other:?}"),
        }
        assert!(matches!(
            parse_err("resource 'X   ' (1, 256) { };"),
            RezError::Syntax(_)
        ));
    }

    #[test]
    fn test_resource_values() {
        let decls = parse(
            "resource 'DLOG' (1) {\n\
             { 1, 2; 3, 4; },\n\
             Button { 5, \"OK\" },\n\
             visible,\n\
             count + 1,\n\
             $$ID * 2,\n\
             0b101, $1F, 0x10,\n\
             };",
        );
        let Declaration::Resource(def) = &decls[0] else {
            panic!("expected resource");
        };
        assert_eq!(def.body.len(), 8);
        match &def.body[0] {
            ResourceValue::Array(groups, _) => {
                assert_eq!(groups.len(), 2);
                assert_eq!(groups[1][1].as_value(), Some(&Value::int(4)));
            }
            other => panic!("expected array, got {other:?}"),
        }
        assert!(matches!(&def.body[1], ResourceValue::Switch { label, values, .. }
            if label == "Button" && values.len() == 2));
        assert!(matches!(&def.body[2], ResourceValue::Symbol(name, _) if name == "visible"));
        assert!(matches!(&def.body[3], ResourceValue::Deferred(_)));
        assert_eq!(def.body[4].as_value(), Some(&Value::int(2)));
        assert_eq!(def.body[5].as_value(), Some(&Value::int(5)));
        assert_eq!(def.body[7].as_value(), Some(&Value::int(0x10)));
    }

    #[test]
    fn test_empty_bodies() {
        assert_eq!(parse("resource 'X   ' (1) { ; };").len(), 1);
        assert_eq!(parse("data 'X   ' (1) { };").len(), 1);
    }

    #[test]
    fn test_data_body() {
        let decls = parse("data 'PICT' (1) { $\"0102\" $\"03\" };");
        match &decls[0] {
            Declaration::Data(def) => assert_eq!(def.bytes(), Some(vec![1, 2, 3])),
            other => panic!("expected data, got {other:?}"),
        }
        assert!(matches!(
            parse_err("data 'PICT' (1) { 5 };"),
            RezError::Eval(EvalError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_enum_constants_become_macros() {
        let decls = parse(
            "enum { first, second, tenth = 10, eleventh };\n\
             resource 'X   ' (eleventh) { second };",
        );
        match &decls[0] {
            Declaration::Enum(def) => {
                let values: Vec<i64> = def.constants.iter().map(|c| c.value).collect();
                assert_eq!(values, vec![0, 1, 10, 11]);
            }
            other => panic!("expected enum, got {other:?}"),
        }
        match &decls[1] {
            Declaration::Resource(def) => {
                assert_eq!(def.spec.id, 11);
                assert_eq!(def.body[0].as_value(), Some(&Value::int(1)));
            }
            other => panic!("expected resource, got {other:?}"),
        }
    }

    #[test]
    fn test_enum_constant_usable_in_same_enum() {
        let decls = parse("enum Sizes { small = 4, large = small * 2, };");
        match &decls[0] {
            Declaration::Enum(def) => {
                assert_eq!(def.name.as_deref(), Some("Sizes"));
                assert_eq!(def.constants[1].value, 8);
            }
            other => panic!("expected enum, got {other:?}"),
        }
    }

    #[test]
    fn test_include_forms() {
        let decls = parse(
            "include \"a.rsrc\";\n\
             include \"b.rsrc\" not 'CODE';\n\
             include \"c.rsrc\" 'ICON' (128:130);\n\
             include \"d.rsrc\" 'ICON' as 'ICN#';\n\
             include \"e.rsrc\" 'ICON' (\"x\") as 'ICON' (5, \"y\");",
        );
        let includes: Vec<&IncludeDef> = decls
            .iter()
            .map(|d| match d {
                Declaration::Include(def) => def,
                other => panic!("expected include, got {other:?}"),
            })
            .collect();
        assert_eq!(includes[0].selection, IncludeSelection::All);
        assert_eq!(includes[1].selection, IncludeSelection::AllExcept(code(b"CODE")));
        assert_eq!(
            includes[2].selection,
            IncludeSelection::Matching(ResourceSelector {
                type_code: code(b"ICON"),
                selector: Some(Selector::Range(128, 130)),
            })
        );
        assert_eq!(includes[3].rename, Some(IncludeRename::Type(code(b"ICN#"))));
        match &includes[4].rename {
            Some(IncludeRename::Spec(spec)) => {
                assert_eq!(spec.id, 5);
                assert_eq!(spec.name.as_deref(), Some(&b"y"[..]));
            }
            other => panic!("expected spec rename, got {other:?}"),
        }
    }

    #[test]
    fn test_read_delete_change() {
        let decls = parse(
            "read 'PICT' (1, \"pic\") \"art.pict\";\n\
             delete 'CODE';\n\
             change 'STR ' (\"old\") to 'STR#' (7);",
        );
        assert!(matches!(&decls[0], Declaration::Read(def) if def.path == b"art.pict"));
        assert!(matches!(&decls[1], Declaration::Delete(def) if def.target.selector.is_none()));
        match &decls[2] {
            Declaration::Change(def) => {
                assert_eq!(def.from.selector, Some(Selector::Name(b"old".to_vec())));
                assert_eq!(def.to.type_code, code(b"STR#"));
            }
            other => panic!("expected change, got {other:?}"),
        }
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        let decls = parse("RESOURCE 'X   ' (1) { }; Type 'Y   ' { INTEGER; };");
        assert_eq!(decls.len(), 2);
    }

    #[test]
    fn test_partial_results_survive_errors() {
        let output = Parser::new("resource 'A   ' (1) { };\nresource 'B   ' (2) { 1 }\n").parse_file();
        assert_eq!(output.declarations.len(), 1);
        assert_eq!(output.errors.len(), 1);
        assert!(matches!(output.errors[0], RezError::Syntax(_)));
    }

    #[test]
    fn test_statement_errors() {
        assert!(matches!(parse_err("bogus;"), RezError::Syntax(_)));
        assert!(matches!(parse_err("type 'ABCD' (3:1) { };"), RezError::Syntax(_)));
        assert!(matches!(parse_err("type -1 { };"), RezError::Syntax(_)));
        assert!(matches!(parse_err("delete 'ABCD' (\"x\";"), RezError::Syntax(_)));
    }
}
