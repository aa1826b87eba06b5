// Integration tests for the Rez front-end

use chrono::NaiveDate;
use num_bigint::BigInt;
use pretty_assertions::assert_eq;
use rezparse::eval::{EmptyScope, Value};
use rezparse::host::{FixedMetadata, Host, MemoryFileReader, MemoryIncludeResolver};
use rezparse::parser::ast::*;
use rezparse::{parse_source, DirectiveError, EvalError, ParseOutput, Parser, ParserConfig, RezError, TemplateIndex};

fn parse(source: &str) -> Vec<Declaration> {
    let output = parse_source(source, &ParserConfig::default());
    assert!(output.is_ok(), "Parsing failed: {:?}", output.errors);
    output.declarations
}

fn parse_with(source: &str, host: Host) -> ParseOutput {
    Parser::with_host("main.r", source, &ParserConfig::default(), host).parse_file()
}

fn fixed_metadata() -> FixedMetadata {
    let timestamp = NaiveDate::from_ymd_opt(1995, 8, 30)
        .unwrap()
        .and_hms_opt(23, 45, 35)
        .unwrap();
    FixedMetadata::new(timestamp, "V3.0")
}

fn code(text: &[u8; 4]) -> ResType {
    ResType::from_bytes(*text)
}

/// Evaluated values of the first resource in `declarations`
fn resource_values(declarations: &[Declaration]) -> Vec<Value> {
    declarations
        .iter()
        .find_map(|d| match d {
            Declaration::Resource(def) => Some(&def.body),
            _ => None,
        })
        .expect("no resource")
        .iter()
        .map(|v| v.as_value().cloned().expect("value was not folded"))
        .collect()
}

#[test]
fn test_countof_references_array_label() {
    let source = r#"
        type '_FOO' {
            stuff_length: unsigned integer = $$countof(stuff);
            stuff: wide array stuff {
                stuff_thing: hex unsigned byte;
            };
        };
    "#;

    let declarations = parse(source);
    assert_eq!(declarations.len(), 1);
    let Declaration::Type(def) = &declarations[0] else {
        panic!("expected a type template");
    };
    assert_eq!(def.type_code, code(b"_FOO"));

    let length = def.find_label("stuff_length").unwrap();
    let init = length.init_expr().unwrap();
    assert_eq!(init.referenced_labels(), vec!["stuff"]);
    assert!(matches!(init, Expr::Call { function: Builtin::CountOf, .. }));

    let array = def.find_array("stuff").unwrap();
    assert!(array.wide);
    assert_eq!(array.fields[0].label.as_deref(), Some("stuff_thing"));
    assert!(matches!(&array.fields[0].kind, FieldKind::Scalar(f)
        if !f.modifiers.signed && f.modifiers.base == NumberBase::Hex));
}

#[test]
fn test_string_escapes() {
    let source = r#"resource 'blub' (0) { "abcdef\t\b\r\n\f\v\?\\\'\"\0B00101010\052\0D042\0X2a\$2a\499"; };"#;

    let declarations = parse(source);
    let mut expected = b"abcdef".to_vec();
    expected.extend([0x09, 0x08, 0x0A, 0x0D, 0x0C, 0x0B, 0x7F, b'\\', b'\'', b'"']);
    expected.extend([0x2A; 5]);
    expected.extend(b"499");
    assert_eq!(resource_values(&declarations), vec![Value::Str(expected)]);
}

#[test]
fn test_templates_distinguished_by_id() {
    let declarations = parse(
        "type 'XXXX' (2) { integer; };\n\
         type 'XXXX' (3) { string; };",
    );
    assert_eq!(declarations.len(), 2);

    let index = TemplateIndex::new(&declarations);
    let two = index.lookup(code(b"XXXX"), 2).unwrap().unwrap();
    let three = index.lookup(code(b"XXXX"), 3).unwrap().unwrap();
    assert!(matches!(&two.fields[0].kind, FieldKind::Scalar(f) if f.ty == ScalarType::Integer));
    assert!(matches!(&three.fields[0].kind, FieldKind::Scalar(ScalarField {
        ty: ScalarType::String { .. },
        ..
    })));
    assert!(index.lookup(code(b"XXXX"), 4).unwrap().is_none());
}

#[test]
fn test_adjacent_string_macro_chaining() {
    let source = r#"
        #define abc "abc"
        #define def "def"
        #define abcdef abc def
        resource 'STR ' (1) { abcdef };
    "#;
    assert_eq!(
        resource_values(&parse(source)),
        vec![Value::Str(b"abcdef".to_vec())]
    );
}

#[test]
fn test_dead_branches_are_never_evaluated() {
    let source = r#"
        #if 0
            #if UNDEFINED_THING / 0
            #endif
            resource 'BAD ' (1) { 1 / 0 };
        #elif defined(rez) && !derez
            resource 'GOOD' (1) { 1 };
        #elif 1 / 0
        #else
            resource 'BAD ' (2) { };
        #endif
    "#;
    let declarations = parse(source);
    assert_eq!(declarations.len(), 1);
    assert!(matches!(&declarations[0], Declaration::Resource(def) if def.spec.type_code == code(b"GOOD")));
}

#[test]
fn test_undef() {
    let source = r#"
        #define FOO 1
        #undef FOO
        #ifdef FOO
            resource 'BAD ' (1) { };
        #endif
        #undef NEVER_DEFINED
        #ifndef FOO
            resource 'GOOD' (1) { };
        #endif
    "#;
    let declarations = parse(source);
    assert_eq!(declarations.len(), 1);
}

#[test]
fn test_derez_mode() {
    let source = "#if derez\nresource 'DREZ' (1) { };\n#else\nresource 'REZ ' (1) { };\n#endif\n";
    let output = parse_source(source, &ParserConfig::new().derez(true));
    let declarations = output.into_result().unwrap();
    assert!(matches!(&declarations[0], Declaration::Resource(def) if def.spec.type_code == code(b"DREZ")));
}

#[test]
fn test_command_line_defines() {
    let config = ParserConfig::new().define_arg("COUNT=3").define_arg("DEBUG");
    let output = parse_source("#if DEBUG\nresource 'X   ' (COUNT) { COUNT * 2 };\n#endif", &config);
    let declarations = output.into_result().unwrap();
    assert_eq!(resource_values(&declarations), vec![Value::int(6)]);
}

#[test]
fn test_includes_from_memory() {
    let resolver = MemoryIncludeResolver::new()
        .with_file("Types.r", "#define kCount 2\ntype 'LIST' { integer = $$countof(items); array items { byte; }; };\n")
        .with_file("Other.r", "#import \"Types.r\"\n");
    let source = r#"
        #include "Types.r"
        #import "Types.r"
        #include "Oth" "er.r";
        resource 'LIST' (128) { { kCount; 3 } };
    "#;

    let output = parse_with(source, Host::new().resolver(resolver));
    assert!(output.is_ok(), "{:?}", output.errors);
    assert_eq!(output.declarations.len(), 2);
    assert_eq!(output.files, vec!["main.r", "Types.r", "Other.r"]);
    assert_eq!(output.file_name(output.declarations[0].location()), Some("Types.r"));
    assert_eq!(output.file_name(output.declarations[1].location()), Some("main.r"));
}

#[test]
fn test_missing_include() {
    let output = parse_with("#include \"Nope.r\"\n", Host::new().resolver(MemoryIncludeResolver::new()));
    match output.into_result() {
        Err(RezError::Include(err)) => assert_eq!(err.path, "Nope.r"),
        other => panic!("expected include error, got {other:?}"),
    }
}

#[test]
fn test_printf_output() {
    let source = "#define N 3\n#printf(\"%d items, %s\\n\", N, \"done\");\n#printf(\"%x\", 255)\n";
    let output = parse_source(source, &ParserConfig::default());
    assert!(output.is_ok(), "{:?}", output.errors);
    assert_eq!(output.printf_output, "3 items, done\nff");
}

#[test]
fn test_build_metadata_functions() {
    let source = r#"
        resource 'vers' (1) {
            $$Date, $$Time, "Built with " $$Version, $$Year, $$Weekday,
            $$Format("%d-%d", $$Month, $$Day), $$ID, $$Type
        };
    "#;
    let output = parse_with(source, Host::new().metadata(fixed_metadata()));
    let declarations = output.into_result().unwrap();
    assert_eq!(
        resource_values(&declarations),
        vec![
            Value::Str(b"Wednesday, August 30, 1995".to_vec()),
            Value::Str(b"23:45:35".to_vec()),
            Value::Str(b"Built with V3.0".to_vec()),
            Value::int(1995),
            Value::int(4),
            Value::Str(b"8-30".to_vec()),
            Value::int(1),
            Value::int(code(b"vers").0),
        ]
    );
}

fn deferred_data(declarations: &[Declaration]) -> &Expr {
    match &declarations[0] {
        Declaration::Data(def) => {
            assert_eq!(def.bytes(), None);
            match &def.body[..] {
                [ResourceValue::Deferred(expr)] => expr,
                other => panic!("expected a deferred body, got {other:?}"),
            }
        }
        other => panic!("expected data, got {other:?}"),
    }
}

#[test]
fn test_read_function() {
    let source = "data 'PICT' (1) { $$Read(\"pic.bin\") };";
    let declarations = parse(source);
    let expr = deferred_data(&declarations);

    let reader = MemoryFileReader::new().with_file("pic.bin", vec![1u8, 2, 3]);
    let value = rezparse::eval::evaluate(expr, &EmptyScope, &Host::new().reader(reader)).unwrap();
    assert_eq!(value, Value::Str(vec![1, 2, 3]));
}

#[test]
fn test_read_is_denied_by_default() {
    let declarations = parse("data 'PICT' (1) { $$Read(\"pic.bin\") };");
    let expr = deferred_data(&declarations);
    assert!(matches!(
        rezparse::eval::evaluate(expr, &EmptyScope, &Host::new()),
        Err(EvalError::Read { .. })
    ));
}

#[test]
fn test_resource_data_functions_are_deferred() {
    let declarations = parse(
        "resource 'TEST' (1) { $$Long(1), $$Word(16), $$PackedSize(0, 8, 2), \
         $$Resource(\"sys\", 'snd ', 1, \"\") };",
    );
    let Declaration::Resource(def) = &declarations[0] else {
        panic!("expected a resource");
    };
    assert_eq!(def.body.len(), 4);
    assert!(def.body.iter().all(|v| matches!(v, ResourceValue::Deferred(_))));

    let output = parse_source("resource 'TEST' (1) { $$Word(1, 2) };", &ParserConfig::default());
    assert!(output.into_result().is_err());
}

#[test]
fn test_wide_integer_values() {
    let declarations = parse(
        "resource 'TEST' (1) { $FFFFFFFFFFFFFFFF, 1 << 64, 9223372036854775807 + 1 };",
    );
    assert_eq!(
        resource_values(&declarations),
        vec![
            Value::int(u64::MAX),
            Value::int(BigInt::from(u64::MAX) + 1u32),
            Value::int(BigInt::from(i64::MAX) + 1u32),
        ]
    );
}

#[test]
fn test_errors_keep_earlier_declarations() {
    let source = "resource 'A   ' (1) { };\nresource 'B   ' (2) { 1 / 0 };\nresource 'C   ' (3) { };\n";
    let output = parse_source(source, &ParserConfig::default());
    assert_eq!(output.declarations.len(), 1);
    assert_eq!(output.errors.len(), 1);
    assert!(matches!(output.errors[0], RezError::Eval(EvalError::DivisionByZero { .. })));
    assert_eq!(output.errors[0].location().line, 2);
}

#[test]
fn test_unterminated_conditional() {
    let output = parse_source("#if 1\nresource 'A   ' (1) { };\n", &ParserConfig::default());
    assert_eq!(output.declarations.len(), 1);
    assert!(matches!(
        output.errors[0],
        RezError::Directive(DirectiveError::UnterminatedConditional { .. })
    ));
}

#[test]
fn test_lex_errors_in_dead_branches_are_ignored() {
    let source = "#if 0\n\"unterminated\n#endif\nresource 'A   ' (1) { };\n";
    assert_eq!(parse(source).len(), 1);
}

#[test]
fn test_strict_redefinition() {
    let source = "#define A 1\n#define A 2\n";
    let lenient = parse_source(source, &ParserConfig::default());
    assert!(lenient.is_ok());
    assert_eq!(lenient.warnings.len(), 1);

    let strict = parse_source(source, &ParserConfig::new().strict_redefinition(true));
    assert!(matches!(
        strict.into_result(),
        Err(RezError::Directive(DirectiveError::Redefinition { .. }))
    ));
}

#[test]
fn test_realistic_template_and_resource() {
    let source = r#"
        #define SystemSevenOrLater 1

        type 'DITL' {
            integer = $$CountOf(ItemArray) - 1;
            array ItemArray {
                fill long;
                rect;
                switch {
                    case Button:
                        boolean enabled, disabled;
                        key bitstring[7] = 4;
                        pstring;
                    case StaticText:
                        boolean enabled, disabled;
                        key bitstring[7] = 8;
                        pstring;
                };
                align word;
            };
        };

        resource 'DITL' (128, "Alert", purgeable) {
            {
                { 10, 20, 30, 80 }, Button { enabled, "OK" };
                { 40, 20, 60, 200 }, StaticText { disabled, "Hello" };
            }
        };
    "#;

    let declarations = parse(source);
    assert_eq!(declarations.len(), 2);

    let Declaration::Type(template) = &declarations[0] else {
        panic!("expected template");
    };
    let array = template.find_array("ItemArray").unwrap();
    let FieldKind::Switch(switch) = &array.fields[2].kind else {
        panic!("expected switch");
    };
    assert!(matches!(switch.case("button").unwrap().key, Some(Expr::Int(ref n, _)) if *n == BigInt::from(4)));
    assert!(matches!(switch.case("StaticText").unwrap().key, Some(Expr::Int(ref n, _)) if *n == BigInt::from(8)));

    let Declaration::Resource(resource) = &declarations[1] else {
        panic!("expected resource");
    };
    assert_eq!(resource.spec.attributes, ResourceAttributes::PURGEABLE);
    match &resource.body[0] {
        ResourceValue::Array(groups, _) => {
            assert_eq!(groups.len(), 2);
            assert!(matches!(&groups[0][0], ResourceValue::Array(rect, _) if rect[0].len() == 4));
            assert!(matches!(&groups[1][1], ResourceValue::Switch { label, .. } if label == "StaticText"));
        }
        other => panic!("expected array, got {other:?}"),
    }
}
