// AST (Abstract Syntax Tree) definitions for Rez sources

use crate::eval::value::Value;
use bitflags::bitflags;
use num_bigint::BigInt;
use std::fmt;

/// Source location information for error reporting
///
/// `file` indexes the file table of the parse that produced the location
/// (0 is the main source, included files follow in the order they were opened).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub file: usize,
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self {
            file: 0,
            line,
            column,
            offset: 0,
        }
    }

    pub fn in_file(file: usize, line: usize, column: usize, offset: usize) -> Self {
        Self {
            file,
            line,
            column,
            offset,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// A four-character resource type code such as `'STR#'`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResType(pub u32);

impl ResType {
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        ResType(u32::from_be_bytes(bytes))
    }

    pub fn bytes(&self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for ResType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.bytes();
        if bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            write!(f, "'")?;
            for b in bytes {
                write!(f, "{}", b as char)?;
            }
            write!(f, "'")
        } else {
            write!(f, "${:08X}", self.0)
        }
    }
}

bitflags! {
    /// Resource attribute bits as stored in the resource map
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ResourceAttributes: u8 {
        const COMPRESSED = 1;
        const CHANGED = 2;
        const PRELOAD = 4;
        const PROTECTED = 8;
        const LOCKED = 16;
        const PURGEABLE = 32;
        const SYSHEAP = 64;
    }
}

impl ResourceAttributes {
    /// Value of a named attribute keyword (case-insensitive).
    ///
    /// The negated forms (`unlocked`, `appheap`, ...) are valid keywords with value 0.
    pub fn keyword_value(word: &str) -> Option<i64> {
        let value = match word.to_ascii_lowercase().as_str() {
            "compressed" => Self::COMPRESSED.bits(),
            "changed" => Self::CHANGED.bits(),
            "preload" => Self::PRELOAD.bits(),
            "protected" => Self::PROTECTED.bits(),
            "locked" => Self::LOCKED.bits(),
            "purgeable" => Self::PURGEABLE.bits(),
            "sysheap" => Self::SYSHEAP.bits(),
            "uncompressed" | "unchanged" | "nonpreload" | "unprotected" | "unlocked"
            | "nonpurgeable" | "appheap" => 0,
            _ => return None,
        };
        Some(value as i64)
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // Logical
    And,
    Or,
    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
    BitShl,
    BitShr,
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::BitShl => "<<",
            BinOp::BitShr => ">>",
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,    // -x
    Not,    // !x
    BitNot, // ~x
}

/// Rez pseudo-functions (`$$Name`), matched case-insensitively
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    ArrayIndex,
    Attributes,
    BitField,
    Byte,
    CountOf,
    Date,
    Day,
    Format,
    Hour,
    Id,
    Long,
    Minute,
    Month,
    Name,
    PackedSize,
    Read,
    Resource,
    ResourceSize,
    Second,
    Shell,
    Time,
    Type,
    Version,
    Weekday,
    Word,
    Year,
}

impl Builtin {
    /// Look up a pseudo-function by its spelling, with or without the `$$` prefix.
    pub fn from_name(name: &str) -> Option<Self> {
        let bare = name.strip_prefix("$$").unwrap_or(name);
        let builtin = match bare.to_ascii_lowercase().as_str() {
            "arrayindex" => Builtin::ArrayIndex,
            "attributes" => Builtin::Attributes,
            "bitfield" => Builtin::BitField,
            "byte" => Builtin::Byte,
            "countof" => Builtin::CountOf,
            "date" => Builtin::Date,
            "day" => Builtin::Day,
            "format" => Builtin::Format,
            "hour" => Builtin::Hour,
            "id" => Builtin::Id,
            "long" => Builtin::Long,
            "minute" => Builtin::Minute,
            "month" => Builtin::Month,
            "name" => Builtin::Name,
            "packedsize" => Builtin::PackedSize,
            "read" => Builtin::Read,
            "resource" => Builtin::Resource,
            "resourcesize" => Builtin::ResourceSize,
            "second" => Builtin::Second,
            "shell" => Builtin::Shell,
            "time" => Builtin::Time,
            "type" => Builtin::Type,
            "version" => Builtin::Version,
            "weekday" => Builtin::Weekday,
            "word" => Builtin::Word,
            "year" => Builtin::Year,
            _ => return None,
        };
        Some(builtin)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Builtin::ArrayIndex => "$$ArrayIndex",
            Builtin::Attributes => "$$Attributes",
            Builtin::BitField => "$$BitField",
            Builtin::Byte => "$$Byte",
            Builtin::CountOf => "$$CountOf",
            Builtin::Date => "$$Date",
            Builtin::Day => "$$Day",
            Builtin::Format => "$$Format",
            Builtin::Hour => "$$Hour",
            Builtin::Id => "$$ID",
            Builtin::Long => "$$Long",
            Builtin::Minute => "$$Minute",
            Builtin::Month => "$$Month",
            Builtin::Name => "$$Name",
            Builtin::PackedSize => "$$PackedSize",
            Builtin::Read => "$$Read",
            Builtin::Resource => "$$Resource",
            Builtin::ResourceSize => "$$ResourceSize",
            Builtin::Second => "$$Second",
            Builtin::Shell => "$$Shell",
            Builtin::Time => "$$Time",
            Builtin::Type => "$$Type",
            Builtin::Version => "$$Version",
            Builtin::Weekday => "$$Weekday",
            Builtin::Word => "$$Word",
            Builtin::Year => "$$Year",
        }
    }

    /// Number of arguments, or `None` for variadic functions.
    pub fn arity(&self) -> Option<usize> {
        match self {
            Builtin::ArrayIndex
            | Builtin::Byte
            | Builtin::CountOf
            | Builtin::Long
            | Builtin::Read
            | Builtin::Shell
            | Builtin::Word => Some(1),
            Builtin::BitField | Builtin::PackedSize => Some(3),
            Builtin::Resource => Some(4),
            Builtin::Format => None,
            _ => Some(0),
        }
    }

    /// Functions whose single argument names an array label instead of a value.
    pub fn takes_array_label(&self) -> bool {
        matches!(self, Builtin::ArrayIndex | Builtin::CountOf)
    }

    /// Functions left for the pass that lays out resource data: they need the
    /// data itself or reach outside the process.
    pub fn is_deferred(&self) -> bool {
        self.takes_array_label()
            || matches!(
                self,
                Builtin::Long
                    | Builtin::PackedSize
                    | Builtin::Read
                    | Builtin::Resource
                    | Builtin::ResourceSize
                    | Builtin::Word
            )
    }
}

/// Expressions in `#if` conditions, field defaults and resource bodies
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(BigInt, SourceLocation),
    /// Text string literal, already unescaped
    Str(Vec<u8>, SourceLocation),
    /// Hex string literal (`$"..."`)
    Bytes(Vec<u8>, SourceLocation),
    /// Bare identifier: a field label or a symbolic constant
    Symbol(String, SourceLocation),
    /// `label[i, j]`, a label declared inside nested arrays
    Subscript {
        name: String,
        indices: Vec<Expr>,
        location: SourceLocation,
    },
    /// `defined NAME` / `defined(NAME)`
    Defined(String, SourceLocation),
    Unary {
        op: UnOp,
        operand: Box<Expr>,
        location: SourceLocation,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
        location: SourceLocation,
    },
    Ternary {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
        location: SourceLocation,
    },
    /// Adjacent string expressions that are not all literals (`"v" $$Version`)
    Concat(Vec<Expr>, SourceLocation),
    Call {
        function: Builtin,
        args: Vec<Expr>,
        location: SourceLocation,
    },
}

impl Expr {
    pub fn location(&self) -> SourceLocation {
        match self {
            Expr::Int(_, loc)
            | Expr::Str(_, loc)
            | Expr::Bytes(_, loc)
            | Expr::Symbol(_, loc)
            | Expr::Defined(_, loc)
            | Expr::Concat(_, loc) => *loc,
            Expr::Subscript { location, .. }
            | Expr::Unary { location, .. }
            | Expr::Binary { location, .. }
            | Expr::Ternary { location, .. }
            | Expr::Call { location, .. } => *location,
        }
    }

    /// True when the value depends only on literals, the build clock and the
    /// current resource header, never on template labels, resource data or files.
    pub fn is_constant(&self) -> bool {
        match self {
            Expr::Int(..) | Expr::Str(..) | Expr::Bytes(..) | Expr::Defined(..) => true,
            Expr::Symbol(..) | Expr::Subscript { .. } => false,
            Expr::Unary { operand, .. } => operand.is_constant(),
            Expr::Binary { left, right, .. } => left.is_constant() && right.is_constant(),
            Expr::Ternary {
                condition,
                then_expr,
                else_expr,
                ..
            } => condition.is_constant() && then_expr.is_constant() && else_expr.is_constant(),
            Expr::Concat(parts, _) => parts.iter().all(Expr::is_constant),
            Expr::Call { function, args, .. } => {
                !function.is_deferred() && args.iter().all(Expr::is_constant)
            }
        }
    }

    /// Every label this expression mentions, including array names passed to
    /// `$$CountOf` and `$$ArrayIndex`.
    pub fn referenced_labels(&self) -> Vec<&str> {
        let mut labels = Vec::new();
        self.collect_labels(&mut labels);
        labels
    }

    fn collect_labels<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Symbol(name, _) => out.push(name),
            Expr::Subscript { name, indices, .. } => {
                out.push(name);
                indices.iter().for_each(|e| e.collect_labels(out));
            }
            Expr::Unary { operand, .. } => operand.collect_labels(out),
            Expr::Binary { left, right, .. } => {
                left.collect_labels(out);
                right.collect_labels(out);
            }
            Expr::Ternary {
                condition,
                then_expr,
                else_expr,
                ..
            } => {
                condition.collect_labels(out);
                then_expr.collect_labels(out);
                else_expr.collect_labels(out);
            }
            Expr::Concat(parts, _) => parts.iter().for_each(|e| e.collect_labels(out)),
            Expr::Call { args, .. } => args.iter().for_each(|e| e.collect_labels(out)),
            Expr::Int(..) | Expr::Str(..) | Expr::Bytes(..) | Expr::Defined(..) => {}
        }
    }
}

/// Resource ID restriction on a type template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdFilter {
    Single(i64),
    /// Inclusive range `low:high`
    Range(i64, i64),
}

impl IdFilter {
    pub fn matches(&self, id: i64) -> bool {
        match *self {
            IdFilter::Single(single) => single == id,
            IdFilter::Range(low, high) => (low..=high).contains(&id),
        }
    }
}

/// How a numeric field is displayed when decompiled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumberBase {
    Binary,
    Octal,
    #[default]
    Decimal,
    Hex,
    Literal,
}

/// Storage format of a string field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringKind {
    /// `string`: bare bytes
    Plain,
    /// `cstring`: null terminated
    C,
    /// `pstring`: 8-bit length prefix
    Pascal,
    /// `wstring`: 16-bit length prefix
    Wide,
}

/// Simple field types
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarType {
    Boolean,
    Byte,
    Integer,
    LongInt,
    Char,
    String {
        kind: StringKind,
        length: Option<Expr>,
    },
    Point,
    Rect,
}

impl ScalarType {
    /// Width in bits of the fixed-size numeric types
    pub fn bit_width(&self) -> Option<u32> {
        match self {
            ScalarType::Boolean => Some(1),
            ScalarType::Byte | ScalarType::Char => Some(8),
            ScalarType::Integer => Some(16),
            ScalarType::LongInt => Some(32),
            ScalarType::Point => Some(32),
            ScalarType::Rect => Some(64),
            ScalarType::String { .. } => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ScalarType::Byte | ScalarType::Integer | ScalarType::LongInt
        )
    }
}

/// Modifiers written in front of a field type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Modifiers {
    pub signed: bool,
    pub base: NumberBase,
    pub is_key: bool,
}

impl Default for Modifiers {
    fn default() -> Self {
        Modifiers {
            signed: true,
            base: NumberBase::Decimal,
            is_key: false,
        }
    }
}

/// `NAME = value` alternative offered by a field
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolicConstant {
    pub name: String,
    pub value: Option<Expr>,
}

/// Fixed value or named alternatives of a field (mutually exclusive)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldValue {
    pub init: Option<Expr>,
    pub constants: Vec<SymbolicConstant>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarField {
    pub ty: ScalarType,
    pub modifiers: Modifiers,
    pub value: FieldValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BitStringField {
    pub length: Expr,
    pub modifiers: Modifiers,
    pub value: FieldValue,
}

/// Named byte sequence of a `hex string` field
#[derive(Debug, Clone, PartialEq)]
pub struct NamedBytes {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// `hex string a = $"...", b = $"...";`
#[derive(Debug, Clone, PartialEq)]
pub struct HexLiteralField {
    pub length: Option<Expr>,
    pub is_key: bool,
    pub offsets: Vec<NamedBytes>,
}

impl HexLiteralField {
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.offsets
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.bytes.as_slice())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayField {
    pub wide: bool,
    /// Name usable in `$$CountOf` / `$$ArrayIndex`
    pub name: Option<String>,
    /// Fixed element count (`array [n]`)
    pub count: Option<Expr>,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub label: String,
    /// Value of the case's `key` field
    pub key: Option<Expr>,
    pub fields: Vec<Field>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchField {
    pub cases: Vec<SwitchCase>,
}

impl SwitchField {
    pub fn case(&self, label: &str) -> Option<&SwitchCase> {
        self.cases.iter().find(|c| c.label.eq_ignore_ascii_case(label))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillUnit {
    Bit,
    Nibble,
    Byte,
    Word,
    Long,
}

impl FillUnit {
    pub fn bits(&self) -> u32 {
        match self {
            FillUnit::Bit => 1,
            FillUnit::Nibble => 4,
            FillUnit::Byte => 8,
            FillUnit::Word => 16,
            FillUnit::Long => 32,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FillField {
    pub unit: FillUnit,
    pub count: Option<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignUnit {
    Nibble,
    Byte,
    Word,
    Long,
}

/// The shape of one field in a type template
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Scalar(ScalarField),
    BitString(BitStringField),
    HexLiteral(HexLiteralField),
    Array(ArrayField),
    Switch(SwitchField),
    Fill(FillField),
    Align(AlignUnit),
    /// A label followed by no field (`end: }`)
    Marker,
}

/// A field spec with its optional `label:` prefix
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub label: Option<String>,
    pub kind: FieldKind,
    pub location: SourceLocation,
}

impl Field {
    /// Scalar default/fixed value expression, if any
    pub fn init_expr(&self) -> Option<&Expr> {
        match &self.kind {
            FieldKind::Scalar(f) => f.value.init.as_ref(),
            FieldKind::BitString(f) => f.value.init.as_ref(),
            _ => None,
        }
    }
}

/// Type code plus optional ID naming one template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeKey {
    pub type_code: ResType,
    pub id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    pub type_code: ResType,
    pub id_filter: Option<IdFilter>,
    pub fields: Vec<Field>,
    pub location: SourceLocation,
}

impl TypeDef {
    /// Find a named array anywhere inside the template.
    pub fn find_array(&self, name: &str) -> Option<&ArrayField> {
        fn search<'a>(fields: &'a [Field], name: &str) -> Option<&'a ArrayField> {
            for field in fields {
                match &field.kind {
                    FieldKind::Array(array) => {
                        if array.name.as_deref() == Some(name) {
                            return Some(array);
                        }
                        if let Some(found) = search(&array.fields, name) {
                            return Some(found);
                        }
                    }
                    FieldKind::Switch(switch) => {
                        for case in &switch.cases {
                            if let Some(found) = search(&case.fields, name) {
                                return Some(found);
                            }
                        }
                    }
                    _ => {}
                }
            }
            None
        }
        search(&self.fields, name)
    }

    /// Find a field by label anywhere inside the template.
    pub fn find_label(&self, name: &str) -> Option<&Field> {
        fn search<'a>(fields: &'a [Field], name: &str) -> Option<&'a Field> {
            for field in fields {
                if field.label.as_deref() == Some(name) {
                    return Some(field);
                }
                let nested = match &field.kind {
                    FieldKind::Array(array) => search(&array.fields, name),
                    FieldKind::Switch(switch) => {
                        switch.cases.iter().find_map(|c| search(&c.fields, name))
                    }
                    _ => None,
                };
                if nested.is_some() {
                    return nested;
                }
            }
            None
        }
        search(&self.fields, name)
    }
}

/// `type 'XXXX' (id) as 'YYYY' (id);`
#[derive(Debug, Clone, PartialEq)]
pub struct AliasDef {
    pub type_code: ResType,
    pub id_filter: Option<IdFilter>,
    pub target: TypeKey,
    pub location: SourceLocation,
}

/// The `'TYPE' (id, "name", attributes)` header of a resource
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSpec {
    pub type_code: ResType,
    pub id: i64,
    pub name: Option<Vec<u8>>,
    pub attributes: ResourceAttributes,
}

/// One element of a resource body
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceValue {
    /// Expression evaluated while parsing
    Value(Value, SourceLocation),
    /// Expression that needs template labels or resource data
    Deferred(Expr),
    /// Bare identifier, resolved against the template's symbolic constants
    Symbol(String, SourceLocation),
    /// `{ a, b; c, d }`, groups separated by `;`
    Array(Vec<Vec<ResourceValue>>, SourceLocation),
    /// `CaseLabel { values }`
    Switch {
        label: String,
        values: Vec<ResourceValue>,
        location: SourceLocation,
    },
}

impl ResourceValue {
    pub fn location(&self) -> SourceLocation {
        match self {
            ResourceValue::Value(_, loc)
            | ResourceValue::Symbol(_, loc)
            | ResourceValue::Array(_, loc) => *loc,
            ResourceValue::Deferred(expr) => expr.location(),
            ResourceValue::Switch { location, .. } => *location,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            ResourceValue::Value(value, _) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDef {
    pub spec: ResourceSpec,
    pub body: Vec<ResourceValue>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataDef {
    pub spec: ResourceSpec,
    pub body: Vec<ResourceValue>,
    pub location: SourceLocation,
}

impl DataDef {
    /// Concatenated bytes of every evaluated string element in the body.
    pub fn bytes(&self) -> Option<Vec<u8>> {
        let mut out = Vec::new();
        for value in &self.body {
            out.extend_from_slice(value.as_value()?.as_bytes()?);
        }
        Some(out)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumConstant {
    pub name: String,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDef {
    pub name: Option<String>,
    pub constants: Vec<EnumConstant>,
    pub location: SourceLocation,
}

/// Which resources a `delete`, `change` or `include` statement addresses
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    Id(i64),
    Range(i64, i64),
    Name(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSelector {
    pub type_code: ResType,
    pub selector: Option<Selector>,
}

/// `read 'TYPE' (id) "path";`
#[derive(Debug, Clone, PartialEq)]
pub struct ReadDef {
    pub spec: ResourceSpec,
    pub path: Vec<u8>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IncludeSelection {
    All,
    Matching(ResourceSelector),
    AllExcept(ResType),
}

#[derive(Debug, Clone, PartialEq)]
pub enum IncludeRename {
    Type(ResType),
    Spec(ResourceSpec),
}

/// `include "file" ['TYPE' [(sel)] | not 'TYPE'] [as ...];`
#[derive(Debug, Clone, PartialEq)]
pub struct IncludeDef {
    pub path: Vec<u8>,
    pub selection: IncludeSelection,
    pub rename: Option<IncludeRename>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteDef {
    pub target: ResourceSelector,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeDef {
    pub from: ResourceSelector,
    pub to: ResourceSpec,
    pub location: SourceLocation,
}

/// Top-level statements, in source order
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    Type(TypeDef),
    Alias(AliasDef),
    Resource(ResourceDef),
    Data(DataDef),
    Enum(EnumDef),
    Read(ReadDef),
    Include(IncludeDef),
    Delete(DeleteDef),
    Change(ChangeDef),
}

impl Declaration {
    /// Location of the declaration's first token
    pub fn location(&self) -> SourceLocation {
        match self {
            Declaration::Type(d) => d.location,
            Declaration::Alias(d) => d.location,
            Declaration::Resource(d) => d.location,
            Declaration::Data(d) => d.location,
            Declaration::Enum(d) => d.location,
            Declaration::Read(d) => d.location,
            Declaration::Include(d) => d.location,
            Declaration::Delete(d) => d.location,
            Declaration::Change(d) => d.location,
        }
    }
}
