//! Rez pseudo-functions (`$$Name`) and the `printf`-style formatter shared by
//! `#printf` and `$$Format`

use super::scope::ResourceContext;
use super::value::Value;
use super::Evaluator;
use crate::constants::{MAX_FORMAT_ARGS, MAX_SHIFT_BITS};
use crate::errors::EvalError;
use crate::parser::ast::{Builtin, Expr, ResType, SourceLocation};
use chrono::{Datelike, Timelike};
use num_bigint::BigInt;
use num_traits::{One, ToPrimitive, Zero};
use tracing::trace;

impl Evaluator<'_> {
    pub(crate) fn call_builtin(
        &self,
        function: Builtin,
        args: &[Expr],
        location: SourceLocation,
    ) -> Result<Value, EvalError> {
        if let Some(expected) = function.arity() {
            if args.len() != expected {
                return Err(EvalError::Arity {
                    function: function.name().to_string(),
                    expected,
                    found: args.len(),
                    location,
                });
            }
        }

        let metadata = self.metadata;

        let value = match function {
            Builtin::CountOf | Builtin::ArrayIndex => {
                let name = array_label(&args[0])?;
                let found = if function == Builtin::CountOf {
                    self.scope.array_count(name)
                } else {
                    self.scope.array_index(name)
                };
                Value::int(found.ok_or_else(|| EvalError::UnknownIdentifier {
                    name: name.to_string(),
                    location: args[0].location(),
                })?)
            }
            // Arithmetic shift rounds toward negative infinity, like div_euclid
            Builtin::Byte => Value::Int((self.eval_int(&args[0])? + 7u32) >> 3usize),
            Builtin::BitField => {
                let value = self.eval_int(&args[0])?;
                let offset = self.eval_int(&args[1])?;
                let width = self.eval_int(&args[2])?;
                Value::Int(bitfield(&value, &offset, &width).ok_or_else(|| EvalError::Overflow {
                    operation: format!("{}({}, {}, {})", function.name(), value, offset, width),
                    location,
                })?)
            }
            Builtin::Read => {
                let path = self.eval_path(&args[0])?;
                trace!(%path, "reading file for $$Read");
                let bytes = self.reader.read_bytes(&path).map_err(|e| EvalError::Read {
                    path: path.clone(),
                    reason: e.to_string(),
                    location,
                })?;
                Value::Str(bytes)
            }
            Builtin::Resource => {
                let path = self.eval_path(&args[0])?;
                let type_code = self.eval_int(&args[1])?;
                let type_code = type_code.to_u32().map(ResType).ok_or_else(|| EvalError::OutOfRange {
                    value: type_code.to_string(),
                    what: "resource type".to_string(),
                    location: args[1].location(),
                })?;
                let id = self.eval_i64(&args[2], "resource ID")?;
                let name = self.eval_bytes(&args[3])?;
                trace!(%path, %type_code, id, "reading resource for $$Resource");
                let bytes = self
                    .reader
                    .read_resource(&path, type_code, id, &name)
                    .map_err(|e| EvalError::Read {
                        path: format!("{} ({} {})", path, type_code, id),
                        reason: e.to_string(),
                        location,
                    })?;
                Value::Str(bytes)
            }
            Builtin::Shell => {
                let name = self.eval_bytes(&args[0])?;
                let name = String::from_utf8_lossy(&name).into_owned();
                Value::Str(metadata.shell_variable(&name).unwrap_or_default().into_bytes())
            }
            Builtin::Format => {
                let Some((format, rest)) = args.split_first() else {
                    return Err(EvalError::Arity {
                        function: function.name().to_string(),
                        expected: 1,
                        found: 0,
                        location,
                    });
                };
                let format = self.eval_bytes(format)?;
                let values = rest
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                Value::Str(format_printf(&format, &values, location)?)
            }
            Builtin::Date => Value::Str(metadata.date().into_bytes()),
            Builtin::Time => Value::Str(metadata.time().into_bytes()),
            Builtin::Version => Value::Str(metadata.version().into_bytes()),
            Builtin::Year => Value::int(metadata.now().year()),
            Builtin::Month => Value::int(metadata.now().month()),
            Builtin::Day => Value::int(metadata.now().day()),
            Builtin::Hour => Value::int(metadata.now().hour()),
            Builtin::Minute => Value::int(metadata.now().minute()),
            Builtin::Second => Value::int(metadata.now().second()),
            // 1 is Sunday
            Builtin::Weekday => Value::int(metadata.now().weekday().number_from_sunday()),
            Builtin::Id | Builtin::Type | Builtin::Name | Builtin::Attributes => {
                let resource = self.current_resource(function, location)?;
                match function {
                    Builtin::Id => Value::int(resource.id),
                    Builtin::Type => Value::int(resource.type_code.0),
                    Builtin::Name => Value::Str(resource.name.clone().unwrap_or_default()),
                    _ => Value::int(resource.attributes.bits()),
                }
            }
            Builtin::ResourceSize => Value::int(self.resource_data(function, location)?.len()),
            Builtin::Word | Builtin::Long => {
                let data = self.resource_data(function, location)?;
                let start = self.eval_int(&args[0])?;
                let width = if function == Builtin::Word { 16 } else { 32 };
                Value::Int(data_bits(data, &start, width).ok_or_else(|| EvalError::Unavailable {
                    what: format!("{} bits at bit {} of the resource", width, start),
                    location,
                })?)
            }
            Builtin::PackedSize => {
                let data = self.resource_data(function, location)?;
                let start = self.eval_int(&args[0])?;
                let row_bytes = self.eval_i64(&args[1], "row length")?;
                let row_count = self.eval_i64(&args[2], "row count")?;
                let size = (start.clone() >> 3usize)
                    .to_usize()
                    .zip(usize::try_from(row_bytes).ok())
                    .zip(usize::try_from(row_count).ok())
                    .and_then(|((offset, row_bytes), row_count)| {
                        packed_size(data.get(offset..)?, row_bytes, row_count)
                    })
                    .ok_or_else(|| EvalError::Unavailable {
                        what: format!("{} packed rows at bit {} of the resource", row_count, start),
                        location,
                    })?;
                Value::int(size)
            }
        };

        Ok(value)
    }

    fn eval_path(&self, expr: &Expr) -> Result<String, EvalError> {
        let path = self.eval_bytes(expr)?;
        Ok(String::from_utf8_lossy(&path).into_owned())
    }

    fn current_resource(&self, function: Builtin, location: SourceLocation) -> Result<&ResourceContext, EvalError> {
        self.scope.resource().ok_or_else(|| EvalError::Unavailable {
            what: format!("{} outside a resource", function.name()),
            location,
        })
    }

    /// Bytes of the current resource, known only after layout
    fn resource_data(&self, function: Builtin, location: SourceLocation) -> Result<&[u8], EvalError> {
        self.current_resource(function, location)?
            .data
            .as_deref()
            .ok_or_else(|| EvalError::Unavailable {
                what: format!("{} before layout", function.name()),
                location,
            })
    }
}

fn array_label(arg: &Expr) -> Result<&str, EvalError> {
    match arg {
        Expr::Symbol(name, _) => Ok(name),
        other => Err(EvalError::TypeMismatch {
            expected: "array label".to_string(),
            found: "expression".to_string(),
            location: other.location(),
        }),
    }
}

/// `width` bits of `value` starting `offset` bits above the least significant bit
///
/// The result is never negative. Offsets below zero and widths beyond
/// [`MAX_SHIFT_BITS`] give `None`.
pub fn bitfield(value: &BigInt, offset: &BigInt, width: &BigInt) -> Option<BigInt> {
    let offset = offset.to_usize()?;
    let width = width.to_usize().filter(|&w| w <= MAX_SHIFT_BITS)?;
    let mask = (BigInt::one() << width) - 1u32;
    Some((value >> offset) & mask)
}

/// `width` bits of `data` starting `start` bits in, most significant first, as a
/// signed number
pub fn data_bits(data: &[u8], start: &BigInt, width: usize) -> Option<BigInt> {
    let start = start.to_usize()?;
    let end = start.checked_add(width)?;
    if end > data.len().checked_mul(8)? {
        return None;
    }

    let bit_at = |bit: usize| (data[bit / 8] >> (7 - bit % 8)) & 1;
    let mut value = BigInt::zero();
    for bit in start..end {
        value = (value << 1usize) + u32::from(bit_at(bit));
    }
    if width > 0 && bit_at(start) == 1 {
        value -= BigInt::one() << width;
    }
    Some(value)
}

/// Number of PackBits-compressed bytes that unpack to `row_count` rows of
/// `row_bytes` bytes each
pub fn packed_size(data: &[u8], row_bytes: usize, row_count: usize) -> Option<usize> {
    let mut pos = 0;
    for _ in 0..row_count {
        let mut unpacked = 0;
        while unpacked < row_bytes {
            let flag = *data.get(pos)? as i8;
            pos += 1;
            match flag {
                // Literal run of flag + 1 bytes
                0..=i8::MAX => {
                    let run = flag as usize + 1;
                    data.get(pos..pos + run)?;
                    pos += run;
                    unpacked += run;
                }
                // No-op
                -128 => {}
                // One byte repeated 1 - flag times
                _ => {
                    data.get(pos)?;
                    pos += 1;
                    unpacked += (1 - i16::from(flag)) as usize;
                }
            }
        }
    }
    Some(pos)
}

/// Low 32 bits in two's complement, the way a C `int` argument would see them
fn low_32_bits(n: &BigInt) -> u32 {
    (n & &BigInt::from(u32::MAX)).to_u32().unwrap_or_default()
}

/// Render `format` the way C's `printf` would for `%d %u %x %s %%`.
///
/// Integers are treated as 32-bit C ints. An `l` or `h` length modifier is accepted
/// and ignored.
pub fn format_printf(format: &[u8], args: &[Value], location: SourceLocation) -> Result<Vec<u8>, EvalError> {
    if args.len() > MAX_FORMAT_ARGS {
        return Err(EvalError::Format {
            message: format!("at most {} arguments are allowed", MAX_FORMAT_ARGS),
            location,
        });
    }

    let mut output = Vec::with_capacity(format.len());
    let mut bytes = format.iter().copied().peekable();
    let mut remaining = args.iter();

    let mut next_arg = |spec: char| {
        remaining.next().ok_or_else(|| EvalError::Format {
            message: format!("not enough arguments for %{}", spec),
            location,
        })
    };
    fn int_arg_sig<F>(f: F) -> F
    where
        F: for<'v> Fn(&'v Value, char) -> Result<&'v BigInt, EvalError>,
    {
        f
    }
    let int_arg = int_arg_sig(|value: &Value, spec: char| {
        value.as_int().ok_or_else(|| EvalError::Format {
            message: format!("%{} expects an integer, got {}", spec, value.type_name()),
            location,
        })
    });

    while let Some(b) = bytes.next() {
        if b != b'%' {
            output.push(b);
            continue;
        }

        while matches!(bytes.peek(), Some(b'l') | Some(b'h')) {
            bytes.next();
        }

        let Some(spec) = bytes.next() else {
            output.push(b'%');
            break;
        };

        match spec {
            b'%' => output.push(b'%'),
            b'd' | b'i' => {
                let n = low_32_bits(int_arg(next_arg('d')?, 'd')?);
                output.extend_from_slice((n as i32).to_string().as_bytes());
            }
            b'u' => {
                let n = low_32_bits(int_arg(next_arg('u')?, 'u')?);
                output.extend_from_slice(n.to_string().as_bytes());
            }
            b'x' => {
                let n = low_32_bits(int_arg(next_arg('x')?, 'x')?);
                output.extend_from_slice(format!("{:x}", n).as_bytes());
            }
            b's' => {
                let value = next_arg('s')?;
                let text = value.as_bytes().ok_or_else(|| EvalError::Format {
                    message: format!("%s expects a string, got {}", value.type_name()),
                    location,
                })?;
                output.extend_from_slice(text);
            }
            other => {
                return Err(EvalError::Format {
                    message: format!("unsupported format specifier %{}", other as char),
                    location,
                });
            }
        }
    }

    Ok(output)
}
