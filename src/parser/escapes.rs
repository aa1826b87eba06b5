//! Escape-sequence decoding for string and character literals
//!
//! Rez follows the classic Mac OS convention where `\r` is a line feed and `\n`
//! is a carriage return. Numeric escapes always produce exactly one byte:
//!
//! | form          | digits                          |
//! |---------------|---------------------------------|
//! | `\0B` `\0b`   | 8 binary                        |
//! | `\0D` `\0d`   | 3 decimal                       |
//! | `\0X` `\0x`   | 2 hex                           |
//! | `\$`          | 2 hex                           |
//! | `\0`..`\3`    | 3 octal, counting the first one |
//!
//! Any other escaped character stands for itself.

/// Why an escape sequence could not be decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscapeError {
    pub sequence: String,
    pub reason: String,
}

impl EscapeError {
    fn new(sequence: &[char], reason: &str) -> Self {
        EscapeError {
            sequence: sequence.iter().collect(),
            reason: reason.to_string(),
        }
    }
}

/// Decode the body of a string literal (without the surrounding quotes).
pub fn unescape(raw: &str) -> Result<Vec<u8>, EscapeError> {
    let chars: Vec<char> = raw.chars().collect();
    let mut out = Vec::with_capacity(chars.len());
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        if ch != '\\' {
            push_char(&mut out, ch);
            i += 1;
            continue;
        }

        let Some(&next) = chars.get(i + 1) else {
            return Err(EscapeError::new(&chars[i..], "backslash at end of literal"));
        };

        match next {
            '0' => match chars.get(i + 2) {
                Some('b' | 'B') => {
                    out.push(fixed_digits(&chars, i, i + 3, 8, 2)?);
                    i += 11;
                }
                Some('d' | 'D') => {
                    out.push(fixed_digits(&chars, i, i + 3, 3, 10)?);
                    i += 6;
                }
                Some('x' | 'X') => {
                    out.push(fixed_digits(&chars, i, i + 3, 2, 16)?);
                    i += 5;
                }
                _ => {
                    out.push(fixed_digits(&chars, i, i + 1, 3, 8)?);
                    i += 4;
                }
            },
            '1'..='3' => {
                out.push(fixed_digits(&chars, i, i + 1, 3, 8)?);
                i += 4;
            }
            '$' => {
                out.push(fixed_digits(&chars, i, i + 2, 2, 16)?);
                i += 4;
            }
            _ => {
                match simple_escape(next) {
                    Some(byte) => out.push(byte),
                    None => push_char(&mut out, next),
                }
                i += 2;
            }
        }
    }

    Ok(out)
}

/// Single-character escapes. Note the swapped `\r` and `\n`.
fn simple_escape(ch: char) -> Option<u8> {
    let byte = match ch {
        't' => 0x09,
        'b' => 0x08,
        'r' => 0x0A,
        'n' => 0x0D,
        'f' => 0x0C,
        'v' => 0x0B,
        '?' => 0x7F,
        '\\' => b'\\',
        '\'' => b'\'',
        '"' => b'"',
        _ => return None,
    };
    Some(byte)
}

/// Read exactly `count` digits of `radix` starting at `start`; the escape began at `escape_start`.
fn fixed_digits(
    chars: &[char],
    escape_start: usize,
    start: usize,
    count: usize,
    radix: u32,
) -> Result<u8, EscapeError> {
    let end = start + count;
    if end > chars.len() {
        return Err(EscapeError::new(
            &chars[escape_start..],
            &format!("expected {} digits", count),
        ));
    }

    let sequence = &chars[escape_start..end];
    let mut value: u32 = 0;
    for &digit in &chars[start..end] {
        let Some(d) = digit.to_digit(radix) else {
            return Err(EscapeError::new(
                sequence,
                &format!("'{}' is not a base-{} digit", digit, radix),
            ));
        };
        value = value * radix + d;
    }

    u8::try_from(value).map_err(|_| EscapeError::new(sequence, "value does not fit in a byte"))
}

/// Source text is UTF-8; characters outside ASCII keep their UTF-8 encoding.
fn push_char(out: &mut Vec<u8>, ch: char) {
    let mut buf = [0u8; 4];
    out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_escapes() {
        let bytes = unescape(r#"\t\b\r\n\f\v\?\\\'\""#).unwrap();
        assert_eq!(
            bytes,
            vec![0x09, 0x08, 0x0A, 0x0D, 0x0C, 0x0B, 0x7F, b'\\', b'\'', b'"']
        );
    }

    #[test]
    fn test_numeric_escapes() {
        let bytes = unescape(r"\0B00101010\052\0D042\0X2a\$2a").unwrap();
        assert_eq!(bytes, vec![0x2A; 5]);
    }

    #[test]
    fn test_lowercase_radix_markers() {
        assert_eq!(unescape(r"\0b11111111\0d255\0xff").unwrap(), vec![0xFF; 3]);
    }

    #[test]
    fn test_non_numeric_digit_escape_is_literal() {
        // \4 is not an octal escape, so the digits pass through unchanged
        assert_eq!(unescape(r"\499").unwrap(), b"499".to_vec());
    }

    #[test]
    fn test_octal_escape_counts_first_digit() {
        assert_eq!(unescape(r"\377").unwrap(), vec![0xFF]);
        assert_eq!(unescape(r"\1010").unwrap(), vec![0x41, b'0']);
    }

    #[test]
    fn test_decimal_escape_overflow() {
        let err = unescape(r"\0D300").unwrap_err();
        assert_eq!(err.sequence, r"\0D300");
        assert_eq!(err.reason, "value does not fit in a byte");
    }

    #[test]
    fn test_invalid_digit_run() {
        let err = unescape(r"\0B0010201x").unwrap_err();
        assert!(err.reason.contains("base-2"));

        let err = unescape(r"\$g0").unwrap_err();
        assert!(err.reason.contains("base-16"));

        let err = unescape(r"\089").unwrap_err();
        assert!(err.reason.contains("base-8"));
    }

    #[test]
    fn test_truncated_escape() {
        let err = unescape(r"\0X2").unwrap_err();
        assert_eq!(err.reason, "expected 2 digits");
        assert!(unescape("abc\\").is_err());
    }

    #[test]
    fn test_unknown_escape_stands_for_itself() {
        assert_eq!(unescape(r"\q\%").unwrap(), b"q%".to_vec());
    }

    #[test]
    fn test_utf8_passthrough() {
        assert_eq!(unescape("é").unwrap(), "é".as_bytes().to_vec());
    }
}
