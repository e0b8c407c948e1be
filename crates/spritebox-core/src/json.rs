//! JSON grammar shared by the tagged buffer and the dynamic variant.
//!
//! The parser is a single-pass recursive descent over bytes that reports
//! every token to a [`JsonSink`]. Object keys are reported through
//! [`JsonSink::string`] exactly like string values; sinks that care track
//! the key/value alternation themselves.

use std::fmt::Write as _;
use thiserror::Error;

/// Maximum nesting of arrays/objects accepted by the parser.
pub const MAX_NESTING: usize = 128;

/// JSON syntax errors. The first error aborts the parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ParseError {
    #[error("expecting a string")]
    ExpectingString,
    #[error("expecting a value")]
    ExpectingValue,
    #[error("invalid literal name")]
    InvalidLiteralName,
    #[error("invalid number")]
    InvalidNumber,
    #[error("invalid character in string")]
    InvalidStringChar,
    #[error("invalid escape sequence in string")]
    InvalidStringEscape,
    #[error("invalid surrogate pair")]
    InvalidSurrogatePair,
    #[error("missing colon")]
    MissingColon,
    #[error("missing comma or closing bracket")]
    MissingCommaOrBracket,
    #[error("unexpected character")]
    UnexpectedCharacter,
}

/// Receiver of parse events.
pub trait JsonSink {
    fn null(&mut self);
    fn boolean(&mut self, v: bool);
    fn integer(&mut self, v: i64);
    fn float(&mut self, v: f64);
    fn string(&mut self, v: &str);
    fn begin_array(&mut self);
    fn end_array(&mut self);
    fn begin_object(&mut self);
    fn end_object(&mut self);
}

/// Parsed numeric literal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

/// Byte cursor over the input text. Reading past the end yields `0`.
pub(crate) struct Stream<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Stream<'a> {
    pub(crate) fn new(src: &'a [u8]) -> Self {
        Self { src, pos: 0 }
    }

    pub(crate) fn peek(&self) -> u8 {
        self.src.get(self.pos).copied().unwrap_or(0)
    }

    pub(crate) fn getch(&mut self) -> u8 {
        let c = self.peek();
        if self.pos < self.src.len() {
            self.pos += 1;
        }
        c
    }

    /// Skips whitespace and returns the next byte without consuming it.
    pub(crate) fn skip_ws(&mut self) -> u8 {
        while matches!(self.peek(), b' ' | b'\t' | b'\n' | b'\r') {
            self.pos += 1;
        }
        self.peek()
    }

    pub(crate) fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }
}

/// Parses `text` as a single JSON value, reporting tokens to `sink`.
///
/// Trailing non-whitespace after the value is [`ParseError::UnexpectedCharacter`].
/// On error the sink may hold a partial document; callers discard it.
pub fn parse<S: JsonSink>(text: &str, sink: &mut S) -> Result<(), ParseError> {
    let mut p = Parser {
        sink,
        scratch: Vec::with_capacity(32),
        depth: 0,
    };
    let mut s = Stream::new(text.as_bytes());
    p.parse_value(&mut s)?;
    s.skip_ws();
    if !s.at_end() {
        return Err(ParseError::UnexpectedCharacter);
    }
    Ok(())
}

struct Parser<'s, S: JsonSink> {
    sink: &'s mut S,
    scratch: Vec<u8>,
    depth: usize,
}

impl<S: JsonSink> Parser<'_, S> {
    fn parse_value(&mut self, s: &mut Stream<'_>) -> Result<(), ParseError> {
        match s.skip_ws() {
            b'"' => {
                s.getch();
                self.parse_string(s)
            }
            b'f' => self.literal(s, b"false", |k| k.boolean(false)),
            b't' => self.literal(s, b"true", |k| k.boolean(true)),
            b'n' => self.literal(s, b"null", |k| k.null()),
            b'[' => {
                s.getch();
                self.enter()?;
                self.sink.begin_array();
                if s.skip_ws() != b']' {
                    loop {
                        self.parse_value(s)?;
                        if s.skip_ws() != b',' {
                            break;
                        }
                        s.getch();
                    }
                }
                if s.getch() != b']' {
                    return Err(ParseError::MissingCommaOrBracket);
                }
                self.sink.end_array();
                self.depth -= 1;
                Ok(())
            }
            b'{' => {
                s.getch();
                self.enter()?;
                self.sink.begin_object();
                if s.skip_ws() != b'}' {
                    loop {
                        if s.peek() != b'"' {
                            return Err(ParseError::ExpectingString);
                        }
                        s.getch();
                        self.parse_string(s)?;
                        if s.skip_ws() != b':' {
                            return Err(ParseError::MissingColon);
                        }
                        s.getch();
                        self.parse_value(s)?;
                        if s.skip_ws() != b',' {
                            break;
                        }
                        s.getch();
                        s.skip_ws();
                    }
                }
                if s.getch() != b'}' {
                    return Err(ParseError::MissingCommaOrBracket);
                }
                self.sink.end_object();
                self.depth -= 1;
                Ok(())
            }
            b'-' => {
                s.getch();
                if !s.peek().is_ascii_digit() {
                    return Err(ParseError::ExpectingValue);
                }
                self.emit_number(parse_number(s, true)?);
                Ok(())
            }
            c if c.is_ascii_digit() => {
                self.emit_number(parse_number(s, false)?);
                Ok(())
            }
            _ => Err(ParseError::ExpectingValue),
        }
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::UnexpectedCharacter);
        }
        self.depth += 1;
        Ok(())
    }

    fn literal(
        &mut self,
        s: &mut Stream<'_>,
        name: &[u8],
        emit: impl FnOnce(&mut S),
    ) -> Result<(), ParseError> {
        for &expected in name {
            if s.getch() != expected {
                return Err(ParseError::InvalidLiteralName);
            }
        }
        emit(&mut *self.sink);
        Ok(())
    }

    fn emit_number(&mut self, n: Number) {
        match n {
            Number::Int(v) => self.sink.integer(v),
            Number::Float(v) => self.sink.float(v),
        }
    }

    fn parse_string(&mut self, s: &mut Stream<'_>) -> Result<(), ParseError> {
        self.scratch.clear();
        parse_string_body(s, &mut self.scratch)?;
        let text =
            std::str::from_utf8(&self.scratch).map_err(|_| ParseError::InvalidStringChar)?;
        self.sink.string(text);
        Ok(())
    }
}

/// Reads four hex digits.
pub(crate) fn parse_hex(s: &mut Stream<'_>) -> Option<u32> {
    let mut v = 0u32;
    for _ in 0..4 {
        let d = (s.getch() as char).to_digit(16)?;
        v = (v << 4) | d;
    }
    Some(v)
}

/// Reads string content after the opening quote up to and including the
/// closing quote, appending UTF-8 bytes to `out`.
pub(crate) fn parse_string_body(s: &mut Stream<'_>, out: &mut Vec<u8>) -> Result<(), ParseError> {
    loop {
        let ch = s.getch();
        if ch < b' ' {
            return Err(ParseError::InvalidStringChar);
        }
        match ch {
            b'"' => return Ok(()),
            b'\\' => {
                let escaped = match s.getch() {
                    b'"' => b'"',
                    b'/' => b'/',
                    b'\\' => b'\\',
                    b'b' => 0x08,
                    b'f' => 0x0C,
                    b'n' => b'\n',
                    b'r' => b'\r',
                    b't' => b'\t',
                    b'u' => {
                        let cp = parse_unicode_escape(s)?;
                        let mut buf = [0u8; 4];
                        out.extend_from_slice(cp.encode_utf8(&mut buf).as_bytes());
                        continue;
                    }
                    _ => return Err(ParseError::InvalidStringEscape),
                };
                out.push(escaped);
            }
            _ => out.push(ch),
        }
    }
}

fn parse_unicode_escape(s: &mut Stream<'_>) -> Result<char, ParseError> {
    let hi = parse_hex(s).ok_or(ParseError::InvalidStringEscape)?;
    let cp = match hi {
        0xD800..=0xDBFF => {
            if s.getch() != b'\\' || s.getch() != b'u' {
                return Err(ParseError::InvalidSurrogatePair);
            }
            let lo = parse_hex(s).ok_or(ParseError::InvalidSurrogatePair)?;
            if !(0xDC00..=0xDFFF).contains(&lo) {
                return Err(ParseError::InvalidSurrogatePair);
            }
            0x10000 + ((hi & 0x3FF) << 10) + (lo & 0x3FF)
        }
        0xDC00..=0xDFFF => return Err(ParseError::InvalidSurrogatePair),
        _ => hi,
    };
    char::from_u32(cp).ok_or(ParseError::InvalidSurrogatePair)
}

const FAST_INT_LIMIT: u64 = 0x1999_9999_9999_9999;
const FRACTION_LIMIT: u64 = 0x1F_FFFF_FFFF_FFFF;

/// Parses a number whose first digit is the next byte (any sign already consumed).
///
/// Digits accumulate into a `u64`; once that would overflow the value
/// continues as a double and the result is a float. Floats in the `f64` range
/// are rounded correctly from the literal digits. Out of range, powers of ten
/// come from a `1e0..=1e308` table: larger exponents saturate at `1e308` and
/// very small ones flush to zero.
pub(crate) fn parse_number(s: &mut Stream<'_>, negative: bool) -> Result<Number, ParseError> {
    let start = s.pos;
    let mut int_only = true;
    let mut overflow = false;
    let mut integer: u64 = u64::from(s.getch() - b'0');
    let mut significand: f64 = 0.0;
    let mut fraction: i32 = 0;
    let mut exponent: i32 = 0;

    if integer != 0 {
        while s.peek().is_ascii_digit() && integer < FAST_INT_LIMIT {
            integer = integer * 10 + u64::from(s.getch() - b'0');
        }
    }
    if integer >= FAST_INT_LIMIT && s.peek().is_ascii_digit() {
        overflow = true;
        significand = integer as f64;
        while s.peek().is_ascii_digit() {
            significand = significand * 10.0 + f64::from(s.getch() - b'0');
        }
    }

    if s.peek() == b'.' {
        int_only = false;
        s.getch();
        if !s.peek().is_ascii_digit() {
            return Err(ParseError::InvalidNumber);
        }
        while s.peek().is_ascii_digit() && integer < FRACTION_LIMIT {
            integer = integer * 10 + u64::from(s.getch() - b'0');
            fraction -= 1;
        }
        while s.peek().is_ascii_digit() {
            s.getch();
        }
    }

    if !overflow {
        significand = integer as f64;
    }

    if s.peek() | 0x20 == b'e' {
        int_only = false;
        s.getch();
        let neg_exp = match s.peek() {
            b'-' => {
                s.getch();
                true
            }
            b'+' => {
                s.getch();
                false
            }
            _ => false,
        };
        if !s.peek().is_ascii_digit() {
            return Err(ParseError::InvalidNumber);
        }
        while s.peek().is_ascii_digit() {
            let d = i32::from(s.getch() - b'0');
            exponent = exponent.saturating_mul(10).saturating_add(d);
        }
        if neg_exp {
            exponent = -exponent;
        }
    }

    if int_only && !overflow {
        let limit = if negative {
            i64::MIN.unsigned_abs()
        } else {
            i64::MAX as u64
        };
        if integer <= limit {
            let v = if negative {
                0i64.wrapping_sub_unsigned(integer)
            } else {
                integer as i64
            };
            return Ok(Number::Int(v));
        }
    }

    let exact = std::str::from_utf8(&s.src[start..s.pos])
        .ok()
        .and_then(|digits| digits.parse::<f64>().ok())
        .filter(|v| v.is_finite());
    let value = match exact {
        Some(v) => v,
        None => scale_pow10(significand, exponent.saturating_add(fraction)),
    };
    Ok(Number::Float(if negative { -value } else { value }))
}

fn scale_pow10(mut significand: f64, mut exponent: i32) -> f64 {
    if exponent < 0 {
        if exponent < -308 {
            significand /= EXP10[308];
            exponent += 308;
        }
        if exponent < -308 {
            0.0
        } else {
            significand / EXP10[exponent.unsigned_abs() as usize]
        }
    } else {
        significand * EXP10[exponent.min(308) as usize]
    }
}

/// Writes `s` as a quoted JSON string.
pub fn write_escaped(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0C}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

/// Writes a double the way the parser reads it back; non-finite values become `null`.
pub fn write_f64(out: &mut String, v: f64) {
    if v.is_finite() {
        let _ = write!(out, "{v:?}");
    } else {
        out.push_str("null");
    }
}

pub fn write_f32(out: &mut String, v: f32) {
    if v.is_finite() {
        let _ = write!(out, "{v:?}");
    } else {
        out.push_str("null");
    }
}

#[rustfmt::skip]
static EXP10: [f64; 309] = [
    1e0, 1e1, 1e2, 1e3, 1e4, 1e5, 1e6, 1e7, 1e8, 1e9,
    1e10, 1e11, 1e12, 1e13, 1e14, 1e15, 1e16, 1e17, 1e18, 1e19,
    1e20, 1e21, 1e22, 1e23, 1e24, 1e25, 1e26, 1e27, 1e28, 1e29,
    1e30, 1e31, 1e32, 1e33, 1e34, 1e35, 1e36, 1e37, 1e38, 1e39,
    1e40, 1e41, 1e42, 1e43, 1e44, 1e45, 1e46, 1e47, 1e48, 1e49,
    1e50, 1e51, 1e52, 1e53, 1e54, 1e55, 1e56, 1e57, 1e58, 1e59,
    1e60, 1e61, 1e62, 1e63, 1e64, 1e65, 1e66, 1e67, 1e68, 1e69,
    1e70, 1e71, 1e72, 1e73, 1e74, 1e75, 1e76, 1e77, 1e78, 1e79,
    1e80, 1e81, 1e82, 1e83, 1e84, 1e85, 1e86, 1e87, 1e88, 1e89,
    1e90, 1e91, 1e92, 1e93, 1e94, 1e95, 1e96, 1e97, 1e98, 1e99,
    1e100, 1e101, 1e102, 1e103, 1e104, 1e105, 1e106, 1e107, 1e108, 1e109,
    1e110, 1e111, 1e112, 1e113, 1e114, 1e115, 1e116, 1e117, 1e118, 1e119,
    1e120, 1e121, 1e122, 1e123, 1e124, 1e125, 1e126, 1e127, 1e128, 1e129,
    1e130, 1e131, 1e132, 1e133, 1e134, 1e135, 1e136, 1e137, 1e138, 1e139,
    1e140, 1e141, 1e142, 1e143, 1e144, 1e145, 1e146, 1e147, 1e148, 1e149,
    1e150, 1e151, 1e152, 1e153, 1e154, 1e155, 1e156, 1e157, 1e158, 1e159,
    1e160, 1e161, 1e162, 1e163, 1e164, 1e165, 1e166, 1e167, 1e168, 1e169,
    1e170, 1e171, 1e172, 1e173, 1e174, 1e175, 1e176, 1e177, 1e178, 1e179,
    1e180, 1e181, 1e182, 1e183, 1e184, 1e185, 1e186, 1e187, 1e188, 1e189,
    1e190, 1e191, 1e192, 1e193, 1e194, 1e195, 1e196, 1e197, 1e198, 1e199,
    1e200, 1e201, 1e202, 1e203, 1e204, 1e205, 1e206, 1e207, 1e208, 1e209,
    1e210, 1e211, 1e212, 1e213, 1e214, 1e215, 1e216, 1e217, 1e218, 1e219,
    1e220, 1e221, 1e222, 1e223, 1e224, 1e225, 1e226, 1e227, 1e228, 1e229,
    1e230, 1e231, 1e232, 1e233, 1e234, 1e235, 1e236, 1e237, 1e238, 1e239,
    1e240, 1e241, 1e242, 1e243, 1e244, 1e245, 1e246, 1e247, 1e248, 1e249,
    1e250, 1e251, 1e252, 1e253, 1e254, 1e255, 1e256, 1e257, 1e258, 1e259,
    1e260, 1e261, 1e262, 1e263, 1e264, 1e265, 1e266, 1e267, 1e268, 1e269,
    1e270, 1e271, 1e272, 1e273, 1e274, 1e275, 1e276, 1e277, 1e278, 1e279,
    1e280, 1e281, 1e282, 1e283, 1e284, 1e285, 1e286, 1e287, 1e288, 1e289,
    1e290, 1e291, 1e292, 1e293, 1e294, 1e295, 1e296, 1e297, 1e298, 1e299,
    1e300, 1e301, 1e302, 1e303, 1e304, 1e305, 1e306, 1e307, 1e308,
];
