use super::{MAX_STACK_DEPTH, Node, Tag};
use crate::json;
use std::fmt::Write as _;

static UNDEFINED: [u8; 1] = [Tag::End as u8];

/// Read cursor into a tagged buffer.
///
/// Every accessor is bounds checked: a cursor pointing past the buffer, at an
/// unknown tag, or at a truncated payload behaves as the undefined `End`
/// sentinel and typed getters return the caller's default.
#[derive(Clone, Copy)]
pub struct Value<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Value<'a> {
    /// Root value of `buf`. An empty buffer yields undefined.
    pub fn new(buf: &'a [u8]) -> Self {
        if buf.is_empty() {
            Self::undefined()
        } else {
            Self { buf, offset: 0 }
        }
    }

    pub fn undefined() -> Self {
        Self {
            buf: &UNDEFINED,
            offset: 0,
        }
    }

    fn at_offset(&self, offset: usize) -> Self {
        if offset < self.buf.len() {
            Self {
                buf: self.buf,
                offset,
            }
        } else {
            Self::undefined()
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Header of the node under the cursor.
    pub fn node(&self) -> Node {
        self.buf
            .get(self.offset)
            .and_then(|b| Node::from_byte(*b))
            .unwrap_or(Node::END)
    }

    pub fn tag(&self) -> Tag {
        self.node().tag
    }

    pub fn is_undefined(&self) -> bool {
        self.tag() == Tag::End
    }
    pub fn is_null(&self) -> bool {
        self.tag() == Tag::Null
    }
    pub fn is_bool(&self) -> bool {
        matches!(self.tag(), Tag::True | Tag::False)
    }
    pub fn is_int(&self) -> bool {
        self.tag() == Tag::Int
    }
    pub fn is_float(&self) -> bool {
        self.tag() == Tag::Float
    }
    pub fn is_number(&self) -> bool {
        matches!(self.tag(), Tag::Int | Tag::Float)
    }
    pub fn is_string(&self) -> bool {
        matches!(self.tag(), Tag::Id | Tag::String)
    }
    pub fn is_data(&self) -> bool {
        self.tag() == Tag::Data
    }
    pub fn is_array(&self) -> bool {
        self.tag() == Tag::Array
    }
    pub fn is_object(&self) -> bool {
        self.tag() == Tag::Object
    }

    fn bytes(&self, start: usize, len: usize) -> Option<&'a [u8]> {
        self.buf.get(start..start.checked_add(len)?)
    }

    fn read_u32(&self, at: usize) -> Option<u32> {
        let b = self.bytes(at, 4)?;
        Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn payload<const N: usize>(&self) -> Option<[u8; N]> {
        let b = self.bytes(self.offset + 1, N)?;
        b.try_into().ok()
    }

    fn next_offset(&self) -> Option<usize> {
        let node = self.node();
        let mut next = self.offset + usize::from(node.size) + 1;
        if node.tag.is_prefixed() {
            next = next.checked_add(self.read_u32(self.offset + 1)? as usize)?;
        }
        Some(next)
    }

    /// Cursor at the node following this one (skipping containers whole).
    pub fn next(&self) -> Value<'a> {
        match self.next_offset() {
            Some(o) => self.at_offset(o),
            None => Self::undefined(),
        }
    }

    /// First child of an array or object.
    pub fn first(&self) -> Value<'a> {
        if matches!(self.tag(), Tag::Array | Tag::Object) {
            self.at_offset(self.offset + 9)
        } else {
            Self::undefined()
        }
    }

    /// Offset of the container's closing `End` byte.
    fn end_offset(&self) -> Option<usize> {
        let span = self.read_u32(self.offset + 1)? as usize;
        (self.offset + 8).checked_add(span)
    }

    /// The closing `End` node of an array or object.
    pub fn last(&self) -> Value<'a> {
        match self.tag() {
            Tag::Array | Tag::Object => match self.end_offset() {
                Some(o) => self.at_offset(o),
                None => Self::undefined(),
            },
            _ => Self::undefined(),
        }
    }

    /// Integer payload, widened to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        let node = self.node();
        if node.tag != Tag::Int {
            return None;
        }
        match node.size {
            4 => self.payload::<4>().map(|b| i64::from(i32::from_le_bytes(b))),
            8 => self.payload::<8>().map(i64::from_le_bytes),
            _ => None,
        }
    }

    /// Float payload, widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        let node = self.node();
        if node.tag != Tag::Float {
            return None;
        }
        match node.size {
            4 => self.payload::<4>().map(|b| f64::from(f32::from_le_bytes(b))),
            8 => self.payload::<8>().map(f64::from_le_bytes),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.tag() {
            Tag::True => Some(true),
            Tag::False => Some(false),
            _ => None,
        }
    }

    /// Typed read with a default on tag mismatch.
    ///
    /// Integers convert between integer widths and floats between float
    /// widths; an integer never reads as a float or the other way around
    /// (use [`Value::get_number`] for that). Out-of-range integers give the
    /// default.
    pub fn get<T: FromValue>(&self, default: T) -> T {
        T::from_value(self).unwrap_or(default)
    }

    /// Any numeric node as `f64`.
    pub fn get_number(&self, default: f64) -> f64 {
        self.as_i64()
            .map(|v| v as f64)
            .or_else(|| self.as_f64())
            .unwrap_or(default)
    }

    pub fn as_str(&self) -> Option<&'a str> {
        let node = self.node();
        let raw = match node.tag {
            Tag::Id => {
                let len = usize::from(node.size).checked_sub(1)?;
                self.bytes(self.offset + 1, len)?
            }
            Tag::String => {
                let len = (self.read_u32(self.offset + 1)? as usize).checked_sub(1)?;
                self.bytes(self.offset + 5, len)?
            }
            _ => return None,
        };
        std::str::from_utf8(raw).ok()
    }

    /// String content, or `""` for anything else.
    pub fn str(&self) -> &'a str {
        self.as_str().unwrap_or("")
    }

    pub fn get_str(&self, default: &'a str) -> &'a str {
        self.as_str().unwrap_or(default)
    }

    /// Bytes of a `Data` node.
    pub fn data(&self) -> Option<&'a [u8]> {
        if self.tag() != Tag::Data {
            return None;
        }
        let len = self.read_u32(self.offset + 1)? as usize;
        self.bytes(self.offset + 5, len)
    }

    /// Element count of an array, member count of an object, else zero.
    pub fn size(&self) -> usize {
        match self.tag() {
            Tag::Array => self.read_u32(self.offset + 5).unwrap_or(0) as usize,
            Tag::Object => self.read_u32(self.offset + 5).unwrap_or(0) as usize / 2,
            _ => 0,
        }
    }

    /// `n`-th array element.
    pub fn at(&self, n: usize) -> Value<'a> {
        self.elements().nth(n).unwrap_or_else(Self::undefined)
    }

    /// Value of the first member named `key`.
    pub fn get_item(&self, key: &str) -> Value<'a> {
        self.members()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
            .unwrap_or_else(Self::undefined)
    }

    pub fn elements(&self) -> Elements<'a> {
        if self.is_array() {
            Elements::new(self)
        } else {
            Elements::empty()
        }
    }

    pub fn members(&self) -> Members<'a> {
        Members {
            inner: if self.is_object() {
                Elements::new(self)
            } else {
                Elements::empty()
            },
        }
    }

    /// Compact JSON text. `None` if the tree contains an undefined node or
    /// nests deeper than [`MAX_STACK_DEPTH`] containers.
    ///
    /// `Data` nodes render as `"#"` followed by upper-case hex.
    pub fn to_json(&self) -> Option<String> {
        let mut out = String::new();
        self.write_json(&mut out).then_some(out)
    }

    pub fn write_json(&self, out: &mut String) -> bool {
        self.write_json_at(out, 0)
    }

    fn write_json_at(&self, out: &mut String, depth: usize) -> bool {
        let node = self.node();
        if matches!(node.tag, Tag::Array | Tag::Object) && depth >= MAX_STACK_DEPTH {
            return false;
        }
        match node.tag {
            Tag::Null => out.push_str("null"),
            Tag::True => out.push_str("true"),
            Tag::False => out.push_str("false"),
            Tag::Int => match self.as_i64() {
                Some(v) => {
                    let _ = write!(out, "{v}");
                }
                None => return false,
            },
            Tag::Float => match (node.size, self.as_f64()) {
                (4, Some(v)) => json::write_f32(out, v as f32),
                (_, Some(v)) => json::write_f64(out, v),
                _ => return false,
            },
            Tag::Id | Tag::String => match self.as_str() {
                Some(s) => json::write_escaped(out, s),
                None => return false,
            },
            Tag::Data => {
                let Some(bytes) = self.data() else {
                    return false;
                };
                out.push_str("\"#");
                for b in bytes {
                    let _ = write!(out, "{b:02X}");
                }
                out.push('"');
            }
            Tag::Array => {
                out.push('[');
                for (i, v) in self.elements().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    if !v.write_json_at(out, depth + 1) {
                        return false;
                    }
                }
                out.push(']');
            }
            Tag::Object => {
                out.push('{');
                for (i, (k, v)) in self.members().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    json::write_escaped(out, k.str());
                    out.push(':');
                    if !v.write_json_at(out, depth + 1) {
                        return false;
                    }
                }
                out.push('}');
            }
            Tag::End => return false,
        }
        true
    }
}

/// Structural equality: same tags, sizes and payloads.
impl PartialEq for Value<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.eq_at(other, 0)
    }
}

impl Value<'_> {
    /// Containers past [`MAX_STACK_DEPTH`] never compare equal.
    fn eq_at(&self, other: &Self, depth: usize) -> bool {
        let (a, b) = (self.node(), other.node());
        if a.tag != b.tag {
            return false;
        }
        if matches!(a.tag, Tag::Array | Tag::Object) && depth >= MAX_STACK_DEPTH {
            return false;
        }
        match a.tag {
            Tag::Null | Tag::End | Tag::True | Tag::False => true,
            Tag::Int => a.size == b.size && self.as_i64() == other.as_i64(),
            Tag::Float => {
                a.size == b.size
                    && self.as_f64().map(f64::to_bits) == other.as_f64().map(f64::to_bits)
            }
            Tag::Id | Tag::String => self.as_str() == other.as_str(),
            Tag::Data => self.data() == other.data(),
            Tag::Array => {
                self.size() == other.size()
                    && self
                        .elements()
                        .zip(other.elements())
                        .all(|(x, y)| x.eq_at(&y, depth + 1))
            }
            Tag::Object => {
                self.size() == other.size()
                    && self
                        .members()
                        .zip(other.members())
                        .all(|((ka, va), (kb, vb))| {
                            ka.eq_at(&kb, depth + 1) && va.eq_at(&vb, depth + 1)
                        })
            }
        }
    }
}

impl std::fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_json() {
            Some(s) => f.write_str(&s),
            None => write!(f, "<undefined @{}>", self.offset),
        }
    }
}

/// Forward iterator over the children of a container.
#[derive(Clone)]
pub struct Elements<'a> {
    cur: Value<'a>,
    end: usize,
}

impl<'a> Elements<'a> {
    fn new(container: &Value<'a>) -> Self {
        Self {
            cur: container.first(),
            end: container.end_offset().unwrap_or(0),
        }
    }

    fn empty() -> Self {
        Self {
            cur: Value::undefined(),
            end: 0,
        }
    }
}

impl<'a> Iterator for Elements<'a> {
    type Item = Value<'a>;

    fn next(&mut self) -> Option<Value<'a>> {
        if self.cur.offset >= self.end || self.cur.is_undefined() {
            return None;
        }
        let item = self.cur;
        self.cur = item.next();
        Some(item)
    }
}

/// Forward iterator over `(key, value)` pairs of an object.
#[derive(Clone)]
pub struct Members<'a> {
    inner: Elements<'a>,
}

impl<'a> Iterator for Members<'a> {
    type Item = (Value<'a>, Value<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        let k = self.inner.next()?;
        let v = self.inner.next()?;
        Some((k, v))
    }
}

/// Conversion used by [`Value::get`].
pub trait FromValue: Sized {
    fn from_value(v: &Value<'_>) -> Option<Self>;
}

impl FromValue for bool {
    fn from_value(v: &Value<'_>) -> Option<Self> {
        v.as_bool()
    }
}

macro_rules! from_value_int {
    ($($t:ty),*) => {$(
        impl FromValue for $t {
            fn from_value(v: &Value<'_>) -> Option<Self> {
                v.as_i64().and_then(|i| <$t>::try_from(i).ok())
            }
        }
    )*};
}

from_value_int!(i8, i16, i32, u8, u16, u32, u64, usize);

impl FromValue for i64 {
    fn from_value(v: &Value<'_>) -> Option<Self> {
        v.as_i64()
    }
}

impl FromValue for f32 {
    fn from_value(v: &Value<'_>) -> Option<Self> {
        v.as_f64().map(|f| f as f32)
    }
}

impl FromValue for f64 {
    fn from_value(v: &Value<'_>) -> Option<Self> {
        v.as_f64()
    }
}

impl FromValue for String {
    fn from_value(v: &Value<'_>) -> Option<Self> {
        v.as_str().map(str::to_owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_garbage_buffers_are_undefined() {
        assert!(Value::new(&[]).is_undefined());
        let junk = [0x0Fu8, 0xFF];
        let v = Value::new(&junk);
        assert!(v.is_undefined());
        assert_eq!(v.get(7i32), 7);
        assert_eq!(v.size(), 0);
        assert_eq!(v.elements().count(), 0);
    }

    #[test]
    fn truncated_payloads_fall_back() {
        // Int with size 8 but only 2 payload bytes.
        let buf = [0x84u8, 1, 2];
        let v = Value::new(&buf);
        assert!(v.is_int());
        assert_eq!(v.get(-1i64), -1);
        // String claiming 100 bytes.
        let buf = [0x47u8, 100, 0, 0, 0, b'a'];
        let v = Value::new(&buf);
        assert_eq!(v.get_str("none"), "none");
        assert!(v.next().is_undefined());
    }

    #[test]
    fn truncated_container_stops_iteration() {
        // Array claiming a huge span, holding one Null and no End.
        let buf = [0x89u8, 0xFF, 0xFF, 0, 0, 9, 0, 0, 0, 0x00];
        let v = Value::new(&buf);
        assert_eq!(v.size(), 9);
        assert_eq!(v.elements().count(), 1);
        assert!(v.last().is_undefined());
    }
}
