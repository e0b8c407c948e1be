//! Compact self-describing binary value format.
//!
//! A document is a flat byte buffer of tagged nodes. Every node starts with a
//! one byte header: the low nibble is the [`Tag`], the high nibble the payload
//! size. Containers store their byte span and child count right after the
//! header so a reader can skip them in O(1):
//!
//! | tag      | size | payload                                            |
//! |----------|------|----------------------------------------------------|
//! | `Int`    | 4/8  | little-endian signed integer                       |
//! | `Float`  | 4/8  | little-endian IEEE-754                             |
//! | `Id`     | n+1  | `n <= 14` bytes + NUL                              |
//! | `String` | 4    | `u32` (n+1), n bytes + NUL                         |
//! | `Data`   | 4    | `u32` n, n bytes                                   |
//! | `Array`  | 8    | `u32` span, `u32` count, children, `End`           |
//! | `Object` | 8    | `u32` span, `u32` count, key/value children, `End` |
//!
//! The span counts the bytes after the span/count words, closing `End`
//! included. Object counts include keys, so an object with three members
//! has a count of six.

mod parser;
mod value;
mod writer;

pub use value::{Elements, FromValue, Members, Value};
pub use writer::{MAX_STACK_DEPTH, WriteValue, Writer};

use crate::error::Result;
use std::fmt;
use std::str::FromStr;

/// Node type, stored in the low nibble of the header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Tag {
    Null = 0,
    End = 1,
    True = 2,
    False = 3,
    Int = 4,
    Float = 5,
    Id = 6,
    String = 7,
    Data = 8,
    Array = 9,
    Object = 10,
}

impl Tag {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => Tag::Null,
            1 => Tag::End,
            2 => Tag::True,
            3 => Tag::False,
            4 => Tag::Int,
            5 => Tag::Float,
            6 => Tag::Id,
            7 => Tag::String,
            8 => Tag::Data,
            9 => Tag::Array,
            10 => Tag::Object,
            _ => return None,
        })
    }

    /// Tags whose node length is read from a `u32` after the header.
    pub fn is_prefixed(self) -> bool {
        (self as u8) >= (Tag::String as u8)
    }
}

/// Decoded node header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node {
    pub tag: Tag,
    pub size: u8,
}

impl Node {
    pub const END: Node = Node {
        tag: Tag::End,
        size: 0,
    };

    pub fn new(tag: Tag, size: u8) -> Self {
        debug_assert!(size < 16);
        Self { tag, size }
    }

    pub fn from_byte(b: u8) -> Option<Self> {
        Tag::from_u8(b & 0x0F).map(|tag| Self { tag, size: b >> 4 })
    }

    pub fn to_byte(self) -> u8 {
        (self.tag as u8) | (self.size << 4)
    }
}

/// An owned, finished tagged buffer.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct MsgBuffer {
    bytes: Vec<u8>,
}

impl MsgBuffer {
    /// Parses JSON text into a new buffer.
    pub fn from_json(text: &str) -> Result<Self> {
        let mut w = Writer::new();
        parser::parse_into(text, &mut w)?;
        Ok(Self {
            bytes: w.into_bytes(),
        })
    }

    /// Wraps raw bytes. Reads over malformed bytes degrade to undefined values.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn value(&self) -> Value<'_> {
        Value::new(&self.bytes)
    }

    pub fn to_json(&self) -> Option<String> {
        self.value().to_json()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<Writer> for MsgBuffer {
    fn from(w: Writer) -> Self {
        Self {
            bytes: w.into_bytes(),
        }
    }
}

impl FromStr for MsgBuffer {
    type Err = crate::error::SpriteBoxError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_json(s)
    }
}

impl fmt::Debug for MsgBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MsgBuffer")
            .field("len", &self.bytes.len())
            .field("root", &self.value().tag())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_nibbles() {
        let n = Node::new(Tag::Id, 6);
        assert_eq!(n.to_byte(), 0x66);
        assert_eq!(Node::from_byte(0x66), Some(n));
        assert_eq!(Node::from_byte(0x0B), None);
        assert!(Tag::String.is_prefixed());
        assert!(!Tag::Id.is_prefixed());
    }
}
