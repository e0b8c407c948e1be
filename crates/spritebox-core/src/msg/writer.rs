use super::{Node, Tag, Value};

/// Maximum number of simultaneously open arrays/objects.
pub const MAX_STACK_DEPTH: usize = 128;

/// Longest string stored inline as an `Id` node.
const MAX_ID_LEN: usize = 14;

#[derive(Debug, Clone, Copy, Default)]
struct Frame {
    /// Offset of the span/count words of the open container.
    offset: usize,
    /// Node count when the container was opened.
    nodes: usize,
}

/// Append-only encoder for tagged buffers.
///
/// Containers are opened and closed explicitly; closing one back-patches its
/// span and child count. Mismatched or unbalanced calls are programming
/// errors and panic.
#[derive(Debug, Clone)]
pub struct Writer {
    target: Vec<u8>,
    nodes: usize,
    stack: [Frame; MAX_STACK_DEPTH],
    depth: usize,
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer {
    pub fn new() -> Self {
        Self {
            target: Vec::new(),
            nodes: 0,
            stack: [Frame::default(); MAX_STACK_DEPTH],
            depth: 0,
        }
    }

    pub fn clear(&mut self) -> &mut Self {
        self.target.clear();
        self.nodes = 0;
        self.depth = 0;
        self
    }

    /// Bytes written so far, without the closed-document check.
    pub fn len(&self) -> usize {
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    /// Number of open containers.
    pub fn depth(&self) -> usize {
        self.depth
    }

    fn write_node(&mut self, tag: Tag, size: u8) {
        self.target.push(Node::new(tag, size).to_byte());
        self.nodes += 1;
    }

    fn write_u32(&mut self, v: u32) {
        self.target.extend_from_slice(&v.to_le_bytes());
    }

    fn push_frame(&mut self) {
        assert!(
            self.depth < MAX_STACK_DEPTH,
            "writer stack overflow: more than {MAX_STACK_DEPTH} open containers"
        );
        self.stack[self.depth] = Frame {
            offset: self.target.len(),
            nodes: self.nodes,
        };
        self.depth += 1;
        self.write_u32(0);
        self.write_u32(0);
    }

    fn close(&mut self, tag: Tag) -> &mut Self {
        assert!(self.depth > 0, "writer stack underflow: no open container");
        self.depth -= 1;
        let frame = self.stack[self.depth];
        let opened = Node::from_byte(self.target[frame.offset - 1]).map(|n| n.tag);
        assert_eq!(opened, Some(tag), "mismatched end of container");

        self.target.push(Node::new(Tag::End, 0).to_byte());
        let span = self.target.len() - frame.offset - 8;
        let count = self.nodes - frame.nodes;
        let span = to_u32(span, "container span");
        let count32 = to_u32(count, "container node count");
        self.target[frame.offset..frame.offset + 4].copy_from_slice(&span.to_le_bytes());
        self.target[frame.offset + 4..frame.offset + 8].copy_from_slice(&count32.to_le_bytes());
        self.nodes -= count;
        self
    }

    pub fn begin_array(&mut self) -> &mut Self {
        self.write_node(Tag::Array, 8);
        self.push_frame();
        self
    }

    pub fn end_array(&mut self) -> &mut Self {
        self.close(Tag::Array)
    }

    pub fn begin_object(&mut self) -> &mut Self {
        self.write_node(Tag::Object, 8);
        self.push_frame();
        self
    }

    pub fn end_object(&mut self) -> &mut Self {
        self.close(Tag::Object)
    }

    /// Writes a scalar using the narrowest node that holds it.
    pub fn value<V: WriteValue>(&mut self, v: V) -> &mut Self {
        v.write_to(self);
        self
    }

    pub fn null(&mut self) -> &mut Self {
        self.write_node(Tag::Null, 0);
        self
    }

    pub fn key(&mut self, k: &str) -> &mut Self {
        self.str_value(k)
    }

    pub fn member<V: WriteValue>(&mut self, k: &str, v: V) -> &mut Self {
        self.key(k).value(v)
    }

    pub fn bool_value(&mut self, v: bool) -> &mut Self {
        self.write_node(if v { Tag::True } else { Tag::False }, 0);
        self
    }

    pub fn i32_value(&mut self, v: i32) -> &mut Self {
        self.write_node(Tag::Int, 4);
        self.target.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn i64_value(&mut self, v: i64) -> &mut Self {
        self.write_node(Tag::Int, 8);
        self.target.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn f32_value(&mut self, v: f32) -> &mut Self {
        self.write_node(Tag::Float, 4);
        self.target.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn f64_value(&mut self, v: f64) -> &mut Self {
        self.write_node(Tag::Float, 8);
        self.target.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn str_value(&mut self, v: &str) -> &mut Self {
        let bytes = v.as_bytes();
        if bytes.len() <= MAX_ID_LEN {
            self.write_node(Tag::Id, bytes.len() as u8 + 1);
        } else {
            self.write_node(Tag::String, 4);
            self.write_u32(to_u32(bytes.len() + 1, "string length"));
        }
        self.target.extend_from_slice(bytes);
        self.target.push(0);
        self
    }

    pub fn data_value(&mut self, bytes: &[u8]) -> &mut Self {
        self.write_node(Tag::Data, 4);
        self.write_u32(to_u32(bytes.len(), "data length"));
        self.target.extend_from_slice(bytes);
        self
    }

    /// Re-encodes `v` (and its subtree) with identical tags and sizes.
    /// Undefined nodes are skipped. Containers that would exceed
    /// [`MAX_STACK_DEPTH`] open containers are written as null.
    pub fn copy(&mut self, v: Value<'_>) -> &mut Self {
        let node = v.node();
        match node.tag {
            Tag::Array | Tag::Object if self.depth >= MAX_STACK_DEPTH => self.null(),
            Tag::Null => self.null(),
            Tag::True => self.bool_value(true),
            Tag::False => self.bool_value(false),
            Tag::Int if node.size == 4 => self.i32_value(v.get(0i32)),
            Tag::Int => self.i64_value(v.get(0i64)),
            Tag::Float if node.size == 4 => self.f32_value(v.get(0f32)),
            Tag::Float => self.f64_value(v.get(0f64)),
            Tag::Id | Tag::String => self.str_value(v.str()),
            Tag::Data => self.data_value(v.data().unwrap_or_default()),
            Tag::Array => {
                self.begin_array();
                for e in v.elements() {
                    self.copy(e);
                }
                self.end_array()
            }
            Tag::Object => {
                self.begin_object();
                for (k, e) in v.members() {
                    self.key(k.str()).copy(e);
                }
                self.end_object()
            }
            Tag::End => self,
        }
    }

    fn assert_finished(&self) {
        assert!(self.depth == 0, "missing end_array or end_object");
        assert!(self.nodes == 1, "buffer must hold exactly one root node");
    }

    /// The finished buffer. Panics while containers are open or when the
    /// buffer does not hold exactly one root.
    pub fn data(&self) -> &[u8] {
        self.assert_finished();
        &self.target
    }

    /// Root value of the finished buffer.
    pub fn root(&self) -> Value<'_> {
        Value::new(self.data())
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.assert_finished();
        self.target
    }
}

fn to_u32(n: usize, what: &str) -> u32 {
    assert!(n <= u32::MAX as usize, "{what} exceeds u32 range");
    n as u32
}

/// Scalars accepted by [`Writer::value`].
pub trait WriteValue {
    fn write_to(self, w: &mut Writer);
}

impl WriteValue for () {
    fn write_to(self, w: &mut Writer) {
        w.null();
    }
}

impl WriteValue for bool {
    fn write_to(self, w: &mut Writer) {
        w.bool_value(self);
    }
}

macro_rules! write_value_small_int {
    ($($t:ty),*) => {$(
        impl WriteValue for $t {
            fn write_to(self, w: &mut Writer) {
                w.i32_value(i32::from(self));
            }
        }
    )*};
}

write_value_small_int!(i8, i16, i32, u8, u16);

macro_rules! write_value_wide_int {
    ($($t:ty),*) => {$(
        impl WriteValue for $t {
            fn write_to(self, w: &mut Writer) {
                if let Ok(v) = i32::try_from(self) {
                    w.i32_value(v);
                } else if let Ok(v) = i64::try_from(self) {
                    w.i64_value(v);
                } else {
                    // Above i64::MAX: keep the bit pattern.
                    w.i64_value(self as i64);
                }
            }
        }
    )*};
}

write_value_wide_int!(u32, u64, usize);

impl WriteValue for i64 {
    fn write_to(self, w: &mut Writer) {
        match i32::try_from(self) {
            Ok(v) => w.i32_value(v),
            Err(_) => w.i64_value(self),
        };
    }
}

impl WriteValue for f32 {
    fn write_to(self, w: &mut Writer) {
        w.f32_value(self);
    }
}

impl WriteValue for f64 {
    fn write_to(self, w: &mut Writer) {
        w.f64_value(self);
    }
}

impl WriteValue for &str {
    fn write_to(self, w: &mut Writer) {
        w.str_value(self);
    }
}

impl WriteValue for &String {
    fn write_to(self, w: &mut Writer) {
        w.str_value(self);
    }
}

impl WriteValue for String {
    fn write_to(self, w: &mut Writer) {
        w.str_value(&self);
    }
}
