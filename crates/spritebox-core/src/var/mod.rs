//! Reference-counted dynamic value used as the in-memory document model.
//!
//! `Clone` on a [`Var`] is O(1): strings, arrays and objects share their heap
//! payload, and mutating a shared array or object through one handle is
//! visible through every other handle. Use [`Var::deep_clone`] to get an
//! independent tree.
//!
//! Objects are flat lists of key/value pairs. Lookups scan linearly and the
//! first matching key wins; parsed documents keep duplicate keys.

mod parse;
mod text;
mod wire;

use crate::json::ParseError;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Longest string stored inline without a heap allocation.
pub const INLINE_CAPACITY: usize = 7;

/// Native callable stored in a [`Var`].
pub type VarFn = fn(&mut Params<'_>);

/// Arguments and return slot handed to a [`VarFn`].
pub struct Params<'a> {
    pub args: &'a [Var],
    pub ret: Var,
}

/// Discriminant of a [`Var`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarTag {
    Undefined,
    Null,
    Int32,
    Int64,
    Float32,
    Float64,
    Bool,
    Function,
    Id,
    String,
    Array,
    Object,
}

#[derive(Clone, Copy)]
struct InlineStr {
    len: u8,
    bytes: [u8; INLINE_CAPACITY],
}

impl InlineStr {
    fn new(s: &str) -> Option<Self> {
        let src = s.as_bytes();
        if src.len() > INLINE_CAPACITY {
            return None;
        }
        let mut bytes = [0u8; INLINE_CAPACITY];
        bytes[..src.len()].copy_from_slice(src);
        Some(Self {
            len: src.len() as u8,
            bytes,
        })
    }

    fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes[..usize::from(self.len)]).unwrap_or("")
    }
}

type ArrayData = Rc<RefCell<Vec<Var>>>;
type ObjectData = Rc<RefCell<Vec<(Var, Var)>>>;

#[derive(Clone)]
enum Repr {
    Undefined(Option<ParseError>),
    Null,
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Bool(bool),
    Function(VarFn),
    Id(InlineStr),
    String(Rc<str>),
    Array(ArrayData),
    Object(ObjectData),
}

/// Dynamically typed, reference-counted tree value.
#[derive(Clone)]
pub struct Var(Repr);

impl Default for Var {
    fn default() -> Self {
        Self::undefined()
    }
}

impl Var {
    pub const fn undefined() -> Self {
        Var(Repr::Undefined(None))
    }

    /// Undefined value carrying the reason it could not be produced.
    pub const fn error(err: ParseError) -> Self {
        Var(Repr::Undefined(Some(err)))
    }

    pub const fn null() -> Self {
        Var(Repr::Null)
    }

    /// Empty array.
    pub fn array() -> Self {
        Var(Repr::Array(Rc::default()))
    }

    /// Empty object.
    pub fn object() -> Self {
        Var(Repr::Object(Rc::default()))
    }

    pub fn function(f: VarFn) -> Self {
        Var(Repr::Function(f))
    }

    pub fn tag(&self) -> VarTag {
        match &self.0 {
            Repr::Undefined(_) => VarTag::Undefined,
            Repr::Null => VarTag::Null,
            Repr::Int32(_) => VarTag::Int32,
            Repr::Int64(_) => VarTag::Int64,
            Repr::Float32(_) => VarTag::Float32,
            Repr::Float64(_) => VarTag::Float64,
            Repr::Bool(_) => VarTag::Bool,
            Repr::Function(_) => VarTag::Function,
            Repr::Id(_) => VarTag::Id,
            Repr::String(_) => VarTag::String,
            Repr::Array(_) => VarTag::Array,
            Repr::Object(_) => VarTag::Object,
        }
    }

    /// Parse error carried by an undefined value.
    pub fn parse_error(&self) -> Option<ParseError> {
        match self.0 {
            Repr::Undefined(e) => e,
            _ => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self.0, Repr::Undefined(_))
    }
    pub fn is_null(&self) -> bool {
        matches!(self.0, Repr::Null)
    }
    pub fn is_bool(&self) -> bool {
        matches!(self.0, Repr::Bool(_))
    }
    pub fn is_int(&self) -> bool {
        matches!(self.0, Repr::Int32(_) | Repr::Int64(_))
    }
    pub fn is_float(&self) -> bool {
        matches!(self.0, Repr::Float32(_) | Repr::Float64(_))
    }
    pub fn is_number(&self) -> bool {
        self.is_int() || self.is_float()
    }
    pub fn is_string(&self) -> bool {
        matches!(self.0, Repr::Id(_) | Repr::String(_))
    }
    pub fn is_array(&self) -> bool {
        matches!(self.0, Repr::Array(_))
    }
    pub fn is_object(&self) -> bool {
        matches!(self.0, Repr::Object(_))
    }
    pub fn is_function(&self) -> bool {
        matches!(self.0, Repr::Function(_))
    }

    /// Strong count of the shared heap payload; `None` for inline values.
    pub fn ref_count(&self) -> Option<usize> {
        match &self.0 {
            Repr::String(s) => Some(Rc::strong_count(s)),
            Repr::Array(a) => Some(Rc::strong_count(a)),
            Repr::Object(o) => Some(Rc::strong_count(o)),
            _ => None,
        }
    }

    /// True when both handles share one heap payload.
    pub fn ptr_eq(&self, other: &Var) -> bool {
        match (&self.0, &other.0) {
            (Repr::String(a), Repr::String(b)) => Rc::ptr_eq(a, b),
            (Repr::Array(a), Repr::Array(b)) => Rc::ptr_eq(a, b),
            (Repr::Object(a), Repr::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Typed read with a default on tag mismatch. Integers convert between
    /// integer widths, floats between float widths; never int to float.
    pub fn get<T: FromVar>(&self, default: T) -> T {
        T::from_var(self).unwrap_or(default)
    }

    /// Any numeric value as `f64`.
    pub fn get_number(&self, default: f64) -> f64 {
        match self.0 {
            Repr::Int32(v) => f64::from(v),
            Repr::Int64(v) => v as f64,
            Repr::Float32(v) => f64::from(v),
            Repr::Float64(v) => v,
            _ => default,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.0 {
            Repr::Id(s) => Some(s.as_str()),
            Repr::String(s) => Some(s),
            _ => None,
        }
    }

    /// String content, or `""` for anything else.
    pub fn str(&self) -> &str {
        self.as_str().unwrap_or("")
    }

    pub fn get_str<'a>(&'a self, default: &'a str) -> &'a str {
        self.as_str().unwrap_or(default)
    }

    /// Element count of an array, member count of an object, else zero.
    pub fn size(&self) -> usize {
        match &self.0 {
            Repr::Array(a) => a.borrow().len(),
            Repr::Object(o) => o.borrow().len(),
            _ => 0,
        }
    }

    /// Shared handle to the array payload, replacing a non-array value first.
    fn array_data(&mut self) -> ArrayData {
        match &self.0 {
            Repr::Array(a) => Rc::clone(a),
            _ => {
                let a = ArrayData::default();
                self.0 = Repr::Array(Rc::clone(&a));
                a
            }
        }
    }

    fn object_data(&mut self) -> ObjectData {
        match &self.0 {
            Repr::Object(o) => Rc::clone(o),
            _ => {
                let o = ObjectData::default();
                self.0 = Repr::Object(Rc::clone(&o));
                o
            }
        }
    }

    /// Appends to an array. A non-array value is replaced by an empty array first.
    pub fn push_back(&mut self, v: impl Into<Var>) {
        let v = v.into();
        self.array_data().borrow_mut().push(v);
    }

    /// Appends a member without checking for an existing key.
    /// A non-object value is replaced by an empty object first.
    pub fn push_member(&mut self, key: impl Into<Var>, v: impl Into<Var>) {
        let pair = (key.into(), v.into());
        self.object_data().borrow_mut().push(pair);
    }

    /// Overwrites the first member named `key`, or appends a new one.
    /// A non-object value is replaced by an empty object first.
    pub fn set_item(&mut self, key: &str, v: impl Into<Var>) {
        let v = v.into();
        let obj = self.object_data();
        let mut members = obj.borrow_mut();
        match members.iter_mut().find(|(k, _)| k.as_str() == Some(key)) {
            Some((_, slot)) => *slot = v,
            None => members.push((Var::from(key), v)),
        }
    }

    /// Stores `v` at array index `n`, growing the array with undefined
    /// values as needed. A non-array value is replaced by an empty array first.
    pub fn set_index(&mut self, n: usize, v: impl Into<Var>) {
        let v = v.into();
        let arr = self.array_data();
        let mut items = arr.borrow_mut();
        if items.len() <= n {
            items.resize_with(n + 1, Var::undefined);
        }
        items[n] = v;
    }

    /// Value of the first member named `key`; undefined if absent.
    pub fn get_item(&self, key: &str) -> Var {
        match &self.0 {
            Repr::Object(o) => o
                .borrow()
                .iter()
                .find(|(k, _)| k.as_str() == Some(key))
                .map(|(_, v)| v.clone())
                .unwrap_or_default(),
            _ => Var::undefined(),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        match &self.0 {
            Repr::Object(o) => o.borrow().iter().any(|(k, _)| k.as_str() == Some(key)),
            _ => false,
        }
    }

    /// `n`-th array element or `n`-th member value; undefined when out of range.
    pub fn at(&self, n: usize) -> Var {
        match &self.0 {
            Repr::Array(a) => a.borrow().get(n).cloned().unwrap_or_default(),
            Repr::Object(o) => o.borrow().get(n).map(|(_, v)| v.clone()).unwrap_or_default(),
            _ => Var::undefined(),
        }
    }

    /// Key of the `n`-th member.
    pub fn key_at(&self, n: usize) -> Var {
        match &self.0 {
            Repr::Object(o) => o.borrow().get(n).map(|(k, _)| k.clone()).unwrap_or_default(),
            _ => Var::undefined(),
        }
    }

    /// Removes every element or member, keeping the container type.
    pub fn erase_all(&mut self) {
        match &self.0 {
            Repr::Array(a) => a.borrow_mut().clear(),
            Repr::Object(o) => o.borrow_mut().clear(),
            _ => {}
        }
    }

    /// Removes the `n`-th element or member. Returns whether anything was removed.
    pub fn erase_at(&mut self, n: usize) -> bool {
        match &self.0 {
            Repr::Array(a) => {
                let mut items = a.borrow_mut();
                if n >= items.len() {
                    return false;
                }
                items.remove(n);
                true
            }
            Repr::Object(o) => {
                let mut members = o.borrow_mut();
                if n >= members.len() {
                    return false;
                }
                members.remove(n);
                true
            }
            _ => false,
        }
    }

    /// Removes the first member named `key`.
    pub fn erase_key(&mut self, key: &str) -> bool {
        let Repr::Object(o) = &self.0 else {
            return false;
        };
        let mut members = o.borrow_mut();
        match members.iter().position(|(k, _)| k.as_str() == Some(key)) {
            Some(i) => {
                members.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn elements(&self) -> Elements {
        Elements {
            items: match &self.0 {
                Repr::Array(a) => Some(Rc::clone(a)),
                _ => None,
            },
            index: 0,
        }
    }

    pub fn members(&self) -> Members {
        Members {
            members: match &self.0 {
                Repr::Object(o) => Some(Rc::clone(o)),
                _ => None,
            },
            index: 0,
        }
    }

    /// Invokes a function value. Non-functions return undefined.
    pub fn call(&self, args: &[Var]) -> Var {
        match self.0 {
            Repr::Function(f) => {
                let mut p = Params {
                    args,
                    ret: Var::undefined(),
                };
                f(&mut p);
                p.ret
            }
            _ => Var::undefined(),
        }
    }

    /// Recursive copy sharing nothing with `self`.
    pub fn deep_clone(&self) -> Var {
        match &self.0 {
            Repr::String(s) => Var(Repr::String(Rc::from(&**s))),
            Repr::Array(a) => {
                let items = a.borrow().iter().map(Var::deep_clone).collect::<Vec<_>>();
                Var(Repr::Array(Rc::new(RefCell::new(items))))
            }
            Repr::Object(o) => {
                let members = o
                    .borrow()
                    .iter()
                    .map(|(k, v)| (k.deep_clone(), v.deep_clone()))
                    .collect::<Vec<_>>();
                Var(Repr::Object(Rc::new(RefCell::new(members))))
            }
            other => Var(other.clone()),
        }
    }
}

/// Iterator over array elements. Each item is a shared handle.
pub struct Elements {
    items: Option<ArrayData>,
    index: usize,
}

impl Iterator for Elements {
    type Item = Var;

    fn next(&mut self) -> Option<Var> {
        let item = self.items.as_ref()?.borrow().get(self.index).cloned()?;
        self.index += 1;
        Some(item)
    }
}

/// Iterator over object members.
pub struct Members {
    members: Option<ObjectData>,
    index: usize,
}

impl Iterator for Members {
    type Item = (Var, Var);

    fn next(&mut self) -> Option<(Var, Var)> {
        let pair = self.members.as_ref()?.borrow().get(self.index).cloned()?;
        self.index += 1;
        Some(pair)
    }
}

impl From<()> for Var {
    fn from(_: ()) -> Self {
        Var::null()
    }
}

impl From<bool> for Var {
    fn from(v: bool) -> Self {
        Var(Repr::Bool(v))
    }
}

impl From<i32> for Var {
    fn from(v: i32) -> Self {
        Var(Repr::Int32(v))
    }
}

impl From<i64> for Var {
    fn from(v: i64) -> Self {
        Var(Repr::Int64(v))
    }
}

impl From<u32> for Var {
    fn from(v: u32) -> Self {
        match i32::try_from(v) {
            Ok(i) => Var(Repr::Int32(i)),
            Err(_) => Var(Repr::Int64(i64::from(v))),
        }
    }
}

impl From<usize> for Var {
    fn from(v: usize) -> Self {
        match i32::try_from(v) {
            Ok(i) => Var(Repr::Int32(i)),
            Err(_) => Var(Repr::Int64(v as i64)),
        }
    }
}

impl From<f32> for Var {
    fn from(v: f32) -> Self {
        Var(Repr::Float32(v))
    }
}

impl From<f64> for Var {
    fn from(v: f64) -> Self {
        Var(Repr::Float64(v))
    }
}

impl From<&str> for Var {
    fn from(s: &str) -> Self {
        match InlineStr::new(s) {
            Some(id) => Var(Repr::Id(id)),
            None => Var(Repr::String(Rc::from(s))),
        }
    }
}

impl From<&String> for Var {
    fn from(s: &String) -> Self {
        Var::from(s.as_str())
    }
}

impl From<String> for Var {
    fn from(s: String) -> Self {
        Var::from(s.as_str())
    }
}

impl From<VarFn> for Var {
    fn from(f: VarFn) -> Self {
        Var(Repr::Function(f))
    }
}

impl From<Vec<Var>> for Var {
    fn from(items: Vec<Var>) -> Self {
        Var(Repr::Array(Rc::new(RefCell::new(items))))
    }
}

impl From<ParseError> for Var {
    fn from(e: ParseError) -> Self {
        Var::error(e)
    }
}

impl<T: Into<Var>> FromIterator<T> for Var {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Var::from(iter.into_iter().map(Into::into).collect::<Vec<_>>())
    }
}

/// Conversion used by [`Var::get`].
pub trait FromVar: Sized {
    fn from_var(v: &Var) -> Option<Self>;
}

impl FromVar for bool {
    fn from_var(v: &Var) -> Option<Self> {
        match v.0 {
            Repr::Bool(b) => Some(b),
            _ => None,
        }
    }
}

macro_rules! from_var_int {
    ($($t:ty),*) => {$(
        impl FromVar for $t {
            fn from_var(v: &Var) -> Option<Self> {
                match v.0 {
                    Repr::Int32(i) => <$t>::try_from(i).ok(),
                    Repr::Int64(i) => <$t>::try_from(i).ok(),
                    _ => None,
                }
            }
        }
    )*};
}

from_var_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

impl FromVar for f32 {
    fn from_var(v: &Var) -> Option<Self> {
        match v.0 {
            Repr::Float32(f) => Some(f),
            Repr::Float64(f) => Some(f as f32),
            _ => None,
        }
    }
}

impl FromVar for f64 {
    fn from_var(v: &Var) -> Option<Self> {
        match v.0 {
            Repr::Float32(f) => Some(f64::from(f)),
            Repr::Float64(f) => Some(f),
            _ => None,
        }
    }
}

impl FromVar for String {
    fn from_var(v: &Var) -> Option<Self> {
        v.as_str().map(str::to_owned)
    }
}

/// Deep structural equality. Numbers compare by value across widths (an
/// `f32` against an `f64` at `f32` precision), strings by content whatever
/// their storage, functions by address. Undefined equals undefined.
impl PartialEq for Var {
    fn eq(&self, other: &Self) -> bool {
        use Repr::*;
        match (&self.0, &other.0) {
            (Undefined(_), Undefined(_)) | (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int32(a), Int32(b)) => a == b,
            (Int64(a), Int64(b)) => a == b,
            (Int32(a), Int64(b)) | (Int64(b), Int32(a)) => i64::from(*a) == *b,
            (Float32(a), Float32(b)) => a == b,
            (Float64(a), Float64(b)) => a == b,
            (Float32(a), Float64(b)) | (Float64(b), Float32(a)) => *a == *b as f32,
            (Function(a), Function(b)) => std::ptr::fn_addr_eq(*a, *b),
            (Id(_) | String(_), Id(_) | String(_)) => self.as_str() == other.as_str(),
            (Array(a), Array(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Object(a), Object(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            _ => false,
        }
    }
}

impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Repr::Undefined(None) => f.write_str("undefined"),
            Repr::Undefined(Some(e)) => write!(f, "undefined({e:?})"),
            Repr::Function(_) => f.write_str("function"),
            _ => fmt::Display::fmt(self, f),
        }
    }
}
