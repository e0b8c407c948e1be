use super::{Repr, Var};
use crate::json::ParseError;
use crate::msg::{MAX_STACK_DEPTH, Tag, Value, Writer};

impl Var {
    /// Converts a tagged-buffer subtree. `Data` blobs and undefined nodes
    /// have no variant form and fail with [`ParseError::ExpectingValue`];
    /// nesting past [`MAX_STACK_DEPTH`] containers fails with
    /// [`ParseError::UnexpectedCharacter`], as it does for JSON text.
    pub fn from_msg(v: Value<'_>) -> Result<Var, ParseError> {
        Self::from_msg_at(v, 0)
    }

    fn from_msg_at(v: Value<'_>, depth: usize) -> Result<Var, ParseError> {
        let node = v.node();
        if matches!(node.tag, Tag::Array | Tag::Object) && depth >= MAX_STACK_DEPTH {
            return Err(ParseError::UnexpectedCharacter);
        }
        Ok(match node.tag {
            Tag::Null => Var::null(),
            Tag::True => Var::from(true),
            Tag::False => Var::from(false),
            Tag::Int => match node.size {
                4 => Var::from(v.get(0i32)),
                8 => Var::from(v.get(0i64)),
                _ => return Err(ParseError::InvalidNumber),
            },
            Tag::Float => match node.size {
                4 => Var::from(v.get(0f32)),
                8 => Var::from(v.get(0f64)),
                _ => return Err(ParseError::InvalidNumber),
            },
            Tag::Id | Tag::String => Var::from(v.str()),
            Tag::Array => {
                let mut out = Var::array();
                for e in v.elements() {
                    out.push_back(Self::from_msg_at(e, depth + 1)?);
                }
                out
            }
            Tag::Object => {
                let mut out = Var::object();
                for (k, e) in v.members() {
                    out.push_member(k.str(), Self::from_msg_at(e, depth + 1)?);
                }
                out
            }
            Tag::Data | Tag::End => return Err(ParseError::ExpectingValue),
        })
    }

    /// Appends this tree to `out`. Undefined values, functions and containers
    /// past the writer's depth limit are written as null and make the result
    /// `false`.
    pub fn to_msg(&self, out: &mut Writer) -> bool {
        match &self.0 {
            Repr::Array(_) | Repr::Object(_) if out.depth() >= MAX_STACK_DEPTH => {
                out.null();
                false
            }
            Repr::Undefined(_) | Repr::Function(_) => {
                out.null();
                false
            }
            Repr::Null => {
                out.null();
                true
            }
            Repr::Bool(b) => {
                out.bool_value(*b);
                true
            }
            Repr::Int32(v) => {
                out.i32_value(*v);
                true
            }
            Repr::Int64(v) => {
                out.i64_value(*v);
                true
            }
            Repr::Float32(v) => {
                out.f32_value(*v);
                true
            }
            Repr::Float64(v) => {
                out.f64_value(*v);
                true
            }
            Repr::Id(_) | Repr::String(_) => {
                out.str_value(self.str());
                true
            }
            Repr::Array(a) => {
                let mut ok = true;
                out.begin_array();
                for item in a.borrow().iter() {
                    ok &= item.to_msg(out);
                }
                out.end_array();
                ok
            }
            Repr::Object(o) => {
                let mut ok = true;
                out.begin_object();
                for (k, v) in o.borrow().iter() {
                    out.key(k.str());
                    ok &= v.to_msg(out);
                }
                out.end_object();
                ok
            }
        }
    }
}
