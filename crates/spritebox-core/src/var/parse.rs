use super::Var;
use crate::json::{self, JsonSink, ParseError};
use std::str::FromStr;

enum Frame {
    Array(Var),
    Object { obj: Var, key: Option<Var> },
}

/// Builds a `Var` tree from parse events.
#[derive(Default)]
struct Builder {
    stack: Vec<Frame>,
    root: Option<Var>,
}

impl Builder {
    fn emit(&mut self, v: Var) {
        match self.stack.last_mut() {
            None => self.root = Some(v),
            Some(Frame::Array(arr)) => arr.push_back(v),
            Some(Frame::Object { obj, key }) => match key.take() {
                None => *key = Some(v),
                Some(k) => obj.push_member(k, v),
            },
        }
    }

    fn close(&mut self) {
        if let Some(frame) = self.stack.pop() {
            let v = match frame {
                Frame::Array(v) | Frame::Object { obj: v, .. } => v,
            };
            self.emit(v);
        }
    }
}

impl JsonSink for Builder {
    fn null(&mut self) {
        self.emit(Var::null());
    }
    fn boolean(&mut self, v: bool) {
        self.emit(Var::from(v));
    }
    fn integer(&mut self, v: i64) {
        self.emit(match i32::try_from(v) {
            Ok(small) => Var::from(small),
            Err(_) => Var::from(v),
        });
    }
    fn float(&mut self, v: f64) {
        self.emit(Var::from(v));
    }
    fn string(&mut self, v: &str) {
        self.emit(Var::from(v));
    }
    fn begin_array(&mut self) {
        self.stack.push(Frame::Array(Var::array()));
    }
    fn end_array(&mut self) {
        self.close();
    }
    fn begin_object(&mut self) {
        self.stack.push(Frame::Object {
            obj: Var::object(),
            key: None,
        });
    }
    fn end_object(&mut self) {
        self.close();
    }
}

impl Var {
    /// Parses JSON text. Integers that fit `i32` become `Int32`, larger ones
    /// `Int64`; numbers with a fraction or exponent become `Float64`.
    pub fn parse(text: &str) -> Result<Var, ParseError> {
        let mut b = Builder::default();
        json::parse(text, &mut b)?;
        Ok(b.root.unwrap_or_default())
    }

    /// Like [`Var::parse`] but reports failure as an undefined value that
    /// carries the error (see [`Var::parse_error`]).
    pub fn from_json(text: &str) -> Var {
        Var::parse(text).unwrap_or_else(Var::error)
    }
}

impl FromStr for Var {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Var::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::var::VarTag;

    #[test]
    fn builds_nested_tree() {
        let v = Var::parse(r#"{"items":[{"id":"a","x":1},{"id":"bb","x":-2}],"ok":true,"n":null}"#)
            .unwrap();
        assert!(v.is_object());
        let items = v.get_item("items");
        assert_eq!(items.size(), 2);
        assert_eq!(items.at(1).get_item("x").get(0), -2);
        assert_eq!(items.at(0).get_item("id").str(), "a");
        assert!(v.get_item("ok").get(false));
        assert!(v.get_item("n").is_null());
    }

    #[test]
    fn integer_width_follows_magnitude() {
        let v = Var::parse("[1, 3000000000, -2147483648, 2.0]").unwrap();
        let tags: Vec<_> = v.elements().map(|e| e.tag()).collect();
        assert_eq!(
            tags,
            vec![VarTag::Int32, VarTag::Int64, VarTag::Int32, VarTag::Float64]
        );
    }

    #[test]
    fn duplicate_keys_preserved() {
        let v: Var = r#"{"a":1,"a":2}"#.parse().unwrap();
        assert_eq!(v.size(), 2);
        assert_eq!(v.get_item("a").get(0), 1);
        assert_eq!(v.at(1).get(0), 2);
    }

    #[test]
    fn failure_carries_error() {
        let v = Var::from_json("{\"a\" 1}");
        assert!(v.is_undefined());
        assert_eq!(v.parse_error(), Some(ParseError::MissingColon));
        assert_eq!(Var::parse("[1,").err(), Some(ParseError::ExpectingValue));
        assert_eq!(Var::from_json("[]").parse_error(), None);
    }
}
