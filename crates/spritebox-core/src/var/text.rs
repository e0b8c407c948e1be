use super::{Repr, Var};
use crate::json;
use std::fmt::{self, Write as _};

impl Var {
    /// Compact JSON text. Non-finite floats, undefined values and functions
    /// are written as `null`.
    pub fn to_json(&self) -> String {
        let mut out = String::new();
        self.write_json(&mut out, false, 0);
        out
    }

    /// Tab-indented JSON text.
    pub fn to_json_pretty(&self) -> String {
        let mut out = String::new();
        self.write_json(&mut out, true, 0);
        out
    }

    fn write_json(&self, out: &mut String, pretty: bool, indent: usize) {
        match &self.0 {
            Repr::Undefined(_) | Repr::Null | Repr::Function(_) => out.push_str("null"),
            Repr::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Repr::Int32(v) => {
                let _ = write!(out, "{v}");
            }
            Repr::Int64(v) => {
                let _ = write!(out, "{v}");
            }
            Repr::Float32(v) => json::write_f32(out, *v),
            Repr::Float64(v) => json::write_f64(out, *v),
            Repr::Id(_) | Repr::String(_) => json::write_escaped(out, self.str()),
            Repr::Array(a) => {
                let items = a.borrow();
                if items.is_empty() {
                    out.push_str("[]");
                    return;
                }
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    newline(out, pretty, indent + 1);
                    item.write_json(out, pretty, indent + 1);
                }
                newline(out, pretty, indent);
                out.push(']');
            }
            Repr::Object(o) => {
                let members = o.borrow();
                if members.is_empty() {
                    out.push_str("{}");
                    return;
                }
                out.push('{');
                for (i, (k, v)) in members.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    newline(out, pretty, indent + 1);
                    json::write_escaped(out, k.str());
                    out.push(':');
                    v.write_json(out, pretty, indent + 1);
                }
                newline(out, pretty, indent);
                out.push('}');
            }
        }
    }
}

fn newline(out: &mut String, pretty: bool, indent: usize) {
    if pretty {
        out.push('\n');
        out.extend(std::iter::repeat_n('\t', indent));
    }
}

/// JSON text; the alternate flag (`{:#}`) selects the tab-indented form.
impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = if f.alternate() {
            self.to_json_pretty()
        } else {
            self.to_json()
        };
        f.write_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_output() {
        let mut v = Var::object();
        v.set_item("name", "hero");
        v.set_item("n", 3);
        v.set_item("f", 0.5);
        v.set_item("list", Var::from(vec![Var::from(true), Var::null()]));
        v.set_item("empty", Var::array());
        assert_eq!(
            v.to_string(),
            r#"{"name":"hero","n":3,"f":0.5,"list":[true,null],"empty":[]}"#
        );
    }

    #[test]
    fn pretty_output_uses_tabs() {
        let v = Var::parse(r#"{"a":[1,2],"b":{}}"#).unwrap();
        assert_eq!(format!("{v:#}"), "{\n\t\"a\":[\n\t\t1,\n\t\t2\n\t],\n\t\"b\":{}\n}");
    }

    #[test]
    fn non_finite_floats_become_null() {
        let v: Var = [f64::NAN, f64::INFINITY, 1.0].into_iter().collect();
        assert_eq!(v.to_json(), "[null,null,1.0]");
        assert_eq!(Var::from(f32::NEG_INFINITY).to_json(), "null");
        assert_eq!(Var::undefined().to_json(), "null");
    }

    #[test]
    fn strings_are_escaped() {
        let v = Var::from("tab\there \"q\" \u{7}");
        assert_eq!(v.to_json(), r#""tab\there \"q\" \u0007""#);
    }

    #[test]
    fn text_round_trip() {
        let text = r#"{"id":"a sprite with a long name","x":12,"y":-3,"r":45.25,"big":9007199254740993,"tags":["one","two"],"nested":{"deep":[[],{}]}}"#;
        let v = Var::parse(text).unwrap();
        assert_eq!(v.to_json(), text);
        assert_eq!(Var::parse(&v.to_json_pretty()).unwrap(), v);
    }
}
