use super::Writer;
use crate::json::{self, JsonSink, ParseError};

impl JsonSink for Writer {
    fn null(&mut self) {
        Writer::null(self);
    }
    fn boolean(&mut self, v: bool) {
        self.bool_value(v);
    }
    fn integer(&mut self, v: i64) {
        self.value(v);
    }
    fn float(&mut self, v: f64) {
        self.f64_value(v);
    }
    fn string(&mut self, v: &str) {
        self.str_value(v);
    }
    fn begin_array(&mut self) {
        Writer::begin_array(self);
    }
    fn end_array(&mut self) {
        Writer::end_array(self);
    }
    fn begin_object(&mut self) {
        Writer::begin_object(self);
    }
    fn end_object(&mut self) {
        Writer::end_object(self);
    }
}

/// Parses `text` into `out`. On error the writer is cleared.
pub(crate) fn parse_into(text: &str, out: &mut Writer) -> Result<(), ParseError> {
    out.clear();
    let result = json::parse(text, &mut *out);
    if result.is_err() {
        out.clear();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msg::{MsgBuffer, Tag};

    fn parse(text: &str) -> Result<MsgBuffer, ParseError> {
        let mut w = Writer::new();
        parse_into(text, &mut w)?;
        Ok(MsgBuffer::from(w))
    }

    #[test]
    fn parses_nested_document() {
        let doc = parse(r#" { "a": [1, 2.5, "x"], "b": { "c": null, "d": true } } "#).unwrap();
        let root = doc.value();
        assert!(root.is_object());
        assert_eq!(root.size(), 2);
        let a = root.get_item("a");
        assert_eq!(a.size(), 3);
        assert_eq!(a.at(0).get(0i32), 1);
        assert_eq!(a.at(1).get(0f64), 2.5);
        assert_eq!(a.at(2).str(), "x");
        assert!(root.get_item("b").get_item("c").is_null());
        assert!(root.get_item("b").get_item("d").get(false));
        assert!(root.get_item("missing").is_undefined());
    }

    #[test]
    fn int_and_float_are_distinct() {
        let doc = parse("[5, 5.0, 5e0]").unwrap();
        let tags: Vec<_> = doc.value().elements().map(|v| v.tag()).collect();
        assert_eq!(tags, vec![Tag::Int, Tag::Float, Tag::Float]);
        assert_eq!(doc.value().at(0).get(0f64), 0.0);
        assert_eq!(doc.value().at(0).get_number(0.0), 5.0);
    }

    #[test]
    fn escapes_and_surrogates() {
        let doc = parse(r#"["\"\\\/\b\f\n\r\t", "\u00e9\u4e2d", "\ud83d\ude00"]"#).unwrap();
        let v = doc.value();
        assert_eq!(v.at(0).str(), "\"\\/\u{8}\u{c}\n\r\t");
        assert_eq!(v.at(1).str(), "é中");
        assert_eq!(v.at(2).str(), "😀");
    }

    #[test]
    fn duplicate_keys_are_kept() {
        let doc = parse(r#"{"k": 1, "k": 2}"#).unwrap();
        let v = doc.value();
        assert_eq!(v.size(), 2);
        assert_eq!(v.get_item("k").get(0), 1);
        let all: Vec<i32> = v.members().map(|(_, x)| x.get(0)).collect();
        assert_eq!(all, vec![1, 2]);
    }

    #[test]
    fn error_taxonomy() {
        let cases: &[(&str, ParseError)] = &[
            ("{1:2}", ParseError::ExpectingString),
            ("{\"a\":1,}", ParseError::ExpectingString),
            ("", ParseError::ExpectingValue),
            ("[1,]", ParseError::ExpectingValue),
            ("-x", ParseError::ExpectingValue),
            ("@", ParseError::ExpectingValue),
            ("tru", ParseError::InvalidLiteralName),
            ("nulL", ParseError::InvalidLiteralName),
            ("1.e5", ParseError::InvalidNumber),
            ("\"a\u{1}b\"", ParseError::InvalidStringChar),
            ("\"unterminated", ParseError::InvalidStringChar),
            ("\"\\q\"", ParseError::InvalidStringEscape),
            ("\"\\u12G4\"", ParseError::InvalidStringEscape),
            ("\"\\ud800\"", ParseError::InvalidSurrogatePair),
            ("\"\\ud800\\u0041\"", ParseError::InvalidSurrogatePair),
            ("\"\\udc00\"", ParseError::InvalidSurrogatePair),
            ("{\"a\" 1}", ParseError::MissingColon),
            ("[1 2]", ParseError::MissingCommaOrBracket),
            ("{\"a\":1 \"b\":2}", ParseError::MissingCommaOrBracket),
            ("[1,2", ParseError::MissingCommaOrBracket),
            ("1 2", ParseError::UnexpectedCharacter),
            ("{} x", ParseError::UnexpectedCharacter),
        ];
        for (text, expected) in cases {
            assert_eq!(parse(text).err(), Some(*expected), "input {text:?}");
        }
    }

    #[test]
    fn failed_parse_clears_writer() {
        let mut w = Writer::new();
        assert!(parse_into("[1, 2, {\"a\": ]", &mut w).is_err());
        assert!(w.is_empty());
        assert_eq!(w.depth(), 0);
    }

    #[test]
    fn excessive_nesting_is_rejected() {
        let deep = "[".repeat(json::MAX_NESTING + 1) + &"]".repeat(json::MAX_NESTING + 1);
        assert_eq!(parse(&deep).err(), Some(ParseError::UnexpectedCharacter));
        let ok = "[".repeat(json::MAX_NESTING) + &"]".repeat(json::MAX_NESTING);
        assert!(parse(&ok).is_ok());
    }

    #[test]
    fn round_trips_through_text() {
        let text = r#"{"name":"hero_idle_01","frames":[{"x":0,"y":0,"w":32,"h":48}],"scale":0.5,"tags":[],"meta":{},"on":false}"#;
        let doc = parse(text).unwrap();
        assert_eq!(doc.to_json().as_deref(), Some(text));
        let again = parse(&doc.to_json().unwrap()).unwrap();
        assert_eq!(doc.value(), again.value());
    }
}
