use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spritebox_core::json::ParseError;
use spritebox_core::msg::{MAX_STACK_DEPTH, MsgBuffer, Value, Writer};
use spritebox_core::var::Var;

const DOC: &str = r#"{"items":[{"id":"hero_idle_frame_01","x":2,"w":16,"blob":"a string longer than fourteen bytes"},
    {"id":"t","f":0.5,"n":-9007199254740993,"ok":true,"z":null}],"meta":{"w":512,"list":[1,2.5,"x",[],{}]}}"#;

/// Touches every read path of a buffer; none of them may panic.
fn exercise(v: Value<'_>) {
    let _ = v.to_json();
    let _ = Var::from_msg(v);
    let same = v;
    let _ = v == same;
    let _ = (v.size(), v.get(0i64), v.get_number(0.0), v.str(), v.data());
    let _ = (v.first(), v.last(), v.next(), v.at(3), v.get_item("id"));
    for e in v.elements().take(64) {
        let _ = (e.get(0i32), e.get(0f32), e.get(false), e.str());
    }
    for (k, e) in v.members().take(64) {
        let _ = (k.str(), e.size());
    }
    let mut w = Writer::new();
    w.begin_array().copy(v).end_array();
    assert_eq!(w.depth(), 0);
}

fn nested_headers(levels: usize) -> Vec<u8> {
    // array header, span 0x7FFFFFFF, one child
    let mut bytes = Vec::with_capacity(levels * 9);
    for _ in 0..levels {
        bytes.extend_from_slice(&[0x89, 0xFF, 0xFF, 0xFF, 0x7F, 1, 0, 0, 0]);
    }
    bytes
}

#[test]
fn truncated_buffers_degrade() {
    let full = MsgBuffer::from_json(DOC).unwrap();
    let bytes = full.as_bytes();
    for len in 0..bytes.len() {
        let cut = MsgBuffer::from_bytes(bytes[..len].to_vec());
        exercise(cut.value());
    }
    exercise(full.value());
}

#[test]
fn random_bytes_degrade() {
    let mut rng = StdRng::seed_from_u64(0xbad_b0f);
    for _ in 0..2000 {
        let len = rng.gen_range(0..96);
        let bytes: Vec<u8> = (0..len).map(|_| rng.r#gen::<u8>()).collect();
        exercise(MsgBuffer::from_bytes(bytes).value());
    }

    let full = MsgBuffer::from_json(DOC).unwrap();
    for _ in 0..500 {
        let mut bytes = full.as_bytes().to_vec();
        for _ in 0..rng.gen_range(1..4) {
            let i = rng.gen_range(0..bytes.len());
            bytes[i] = rng.r#gen();
        }
        exercise(MsgBuffer::from_bytes(bytes).value());
    }
}

#[test]
fn deep_buffers_are_refused_not_recursed() {
    let buf = MsgBuffer::from_bytes(nested_headers(200_000));
    assert_eq!(buf.to_json(), None);
    assert_eq!(
        Var::from_msg(buf.value()),
        Err(ParseError::UnexpectedCharacter)
    );
    let (a, b) = (buf.value(), buf.value());
    assert!(a != b);
    exercise(buf.value());
}

#[test]
fn nesting_at_the_limit_still_reads() {
    let text = "[".repeat(MAX_STACK_DEPTH) + &"]".repeat(MAX_STACK_DEPTH);
    let buf = MsgBuffer::from_json(&text).unwrap();
    assert_eq!(buf.to_json().as_deref(), Some(text.as_str()));
    let v = Var::from_msg(buf.value()).unwrap();
    assert_eq!(v.to_json(), text);
    let (a, b) = (buf.value(), buf.value());
    assert!(a == b);
}
