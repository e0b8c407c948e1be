use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spritebox_core::msg::{MsgBuffer, Writer};
use spritebox_core::var::Var;

const ALPHABET: &[char] = &[
    'a', 'z', 'Q', '0', ' ', '"', '\\', '/', '\n', '\t', '\u{1}', '\u{7f}', 'é', 'ß', '€', '😀',
];

fn random_text(rng: &mut StdRng) -> String {
    let len = rng.gen_range(0..24);
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())])
        .collect()
}

fn random_f64(rng: &mut StdRng) -> f64 {
    loop {
        let v = match rng.gen_range(0..3) {
            0 => f64::from_bits(rng.r#gen::<u64>()),
            1 => rng.gen_range(-1.0e6..1.0e6),
            _ => f64::from(rng.gen_range(-5000..5000)) / 1000.0,
        };
        if v.is_finite() {
            return v;
        }
    }
}

/// Random tree; `f32` leaves only when `narrow_floats` is set.
fn random_var(rng: &mut StdRng, depth: u32, narrow_floats: bool) -> Var {
    let pick = if depth == 0 {
        rng.gen_range(0..7)
    } else {
        rng.gen_range(0..9)
    };
    match pick {
        0 => Var::null(),
        1 => Var::from(rng.gen_bool(0.5)),
        2 => Var::from(rng.r#gen::<i32>()),
        3 => Var::from(rng.r#gen::<i64>()),
        4 => Var::from(random_f64(rng)),
        5 if narrow_floats => Var::from(rng.gen_range(-1.0e4f32..1.0e4)),
        5 | 6 => Var::from(random_text(rng)),
        7 => {
            let mut a = Var::array();
            for _ in 0..rng.gen_range(0..6) {
                a.push_back(random_var(rng, depth - 1, narrow_floats));
            }
            a
        }
        _ => {
            let mut o = Var::object();
            for _ in 0..rng.gen_range(0..6) {
                o.push_member(random_text(rng), random_var(rng, depth - 1, narrow_floats));
            }
            o
        }
    }
}

#[test]
fn random_trees_survive_buffer_round_trip() {
    let mut rng = StdRng::seed_from_u64(0x5eed_0001);
    for _ in 0..300 {
        let v = random_var(&mut rng, 4, true);
        let mut w = Writer::new();
        if v.is_array() || v.is_object() {
            assert!(v.to_msg(&mut w));
        } else {
            w.begin_array();
            assert!(v.to_msg(&mut w));
            w.end_array();
        }
        let buf = MsgBuffer::from(w);
        let root = buf.value();
        let back = if v.is_array() || v.is_object() {
            Var::from_msg(root).unwrap()
        } else {
            Var::from_msg(root.at(0)).unwrap()
        };
        assert_eq!(back, v, "{}", v.to_json());

        let copied = MsgBuffer::from_bytes(buf.as_bytes().to_vec());
        assert_eq!(copied.value(), buf.value());
    }
}

#[test]
fn random_trees_survive_text_round_trip() {
    let mut rng = StdRng::seed_from_u64(0x5eed_0002);
    for _ in 0..300 {
        let v = random_var(&mut rng, 4, false);
        let text = v.to_json();
        assert_eq!(Var::parse(&text).unwrap(), v, "{text}");
        assert_eq!(Var::parse(&v.to_json_pretty()).unwrap(), v);

        let buf = MsgBuffer::from_json(&text).unwrap();
        assert_eq!(buf.to_json().as_deref(), Some(text.as_str()));
    }
}

#[test]
fn doubles_round_trip_bit_exact() {
    let mut rng = StdRng::seed_from_u64(0x5eed_0003);
    for _ in 0..20_000 {
        let f = random_f64(&mut rng);
        let text = Var::from(f).to_json();
        let back = Var::parse(&text).unwrap().get_number(f64::NAN);
        assert_eq!(back.to_bits(), f.to_bits(), "{text}");

        let buf = MsgBuffer::from_json(&text).unwrap();
        assert_eq!(buf.value().get(f64::NAN).to_bits(), f.to_bits(), "{text}");
    }
    for text in ["12345.682999999999", "0.1", "1.0715660391465826e-75", "5e-324"] {
        let expected: f64 = text.parse().unwrap();
        let back = Var::parse(text).unwrap().get_number(f64::NAN);
        assert_eq!(back.to_bits(), expected.to_bits(), "{text}");
    }
}
