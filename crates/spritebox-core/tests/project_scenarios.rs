use image::{Rgba, RgbaImage};
use kurbo::{Point, Vec2};
use spritebox_core::prelude::*;

fn gradient(w: u32, h: u32, seed: u8) -> RgbaImage {
    RgbaImage::from_fn(w, h, |x, y| {
        Rgba([seed, (x * 7) as u8, (y * 13) as u8, 255 - seed])
    })
}

#[test]
fn open_crops_sprites_from_shared_sheet() {
    let dir = tempfile::tempdir().unwrap();
    let sheet = gradient(64, 32, 9);
    sheet.save(dir.path().join("atlas.png")).unwrap();
    let doc = r#"{
        "items": [
            {"id": "a", "x": 0, "y": 0, "w": 10, "h": 10, "d": 0},
            {"id": "b", "x": 12, "y": 4, "w": 20, "h": 8, "d": 1, "oxa": 3, "oyb": -2},
            {"id": "c", "x": 40, "y": 16, "w": 24, "h": 16, "d": 2}
        ],
        "metadata": {"width": 64, "height": 32, "padding": 1, "heuristics": 3},
        "texture": {"file": "atlas.png", "width": 64, "height": 32}
    }"#;
    let path = dir.path().join("atlas.json");
    std::fs::write(&path, doc).unwrap();

    let mut p = Project::new();
    p.open(&path, &DefaultCodec).unwrap();
    assert_eq!(p.sprites().len(), 3);
    assert_eq!(p.config().heuristic, MaxRectsHeuristic::BottomLeft);
    assert_eq!(p.config().padding, 1);
    assert_eq!(p.path(), Some(path.as_path()));

    for (name, r) in [
        ("a", Rect::new(0, 0, 10, 10)),
        ("b", Rect::new(12, 4, 20, 8)),
        ("c", Rect::new(40, 16, 24, 16)),
    ] {
        let s = p.sprite(name).unwrap();
        assert!(s.packed);
        assert_eq!(s.image.dimensions(), (r.w, r.h));
        for y in 0..r.h {
            for x in 0..r.w {
                assert_eq!(s.image.get_pixel(x, y), sheet.get_pixel(r.x + x, r.y + y));
            }
        }
    }
    let b = p.sprite("b").unwrap();
    assert_eq!(b.kind, DataKind::Line);
    assert_eq!((b.origin_a, b.origin_b), ((3, 0), (0, -2)));
}

#[test]
fn repack_places_padded_sprites_without_overlap() {
    let mut p = Project::new();
    p.set_canvas_size(256, 256);
    p.set_padding(2);
    p.set_spacing(0);
    for (i, (w, h)) in [(40, 30), (64, 64), (12, 90), (100, 20), (33, 33)]
        .into_iter()
        .enumerate()
    {
        p.add_image(&format!("s{i}"), gradient(w, h, i as u8));
    }
    assert!(p.repack());

    let padded: Vec<Rect> = p
        .sprites()
        .values()
        .map(|s| {
            assert!(s.packed);
            s.region.expand(2)
        })
        .collect();
    let canvas = Rect::new(0, 0, 256, 256);
    for (i, a) in padded.iter().enumerate() {
        assert!(canvas.contains(a), "{a:?}");
        for b in &padded[i + 1..] {
            assert!(!a.intersects(b), "{a:?} overlaps {b:?}");
        }
    }

    // a second run with no edits is identical
    let before: Vec<Rect> = p.sprites().values().map(|s| s.region).collect();
    assert!(p.repack());
    let after: Vec<Rect> = p.sprites().values().map(|s| s.region).collect();
    assert_eq!(before, after);
}

#[test]
fn composition_survives_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scene.json");

    let mut p = Project::new();
    p.add_image("body", gradient(16, 16, 1));
    p.add_image("arm", gradient(4, 12, 2));
    p.add_composition("pose");
    let c = p.composition_mut("pose").unwrap();
    c.add_node(Node::new("body", Point::new(10.25, -3.5)));
    let arm = c.add_node(Node::new("arm", Point::new(18.0, 2.0)));
    let n = c.node_mut(arm).unwrap();
    n.rotation = 45.0;
    n.scale = Vec2::new(2.0, 1.0);
    p.save(&path, &DefaultCodec).unwrap();
    assert!(dir.path().join("scene.png").exists());

    let mut q = Project::new();
    q.open(&path, &DefaultCodec).unwrap();
    let c = q.composition("pose").unwrap();
    assert_eq!(c.len(), 2);
    let body = c.node(0).unwrap();
    assert_eq!(body.sprite.as_deref(), Some("body"));
    assert!((body.position.x - 10.25).abs() < 1e-5);
    assert!((body.position.y + 3.5).abs() < 1e-5);
    assert_eq!(body.scale, Vec2::new(1.0, 1.0));
    let arm = c.node(1).unwrap();
    assert_eq!(arm.sprite.as_deref(), Some("arm"));
    assert!((arm.rotation - 45.0).abs() < 1e-5);
    assert!((arm.scale.x - 2.0).abs() < 1e-5);
    assert!((arm.scale.y - 1.0).abs() < 1e-5);
    assert!((arm.position - Point::new(18.0, 2.0)).hypot() < 1e-5);

    assert_eq!(q.sprite("arm").unwrap().image, p.sprite("arm").unwrap().image);
}

#[test]
fn deleting_a_sprite_leaves_null_nodes() {
    let mut p = Project::new();
    p.add_image("gone", gradient(4, 4, 0));
    p.add_image("kept", gradient(4, 4, 1));
    p.add_composition("scene");
    let c = p.composition_mut("scene").unwrap();
    c.add_node(Node::new("gone", Point::ORIGIN));
    c.add_node(Node::new("kept", Point::new(5.0, 5.0)));

    assert!(p.remove_sprite("gone"));
    let c = p.composition("scene").unwrap();
    assert_eq!(c.len(), 2);
    assert_eq!(c.node(0).unwrap().sprite, None);
    assert_eq!(c.node(1).unwrap().sprite.as_deref(), Some("kept"));
    // inert for hit testing
    assert_eq!(c.hit_test(Point::new(1.0, 1.0), p.sprites()), None);
    assert_eq!(c.hit_test(Point::new(6.0, 6.0), p.sprites()), Some(1));
}

#[test]
fn unpacked_and_embedded_sprites_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("embedded.json");

    let mut p = Project::new();
    p.set_canvas_size(32, 32);
    p.set_embed(true);
    p.add_image("fits", gradient(8, 8, 3));
    p.add_image("too_wide", gradient(40, 2, 4));
    p.set_origin("fits", (4, 8), (1, 1));
    p.set_kind("fits", DataKind::NinePatch);
    p.save(&path, &DefaultCodec).unwrap();
    assert!(!dir.path().join("embedded.png").exists());

    let mut q = Project::new();
    q.open(&path, &DefaultCodec).unwrap();
    assert!(q.config().embed);
    let fits = q.sprite("fits").unwrap();
    assert!(fits.packed);
    assert_eq!(fits.origin_a, (4, 8));
    assert_eq!(fits.kind, DataKind::NinePatch);
    assert_eq!(fits.image, p.sprite("fits").unwrap().image);
    let wide = q.sprite("too_wide").unwrap();
    assert!(!wide.packed);
    assert_eq!(wide.image, p.sprite("too_wide").unwrap().image);
}

#[test]
fn failed_open_keeps_current_project() {
    let dir = tempfile::tempdir().unwrap();
    let mut p = Project::new();
    p.add_image("keep", gradient(2, 2, 0));
    p.set_padding(4);

    let broken = dir.path().join("broken.json");
    std::fs::write(&broken, r#"{"items": [}"#).unwrap();
    assert!(matches!(
        p.open(&broken, &DefaultCodec),
        Err(SpriteBoxError::Parse(_))
    ));

    let missing_sheet = dir.path().join("missing.json");
    std::fs::write(
        &missing_sheet,
        r#"{"items":[{"id":"x","x":0,"y":0,"w":1,"h":1}],"texture":{"file":"nope.png"}}"#,
    )
    .unwrap();
    assert!(p.open(&missing_sheet, &DefaultCodec).is_err());
    assert!(p.open(&dir.path().join("absent.json"), &DefaultCodec).is_err());

    assert!(p.sprite("keep").is_some());
    assert_eq!(p.config().padding, 4);
    assert_eq!(p.path(), None);
}

#[test]
fn add_file_keys_by_stem() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("coin.png");
    gradient(6, 6, 5).save(&file).unwrap();

    let mut p = Project::new();
    assert_eq!(p.add_file(&file, &DefaultCodec).unwrap(), "coin");
    gradient(3, 3, 6).save(&file).unwrap();
    p.add_file(&file, &DefaultCodec).unwrap();
    assert_eq!(p.sprites().len(), 1);
    assert_eq!(p.sprite("coin").unwrap().image.dimensions(), (3, 3));
    assert!(p.add_file(&dir.path().join("nope.png"), &DefaultCodec).is_err());
}
