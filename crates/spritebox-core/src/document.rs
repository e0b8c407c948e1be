//! Project persistence: the JSON document layout and sheet texture.
//!
//! ```text
//! { "items":      [{id, x, y, w, h, d, oxa?, oya?, oxb?, oyb?, img?}],
//!   "composites": [{id, items: [{x, y, sx?, sy?, r?, s?}]}],
//!   "metadata":   {width, height, padding, spacing, trim_alpha, heuristics},
//!   "texture":    {file, width, height} | {data, width, height, format} }
//! ```
//!
//! Packed sprites live in the sheet texture; unpacked ones carry their own
//! `img` object. Pixel data is raw RGBA8, deflated, then base64 encoded.

use crate::codec::{self, ImageCodec, PIXEL_FORMAT_RGBA8};
use crate::compositing;
use crate::composition::{Composition, Node, normalize_degrees};
use crate::config::MaxRectsHeuristic;
use crate::error::{Result, SpriteBoxError};
use crate::model::{DataKind, Rect, Sprite};
use crate::pipeline;
use crate::project::Project;
use crate::var::Var;
use image::RgbaImage;
use kurbo::{Point, Vec2};
use std::path::Path;
use tracing::{info, instrument, warn};

impl Project {
    /// Builds the document and the sheet image from the current placement.
    ///
    /// `base_name` names the sibling PNG (`<base_name>.png`) referenced when
    /// the sheet is not embedded.
    pub fn to_document(&self, base_name: &str, codec: &dyn ImageCodec) -> Result<(Var, RgbaImage)> {
        let (sw, sh) = pipeline::sheet_size(&self.config, self.trimmed);
        let sheet = compositing::compose_sheet(self.sprites.values(), sw, sh);

        let mut items = Var::array();
        for (name, s) in &self.sprites {
            items.push_back(sprite_to_var(name, s, codec)?);
        }

        let mut composites = Var::array();
        for (name, c) in &self.compositions {
            composites.push_back(composition_to_var(name, c));
        }

        let mut metadata = Var::object();
        metadata.set_item("width", self.config.width);
        metadata.set_item("height", self.config.height);
        metadata.set_item("padding", self.config.padding);
        metadata.set_item("spacing", self.config.spacing);
        metadata.set_item("trim_alpha", self.config.trim);
        metadata.set_item("heuristics", self.config.heuristic.index());

        let mut texture = Var::object();
        if self.config.embed {
            texture.set_item("data", codec::encode_pixels(codec, &sheet)?);
            texture.set_item("width", sw);
            texture.set_item("height", sh);
            texture.set_item("format", PIXEL_FORMAT_RGBA8);
        } else {
            texture.set_item("file", format!("{base_name}.png"));
            texture.set_item("width", sw);
            texture.set_item("height", sh);
        }

        let mut doc = Var::object();
        doc.set_item("items", items);
        doc.set_item("composites", composites);
        doc.set_item("metadata", metadata);
        doc.set_item("texture", texture);
        Ok((doc, sheet))
    }

    /// Writes the sheet PNG (unless embedded) and then the JSON document.
    ///
    /// Pending edits are packed first. Everything is encoded before the
    /// first file is written.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn save(&mut self, path: &Path, codec: &dyn ImageCodec) -> Result<()> {
        self.update();
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                SpriteBoxError::InvalidConfig(format!("no usable file name in {}", path.display()))
            })?;
        let (doc, sheet) = self.to_document(stem, codec)?;
        let text = doc.to_json_pretty();

        if !self.config.embed {
            let png = path.with_file_name(format!("{stem}.png"));
            codec.save_image(&sheet, &png)?;
        }
        std::fs::write(path, text)?;
        self.path = Some(path.to_path_buf());
        info!(sprites = self.sprites.len(), embed = self.config.embed, "saved project");
        Ok(())
    }

    /// Loads a project file. On any failure `self` is left untouched.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn open(&mut self, path: &Path, codec: &dyn ImageCodec) -> Result<()> {
        let text = std::fs::read_to_string(path)?;
        let doc = Var::parse(&text)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        let mut fresh = Project::from_document(&doc, base_dir, codec)?;
        fresh.path = Some(path.to_path_buf());

        fresh.stale_textures = std::mem::take(&mut self.stale_textures);
        fresh.stale_textures.extend(self.texture_handles());
        info!(
            sprites = fresh.sprites.len(),
            compositions = fresh.compositions.len(),
            "opened project"
        );
        *self = fresh;
        Ok(())
    }

    /// Builds a project from a parsed document. Relative texture paths are
    /// resolved against `base_dir`. Missing metadata keys keep defaults.
    pub fn from_document(doc: &Var, base_dir: &Path, codec: &dyn ImageCodec) -> Result<Project> {
        if !doc.is_object() {
            return Err(SpriteBoxError::InvalidDocument(
                "top level is not an object".into(),
            ));
        }
        let mut p = Project::new();

        let meta = doc.get_item("metadata");
        let cfg = &mut p.config;
        cfg.width = read_u32(&meta.get_item("width"), cfg.width);
        cfg.height = read_u32(&meta.get_item("height"), cfg.height);
        cfg.padding = read_u32(&meta.get_item("padding"), cfg.padding);
        cfg.spacing = read_u32(&meta.get_item("spacing"), cfg.spacing);
        cfg.trim = meta.get_item("trim_alpha").get(cfg.trim);
        let h = meta.get_item("heuristics");
        if h.is_number() {
            let index = h.get_number(0.0) as i64;
            match MaxRectsHeuristic::from_index(index) {
                Some(h) => cfg.heuristic = h,
                None => warn!(index, "unknown heuristic index, using default"),
            }
        }

        cfg.validate()?;

        let tex = doc.get_item("texture");
        let sheet = if tex.contains_key("data") {
            cfg.embed = true;
            Some(decode_image_object(&tex, codec)?)
        } else if let Some(file) = tex.get_item("file").as_str().filter(|f| !f.is_empty()) {
            Some(codec.load_image(&base_dir.join(file))?)
        } else {
            None
        };

        for item in doc.get_item("items").elements() {
            let (name, sprite) = match sprite_from_var(&item, sheet.as_ref(), codec)? {
                Some(found) => found,
                None => continue,
            };
            p.sprites.insert(name, sprite);
        }

        for comp in doc.get_item("composites").elements() {
            let name = comp.get_item("id").str().to_string();
            if name.is_empty() {
                return Err(SpriteBoxError::InvalidDocument(
                    "composite without id".into(),
                ));
            }
            p.compositions.insert(name, composition_from_var(&comp));
        }

        p.dirty = true;
        Ok(p)
    }
}

fn sprite_to_var(name: &str, s: &Sprite, codec: &dyn ImageCodec) -> Result<Var> {
    let mut v = Var::object();
    v.set_item("id", name);
    v.set_item("x", s.region.x);
    v.set_item("y", s.region.y);
    v.set_item("w", s.width());
    v.set_item("h", s.height());
    v.set_item("d", s.kind.index());
    for (key, value) in [
        ("oxa", s.origin_a.0),
        ("oya", s.origin_a.1),
        ("oxb", s.origin_b.0),
        ("oyb", s.origin_b.1),
    ] {
        if value != 0 {
            v.set_item(key, value);
        }
    }
    if !s.packed {
        let mut img = Var::object();
        img.set_item("width", s.width());
        img.set_item("height", s.height());
        img.set_item("format", PIXEL_FORMAT_RGBA8);
        img.set_item("data", codec::encode_pixels(codec, &s.image)?);
        v.set_item("img", img);
    }
    Ok(v)
}

/// `None` for entries whose pixels cannot be located; they are skipped.
fn sprite_from_var(
    item: &Var,
    sheet: Option<&RgbaImage>,
    codec: &dyn ImageCodec,
) -> Result<Option<(String, Sprite)>> {
    let name = item.get_item("id").str().to_string();
    if name.is_empty() {
        return Err(SpriteBoxError::InvalidDocument("item without id".into()));
    }
    let region = Rect::new(
        read_u32(&item.get_item("x"), 0),
        read_u32(&item.get_item("y"), 0),
        read_u32(&item.get_item("w"), 0),
        read_u32(&item.get_item("h"), 0),
    );

    let img = item.get_item("img");
    let mut sprite = if img.is_object() {
        Sprite::new(decode_image_object(&img, codec)?)
    } else if let Some(sheet) = sheet {
        let bounds = Rect::new(0, 0, sheet.width(), sheet.height());
        if !bounds.contains(&region) {
            return Err(SpriteBoxError::InvalidDocument(format!(
                "sprite {name} region {}x{} at ({}, {}) lies outside the {}x{} sheet",
                region.w,
                region.h,
                region.x,
                region.y,
                bounds.w,
                bounds.h
            )));
        }
        let mut s = Sprite::new(codec::crop(sheet, region));
        s.region = region;
        s.packed = true;
        s
    } else {
        warn!(name = %name, "sprite has neither pixels nor a sheet, skipping");
        return Ok(None);
    };

    sprite.kind = DataKind::from_index(item.get_item("d").get_number(0.0) as i64);
    sprite.origin_a = (
        read_i32(&item.get_item("oxa"), 0),
        read_i32(&item.get_item("oya"), 0),
    );
    sprite.origin_b = (
        read_i32(&item.get_item("oxb"), 0),
        read_i32(&item.get_item("oyb"), 0),
    );
    Ok(Some((name, sprite)))
}

fn composition_to_var(name: &str, c: &Composition) -> Var {
    let mut nodes = Var::array();
    for n in c.nodes() {
        let mut v = Var::object();
        v.set_item("x", n.position.x);
        v.set_item("y", n.position.y);
        if n.scale.x != 1.0 {
            v.set_item("sx", n.scale.x);
        }
        if n.scale.y != 1.0 {
            v.set_item("sy", n.scale.y);
        }
        if n.rotation != 0.0 {
            v.set_item("r", n.rotation);
        }
        if let Some(s) = &n.sprite {
            v.set_item("s", s);
        }
        nodes.push_back(v);
    }
    let mut v = Var::object();
    v.set_item("id", name);
    v.set_item("items", nodes);
    v
}

fn composition_from_var(v: &Var) -> Composition {
    let mut c = Composition::new();
    for n in v.get_item("items").elements() {
        let sprite = n
            .get_item("s")
            .as_str()
            .filter(|s| !s.is_empty())
            .map(str::to_owned);
        c.add_node(Node {
            position: Point::new(
                n.get_item("x").get_number(0.0),
                n.get_item("y").get_number(0.0),
            ),
            scale: Vec2::new(
                n.get_item("sx").get_number(1.0),
                n.get_item("sy").get_number(1.0),
            ),
            rotation: normalize_degrees(n.get_item("r").get_number(0.0)),
            sprite,
            selected: false,
        });
    }
    c
}

/// Decodes a `{data, width, height, format}` object.
fn decode_image_object(v: &Var, codec: &dyn ImageCodec) -> Result<RgbaImage> {
    let format = v.get_item("format").get_number(f64::from(PIXEL_FORMAT_RGBA8));
    if format != f64::from(PIXEL_FORMAT_RGBA8) {
        return Err(SpriteBoxError::Decode(format!(
            "unsupported pixel format {format}"
        )));
    }
    let width = read_u32(&v.get_item("width"), 0);
    let height = read_u32(&v.get_item("height"), 0);
    let data = v
        .get_item("data")
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| SpriteBoxError::InvalidDocument("image without data".into()))?;
    codec::decode_pixels(codec, &data, width, height)
}

fn read_u32(v: &Var, default: u32) -> u32 {
    let n = v.get_number(f64::from(default));
    if n.is_finite() && n >= 0.0 && n <= f64::from(u32::MAX) {
        n as u32
    } else {
        default
    }
}

fn read_i32(v: &Var, default: i32) -> i32 {
    let n = v.get_number(f64::from(default));
    if n.is_finite() && n >= f64::from(i32::MIN) && n <= f64::from(i32::MAX) {
        n as i32
    } else {
        default
    }
}
