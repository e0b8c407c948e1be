use crate::codec::{ImageCodec, TextureFactory, TextureHandle};
use crate::composition::Composition;
use crate::config::{MaxRectsHeuristic, PackerConfig};
use crate::error::{Result, SpriteBoxError};
use crate::model::{DataKind, PackStats, Sprite};
use crate::pipeline::{self, RepackOutcome};
use image::RgbaImage;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// An editable sprite-sheet project.
///
/// Sprites and compositions are keyed by name. Edits that change the packing
/// input mark the project dirty; [`Project::update`] repacks at most once per
/// call no matter how many edits happened since the last one.
#[derive(Debug, Clone)]
pub struct Project {
    pub(crate) sprites: BTreeMap<String, Sprite>,
    pub(crate) compositions: BTreeMap<String, Composition>,
    pub(crate) config: PackerConfig,
    pub(crate) dirty: bool,
    pub(crate) trimmed: (u32, u32),
    active: Option<String>,
    pub(crate) path: Option<PathBuf>,
    /// Handles dropped by edits, released on the next `ensure_textures`.
    pub(crate) stale_textures: Vec<TextureHandle>,
}

impl Default for Project {
    fn default() -> Self {
        Self::with_config(PackerConfig::default())
    }
}

impl Project {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PackerConfig) -> Self {
        Self {
            sprites: BTreeMap::new(),
            compositions: BTreeMap::new(),
            config,
            dirty: true,
            trimmed: (0, 0),
            active: None,
            path: None,
            stale_textures: Vec::new(),
        }
    }

    pub fn config(&self) -> &PackerConfig {
        &self.config
    }

    pub fn sprites(&self) -> &BTreeMap<String, Sprite> {
        &self.sprites
    }

    pub fn sprite(&self, name: &str) -> Option<&Sprite> {
        self.sprites.get(name)
    }

    pub fn compositions(&self) -> &BTreeMap<String, Composition> {
        &self.compositions
    }

    pub fn composition(&self, name: &str) -> Option<&Composition> {
        self.compositions.get(name)
    }

    pub fn composition_mut(&mut self, name: &str) -> Option<&mut Composition> {
        self.compositions.get_mut(name)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Sheet size around the placed sprites as of the last repack.
    pub fn trimmed_size(&self) -> (u32, u32) {
        self.trimmed
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn set_active(&mut self, name: Option<&str>) -> bool {
        match name {
            Some(n) if !self.sprites.contains_key(n) => false,
            _ => {
                self.active = name.map(str::to_owned);
                true
            }
        }
    }

    /// Inserts a sprite, or replaces the pixels of an existing one while
    /// keeping its origins and kind.
    pub fn add_image(&mut self, name: &str, image: RgbaImage) -> bool {
        match self.sprites.get_mut(name) {
            Some(existing) => {
                self.stale_textures.extend(existing.set_image(image));
            }
            None => {
                self.sprites.insert(name.to_string(), Sprite::new(image));
            }
        }
        self.dirty = true;
        true
    }

    /// Loads an image file as a sprite keyed by the file stem.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn add_file(&mut self, path: &Path, codec: &dyn ImageCodec) -> Result<String> {
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                SpriteBoxError::InvalidConfig(format!("no usable file name in {}", path.display()))
            })?
            .to_string();
        let image = codec.load_image(path)?;
        debug!(name = %name, width = image.width(), height = image.height(), "loaded sprite");
        self.add_image(&name, image);
        Ok(name)
    }

    /// Removes a sprite and nulls every composition reference to it.
    pub fn remove_sprite(&mut self, name: &str) -> bool {
        let Some(mut sprite) = self.sprites.remove(name) else {
            return false;
        };
        self.stale_textures.extend(sprite.invalidate_texture());
        let mut refs = 0;
        for c in self.compositions.values_mut() {
            refs += c.remove_sprite(name);
        }
        if self.active.as_deref() == Some(name) {
            self.active = None;
        }
        debug!(name, refs, "removed sprite");
        self.dirty = true;
        true
    }

    /// Renames a sprite in place; fails if `old` is missing or `new` is taken.
    pub fn rename_sprite(&mut self, old: &str, new: &str) -> bool {
        if old == new || new.is_empty() || self.sprites.contains_key(new) {
            return false;
        }
        let Some(sprite) = self.sprites.remove(old) else {
            return false;
        };
        self.sprites.insert(new.to_string(), sprite);
        for c in self.compositions.values_mut() {
            c.rename_sprite(old, new);
        }
        if self.active.as_deref() == Some(old) {
            self.active = Some(new.to_string());
        }
        // key order is packing order
        self.dirty = true;
        true
    }

    pub fn set_origin(&mut self, name: &str, a: (i32, i32), b: (i32, i32)) -> bool {
        match self.sprites.get_mut(name) {
            Some(s) if s.origin_a != a || s.origin_b != b => {
                s.origin_a = a;
                s.origin_b = b;
                true
            }
            _ => false,
        }
    }

    pub fn set_kind(&mut self, name: &str, kind: DataKind) -> bool {
        match self.sprites.get_mut(name) {
            Some(s) if s.kind != kind => {
                s.kind = kind;
                true
            }
            _ => false,
        }
    }

    /// Rejects sizes that leave no room for the current spacing and padding.
    pub fn set_canvas_size(&mut self, width: u32, height: u32) -> bool {
        self.apply_layout(PackerConfig {
            width,
            height,
            ..self.config.clone()
        })
    }

    pub fn set_padding(&mut self, padding: u32) -> bool {
        self.apply_layout(PackerConfig {
            padding,
            ..self.config.clone()
        })
    }

    pub fn set_spacing(&mut self, spacing: u32) -> bool {
        self.apply_layout(PackerConfig {
            spacing,
            ..self.config.clone()
        })
    }

    fn apply_layout(&mut self, config: PackerConfig) -> bool {
        if config == self.config || config.validate().is_err() {
            return false;
        }
        self.config = config;
        self.dirty = true;
        true
    }

    pub fn set_heuristic(&mut self, heuristic: MaxRectsHeuristic) -> bool {
        if heuristic == self.config.heuristic {
            return false;
        }
        self.config.heuristic = heuristic;
        self.dirty = true;
        true
    }

    pub fn set_trim(&mut self, trim: bool) -> bool {
        let changed = trim != self.config.trim;
        self.config.trim = trim;
        changed
    }

    pub fn set_embed(&mut self, embed: bool) -> bool {
        let changed = embed != self.config.embed;
        self.config.embed = embed;
        changed
    }

    /// Replaces the whole configuration after validating it.
    pub fn set_config(&mut self, config: PackerConfig) -> Result<bool> {
        config.validate()?;
        if config == self.config {
            return Ok(false);
        }
        self.dirty = true;
        self.config = config;
        Ok(true)
    }

    pub fn add_composition(&mut self, name: &str) -> bool {
        if name.is_empty() || self.compositions.contains_key(name) {
            return false;
        }
        self.compositions
            .insert(name.to_string(), Composition::new());
        true
    }

    pub fn remove_composition(&mut self, name: &str) -> bool {
        self.compositions.remove(name).is_some()
    }

    pub fn rename_composition(&mut self, old: &str, new: &str) -> bool {
        if old == new || new.is_empty() || self.compositions.contains_key(new) {
            return false;
        }
        match self.compositions.remove(old) {
            Some(c) => {
                self.compositions.insert(new.to_string(), c);
                true
            }
            None => false,
        }
    }

    /// Repacks if an edit changed the packing input. Returns whether a
    /// repack ran.
    pub fn update(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        self.repack();
        true
    }

    /// Recomputes every placement from scratch. Returns whether all sprites
    /// were placed.
    #[instrument(skip_all, fields(sprites = self.sprites.len()))]
    pub fn repack(&mut self) -> bool {
        let RepackOutcome {
            all_packed,
            trimmed,
            stats,
        } = pipeline::repack_sprites(&mut self.sprites, &self.config);
        self.trimmed = trimmed;
        self.dirty = false;
        info!(
            packed = stats.num_packed,
            unpacked = stats.num_unpacked(),
            occupancy = stats.occupancy,
            "packed sprites"
        );
        all_packed
    }

    /// Releases stale handles and creates textures for sprites without one.
    /// Returns the number of textures created.
    pub fn ensure_textures(&mut self, factory: &mut dyn TextureFactory) -> usize {
        for h in self.stale_textures.drain(..) {
            factory.release_texture(h);
        }
        let mut created = 0;
        for s in self.sprites.values_mut() {
            if s.texture().is_none() {
                s.ensure_texture(factory);
                created += 1;
            }
        }
        created
    }

    /// Drops every sprite and composition and restores the default layout.
    pub fn reset(&mut self) {
        let mut stale = std::mem::take(&mut self.stale_textures);
        stale.extend(self.texture_handles());
        *self = Self::default();
        self.stale_textures = stale;
    }

    pub(crate) fn texture_handles(&self) -> impl Iterator<Item = TextureHandle> + '_ {
        self.sprites.values().filter_map(Sprite::texture)
    }

    /// Statistics of the current placement.
    pub fn stats(&self) -> PackStats {
        let pad2 = u64::from(self.config.padding) * 2;
        let mut num_packed = 0;
        let mut used_area = 0u64;
        for s in self.sprites.values().filter(|s| s.packed) {
            num_packed += 1;
            used_area += (u64::from(s.width()) + pad2) * (u64::from(s.height()) + pad2);
        }
        let (uw, uh) = self.config.usable_size();
        let bin = u64::from(uw) * u64::from(uh);
        PackStats {
            num_sprites: self.sprites.len(),
            num_packed,
            canvas: (self.config.width, self.config.height),
            trimmed: self.trimmed,
            used_area,
            occupancy: if bin == 0 {
                0.0
            } else {
                used_area as f64 / bin as f64
            },
        }
    }
}
