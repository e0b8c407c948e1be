use crate::codec::{TextureFactory, TextureHandle};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle (pixels). `x,y` is top-left; `w,h` are sizes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
    /// Exclusive right edge (`x + w`, saturating).
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.w)
    }
    /// Exclusive bottom edge (`y + h`, saturating).
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.h)
    }
    pub fn area(&self) -> u64 {
        u64::from(self.w) * u64::from(self.h)
    }
    /// Returns true if `r` is fully inside `self`.
    pub fn contains(&self, r: &Rect) -> bool {
        r.x >= self.x && r.y >= self.y && r.right() <= self.right() && r.bottom() <= self.bottom()
    }
    /// Returns true if the interiors overlap.
    pub fn intersects(&self, r: &Rect) -> bool {
        self.x < r.right() && r.x < self.right() && self.y < r.bottom() && r.y < self.bottom()
    }
    /// Grows the rectangle by `n` on every side (saturating at zero).
    pub fn expand(&self, n: u32) -> Rect {
        Rect::new(
            self.x.saturating_sub(n),
            self.y.saturating_sub(n),
            self.w.saturating_add(n.saturating_mul(2)),
            self.h.saturating_add(n.saturating_mul(2)),
        )
    }
}

/// Which origin fields of a sprite are meaningful.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    /// Single pivot (`origin_a`).
    #[default]
    One,
    /// Two points forming a line (`origin_a` to `origin_b`).
    Line,
    /// Nine-patch insets (`origin_a` top-left, `origin_b` bottom-right).
    NinePatch,
}

impl DataKind {
    pub fn index(self) -> i32 {
        match self {
            DataKind::One => 0,
            DataKind::Line => 1,
            DataKind::NinePatch => 2,
        }
    }

    /// Unknown indices fall back to [`DataKind::One`].
    pub fn from_index(i: i64) -> Self {
        match i {
            1 => DataKind::Line,
            2 => DataKind::NinePatch,
            _ => DataKind::One,
        }
    }
}

/// A named image unit with pivot metadata and pack state.
#[derive(Debug, Clone)]
pub struct Sprite {
    /// Source pixels (RGBA8).
    pub image: RgbaImage,
    texture: Option<TextureHandle>,
    /// Placement on the sheet. Only meaningful while `packed` is set.
    pub region: Rect,
    pub origin_a: (i32, i32),
    pub origin_b: (i32, i32),
    pub kind: DataKind,
    pub packed: bool,
}

impl Sprite {
    pub fn new(image: RgbaImage) -> Self {
        let (w, h) = image.dimensions();
        Self {
            image,
            texture: None,
            region: Rect::new(0, 0, w, h),
            origin_a: (0, 0),
            origin_b: (0, 0),
            kind: DataKind::default(),
            packed: false,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Sheet rectangle if the sprite is placed.
    pub fn placement(&self) -> Option<Rect> {
        self.packed.then_some(self.region)
    }

    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }

    /// Returns the GPU texture, creating it on first use.
    pub fn ensure_texture(&mut self, factory: &mut dyn TextureFactory) -> TextureHandle {
        match self.texture {
            Some(t) => t,
            None => {
                let t = factory.create_texture(&self.image);
                self.texture = Some(t);
                t
            }
        }
    }

    /// Drops the texture handle so the next [`Sprite::ensure_texture`] recreates it.
    pub fn invalidate_texture(&mut self) -> Option<TextureHandle> {
        self.texture.take()
    }

    /// Replaces the pixels; the texture and placement become stale.
    pub fn set_image(&mut self, image: RgbaImage) -> Option<TextureHandle> {
        let (w, h) = image.dimensions();
        self.image = image;
        self.region.w = w;
        self.region.h = h;
        self.packed = false;
        self.invalidate_texture()
    }

    /// Sprite rectangle in its own space, with `origin_a` at the origin.
    pub fn local_bounds(&self) -> kurbo::Rect {
        let (ox, oy) = (f64::from(self.origin_a.0), f64::from(self.origin_a.1));
        kurbo::Rect::new(
            -ox,
            -oy,
            f64::from(self.width()) - ox,
            f64::from(self.height()) - oy,
        )
    }
}

/// Statistics about the current layout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PackStats {
    /// Total number of sprites in the project.
    pub num_sprites: usize,
    /// Sprites that received a placement.
    pub num_packed: usize,
    /// Configured canvas size.
    pub canvas: (u32, u32),
    /// Tight size around the placed sprites.
    pub trimmed: (u32, u32),
    /// Area of the padded rectangles that were placed.
    pub used_area: u64,
    /// Occupancy ratio: used_area / usable canvas area (0.0 to 1.0).
    pub occupancy: f64,
}

impl PackStats {
    pub fn num_unpacked(&self) -> usize {
        self.num_sprites - self.num_packed
    }

    pub fn all_packed(&self) -> bool {
        self.num_packed == self.num_sprites
    }

    /// Returns a human-readable summary of the statistics.
    pub fn summary(&self) -> String {
        format!(
            "Sprites: {}, Packed: {}, Unpacked: {}, Canvas: {}x{}, Trimmed: {}x{}, Occupancy: {:.2}%",
            self.num_sprites,
            self.num_packed,
            self.num_unpacked(),
            self.canvas.0,
            self.canvas.1,
            self.trimmed.0,
            self.trimmed.1,
            self.occupancy * 100.0,
        )
    }
}
