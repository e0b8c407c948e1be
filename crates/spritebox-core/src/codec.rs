//! Pixel I/O seams: image files, raw pixel compression, text encoding and
//! GPU texture creation.

use crate::compositing::blit_rgba;
use crate::error::{Result, SpriteBoxError};
use crate::model::Rect;
use base64::Engine as _;
use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use image::RgbaImage;
use std::io::{Read, Write};
use std::path::Path;

/// Pixel format code stored in documents for 8-bit RGBA.
pub const PIXEL_FORMAT_RGBA8: i32 = 7;

/// Opaque handle of a texture owned by the rendering backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u64);

/// Creates GPU textures from sprite pixels.
pub trait TextureFactory {
    fn create_texture(&mut self, image: &RgbaImage) -> TextureHandle;
    /// Called when a handle is no longer referenced by the project.
    fn release_texture(&mut self, _handle: TextureHandle) {}
}

/// Texture factory without a GPU: hands out increasing ids and tracks the
/// live ones.
#[derive(Debug, Default)]
pub struct HeadlessTextures {
    next: u64,
    live: Vec<TextureHandle>,
}

impl HeadlessTextures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live(&self) -> &[TextureHandle] {
        &self.live
    }

    pub fn created(&self) -> u64 {
        self.next
    }
}

impl TextureFactory for HeadlessTextures {
    fn create_texture(&mut self, _image: &RgbaImage) -> TextureHandle {
        self.next += 1;
        let h = TextureHandle(self.next);
        self.live.push(h);
        h
    }

    fn release_texture(&mut self, handle: TextureHandle) {
        self.live.retain(|&h| h != handle);
    }
}

/// File and byte-level codecs used by project persistence.
pub trait ImageCodec {
    /// Decodes an image file into RGBA8.
    fn load_image(&self, path: &Path) -> Result<RgbaImage>;
    /// Encodes `image` as PNG at `path`.
    fn save_image(&self, image: &RgbaImage, path: &Path) -> Result<()>;
    fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>>;
    /// Inflates `bytes`; the output must be exactly `expected` bytes long.
    fn decompress(&self, bytes: &[u8], expected: usize) -> Result<Vec<u8>>;
    fn base64_encode(&self, bytes: &[u8]) -> String;
    fn base64_decode(&self, text: &str) -> Result<Vec<u8>>;
}

/// [`ImageCodec`] backed by `image`, raw DEFLATE and standard base64.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCodec;

impl ImageCodec for DefaultCodec {
    fn load_image(&self, path: &Path) -> Result<RgbaImage> {
        Ok(image::open(path)?.to_rgba8())
    }

    fn save_image(&self, image: &RgbaImage, path: &Path) -> Result<()> {
        image.save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }

    fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
        enc.write_all(bytes)?;
        Ok(enc.finish()?)
    }

    fn decompress(&self, bytes: &[u8], expected: usize) -> Result<Vec<u8>> {
        // `expected` comes from document metadata; grow with the real output.
        let mut out = Vec::new();
        DeflateDecoder::new(bytes)
            .take(expected as u64 + 1)
            .read_to_end(&mut out)
            .map_err(|e| SpriteBoxError::Decode(format!("inflate failed: {e}")))?;
        if out.len() != expected {
            return Err(SpriteBoxError::Decode(format!(
                "expected {expected} pixel bytes, got {}",
                out.len()
            )));
        }
        Ok(out)
    }

    fn base64_encode(&self, bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    fn base64_decode(&self, text: &str) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(text)
            .map_err(|e| SpriteBoxError::Decode(format!("invalid base64 data: {e}")))
    }
}

/// Copies `r` out of `src`. Parts of `r` outside `src` stay transparent.
pub fn crop(src: &RgbaImage, r: Rect) -> RgbaImage {
    let mut out = RgbaImage::new(r.w, r.h);
    blit_rgba(src, &mut out, 0, 0, r.x, r.y, r.w, r.h);
    out
}

/// Compressed and base64-encoded raw RGBA8 pixels.
pub fn encode_pixels(codec: &dyn ImageCodec, image: &RgbaImage) -> Result<String> {
    let packed = codec.compress(image.as_raw())?;
    Ok(codec.base64_encode(&packed))
}

/// Inverse of [`encode_pixels`] for a `width` x `height` image.
pub fn decode_pixels(
    codec: &dyn ImageCodec,
    text: &str,
    width: u32,
    height: u32,
) -> Result<RgbaImage> {
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(4))
        .ok_or(SpriteBoxError::InvalidDimensions { width, height })?;
    let packed = codec.base64_decode(text)?;
    let raw = codec.decompress(&packed, expected)?;
    RgbaImage::from_raw(width, height, raw)
        .ok_or(SpriteBoxError::InvalidDimensions { width, height })
}
