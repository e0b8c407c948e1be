use crate::model::Sprite;
use image::RgbaImage;

/// Copy the sub-rectangle (sx, sy, sw, sh) of `src` into `canvas` at (dx, dy).
///
/// Pixels that would land outside `canvas`, or read outside `src`, are skipped.
pub fn blit_rgba(
    src: &RgbaImage,
    canvas: &mut RgbaImage,
    dx: u32,
    dy: u32,
    sx: u32,
    sy: u32,
    sw: u32,
    sh: u32,
) {
    let (cw, ch) = canvas.dimensions();
    let (srw, srh) = src.dimensions();
    let w = sw
        .min(srw.saturating_sub(sx))
        .min(cw.saturating_sub(dx));
    let h = sh
        .min(srh.saturating_sub(sy))
        .min(ch.saturating_sub(dy));
    for yy in 0..h {
        for xx in 0..w {
            let px = *src.get_pixel(sx + xx, sy + yy);
            canvas.put_pixel(dx + xx, dy + yy, px);
        }
    }
}

/// Draws every packed sprite at its region into a transparent `width` x `height` sheet.
pub fn compose_sheet<'a>(
    sprites: impl IntoIterator<Item = &'a Sprite>,
    width: u32,
    height: u32,
) -> RgbaImage {
    let mut sheet = RgbaImage::new(width, height);
    for s in sprites {
        if let Some(r) = s.placement() {
            blit_rgba(&s.image, &mut sheet, r.x, r.y, 0, 0, r.w, r.h);
        }
    }
    sheet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Rect;
    use image::Rgba;

    #[test]
    fn blit_clips_to_canvas() {
        let src = RgbaImage::from_pixel(4, 4, Rgba([9, 8, 7, 255]));
        let mut canvas = RgbaImage::new(5, 5);
        blit_rgba(&src, &mut canvas, 3, 3, 0, 0, 4, 4);
        assert_eq!(canvas.get_pixel(4, 4), &Rgba([9, 8, 7, 255]));
        assert_eq!(canvas.get_pixel(2, 2), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn sheet_skips_unpacked() {
        let mut a = Sprite::new(RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255])));
        a.region = Rect::new(1, 1, 2, 2);
        a.packed = true;
        let b = Sprite::new(RgbaImage::from_pixel(2, 2, Rgba([0, 255, 0, 255])));
        let sheet = compose_sheet([&a, &b], 4, 4);
        assert_eq!(sheet.get_pixel(1, 1), &Rgba([255, 0, 0, 255]));
        assert_eq!(sheet.get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
        assert_eq!(sheet.pixels().filter(|p| p[1] == 255).count(), 0);
    }
}
