use crate::config::PackerConfig;
use crate::model::Rect;
use tracing::{debug, instrument};

pub mod maxrects;

pub use maxrects::MaxRectsPacker;

/// Heuristic score; lower is better. Compared lexicographically.
pub type Score = (i64, i64);

/// A packer places rectangles into a single bin.
///
/// Implementations must never report overlapping placements or placements
/// that leave the bin.
pub trait Packer {
    /// Best position for a `w` x `h` rectangle, or `None` if it fits nowhere.
    fn find_position(&self, w: u32, h: u32) -> Option<(Score, Rect)>;
    /// Commits a rectangle previously returned by [`Packer::find_position`].
    fn place(&mut self, node: Rect);

    fn can_pack(&self, w: u32, h: u32) -> bool {
        self.find_position(w, h).is_some()
    }

    /// Finds and commits a position in one step.
    fn insert(&mut self, w: u32, h: u32) -> Option<Rect> {
        let (_, r) = self.find_position(w, h)?;
        self.place(r);
        Some(r)
    }
}

/// Where one input rectangle ended up, in bin coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Placement {
    pub left: u32,
    pub top: u32,
    /// False when the rectangle fit nowhere.
    pub used: bool,
}

/// Result of [`pack_rects`]: one placement per input, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct PackResult {
    pub placements: Vec<Placement>,
    /// Input sizes, kept for bounds computation.
    pub sizes: Vec<(u32, u32)>,
    /// Used area divided by the bin area.
    pub occupancy: f64,
    pub all_used: bool,
    spacing: u32,
}

impl PackResult {
    /// Sheet-space rectangle of input `i` (spacing applied), if placed.
    pub fn rect(&self, i: usize) -> Option<Rect> {
        let p = self.placements.get(i)?;
        let (w, h) = self.sizes[i];
        p.used
            .then(|| {
                Rect::new(
                    p.left.saturating_add(self.spacing),
                    p.top.saturating_add(self.spacing),
                    w,
                    h,
                )
            })
    }

    /// Tight sheet size around the used rectangles including the spacing
    /// margin on both sides. `(0, 0)` when nothing was placed.
    pub fn trimmed_size(&self) -> (u32, u32) {
        let mut right = 0u32;
        let mut bottom = 0u32;
        let mut any = false;
        for (p, &(w, h)) in self.placements.iter().zip(&self.sizes) {
            if p.used {
                any = true;
                right = right.max(p.left.saturating_add(w));
                bottom = bottom.max(p.top.saturating_add(h));
            }
        }
        if !any {
            return (0, 0);
        }
        let margin = self.spacing.saturating_mul(2);
        (right.saturating_add(margin), bottom.saturating_add(margin))
    }

    pub fn used_count(&self) -> usize {
        self.placements.iter().filter(|p| p.used).count()
    }

    pub fn used_area(&self) -> u64 {
        self.placements
            .iter()
            .zip(&self.sizes)
            .filter(|(p, _)| p.used)
            .map(|(_, &(w, h))| u64::from(w) * u64::from(h))
            .sum()
    }
}

/// Packs `sizes` into the usable area of `cfg` (canvas minus spacing).
///
/// Global best fit: each step places the remaining rectangle whose best free
/// position scores lowest; ties keep input order. Rectangles that fit nowhere
/// are reported unused.
#[instrument(skip_all, fields(count = sizes.len(), heuristic = ?cfg.heuristic))]
pub fn pack_rects(sizes: &[(u32, u32)], cfg: &PackerConfig) -> PackResult {
    let (bw, bh) = cfg.usable_size();
    let mut packer = MaxRectsPacker::new(bw, bh, cfg.heuristic);
    let mut placements = vec![Placement::default(); sizes.len()];
    let mut remaining: Vec<usize> = (0..sizes.len()).collect();

    while !remaining.is_empty() {
        let mut best: Option<(usize, Score, Rect)> = None;
        for (slot, &i) in remaining.iter().enumerate() {
            let (w, h) = sizes[i];
            if let Some((s, r)) = packer.find_position(w, h) {
                if best.as_ref().is_none_or(|(_, bs, _)| s < *bs) {
                    best = Some((slot, s, r));
                }
            }
        }
        let Some((slot, _, r)) = best else {
            break;
        };
        let i = remaining.remove(slot);
        packer.place(r);
        placements[i] = Placement {
            left: r.x,
            top: r.y,
            used: true,
        };
    }

    if !remaining.is_empty() {
        debug!(unplaced = remaining.len(), "rectangles did not fit");
    }

    PackResult {
        all_used: remaining.is_empty(),
        placements,
        sizes: sizes.to_vec(),
        occupancy: packer.occupancy(),
        spacing: cfg.spacing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MaxRectsHeuristic;

    fn cfg(w: u32, h: u32) -> PackerConfig {
        PackerConfig::builder().with_dimensions(w, h).build()
    }

    #[test]
    fn exact_fill() {
        let res = pack_rects(&[(32, 32); 4], &cfg(64, 64));
        assert!(res.all_used);
        assert_eq!(res.occupancy, 1.0);
        assert_eq!(res.trimmed_size(), (64, 64));
    }

    #[test]
    fn oversized_is_unused_and_excluded_from_bounds() {
        let res = pack_rects(&[(600, 10), (10, 10)], &cfg(512, 512));
        assert!(!res.all_used);
        assert!(!res.placements[0].used);
        assert!(res.placements[1].used);
        assert_eq!(res.trimmed_size(), (10, 10));
        assert_eq!(res.used_count(), 1);
    }

    #[test]
    fn larger_first_under_global_best_fit() {
        // the 64x64 scores a perfect short-side fit and is placed first
        let res = pack_rects(&[(10, 10), (64, 64)], &cfg(64, 128));
        assert_eq!(res.placements[1], Placement { left: 0, top: 0, used: true });
        assert_eq!((res.placements[0].left, res.placements[0].top), (0, 64));
    }

    #[test]
    fn spacing_shrinks_bin_and_offsets_rects() {
        let c = PackerConfig::builder()
            .with_dimensions(20, 20)
            .spacing(2)
            .heuristic(MaxRectsHeuristic::BottomLeft)
            .build();
        let res = pack_rects(&[(16, 16), (1, 1)], &c);
        assert!(res.placements[0].used);
        assert!(!res.placements[1].used);
        assert_eq!(res.rect(0), Some(Rect::new(2, 2, 16, 16)));
        assert_eq!(res.trimmed_size(), (20, 20));
    }

    #[test]
    fn empty_input() {
        let res = pack_rects(&[], &cfg(8, 8));
        assert!(res.all_used);
        assert_eq!(res.occupancy, 0.0);
        assert_eq!(res.trimmed_size(), (0, 0));
    }
}
