use crate::config::PackerConfig;
use crate::model::{PackStats, Rect, Sprite};
use crate::packer::{PackResult, pack_rects};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, instrument};

/// Outcome of a full repack.
#[derive(Debug, Clone, PartialEq)]
pub struct RepackOutcome {
    pub all_packed: bool,
    /// Tight sheet size around the placed sprites.
    pub trimmed: (u32, u32),
    pub stats: PackStats,
}

/// Clears and recomputes the placement of every sprite, in key order.
///
/// Each sprite is fed as `(w + 2·padding, h + 2·padding)`; its region starts
/// `spacing + padding` past the placed rectangle. Sprites that do not fit are
/// left with `packed = false`.
#[instrument(skip_all, fields(sprites = sprites.len()))]
pub fn repack_sprites(sprites: &mut BTreeMap<String, Sprite>, cfg: &PackerConfig) -> RepackOutcome {
    let t0 = Instant::now();
    let pad2 = cfg.padding.saturating_mul(2);
    let sizes: Vec<(u32, u32)> = sprites
        .values()
        .map(|s| (s.width().saturating_add(pad2), s.height().saturating_add(pad2)))
        .collect();

    let result = pack_rects(&sizes, cfg);
    let offset = cfg.spacing.saturating_add(cfg.padding);
    for (s, p) in sprites.values_mut().zip(&result.placements) {
        s.region = Rect::new(
            p.left.saturating_add(offset),
            p.top.saturating_add(offset),
            s.width(),
            s.height(),
        );
        s.packed = p.used;
    }

    let outcome = RepackOutcome {
        all_packed: result.all_used,
        trimmed: result.trimmed_size(),
        stats: stats_from(&result, sprites.len(), cfg),
    };
    debug!(
        elapsed_us = t0.elapsed().as_micros() as u64,
        packed = outcome.stats.num_packed,
        occupancy = outcome.stats.occupancy,
        "repacked"
    );
    outcome
}

fn stats_from(result: &PackResult, num_sprites: usize, cfg: &PackerConfig) -> PackStats {
    PackStats {
        num_sprites,
        num_packed: result.used_count(),
        canvas: (cfg.width, cfg.height),
        trimmed: result.trimmed_size(),
        used_area: result.used_area(),
        occupancy: result.occupancy,
    }
}

/// Sheet size used for export: the trimmed bounds when `cfg.trim` is set
/// and something was placed, the configured canvas otherwise.
pub fn sheet_size(cfg: &PackerConfig, trimmed: (u32, u32)) -> (u32, u32) {
    if cfg.trim && trimmed.0 > 0 && trimmed.1 > 0 {
        trimmed
    } else {
        (cfg.width, cfg.height)
    }
}
