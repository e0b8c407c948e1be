use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// MaxRects free-rectangle choice heuristics.
///
/// The declaration order is the persisted `heuristics` index of project
/// documents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum MaxRectsHeuristic {
    #[default]
    BestShortSideFit,
    BestLongSideFit,
    BestAreaFit,
    BottomLeft,
    ContactPoint,
}

impl MaxRectsHeuristic {
    pub const ALL: [MaxRectsHeuristic; 5] = [
        Self::BestShortSideFit,
        Self::BestLongSideFit,
        Self::BestAreaFit,
        Self::BottomLeft,
        Self::ContactPoint,
    ];

    /// Index stored in project documents.
    pub fn index(self) -> i32 {
        self as i32
    }

    pub fn from_index(i: i64) -> Option<Self> {
        usize::try_from(i).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    /// Short name accepted by [`FromStr`].
    pub fn short_name(self) -> &'static str {
        match self {
            Self::BestShortSideFit => "bssf",
            Self::BestLongSideFit => "blsf",
            Self::BestAreaFit => "baf",
            Self::BottomLeft => "bl",
            Self::ContactPoint => "cp",
        }
    }
}

impl FromStr for MaxRectsHeuristic {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "baf" | "bestareafit" => Ok(Self::BestAreaFit),
            "bssf" | "bestshortsidefit" => Ok(Self::BestShortSideFit),
            "blsf" | "bestlongsidefit" => Ok(Self::BestLongSideFit),
            "bl" | "bottomleft" => Ok(Self::BottomLeft),
            "cp" | "contactpoint" => Ok(Self::ContactPoint),
            _ => Err(()),
        }
    }
}

/// Canvas and layout settings of a project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackerConfig {
    /// Sheet width in pixels.
    #[serde(default = "default_extent")]
    pub width: u32,
    /// Sheet height in pixels.
    #[serde(default = "default_extent")]
    pub height: u32,
    /// Pixels reserved on every side of each sprite.
    #[serde(default)]
    pub padding: u32,
    /// Margin kept free along the sheet border.
    #[serde(default)]
    pub spacing: u32,
    #[serde(default)]
    pub heuristic: MaxRectsHeuristic,
    /// Export the sheet cropped to the placed sprites instead of the full canvas.
    #[serde(default)]
    pub trim: bool,
    /// Store the sheet inside the project document instead of a sibling PNG.
    #[serde(default)]
    pub embed: bool,
}

fn default_extent() -> u32 {
    512
}

impl Default for PackerConfig {
    fn default() -> Self {
        Self {
            width: default_extent(),
            height: default_extent(),
            padding: 0,
            spacing: 0,
            heuristic: MaxRectsHeuristic::default(),
            trim: false,
            embed: false,
        }
    }
}

impl PackerConfig {
    /// Validates the configuration parameters.
    ///
    /// Returns an error if the canvas is empty, or if the border spacing or
    /// the per-sprite padding leaves no usable area.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::SpriteBoxError;

        if self.width == 0 || self.height == 0 {
            return Err(SpriteBoxError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }

        let total_spacing = self.spacing.saturating_mul(2);
        if total_spacing >= self.width || total_spacing >= self.height {
            return Err(SpriteBoxError::InvalidConfig(format!(
                "spacing ({}) * 2 exceeds canvas dimensions ({}x{})",
                self.spacing, self.width, self.height
            )));
        }

        let (usable_w, usable_h) = self.usable_size();
        let total_padding = self.padding.saturating_mul(2);
        if total_padding >= usable_w || total_padding >= usable_h {
            return Err(SpriteBoxError::InvalidConfig(format!(
                "padding ({}) * 2 exceeds usable area ({}x{})",
                self.padding, usable_w, usable_h
            )));
        }

        Ok(())
    }

    /// Area available to the packer: the canvas minus the spacing margin.
    pub fn usable_size(&self) -> (u32, u32) {
        let total_spacing = self.spacing.saturating_mul(2);
        (
            self.width.saturating_sub(total_spacing),
            self.height.saturating_sub(total_spacing),
        )
    }

    /// Create a fluent builder for `PackerConfig`.
    pub fn builder() -> PackerConfigBuilder {
        PackerConfigBuilder::new()
    }
}

/// Builder for `PackerConfig` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct PackerConfigBuilder {
    cfg: PackerConfig,
}

impl PackerConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: PackerConfig::default(),
        }
    }
    pub fn with_dimensions(mut self, w: u32, h: u32) -> Self {
        self.cfg.width = w;
        self.cfg.height = h;
        self
    }
    pub fn padding(mut self, v: u32) -> Self {
        self.cfg.padding = v;
        self
    }
    pub fn spacing(mut self, v: u32) -> Self {
        self.cfg.spacing = v;
        self
    }
    pub fn heuristic(mut self, v: MaxRectsHeuristic) -> Self {
        self.cfg.heuristic = v;
        self
    }
    pub fn trim(mut self, v: bool) -> Self {
        self.cfg.trim = v;
        self
    }
    pub fn embed(mut self, v: bool) -> Self {
        self.cfg.embed = v;
        self
    }
    pub fn build(self) -> PackerConfig {
        self.cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heuristic_indices_round_trip() {
        for h in MaxRectsHeuristic::ALL {
            assert_eq!(MaxRectsHeuristic::from_index(h.index().into()), Some(h));
            assert_eq!(h.short_name().parse::<MaxRectsHeuristic>(), Ok(h));
        }
        assert_eq!(MaxRectsHeuristic::from_index(5), None);
        assert_eq!(MaxRectsHeuristic::from_index(-1), None);
        assert_eq!("BottomLeft".parse::<MaxRectsHeuristic>(), Ok(MaxRectsHeuristic::BottomLeft));
        assert!("skyline".parse::<MaxRectsHeuristic>().is_err());
    }

    #[test]
    fn validate_rejects_degenerate_canvas() {
        assert!(PackerConfig::default().validate().is_ok());
        let zero = PackerConfig::builder().with_dimensions(0, 64).build();
        assert!(zero.validate().is_err());
        let spacing = PackerConfig::builder()
            .with_dimensions(64, 64)
            .spacing(32)
            .build();
        assert!(spacing.validate().is_err());
        let ok = PackerConfig::builder()
            .with_dimensions(64, 64)
            .spacing(31)
            .build();
        assert_eq!(ok.usable_size(), (2, 2));
    }

    #[test]
    fn validate_bounds_padding_by_usable_area() {
        let cfg = |padding| {
            PackerConfig::builder()
                .with_dimensions(64, 32)
                .spacing(4)
                .padding(padding)
                .build()
        };
        assert!(cfg(11).validate().is_ok());
        assert!(cfg(12).validate().is_err());
        assert!(cfg(3_000_000_000).validate().is_err());
    }
}
