//! Core library of the spritebox sprite-sheet editor.
//!
//! - Data: `msg` (compact tagged binary buffers and their writer), `json`
//!   (streaming parser feeding either a buffer or a `Var`), `var` (refcounted
//!   dynamic tree used as the document model)
//! - Packing: MaxRects (BSSF/BLSF/BAF/BL/CP) with global best-fit ordering
//! - Model: sprites with pivot metadata, flat compositions of transformed nodes
//! - Persistence: JSON project documents plus a sibling or embedded sheet
//!
//! Quick example:
//! ```ignore
//! use spritebox_core::prelude::*;
//! # fn main() -> anyhow::Result<()> {
//! let mut project = Project::new();
//! project.add_file("hero.png".as_ref(), &DefaultCodec)?;
//! project.set_padding(2);
//! project.update();
//! println!("{}", project.stats().summary());
//! project.save("atlas.json".as_ref(), &DefaultCodec)?;
//! # Ok(()) }
//! ```

pub mod codec;
pub mod compositing;
pub mod composition;
pub mod config;
pub mod document;
pub mod error;
pub mod json;
pub mod model;
pub mod msg;
pub mod packer;
pub mod pipeline;
pub mod project;
pub mod var;

pub use codec::*;
pub use composition::*;
pub use config::*;
pub use error::*;
pub use model::*;
pub use packer::*;
pub use pipeline::*;
pub use project::Project;

/// Convenience prelude for common types and functions.
/// Importing `spritebox_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::codec::{DefaultCodec, ImageCodec, TextureFactory, TextureHandle};
    pub use crate::composition::{Composition, Node};
    pub use crate::config::{MaxRectsHeuristic, PackerConfig, PackerConfigBuilder};
    pub use crate::error::{Result, SpriteBoxError};
    pub use crate::model::{DataKind, PackStats, Rect, Sprite};
    pub use crate::msg::{MsgBuffer, Value, Writer};
    pub use crate::packer::{PackResult, Placement, pack_rects};
    pub use crate::project::Project;
    pub use crate::var::Var;
}
