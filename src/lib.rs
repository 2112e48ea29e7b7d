//! Palette-indexed 2D compositing.
//!
//! Sprites and terrain tiles are drawn into an 8-bit surface with clipping,
//! remapping and transparency; palette effects (fades, flashes, color
//! cycling) act on the 256-entry color table, and the compositor ties it all
//! together once per frame.

pub mod asset;
pub mod compositor;
pub mod config;
pub mod display;
pub mod error;
pub mod geometry;
pub mod palette;
pub mod sprite;
pub mod tile;
pub mod util;

pub use asset::{AssetSource, AssetStore};
pub use compositor::{
    Compositor, DirtyTracker, DrawContext, RenderLayer, RenderStats, Renderable, TerrainProvider,
    Viewport,
};
pub use config::RenderConfig;
pub use display::{MemoryPresenter, PixelSurface, PresentationLayer, SurfaceLock};
pub use error::{ConfigError, LoadError};
pub use geometry::Rect;
pub use palette::{Color, PaletteEngine, RemapTable, RemapTables};
pub use sprite::{ShapeFlags, SpriteAsset, SpriteCache, SpriteHandle};
pub use tile::{LandType, OverlayType, TemplateType, Theater, TileCache};
