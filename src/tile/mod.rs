//! Theater terrain: template tiles, the clear-tile fallback and overlays

mod template;

pub use template::{TemplateData, TemplateType, TEMPLATE_HEADER_SIZE};

use crate::asset::AssetSource;
use crate::display::{BlitMode, PixelSurface};
use crate::geometry::Rect;
use crate::palette::PaletteEngine;
use crate::sprite::{ShapeFlags, SpriteAsset};
use crate::util::knuth_hash;
use std::collections::HashMap;
use std::rc::Rc;

pub const TILE_WIDTH: i32 = 24;
pub const TILE_HEIGHT: i32 = 24;
pub const TILE_SIZE: usize = (TILE_WIDTH * TILE_HEIGHT) as usize;

/// Fill color when not even the clear template is available
pub const FALLBACK_CLEAR_COLOR: u8 = 21;
/// Number of clear tile variants picked between by the seed hash
pub const CLEAR_VARIANTS: u32 = 4;

// ============================================================================
// Theater
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Theater {
    Temperate,
    Snow,
    Interior,
}

impl Theater {
    pub const ALL: [Theater; 3] = [Theater::Temperate, Theater::Snow, Theater::Interior];

    pub fn name(self) -> &'static str {
        match self {
            Theater::Temperate => "TEMPERAT",
            Theater::Snow => "SNOW",
            Theater::Interior => "INTERIOR",
        }
    }

    /// Template file extension, including the dot
    pub fn extension(self) -> &'static str {
        match self {
            Theater::Temperate => ".TMP",
            Theater::Snow => ".SNO",
            Theater::Interior => ".INT",
        }
    }

    pub fn palette_name(self) -> String {
        format!("{}.PAL", self.name())
    }

    pub fn template_file(self, template: TemplateType) -> String {
        format!("{}{}", template.file_stem(), self.extension())
    }
}

// ============================================================================
// Land / Overlay
// ============================================================================

/// Passability class of a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LandType {
    #[default]
    Clear,
    Road,
    Water,
    Rock,
    Wall,
    Resource,
    Beach,
    Rough,
    ShallowWater,
}

/// Transparent terrain decorations drawn over the base tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayType {
    SandbagWall,
    CycloneWall,
    BrickWall,
    BarbwireWall,
    WoodWall,
    Gold1,
    Gold2,
    Gold3,
    Gold4,
    Gems1,
    Gems2,
    Gems3,
    Gems4,
    V12,
    V13,
    V14,
    V15,
    V16,
    V17,
    V18,
    Flag,
    WoodFence,
}

impl OverlayType {
    pub fn file_stem(self) -> &'static str {
        match self {
            OverlayType::SandbagWall => "SBAG",
            OverlayType::CycloneWall => "CYCL",
            OverlayType::BrickWall => "BRIK",
            OverlayType::BarbwireWall => "BARB",
            OverlayType::WoodWall => "WOOD",
            OverlayType::Gold1 => "GOLD01",
            OverlayType::Gold2 => "GOLD02",
            OverlayType::Gold3 => "GOLD03",
            OverlayType::Gold4 => "GOLD04",
            OverlayType::Gems1 => "GEM01",
            OverlayType::Gems2 => "GEM02",
            OverlayType::Gems3 => "GEM03",
            OverlayType::Gems4 => "GEM04",
            OverlayType::V12 => "V12",
            OverlayType::V13 => "V13",
            OverlayType::V14 => "V14",
            OverlayType::V15 => "V15",
            OverlayType::V16 => "V16",
            OverlayType::V17 => "V17",
            OverlayType::V18 => "V18",
            OverlayType::Flag => "FLAGFLY",
            OverlayType::WoodFence => "FENC",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.SHP", self.file_stem())
    }
}

// ============================================================================
// TileCache
// ============================================================================

/// Per-theater template and overlay store.
///
/// Failed loads are remembered so a missing file is only looked up once per
/// theater.
pub struct TileCache {
    assets: Rc<dyn AssetSource>,
    theater: Option<Theater>,
    templates: HashMap<TemplateType, Option<TemplateData>>,
    overlays: HashMap<OverlayType, Option<SpriteAsset>>,
}

impl TileCache {
    pub fn new(assets: Rc<dyn AssetSource>) -> Self {
        Self {
            assets,
            theater: None,
            templates: HashMap::new(),
            overlays: HashMap::new(),
        }
    }

    #[inline]
    pub fn theater(&self) -> Option<Theater> {
        self.theater
    }

    /// Switch theater: drops every cached template and overlay and loads the
    /// theater palette into `palette`. Selecting the current theater again
    /// succeeds without reloading anything. A missing palette keeps the
    /// current colors and still succeeds.
    pub fn set_theater(&mut self, theater: Theater, palette: &mut PaletteEngine) -> bool {
        if self.theater == Some(theater) {
            return true;
        }
        self.clear_cache();
        self.theater = Some(theater);

        let palette_name = theater.palette_name();
        match palette.load(self.assets.as_ref(), &palette_name) {
            Ok(()) => log::info!("theater {} loaded with {}", theater.name(), palette_name),
            Err(e) => log::warn!(
                "theater {}: palette {} unavailable ({}), keeping current colors",
                theater.name(),
                palette_name,
                e
            ),
        }
        true
    }

    fn load_template(&self, template: TemplateType) -> Option<TemplateData> {
        let theater = self.theater?;
        let file = theater.template_file(template);
        let (name, data) = match self.assets.read(&file) {
            Some(data) => (file, data),
            None => {
                let fallback = format!("{}.TMP", template.file_stem());
                let data = self.assets.read(&fallback)?;
                (fallback, data)
            },
        };
        match TemplateData::parse(template, data) {
            Ok(t) => {
                log::debug!("loaded template {} ({} tiles)", name, t.tile_count);
                Some(t)
            },
            Err(e) => {
                log::warn!("template {} is unusable: {}", name, e);
                None
            },
        }
    }

    /// Cached template, loading it on first request
    pub fn get_template(&mut self, template: TemplateType) -> Option<&TemplateData> {
        self.theater?;
        if !self.templates.contains_key(&template) {
            let loaded = self.load_template(template);
            if loaded.is_none() {
                log::warn!("template {} missing", template.file_stem());
            }
            self.templates.insert(template, loaded);
        }
        self.templates.get(&template).and_then(Option::as_ref)
    }

    pub fn tile_count(&mut self, template: TemplateType) -> usize {
        self.get_template(template).map_or(0, |t| t.tile_count)
    }

    pub fn land_type(&mut self, template: TemplateType, icon: usize) -> LandType {
        self.get_template(template)
            .map_or(LandType::Clear, |t| t.land_type(icon))
    }

    // ========================================================================
    // Drawing
    // ========================================================================

    /// Draw one tile. `None` draws clear terrain. A template that cannot be
    /// loaded still draws clear terrain but reports false; an out-of-range
    /// icon draws tile 0.
    pub fn draw_tile(
        &mut self,
        surface: &mut PixelSurface<'_>,
        x: i32,
        y: i32,
        template: Option<TemplateType>,
        icon: usize,
    ) -> bool {
        self.draw_tile_with_land(surface, x, y, template, icon).0
    }

    /// As `draw_tile`, also returning the land class of the drawn tile
    pub fn draw_tile_with_land(
        &mut self,
        surface: &mut PixelSurface<'_>,
        x: i32,
        y: i32,
        template: Option<TemplateType>,
        icon: usize,
    ) -> (bool, LandType) {
        let seed = (x ^ y) as u32;
        let Some(template) = template else {
            self.draw_clear(surface, x, y, seed);
            return (surface.is_locked(), LandType::Clear);
        };
        let Some(data) = self.get_template(template) else {
            self.draw_clear(surface, x, y, seed);
            return (false, LandType::Clear);
        };

        let icon = if icon < data.tile_count { icon } else { 0 };
        let land = data.land_type(icon);
        let drawn = data
            .tile(icon)
            .is_some_and(|pixels| blit_tile(surface, pixels, x, y, BlitMode::Opaque));
        (drawn, land)
    }

    /// Deterministic clear tile for `seed`
    pub fn draw_clear(&mut self, surface: &mut PixelSurface<'_>, x: i32, y: i32, seed: u32) {
        let variation = (knuth_hash(seed) % CLEAR_VARIANTS) as usize;
        if let Some(data) = self.get_template(TemplateType::Clear1) {
            if let Some(pixels) = data.tile(variation % data.tile_count) {
                blit_tile(surface, pixels, x, y, BlitMode::Opaque);
                return;
            }
        }
        surface.fill_rect(
            Rect::new(x, y, TILE_WIDTH, TILE_HEIGHT),
            FALLBACK_CLEAR_COLOR,
        );
    }

    fn get_overlay(&mut self, overlay: OverlayType) -> Option<&mut SpriteAsset> {
        if !self.overlays.contains_key(&overlay) {
            let name = overlay.file_name();
            let loaded = match self.assets.read(&name) {
                Some(data) => SpriteAsset::from_bytes(&name, data)
                    .map_err(|e| log::warn!("overlay {} is unusable: {}", name, e))
                    .ok(),
                None => {
                    log::warn!("overlay {} missing", name);
                    None
                },
            };
            self.overlays.insert(overlay, loaded);
        }
        self.overlays.get_mut(&overlay).and_then(Option::as_mut)
    }

    /// Draw an overlay frame with index 0 transparent. Out-of-range frames
    /// draw frame 0.
    pub fn draw_overlay(
        &mut self,
        surface: &mut PixelSurface<'_>,
        x: i32,
        y: i32,
        overlay: OverlayType,
        frame: usize,
    ) -> bool {
        let Some(asset) = self.get_overlay(overlay) else {
            return false;
        };
        let frame = if frame < asset.frame_count() { frame } else { 0 };
        asset.draw(surface, x, y, frame, ShapeFlags::NONE)
    }

    // ========================================================================
    // Cache Management
    // ========================================================================

    /// Load every template of the current theater. Returns how many loaded.
    pub fn preload_all(&mut self) -> usize {
        TemplateType::ALL
            .iter()
            .filter(|&&t| self.get_template(t).is_some())
            .count()
    }

    pub fn clear_cache(&mut self) {
        self.templates.clear();
        self.overlays.clear();
    }

    /// Bytes held by cached templates and decoded overlay frames
    pub fn cache_size(&self) -> usize {
        let templates: usize = self
            .templates
            .values()
            .flatten()
            .map(TemplateData::memory_size)
            .sum();
        let overlays: usize = self
            .overlays
            .values()
            .flatten()
            .map(SpriteAsset::cache_size)
            .sum();
        templates + overlays
    }
}

fn blit_tile(surface: &mut PixelSurface<'_>, pixels: &[u8], x: i32, y: i32, mode: BlitMode<'_>) -> bool {
    surface.blit_raw(pixels, TILE_WIDTH, TILE_HEIGHT, TILE_WIDTH, x, y, mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetStore;
    use crate::palette::Color;
    use crate::sprite::RawShape;

    /// Template with `count` solid tiles valued base, base+1, ...
    fn solid_tiles(count: usize, base: u8) -> Vec<u8> {
        (0..count)
            .flat_map(|i| std::iter::repeat(base + i as u8).take(TILE_SIZE))
            .collect()
    }

    fn store() -> AssetStore {
        let mut store = AssetStore::new();
        store.insert("CLEAR1.TMP", solid_tiles(4, 30));
        store.insert("W1.TMP", solid_tiles(4, 60));
        store.insert("W1.SNO", solid_tiles(2, 70));
        let mut pal = vec![0u8; 768];
        pal[3..6].copy_from_slice(&[255, 0, 0]);
        store.insert("SNOW.PAL", pal);

        let mut gold = vec![0u8; TILE_SIZE];
        gold[TILE_SIZE - 1] = 99;
        let frames: [&[u8]; 2] = [&[5u8; TILE_SIZE], &gold];
        store.insert(
            "GOLD01.SHP",
            RawShape::encode(TILE_WIDTH as u16, TILE_HEIGHT as u16, &frames),
        );
        store
    }

    fn cache(theater: Theater) -> (TileCache, PaletteEngine) {
        let mut tiles = TileCache::new(Rc::new(store()));
        let mut palette = PaletteEngine::new();
        tiles.set_theater(theater, &mut palette);
        (tiles, palette)
    }

    #[test]
    fn test_names() {
        assert_eq!(Theater::Snow.palette_name(), "SNOW.PAL");
        assert_eq!(Theater::Interior.template_file(TemplateType::Road2), "RD02.INT");
        assert_eq!(OverlayType::Flag.file_name(), "FLAGFLY.SHP");
    }

    #[test]
    fn test_no_theater_no_templates() {
        let mut tiles = TileCache::new(Rc::new(store()));
        assert!(tiles.get_template(TemplateType::Clear1).is_none());
        assert_eq!(tiles.tile_count(TemplateType::Water1), 0);
    }

    #[test]
    fn test_theater_extension_with_tmp_fallback() {
        let (mut tiles, palette) = cache(Theater::Snow);
        assert_eq!(tiles.tile_count(TemplateType::Water1), 2);
        assert_eq!(tiles.tile_count(TemplateType::Clear1), 4);
        assert_eq!(palette.color(1), Color::new(255, 0, 0));
    }

    #[test]
    fn test_reselecting_theater_keeps_cache() {
        let (mut tiles, mut palette) = cache(Theater::Temperate);
        assert_eq!(tiles.tile_count(TemplateType::Water1), 4);
        let cached = tiles.cache_size();
        palette.set_color(1, Color::new(1, 2, 3));

        assert!(tiles.set_theater(Theater::Temperate, &mut palette));
        assert!(tiles.set_theater(Theater::Temperate, &mut palette));
        assert_eq!(tiles.theater(), Some(Theater::Temperate));
        assert_eq!(tiles.cache_size(), cached);
        assert_eq!(palette.color(1), Color::new(1, 2, 3));
    }

    #[test]
    fn test_theater_switch_clears_cache() {
        let (mut tiles, mut palette) = cache(Theater::Temperate);
        assert_eq!(tiles.tile_count(TemplateType::Water1), 4);
        assert!(tiles.cache_size() > 0);
        assert!(tiles.set_theater(Theater::Snow, &mut palette));
        assert_eq!(tiles.cache_size(), 0);
        assert_eq!(tiles.tile_count(TemplateType::Water1), 2);
    }

    #[test]
    fn test_invalid_icon_falls_back_to_tile_zero() {
        let (mut tiles, _) = cache(Theater::Temperate);
        let mut surface = PixelSurface::new(48, 48);
        let mut s = surface.lock().unwrap();
        s.clear(0);
        let (ok, land) = tiles.draw_tile_with_land(&mut s, 0, 0, Some(TemplateType::Water1), 99);
        assert!(ok);
        assert_eq!(land, LandType::Water);
        assert_eq!(s.get_pixel(0, 0), Some(60));
        assert_eq!(s.get_pixel(23, 23), Some(60));
        assert_eq!(s.get_pixel(24, 24), Some(0));

        assert!(tiles.draw_tile(&mut s, 24, 0, Some(TemplateType::Water1), 3));
        assert_eq!(s.get_pixel(24, 0), Some(63));
    }

    #[test]
    fn test_missing_template_draws_clear() {
        let (mut tiles, _) = cache(Theater::Temperate);
        let mut surface = PixelSurface::new(24, 24);
        let mut s = surface.lock().unwrap();
        s.clear(0);
        assert!(!tiles.draw_tile(&mut s, 0, 0, Some(TemplateType::Cliff1), 0));
        let p = s.get_pixel(0, 0).unwrap();
        assert!((30..34).contains(&p));
        assert!(tiles.draw_tile(&mut s, 0, 0, None, 0));
        assert_eq!(tiles.land_type(TemplateType::Cliff1, 0), LandType::Clear);
    }

    #[test]
    fn test_clear_is_deterministic() {
        let (mut tiles, _) = cache(Theater::Temperate);
        let mut surface = PixelSurface::new(24, 24);
        let mut s = surface.lock().unwrap();
        for seed in [0u32, 1, 7, 12345] {
            tiles.draw_clear(&mut s, 0, 0, seed);
            let expected = 30 + (knuth_hash(seed) % CLEAR_VARIANTS) as u8;
            assert_eq!(s.get_pixel(5, 5), Some(expected));
        }
    }

    #[test]
    fn test_clear_fallback_fill() {
        let mut tiles = TileCache::new(Rc::new(AssetStore::new()));
        let mut palette = PaletteEngine::new();
        tiles.set_theater(Theater::Interior, &mut palette);
        let mut surface = PixelSurface::new(30, 30);
        let mut s = surface.lock().unwrap();
        s.clear(0);
        tiles.draw_clear(&mut s, 10, 10, 3);
        assert_eq!(s.get_pixel(10, 10), Some(FALLBACK_CLEAR_COLOR));
        assert_eq!(s.get_pixel(29, 29), Some(FALLBACK_CLEAR_COLOR));
        assert_eq!(s.get_pixel(9, 9), Some(0));
    }

    #[test]
    fn test_tile_clipped_at_edges() {
        let (mut tiles, _) = cache(Theater::Temperate);
        let mut surface = PixelSurface::new(30, 30);
        let mut s = surface.lock().unwrap();
        s.clear(0);
        assert!(tiles.draw_tile(&mut s, -20, 20, Some(TemplateType::Water1), 1));
        assert_eq!(s.get_pixel(3, 29), Some(61));
        assert_eq!(s.get_pixel(4, 29), Some(0));
        assert!(tiles.draw_tile(&mut s, 100, 100, Some(TemplateType::Water1), 1));
    }

    #[test]
    fn test_overlay_is_keyed() {
        let (mut tiles, _) = cache(Theater::Temperate);
        let mut surface = PixelSurface::new(24, 24);
        let mut s = surface.lock().unwrap();
        s.clear(8);
        assert!(tiles.draw_overlay(&mut s, 0, 0, OverlayType::Gold1, 1));
        assert_eq!(s.get_pixel(0, 0), Some(8));
        assert_eq!(s.get_pixel(23, 23), Some(99));

        // Out-of-range frame draws frame 0
        assert!(tiles.draw_overlay(&mut s, 0, 0, OverlayType::Gold1, 40));
        assert_eq!(s.get_pixel(0, 0), Some(5));

        assert!(!tiles.draw_overlay(&mut s, 0, 0, OverlayType::Gems4, 0));
    }

    #[test]
    fn test_preload_and_negative_cache() {
        let (mut tiles, _) = cache(Theater::Temperate);
        assert_eq!(tiles.preload_all(), 2);
        assert_eq!(tiles.templates.len(), TemplateType::ALL.len());
        assert_eq!(tiles.cache_size(), 8 * TILE_SIZE + 8 * std::mem::size_of::<LandType>());
        tiles.clear_cache();
        assert_eq!(tiles.cache_size(), 0);
    }
}
