//! Frame orchestration: dirty regions, terrain, sorted drawables, present

mod dirty;
mod viewport;

pub use dirty::DirtyTracker;
pub use viewport::Viewport;

use crate::asset::AssetSource;
use crate::config::RenderConfig;
use crate::display::{PixelSurface, PresentationLayer, TRANSPARENT};
use crate::error::LoadError;
use crate::geometry::Rect;
use crate::palette::{PaletteEngine, RemapTables};
use crate::sprite::SpriteCache;
use crate::tile::{TemplateType, Theater, TileCache, TILE_HEIGHT, TILE_WIDTH};
use std::rc::Rc;

/// Debug overlay color for dirty rectangle outlines
pub const DEBUG_DIRTY_COLOR: u8 = 252;
/// Debug overlay color for the viewport border
pub const DEBUG_VIEWPORT_COLOR: u8 = 250;

// ============================================================================
// Layers and Drawables
// ============================================================================

/// Draw order, back to front
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RenderLayer {
    Terrain = 0,
    Smudge = 1,
    Overlay = 2,
    Bib = 3,
    Shadow = 4,
    Ground = 5,
    Building = 6,
    Air = 7,
    Projectile = 8,
    Effect = 9,
    Selection = 10,
    Shroud = 11,
    Ui = 12,
    Cursor = 13,
}

impl RenderLayer {
    pub const COUNT: usize = 14;

    /// Screen-space layers ignore scrolling and the viewport clip
    pub fn is_screen_space(self) -> bool {
        matches!(self, RenderLayer::Ui | RenderLayer::Cursor)
    }
}

/// Services a drawable may use while drawing itself
pub struct DrawContext<'c> {
    pub sprites: &'c mut SpriteCache,
    pub tiles: &'c mut TileCache,
    pub remaps: &'c RemapTables,
    pub frame: u32,
}

/// Anything the compositor can sort and draw.
///
/// World-layer positions are in world pixels; screen-space layers
/// (`Ui`, `Cursor`) give screen pixels.
pub trait Renderable {
    fn layer(&self) -> RenderLayer;

    /// Depth within the layer, smaller draws first
    fn sort_y(&self) -> i32;

    fn world_position(&self) -> (i32, i32);

    /// Extent relative to `world_position`, used for culling
    fn bounds(&self) -> Rect;

    /// Draw with the anchor at (screen_x, screen_y). The surface is locked
    /// and clipped to the region being repainted.
    fn draw(&self, ctx: &mut DrawContext<'_>, surface: &mut PixelSurface<'_>, screen_x: i32, screen_y: i32);
}

/// Map data behind the terrain layer, addressed in cells
pub trait TerrainProvider {
    fn template_at(&self, cell_x: i32, cell_y: i32) -> Option<TemplateType>;

    fn icon_at(&self, cell_x: i32, cell_y: i32) -> usize;

    /// Map size in cells
    fn map_size(&self) -> (i32, i32);

    fn is_valid_cell(&self, cell_x: i32, cell_y: i32) -> bool {
        let (w, h) = self.map_size();
        cell_x >= 0 && cell_y >= 0 && cell_x < w && cell_y < h
    }
}

/// Queued drawable with the sort key captured at registration
#[derive(Clone)]
pub struct RenderEntry<'a> {
    pub object: Rc<dyn Renderable + 'a>,
    pub layer: RenderLayer,
    pub sort_y: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub tiles_drawn: u32,
    pub objects_drawn: u32,
    pub dirty_rects: usize,
    /// The palette changed since the previous present
    pub palette_uploaded: bool,
}

// ============================================================================
// Compositor
// ============================================================================

pub struct Compositor<'a> {
    config: RenderConfig,
    assets: Rc<dyn AssetSource>,
    screen: PixelSurface<'a>,
    palette: PaletteEngine,
    remaps: RemapTables,
    /// Palette revision `remaps` was generated from
    remap_revision: u32,
    sprites: SpriteCache,
    tiles: TileCache,
    terrain: Option<Box<dyn TerrainProvider + 'a>>,
    viewport: Viewport,
    dirty: DirtyTracker,
    queue: Vec<RenderEntry<'a>>,
    stats: RenderStats,
    frame: u32,
}

impl<'a> Compositor<'a> {
    pub fn new(
        config: RenderConfig,
        presenter: Box<dyn PresentationLayer + 'a>,
        assets: Rc<dyn AssetSource>,
    ) -> Self {
        let mut palette = PaletteEngine::new();
        palette.enable_water_animation(config.water_animation);
        palette.enable_fire_animation(config.fire_animation);
        let remaps = palette.remap_tables(config.shadow_intensity);
        let remap_revision = palette.revision();

        let mut dirty = DirtyTracker::new(
            config.screen_rect(),
            config.merge_distance,
            config.max_dirty_rects,
        );
        if !config.dirty_rects {
            dirty.set_enabled(false);
        }

        log::info!(
            "compositor initialized: {}x{} screen, viewport {:?}",
            config.screen_width,
            config.screen_height,
            config.viewport.rect()
        );

        Self {
            viewport: Viewport::new(config.viewport.rect()),
            screen: PixelSurface::presentation(presenter),
            sprites: SpriteCache::new(Rc::clone(&assets)),
            tiles: TileCache::new(Rc::clone(&assets)),
            assets,
            palette,
            remaps,
            remap_revision,
            terrain: None,
            dirty,
            queue: Vec::with_capacity(256),
            stats: RenderStats::default(),
            frame: 0,
            config,
        }
    }

    // ========================================================================
    // Services
    // ========================================================================

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn screen_mut(&mut self) -> &mut PixelSurface<'a> {
        &mut self.screen
    }

    pub fn palette(&self) -> &PaletteEngine {
        &self.palette
    }

    /// Edits to the base colors made through here are picked up by the
    /// remap tables at the next `begin_frame`
    pub fn palette_mut(&mut self) -> &mut PaletteEngine {
        &mut self.palette
    }

    pub fn remaps(&self) -> &RemapTables {
        &self.remaps
    }

    pub fn sprites_mut(&mut self) -> &mut SpriteCache {
        &mut self.sprites
    }

    pub fn tiles_mut(&mut self) -> &mut TileCache {
        &mut self.tiles
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    /// Frames presented so far
    pub fn frame(&self) -> u32 {
        self.frame
    }

    pub fn set_terrain(&mut self, terrain: Box<dyn TerrainProvider + 'a>) {
        self.terrain = Some(terrain);
        self.dirty.mark_full_redraw();
    }

    pub fn clear_terrain(&mut self) {
        self.terrain = None;
        self.dirty.mark_full_redraw();
    }

    /// Switch theater and rebuild every remap table from its palette.
    /// The current theater is left as is.
    pub fn set_theater(&mut self, theater: Theater) -> bool {
        if self.tiles.theater() == Some(theater) {
            return true;
        }
        if !self.tiles.set_theater(theater, &mut self.palette) {
            return false;
        }
        self.rebuild_remaps();
        self.dirty.mark_full_redraw();
        true
    }

    pub fn load_palette(&mut self, name: &str) -> Result<(), LoadError> {
        self.palette.load(self.assets.as_ref(), name)?;
        self.rebuild_remaps();
        self.dirty.mark_full_redraw();
        Ok(())
    }

    /// Regenerate house, shadow, fade and ghost tables from the base palette
    pub fn rebuild_remaps(&mut self) {
        self.remaps = self.palette.remap_tables(self.config.shadow_intensity);
        self.remap_revision = self.palette.revision();
        log::debug!("remap tables rebuilt");
    }

    // ========================================================================
    // Viewport
    // ========================================================================

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Move the tactical viewport on screen
    pub fn set_viewport(&mut self, screen: Rect) {
        self.viewport.screen = screen;
        self.dirty.mark_full_redraw();
    }

    pub fn set_scroll(&mut self, world_x: i32, world_y: i32) {
        if (world_x, world_y) != (self.viewport.scroll_x, self.viewport.scroll_y) {
            self.viewport.scroll_x = world_x;
            self.viewport.scroll_y = world_y;
            self.dirty.mark_full_redraw();
        }
    }

    pub fn scroll(&self) -> (i32, i32) {
        (self.viewport.scroll_x, self.viewport.scroll_y)
    }

    pub fn world_to_screen(&self, world_x: i32, world_y: i32) -> (i32, i32) {
        self.viewport.world_to_screen(world_x, world_y)
    }

    pub fn screen_to_world(&self, screen_x: i32, screen_y: i32) -> (i32, i32) {
        self.viewport.screen_to_world(screen_x, screen_y)
    }

    pub fn is_visible(&self, world: Rect) -> bool {
        self.viewport.is_visible(world)
    }

    // ========================================================================
    // Dirty Regions
    // ========================================================================

    pub fn dirty(&self) -> &DirtyTracker {
        &self.dirty
    }

    pub fn set_dirty_rects_enabled(&mut self, enabled: bool) {
        self.config.dirty_rects = enabled;
        self.dirty.set_enabled(enabled);
    }

    /// While the overlay is on every frame is repainted in full, so
    /// outlines from earlier frames never linger
    pub fn set_debug_overlay(&mut self, enabled: bool) {
        if self.config.debug_overlay != enabled {
            self.config.debug_overlay = enabled;
            self.dirty.mark_full_redraw();
        }
    }

    pub fn add_dirty_rect(&mut self, rect: Rect) {
        self.dirty.add(rect);
    }

    pub fn add_dirty_world_rect(&mut self, world: Rect) {
        self.dirty.add(self.viewport.world_rect_to_screen(world));
    }

    pub fn mark_full_redraw(&mut self) {
        self.dirty.mark_full_redraw();
    }

    // ========================================================================
    // Frame Cycle
    // ========================================================================

    /// Start a frame: empty the queue, advance palette effects and catch
    /// the remap tables up with any base palette edits
    pub fn begin_frame(&mut self) {
        self.queue.clear();
        self.stats = RenderStats::default();
        self.palette.update();
        if self.palette.revision() != self.remap_revision {
            self.rebuild_remaps();
        }
    }

    /// Queue a drawable. Returns false if it is entirely off screen and
    /// was culled.
    pub fn add_renderable(&mut self, object: Rc<dyn Renderable + 'a>) -> bool {
        let layer = object.layer();
        let (x, y) = object.world_position();
        let bounds = object.bounds().offset(x, y);
        let visible = if layer.is_screen_space() {
            bounds.overlaps(&self.config.screen_rect())
        } else {
            self.viewport.is_visible(bounds)
        };
        if !visible {
            return false;
        }
        self.queue.push(RenderEntry {
            sort_y: object.sort_y(),
            layer,
            object,
        });
        true
    }

    /// The queue in draw order
    pub fn sorted_queue(&mut self) -> &[RenderEntry<'a>] {
        self.queue.sort_by_key(|e| (e.layer, e.sort_y));
        &self.queue
    }

    /// Composite the dirty regions into the screen surface. Returns false
    /// if the screen could not be locked.
    pub fn render_frame(&mut self) -> bool {
        self.queue.sort_by_key(|e| (e.layer, e.sort_y));
        let dirty_regions = self.dirty.regions();
        self.stats.dirty_rects = dirty_regions.len();
        let regions = if self.config.debug_overlay {
            vec![self.config.screen_rect()]
        } else {
            dirty_regions
        };

        let Self {
            screen,
            sprites,
            tiles,
            remaps,
            terrain,
            viewport,
            queue,
            stats,
            dirty,
            config,
            frame,
            ..
        } = self;

        let Some(mut s) = screen.lock() else {
            log::warn!("screen lock failed, frame {} skipped", frame);
            return false;
        };
        let mut ctx = DrawContext {
            sprites,
            tiles,
            remaps,
            frame: *frame,
        };

        // An object spanning several regions is drawn once per region but
        // counted once
        let mut drawn = vec![false; queue.len()];
        for region in &regions {
            if let Some(clip) = region.intersect(&viewport.screen) {
                s.set_clip(clip);
                stats.tiles_drawn += draw_terrain(&mut s, ctx.tiles, terrain.as_deref(), viewport, clip);
                for (i, entry) in queue.iter().enumerate() {
                    if entry.layer.is_screen_space() {
                        continue;
                    }
                    let (wx, wy) = entry.object.world_position();
                    let (sx, sy) = viewport.world_to_screen(wx, wy);
                    if entry.object.bounds().offset(sx, sy).overlaps(&clip) {
                        entry.object.draw(&mut ctx, &mut s, sx, sy);
                        drawn[i] = true;
                    }
                }
            }

            s.set_clip(*region);
            for (i, entry) in queue.iter().enumerate() {
                if !entry.layer.is_screen_space() {
                    continue;
                }
                let (sx, sy) = entry.object.world_position();
                if entry.object.bounds().offset(sx, sy).overlaps(region) {
                    entry.object.draw(&mut ctx, &mut s, sx, sy);
                    drawn[i] = true;
                }
            }
        }
        s.reset_clip();
        stats.objects_drawn = drawn.iter().filter(|&&d| d).count() as u32;

        if config.debug_overlay {
            for rect in dirty.rects() {
                s.draw_rect(*rect, DEBUG_DIRTY_COLOR);
            }
            s.draw_rect(viewport.screen, DEBUG_VIEWPORT_COLOR);
        }
        true
    }

    /// Present the composited frame with the current palette and reset the
    /// dirty set
    pub fn end_frame(&mut self) -> bool {
        self.stats.palette_uploaded = self.palette.take_dirty();
        let presented = match self.screen.lock() {
            Some(mut s) => s.present(self.palette.current()),
            None => false,
        };
        if !presented {
            log::debug!("frame {} not presented", self.frame);
        }
        self.dirty.clear();
        self.frame = self.frame.wrapping_add(1);
        presented
    }

    /// Whole cycle for one frame with the given drawables
    pub fn draw_frame<I>(&mut self, objects: I) -> bool
    where
        I: IntoIterator<Item = Rc<dyn Renderable + 'a>>,
    {
        self.begin_frame();
        for object in objects {
            self.add_renderable(object);
        }
        let rendered = self.render_frame();
        self.end_frame() && rendered
    }
}

impl Drop for Compositor<'_> {
    fn drop(&mut self) {
        log::info!("compositor shut down after {} frames", self.frame);
    }
}

/// Draw every cell under `clip`. Cells outside a provider's map are black;
/// without a provider, or where it has no template, clear terrain is drawn.
fn draw_terrain(
    surface: &mut PixelSurface<'_>,
    tiles: &mut TileCache,
    terrain: Option<&(dyn TerrainProvider + '_)>,
    viewport: &Viewport,
    clip: Rect,
) -> u32 {
    let (wx, wy) = viewport.screen_to_world(clip.x, clip.y);
    let cx0 = wx.div_euclid(TILE_WIDTH);
    let cy0 = wy.div_euclid(TILE_HEIGHT);
    let cx1 = (wx + clip.width - 1).div_euclid(TILE_WIDTH);
    let cy1 = (wy + clip.height - 1).div_euclid(TILE_HEIGHT);

    let mut drawn = 0;
    for cy in cy0..=cy1 {
        for cx in cx0..=cx1 {
            let (sx, sy) = viewport.world_to_screen(cx * TILE_WIDTH, cy * TILE_HEIGHT);
            let seed = (cx ^ cy.wrapping_mul(127)) as u32;
            match terrain {
                Some(map) if !map.is_valid_cell(cx, cy) => {
                    surface.fill_rect(Rect::new(sx, sy, TILE_WIDTH, TILE_HEIGHT), TRANSPARENT);
                    continue;
                },
                Some(map) => match map.template_at(cx, cy) {
                    Some(template) => {
                        tiles.draw_tile(surface, sx, sy, Some(template), map.icon_at(cx, cy));
                    },
                    None => tiles.draw_clear(surface, sx, sy, seed),
                },
                None => tiles.draw_clear(surface, sx, sy, seed),
            }
            drawn += 1;
        }
    }
    drawn
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetStore;
    use crate::config::ViewportConfig;
    use crate::display::MemoryPresenter;
    use crate::sprite::{RawShape, ShapeFlags, SpriteHandle};
    use crate::tile::TILE_SIZE;
    use std::cell::RefCell;

    type DrawLog = Rc<RefCell<Vec<u32>>>;

    /// Solid rectangle that records its id when drawn
    struct Block {
        id: u32,
        layer: RenderLayer,
        pos: (i32, i32),
        size: (i32, i32),
        sort_y: i32,
        color: u8,
        log: DrawLog,
    }

    impl Renderable for Block {
        fn layer(&self) -> RenderLayer {
            self.layer
        }

        fn sort_y(&self) -> i32 {
            self.sort_y
        }

        fn world_position(&self) -> (i32, i32) {
            self.pos
        }

        fn bounds(&self) -> Rect {
            Rect::sized(self.size.0, self.size.1)
        }

        fn draw(&self, _ctx: &mut DrawContext<'_>, surface: &mut PixelSurface<'_>, x: i32, y: i32) {
            self.log.borrow_mut().push(self.id);
            surface.fill_rect(Rect::new(x, y, self.size.0, self.size.1), self.color);
        }
    }

    struct Unit {
        handle: SpriteHandle,
        pos: (i32, i32),
        frame: usize,
    }

    impl Renderable for Unit {
        fn layer(&self) -> RenderLayer {
            RenderLayer::Ground
        }

        fn sort_y(&self) -> i32 {
            self.pos.1
        }

        fn world_position(&self) -> (i32, i32) {
            self.pos
        }

        fn bounds(&self) -> Rect {
            Rect::sized(4, 4)
        }

        fn draw(&self, ctx: &mut DrawContext<'_>, surface: &mut PixelSurface<'_>, x: i32, y: i32) {
            ctx.sprites.draw(self.handle, surface, x, y, self.frame, ShapeFlags::NONE);
        }
    }

    struct Map;

    impl TerrainProvider for Map {
        fn template_at(&self, cell_x: i32, _cell_y: i32) -> Option<TemplateType> {
            (cell_x == 1).then_some(TemplateType::Water1)
        }

        fn icon_at(&self, _cell_x: i32, _cell_y: i32) -> usize {
            99
        }

        fn map_size(&self) -> (i32, i32) {
            (2, 1)
        }
    }

    fn solid_tiles(count: usize, base: u8) -> Vec<u8> {
        (0..count)
            .flat_map(|i| std::iter::repeat(base + i as u8).take(TILE_SIZE))
            .collect()
    }

    fn assets() -> Rc<dyn AssetSource> {
        let mut store = AssetStore::new();
        store.insert("CLEAR1.TMP", solid_tiles(4, 30));
        store.insert("W1.TMP", solid_tiles(4, 60));
        let frames: Vec<Vec<u8>> = (0..4u8).map(|n| vec![100 + n; 16]).collect();
        let refs: Vec<&[u8]> = frames.iter().map(Vec::as_slice).collect();
        store.insert("UNIT.SHP", RawShape::encode(4, 4, &refs));
        Rc::new(store)
    }

    /// 64x48 screen, viewport at (0,8) 48x40, palette effects off
    fn config() -> RenderConfig {
        RenderConfig {
            screen_width: 64,
            screen_height: 48,
            viewport: ViewportConfig {
                x: 0,
                y: 8,
                width: 48,
                height: 40,
            },
            water_animation: false,
            fire_animation: false,
            ..RenderConfig::default()
        }
    }

    fn block(id: u32, layer: RenderLayer, pos: (i32, i32), sort_y: i32, log: &DrawLog) -> Rc<dyn Renderable> {
        Rc::new(Block {
            id,
            layer,
            pos,
            size: (4, 4),
            sort_y,
            color: 200 + id as u8,
            log: Rc::clone(log),
        })
    }

    fn pixel(comp: &mut Compositor<'_>, x: i32, y: i32) -> Option<u8> {
        comp.screen_mut().lock()?.get_pixel(x, y)
    }

    #[test]
    fn test_queue_sorted_by_layer_then_y() {
        let mut presenter = MemoryPresenter::new(64, 48);
        let mut comp = Compositor::new(config(), Box::new(&mut presenter), assets());
        let log = DrawLog::default();
        comp.begin_frame();
        comp.add_renderable(block(1, RenderLayer::Air, (0, 0), 0, &log));
        comp.add_renderable(block(2, RenderLayer::Ground, (0, 0), 20, &log));
        comp.add_renderable(block(3, RenderLayer::Ground, (0, 0), 5, &log));
        comp.add_renderable(block(4, RenderLayer::Smudge, (0, 0), 100, &log));
        comp.add_renderable(block(5, RenderLayer::Ground, (0, 0), 5, &log));

        let layers: Vec<(RenderLayer, i32)> = comp
            .sorted_queue()
            .iter()
            .map(|e| (e.layer, e.sort_y))
            .collect();
        assert_eq!(
            layers,
            vec![
                (RenderLayer::Smudge, 100),
                (RenderLayer::Ground, 5),
                (RenderLayer::Ground, 5),
                (RenderLayer::Ground, 20),
                (RenderLayer::Air, 0),
            ]
        );

        assert!(comp.render_frame());
        // Equal keys keep insertion order
        assert_eq!(*log.borrow(), vec![4, 3, 5, 2, 1]);
        assert_eq!(comp.stats().objects_drawn, 5);
    }

    #[test]
    fn test_offscreen_renderables_are_culled() {
        let mut presenter = MemoryPresenter::new(64, 48);
        let mut comp = Compositor::new(config(), Box::new(&mut presenter), assets());
        let log = DrawLog::default();
        comp.begin_frame();
        assert!(comp.add_renderable(block(1, RenderLayer::Ground, (46, 0), 0, &log)));
        assert!(!comp.add_renderable(block(2, RenderLayer::Ground, (48, 0), 0, &log)));
        assert!(!comp.add_renderable(block(3, RenderLayer::Ground, (-4, -4), 0, &log)));
        // Screen-space objects are tested against the whole screen
        assert!(comp.add_renderable(block(4, RenderLayer::Ui, (60, 0), 0, &log)));
        assert!(!comp.add_renderable(block(5, RenderLayer::Cursor, (64, 0), 0, &log)));
        assert_eq!(comp.sorted_queue().len(), 2);
    }

    #[test]
    fn test_full_frame_terrain_sprite_and_present() {
        let mut presenter = MemoryPresenter::new(64, 48);
        {
            let mut comp = Compositor::new(config(), Box::new(&mut presenter), assets());
            assert!(comp.set_theater(Theater::Temperate));
            let handle = comp.sprites_mut().get_or_load("UNIT.SHP").unwrap();
            let unit: Rc<dyn Renderable> = Rc::new(Unit {
                handle,
                pos: (10, 10),
                frame: 2,
            });

            assert!(comp.draw_frame([unit]));
            assert_eq!(comp.frame(), 1);
            let stats = comp.stats();
            assert_eq!(stats.dirty_rects, 1);
            assert_eq!(stats.objects_drawn, 1);
            // 48x40 viewport at scroll 0 covers 2x2 cells
            assert_eq!(stats.tiles_drawn, 4);

            // Sprite frame 2 at world (10,10) lands at screen (10,18)
            assert_eq!(pixel(&mut comp, 10, 18), Some(102));
            assert_eq!(pixel(&mut comp, 13, 21), Some(102));
            let terrain = pixel(&mut comp, 0, 8).unwrap();
            assert!((30..34).contains(&terrain));
            // Outside the viewport nothing was drawn
            assert_eq!(pixel(&mut comp, 60, 0), Some(0));
        }
        assert_eq!(presenter.present_count(), 1);
        assert_eq!(presenter.rgb_at(10, 18), Some((102, 102, 102)));
    }

    #[test]
    fn test_incremental_redraw_only_touches_dirty_regions() {
        let mut presenter = MemoryPresenter::new(64, 48);
        let mut comp = Compositor::new(config(), Box::new(&mut presenter), assets());
        comp.set_theater(Theater::Temperate);
        assert!(comp.draw_frame([]));
        assert!(!comp.dirty().is_full_redraw());

        {
            let mut s = comp.screen_mut().lock().unwrap();
            s.put_pixel(1, 9, 7);
            s.put_pixel(40, 40, 7);
        }
        comp.add_dirty_rect(Rect::new(0, 8, 10, 10));
        assert!(comp.draw_frame([]));
        assert_ne!(pixel(&mut comp, 1, 9), Some(7));
        assert_eq!(pixel(&mut comp, 40, 40), Some(7));
        assert_eq!(comp.stats().tiles_drawn, 1);

        // Nothing dirty: nothing repainted
        comp.screen_mut().lock().unwrap().put_pixel(1, 9, 7);
        assert!(comp.draw_frame([]));
        assert_eq!(pixel(&mut comp, 1, 9), Some(7));
        assert_eq!(comp.stats().dirty_rects, 0);
    }

    #[test]
    fn test_world_dirty_rect_and_scroll() {
        let mut presenter = MemoryPresenter::new(64, 48);
        let mut comp = Compositor::new(config(), Box::new(&mut presenter), assets());
        assert!(comp.draw_frame([]));

        comp.add_dirty_world_rect(Rect::new(5, 5, 4, 4));
        assert_eq!(comp.dirty().rects(), &[Rect::new(5, 13, 4, 4)]);

        comp.set_scroll(0, 0);
        assert!(!comp.dirty().is_full_redraw());
        comp.set_scroll(24, 0);
        assert!(comp.dirty().is_full_redraw());
        assert_eq!(comp.world_to_screen(24, 0), (0, 8));
        assert_eq!(comp.screen_to_world(0, 8), (24, 0));
    }

    #[test]
    fn test_screen_space_layers_ignore_viewport_clip() {
        let mut presenter = MemoryPresenter::new(64, 48);
        let mut comp = Compositor::new(config(), Box::new(&mut presenter), assets());
        comp.set_scroll(100, 100);
        let log = DrawLog::default();
        let ui = block(1, RenderLayer::Ui, (50, 0), 0, &log);
        let cursor = block(2, RenderLayer::Cursor, (52, 2), 0, &log);
        assert!(comp.draw_frame([ui, cursor]));
        assert_eq!(pixel(&mut comp, 50, 0), Some(201));
        assert_eq!(pixel(&mut comp, 53, 3), Some(202));
        assert_eq!(*log.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_world_objects_clipped_to_viewport() {
        let mut presenter = MemoryPresenter::new(64, 48);
        let mut comp = Compositor::new(config(), Box::new(&mut presenter), assets());
        let log = DrawLog::default();
        // Straddles the right viewport edge at x = 48
        let obj = block(1, RenderLayer::Building, (46, 0), 0, &log);
        assert!(comp.draw_frame([obj]));
        assert_eq!(pixel(&mut comp, 47, 8), Some(201));
        assert_eq!(pixel(&mut comp, 48, 8), Some(0));
    }

    #[test]
    fn test_terrain_provider() {
        let mut presenter = MemoryPresenter::new(64, 48);
        let mut comp = Compositor::new(config(), Box::new(&mut presenter), assets());
        comp.set_theater(Theater::Temperate);
        comp.set_terrain(Box::new(Map));
        comp.screen_mut().lock().unwrap().clear(99);
        assert!(comp.draw_frame([]));

        // Cell (1,0) is water; icon 99 falls back to tile 0
        assert_eq!(pixel(&mut comp, 30, 10), Some(60));
        assert!((30..34).contains(&pixel(&mut comp, 5, 10).unwrap()));
        // Row 1 is outside the map
        assert_eq!(pixel(&mut comp, 5, 40), Some(0));
    }

    #[test]
    fn test_debug_overlay() {
        let mut presenter = MemoryPresenter::new(64, 48);
        let mut comp = Compositor::new(config(), Box::new(&mut presenter), assets());
        comp.set_debug_overlay(true);
        assert!(comp.draw_frame([]));
        assert_eq!(pixel(&mut comp, 0, 8), Some(DEBUG_VIEWPORT_COLOR));
        assert_eq!(pixel(&mut comp, 47, 30), Some(DEBUG_VIEWPORT_COLOR));

        comp.add_dirty_rect(Rect::new(10, 20, 5, 5));
        comp.begin_frame();
        assert!(comp.render_frame());
        assert_eq!(pixel(&mut comp, 10, 20), Some(DEBUG_DIRTY_COLOR));
        assert_eq!(pixel(&mut comp, 14, 24), Some(DEBUG_DIRTY_COLOR));
    }

    #[test]
    fn test_debug_outlines_are_erased_next_frame() {
        let mut presenter = MemoryPresenter::new(64, 48);
        let mut comp = Compositor::new(config(), Box::new(&mut presenter), assets());
        comp.set_theater(Theater::Temperate);
        assert!(comp.draw_frame([]));
        comp.set_debug_overlay(true);
        assert!(comp.draw_frame([]));

        comp.add_dirty_rect(Rect::new(10, 20, 5, 5));
        assert!(comp.draw_frame([]));
        assert_eq!(pixel(&mut comp, 10, 20), Some(DEBUG_DIRTY_COLOR));
        assert_eq!(comp.stats().tiles_drawn, 4);

        // No new dirty rects, yet the old outline is painted over
        assert!(comp.draw_frame([]));
        assert!((30..34).contains(&pixel(&mut comp, 10, 20).unwrap()));
        assert_eq!(pixel(&mut comp, 0, 8), Some(DEBUG_VIEWPORT_COLOR));

        comp.set_debug_overlay(false);
        assert!(comp.dirty().is_full_redraw());
        assert!(comp.draw_frame([]));
        assert!((30..34).contains(&pixel(&mut comp, 0, 8).unwrap()));
    }

    #[test]
    fn test_object_over_several_regions_counted_once() {
        let mut presenter = MemoryPresenter::new(64, 48);
        let config = RenderConfig {
            merge_distance: 0,
            ..config()
        };
        let mut comp = Compositor::new(config, Box::new(&mut presenter), assets());
        assert!(comp.draw_frame([]));

        let log = DrawLog::default();
        comp.add_dirty_rect(Rect::new(0, 8, 2, 2));
        comp.add_dirty_rect(Rect::new(3, 8, 2, 2));
        assert_eq!(comp.dirty().len(), 2);
        assert!(comp.draw_frame([block(1, RenderLayer::Ground, (0, 0), 0, &log)]));
        assert_eq!(*log.borrow(), vec![1, 1]);
        assert_eq!(comp.stats().dirty_rects, 2);
        assert_eq!(comp.stats().objects_drawn, 1);
    }

    #[test]
    fn test_reselecting_theater_is_not_a_failure() {
        let mut presenter = MemoryPresenter::new(64, 48);
        let mut comp = Compositor::new(config(), Box::new(&mut presenter), assets());
        assert!(comp.set_theater(Theater::Temperate));
        assert!(comp.draw_frame([]));
        assert!(comp.set_theater(Theater::Temperate));
        assert!(!comp.dirty().is_full_redraw());
    }

    #[test]
    fn test_palette_edits_refresh_remaps() {
        use crate::palette::{Color, PALETTE_SIZE};

        let mut presenter = MemoryPresenter::new(64, 48);
        let mut comp = Compositor::new(config(), Box::new(&mut presenter), assets());
        let before = comp.remaps().clone();

        let mut colors = [Color::BLACK; PALETTE_SIZE];
        for (i, c) in colors.iter_mut().enumerate() {
            *c = Color::new(i as u8, 0, 255 - i as u8);
        }
        comp.palette_mut().set_palette(&colors);
        assert_eq!(*comp.remaps(), before);

        comp.begin_frame();
        let expected = comp.palette().remap_tables(config().shadow_intensity);
        assert_eq!(*comp.remaps(), expected);
        assert_ne!(*comp.remaps(), before);
    }

    #[test]
    fn test_uninitialized_presenter_fails_quietly() {
        let mut presenter = MemoryPresenter::new(64, 48);
        presenter.set_initialized(false);
        let mut comp = Compositor::new(config(), Box::new(&mut presenter), assets());
        comp.begin_frame();
        assert!(!comp.render_frame());
        assert!(!comp.end_frame());
        assert!(!comp.draw_frame([]));
    }

    #[test]
    fn test_palette_upload_only_when_changed() {
        let mut presenter = MemoryPresenter::new(64, 48);
        let mut comp = Compositor::new(config(), Box::new(&mut presenter), assets());
        assert!(comp.draw_frame([]));
        assert!(comp.stats().palette_uploaded);
        assert!(comp.draw_frame([]));
        assert!(!comp.stats().palette_uploaded);

        comp.palette_mut().start_fade_out(4, None);
        assert!(comp.draw_frame([]));
        assert!(comp.stats().palette_uploaded);
    }

    #[test]
    fn test_dirty_rects_disabled_redraws_everything() {
        let mut presenter = MemoryPresenter::new(64, 48);
        let mut comp = Compositor::new(config(), Box::new(&mut presenter), assets());
        comp.set_dirty_rects_enabled(false);
        assert!(comp.draw_frame([]));
        assert!(comp.draw_frame([]));
        assert_eq!(comp.stats().dirty_rects, 1);
        assert_eq!(comp.stats().tiles_drawn, 4);
    }
}
