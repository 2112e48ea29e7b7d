//! palcomp-view: scrolls a procedurally generated map with a few units on it

use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::filter::threshold::ThresholdFilter;
use palcomp::compositor::{DrawContext, RenderLayer, Renderable, TerrainProvider};
use palcomp::display::{Display, InputEvent, SdlPresenter};
use palcomp::palette::{Color, FlashColor, HouseColor, FADE_LEVELS, PALETTE_SIZE};
use palcomp::sprite::{RawShape, ShapeFlags, SpriteHandle};
use palcomp::tile::{OverlayType, TemplateType, Theater, TILE_HEIGHT, TILE_SIZE, TILE_WIDTH};
use palcomp::{AssetStore, Compositor, PixelSurface, Rect, RenderConfig};
use sdl2::keyboard::Keycode;
use std::rc::Rc;
use std::time::Instant;

const MAP_WIDTH: i32 = 48;
const MAP_HEIGHT: i32 = 32;
const UNIT_SIZE: i32 = 16;
const UNIT_FRAMES: usize = 8;
const SCROLL_STEP: i32 = 8;
const STATS_INTERVAL: u32 = 300;

struct Options {
    config: RenderConfig,
    scale: u32,
    vsync: bool,
    level: LevelFilter,
}

/// Parse command line arguments
fn parse_args() -> Options {
    let args: Vec<String> = std::env::args().collect();
    let mut options = Options {
        config: RenderConfig::default(),
        scale: 2,
        vsync: true,
        level: LevelFilter::Info,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--no-vsync" => options.vsync = false,
            "--debug" => options.level = LevelFilter::Debug,
            "--scale" | "-s" => {
                if i + 1 < args.len() {
                    if let Ok(s) = args[i + 1].parse::<u32>() {
                        options.scale = s;
                    }
                    i += 1;
                }
            },
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    match RenderConfig::load(&args[i + 1]) {
                        Ok(config) => options.config = config,
                        Err(e) => eprintln!("Failed to load {}: {}", args[i + 1], e),
                    }
                    i += 1;
                }
            },
            "--help" => {
                println!("Usage: palcomp-view [OPTIONS]");
                println!();
                println!("Options:");
                println!("  --config FILE, -c FILE  Load render settings from JSON");
                println!("  --scale N, -s N         Window scale factor (default: 2)");
                println!("  --no-vsync              Disable VSync for uncapped framerate");
                println!("  --debug                 Verbose logging");
                println!("  --help                  Show this help message");
                std::process::exit(0);
            },
            _ => {},
        }
        i += 1;
    }

    options
}

fn init_log(level: LevelFilter) -> Result<(), String> {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d(%H:%M:%S)} {l} {t} {m}{n}")))
        .build();
    let config = Config::builder()
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(level)))
                .build("stdout", Box::new(stdout)),
        )
        .build(Root::builder().appender("stdout").build(level))
        .map_err(|e| e.to_string())?;
    log4rs::init_config(config).map_err(|e| e.to_string())?;
    Ok(())
}

// ============================================================================
// Demo Helpers
// ============================================================================

/// Seeded 15-bit linear congruential generator, enough to scatter noise
/// and units reproducibly
struct Dice(u32);

impl Dice {
    fn roll(&mut self) -> u32 {
        self.0 = self.0.wrapping_mul(1103515245).wrapping_add(12345);
        (self.0 >> 16) & 0x7fff
    }

    /// Value in [0, n)
    fn below(&mut self, n: u32) -> u32 {
        self.roll() % n.max(1)
    }

    /// Value in [min, max]
    fn range(&mut self, min: i32, max: i32) -> i32 {
        min + self.below((max - min + 1) as u32) as i32
    }
}

/// Frame rate over the frames since the last sample
struct FrameClock {
    since: Instant,
    frames: u32,
}

impl FrameClock {
    fn new() -> Self {
        Self {
            since: Instant::now(),
            frames: 0,
        }
    }

    fn tick(&mut self) {
        self.frames += 1;
    }

    /// (fps, ms per frame) since the previous sample, then restart
    fn sample(&mut self) -> (f32, f32) {
        let elapsed = self.since.elapsed().as_secs_f32();
        let frames = self.frames.max(1) as f32;
        self.since = Instant::now();
        self.frames = 0;
        if elapsed > 0.0 {
            (frames / elapsed, elapsed * 1000.0 / frames)
        } else {
            (0.0, 0.0)
        }
    }
}

// ============================================================================
// Procedural Assets
// ============================================================================

fn ramp(from: (u8, u8, u8), to: (u8, u8, u8), t: f32) -> Color {
    Color::new(from.0, from.1, from.2).lerp(Color::new(to.0, to.1, to.2), t)
}

fn demo_palette() -> Vec<u8> {
    let mut colors = [Color::BLACK; PALETTE_SIZE];
    for (i, c) in colors.iter_mut().enumerate() {
        *c = match i {
            0 => Color::BLACK,
            // UI grays
            1..=15 => {
                let v = (i * 16) as u8;
                Color::new(v, v, v)
            },
            // Grass
            16..=47 => ramp((20, 60, 10), (90, 150, 50), (i - 16) as f32 / 31.0),
            // Road and rock
            48..=63 => ramp((60, 55, 50), (150, 140, 120), (i - 48) as f32 / 15.0),
            // House ramp, dark to light
            80..=95 => {
                let v = (60 + (i - 80) * 12) as u8;
                Color::new(v, v, v)
            },
            // Fire
            96..=111 => ramp((120, 10, 0), (255, 220, 60), (i - 96) as f32 / 15.0),
            // Sand
            112..=127 => ramp((140, 120, 70), (230, 210, 150), (i - 112) as f32 / 15.0),
            // Water, cycled
            192..=207 => {
                let t = ((i - 192) as f32 / 16.0 * std::f32::consts::TAU).sin() * 0.5 + 0.5;
                ramp((10, 40, 110), (60, 120, 200), t)
            },
            // Unused entries: muted bands so house remaps have hues to find
            _ => {
                let band = [(200, 40, 40), (40, 160, 60), (50, 80, 200), (210, 190, 40)][i % 4];
                ramp((30, 30, 30), band, (i % 16) as f32 / 15.0)
            },
        };
    }
    colors.iter().flat_map(|c| [c.r, c.g, c.b]).collect()
}

/// `count` tiles of noise over `base..base + spread`
fn noise_tiles(dice: &mut Dice, count: usize, base: u8, spread: u8) -> Vec<u8> {
    (0..count * TILE_SIZE)
        .map(|_| base + dice.below(spread as u32) as u8)
        .collect()
}

/// Water tiles with diagonal stripes so the palette cycle reads as motion
fn water_tiles(count: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(count * TILE_SIZE);
    for n in 0..count {
        for y in 0..TILE_HEIGHT {
            for x in 0..TILE_WIDTH {
                data.push(192 + ((x + y + n as i32 * 3) % 16) as u8);
            }
        }
    }
    data
}

/// Round body in the house ramp with a barrel pointing in one of eight
/// directions per frame
fn unit_shape() -> Vec<u8> {
    let center = UNIT_SIZE / 2;
    let frames: Vec<Vec<u8>> = (0..UNIT_FRAMES)
        .map(|f| {
            let mut pixels = vec![0u8; (UNIT_SIZE * UNIT_SIZE) as usize];
            for y in 0..UNIT_SIZE {
                for x in 0..UNIT_SIZE {
                    let (dx, dy) = (x - center, y - center);
                    let d2 = dx * dx + dy * dy;
                    if d2 <= 25 {
                        pixels[(y * UNIT_SIZE + x) as usize] = 80 + (15 - d2 * 15 / 25) as u8;
                    }
                }
            }
            let angle = f as f32 / UNIT_FRAMES as f32 * std::f32::consts::TAU;
            for step in 0..8 {
                let x = center + (angle.cos() * step as f32) as i32;
                let y = center + (angle.sin() * step as f32) as i32;
                if (0..UNIT_SIZE).contains(&x) && (0..UNIT_SIZE).contains(&y) {
                    pixels[(y * UNIT_SIZE + x) as usize] = 4;
                }
            }
            pixels
        })
        .collect();
    let refs: Vec<&[u8]> = frames.iter().map(Vec::as_slice).collect();
    RawShape::encode(UNIT_SIZE as u16, UNIT_SIZE as u16, &refs)
}

fn gold_shape(dice: &mut Dice) -> Vec<u8> {
    let frame: Vec<u8> = (0..TILE_SIZE)
        .map(|_| if dice.below(6) == 0 { 100 + dice.below(12) as u8 } else { 0 })
        .collect();
    RawShape::encode(TILE_WIDTH as u16, TILE_HEIGHT as u16, &[&frame])
}

fn demo_assets() -> AssetStore {
    let mut dice = Dice(0x5eed);
    let mut store = AssetStore::new();
    store.insert("TEMPERAT.PAL", demo_palette());
    store.insert("CLEAR1.TMP", noise_tiles(&mut dice, 4, 16, 32));
    store.insert("RD01.TMP", noise_tiles(&mut dice, 2, 48, 16));
    store.insert("SH1.TMP", noise_tiles(&mut dice, 2, 112, 16));
    store.insert("W1.TMP", water_tiles(4));
    store.insert("UNIT.SHP", unit_shape());
    store.insert(OverlayType::Gold1.file_name().as_str(), gold_shape(&mut dice));
    store
}

// ============================================================================
// Scene
// ============================================================================

/// River across the middle, a beach on each bank and a road down column 10
struct DemoMap;

impl TerrainProvider for DemoMap {
    fn template_at(&self, cell_x: i32, cell_y: i32) -> Option<TemplateType> {
        let river = 14 + (cell_x / 6) % 3;
        match cell_y - river {
            0 | 1 => Some(TemplateType::Water1),
            -1 | 2 => Some(TemplateType::Shore1),
            _ if cell_x == 10 => Some(TemplateType::Road1),
            _ => None,
        }
    }

    fn icon_at(&self, cell_x: i32, cell_y: i32) -> usize {
        ((cell_x + cell_y) & 3) as usize
    }

    fn map_size(&self) -> (i32, i32) {
        (MAP_WIDTH, MAP_HEIGHT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    Normal,
    Ghost,
    Predator,
    Fading,
}

struct Unit {
    x: i32,
    y: i32,
    dx: i32,
    dy: i32,
    house: HouseColor,
    style: Style,
}

impl Unit {
    fn facing(&self) -> usize {
        match (self.dx.signum(), self.dy.signum()) {
            (1, 0) => 0,
            (1, 1) => 1,
            (0, 1) => 2,
            (-1, 1) => 3,
            (-1, 0) => 4,
            (-1, -1) => 5,
            (0, -1) => 6,
            _ => 7,
        }
    }

    fn bounds(&self) -> Rect {
        Rect::new(self.x - UNIT_SIZE / 2 - 2, self.y - UNIT_SIZE / 2 - 2, UNIT_SIZE + 4, UNIT_SIZE + 4)
    }

    fn step(&mut self) {
        let (w, h) = (MAP_WIDTH * TILE_WIDTH, MAP_HEIGHT * TILE_HEIGHT);
        self.x += self.dx;
        self.y += self.dy;
        if self.x < UNIT_SIZE || self.x > w - UNIT_SIZE {
            self.dx = -self.dx;
        }
        if self.y < UNIT_SIZE || self.y > h - UNIT_SIZE {
            self.dy = -self.dy;
        }
    }
}

/// One frame's snapshot of a unit
struct UnitSprite {
    handle: SpriteHandle,
    x: i32,
    y: i32,
    frame: usize,
    house: HouseColor,
    style: Style,
    layer: RenderLayer,
}

impl Renderable for UnitSprite {
    fn layer(&self) -> RenderLayer {
        self.layer
    }

    fn sort_y(&self) -> i32 {
        self.y
    }

    fn world_position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    fn bounds(&self) -> Rect {
        Rect::new(-UNIT_SIZE / 2 - 2, -UNIT_SIZE / 2 - 2, UNIT_SIZE + 4, UNIT_SIZE + 4)
    }

    fn draw(&self, ctx: &mut DrawContext<'_>, surface: &mut PixelSurface<'_>, x: i32, y: i32) {
        let remaps = ctx.remaps;
        let phase = (ctx.frame / 4) as u8;
        let Some(asset) = ctx.sprites.get_mut(self.handle) else {
            return;
        };
        let flags = ShapeFlags::CENTER;
        if self.layer == RenderLayer::Shadow {
            asset.draw_shadow(surface, x + 3, y + 3, self.frame, flags, remaps.shadow.as_array());
            return;
        }
        match self.style {
            Style::Normal => {
                let remap = remaps.house(self.house).as_array();
                asset.draw_remapped(surface, x, y, self.frame, flags, remap);
            },
            Style::Ghost => {
                asset.draw_ghost(surface, x, y, self.frame, flags, phase);
            },
            Style::Predator => {
                asset.draw_predator(surface, x, y, self.frame, flags, phase);
            },
            Style::Fading => {
                let level = i32::from(phase) % (FADE_LEVELS as i32 * 2) - FADE_LEVELS as i32;
                asset.draw_fading(surface, x, y, self.frame, flags, &remaps.fade, level.abs());
            },
        }
    }
}

/// Solid screen-space panel
struct Panel {
    rect: Rect,
    color: u8,
}

impl Renderable for Panel {
    fn layer(&self) -> RenderLayer {
        RenderLayer::Ui
    }

    fn sort_y(&self) -> i32 {
        self.rect.y
    }

    fn world_position(&self) -> (i32, i32) {
        (self.rect.x, self.rect.y)
    }

    fn bounds(&self) -> Rect {
        Rect::sized(self.rect.width, self.rect.height)
    }

    fn draw(&self, _ctx: &mut DrawContext<'_>, surface: &mut PixelSurface<'_>, x: i32, y: i32) {
        surface.fill_rect(Rect::new(x, y, self.rect.width, self.rect.height), self.color);
        surface.hline(x, y, self.rect.width, 15);
    }
}

/// Gold patch drawn from the overlay set
struct Gold {
    x: i32,
    y: i32,
}

impl Renderable for Gold {
    fn layer(&self) -> RenderLayer {
        RenderLayer::Overlay
    }

    fn sort_y(&self) -> i32 {
        self.y
    }

    fn world_position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    fn bounds(&self) -> Rect {
        Rect::sized(TILE_WIDTH, TILE_HEIGHT)
    }

    fn draw(&self, ctx: &mut DrawContext<'_>, surface: &mut PixelSurface<'_>, x: i32, y: i32) {
        ctx.tiles.draw_overlay(surface, x, y, OverlayType::Gold1, 0);
    }
}

fn spawn_units(dice: &mut Dice) -> Vec<Unit> {
    (0..12)
        .map(|i| {
            let style = match i % 6 {
                3 => Style::Fading,
                4 => Style::Ghost,
                5 => Style::Predator,
                _ => Style::Normal,
            };
            let mut dx = dice.range(-2, 2);
            if dx == 0 {
                dx = 1;
            }
            Unit {
                x: dice.range(40, 600),
                y: dice.range(40, 400),
                dx,
                dy: dice.range(-2, 2),
                house: HouseColor::ALL[i % HouseColor::ALL.len()],
                style,
            }
        })
        .collect()
}

fn main() -> Result<(), String> {
    let options = parse_args();
    init_log(options.level)?;
    let config = options.config;
    let (width, height) = (config.screen_width as u32, config.screen_height as u32);

    let (display, mut events, texture_creator) =
        Display::with_options("palcomp", width, height, options.scale, options.vsync)?;
    let presenter = SdlPresenter::new(display, &texture_creator)?;

    let viewport = config.viewport.rect();
    let mut comp = Compositor::new(config, Box::new(presenter), Rc::new(demo_assets()));
    comp.set_theater(Theater::Temperate);
    comp.set_terrain(Box::new(DemoMap));
    let unit_shape = comp
        .sprites_mut()
        .get_or_load("UNIT.SHP")
        .map_err(|e| e.to_string())?;
    comp.palette_mut().start_fade_in(30, Some(Box::new(|| log::info!("fade in complete"))));

    let panels: Vec<Rc<dyn Renderable>> = vec![
        Rc::new(Panel {
            rect: Rect::new(0, 0, width as i32, viewport.y),
            color: 3,
        }),
        Rc::new(Panel {
            rect: Rect::new(viewport.right(), viewport.y, width as i32 - viewport.right(), height as i32),
            color: 6,
        }),
    ];
    let gold: Vec<Rc<dyn Renderable>> = [(5, 5), (6, 5), (20, 8), (30, 24)]
        .iter()
        .map(|&(cx, cy)| {
            Rc::new(Gold {
                x: cx * TILE_WIDTH,
                y: cy * TILE_HEIGHT,
            }) as Rc<dyn Renderable>
        })
        .collect();

    let mut units = spawn_units(&mut Dice(7));
    let mut clock = FrameClock::new();
    let (max_x, max_y) = (
        MAP_WIDTH * TILE_WIDTH - viewport.width,
        MAP_HEIGHT * TILE_HEIGHT - viewport.height,
    );

    log::info!("arrows scroll, F flash, B fade, D debug overlay, R dirty rects, Esc quit");

    'main: loop {
        clock.tick();

        for event in events.poll_events() {
            let InputEvent::KeyDown(key) = event else {
                break 'main;
            };
            let (sx, sy) = comp.scroll();
            match key {
                Keycode::Escape => break 'main,
                Keycode::Left => comp.set_scroll((sx - SCROLL_STEP).max(0), sy),
                Keycode::Right => comp.set_scroll((sx + SCROLL_STEP).min(max_x), sy),
                Keycode::Up => comp.set_scroll(sx, (sy - SCROLL_STEP).max(0)),
                Keycode::Down => comp.set_scroll(sx, (sy + SCROLL_STEP).min(max_y)),
                Keycode::F => comp.palette_mut().flash(FlashColor::White, 12, 0.8),
                Keycode::B => {
                    let palette = comp.palette_mut();
                    if palette.fade_progress() > 0.5 {
                        palette.start_fade_out(FADE_LEVELS as u32 * 2, None);
                    } else {
                        palette.start_fade_in(FADE_LEVELS as u32 * 2, None);
                    }
                },
                Keycode::D => {
                    let enabled = !comp.config().debug_overlay;
                    comp.set_debug_overlay(enabled);
                },
                Keycode::R => {
                    let enabled = !comp.config().dirty_rects;
                    comp.set_dirty_rects_enabled(enabled);
                    log::info!("dirty rects {}", if enabled { "on" } else { "off" });
                },
                _ => {},
            }
        }

        let mut objects: Vec<Rc<dyn Renderable>> = Vec::with_capacity(units.len() * 2 + 8);
        for unit in &mut units {
            comp.add_dirty_world_rect(unit.bounds().offset(3, 3).union(&unit.bounds()));
            unit.step();
            comp.add_dirty_world_rect(unit.bounds().offset(3, 3).union(&unit.bounds()));

            for layer in [RenderLayer::Shadow, RenderLayer::Ground] {
                objects.push(Rc::new(UnitSprite {
                    handle: unit_shape,
                    x: unit.x,
                    y: unit.y,
                    frame: unit.facing(),
                    house: unit.house,
                    style: unit.style,
                    layer,
                }));
            }
        }
        objects.extend(gold.iter().cloned());
        objects.extend(panels.iter().cloned());

        comp.draw_frame(objects);

        if comp.frame() % STATS_INTERVAL == 0 {
            let stats = comp.stats();
            let (fps, frame_ms) = clock.sample();
            log::info!(
                "{:.0} fps ({:.1} ms), {} tiles, {} objects, {} dirty rects",
                fps,
                frame_ms,
                stats.tiles_drawn,
                stats.objects_drawn,
                stats.dirty_rects
            );
        }
    }

    Ok(())
}
