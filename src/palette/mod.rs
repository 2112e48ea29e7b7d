//! 256-color palette with fade, flash and color-cycling effects.
//!
//! Effects never touch pixels: they are baked into the "current" table,
//! which is what gets handed to the presentation layer each frame.

mod remap;

pub use remap::{
    closest_color, ghost_table, house_remap, shadow_table, FadeTables, HouseColor, RemapTable,
    RemapTables, FADE_LEVELS, HOUSE_REMAP_COUNT, HOUSE_REMAP_START,
};

use crate::asset::AssetSource;
use crate::error::LoadError;
use crate::util::lerp_channel;
use std::ops::RangeInclusive;

pub const PALETTE_SIZE: usize = 256;
pub const PALETTE_BYTES: usize = PALETTE_SIZE * 3;
pub const MAX_ANIMATION_RANGES: usize = 8;

/// Interface colors that fades leave alone
pub const UI_PROTECTED: RangeInclusive<usize> = 1..=15;

pub const WATER_START: usize = 192;
pub const WATER_COUNT: usize = 16;
pub const WATER_DELAY: u32 = 4;
pub const FIRE_START: usize = 96;
pub const FIRE_COUNT: usize = 16;
pub const FIRE_DELAY: u32 = 3;

// ============================================================================
// Color
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const WHITE: Color = Color::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Multiply every channel by `factor`, truncating
    #[inline]
    pub fn scaled(self, factor: f32) -> Self {
        let f = |v: u8| (v as f32 * factor).clamp(0.0, 255.0) as u8;
        Self::new(f(self.r), f(self.g), f(self.b))
    }

    #[inline]
    pub fn lerp(self, to: Color, t: f32) -> Self {
        Self::new(
            lerp_channel(self.r, to.r, t),
            lerp_channel(self.g, to.g, t),
            lerp_channel(self.b, to.b, t),
        )
    }

    #[inline]
    pub fn distance_sq(self, other: Color) -> u32 {
        let dr = self.r as i32 - other.r as i32;
        let dg = self.g as i32 - other.g as i32;
        let db = self.b as i32 - other.b as i32;
        (dr * dr + dg * dg + db * db) as u32
    }
}

/// Channel depth of raw palette bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteFormat {
    /// VGA DAC values 0..=63, shifted left by 2 on load
    Vga6,
    Rgb8,
}

impl PaletteFormat {
    /// Treat data as 6-bit when no channel exceeds 63
    pub fn detect(data: &[u8]) -> Self {
        if data.iter().take(PALETTE_BYTES).all(|&v| v <= 63) {
            PaletteFormat::Vga6
        } else {
            PaletteFormat::Rgb8
        }
    }
}

// ============================================================================
// Effect State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeState {
    None,
    FadingIn,
    FadingOut,
    FadedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashColor {
    White,
    Red,
    Green,
    Custom(Color),
}

impl FlashColor {
    pub fn color(self) -> Color {
        match self {
            FlashColor::White => Color::WHITE,
            FlashColor::Red => Color::new(255, 0, 0),
            FlashColor::Green => Color::new(0, 255, 0),
            FlashColor::Custom(c) => c,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Flash {
    color: Color,
    peak: f32,
    current: f32,
    frame: u32,
    duration: u32,
    active: bool,
}

impl Default for Flash {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            peak: 0.0,
            current: 0.0,
            frame: 0,
            duration: 1,
            active: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleDirection {
    /// Last entry moves to the front
    Forward,
    /// First entry moves to the back
    Backward,
}

/// A run of base-palette entries rotated by one every `delay` frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationRange {
    pub start: usize,
    pub count: usize,
    pub delay: u32,
    pub direction: CycleDirection,
    counter: u32,
}

impl AnimationRange {
    fn rotate(&self, colors: &mut [Color; PALETTE_SIZE]) {
        if self.count <= 1 {
            return;
        }
        let span = &mut colors[self.start..self.start + self.count];
        match self.direction {
            CycleDirection::Forward => span.rotate_right(1),
            CycleDirection::Backward => span.rotate_left(1),
        }
    }
}

pub type FadeCallback = Box<dyn FnOnce()>;

// ============================================================================
// PaletteEngine
// ============================================================================

pub struct PaletteEngine {
    base: [Color; PALETTE_SIZE],
    current: [Color; PALETTE_SIZE],

    fade_state: FadeState,
    fade_frame: u32,
    fade_frames: u32,
    fade_progress: f32,
    fade_callback: Option<FadeCallback>,

    flash: Flash,
    ranges: Vec<AnimationRange>,

    /// Current table changed since the last `take_dirty`
    dirty: bool,
    /// Bumped whenever the base table is replaced or edited. Color cycling
    /// does not count.
    revision: u32,
}

impl PaletteEngine {
    /// Grayscale palette, entry 0 black, no effects running
    pub fn new() -> Self {
        let mut base = [Color::BLACK; PALETTE_SIZE];
        for (i, c) in base.iter_mut().enumerate().skip(1) {
            *c = Color::new(i as u8, i as u8, i as u8);
        }
        let mut engine = Self {
            base,
            current: base,
            fade_state: FadeState::None,
            fade_frame: 0,
            fade_frames: 1,
            fade_progress: 1.0,
            fade_callback: None,
            flash: Flash::default(),
            ranges: Vec::with_capacity(MAX_ANIMATION_RANGES),
            dirty: true,
            revision: 0,
        };
        engine.recompute();
        engine
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Replace the base palette from 768 raw bytes
    pub fn load_bytes(&mut self, data: &[u8], format: PaletteFormat) -> Result<(), LoadError> {
        if data.len() < PALETTE_BYTES {
            return Err(LoadError::Truncated {
                expected: PALETTE_BYTES,
                actual: data.len(),
            });
        }
        let shift = match format {
            PaletteFormat::Vga6 => 2,
            PaletteFormat::Rgb8 => 0,
        };
        for (c, rgb) in self.base.iter_mut().zip(data.chunks_exact(3)) {
            *c = Color::new(rgb[0] << shift, rgb[1] << shift, rgb[2] << shift);
        }
        self.base[0] = Color::BLACK;
        self.revision = self.revision.wrapping_add(1);
        self.recompute();
        Ok(())
    }

    /// Load a named palette asset, detecting 6-bit data
    pub fn load(&mut self, assets: &dyn AssetSource, name: &str) -> Result<(), LoadError> {
        let data = assets
            .read(name)
            .ok_or_else(|| LoadError::NotFound(name.to_string()))?;
        self.load_bytes(data, PaletteFormat::detect(data))?;
        log::info!("loaded palette {}", name);
        Ok(())
    }

    pub fn set_palette(&mut self, colors: &[Color; PALETTE_SIZE]) {
        self.base = *colors;
        self.base[0] = Color::BLACK;
        self.revision = self.revision.wrapping_add(1);
        self.recompute();
    }

    /// Set one base entry. Entry 0 stays black, so index 0 is refused.
    pub fn set_color(&mut self, index: u8, color: Color) -> bool {
        if index == 0 {
            return false;
        }
        self.base[index as usize] = color;
        self.revision = self.revision.wrapping_add(1);
        self.recompute();
        true
    }

    /// Changes whenever the base colors are loaded or edited, so derived
    /// remap tables can tell they are stale
    #[inline]
    pub fn revision(&self) -> u32 {
        self.revision
    }

    pub fn base(&self) -> &[Color; PALETTE_SIZE] {
        &self.base
    }

    /// Base palette with fade and flash applied
    pub fn current(&self) -> &[Color; PALETTE_SIZE] {
        &self.current
    }

    pub fn color(&self, index: u8) -> Color {
        self.base[index as usize]
    }

    /// Current table as 768 bytes of 8-bit RGB
    pub fn export_bytes(&self) -> Vec<u8> {
        self.current
            .iter()
            .flat_map(|c| [c.r, c.g, c.b])
            .collect()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the dirty flag, returning whether it was set
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    // ========================================================================
    // Fade
    // ========================================================================

    /// Fade from black to the base palette over `frames` updates
    pub fn start_fade_in(&mut self, frames: u32, on_complete: Option<FadeCallback>) {
        self.begin_fade(FadeState::FadingIn, frames, on_complete);
        self.fade_progress = 0.0;
        self.recompute();
    }

    /// Fade from the base palette to black over `frames` updates
    pub fn start_fade_out(&mut self, frames: u32, on_complete: Option<FadeCallback>) {
        self.begin_fade(FadeState::FadingOut, frames, on_complete);
        self.fade_progress = 1.0;
        self.recompute();
    }

    fn begin_fade(&mut self, state: FadeState, frames: u32, on_complete: Option<FadeCallback>) {
        self.fade_state = state;
        self.fade_frames = frames.max(1);
        self.fade_frame = 0;
        self.fade_callback = on_complete;
    }

    /// Jump straight to black, cancelling any fade
    pub fn fade_to_black(&mut self) {
        self.fade_state = FadeState::FadedOut;
        self.fade_progress = 0.0;
        self.fade_callback = None;
        self.recompute();
    }

    /// Jump straight back to the base palette, cancelling any fade
    pub fn restore_from_black(&mut self) {
        self.fade_state = FadeState::None;
        self.fade_progress = 1.0;
        self.fade_callback = None;
        self.recompute();
    }

    pub fn fade_state(&self) -> FadeState {
        self.fade_state
    }

    /// 0.0 is black, 1.0 is the base palette
    pub fn fade_progress(&self) -> f32 {
        self.fade_progress
    }

    /// Per-update change in progress of the running fade
    pub fn fade_step(&self) -> f32 {
        1.0 / self.fade_frames as f32
    }

    pub fn is_fading(&self) -> bool {
        matches!(self.fade_state, FadeState::FadingIn | FadeState::FadingOut)
    }

    fn advance_fade(&mut self) -> bool {
        if !self.is_fading() {
            return false;
        }
        self.fade_frame = (self.fade_frame + 1).min(self.fade_frames);
        let t = self.fade_frame as f32 / self.fade_frames as f32;
        let done = self.fade_frame >= self.fade_frames;

        if self.fade_state == FadeState::FadingIn {
            self.fade_progress = if done { 1.0 } else { t };
            if done {
                self.fade_state = FadeState::None;
            }
        } else {
            self.fade_progress = if done { 0.0 } else { 1.0 - t };
            if done {
                self.fade_state = FadeState::FadedOut;
            }
        }

        if done {
            if let Some(callback) = self.fade_callback.take() {
                callback();
            }
        }
        true
    }

    // ========================================================================
    // Flash
    // ========================================================================

    /// Blend `color` over the palette, decaying linearly from `intensity`
    /// to zero over `duration` updates
    pub fn start_flash(&mut self, color: Color, duration: u32, intensity: f32) {
        let peak = intensity.clamp(0.0, 1.0);
        self.flash = Flash {
            color,
            peak,
            current: peak,
            frame: 0,
            duration: duration.max(1),
            active: true,
        };
        self.recompute();
    }

    pub fn flash(&mut self, preset: FlashColor, duration: u32, intensity: f32) {
        self.start_flash(preset.color(), duration, intensity);
    }

    pub fn stop_flash(&mut self) {
        self.flash.active = false;
        self.flash.current = 0.0;
        self.recompute();
    }

    pub fn is_flashing(&self) -> bool {
        self.flash.active
    }

    pub fn flash_intensity(&self) -> f32 {
        self.flash.current
    }

    fn advance_flash(&mut self) -> bool {
        if !self.flash.active {
            return false;
        }
        self.flash.frame += 1;
        if self.flash.frame >= self.flash.duration {
            self.flash.active = false;
            self.flash.current = 0.0;
        } else {
            let t = self.flash.frame as f32 / self.flash.duration as f32;
            self.flash.current = self.flash.peak * (1.0 - t);
        }
        true
    }

    // ========================================================================
    // Color Cycling
    // ========================================================================

    /// Register a cycling range. Fails when the table is full, the range
    /// touches entry 0 or runs off the palette, or the start is taken.
    pub fn add_animation_range(
        &mut self,
        start: usize,
        count: usize,
        delay: u32,
        direction: CycleDirection,
    ) -> bool {
        if self.ranges.len() >= MAX_ANIMATION_RANGES
            || start == 0
            || count == 0
            || start.checked_add(count).map_or(true, |end| end > PALETTE_SIZE)
            || self.ranges.iter().any(|r| r.start == start)
        {
            return false;
        }
        self.ranges.push(AnimationRange {
            start,
            count,
            delay: delay.max(1),
            direction,
            counter: 0,
        });
        true
    }

    pub fn remove_animation_range(&mut self, start: usize) -> bool {
        let before = self.ranges.len();
        self.ranges.retain(|r| r.start != start);
        self.ranges.len() != before
    }

    pub fn clear_animation_ranges(&mut self) {
        self.ranges.clear();
    }

    pub fn animation_ranges(&self) -> &[AnimationRange] {
        &self.ranges
    }

    pub fn enable_water_animation(&mut self, enabled: bool) {
        self.toggle_range(enabled, WATER_START, WATER_COUNT, WATER_DELAY);
    }

    pub fn enable_fire_animation(&mut self, enabled: bool) {
        self.toggle_range(enabled, FIRE_START, FIRE_COUNT, FIRE_DELAY);
    }

    fn toggle_range(&mut self, enabled: bool, start: usize, count: usize, delay: u32) {
        if !enabled {
            self.remove_animation_range(start);
        } else if !self.ranges.iter().any(|r| r.start == start)
            && !self.add_animation_range(start, count, delay, CycleDirection::Forward)
        {
            log::warn!("no free animation slot for range at {}", start);
        }
    }

    fn advance_ranges(&mut self) -> bool {
        let mut rotated = false;
        for range in &mut self.ranges {
            range.counter += 1;
            if range.counter >= range.delay {
                range.counter = 0;
                range.rotate(&mut self.base);
                rotated = true;
            }
        }
        rotated
    }

    // ========================================================================
    // Per-frame
    // ========================================================================

    /// Advance fade, flash and cycling by one frame
    pub fn update(&mut self) {
        let faded = self.advance_fade();
        let flashed = self.advance_flash();
        let cycled = self.advance_ranges();
        if faded || flashed || cycled {
            self.recompute();
        }
    }

    fn recompute(&mut self) {
        self.current = self.base;

        if self.fade_progress < 1.0 {
            for (i, c) in self.current.iter_mut().enumerate() {
                if !UI_PROTECTED.contains(&i) {
                    *c = c.scaled(self.fade_progress);
                }
            }
        }

        if self.flash.active && self.flash.current > 0.0 {
            for c in self.current.iter_mut().skip(1) {
                *c = c.lerp(self.flash.color, self.flash.current);
            }
        }

        self.current[0] = Color::BLACK;
        self.dirty = true;
    }

    // ========================================================================
    // Remap Generation
    // ========================================================================

    /// Nearest base entry by squared RGB distance
    pub fn find_closest_color(&self, r: u8, g: u8, b: u8, skip_zero: bool) -> u8 {
        closest_color(&self.base, Color::new(r, g, b), skip_zero)
    }

    pub fn house_remap(&self, house: HouseColor) -> RemapTable {
        house_remap(&self.base, house)
    }

    pub fn shadow_table(&self, intensity: f32) -> RemapTable {
        shadow_table(&self.base, intensity)
    }

    pub fn fade_tables(&self) -> FadeTables {
        FadeTables::generate(&self.base)
    }

    pub fn ghost_table(&self) -> RemapTable {
        ghost_table(&self.base)
    }

    pub fn remap_tables(&self, shadow_intensity: f32) -> RemapTables {
        RemapTables::generate(&self.base, shadow_intensity)
    }
}

impl Default for PaletteEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn ramp_bytes() -> Vec<u8> {
        (0..PALETTE_SIZE)
            .flat_map(|i| [i as u8, (255 - i) as u8, 128])
            .collect()
    }

    #[test]
    fn test_default_is_grayscale_with_black_zero() {
        let pal = PaletteEngine::new();
        assert_eq!(pal.base()[0], Color::BLACK);
        assert_eq!(pal.base()[77], Color::new(77, 77, 77));
        assert_eq!(pal.current()[0], Color::BLACK);
    }

    #[test]
    fn test_load_bytes_forces_zero_black() {
        let mut pal = PaletteEngine::new();
        pal.load_bytes(&ramp_bytes(), PaletteFormat::Rgb8).unwrap();
        assert_eq!(pal.base()[0], Color::BLACK);
        assert_eq!(pal.base()[10], Color::new(10, 245, 128));
    }

    #[test]
    fn test_load_6bit_shifts() {
        let mut data = vec![0u8; PALETTE_BYTES];
        data[3..6].copy_from_slice(&[63, 32, 1]);
        assert_eq!(PaletteFormat::detect(&data), PaletteFormat::Vga6);
        let mut pal = PaletteEngine::new();
        pal.load_bytes(&data, PaletteFormat::Vga6).unwrap();
        assert_eq!(pal.base()[1], Color::new(252, 128, 4));
    }

    #[test]
    fn test_load_truncated() {
        let mut pal = PaletteEngine::new();
        assert_eq!(
            pal.load_bytes(&[0u8; 100], PaletteFormat::Rgb8),
            Err(LoadError::Truncated {
                expected: PALETTE_BYTES,
                actual: 100
            })
        );
    }

    #[test]
    fn test_set_color_refuses_zero() {
        let mut pal = PaletteEngine::new();
        assert!(!pal.set_color(0, Color::WHITE));
        assert!(pal.set_color(5, Color::WHITE));
        assert_eq!(pal.current()[5], Color::WHITE);
        assert_eq!(pal.current()[0], Color::BLACK);
    }

    #[test]
    fn test_fade_in_reaches_one_and_fires_once() {
        let fired = Rc::new(Cell::new(0));
        let counter = Rc::clone(&fired);
        let mut pal = PaletteEngine::new();
        pal.start_fade_in(7, Some(Box::new(move || counter.set(counter.get() + 1))));
        assert_eq!(pal.fade_progress(), 0.0);
        assert_eq!(pal.current()[200], Color::BLACK);
        // UI range is not faded
        assert_eq!(pal.current()[10], Color::new(10, 10, 10));

        for _ in 0..6 {
            pal.update();
            assert!(pal.fade_progress() < 1.0);
        }
        assert_eq!(fired.get(), 0);
        pal.update();
        assert_eq!(pal.fade_progress(), 1.0);
        assert_eq!(pal.fade_state(), FadeState::None);
        assert_eq!(fired.get(), 1);
        for _ in 0..5 {
            pal.update();
        }
        assert_eq!(fired.get(), 1);
        assert_eq!(pal.current()[200], Color::new(200, 200, 200));
    }

    #[test]
    fn test_fade_out_ends_faded_out() {
        let mut pal = PaletteEngine::new();
        pal.start_fade_out(0, None);
        assert!(pal.is_fading());
        pal.update();
        assert_eq!(pal.fade_state(), FadeState::FadedOut);
        assert_eq!(pal.fade_progress(), 0.0);
        assert_eq!(pal.current()[100], Color::BLACK);
    }

    #[test]
    fn test_immediate_black_and_restore() {
        let fired = Rc::new(Cell::new(false));
        let flag = Rc::clone(&fired);
        let mut pal = PaletteEngine::new();
        pal.start_fade_out(10, Some(Box::new(move || flag.set(true))));
        pal.fade_to_black();
        assert_eq!(pal.fade_state(), FadeState::FadedOut);
        assert_eq!(pal.current()[50], Color::BLACK);
        pal.restore_from_black();
        assert_eq!(pal.current()[50], Color::new(50, 50, 50));
        for _ in 0..20 {
            pal.update();
        }
        assert!(!fired.get());
    }

    #[test]
    fn test_flash_decays_linearly() {
        let mut pal = PaletteEngine::new();
        pal.flash(FlashColor::White, 4, 2.0);
        assert_eq!(pal.flash_intensity(), 1.0);
        assert_eq!(pal.current()[0], Color::BLACK);
        assert_eq!(pal.current()[1], Color::WHITE);
        pal.update();
        assert_eq!(pal.flash_intensity(), 0.75);
        pal.update();
        assert_eq!(pal.flash_intensity(), 0.5);
        pal.update();
        pal.update();
        assert!(!pal.is_flashing());
        assert_eq!(pal.flash_intensity(), 0.0);
        assert_eq!(pal.current()[1], Color::new(1, 1, 1));
    }

    #[test]
    fn test_range_rotation_restores_after_count_steps() {
        let mut pal = PaletteEngine::new();
        assert!(pal.add_animation_range(40, 5, 1, CycleDirection::Forward));
        let original = *pal.base();
        pal.update();
        assert_eq!(pal.base()[40], original[44]);
        assert_eq!(pal.base()[41], original[40]);
        for _ in 1..5 {
            pal.update();
        }
        assert_eq!(*pal.base(), original);
    }

    #[test]
    fn test_backward_rotation_and_delay() {
        let mut pal = PaletteEngine::new();
        assert!(pal.add_animation_range(20, 3, 2, CycleDirection::Backward));
        pal.update();
        assert_eq!(pal.base()[20], Color::new(20, 20, 20));
        pal.update();
        assert_eq!(pal.base()[20], Color::new(21, 21, 21));
        assert_eq!(pal.base()[22], Color::new(20, 20, 20));
    }

    #[test]
    fn test_revision_tracks_base_edits_not_cycling() {
        let mut pal = PaletteEngine::new();
        let start = pal.revision();
        pal.enable_water_animation(true);
        for _ in 0..WATER_DELAY * 2 {
            pal.update();
        }
        pal.start_fade_out(4, None);
        pal.update();
        assert_eq!(pal.revision(), start);

        assert!(pal.set_color(5, Color::new(9, 9, 9)));
        assert_ne!(pal.revision(), start);
        let edited = pal.revision();
        assert!(!pal.set_color(0, Color::WHITE));
        assert_eq!(pal.revision(), edited);
        pal.set_palette(&[Color::WHITE; PALETTE_SIZE]);
        assert_ne!(pal.revision(), edited);
    }

    #[test]
    fn test_range_limits() {
        let mut pal = PaletteEngine::new();
        assert!(!pal.add_animation_range(0, 4, 1, CycleDirection::Forward));
        assert!(!pal.add_animation_range(250, 10, 1, CycleDirection::Forward));
        assert!(!pal.add_animation_range(10, usize::MAX, 1, CycleDirection::Forward));
        assert!(!pal.add_animation_range(usize::MAX, 1, 1, CycleDirection::Forward));
        assert!(pal.add_animation_range(250, 6, 1, CycleDirection::Forward));
        assert!(pal.remove_animation_range(250));
        for i in 0..MAX_ANIMATION_RANGES {
            assert!(pal.add_animation_range(1 + i * 10, 4, 1, CycleDirection::Forward));
        }
        assert!(!pal.add_animation_range(200, 4, 1, CycleDirection::Forward));
        assert!(pal.remove_animation_range(11));
        assert!(!pal.remove_animation_range(11));
        assert!(!pal.add_animation_range(1, 4, 1, CycleDirection::Forward));
        pal.clear_animation_ranges();
        assert!(pal.animation_ranges().is_empty());
    }

    #[test]
    fn test_builtin_ranges_toggle() {
        let mut pal = PaletteEngine::new();
        pal.enable_water_animation(true);
        pal.enable_water_animation(true);
        pal.enable_fire_animation(true);
        assert_eq!(pal.animation_ranges().len(), 2);
        let water = pal.animation_ranges()[0];
        assert_eq!((water.start, water.count, water.delay), (192, 16, 4));
        pal.enable_water_animation(false);
        assert_eq!(pal.animation_ranges().len(), 1);
        assert_eq!(pal.animation_ranges()[0].start, FIRE_START);
    }

    #[test]
    fn test_find_closest_color_never_zero_when_skipped() {
        let pal = PaletteEngine::new();
        assert_eq!(pal.find_closest_color(0, 0, 0, true), 1);
        assert_eq!(pal.find_closest_color(0, 0, 0, false), 0);
        assert_eq!(
            pal.find_closest_color(90, 92, 91, true),
            pal.find_closest_color(90, 92, 91, true)
        );
    }

    #[test]
    fn test_export_and_dirty() {
        let mut pal = PaletteEngine::new();
        assert!(pal.take_dirty());
        assert!(!pal.is_dirty());
        pal.set_color(3, Color::new(9, 8, 7));
        assert!(pal.is_dirty());
        let bytes = pal.export_bytes();
        assert_eq!(bytes.len(), PALETTE_BYTES);
        assert_eq!(&bytes[9..12], &[9, 8, 7]);
    }
}
