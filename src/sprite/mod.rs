//! Sprite assets: lazily decoded frames and the draw modes applied to them

mod cache;
mod draw;
mod raw;

pub use cache::{SpriteCache, SpriteHandle};
pub use raw::{RawShape, ShapeSource, MAX_FRAME_BYTES};

use crate::display::PixelSurface;
use crate::error::LoadError;
use crate::palette::FadeTables;
use draw::{draw_frame, DrawMode};

bitflags::bitflags! {
    /// Placement modifiers accepted by every sprite draw
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ShapeFlags: u8 {
        const NONE = 0;
        /// Treat the draw position as the frame center
        const CENTER = 1 << 0;
        const FLIP_X = 1 << 1;
        const FLIP_Y = 1 << 2;
    }
}

// ============================================================================
// ShapeFrame
// ============================================================================

/// One decoded frame: tightly packed `width * height` pixels, index 0 transparent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeFrame {
    pub x_offset: i32,
    pub y_offset: i32,
    pub width: i32,
    pub height: i32,
    pub pixels: Vec<u8>,
}

impl ShapeFrame {
    /// Frame from packed pixels, `None` if the block does not match the size
    pub fn new(width: i32, height: i32, pixels: Vec<u8>) -> Option<Self> {
        let frame = Self {
            x_offset: 0,
            y_offset: 0,
            width,
            height,
            pixels,
        };
        frame.is_valid().then_some(frame)
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        raw::frame_bytes(self.width, self.height).is_some_and(|n| self.pixels.len() == n)
    }

    #[inline]
    pub fn pixel(&self, x: i32, y: i32) -> Option<u8> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[(y * self.width + x) as usize])
    }
}

// ============================================================================
// SpriteAsset
// ============================================================================

/// A loaded shape file. Frames decode on first use and stay cached until
/// `clear_cache` or `unload`.
pub struct SpriteAsset {
    name: String,
    source: Option<Box<dyn ShapeSource>>,
    width: i32,
    height: i32,
    frames: Vec<Option<ShapeFrame>>,
}

impl std::fmt::Debug for SpriteAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpriteAsset")
            .field("name", &self.name)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("frames", &self.frame_count())
            .field("cached", &self.frames.iter().filter(|f| f.is_some()).count())
            .finish()
    }
}

impl SpriteAsset {
    pub fn from_source(name: &str, source: Box<dyn ShapeSource>) -> Result<Self, LoadError> {
        let (width, height) = source.size();
        let count = source.frame_count();
        if count == 0 || raw::frame_bytes(width, height).is_none() {
            return Err(LoadError::InvalidHeader(format!(
                "{}: {} frames of {}x{}",
                name, count, width, height
            )));
        }
        Ok(Self {
            name: name.to_string(),
            source: Some(source),
            width,
            height,
            frames: vec![None; count],
        })
    }

    /// Parse an uncompressed shape container
    pub fn from_bytes(name: &str, data: &[u8]) -> Result<Self, LoadError> {
        Self::from_source(name, Box::new(RawShape::parse(data)?))
    }

    /// Drop the source and every decoded frame
    pub fn unload(&mut self) {
        self.source = None;
        self.frames.clear();
        self.width = 0;
        self.height = 0;
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.source.is_some()
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Maximum frame dimensions
    #[inline]
    pub fn size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    /// Decoded size of `frame`; decodes it if needed
    pub fn frame_size(&mut self, frame: usize) -> Option<(i32, i32)> {
        self.frame(frame).map(|f| (f.width, f.height))
    }

    pub fn frame_offset(&self, frame: usize) -> Option<(i32, i32)> {
        if frame >= self.frame_count() {
            return None;
        }
        if let Some(Some(f)) = self.frames.get(frame) {
            return Some((f.x_offset, f.y_offset));
        }
        self.source.as_ref().map(|s| s.frame_offset(frame))
    }

    /// Decoded frame, decoding on first access
    pub fn frame(&mut self, index: usize) -> Option<&ShapeFrame> {
        if index >= self.frames.len() {
            return None;
        }
        if self.frames[index].is_none() {
            let decoded = self.decode(index)?;
            self.frames[index] = Some(decoded);
        }
        self.frames[index].as_ref()
    }

    fn decode(&self, index: usize) -> Option<ShapeFrame> {
        let source = self.source.as_ref()?;
        let mut buffer = vec![0u8; raw::frame_bytes(self.width, self.height)?];
        let written = source.decode_frame(index, &mut buffer)?;

        // A short decode means fewer rows, never fewer columns
        let height = ((written as i32) / self.width).clamp(1, self.height);
        buffer.truncate(self.width as usize * height as usize);
        let (x_offset, y_offset) = source.frame_offset(index);

        Some(ShapeFrame {
            x_offset,
            y_offset,
            width: self.width,
            height,
            pixels: buffer,
        })
    }

    /// Decode every frame now. Returns the number of frames decoded.
    pub fn precache_all(&mut self) -> usize {
        (0..self.frame_count())
            .filter(|&i| self.frame(i).is_some())
            .count()
    }

    pub fn precache_frame(&mut self, frame: usize) -> bool {
        self.frame(frame).is_some()
    }

    pub fn clear_cache(&mut self) {
        self.frames.iter_mut().for_each(|f| *f = None);
    }

    /// Bytes held by decoded frames
    pub fn cache_size(&self) -> usize {
        self.frames
            .iter()
            .flatten()
            .map(|f| f.pixels.len())
            .sum()
    }

    // ========================================================================
    // Drawing
    // ========================================================================
    //
    // Every draw returns false for an unlocked surface or a frame that cannot
    // be decoded. Source index 0 is never written.

    fn draw_mode(
        &mut self,
        surface: &mut PixelSurface<'_>,
        x: i32,
        y: i32,
        frame: usize,
        flags: ShapeFlags,
        mode: DrawMode<'_>,
    ) -> bool {
        match self.frame(frame) {
            Some(f) => draw_frame(surface, x, y, f, mode, flags),
            None => false,
        }
    }

    pub fn draw(
        &mut self,
        surface: &mut PixelSurface<'_>,
        x: i32,
        y: i32,
        frame: usize,
        flags: ShapeFlags,
    ) -> bool {
        self.draw_mode(surface, x, y, frame, flags, DrawMode::Copy(None))
    }

    pub fn draw_remapped(
        &mut self,
        surface: &mut PixelSurface<'_>,
        x: i32,
        y: i32,
        frame: usize,
        flags: ShapeFlags,
        remap: &[u8; 256],
    ) -> bool {
        self.draw_mode(surface, x, y, frame, flags, DrawMode::Copy(Some(remap)))
    }

    /// Darken what is already on screen under the sprite's silhouette
    pub fn draw_shadow(
        &mut self,
        surface: &mut PixelSurface<'_>,
        x: i32,
        y: i32,
        frame: usize,
        flags: ShapeFlags,
        shadow: &[u8; 256],
    ) -> bool {
        self.draw_mode(surface, x, y, frame, flags, DrawMode::Shadow(shadow))
    }

    /// Checkerboard draw; `phase` alternates which half of the pixels show
    pub fn draw_ghost(
        &mut self,
        surface: &mut PixelSurface<'_>,
        x: i32,
        y: i32,
        frame: usize,
        flags: ShapeFlags,
        phase: u8,
    ) -> bool {
        self.draw_mode(surface, x, y, frame, flags, DrawMode::Ghost { phase, remap: None })
    }

    /// Draw through fade level `level`. A negative level draws normally;
    /// levels past the darkest clamp to it.
    pub fn draw_fading(
        &mut self,
        surface: &mut PixelSurface<'_>,
        x: i32,
        y: i32,
        frame: usize,
        flags: ShapeFlags,
        fade: &FadeTables,
        level: i32,
    ) -> bool {
        let remap = usize::try_from(level).ok().map(|l| fade.level(l).as_array());
        self.draw_mode(surface, x, y, frame, flags, DrawMode::Copy(remap))
    }

    /// Shimmer: each covered pixel takes the background from a small offset
    pub fn draw_predator(
        &mut self,
        surface: &mut PixelSurface<'_>,
        x: i32,
        y: i32,
        frame: usize,
        flags: ShapeFlags,
        phase: u8,
    ) -> bool {
        self.draw_mode(surface, x, y, frame, flags, DrawMode::Predator { phase })
    }

    /// Silhouette in a single color
    pub fn draw_flat(
        &mut self,
        surface: &mut PixelSurface<'_>,
        x: i32,
        y: i32,
        frame: usize,
        flags: ShapeFlags,
        color: u8,
    ) -> bool {
        self.draw_mode(surface, x, y, frame, flags, DrawMode::Flat(color))
    }
}
