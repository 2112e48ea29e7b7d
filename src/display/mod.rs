mod surface;

#[cfg(feature = "sdl")]
mod sdl;

pub use surface::{BlitMode, PixelSurface, PixelView, SurfaceLock, TRANSPARENT};

#[cfg(feature = "sdl")]
pub use sdl::{Display, EventQueue, InputEvent, SdlPresenter};

use crate::palette::{Color, PALETTE_SIZE};

// ============================================================================
// Presentation Layer
// ============================================================================

/// Geometry of a back buffer handed out by a presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferLayout {
    pub width: i32,
    pub height: i32,
    /// Bytes per row, at least `width`
    pub pitch: i32,
}

impl BufferLayout {
    pub fn packed(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            pitch: width,
        }
    }

    /// Smallest byte length that can hold every addressable pixel
    pub fn required_len(&self) -> usize {
        if self.width <= 0 || self.height <= 0 {
            0
        } else {
            (self.pitch * (self.height - 1) + self.width) as usize
        }
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0 && self.pitch >= self.width
    }
}

/// The window-system side of the screen surface.
///
/// The screen `PixelSurface` asks for its back buffer on the first lock of
/// every lock cycle and hands the final 8-bit frame back through `present`.
pub trait PresentationLayer {
    fn is_initialized(&self) -> bool;

    /// Resolve the back buffer for a new lock cycle. `None` fails the lock.
    fn acquire(&mut self) -> Option<BufferLayout>;

    fn pixels(&self) -> &[u8];

    fn pixels_mut(&mut self) -> &mut [u8];

    /// Convert the back buffer to display color through `palette` and show it
    fn present(&mut self, palette: &[Color; PALETTE_SIZE]) -> Result<(), String>;
}

impl<T: PresentationLayer + ?Sized> PresentationLayer for &mut T {
    fn is_initialized(&self) -> bool {
        (**self).is_initialized()
    }

    fn acquire(&mut self) -> Option<BufferLayout> {
        (**self).acquire()
    }

    fn pixels(&self) -> &[u8] {
        (**self).pixels()
    }

    fn pixels_mut(&mut self) -> &mut [u8] {
        (**self).pixels_mut()
    }

    fn present(&mut self, palette: &[Color; PALETTE_SIZE]) -> Result<(), String> {
        (**self).present(palette)
    }
}

/// Write ABGR pixel to slice (RGBA8888 little-endian byte order)
#[inline]
fn write_pixel(dest: &mut [u8], color: Color) {
    dest[0] = 255; // A
    dest[1] = color.b;
    dest[2] = color.g;
    dest[3] = color.r;
}

/// Expand an 8-bit indexed frame into packed RGBA8888 through `palette`
pub fn expand_frame(
    pixels: &[u8],
    layout: BufferLayout,
    palette: &[Color; PALETTE_SIZE],
    out: &mut [u8],
) {
    let w = layout.width.max(0) as usize;
    let h = layout.height.max(0) as usize;
    let pitch = layout.pitch.max(0) as usize;
    if out.len() < w * h * 4 || pixels.len() < layout.required_len() {
        return;
    }

    for y in 0..h {
        let src = &pixels[y * pitch..y * pitch + w];
        let dst = &mut out[y * w * 4..(y + 1) * w * 4];
        for (px, chunk) in src.iter().zip(dst.chunks_exact_mut(4)) {
            write_pixel(chunk, palette[*px as usize]);
        }
    }
}

// ============================================================================
// MemoryPresenter
// ============================================================================

/// Headless presentation layer. Keeps the back buffer between cycles and the
/// last presented frame as RGBA8888.
pub struct MemoryPresenter {
    layout: BufferLayout,
    pixels: Vec<u8>,
    frame: Vec<u8>,
    initialized: bool,
    present_count: u32,
}

impl MemoryPresenter {
    pub fn new(width: i32, height: i32) -> Self {
        Self::with_pitch(width, height, width)
    }

    /// Back buffer rows padded to `pitch` bytes
    pub fn with_pitch(width: i32, height: i32, pitch: i32) -> Self {
        let layout = BufferLayout {
            width: width.max(0),
            height: height.max(0),
            pitch: pitch.max(width).max(0),
        };
        Self {
            layout,
            pixels: vec![0; (layout.pitch * layout.height) as usize],
            frame: vec![0; (layout.width * layout.height * 4) as usize],
            initialized: true,
            present_count: 0,
        }
    }

    pub fn set_initialized(&mut self, initialized: bool) {
        self.initialized = initialized;
    }

    pub fn layout(&self) -> BufferLayout {
        self.layout
    }

    pub fn present_count(&self) -> u32 {
        self.present_count
    }

    /// Raw RGBA8888 bytes of the last presented frame
    pub fn frame(&self) -> &[u8] {
        &self.frame
    }

    /// Color of a presented pixel, `None` if out of bounds
    pub fn rgb_at(&self, x: i32, y: i32) -> Option<(u8, u8, u8)> {
        if x < 0 || y < 0 || x >= self.layout.width || y >= self.layout.height {
            return None;
        }
        let idx = ((y * self.layout.width + x) * 4) as usize;
        Some((
            self.frame[idx + 3], // R
            self.frame[idx + 2], // G
            self.frame[idx + 1], // B
        ))
    }
}

impl PresentationLayer for MemoryPresenter {
    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn acquire(&mut self) -> Option<BufferLayout> {
        self.initialized.then_some(self.layout)
    }

    fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }

    fn present(&mut self, palette: &[Color; PALETTE_SIZE]) -> Result<(), String> {
        if !self.initialized {
            return Err("presenter not initialized".to_string());
        }
        expand_frame(&self.pixels, self.layout, palette, &mut self.frame);
        self.present_count += 1;
        Ok(())
    }
}
