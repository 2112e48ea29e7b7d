use super::{BufferLayout, PresentationLayer};
use crate::geometry::{clip_blit, BlitRegion, Rect};
use crate::palette::{Color, PALETTE_SIZE};
use std::ops::{Deref, DerefMut};

/// Index treated as see-through by keyed blits and sprite draws
pub const TRANSPARENT: u8 = 0;

// ============================================================================
// Pixel View
// ============================================================================

/// Read-only window onto 8-bit pixels with an explicit row pitch
#[derive(Debug, Clone, Copy)]
pub struct PixelView<'p> {
    pixels: &'p [u8],
    width: i32,
    height: i32,
    pitch: i32,
}

impl<'p> PixelView<'p> {
    /// `None` if the slice is too short for the described layout
    pub fn new(pixels: &'p [u8], width: i32, height: i32, pitch: i32) -> Option<Self> {
        let layout = BufferLayout {
            width,
            height,
            pitch,
        };
        if !layout.is_valid() || pixels.len() < layout.required_len() {
            return None;
        }
        Some(Self {
            pixels,
            width,
            height,
            pitch,
        })
    }

    /// Tightly packed rows (`pitch == width`)
    pub fn packed(pixels: &'p [u8], width: i32, height: i32) -> Option<Self> {
        Self::new(pixels, width, height, width)
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    #[inline]
    pub fn bounds(&self) -> Rect {
        Rect::sized(self.width, self.height)
    }

    pub fn get(&self, x: i32, y: i32) -> Option<u8> {
        if self.bounds().contains(x, y) {
            Some(self.pixels[(y * self.pitch + x) as usize])
        } else {
            None
        }
    }

    #[inline]
    fn row(&self, x: i32, y: i32, len: usize) -> &'p [u8] {
        let start = (y * self.pitch + x) as usize;
        &self.pixels[start..start + len]
    }
}

/// How source pixels land in the destination
#[derive(Debug, Clone, Copy)]
pub enum BlitMode<'t> {
    /// Straight copy
    Opaque,
    /// Skip source pixels equal to the key
    Keyed(u8),
    /// Write `table[src]`, optionally skipping a keyed source index
    Remap {
        table: &'t [u8; 256],
        key: Option<u8>,
    },
}

fn copy_region(
    dst: &mut [u8],
    dst_pitch: i32,
    src: &PixelView<'_>,
    region: &BlitRegion,
    mode: BlitMode<'_>,
) {
    let w = region.width as usize;
    for row in 0..region.height {
        let src_row = src.row(region.src_x, region.src_y + row, w);
        let start = ((region.dst_y + row) * dst_pitch + region.dst_x) as usize;
        let dst_row = &mut dst[start..start + w];

        match mode {
            BlitMode::Opaque => dst_row.copy_from_slice(src_row),
            BlitMode::Keyed(key) => {
                for (d, &s) in dst_row.iter_mut().zip(src_row) {
                    if s != key {
                        *d = s;
                    }
                }
            },
            BlitMode::Remap { table, key } => {
                for (d, &s) in dst_row.iter_mut().zip(src_row) {
                    if key != Some(s) {
                        *d = table[s as usize];
                    }
                }
            },
        }
    }
}

// ============================================================================
// PixelSurface
// ============================================================================

enum Storage<'a> {
    Owned(Vec<u8>),
    /// External buffer, never freed by the surface
    Borrowed(&'a mut [u8]),
    /// Screen surface, buffer resolved from the presentation layer per lock cycle
    Presentation(Box<dyn PresentationLayer + 'a>),
}

/// Mutable access to the locked pixels, handed to sprite/tile inner loops
pub(crate) struct Target<'p> {
    pub pixels: &'p mut [u8],
    pub width: i32,
    pub height: i32,
    pub pitch: i32,
    /// Effective clip window, already intersected with the surface bounds
    pub clip: Rect,
}

impl Target<'_> {
    #[inline]
    pub fn index(&self, x: i32, y: i32) -> usize {
        (y * self.pitch + x) as usize
    }
}

/// 8-bit indexed drawing surface.
///
/// Pixels are only reachable while locked; every drawing call on an unlocked
/// surface is ignored and reports `false`. Writes honor an optional clip
/// window on top of the surface bounds.
pub struct PixelSurface<'a> {
    storage: Storage<'a>,
    width: i32,
    height: i32,
    pitch: i32,
    lock_count: u32,
    clip: Option<Rect>,
}

impl<'a> PixelSurface<'a> {
    /// Off-screen surface owning its storage
    pub fn new(width: i32, height: i32) -> Self {
        Self::with_pitch(width, height, width)
    }

    /// Off-screen surface whose rows are `pitch` bytes apart
    pub fn with_pitch(width: i32, height: i32, pitch: i32) -> Self {
        let width = width.max(0);
        let height = height.max(0);
        let pitch = pitch.max(width);
        Self {
            storage: Storage::Owned(vec![0; (pitch * height) as usize]),
            width,
            height,
            pitch,
            lock_count: 0,
            clip: None,
        }
    }

    /// Wrap an external buffer without taking ownership.
    /// `None` if the buffer is too small for the layout.
    pub fn wrap(buffer: &'a mut [u8], width: i32, height: i32, pitch: i32) -> Option<Self> {
        let layout = BufferLayout {
            width,
            height,
            pitch,
        };
        if !layout.is_valid() || buffer.len() < layout.required_len() {
            return None;
        }
        Some(Self {
            storage: Storage::Borrowed(buffer),
            width,
            height,
            pitch,
            lock_count: 0,
            clip: None,
        })
    }

    /// The screen surface. Dimensions are unknown until the first lock.
    pub fn presentation(layer: Box<dyn PresentationLayer + 'a>) -> Self {
        Self {
            storage: Storage::Presentation(layer),
            width: 0,
            height: 0,
            pitch: 0,
            lock_count: 0,
            clip: None,
        }
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.height
    }

    #[inline]
    pub fn pitch(&self) -> i32 {
        self.pitch
    }

    #[inline]
    pub fn bounds(&self) -> Rect {
        Rect::sized(self.width, self.height)
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.lock_count > 0
    }

    #[inline]
    pub fn lock_count(&self) -> u32 {
        self.lock_count
    }

    pub fn is_presentation(&self) -> bool {
        matches!(self.storage, Storage::Presentation(_))
    }

    /// Restrict subsequent writes to `rect` (intersected with the bounds)
    pub fn set_clip(&mut self, rect: Rect) {
        self.clip = Some(rect);
    }

    pub fn reset_clip(&mut self) {
        self.clip = None;
    }

    /// Effective clip window; empty if the clip lies off-surface
    pub fn clip_rect(&self) -> Rect {
        let bounds = self.bounds();
        match self.clip {
            Some(clip) => clip.intersect(&bounds).unwrap_or_default(),
            None => bounds,
        }
    }

    // ========================================================================
    // Locking
    // ========================================================================

    /// Lock for pixel access. Locks nest; the pixels stay reachable until
    /// the outermost guard drops. A presentation surface resolves its back
    /// buffer here and fails the lock if the layer cannot provide one.
    pub fn lock(&mut self) -> Option<SurfaceLock<'_, 'a>> {
        if self.lock_count == 0 && !self.resolve_buffer() {
            return None;
        }
        self.lock_count += 1;
        Some(SurfaceLock { surface: self })
    }

    fn resolve_buffer(&mut self) -> bool {
        let Storage::Presentation(layer) = &mut self.storage else {
            return true;
        };
        if !layer.is_initialized() {
            return false;
        }
        let Some(layout) = layer.acquire() else {
            return false;
        };
        if !layout.is_valid() || layer.pixels().len() < layout.required_len() {
            log::warn!("presentation layer returned unusable back buffer {:?}", layout);
            return false;
        }
        self.width = layout.width;
        self.height = layout.height;
        self.pitch = layout.pitch;
        true
    }

    fn unlock(&mut self) {
        self.lock_count = self.lock_count.saturating_sub(1);
    }

    // ========================================================================
    // Raw Access
    // ========================================================================

    fn buffer(&self) -> Option<&[u8]> {
        if self.lock_count == 0 {
            return None;
        }
        Some(match &self.storage {
            Storage::Owned(v) => v.as_slice(),
            Storage::Borrowed(b) => &b[..],
            Storage::Presentation(layer) => layer.pixels(),
        })
    }

    fn buffer_mut(&mut self) -> Option<&mut [u8]> {
        if self.lock_count == 0 {
            return None;
        }
        Some(match &mut self.storage {
            Storage::Owned(v) => v.as_mut_slice(),
            Storage::Borrowed(b) => &mut b[..],
            Storage::Presentation(layer) => layer.pixels_mut(),
        })
    }

    /// Raw pixel rows while locked (`pitch` bytes apart)
    pub fn pixels(&self) -> Option<&[u8]> {
        self.buffer()
    }

    /// Read-only view for use as a blit source
    pub fn view(&self) -> Option<PixelView<'_>> {
        let (w, h, pitch) = (self.width, self.height, self.pitch);
        PixelView::new(self.buffer()?, w, h, pitch)
    }

    pub(crate) fn target(&mut self) -> Option<Target<'_>> {
        let (width, height, pitch) = (self.width, self.height, self.pitch);
        let clip = self.clip_rect();
        let pixels = self.buffer_mut()?;
        Some(Target {
            pixels,
            width,
            height,
            pitch,
            clip,
        })
    }

    // ========================================================================
    // Primitives
    // ========================================================================

    /// Fill every pixel, ignoring the clip window
    pub fn clear(&mut self, color: u8) -> bool {
        let Some(t) = self.target() else {
            return false;
        };
        for y in 0..t.height {
            let start = (y * t.pitch) as usize;
            t.pixels[start..start + t.width as usize].fill(color);
        }
        true
    }

    pub fn put_pixel(&mut self, x: i32, y: i32, color: u8) -> bool {
        let Some(t) = self.target() else {
            return false;
        };
        if t.clip.contains(x, y) {
            let idx = t.index(x, y);
            t.pixels[idx] = color;
        }
        true
    }

    /// `None` when unlocked or out of bounds
    pub fn get_pixel(&self, x: i32, y: i32) -> Option<u8> {
        if !self.bounds().contains(x, y) {
            return None;
        }
        self.buffer()
            .map(|buf| buf[(y * self.pitch + x) as usize])
    }

    /// Horizontal run of `len` pixels starting at (x, y)
    pub fn hline(&mut self, x: i32, y: i32, len: i32, color: u8) -> bool {
        self.fill_rect(Rect::new(x, y, len, 1), color)
    }

    /// Vertical run of `len` pixels starting at (x, y)
    pub fn vline(&mut self, x: i32, y: i32, len: i32, color: u8) -> bool {
        self.fill_rect(Rect::new(x, y, 1, len), color)
    }

    pub fn fill_rect(&mut self, rect: Rect, color: u8) -> bool {
        let Some(t) = self.target() else {
            return false;
        };
        let Some(r) = rect.intersect(&t.clip) else {
            return true;
        };
        for y in r.y..r.bottom() {
            let start = t.index(r.x, y);
            t.pixels[start..start + r.width as usize].fill(color);
        }
        true
    }

    /// One pixel outline
    pub fn draw_rect(&mut self, rect: Rect, color: u8) -> bool {
        if !self.is_locked() {
            return false;
        }
        if rect.is_empty() {
            return true;
        }
        self.hline(rect.x, rect.y, rect.width, color);
        self.hline(rect.x, rect.bottom() - 1, rect.width, color);
        self.vline(rect.x, rect.y, rect.height, color);
        self.vline(rect.right() - 1, rect.y, rect.height, color)
    }

    /// Bresenham line, clipped to the clip window first
    pub fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32, color: u8) -> bool {
        let Some(t) = self.target() else {
            return false;
        };
        let Some((cx0, cy0, cx1, cy1)) = clip_line(t.clip, x0, y0, x1, y1) else {
            return true;
        };

        let dx = (cx1 - cx0).abs();
        let dy = -((cy1 - cy0).abs());
        let sx = if cx0 < cx1 { 1 } else { -1 };
        let sy = if cy0 < cy1 { 1 } else { -1 };
        let mut err = dx + dy;
        let mut x = cx0;
        let mut y = cy0;

        loop {
            if t.clip.contains(x, y) {
                let idx = t.index(x, y);
                t.pixels[idx] = color;
            }
            if x == cx1 && y == cy1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
        true
    }

    /// Replace each pixel in `rect` with `table[pixel]`
    pub fn remap_rect(&mut self, rect: Rect, table: &[u8; 256]) -> bool {
        let Some(t) = self.target() else {
            return false;
        };
        let Some(r) = rect.intersect(&t.clip) else {
            return true;
        };
        for y in r.y..r.bottom() {
            let start = t.index(r.x, y);
            for px in &mut t.pixels[start..start + r.width as usize] {
                *px = table[*px as usize];
            }
        }
        true
    }

    // ========================================================================
    // Blits
    // ========================================================================

    /// General clipped blit. `src_rect` selects the source region; the
    /// result lands at (dst_x, dst_y) restricted to `dst_clip` and the
    /// surface clip window.
    pub fn blit_view(
        &mut self,
        src: &PixelView<'_>,
        src_rect: Rect,
        dst_x: i32,
        dst_y: i32,
        dst_clip: Rect,
        mode: BlitMode<'_>,
    ) -> bool {
        let Some(t) = self.target() else {
            return false;
        };
        let Some(clip) = t.clip.intersect(&dst_clip) else {
            return true;
        };
        if let Some(region) = clip_blit(src_rect, src.bounds(), dst_x, dst_y, clip) {
            copy_region(t.pixels, t.pitch, src, &region, mode);
        }
        true
    }

    /// Blit from another locked surface with independent clip windows
    pub fn blit_clipped(
        &mut self,
        src: &PixelSurface<'_>,
        src_rect: Rect,
        dst_x: i32,
        dst_y: i32,
        dst_clip: Rect,
        mode: BlitMode<'_>,
    ) -> bool {
        let Some(view) = src.view() else {
            return false;
        };
        self.blit_view(&view, src_rect, dst_x, dst_y, dst_clip, mode)
    }

    pub fn blit(&mut self, src: &PixelSurface<'_>, src_rect: Rect, dst_x: i32, dst_y: i32) -> bool {
        let clip = self.bounds();
        self.blit_clipped(src, src_rect, dst_x, dst_y, clip, BlitMode::Opaque)
    }

    /// Copy skipping source pixels equal to `key`
    pub fn blit_keyed(
        &mut self,
        src: &PixelSurface<'_>,
        src_rect: Rect,
        dst_x: i32,
        dst_y: i32,
        key: u8,
    ) -> bool {
        let clip = self.bounds();
        self.blit_clipped(src, src_rect, dst_x, dst_y, clip, BlitMode::Keyed(key))
    }

    /// Keyed copy on index 0
    pub fn blit_transparent(
        &mut self,
        src: &PixelSurface<'_>,
        src_rect: Rect,
        dst_x: i32,
        dst_y: i32,
    ) -> bool {
        self.blit_keyed(src, src_rect, dst_x, dst_y, TRANSPARENT)
    }

    /// Copy through a remap table, optionally skipping index 0
    pub fn blit_remap(
        &mut self,
        src: &PixelSurface<'_>,
        src_rect: Rect,
        dst_x: i32,
        dst_y: i32,
        table: &[u8; 256],
        transparent: bool,
    ) -> bool {
        let clip = self.bounds();
        let mode = BlitMode::Remap {
            table,
            key: transparent.then_some(TRANSPARENT),
        };
        self.blit_clipped(src, src_rect, dst_x, dst_y, clip, mode)
    }

    /// Blit a raw pixel block described by size and pitch
    pub fn blit_raw(
        &mut self,
        pixels: &[u8],
        width: i32,
        height: i32,
        pitch: i32,
        dst_x: i32,
        dst_y: i32,
        mode: BlitMode<'_>,
    ) -> bool {
        if !self.is_locked() {
            return false;
        }
        let Some(view) = PixelView::new(pixels, width, height, pitch) else {
            return false;
        };
        let clip = self.bounds();
        self.blit_view(&view, view.bounds(), dst_x, dst_y, clip, mode)
    }

    // ========================================================================
    // Presentation
    // ========================================================================

    /// Hand the frame to the presentation layer. Only valid on a locked
    /// presentation surface.
    pub fn present(&mut self, palette: &[Color; PALETTE_SIZE]) -> bool {
        if self.lock_count == 0 {
            return false;
        }
        let Storage::Presentation(layer) = &mut self.storage else {
            return false;
        };
        if !layer.is_initialized() {
            return false;
        }
        match layer.present(palette) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("present failed: {}", e);
                false
            },
        }
    }
}

/// Cohen-Sutherland line clipping against `clip`
/// Returns clipped endpoints, `None` if the line misses the window
fn clip_line(
    clip: Rect,
    mut x0: i32,
    mut y0: i32,
    mut x1: i32,
    mut y1: i32,
) -> Option<(i32, i32, i32, i32)> {
    const INSIDE: u8 = 0;
    const LEFT: u8 = 1;
    const RIGHT: u8 = 2;
    const BOTTOM: u8 = 4;
    const TOP: u8 = 8;
    // Converges in at most 4 iterations for valid input
    const MAX_ITERATIONS: u32 = 16;

    if clip.is_empty() {
        return None;
    }
    let (xmin, ymin) = (clip.x, clip.y);
    let (xmax, ymax) = (clip.right() - 1, clip.bottom() - 1);

    let outcode = |x: i32, y: i32| -> u8 {
        let mut code = INSIDE;
        if x < xmin {
            code |= LEFT;
        } else if x > xmax {
            code |= RIGHT;
        }
        if y < ymin {
            code |= TOP;
        } else if y > ymax {
            code |= BOTTOM;
        }
        code
    };

    let mut code0 = outcode(x0, y0);
    let mut code1 = outcode(x1, y1);

    for _ in 0..MAX_ITERATIONS {
        if (code0 | code1) == 0 {
            return Some((x0, y0, x1, y1));
        }
        if (code0 & code1) != 0 {
            return None;
        }

        let code_out = if code0 != 0 { code0 } else { code1 };
        let dy = y1 - y0;
        let dx = x1 - x0;
        let (x, y);

        if (code_out & BOTTOM) != 0 {
            if dy == 0 {
                return None;
            }
            x = x0 + dx * (ymax - y0) / dy;
            y = ymax;
        } else if (code_out & TOP) != 0 {
            if dy == 0 {
                return None;
            }
            x = x0 + dx * (ymin - y0) / dy;
            y = ymin;
        } else if (code_out & RIGHT) != 0 {
            if dx == 0 {
                return None;
            }
            y = y0 + dy * (xmax - x0) / dx;
            x = xmax;
        } else {
            if dx == 0 {
                return None;
            }
            y = y0 + dy * (xmin - x0) / dx;
            x = xmin;
        }

        if code_out == code0 {
            x0 = x;
            y0 = y;
            code0 = outcode(x0, y0);
        } else {
            x1 = x;
            y1 = y;
            code1 = outcode(x1, y1);
        }
    }

    None
}

// ============================================================================
// Lock Guard
// ============================================================================

/// Keeps a surface locked; unlocks one nesting level on drop
pub struct SurfaceLock<'s, 'a> {
    surface: &'s mut PixelSurface<'a>,
}

impl<'a> Deref for SurfaceLock<'_, 'a> {
    type Target = PixelSurface<'a>;

    fn deref(&self) -> &Self::Target {
        self.surface
    }
}

impl<'a> DerefMut for SurfaceLock<'_, 'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.surface
    }
}

impl Drop for SurfaceLock<'_, '_> {
    fn drop(&mut self) {
        self.surface.unlock();
    }
}
