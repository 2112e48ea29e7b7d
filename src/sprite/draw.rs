//! The one clipped copy loop every sprite draw mode goes through

use super::{ShapeFlags, ShapeFrame};
use crate::display::{PixelSurface, TRANSPARENT};
use crate::geometry::Rect;

/// What happens to the destination under each opaque source pixel
#[derive(Debug, Clone, Copy)]
pub(crate) enum DrawMode<'t> {
    /// Source pixel, through the table if given (normal, remapped, fading)
    Copy(Option<&'t [u8; 256]>),
    /// Destination pixel through the table
    Shadow(&'t [u8; 256]),
    /// Copy on one checkerboard parity only
    Ghost {
        phase: u8,
        remap: Option<&'t [u8; 256]>,
    },
    /// Destination pixel sampled from a phase-dependent offset
    Predator { phase: u8 },
    /// Constant color
    Flat(u8),
}

/// Draw `frame` at (x, y). Returns false only when the surface is unlocked;
/// a fully clipped draw is a successful no-op.
pub(crate) fn draw_frame(
    surface: &mut PixelSurface<'_>,
    x: i32,
    y: i32,
    frame: &ShapeFrame,
    mode: DrawMode<'_>,
    flags: ShapeFlags,
) -> bool {
    let Some(t) = surface.target() else {
        return false;
    };

    let (mut x, mut y) = (x, y);
    if flags.contains(ShapeFlags::CENTER) {
        x -= frame.width / 2;
        y -= frame.height / 2;
    }

    let placed = Rect::new(
        x + frame.x_offset,
        y + frame.y_offset,
        frame.width,
        frame.height,
    );
    let Some(visible) = placed.intersect(&t.clip) else {
        return true;
    };

    let flip_x = flags.contains(ShapeFlags::FLIP_X);
    let flip_y = flags.contains(ShapeFlags::FLIP_Y);
    let src_x0 = visible.x - placed.x;
    let src_y0 = visible.y - placed.y;
    let bounds = Rect::sized(t.width, t.height);

    let (shimmer_x, shimmer_y) = match mode {
        DrawMode::Predator { phase } => ((phase % 3) as i32 - 1, (phase % 5) as i32 - 2),
        _ => (0, 0),
    };

    for row in 0..visible.height {
        let sy = if flip_y {
            frame.height - 1 - (src_y0 + row)
        } else {
            src_y0 + row
        };
        let src_row = &frame.pixels[(sy * frame.width) as usize..((sy + 1) * frame.width) as usize];
        let dy = visible.y + row;

        for col in 0..visible.width {
            let sx = if flip_x {
                frame.width - 1 - (src_x0 + col)
            } else {
                src_x0 + col
            };
            let pixel = src_row[sx as usize];
            if pixel == TRANSPARENT {
                continue;
            }

            let dx = visible.x + col;
            let di = t.index(dx, dy);
            match mode {
                DrawMode::Copy(remap) => {
                    t.pixels[di] = remap.map_or(pixel, |table| table[pixel as usize]);
                },
                DrawMode::Shadow(table) => {
                    t.pixels[di] = table[t.pixels[di] as usize];
                },
                DrawMode::Ghost { phase, remap } => {
                    if (dx + dy + (phase & 1) as i32) & 1 == 0 {
                        t.pixels[di] = remap.map_or(pixel, |table| table[pixel as usize]);
                    }
                },
                DrawMode::Predator { .. } => {
                    let (px, py) = (dx + shimmer_x, dy + shimmer_y);
                    if bounds.contains(px, py) {
                        let si = t.index(px, py);
                        t.pixels[di] = t.pixels[si];
                    }
                },
                DrawMode::Flat(color) => {
                    t.pixels[di] = color;
                },
            }
        }
    }

    true
}
