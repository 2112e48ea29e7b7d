//! Uncompressed shape container and the `ShapeSource` seam for decoders

use crate::error::LoadError;

/// Provider of decoded frames for a sprite asset.
///
/// Compressed formats plug in here; the cache only ever sees raw 8-bit
/// pixel blocks with index 0 transparent.
pub trait ShapeSource {
    fn frame_count(&self) -> usize;

    /// Largest frame dimensions; every decode fits in `width * height` bytes
    fn size(&self) -> (i32, i32);

    /// Decode `frame` into `out`, returning the number of bytes written.
    /// Fewer than `width * height` bytes means fewer rows.
    fn decode_frame(&self, frame: usize, out: &mut [u8]) -> Option<usize>;

    /// Draw offset of `frame` relative to the draw position
    fn frame_offset(&self, _frame: usize) -> (i32, i32) {
        (0, 0)
    }
}

pub const HEADER_SIZE: usize = 8;
pub const ENTRY_SIZE: usize = 8;
/// Upper bound on one decoded frame (1024x1024)
pub const MAX_FRAME_BYTES: usize = 1 << 20;

/// Byte size of a `width` x `height` frame, or None when either side is not
/// positive or the frame exceeds `MAX_FRAME_BYTES`
pub(crate) fn frame_bytes(width: i32, height: i32) -> Option<usize> {
    let w = usize::try_from(width).ok().filter(|&w| w > 0)?;
    let h = usize::try_from(height).ok().filter(|&h| h > 0)?;
    w.checked_mul(h).filter(|&n| n <= MAX_FRAME_BYTES)
}

/// Per-frame table entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrameEntry {
    /// Byte offset of the pixel data, 0 for an empty frame
    offset: usize,
    x_offset: i8,
    y_offset: i8,
}

/// Uncompressed shape file.
///
/// Layout (little endian):
///   header: frame_count u16, flags u16, width u16, height u16
///   frame_count entries: offset u32, x_offset i8, y_offset i8, format u8, reserved u8
///   pixel data, `width * height` bytes per frame (the last may be short)
///
/// Only format 0 (raw) is accepted.
#[derive(Debug, Clone)]
pub struct RawShape {
    data: Vec<u8>,
    width: i32,
    height: i32,
    entries: Vec<FrameEntry>,
}

#[inline]
fn read_u16(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

impl RawShape {
    pub fn parse(data: &[u8]) -> Result<Self, LoadError> {
        if data.len() < HEADER_SIZE {
            return Err(LoadError::Truncated {
                expected: HEADER_SIZE,
                actual: data.len(),
            });
        }
        let frame_count = read_u16(data, 0) as usize;
        let width = read_u16(data, 4) as i32;
        let height = read_u16(data, 6) as i32;
        if frame_count == 0 || frame_bytes(width, height).is_none() {
            return Err(LoadError::InvalidHeader(format!(
                "{} frames of {}x{}",
                frame_count, width, height
            )));
        }

        let table_end = HEADER_SIZE + frame_count * ENTRY_SIZE;
        if data.len() < table_end {
            return Err(LoadError::Truncated {
                expected: table_end,
                actual: data.len(),
            });
        }

        let mut entries = Vec::with_capacity(frame_count);
        for index in 0..frame_count {
            let e = &data[HEADER_SIZE + index * ENTRY_SIZE..HEADER_SIZE + (index + 1) * ENTRY_SIZE];
            let offset = u32::from_le_bytes([e[0], e[1], e[2], e[3]]) as usize;
            let format = e[6];
            if format != 0 {
                return Err(LoadError::InvalidFrame {
                    index,
                    reason: format!("unsupported encoding {}", format),
                });
            }
            if offset != 0 && (offset < table_end || offset >= data.len()) {
                return Err(LoadError::InvalidFrame {
                    index,
                    reason: format!("offset {} outside pixel data", offset),
                });
            }
            entries.push(FrameEntry {
                offset,
                x_offset: e[4] as i8,
                y_offset: e[5] as i8,
            });
        }

        Ok(Self {
            data: data.to_vec(),
            width,
            height,
            entries,
        })
    }

    /// Serialize raw frames into the container format. Empty slices become
    /// empty frames; longer slices are cut to `width * height`.
    pub fn encode(width: u16, height: u16, frames: &[&[u8]]) -> Vec<u8> {
        let frame_size = width as usize * height as usize;
        let mut out = Vec::new();
        out.extend_from_slice(&(frames.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&width.to_le_bytes());
        out.extend_from_slice(&height.to_le_bytes());

        let mut offset = HEADER_SIZE + frames.len() * ENTRY_SIZE;
        for frame in frames {
            let entry_offset = if frame.is_empty() { 0 } else { offset as u32 };
            out.extend_from_slice(&entry_offset.to_le_bytes());
            out.extend_from_slice(&[0, 0, 0, 0]);
            offset += frame.len().min(frame_size);
        }
        for frame in frames {
            out.extend_from_slice(&frame[..frame.len().min(frame_size)]);
        }
        out
    }
}

impl ShapeSource for RawShape {
    fn frame_count(&self) -> usize {
        self.entries.len()
    }

    fn size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    fn decode_frame(&self, frame: usize, out: &mut [u8]) -> Option<usize> {
        let entry = self.entries.get(frame)?;
        let len = out.len().min(frame_bytes(self.width, self.height)?);
        if entry.offset == 0 {
            out[..len].fill(0);
            return Some(len);
        }
        let available = (self.data.len() - entry.offset).min(len);
        out[..available].copy_from_slice(&self.data[entry.offset..entry.offset + available]);
        Some(available)
    }

    fn frame_offset(&self, frame: usize) -> (i32, i32) {
        self.entries
            .get(frame)
            .map_or((0, 0), |e| (e.x_offset as i32, e.y_offset as i32))
    }
}
