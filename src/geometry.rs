//! Integer rectangle math for clipping, dirty regions and visibility tests

/// Axis-aligned rectangle in pixel space. `width`/`height` <= 0 means empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle anchored at the origin
    pub const fn sized(width: i32, height: i32) -> Self {
        Self::new(0, 0, width, height)
    }

    #[inline]
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    #[inline]
    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.width as i64 * self.height as i64
        }
    }

    #[inline]
    pub fn contains(&self, px: i32, py: i32) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }

    /// True when the two rectangles share at least one pixel
    pub fn overlaps(&self, other: &Rect) -> bool {
        !(self.is_empty()
            || other.is_empty()
            || self.right() <= other.x
            || other.right() <= self.x
            || self.bottom() <= other.y
            || other.bottom() <= self.y)
    }

    /// Intersection; `None` when nothing remains
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        let r = Rect::new(x, y, right - x, bottom - y);
        if r.is_empty() {
            None
        } else {
            Some(r)
        }
    }

    /// Minimal bounding rectangle covering both. Empty inputs are ignored.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(x, y, right - x, bottom - y)
    }

    /// Separation along each axis: negative when overlapping on that axis,
    /// zero when edges touch.
    pub fn gap(&self, other: &Rect) -> (i32, i32) {
        let gx = (other.x - self.right()).max(self.x - other.right());
        let gy = (other.y - self.bottom()).max(self.y - other.bottom());
        (gx, gy)
    }

    /// True when both axis gaps are within `distance` pixels
    pub fn is_near(&self, other: &Rect, distance: i32) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        let (gx, gy) = self.gap(other);
        gx <= distance && gy <= distance
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

/// Resolved copy region of a clipped blit, valid in both source and
/// destination space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlitRegion {
    pub src_x: i32,
    pub src_y: i32,
    pub dst_x: i32,
    pub dst_y: i32,
    pub width: i32,
    pub height: i32,
}

/// Clip a copy of `src_rect` (in source space) placed at `(dst_x, dst_y)`.
///
/// `src_bounds` is the readable extent of the source and `dst_clip` the
/// writable window in the destination. Returns `None` when the visible
/// region collapses to zero width or height.
pub fn clip_blit(
    src_rect: Rect,
    src_bounds: Rect,
    dst_x: i32,
    dst_y: i32,
    dst_clip: Rect,
) -> Option<BlitRegion> {
    let src = src_rect.intersect(&src_bounds)?;

    // Shift the destination by however much the source lost on the top/left
    let placed = Rect::new(
        dst_x + (src.x - src_rect.x),
        dst_y + (src.y - src_rect.y),
        src.width,
        src.height,
    );
    let dst = placed.intersect(&dst_clip)?;

    Some(BlitRegion {
        src_x: src.x + (dst.x - placed.x),
        src_y: src.y + (dst.y - placed.y),
        dst_x: dst.x,
        dst_y: dst.y,
        width: dst.width,
        height: dst.height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_is_minimal_bounding_rect() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        assert_eq!(a.union(&b), Rect::new(0, 0, 15, 15));
        assert_eq!(b.union(&a), Rect::new(0, 0, 15, 15));
    }

    #[test]
    fn test_overlap_excludes_touching_edges() {
        let a = Rect::new(0, 0, 10, 10);
        assert!(a.overlaps(&Rect::new(9, 9, 2, 2)));
        assert!(!a.overlaps(&Rect::new(10, 0, 5, 5)));
        assert!(!a.overlaps(&Rect::new(0, 0, 0, 5)));
    }

    #[test]
    fn test_gap_and_near() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(14, 0, 10, 10);
        assert_eq!(a.gap(&b), (4, -10));
        assert!(a.is_near(&b, 4));
        assert!(!a.is_near(&b, 3));
    }

    #[test]
    fn test_clip_blit_left_top() {
        // 8x8 source placed at (-3, -2) on a 16x16 destination
        let region = clip_blit(
            Rect::sized(8, 8),
            Rect::sized(8, 8),
            -3,
            -2,
            Rect::sized(16, 16),
        )
        .unwrap();
        assert_eq!(
            region,
            BlitRegion {
                src_x: 3,
                src_y: 2,
                dst_x: 0,
                dst_y: 0,
                width: 5,
                height: 6
            }
        );
    }

    #[test]
    fn test_clip_blit_source_window_outside_source() {
        // Requesting source pixels left of the source shifts the destination
        let region = clip_blit(
            Rect::new(-2, 0, 6, 4),
            Rect::sized(4, 4),
            10,
            10,
            Rect::sized(32, 32),
        )
        .unwrap();
        assert_eq!(region.src_x, 0);
        assert_eq!(region.dst_x, 12);
        assert_eq!(region.width, 4);
    }

    #[test]
    fn test_clip_blit_empty() {
        assert!(clip_blit(
            Rect::sized(8, 8),
            Rect::sized(8, 8),
            100,
            100,
            Rect::sized(16, 16)
        )
        .is_none());
    }
}
