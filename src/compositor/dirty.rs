//! Screen regions that need redrawing this frame

use crate::geometry::Rect;

/// Collects dirty rectangles, merging neighbours as they arrive.
///
/// Starts in full-redraw mode so the first frame paints everything. When
/// disabled, every frame is a full redraw.
#[derive(Debug, Clone)]
pub struct DirtyTracker {
    screen: Rect,
    rects: Vec<Rect>,
    full_redraw: bool,
    enabled: bool,
    merge_distance: i32,
    max_rects: usize,
}

impl DirtyTracker {
    pub fn new(screen: Rect, merge_distance: i32, max_rects: usize) -> Self {
        Self {
            screen,
            rects: Vec::with_capacity(max_rects),
            full_redraw: true,
            enabled: true,
            merge_distance,
            max_rects: max_rects.max(1),
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Switch between incremental and full redraw. Either way the next frame
    /// is a full redraw.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.mark_full_redraw();
    }

    #[inline]
    pub fn is_full_redraw(&self) -> bool {
        self.full_redraw || !self.enabled
    }

    /// Merged rectangles recorded so far (empty during a full redraw)
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    pub fn len(&self) -> usize {
        self.rects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Record a screen rectangle. It is clipped to the screen, then merged
    /// into the first rectangle it overlaps or comes within the merge
    /// distance of.
    pub fn add(&mut self, rect: Rect) {
        if self.is_full_redraw() {
            return;
        }
        let Some(rect) = rect.intersect(&self.screen) else {
            return;
        };

        if let Some(i) = self
            .rects
            .iter()
            .position(|r| r.is_near(&rect, self.merge_distance))
        {
            self.rects[i] = self.rects[i].union(&rect);
            self.absorb(i);
            return;
        }

        if self.rects.len() >= self.max_rects {
            self.coalesce();
        }
        if self.rects.len() >= self.max_rects {
            log::debug!("dirty rect cap {} reached, redrawing everything", self.max_rects);
            self.mark_full_redraw();
            return;
        }
        self.rects.push(rect);
    }

    /// Fold every rectangle near `rects[i]` into it, repeating while the
    /// grown rectangle picks up new neighbours
    fn absorb(&mut self, mut i: usize) {
        loop {
            let grown = self.rects[i];
            let Some(j) = self
                .rects
                .iter()
                .enumerate()
                .position(|(j, r)| j != i && r.is_near(&grown, self.merge_distance))
            else {
                break;
            };
            self.rects[i] = grown.union(&self.rects[j]);
            self.rects.swap_remove(j);
            if i == self.rects.len() {
                // swap_remove moved the grown rect into slot j
                i = j;
            }
        }
    }

    /// Merge every pair within the merge distance until none remain
    pub fn coalesce(&mut self) {
        let mut i = 0;
        while i < self.rects.len() {
            self.absorb(i);
            i += 1;
        }
    }

    pub fn mark_full_redraw(&mut self) {
        self.full_redraw = true;
        self.rects.clear();
    }

    /// Forget everything after a frame has been presented
    pub fn clear(&mut self) {
        self.rects.clear();
        self.full_redraw = false;
    }

    /// Regions to repaint this frame: the whole screen during a full
    /// redraw, otherwise the merged rectangles
    pub fn regions(&self) -> Vec<Rect> {
        if self.is_full_redraw() {
            vec![self.screen]
        } else {
            self.rects.clone()
        }
    }
}
