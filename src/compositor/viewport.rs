//! Tactical viewport: where the map shows on screen and how far it is scrolled

use crate::geometry::Rect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Screen area the map is drawn into
    pub screen: Rect,
    /// World coordinate shown at the top-left of `screen`
    pub scroll_x: i32,
    pub scroll_y: i32,
}

impl Viewport {
    pub fn new(screen: Rect) -> Self {
        Self {
            screen,
            scroll_x: 0,
            scroll_y: 0,
        }
    }

    #[inline]
    pub fn world_to_screen(&self, world_x: i32, world_y: i32) -> (i32, i32) {
        (
            world_x - self.scroll_x + self.screen.x,
            world_y - self.scroll_y + self.screen.y,
        )
    }

    #[inline]
    pub fn screen_to_world(&self, screen_x: i32, screen_y: i32) -> (i32, i32) {
        (
            screen_x - self.screen.x + self.scroll_x,
            screen_y - self.screen.y + self.scroll_y,
        )
    }

    pub fn world_rect_to_screen(&self, rect: Rect) -> Rect {
        let (x, y) = self.world_to_screen(rect.x, rect.y);
        Rect::new(x, y, rect.width, rect.height)
    }

    /// World area currently on screen
    pub fn visible_world(&self) -> Rect {
        Rect::new(self.scroll_x, self.scroll_y, self.screen.width, self.screen.height)
    }

    /// True when any part of the world rectangle lands inside the viewport
    pub fn is_visible(&self, world: Rect) -> bool {
        self.visible_world().overlaps(&world)
    }

    /// True when the world point maps inside the viewport
    pub fn contains_world(&self, world_x: i32, world_y: i32) -> bool {
        let (sx, sy) = self.world_to_screen(world_x, world_y);
        self.screen.contains(sx, sy)
    }
}
