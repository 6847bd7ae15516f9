//! Placement math for the tooltip overlay.
//!
//! Everything here is pure: callers pass in the anchor rectangle, the overlay
//! size and the viewport, and get back a position. Coordinates are signed
//! viewport cells so an overlay may legitimately sit partly outside the
//! visible area (e.g. placed above an anchor near the top edge).

use ratatui::layout::Rect;

/// A point in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Edge-based rectangle. `right` and `bottom` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub const fn from_size(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            right: left + width,
            bottom: top + height,
        }
    }

    pub fn width(&self) -> i32 {
        (self.right - self.left).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.bottom - self.top).max(0)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left && point.x < self.right && point.y >= self.top && point.y < self.bottom
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }
}

impl From<Rect> for Bounds {
    fn from(rect: Rect) -> Self {
        Bounds::from_size(
            rect.x as i32,
            rect.y as i32,
            rect.width as i32,
            rect.height as i32,
        )
    }
}

/// The visible document area used for containment clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl Viewport {
    pub const fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Viewport anchored at the origin, the common case for a full-screen host.
    pub const fn sized(width: i32, height: i32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn right(&self) -> i32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.top + self.height
    }
}

impl From<Rect> for Viewport {
    fn from(rect: Rect) -> Self {
        Viewport::new(
            rect.x as i32,
            rect.y as i32,
            rect.width as i32,
            rect.height as i32,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub left: i32,
    pub top: i32,
}

/// Live overlay geometry plus the width floor it was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayGeometry {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub min_width: i32,
}

impl OverlayGeometry {
    pub fn new(width: i32, min_width: i32) -> Self {
        Self {
            left: 0,
            top: 0,
            width: width.max(min_width),
            min_width,
        }
    }

    /// Effective width for a requested width: never below the floor.
    pub fn clamp_width(&self, requested: i32) -> i32 {
        requested.max(self.min_width)
    }

    pub fn frame(&self, height: i32) -> Bounds {
        Bounds::from_size(self.left, self.top, self.width, height)
    }
}

/// Pull `left` so the right edge fits first, then so the left edge fits.
///
/// When the overlay is wider than the viewport the second step wins and the
/// overlay overflows to the right of the viewport's left edge rather than
/// past its right edge.
fn clamp_left(left: i32, width: i32, viewport: &Viewport) -> i32 {
    left.min(viewport.right() - width).max(viewport.left)
}

/// Place an overlay next to `anchor`: left-aligned with it, below it when
/// there is room, otherwise above it.
pub fn compute_anchored_position(
    anchor: Bounds,
    width: i32,
    height: i32,
    viewport: Viewport,
    gap: i32,
) -> Position {
    let left = clamp_left(anchor.left, width, &viewport);
    let below = anchor.bottom + gap;
    let top = if below + height <= viewport.bottom() {
        below
    } else {
        anchor.top - gap - height
    };
    Position { left, top }
}

/// Keep the overlay's horizontal extent inside the viewport.
///
/// Shifting is always tried before shrinking, so the width only changes when
/// the overlay cannot fit by moving alone. Returns `(left, width)`.
pub fn fit_width_to_viewport(left: i32, width: i32, viewport: Viewport) -> (i32, i32) {
    let right = viewport.right();
    let mut left = left;
    let mut width = width;
    if left + width > right {
        left = clamp_left(left, width, &viewport);
    }
    if left + width > right {
        width = right - left;
    }
    (left, width)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAP: i32 = 8;

    fn anchor() -> Bounds {
        Bounds::new(100, 280, 180, 300)
    }

    #[test]
    fn places_below_when_room() {
        let pos = compute_anchored_position(anchor(), 360, 50, Viewport::sized(800, 600), GAP);
        assert_eq!(pos, Position { left: 100, top: 308 });
    }

    #[test]
    fn falls_back_above_when_bottom_overflows() {
        let pos = compute_anchored_position(anchor(), 360, 50, Viewport::sized(800, 350), GAP);
        assert_eq!(pos.top, 222);
        assert_eq!(pos.left, 100);
    }

    #[test]
    fn exact_fit_below_is_accepted() {
        // 300 + 8 + 50 == 358
        let pos = compute_anchored_position(anchor(), 360, 50, Viewport::sized(800, 358), GAP);
        assert_eq!(pos.top, 308);
    }

    #[test]
    fn above_placement_may_overflow_top() {
        let anchor = Bounds::new(0, 2, 10, 3);
        let pos = compute_anchored_position(anchor, 20, 30, Viewport::sized(80, 10), 1);
        assert_eq!(pos.top, 2 - 1 - 30);
    }

    #[test]
    fn clamps_left_so_right_edge_fits() {
        let anchor = Bounds::new(760, 10, 780, 11);
        let pos = compute_anchored_position(anchor, 360, 5, Viewport::sized(800, 600), GAP);
        assert_eq!(pos.left, 440);
    }

    #[test]
    fn wider_than_viewport_pins_to_left_edge() {
        let anchor = Bounds::new(50, 10, 60, 11);
        let pos = compute_anchored_position(anchor, 900, 5, Viewport::sized(800, 600), GAP);
        assert_eq!(pos.left, 0);
    }

    #[test]
    fn fit_width_shifts_before_shrinking() {
        let (left, width) = fit_width_to_viewport(600, 300, Viewport::sized(800, 600));
        assert_eq!((left, width), (500, 300));
    }

    #[test]
    fn fit_width_shrinks_when_shift_is_not_enough() {
        let (left, width) = fit_width_to_viewport(100, 900, Viewport::sized(800, 600));
        assert_eq!((left, width), (0, 800));
    }

    #[test]
    fn fit_width_leaves_contained_overlay_alone() {
        let (left, width) = fit_width_to_viewport(10, 100, Viewport::sized(800, 600));
        assert_eq!((left, width), (10, 100));
    }

    #[test]
    fn width_floor_applies() {
        let geometry = OverlayGeometry::new(720, 60);
        assert_eq!(geometry.clamp_width(10), 60);
        assert_eq!(geometry.clamp_width(61), 61);
    }

    #[test]
    fn bounds_intersection_ignores_empty() {
        let a = Bounds::from_size(0, 0, 10, 10);
        let b = Bounds::from_size(5, 5, 10, 10);
        let empty = Bounds::from_size(5, 5, 0, 10);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&empty));
        assert!(!a.intersects(&Bounds::from_size(10, 0, 5, 5)));
    }
}
