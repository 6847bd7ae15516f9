use crate::geometry::{Bounds, Viewport};

/// Logical coordinates inside a text document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct TextPosition {
    pub row: usize,
    pub column: usize,
}

impl TextPosition {
    pub const fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

/// Start/end pair of positions, end-exclusive once normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextRange {
    pub start: TextPosition,
    pub end: TextPosition,
}

impl TextRange {
    pub fn new(start: TextPosition, end: TextPosition) -> Self {
        Self { start, end }
    }

    /// Return the range sorted from earliest to latest position.
    pub fn normalized(self) -> Self {
        if self.start <= self.end {
            self
        } else {
            Self {
                start: self.end,
                end: self.start,
            }
        }
    }

    pub fn is_empty(self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, pos: TextPosition) -> bool {
        let normalized = self.normalized();
        normalized.start <= pos && pos < normalized.end
    }
}

/// The user's current selection: its text and where it lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSelection {
    pub text: String,
    pub range: TextRange,
}

pub trait HostDocument {
    /// Visible area in viewport coordinates.
    fn viewport(&self) -> Viewport;

    /// Current selection, if any. The text is returned untrimmed.
    fn selection(&self) -> Option<DocumentSelection>;

    /// Bounding box of `range` as currently laid out (after scrolling,
    /// resizing, reflow). Parts scrolled out of view yield coordinates
    /// outside the viewport.
    fn range_bounds(&self, range: &TextRange) -> Bounds;
}
