/// Identifier the overlay is mounted under.
pub const OVERLAY_ID: &str = "term-gloss-tooltip";

/// Width (in terminal columns) the overlay starts with before any fitting.
pub const OVERLAY_DEFAULT_WIDTH: i32 = 60;

/// Lower bound for the overlay width. The backend may raise it further if
/// its chrome (borders, close control) needs more room.
pub const OVERLAY_MIN_WIDTH: i32 = 16;

/// Content rows shown before the overlay starts scrolling its text.
pub const OVERLAY_MAX_CONTENT_ROWS: i32 = 12;

/// Rows left between the selection and the overlay.
pub const TOOLTIP_SELECTION_GAP: i32 = 1;

/// Rows scrolled per wheel notch, for both the pager and the overlay content.
pub const WHEEL_SCROLL_ROWS: i32 = 3;
