use ratatui::style::Color;

// Centralized theme colors for the pager and the tooltip overlay.

pub fn overlay_bg() -> Color {
    Color::Black
}
pub fn overlay_fg() -> Color {
    Color::White
}
pub fn overlay_border() -> Color {
    Color::DarkGray
}
pub fn overlay_title() -> Color {
    Color::Cyan
}
pub fn overlay_close() -> Color {
    Color::LightRed
}
pub fn overlay_grip() -> Color {
    Color::Yellow
}

// Pager
pub fn selection_bg() -> Color {
    Color::Blue
}
pub fn selection_fg() -> Color {
    Color::White
}
pub fn status_bg() -> Color {
    Color::DarkGray
}
pub fn status_fg() -> Color {
    Color::White
}
