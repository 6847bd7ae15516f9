//! Terminal backend for the tooltip overlay.
//!
//! The overlay is drawn as a bordered box: the top border doubles as the drag
//! header, a `[x]` close control sits at its right end, and the right border
//! below the header is the resize handle. Content is wrapped up front with
//! `textwrap` so measuring and drawing agree on the row count.
//!
//! Drawing goes through an offscreen buffer the size of the overlay, which is
//! then copied onto the frame. That keeps partially off-screen overlays (wider
//! than the viewport, or placed above an anchor near the top) rendering the
//! visible part correctly instead of being squashed into the frame.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Paragraph, Widget};

use super::{Region, RegionHandle, SurfaceBackend, SurfaceError};
use crate::constants::OVERLAY_MAX_CONTENT_ROWS;
use crate::drag::PointerCapture;
use crate::geometry::{Bounds, OverlayGeometry};
use crate::input::PointerId;
use crate::theme;

const CLOSE_LABEL: &str = "[x]";
const CLOSE_WIDTH: i32 = CLOSE_LABEL.len() as i32;
const GRIP_SYMBOL: &str = "◢";

/// Font sizes at or above this render emphasized, at or below the lower one
/// render dimmed; cells themselves cannot change size.
const EMPHASIS_FONT_SIZE: u16 = 20;
const DIM_FONT_SIZE: u16 = 10;

#[derive(Debug, Clone)]
pub struct TerminalSurface {
    title: String,
    mounted: Option<String>,
    isolated: bool,
    visible: bool,
    geometry: Option<OverlayGeometry>,
    content: String,
    font_size: u16,
    content_scroll: u16,
    max_content_rows: i32,
    captured: Option<(Region, PointerId)>,
    text_selection_enabled: bool,
}

impl Default for TerminalSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalSurface {
    pub fn new() -> Self {
        Self {
            title: " gloss ".to_string(),
            mounted: None,
            isolated: false,
            visible: false,
            geometry: None,
            content: String::new(),
            font_size: 16,
            content_scroll: 0,
            max_content_rows: OVERLAY_MAX_CONTENT_ROWS,
            captured: None,
            text_selection_enabled: true,
        }
    }

    pub fn with_max_content_rows(mut self, rows: i32) -> Self {
        self.max_content_rows = rows.max(1);
        self
    }

    pub fn captured(&self) -> Option<(Region, PointerId)> {
        self.captured
    }

    /// False while a drag on the overlay is in progress; the host keeps its
    /// own text selection still until then.
    pub fn text_selection_enabled(&self) -> bool {
        self.text_selection_enabled
    }

    fn inner_width(width: i32) -> usize {
        (width - 2).max(1) as usize
    }

    fn wrapped_lines(content: &str, width: i32) -> Vec<String> {
        if content.is_empty() {
            return vec![String::new()];
        }
        textwrap::wrap(content, Self::inner_width(width))
            .into_iter()
            .map(|line| line.into_owned())
            .collect()
    }

    fn content_rows(&self, width: i32, content: &str) -> i32 {
        Self::wrapped_lines(content, width).len() as i32
    }

    fn content_style(&self) -> Style {
        let style = Style::default().fg(theme::overlay_fg()).bg(theme::overlay_bg());
        if self.font_size >= EMPHASIS_FONT_SIZE {
            style.add_modifier(Modifier::BOLD)
        } else if self.font_size <= DIM_FONT_SIZE {
            style.add_modifier(Modifier::DIM)
        } else {
            style
        }
    }

    /// Draw the overlay onto `buf`, clipped to `area`.
    pub fn render(&self, buf: &mut Buffer, area: Rect) {
        let Some(geometry) = self.geometry else {
            return;
        };
        if !self.visible || self.mounted.is_none() {
            return;
        }
        let height = self.measure_height(geometry.width, &self.content);
        let width = geometry.width.clamp(1, u16::MAX as i32) as u16;
        let height = height.clamp(1, u16::MAX as i32) as u16;
        let local = Rect::new(0, 0, width, height);
        let mut offscreen = Buffer::empty(local);
        self.render_local(&mut offscreen, local);

        let clip = Bounds::from(area);
        for y in 0..height {
            for x in 0..width {
                let gx = geometry.left + x as i32;
                let gy = geometry.top + y as i32;
                if !clip.contains(crate::geometry::Point::new(gx, gy)) {
                    continue;
                }
                let (Some(src), Some(dst)) = (
                    offscreen.cell((x, y)),
                    buf.cell_mut((gx as u16, gy as u16)),
                ) else {
                    continue;
                };
                if self.isolated {
                    *dst = src.clone();
                } else {
                    dst.set_symbol(src.symbol());
                }
            }
        }
    }

    fn render_local(&self, buf: &mut Buffer, area: Rect) {
        let base = Style::default().fg(theme::overlay_fg()).bg(theme::overlay_bg());
        buf.set_style(area, base);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme::overlay_border()))
            .style(base)
            .title(Line::styled(
                self.title.as_str(),
                Style::default().fg(theme::overlay_title()),
            ))
            .title(
                Line::styled(CLOSE_LABEL, Style::default().fg(theme::overlay_close()))
                    .right_aligned(),
            );
        let inner = block.inner(area);
        block.render(area, buf);

        let lines: Vec<Line> = Self::wrapped_lines(&self.content, area.width as i32)
            .into_iter()
            .map(Line::from)
            .collect();
        Paragraph::new(lines)
            .style(self.content_style())
            .scroll((self.content_scroll, 0))
            .render(inner, buf);

        if area.width > 0 && area.height > 1 {
            let grip = (area.right() - 1, area.bottom() - 1);
            if let Some(cell) = buf.cell_mut(grip) {
                cell.set_symbol(GRIP_SYMBOL)
                    .set_style(Style::default().fg(theme::overlay_grip()));
            }
        }
    }
}

impl PointerCapture for TerminalSurface {
    fn set_pointer_capture(&mut self, region: Region, pointer: PointerId) {
        self.captured = Some((region, pointer));
    }

    fn release_pointer_capture(&mut self, region: Region, pointer: PointerId) {
        if self.captured == Some((region, pointer)) {
            self.captured = None;
        }
    }

    fn set_text_selection_enabled(&mut self, enabled: bool) {
        self.text_selection_enabled = enabled;
    }
}

impl SurfaceBackend for TerminalSurface {
    fn mount(&mut self, id: &str) -> Result<(), SurfaceError> {
        if let Some(existing) = &self.mounted
            && existing != id
        {
            return Err(SurfaceError::Mount(id.to_string()));
        }
        self.mounted = Some(id.to_string());
        Ok(())
    }

    fn apply_style_isolation(&mut self) {
        self.isolated = true;
    }

    fn query_named_region(&self, region: Region) -> Option<RegionHandle> {
        let slot = Region::ALL.iter().position(|r| *r == region)?;
        Some(RegionHandle { region, slot })
    }

    fn region_bounds(&self, handle: RegionHandle, frame: Bounds) -> Bounds {
        let close_left = frame.right - 1 - CLOSE_WIDTH;
        match handle.region {
            Region::HeaderBlank => Bounds::new(frame.left, frame.top, close_left, frame.top + 1),
            Region::CloseButton => {
                Bounds::new(close_left, frame.top, frame.right - 1, frame.top + 1)
            }
            Region::ResizeHandle => {
                Bounds::new(frame.right - 1, frame.top + 1, frame.right, frame.bottom)
            }
        }
    }

    fn chrome_width(&self) -> i32 {
        // corners, close control, and at least one header cell to grab
        2 + CLOSE_WIDTH + 1
    }

    fn measure_height(&self, width: i32, content: &str) -> i32 {
        2 + self.content_rows(width, content).min(self.max_content_rows)
    }

    fn scroll_limit(&self, width: i32, content: &str) -> u16 {
        let hidden = (self.content_rows(width, content) - self.max_content_rows).max(0);
        u16::try_from(hidden).unwrap_or(u16::MAX)
    }

    fn apply_visibility(&mut self, visible: bool) {
        self.visible = visible;
    }

    fn apply_geometry(&mut self, geometry: OverlayGeometry) {
        self.geometry = Some(geometry);
    }

    fn apply_content(&mut self, content: &str) {
        self.content = content.to_string();
    }

    fn apply_font_size(&mut self, size: u16) {
        self.font_size = size;
    }

    fn apply_content_scroll(&mut self, offset: u16) {
        self.content_scroll = offset;
    }
}
