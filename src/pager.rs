use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use unicode_width::UnicodeWidthChar;

use crate::document::{DocumentSelection, HostDocument, TextPosition, TextRange};
use crate::geometry::{Bounds, Viewport};
use crate::theme;

const TAB_STOP: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Phase {
    #[default]
    Idle,
    Dragging,
}

/// Tracks the anchor/cursor pair of a mouse selection.
#[derive(Debug, Clone, Default)]
pub struct SelectionController {
    anchor: Option<TextPosition>,
    cursor: Option<TextPosition>,
    phase: Phase,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn begin_drag(&mut self, pos: TextPosition) {
        self.anchor = Some(pos);
        self.cursor = Some(pos);
        self.phase = Phase::Dragging;
    }

    pub fn update_drag(&mut self, pos: TextPosition) {
        if self.phase == Phase::Dragging {
            self.cursor = Some(pos);
        }
    }

    /// Finalize the drag. Returns the normalized range if it is non-empty;
    /// an empty drag clears the selection.
    pub fn finish_drag(&mut self) -> Option<TextRange> {
        if self.phase != Phase::Dragging {
            return None;
        }
        self.phase = Phase::Idle;
        match self.range() {
            Some(range) if !range.is_empty() => Some(range.normalized()),
            _ => {
                self.clear();
                None
            }
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.phase == Phase::Dragging
    }

    pub fn has_selection(&self) -> bool {
        self.range().is_some_and(|r| !r.is_empty())
    }

    pub fn range(&self) -> Option<TextRange> {
        match (self.anchor, self.cursor) {
            (Some(start), Some(end)) => Some(TextRange::new(start, end)),
            _ => None,
        }
    }
}

/// Read-only scrollable text; the document the tooltip floats over.
#[derive(Debug, Clone, Default)]
pub struct PagerComponent {
    lines: Vec<String>,
    area: Rect,
    offset: usize,
    selection: SelectionController,
}

impl PagerComponent {
    pub fn new(text: &str) -> Self {
        Self {
            lines: text.lines().map(expand_tabs).collect(),
            ..Self::default()
        }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn area(&self) -> Rect {
        self.area
    }

    pub fn resize(&mut self, area: Rect) {
        self.area = area;
        self.offset = self.offset.min(self.max_offset());
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    fn max_offset(&self) -> usize {
        self.lines
            .len()
            .saturating_sub(self.area.height.max(1) as usize)
    }

    /// Scroll by `delta` lines. Returns whether the view moved.
    pub fn scroll_by(&mut self, delta: isize) -> bool {
        let next = self
            .offset
            .saturating_add_signed(delta)
            .min(self.max_offset());
        let moved = next != self.offset;
        self.offset = next;
        moved
    }

    pub fn scroll_to(&mut self, offset: usize) -> bool {
        let next = offset.min(self.max_offset());
        let moved = next != self.offset;
        self.offset = next;
        moved
    }

    /// Keyboard scrolling. Returns whether the view moved.
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press {
            return false;
        }
        let page = self.area.height.max(1) as isize;
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => self.scroll_by(1),
            KeyCode::Up | KeyCode::Char('k') => self.scroll_by(-1),
            KeyCode::PageDown | KeyCode::Char(' ') => self.scroll_by(page),
            KeyCode::PageUp => self.scroll_by(-page),
            KeyCode::Home | KeyCode::Char('g') => self.scroll_to(0),
            KeyCode::End | KeyCode::Char('G') => self.scroll_to(usize::MAX),
            _ => false,
        }
    }

    /// Drag-to-select with the primary button.
    pub fn handle_mouse(&mut self, mouse: &MouseEvent) -> bool {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                match self.position_at(mouse.column, mouse.row, false) {
                    Some(pos) => {
                        self.selection.begin_drag(pos);
                        true
                    }
                    None => {
                        self.selection.clear();
                        false
                    }
                }
            }
            MouseEventKind::Drag(MouseButton::Left) if self.selection.is_dragging() => {
                if let Some(pos) = self.position_at(mouse.column, mouse.row, true) {
                    self.selection.update_drag(pos);
                }
                true
            }
            MouseEventKind::Up(MouseButton::Left) if self.selection.is_dragging() => {
                if let Some(pos) = self.position_at(mouse.column, mouse.row, true) {
                    self.selection.update_drag(pos);
                }
                self.selection.finish_drag();
                true
            }
            _ => false,
        }
    }

    pub fn selection_controller(&self) -> &SelectionController {
        &self.selection
    }

    /// Map a terminal cell to a document position. With `clamp`, points
    /// outside the view snap to its nearest edge (used while dragging).
    fn position_at(&self, column: u16, row: u16, clamp: bool) -> Option<TextPosition> {
        if self.lines.is_empty() || self.area.width == 0 || self.area.height == 0 {
            return None;
        }
        let inside = column >= self.area.x
            && column < self.area.right()
            && row >= self.area.y
            && row < self.area.bottom();
        if !inside && !clamp {
            return None;
        }
        let row = row.clamp(self.area.y, self.area.bottom() - 1);
        let column = column.clamp(self.area.x, self.area.right());
        let line = (self.offset + (row - self.area.y) as usize).min(self.lines.len() - 1);
        let col = index_at(&self.lines[line], (column - self.area.x) as usize);
        Some(TextPosition::new(line, col))
    }

    fn text_for_range(&self, range: TextRange) -> String {
        let range = range.normalized();
        let mut out = Vec::new();
        for row in range.start.row..=range.end.row.min(self.lines.len().saturating_sub(1)) {
            let line = &self.lines[row];
            let len = line.chars().count();
            let start = if row == range.start.row {
                range.start.column.min(len)
            } else {
                0
            };
            let end = if row == range.end.row {
                range.end.column.min(len)
            } else {
                len
            };
            out.push(
                line.chars()
                    .skip(start)
                    .take(end.saturating_sub(start))
                    .collect::<String>(),
            );
        }
        out.join("\n")
    }

    pub fn render(&self, buf: &mut Buffer) {
        let area = self.area.intersection(buf.area);
        if area.width == 0 || area.height == 0 {
            return;
        }
        let selected = self
            .selection
            .range()
            .filter(|r| !r.is_empty())
            .map(TextRange::normalized);
        let highlight = Style::default()
            .bg(theme::selection_bg())
            .fg(theme::selection_fg());
        for dy in 0..area.height {
            let row = self.offset + dy as usize;
            let Some(line) = self.lines.get(row) else {
                break;
            };
            let y = area.y + dy;
            let mut x = 0usize;
            for (col, ch) in line.chars().enumerate() {
                let width = ch.width().unwrap_or(0);
                if width == 0 {
                    continue;
                }
                if x + width > area.width as usize {
                    break;
                }
                let lit = selected.is_some_and(|r| r.contains(TextPosition::new(row, col)));
                for cell_x in x..x + width {
                    let Some(cell) = buf.cell_mut((area.x + cell_x as u16, y)) else {
                        continue;
                    };
                    if cell_x == x {
                        cell.set_char(ch);
                    } else {
                        // hidden behind the wide glyph
                        cell.reset();
                    }
                    if lit {
                        cell.set_style(highlight);
                    }
                }
                x += width;
            }
        }
    }

    /// Screen column where the character at `index` of `row` starts.
    fn display_column(&self, row: usize, index: usize) -> usize {
        self.lines
            .get(row)
            .map_or(index, |line| column_of(line, index))
    }
}

fn expand_tabs(line: &str) -> String {
    if !line.contains('\t') {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len() + TAB_STOP);
    let mut width = 0;
    for ch in line.chars() {
        if ch == '\t' {
            let pad = TAB_STOP - width % TAB_STOP;
            out.extend(std::iter::repeat_n(' ', pad));
            width += pad;
        } else {
            out.push(ch);
            width += ch.width().unwrap_or(0);
        }
    }
    out
}

fn column_of(line: &str, index: usize) -> usize {
    line.chars()
        .take(index)
        .map(|ch| ch.width().unwrap_or(0))
        .sum()
}

/// Index of the character covering screen column `column`; columns past the
/// end map to the line length.
fn index_at(line: &str, column: usize) -> usize {
    let mut start = 0;
    for (index, ch) in line.chars().enumerate() {
        let end = start + ch.width().unwrap_or(0);
        if column < end {
            return index;
        }
        start = end;
    }
    line.chars().count()
}

impl HostDocument for PagerComponent {
    fn viewport(&self) -> Viewport {
        Viewport::from(self.area)
    }

    fn selection(&self) -> Option<DocumentSelection> {
        if self.selection.is_dragging() {
            return None;
        }
        let range = self.selection.range()?.normalized();
        if range.is_empty() {
            return None;
        }
        Some(DocumentSelection {
            text: self.text_for_range(range),
            range,
        })
    }

    fn range_bounds(&self, range: &TextRange) -> Bounds {
        let range = range.normalized();
        let x = self.area.x as i32;
        let y = self.area.y as i32 - self.offset as i32;
        let top = y + range.start.row as i32;
        let bottom = y + range.end.row as i32 + 1;
        if range.start.row == range.end.row {
            let start = self.display_column(range.start.row, range.start.column);
            let end = self.display_column(range.end.row, range.end.column);
            Bounds::new(x + start as i32, top, x + end as i32, bottom)
        } else {
            Bounds::new(x, top, x + self.area.width as i32, bottom)
        }
    }
}
