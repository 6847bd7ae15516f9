use std::io;
use std::time::Duration;

use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind,
};
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::widgets::{Paragraph, Widget};

use crate::constants::{OVERLAY_DEFAULT_WIDTH, OVERLAY_ID, OVERLAY_MIN_WIDTH, WHEEL_SCROLL_ROWS};
use crate::controller::{InteractionState, TooltipController};
use crate::drivers::{InputDriver, OutputDriver};
use crate::event_loop::{ControlFlow, EventLoop};
use crate::geometry::Point;
use crate::input::PointerEvent;
use crate::pager::PagerComponent;
use crate::settings::Settings;
use crate::surface::{OverlaySurface, SurfaceError, TerminalSurface};
use crate::theme;
use crate::translate::Translator;

pub struct GlossApp {
    pager: PagerComponent,
    controller: TooltipController<TerminalSurface>,
    source_name: String,
    area: Rect,
}

impl GlossApp {
    pub fn new(
        text: &str,
        source_name: impl Into<String>,
        translator: Box<dyn Translator>,
        settings: &Settings,
    ) -> Result<Self, SurfaceError> {
        let surface = OverlaySurface::new(
            TerminalSurface::new(),
            OVERLAY_ID,
            OVERLAY_DEFAULT_WIDTH,
            OVERLAY_MIN_WIDTH,
        )?;
        Ok(Self {
            pager: PagerComponent::new(text),
            controller: TooltipController::from_settings(surface, translator, settings),
            source_name: source_name.into(),
            area: Rect::default(),
        })
    }

    pub fn pager(&self) -> &PagerComponent {
        &self.pager
    }

    pub fn controller(&self) -> &TooltipController<TerminalSurface> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut TooltipController<TerminalSurface> {
        &mut self.controller
    }

    /// Give the app its screen area: everything but the last row goes to the
    /// pager, the last row is the status line.
    pub fn layout(&mut self, area: Rect) {
        if area == self.area {
            return;
        }
        self.area = area;
        let pager_area = Rect {
            height: area.height.saturating_sub(1),
            ..area
        };
        self.pager.resize(pager_area);
        self.controller.on_resize();
    }

    /// Frame tick: deliver stream output and flush coalesced work. Returns
    /// how many stream writes were applied.
    pub fn tick(&mut self) -> usize {
        let applied = self.controller.pump_stream();
        self.controller.on_frame(&self.pager);
        applied
    }

    pub fn handle_event(&mut self, event: &Event) -> ControlFlow {
        match event {
            Event::Key(key) => return self.handle_key(key),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Resize(width, height) => self.layout(Rect::new(0, 0, *width, *height)),
            _ => {}
        }
        ControlFlow::Continue
    }

    fn handle_key(&mut self, key: &KeyEvent) -> ControlFlow {
        if key.kind == KeyEventKind::Release || self.controller.handle_key(key) {
            return ControlFlow::Continue;
        }
        match key.code {
            KeyCode::Char('q') => return ControlFlow::Quit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return ControlFlow::Quit;
            }
            // Keyboard route for terminals that swallow modified clicks.
            KeyCode::Char('t') | KeyCode::Enter => {
                self.controller.open_selection(&self.pager);
            }
            _ => {
                if self.pager.handle_key(key) {
                    self.controller.on_scroll();
                }
            }
        }
        ControlFlow::Continue
    }

    fn handle_mouse(&mut self, mouse: &MouseEvent) {
        let delta = match mouse.kind {
            MouseEventKind::ScrollUp => Some(-WHEEL_SCROLL_ROWS),
            MouseEventKind::ScrollDown => Some(WHEEL_SCROLL_ROWS),
            _ => None,
        };
        if let Some(delta) = delta {
            let point = Point::new(mouse.column as i32, mouse.row as i32);
            if self.controller.surface().contains(point) {
                self.controller.surface_mut().scroll_content(delta);
            } else if self.pager.scroll_by(delta as isize) {
                self.controller.on_scroll();
            }
            return;
        }

        let Some(pointer) = PointerEvent::from_mouse(mouse) else {
            return;
        };
        if self.controller.handle_pointer(&pointer)
            || !self.controller.surface().backend().text_selection_enabled()
        {
            return;
        }
        self.pager.handle_mouse(mouse);
        self.controller
            .handle_selection_gesture(&pointer, &self.pager);
    }

    pub fn render(&mut self, frame: &mut Frame<'_>) {
        self.layout(frame.area());
        let area = self.area;
        let buf = frame.buffer_mut();
        self.pager.render(buf);
        self.controller.surface().backend().render(buf, area);
        self.render_status(buf);
    }

    fn render_status(&self, buf: &mut Buffer) {
        if self.area.height == 0 {
            return;
        }
        let row = Rect {
            y: self.area.bottom() - 1,
            height: 1,
            ..self.area
        };
        Paragraph::new(Line::from(self.status_text()))
            .style(Style::default().bg(theme::status_bg()).fg(theme::status_fg()))
            .render(row, buf);
    }

    pub fn status_text(&self) -> String {
        let total = self.pager.line_count().max(1);
        let line = (self.pager.offset() + 1).min(total);
        let trigger = self.controller.trigger().label();
        let tooltip = match self.controller.state() {
            InteractionState::Closed => "",
            InteractionState::Anchored(_) => " | tooltip: anchored",
            InteractionState::Free => " | tooltip: free",
        };
        let streaming = if self.controller.translator().in_flight() > 0 {
            " | translating…"
        } else {
            ""
        };
        format!(
            " {} | {line}/{total} | {trigger}+drag or t: translate, Esc: close, q: quit{tooltip}{streaming}",
            self.source_name
        )
    }
}

/// Drive `app` until the user quits. Input goes through `input`, every frame
/// is drawn through `output`.
pub fn run<D, O>(
    app: &mut GlossApp,
    input: D,
    output: &mut O,
    frame_interval: Duration,
) -> io::Result<()>
where
    D: InputDriver,
    O: OutputDriver,
{
    let mut event_loop = EventLoop::new(input, frame_interval);
    event_loop.driver().set_mouse_capture(true)?;
    event_loop.run(|_, event| match event {
        Some(event) => Ok(app.handle_event(&event)),
        None => {
            app.tick();
            output.draw(|frame| app.render(frame))?;
            Ok(ControlFlow::Continue)
        }
    })
}
