use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use crate::constants::TOOLTIP_SELECTION_GAP;
use crate::document::{HostDocument, TextRange};
use crate::drag::DragTracker;
use crate::geometry::{self, Point};
use crate::input::{PointerEvent, PointerId, PointerKind};
use crate::settings::{Settings, TriggerModifier};
use crate::stream::{Observer, StreamBuffer, Subscription};
use crate::surface::{OverlaySurface, Region, SurfaceBackend};
use crate::throttle::FrameThrottle;
use crate::translate::Translator;

/// Snapshot of the selection that opened the tooltip. Its on-screen bounds
/// are re-measured through the document whenever layout changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorRegion {
    pub range: TextRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionState {
    #[default]
    Closed,
    /// Follows the anchor through scrolling and resizing.
    Anchored(AnchorRegion),
    /// Moved by hand; stays where the user put it.
    Free,
}

/// Overlay geometry frozen at the start of a header drag.
#[derive(Debug, Clone, Copy)]
struct MoveOrigin {
    pointer: Point,
    left: i32,
    top: i32,
}

/// Renders the subscribed buffer into the overlay.
struct ContentObserver<B> {
    surface: Weak<RefCell<OverlaySurface<B>>>,
}

impl<B: SurfaceBackend> Observer for ContentObserver<B> {
    fn update(&self, subject: &StreamBuffer) {
        if let Some(surface) = self.surface.upgrade() {
            surface.borrow_mut().set_content(subject.rendered());
        }
    }
}

/// Decides when the tooltip opens, where it goes and when it closes. Driven by
/// the host's pointer and key events, plus `on_frame` once per frame.
pub struct TooltipController<B: SurfaceBackend + 'static> {
    surface: Rc<RefCell<OverlaySurface<B>>>,
    translator: Box<dyn Translator>,
    state: InteractionState,
    subscription: Option<Subscription>,
    header_drag: DragTracker,
    resize_drag: DragTracker,
    close_press: Option<PointerId>,
    move_origin: Option<MoveOrigin>,
    relayout: FrameThrottle<()>,
    trigger: TriggerModifier,
    gap: i32,
}

impl<B: SurfaceBackend + 'static> TooltipController<B> {
    pub fn new(
        surface: OverlaySurface<B>,
        translator: Box<dyn Translator>,
        trigger: TriggerModifier,
    ) -> Self {
        Self {
            surface: Rc::new(RefCell::new(surface)),
            translator,
            state: InteractionState::Closed,
            subscription: None,
            header_drag: DragTracker::new(Region::HeaderBlank),
            resize_drag: DragTracker::new(Region::ResizeHandle),
            close_press: None,
            move_origin: None,
            relayout: FrameThrottle::new(),
            trigger,
            gap: TOOLTIP_SELECTION_GAP,
        }
    }

    /// Controller configured from user settings: trigger modifier and
    /// content font size.
    pub fn from_settings(
        mut surface: OverlaySurface<B>,
        translator: Box<dyn Translator>,
        settings: &Settings,
    ) -> Self {
        surface.set_font_size(settings.content_font_size);
        Self::new(surface, translator, settings.trigger_modifier)
    }

    pub fn with_gap(mut self, gap: i32) -> Self {
        self.gap = gap;
        self
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state != InteractionState::Closed
    }

    pub fn trigger(&self) -> TriggerModifier {
        self.trigger
    }

    pub fn surface(&self) -> std::cell::Ref<'_, OverlaySurface<B>> {
        self.surface.borrow()
    }

    pub fn surface_mut(&self) -> std::cell::RefMut<'_, OverlaySurface<B>> {
        self.surface.borrow_mut()
    }

    pub fn translator(&self) -> &dyn Translator {
        self.translator.as_ref()
    }

    pub fn subscription(&self) -> Option<&Subscription> {
        self.subscription.as_ref()
    }

    /// Route a pointer event to the overlay. Returns `true` when the overlay
    /// consumed it and the host should not see it.
    pub fn handle_pointer(&mut self, event: &PointerEvent) -> bool {
        match event.kind {
            PointerKind::Down(_) => self.pointer_down(event),
            PointerKind::Move => self.pointer_move(event),
            PointerKind::Up(_) | PointerKind::Cancel => self.pointer_up(event),
        }
    }

    fn pointer_down(&mut self, event: &PointerEvent) -> bool {
        let mut surface = self.surface.borrow_mut();
        if !surface.contains(event.position) {
            drop(surface);
            if event.is_primary_down() && matches!(self.state, InteractionState::Anchored(_)) {
                tracing::debug!(x = event.position.x, y = event.position.y, "outside press");
                self.close();
            }
            return false;
        }
        match surface.region_at(event.position) {
            Some(Region::ResizeHandle) => {
                self.resize_drag.press(event, &mut *surface);
            }
            Some(Region::HeaderBlank) => {
                if self.header_drag.press(event, &mut *surface) {
                    self.move_origin = Some(MoveOrigin {
                        pointer: event.position,
                        left: surface.left(),
                        top: surface.top(),
                    });
                    if self.state != InteractionState::Free {
                        tracing::debug!("tooltip detached from selection");
                    }
                    self.state = InteractionState::Free;
                    self.relayout.cancel();
                }
            }
            Some(Region::CloseButton) if event.is_primary_down() => {
                self.close_press = Some(event.id);
            }
            _ => {}
        }
        true
    }

    fn pointer_move(&mut self, event: &PointerEvent) -> bool {
        let header = self.header_drag.moved(event);
        let resize = self.resize_drag.moved(event);
        header || resize || self.close_press == Some(event.id)
    }

    fn pointer_up(&mut self, event: &PointerEvent) -> bool {
        let mut surface = self.surface.borrow_mut();
        let header = self.header_drag.release(event, &mut *surface);
        let resize = self.resize_drag.release(event, &mut *surface);
        if header {
            self.move_origin = None;
        }
        let pressed_close = self
            .close_press
            .take_if(|pointer| *pointer == event.id)
            .is_some();
        let clicked_close = pressed_close
            && event.is_primary_up()
            && surface.region_at(event.position) == Some(Region::CloseButton);
        drop(surface);
        if clicked_close {
            tracing::debug!("close control clicked");
            self.close();
        }
        header || resize || pressed_close
    }

    /// Open the tooltip for the current selection if `event` is a primary
    /// release with the trigger modifier held.
    pub fn handle_selection_gesture(
        &mut self,
        event: &PointerEvent,
        doc: &dyn HostDocument,
    ) -> bool {
        if !event.is_primary_up() || !self.trigger.is_held(event.modifiers) {
            return false;
        }
        self.open_selection(doc)
    }

    /// Translate the document's current selection and show the tooltip
    /// next to it. Supersedes whatever the tooltip was showing before.
    pub fn open_selection(&mut self, doc: &dyn HostDocument) -> bool {
        let Some(selection) = doc.selection() else {
            return false;
        };
        let text = selection.text.trim();
        if text.is_empty() {
            tracing::trace!("ignoring blank selection");
            return false;
        }
        let anchor = doc.range_bounds(&selection.range);
        if self.surface.borrow().overlaps(&anchor) {
            tracing::debug!("selection overlaps tooltip; ignoring");
            return false;
        }

        self.end_drags();
        self.move_origin = None;
        self.close_press = None;

        let buffer = self.translator.request(text);
        let observer: Rc<dyn Observer> = Rc::new(ContentObserver {
            surface: Rc::downgrade(&self.surface),
        });
        if self.subscription.take().is_some() {
            tracing::debug!("superseding previous translation stream");
        }
        self.subscription = Some(Subscription::attach(buffer.clone(), observer));
        self.state = InteractionState::Anchored(AnchorRegion {
            range: selection.range,
        });
        self.relayout.cancel();

        let viewport = doc.viewport();
        let mut surface = self.surface.borrow_mut();
        // A fresh buffer renders empty, which clears the previous text.
        surface.set_content(buffer.borrow().rendered());
        let position = geometry::compute_anchored_position(
            anchor,
            surface.width(),
            surface.height(),
            viewport,
            self.gap,
        );
        surface.set_left(position.left);
        surface.set_top(position.top);
        surface.make_width_within_viewport(viewport);
        surface.display();
        tracing::debug!(
            chars = text.chars().count(),
            left = surface.left(),
            top = surface.top(),
            "tooltip anchored"
        );
        true
    }

    /// Escape closes an open tooltip.
    pub fn handle_key(&mut self, key: &KeyEvent) -> bool {
        if key.kind == KeyEventKind::Release || key.code != KeyCode::Esc || !self.is_open() {
            return false;
        }
        tracing::debug!("escape pressed");
        self.close();
        true
    }

    pub fn on_scroll(&mut self) {
        self.schedule_relayout();
    }

    pub fn on_resize(&mut self) {
        self.schedule_relayout();
    }

    fn schedule_relayout(&mut self) {
        if matches!(self.state, InteractionState::Anchored(_)) {
            self.relayout.schedule(());
        }
    }

    /// Flush one frame's worth of coalesced work.
    pub fn on_frame(&mut self, doc: &dyn HostDocument) {
        if let Some(tick) = self.header_drag.take_tick()
            && let Some(origin) = self.move_origin
        {
            let mut surface = self.surface.borrow_mut();
            surface.set_left(origin.left + tick.position.x - origin.pointer.x);
            surface.set_top(origin.top + tick.position.y - origin.pointer.y);
        }
        if let Some(tick) = self.resize_drag.take_tick() {
            let mut surface = self.surface.borrow_mut();
            let left = surface.left();
            surface.set_width(tick.position.x - left + 1);
        }
        if self.relayout.take().is_some() {
            self.relayout_anchor(doc);
        }
    }

    fn relayout_anchor(&mut self, doc: &dyn HostDocument) {
        let InteractionState::Anchored(anchor) = self.state else {
            return;
        };
        let bounds = doc.range_bounds(&anchor.range);
        let viewport = doc.viewport();
        let mut surface = self.surface.borrow_mut();
        let position = geometry::compute_anchored_position(
            bounds,
            surface.width(),
            surface.height(),
            viewport,
            self.gap,
        );
        surface.set_left(position.left);
        surface.set_top(position.top);
        surface.make_width_within_viewport(viewport);
    }

    /// Let producers deliver what they have. Content growth may change the
    /// overlay's height, so an anchored tooltip is laid out again next frame.
    pub fn pump_stream(&mut self) -> usize {
        let applied = self.translator.poll();
        if applied > 0 {
            self.schedule_relayout();
        }
        applied
    }

    fn end_drags(&mut self) {
        let mut surface = self.surface.borrow_mut();
        let header = self.header_drag.cancel(&mut *surface);
        let resize = self.resize_drag.cancel(&mut *surface);
        if header || resize {
            tracing::debug!("drag in progress abandoned");
        }
    }

    /// Hide the tooltip and stop listening to its stream.
    pub fn close(&mut self) {
        self.end_drags();
        if self.state == InteractionState::Closed && self.subscription.is_none() {
            return;
        }
        self.surface.borrow_mut().hide();
        self.subscription = None;
        self.state = InteractionState::Closed;
        self.move_origin = None;
        self.close_press = None;
        self.relayout.cancel();
        tracing::debug!("tooltip closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentSelection, TextPosition};
    use crate::geometry::{Bounds, Viewport};
    use crate::input::{MOUSE_POINTER_ID, PointerButton};
    use crate::stream::SharedBuffer;
    use crate::surface::TerminalSurface;
    use crossterm::event::{KeyModifiers, MouseButton};

    /// Hands out buffers the test can write into directly.
    #[derive(Default)]
    struct ManualTranslator {
        requests: Rc<RefCell<Vec<(String, SharedBuffer)>>>,
    }

    impl Translator for ManualTranslator {
        fn request(&mut self, text: &str) -> SharedBuffer {
            let buffer = StreamBuffer::shared();
            self.requests
                .borrow_mut()
                .push((text.to_string(), buffer.clone()));
            buffer
        }

        fn poll(&mut self) -> usize {
            0
        }
    }

    struct Doc {
        viewport: Viewport,
        selection: Option<DocumentSelection>,
        bounds: Bounds,
    }

    impl HostDocument for Doc {
        fn viewport(&self) -> Viewport {
            self.viewport
        }

        fn selection(&self) -> Option<DocumentSelection> {
            self.selection.clone()
        }

        fn range_bounds(&self, _range: &TextRange) -> Bounds {
            self.bounds
        }
    }

    fn doc(text: &str, bounds: Bounds) -> Doc {
        Doc {
            viewport: Viewport::sized(80, 24),
            selection: Some(DocumentSelection {
                text: text.to_string(),
                range: TextRange::new(TextPosition::new(0, 0), TextPosition::new(0, 5)),
            }),
            bounds,
        }
    }

    type Requests = Rc<RefCell<Vec<(String, SharedBuffer)>>>;

    fn controller() -> (TooltipController<TerminalSurface>, Requests) {
        let translator = ManualTranslator::default();
        let requests = translator.requests.clone();
        let surface =
            OverlaySurface::new(TerminalSurface::new(), "test-tooltip", 30, 10).expect("surface");
        (
            TooltipController::new(surface, Box::new(translator), TriggerModifier::Ctrl),
            requests,
        )
    }

    fn primary_up(x: i32, y: i32) -> PointerEvent {
        PointerEvent::new(MOUSE_POINTER_ID, PointerKind::Up(PointerButton::Primary), x, y)
    }

    fn gesture(x: i32, y: i32) -> PointerEvent {
        primary_up(x, y).with_modifiers(KeyModifiers::CONTROL)
    }

    fn down(x: i32, y: i32) -> PointerEvent {
        PointerEvent::new(MOUSE_POINTER_ID, PointerKind::Down(MouseButton::Left.into()), x, y)
    }

    fn moved(x: i32, y: i32) -> PointerEvent {
        PointerEvent::new(MOUSE_POINTER_ID, PointerKind::Move, x, y)
    }

    #[test]
    fn gesture_requires_modifier_and_text() {
        let (mut c, requests) = controller();
        let d = doc("hello", Bounds::new(2, 3, 7, 4));
        assert!(!c.handle_selection_gesture(&primary_up(5, 3), &d));
        assert!(!c.handle_selection_gesture(&gesture(5, 3), &doc("  \n ", d.bounds)));
        assert!(requests.borrow().is_empty());
        assert_eq!(c.state(), InteractionState::Closed);
    }

    #[test]
    fn opening_anchors_below_selection() {
        let (mut c, requests) = controller();
        let d = doc("  hello  ", Bounds::new(2, 3, 7, 4));
        assert!(c.handle_selection_gesture(&gesture(5, 3), &d));
        assert!(matches!(c.state(), InteractionState::Anchored(_)));
        assert_eq!(requests.borrow()[0].0, "hello");
        let surface = c.surface();
        assert!(surface.is_visible());
        assert_eq!((surface.left(), surface.top()), (2, 3 + 1 + TOOLTIP_SELECTION_GAP));
    }

    #[test]
    fn stream_updates_render_into_overlay() {
        let (mut c, requests) = controller();
        let d = doc("hello", Bounds::new(2, 3, 7, 4));
        c.open_selection(&d);
        let buffer = requests.borrow()[0].1.clone();
        buffer.borrow_mut().append("bon");
        buffer.borrow_mut().append("jour");
        assert_eq!(c.surface().content(), "bonjour");
        buffer.borrow_mut().set_error_message(" [failed]");
        assert_eq!(c.surface().content(), "bonjour [failed]");
    }

    #[test]
    fn selection_over_tooltip_is_ignored() {
        let (mut c, requests) = controller();
        c.open_selection(&doc("hello", Bounds::new(2, 3, 7, 4)));
        let top = c.surface().top();
        let overlapping = doc("again", Bounds::new(4, top, 9, top + 1));
        assert!(!c.handle_selection_gesture(&gesture(4, top), &overlapping));
        assert_eq!(requests.borrow().len(), 1);
    }

    #[test]
    fn new_selection_supersedes_previous_stream() {
        let (mut c, requests) = controller();
        c.open_selection(&doc("first", Bounds::new(2, 3, 7, 4)));
        c.open_selection(&doc("second", Bounds::new(2, 15, 7, 16)));
        let first = requests.borrow()[0].1.clone();
        let second = requests.borrow()[1].1.clone();
        first.borrow_mut().append("stale");
        assert_eq!(c.surface().content(), "");
        assert!(!first.borrow().has_live_observer());
        second.borrow_mut().append("fresh");
        assert_eq!(c.surface().content(), "fresh");
    }

    #[test]
    fn escape_closes_and_detaches() {
        let (mut c, requests) = controller();
        c.open_selection(&doc("hello", Bounds::new(2, 3, 7, 4)));
        let buffer = requests.borrow()[0].1.clone();
        assert!(c.handle_key(&KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)));
        assert_eq!(c.state(), InteractionState::Closed);
        assert!(!c.surface().is_visible());
        buffer.borrow_mut().append("late");
        assert_eq!(c.surface().content(), "");
        assert!(!c.handle_key(&KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)));
    }

    #[test]
    fn outside_press_closes_only_when_anchored() {
        let (mut c, _) = controller();
        let d = doc("hello", Bounds::new(2, 3, 7, 4));
        c.open_selection(&d);
        assert!(!c.handle_pointer(&down(70, 1)));
        assert_eq!(c.state(), InteractionState::Closed);

        c.open_selection(&d);
        let (left, top) = (c.surface().left(), c.surface().top());
        assert!(c.handle_pointer(&down(left + 2, top)));
        assert_eq!(c.state(), InteractionState::Free);
        c.handle_pointer(&primary_up(left + 2, top));
        assert!(!c.handle_pointer(&down(70, 1)));
        assert_eq!(c.state(), InteractionState::Free);
        assert!(c.surface().is_visible());
    }

    #[test]
    fn header_drag_moves_by_pointer_delta_once_per_frame() {
        let (mut c, _) = controller();
        let d = doc("hello", Bounds::new(2, 3, 7, 4));
        c.open_selection(&d);
        let (left, top) = (c.surface().left(), c.surface().top());
        c.handle_pointer(&down(left + 1, top));
        assert!(c.handle_pointer(&moved(left + 3, top + 1)));
        assert!(c.handle_pointer(&moved(left + 6, top + 2)));
        assert_eq!(c.surface().left(), left);
        c.on_frame(&d);
        assert_eq!((c.surface().left(), c.surface().top()), (left + 5, top + 2));
        assert!(c.handle_pointer(&primary_up(left + 6, top + 2)));
        assert_eq!(c.surface().backend().captured(), None);
    }

    #[test]
    fn resize_handle_follows_pointer() {
        let (mut c, _) = controller();
        let d = doc("hello", Bounds::new(2, 3, 7, 4));
        c.open_selection(&d);
        let frame = c.surface().frame();
        let grip = Point::new(frame.right - 1, frame.bottom - 1);
        assert_eq!(c.surface().region_at(grip), Some(Region::ResizeHandle));
        c.handle_pointer(&down(grip.x, grip.y));
        c.handle_pointer(&moved(grip.x + 9, grip.y));
        c.on_frame(&d);
        assert_eq!(c.surface().width(), grip.x + 9 - frame.left + 1);
        assert!(matches!(c.state(), InteractionState::Anchored(_)));
        c.handle_pointer(&moved(frame.left, grip.y));
        c.on_frame(&d);
        assert_eq!(c.surface().width(), c.surface().min_width());
    }

    #[test]
    fn closing_mid_resize_gives_the_pointer_back() {
        let (mut c, _) = controller();
        let d = doc("hello", Bounds::new(2, 3, 7, 4));
        c.open_selection(&d);
        let frame = c.surface().frame();
        c.handle_pointer(&down(frame.right - 1, frame.bottom - 1));
        c.handle_pointer(&moved(frame.right + 4, frame.bottom - 1));
        assert!(!c.surface().backend().text_selection_enabled());

        c.close();
        assert_eq!(c.surface().backend().captured(), None);
        assert!(c.surface().backend().text_selection_enabled());
        c.on_frame(&d);
        assert_eq!(c.surface().width(), frame.right - frame.left);
    }

    #[test]
    fn close_control_needs_press_and_release_on_it() {
        let (mut c, _) = controller();
        let d = doc("hello", Bounds::new(2, 3, 7, 4));
        c.open_selection(&d);
        let close = c.surface().region_bounds(Region::CloseButton);
        let on_close = Point::new(close.left, close.top);

        c.handle_pointer(&down(on_close.x, on_close.y));
        assert!(c.handle_pointer(&primary_up(on_close.x - 6, on_close.y + 1)));
        assert!(c.is_open());

        c.handle_pointer(&down(on_close.x, on_close.y));
        assert!(c.handle_pointer(&primary_up(on_close.x, on_close.y)));
        assert_eq!(c.state(), InteractionState::Closed);
    }

    #[test]
    fn scroll_relayout_runs_on_next_frame() {
        let (mut c, _) = controller();
        let mut d = doc("hello", Bounds::new(2, 3, 7, 4));
        c.open_selection(&d);
        d.bounds = Bounds::new(2, 1, 7, 2);
        c.on_scroll();
        c.on_scroll();
        assert_eq!(c.surface().top(), 3 + 1 + TOOLTIP_SELECTION_GAP);
        c.on_frame(&d);
        assert_eq!(c.surface().top(), 1 + 1 + TOOLTIP_SELECTION_GAP);
    }

    #[test]
    fn free_tooltip_ignores_relayout() {
        let (mut c, _) = controller();
        let mut d = doc("hello", Bounds::new(2, 3, 7, 4));
        c.open_selection(&d);
        let (left, top) = (c.surface().left(), c.surface().top());
        c.handle_pointer(&down(left + 1, top));
        c.handle_pointer(&primary_up(left + 1, top));
        d.bounds = Bounds::new(2, 10, 7, 11);
        c.on_resize();
        c.on_frame(&d);
        assert_eq!((c.surface().left(), c.surface().top()), (left, top));
    }
}
