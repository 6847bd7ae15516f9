use crate::geometry::Point;
use crate::input::{PointerEvent, PointerId, PointerKind};
use crate::surface::Region;
use crate::throttle::FrameThrottle;

/// Capability the tracker needs from whatever owns the regions.
pub trait PointerCapture {
    fn set_pointer_capture(&mut self, region: Region, pointer: PointerId);
    fn release_pointer_capture(&mut self, region: Region, pointer: PointerId);
    fn set_text_selection_enabled(&mut self, enabled: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragSession {
    pub pointer: PointerId,
    pub origin: Point,
}

/// Click-vs-drag recognition bound to one overlay region. While a session is
/// live the pointer is captured and host text selection is off.
#[derive(Debug, Clone)]
pub struct DragTracker {
    region: Region,
    session: Option<DragSession>,
    tick: FrameThrottle<PointerEvent>,
}

impl DragTracker {
    pub fn new(region: Region) -> Self {
        Self {
            region,
            session: None,
            tick: FrameThrottle::new(),
        }
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn session(&self) -> Option<DragSession> {
        self.session
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn captures(&self, pointer: PointerId) -> bool {
        self.session.is_some_and(|session| session.pointer == pointer)
    }

    /// Start a session for a primary press on this tracker's region.
    ///
    /// Returns `true` when the press was accepted; the caller runs its
    /// on-press reaction right away. Presses from a second pointer while a
    /// session is live are ignored.
    pub fn press(&mut self, event: &PointerEvent, capture: &mut dyn PointerCapture) -> bool {
        if !event.is_primary_down() || self.session.is_some() {
            return false;
        }
        capture.set_pointer_capture(self.region, event.id);
        capture.set_text_selection_enabled(false);
        self.session = Some(DragSession {
            pointer: event.id,
            origin: event.position,
        });
        true
    }

    /// Queue a move from the captured pointer for the next frame.
    pub fn moved(&mut self, event: &PointerEvent) -> bool {
        if event.kind != PointerKind::Move || !self.captures(event.id) {
            return false;
        }
        self.tick.schedule(*event);
        true
    }

    /// The most recent move since the last frame, if any.
    pub fn take_tick(&mut self) -> Option<PointerEvent> {
        self.tick.take()
    }

    /// End the session on release or cancel of the captured pointer.
    pub fn release(&mut self, event: &PointerEvent, capture: &mut dyn PointerCapture) -> bool {
        if !event.ends_session() || !self.captures(event.id) {
            return false;
        }
        capture.release_pointer_capture(self.region, event.id);
        capture.set_text_selection_enabled(true);
        self.session = None;
        self.tick.cancel();
        true
    }

    /// Abandon a live session without waiting for its pointer to come up.
    pub fn cancel(&mut self, capture: &mut dyn PointerCapture) -> bool {
        let Some(session) = self.session.take() else {
            return false;
        };
        capture.release_pointer_capture(self.region, session.pointer);
        capture.set_text_selection_enabled(true);
        self.tick.cancel();
        true
    }
}
