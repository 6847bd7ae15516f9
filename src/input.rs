use crossterm::event::{KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

use crate::geometry::Point;

pub type PointerId = u32;

/// The terminal only ever reports one pointer.
pub const MOUSE_POINTER_ID: PointerId = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

impl From<MouseButton> for PointerButton {
    fn from(button: MouseButton) -> Self {
        match button {
            MouseButton::Left => PointerButton::Primary,
            MouseButton::Right => PointerButton::Secondary,
            MouseButton::Middle => PointerButton::Middle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Down(PointerButton),
    Move,
    Up(PointerButton),
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerEvent {
    pub id: PointerId,
    pub kind: PointerKind,
    pub position: Point,
    pub modifiers: KeyModifiers,
}

impl PointerEvent {
    pub fn new(id: PointerId, kind: PointerKind, x: i32, y: i32) -> Self {
        Self {
            id,
            kind,
            position: Point::new(x, y),
            modifiers: KeyModifiers::NONE,
        }
    }

    pub fn with_modifiers(mut self, modifiers: KeyModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Translate a crossterm mouse event. Wheel events are not pointer
    /// events and yield `None`.
    pub fn from_mouse(mouse: &MouseEvent) -> Option<Self> {
        let kind = match mouse.kind {
            MouseEventKind::Down(button) => PointerKind::Down(button.into()),
            MouseEventKind::Up(button) => PointerKind::Up(button.into()),
            MouseEventKind::Drag(_) | MouseEventKind::Moved => PointerKind::Move,
            _ => return None,
        };
        Some(
            PointerEvent::new(
                MOUSE_POINTER_ID,
                kind,
                mouse.column as i32,
                mouse.row as i32,
            )
            .with_modifiers(mouse.modifiers),
        )
    }

    pub fn is_primary_down(&self) -> bool {
        self.kind == PointerKind::Down(PointerButton::Primary)
    }

    pub fn is_primary_up(&self) -> bool {
        self.kind == PointerKind::Up(PointerButton::Primary)
    }

    pub fn ends_session(&self) -> bool {
        matches!(self.kind, PointerKind::Up(_) | PointerKind::Cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mouse(kind: MouseEventKind) -> MouseEvent {
        MouseEvent {
            kind,
            column: 4,
            row: 7,
            modifiers: KeyModifiers::CONTROL,
        }
    }

    #[test]
    fn maps_press_drag_release() {
        let down = PointerEvent::from_mouse(&mouse(MouseEventKind::Down(MouseButton::Left)))
            .expect("down maps");
        assert!(down.is_primary_down());
        assert_eq!(down.position, Point::new(4, 7));
        assert!(down.modifiers.contains(KeyModifiers::CONTROL));

        let drag = PointerEvent::from_mouse(&mouse(MouseEventKind::Drag(MouseButton::Left)))
            .expect("drag maps");
        assert_eq!(drag.kind, PointerKind::Move);

        let up = PointerEvent::from_mouse(&mouse(MouseEventKind::Up(MouseButton::Left)))
            .expect("up maps");
        assert!(up.is_primary_up());
        assert!(up.ends_session());
    }

    #[test]
    fn wheel_is_not_a_pointer_event() {
        assert!(PointerEvent::from_mouse(&mouse(MouseEventKind::ScrollDown)).is_none());
    }

    #[test]
    fn secondary_button_is_not_primary() {
        let down = PointerEvent::from_mouse(&mouse(MouseEventKind::Down(MouseButton::Right)))
            .expect("down maps");
        assert!(!down.is_primary_down());
    }
}
