//! Append-only text buffer that streams a producer's output to one observer.
//!
//! The buffer is written by a producer and read by whoever subscribed last.
//! Notifications are a signal: the observer receives the buffer itself and
//! re-reads whatever state it needs.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

pub trait Observer {
    /// Called synchronously after every mutation of `subject`.
    fn update(&self, subject: &StreamBuffer);
}

pub type SharedBuffer = Rc<RefCell<StreamBuffer>>;

#[derive(Default)]
pub struct StreamBuffer {
    content: String,
    error: Option<String>,
    observer: Option<Weak<dyn Observer>>,
}

impl std::fmt::Debug for StreamBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamBuffer")
            .field("content", &self.content)
            .field("error", &self.error)
            .field("observed", &self.observer.is_some())
            .finish()
    }
}

impl StreamBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedBuffer {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Register `observer`, replacing any previous one.
    ///
    /// The buffer only keeps a weak reference: once the caller drops its
    /// `Rc`, notifications stop without any further call.
    pub fn set_observer(&mut self, observer: &Rc<dyn Observer>) {
        self.observer = Some(Rc::downgrade(observer));
    }

    pub fn clear_observer(&mut self) {
        self.observer = None;
    }

    pub fn has_live_observer(&self) -> bool {
        self.observer
            .as_ref()
            .is_some_and(|observer| observer.strong_count() > 0)
    }

    pub fn append(&mut self, text: &str) {
        self.content.push_str(text);
        self.notify();
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn set_error_message(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
        self.notify();
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Content followed by the error text, which is how the overlay shows a
    /// stream that failed part-way.
    pub fn rendered(&self) -> String {
        match &self.error {
            Some(error) => format!("{}{}", self.content, error),
            None => self.content.clone(),
        }
    }

    fn notify(&self) {
        if let Some(observer) = self.observer.as_ref().and_then(Weak::upgrade) {
            observer.update(self);
        }
    }
}

/// Owning side of an observer registration.
///
/// Holding the handle keeps the observer alive; dropping it (or replacing it
/// with a newer subscription) detaches the observer from the buffer.
pub struct Subscription {
    buffer: SharedBuffer,
    _observer: Rc<dyn Observer>,
}

impl Subscription {
    pub fn attach(buffer: SharedBuffer, observer: Rc<dyn Observer>) -> Self {
        buffer.borrow_mut().set_observer(&observer);
        Self {
            buffer,
            _observer: observer,
        }
    }

    pub fn buffer(&self) -> &SharedBuffer {
        &self.buffer
    }

    pub fn is_for(&self, buffer: &SharedBuffer) -> bool {
        Rc::ptr_eq(&self.buffer, buffer)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("buffer", &self.buffer)
            .finish()
    }
}
