use std::io;
use std::time::Duration;

use crossterm::event::Event;

use crate::drivers::InputDriver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFlow {
    Continue,
    Quit,
}

/// The single loop that drives the UI thread.
///
/// It is the only place that polls the input driver. Every iteration first
/// calls the handler with `None`, which is the frame tick: pump translation
/// streams, flush coalesced drag and layout work, draw. Then it drains every
/// queued input event, so a burst of mouse moves is handled in one go and the
/// next frame only sees the latest position.
///
/// Translation requests run on their own threads; they never touch UI state
/// directly and are picked up during the frame tick.
pub struct EventLoop<D> {
    driver: D,
    poll_interval: Duration,
}

impl<D: InputDriver> EventLoop<D> {
    pub fn new(driver: D, poll_interval: Duration) -> Self {
        Self {
            driver,
            poll_interval,
        }
    }

    pub fn poll(&mut self) -> io::Result<Option<Event>> {
        if self.driver.poll(self.poll_interval)? {
            Ok(Some(self.driver.read()?))
        } else {
            Ok(None)
        }
    }

    pub fn driver(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Run until the handler asks to quit.
    ///
    /// The handler receives `Some(event)` for input and `None` once per frame.
    pub fn run<F>(&mut self, mut handler: F) -> io::Result<()>
    where
        F: FnMut(&mut D, Option<Event>) -> io::Result<ControlFlow>,
    {
        loop {
            if let ControlFlow::Quit = handler(&mut self.driver, None)? {
                break;
            }

            if self.driver.poll(self.poll_interval)? {
                loop {
                    let event = self.driver.read()?;
                    if let ControlFlow::Quit = handler(&mut self.driver, Some(event))? {
                        return Ok(());
                    }
                    if !self.driver.poll(Duration::from_millis(0))? {
                        break;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::ScriptedInputDriver;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn key(c: char) -> Event {
        Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
    }

    #[test]
    fn drains_burst_between_frames() {
        let driver = ScriptedInputDriver::new([key('a'), key('b'), key('q')]);
        let mut event_loop = EventLoop::new(driver, Duration::ZERO);
        let mut seen = Vec::new();
        event_loop
            .run(|_, event| {
                seen.push(match &event {
                    None => "frame".to_string(),
                    Some(Event::Key(k)) => format!("{:?}", k.code),
                    Some(_) => "other".to_string(),
                });
                Ok(match event {
                    Some(Event::Key(k)) if k.code == KeyCode::Char('q') => ControlFlow::Quit,
                    _ => ControlFlow::Continue,
                })
            })
            .expect("runs");
        assert_eq!(seen, vec!["frame", "Char('a')", "Char('b')", "Char('q')"]);
    }

    #[test]
    fn frame_tick_can_quit() {
        let driver = ScriptedInputDriver::new([key('a')]);
        let mut event_loop = EventLoop::new(driver, Duration::ZERO);
        let mut frames = 0;
        event_loop
            .run(|_, event| {
                assert!(event.is_none());
                frames += 1;
                Ok(ControlFlow::Quit)
            })
            .expect("runs");
        assert_eq!(frames, 1);
        assert_eq!(event_loop.driver().remaining(), 1);
    }
}
