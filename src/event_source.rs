//! Input event abstraction
//!
//! Sessions are driven through this trait so tests can replay a scripted
//! event list instead of a live terminal.

use anyhow::Result;
pub use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEventKind};
use crossterm::event::MouseEvent;
use std::time::Duration;

pub trait EventSource {
    /// Poll for events with a timeout.
    fn poll(&mut self, timeout: Duration) -> Result<bool>;

    /// Read the next event.
    fn read(&mut self) -> Result<Event>;
}

/// Live terminal events via crossterm.
pub struct TerminalEventSource;

impl EventSource for TerminalEventSource {
    fn poll(&mut self, timeout: Duration) -> Result<bool> {
        Ok(crossterm::event::poll(timeout)?)
    }

    fn read(&mut self) -> Result<Event> {
        Ok(crossterm::event::read()?)
    }
}

/// Replays a fixed event list, then reports quit.
pub struct ScriptedEventSource {
    events: Vec<Event>,
    current_index: usize,
}

impl ScriptedEventSource {
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            events,
            current_index: 0,
        }
    }

    pub fn key(code: KeyCode) -> Event {
        Self::key_with(code, KeyModifiers::empty())
    }

    pub fn key_with(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent::new(code, modifiers))
    }

    pub fn char_key(c: char) -> Event {
        Self::key(KeyCode::Char(c))
    }

    pub fn shift_enter() -> Event {
        Self::key_with(KeyCode::Enter, KeyModifiers::SHIFT)
    }

    pub fn mouse(kind: MouseEventKind, column: u16, row: u16) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::empty(),
        })
    }

    /// Type a whole string as individual key presses.
    pub fn typed(text: &str) -> Vec<Event> {
        text.chars().map(Self::char_key).collect()
    }
}

impl EventSource for ScriptedEventSource {
    fn poll(&mut self, _timeout: Duration) -> Result<bool> {
        Ok(self.current_index < self.events.len())
    }

    fn read(&mut self) -> Result<Event> {
        if self.current_index < self.events.len() {
            let event = self.events[self.current_index].clone();
            self.current_index += 1;
            Ok(event)
        } else {
            // Exhausted scripts quit rather than hang the loop.
            Ok(Self::char_key('q'))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_source_replays_in_order() {
        let mut source = ScriptedEventSource::new(vec![
            ScriptedEventSource::char_key('a'),
            ScriptedEventSource::key(KeyCode::Enter),
        ]);

        assert!(source.poll(Duration::from_millis(0)).unwrap());
        let Event::Key(first) = source.read().unwrap() else {
            panic!("expected key event");
        };
        assert_eq!(first.code, KeyCode::Char('a'));

        source.read().unwrap();
        assert!(!source.poll(Duration::from_millis(0)).unwrap());

        // Past the end it synthesizes a quit key.
        let Event::Key(quit) = source.read().unwrap() else {
            panic!("expected key event");
        };
        assert_eq!(quit.code, KeyCode::Char('q'));
    }

    #[test]
    fn typed_expands_to_key_presses() {
        let events = ScriptedEventSource::typed("ok");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], ScriptedEventSource::char_key('o'));
    }
}
