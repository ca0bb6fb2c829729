//! Input Module - Event conversion and the input-capture thread
//!
//! Bridges crossterm's event system with the engine:
//!
//! - `convert_key_event` - Convert crossterm KeyEvent to our KeyboardEvent
//! - `InputCapture` - Dedicated thread that polls the terminal and forwards
//!   events through a channel to the render thread
//!
//! The capture thread is the only place that reads from the terminal. The
//! render thread consumes its channel, either draining keys between passes
//! or blocking on it while a prompt is live.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::mpsc;
//! use nera_tui::state::InputCapture;
//!
//! let (tx, rx) = mpsc::channel();
//! let mut capture = InputCapture::spawn(tx)?;
//! while let Ok(event) = rx.recv() {
//!     println!("{event:?}");
//! }
//! capture.stop();
//! ```

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{
    Event as CrosstermEvent, KeyCode, KeyEvent as CrosstermKeyEvent, KeyEventKind,
    KeyModifiers, poll, read,
};
use tracing::{debug, warn};

use super::keyboard::{KeyState, KeyboardEvent, Modifiers};

/// How long one poll waits before re-checking the running flag.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

// =============================================================================
// INPUT EVENT ENUM
// =============================================================================

/// Events forwarded from the capture thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// Keyboard event (key press, release, etc.)
    Key(KeyboardEvent),
    /// Terminal resize event (new width, height)
    Resize(u16, u16),
    /// The terminal stopped producing input.
    Closed,
}

// =============================================================================
// KEY EVENT CONVERSION
// =============================================================================

/// Convert crossterm KeyEvent to our KeyboardEvent
pub fn convert_key_event(event: CrosstermKeyEvent) -> KeyboardEvent {
    let key = match event.code {
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::BackTab => "Tab".to_string(),
        KeyCode::Backspace => "Backspace".to_string(),
        KeyCode::Delete => "Delete".to_string(),
        KeyCode::Esc => "Escape".to_string(),
        KeyCode::Up => "ArrowUp".to_string(),
        KeyCode::Down => "ArrowDown".to_string(),
        KeyCode::Left => "ArrowLeft".to_string(),
        KeyCode::Right => "ArrowRight".to_string(),
        KeyCode::Home => "Home".to_string(),
        KeyCode::End => "End".to_string(),
        KeyCode::PageUp => "PageUp".to_string(),
        KeyCode::PageDown => "PageDown".to_string(),
        KeyCode::F(n) => format!("F{}", n),
        KeyCode::Insert => "Insert".to_string(),
        _ => String::new(),
    };

    let state = match event.kind {
        KeyEventKind::Press => KeyState::Press,
        KeyEventKind::Repeat => KeyState::Repeat,
        KeyEventKind::Release => KeyState::Release,
    };

    let mut modifiers = convert_modifiers(event.modifiers);
    if event.code == KeyCode::BackTab {
        modifiers.shift = true;
    }

    KeyboardEvent {
        key,
        modifiers,
        state,
    }
}

/// Convert crossterm KeyModifiers to our Modifiers
fn convert_modifiers(mods: KeyModifiers) -> Modifiers {
    Modifiers {
        ctrl: mods.contains(KeyModifiers::CONTROL),
        alt: mods.contains(KeyModifiers::ALT),
        shift: mods.contains(KeyModifiers::SHIFT),
    }
}

/// Convert a raw crossterm event. Mouse, focus and paste events are dropped.
pub fn convert_event(event: CrosstermEvent) -> Option<InputEvent> {
    match event {
        CrosstermEvent::Key(key) => {
            let key = convert_key_event(key);
            (!key.key.is_empty()).then_some(InputEvent::Key(key))
        }
        CrosstermEvent::Resize(w, h) => Some(InputEvent::Resize(w, h)),
        _ => None,
    }
}

// =============================================================================
// CAPTURE THREAD
// =============================================================================

/// Dedicated input-capture thread.
///
/// Polls the terminal with a short timeout so the running flag is honored
/// without waiting for a keystroke.
pub struct InputCapture {
    handle: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
}

impl InputCapture {
    /// Spawn the capture thread, sending events to `tx`.
    pub fn spawn(tx: Sender<InputEvent>) -> io::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        let handle = thread::Builder::new()
            .name("nera-input".to_string())
            .spawn(move || {
                Self::capture_loop(running_clone, tx);
            })?;

        Ok(Self {
            handle: Some(handle),
            running,
        })
    }

    fn capture_loop(running: Arc<AtomicBool>, tx: Sender<InputEvent>) {
        while running.load(Ordering::SeqCst) {
            let ready = match poll(POLL_INTERVAL) {
                Ok(ready) => ready,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(error = %e, "input poll failed");
                    let _ = tx.send(InputEvent::Closed);
                    break;
                }
            };
            if !ready {
                continue;
            }

            match read() {
                Ok(event) => {
                    let Some(event) = convert_event(event) else {
                        continue;
                    };
                    if tx.send(event).is_err() {
                        break; // Render side is gone
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(error = %e, "input read failed");
                    let _ = tx.send(InputEvent::Closed);
                    break;
                }
            }
        }
        debug!("input capture stopped");
    }

    /// Stop the capture thread and wait for it to exit.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for InputCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_char() {
        let event = CrosstermKeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE);
        let converted = convert_key_event(event);
        assert_eq!(converted.key, "a");
        assert!(converted.is_press());
        assert_eq!(converted.modifiers, Modifiers::none());
    }

    #[test]
    fn test_convert_ctrl_c() {
        let event = CrosstermKeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(convert_key_event(event).is_interrupt());
    }

    #[test]
    fn test_convert_named_keys() {
        let enter = CrosstermKeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        assert_eq!(convert_key_event(enter).key, "Enter");
        let up = CrosstermKeyEvent::new(KeyCode::Up, KeyModifiers::NONE);
        assert_eq!(convert_key_event(up).key, "ArrowUp");
        let f5 = CrosstermKeyEvent::new(KeyCode::F(5), KeyModifiers::NONE);
        assert_eq!(convert_key_event(f5).key, "F5");
    }

    #[test]
    fn test_back_tab_is_shift_tab() {
        let event = CrosstermKeyEvent::new(KeyCode::BackTab, KeyModifiers::NONE);
        let converted = convert_key_event(event);
        assert_eq!(converted.key, "Tab");
        assert!(converted.modifiers.shift);
    }

    #[test]
    fn test_convert_event_filters() {
        assert_eq!(
            convert_event(CrosstermEvent::Resize(80, 24)),
            Some(InputEvent::Resize(80, 24))
        );
        assert_eq!(convert_event(CrosstermEvent::FocusGained), None);
        let unknown = CrosstermKeyEvent::new(KeyCode::CapsLock, KeyModifiers::NONE);
        assert_eq!(convert_event(CrosstermEvent::Key(unknown)), None);
    }
}
