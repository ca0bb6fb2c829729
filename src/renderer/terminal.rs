//! Terminal - The render target and prompt reader.
//!
//! [`Terminal`] is the seam between the engine and a real screen:
//!
//! - [`CrosstermTerminal`] - raw-mode terminal, prompts assembled from the
//!   input-capture channel
//! - [`MemoryTerminal`] - headless screen with scripted responses and keys,
//!   used by tests and by anything that drives an engine programmatically
//!
//! Output is line oriented. Every pass clears the screen and writes each
//! node's output as its own block of lines.

use std::collections::VecDeque;
use std::io::{self, IsTerminal, Stdout, Write};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use crossterm::cursor::{MoveTo, MoveToPreviousLine, Show};
use crossterm::event;
use crossterm::style::Print;
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::queue;
use parking_lot::Mutex;
use tracing::debug;

use crate::state::input::convert_event;
use crate::state::{InputCapture, InputEvent, KeyboardEvent};

// =============================================================================
// TRAIT
// =============================================================================

pub trait Terminal: Send {
    /// Wipe the screen before a pass.
    fn clear(&mut self) -> io::Result<()>;

    fn write(&mut self, text: &str) -> io::Result<()>;

    fn write_line(&mut self, text: &str) -> io::Result<()> {
        self.write(text)?;
        self.write("\n")
    }

    /// Write `text` one character at a time, pausing `delay` after each.
    fn type_out(&mut self, text: &str, delay: Duration) -> io::Result<()> {
        let mut buf = [0u8; 4];
        for c in text.chars() {
            self.write(c.encode_utf8(&mut buf))?;
            self.flush()?;
            thread::sleep(delay);
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Prompt for a line of text. Blocks until it is submitted.
    ///
    /// Ctrl+C fails with [`io::ErrorKind::Interrupted`].
    fn read_line(&mut self, prompt: &str) -> io::Result<String>;

    /// Prompt for one of `options`. Blocks until one is chosen.
    fn select(&mut self, prompt: &str, options: &[String]) -> io::Result<String>;

    /// Block for the next key press.
    fn read_key(&mut self) -> io::Result<KeyboardEvent>;

    /// Next pending key press, if one is waiting.
    fn try_read_key(&mut self) -> io::Result<Option<KeyboardEvent>>;

    /// Start a background input-capture thread feeding this terminal, if
    /// the terminal reads from a real device.
    fn spawn_input(&mut self) -> io::Result<Option<InputCapture>> {
        Ok(None)
    }

    /// Put the device back the way it was found.
    fn restore(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn interrupted() -> io::Error {
    io::Error::new(io::ErrorKind::Interrupted, "interrupted by ctrl+c")
}

fn input_closed() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, "terminal input closed")
}

// =============================================================================
// CROSSTERM
// =============================================================================

/// Raw-mode terminal on stdout.
///
/// Until [`spawn_input`](Terminal::spawn_input) hands the channel to a
/// capture thread, keys are read inline from crossterm.
pub struct CrosstermTerminal {
    out: Stdout,
    events: Receiver<InputEvent>,
    sender: Option<Sender<InputEvent>>,
    is_raw: bool,
}

impl CrosstermTerminal {
    pub fn new() -> io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let mut term = Self {
            out: io::stdout(),
            events: rx,
            sender: Some(tx),
            is_raw: false,
        };
        term.enable_raw_mode()?;
        Ok(term)
    }

    fn enable_raw_mode(&mut self) -> io::Result<()> {
        // Piped input (tests, CI): render anyway, just without raw keys
        if !io::stdin().is_terminal() {
            debug!("stdin is not a tty, raw mode skipped");
            return Ok(());
        }
        terminal::enable_raw_mode()?;
        self.is_raw = true;
        Ok(())
    }

    fn next_event(&mut self) -> io::Result<InputEvent> {
        if self.sender.is_none() {
            return self.events.recv().map_err(|_| input_closed());
        }
        loop {
            if let Some(event) = convert_event(event::read()?) {
                return Ok(event);
            }
        }
    }

    fn draw_options(&mut self, options: &[String], selected: usize) -> io::Result<()> {
        for (i, option) in options.iter().enumerate() {
            let marker = if i == selected { "> " } else { "  " };
            self.write_line(&format!("{marker}{option}"))?;
        }
        self.flush()
    }
}

impl Terminal for CrosstermTerminal {
    fn clear(&mut self) -> io::Result<()> {
        queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))
    }

    fn write(&mut self, text: &str) -> io::Result<()> {
        if self.is_raw {
            queue!(self.out, Print(text.replace('\n', "\r\n")))
        } else {
            queue!(self.out, Print(text))
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        self.write(prompt)?;
        self.write(" ")?;
        self.flush()?;

        let mut line = String::new();
        loop {
            let key = self.read_key()?;
            if key.is_interrupt() {
                return Err(interrupted());
            }
            match key.key.as_str() {
                "Enter" => break,
                "Backspace" => {
                    if line.pop().is_some() {
                        self.write("\x08 \x08")?;
                    }
                }
                _ => {
                    if let Some(c) = key.as_char() {
                        line.push(c);
                        self.write(&key.key)?;
                    }
                }
            }
            self.flush()?;
        }
        self.write("\n")?;
        self.flush()?;
        Ok(line)
    }

    fn select(&mut self, prompt: &str, options: &[String]) -> io::Result<String> {
        if options.is_empty() {
            return self.read_line(prompt);
        }
        self.write_line(prompt)?;
        let mut selected = 0;
        self.draw_options(options, selected)?;

        loop {
            let key = self.read_key()?;
            if key.is_interrupt() {
                return Err(interrupted());
            }
            match key.key.as_str() {
                "ArrowUp" | "k" => {
                    selected = selected.checked_sub(1).unwrap_or(options.len() - 1);
                }
                "ArrowDown" | "j" | "Tab" => selected = (selected + 1) % options.len(),
                "Enter" => return Ok(options[selected].clone()),
                _ => continue,
            }
            let lines = u16::try_from(options.len()).unwrap_or(u16::MAX);
            queue!(self.out, MoveToPreviousLine(lines), Clear(ClearType::FromCursorDown))?;
            self.draw_options(options, selected)?;
        }
    }

    fn read_key(&mut self) -> io::Result<KeyboardEvent> {
        loop {
            match self.next_event()? {
                InputEvent::Key(key) if key.is_press() => return Ok(key),
                InputEvent::Key(_) | InputEvent::Resize(..) => continue,
                InputEvent::Closed => return Err(input_closed()),
            }
        }
    }

    fn try_read_key(&mut self) -> io::Result<Option<KeyboardEvent>> {
        loop {
            let event = if self.sender.is_some() {
                if !event::poll(Duration::ZERO)? {
                    return Ok(None);
                }
                match convert_event(event::read()?) {
                    Some(event) => event,
                    None => continue,
                }
            } else {
                match self.events.try_recv() {
                    Ok(event) => event,
                    Err(TryRecvError::Empty) => return Ok(None),
                    Err(TryRecvError::Disconnected) => return Err(input_closed()),
                }
            };
            match event {
                InputEvent::Key(key) if key.is_press() => return Ok(Some(key)),
                InputEvent::Key(_) | InputEvent::Resize(..) => continue,
                InputEvent::Closed => return Err(input_closed()),
            }
        }
    }

    fn spawn_input(&mut self) -> io::Result<Option<InputCapture>> {
        match self.sender.take() {
            Some(tx) => InputCapture::spawn(tx).map(Some),
            None => Ok(None),
        }
    }

    fn restore(&mut self) -> io::Result<()> {
        queue!(self.out, Show)?;
        self.out.flush()?;
        if self.is_raw {
            terminal::disable_raw_mode()?;
            self.is_raw = false;
        }
        Ok(())
    }
}

impl Drop for CrosstermTerminal {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

// =============================================================================
// MEMORY
// =============================================================================

#[derive(Debug, Default)]
struct MemoryScreen {
    screen: String,
    history: Vec<String>,
    transcript: String,
    typed: Vec<String>,
    prompts: Vec<String>,
    responses: VecDeque<String>,
    keys: VecDeque<KeyboardEvent>,
    clears: usize,
}

impl MemoryScreen {
    fn write(&mut self, text: &str) {
        self.screen.push_str(text);
        self.transcript.push_str(text);
    }

    fn next_response(&mut self, prompt: &str) -> io::Result<String> {
        self.prompts.push(prompt.to_string());
        let response = self.responses.pop_front().ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted response left")
        })?;
        self.write(&response);
        self.write("\n");
        Ok(response)
    }
}

/// Headless terminal.
///
/// Clones share one screen, so a test can keep a handle while an engine
/// owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryTerminal {
    inner: Arc<Mutex<MemoryScreen>>,
}

impl MemoryTerminal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue prompt responses, answered in order.
    pub fn with_responses<S: Into<String>>(self, responses: impl IntoIterator<Item = S>) -> Self {
        for response in responses {
            self.push_response(response);
        }
        self
    }

    pub fn push_response(&self, response: impl Into<String>) {
        self.inner.lock().responses.push_back(response.into());
    }

    pub fn push_key(&self, key: KeyboardEvent) {
        self.inner.lock().keys.push_back(key);
    }

    /// What is on screen since the last clear.
    pub fn screen(&self) -> String {
        self.inner.lock().screen.clone()
    }

    /// Screens left by earlier passes, oldest first. Empty screens are skipped.
    pub fn history(&self) -> Vec<String> {
        self.inner.lock().history.clone()
    }

    /// Everything ever written, clears included.
    pub fn transcript(&self) -> String {
        self.inner.lock().transcript.clone()
    }

    /// Texts passed to `type_out`.
    pub fn typed(&self) -> Vec<String> {
        self.inner.lock().typed.clone()
    }

    /// Prompts shown, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.inner.lock().prompts.clone()
    }

    pub fn clears(&self) -> usize {
        self.inner.lock().clears
    }

    pub fn pending_responses(&self) -> usize {
        self.inner.lock().responses.len()
    }
}

impl Terminal for MemoryTerminal {
    fn clear(&mut self) -> io::Result<()> {
        let mut inner = self.inner.lock();
        let screen = std::mem::take(&mut inner.screen);
        if !screen.is_empty() {
            inner.history.push(screen);
        }
        inner.clears += 1;
        Ok(())
    }

    fn write(&mut self, text: &str) -> io::Result<()> {
        self.inner.lock().write(text);
        Ok(())
    }

    fn type_out(&mut self, text: &str, _delay: Duration) -> io::Result<()> {
        let mut inner = self.inner.lock();
        inner.typed.push(text.to_string());
        inner.write(text);
        Ok(())
    }

    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        let mut inner = self.inner.lock();
        inner.write(prompt);
        inner.write(" ");
        inner.next_response(prompt)
    }

    fn select(&mut self, prompt: &str, options: &[String]) -> io::Result<String> {
        let mut inner = self.inner.lock();
        inner.write(prompt);
        inner.write(&format!(" [{}] ", options.join("/")));
        inner.next_response(prompt)
    }

    fn read_key(&mut self) -> io::Result<KeyboardEvent> {
        self.inner.lock().keys.pop_front().ok_or_else(input_closed)
    }

    fn try_read_key(&mut self) -> io::Result<Option<KeyboardEvent>> {
        Ok(self.inner.lock().keys.pop_front())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_screen_and_history() {
        let mut term = MemoryTerminal::new();
        let handle = term.clone();

        term.clear().unwrap();
        term.write_line("first").unwrap();
        term.clear().unwrap();
        term.write_line("second").unwrap();

        assert_eq!(handle.screen(), "second\n");
        assert_eq!(handle.history(), vec!["first\n".to_string()]);
        assert_eq!(handle.clears(), 2);
        assert_eq!(handle.transcript(), "first\nsecond\n");
    }

    #[test]
    fn test_scripted_responses() {
        let mut term = MemoryTerminal::new().with_responses(["Ada", "Blue"]);
        assert_eq!(term.read_line("Name?").unwrap(), "Ada");
        let options = vec!["Red".to_string(), "Blue".to_string()];
        assert_eq!(term.select("Color?", &options).unwrap(), "Blue");
        assert_eq!(term.prompts(), vec!["Name?".to_string(), "Color?".to_string()]);

        let err = term.read_line("More?").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_type_out_is_recorded() {
        let mut term = MemoryTerminal::new();
        term.type_out("hello", Duration::from_millis(50)).unwrap();
        assert_eq!(term.typed(), vec!["hello".to_string()]);
        assert_eq!(term.screen(), "hello");
    }

    #[test]
    fn test_keys() {
        let mut term = MemoryTerminal::new();
        assert_eq!(term.try_read_key().unwrap(), None);
        term.push_key(KeyboardEvent::new("x"));
        assert_eq!(term.try_read_key().unwrap(), Some(KeyboardEvent::new("x")));
        assert!(term.read_key().is_err());
    }
}
