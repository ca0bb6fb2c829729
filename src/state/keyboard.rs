//! Keyboard Module - Key event types
//!
//! Engine-level representation of a key press, independent of the terminal
//! backend. The crossterm conversion lives in [`input`](super::input).
//!
//! Keys are named the way the rest of the engine matches them:
//! printable characters as themselves (`"a"`, `" "`), everything else by name
//! (`"Enter"`, `"Backspace"`, `"ArrowUp"`, `"Escape"`, `"Tab"`, `"F5"`).

// =============================================================================
// TYPES
// =============================================================================

/// Keyboard modifier state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
}

impl Modifiers {
    /// Create empty modifiers
    pub fn none() -> Self {
        Self::default()
    }

    /// Create modifiers with ctrl
    pub fn ctrl() -> Self {
        Self { ctrl: true, ..Self::default() }
    }

    /// Create modifiers with alt
    pub fn alt() -> Self {
        Self { alt: true, ..Self::default() }
    }

    /// Create modifiers with shift
    pub fn shift() -> Self {
        Self { shift: true, ..Self::default() }
    }
}

/// Key event state (press, repeat, release)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KeyState {
    #[default]
    Press,
    Repeat,
    Release,
}

/// Keyboard event
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyboardEvent {
    /// The key that was pressed (e.g., "a", "Enter", "ArrowUp")
    pub key: String,
    /// Modifier keys state
    pub modifiers: Modifiers,
    /// Press/repeat/release state
    pub state: KeyState,
}

impl KeyboardEvent {
    /// Create a simple key press event
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            modifiers: Modifiers::default(),
            state: KeyState::Press,
        }
    }

    /// Create a key press with modifiers
    pub fn with_modifiers(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            modifiers,
            state: KeyState::Press,
        }
    }

    /// Check if this is a press event
    pub fn is_press(&self) -> bool {
        self.state == KeyState::Press
    }

    /// Ctrl+C, the global quit shortcut.
    pub fn is_interrupt(&self) -> bool {
        self.modifiers.ctrl && self.key == "c"
    }

    /// The printable character carried by this event, if it is one.
    pub fn as_char(&self) -> Option<char> {
        if self.modifiers.ctrl || self.modifiers.alt {
            return None;
        }
        let mut chars = self.key.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c),
            _ => None,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt() {
        assert!(KeyboardEvent::with_modifiers("c", Modifiers::ctrl()).is_interrupt());
        assert!(!KeyboardEvent::new("c").is_interrupt());
    }

    #[test]
    fn test_as_char() {
        assert_eq!(KeyboardEvent::new("a").as_char(), Some('a'));
        assert_eq!(KeyboardEvent::new("é").as_char(), Some('é'));
        assert_eq!(KeyboardEvent::new("Enter").as_char(), None);
        assert_eq!(KeyboardEvent::with_modifiers("a", Modifiers::ctrl()).as_char(), None);
        assert_eq!(KeyboardEvent::with_modifiers("A", Modifiers::shift()).as_char(), Some('A'));
    }

    #[test]
    fn test_default_state_is_press() {
        assert!(KeyboardEvent::new("x").is_press());
    }
}
