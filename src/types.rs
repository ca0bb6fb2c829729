//! Core types for nera-tui.
//!
//! These types define the foundation that everything builds on.
//! They flow from nodes through the scene into the renderer.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

// =============================================================================
// NodeId
// =============================================================================

/// Process-unique identifier of a node.
///
/// Ids are handed out from a global counter and never reused, so a stale id
/// held by the dependency graph can only ever miss, never alias another node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

impl NodeId {
    /// Allocate a fresh id.
    pub fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

// =============================================================================
// Node Flags (bitflags)
// =============================================================================

bitflags::bitflags! {
    /// Lifecycle flags carried by every node.
    ///
    /// Combine with bitwise OR: `NodeFlags::STATIC | NodeFlags::HIDE_AFTER_RENDER`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeFlags: u8 {
        const NONE = 0;
        /// Excluded from render passes and input.
        const DISABLED = 1 << 0;
        /// Removed from the scene right after its first render.
        const HIDE_AFTER_RENDER = 1 << 1;
        /// Output never changes after the first render; served from the cache.
        const STATIC = 1 << 2;
        /// Output is stale relative to the node's dependencies.
        const DIRTY = 1 << 3;
        /// Rendered at least once.
        const DID_RENDER = 1 << 4;
        /// Readable nodes: a response was consumed for the current activation.
        const DID_PROCESS_RESPONSE = 1 << 5;
    }
}

impl NodeFlags {
    /// Flags of a freshly created node.
    pub const FRESH: Self = Self::DIRTY;
}

// =============================================================================
// Output - What a display node produces
// =============================================================================

/// Text produced by one render of a node.
///
/// `typing` asks the terminal to type the text out character by character on
/// the node's first render. Cached reprints are always written at once.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Output {
    pub text: String,
    pub typing: Option<Duration>,
}

impl Output {
    /// Plain output, written in one go.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            typing: None,
        }
    }

    /// Output typed out with `delay` between characters.
    pub fn typed(text: impl Into<String>, delay: Duration) -> Self {
        Self {
            text: text.into(),
            typing: Some(delay),
        }
    }

    /// Output with no text at all.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl From<String> for Output {
    fn from(text: String) -> Self {
        Self::plain(text)
    }
}

impl From<&str> for Output {
    fn from(text: &str) -> Self {
        Self::plain(text)
    }
}

// =============================================================================
// Prompt - What a readable node asks for
// =============================================================================

/// The question a readable node puts to the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    /// Free-form line of text.
    Line(String),
    /// Pick one of a fixed list of options.
    Select {
        question: String,
        options: Vec<String>,
    },
}

impl Prompt {
    pub fn line(question: impl Into<String>) -> Self {
        Self::Line(question.into())
    }

    pub fn select(question: impl Into<String>, options: Vec<String>) -> Self {
        Self::Select {
            question: question.into(),
            options,
        }
    }

    /// The question text, whichever kind of prompt this is.
    pub fn question(&self) -> &str {
        match self {
            Self::Line(question) => question,
            Self::Select { question, .. } => question,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
