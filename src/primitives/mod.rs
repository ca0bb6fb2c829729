//! Primitives - Ready-made nodes.
//!
//! - [`text`] - fixed, typed and computed text
//! - [`input`] - questions and selections
//!
//! Constructors return a [`Node`](crate::engine::Node) (display nodes) or a
//! builder that converts into one (readable nodes):
//!
//! ```ignore
//! let nodes = vec![
//!     text("Boot sequence"),
//!     question("Where is your pak folder?").store_as("pak_dir").into(),
//! ];
//! ```

pub mod input;
pub mod text;

pub use input::{Question, Selection, question, selection};
pub use text::{Computed, Text, TypedBlock, TypedText, computed, text, typed_block, typed_text};
