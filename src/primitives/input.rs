//! Input Primitives - Readable nodes that prompt for a response.
//!
//! - [`Question`] - free-form line, optionally validated and stored in the context
//! - [`Selection`] - one of a fixed set of options, each bound to a handler
//!
//! Both take focus in scene order. A [`Question`] disables itself once it
//! accepts an answer, which hands focus to the next readable node. A
//! [`Selection`] leaves that to its handlers: call `cx.disable()` to move
//! on, or `cx.retry()` to ask again.
//!
//! # Example
//!
//! ```ignore
//! use nera_tui::primitives::{question, selection};
//!
//! let name = question("What's your name?").store_as("name");
//! let menu = selection("Where to?")
//!     .option("Home", |cx| cx.transition("home"))
//!     .option("Quit", |cx| cx.quit());
//! let nodes = vec![name.into(), menu.into()];
//! ```

use crate::engine::{Lifecycle, Node, NodeCtx, OptionTable, Readable};
use crate::types::Prompt;

pub type Validator = Box<dyn Fn(&str) -> Result<(), String> + Send>;
pub type AnswerFn = Box<dyn FnMut(&mut NodeCtx<'_>, &str) + Send>;

// =============================================================================
// Question
// =============================================================================

pub struct Question {
    question: String,
    store_as: Option<String>,
    validator: Option<Validator>,
    on_answer: Option<AnswerFn>,
    error: Option<String>,
    deferred: &'static [&'static str],
}

impl Question {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            store_as: None,
            validator: None,
            on_answer: None,
            error: None,
            deferred: &[],
        }
    }

    /// Store the accepted answer in the context under `key`.
    pub fn store_as(mut self, key: impl Into<String>) -> Self {
        self.store_as = Some(key.into());
        self
    }

    /// Reject answers for which `validator` returns an error. The error is
    /// shown above the question when it is asked again.
    pub fn validate(
        mut self,
        validator: impl Fn(&str) -> Result<(), String> + Send + 'static,
    ) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    /// Run `handler` with every accepted answer, after it was stored.
    pub fn on_answer(
        mut self,
        handler: impl FnMut(&mut NodeCtx<'_>, &str) + Send + 'static,
    ) -> Self {
        self.on_answer = Some(Box::new(handler));
        self
    }

    pub fn defer_until(mut self, keys: &'static [&'static str]) -> Self {
        self.deferred = keys;
        self
    }
}

impl Lifecycle for Question {
    fn deferred_until(&self) -> &[&'static str] {
        self.deferred
    }
}

impl Readable for Question {
    fn prompt(&mut self, _cx: &mut NodeCtx<'_>) -> Prompt {
        match self.error.take() {
            Some(error) => Prompt::line(format!("{error}\n{}", self.question)),
            None => Prompt::line(self.question.clone()),
        }
    }

    fn on_response(&mut self, cx: &mut NodeCtx<'_>, response: &str) {
        let answer = response.trim();
        if let Some(validator) = &self.validator {
            if let Err(error) = validator(answer) {
                self.error = Some(error);
                cx.retry();
                return;
            }
        }

        if let Some(key) = &self.store_as {
            cx.set(key.clone(), answer);
        }
        if let Some(handler) = &mut self.on_answer {
            handler(cx, answer);
        }
        cx.disable();
    }
}

impl From<Question> for Node {
    fn from(question: Question) -> Self {
        Node::readable(question)
    }
}

pub fn question(question: impl Into<String>) -> Question {
    Question::new(question)
}

// =============================================================================
// Selection
// =============================================================================

pub struct Selection {
    question: String,
    options: OptionTable,
    error: Option<String>,
    deferred: &'static [&'static str],
}

impl Selection {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            options: OptionTable::new(),
            error: None,
            deferred: &[],
        }
    }

    /// Offer `literal` as a choice, handled by `handler`.
    pub fn option(
        mut self,
        literal: impl Into<String>,
        handler: impl FnMut(&mut NodeCtx<'_>) + Send + 'static,
    ) -> Self {
        self.options.insert(literal, handler);
        self
    }

    pub fn defer_until(mut self, keys: &'static [&'static str]) -> Self {
        self.deferred = keys;
        self
    }
}

impl Lifecycle for Selection {
    fn deferred_until(&self) -> &[&'static str] {
        self.deferred
    }
}

impl Readable for Selection {
    fn prompt(&mut self, _cx: &mut NodeCtx<'_>) -> Prompt {
        let question = match self.error.take() {
            Some(error) => format!("{error}\n{}", self.question),
            None => self.question.clone(),
        };
        Prompt::select(question, self.options.literals())
    }

    /// Only reached when the response matched no option.
    fn on_response(&mut self, cx: &mut NodeCtx<'_>, response: &str) {
        self.error = Some(format!(
            "'{response}' is not one of: {}",
            self.options.literals().join(", ")
        ));
        cx.retry();
    }

    fn options(&mut self) -> Option<&mut OptionTable> {
        Some(&mut self.options)
    }
}

impl From<Selection> for Node {
    fn from(selection: Selection) -> Self {
        Node::readable(selection)
    }
}

pub fn selection(question: impl Into<String>) -> Selection {
    Selection::new(question)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{InputRouter, Scene};
    use crate::renderer::{MemoryTerminal, Renderer};
    use crate::state::Context;

    struct Harness {
        scene: Scene,
        renderer: Renderer,
        ctx: Context,
        term: MemoryTerminal,
    }

    impl Harness {
        fn new(nodes: Vec<Node>, responses: &[&str]) -> Self {
            let scene = Scene::new(nodes);
            let mut renderer = Renderer::new();
            renderer.set_buffer(scene.node_ids());
            Self {
                scene,
                renderer,
                ctx: Context::new(),
                term: MemoryTerminal::new().with_responses(responses.iter().copied()),
            }
        }

        fn pass(&mut self) {
            self.renderer
                .render_pass(&mut self.scene, &mut self.ctx, &InputRouter::new(), &mut self.term)
                .unwrap();
        }
    }

    #[test]
    fn test_question_stores_trimmed_answer() {
        let mut h = Harness::new(vec![question("Name?").store_as("name").into()], &["  Ada "]);
        h.pass();
        assert_eq!(h.ctx.get_str("name"), Some("Ada"));
        assert_eq!(h.scene.focused(), None);
    }

    #[test]
    fn test_question_reasks_after_validation_error() {
        let ask = question("Pick a number:")
            .store_as("n")
            .validate(|s| s.parse::<u32>().map(|_| ()).map_err(|_| "not a number".to_string()));
        let mut h = Harness::new(vec![ask.into()], &["abc", "42"]);

        h.pass();
        assert!(h.ctx.get("n").is_none());
        assert!(h.scene.focused().is_some());

        h.pass();
        assert_eq!(h.ctx.get_str("n"), Some("42"));
        assert_eq!(
            h.term.prompts(),
            vec!["Pick a number:".to_string(), "not a number\nPick a number:".to_string()]
        );
    }

    #[test]
    fn test_on_answer_runs_after_store() {
        let ask = question("Name?").store_as("name").on_answer(|cx, answer| {
            let stored = cx.get_str("name").map(str::to_string);
            cx.set("echo", format!("{answer}/{}", stored.unwrap_or_default()));
        });
        let mut h = Harness::new(vec![ask.into()], &["Ada"]);
        h.pass();
        assert_eq!(h.ctx.get_str("echo"), Some("Ada/Ada"));
    }

    #[test]
    fn test_selection_runs_matching_option() {
        let menu = selection("Color?")
            .option("Red", |cx| {
                cx.set("color", "red");
                cx.disable();
            })
            .option("Blue", |cx| {
                cx.set("color", "blue");
                cx.disable();
            });
        let mut h = Harness::new(vec![menu.into()], &["Blue"]);
        h.pass();
        assert_eq!(h.ctx.get_str("color"), Some("blue"));
        assert_eq!(h.scene.focused(), None);
    }

    #[test]
    fn test_selection_retries_unknown_choice() {
        let menu = selection("Color?").option("Red", |cx| {
            cx.set("color", "red");
            cx.disable();
        });
        let mut h = Harness::new(vec![menu.into()], &["Green", "Red"]);
        h.pass();
        assert!(h.ctx.get("color").is_none());
        h.pass();
        assert_eq!(h.ctx.get_str("color"), Some("red"));
        assert!(h.term.prompts()[1].starts_with("'Green' is not one of: Red"));
    }
}
