//! Mount API - Engine lifecycle on background threads.
//!
//! [`mount`] moves an [`Engine`] onto a render thread and starts the
//! terminal's input capture. The returned [`EngineHandle`] is the only way
//! back in: stop it, or wait for the engine to quit by itself.
//!
//! # Example
//!
//! ```ignore
//! use nera_tui::{Engine, CrosstermTerminal};
//!
//! let mut engine = Engine::new(CrosstermTerminal::new()?);
//! engine.add_scenes(scenes, Some("boot"))?;
//!
//! // Blocks until a node quits or Ctrl+C is pressed
//! engine.start()?.wait()?;
//! ```
//!
//! The diagnostic snapshot is written when the render thread exits, whether
//! it returns or unwinds.

use std::any::Any;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info, warn};

use crate::diagnostics::Snapshot;
use crate::engine::Engine;
use crate::error::{EngineError, Result};
use crate::renderer::Terminal;
use crate::state::InputCapture;

// =============================================================================
// Engine Handle
// =============================================================================

/// Handle to a running engine.
///
/// Holds:
/// - the running flag shared with the render thread
/// - the render thread's join handle
/// - the input capture thread, if the terminal has one
pub struct EngineHandle {
    running: Arc<AtomicBool>,
    render: Option<JoinHandle<Result<()>>>,
    input: Option<InputCapture>,
}

impl EngineHandle {
    /// Check if the render loop is still running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Ask the render loop to stop, then join both threads.
    ///
    /// A prompt waiting for input is released by stopping the input thread,
    /// so the input-closed error it ends with is not reported.
    pub fn stop(mut self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown(true)
    }

    /// Block until the engine quits by itself.
    pub fn wait(mut self) -> Result<()> {
        self.shutdown(false)
    }

    fn shutdown(&mut self, requested: bool) -> Result<()> {
        if requested {
            if let Some(mut input) = self.input.take() {
                input.stop();
            }
        }
        let render = self.render.take().ok_or(EngineError::AlreadyStopped)?;
        let result = match render.join() {
            Ok(result) => result,
            Err(payload) => Err(EngineError::RenderThreadPanicked(panic_message(payload))),
        };
        if let Some(mut input) = self.input.take() {
            input.stop();
        }

        match result {
            Err(EngineError::Io(e)) if requested && e.kind() == io::ErrorKind::UnexpectedEof => {
                debug!("prompt released by shutdown");
                Ok(())
            }
            other => other,
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        if self.render.is_some() {
            self.running.store(false, Ordering::SeqCst);
            if let Err(e) = self.shutdown(true) {
                warn!(error = %e, "engine stopped with an error during drop");
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Writes the snapshot when the render thread ends, unwinding included.
struct SnapshotGuard(Snapshot);

impl Drop for SnapshotGuard {
    fn drop(&mut self) {
        match self.0.write() {
            Ok(Some(path)) => info!(path = %path.display(), "snapshot written"),
            Ok(None) => {}
            Err(e) => error!(error = %e, "failed to write snapshot"),
        }
    }
}

// =============================================================================
// Mount Function
// =============================================================================

/// Start `engine` on a render thread.
///
/// Fails with [`EngineError::NoScenes`] when no scene is current.
pub fn mount<T: Terminal + 'static>(mut engine: Engine<T>) -> Result<EngineHandle> {
    if engine.current_scene().is_none() {
        return Err(EngineError::NoScenes);
    }

    let input = engine.terminal_mut().spawn_input()?;
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();

    let render = thread::Builder::new()
        .name("nera-render".to_string())
        .spawn(move || {
            let _guard = SnapshotGuard(engine.snapshot().clone());
            let result = engine.run(&running_clone);
            running_clone.store(false, Ordering::SeqCst);
            if let Err(e) = &result {
                engine.snapshot().record(format!("render loop failed: {e}"));
            }
            if let Err(e) = engine.terminal_mut().restore() {
                warn!(error = %e, "failed to restore terminal");
            }
            result
        })
        .map_err(|source| EngineError::ThreadSpawn {
            name: "render",
            source,
        })?;

    info!("engine started");
    Ok(EngineHandle {
        running,
        render: Some(render),
        input,
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::EngineConfig;
    use crate::engine::{Lifecycle, Node, NodeCtx, Renderable, Scene};
    use crate::renderer::MemoryTerminal;
    use crate::types::Output;

    struct Say(&'static str);

    impl Lifecycle for Say {}

    impl Renderable for Say {
        fn render(&mut self, _cx: &mut NodeCtx<'_>) -> Output {
            Output::plain(self.0)
        }
    }

    fn fast() -> EngineConfig {
        EngineConfig {
            tick_rate_ms: 5,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_mount_requires_a_scene() {
        let engine = Engine::new(MemoryTerminal::new());
        assert!(matches!(mount(engine), Err(EngineError::NoScenes)));
    }

    #[test]
    fn test_stop_joins_render_thread() {
        let term = MemoryTerminal::new();
        let mut engine = Engine::with_config(term.clone(), fast());
        engine
            .add_scenes([("boot", Scene::new(vec![Node::display(Say("up"))]))], None)
            .unwrap();

        let handle = engine.start().unwrap();
        assert!(handle.is_running());
        thread::sleep(Duration::from_millis(30));
        handle.stop().unwrap();

        assert!(term.clears() >= 1);
        assert_eq!(term.screen(), "up\n");
    }

    #[test]
    fn test_wait_returns_when_a_node_quits() {
        struct Quit;
        impl Lifecycle for Quit {
            fn did_render(&mut self, cx: &mut NodeCtx<'_>) {
                cx.quit();
            }
        }
        impl Renderable for Quit {
            fn render(&mut self, _cx: &mut NodeCtx<'_>) -> Output {
                Output::plain("bye")
            }
        }

        let mut engine = Engine::with_config(MemoryTerminal::new(), fast());
        engine
            .add_scenes([("only", Scene::new(vec![Node::display(Quit)]))], None)
            .unwrap();
        engine.start().unwrap().wait().unwrap();
    }

    #[test]
    fn test_render_panic_is_reported() {
        struct Boom;
        impl Lifecycle for Boom {}
        impl Renderable for Boom {
            fn render(&mut self, _cx: &mut NodeCtx<'_>) -> Output {
                panic!("boom");
            }
        }

        let mut engine = Engine::with_config(MemoryTerminal::new(), fast());
        engine
            .add_scenes([("only", Scene::new(vec![Node::display(Boom)]))], None)
            .unwrap();
        let err = engine.start().unwrap().wait().unwrap_err();
        assert!(matches!(err, EngineError::RenderThreadPanicked(msg) if msg == "boom"));
    }

    #[test]
    fn test_missing_response_surfaces_as_io_error() {
        struct Ask;
        impl Lifecycle for Ask {}
        impl crate::engine::Readable for Ask {
            fn prompt(&mut self, _cx: &mut NodeCtx<'_>) -> crate::types::Prompt {
                crate::types::Prompt::line("?")
            }
        }

        let mut engine = Engine::with_config(MemoryTerminal::new(), fast());
        engine
            .add_scenes([("only", Scene::new(vec![Node::readable(Ask)]))], None)
            .unwrap();
        let err = engine.start().unwrap().wait().unwrap_err();
        assert!(matches!(err, EngineError::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof));
    }
}
