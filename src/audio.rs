//! Audio - Playback collaborator and the node that shows it.
//!
//! - [`AudioPlayer`] - the seam to whatever actually makes sound
//! - [`Playlist`] - track order with wrap-around navigation
//! - [`SilentPlayer`] - clock-driven player with no output device
//! - [`PlaybackWatcher`] - background thread reporting progress and track
//!   changes over a channel, advancing when a track runs out
//! - [`NowPlaying`] - display node fed by the watcher's channel
//!
//! Playback state crosses threads only through the shared player's mutex and
//! the watcher's channel. The context is still written on the render thread,
//! by [`NowPlaying::on_tick`](crate::engine::Lifecycle::on_tick).

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, trace};

use crate::engine::{Lifecycle, NodeCtx, Renderable};
use crate::error::Result;
use crate::state::KeyboardEvent;
use crate::types::Output;

// =============================================================================
// TRACKS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub name: String,
    pub path: PathBuf,
}

impl TrackInfo {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { name, path }
    }
}

/// `m:ss`
pub fn format_clock(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Ordered tracks plus a cursor. Navigation wraps at both ends.
#[derive(Debug, Clone, Default)]
pub struct Playlist {
    tracks: Vec<TrackInfo>,
    index: usize,
}

impl Playlist {
    pub fn new(tracks: Vec<TrackInfo>) -> Self {
        Self { tracks, index: 0 }
    }

    pub fn current(&self) -> Option<&TrackInfo> {
        self.tracks.get(self.index)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Out-of-range indices are ignored.
    pub fn set_track(&mut self, index: usize) -> bool {
        if index < self.tracks.len() {
            self.index = index;
            true
        } else {
            false
        }
    }

    pub fn next(&mut self) -> Option<&TrackInfo> {
        if self.tracks.is_empty() {
            return None;
        }
        self.index = (self.index + 1) % self.tracks.len();
        self.current()
    }

    pub fn previous(&mut self) -> Option<&TrackInfo> {
        if self.tracks.is_empty() {
            return None;
        }
        self.index = self.index.checked_sub(1).unwrap_or(self.tracks.len() - 1);
        self.current()
    }
}

// =============================================================================
// PLAYER
// =============================================================================

pub trait AudioPlayer: Send {
    fn load(&mut self, tracks: Vec<TrackInfo>) -> Result<()>;

    fn play(&mut self);

    fn pause(&mut self);

    fn stop(&mut self);

    fn is_playing(&self) -> bool;

    /// False once the current track ran out.
    fn is_busy(&self) -> bool;

    fn toggle_play(&mut self) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    fn next_track(&mut self) -> Option<TrackInfo>;

    fn previous_track(&mut self) -> Option<TrackInfo>;

    fn current_track(&self) -> Option<TrackInfo>;

    /// Time played of the current track.
    fn progress(&self) -> Duration;
}

pub type SharedPlayer = Arc<Mutex<dyn AudioPlayer>>;

/// Player that only keeps time. Every track lasts `track_length`.
#[derive(Debug)]
pub struct SilentPlayer {
    playlist: Playlist,
    track_length: Duration,
    played: Duration,
    resumed_at: Option<Instant>,
}

impl SilentPlayer {
    pub fn new(track_length: Duration) -> Self {
        Self {
            playlist: Playlist::default(),
            track_length,
            played: Duration::ZERO,
            resumed_at: None,
        }
    }

    pub fn shared(self) -> SharedPlayer {
        Arc::new(Mutex::new(self))
    }

    fn restart_track(&mut self) {
        self.played = Duration::ZERO;
        if self.resumed_at.is_some() {
            self.resumed_at = Some(Instant::now());
        }
    }
}

impl AudioPlayer for SilentPlayer {
    fn load(&mut self, tracks: Vec<TrackInfo>) -> Result<()> {
        debug!(count = tracks.len(), "tracks loaded");
        self.playlist = Playlist::new(tracks);
        self.played = Duration::ZERO;
        self.resumed_at = None;
        Ok(())
    }

    fn play(&mut self) {
        if self.resumed_at.is_none() && !self.playlist.is_empty() {
            self.resumed_at = Some(Instant::now());
        }
    }

    fn pause(&mut self) {
        if let Some(resumed) = self.resumed_at.take() {
            self.played += resumed.elapsed();
        }
    }

    fn stop(&mut self) {
        self.resumed_at = None;
        self.played = Duration::ZERO;
    }

    fn is_playing(&self) -> bool {
        self.resumed_at.is_some()
    }

    fn is_busy(&self) -> bool {
        self.progress() < self.track_length
    }

    fn next_track(&mut self) -> Option<TrackInfo> {
        let track = self.playlist.next().cloned();
        self.restart_track();
        track
    }

    fn previous_track(&mut self) -> Option<TrackInfo> {
        let track = self.playlist.previous().cloned();
        self.restart_track();
        track
    }

    fn current_track(&self) -> Option<TrackInfo> {
        self.playlist.current().cloned()
    }

    fn progress(&self) -> Duration {
        let running = self.resumed_at.map(|t| t.elapsed()).unwrap_or_default();
        (self.played + running).min(self.track_length)
    }
}

// =============================================================================
// WATCHER
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    Progress(Duration),
    TrackChanged(TrackInfo),
}

/// Background thread polling a shared player.
pub struct PlaybackWatcher {
    handle: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
}

impl PlaybackWatcher {
    pub fn spawn(
        player: SharedPlayer,
        tx: Sender<PlaybackEvent>,
        interval: Duration,
    ) -> std::io::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        let handle = thread::Builder::new()
            .name("nera-playback".to_string())
            .spawn(move || Self::watch_loop(player, tx, interval, running_clone))?;

        Ok(Self {
            handle: Some(handle),
            running,
        })
    }

    fn watch_loop(
        player: SharedPlayer,
        tx: Sender<PlaybackEvent>,
        interval: Duration,
        running: Arc<AtomicBool>,
    ) {
        while running.load(Ordering::SeqCst) {
            thread::sleep(interval);
            let event = {
                let mut player = player.lock();
                if !player.is_playing() {
                    continue;
                }
                if player.is_busy() {
                    Some(PlaybackEvent::Progress(player.progress()))
                } else {
                    player.next_track().map(PlaybackEvent::TrackChanged)
                }
            };
            let Some(event) = event else {
                continue;
            };
            trace!(?event, "playback");
            if tx.send(event).is_err() {
                break; // Nobody is listening any more
            }
        }
        debug!("playback watcher stopped");
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PlaybackWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

// =============================================================================
// NOW PLAYING NODE
// =============================================================================

/// Shows the current track and its clock.
///
/// Drains playback events on every tick into the `now_playing` and
/// `progress_secs` context keys, which it watches. Keys: space toggles
/// playback, `n` / `p` skip forward / back.
pub struct NowPlaying {
    player: SharedPlayer,
    events: Receiver<PlaybackEvent>,
}

impl NowPlaying {
    pub fn new(player: SharedPlayer, events: Receiver<PlaybackEvent>) -> Self {
        Self { player, events }
    }

    fn publish_track(cx: &mut NodeCtx<'_>, track: Option<TrackInfo>) {
        let name = track.map(|t| Value::from(t.name)).unwrap_or(Value::Null);
        cx.set("now_playing", name);
        cx.set("progress_secs", 0);
    }
}

impl Lifecycle for NowPlaying {
    fn watched_keys(&self) -> &[&'static str] {
        &["now_playing", "progress_secs"]
    }

    fn on_start(&mut self, cx: &mut NodeCtx<'_>) {
        let track = self.player.lock().current_track();
        Self::publish_track(cx, track);
    }

    fn on_tick(&mut self, cx: &mut NodeCtx<'_>, _delta: Duration) {
        loop {
            match self.events.try_recv() {
                Ok(PlaybackEvent::Progress(played)) => {
                    cx.set("progress_secs", played.as_secs());
                }
                Ok(PlaybackEvent::TrackChanged(track)) => Self::publish_track(cx, Some(track)),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
    }

    fn on_key(&mut self, cx: &mut NodeCtx<'_>, key: &KeyboardEvent) -> bool {
        let mut player = self.player.lock();
        let changed = match key.key.as_str() {
            " " => {
                player.toggle_play();
                None
            }
            "n" => Some(player.next_track()),
            "p" => Some(player.previous_track()),
            _ => return false,
        };
        drop(player);
        if let Some(track) = changed {
            Self::publish_track(cx, track);
        }
        true
    }
}

impl Renderable for NowPlaying {
    fn render(&mut self, cx: &mut NodeCtx<'_>) -> Output {
        match cx.get_str("now_playing") {
            Some(name) => {
                let secs = cx.get("progress_secs").and_then(Value::as_u64).unwrap_or(0);
                format!("♪ {name} [{}]", format_clock(Duration::from_secs(secs))).into()
            }
            None => Output::plain("♪ nothing loaded"),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
