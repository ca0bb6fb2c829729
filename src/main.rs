//! nera-tui - Demo session for the scene engine.
//!
//! Boots into a `boot` scene that asks for a pak folder, validates it and
//! lists what it found, then moves to a `home` scene that plays the pak's
//! tracks on a silent clock.
//!
//! Logs go to a file (the terminal belongs to the UI). Filter with
//! `RUST_LOG`, e.g. `RUST_LOG=nera_tui=trace`.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use serde_json::Value;

use nera_tui::audio::SharedPlayer;
use nera_tui::{
    AssetBundle, AssetKind, Computed, CrosstermTerminal, Engine, EngineConfig, Node, NowPlaying,
    PakLayout, PlaybackEvent, PlaybackWatcher, Scene, SilentPlayer, TrackInfo, question,
    selection, text, typed_block,
};

#[derive(Parser)]
#[command(name = "nera-tui")]
#[command(about = "Reactive scene engine for text terminals")]
#[command(version)]
struct Cli {
    /// Engine config (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the tick rate in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Write a diagnostic snapshot on exit
    #[arg(short, long)]
    debug: bool,

    /// Log file
    #[arg(long, default_value = "nera-tui.log")]
    log_file: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log = File::create(&cli.log_file)
        .with_context(|| format!("cannot create log file {}", cli.log_file.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::sync::Mutex::new(log))
        .with_ansi(false)
        .init();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(tick) = cli.tick_ms {
        config.tick_rate_ms = tick;
    }
    config.debug |= cli.debug;

    let player = SilentPlayer::new(Duration::from_secs(90)).shared();
    let (tx, rx) = mpsc::channel();
    let _watcher = PlaybackWatcher::spawn(player.clone(), tx, Duration::from_millis(250))?;

    let terminal = CrosstermTerminal::new()?;
    let mut engine = Engine::with_config(terminal, config.clone());
    engine.add_scenes(
        [
            ("boot", boot_scene(&config, player.clone())),
            ("home", home_scene(player, rx)),
        ],
        None,
    )?;

    engine.start()?.wait()?;
    Ok(())
}

fn boot_scene(config: &EngineConfig, player: SharedPlayer) -> Scene {
    let logo = Node::group(vec![typed_block(
        [
            "  _ __   ___ _ __ __ _ ",
            " | '_ \\ / _ \\ '__/ _` |",
            " | | | |  __/ | | (_| |",
            " |_| |_|\\___|_|  \\__,_|",
        ],
        config.typing_delay(),
    )])
    .hide_after_render();

    let pak_folder = question("Where is your pak folder?")
        .validate(|answer| {
            PakLayout
                .validate(Path::new(answer))
                .map_err(|err| err.to_string())
        })
        .store_as("pak_dir")
        .on_answer(move |cx, answer| {
            let Ok(assets) = PakLayout.list_assets(Path::new(answer)) else {
                return;
            };
            let tracks = assets
                .iter()
                .filter(|asset| asset.kind == AssetKind::Track)
                .map(|asset| TrackInfo::new(&asset.path))
                .collect();
            if let Err(err) = player.lock().load(tracks) {
                tracing::warn!(%err, "tracks not loaded");
            }
            let files: Vec<Value> = assets
                .iter()
                .map(|asset| Value::from(asset.path.display().to_string()))
                .collect();
            cx.set("files", files);
        });

    let overview = Computed::new(&["files", "pak_dir"], |ctx| {
        let count = ctx
            .get("files")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        let dir = ctx.get_str("pak_dir").unwrap_or("?");
        format!("Found {count} assets in {dir}")
    })
    .defer_until(&["files"]);

    let next = selection("What next?")
        .option("home", |cx| cx.transition("home"))
        .option("quit", |cx| cx.quit())
        .defer_until(&["files"]);

    Scene::new(vec![
        logo,
        text("Welcome."),
        pak_folder.into(),
        overview.into(),
        next.into(),
    ])
}

fn home_scene(player: SharedPlayer, events: mpsc::Receiver<PlaybackEvent>) -> Scene {
    let controls = player.clone();
    let playback = selection("Playback")
        .option("play", move |cx| {
            controls.lock().toggle_play();
            cx.retry();
        })
        .option("back", |cx| cx.transition("boot"))
        .option("quit", |cx| cx.quit());

    Scene::new(vec![
        text("Home. Space toggles playback, n / p skip tracks."),
        Node::display(NowPlaying::new(player, events)),
        playback.into(),
    ])
}
