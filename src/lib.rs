pub mod audio;
pub mod db;
pub mod error;
pub mod game;
pub mod sensor;
pub mod settings;
pub mod store;
pub mod ui;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use log::{error, info, warn};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use audio::AudioEngineHandle;
use game::{run_game_loop, GameController};
use sensor::{spawn_ingest, SensorStatus, SensorStatusCell, SerialConnector};
use settings::GameConfig;
use store::ScoreStore;
use ui::ConsoleRenderer;

const PUNCH_CHANNEL_CAPACITY: usize = 8;
const INPUT_CHANNEL_CAPACITY: usize = 64;

pub fn run() -> anyhow::Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let config = GameConfig::load().context("invalid configuration")?;
    info!("PowerPunch starting up...");
    info!("{}", config.summary());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build async runtime")?;

    runtime.block_on(play(config))
}

async fn play(config: GameConfig) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let status = Arc::new(SensorStatusCell::default());
    let store = Arc::new(ScoreStore::open(&config));
    let audio = AudioEngineHandle::new(config.audio_enabled);

    let controller = GameController::new(&config, store, audio.clone(), status.clone());

    let (punch_tx, punch_rx) = mpsc::channel(PUNCH_CHANNEL_CAPACITY);
    let connector = SerialConnector::new(
        config.serial_port.clone(),
        config.baud_rate,
        Duration::from_millis(config.read_timeout_ms),
    );
    if let Err(err) = spawn_ingest(
        Box::new(connector),
        config.ingest_settings(),
        punch_tx,
        status.clone(),
        cancel.clone(),
    ) {
        warn!("Failed to start sensor ingest, manual punches only: {err}");
        status.set(SensorStatus::Manual);
    }

    let (input_tx, input_rx) = mpsc::channel(INPUT_CHANNEL_CAPACITY);
    ui::spawn_stdin_reader(input_tx).context("failed to start input reader")?;

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Interrupt received");
                    cancel.cancel();
                }
                Err(err) => error!("Failed to listen for Ctrl-C: {err}"),
            }
        });
    }

    run_game_loop(
        controller,
        punch_rx,
        input_rx,
        ConsoleRenderer::stdout(),
        config.tick_interval(),
        cancel.clone(),
    )
    .await;

    cancel.cancel();
    if let Err(err) = audio.stop() {
        warn!("Failed to stop audio: {err}");
    }
    info!("PowerPunch shut down");
    Ok(())
}
