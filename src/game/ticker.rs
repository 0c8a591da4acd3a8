use std::time::{Duration, Instant};

use log::{debug, info};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::controller::{GameController, GameSnapshot};
use super::input::UserInput;
use super::state::PunchEvent;

/// Draws one frame. Called on every tick; deciding whether anything changed
/// is up to the implementation.
pub trait Renderer: Send {
    fn draw(&mut self, snapshot: &GameSnapshot);
}

/// Single owner of the game's time: ticks the machine, feeds it punches and
/// player input, and renders. Returns once `cancel` fires or the player quits,
/// after pending score writes have landed.
pub async fn run_game_loop<R: Renderer>(
    controller: GameController,
    mut punches: mpsc::Receiver<PunchEvent>,
    mut inputs: mpsc::Receiver<UserInput>,
    mut renderer: R,
    tick_interval: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    controller.refresh_leaderboard().await;

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                info!("game loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                let now = Instant::now();
                if let Some(phase) = controller.tick(now).await {
                    debug!("entered {}", phase.as_str());
                }
                renderer.draw(&controller.snapshot(now).await);
            }
            Some(event) = punches.recv() => {
                controller.handle_punch(event).await;
            }
            Some(input) = inputs.recv() => {
                if controller.handle_input(input, Instant::now()).await {
                    info!("quit requested");
                    cancel_token.cancel();
                }
            }
        }
    }

    controller.flush().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioEngineHandle;
    use crate::game::state::{Phase, PunchSource};
    use crate::sensor::SensorStatusCell;
    use crate::settings::GameConfig;
    use crate::store::ScoreStore;
    use std::sync::{Arc, Mutex};
    use uuid::Uuid;

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<(Phase, Option<i64>)>>>);

    impl Renderer for Recorder {
        fn draw(&mut self, snapshot: &GameSnapshot) {
            let score = snapshot.result.as_ref().map(|result| result.score);
            self.0.lock().unwrap().push((snapshot.phase, score));
        }
    }

    fn fast_config() -> GameConfig {
        let dir = std::env::temp_dir().join(format!("powerpunch-test-{}", Uuid::new_v4()));
        GameConfig {
            animation_ms: 60,
            flash_ms: 10,
            flash_count: 2,
            result_timeout_secs: 30,
            high_score_path: dir.join("high_scores.json"),
            audio_enabled: false,
            ..GameConfig::default()
        }
    }

    #[tokio::test]
    async fn sensor_punch_reaches_the_result_screen() {
        let config = fast_config();
        let store = Arc::new(ScoreStore::open(&config));
        let controller = GameController::new(
            &config,
            store.clone(),
            AudioEngineHandle::disabled(),
            Arc::new(SensorStatusCell::default()),
        );
        let (punch_tx, punch_rx) = mpsc::channel(8);
        let (input_tx, input_rx) = mpsc::channel(8);
        let recorder = Recorder::default();
        let cancel = CancellationToken::new();

        let game = tokio::spawn(run_game_loop(
            controller,
            punch_rx,
            input_rx,
            recorder.clone(),
            Duration::from_millis(5),
            cancel.clone(),
        ));

        for c in "Rocky".chars() {
            input_tx.send(UserInput::Char(c)).await.unwrap();
        }
        input_tx.send(UserInput::ConfirmUsername).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        punch_tx
            .send(PunchEvent::new(725, PunchSource::Sensor))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;

        input_tx.send(UserInput::Quit).await.unwrap();
        game.await.unwrap();

        assert!(cancel.is_cancelled());
        let frames = recorder.0.lock().unwrap().clone();
        assert!(frames.contains(&(Phase::Listening, None)));
        assert!(frames.contains(&(Phase::Animating, Some(725))));
        assert_eq!(frames.last(), Some(&(Phase::ResultDisplay, Some(725))));
        assert_eq!(store.overall_best().await, 725);
    }

    #[tokio::test]
    async fn cancellation_stops_the_loop_without_input() {
        let config = fast_config();
        let controller = GameController::new(
            &config,
            Arc::new(ScoreStore::open(&config)),
            AudioEngineHandle::disabled(),
            Arc::new(SensorStatusCell::default()),
        );
        let (_punch_tx, punch_rx) = mpsc::channel(1);
        let (_input_tx, input_rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        let game = tokio::spawn(run_game_loop(
            controller,
            punch_rx,
            input_rx,
            Recorder::default(),
            Duration::from_millis(5),
            cancel.clone(),
        ));
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(1), game)
            .await
            .expect("loop should stop promptly")
            .unwrap();
    }
}
