use std::{
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use log::{debug, error, info, warn};
use rand::Rng;
use tokio::sync::Mutex;
use tokio_util::task::TaskTracker;

use crate::{
    audio::AudioEngineHandle,
    db::ScoreRecord,
    sensor::{SensorStatus, SensorStatusCell},
    settings::GameConfig,
    store::ScoreStore,
};

use super::{
    animator::AnimationFrame,
    input::UserInput,
    machine::{PunchOutcome, PunchStateMachine, ScoreWrite, UsernameError},
    state::{Phase, PunchEvent, PunchResult, PunchSource},
    verdict::Tier,
};

const MANUAL_FORCE_CEILING: i64 = 1000;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Leaderboard {
    pub entries: Vec<ScoreRecord>,
    pub overall_best: i64,
    pub player: Option<String>,
    pub player_best: i64,
}

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone)]
pub struct GameSnapshot {
    pub phase: Phase,
    pub username: String,
    pub frame: Option<AnimationFrame>,
    pub result: Option<PunchResult>,
    pub leaderboard: Leaderboard,
    pub sensor: SensorStatus,
    pub notice: Option<String>,
    pub time_in_phase: Duration,
    pub result_timeout: Duration,
}

#[derive(Debug, Clone, Default)]
struct ReactionClips {
    taunt: Option<PathBuf>,
    praise: Option<PathBuf>,
}

#[derive(Clone)]
pub struct GameController {
    machine: Arc<Mutex<PunchStateMachine>>,
    board: Arc<Mutex<Leaderboard>>,
    notice: Arc<Mutex<Option<String>>>,
    writes: TaskTracker,
    store: Arc<ScoreStore>,
    audio: AudioEngineHandle,
    sensor: Arc<SensorStatusCell>,
    clips: ReactionClips,
    leaderboard_size: usize,
}

impl GameController {
    pub fn new(
        config: &GameConfig,
        store: Arc<ScoreStore>,
        audio: AudioEngineHandle,
        sensor: Arc<SensorStatusCell>,
    ) -> Self {
        Self {
            machine: Arc::new(Mutex::new(PunchStateMachine::new(
                config.punch_rules(),
                config.animator(),
                Instant::now(),
            ))),
            board: Arc::new(Mutex::new(Leaderboard::default())),
            notice: Arc::new(Mutex::new(None)),
            writes: TaskTracker::new(),
            store,
            audio,
            sensor,
            clips: ReactionClips {
                taunt: config.taunt_clip.clone(),
                praise: config.praise_clip.clone(),
            },
            leaderboard_size: config.leaderboard_size,
        }
    }

    pub async fn phase(&self) -> Phase {
        self.machine.lock().await.phase()
    }

    pub async fn leaderboard(&self) -> Leaderboard {
        self.board.lock().await.clone()
    }

    pub async fn snapshot(&self, now: Instant) -> GameSnapshot {
        let (phase, username, frame, result, time_in_phase, result_timeout) = {
            let machine = self.machine.lock().await;
            let state = machine.state();
            (
                state.phase,
                state.username.clone(),
                machine.animation_frame(now),
                state.last_result.clone(),
                state.time_in_phase(now),
                machine.rules().result_timeout,
            )
        };

        GameSnapshot {
            phase,
            username,
            frame,
            result,
            leaderboard: self.board.lock().await.clone(),
            sensor: self.sensor.get(),
            notice: self.notice.lock().await.clone(),
            time_in_phase,
            result_timeout,
        }
    }

    /// Offers a punch to the machine. An accepted punch kicks off exactly one
    /// background store write; the caller never waits on it.
    pub async fn handle_punch(&self, event: PunchEvent) -> PunchOutcome {
        let best_before = self.board.lock().await.overall_best;

        let (outcome, tier) = {
            let mut machine = self.machine.lock().await;
            let outcome = offer(&mut machine, event, best_before);
            let tier = machine
                .state()
                .last_result
                .as_ref()
                .map(|result| result.verdict.tier);
            (outcome, tier)
        };

        if let PunchOutcome::Accepted(write) = &outcome {
            *self.notice.lock().await = None;
            {
                let mut board = self.board.lock().await;
                board.overall_best = board.overall_best.max(write.score);
            }
            if let Some(tier) = tier {
                self.play_reaction(tier);
            }

            let controller = self.clone();
            let write = write.clone();
            self.writes.spawn(async move {
                controller.persist(write).await;
            });
        }

        outcome
    }

    /// Returns `true` when the input asked to quit.
    pub async fn handle_input(&self, input: UserInput, now: Instant) -> bool {
        match input {
            UserInput::Char(c) => {
                self.machine.lock().await.type_char(c);
            }
            UserInput::Backspace => {
                self.machine.lock().await.backspace();
            }
            UserInput::ConfirmUsername => {
                let confirmed = {
                    let mut machine = self.machine.lock().await;
                    machine.confirm_username(now).map(|_| ())
                };
                self.after_confirm(confirmed).await;
            }
            UserInput::SubmitName(name) => {
                let confirmed = {
                    let mut machine = self.machine.lock().await;
                    machine.submit_username(&name, now).map(|_| ())
                };
                self.after_confirm(confirmed).await;
            }
            UserInput::Continue => {
                let left = self.machine.lock().await.continue_from_result(now);
                if left {
                    self.refresh_leaderboard().await;
                }
            }
            UserInput::NewPlayer => {
                self.machine.lock().await.reset(now);
                *self.notice.lock().await = None;
                if let Err(err) = self.audio.stop() {
                    warn!("Failed to stop audio: {err}");
                }
                self.refresh_leaderboard().await;
            }
            UserInput::SimulatePunch(force) => {
                let floor = self.machine.lock().await.rules().qualifying_force;
                let force = force.unwrap_or_else(|| random_force(floor));
                self.handle_punch(PunchEvent::at(force, PunchSource::Manual, now))
                    .await;
            }
            UserInput::Quit => return true,
        }
        false
    }

    async fn after_confirm(&self, confirmed: Result<(), UsernameError>) {
        match confirmed {
            Ok(()) => {
                *self.notice.lock().await = None;
                self.refresh_leaderboard().await;
            }
            Err(err) => {
                debug!("Username rejected: {err}");
                *self.notice.lock().await = Some(err.to_string());
            }
        }
    }

    /// Time-driven transitions; returning to the name prompt refreshes the
    /// leaderboard.
    pub async fn tick(&self, now: Instant) -> Option<Phase> {
        let entered = self.machine.lock().await.tick(now);
        if entered == Some(Phase::UsernameInput) {
            self.refresh_leaderboard().await;
        }
        entered
    }

    pub async fn refresh_leaderboard(&self) {
        let player = {
            let machine = self.machine.lock().await;
            let state = machine.state();
            (state.phase != Phase::UsernameInput).then(|| state.username.clone())
        };

        let entries = match self.store.top_n(self.leaderboard_size).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!("Leaderboard query failed: {err}");
                Vec::new()
            }
        };
        let overall_best = self.store.overall_best().await;
        let player_best = match &player {
            Some(name) => self.store.user_best(name).await.unwrap_or_else(|err| {
                warn!("Personal best query failed for '{name}': {err}");
                0
            }),
            None => 0,
        };

        *self.board.lock().await = Leaderboard {
            entries,
            overall_best,
            player,
            player_best,
        };
    }

    /// Waits for every store write handed off so far. Finished writes drop
    /// out of the tracker on their own.
    pub async fn flush(&self) {
        self.writes.close();
        self.writes.wait().await;
        self.writes.reopen();
    }

    async fn persist(&self, write: ScoreWrite) {
        match self
            .store
            .record(&write.username, write.score, write.recorded_at)
            .await
        {
            Ok(()) => info!("Recorded {} for '{}'", write.score, write.username),
            Err(err) => error!(
                "Failed to record {} for '{}': {err}",
                write.score, write.username
            ),
        }
        self.refresh_leaderboard().await;
    }

    fn play_reaction(&self, tier: Tier) {
        let clip = match tier {
            Tier::Taunt => self.clips.taunt.as_ref(),
            Tier::Praise => self.clips.praise.as_ref(),
        };
        if let Some(clip) = clip {
            if let Err(err) = self.audio.play(clip) {
                warn!("Failed to queue reaction clip {}: {err}", clip.display());
            }
        }
    }
}

fn offer(machine: &mut PunchStateMachine, event: PunchEvent, best_before: i64) -> PunchOutcome {
    machine.on_punch(event, best_before, &mut rand::thread_rng())
}

fn random_force(floor: i64) -> i64 {
    rand::thread_rng().gen_range(floor..=floor.max(MANUAL_FORCE_CEILING))
}
