use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, info, trace, warn};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

use super::evaluator::ForceEvaluator;
use super::frame::parse_line;
use super::link::{SensorConnector, SensorLink};
use crate::game::state::{PunchEvent, PunchSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestSettings {
    pub minimum_threshold: i32,
    pub qualifying_force: i64,
    pub reconnect_attempts: u32,
    pub reconnect_backoff: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SensorStatus {
    Connecting = 0,
    Live = 1,
    Reconnecting = 2,
    /// Ingestion is off for the rest of the run; only simulated punches remain.
    Manual = 3,
}

/// Lock-free status shared between the ingest thread and the render loop.
#[derive(Debug)]
pub struct SensorStatusCell(AtomicU8);

impl Default for SensorStatusCell {
    fn default() -> Self {
        Self(AtomicU8::new(SensorStatus::Connecting as u8))
    }
}

impl SensorStatusCell {
    pub fn get(&self) -> SensorStatus {
        match self.0.load(Ordering::SeqCst) {
            1 => SensorStatus::Live,
            2 => SensorStatus::Reconnecting,
            3 => SensorStatus::Manual,
            _ => SensorStatus::Connecting,
        }
    }

    pub fn set(&self, status: SensorStatus) {
        self.0.store(status as u8, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestExit {
    Cancelled,
    /// Reconnect budget exhausted; manual mode from here on.
    DeviceLost,
    ChannelClosed,
}

enum Reconnect {
    Linked(Box<dyn SensorLink>),
    Exhausted,
    Cancelled,
}

/// Parse and evaluate one raw line. Only forces that could qualify come back;
/// garbled lines are expected and silently skipped.
pub fn punch_force(line: &str, evaluator: &ForceEvaluator, qualifying_force: i64) -> Option<i64> {
    let frame = match parse_line(line) {
        Ok(frame) => frame,
        Err(err) => {
            trace!("Skipping sensor line {line:?}: {err}");
            return None;
        }
    };
    let force = evaluator.evaluate(frame).force()?;
    debug!("Sensor frame {}/{} -> force {force}", frame.fsr1, frame.fsr2);
    (force >= qualifying_force).then_some(force)
}

/// Runs the ingest loop on its own detached thread.
pub fn spawn_ingest(
    mut connector: Box<dyn SensorConnector>,
    settings: IngestSettings,
    tx: mpsc::Sender<PunchEvent>,
    status: Arc<SensorStatusCell>,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    thread::Builder::new()
        .name("powerpunch-ingest".into())
        .spawn(move || {
            let exit = run_ingest(connector.as_mut(), &settings, &tx, &status, &cancel);
            info!("Sensor ingest stopped: {exit:?}");
        })?;
    Ok(())
}

pub fn run_ingest(
    connector: &mut dyn SensorConnector,
    settings: &IngestSettings,
    tx: &mpsc::Sender<PunchEvent>,
    status: &SensorStatusCell,
    cancel: &CancellationToken,
) -> IngestExit {
    let evaluator = ForceEvaluator::new(settings.minimum_threshold);
    status.set(SensorStatus::Connecting);

    let mut link = match connector.connect() {
        Ok(link) => link,
        Err(err) => {
            warn!("Could not open sensor {}: {err}", connector.describe());
            match reconnect(connector, settings, status, cancel) {
                Reconnect::Linked(link) => link,
                Reconnect::Exhausted => return disable(status, settings),
                Reconnect::Cancelled => return IngestExit::Cancelled,
            }
        }
    };
    status.set(SensorStatus::Live);
    info!("Sensor live on {}", connector.describe());

    loop {
        if cancel.is_cancelled() {
            return IngestExit::Cancelled;
        }

        match link.read_line() {
            Ok(None) => {}
            Ok(Some(line)) => {
                let Some(force) = punch_force(&line, &evaluator, settings.qualifying_force) else {
                    continue;
                };
                // Never hand anything over once teardown has started.
                if cancel.is_cancelled() {
                    return IngestExit::Cancelled;
                }
                match tx.try_send(PunchEvent::new(force, PunchSource::Sensor)) {
                    Ok(()) => {}
                    Err(TrySendError::Full(event)) => {
                        debug!("Punch queue full, dropping force {}", event.force)
                    }
                    Err(TrySendError::Closed(_)) => return IngestExit::ChannelClosed,
                }
            }
            Err(err) => {
                warn!("Sensor read failed on {}: {err}", connector.describe());
                match reconnect(connector, settings, status, cancel) {
                    Reconnect::Linked(next) => {
                        link = next;
                        status.set(SensorStatus::Live);
                    }
                    Reconnect::Exhausted => return disable(status, settings),
                    Reconnect::Cancelled => return IngestExit::Cancelled,
                }
            }
        }
    }
}

fn reconnect(
    connector: &mut dyn SensorConnector,
    settings: &IngestSettings,
    status: &SensorStatusCell,
    cancel: &CancellationToken,
) -> Reconnect {
    status.set(SensorStatus::Reconnecting);
    for attempt in 1..=settings.reconnect_attempts {
        thread::sleep(settings.reconnect_backoff);
        if cancel.is_cancelled() {
            return Reconnect::Cancelled;
        }
        match connector.connect() {
            Ok(link) => {
                info!(
                    "Reconnected to {} on attempt {attempt}",
                    connector.describe()
                );
                return Reconnect::Linked(link);
            }
            Err(err) => warn!(
                "Reconnect attempt {attempt}/{} failed: {err}",
                settings.reconnect_attempts
            ),
        }
    }
    Reconnect::Exhausted
}

fn disable(status: &SensorStatusCell, settings: &IngestSettings) -> IngestExit {
    warn!(
        "Sensor disabled after {} failed reconnect attempts; switching to manual punches",
        settings.reconnect_attempts
    );
    status.set(SensorStatus::Manual);
    IngestExit::DeviceLost
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DeviceError;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    type Script = VecDeque<Result<Option<String>, DeviceError>>;

    struct ScriptedLink {
        reads: Script,
    }

    impl SensorLink for ScriptedLink {
        fn read_line(&mut self) -> Result<Option<String>, DeviceError> {
            self.reads.pop_front().unwrap_or(Err(DeviceError::Disconnected))
        }
    }

    /// Each `connect` pops the next scripted outcome; an exhausted script
    /// keeps failing.
    struct ScriptedConnector {
        sessions: VecDeque<Result<Script, DeviceError>>,
        connects: Arc<AtomicUsize>,
    }

    impl SensorConnector for ScriptedConnector {
        fn connect(&mut self) -> Result<Box<dyn SensorLink>, DeviceError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            match self.sessions.pop_front() {
                Some(Ok(reads)) => Ok(Box::new(ScriptedLink { reads })),
                Some(Err(err)) => Err(err),
                None => Err(DeviceError::Open("scripted device unplugged".into())),
            }
        }

        fn describe(&self) -> String {
            "scripted".into()
        }
    }

    fn settings() -> IngestSettings {
        IngestSettings {
            minimum_threshold: 305,
            qualifying_force: 650,
            reconnect_attempts: 3,
            reconnect_backoff: Duration::ZERO,
        }
    }

    fn lines(raw: &[&str]) -> Script {
        raw.iter().map(|line| Ok(Some(line.to_string()))).collect()
    }

    fn run(sessions: Vec<Result<Script, DeviceError>>) -> (IngestExit, Vec<i64>, usize, SensorStatus) {
        let connects = Arc::new(AtomicUsize::new(0));
        let mut connector = ScriptedConnector {
            sessions: sessions.into(),
            connects: connects.clone(),
        };
        let (tx, mut rx) = mpsc::channel(16);
        let status = SensorStatusCell::default();
        let exit = run_ingest(
            &mut connector,
            &settings(),
            &tx,
            &status,
            &CancellationToken::new(),
        );

        let mut forces = Vec::new();
        while let Ok(event) = rx.try_recv() {
            assert_eq!(event.source, PunchSource::Sensor);
            forces.push(event.force);
        }
        (exit, forces, connects.load(Ordering::SeqCst), status.get())
    }

    #[test]
    fn punch_force_filters_garbage_and_weak_hits() {
        let evaluator = ForceEvaluator::default();
        assert_eq!(punch_force("FSR1: 700, FSR2: 750, x", &evaluator, 650), Some(725));
        assert_eq!(punch_force("FSR1: 600, FSR2: 650, x", &evaluator, 650), None);
        assert_eq!(punch_force("FSR1: 10, FSR2: 20, x", &evaluator, 650), None);
        assert_eq!(punch_force("FSR1: 7", &evaluator, 650), None);
        assert_eq!(punch_force("\u{fffd}\u{fffd}", &evaluator, 650), None);
    }

    #[test]
    fn forwards_only_qualifying_forces() {
        let mut script = lines(&[
            "FSR1: 500, FSR2: 550, a",
            "garbled",
            "FSR1: 600, FSR2: 650, a",
        ]);
        script.push_back(Ok(None));
        script.extend(lines(&["FSR1: 700, FSR2: 750, a", "FSR1: 100, FSR2: 900, a"]));

        let (exit, forces, _, status) = run(vec![Ok(script)]);
        assert_eq!(forces, vec![725, 900]);
        // The script ends in a disconnect with nothing left to reconnect to.
        assert_eq!(exit, IngestExit::DeviceLost);
        assert_eq!(status, SensorStatus::Manual);
    }

    #[test]
    fn three_failed_reopens_switch_to_manual_mode() {
        let (exit, forces, connects, status) = run(vec![
            Ok(lines(&["FSR1: 800, FSR2: 800, a"])),
            Err(DeviceError::Open("busy".into())),
            Err(DeviceError::Open("busy".into())),
            Err(DeviceError::Open("busy".into())),
            Ok(lines(&["FSR1: 999, FSR2: 999, a"])),
        ]);
        assert_eq!(exit, IngestExit::DeviceLost);
        assert_eq!(status, SensorStatus::Manual);
        assert_eq!(forces, vec![800]);
        // Initial open plus exactly three reopen attempts.
        assert_eq!(connects, 4);
    }

    #[test]
    fn a_successful_reopen_resumes_ingestion() {
        let (_, forces, connects, _) = run(vec![
            Ok(lines(&["FSR1: 700, FSR2: 700, a"])),
            Err(DeviceError::Open("busy".into())),
            Ok(lines(&["FSR1: 880, FSR2: 880, a"])),
        ]);
        assert_eq!(forces, vec![700, 880]);
        // 1 + (fail, ok) + 3 failing attempts after the second disconnect.
        assert_eq!(connects, 6);
    }

    #[test]
    fn initial_open_failure_counts_as_an_outage() {
        let (exit, forces, connects, status) = run(Vec::new());
        assert_eq!(exit, IngestExit::DeviceLost);
        assert!(forces.is_empty());
        assert_eq!(connects, 4);
        assert_eq!(status, SensorStatus::Manual);
    }

    struct UnpluggedConnector {
        attempts: Vec<std::time::Instant>,
    }

    impl SensorConnector for UnpluggedConnector {
        fn connect(&mut self) -> Result<Box<dyn SensorLink>, DeviceError> {
            self.attempts.push(std::time::Instant::now());
            Err(DeviceError::Open("no such device".into()))
        }

        fn describe(&self) -> String {
            "unplugged".into()
        }
    }

    #[test]
    fn reopen_attempts_are_spaced_by_the_backoff() {
        let backoff = Duration::from_millis(20);
        let settings = IngestSettings {
            reconnect_backoff: backoff,
            ..settings()
        };
        let mut connector = UnpluggedConnector {
            attempts: Vec::new(),
        };
        let (tx, _rx) = mpsc::channel(1);
        let status = SensorStatusCell::default();

        let exit = run_ingest(
            &mut connector,
            &settings,
            &tx,
            &status,
            &CancellationToken::new(),
        );

        assert_eq!(exit, IngestExit::DeviceLost);
        assert_eq!(status.get(), SensorStatus::Manual);
        assert_eq!(connector.attempts.len(), 4);
        for pair in connector.attempts.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= backoff);
        }
    }

    #[test]
    fn cancelled_token_stops_before_sending() {
        let connects = Arc::new(AtomicUsize::new(0));
        let mut connector = ScriptedConnector {
            sessions: vec![Ok(lines(&["FSR1: 900, FSR2: 900, a"]))].into(),
            connects,
        };
        let (tx, mut rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let exit = run_ingest(
            &mut connector,
            &settings(),
            &tx,
            &SensorStatusCell::default(),
            &cancel,
        );
        assert_eq!(exit, IngestExit::Cancelled);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn closed_channel_ends_the_loop() {
        let connects = Arc::new(AtomicUsize::new(0));
        let mut connector = ScriptedConnector {
            sessions: vec![Ok(lines(&["FSR1: 900, FSR2: 900, a"]))].into(),
            connects,
        };
        let (tx, rx) = mpsc::channel(4);
        drop(rx);

        let exit = run_ingest(
            &mut connector,
            &settings(),
            &tx,
            &SensorStatusCell::default(),
            &CancellationToken::new(),
        );
        assert_eq!(exit, IngestExit::ChannelClosed);
    }
}
