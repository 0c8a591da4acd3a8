use std::io::Write;

use log::warn;

use crate::game::animator::{AnimationFrame, FlashColor};
use crate::game::{GameSnapshot, Phase, Renderer};
use crate::sensor::SensorStatus;

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";
const GOLD: &str = "\x1b[1;33m";
const WHITE: &str = "\x1b[1;97m";
const RESET: &str = "\x1b[0m";
const RULE: &str = "----------------------------------------";

fn sensor_label(status: SensorStatus) -> &'static str {
    match status {
        SensorStatus::Connecting => "connecting",
        SensorStatus::Live => "live",
        SensorStatus::Reconnecting => "reconnecting",
        SensorStatus::Manual => "offline (use /punch)",
    }
}

fn score_line(frame: AnimationFrame) -> String {
    match frame {
        AnimationFrame::Counting { value, progress } => {
            format!("   {value}   ({:.0}%)", progress * 100.0)
        }
        AnimationFrame::Flash { value, color, .. } => {
            let tint = match color {
                FlashColor::Gold => GOLD,
                FlashColor::White => WHITE,
            };
            format!(" * {tint}{value}{RESET} *")
        }
        AnimationFrame::Done { value } => format!("   {value}"),
    }
}

/// Whole-screen text for one snapshot. Identical snapshots give identical
/// text, which is what lets the console skip redundant redraws.
pub fn render(snapshot: &GameSnapshot) -> String {
    let mut lines = vec![
        format!("POWER PUNCH    sensor: {}", sensor_label(snapshot.sensor)),
        RULE.to_string(),
    ];

    match snapshot.phase {
        Phase::UsernameInput => {
            lines.push(format!("Enter your name: {}", snapshot.username));
        }
        Phase::Listening => {
            lines.push(format!("{}, hit the pad!", snapshot.username));
            if snapshot.sensor == SensorStatus::Manual {
                lines.push("Sensor offline: type /punch [force]".into());
            }
        }
        Phase::Animating => {
            lines.push(format!("{} punched...", snapshot.username));
            if let Some(frame) = snapshot.frame {
                lines.push(score_line(frame));
            }
        }
        Phase::ResultDisplay => {
            if let Some(result) = &snapshot.result {
                lines.push(format!("{} scored {}", result.username, result.score));
                if result.new_high_score {
                    lines.push(format!("{GOLD}NEW HIGH SCORE!{RESET}"));
                }
                lines.push(format!("\"{}\"", result.verdict.line));
            }
            let remaining = snapshot
                .result_timeout
                .saturating_sub(snapshot.time_in_phase)
                .as_secs();
            lines.push(format!(
                "Next player in {remaining}s (Enter to continue, /new to switch)"
            ));
        }
    }

    if let Some(notice) = &snapshot.notice {
        lines.push(format!("! {notice}"));
    }

    let board = &snapshot.leaderboard;
    lines.push(RULE.to_string());
    lines.push(format!("High score: {}", board.overall_best));
    if let Some(player) = &board.player {
        lines.push(format!("{player}'s best: {}", board.player_best));
    }
    for (rank, entry) in board.entries.iter().enumerate() {
        lines.push(format!("{:>2}. {:<20} {:>5}", rank + 1, entry.username, entry.score));
    }

    lines.join("\n")
}

/// Redraws the terminal only when the rendered text changes.
pub struct ConsoleRenderer<W: Write + Send> {
    out: W,
    last: Option<String>,
}

impl<W: Write + Send> ConsoleRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out, last: None }
    }
}

impl ConsoleRenderer<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> Renderer for ConsoleRenderer<W> {
    fn draw(&mut self, snapshot: &GameSnapshot) {
        let text = render(snapshot);
        if self.last.as_deref() == Some(text.as_str()) {
            return;
        }
        let result = write!(self.out, "{CLEAR_SCREEN}{text}\n> ").and_then(|_| self.out.flush());
        if let Err(err) = result {
            warn!("Failed to draw frame: {err}");
        }
        self.last = Some(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ScoreRecord;
    use crate::game::state::PunchResult;
    use crate::game::verdict::{Tier, Verdict};
    use crate::game::Leaderboard;
    use chrono::Utc;
    use std::time::Duration;

    fn snapshot(phase: Phase) -> GameSnapshot {
        GameSnapshot {
            phase,
            username: "Rocky".into(),
            frame: None,
            result: None,
            leaderboard: Leaderboard::default(),
            sensor: SensorStatus::Live,
            notice: None,
            time_in_phase: Duration::ZERO,
            result_timeout: Duration::from_secs(8),
        }
    }

    #[test]
    fn name_prompt_shows_the_draft() {
        let text = render(&snapshot(Phase::UsernameInput));
        assert!(text.contains("Enter your name: Rocky"));
        assert!(text.contains("sensor: live"));
    }

    #[test]
    fn manual_mode_hint_only_while_listening() {
        let mut snap = snapshot(Phase::Listening);
        snap.sensor = SensorStatus::Manual;
        assert!(render(&snap).contains("type /punch"));

        snap.sensor = SensorStatus::Live;
        assert!(!render(&snap).contains("type /punch"));
    }

    #[test]
    fn counting_then_flash() {
        let mut snap = snapshot(Phase::Animating);
        snap.frame = Some(AnimationFrame::Counting {
            value: 312,
            progress: 0.4,
        });
        let text = render(&snap);
        assert!(text.contains("   312"));
        assert!(text.contains("(40%)"));

        snap.frame = Some(AnimationFrame::Flash {
            value: 725,
            index: 0,
            color: FlashColor::Gold,
        });
        assert!(render(&snap).contains(&format!("{GOLD}725{RESET}")));
    }

    #[test]
    fn result_screen_counts_down() {
        let mut snap = snapshot(Phase::ResultDisplay);
        snap.result = Some(PunchResult {
            username: "Rocky".into(),
            score: 725,
            verdict: Verdict {
                tier: Tier::Taunt,
                line: "You call that a punch?",
            },
            new_high_score: true,
        });
        snap.time_in_phase = Duration::from_millis(2500);

        let text = render(&snap);
        assert!(text.contains("Rocky scored 725"));
        assert!(text.contains("NEW HIGH SCORE!"));
        assert!(text.contains("You call that a punch?"));
        assert!(text.contains("Next player in 5s"));
    }

    #[test]
    fn leaderboard_lists_entries_in_order() {
        let mut snap = snapshot(Phase::Listening);
        snap.leaderboard = Leaderboard {
            entries: vec![
                ScoreRecord::new("Ivan", 990, Utc::now()),
                ScoreRecord::new("Rocky", 725, Utc::now()),
            ],
            overall_best: 990,
            player: Some("Rocky".into()),
            player_best: 725,
        };
        let text = render(&snap);
        assert!(text.contains("High score: 990"));
        assert!(text.contains("Rocky's best: 725"));
        let ivan = text.find("Ivan").unwrap();
        let rocky = text.rfind("Rocky").unwrap();
        assert!(ivan < rocky);
    }

    #[test]
    fn unchanged_frames_are_not_redrawn() {
        let mut console = ConsoleRenderer::new(Vec::new());
        let snap = snapshot(Phase::UsernameInput);
        console.draw(&snap);
        let after_first = console.out.len();
        console.draw(&snap);
        assert_eq!(console.out.len(), after_first);

        let mut changed = snap.clone();
        changed.username.push('!');
        console.draw(&changed);
        assert!(console.out.len() > after_first);
    }
}
