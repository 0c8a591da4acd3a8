//! Line-oriented player input. One line from stdin becomes one or more
//! `UserInput`s; the state machine ignores whatever does not apply to the
//! current phase.

use std::io::{self, BufRead};
use std::thread;

use log::{debug, warn};
use thiserror::Error;
use tokio::sync::mpsc::Sender;

use crate::game::UserInput;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command '{0}' (try /punch, /new, /continue or /quit)")]
    Unknown(String),
    #[error("'{0}' is not a whole-number force")]
    InvalidForce(String),
}

/// `/quit`, `/new`, `/continue`, `/punch [force]`. An empty line continues
/// from the result screen; anything else is submitted whole as a name, so an
/// over-long one is refused rather than cut short.
pub fn parse_command(line: &str) -> Result<Vec<UserInput>, CommandError> {
    let trimmed = line.trim();

    if trimmed.is_empty() {
        return Ok(vec![UserInput::Continue]);
    }

    if let Some(command) = trimmed.strip_prefix('/') {
        let mut parts = command.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let input = match name {
            "quit" | "q" => UserInput::Quit,
            "new" => UserInput::NewPlayer,
            "continue" => UserInput::Continue,
            "punch" => match parts.next() {
                Some(raw) => UserInput::SimulatePunch(Some(
                    raw.parse()
                        .map_err(|_| CommandError::InvalidForce(raw.to_string()))?,
                )),
                None => UserInput::SimulatePunch(None),
            },
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        return Ok(vec![input]);
    }

    Ok(vec![UserInput::SubmitName(trimmed.to_string())])
}

/// Forwards parsed lines until the reader is exhausted or the game stops
/// listening.
pub fn pump_lines<B: BufRead>(reader: B, tx: &Sender<UserInput>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                warn!("Failed to read input: {err}");
                return;
            }
        };
        let inputs = match parse_command(&line) {
            Ok(inputs) => inputs,
            Err(err) => {
                warn!("{err}");
                continue;
            }
        };
        for input in inputs {
            if tx.blocking_send(input).is_err() {
                debug!("Input channel closed");
                return;
            }
        }
    }
    debug!("Input reached end of file");
}

pub fn spawn_stdin_reader(tx: Sender<UserInput>) -> io::Result<()> {
    thread::Builder::new()
        .name("powerpunch-input".into())
        .spawn(move || pump_lines(io::stdin().lock(), &tx))
        .map(|_| ())
}
