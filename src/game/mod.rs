pub mod animator;
pub mod controller;
pub mod input;
pub mod machine;
pub mod state;
pub mod ticker;
pub mod verdict;

pub use controller::{GameController, GameSnapshot, Leaderboard};
pub use input::UserInput;
pub use machine::{PunchOutcome, PunchRules, PunchStateMachine};
pub use state::{Phase, PunchEvent, PunchSource};
pub use ticker::{run_game_loop, Renderer};
