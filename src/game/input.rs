/// Everything the input layer can ask of the game. Each variant maps to one
/// state-machine action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    Char(char),
    Backspace,
    ConfirmUsername,
    /// A whole line typed at the name prompt.
    SubmitName(String),
    Continue,
    NewPlayer,
    /// `None` lets the game pick a plausible force.
    SimulatePunch(Option<i64>),
    Quit,
}
