pub mod console;
pub mod input;

pub use console::ConsoleRenderer;
pub use input::spawn_stdin_reader;
