pub mod score;

pub use score::ScoreRecord;
