//! One row per accepted punch. Rows are only ever inserted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    pub username: String,
    pub score: i64,
    pub recorded_at: DateTime<Utc>,
}

impl ScoreRecord {
    pub fn new(username: impl Into<String>, score: i64, recorded_at: DateTime<Utc>) -> Self {
        Self {
            username: username.into(),
            score,
            recorded_at,
        }
    }
}
