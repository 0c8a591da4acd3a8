use anyhow::{Context, Result};
use rusqlite::{params, Row};
use uuid::Uuid;

use crate::db::{
    helpers::{format_datetime, parse_datetime},
    models::ScoreRecord,
    Database,
};

fn row_to_record(row: &Row) -> Result<ScoreRecord> {
    let timestamp: String = row.get("timestamp")?;
    Ok(ScoreRecord {
        username: row.get("username")?,
        score: row.get("score")?,
        recorded_at: parse_datetime(&timestamp, "timestamp")?,
    })
}

impl Database {
    pub async fn insert_score(&self, record: &ScoreRecord) -> Result<()> {
        let record = record.clone();
        let sql = format!(
            "INSERT INTO {} (id, username, score, timestamp) VALUES (?1, ?2, ?3, ?4)",
            self.collection()
        );
        self.execute(move |conn| {
            conn.execute(
                &sql,
                params![
                    Uuid::new_v4().to_string(),
                    record.username,
                    record.score,
                    format_datetime(&record.recorded_at),
                ],
            )
            .with_context(|| "failed to insert score")?;
            Ok(())
        })
        .await
    }

    /// Highest scores first; equal scores keep the order they were set in.
    pub async fn top_scores(&self, limit: usize) -> Result<Vec<ScoreRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let sql = format!(
            "SELECT username, score, timestamp
             FROM {}
             ORDER BY score DESC, timestamp ASC
             LIMIT ?1",
            self.collection()
        );
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params![limit])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(row_to_record(row)?);
            }
            Ok(records)
        })
        .await
    }

    pub async fn best_for_user(&self, username: &str) -> Result<i64> {
        let username = username.to_string();
        let sql = format!(
            "SELECT MAX(score) FROM {} WHERE username = ?1",
            self.collection()
        );
        self.execute(move |conn| {
            let best: Option<i64> = conn.query_row(&sql, params![username], |row| row.get(0))?;
            Ok(best.unwrap_or(0))
        })
        .await
    }

    pub async fn best_overall(&self) -> Result<i64> {
        let sql = format!("SELECT MAX(score) FROM {}", self.collection());
        self.execute(move |conn| {
            let best: Option<i64> = conn.query_row(&sql, [], |row| row.get(0))?;
            Ok(best.unwrap_or(0))
        })
        .await
    }
}
