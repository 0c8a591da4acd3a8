//! Score persistence behind one interface.
//!
//! `Local` keeps only the running maximum in a JSON file. `History` keeps every
//! punch in SQLite and still maintains the JSON file as an offline cache, so
//! the high score survives the history store going away.

pub mod local;

use chrono::{DateTime, Utc};
use log::{error, info, warn};

use crate::db::{self, Database, ScoreRecord};
use crate::error::StoreError;
use crate::settings::{GameConfig, StoreBackend};

pub use local::LocalFileStore;

pub enum ScoreStore {
    Local(LocalFileStore),
    History { db: Database, cache: LocalFileStore },
}

impl ScoreStore {
    /// Picks the backend once. A history store that cannot be opened is not
    /// fatal; the game runs local-only.
    pub fn open(config: &GameConfig) -> Self {
        let cache = LocalFileStore::open(&config.high_score_path);

        match (config.store_backend, config.store_url.as_deref()) {
            (StoreBackend::History, Some(url)) => {
                match Database::new(db::path_from_url(url), &config.collection) {
                    Ok(db) => {
                        info!("Using score history store at {url}");
                        ScoreStore::History { db, cache }
                    }
                    Err(err) => {
                        warn!("Score history store unavailable, running local-only: {err:#}");
                        ScoreStore::Local(cache)
                    }
                }
            }
            _ => {
                info!(
                    "Using local high score file {}",
                    config.high_score_path.display()
                );
                ScoreStore::Local(cache)
            }
        }
    }

    pub fn has_history(&self) -> bool {
        matches!(self, ScoreStore::History { .. })
    }

    fn cache(&self) -> &LocalFileStore {
        match self {
            ScoreStore::Local(cache) | ScoreStore::History { cache, .. } => cache,
        }
    }

    /// Updates the local cache first so it stays current even when the
    /// history write fails.
    pub async fn record(
        &self,
        username: &str,
        score: i64,
        recorded_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        match self {
            ScoreStore::Local(cache) => cache.record(score).map(|_| ()),
            ScoreStore::History { db, cache } => {
                if let Err(err) = cache.record(score) {
                    error!("Failed to update high score cache: {err}");
                }
                db.insert_score(&ScoreRecord::new(username, score, recorded_at))
                    .await
                    .map_err(StoreError::Query)
            }
        }
    }

    /// Empty when there is no history store.
    pub async fn top_n(&self, n: usize) -> Result<Vec<ScoreRecord>, StoreError> {
        match self {
            ScoreStore::Local(_) => Ok(Vec::new()),
            ScoreStore::History { db, .. } => db.top_scores(n).await.map_err(StoreError::Query),
        }
    }

    pub async fn user_best(&self, username: &str) -> Result<i64, StoreError> {
        match self {
            ScoreStore::Local(_) => Ok(0),
            ScoreStore::History { db, .. } => db
                .best_for_user(username)
                .await
                .map_err(StoreError::Query),
        }
    }

    /// `max(local cache, history max)`; a failing history query degrades to
    /// the cached value.
    pub async fn overall_best(&self) -> i64 {
        let cached = self.cache().high_score();
        match self {
            ScoreStore::Local(_) => cached,
            ScoreStore::History { db, .. } => match db.best_overall().await {
                Ok(best) => best.max(cached),
                Err(err) => {
                    warn!("High score query failed, using cached {cached}: {err:#}");
                    cached
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use uuid::Uuid;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("powerpunch-test-{}", Uuid::new_v4()))
    }

    fn config(dir: &PathBuf, backend: StoreBackend, url: Option<String>) -> GameConfig {
        GameConfig {
            store_backend: backend,
            store_url: url,
            high_score_path: dir.join("high_scores.json"),
            ..GameConfig::default()
        }
    }

    #[tokio::test]
    async fn local_backend_tracks_only_the_maximum() {
        let dir = temp_dir();
        let store = ScoreStore::open(&config(&dir, StoreBackend::Local, None));
        assert!(!store.has_history());

        store.record("Rocky", 725, Utc::now()).await.unwrap();
        store.record("Mia", 690, Utc::now()).await.unwrap();

        assert_eq!(store.overall_best().await, 725);
        assert!(store.top_n(10).await.unwrap().is_empty());
        assert_eq!(store.user_best("Rocky").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn history_backend_keeps_every_punch_and_the_cache() {
        let dir = temp_dir();
        let url = format!("sqlite://{}", dir.join("scores.sqlite3").display());
        let cfg = config(&dir, StoreBackend::History, Some(url));
        let store = ScoreStore::open(&cfg);
        assert!(store.has_history());

        store.record("Rocky", 725, Utc::now()).await.unwrap();
        store.record("Rocky", 880, Utc::now()).await.unwrap();
        store.record("Mia", 700, Utc::now()).await.unwrap();

        let top = store.top_n(10).await.unwrap();
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].score, 880);
        assert_eq!(store.user_best("Rocky").await.unwrap(), 880);
        assert_eq!(store.overall_best().await, 880);
        assert_eq!(LocalFileStore::open(&cfg.high_score_path).high_score(), 880);
    }

    #[tokio::test]
    async fn overall_best_reconciles_with_a_higher_cache() {
        let dir = temp_dir();
        let cache_path = dir.join("high_scores.json");
        LocalFileStore::open(&cache_path).record(990).unwrap();

        let url = dir.join("scores.sqlite3").display().to_string();
        let store = ScoreStore::open(&config(&dir, StoreBackend::History, Some(url)));
        store.record("Mia", 700, Utc::now()).await.unwrap();

        assert_eq!(store.overall_best().await, 990);
    }

    #[tokio::test]
    async fn unopenable_history_falls_back_to_local() {
        let dir = temp_dir();
        std::fs::create_dir_all(&dir).unwrap();
        // A directory where the database file should be cannot be opened.
        let url = dir.display().to_string();
        let store = ScoreStore::open(&config(&dir, StoreBackend::History, Some(url)));

        assert!(!store.has_history());
        store.record("Rocky", 700, Utc::now()).await.unwrap();
        assert_eq!(store.overall_best().await, 700);
    }
}
