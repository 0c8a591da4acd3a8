use std::{env, fs, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::db::is_valid_collection;
use crate::error::ConfigError;
use crate::game::animator::ScoreAnimator;
use crate::game::machine::PunchRules;
use crate::sensor::IngestSettings;

pub const CONFIG_PATH_ENV: &str = "POWERPUNCH_CONFIG";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Local,
    History,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GameConfig {
    pub serial_port: String,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
    pub minimum_threshold: i32,
    pub qualifying_force: i64,
    pub debounce_ms: u64,
    pub result_timeout_secs: u64,
    pub animation_ms: u64,
    pub flash_ms: u64,
    pub flash_count: u32,
    pub reconnect_attempts: u32,
    pub reconnect_backoff_ms: u64,
    pub tick_hz: u32,
    pub store_backend: StoreBackend,
    pub store_url: Option<String>,
    pub collection: String,
    pub high_score_path: PathBuf,
    pub leaderboard_size: usize,
    pub praise_threshold: i64,
    pub audio_enabled: bool,
    pub taunt_clip: Option<PathBuf>,
    pub praise_clip: Option<PathBuf>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            serial_port: "/dev/cu.usbmodem1301".into(),
            baud_rate: 9600,
            read_timeout_ms: 1000,
            minimum_threshold: 305,
            qualifying_force: 650,
            debounce_ms: 500,
            result_timeout_secs: 8,
            animation_ms: 2500,
            flash_ms: 250,
            flash_count: 3,
            reconnect_attempts: 3,
            reconnect_backoff_ms: 2000,
            tick_hz: 30,
            store_backend: StoreBackend::Local,
            store_url: None,
            collection: "punches".into(),
            high_score_path: PathBuf::from("high_scores.json"),
            leaderboard_size: 10,
            praise_threshold: 865,
            audio_enabled: true,
            taunt_clip: Some(PathBuf::from("barbie.mp3")),
            praise_clip: Some(PathBuf::from("cena.mp3")),
        }
    }
}

impl GameConfig {
    /// Defaults, then the JSON file named by `POWERPUNCH_CONFIG`, then the
    /// `POWERPUNCH_*` environment overrides. Validated before returning.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::from_file(PathBuf::from(path))?,
            None => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: PathBuf) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("POWERPUNCH_STORE_URL") {
            self.store_url = Some(url);
        }
        if let Some(backend) = lookup("POWERPUNCH_STORE_BACKEND") {
            self.store_backend = match backend.to_ascii_lowercase().as_str() {
                "local" => StoreBackend::Local,
                "history" => StoreBackend::History,
                other => {
                    return Err(ConfigError::InvalidValue {
                        key: "POWERPUNCH_STORE_BACKEND",
                        reason: format!("unknown backend '{other}'"),
                    })
                }
            };
        }
        if let Some(port) = lookup("POWERPUNCH_SERIAL_PORT") {
            self.serial_port = port;
        }
        if let Some(baud) = lookup("POWERPUNCH_BAUD_RATE") {
            self.baud_rate = baud.parse().map_err(|_| ConfigError::InvalidValue {
                key: "POWERPUNCH_BAUD_RATE",
                reason: format!("'{baud}' is not a number"),
            })?;
        }
        if let Some(path) = lookup("POWERPUNCH_HIGH_SCORE_PATH") {
            self.high_score_path = PathBuf::from(path);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store_backend == StoreBackend::History
            && self.store_url.as_deref().map_or(true, |url| url.trim().is_empty())
        {
            return Err(ConfigError::MissingStoreUrl);
        }
        if !is_valid_collection(&self.collection) {
            return Err(ConfigError::InvalidCollection(self.collection.clone()));
        }
        for (key, value) in [
            ("tick_hz", u64::from(self.tick_hz)),
            ("animation_ms", self.animation_ms),
            ("baud_rate", u64::from(self.baud_rate)),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key,
                    reason: "must be greater than zero".into(),
                });
            }
        }
        Ok(())
    }

    pub fn punch_rules(&self) -> PunchRules {
        PunchRules {
            qualifying_force: self.qualifying_force,
            debounce: Duration::from_millis(self.debounce_ms),
            result_timeout: Duration::from_secs(self.result_timeout_secs),
            praise_threshold: self.praise_threshold,
        }
    }

    pub fn animator(&self) -> ScoreAnimator {
        ScoreAnimator::new(
            Duration::from_millis(self.animation_ms),
            Duration::from_millis(self.flash_ms),
            self.flash_count,
        )
    }

    pub fn ingest_settings(&self) -> IngestSettings {
        IngestSettings {
            minimum_threshold: self.minimum_threshold,
            qualifying_force: self.qualifying_force,
            reconnect_attempts: self.reconnect_attempts,
            reconnect_backoff: Duration::from_millis(self.reconnect_backoff_ms),
        }
    }

    /// One line for the startup log.
    pub fn summary(&self) -> String {
        let backend = match self.store_backend {
            StoreBackend::Local => "local".to_string(),
            StoreBackend::History => format!(
                "history ({}, collection '{}')",
                self.store_url.as_deref().unwrap_or_default(),
                self.collection
            ),
        };
        format!(
            "store: {backend}, high score file: {}, serial: {} @ {} baud, \
             thresholds: minimum {} / qualifying {} / praise {}, debounce {}ms",
            self.high_score_path.display(),
            self.serial_port,
            self.baud_rate,
            self.minimum_threshold,
            self.qualifying_force,
            self.praise_threshold,
            self.debounce_ms,
        )
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(1) / self.tick_hz.max(1)
    }
}
