//! System configuration, game table and environment variable parsing.
//!
//! Constants describe the feed protocol; everything operational comes from
//! the environment (optionally via `.env`) with the defaults below.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::types::{title_case, GameId};

/// Placeholder substituted with the game identifier in feed URL templates
pub const GAME_ID_PLACEHOLDER: &str = "{id_roleta}";

/// Directory table holding candidate feed URLs
pub const DIRECTORY_TABLE: &str = "websocketurl";

/// Provider tag the directory records are filtered on
pub const DEFAULT_PROVIDER_TAG: &str = "evolution";

/// Feed message type carrying recent results
pub const RECENT_RESULTS_TYPE: &str = "roulette.recentResults";

/// Feed message type signalling a forced disconnect
pub const KICKOUT_TYPE: &str = "connection.kickout";

/// Maximum number of outcomes kept per result set
pub const MAX_RESULTS: usize = 10;

/// Separator between an outcome and its annotation (e.g. "14x2")
pub const RESULT_DELIMITER: char = 'x';

/// Label used for identifiers missing from the label table
pub const DEFAULT_LABEL: &str = "Aria Label Padrão";

/// SQLite database path
pub const DEFAULT_DB_PATH: &str = "roletas.db";

/// Sleep between polling passes (seconds)
pub const POLL_INTERVAL_SECS: u64 = 1;

/// Sleep in BackoffAndRetry before resolving again (seconds)
pub const RETRY_DELAY_SECS: u64 = 1;

/// Connect/receive timeout for feed connections (seconds, 0 = none)
pub const FEED_TIMEOUT_SECS: u64 = 30;

/// Consecutive all-failed passes before the endpoint is considered unusable
pub const MAX_FAILED_PASSES: u32 = 3;

/// Default listen address for the query API
pub const DEFAULT_API_BIND: &str = "0.0.0.0:5000";

const BUILTIN_POLL: &[&str] = &["PorROU0000000001"];

const BUILTIN_LABELS: &[(&str, &str)] = &[
    ("PorROU0000000001", "ROLETA AO VIVO"),
    ("7x0b1tgh7agmf6hv", "IMMERSIVE ROULETTE"),
    ("vctlz20yfnmp1ylr", "ROULETTE"),
    ("48z5pjps3ntvqc1b", "AUTO ROULETTE"),
    ("lkcbrbdckjxajdol", "SPEED ROULETTE"),
    ("wzg6kdkad1oe7m5k", "VIP ROULETTE"),
    ("01rb77cq1gtenhmo", "AUTO ROULETTE VIP"),
    ("DoubleBallRou001", "DOUBLE BALL ROULETTE"),
    ("f1f4rm9xgh4j3u2z", "AUTO ROULETTE LA PARTAGE"),
    ("7nyiaws9tgqrzaz3", "FOOTBALL STUDIO ROULETTE"),
    ("lr6t4k3lcd4qgyrk", "GRAND CASINO ROULETTE"),
    ("mrpuiwhx5slaurcy", "Hippodrome Grand Casino"),
    ("mvrcophqscoqosd6", "CASINO MALTA ROULETTE"),
    ("RedDoorRoulette1", "Red Door Roulette"),
    ("AmericanTable001", "American Roulette"),
    ("SpeedAutoRo00001", "Speed Auto Roulette"),
    ("p675txa7cdt6za26", "Roulette in Spanish"),
];

/// Immutable table of polled identifiers and their labels.
///
/// `poll` is the allowlist in iteration order; `labels` may name more
/// identifiers than are polled.
#[derive(Debug, Clone)]
pub struct GameTable {
    poll: Vec<GameId>,
    labels: HashMap<GameId, String>,
}

#[derive(Debug, Deserialize)]
struct GameTableFile {
    poll: Vec<String>,
    #[serde(default)]
    labels: HashMap<String, String>,
}

impl GameTable {
    pub fn new(poll: Vec<GameId>, labels: HashMap<GameId, String>) -> Self {
        Self { poll, labels }
    }

    /// Parse a games table from its JSON form:
    /// `{"poll": ["id", ...], "labels": {"id": "LABEL", ...}}`
    pub fn from_json(text: &str) -> Result<Self> {
        let file: GameTableFile =
            serde_json::from_str(text).context("Invalid games table JSON")?;
        Ok(Self {
            poll: file.poll.iter().map(GameId::new).collect(),
            labels: file
                .labels
                .into_iter()
                .map(|(k, v)| (GameId::new(k), v))
                .collect(),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read games table {}", path.display()))?;
        Self::from_json(&text)
    }

    pub fn poll(&self) -> &[GameId] {
        &self.poll
    }

    /// Display label for a game, title-cased, falling back to [`DEFAULT_LABEL`].
    pub fn label(&self, game: &GameId) -> String {
        let raw = self.labels.get(game).map(String::as_str).unwrap_or(DEFAULT_LABEL);
        title_case(raw)
    }
}

impl Default for GameTable {
    fn default() -> Self {
        Self {
            poll: BUILTIN_POLL.iter().map(|s| GameId::new(s)).collect(),
            labels: BUILTIN_LABELS
                .iter()
                .map(|(k, v)| (GameId::new(k), v.to_string()))
                .collect(),
        }
    }
}

/// Credentials and address of the endpoint directory
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub provider_tag: String,
}

impl DirectoryConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: non_empty_env("SUPABASE_URL"),
            api_key: non_empty_env("SUPABASE_KEY"),
            provider_tag: non_empty_env("DIRECTORY_PROVIDER")
                .unwrap_or_else(|| DEFAULT_PROVIDER_TAG.to_string()),
        }
    }
}

/// Everything the ingestion supervisor needs
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub directory: DirectoryConfig,
    pub db_path: String,
    pub games: GameTable,
    pub poll_interval: Duration,
    pub retry_delay: Duration,
    /// `None` leaves connect/receive bounded only by the transport.
    pub feed_timeout: Option<Duration>,
    pub max_failed_passes: u32,
    pub seed_from_store: bool,
}

impl IngestConfig {
    pub fn from_env() -> Result<Self> {
        let games = match non_empty_env("GAMES_FILE") {
            Some(path) => GameTable::load(Path::new(&path))?,
            None => GameTable::default(),
        };
        if games.poll().is_empty() {
            anyhow::bail!("Games table has no identifiers to poll");
        }

        let feed_timeout_secs = env_parse("FEED_TIMEOUT_SECS", FEED_TIMEOUT_SECS);

        Ok(Self {
            directory: DirectoryConfig::from_env(),
            db_path: db_path_from_env(),
            games,
            poll_interval: Duration::from_secs(env_parse("POLL_INTERVAL_SECS", POLL_INTERVAL_SECS)),
            retry_delay: Duration::from_secs(env_parse("RETRY_DELAY_SECS", RETRY_DELAY_SECS)),
            feed_timeout: (feed_timeout_secs > 0).then(|| Duration::from_secs(feed_timeout_secs)),
            max_failed_passes: env_parse("MAX_FAILED_PASSES", MAX_FAILED_PASSES).max(1),
            seed_from_store: env_flag("SEED_FROM_STORE"),
        })
    }
}

/// SQLite path shared by both binaries (set SQLITE_DB_PATH to override)
pub fn db_path_from_env() -> String {
    non_empty_env("SQLITE_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string())
}

/// Query API listen address (set API_BIND to override)
pub fn api_bind_from_env() -> String {
    non_empty_env("API_BIND").unwrap_or_else(|| DEFAULT_API_BIND.to_string())
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(false)
}
