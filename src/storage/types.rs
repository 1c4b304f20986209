//! Storage record types for SQLite persistence.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{GameId, ResultSet};

/// Latest distinct result set for one game, as handed to the writer
#[derive(Debug, Clone, PartialEq)]
pub struct StoredResult {
    pub game_token: GameId,
    pub label: String,
    pub results: ResultSet,
    /// Wall-clock time of the write, never the feed's own timestamp
    pub observed_at: DateTime<Utc>,
}

impl StoredResult {
    pub fn to_row(&self) -> ResultRow {
        ResultRow {
            gametoken: self.game_token.to_string(),
            arialabel: self.label.clone(),
            initialresults: self.results.to_csv(),
            data: self.observed_at.to_rfc3339_opts(SecondsFormat::Micros, false),
        }
    }
}

/// Row of the `resultados` table in its column representation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRow {
    pub gametoken: String,
    pub arialabel: String,
    pub initialresults: String,
    pub data: String,
}
