//! Dedup & persistence gate.
//!
//! Remembers the last result set written per game for the lifetime of the
//! process and forwards only changes to the store.

use chrono::Utc;
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::config::GameTable;
use crate::error::IngestResult;
use crate::storage::{ResultRow, StorageChannel, StoredResult};
use crate::types::{GameId, GateOutcome, ResultSet};

pub struct DedupGate {
    games: GameTable,
    storage: StorageChannel,
    last_seen: FxHashMap<GameId, ResultSet>,
}

impl DedupGate {
    pub fn new(games: GameTable, storage: StorageChannel) -> Self {
        Self {
            games,
            storage,
            last_seen: FxHashMap::default(),
        }
    }

    /// Pre-populate last-seen from rows already in the store.
    ///
    /// Rows whose `initialresults` column does not parse are skipped, so the
    /// first read for that game is treated as a change.
    pub fn seed<'a>(&mut self, rows: impl IntoIterator<Item = &'a ResultRow>) -> usize {
        let mut seeded = 0;
        for row in rows {
            match ResultSet::from_csv(&row.initialresults) {
                Some(results) => {
                    self.last_seen.insert(GameId::new(&row.gametoken), results);
                    seeded += 1;
                }
                None => warn!(
                    "[GATE] Ignoring unparsable stored results for {}: {:?}",
                    row.gametoken, row.initialresults
                ),
            }
        }
        seeded
    }

    /// Compare against last-seen and upsert on change.
    ///
    /// Last-seen is only advanced once the row is committed, so a rejected
    /// write is retried on the next identical read.
    pub async fn apply(&mut self, game: &GameId, results: ResultSet) -> IngestResult<GateOutcome> {
        if self.last_seen.get(game) == Some(&results) {
            debug!("[GATE] {} unchanged {}", game, results);
            return Ok(GateOutcome::Unchanged);
        }

        let record = StoredResult {
            game_token: game.clone(),
            label: self.games.label(game),
            results: results.clone(),
            observed_at: Utc::now(),
        };
        self.storage.record_result(record).await?;

        info!("[GATE] {} new results {}", game, results);
        self.last_seen.insert(game.clone(), results);
        Ok(GateOutcome::Written)
    }

    pub fn last_seen(&self, game: &GameId) -> Option<&ResultSet> {
        self.last_seen.get(game)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IngestError;
    use crate::storage::{create_storage_channel, ResultReader};

    fn setup() -> (tempfile::TempDir, String, DedupGate) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gate.db").to_str().unwrap().to_string();
        let storage = create_storage_channel(&path).unwrap();
        let gate = DedupGate::new(GameTable::default(), storage);
        (dir, path, gate)
    }

    #[tokio::test]
    async fn test_first_observation_is_written() {
        let (_dir, path, mut gate) = setup();
        let game = GameId::new("PorROU0000000001");

        let outcome = gate.apply(&game, ResultSet::new(vec![14, 0, 32])).await.unwrap();
        assert_eq!(outcome, GateOutcome::Written);

        let row = ResultReader::new(&path).fetch_one("PorROU0000000001").unwrap().unwrap();
        assert_eq!(row.arialabel, "Roleta Ao Vivo");
        assert_eq!(row.initialresults, "14,0,32");
    }

    #[tokio::test]
    async fn test_repeats_produce_single_write() {
        let (_dir, path, mut gate) = setup();
        let game = GameId::new("PorROU0000000001");
        let results = ResultSet::new(vec![3, 26, 0]);

        let mut outcomes = Vec::new();
        for _ in 0..5 {
            outcomes.push(gate.apply(&game, results.clone()).await.unwrap());
        }
        assert_eq!(outcomes[0], GateOutcome::Written);
        assert!(outcomes[1..].iter().all(|o| *o == GateOutcome::Unchanged));

        let rows = ResultReader::new(&path).fetch_all().unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_written_exactly_on_change() {
        let (_dir, path, mut gate) = setup();
        let game = GameId::new("7x0b1tgh7agmf6hv");
        let a = ResultSet::new(vec![1, 2, 3]);
        let b = ResultSet::new(vec![4, 1, 2]);

        let sequence = [a.clone(), a.clone(), b.clone(), b.clone(), a.clone()];
        let mut outcomes = Vec::new();
        for rs in &sequence {
            outcomes.push(gate.apply(&game, rs.clone()).await.unwrap());
        }
        assert_eq!(
            outcomes,
            vec![
                GateOutcome::Written,
                GateOutcome::Unchanged,
                GateOutcome::Written,
                GateOutcome::Unchanged,
                GateOutcome::Written,
            ]
        );

        let row = ResultReader::new(&path).fetch_one("7x0b1tgh7agmf6hv").unwrap().unwrap();
        assert_eq!(row.initialresults, "1,2,3");
        assert_eq!(row.arialabel, "Immersive Roulette");
    }

    #[tokio::test]
    async fn test_games_are_tracked_independently() {
        let (_dir, _path, mut gate) = setup();
        let results = ResultSet::new(vec![9]);

        assert_eq!(gate.apply(&GameId::new("a"), results.clone()).await.unwrap(), GateOutcome::Written);
        assert_eq!(gate.apply(&GameId::new("b"), results.clone()).await.unwrap(), GateOutcome::Written);
        assert_eq!(gate.apply(&GameId::new("a"), results).await.unwrap(), GateOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_seed_makes_identical_read_unchanged() {
        let (_dir, _path, mut gate) = setup();
        let rows = vec![
            ResultRow {
                gametoken: "g1".into(),
                arialabel: "X".into(),
                initialresults: "5,6".into(),
                data: String::new(),
            },
            ResultRow {
                gametoken: "g2".into(),
                arialabel: "Y".into(),
                initialresults: "bogus".into(),
                data: String::new(),
            },
        ];
        assert_eq!(gate.seed(&rows), 1);
        assert_eq!(
            gate.apply(&GameId::new("g1"), ResultSet::new(vec![5, 6])).await.unwrap(),
            GateOutcome::Unchanged
        );
        assert_eq!(
            gate.apply(&GameId::new("g2"), ResultSet::new(vec![5, 6])).await.unwrap(),
            GateOutcome::Written
        );
    }

    #[tokio::test]
    async fn test_failed_write_does_not_advance_last_seen() {
        let (_dir, _path, mut gate) = setup();
        let game = GameId::new("g1");

        gate.storage.shutdown();
        // Wait for the writer thread to exit
        let _ = gate.storage.flush().await;

        assert!(gate.apply(&game, ResultSet::new(vec![1])).await.is_err());
        assert!(gate.last_seen(&game).is_none());
    }

    #[tokio::test]
    async fn test_rejected_commit_is_retried_on_next_read() {
        let (_dir, path, mut gate) = setup();
        let game = GameId::new("PorROU0000000001");
        let results = ResultSet::new(vec![14, 0, 32]);

        let other = rusqlite::Connection::open(&path).unwrap();
        other.execute("DROP TABLE resultados", []).unwrap();

        assert!(matches!(
            gate.apply(&game, results.clone()).await,
            Err(IngestError::Storage(_))
        ));
        assert!(gate.last_seen(&game).is_none());

        crate::storage::schema::create_tables(&other).unwrap();
        assert_eq!(gate.apply(&game, results.clone()).await.unwrap(), GateOutcome::Written);
        assert_eq!(gate.last_seen(&game), Some(&results));

        let row = ResultReader::new(&path).fetch_one("PorROU0000000001").unwrap().unwrap();
        assert_eq!(row.initialresults, "14,0,32");
    }
}
