//! Non-blocking SQLite writer using a dedicated thread and mpsc channel.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use rusqlite::Connection;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use super::schema::create_tables;
use super::types::StoredResult;
use crate::error::{IngestError, IngestResult};

/// Upper bound on upserts committed in one transaction
const BATCH_SIZE: usize = 100;

/// Acknowledgement for one upsert, sent after its transaction commits
type UpsertAck = oneshot::Sender<IngestResult<()>>;

/// Messages sent to the storage writer thread.
pub enum StorageMessage {
    /// Insert or replace the row for one game
    Upsert { record: StoredResult, ack: UpsertAck },
    /// Commit everything pending, then acknowledge
    Flush(oneshot::Sender<()>),
    /// Graceful shutdown
    Shutdown,
}

/// Channel handle for sending storage messages (non-blocking).
#[derive(Clone)]
pub struct StorageChannel {
    tx: Sender<StorageMessage>,
}

impl StorageChannel {
    /// Queue an upsert and wait until it is committed.
    ///
    /// Fails if the writer thread is gone or SQLite rejected the row.
    pub async fn record_result(&self, record: StoredResult) -> IngestResult<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(StorageMessage::Upsert { record, ack: ack_tx })
            .map_err(|_| IngestError::Storage("storage writer is not running".to_string()))?;
        ack_rx
            .await
            .map_err(|_| IngestError::Storage("storage writer exited before committing".to_string()))?
    }

    /// Wait until every previously queued upsert has been committed.
    pub async fn flush(&self) -> IngestResult<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(StorageMessage::Flush(ack_tx))
            .map_err(|_| IngestError::Storage("storage writer is not running".to_string()))?;
        ack_rx
            .await
            .map_err(|_| IngestError::Storage("storage writer exited before flushing".to_string()))
    }

    /// Request graceful shutdown.
    pub fn shutdown(&self) {
        let _ = self.tx.send(StorageMessage::Shutdown);
    }
}

/// Open the database, create tables and spawn the writer thread.
///
/// Returns a `StorageChannel` that can be cloned and shared across tasks.
pub fn create_storage_channel(db_path: &str) -> rusqlite::Result<StorageChannel> {
    let conn = Connection::open(db_path)?;
    create_tables(&conn)?;
    info!("[STORAGE] Database initialized at {}", db_path);

    let (tx, rx) = mpsc::channel();

    // Dedicated writer thread (isolated from async runtime)
    thread::spawn(move || {
        storage_writer_loop(rx, conn);
    });

    Ok(StorageChannel { tx })
}

/// Main writer loop running in a dedicated thread.
///
/// Blocks for the next message, drains whatever else is queued, then commits
/// the batch so no caller waits on a timer.
fn storage_writer_loop(rx: Receiver<StorageMessage>, conn: Connection) {
    let mut batch: Vec<(StoredResult, UpsertAck)> = Vec::with_capacity(BATCH_SIZE);

    while let Ok(first) = rx.recv() {
        let mut next = Some(first);
        while let Some(msg) = next.take() {
            match msg {
                StorageMessage::Upsert { record, ack } => {
                    batch.push((record, ack));
                    if batch.len() >= BATCH_SIZE {
                        flush_batch(&conn, &mut batch);
                    }
                }
                StorageMessage::Flush(ack) => {
                    flush_batch(&conn, &mut batch);
                    let _ = ack.send(());
                }
                StorageMessage::Shutdown => {
                    flush_batch(&conn, &mut batch);
                    info!("[STORAGE] Writer shutdown complete");
                    return;
                }
            }
            next = rx.try_recv().ok();
        }
        flush_batch(&conn, &mut batch);
    }

    info!("[STORAGE] Channel disconnected, writer exiting");
}

/// Flush a batch of upserts to the database in a single transaction and
/// acknowledge each one with its own outcome.
fn flush_batch(conn: &Connection, batch: &mut Vec<(StoredResult, UpsertAck)>) {
    if batch.is_empty() {
        return;
    }

    let tx = match conn.unchecked_transaction() {
        Ok(t) => t,
        Err(e) => {
            error!("[STORAGE] Failed to start transaction, rejecting {} upserts: {}", batch.len(), e);
            for (_, ack) in batch.drain(..) {
                let _ = ack.send(Err(IngestError::Storage(format!("transaction failed: {}", e))));
            }
            return;
        }
    };

    let mut outcomes = Vec::with_capacity(batch.len());
    for (record, ack) in batch.drain(..) {
        let result = upsert_result(&tx, &record).map_err(|e| {
            warn!("[STORAGE] Failed to upsert result for {}: {}", record.game_token, e);
            IngestError::Storage(format!("upsert failed: {}", e))
        });
        outcomes.push((ack, result));
    }

    match tx.commit() {
        Ok(()) => {
            let written = outcomes.iter().filter(|(_, r)| r.is_ok()).count();
            if written > 0 {
                info!("[STORAGE] Committed {} result upserts", written);
            }
            for (ack, result) in outcomes {
                let _ = ack.send(result);
            }
        }
        Err(e) => {
            error!("[STORAGE] Failed to commit transaction: {}", e);
            for (ack, _) in outcomes {
                let _ = ack.send(Err(IngestError::Storage(format!("commit failed: {}", e))));
            }
        }
    }
}

/// Insert or replace one game's row.
pub fn upsert_result(conn: &Connection, record: &StoredResult) -> rusqlite::Result<()> {
    let row = record.to_row();
    conn.execute(
        "INSERT OR REPLACE INTO resultados (gametoken, arialabel, initialresults, data)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![row.gametoken, row.arialabel, row.initialresults, row.data],
    )?;
    Ok(())
}
