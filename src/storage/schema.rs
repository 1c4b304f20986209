//! Database schema creation.

use rusqlite::{Connection, Result};

/// Create the results table if it does not exist yet.
pub fn create_tables(conn: &Connection) -> Result<()> {
    // One row per game: latest distinct result set only
    conn.execute(
        "CREATE TABLE IF NOT EXISTS resultados (
            gametoken TEXT PRIMARY KEY,
            arialabel TEXT,
            initialresults TEXT,
            data TEXT
        )",
        [],
    )?;

    Ok(())
}
