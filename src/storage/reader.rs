//! Read-side access to the results table, used by the query API and by
//! optional dedup seeding.

use rusqlite::{Connection, OptionalExtension, Result, Row};

use super::schema::create_tables;
use super::types::ResultRow;

/// Opens a fresh connection per call; rows are independent so no
/// cross-call consistency is needed.
#[derive(Debug, Clone)]
pub struct ResultReader {
    db_path: String,
}

impl ResultReader {
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)?;
        create_tables(&conn)?;
        Ok(conn)
    }

    /// All rows, ordered by game token.
    pub fn fetch_all(&self) -> Result<Vec<ResultRow>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT gametoken, arialabel, initialresults, data FROM resultados ORDER BY gametoken",
        )?;
        let rows = stmt.query_map([], map_row)?;
        rows.collect()
    }

    /// The row for one game, if any.
    pub fn fetch_one(&self, game_token: &str) -> Result<Option<ResultRow>> {
        let conn = self.connect()?;
        conn.query_row(
            "SELECT gametoken, arialabel, initialresults, data FROM resultados WHERE gametoken = ?1",
            [game_token],
            map_row,
        )
        .optional()
    }
}

fn map_row(row: &Row<'_>) -> Result<ResultRow> {
    Ok(ResultRow {
        gametoken: row.get(0)?,
        arialabel: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        initialresults: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        data: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
    })
}
