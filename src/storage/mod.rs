//! SQLite storage module for the latest result per game.
//!
//! Writes go through a dedicated writer thread fed by a channel; reads open
//! their own connection.

pub mod reader;
pub mod schema;
pub mod types;
pub mod writer;

pub use reader::ResultReader;
pub use types::{ResultRow, StoredResult};
pub use writer::{create_storage_channel, StorageChannel};
