//! Live roulette result ingestion.
//!
//! Resolves a working casino feed endpoint from a directory, polls each
//! configured roulette table, keeps the latest distinct result set per table
//! in SQLite and serves it through a small read-only HTTP API.

pub mod api;
pub mod config;
pub mod discovery;
pub mod error;
pub mod feed;
pub mod gate;
pub mod normalize;
pub mod storage;
pub mod supervisor;
pub mod types;
