//! Core type definitions shared by the ingestion pipeline.

use std::sync::Arc;

/// A single roulette outcome (0-36 on standard wheels, feed-dependent otherwise).
pub type Outcome = u32;

/// Stable key naming one roulette table's feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GameId(Arc<str>);

impl GameId {
    pub fn new(token: impl AsRef<str>) -> Self {
        Self(Arc::from(token.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GameId {
    fn from(s: &str) -> Self {
        GameId::new(s)
    }
}

/// Recent outcomes for one game, most recent first, at most
/// [`crate::config::MAX_RESULTS`] entries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResultSet(Vec<Outcome>);

impl ResultSet {
    pub fn new(outcomes: Vec<Outcome>) -> Self {
        Self(outcomes)
    }

    pub fn as_slice(&self) -> &[Outcome] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Comma-joined form used by the `initialresults` column.
    pub fn to_csv(&self) -> String {
        self.0
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Parse the `initialresults` column back. Returns `None` on any bad field.
    pub fn from_csv(s: &str) -> Option<Self> {
        if s.trim().is_empty() {
            return Some(Self::default());
        }
        s.split(',')
            .map(|part| part.trim().parse::<Outcome>().ok())
            .collect::<Option<Vec<_>>>()
            .map(Self)
    }
}

impl std::fmt::Display for ResultSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.to_csv())
    }
}

/// Outcome of passing a result set through the dedup gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// Differed from last-seen; an upsert was issued.
    Written,
    /// Identical to last-seen; nothing was written.
    Unchanged,
}

/// Convert a label to title case: first letter of every word upper-case,
/// the rest lower-case. Any non-alphabetic character starts a new word.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}
