//! Error taxonomy for the ingestion pipeline.
//!
//! Every variant is recoverable from the supervisor's point of view: session
//! errors abort one game's turn, resolution errors abort one cycle. None of
//! them is allowed to stop the loop.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    /// Endpoint directory unreachable, misconfigured or answering garbage.
    #[error("directory error: {0}")]
    Directory(String),

    /// Transport failure while opening or reading a feed connection.
    #[error("connection error: {0}")]
    Connection(String),

    /// Payload that does not fit the feed envelope.
    #[error("protocol error: {reason} (payload: {payload})")]
    Protocol { reason: String, payload: String },

    /// A retained result token is not numeric after stripping its annotation.
    #[error("malformed result token {token:?} at position {index}")]
    MalformedResult { token: String, index: usize },

    /// The remote forcibly disconnected this session.
    #[error("kicked out by feed: {0}")]
    Kickout(String),

    /// No candidate base URL passed probing.
    #[error("no working endpoint among {candidates} candidate(s)")]
    NoWorkingEndpoint { candidates: usize },

    /// The store refused or could not accept a write.
    #[error("storage error: {0}")]
    Storage(String),
}

impl IngestError {
    /// Build a protocol error, truncating the offending payload for the log line.
    pub fn protocol(reason: impl Into<String>, payload: &str) -> Self {
        IngestError::Protocol {
            reason: reason.into(),
            payload: payload.chars().take(300).collect(),
        }
    }
}

pub type IngestResult<T> = std::result::Result<T, IngestError>;
