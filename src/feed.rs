//! Casino roulette feed client.
//!
//! Short-lived websocket sessions: one per game per polling pass, read until
//! a results or kickout message arrives, then closed. Also hosts the
//! connection probe used to pick a working base URL.

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::config::{GAME_ID_PLACEHOLDER, KICKOUT_TYPE, RECENT_RESULTS_TYPE};
use crate::error::{IngestError, IngestResult};
use crate::types::GameId;

// === Feed Message Types ===

#[derive(Deserialize, Debug)]
struct Envelope {
    #[serde(rename = "type")]
    msg_type: Option<String>,
    #[serde(default)]
    args: Value,
}

/// A classified feed message.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    /// Raw `args.recentResults` array, most recent first
    RecentResults(Vec<Value>),
    /// Forced disconnect with the remote's reason
    Kickout { reason: String },
    /// Anything else; carries the type tag when present
    Ignored(Option<String>),
}

/// Classify one text frame.
pub fn classify(text: &str) -> IngestResult<FeedMessage> {
    let envelope: Envelope = serde_json::from_str(text)
        .map_err(|e| IngestError::protocol(format!("invalid feed envelope: {}", e), text))?;

    match envelope.msg_type.as_deref() {
        Some(RECENT_RESULTS_TYPE) => match envelope.args.get("recentResults") {
            Some(Value::Array(entries)) => Ok(FeedMessage::RecentResults(entries.clone())),
            _ => Err(IngestError::protocol("recentResults missing or not an array", text)),
        },
        Some(KICKOUT_TYPE) => {
            let reason = envelope
                .args
                .get("reason")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string();
            Ok(FeedMessage::Kickout { reason })
        }
        other => Ok(FeedMessage::Ignored(other.map(str::to_string))),
    }
}

/// Replace the identifier placeholder in a feed URL template.
pub fn substitute_game_id(template: &str, game: &GameId) -> String {
    template.replace(GAME_ID_PLACEHOLDER, game.as_str())
}

/// Run `fut` under an optional timeout, mapping expiry to a connection error.
async fn bounded<T>(
    limit: Option<Duration>,
    what: &str,
    fut: impl Future<Output = IngestResult<T>>,
) -> IngestResult<T> {
    match limit {
        Some(d) => tokio::time::timeout(d, fut)
            .await
            .map_err(|_| IngestError::Connection(format!("{} timed out after {:?}", what, d)))?,
        None => fut.await,
    }
}

// === Feed Session ===

/// One open connection to a game's feed.
pub struct FeedSession {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    timeout: Option<Duration>,
}

impl FeedSession {
    /// Connect to a fully substituted feed URL.
    pub async fn open(url: &str, timeout: Option<Duration>) -> IngestResult<Self> {
        let stream = bounded(timeout, "connect", async {
            connect_async(url)
                .await
                .map(|(stream, _response)| stream)
                .map_err(|e| IngestError::Connection(format!("failed to connect: {}", e)))
        })
        .await?;

        debug!("[FEED] Connected to {}", url);
        Ok(Self { stream, timeout })
    }

    /// Read and classify the next data message.
    ///
    /// Ping/pong frames are skipped; a close frame or end of stream is a
    /// connection error.
    pub async fn receive(&mut self) -> IngestResult<FeedMessage> {
        let timeout = self.timeout;
        bounded(timeout, "receive", self.next_text()).await.and_then(|text| classify(&text))
    }

    async fn next_text(&mut self) -> IngestResult<String> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text),
                Some(Ok(Message::Binary(bytes))) => {
                    return String::from_utf8(bytes).map_err(|_| {
                        IngestError::protocol("binary frame is not UTF-8", "<binary>")
                    })
                }
                Some(Ok(Message::Close(frame))) => {
                    return Err(IngestError::Connection(format!("closed by remote: {:?}", frame)))
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(IngestError::Connection(format!("read failed: {}", e))),
                None => return Err(IngestError::Connection("stream ended".to_string())),
            }
        }
    }

    /// Read until a results message; kickout ends the session with an error.
    pub async fn next_results(&mut self) -> IngestResult<Vec<Value>> {
        loop {
            match self.receive().await? {
                FeedMessage::RecentResults(raw) => return Ok(raw),
                FeedMessage::Kickout { reason } => return Err(IngestError::Kickout(reason)),
                FeedMessage::Ignored(tag) => {
                    debug!("[FEED] Ignoring message type {:?}", tag);
                }
            }
        }
    }

    /// Close politely; failures are irrelevant since the session is discarded.
    pub async fn close(mut self) {
        let _ = self.stream.send(Message::Close(None)).await;
    }
}

/// Fetch one game's raw results over a fresh session.
pub async fn read_game(base_url: &str, game: &GameId, timeout: Option<Duration>) -> IngestResult<Vec<Value>> {
    let url = substitute_game_id(base_url, game);
    let mut session = FeedSession::open(&url, timeout).await?;
    let result = session.next_results().await;
    session.close().await;
    result
}

// === Connection Probe ===

/// Liveness check: connect, read exactly one message, reject on kickout.
///
/// The probe connection is never reused.
pub async fn probe(base_url: &str, game: &GameId, timeout: Option<Duration>) -> bool {
    let url = substitute_game_id(base_url, game);
    let mut session = match FeedSession::open(&url, timeout).await {
        Ok(s) => s,
        Err(e) => {
            warn!("[PROBE] Failed to connect to {}: {}", base_url, e);
            return false;
        }
    };

    let first = session.receive().await;
    session.close().await;

    match first {
        Ok(FeedMessage::Kickout { reason }) => {
            warn!("[PROBE] Kicked out by {}: {}", base_url, reason);
            false
        }
        Ok(_) => {
            info!("[PROBE] {} is usable", base_url);
            true
        }
        Err(e) => {
            warn!("[PROBE] {} rejected: {}", base_url, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_recent_results() {
        let msg = classify(
            r#"{"type":"roulette.recentResults","args":{"recentResults":[["14x2"],["0"]]}}"#,
        )
        .unwrap();
        assert_eq!(msg, FeedMessage::RecentResults(vec![json!(["14x2"]), json!(["0"])]));
    }

    #[test]
    fn test_classify_kickout() {
        let msg = classify(r#"{"type":"connection.kickout","args":{"reason":"duplicate"}}"#).unwrap();
        assert_eq!(msg, FeedMessage::Kickout { reason: "duplicate".to_string() });

        let msg = classify(r#"{"type":"connection.kickout"}"#).unwrap();
        assert_eq!(msg, FeedMessage::Kickout { reason: "unknown".to_string() });
    }

    #[test]
    fn test_classify_ignores_other_types() {
        assert_eq!(
            classify(r#"{"type":"roulette.tableState","args":{"state":"open"}}"#).unwrap(),
            FeedMessage::Ignored(Some("roulette.tableState".to_string()))
        );
        assert_eq!(classify(r#"{"hello":1}"#).unwrap(), FeedMessage::Ignored(None));
    }

    #[test]
    fn test_classify_protocol_errors() {
        assert!(matches!(classify("not json"), Err(IngestError::Protocol { .. })));
        assert!(matches!(classify("[1,2]"), Err(IngestError::Protocol { .. })));
        assert!(matches!(
            classify(r#"{"type":"roulette.recentResults","args":{}}"#),
            Err(IngestError::Protocol { .. })
        ));
        assert!(matches!(
            classify(r#"{"type":"roulette.recentResults","args":{"recentResults":"14"}}"#),
            Err(IngestError::Protocol { .. })
        ));
    }

    #[test]
    fn test_substitute_game_id() {
        let game = GameId::new("PorROU0000000001");
        assert_eq!(
            substitute_game_id("wss://feed.example/ws?table_id={id_roleta}&v=1", &game),
            "wss://feed.example/ws?table_id=PorROU0000000001&v=1"
        );
        assert_eq!(substitute_game_id("wss://plain", &game), "wss://plain");
    }

    #[tokio::test]
    async fn test_probe_unreachable_is_false() {
        // Nothing listens on port 9 locally
        let ok = probe("ws://127.0.0.1:9/{id_roleta}", &GameId::new("g"), Some(Duration::from_secs(2))).await;
        assert!(!ok);
    }
}
