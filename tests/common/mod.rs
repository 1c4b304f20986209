//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

/// Mock casino feed.
///
/// Each connection's game id is the last path segment; the server sends that
/// game's scripted messages in order, then waits for the client to close.
/// Games without a script get their connection dropped right after the
/// handshake.
pub struct MockFeedServer {
    pub addr: SocketAddr,
    visits: Arc<Mutex<Vec<String>>>,
    shutdown: Arc<Notify>,
}

impl MockFeedServer {
    pub async fn start(scripts: HashMap<String, Vec<String>>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let scripts = Arc::new(scripts);
        let visits = Arc::new(Mutex::new(Vec::new()));
        let shutdown = Arc::new(Notify::new());

        let visits_clone = visits.clone();
        let shutdown_clone = shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                let scripts = scripts.clone();
                                let visits = visits_clone.clone();
                                tokio::spawn(async move {
                                    Self::handle_connection(stream, scripts, visits).await;
                                });
                            }
                            Err(e) => {
                                eprintln!("Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = shutdown_clone.notified() => break,
                }
            }
        });

        Self {
            addr,
            visits,
            shutdown,
        }
    }

    async fn handle_connection(
        stream: TcpStream,
        scripts: Arc<HashMap<String, Vec<String>>>,
        visits: Arc<Mutex<Vec<String>>>,
    ) {
        let mut path = String::new();
        let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            path = req.uri().path().to_string();
            Ok(resp)
        };
        let mut ws = match tokio_tungstenite::accept_hdr_async(stream, callback).await {
            Ok(ws) => ws,
            Err(e) => {
                eprintln!("WebSocket handshake failed: {}", e);
                return;
            }
        };

        let game = path.rsplit('/').next().unwrap_or_default().to_string();
        visits.lock().unwrap().push(game.clone());

        let Some(messages) = scripts.get(&game) else {
            return;
        };
        for text in messages {
            if ws.send(Message::Text(text.clone())).await.is_err() {
                return;
            }
        }

        while let Some(Ok(msg)) = ws.next().await {
            if msg.is_close() {
                break;
            }
        }
    }

    /// Feed URL template with the game placeholder as the last path segment.
    pub fn url_template(&self) -> String {
        format!("ws://{}/feed/{{id_roleta}}", self.addr)
    }

    /// Game ids of every connection accepted so far, in order.
    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }
}

impl Drop for MockFeedServer {
    fn drop(&mut self) {
        self.shutdown.notify_waiters();
    }
}

pub fn results_message(tokens: &[&str]) -> String {
    let entries: Vec<Vec<&str>> = tokens.iter().map(|t| vec![*t]).collect();
    serde_json::json!({
        "type": "roulette.recentResults",
        "args": { "recentResults": entries }
    })
    .to_string()
}

pub fn kickout_message(reason: &str) -> String {
    serde_json::json!({
        "type": "connection.kickout",
        "args": { "reason": reason }
    })
    .to_string()
}

pub fn scripts(entries: &[(&str, Vec<String>)]) -> HashMap<String, Vec<String>> {
    entries
        .iter()
        .map(|(game, msgs)| (game.to_string(), msgs.clone()))
        .collect()
}

pub fn temp_db(dir: &tempfile::TempDir) -> String {
    dir.path().join("roletas.db").to_str().unwrap().to_string()
}
