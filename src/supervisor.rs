//! Ingestion supervisor.
//!
//! Drives the Resolving → Polling → BackoffAndRetry cycle forever. Errors
//! are caught per game (session errors) or per cycle (resolution errors) and
//! never stop the loop.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::IngestConfig;
use crate::discovery::{select_endpoint, DirectoryClient};
use crate::error::IngestResult;
use crate::feed::read_game;
use crate::gate::DedupGate;
use crate::normalize::normalize;
use crate::types::{GameId, GateOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorState {
    Resolving,
    Polling { base_url: String },
    BackoffAndRetry { reason: String },
}

/// Per-pass tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub written: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl PassReport {
    /// True when every polled game failed this pass.
    pub fn all_failed(&self) -> bool {
        self.failed > 0 && self.written == 0 && self.unchanged == 0
    }
}

pub struct Supervisor {
    config: IngestConfig,
    directory: DirectoryClient,
    gate: DedupGate,
    last_failure: Option<DateTime<Utc>>,
    failed_passes: u32,
}

impl Supervisor {
    pub fn new(config: IngestConfig, gate: DedupGate) -> Self {
        let directory = DirectoryClient::new(config.directory.clone());
        Self {
            config,
            directory,
            gate,
            last_failure: None,
            failed_passes: 0,
        }
    }

    /// Run the state machine. Never returns.
    pub async fn run(mut self) {
        info!(
            "[SUPERVISOR] Starting with {} polled game(s)",
            self.config.games.poll().len()
        );
        let mut state = SupervisorState::Resolving;
        loop {
            state = self.step(state).await;
        }
    }

    /// Execute one state and return the next.
    pub async fn step(&mut self, state: SupervisorState) -> SupervisorState {
        match state {
            SupervisorState::Resolving => self.resolve().await,
            SupervisorState::Polling { base_url } => {
                let report = self.poll_pass(&base_url).await;
                info!(
                    "[SUPERVISOR] Pass complete: {} written, {} unchanged, {} failed",
                    report.written, report.unchanged, report.failed
                );

                if report.all_failed() {
                    self.failed_passes += 1;
                    if self.failed_passes >= self.config.max_failed_passes {
                        let reason = format!(
                            "{} consecutive failed passes on {}",
                            self.failed_passes, base_url
                        );
                        self.failed_passes = 0;
                        self.record_failure(&reason);
                        return SupervisorState::BackoffAndRetry { reason };
                    }
                } else {
                    self.failed_passes = 0;
                }

                tokio::time::sleep(self.config.poll_interval).await;
                SupervisorState::Polling { base_url }
            }
            SupervisorState::BackoffAndRetry { reason } => {
                debug!("[SUPERVISOR] Backing off after: {}", reason);
                tokio::time::sleep(self.config.retry_delay).await;
                SupervisorState::Resolving
            }
        }
    }

    async fn resolve(&mut self) -> SupervisorState {
        let candidates = self.directory.resolve().await;
        if candidates.is_empty() {
            let reason = "directory returned no endpoints".to_string();
            self.record_failure(&reason);
            return SupervisorState::BackoffAndRetry { reason };
        }

        let seed = match self.config.games.poll().first() {
            Some(game) => game.clone(),
            None => {
                let reason = "no games configured to probe with".to_string();
                self.record_failure(&reason);
                return SupervisorState::BackoffAndRetry { reason };
            }
        };

        match select_endpoint(&candidates, &seed, self.config.feed_timeout).await {
            Ok(base_url) => {
                info!("[SUPERVISOR] Polling via {}", base_url);
                self.failed_passes = 0;
                SupervisorState::Polling { base_url }
            }
            Err(e) => {
                let reason = e.to_string();
                self.record_failure(&reason);
                SupervisorState::BackoffAndRetry { reason }
            }
        }
    }

    /// Poll every configured game once, in order.
    pub async fn poll_pass(&mut self, base_url: &str) -> PassReport {
        let mut report = PassReport::default();
        let games = self.config.games.poll().to_vec();

        for game in &games {
            match self.poll_game(base_url, game).await {
                Ok(GateOutcome::Written) => report.written += 1,
                Ok(GateOutcome::Unchanged) => report.unchanged += 1,
                Err(e) => {
                    report.failed += 1;
                    self.record_failure(&format!("{}: {}", game, e));
                }
            }
        }
        report
    }

    async fn poll_game(&mut self, base_url: &str, game: &GameId) -> IngestResult<GateOutcome> {
        let raw = read_game(base_url, game, self.config.feed_timeout).await?;
        let results = normalize(&raw)?;
        self.gate.apply(game, results).await
    }

    /// Log a failure with its wall-clock time and the gap since the previous one.
    fn record_failure(&mut self, what: &str) {
        let now = Utc::now();
        match self.last_failure {
            Some(prev) => {
                let gap = (now - prev).num_milliseconds() as f64 / 1000.0;
                warn!(
                    "[SUPERVISOR] {} at {} ({:.3}s since previous failure)",
                    what,
                    now.to_rfc3339(),
                    gap
                );
            }
            None => warn!("[SUPERVISOR] {} at {} (first failure)", what, now.to_rfc3339()),
        }
        self.last_failure = Some(now);
    }

    pub fn gate(&self) -> &DedupGate {
        &self.gate
    }
}
