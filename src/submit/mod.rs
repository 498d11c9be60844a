//! Final result handling: local append-only results log plus best-effort
//! delivery to an external relay.
//!
//! The protocol is an explicit two-step: commit the record locally first
//! (the only hard failure), then try the relay destinations in order. The
//! outcome distinguishes "delivered" from "local only" so callers and tests
//! can observe a failed notification without treating it as an error.

mod relay;

pub use relay::{format_result_message, ResultRelay, TelegramRelay};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// One completed attempt, produced exactly once at the Complete transition
/// and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    pub candidate_id: String,
    pub reading_score: usize,
    pub reading_total: usize,
    pub reading_band: f64,
    pub listening_score: usize,
    pub listening_total: usize,
    pub listening_band: f64,
    pub writing1_word_count: usize,
    pub writing2_word_count: usize,
    pub overall_band: f64,
    pub completed_at: DateTime<Utc>,
}

/// Append-only JSON Lines log of completed attempts, one entry per line.
#[derive(Debug, Clone)]
pub struct ResultsLog {
    path: PathBuf,
}

impl ResultsLog {
    /// Log backed by `<data_dir>/results.jsonl`.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir).context("Failed to create results data directory")?;

        Ok(Self {
            path: data_dir.join("results.jsonl"),
        })
    }

    pub fn append(&self, record: &ResultRecord) -> Result<()> {
        let mut line = serde_json::to_string(record).context("Failed to serialize result")?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open results log: {:?}", self.path))?;
        file.write_all(line.as_bytes())
            .context("Failed to append to results log")?;

        info!(
            "Result for {} committed to local log",
            record.candidate_id
        );
        Ok(())
    }

    /// All logged results, oldest first. Unparseable lines are skipped with
    /// a warning rather than failing the whole read.
    pub fn load_all(&self) -> Result<Vec<ResultRecord>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).context("Failed to read results log"),
        };

        let mut records = Vec::new();
        for line in contents.lines().filter(|l| !l.trim().is_empty()) {
            match serde_json::from_str::<ResultRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping unparseable results-log line: {}", e),
            }
        }

        Ok(records)
    }
}

/// What happened to a submitted result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Committed locally and acknowledged by the relay.
    Delivered { destination: String },
    /// Committed locally; every relay destination failed.
    LocalOnly { reason: String },
}

/// At-most-once delivery of the final result: local commit first, then a
/// small fixed set of relay destinations, first success wins. The caller
/// (PhaseController) guarantees `submit` runs once per session.
pub struct ResultSubmitter {
    log: ResultsLog,
    relay: Arc<dyn ResultRelay>,
    destinations: Vec<String>,
}

impl ResultSubmitter {
    pub fn new(log: ResultsLog, relay: Arc<dyn ResultRelay>, destinations: Vec<String>) -> Self {
        Self {
            log,
            relay,
            destinations,
        }
    }

    /// Commit the record locally, then notify the relay. Only the local
    /// commit can fail; relay failures degrade to `LocalOnly`.
    pub async fn submit(&self, record: &ResultRecord) -> Result<SubmitOutcome> {
        self.log.append(record)?;

        let message = format_result_message(record);
        let mut last_error = String::from("no relay destinations configured");

        for destination in &self.destinations {
            match self.relay.deliver(destination, &message).await {
                Ok(()) => {
                    return Ok(SubmitOutcome::Delivered {
                        destination: destination.clone(),
                    });
                }
                Err(e) => {
                    warn!(
                        "Relay {} delivery to {} failed: {:#}",
                        self.relay.name(),
                        destination,
                        e
                    );
                    last_error = format!("{:#}", e);
                }
            }
        }

        warn!("Result for {} kept local only: {}", record.candidate_id, last_error);
        Ok(SubmitOutcome::LocalOnly { reason: last_error })
    }
}
