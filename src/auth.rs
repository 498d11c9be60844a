//! One-time credential store.
//!
//! Candidates register ahead of the attempt and receive a generated one-time
//! password; logging in consumes it. This is deliberately not a real
//! security model: credentials live in a plain JSON file and exist only to
//! hand the engine a candidate id.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRecord {
    pub full_name: String,
    pub password: String,
    pub used: bool,
    pub registered_at: DateTime<Utc>,
}

/// Outcome of a login attempt. A consumed credential is reported
/// distinctly so the candidate gets a useful message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Admitted { candidate_id: String },
    AlreadyUsed,
    Rejected,
}

#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Store backed by `<data_dir>/candidates.json`.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir).context("Failed to create credential data directory")?;

        Ok(Self {
            path: data_dir.join("candidates.json"),
        })
    }

    /// Issue a one-time password for a candidate name.
    pub fn register(&self, full_name: &str) -> Result<String> {
        let full_name = full_name.trim();
        if full_name.is_empty() {
            anyhow::bail!("candidate name must not be empty");
        }

        let password = format!("{:08}", rand::thread_rng().gen_range(0..100_000_000u64));

        let mut records = self.load_records();
        records.push(CandidateRecord {
            full_name: full_name.to_string(),
            password: password.clone(),
            used: false,
            registered_at: Utc::now(),
        });
        self.save_records(&records)?;

        info!("Registered one-time credential for {}", full_name);
        Ok(password)
    }

    /// Admit a candidate if the name/password pair exists and is unused,
    /// consuming the credential.
    pub fn login(&self, full_name: &str, password: &str) -> Result<LoginOutcome> {
        let mut records = self.load_records();

        let matching = records
            .iter_mut()
            .find(|r| r.full_name == full_name && r.password == password);

        match matching {
            Some(record) if !record.used => {
                record.used = true;
                let candidate_id = record.full_name.clone();
                self.save_records(&records)?;

                info!("Candidate {} admitted", candidate_id);
                Ok(LoginOutcome::Admitted { candidate_id })
            }
            Some(_) => Ok(LoginOutcome::AlreadyUsed),
            None => Ok(LoginOutcome::Rejected),
        }
    }

    /// All registered credentials, for the administrator view.
    pub fn list(&self) -> Vec<CandidateRecord> {
        self.load_records()
    }

    fn load_records(&self) -> Vec<CandidateRecord> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!("Failed to read credential store: {}", e);
                return Vec::new();
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(records) => records,
            Err(e) => {
                warn!("Discarding corrupt credential store: {}", e);
                Vec::new()
            }
        }
    }

    fn save_records(&self, records: &[CandidateRecord]) -> Result<()> {
        let json =
            serde_json::to_vec_pretty(records).context("Failed to serialize credentials")?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, &json).context("Failed to write temp credential file")?;
        fs::rename(&tmp_path, &self.path).context("Failed to replace credential store")?;

        Ok(())
    }
}
