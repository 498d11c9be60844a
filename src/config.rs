use anyhow::Result;
use serde::Deserialize;

use crate::session::EngineTimings;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub timers: TimersConfig,
    pub audio: AudioConfig,
    pub relay: RelayConfig,
    pub admin: AdminConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
}

#[derive(Debug, Deserialize)]
pub struct TimersConfig {
    pub reading_secs: u32,
    pub listening_secs: u32,
    pub writing_secs: u32,
    pub clear_grace_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    /// Directory of static assets served under /audio.
    pub assets_dir: String,
    /// The listening-section WAV track, probed for readiness.
    pub listening_track: String,
}

#[derive(Debug, Deserialize)]
pub struct RelayConfig {
    pub api_base: String,
    pub bot_token: String,
    /// Destination identifiers tried in order; first success wins.
    pub destinations: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdminConfig {
    pub username: String,
    pub password: String,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl TimersConfig {
    pub fn to_timings(&self) -> EngineTimings {
        EngineTimings {
            reading_secs: self.reading_secs,
            listening_secs: self.listening_secs,
            writing_secs: self.writing_secs,
            clear_grace_secs: self.clear_grace_secs,
        }
    }
}
