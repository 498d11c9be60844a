//! Audio playback collaborator for the Listening phase.
//!
//! The engine does not decode or stream audio; it only gates the phase start
//! on a readiness signal and exposes play/pause to the candidate. The real
//! implementation probes a WAV track on disk; tests use a controllable stub.

use anyhow::{Context, Result};
use hound::WavReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// Playback surface consumed by the Listening phase.
#[async_trait::async_trait]
pub trait AudioPlayback: Send + Sync {
    /// Whether the track is loaded and playable.
    async fn is_ready(&self) -> bool;

    /// Start playback. Fails if the track is not ready.
    async fn play(&self) -> Result<()>;

    /// Pause playback. A no-op when nothing is playing.
    async fn pause(&self) -> Result<()>;

    /// Whether playback is currently running.
    fn is_playing(&self) -> bool;

    /// Implementation name for logging.
    fn name(&self) -> &str;
}

/// Playback backed by a WAV file on local disk.
///
/// Readiness means the file exists and decodes as WAV; the actual audio
/// output happens client-side (the track is served over HTTP), so play/pause
/// here only track the session's playback state.
pub struct LocalTrackPlayer {
    path: PathBuf,
    playing: AtomicBool,
}

impl LocalTrackPlayer {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            playing: AtomicBool::new(false),
        }
    }

    /// Validate that the track opens as WAV and report its duration.
    pub fn probe(&self) -> Result<f64> {
        let reader = WavReader::open(&self.path)
            .with_context(|| format!("Failed to open listening track: {:?}", self.path))?;

        let spec = reader.spec();
        let duration_seconds =
            reader.duration() as f64 / spec.sample_rate as f64;

        info!(
            "Listening track ready: {:.1}s, {}Hz, {} channels",
            duration_seconds, spec.sample_rate, spec.channels
        );

        Ok(duration_seconds)
    }
}

#[async_trait::async_trait]
impl AudioPlayback for LocalTrackPlayer {
    async fn is_ready(&self) -> bool {
        match self.probe() {
            Ok(_) => true,
            Err(e) => {
                warn!("Listening track not ready: {:#}", e);
                false
            }
        }
    }

    async fn play(&self) -> Result<()> {
        if !self.is_ready().await {
            anyhow::bail!("listening track is still loading");
        }

        self.playing.store(true, Ordering::SeqCst);
        info!("Listening track playing");
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.playing.store(false, Ordering::SeqCst);
        info!("Listening track paused");
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "local-track"
    }
}

/// Test double with a fixed readiness answer.
pub struct StubAudio {
    ready: bool,
    playing: AtomicBool,
}

impl StubAudio {
    pub fn new(ready: bool) -> Self {
        Self {
            ready,
            playing: AtomicBool::new(false),
        }
    }
}

#[async_trait::async_trait]
impl AudioPlayback for StubAudio {
    async fn is_ready(&self) -> bool {
        self.ready
    }

    async fn play(&self) -> Result<()> {
        if !self.ready {
            anyhow::bail!("stub track not ready");
        }
        self.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.playing.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "stub"
    }
}
