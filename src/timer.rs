//! Per-phase countdown timer.
//!
//! The timer is a spawned tokio task that emits one `Tick` per second and
//! exactly one `Expired` when the countdown reaches zero, then stops. Every
//! event carries the generation it was armed with; the controller drops
//! events whose generation is stale, so an aborted timer can never fire into
//! a phase that has already exited.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::session::events::EngineEvent;

/// Fixed deduction charged on top of elapsed wall-clock time when a session
/// is reconstructed after an interruption, to discourage refresh-stalling.
pub const RESUME_PENALTY_SECS: u32 = 3;

/// Signal emitted by the countdown task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerSignal {
    /// One second elapsed; `remaining` is the new countdown value.
    Tick { remaining: u32 },
    /// The countdown reached zero. Sent at most once per armed timer.
    Expired,
}

/// A timer signal tagged with the generation of the timer that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerEvent {
    pub generation: u64,
    pub signal: TimerSignal,
}

/// Owns the currently armed countdown task, if any.
///
/// Arming a new countdown always cancels the previous one first, so no two
/// timers ever run concurrently for the same session.
pub struct PhaseTimer {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl PhaseTimer {
    pub fn new() -> Self {
        Self {
            generation: 0,
            handle: None,
        }
    }

    /// Generation of the most recently armed countdown. Events with any
    /// other generation are stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Cancel the running countdown and arm a new one for `duration_secs`.
    /// Returns the new generation.
    pub fn start(&mut self, duration_secs: u32, events: mpsc::Sender<EngineEvent>) -> u64 {
        self.cancel();

        self.generation += 1;
        let generation = self.generation;

        info!(
            "Arming phase timer: {}s (generation {})",
            duration_secs, generation
        );

        let handle = tokio::spawn(async move {
            let mut remaining = duration_secs;
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            // The first interval tick completes immediately; consume it so
            // the countdown starts one full second from now.
            interval.tick().await;

            while remaining > 0 {
                interval.tick().await;
                remaining -= 1;

                let event = EngineEvent::Timer(TimerEvent {
                    generation,
                    signal: TimerSignal::Tick { remaining },
                });
                if events.send(event).await.is_err() {
                    debug!("Engine gone, stopping timer task");
                    return;
                }
            }

            let event = EngineEvent::Timer(TimerEvent {
                generation,
                signal: TimerSignal::Expired,
            });
            let _ = events.send(event).await;

            info!("Phase timer expired (generation {})", generation);
        });

        self.handle = Some(handle);
        generation
    }

    /// Stop the running countdown, if any. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("Cancelled phase timer (generation {})", self.generation);
        }
    }
}

impl Default for PhaseTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PhaseTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Countdown value after an interruption: elapsed wall-clock time since the
/// last save plus the fixed resume penalty, floored at zero.
pub fn resumed_remaining(saved_remaining: u32, saved_at_epoch_ms: i64, now_epoch_ms: i64) -> u32 {
    let elapsed_secs = ((now_epoch_ms - saved_at_epoch_ms).max(0) / 1000) as u32;

    saved_remaining
        .saturating_sub(elapsed_secs)
        .saturating_sub(RESUME_PENALTY_SECS)
}
