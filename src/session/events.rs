use anyhow::Result;
use serde::Serialize;
use tokio::sync::oneshot;

use crate::session::state::{Phase, PromptSelection};
use crate::submit::ResultRecord;
use crate::timer::TimerEvent;

/// Loading state of the listening-track collaborator as seen by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioState {
    /// Listening phase not entered yet.
    Idle,
    /// Bounded readiness wait in progress.
    Loading,
    Ready,
    /// The track never became ready; the candidate sees a degraded state
    /// but the countdown keeps running.
    Unavailable,
}

/// Which answer field a candidate input targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerSlot {
    Reading { index: usize },
    Listening { index: usize },
    Writing { task: u8 },
}

/// Snapshot of the attempt returned to the HTTP layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub candidate_id: String,
    pub phase: Phase,
    pub sub_position: u8,
    pub time_remaining_secs: u32,
    pub started: bool,
    pub audio: AudioState,
    pub audio_playing: bool,
    pub selected_prompts: Option<PromptSelection>,
    /// Present once the attempt is complete.
    pub result: Option<ResultRecord>,
    /// "delivered:<destination>" or "local-only", once submitted.
    pub submit_outcome: Option<String>,
}

pub type Reply = oneshot::Sender<Result<StatusView>>;

/// Commands sent from the HTTP layer into the engine task.
#[derive(Debug)]
pub enum EngineCommand {
    /// Start (or resume) the current phase's countdown.
    Begin { reply: Reply },
    /// Manual "next": sub-position increment or phase exit.
    Advance { reply: Reply },
    /// Manual "previous": sub-position decrement, never crossing a phase
    /// boundary.
    Back { reply: Reply },
    /// Record one answer.
    SetAnswer {
        slot: AnswerSlot,
        value: String,
        reply: Reply,
    },
    AudioPlay { reply: Reply },
    AudioPause { reply: Reply },
    Status { reply: oneshot::Sender<StatusView> },
    /// Stop the engine task. The controller holds a sender for its own
    /// channel, so the loop never ends by channel closure alone.
    Shutdown,
}

/// Everything the single-writer engine task reacts to. All session mutations
/// flow through this one channel, so there is exactly one writer.
#[derive(Debug)]
pub enum EngineEvent {
    Command(EngineCommand),
    Timer(TimerEvent),
    /// Outcome of the bounded listening-track readiness wait.
    AudioReady(bool),
}
