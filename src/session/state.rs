use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Top-level stage of an attempt. Phases only ever move forward; once a
/// phase is exited it is never re-entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Reading,
    Listening,
    Writing,
    Complete,
}

impl Phase {
    /// Position in the fixed phase order, used to assert forward-only
    /// transitions.
    pub fn rank(self) -> u8 {
        match self {
            Phase::Reading => 0,
            Phase::Listening => 1,
            Phase::Writing => 2,
            Phase::Complete => 3,
        }
    }

    /// Highest sub-position within the phase (reading passage, listening
    /// section, writing task).
    pub fn max_sub_position(self) -> u8 {
        match self {
            Phase::Reading => 3,
            Phase::Listening => 4,
            Phase::Writing => 2,
            Phase::Complete => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Reading => "reading",
            Phase::Listening => "listening",
            Phase::Writing => "writing",
            Phase::Complete => "complete",
        }
    }
}

/// All candidate input for one attempt. The reading/listening vectors are
/// sized from the answer keys at session creation and never resized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSheet {
    pub reading: Vec<String>,
    pub listening: Vec<String>,
    pub writing1: String,
    pub writing2: String,
}

impl AnswerSheet {
    pub fn empty(reading_len: usize, listening_len: usize) -> Self {
        Self {
            reading: vec![String::new(); reading_len],
            listening: vec![String::new(); listening_len],
            writing1: String::new(),
            writing2: String::new(),
        }
    }
}

/// Writing prompts drawn once at Writing-phase entry and fixed for the
/// session's lifetime (re-rolling would invalidate resumed state).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptSelection {
    /// Index into the task-1 chart bank.
    pub task1: usize,
    /// Index into the task-2 topic bank.
    pub task2: usize,
}

/// Durable state of one exam attempt. This is the record the session store
/// persists on every mutation and reloads after a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSession {
    /// Opaque candidate identifier assigned at login.
    pub candidate_id: String,

    /// Current phase.
    pub phase: Phase,

    /// 1-based position within the phase (passage 1-3, section 1-4, task
    /// 1-2).
    pub sub_position: u8,

    /// Seconds left on the current phase's clock.
    pub time_remaining_secs: u32,

    /// Candidate input so far.
    pub answers: AnswerSheet,

    /// Writing prompts, `None` until the Writing phase is entered.
    #[serde(default)]
    pub selected_prompts: Option<PromptSelection>,

    /// Band frozen when the Reading phase exited. Set at most once.
    #[serde(default)]
    pub reading_band: Option<f64>,

    /// Band frozen when the Listening phase exited. Set at most once.
    #[serde(default)]
    pub listening_band: Option<f64>,

    /// When this record was last written, used to charge elapsed time on
    /// resume.
    pub saved_at_epoch_ms: i64,
}

impl ExamSession {
    /// Fresh session positioned at the start of the Reading phase.
    pub fn new(
        candidate_id: impl Into<String>,
        reading_len: usize,
        listening_len: usize,
        reading_secs: u32,
    ) -> Self {
        Self {
            candidate_id: candidate_id.into(),
            phase: Phase::Reading,
            sub_position: 1,
            time_remaining_secs: reading_secs,
            answers: AnswerSheet::empty(reading_len, listening_len),
            selected_prompts: None,
            reading_band: None,
            listening_band: None,
            saved_at_epoch_ms: Utc::now().timestamp_millis(),
        }
    }

    pub fn touch(&mut self) {
        self.saved_at_epoch_ms = Utc::now().timestamp_millis();
    }
}
