use anyhow::Result;
use chrono::Utc;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::events::{AnswerSlot, AudioState, EngineEvent, StatusView};
use super::state::{ExamSession, Phase};
use crate::audio::AudioPlayback;
use crate::bank::{select_prompts, AnswerKeys, PromptBank};
use crate::scoring;
use crate::store::SessionStore;
use crate::submit::{ResultRecord, ResultSubmitter, SubmitOutcome};
use crate::timer::{resumed_remaining, PhaseTimer, TimerEvent, TimerSignal};

/// Attempts made waiting for the listening track before degrading to the
/// "unavailable" state. One second apart.
const AUDIO_READY_ATTEMPTS: u32 = 10;
const AUDIO_READY_RETRY: Duration = Duration::from_secs(1);

/// Wall-clock budgets for the timed phases, plus the grace delay between
/// showing the result and wiping the session record.
#[derive(Debug, Clone)]
pub struct EngineTimings {
    pub reading_secs: u32,
    pub listening_secs: u32,
    pub writing_secs: u32,
    pub clear_grace_secs: u64,
}

impl Default for EngineTimings {
    fn default() -> Self {
        Self {
            reading_secs: 60 * 60,
            listening_secs: 30 * 60,
            writing_secs: 60 * 60,
            clear_grace_secs: 30,
        }
    }
}

/// Everything the controller needs besides the session itself.
pub struct ControllerDeps {
    pub store: SessionStore,
    pub keys: AnswerKeys,
    pub prompts: PromptBank,
    pub submitter: ResultSubmitter,
    pub audio: Arc<dyn AudioPlayback>,
    pub timings: EngineTimings,
    /// Sender for the engine's own event channel; timers and the audio
    /// probe report back through it.
    pub events_tx: mpsc::Sender<EngineEvent>,
    /// Random source for the one-shot prompt draw, injectable so tests are
    /// deterministic.
    pub rng: StdRng,
}

/// The exam state machine. Owns the session record and serializes every
/// mutation: all events (commands, timer ticks, audio readiness) are applied
/// on the engine task, so there is exactly one writer.
pub struct PhaseController {
    session: ExamSession,
    store: SessionStore,
    timer: PhaseTimer,
    keys: AnswerKeys,
    prompts: PromptBank,
    submitter: ResultSubmitter,
    audio: Arc<dyn AudioPlayback>,
    timings: EngineTimings,
    events_tx: mpsc::Sender<EngineEvent>,
    rng: StdRng,

    started: bool,
    audio_state: AudioState,
    last_result: Option<ResultRecord>,
    submit_outcome: Option<SubmitOutcome>,
}

impl PhaseController {
    /// Fresh attempt positioned at Reading passage 1.
    pub fn fresh(candidate_id: impl Into<String>, deps: ControllerDeps) -> Self {
        let session = ExamSession::new(
            candidate_id,
            deps.keys.reading.len(),
            deps.keys.listening.len(),
            deps.timings.reading_secs,
        );

        Self::with_session(session, deps)
    }

    /// Resume a persisted attempt, charging elapsed time plus the fixed
    /// resume penalty against the saved countdown.
    pub fn resume(mut saved: ExamSession, deps: ControllerDeps) -> Self {
        let remaining = resumed_remaining(
            saved.time_remaining_secs,
            saved.saved_at_epoch_ms,
            Utc::now().timestamp_millis(),
        );

        info!(
            "Resuming session for {}: {} phase, {}s -> {}s after penalty",
            saved.candidate_id,
            saved.phase.label(),
            saved.time_remaining_secs,
            remaining
        );

        saved.time_remaining_secs = remaining;
        Self::with_session(saved, deps)
    }

    fn with_session(session: ExamSession, deps: ControllerDeps) -> Self {
        Self {
            session,
            store: deps.store,
            timer: PhaseTimer::new(),
            keys: deps.keys,
            prompts: deps.prompts,
            submitter: deps.submitter,
            audio: deps.audio,
            timings: deps.timings,
            events_tx: deps.events_tx,
            rng: deps.rng,
            started: false,
            audio_state: AudioState::Idle,
            last_result: None,
            submit_outcome: None,
        }
    }

    pub fn session(&self) -> &ExamSession {
        &self.session
    }

    pub fn timer_generation(&self) -> u64 {
        self.timer.generation()
    }

    pub fn audio_state(&self) -> AudioState {
        self.audio_state
    }

    pub fn submit_outcome(&self) -> Option<&SubmitOutcome> {
        self.submit_outcome.as_ref()
    }

    /// Start (or, for a resumed session, restart) the current phase's
    /// countdown. Calling it again is a no-op.
    pub fn begin(&mut self) -> Result<StatusView> {
        if self.session.phase == Phase::Complete {
            anyhow::bail!("attempt is already complete");
        }

        if self.started {
            warn!("Exam already started");
            return Ok(self.status());
        }

        info!(
            "Starting exam for {}: {} phase, {}s on the clock",
            self.session.candidate_id,
            self.session.phase.label(),
            self.session.time_remaining_secs
        );

        self.started = true;
        self.timer
            .start(self.session.time_remaining_secs, self.events_tx.clone());

        // A session resumed mid-Listening needs the readiness gate again.
        if self.session.phase == Phase::Listening {
            self.start_audio_probe();
        }

        self.persist();
        Ok(self.status())
    }

    /// Manual "next": moves to the next sub-position, or exits the phase at
    /// the last one. Timer expiry routes through the same logic.
    pub async fn advance(&mut self) -> Result<StatusView> {
        self.ensure_started()?;
        self.step_forward().await?;
        Ok(self.status())
    }

    /// Manual "previous": moves one sub-position back, never across a phase
    /// boundary and never re-triggering any band computation.
    pub fn back(&mut self) -> Result<StatusView> {
        self.ensure_started()?;

        if self.session.phase != Phase::Complete && self.session.sub_position > 1 {
            self.session.sub_position -= 1;
            self.persist();
        }

        Ok(self.status())
    }

    /// Record one answer. Indices are fixed by the answer-key length at
    /// session creation; out-of-range indices are rejected.
    pub fn set_answer(&mut self, slot: AnswerSlot, value: String) -> Result<StatusView> {
        self.ensure_started()?;

        if self.session.phase == Phase::Complete {
            anyhow::bail!("attempt is already complete");
        }

        match slot {
            AnswerSlot::Reading { index } => {
                let len = self.session.answers.reading.len();
                if index >= len {
                    anyhow::bail!("reading answer index {} out of range (0..{})", index, len);
                }
                self.session.answers.reading[index] = value;
            }
            AnswerSlot::Listening { index } => {
                let len = self.session.answers.listening.len();
                if index >= len {
                    anyhow::bail!("listening answer index {} out of range (0..{})", index, len);
                }
                self.session.answers.listening[index] = value;
            }
            AnswerSlot::Writing { task: 1 } => self.session.answers.writing1 = value,
            AnswerSlot::Writing { task: 2 } => self.session.answers.writing2 = value,
            AnswerSlot::Writing { task } => {
                anyhow::bail!("writing task {} does not exist", task);
            }
        }

        self.persist();
        Ok(self.status())
    }

    /// React to a countdown event. Stale generations (a timer armed for an
    /// already-exited phase) are dropped, so expiry can never double-advance
    /// the state machine.
    pub async fn on_timer(&mut self, event: TimerEvent) -> Result<()> {
        if event.generation != self.timer.generation() {
            debug!(
                "Dropping stale timer event (generation {} != {})",
                event.generation,
                self.timer.generation()
            );
            return Ok(());
        }

        match event.signal {
            TimerSignal::Tick { remaining } => {
                self.session.time_remaining_secs = remaining;
                // A failed tick write is retried by the next tick.
                self.persist();
            }
            TimerSignal::Expired => {
                info!(
                    "{} phase timer expired, fast-forwarding to phase exit",
                    self.session.phase.label()
                );
                self.session.time_remaining_secs = 0;

                let expired_phase = self.session.phase;
                while self.session.phase == expired_phase && expired_phase != Phase::Complete {
                    self.step_forward().await?;
                }
            }
        }

        Ok(())
    }

    /// Outcome of the bounded listening-track readiness wait.
    pub fn on_audio_ready(&mut self, ready: bool) {
        if self.session.phase != Phase::Listening {
            return;
        }

        self.audio_state = if ready {
            AudioState::Ready
        } else {
            warn!("Listening track never became ready; continuing degraded");
            AudioState::Unavailable
        };
    }

    pub async fn audio_play(&mut self) -> Result<StatusView> {
        if self.session.phase != Phase::Listening {
            anyhow::bail!("audio playback is only available during the listening phase");
        }

        self.audio.play().await?;
        Ok(self.status())
    }

    pub async fn audio_pause(&mut self) -> Result<StatusView> {
        self.audio.pause().await?;
        Ok(self.status())
    }

    pub fn status(&self) -> StatusView {
        StatusView {
            candidate_id: self.session.candidate_id.clone(),
            phase: self.session.phase,
            sub_position: self.session.sub_position,
            time_remaining_secs: self.session.time_remaining_secs,
            started: self.started,
            audio: self.audio_state,
            audio_playing: self.audio.is_playing(),
            selected_prompts: self.session.selected_prompts,
            result: self.last_result.clone(),
            submit_outcome: self.submit_outcome.as_ref().map(|o| match o {
                SubmitOutcome::Delivered { destination } => format!("delivered:{}", destination),
                SubmitOutcome::LocalOnly { .. } => "local-only".to_string(),
            }),
        }
    }

    fn ensure_started(&self) -> Result<()> {
        if !self.started {
            anyhow::bail!("exam has not been started");
        }
        Ok(())
    }

    /// Shared transition logic for manual advance and timer expiry.
    async fn step_forward(&mut self) -> Result<()> {
        let phase = self.session.phase;

        if phase == Phase::Complete {
            // Duplicate events after completion are no-ops.
            return Ok(());
        }

        if self.session.sub_position < phase.max_sub_position() {
            self.session.sub_position += 1;
            self.persist();
            return Ok(());
        }

        self.exit_phase().await
    }

    /// One-directional phase exit: freeze the section band, move to the next
    /// phase and re-arm its timer. Each arm of the match runs at most once
    /// per session (bands and prompts are set-once, Complete is terminal).
    async fn exit_phase(&mut self) -> Result<()> {
        let from = self.session.phase;

        match from {
            Phase::Reading => {
                self.freeze_reading_band();
                self.enter_phase(Phase::Listening, self.timings.listening_secs);
                self.audio_state = AudioState::Loading;
                self.start_audio_probe();
            }
            Phase::Listening => {
                self.freeze_listening_band();
                self.enter_phase(Phase::Writing, self.timings.writing_secs);

                // Drawn once, at Writing entry; re-rolling would invalidate
                // resumed state.
                if self.session.selected_prompts.is_none() {
                    let selection = select_prompts(&mut self.rng, &self.prompts);
                    info!(
                        "Writing prompts drawn: chart {}, topic {}",
                        selection.task1, selection.task2
                    );
                    self.session.selected_prompts = Some(selection);
                }
                self.persist();
            }
            Phase::Writing => {
                self.complete().await;
            }
            Phase::Complete => {}
        }

        debug_assert!(self.session.phase.rank() > from.rank());
        Ok(())
    }

    fn enter_phase(&mut self, phase: Phase, duration_secs: u32) {
        info!(
            "Entering {} phase ({}s on the clock)",
            phase.label(),
            duration_secs
        );

        self.session.phase = phase;
        self.session.sub_position = 1;
        self.session.time_remaining_secs = duration_secs;
        self.timer.start(duration_secs, self.events_tx.clone());
        self.persist();
    }

    fn freeze_reading_band(&mut self) {
        if self.session.reading_band.is_some() {
            return;
        }

        let score = scoring::score_section(&self.session.answers.reading, &self.keys.reading);
        let band = scoring::band_from_raw(score, self.keys.reading.len());
        info!(
            "Reading frozen: {}/{} -> band {:.1}",
            score,
            self.keys.reading.len(),
            band
        );
        self.session.reading_band = Some(band);
    }

    fn freeze_listening_band(&mut self) {
        if self.session.listening_band.is_some() {
            return;
        }

        let score = scoring::score_section(&self.session.answers.listening, &self.keys.listening);
        let band = scoring::band_from_raw(score, self.keys.listening.len());
        info!(
            "Listening frozen: {}/{} -> band {:.1}",
            score,
            self.keys.listening.len(),
            band
        );
        self.session.listening_band = Some(band);
    }

    /// Terminal transition: score once, submit once, then wipe the durable
    /// record after a grace delay so the result can still be displayed.
    async fn complete(&mut self) {
        if self.last_result.is_some() {
            warn!("Duplicate complete event ignored");
            return;
        }

        self.timer.cancel();
        self.session.phase = Phase::Complete;
        self.session.sub_position = 1;
        self.session.time_remaining_secs = 0;

        // Bands were frozen at their phase exits; falling back to a fresh
        // computation covers resumed records from older layouts (the result
        // is identical, both are pure functions of the frozen answers).
        let reading_band = self.session.reading_band.unwrap_or_else(|| {
            scoring::band_from_raw(
                scoring::score_section(&self.session.answers.reading, &self.keys.reading),
                self.keys.reading.len(),
            )
        });
        let listening_band = self.session.listening_band.unwrap_or_else(|| {
            scoring::band_from_raw(
                scoring::score_section(&self.session.answers.listening, &self.keys.listening),
                self.keys.listening.len(),
            )
        });

        let record = ResultRecord {
            candidate_id: self.session.candidate_id.clone(),
            reading_score: scoring::score_section(
                &self.session.answers.reading,
                &self.keys.reading,
            ),
            reading_total: self.keys.reading.len(),
            reading_band,
            listening_score: scoring::score_section(
                &self.session.answers.listening,
                &self.keys.listening,
            ),
            listening_total: self.keys.listening.len(),
            listening_band,
            writing1_word_count: scoring::count_words(&self.session.answers.writing1),
            writing2_word_count: scoring::count_words(&self.session.answers.writing2),
            overall_band: scoring::overall_band(reading_band, listening_band),
            completed_at: Utc::now(),
        };

        info!(
            "Attempt complete for {}: overall band {:.1}",
            record.candidate_id, record.overall_band
        );

        self.last_result = Some(record.clone());
        self.persist();

        match self.submitter.submit(&record).await {
            Ok(outcome) => self.submit_outcome = Some(outcome),
            Err(e) => {
                // Local commit failed; the candidate still sees the score.
                error!("Failed to commit result locally: {:#}", e);
            }
        }

        let store = self.store.clone();
        let candidate_id = self.session.candidate_id.clone();
        let grace = Duration::from_secs(self.timings.clear_grace_secs);
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;

            // A new attempt may have replaced the record during the grace
            // window; only this attempt's completed record is removed.
            match store.load() {
                Ok(Some(saved))
                    if saved.phase == Phase::Complete
                        && saved.candidate_id == candidate_id =>
                {
                    if let Err(e) = store.clear() {
                        warn!("Failed to clear session record after grace delay: {:#}", e);
                    }
                }
                Ok(_) => {
                    debug!("Session record replaced during grace window, leaving it");
                }
                Err(e) => {
                    warn!("Failed to inspect session record after grace delay: {:#}", e);
                }
            }
        });
    }

    /// Bounded wait for the listening track, reporting back through the
    /// engine channel so the result is applied on the single writer.
    fn start_audio_probe(&self) {
        let audio = Arc::clone(&self.audio);
        let events = self.events_tx.clone();

        tokio::spawn(async move {
            for attempt in 1..=AUDIO_READY_ATTEMPTS {
                if audio.is_ready().await {
                    if let Err(e) = audio.play().await {
                        warn!("Auto-play of listening track failed: {:#}", e);
                    }
                    let _ = events.send(EngineEvent::AudioReady(true)).await;
                    return;
                }

                debug!(
                    "Listening track not ready (attempt {}/{})",
                    attempt, AUDIO_READY_ATTEMPTS
                );
                tokio::time::sleep(AUDIO_READY_RETRY).await;
            }

            let _ = events.send(EngineEvent::AudioReady(false)).await;
        });
    }

    /// Write-through persistence. Failures are absorbed: the in-memory state
    /// stays authoritative and the next mutation or tick retries the write.
    fn persist(&mut self) {
        self.session.touch();
        if let Err(e) = self.store.save(&self.session) {
            warn!("Session save failed (will retry on next write): {:#}", e);
        }
    }
}
