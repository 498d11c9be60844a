// Tests for the phase controller state machine: forward-only transitions,
// single-fire band freeze and submission, stale-timer safety, prompt draws
// and resume semantics.

use anyhow::Result;
use chrono::Utc;
use exam_player::audio::StubAudio;
use exam_player::bank::{AnswerKeys, PromptBank};
use exam_player::session::{
    engine_channel, spawn_engine, AnswerSlot, AudioState, ControllerDeps, EngineEvent,
    EngineHandle, EngineTimings, ExamSession, Phase, PhaseController,
};
use exam_player::store::SessionStore;
use exam_player::submit::{ResultRelay, ResultSubmitter, ResultsLog, SubmitOutcome};
use exam_player::timer::{TimerEvent, TimerSignal};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

struct CountingRelay {
    deliveries: Mutex<Vec<(String, String)>>,
}

impl CountingRelay {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            deliveries: Mutex::new(Vec::new()),
        })
    }

    fn delivery_count(&self) -> usize {
        self.deliveries.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl ResultRelay for CountingRelay {
    async fn deliver(&self, destination: &str, message: &str) -> Result<()> {
        self.deliveries
            .lock()
            .unwrap()
            .push((destination.to_string(), message.to_string()));
        Ok(())
    }

    fn name(&self) -> &str {
        "counting"
    }
}

struct Harness {
    controller: PhaseController,
    events_rx: mpsc::Receiver<EngineEvent>,
    store: SessionStore,
    results: ResultsLog,
    relay: Arc<CountingRelay>,
    _dir: TempDir,
}

fn timings(clear_grace_secs: u64) -> EngineTimings {
    // Long phase budgets keep real timer ticks out of these fast tests
    EngineTimings {
        reading_secs: 600,
        listening_secs: 600,
        writing_secs: 600,
        clear_grace_secs,
    }
}

fn harness_with(saved: Option<ExamSession>, timings: EngineTimings) -> Result<Harness> {
    let dir = TempDir::new()?;
    let store = SessionStore::open(dir.path())?;
    let results = ResultsLog::open(dir.path())?;
    let relay = CountingRelay::new();
    let (events_tx, events_rx) = engine_channel();

    let deps = ControllerDeps {
        store: store.clone(),
        keys: AnswerKeys::builtin(),
        prompts: PromptBank::builtin(),
        submitter: ResultSubmitter::new(
            results.clone(),
            relay.clone(),
            vec!["primary".to_string()],
        ),
        audio: Arc::new(StubAudio::new(true)),
        timings,
        events_tx,
        rng: StdRng::seed_from_u64(7),
    };

    let controller = match saved {
        Some(session) => PhaseController::resume(session, deps),
        None => PhaseController::fresh("candidate-1", deps),
    };

    Ok(Harness {
        controller,
        events_rx,
        store,
        results,
        relay,
        _dir: dir,
    })
}

fn harness() -> Result<Harness> {
    harness_with(None, timings(600))
}

/// Fill `count` correct answers from the key, leaving the rest wrong.
fn fill_answers(
    controller: &mut PhaseController,
    slot: fn(usize) -> AnswerSlot,
    key: &[String],
    count: usize,
) -> Result<()> {
    for (i, expected) in key.iter().enumerate() {
        let value = if i < count {
            expected.clone()
        } else {
            "wrong".to_string()
        };
        controller.set_answer(slot(i), value)?;
    }
    Ok(())
}

async fn advance_times(controller: &mut PhaseController, times: usize) -> Result<()> {
    for _ in 0..times {
        controller.advance().await?;
    }
    Ok(())
}

#[tokio::test]
async fn test_commands_rejected_before_begin() -> Result<()> {
    let mut h = harness()?;

    assert!(h.controller.advance().await.is_err());
    assert!(h
        .controller
        .set_answer(AnswerSlot::Reading { index: 0 }, "x".to_string())
        .is_err());

    Ok(())
}

#[tokio::test]
async fn test_begin_is_idempotent() -> Result<()> {
    let mut h = harness()?;

    h.controller.begin()?;
    let first_generation = h.controller.timer_generation();

    let status = h.controller.begin()?;
    assert_eq!(h.controller.timer_generation(), first_generation);
    assert_eq!(status.phase, Phase::Reading);

    Ok(())
}

#[tokio::test]
async fn test_full_attempt_reaches_expected_bands() -> Result<()> {
    let keys = AnswerKeys::builtin();
    let mut h = harness_with(None, timings(0))?;

    h.controller.begin()?;

    // 36/40 reading (90%) and 22/40 listening (55%)
    fill_answers(
        &mut h.controller,
        |index| AnswerSlot::Reading { index },
        &keys.reading,
        36,
    )?;

    advance_times(&mut h.controller, 3).await?;
    assert_eq!(h.controller.session().phase, Phase::Listening);
    assert_eq!(h.controller.session().reading_band, Some(9.0));

    fill_answers(
        &mut h.controller,
        |index| AnswerSlot::Listening { index },
        &keys.listening,
        22,
    )?;

    advance_times(&mut h.controller, 4).await?;
    assert_eq!(h.controller.session().phase, Phase::Writing);
    assert_eq!(h.controller.session().listening_band, Some(5.5));

    let prompts = h
        .controller
        .session()
        .selected_prompts
        .expect("prompts drawn at Writing entry");
    assert!(prompts.task1 < PromptBank::builtin().task1_charts.len());
    assert!(prompts.task2 < PromptBank::builtin().task2_topics.len());

    h.controller.set_answer(
        AnswerSlot::Writing { task: 1 },
        "The chart shows a clear upward trend".to_string(),
    )?;
    h.controller.set_answer(
        AnswerSlot::Writing { task: 2 },
        "Both views have merit - on balance I agree".to_string(),
    )?;

    advance_times(&mut h.controller, 2).await?;
    assert_eq!(h.controller.session().phase, Phase::Complete);

    let status = h.controller.status();
    let record = status.result.expect("result produced at Complete");
    assert_eq!(record.reading_score, 36);
    assert_eq!(record.reading_band, 9.0);
    assert_eq!(record.listening_score, 22);
    assert_eq!(record.listening_band, 5.5);
    // 7.25 rounds half-up to 7.3
    assert_eq!(record.overall_band, 7.3);
    assert_eq!(record.writing1_word_count, 7);
    assert_eq!(record.writing2_word_count, 9);

    assert_eq!(
        h.controller.submit_outcome(),
        Some(&SubmitOutcome::Delivered {
            destination: "primary".to_string()
        })
    );
    assert_eq!(h.relay.delivery_count(), 1);
    assert_eq!(h.results.load_all()?.len(), 1);

    // Grace delay is zero in this harness: the durable record is wiped
    // shortly after completion
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(h.store.load()?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_phase_exits_once_and_band_stays_frozen() -> Result<()> {
    let mut h = harness()?;
    h.controller.begin()?;

    // advance, advance, advance, advance-past-end from Reading{1}
    advance_times(&mut h.controller, 3).await?;
    assert_eq!(h.controller.session().phase, Phase::Listening);
    assert_eq!(h.controller.session().sub_position, 1);
    let frozen = h.controller.session().reading_band;
    assert!(frozen.is_some());

    h.controller.advance().await?;
    assert_eq!(h.controller.session().phase, Phase::Listening);
    assert_eq!(h.controller.session().sub_position, 2);
    assert_eq!(h.controller.session().reading_band, frozen);

    Ok(())
}

#[tokio::test]
async fn test_back_navigates_within_phase_but_never_across() -> Result<()> {
    let mut h = harness()?;
    h.controller.begin()?;

    h.controller.advance().await?;
    assert_eq!(h.controller.session().sub_position, 2);

    h.controller.back()?;
    assert_eq!(h.controller.session().sub_position, 1);

    // At the first sub-position "previous" is a no-op
    h.controller.back()?;
    assert_eq!(h.controller.session().phase, Phase::Reading);
    assert_eq!(h.controller.session().sub_position, 1);

    // Same at the start of a later phase: never crosses backward
    advance_times(&mut h.controller, 2).await?;
    assert_eq!(h.controller.session().phase, Phase::Listening);
    h.controller.back()?;
    assert_eq!(h.controller.session().phase, Phase::Listening);
    assert_eq!(h.controller.session().sub_position, 1);

    Ok(())
}

#[tokio::test]
async fn test_timer_expiry_fast_forwards_to_phase_exit() -> Result<()> {
    let mut h = harness()?;
    h.controller.begin()?;

    let generation = h.controller.timer_generation();
    h.controller
        .on_timer(TimerEvent {
            generation,
            signal: TimerSignal::Expired,
        })
        .await?;

    assert_eq!(h.controller.session().phase, Phase::Listening);
    assert_eq!(h.controller.session().sub_position, 1);
    assert!(h.controller.session().reading_band.is_some());
    // The listening clock was re-armed with its own budget
    assert_eq!(h.controller.session().time_remaining_secs, 600);

    Ok(())
}

#[tokio::test]
async fn test_stale_timer_events_are_dropped() -> Result<()> {
    let mut h = harness()?;
    h.controller.begin()?;
    let reading_generation = h.controller.timer_generation();

    advance_times(&mut h.controller, 3).await?;
    assert_eq!(h.controller.session().phase, Phase::Listening);
    assert!(h.controller.timer_generation() > reading_generation);

    // An orphaned expiry from the reading timer must not double-advance
    h.controller
        .on_timer(TimerEvent {
            generation: reading_generation,
            signal: TimerSignal::Expired,
        })
        .await?;

    assert_eq!(h.controller.session().phase, Phase::Listening);
    assert_eq!(h.controller.session().sub_position, 1);
    assert!(h.controller.session().listening_band.is_none());

    // Stale ticks are dropped too
    h.controller
        .on_timer(TimerEvent {
            generation: reading_generation,
            signal: TimerSignal::Tick { remaining: 5 },
        })
        .await?;
    assert_eq!(h.controller.session().time_remaining_secs, 600);

    Ok(())
}

#[tokio::test]
async fn test_tick_updates_countdown_and_persists() -> Result<()> {
    let mut h = harness()?;
    h.controller.begin()?;

    let generation = h.controller.timer_generation();
    h.controller
        .on_timer(TimerEvent {
            generation,
            signal: TimerSignal::Tick { remaining: 599 },
        })
        .await?;

    assert_eq!(h.controller.session().time_remaining_secs, 599);
    let persisted = h.store.load()?.expect("tick should persist the session");
    assert_eq!(persisted.time_remaining_secs, 599);

    Ok(())
}

#[tokio::test]
async fn test_duplicate_completion_submits_once() -> Result<()> {
    let mut h = harness()?;
    h.controller.begin()?;

    advance_times(&mut h.controller, 9).await?;
    assert_eq!(h.controller.session().phase, Phase::Complete);
    assert_eq!(h.relay.delivery_count(), 1);

    // A duplicate event after completion is a no-op
    h.controller.advance().await?;
    let generation = h.controller.timer_generation();
    h.controller
        .on_timer(TimerEvent {
            generation,
            signal: TimerSignal::Expired,
        })
        .await?;

    assert_eq!(h.relay.delivery_count(), 1);
    assert_eq!(h.results.load_all()?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_grace_clear_leaves_a_successor_record_alone() -> Result<()> {
    let mut h = harness_with(None, timings(0))?;
    h.controller.begin()?;

    advance_times(&mut h.controller, 9).await?;
    assert_eq!(h.controller.session().phase, Phase::Complete);

    // A new candidate's attempt replaces the durable record before the
    // grace-delay task fires
    let successor = ExamSession::new("candidate-2", 40, 40, 600);
    h.store.save(&successor)?;

    tokio::time::sleep(Duration::from_millis(100)).await;

    let kept = h
        .store
        .load()?
        .expect("successor record must survive the previous attempt's cleanup");
    assert_eq!(kept.candidate_id, "candidate-2");
    assert_eq!(kept.phase, Phase::Reading);

    Ok(())
}

#[tokio::test]
async fn test_shutdown_stops_the_engine_task() -> Result<()> {
    let dir = TempDir::new()?;
    let store = SessionStore::open(dir.path())?;
    let results = ResultsLog::open(dir.path())?;
    let (tx, rx) = engine_channel();

    let deps = ControllerDeps {
        store,
        keys: AnswerKeys::builtin(),
        prompts: PromptBank::builtin(),
        submitter: ResultSubmitter::new(results, CountingRelay::new(), Vec::new()),
        audio: Arc::new(StubAudio::new(true)),
        timings: timings(600),
        events_tx: tx.clone(),
        rng: StdRng::seed_from_u64(7),
    };
    let controller = PhaseController::fresh("candidate-1", deps);
    let task = spawn_engine(controller, rx);
    let handle = EngineHandle::new(tx);

    handle.begin().await?;
    handle.shutdown().await;

    // The loop exits even though the controller held a sender clone
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("engine task should stop after shutdown")?;

    // Commands to the stopped engine fail instead of hanging
    assert!(handle.status().await.is_err());

    Ok(())
}

#[tokio::test]
async fn test_answer_index_out_of_range_is_rejected() -> Result<()> {
    let mut h = harness()?;
    h.controller.begin()?;

    assert!(h
        .controller
        .set_answer(AnswerSlot::Reading { index: 40 }, "x".to_string())
        .is_err());
    assert!(h
        .controller
        .set_answer(AnswerSlot::Writing { task: 3 }, "x".to_string())
        .is_err());

    Ok(())
}

#[tokio::test]
async fn test_answers_match_key_despite_case_and_whitespace() -> Result<()> {
    let keys = AnswerKeys::builtin();
    let mut h = harness()?;
    h.controller.begin()?;

    // Submit every reading answer lower-cased with padding
    for (i, expected) in keys.reading.iter().enumerate() {
        h.controller.set_answer(
            AnswerSlot::Reading { index: i },
            format!("  {} ", expected.to_lowercase()),
        )?;
    }

    advance_times(&mut h.controller, 3).await?;
    assert_eq!(h.controller.session().reading_band, Some(9.0));

    Ok(())
}

#[tokio::test]
async fn test_resume_charges_elapsed_time_plus_penalty() -> Result<()> {
    let mut saved = ExamSession::new("candidate-1", 40, 40, 600);
    saved.time_remaining_secs = 100;
    saved.saved_at_epoch_ms = Utc::now().timestamp_millis() - 10_000;

    let h = harness_with(Some(saved), timings(600))?;
    assert_eq!(h.controller.session().time_remaining_secs, 87);

    Ok(())
}

#[tokio::test]
async fn test_resume_preserves_frozen_bands_and_prompts() -> Result<()> {
    let mut saved = ExamSession::new("candidate-1", 40, 40, 600);
    saved.phase = Phase::Writing;
    saved.sub_position = 1;
    saved.time_remaining_secs = 300;
    saved.saved_at_epoch_ms = Utc::now().timestamp_millis();
    saved.reading_band = Some(7.0);
    saved.listening_band = Some(6.0);
    saved.selected_prompts = Some(exam_player::PromptSelection { task1: 2, task2: 5 });

    let mut h = harness_with(Some(saved), timings(600))?;
    h.controller.begin()?;

    // Finish the attempt; the frozen values flow into the result unchanged
    advance_times(&mut h.controller, 2).await?;
    let record = h.controller.status().result.expect("result present");
    assert_eq!(record.reading_band, 7.0);
    assert_eq!(record.listening_band, 6.0);
    assert_eq!(record.overall_band, 6.5);
    assert_eq!(
        h.controller.session().selected_prompts,
        Some(exam_player::PromptSelection { task1: 2, task2: 5 })
    );

    Ok(())
}

#[tokio::test]
async fn test_listening_entry_reports_audio_ready() -> Result<()> {
    let mut h = harness()?;
    h.controller.begin()?;

    advance_times(&mut h.controller, 3).await?;
    assert_eq!(h.controller.audio_state(), AudioState::Loading);

    // The readiness probe reports back through the engine channel
    let ready = loop {
        let event = tokio::time::timeout(Duration::from_secs(1), h.events_rx.recv())
            .await
            .expect("probe result should arrive")
            .expect("channel open");
        if let EngineEvent::AudioReady(ready) = event {
            break ready;
        }
    };
    assert!(ready);

    h.controller.on_audio_ready(ready);
    assert_eq!(h.controller.audio_state(), AudioState::Ready);

    Ok(())
}

#[tokio::test]
async fn test_audio_unavailable_degrades_without_blocking() -> Result<()> {
    let mut h = harness()?;
    h.controller.begin()?;
    advance_times(&mut h.controller, 3).await?;

    h.controller.on_audio_ready(false);
    assert_eq!(h.controller.audio_state(), AudioState::Unavailable);

    // The countdown and navigation continue regardless
    h.controller.advance().await?;
    assert_eq!(h.controller.session().sub_position, 2);

    Ok(())
}

#[tokio::test]
async fn test_audio_playback_only_in_listening_phase() -> Result<()> {
    let mut h = harness()?;
    h.controller.begin()?;

    assert!(h.controller.audio_play().await.is_err());

    advance_times(&mut h.controller, 3).await?;
    assert_eq!(h.controller.session().phase, Phase::Listening);
    let status = h.controller.audio_play().await?;
    assert!(status.audio_playing);

    let status = h.controller.audio_pause().await?;
    assert!(!status.audio_playing);

    Ok(())
}
