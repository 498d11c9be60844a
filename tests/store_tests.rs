// Tests for the session store: round-trip persistence, corrupt-state
// handling and idempotent clearing.

use anyhow::Result;
use exam_player::{ExamSession, Phase, PromptSelection, SessionStore};
use std::fs;
use tempfile::TempDir;

fn sample_session() -> ExamSession {
    let mut session = ExamSession::new("candidate-1", 40, 40, 3600);
    session.answers.reading[0] = "TRUE".to_string();
    session.answers.reading[39] = "C".to_string();
    session.answers.writing1 = "Some essay text".to_string();
    session
}

#[test]
fn test_save_load_round_trip() -> Result<()> {
    let dir = TempDir::new()?;
    let store = SessionStore::open(dir.path())?;

    let session = sample_session();
    store.save(&session)?;

    let loaded = store.load()?.expect("session should be present");
    assert_eq!(loaded, session);

    Ok(())
}

#[test]
fn test_round_trip_preserves_frozen_bands_and_prompts() -> Result<()> {
    let dir = TempDir::new()?;
    let store = SessionStore::open(dir.path())?;

    let mut session = sample_session();
    session.phase = Phase::Writing;
    session.sub_position = 2;
    session.reading_band = Some(7.5);
    session.listening_band = Some(6.0);
    session.selected_prompts = Some(PromptSelection { task1: 3, task2: 11 });

    store.save(&session)?;
    let loaded = store.load()?.expect("session should be present");

    assert_eq!(loaded.reading_band, Some(7.5));
    assert_eq!(loaded.listening_band, Some(6.0));
    assert_eq!(
        loaded.selected_prompts,
        Some(PromptSelection { task1: 3, task2: 11 })
    );

    Ok(())
}

#[test]
fn test_load_without_saved_session_returns_none() -> Result<()> {
    let dir = TempDir::new()?;
    let store = SessionStore::open(dir.path())?;

    assert!(store.load()?.is_none());

    Ok(())
}

#[test]
fn test_corrupt_record_is_treated_as_no_session() -> Result<()> {
    let dir = TempDir::new()?;
    let store = SessionStore::open(dir.path())?;

    fs::write(store.path(), b"{ not json")?;
    assert!(store.load()?.is_none());

    // A valid-JSON record that fails schema validation is also "no session"
    fs::write(store.path(), br#"{"unexpected": true}"#)?;
    assert!(store.load()?.is_none());

    Ok(())
}

#[test]
fn test_save_overwrites_previous_record() -> Result<()> {
    let dir = TempDir::new()?;
    let store = SessionStore::open(dir.path())?;

    let mut session = sample_session();
    store.save(&session)?;

    session.phase = Phase::Listening;
    session.sub_position = 2;
    session.time_remaining_secs = 900;
    store.save(&session)?;

    let loaded = store.load()?.expect("session should be present");
    assert_eq!(loaded.phase, Phase::Listening);
    assert_eq!(loaded.sub_position, 2);
    assert_eq!(loaded.time_remaining_secs, 900);

    Ok(())
}

#[test]
fn test_save_leaves_no_temp_file_behind() -> Result<()> {
    let dir = TempDir::new()?;
    let store = SessionStore::open(dir.path())?;

    store.save(&sample_session())?;

    let leftovers: Vec<_> = fs::read_dir(dir.path())?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "temp file should have been renamed");

    Ok(())
}

#[test]
fn test_clear_is_idempotent() -> Result<()> {
    let dir = TempDir::new()?;
    let store = SessionStore::open(dir.path())?;

    store.save(&sample_session())?;
    store.clear()?;
    assert!(store.load()?.is_none());

    // Clearing an already-absent record succeeds
    store.clear()?;

    Ok(())
}
