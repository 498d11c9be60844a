//! Exam session engine
//!
//! This module provides the single-session state machine:
//! - `ExamSession` durable data model (phase, answers, countdown, prompts)
//! - `PhaseController` state machine (forward-only phase order, single-fire
//!   band freeze and submission, timer/audio orchestration)
//! - the engine event loop and the `EngineHandle` used by the HTTP layer

pub mod controller;
pub mod engine;
pub mod events;
pub mod state;

pub use controller::{ControllerDeps, EngineTimings, PhaseController};
pub use engine::{engine_channel, spawn_engine, EngineHandle};
pub use events::{AnswerSlot, AudioState, EngineCommand, EngineEvent, StatusView};
pub use state::{AnswerSheet, ExamSession, Phase, PromptSelection};
