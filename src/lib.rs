pub mod audio;
pub mod auth;
pub mod bank;
pub mod config;
pub mod http;
pub mod scoring;
pub mod session;
pub mod store;
pub mod submit;
pub mod timer;

pub use audio::{AudioPlayback, LocalTrackPlayer, StubAudio};
pub use auth::{CandidateRecord, CredentialStore, LoginOutcome};
pub use bank::{select_prompts, AnswerKeys, ChartPrompt, PromptBank};
pub use config::Config;
pub use http::{create_router, AppState};
pub use session::{
    AnswerSlot, AudioState, ControllerDeps, EngineHandle, EngineTimings, ExamSession,
    Phase, PhaseController, PromptSelection, StatusView,
};
pub use store::SessionStore;
pub use submit::{
    format_result_message, ResultRecord, ResultRelay, ResultSubmitter, ResultsLog,
    SubmitOutcome, TelegramRelay,
};
pub use timer::{resumed_remaining, PhaseTimer, TimerEvent, TimerSignal, RESUME_PENALTY_SECS};
