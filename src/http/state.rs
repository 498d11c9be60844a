use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::audio::AudioPlayback;
use crate::auth::CredentialStore;
use crate::bank::{AnswerKeys, PromptBank};
use crate::session::{
    engine_channel, spawn_engine, ControllerDeps, EngineHandle, EngineTimings, ExamSession,
    PhaseController,
};
use crate::store::SessionStore;
use crate::submit::{ResultRelay, ResultSubmitter, ResultsLog};

/// Everything needed to construct a fresh engine when a candidate logs in.
#[derive(Clone)]
pub struct EngineSeed {
    pub store: SessionStore,
    pub keys: AnswerKeys,
    pub prompts: PromptBank,
    pub results: ResultsLog,
    pub relay: Arc<dyn ResultRelay>,
    pub relay_destinations: Vec<String>,
    pub audio: Arc<dyn AudioPlayback>,
    pub timings: EngineTimings,
}

impl EngineSeed {
    fn controller_deps(
        &self,
        events_tx: tokio::sync::mpsc::Sender<crate::session::EngineEvent>,
    ) -> ControllerDeps {
        ControllerDeps {
            store: self.store.clone(),
            keys: self.keys.clone(),
            prompts: self.prompts.clone(),
            submitter: ResultSubmitter::new(
                self.results.clone(),
                Arc::clone(&self.relay),
                self.relay_destinations.clone(),
            ),
            audio: Arc::clone(&self.audio),
            timings: self.timings.clone(),
            events_tx,
            rng: StdRng::from_entropy(),
        }
    }

    /// Spawn an engine for a fresh attempt.
    pub fn spawn_fresh(&self, candidate_id: &str) -> EngineHandle {
        let (tx, rx) = engine_channel();
        let controller = PhaseController::fresh(candidate_id, self.controller_deps(tx.clone()));
        spawn_engine(controller, rx);
        EngineHandle::new(tx)
    }

    /// Spawn an engine for a persisted attempt found at startup.
    pub fn spawn_resumed(&self, saved: ExamSession) -> EngineHandle {
        let (tx, rx) = engine_channel();
        let controller = PhaseController::resume(saved, self.controller_deps(tx.clone()));
        spawn_engine(controller, rx);
        EngineHandle::new(tx)
    }
}

/// Administrator credentials from config; they only classify the login
/// role, there is no real security model here.
#[derive(Clone)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

/// Shared application state for HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// The single active attempt's engine, if any.
    pub engine: Arc<RwLock<Option<EngineHandle>>>,
    pub credentials: CredentialStore,
    pub results: ResultsLog,
    pub admin: AdminCredentials,
    pub seed: EngineSeed,
    pub audio_assets_dir: String,
}
