use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use exam_player::http::{AdminCredentials, AppState, EngineSeed};
use exam_player::{
    create_router, AnswerKeys, Config, CredentialStore, LocalTrackPlayer, PromptBank,
    SessionStore, TelegramRelay,
};
use exam_player::submit::ResultsLog;

#[derive(Parser, Debug)]
#[command(name = "exam-player", about = "Online mock-exam session engine")]
struct Args {
    /// Config file (without extension), resolved by the config crate
    #[arg(long, default_value = "config/exam-player")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("{} starting", cfg.service.name);

    let store = SessionStore::open(&cfg.storage.data_dir)?;
    let results = ResultsLog::open(&cfg.storage.data_dir)?;
    let credentials = CredentialStore::open(&cfg.storage.data_dir)?;

    let seed = EngineSeed {
        store: store.clone(),
        keys: AnswerKeys::builtin(),
        prompts: PromptBank::builtin(),
        results: results.clone(),
        relay: Arc::new(TelegramRelay::new(
            cfg.relay.api_base.clone(),
            cfg.relay.bot_token.clone(),
        )),
        relay_destinations: cfg.relay.destinations.clone(),
        audio: Arc::new(LocalTrackPlayer::new(&cfg.audio.listening_track)),
        timings: cfg.timers.to_timings(),
    };

    // Pick up an interrupted attempt: the engine resumes it with the elapsed
    // time and refresh penalty already charged, and re-arms the timer.
    let engine = match store.load()? {
        Some(saved) if saved.phase != exam_player::Phase::Complete => {
            info!(
                "Resuming interrupted attempt for {} ({} phase)",
                saved.candidate_id,
                saved.phase.label()
            );
            let handle = seed.spawn_resumed(saved);
            if let Err(e) = handle.begin().await {
                warn!("Failed to restart resumed attempt: {:#}", e);
            }
            Some(handle)
        }
        Some(_) => {
            // A completed record that was never cleared; drop it.
            store.clear()?;
            None
        }
        None => None,
    };

    let state = AppState {
        engine: Arc::new(RwLock::new(engine)),
        credentials,
        results,
        admin: AdminCredentials {
            username: cfg.admin.username.clone(),
            password: cfg.admin.password.clone(),
        },
        seed,
        audio_assets_dir: cfg.audio.assets_dir.clone(),
    };

    let router = create_router(state);
    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    info!("HTTP server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, router)
        .await
        .context("HTTP server failed")?;

    Ok(())
}
