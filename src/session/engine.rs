use anyhow::{Context, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::controller::PhaseController;
use super::events::{AnswerSlot, EngineCommand, EngineEvent, StatusView};

/// Depth of the engine's event queue. Timer ticks arrive at 1 Hz and
/// commands are request/response, so this never fills in practice.
pub const ENGINE_QUEUE_DEPTH: usize = 64;

/// Create the engine's event channel. The sender side goes into
/// `ControllerDeps` (timers and probes report through it) and into the
/// `EngineHandle`; the receiver side is consumed by `spawn_engine`.
pub fn engine_channel() -> (mpsc::Sender<EngineEvent>, mpsc::Receiver<EngineEvent>) {
    mpsc::channel(ENGINE_QUEUE_DEPTH)
}

/// Run the controller as the single writer: every command, timer event and
/// probe result is applied sequentially on this task.
pub fn spawn_engine(
    mut controller: PhaseController,
    mut events_rx: mpsc::Receiver<EngineEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Engine task started");

        while let Some(event) = events_rx.recv().await {
            match event {
                EngineEvent::Command(EngineCommand::Shutdown) => break,
                EngineEvent::Command(command) => handle_command(&mut controller, command).await,
                EngineEvent::Timer(timer_event) => {
                    if let Err(e) = controller.on_timer(timer_event).await {
                        error!("Timer event handling failed: {:#}", e);
                    }
                }
                EngineEvent::AudioReady(ready) => controller.on_audio_ready(ready),
            }
        }

        info!("Engine task stopped");
    })
}

async fn handle_command(controller: &mut PhaseController, command: EngineCommand) {
    match command {
        EngineCommand::Begin { reply } => {
            let _ = reply.send(controller.begin());
        }
        EngineCommand::Advance { reply } => {
            let _ = reply.send(controller.advance().await);
        }
        EngineCommand::Back { reply } => {
            let _ = reply.send(controller.back());
        }
        EngineCommand::SetAnswer { slot, value, reply } => {
            let _ = reply.send(controller.set_answer(slot, value));
        }
        EngineCommand::AudioPlay { reply } => {
            let _ = reply.send(controller.audio_play().await);
        }
        EngineCommand::AudioPause { reply } => {
            let _ = reply.send(controller.audio_pause().await);
        }
        EngineCommand::Status { reply } => {
            let _ = reply.send(controller.status());
        }
        // Intercepted by the event loop before dispatch.
        EngineCommand::Shutdown => {}
    }
}

/// Cheap, cloneable front to the engine task for the HTTP layer.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineEvent>,
}

impl EngineHandle {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }

    pub async fn begin(&self) -> Result<StatusView> {
        self.request(|reply| EngineCommand::Begin { reply }).await
    }

    pub async fn advance(&self) -> Result<StatusView> {
        self.request(|reply| EngineCommand::Advance { reply }).await
    }

    pub async fn back(&self) -> Result<StatusView> {
        self.request(|reply| EngineCommand::Back { reply }).await
    }

    pub async fn set_answer(&self, slot: AnswerSlot, value: String) -> Result<StatusView> {
        self.request(|reply| EngineCommand::SetAnswer { slot, value, reply })
            .await
    }

    pub async fn audio_play(&self) -> Result<StatusView> {
        self.request(|reply| EngineCommand::AudioPlay { reply })
            .await
    }

    pub async fn audio_pause(&self) -> Result<StatusView> {
        self.request(|reply| EngineCommand::AudioPause { reply })
            .await
    }

    /// Stop the engine task. Errors are ignored: a task that is already
    /// gone is the desired end state.
    pub async fn shutdown(&self) {
        let _ = self
            .tx
            .send(EngineEvent::Command(EngineCommand::Shutdown))
            .await;
    }

    pub async fn status(&self) -> Result<StatusView> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(EngineEvent::Command(EngineCommand::Status { reply }))
            .await
            .context("Engine task is gone")?;
        rx.await.context("Engine task dropped the status request")
    }

    async fn request<F>(&self, make: F) -> Result<StatusView>
    where
        F: FnOnce(oneshot::Sender<Result<StatusView>>) -> EngineCommand,
    {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(EngineEvent::Command(make(reply)))
            .await
            .context("Engine task is gone")?;
        rx.await.context("Engine task dropped the request")?
    }
}
