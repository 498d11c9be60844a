use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::info;

use super::ResultRecord;

const RELAY_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Message relay accepting a text payload for one destination identifier.
/// Delivery is best-effort; the submitter handles fallback across
/// destinations.
#[async_trait::async_trait]
pub trait ResultRelay: Send + Sync {
    /// Deliver `message` to `destination`. `Ok(())` means the relay
    /// acknowledged the message.
    async fn deliver(&self, destination: &str, message: &str) -> Result<()>;

    /// Relay name for logging.
    fn name(&self) -> &str;
}

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    ok: bool,
    description: Option<String>,
}

/// Telegram-bot-API relay: destinations are chat identifiers (channel
/// username or numeric chat id).
pub struct TelegramRelay {
    client: Client,
    api_base: String,
    bot_token: String,
}

impl TelegramRelay {
    pub fn new(api_base: impl Into<String>, bot_token: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(RELAY_REQUEST_TIMEOUT)
                .build()
                .expect("reqwest client construction cannot fail with static options"),
            api_base: api_base.into(),
            bot_token: bot_token.into(),
        }
    }
}

#[async_trait::async_trait]
impl ResultRelay for TelegramRelay {
    async fn deliver(&self, destination: &str, message: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);

        let response = self
            .client
            .post(&url)
            .json(&json!({
                "chat_id": destination,
                "text": message,
                "parse_mode": "Markdown",
            }))
            .send()
            .await
            .context("Relay request failed")?;

        let body: SendMessageResponse = response
            .json()
            .await
            .context("Relay returned an unparseable response")?;

        if !body.ok {
            anyhow::bail!(
                "relay rejected message for {}: {}",
                destination,
                body.description.unwrap_or_else(|| "no description".to_string())
            );
        }

        info!("Result delivered to {}", destination);
        Ok(())
    }

    fn name(&self) -> &str {
        "telegram"
    }
}

/// Format the candidate-facing result summary sent through the relay.
pub fn format_result_message(record: &ResultRecord) -> String {
    format!(
        "\u{1F4CA} *Exam Results*\n\n\
         \u{1F464} *Candidate*: {}\n\n\
         \u{1F4DA} *Reading*: {}/{} - Band {:.1}\n\
         \u{1F3A7} *Listening*: {}/{} - Band {:.1}\n\n\
         \u{270D} *Writing*:\n\
         Task 1: {} words\n\
         Task 2: {} words\n\n\
         \u{1F31F} *Overall Band Score*: {:.1}\n\n\
         \u{23F0} *Completed*: {}",
        record.candidate_id,
        record.reading_score,
        record.reading_total,
        record.reading_band,
        record.listening_score,
        record.listening_total,
        record.listening_band,
        record.writing1_word_count,
        record.writing2_word_count,
        record.overall_band,
        record.completed_at.format("%Y-%m-%d %H:%M:%S UTC"),
    )
}
