//! Telegram Bot API client and the [`Notifier`] built on it.
//!
//! Users are reachable only after they send `/start` to the bot, which links
//! their chat id to the account (see `jobs::telegram_updates`).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use domain::models::{Bill, User};
use domain::ports::{NotificationError, Notifier, UserRepository};
use domain::services::notification::{bill_message, invitation_message};

use crate::config::TelegramConfig;

/// Error type for Bot API calls.
#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Telegram API error: {0}")]
    ApiError(String),

    #[error("Telegram is not configured: {0}")]
    NotConfigured(String),
}

/// Envelope of every Bot API response.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Debug, Serialize)]
struct GetUpdatesRequest {
    offset: i64,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub chat: Chat,
    pub from: Option<Sender>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sender {
    pub username: Option<String>,
}

/// Thin Bot API client. Cloning shares the connection pool.
#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    /// `{api_url}/bot{token}`
    endpoint: String,
    request_timeout: Duration,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("endpoint", &"[REDACTED]")
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> Result<Self, TelegramError> {
        if config.bot_token.is_empty() {
            return Err(TelegramError::NotConfigured("bot_token is empty".to_string()));
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/bot{}",
                config.api_url.trim_end_matches('/'),
                config.bot_token
            ),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }

    async fn call<B, T>(&self, method: &str, body: &B, timeout: Duration) -> Result<T, TelegramError>
    where
        B: Serialize + ?Sized,
        T: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .post(format!("{}/{}", self.endpoint, method))
            .timeout(timeout)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let envelope: ApiResponse<T> = response.json().await?;
        match envelope {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse { description, .. } => Err(TelegramError::ApiError(
                description.unwrap_or_else(|| format!("{method} failed with status {status}")),
            )),
        }
    }

    /// Sends a Markdown message to a chat.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
        let request = SendMessageRequest {
            chat_id,
            text,
            parse_mode: "Markdown",
        };
        let _: serde_json::Value = self
            .call("sendMessage", &request, self.request_timeout)
            .await?;
        tracing::debug!(chat_id = chat_id, "Telegram message sent");
        Ok(())
    }

    /// Long-polls for updates after `offset`.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>, TelegramError> {
        let request = GetUpdatesRequest {
            offset,
            timeout: timeout_secs,
            allowed_updates: ["message"],
        };
        // The HTTP timeout must outlast the server-side long poll.
        let timeout = Duration::from_secs(timeout_secs) + self.request_timeout;
        self.call("getUpdates", &request, timeout).await
    }
}

/// Delivers notifications as Telegram messages.
pub struct TelegramNotifier {
    client: TelegramClient,
    users: Arc<dyn UserRepository>,
}

impl TelegramNotifier {
    pub fn new(client: TelegramClient, users: Arc<dyn UserRepository>) -> Self {
        Self { client, users }
    }

    async fn deliver(&self, user: Option<User>, text: &str) -> Result<(), NotificationError> {
        let user = user.ok_or(NotificationError::UnknownRecipient)?;
        let chat_id = user.telegram_chat_id.ok_or(NotificationError::NoChat)?;
        self.client
            .send_message(chat_id, text)
            .await
            .map_err(|e| NotificationError::Delivery(e.to_string()))
    }

    async fn user_by_id(&self, user_id: i64) -> Result<Option<User>, NotificationError> {
        self.users
            .find_by_id(user_id)
            .await
            .map_err(|e| NotificationError::Delivery(e.to_string()))
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_invitation(
        &self,
        invite_url: &str,
        apartment_id: i64,
        handle: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), NotificationError> {
        let receiver = self
            .users
            .resolve_by_handle(handle)
            .await
            .map_err(|e| NotificationError::Delivery(e.to_string()))?;
        self.deliver(receiver, &invitation_message(invite_url, apartment_id, expires_at))
            .await
    }

    async fn send_bill_notice(
        &self,
        user_id: i64,
        bill: &Bill,
        amount_cents: i64,
    ) -> Result<(), NotificationError> {
        let user = self.user_by_id(user_id).await?;
        self.deliver(user, &bill_message(bill, amount_cents)).await
    }

    async fn send_message(&self, user_id: i64, text: &str) -> Result<(), NotificationError> {
        let user = self.user_by_id(user_id).await?;
        self.deliver(user, text).await
    }
}
