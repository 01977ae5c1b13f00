//! Telegram `/start` listener.
//!
//! A poller task long-polls `getUpdates` and hands every `/start` to a linker
//! task over an mpsc channel; the linker stores the chat id on the matching
//! account and greets the user. Both stop on the shared watch channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use domain::services::UserService;

use crate::services::telegram::{TelegramClient, Update};

const RETRY_DELAY: Duration = Duration::from_secs(5);
const LINK_QUEUE_DEPTH: usize = 64;

/// A user who sent `/start` from a chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLink {
    pub username: String,
    pub chat_id: i64,
}

impl ChatLink {
    /// Extracts a link from a `/start` message (`/start`, `/start@bot`, `/start payload`).
    pub fn from_update(update: &Update) -> Option<Self> {
        let message = update.message.as_ref()?;
        let command = message.text.as_deref()?.split_whitespace().next()?;
        let command = command.split('@').next()?;
        if command != "/start" {
            return None;
        }
        let username = message.from.as_ref()?.username.clone()?;
        Some(Self {
            username,
            chat_id: message.chat.id,
        })
    }
}

pub fn welcome_message(username: &str) -> String {
    format!("Welcome, {}! Bot is active.", username)
}

pub struct TelegramUpdateListener {
    client: TelegramClient,
    users: Arc<UserService>,
    poll_timeout_secs: u64,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl TelegramUpdateListener {
    pub fn new(client: TelegramClient, users: Arc<UserService>, poll_timeout_secs: u64) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            client,
            users,
            poll_timeout_secs,
            shutdown_tx,
            shutdown_rx,
            handles: Vec::new(),
        }
    }

    /// Spawns the poller and linker tasks.
    pub fn start(&mut self) {
        info!(poll_timeout_secs = self.poll_timeout_secs, "Starting Telegram update listener");
        let (link_tx, link_rx) = mpsc::channel(LINK_QUEUE_DEPTH);

        self.handles.push(tokio::spawn(poll_updates(
            self.client.clone(),
            self.poll_timeout_secs,
            link_tx,
            self.shutdown_rx.clone(),
        )));
        self.handles.push(tokio::spawn(link_chats(
            self.client.clone(),
            Arc::clone(&self.users),
            link_rx,
        )));
    }

    /// Signals both tasks to stop. Returns immediately.
    pub fn shutdown(&self) {
        info!("Initiating Telegram listener shutdown");
        let _ = self.shutdown_tx.send(true);
    }

    /// Waits for both tasks to finish, up to `timeout`.
    pub async fn wait_for_shutdown(self, timeout: Duration) {
        let shutdown_future = async {
            for handle in self.handles {
                if let Err(e) = handle.await {
                    warn!("Telegram listener task panicked: {}", e);
                }
            }
        };

        match tokio::time::timeout(timeout, shutdown_future).await {
            Ok(()) => info!("Telegram listener stopped"),
            Err(_) => warn!("Telegram listener shutdown timed out after {:?}", timeout),
        }
    }
}

async fn poll_updates(
    client: TelegramClient,
    poll_timeout_secs: u64,
    links: mpsc::Sender<ChatLink>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut offset = 0_i64;

    loop {
        let delay = tokio::select! {
            result = client.get_updates(offset, poll_timeout_secs) => match result {
                Ok(updates) => {
                    for update in &updates {
                        offset = offset.max(update.update_id + 1);
                        if let Some(link) = ChatLink::from_update(update) {
                            // Dropping the sender closes the linker; a closed receiver ends us too.
                            if links.send(link).await.is_err() {
                                return;
                            }
                        }
                    }
                    None
                }
                Err(e) => {
                    error!(error = %e, "Failed to fetch Telegram updates");
                    Some(RETRY_DELAY)
                }
            },
            changed = shutdown_rx.changed() => {
                // A dropped sender counts as shutdown.
                if changed.is_err() || *shutdown_rx.borrow() {
                    info!("Telegram poller shutting down");
                    return;
                }
                None
            }
        };

        if let Some(delay) = delay {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        return;
                    }
                }
            }
        }
    }
}

async fn link_chats(client: TelegramClient, users: Arc<UserService>, mut links: mpsc::Receiver<ChatLink>) {
    while let Some(link) = links.recv().await {
        match users.link_telegram_chat(&link.username, link.chat_id).await {
            Ok(_) => {
                if let Err(e) = client
                    .send_message(link.chat_id, &welcome_message(&link.username))
                    .await
                {
                    warn!(chat_id = link.chat_id, error = %e, "Failed to send welcome message");
                }
            }
            Err(e) => error!(chat_id = link.chat_id, error = %e, "Failed to link Telegram chat"),
        }
    }
    info!("Telegram linker shutting down");
}
