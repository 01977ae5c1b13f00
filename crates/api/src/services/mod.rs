//! Outbound integrations.

pub mod telegram;

pub use telegram::{TelegramClient, TelegramError, TelegramNotifier};
