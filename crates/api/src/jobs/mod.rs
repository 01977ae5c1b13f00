//! Long-running background tasks.

mod telegram_updates;

pub use telegram_updates::{ChatLink, TelegramUpdateListener};
