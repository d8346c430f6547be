//! Messaging transport for the Respira bot.
//!
//! The dialog engine talks to the outside world through the [`Channel`]
//! trait; [`TelegramChannel`] is the shipped implementation, using the
//! Telegram Bot HTTP API: long-polling `getUpdates` for inbound turns
//! and `sendMessage` with reply-keyboard markup for outbound prompts.

/// The transport seam.
pub mod channel;
/// Telegram Bot API adapter.
pub mod telegram;

pub use channel::Channel;
pub use telegram::TelegramChannel;
