//! Telegram bot surface
//!
//! Long polling against the Bot API. Commands resolve the caller's
//! account and reply with mini-app launch links; referral notifications
//! go out on a best-effort basis.

pub mod client;
pub mod commands;
pub mod poller;

pub use client::{InlineKeyboardButton, InlineKeyboardMarkup, TelegramClient, WebAppInfo};
pub use commands::{parse_command, Command};
pub use poller::spawn_poller;
