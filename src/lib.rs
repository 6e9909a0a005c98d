//! Vineyard - tap-to-earn rewards gateway for Telegram mini-apps
//!
//! "The last will be first, and the first will be last" - Matthew 20:16
//!
//! Vineyard pairs a Telegram bot with an HTTP API over MongoDB. Users
//! start the bot, receive a launch link into a web mini-app, accrue
//! rewards through claim timers, login streaks, referral bonuses, and
//! passive farming accrual, and claim accumulated points through the API.
//!
//! ## Components
//!
//! - **Ledger**: the authoritative per-user record and its persistence
//!   contract (MongoDB, store-side atomic increments on the claim paths)
//! - **Engine**: pure reward logic - claim cooldowns, login streaks,
//!   referral and milestone bonuses
//! - **Farming**: fixed-cadence passive accrual sweep over all accounts
//! - **Bot**: Telegram command surface (/start, /referral)
//! - **API**: HTTP surface for the web mini-app

pub mod bot;
pub mod config;
pub mod db;
pub mod engine;
pub mod farming;
pub mod ledger;
pub mod routes;
pub mod server;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{Result, VineyardError};
