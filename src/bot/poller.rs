//! Update polling loop
//!
//! Long-polls getUpdates, dispatching each update to the command
//! handlers. Transport errors back off and retry; handler errors are
//! logged per update and never stop the loop.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::bot::client::TelegramClient;
use crate::bot::commands;
use crate::server::AppState;

/// Server-side long-poll timeout
const LONG_POLL_TIMEOUT_SECS: u64 = 30;

/// Backoff after a failed getUpdates call
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Start the bot polling loop
pub fn spawn_poller(state: Arc<AppState>, client: Arc<TelegramClient>) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Telegram bot poller started");

        let mut offset = 0i64;

        loop {
            match client.get_updates(offset, LONG_POLL_TIMEOUT_SECS).await {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);

                        if let Err(e) =
                            commands::handle_update(Arc::clone(&state), update).await
                        {
                            warn!("Failed to handle bot update: {}", e);
                        }
                    }
                }
                Err(e) => {
                    warn!("getUpdates failed: {}, retrying in {:?}", e, RETRY_DELAY);
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }
    })
}
