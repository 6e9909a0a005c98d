//! Passive farming accrual
//!
//! A fixed-cadence sweep over all accounts: each tick advances every
//! account's pending farming points by that account's own multiplier.
//! The sweep body runs inline in the timer task, so a tick can never
//! overlap a still-running sweep; missed ticks are skipped. Per-account
//! failures are logged and the sweep continues.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::ledger::UserLedger;
use crate::types::Result;

/// Counts from one pass over the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    /// Accounts whose pending points were advanced
    pub updated: u64,
    /// Accounts where the accrual update failed
    pub failed: u64,
}

/// Scheduled farming-accrual sweeper
pub struct FarmingSweeper {
    ledger: Arc<UserLedger>,
    tick_interval: Duration,
    /// Whether the sweep loop is running
    running: Arc<RwLock<bool>>,
}

impl FarmingSweeper {
    /// Create a new sweeper with the given cadence
    pub fn new(ledger: Arc<UserLedger>, tick_interval: Duration) -> Self {
        Self {
            ledger,
            tick_interval,
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// Run a single sweep over all accounts.
    ///
    /// Each account advances by exactly its own multiplier, independent
    /// of every other account. Failures are logged per account and never
    /// abort the pass.
    pub async fn sweep_once(&self) -> Result<SweepStats> {
        let updated = Arc::new(AtomicU64::new(0));
        let failed = Arc::new(AtomicU64::new(0));

        self.ledger
            .for_each_account(|account| {
                let ledger = Arc::clone(&self.ledger);
                let updated = Arc::clone(&updated);
                let failed = Arc::clone(&failed);

                async move {
                    match ledger
                        .accrue_farming(&account.telegram_id, account.farming_multiplier)
                        .await
                    {
                        Ok(()) => {
                            updated.fetch_add(1, Ordering::SeqCst);
                        }
                        Err(e) => {
                            warn!(
                                user = %account.telegram_id,
                                error = %e,
                                "Farming accrual failed, continuing sweep"
                            );
                            failed.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                }
            })
            .await?;

        Ok(SweepStats {
            updated: updated.load(Ordering::SeqCst),
            failed: failed.load(Ordering::SeqCst),
        })
    }

    /// Start the sweep loop
    pub async fn start(self: Arc<Self>) {
        {
            let mut running = self.running.write().await;
            if *running {
                warn!("Farming sweeper already running");
                return;
            }
            *running = true;
        }

        info!(
            "Starting farming sweeper (interval: {:?})",
            self.tick_interval
        );

        let sweeper = Arc::clone(&self);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(sweeper.tick_interval);
            // A slow sweep skips the ticks it missed instead of bursting
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;

                if !*sweeper.running.read().await {
                    info!("Farming sweeper stopped");
                    break;
                }

                match sweeper.sweep_once().await {
                    Ok(stats) => {
                        debug!(
                            updated = stats.updated,
                            failed = stats.failed,
                            "Farming sweep completed"
                        );
                    }
                    Err(e) => {
                        // A failed tick never halts future ticks
                        warn!("Farming sweep failed: {}", e);
                    }
                }
            }
        });
    }

    /// Stop the sweep loop after the current tick
    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
        info!("Stopping farming sweeper");
    }

    /// Check if the sweep loop is running
    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }
}
