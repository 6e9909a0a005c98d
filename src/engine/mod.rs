//! Reward Engine
//!
//! Pure decision logic for claims, login streaks, and farming accrual.
//! Every operation takes an account plus the current time and a
//! [`RewardConfig`](crate::config::RewardConfig); nothing here touches
//! the store or the wall clock directly.

pub mod claim;
pub mod clock;
pub mod streak;

pub use claim::{claim_farming, claim_points, evaluate_claim, ClaimStatus};
pub use clock::{Clock, SystemClock};
pub use streak::{evaluate_login, LoginOutcome};
