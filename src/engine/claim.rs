//! Claim eligibility and execution
//!
//! The cooldown is a single fixed interval. Eligibility is a pure read;
//! the two claim variants mutate the account and are selected per
//! deployment via `CLAIM_MODE`.

use bson::DateTime as BsonDateTime;
use chrono::{DateTime, Utc};

use crate::config::RewardConfig;
use crate::db::schemas::UserAccountDoc;
use crate::types::{Result, VineyardError};

/// Result of a claim-eligibility check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClaimStatus {
    pub can_claim: bool,
    /// Seconds until the next claim becomes available (fractional)
    pub time_remaining_secs: f64,
}

/// Evaluate claim eligibility against the cooldown interval.
///
/// Pure read; never mutates the account. A user who has never claimed is
/// immediately eligible and reports the full interval as `time_remaining`.
pub fn evaluate_claim(
    account: &UserAccountDoc,
    now: DateTime<Utc>,
    config: &RewardConfig,
) -> ClaimStatus {
    let interval = config.claim_interval_secs as f64;

    match account.last_claimed_at {
        None => ClaimStatus {
            can_claim: true,
            time_remaining_secs: interval,
        },
        Some(last_claimed) => {
            let elapsed =
                (now - last_claimed.to_chrono()).num_milliseconds() as f64 / 1000.0;

            if elapsed >= interval {
                ClaimStatus {
                    can_claim: true,
                    time_remaining_secs: 0.0,
                }
            } else {
                ClaimStatus {
                    can_claim: false,
                    time_remaining_secs: interval - elapsed,
                }
            }
        }
    }
}

/// Direct claim: add caller-supplied points to the balance.
///
/// Does not gate on [`evaluate_claim`] -- callers are expected to. Safe
/// if called out of cadence since it only adds what it is given.
/// Returns the new balance.
pub fn claim_points(
    account: &mut UserAccountDoc,
    points: f64,
    now: DateTime<Utc>,
) -> Result<f64> {
    if !points.is_finite() || points < 0.0 {
        return Err(VineyardError::Validation(format!(
            "points must be a non-negative number, got {}",
            points
        )));
    }

    account.reward_balance += points;
    account.last_claimed_at = Some(BsonDateTime::from_chrono(now));

    Ok(account.reward_balance)
}

/// Farming claim: move accrued farming points into the balance.
///
/// Requires a positive pending balance. Returns the amount claimed.
pub fn claim_farming(account: &mut UserAccountDoc, now: DateTime<Utc>) -> Result<f64> {
    if account.pending_farming_points <= 0.0 {
        return Err(VineyardError::NothingToClaim);
    }

    let claimed = account.pending_farming_points;
    account.reward_balance += claimed;
    account.pending_farming_points = 0.0;
    account.last_claimed_at = Some(BsonDateTime::from_chrono(now));

    Ok(claimed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn account() -> UserAccountDoc {
        UserAccountDoc::new(
            "12345".to_string(),
            "Ada".to_string(),
            String::new(),
            None,
            1.0,
        )
    }

    fn config() -> RewardConfig {
        RewardConfig::default() // 60s claim interval
    }

    #[test]
    fn test_never_claimed_is_eligible() {
        let status = evaluate_claim(&account(), Utc::now(), &config());
        assert!(status.can_claim);
        assert_eq!(status.time_remaining_secs, 60.0);
    }

    #[test]
    fn test_cooldown_after_claim() {
        let mut account = account();
        let now = Utc::now();

        claim_points(&mut account, 50.0, now).unwrap();
        assert_eq!(account.reward_balance, 50.0);
        assert!(account.last_claimed_at.is_some());

        // 10s into a 60s cooldown
        let status = evaluate_claim(&account, now + Duration::seconds(10), &config());
        assert!(!status.can_claim);
        assert!((status.time_remaining_secs - 50.0).abs() < 0.001);
    }

    #[test]
    fn test_eligible_again_after_interval() {
        let mut account = account();
        let now = Utc::now();
        claim_points(&mut account, 1.0, now).unwrap();

        let status = evaluate_claim(&account, now + Duration::seconds(60), &config());
        assert!(status.can_claim);
        assert_eq!(status.time_remaining_secs, 0.0);
    }

    #[test]
    fn test_evaluate_claim_is_idempotent() {
        let mut account = account();
        let now = Utc::now();
        claim_points(&mut account, 5.0, now).unwrap();

        let later = now + Duration::seconds(7);
        let first = evaluate_claim(&account, later, &config());
        let second = evaluate_claim(&account, later, &config());
        assert_eq!(first, second);
    }

    #[test]
    fn test_claim_points_rejects_negative() {
        let mut account = account();
        let err = claim_points(&mut account, -1.0, Utc::now()).unwrap_err();
        assert!(matches!(err, VineyardError::Validation(_)));
        assert_eq!(account.reward_balance, 0.0);
        assert!(account.last_claimed_at.is_none());
    }

    #[test]
    fn test_claim_points_rejects_nan() {
        let mut account = account();
        let err = claim_points(&mut account, f64::NAN, Utc::now()).unwrap_err();
        assert!(matches!(err, VineyardError::Validation(_)));
    }

    #[test]
    fn test_claim_points_accumulates() {
        let mut account = account();
        let now = Utc::now();
        claim_points(&mut account, 50.0, now).unwrap();
        claim_points(&mut account, 25.0, now + Duration::seconds(120)).unwrap();
        assert_eq!(account.reward_balance, 75.0);
    }

    #[test]
    fn test_claim_farming_with_nothing_pending() {
        let mut account = account();
        let err = claim_farming(&mut account, Utc::now()).unwrap_err();
        assert!(matches!(err, VineyardError::NothingToClaim));
    }

    #[test]
    fn test_claim_farming_moves_pending_to_balance() {
        let mut account = account();
        account.pending_farming_points = 12.5;

        let claimed = claim_farming(&mut account, Utc::now()).unwrap();
        assert_eq!(claimed, 12.5);
        assert_eq!(account.reward_balance, 12.5);
        assert_eq!(account.pending_farming_points, 0.0);
        assert!(account.last_claimed_at.is_some());
    }
}
