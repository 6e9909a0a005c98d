//! User account document schema
//!
//! One record per Telegram identity: reward balance, claim cooldown
//! timestamp, login streak bookkeeping, farming accrual state, and the
//! referral attribution set at creation.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

/// Collection name for user accounts
pub const USER_COLLECTION: &str = "users";

/// User account document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserAccountDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata (created_at, updated_at, is_deleted)
    #[serde(default)]
    pub metadata: Metadata,

    /// Telegram user id (stable external identifier, unique, immutable)
    pub telegram_id: String,

    /// Display first name
    pub first_name: String,

    /// Display last name (may be empty)
    #[serde(default)]
    pub last_name: String,

    /// Settled reward points, only ever increased by claims and bonuses
    #[serde(default)]
    pub reward_balance: f64,

    /// Points accrued passively since the last claim
    #[serde(default)]
    pub pending_farming_points: f64,

    /// Timestamp of the most recent successful claim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_claimed_at: Option<DateTime>,

    /// Consecutive-day login counter, reset on a missed day
    #[serde(default)]
    pub login_streak_count: i32,

    /// Timestamp of the most recent login-streak evaluation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime>,

    /// Scalar applied to passive accrual; stepped up on streak
    /// milestones, reset to the configured base on a streak break
    #[serde(default = "default_multiplier")]
    pub farming_multiplier: f64,

    /// Telegram id of the referring account, set at most once at creation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referred_by: Option<String>,
}

fn default_multiplier() -> f64 {
    1.0
}

impl UserAccountDoc {
    /// Create a new account with default counters
    pub fn new(
        telegram_id: String,
        first_name: String,
        last_name: String,
        referred_by: Option<String>,
        farming_multiplier: f64,
    ) -> Self {
        Self {
            _id: None,
            metadata: Metadata::new(),
            telegram_id,
            first_name,
            last_name,
            reward_balance: 0.0,
            pending_farming_points: 0.0,
            last_claimed_at: None,
            login_streak_count: 0,
            last_login_at: None,
            farming_multiplier,
            referred_by,
        }
    }
}

impl IntoIndexes for UserAccountDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on the Telegram id
            (
                doc! { "telegram_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("telegram_id_unique".to_string())
                        .build(),
                ),
            ),
            // Index on referred_by for referral counting
            (
                doc! { "referred_by": 1 },
                Some(
                    IndexOptions::builder()
                        .name("referred_by_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for UserAccountDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_defaults() {
        let account = UserAccountDoc::new(
            "12345".to_string(),
            "Ada".to_string(),
            "Lovelace".to_string(),
            None,
            1.0,
        );

        assert_eq!(account.telegram_id, "12345");
        assert_eq!(account.reward_balance, 0.0);
        assert_eq!(account.pending_farming_points, 0.0);
        assert_eq!(account.login_streak_count, 0);
        assert_eq!(account.farming_multiplier, 1.0);
        assert!(account.last_claimed_at.is_none());
        assert!(account.last_login_at.is_none());
        assert!(account.referred_by.is_none());
    }

    #[test]
    fn test_roundtrip_through_bson() {
        let account = UserAccountDoc::new(
            "999".to_string(),
            "Grace".to_string(),
            String::new(),
            Some("12345".to_string()),
            1.5,
        );

        let doc = bson::to_document(&account).unwrap();
        let back: UserAccountDoc = bson::from_document(doc).unwrap();
        assert_eq!(back.telegram_id, "999");
        assert_eq!(back.referred_by.as_deref(), Some("12345"));
        assert_eq!(back.farming_multiplier, 1.5);
    }
}
