//! Database schemas for Vineyard
//!
//! Defines the MongoDB document structure for user accounts, plus the
//! bookkeeping metadata every document carries.

mod user;

use bson::DateTime;
use serde::{Deserialize, Serialize};

pub use user::{UserAccountDoc, USER_COLLECTION};

/// Bookkeeping metadata carried by every document: creation, update,
/// and soft-deletion timestamps.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Metadata {
    #[serde(default)]
    pub is_deleted: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime>,
}

impl Metadata {
    /// Fresh metadata stamped with the current time
    pub fn new() -> Self {
        Self {
            is_deleted: false,
            deleted_at: None,
            updated_at: Some(DateTime::now()),
            created_at: Some(DateTime::now()),
        }
    }
}
