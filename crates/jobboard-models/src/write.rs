//! Results of store writes, shaped the way clients expect them.

use serde::{Deserialize, Serialize};

/// Result of inserting a single document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertResult {
    pub inserted_id: String,
}

impl InsertResult {
    pub fn new(inserted_id: impl Into<String>) -> Self {
        Self {
            inserted_id: inserted_id.into(),
        }
    }
}

/// Result of a partial update of a single document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    /// Documents matched by the update (0 or 1).
    pub matched_count: u64,
    /// Documents whose stored fields actually changed.
    pub modified_count: u64,
}

impl UpdateResult {
    pub fn matched(modified: bool) -> Self {
        Self {
            matched_count: 1,
            modified_count: u64::from(modified),
        }
    }

    pub fn is_modified(&self) -> bool {
        self.modified_count > 0
    }
}
