//! The persisted attempt row and the progress snapshot stored inside it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::Result;

/// One player's persisted progress or result for one puzzle.
///
/// Rows are overwritten by `id`; `revision` orders writes for the same
/// attempt so the store can discard a write older than what it holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
  pub id:            Uuid,
  pub puzzle_id:     String,
  pub completed:     bool,
  pub score:         Option<u32>,
  pub score_display: Option<String>,
  /// Serialised [`AttemptMetadata`]; opaque to the store.
  pub metadata:      String,
  pub started_at:    DateTime<Utc>,
  pub completed_at:  Option<DateTime<Utc>>,
  /// Best-effort remote sync marker.
  pub synced:        bool,
  pub revision:      u64,
}

/// Everything needed to rebuild a session's progress with no other state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptMetadata<P> {
  pub revision:       u64,
  pub progress:       P,
  pub elapsed_secs:   u64,
  /// Countdown value at the time of writing, for time-bounded modes.
  pub time_remaining: Option<u32>,
  pub started_at:     DateTime<Utc>,
}

impl<P: Serialize> AttemptMetadata<P> {
  pub fn encode(&self) -> Result<String> { Ok(serde_json::to_string(self)?) }
}

impl<P: DeserializeOwned> AttemptMetadata<P> {
  pub fn decode(raw: &str) -> Result<Self> { Ok(serde_json::from_str(raw)?) }
}
