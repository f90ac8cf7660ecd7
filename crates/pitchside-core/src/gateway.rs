//! The narrow contracts through which the engine reaches its collaborators.
//!
//! Backends implement these traits (`pitchside-store-sqlite`,
//! `pitchside-remote`); the engine depends only on the abstraction.
//!
//! All methods return `Send` futures so implementations can be driven from
//! spawned tasks on a multi-threaded runtime.

use std::future::Future;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::attempt::AttemptRecord;

// ─── Persistence ─────────────────────────────────────────────────────────────

/// The local row store for attempts.
pub trait AttemptStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Insert or overwrite the attempt keyed by `record.id`.
  ///
  /// Implementations must ignore a write whose `revision` is not newer than
  /// the stored row, and must never overwrite a completed row.
  fn save_attempt(
    &self,
    record: AttemptRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// The most recently started attempt for a puzzle, if any.
  fn get_attempt_by_puzzle_id<'a>(
    &'a self,
    puzzle_id: &'a str,
  ) -> impl Future<Output = Result<Option<AttemptRecord>, Self::Error>> + Send + 'a;

  /// Completed attempts not yet pushed to the remote store.
  fn list_unsynced(
    &self,
  ) -> impl Future<Output = Result<Vec<AttemptRecord>, Self::Error>> + Send + '_;

  /// Mark an attempt synced, provided it still holds `revision`.
  fn mark_synced(
    &self,
    id: Uuid,
    revision: u64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

// ─── Link validation ─────────────────────────────────────────────────────────

/// Answer to "did these two players ever play together?".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkCheck {
  pub is_linked:           bool,
  pub shared_context_name: Option<String>,
  pub shared_context_id:   Option<String>,
  pub overlap_start:       Option<i32>,
  pub overlap_end:         Option<i32>,
}

/// The remote service that decides whether two players are linked.
pub trait LinkValidator: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn check_linked<'a>(
    &'a self,
    player_a: &'a str,
    player_b: &'a str,
  ) -> impl Future<Output = Result<LinkCheck, Self::Error>> + Send + 'a;
}

// ─── Remote sync ─────────────────────────────────────────────────────────────

/// The remote store that completed attempts are eventually copied to.
pub trait SyncRemote: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn push_attempt<'a>(
    &'a self,
    record: &'a AttemptRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

/// Fire-and-forget request for a background sync pass.
pub trait SyncTrigger: Send + Sync {
  fn request_sync(&self);
}
