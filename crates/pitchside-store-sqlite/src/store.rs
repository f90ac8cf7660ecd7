//! [`SqliteStore`], the SQLite implementation of [`AttemptStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;
use tracing::debug;
use uuid::Uuid;

use pitchside_core::{attempt::AttemptRecord, gateway::AttemptStore};

use crate::{
  Result,
  encode::{ATTEMPT_COLUMNS, RawAttempt, encode_dt, encode_revision, encode_uuid},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Pitchside attempt store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Every stored attempt, most recently started first.
  pub async fn list_attempts(&self) -> Result<Vec<AttemptRecord>> {
    let raws: Vec<RawAttempt> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ATTEMPT_COLUMNS} FROM attempts ORDER BY started_at DESC"
        ))?;
        let rows = stmt
          .query_map([], RawAttempt::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAttempt::into_record).collect()
  }
}

// ─── AttemptStore impl ───────────────────────────────────────────────────────

impl AttemptStore for SqliteStore {
  type Error = crate::Error;

  /// Upsert by id. The update applies only to an unfinished row holding an
  /// older revision; `started_at` is kept and `synced` is cleared.
  async fn save_attempt(&self, record: AttemptRecord) -> Result<()> {
    let id_str           = encode_uuid(record.id);
    let started_at_str   = encode_dt(record.started_at);
    let completed_at_str = record.completed_at.map(encode_dt);
    let score            = record.score.map(i64::from);
    let revision         = encode_revision(record.revision);
    let AttemptRecord { puzzle_id, completed, score_display, metadata, .. } = record;

    let changed = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "INSERT INTO attempts (
             id, puzzle_id, completed, score, score_display, metadata,
             started_at, completed_at, synced, revision
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, ?9)
           ON CONFLICT(id) DO UPDATE SET
             puzzle_id     = excluded.puzzle_id,
             completed     = excluded.completed,
             score         = excluded.score,
             score_display = excluded.score_display,
             metadata      = excluded.metadata,
             completed_at  = excluded.completed_at,
             synced        = 0,
             revision      = excluded.revision
           WHERE attempts.completed = 0
             AND excluded.revision > attempts.revision",
          rusqlite::params![
            id_str,
            puzzle_id,
            completed,
            score,
            score_display,
            metadata,
            started_at_str,
            completed_at_str,
            revision,
          ],
        )?;
        Ok(changed)
      })
      .await?;

    if changed == 0 {
      debug!(revision, "ignored stale attempt write");
    }
    Ok(())
  }

  async fn get_attempt_by_puzzle_id(&self, puzzle_id: &str) -> Result<Option<AttemptRecord>> {
    let puzzle_id = puzzle_id.to_owned();

    let raw: Option<RawAttempt> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {ATTEMPT_COLUMNS} FROM attempts
                 WHERE puzzle_id = ?1
                 ORDER BY started_at DESC, revision DESC
                 LIMIT 1"
              ),
              rusqlite::params![puzzle_id],
              RawAttempt::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawAttempt::into_record).transpose()
  }

  async fn list_unsynced(&self) -> Result<Vec<AttemptRecord>> {
    let raws: Vec<RawAttempt> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ATTEMPT_COLUMNS} FROM attempts
           WHERE completed = 1 AND synced = 0
           ORDER BY completed_at"
        ))?;
        let rows = stmt
          .query_map([], RawAttempt::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAttempt::into_record).collect()
  }

  async fn mark_synced(&self, id: Uuid, revision: u64) -> Result<()> {
    let id_str = encode_uuid(id);
    let revision = encode_revision(revision);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE attempts SET synced = 1 WHERE id = ?1 AND revision = ?2",
          rusqlite::params![id_str, revision],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
