//! Conversions between [`AttemptRecord`] and the plain values stored in
//! SQLite columns.
//!
//! Timestamps are RFC 3339 strings and UUIDs hyphenated lowercase strings,
//! so rows stay readable from the `sqlite3` shell.

use chrono::{DateTime, Utc};
use pitchside_core::attempt::AttemptRecord;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// SQLite integers are signed; revisions beyond `i64::MAX` are clamped.
pub fn encode_revision(revision: u64) -> i64 { i64::try_from(revision).unwrap_or(i64::MAX) }

fn decode_unsigned<T: TryFrom<i64>>(column: &'static str, value: i64) -> Result<T> {
  T::try_from(value).map_err(|_| Error::OutOfRange { column, value })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list shared by every `SELECT`, in [`RawAttempt::from_row`] order.
pub const ATTEMPT_COLUMNS: &str = "id, puzzle_id, completed, score, score_display, metadata, \
                                   started_at, completed_at, synced, revision";

/// Raw values read directly from an `attempts` row.
pub struct RawAttempt {
  pub id:            String,
  pub puzzle_id:     String,
  pub completed:     bool,
  pub score:         Option<i64>,
  pub score_display: Option<String>,
  pub metadata:      String,
  pub started_at:    String,
  pub completed_at:  Option<String>,
  pub synced:        bool,
  pub revision:      i64,
}

impl RawAttempt {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      puzzle_id:     row.get(1)?,
      completed:     row.get(2)?,
      score:         row.get(3)?,
      score_display: row.get(4)?,
      metadata:      row.get(5)?,
      started_at:    row.get(6)?,
      completed_at:  row.get(7)?,
      synced:        row.get(8)?,
      revision:      row.get(9)?,
    })
  }

  pub fn into_record(self) -> Result<AttemptRecord> {
    Ok(AttemptRecord {
      id:            decode_uuid(&self.id)?,
      puzzle_id:     self.puzzle_id,
      completed:     self.completed,
      score:         self.score.map(|s| decode_unsigned("score", s)).transpose()?,
      score_display: self.score_display,
      metadata:      self.metadata,
      started_at:    decode_dt(&self.started_at)?,
      completed_at:  self.completed_at.as_deref().map(decode_dt).transpose()?,
      synced:        self.synced,
      revision:      decode_unsigned("revision", self.revision)?,
    })
  }
}
