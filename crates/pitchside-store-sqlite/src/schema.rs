//! SQL schema for the Pitchside SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per attempt, overwritten in place by id.
CREATE TABLE IF NOT EXISTS attempts (
    id            TEXT PRIMARY KEY,
    puzzle_id     TEXT NOT NULL,
    completed     INTEGER NOT NULL DEFAULT 0,   -- 0 | 1
    score         INTEGER,
    score_display TEXT,
    metadata      TEXT NOT NULL,                -- JSON progress snapshot
    started_at    TEXT NOT NULL,                -- RFC 3339 UTC; never rewritten
    completed_at  TEXT,
    synced        INTEGER NOT NULL DEFAULT 0,   -- 0 | 1
    revision      INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS attempts_puzzle_idx   ON attempts(puzzle_id, started_at);
CREATE INDEX IF NOT EXISTS attempts_unsynced_idx ON attempts(completed, synced);

PRAGMA user_version = 1;
";
