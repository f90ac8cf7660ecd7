//! Game session state machines and the controller that persists them.
//!
//! Each game mode is a [`GameMachine`]: a closed set of statuses and a total
//! transition function over [`Event`]s, free of I/O. [`Session`] wraps a
//! machine with the countdown, the resume protocol and progressive saves.

mod controller;
pub mod formation;
pub mod link_chain;
pub mod recall;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use strum::{AsRefStr, Display};
use uuid::Uuid;

use crate::{puzzle::GameMode, score::Score};

pub use controller::{PendingWrites, Session, SessionOptions};
pub use formation::{FormationGame, FormationProgress, SlotGuess};
pub use link_chain::{ChainLink, LinkAttempt, LinkChainGame, LinkProgress, LinkResolution, SharedContext};
pub use recall::{RecallGame, RecallProgress};

// ─── Status & outcomes ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Status {
  #[default]
  Idle,
  Playing,
  Won,
  Lost,
  GaveUp,
  Complete,
}

impl Status {
  /// Terminal statuses admit no further gameplay transition.
  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Won | Self::Lost | Self::GaveUp | Self::Complete)
  }
}

/// Classification of the most recent guess, for UI feedback only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GuessOutcome {
  Correct,
  Incorrect,
  /// The guess names something already found.
  Duplicate,
  /// The guess is valid but belongs elsewhere than the flagged slot.
  WrongSlot { slot: usize },
}

/// Inputs to [`GameMachine::transition`].
#[derive(Debug, Clone, PartialEq)]
pub enum Event<G> {
  Start { at: DateTime<Utc> },
  Guess(G),
  /// The countdown reported a new remaining value.
  Tick { remaining: u32 },
  GiveUp,
  UndoLast,
}

/// Stored progress handed back to a machine on mount.
#[derive(Debug, Clone, PartialEq)]
pub struct Restore<P> {
  pub progress:       P,
  pub attempt_id:     Uuid,
  pub started_at:     DateTime<Utc>,
  pub time_remaining: Option<u32>,
  pub revision:       u64,
}

// ─── Shared state ────────────────────────────────────────────────────────────

/// The state every game mode carries besides its own progress.
#[derive(Debug, Clone, Default)]
pub struct SessionCore {
  status:           Status,
  attempt_id:       Option<Uuid>,
  started_at:       Option<DateTime<Utc>>,
  time_remaining:   Option<u32>,
  last_outcome:     Option<GuessOutcome>,
  score:            Option<Score>,
  attempt_saved:    bool,
  /// Bumped on every change to the progress set.
  progress_version: u64,
  /// Revision of the last write issued for this attempt.
  revision:         u64,
}

impl SessionCore {
  pub fn new(time_limit: Option<u32>) -> Self {
    Self { time_remaining: time_limit, ..Self::default() }
  }

  pub fn status(&self) -> Status { self.status }

  pub fn attempt_id(&self) -> Option<Uuid> { self.attempt_id }

  pub fn started_at(&self) -> Option<DateTime<Utc>> { self.started_at }

  pub fn time_remaining(&self) -> Option<u32> { self.time_remaining }

  pub fn last_outcome(&self) -> Option<GuessOutcome> { self.last_outcome }

  pub fn score(&self) -> Option<&Score> { self.score.as_ref() }

  pub fn attempt_saved(&self) -> bool { self.attempt_saved }

  pub fn progress_version(&self) -> u64 { self.progress_version }

  pub fn revision(&self) -> u64 { self.revision }

  pub fn is_playing(&self) -> bool { self.status == Status::Playing }

  pub fn dismiss_outcome(&mut self) { self.last_outcome = None; }

  /// `idle → playing`. Returns whether the transition happened.
  pub(crate) fn begin(&mut self, at: DateTime<Utc>) -> bool {
    if self.status != Status::Idle {
      return false;
    }
    self.status = Status::Playing;
    self.started_at.get_or_insert(at);
    self.last_outcome = None;
    true
  }

  /// Mirror a countdown tick. Returns `true` when time just ran out.
  pub(crate) fn tick(&mut self, remaining: u32) -> bool {
    if !self.is_playing() || self.time_remaining.is_none() {
      return false;
    }
    self.time_remaining = Some(remaining);
    self.last_outcome = None;
    remaining == 0
  }

  pub(crate) fn record_outcome(&mut self, outcome: GuessOutcome) -> Option<GuessOutcome> {
    self.last_outcome = Some(outcome);
    Some(outcome)
  }

  pub(crate) fn progress_changed(&mut self) { self.progress_version += 1; }

  /// Enter a terminal status with its score; the score is never replaced.
  pub(crate) fn finish(&mut self, status: Status, score: Score) {
    debug_assert!(status.is_terminal());
    if self.status.is_terminal() {
      return;
    }
    self.status = status;
    self.score = Some(score);
  }

  /// Adopt identity and clock from a stored attempt. Only valid from idle.
  pub(crate) fn rehydrate<P>(&mut self, restore: &Restore<P>) -> bool {
    if self.status != Status::Idle {
      return false;
    }
    self.status = Status::Playing;
    self.attempt_id = Some(restore.attempt_id);
    self.started_at = Some(restore.started_at);
    if self.time_remaining.is_some() {
      self.time_remaining = restore.time_remaining;
    }
    self.revision = restore.revision;
    // Stored progress counts as already written.
    self.progress_version = 0;
    true
  }

  /// The attempt id, minted on first use and stable afterwards.
  pub(crate) fn ensure_attempt_id(&mut self) -> Uuid {
    *self.attempt_id.get_or_insert_with(Uuid::new_v4)
  }

  pub(crate) fn next_revision(&mut self) -> u64 {
    self.revision += 1;
    self.revision
  }

  pub(crate) fn mark_saved(&mut self) { self.attempt_saved = true; }
}

// ─── Machine trait ───────────────────────────────────────────────────────────

/// A game mode's state machine.
///
/// `transition` applies one event and is a no-op for events that are not
/// valid in the current status. It never performs I/O.
pub trait GameMachine: Send + 'static {
  /// What the player submits.
  type Guess;
  /// Serialisable snapshot of the progress set.
  type Progress: Serialize + DeserializeOwned + Send;

  fn mode(&self) -> GameMode;

  fn puzzle_id(&self) -> &str;

  fn core(&self) -> &SessionCore;

  fn core_mut(&mut self) -> &mut SessionCore;

  /// Seconds on the clock at start, or `None` for untimed modes.
  fn time_limit(&self) -> Option<u32>;

  fn found_count(&self) -> usize;

  fn progress(&self) -> Self::Progress;

  /// Rehydrate stored progress. Returns `false`, leaving the machine
  /// untouched, if the machine is not idle or the progress does not fit this
  /// puzzle.
  fn restore(&mut self, restore: Restore<Self::Progress>) -> bool;

  fn transition(&mut self, event: Event<Self::Guess>) -> Option<GuessOutcome>;

  fn status(&self) -> Status { self.core().status() }
}

/// The value handed to a results screen once a session is over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameResult {
  pub puzzle_id:  String,
  pub mode:       GameMode,
  pub status:     Status,
  pub score:      Score,
  pub found:      usize,
  pub attempt_id: Option<Uuid>,
}

impl GameResult {
  pub fn of<M: GameMachine>(machine: &M) -> Option<Self> {
    let core = machine.core();
    Some(Self {
      puzzle_id:  machine.puzzle_id().to_owned(),
      mode:       machine.mode(),
      status:     core.status(),
      score:      core.score()?.clone(),
      found:      machine.found_count(),
      attempt_id: core.attempt_id(),
    })
  }
}
