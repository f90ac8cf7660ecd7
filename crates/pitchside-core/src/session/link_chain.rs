//! Link-chain mode: connect two players through team-mates, one link at a
//! time, in as few steps as possible.
//!
//! Whether two players are linked is decided remotely. The controller asks
//! the [`LinkValidator`](crate::gateway::LinkValidator) and feeds the answer
//! in as a [`LinkResolution`], so the machine itself stays free of I/O.

use serde::{Deserialize, Serialize};

use super::{Event, GameMachine, GuessOutcome, Restore, SessionCore, Status};
use crate::{
  Result,
  gateway::LinkCheck,
  puzzle::{GameMode, LinkPuzzle, PlayerRef},
  score::{ChainTally, Score, link_chain_score},
};

// ─── Links ───────────────────────────────────────────────────────────────────

/// The club (or other context) two linked players shared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedContext {
  pub id:            Option<String>,
  pub name:          Option<String>,
  pub overlap_start: Option<i32>,
  pub overlap_end:   Option<i32>,
}

impl SharedContext {
  /// The shared context of a positive check, `None` for a negative one.
  pub fn from_check(check: &LinkCheck) -> Option<Self> {
    check.is_linked.then(|| Self {
      id:            check.shared_context_id.clone(),
      name:          check.shared_context_name.clone(),
      overlap_start: check.overlap_start,
      overlap_end:   check.overlap_end,
    })
  }
}

/// One confirmed player in the chain; `via` is `None` only for the start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainLink {
  pub player: PlayerRef,
  pub via:    Option<SharedContext>,
}

/// What the link-validation service said about a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkResolution {
  /// Linked to the current tail of the chain. `reaches_end` carries the
  /// context when the candidate also links straight to the end player.
  Linked {
    via:         SharedContext,
    reaches_end: Option<SharedContext>,
  },
  /// Not linked to the tail, but linked to the chain element at `index`.
  LinkedEarlier { index: usize },
  /// Not linked, or the check failed.
  NotLinked,
}

/// A candidate player together with its resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkAttempt {
  pub candidate:  PlayerRef,
  pub resolution: LinkResolution,
}

/// Stored progress: the confirmed chain, start player first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkProgress {
  pub chain: Vec<ChainLink>,
}

// ─── Machine ─────────────────────────────────────────────────────────────────

pub struct LinkChainGame {
  puzzle: LinkPuzzle,
  chain:  Vec<ChainLink>,
  core:   SessionCore,
}

impl LinkChainGame {
  pub fn new(puzzle: LinkPuzzle) -> Result<Self> {
    puzzle.validate()?;
    let chain = vec![ChainLink { player: puzzle.start.clone(), via: None }];
    Ok(Self { puzzle, chain, core: SessionCore::new(None) })
  }

  pub fn puzzle(&self) -> &LinkPuzzle { &self.puzzle }

  pub fn chain(&self) -> &[ChainLink] { &self.chain }

  /// The player the next link must connect to.
  pub fn tail(&self) -> &PlayerRef {
    // The chain always holds at least the start player.
    &self.chain[self.chain.len() - 1].player
  }

  pub fn contains(&self, player: &PlayerRef) -> bool {
    self.chain.iter().any(|link| link.player.id == player.id)
  }

  /// Links made so far.
  pub fn steps(&self) -> usize { self.chain.len() - 1 }

  fn reached_end(&self) -> bool { self.tail().id == self.puzzle.end.id }

  fn score(&self, forfeited: bool) -> Score {
    let completed = self.reached_end();
    link_chain_score(ChainTally {
      steps: self.steps() as u32,
      par: if self.puzzle.start.id == self.puzzle.end.id { 0 } else { self.puzzle.par },
      completed,
      forfeited,
    })
  }

  fn submit(&mut self, attempt: LinkAttempt) -> Option<GuessOutcome> {
    if !self.core.is_playing() {
      return None;
    }
    if self.contains(&attempt.candidate) {
      return self.core.record_outcome(GuessOutcome::Duplicate);
    }

    match attempt.resolution {
      LinkResolution::Linked { via, reaches_end } => {
        let is_end = attempt.candidate.id == self.puzzle.end.id;
        self.chain.push(ChainLink { player: attempt.candidate, via: Some(via) });
        if !is_end && let Some(via) = reaches_end {
          self.chain.push(ChainLink { player: self.puzzle.end.clone(), via: Some(via) });
        }
        self.core.progress_changed();
        let outcome = self.core.record_outcome(GuessOutcome::Correct);
        if self.reached_end() {
          let score = self.score(false);
          self.core.finish(Status::Complete, score);
        }
        outcome
      }
      LinkResolution::LinkedEarlier { index } if index + 1 < self.chain.len() => {
        self.core.record_outcome(GuessOutcome::WrongSlot { slot: index })
      }
      LinkResolution::LinkedEarlier { .. } | LinkResolution::NotLinked => {
        self.core.record_outcome(GuessOutcome::Incorrect)
      }
    }
  }
}

impl GameMachine for LinkChainGame {
  type Guess = LinkAttempt;
  type Progress = LinkProgress;

  fn mode(&self) -> GameMode { GameMode::LinkChain }

  fn puzzle_id(&self) -> &str { &self.puzzle.puzzle_id }

  fn core(&self) -> &SessionCore { &self.core }

  fn core_mut(&mut self) -> &mut SessionCore { &mut self.core }

  fn time_limit(&self) -> Option<u32> { None }

  /// Confirmed links beyond the start player.
  fn found_count(&self) -> usize { self.steps() }

  fn progress(&self) -> LinkProgress { LinkProgress { chain: self.chain.clone() } }

  fn restore(&mut self, restore: Restore<LinkProgress>) -> bool {
    let chain = &restore.progress.chain;
    let Some((first, rest)) = chain.split_first() else {
      return false;
    };
    let well_formed = first.player.id == self.puzzle.start.id
      && first.via.is_none()
      && rest.iter().all(|link| link.via.is_some())
      && !chain.iter().any(|link| link.player.id == self.puzzle.end.id);
    if !well_formed || !self.core.rehydrate(&restore) {
      return false;
    }
    self.chain = restore.progress.chain;
    true
  }

  fn transition(&mut self, event: Event<LinkAttempt>) -> Option<GuessOutcome> {
    match event {
      Event::Start { at } => {
        if self.core.begin(at) && self.reached_end() {
          let score = self.score(false);
          self.core.finish(Status::Complete, score);
        }
        None
      }
      Event::Guess(attempt) => self.submit(attempt),
      Event::Tick { .. } => None,
      Event::GiveUp => {
        if self.core.is_playing() {
          let score = self.score(true);
          self.core.finish(Status::GaveUp, score);
        }
        None
      }
      Event::UndoLast => {
        if self.core.is_playing() && self.chain.len() > 1 {
          self.chain.pop();
          self.core.progress_changed();
          self.core.dismiss_outcome();
        }
        None
      }
    }
  }
}
