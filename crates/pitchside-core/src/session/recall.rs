//! Recall mode: name every goalscorer of a match against the clock.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{Event, GameMachine, GuessOutcome, Restore, SessionCore, Status};
use crate::{
  Result,
  matcher::{best_match, match_name},
  puzzle::{GameMode, RecallPuzzle},
  score::{Score, Tally, recall_score},
};

/// Stored progress: the normalised names of the scorers found so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecallProgress {
  pub found: BTreeSet<String>,
}

struct Scorer {
  key:     String,
  display: String,
}

pub struct RecallGame {
  puzzle:  RecallPuzzle,
  scorers: Vec<Scorer>,
  found:   BTreeSet<String>,
  core:    SessionCore,
}

impl RecallGame {
  pub fn new(puzzle: RecallPuzzle) -> Result<Self> {
    puzzle.validate()?;
    let scorers = puzzle
      .scorers()
      .into_iter()
      .map(|(key, display)| Scorer { key, display })
      .collect();
    let core = SessionCore::new(Some(puzzle.time_limit_secs));
    Ok(Self { puzzle, scorers, found: BTreeSet::new(), core })
  }

  pub fn puzzle(&self) -> &RecallPuzzle { &self.puzzle }

  pub fn total(&self) -> usize { self.scorers.len() }

  /// Display names of the scorers found so far, in goal order.
  pub fn found_scorers(&self) -> Vec<&str> {
    self
      .scorers
      .iter()
      .filter(|s| self.found.contains(&s.key))
      .map(|s| s.display.as_str())
      .collect()
  }

  pub fn is_found(&self, scorer: &str) -> bool {
    self.scorers.iter().any(|s| s.display == scorer && self.found.contains(&s.key))
  }

  fn score(&self, forfeited: bool) -> Score {
    recall_score(Tally {
      found: self.found.len() as u32,
      total: self.scorers.len() as u32,
      time_remaining: self.core.time_remaining(),
      forfeited,
    })
  }

  fn all_found(&self) -> bool { self.found.len() == self.scorers.len() }

  fn guess(&mut self, text: &str) -> Option<GuessOutcome> {
    if !self.core.is_playing() {
      return None;
    }

    let open: Vec<&Scorer> = self.scorers.iter().filter(|s| !self.found.contains(&s.key)).collect();
    if let Some((idx, _)) = best_match(text, open.iter().map(|s| s.display.as_str())) {
      let key = open[idx].key.clone();
      self.found.insert(key);
      self.core.progress_changed();
      let outcome = self.core.record_outcome(GuessOutcome::Correct);
      if self.all_found() && self.core.time_remaining().is_none_or(|secs| secs > 0) {
        let score = self.score(false);
        self.core.finish(Status::Won, score);
      }
      return outcome;
    }

    let repeated = self
      .scorers
      .iter()
      .filter(|s| self.found.contains(&s.key))
      .any(|s| match_name(text, &s.display).is_match);
    self.core.record_outcome(if repeated {
      GuessOutcome::Duplicate
    } else {
      GuessOutcome::Incorrect
    })
  }
}

impl GameMachine for RecallGame {
  type Guess = String;
  type Progress = RecallProgress;

  fn mode(&self) -> GameMode { GameMode::Recall }

  fn puzzle_id(&self) -> &str { &self.puzzle.puzzle_id }

  fn core(&self) -> &SessionCore { &self.core }

  fn core_mut(&mut self) -> &mut SessionCore { &mut self.core }

  fn time_limit(&self) -> Option<u32> { Some(self.puzzle.time_limit_secs) }

  fn found_count(&self) -> usize { self.found.len() }

  fn progress(&self) -> RecallProgress { RecallProgress { found: self.found.clone() } }

  fn restore(&mut self, restore: Restore<RecallProgress>) -> bool {
    let known = restore
      .progress
      .found
      .iter()
      .all(|key| self.scorers.iter().any(|s| s.key == *key));
    let clock_ok = restore
      .time_remaining
      .is_some_and(|secs| secs > 0 && secs <= self.puzzle.time_limit_secs);
    // A stored attempt covering every scorer would already be completed.
    if !known || !clock_ok || restore.progress.found.len() >= self.scorers.len() {
      return false;
    }
    if !self.core.rehydrate(&restore) {
      return false;
    }
    self.found = restore.progress.found;
    true
  }

  fn transition(&mut self, event: Event<String>) -> Option<GuessOutcome> {
    match event {
      Event::Start { at } => {
        if self.core.begin(at) && self.scorers.is_empty() {
          let score = self.score(false);
          self.core.finish(Status::Won, score);
        }
        None
      }
      Event::Guess(text) => self.guess(&text),
      Event::Tick { remaining } => {
        if self.core.tick(remaining) {
          let score = self.score(false);
          self.core.finish(Status::Lost, score);
        }
        None
      }
      Event::GiveUp => {
        if self.core.is_playing() {
          let score = self.score(true);
          self.core.finish(Status::GaveUp, score);
        }
        None
      }
      Event::UndoLast => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use uuid::Uuid;

  use super::*;
  use crate::puzzle::{GoalEvent, Side};

  fn goal(scorer: &str, minute: u16, team: Side) -> GoalEvent {
    GoalEvent { scorer: scorer.into(), minute, team, own_goal: false }
  }

  fn istanbul() -> RecallPuzzle {
    RecallPuzzle {
      puzzle_id:       "recall-istanbul".into(),
      home_team:       "AC Milan".into(),
      away_team:       "Liverpool".into(),
      goals:           vec![
        goal("Paolo Maldini", 1, Side::Home),
        goal("Hernán Crespo", 39, Side::Home),
        goal("Hernán Crespo", 44, Side::Home),
        goal("Steven Gerrard", 54, Side::Away),
        goal("Vladimír Šmicer", 56, Side::Away),
        goal("Xabi Alonso", 60, Side::Away),
      ],
      time_limit_secs: 120,
    }
  }

  fn started() -> RecallGame {
    let mut game = RecallGame::new(istanbul()).unwrap();
    game.transition(Event::Start { at: Utc::now() });
    game
  }

  fn guess(game: &mut RecallGame, text: &str) -> Option<GuessOutcome> {
    game.transition(Event::Guess(text.into()))
  }

  #[test]
  fn start_moves_to_playing_and_stamps_once() {
    let mut game = RecallGame::new(istanbul()).unwrap();
    assert_eq!(game.status(), Status::Idle);
    assert_eq!(game.total(), 5);

    let at = Utc::now();
    game.transition(Event::Start { at });
    assert_eq!(game.status(), Status::Playing);
    assert_eq!(game.core().started_at(), Some(at));
    assert!(game.core().attempt_id().is_none());

    game.transition(Event::Start { at: at + chrono::Duration::seconds(5) });
    assert_eq!(game.core().started_at(), Some(at));
  }

  #[test]
  fn guesses_are_ignored_before_start() {
    let mut game = RecallGame::new(istanbul()).unwrap();
    assert_eq!(guess(&mut game, "Maldini"), None);
    assert_eq!(game.found_count(), 0);
  }

  #[test]
  fn correct_duplicate_and_incorrect_are_distinguished() {
    let mut game = started();

    assert_eq!(guess(&mut game, "Smicer"), Some(GuessOutcome::Correct));
    assert!(game.is_found("Vladimír Šmicer"));
    assert_eq!(game.found_count(), 1);

    assert_eq!(guess(&mut game, "Šmicer"), Some(GuessOutcome::Duplicate));
    assert_eq!(game.found_count(), 1);

    assert_eq!(guess(&mut game, "Shevchenko"), Some(GuessOutcome::Incorrect));
    assert_eq!(game.core().last_outcome(), Some(GuessOutcome::Incorrect));
    assert_eq!(game.found_count(), 1);
  }

  #[test]
  fn finding_everyone_wins_in_the_same_transition() {
    let mut game = started();
    for name in ["Maldini", "Crespo", "Gerrard", "Smicer"] {
      assert_eq!(guess(&mut game, name), Some(GuessOutcome::Correct));
      assert_eq!(game.status(), Status::Playing);
    }
    game.transition(Event::Tick { remaining: 95 });
    assert_eq!(guess(&mut game, "Xabi Alonso"), Some(GuessOutcome::Correct));

    assert_eq!(game.status(), Status::Won);
    let score = game.core().score().unwrap();
    assert!(score.won);
    assert_eq!(score.points, 5 + 9);

    // Terminal: nothing moves any more.
    assert_eq!(guess(&mut game, "Maldini"), None);
    game.transition(Event::GiveUp);
    assert_eq!(game.status(), Status::Won);
  }

  #[test]
  fn running_out_of_time_loses_with_partial_score() {
    let mut game = started();
    guess(&mut game, "Gerrard");
    game.transition(Event::Tick { remaining: 1 });
    assert_eq!(game.status(), Status::Playing);
    assert_eq!(game.core().last_outcome(), None);

    game.transition(Event::Tick { remaining: 0 });
    assert_eq!(game.status(), Status::Lost);
    let score = game.core().score().unwrap();
    assert!(!score.won);
    assert_eq!(score.points, 1);
    assert_eq!(score.display, "1/5");
  }

  #[test]
  fn give_up_never_wins() {
    let mut game = started();
    for name in ["Maldini", "Crespo", "Gerrard", "Smicer"] {
      guess(&mut game, name);
    }
    game.transition(Event::GiveUp);
    assert_eq!(game.status(), Status::GaveUp);
    assert!(!game.core().score().unwrap().won);
  }

  #[test]
  fn scoreless_match_is_won_on_start() {
    let puzzle = RecallPuzzle { goals: vec![], ..istanbul() };
    let mut game = RecallGame::new(puzzle).unwrap();
    game.transition(Event::Start { at: Utc::now() });
    assert_eq!(game.status(), Status::Won);
    let score = game.core().score().unwrap();
    assert!(score.won);
    assert_eq!(score.points, 0);
  }

  #[test]
  fn restore_rehydrates_progress() {
    let mut game = RecallGame::new(istanbul()).unwrap();
    let attempt_id = Uuid::new_v4();
    let started_at = Utc::now();
    let restored = game.restore(Restore {
      progress: RecallProgress {
        found: ["paolo maldini", "xabi alonso"].into_iter().map(String::from).collect(),
      },
      attempt_id,
      started_at,
      time_remaining: Some(44),
      revision: 3,
    });

    assert!(restored);
    assert_eq!(game.status(), Status::Playing);
    assert_eq!(game.found_count(), 2);
    assert_eq!(game.core().attempt_id(), Some(attempt_id));
    assert_eq!(game.core().time_remaining(), Some(44));
    assert_eq!(game.core().revision(), 3);
    assert_eq!(game.found_scorers(), vec!["Paolo Maldini", "Xabi Alonso"]);
  }

  #[test]
  fn restore_rejects_foreign_progress() {
    let mut game = RecallGame::new(istanbul()).unwrap();
    let restored = game.restore(Restore {
      progress: RecallProgress { found: ["andriy shevchenko".to_owned()].into() },
      attempt_id: Uuid::new_v4(),
      started_at: Utc::now(),
      time_remaining: Some(60),
      revision: 1,
    });
    assert!(!restored);
    assert_eq!(game.status(), Status::Idle);
    assert_eq!(game.found_count(), 0);
  }
}
