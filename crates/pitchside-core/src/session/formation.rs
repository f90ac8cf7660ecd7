//! Formation mode: name the hidden players of a starting eleven.

use serde::{Deserialize, Serialize};

use super::{Event, GameMachine, GuessOutcome, Restore, SessionCore, Status};
use crate::{
  Result,
  matcher::match_name,
  puzzle::{FormationPuzzle, GameMode, LineupSlot},
  score::{Score, Tally, formation_score},
};

/// A name submitted for the slot the player currently has selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotGuess {
  pub slot: usize,
  pub text: String,
}

impl SlotGuess {
  pub fn new(slot: usize, text: impl Into<String>) -> Self { Self { slot, text: text.into() } }
}

/// Stored progress: which slots are shown, one flag per lineup position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormationProgress {
  pub revealed: Vec<bool>,
}

pub struct FormationGame {
  puzzle:   FormationPuzzle,
  /// Visible slots start revealed; hidden ones flip as they are named.
  revealed: Vec<bool>,
  core:     SessionCore,
}

impl FormationGame {
  pub fn new(puzzle: FormationPuzzle) -> Result<Self> {
    puzzle.validate()?;
    let revealed = puzzle.slots.iter().map(|slot| !slot.hidden).collect();
    let core = SessionCore::new(Some(puzzle.time_limit_secs));
    Ok(Self { puzzle, revealed, core })
  }

  pub fn puzzle(&self) -> &FormationPuzzle { &self.puzzle }

  pub fn slots(&self) -> &[LineupSlot] { &self.puzzle.slots }

  pub fn is_revealed(&self, slot: usize) -> bool { self.revealed.get(slot).copied().unwrap_or(false) }

  pub fn hidden_total(&self) -> usize { self.puzzle.hidden_count() }

  fn score(&self, forfeited: bool) -> Score {
    formation_score(Tally {
      found: self.found_count() as u32,
      total: self.hidden_total() as u32,
      time_remaining: self.core.time_remaining(),
      forfeited,
    })
  }

  fn matches(&self, slot: usize, text: &str) -> bool {
    match_name(text, &self.puzzle.slots[slot].player).is_match
  }

  fn guess(&mut self, guess: &SlotGuess) -> Option<GuessOutcome> {
    if !self.core.is_playing() {
      return None;
    }
    let slot = guess.slot;
    if !self.puzzle.slots.get(slot).is_some_and(|s| s.hidden) {
      return None;
    }

    if !self.revealed[slot] && self.matches(slot, &guess.text) {
      self.revealed[slot] = true;
      self.core.progress_changed();
      let outcome = self.core.record_outcome(GuessOutcome::Correct);
      if self.revealed.iter().all(|r| *r) && self.core.time_remaining().is_none_or(|secs| secs > 0) {
        let score = self.score(false);
        self.core.finish(Status::Won, score);
      }
      return outcome;
    }

    let slots = 0..self.revealed.len();
    let outcome = if slots
      .clone()
      .filter(|idx| self.revealed[*idx])
      .any(|idx| self.matches(idx, &guess.text))
    {
      GuessOutcome::Duplicate
    } else if slots
      .filter(|idx| *idx != slot && !self.revealed[*idx])
      .any(|idx| self.matches(idx, &guess.text))
    {
      GuessOutcome::WrongSlot { slot }
    } else {
      GuessOutcome::Incorrect
    };
    self.core.record_outcome(outcome)
  }
}

impl GameMachine for FormationGame {
  type Guess = SlotGuess;
  type Progress = FormationProgress;

  fn mode(&self) -> GameMode { GameMode::Formation }

  fn puzzle_id(&self) -> &str { &self.puzzle.puzzle_id }

  fn core(&self) -> &SessionCore { &self.core }

  fn core_mut(&mut self) -> &mut SessionCore { &mut self.core }

  fn time_limit(&self) -> Option<u32> { Some(self.puzzle.time_limit_secs) }

  fn found_count(&self) -> usize {
    self
      .puzzle
      .slots
      .iter()
      .zip(&self.revealed)
      .filter(|(slot, revealed)| slot.hidden && **revealed)
      .count()
  }

  fn progress(&self) -> FormationProgress { FormationProgress { revealed: self.revealed.clone() } }

  fn restore(&mut self, restore: Restore<FormationProgress>) -> bool {
    let revealed = &restore.progress.revealed;
    let shape_ok = revealed.len() == self.puzzle.slots.len()
      && self.puzzle.slots.iter().zip(revealed).all(|(slot, shown)| slot.hidden || *shown);
    let clock_ok = restore
      .time_remaining
      .is_some_and(|secs| secs > 0 && secs <= self.puzzle.time_limit_secs);
    if !shape_ok || !clock_ok || revealed.iter().all(|r| *r) {
      return false;
    }
    if !self.core.rehydrate(&restore) {
      return false;
    }
    self.revealed = restore.progress.revealed;
    true
  }

  fn transition(&mut self, event: Event<SlotGuess>) -> Option<GuessOutcome> {
    match event {
      Event::Start { at } => {
        if self.core.begin(at) && self.hidden_total() == 0 {
          let score = self.score(false);
          self.core.finish(Status::Won, score);
        }
        None
      }
      Event::Guess(guess) => self.guess(&guess),
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

  fn slot(position: &str, player: &str, hidden: bool) -> LineupSlot {
    LineupSlot { position: position.into(), player: player.into(), hidden }
  }

  /// Barcelona, 2011 Champions League final. Slots 0-3 are shown.
  fn wembley() -> FormationPuzzle {
    FormationPuzzle {
      puzzle_id:       "xi-wembley-2011".into(),
      team:            "Barcelona".into(),
      formation:       "4-3-3".into(),
      slots:           vec![
        slot("GK", "Víctor Valdés", false),
        slot("RB", "Dani Alves", false),
        slot("CB", "Gerard Piqué", false),
        slot("CB", "Javier Mascherano", false),
        slot("LB", "Éric Abidal", true),
        slot("CM", "Sergio Busquets", true),
        slot("CM", "Xavi Hernández", true),
        slot("CM", "Andrés Iniesta", true),
        slot("RW", "Pedro Rodríguez", true),
        slot("CF", "Lionel Messi", true),
        slot("LW", "David Villa", true),
      ],
      time_limit_secs: 90,
    }
  }

  fn started() -> FormationGame {
    let mut game = FormationGame::new(wembley()).unwrap();
    game.transition(Event::Start { at: Utc::now() });
    game
  }

  fn guess(game: &mut FormationGame, slot: usize, text: &str) -> Option<GuessOutcome> {
    game.transition(Event::Guess(SlotGuess::new(slot, text)))
  }

  #[test]
  fn correct_guess_reveals_the_selected_slot() {
    let mut game = started();
    assert_eq!(game.hidden_total(), 7);

    assert_eq!(guess(&mut game, 9, "Messi"), Some(GuessOutcome::Correct));
    assert!(game.is_revealed(9));
    assert_eq!(game.found_count(), 1);
  }

  #[test]
  fn right_name_in_wrong_slot_is_flagged() {
    let mut game = started();
    assert_eq!(guess(&mut game, 10, "Messi"), Some(GuessOutcome::WrongSlot { slot: 10 }));
    assert!(!game.is_revealed(9));
    assert!(!game.is_revealed(10));
    assert_eq!(game.found_count(), 0);
  }

  #[test]
  fn repeats_and_visible_names_are_duplicates() {
    let mut game = started();
    guess(&mut game, 5, "Busquets");

    assert_eq!(guess(&mut game, 6, "Busquets"), Some(GuessOutcome::Duplicate));
    assert_eq!(guess(&mut game, 6, "Piqué"), Some(GuessOutcome::Duplicate));
    assert_eq!(guess(&mut game, 6, "Ronaldinho"), Some(GuessOutcome::Incorrect));
    assert_eq!(game.found_count(), 1);
  }

  #[test]
  fn visible_or_out_of_range_slots_are_ignored() {
    let mut game = started();
    assert_eq!(guess(&mut game, 0, "Valdés"), None);
    assert_eq!(guess(&mut game, 11, "Messi"), None);
    assert_eq!(game.core().last_outcome(), None);
  }

  #[test]
  fn full_lineup_wins_unless_given_up() {
    let mut game = started();
    let names = [
      "Abidal",
      "Busquets",
      "Xavi Hernandez",
      "Iniesta",
      "Pedro Rodriguez",
      "Messi",
      "Villa",
    ];
    for (offset, name) in names.iter().enumerate() {
      assert_eq!(guess(&mut game, 4 + offset, name), Some(GuessOutcome::Correct), "{name}");
    }
    assert_eq!(game.status(), Status::Won);
    let score = game.core().score().unwrap();
    assert_eq!(score.points, 7);
    assert_eq!(score.label, "Full XI");

    let mut quitter = started();
    guess(&mut quitter, 9, "Messi");
    quitter.transition(Event::GiveUp);
    assert_eq!(quitter.status(), Status::GaveUp);
    let score = quitter.core().score().unwrap();
    assert!(!score.won);
    assert_eq!(score.points, 1);
  }

  #[test]
  fn time_out_loses() {
    let mut game = started();
    game.transition(Event::Tick { remaining: 0 });
    assert_eq!(game.status(), Status::Lost);
    assert_eq!(guess(&mut game, 9, "Messi"), None);
  }

  #[test]
  fn restore_requires_matching_shape() {
    let mut revealed = vec![true, true, true, true, false, false, false, false, false, true, false];
    let mut game = FormationGame::new(wembley()).unwrap();
    let restore = |revealed: Vec<bool>| Restore {
      progress: FormationProgress { revealed },
      attempt_id: Uuid::new_v4(),
      started_at: Utc::now(),
      time_remaining: Some(30),
      revision: 2,
    };

    // A visible slot marked hidden cannot come from this puzzle.
    let mut broken = revealed.clone();
    broken[0] = false;
    assert!(!game.restore(restore(broken)));
    assert!(!game.restore(restore(vec![true; 3])));
    assert_eq!(game.status(), Status::Idle);

    revealed[5] = true;
    assert!(game.restore(restore(revealed)));
    assert_eq!(game.status(), Status::Playing);
    assert_eq!(game.found_count(), 2);
    assert_eq!(game.core().time_remaining(), Some(30));
  }
}
