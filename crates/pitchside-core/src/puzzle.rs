//! Puzzle content for each game mode.
//!
//! Content arrives already validated upstream; [`PuzzleContent::validate`]
//! only asserts the shape the state machines rely on.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{Error, Result, matcher::normalize};

/// A formation always lists a full starting eleven.
pub const LINEUP_SIZE: usize = 11;

fn default_recall_time_limit() -> u32 { 120 }

fn default_formation_time_limit() -> u32 { 90 }

fn require(condition: bool, message: impl FnOnce() -> String) -> Result<()> {
  if condition { Ok(()) } else { Err(Error::InvalidPuzzle(message())) }
}

// ─── Mode ────────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GameMode {
  Recall,
  Formation,
  LinkChain,
}

// ─── Recall ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
  Home,
  Away,
}

/// One goal in the match being recalled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalEvent {
  pub scorer:   String,
  pub minute:   u16,
  pub team:     Side,
  #[serde(default)]
  pub own_goal: bool,
}

/// Name every goalscorer of a match before the clock runs out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallPuzzle {
  pub puzzle_id:       String,
  pub home_team:       String,
  pub away_team:       String,
  pub goals:           Vec<GoalEvent>,
  #[serde(default = "default_recall_time_limit")]
  pub time_limit_secs: u32,
}

impl RecallPuzzle {
  pub fn validate(&self) -> Result<()> {
    require(!self.puzzle_id.is_empty(), || "recall puzzle has no id".into())?;
    require(self.time_limit_secs > 0, || {
      format!("recall puzzle {} has no time limit", self.puzzle_id)
    })?;
    for goal in &self.goals {
      require(!normalize(&goal.scorer).is_empty(), || {
        format!("goal at minute {} has no scorer", goal.minute)
      })?;
    }
    Ok(())
  }

  /// Distinct scorers in order of first goal, as `(normalised, display)`.
  pub fn scorers(&self) -> Vec<(String, String)> {
    let mut scorers: Vec<(String, String)> = Vec::new();
    for goal in &self.goals {
      let key = normalize(&goal.scorer);
      if !scorers.iter().any(|(existing, _)| *existing == key) {
        scorers.push((key, goal.scorer.clone()));
      }
    }
    scorers
  }
}

// ─── Formation ───────────────────────────────────────────────────────────────

/// One position in a lineup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineupSlot {
  /// Position abbreviation, e.g. `"GK"` or `"LCB"`.
  pub position: String,
  pub player:   String,
  /// Hidden slots are the ones the player has to name.
  pub hidden:   bool,
}

/// Fill in the hidden names of a starting eleven.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormationPuzzle {
  pub puzzle_id:       String,
  pub team:            String,
  /// Shape label such as `"4-3-3"`.
  pub formation:       String,
  pub slots:           Vec<LineupSlot>,
  #[serde(default = "default_formation_time_limit")]
  pub time_limit_secs: u32,
}

impl FormationPuzzle {
  pub fn validate(&self) -> Result<()> {
    require(!self.puzzle_id.is_empty(), || "formation puzzle has no id".into())?;
    require(self.slots.len() == LINEUP_SIZE, || {
      format!(
        "formation puzzle {} has {} slots, expected {LINEUP_SIZE}",
        self.puzzle_id,
        self.slots.len()
      )
    })?;
    require(self.time_limit_secs > 0, || {
      format!("formation puzzle {} has no time limit", self.puzzle_id)
    })?;
    for (idx, slot) in self.slots.iter().enumerate() {
      require(!normalize(&slot.player).is_empty(), || {
        format!("slot {idx} ({}) has no player", slot.position)
      })?;
    }
    Ok(())
  }

  pub fn hidden_count(&self) -> usize { self.slots.iter().filter(|s| s.hidden).count() }
}

// ─── Link chain ──────────────────────────────────────────────────────────────

/// A player as known to the remote link-validation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRef {
  pub id:   String,
  pub name: String,
}

/// Connect two players through shared clubs in as few steps as possible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkPuzzle {
  pub puzzle_id: String,
  pub start:     PlayerRef,
  pub end:       PlayerRef,
  /// The designer's intended minimum number of links.
  pub par:       u32,
}

impl LinkPuzzle {
  pub fn validate(&self) -> Result<()> {
    require(!self.puzzle_id.is_empty(), || "link puzzle has no id".into())?;
    require(!self.start.id.is_empty() && !self.end.id.is_empty(), || {
      format!("link puzzle {} is missing an endpoint id", self.puzzle_id)
    })?;
    Ok(())
  }
}

// ─── Envelope ────────────────────────────────────────────────────────────────

/// Any puzzle, tagged by mode, as delivered in a content payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PuzzleContent {
  Recall(RecallPuzzle),
  Formation(FormationPuzzle),
  LinkChain(LinkPuzzle),
}

impl PuzzleContent {
  pub fn mode(&self) -> GameMode {
    match self {
      Self::Recall(_) => GameMode::Recall,
      Self::Formation(_) => GameMode::Formation,
      Self::LinkChain(_) => GameMode::LinkChain,
    }
  }

  pub fn puzzle_id(&self) -> &str {
    match self {
      Self::Recall(p) => &p.puzzle_id,
      Self::Formation(p) => &p.puzzle_id,
      Self::LinkChain(p) => &p.puzzle_id,
    }
  }

  pub fn validate(&self) -> Result<()> {
    match self {
      Self::Recall(p) => p.validate(),
      Self::Formation(p) => p.validate(),
      Self::LinkChain(p) => p.validate(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn content_is_tagged_by_mode() {
    let json = r#"{
      "mode": "link_chain",
      "puzzle_id": "link-2026-10-19",
      "start": { "id": "p1", "name": "Peter Crouch" },
      "end":   { "id": "p2", "name": "Xabi Alonso" },
      "par": 2
    }"#;
    let content: PuzzleContent = serde_json::from_str(json).unwrap();
    assert_eq!(content.mode(), GameMode::LinkChain);
    assert_eq!(content.puzzle_id(), "link-2026-10-19");
    assert!(content.validate().is_ok());
    assert_eq!(content.mode().to_string(), "link_chain");
  }

  #[test]
  fn recall_defaults_time_limit_and_dedupes_scorers() {
    let json = r#"{
      "mode": "recall",
      "puzzle_id": "recall-1",
      "home_team": "Liverpool",
      "away_team": "Milan",
      "goals": [
        { "scorer": "Paolo Maldini", "minute": 1, "team": "away" },
        { "scorer": "Hernán Crespo", "minute": 39, "team": "away" },
        { "scorer": "Hernan Crespo", "minute": 44, "team": "away" },
        { "scorer": "Steven Gerrard", "minute": 54, "team": "home" }
      ]
    }"#;
    let PuzzleContent::Recall(puzzle) = serde_json::from_str(json).unwrap() else {
      panic!("expected a recall puzzle");
    };
    assert_eq!(puzzle.time_limit_secs, 120);
    let scorers = puzzle.scorers();
    assert_eq!(scorers.len(), 3);
    assert_eq!(scorers[1], ("hernan crespo".to_owned(), "Hernán Crespo".to_owned()));
  }

  #[test]
  fn formation_requires_eleven_slots() {
    let puzzle = FormationPuzzle {
      puzzle_id:       "xi-1".into(),
      team:            "Ajax".into(),
      formation:       "4-3-3".into(),
      slots:           vec![LineupSlot {
        position: "GK".into(),
        player:   "Edwin van der Sar".into(),
        hidden:   true,
      }],
      time_limit_secs: 90,
    };
    assert!(matches!(puzzle.validate(), Err(Error::InvalidPuzzle(_))));
  }
}
