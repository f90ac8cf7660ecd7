//! Score calculators, one per game mode.
//!
//! Each calculator is a pure function from progress counters to a [`Score`].
//! Labels depend only on the completion ratio, through fixed thresholds.

use serde::{Deserialize, Serialize};

/// Seconds of remaining time worth one bonus point in recall mode.
pub const RECALL_BONUS_INTERVAL_SECS: u32 = 10;

/// Points for a link chain finished at or under par.
pub const LINK_CHAIN_MAX_POINTS: u32 = 100;

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Progress counters for the slot-and-name modes (recall, formation).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
  pub found:          u32,
  pub total:          u32,
  /// Seconds left when the session ended; `None` for an untimed session.
  pub time_remaining: Option<u32>,
  /// Set when the player gave up; a forfeited tally never wins.
  pub forfeited:      bool,
}

impl Tally {
  fn completed(&self) -> bool { self.found >= self.total }

  fn won(&self) -> bool {
    self.completed()
      && !self.forfeited
      && (self.total == 0 || self.time_remaining.is_none_or(|secs| secs > 0))
  }

  fn ratio(&self) -> f64 {
    if self.total == 0 {
      1.0
    } else {
      f64::from(self.found.min(self.total)) / f64::from(self.total)
    }
  }

  fn display(&self) -> String { format!("{}/{}", self.found, self.total) }
}

/// Progress counters for the link-chain mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainTally {
  /// Links in the finished (or abandoned) chain.
  pub steps:     u32,
  pub par:       u32,
  pub completed: bool,
  pub forfeited: bool,
}

// ─── Output ──────────────────────────────────────────────────────────────────

/// Mode-specific counters carried alongside the common score fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScoreDetail {
  Recall {
    scorers_found:  u32,
    total_scorers:  u32,
    time_bonus:     u32,
    time_remaining: Option<u32>,
  },
  Formation {
    revealed:       u32,
    hidden:         u32,
    time_remaining: Option<u32>,
  },
  LinkChain {
    steps: u32,
    par:   u32,
  },
}

/// A terminal score. Completion and winning are independent: a timed puzzle
/// completed exactly as the clock hits zero is completed but not won.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
  pub points:    u32,
  pub completed: bool,
  pub won:       bool,
  pub label:     String,
  /// Short human-readable summary, stored as the attempt's `score_display`.
  pub display:   String,
  pub detail:    ScoreDetail,
}

// ─── Recall ──────────────────────────────────────────────────────────────────

pub fn recall_label(ratio: f64) -> &'static str {
  if ratio >= 1.0 {
    "Perfect recall"
  } else if ratio >= 0.75 {
    "Great memory"
  } else if ratio >= 0.5 {
    "Solid effort"
  } else if ratio >= 0.25 {
    "Getting there"
  } else {
    "Better luck tomorrow"
  }
}

/// Recall scores one point per scorer found, plus a time bonus when won.
pub fn recall_score(tally: Tally) -> Score {
  let won = tally.won();
  let time_bonus = match (won, tally.time_remaining) {
    (true, Some(secs)) if tally.total > 0 => secs / RECALL_BONUS_INTERVAL_SECS,
    _ => 0,
  };

  Score {
    points: tally.found + time_bonus,
    completed: tally.completed(),
    won,
    label: recall_label(tally.ratio()).to_owned(),
    display: tally.display(),
    detail: ScoreDetail::Recall {
      scorers_found: tally.found,
      total_scorers: tally.total,
      time_bonus,
      time_remaining: tally.time_remaining,
    },
  }
}

// ─── Formation ───────────────────────────────────────────────────────────────

pub fn formation_label(ratio: f64) -> &'static str {
  if ratio >= 1.0 {
    "Full XI"
  } else if ratio >= 0.8 {
    "Nearly there"
  } else if ratio >= 0.5 {
    "Half the squad"
  } else if ratio > 0.0 {
    "A few names"
  } else {
    "Empty dressing room"
  }
}

/// Formation scores the raw count of hidden players revealed.
pub fn formation_score(tally: Tally) -> Score {
  Score {
    points:    tally.found,
    completed: tally.completed(),
    won:       tally.won(),
    label:     formation_label(tally.ratio()).to_owned(),
    display:   tally.display(),
    detail:    ScoreDetail::Formation {
      revealed:       tally.found,
      hidden:         tally.total,
      time_remaining: tally.time_remaining,
    },
  }
}

// ─── Link chain ──────────────────────────────────────────────────────────────

pub fn link_chain_label(tally: &ChainTally) -> &'static str {
  if !tally.completed || tally.forfeited {
    return "Chain broken";
  }
  // An empty chain earns no points.
  if tally.steps == 0 {
    return "Par";
  }
  if tally.steps < tally.par {
    return "Under par";
  }
  let ratio = (f64::from(tally.par) / f64::from(tally.steps)).min(1.0);
  if ratio >= 1.0 {
    "Par"
  } else if ratio >= 0.75 {
    "Bogey"
  } else {
    "Scenic route"
  }
}

/// Link chains score full marks at or under par, scaled down beyond it.
pub fn link_chain_score(tally: ChainTally) -> Score {
  let finished = tally.completed && !tally.forfeited;
  let points = if !finished || tally.par == 0 || tally.steps == 0 {
    0
  } else if tally.steps <= tally.par {
    LINK_CHAIN_MAX_POINTS
  } else {
    let scaled = u64::from(LINK_CHAIN_MAX_POINTS) * u64::from(tally.par) / u64::from(tally.steps);
    // `steps > par` here, so the scaled value stays below the maximum.
    u32::try_from(scaled).unwrap_or(LINK_CHAIN_MAX_POINTS)
  };

  Score {
    points,
    completed: tally.completed,
    won: finished,
    label: link_chain_label(&tally).to_owned(),
    display: if tally.completed {
      format!("{} steps (par {})", tally.steps, tally.par)
    } else {
      "DNF".to_owned()
    },
    detail: ScoreDetail::LinkChain { steps: tally.steps, par: tally.par },
  }
}
