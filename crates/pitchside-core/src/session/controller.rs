//! The session controller: wraps a [`GameMachine`] with its countdown, the
//! resume protocol and progressive saves.
//!
//! Writes never block a command. Each is spawned onto the runtime holding an
//! `Arc` of the store and an owned record, so a write that outlives its
//! session touches nothing but the store.

use std::{
  future::pending,
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
  time::Duration,
};

use chrono::Utc;
use tokio::{
  sync::mpsc::{UnboundedReceiver, unbounded_channel},
  task::JoinHandle,
  time::timeout,
};
use tracing::{debug, info, warn};

use super::{
  Event, GameMachine, GameResult, GuessOutcome, Restore,
  link_chain::{LinkAttempt, LinkChainGame, LinkResolution, SharedContext},
};
use crate::{
  Result,
  attempt::{AttemptMetadata, AttemptRecord},
  countdown::Countdown,
  gateway::{AttemptStore, LinkValidator, SyncTrigger},
  puzzle::PlayerRef,
};

/// Default bound on a single link-validation round trip.
pub const DEFAULT_LINK_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
  /// How long one link check may take before it counts as "not linked".
  pub link_timeout: Duration,
}

impl Default for SessionOptions {
  fn default() -> Self { Self { link_timeout: DEFAULT_LINK_TIMEOUT } }
}

/// Writes still in flight when a session was torn down.
///
/// Await [`PendingWrites::wait`] to make sure they landed, or drop the value
/// to let them finish in the background.
#[derive(Debug, Default)]
pub struct PendingWrites {
  tasks: Vec<JoinHandle<()>>,
}

impl PendingWrites {
  pub fn len(&self) -> usize { self.tasks.len() }

  pub fn is_empty(&self) -> bool { self.tasks.is_empty() }

  pub async fn wait(self) {
    for task in self.tasks {
      if let Err(err) = task.await {
        warn!(error = %err, "attempt write task failed");
      }
    }
  }
}

// ─── Session ─────────────────────────────────────────────────────────────────

pub struct Session<M: GameMachine, S: AttemptStore + 'static> {
  machine:          M,
  store:            Arc<S>,
  options:          SessionOptions,
  countdown:        Option<Countdown>,
  ticks:            Option<UnboundedReceiver<u32>>,
  pending:          Vec<JoinHandle<()>>,
  /// Set by write tasks once any write for this attempt has landed.
  saved:            Arc<AtomicBool>,
  /// `progress_version` as of the last issued write.
  written_version:  u64,
  terminal_written: bool,
  restored:         bool,
  sync:             Option<Arc<dyn SyncTrigger>>,
}

impl<M: GameMachine, S: AttemptStore + 'static> Session<M, S> {
  /// Build a session around an idle machine, restoring any unfinished
  /// attempt stored for the same puzzle.
  ///
  /// A failed read, a completed attempt or unreadable metadata all leave the
  /// machine idle so the player simply starts over.
  pub async fn mount(mut machine: M, store: Arc<S>, options: SessionOptions) -> Self {
    let stored = store.get_attempt_by_puzzle_id(machine.puzzle_id()).await;
    let restored = match stored {
      Ok(Some(record)) if record.completed => {
        debug!(puzzle_id = machine.puzzle_id(), attempt_id = %record.id, "attempt already completed");
        false
      }
      Ok(Some(record)) => restore_from(&mut machine, &record),
      Ok(None) => false,
      Err(err) => {
        warn!(puzzle_id = machine.puzzle_id(), error = %err, "failed to read stored attempt");
        false
      }
    };

    let (countdown, ticks) = match machine.time_limit() {
      Some(limit) => {
        let (tx, rx) = unbounded_channel();
        let mut countdown = Countdown::new(limit).on_tick(move |remaining| {
          let _ = tx.send(remaining);
        });
        if restored && let Some(remaining) = machine.core().time_remaining() {
          countdown.set_to(remaining);
        }
        (Some(countdown), Some(rx))
      }
      None => (None, None),
    };

    Self {
      machine,
      store,
      options,
      countdown,
      ticks,
      pending: Vec::new(),
      saved: Arc::new(AtomicBool::new(false)),
      written_version: 0,
      terminal_written: false,
      restored,
      sync: None,
    }
  }

  /// Notify `trigger` after every successful terminal write.
  pub fn with_sync_trigger(mut self, trigger: Arc<dyn SyncTrigger>) -> Self {
    self.sync = Some(trigger);
    self
  }

  pub fn machine(&self) -> &M { &self.machine }

  /// Whether stored progress was rehydrated on mount.
  pub fn restored(&self) -> bool { self.restored }

  pub fn time_remaining(&self) -> Option<u32> { self.machine.core().time_remaining() }

  /// Whether any write for this attempt is known to have landed.
  pub fn attempt_saved(&self) -> bool { self.saved.load(Ordering::Acquire) }

  pub fn last_outcome(&self) -> Option<GuessOutcome> { self.machine.core().last_outcome() }

  pub fn dismiss_outcome(&mut self) { self.machine.core_mut().dismiss_outcome(); }

  /// The terminal result, once there is one.
  pub fn result(&self) -> Option<GameResult> { GameResult::of(&self.machine) }

  // ─── Commands ───────────────────────────────────────────────────────────

  pub fn start(&mut self) {
    self.apply(Event::Start { at: Utc::now() });
    if self.machine.core().is_playing()
      && let Some(countdown) = &mut self.countdown
    {
      countdown.start();
    }
  }

  /// Start the countdown of a restored session once the player is back.
  pub fn resume_clock(&mut self) {
    if self.restored
      && self.machine.core().is_playing()
      && let Some(countdown) = &mut self.countdown
    {
      countdown.start();
    }
  }

  pub fn guess(&mut self, guess: M::Guess) -> Option<GuessOutcome> { self.apply(Event::Guess(guess)) }

  pub fn give_up(&mut self) { self.apply(Event::GiveUp); }

  pub fn undo_last(&mut self) { self.apply(Event::UndoLast); }

  /// Wait for the next countdown tick and apply it. Never resolves for an
  /// untimed session.
  pub async fn next_tick(&mut self) -> u32 {
    let Some(ticks) = &mut self.ticks else {
      return pending().await;
    };
    let next = ticks.recv().await;
    match next {
      Some(remaining) => {
        self.transition(Event::Tick { remaining });
        remaining
      }
      None => pending().await,
    }
  }

  /// Best-effort flush when the app leaves the foreground.
  pub fn on_background(&mut self) { self.flush(); }

  /// Wait for every write issued so far.
  pub async fn settle(&mut self) {
    for task in self.pending.drain(..) {
      if let Err(err) = task.await {
        warn!(error = %err, "attempt write task failed");
      }
    }
    if self.saved.load(Ordering::Acquire) {
      self.machine.core_mut().mark_saved();
    }
  }

  /// Flush, cancel the countdown and hand back the writes still in flight.
  pub fn teardown(mut self) -> PendingWrites {
    self.flush();
    if let Some(countdown) = &mut self.countdown {
      countdown.stop();
    }
    PendingWrites { tasks: std::mem::take(&mut self.pending) }
  }

  // ─── Persistence ────────────────────────────────────────────────────────

  fn apply(&mut self, event: Event<M::Guess>) -> Option<GuessOutcome> {
    self.catch_up_clock();
    self.transition(event)
  }

  fn transition(&mut self, event: Event<M::Guess>) -> Option<GuessOutcome> {
    let outcome = self.machine.transition(event);
    self.after_transition();
    outcome
  }

  /// Apply every tick the countdown has already fired, oldest first, so a
  /// command never acts on a stale clock.
  fn catch_up_clock(&mut self) {
    loop {
      let Some(remaining) = self.ticks.as_mut().and_then(|ticks| ticks.try_recv().ok()) else {
        break;
      };
      self.transition(Event::Tick { remaining });
    }
  }

  fn after_transition(&mut self) {
    let core = self.machine.core();
    if core.status().is_terminal() {
      if !self.terminal_written {
        self.terminal_written = true;
        if let Some(countdown) = &mut self.countdown {
          countdown.stop();
        }
        self.write(true);
      }
    } else if core.is_playing() && core.progress_version() != self.written_version {
      self.write(false);
    }
  }

  fn flush(&mut self) {
    self.catch_up_clock();
    if self.machine.core().is_playing() && self.machine.found_count() > 0 {
      self.write(false);
    }
  }

  fn write(&mut self, completed: bool) {
    let record = match self.snapshot(completed) {
      Ok(record) => record,
      Err(err) => {
        warn!(puzzle_id = self.machine.puzzle_id(), error = %err, "failed to encode attempt");
        return;
      }
    };
    self.written_version = self.machine.core().progress_version();

    let store = Arc::clone(&self.store);
    let saved = Arc::clone(&self.saved);
    let sync = if completed { self.sync.clone() } else { None };
    self.pending.retain(|task| !task.is_finished());
    self.pending.push(tokio::spawn(async move {
      let (id, revision) = (record.id, record.revision);
      match store.save_attempt(record).await {
        Ok(()) => {
          saved.store(true, Ordering::Release);
          debug!(attempt_id = %id, revision, completed, "saved attempt");
          if let Some(sync) = sync {
            sync.request_sync();
          }
        }
        Err(err) => warn!(attempt_id = %id, revision, error = %err, "failed to save attempt"),
      }
    }));
  }

  fn snapshot(&mut self, completed: bool) -> Result<AttemptRecord> {
    let now = Utc::now();
    let puzzle_id = self.machine.puzzle_id().to_owned();
    let time_limit = self.machine.time_limit();
    let progress = self.machine.progress();

    let core = self.machine.core_mut();
    let id = core.ensure_attempt_id();
    let revision = core.next_revision();
    let started_at = core.started_at().unwrap_or(now);
    let time_remaining = core.time_remaining();
    let elapsed_secs = match (time_limit, time_remaining) {
      (Some(limit), Some(remaining)) => u64::from(limit.saturating_sub(remaining)),
      _ => (now - started_at).num_seconds().max(0) as u64,
    };
    let score = if completed { core.score() } else { None };

    let metadata = AttemptMetadata { revision, progress, elapsed_secs, time_remaining, started_at };
    Ok(AttemptRecord {
      id,
      puzzle_id,
      completed,
      score: score.map(|s| s.points),
      score_display: score.map(|s| s.display.clone()),
      metadata: metadata.encode()?,
      started_at,
      completed_at: completed.then_some(now),
      synced: false,
      revision,
    })
  }
}

fn restore_from<M: GameMachine>(machine: &mut M, record: &AttemptRecord) -> bool {
  let metadata = match AttemptMetadata::<M::Progress>::decode(&record.metadata) {
    Ok(metadata) => metadata,
    Err(err) => {
      warn!(attempt_id = %record.id, error = %err, "discarding unreadable attempt metadata");
      return false;
    }
  };
  let restored = machine.restore(Restore {
    progress:       metadata.progress,
    attempt_id:     record.id,
    started_at:     record.started_at,
    time_remaining: metadata.time_remaining,
    revision:       record.revision.max(metadata.revision),
  });
  if restored {
    info!(attempt_id = %record.id, found = machine.found_count(), "restored attempt");
  } else {
    warn!(attempt_id = %record.id, "stored progress does not fit this puzzle");
  }
  restored
}

// ─── Link chain ──────────────────────────────────────────────────────────────

impl<S: AttemptStore + 'static> Session<LinkChainGame, S> {
  /// Resolve `candidate` against the chain through `validator`, then submit
  /// it.
  ///
  /// The candidate is checked against the chain tail and, when linked,
  /// speculatively against the end player. When it is not linked to the tail
  /// the earlier chain elements are checked, latest first, to tell a
  /// misplaced link from a wrong one. Failed or slow checks count as "not
  /// linked", and a failed tail check ends the resolution there.
  pub async fn submit_link<V: LinkValidator>(
    &mut self,
    validator: &V,
    candidate: PlayerRef,
  ) -> Option<GuessOutcome> {
    let game = &self.machine;
    if !game.core().is_playing() {
      return None;
    }
    if game.contains(&candidate) {
      let attempt = LinkAttempt { candidate, resolution: LinkResolution::NotLinked };
      return self.guess(attempt);
    }

    let tail = game.tail().id.clone();
    let end = game.puzzle().end.id.clone();
    let earlier: Vec<String> = game.chain()[..game.chain().len() - 1]
      .iter()
      .map(|link| link.player.id.clone())
      .collect();
    let limit = self.options.link_timeout;

    let resolution = match check(validator, limit, &tail, &candidate.id).await {
      Checked::Linked(via) => {
        let reaches_end = if candidate.id == end {
          None
        } else {
          check(validator, limit, &candidate.id, &end).await.linked()
        };
        LinkResolution::Linked { via, reaches_end }
      }
      // A failed tail check is a plain miss; earlier links are not consulted.
      Checked::Failed => LinkResolution::NotLinked,
      Checked::NotLinked => {
        let mut resolution = LinkResolution::NotLinked;
        for (index, player) in earlier.iter().enumerate().rev() {
          if check(validator, limit, player, &candidate.id).await.linked().is_some() {
            resolution = LinkResolution::LinkedEarlier { index };
            break;
          }
        }
        resolution
      }
    };

    self.guess(LinkAttempt { candidate, resolution })
  }
}

/// What one gateway call said about a pair of players.
enum Checked {
  Linked(SharedContext),
  NotLinked,
  /// The call errored or timed out.
  Failed,
}

impl Checked {
  fn linked(self) -> Option<SharedContext> {
    match self {
      Self::Linked(via) => Some(via),
      Self::NotLinked | Self::Failed => None,
    }
  }
}

async fn check<V: LinkValidator>(
  validator: &V,
  limit: Duration,
  player_a: &str,
  player_b: &str,
) -> Checked {
  match timeout(limit, validator.check_linked(player_a, player_b)).await {
    Ok(Ok(check)) => SharedContext::from_check(&check).map_or(Checked::NotLinked, Checked::Linked),
    Ok(Err(err)) => {
      warn!(player_a, player_b, error = %err, "link check failed");
      Checked::Failed
    }
    Err(_) => {
      warn!(player_a, player_b, timeout_secs = limit.as_secs(), "link check timed out");
      Checked::Failed
    }
  }
}
