//! Eventual consistency between the local attempt store and the remote one.
//!
//! The queue is the store itself: every completed row with `synced = 0` is
//! pending. A pass that leaves anything behind pushes the next allowed pass
//! back exponentially, and a clean pass clears the backoff.

use std::{
  sync::{Arc, Mutex, MutexGuard},
  time::Duration,
};

use tokio::{runtime::Handle, time::Instant};
use tracing::{debug, info, warn};

use crate::gateway::{AttemptStore, SyncRemote, SyncTrigger};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPolicy {
  /// Delay after the first failed pass.
  pub base_delay: Duration,
  /// Ceiling for the doubled delay.
  pub max_delay:  Duration,
}

impl Default for SyncPolicy {
  fn default() -> Self {
    Self {
      base_delay: Duration::from_secs(5),
      max_delay:  Duration::from_secs(600),
    }
  }
}

impl SyncPolicy {
  /// `min(base * 2^(failures - 1), max)`; zero for no failures.
  pub fn delay_after(&self, failures: u32) -> Duration {
    if failures == 0 {
      return Duration::ZERO;
    }
    let factor = 1u32.checked_shl(failures - 1).unwrap_or(u32::MAX);
    self.base_delay.saturating_mul(factor).min(self.max_delay)
  }
}

/// Outcome of one pass. `failed` counts attempts that could not be pushed or
/// marked, or is 1 when the pending queue itself could not be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
  pub pushed: usize,
  pub failed: usize,
}

#[derive(Debug, Default)]
struct Backoff {
  failures: u32,
  retry_at: Option<Instant>,
}

struct Inner<S, R> {
  store:   Arc<S>,
  remote:  R,
  policy:  SyncPolicy,
  backoff: Mutex<Backoff>,
  /// Held for the duration of a pass so passes never overlap.
  running: tokio::sync::Mutex<()>,
}

/// Pushes completed attempts to the remote store. Cheap to clone.
pub struct Syncer<S, R> {
  inner: Arc<Inner<S, R>>,
}

impl<S, R> Clone for Syncer<S, R> {
  fn clone(&self) -> Self { Self { inner: Arc::clone(&self.inner) } }
}

impl<S: AttemptStore, R: SyncRemote> Syncer<S, R> {
  pub fn new(store: Arc<S>, remote: R, policy: SyncPolicy) -> Self {
    Self {
      inner: Arc::new(Inner {
        store,
        remote,
        policy,
        backoff: Mutex::new(Backoff::default()),
        running: tokio::sync::Mutex::new(()),
      }),
    }
  }

  fn backoff(&self) -> MutexGuard<'_, Backoff> {
    self.inner.backoff.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  pub fn remote(&self) -> &R { &self.inner.remote }

  /// Consecutive passes that left attempts behind.
  pub fn consecutive_failures(&self) -> u32 { self.backoff().failures }

  /// When the next foreground pass is allowed, if it is being held back.
  pub fn retry_at(&self) -> Option<Instant> { self.backoff().retry_at }

  /// Push every pending attempt once, regardless of backoff.
  pub async fn sync_pending(&self) -> SyncReport {
    let _pass = self.inner.running.lock().await;
    let report = self.push_all().await;
    self.record(report);
    report
  }

  /// Run a pass unless the last failure's backoff window is still open.
  /// Returns `None` when skipped.
  pub async fn on_foreground(&self) -> Option<SyncReport> {
    if self.retry_at().is_some_and(|at| Instant::now() < at) {
      debug!("sync held back by backoff");
      return None;
    }
    Some(self.sync_pending().await)
  }

  async fn push_all(&self) -> SyncReport {
    let Inner { store, remote, .. } = &*self.inner;
    let pending = match store.list_unsynced().await {
      Ok(pending) => pending,
      Err(err) => {
        warn!(error = %err, "failed to list unsynced attempts");
        return SyncReport { pushed: 0, failed: 1 };
      }
    };

    let mut report = SyncReport::default();
    for record in &pending {
      if let Err(err) = remote.push_attempt(record).await {
        warn!(attempt_id = %record.id, error = %err, "failed to push attempt");
        report.failed += 1;
        continue;
      }
      match store.mark_synced(record.id, record.revision).await {
        Ok(()) => report.pushed += 1,
        Err(err) => {
          warn!(attempt_id = %record.id, error = %err, "failed to mark attempt synced");
          report.failed += 1;
        }
      }
    }
    report
  }

  fn record(&self, report: SyncReport) {
    let policy = self.inner.policy;
    let mut backoff = self.backoff();
    if report.failed == 0 {
      *backoff = Backoff::default();
      if report.pushed > 0 {
        info!(pushed = report.pushed, "synced attempts");
      }
      return;
    }
    backoff.failures = backoff.failures.saturating_add(1);
    let delay = policy.delay_after(backoff.failures);
    backoff.retry_at = Some(Instant::now() + delay);
    info!(
      pushed = report.pushed,
      failed = report.failed,
      retry_in_secs = delay.as_secs(),
      "sync incomplete"
    );
  }
}

impl<S, R> SyncTrigger for Syncer<S, R>
where
  S: AttemptStore + 'static,
  R: SyncRemote + 'static,
{
  fn request_sync(&self) {
    let Ok(runtime) = Handle::try_current() else {
      warn!("sync requested outside a runtime");
      return;
    };
    let syncer = self.clone();
    runtime.spawn(async move {
      syncer.on_foreground().await;
    });
  }
}
