//! A cancellable one-second countdown driven by a tokio interval.
//!
//! The countdown knows nothing about games. It owns a remaining-seconds
//! counter and, while running, a background task that decrements it once per
//! elapsed second and reports each new value through the configured hooks.

use std::{
  sync::{Arc, Mutex, MutexGuard},
  time::Duration,
};

use tokio::{
  task::JoinHandle,
  time::{Instant, interval_at},
};

const TICK: Duration = Duration::from_secs(1);

type TickHook = Arc<dyn Fn(u32) + Send + Sync>;
type FinishHook = Arc<dyn Fn() + Send + Sync>;

struct Shared {
  remaining:  u32,
  running:    bool,
  /// Bumped by every stop so that a tick task outliving its cancellation
  /// cannot touch the counter.
  generation: u64,
}

/// A countdown that ticks once per second until it reaches zero.
///
/// Hooks run on the tick task while the countdown's internal lock is held;
/// they must not call back into the countdown.
pub struct Countdown {
  initial:   u32,
  shared:    Arc<Mutex<Shared>>,
  on_tick:   Option<TickHook>,
  on_finish: Option<FinishHook>,
  task:      Option<JoinHandle<()>>,
}

impl Countdown {
  pub fn new(initial_secs: u32) -> Self {
    Self {
      initial:   initial_secs,
      shared:    Arc::new(Mutex::new(Shared {
        remaining:  initial_secs,
        running:    false,
        generation: 0,
      })),
      on_tick:   None,
      on_finish: None,
      task:      None,
    }
  }

  /// Called with the new remaining value after every tick.
  pub fn on_tick(mut self, hook: impl Fn(u32) + Send + Sync + 'static) -> Self {
    self.on_tick = Some(Arc::new(hook));
    self
  }

  /// Called exactly once when the countdown reaches zero.
  pub fn on_finish(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
    self.on_finish = Some(Arc::new(hook));
    self
  }

  fn lock(&self) -> MutexGuard<'_, Shared> {
    self.shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  pub fn initial(&self) -> u32 { self.initial }

  pub fn time_remaining(&self) -> u32 { self.lock().remaining }

  pub fn is_running(&self) -> bool { self.lock().running }

  /// Start ticking. A no-op while already running or when nothing remains.
  ///
  /// Must be called from within a tokio runtime.
  pub fn start(&mut self) {
    let generation = {
      let mut shared = self.lock();
      if shared.running || shared.remaining == 0 {
        return;
      }
      shared.running = true;
      shared.generation
    };

    let shared = Arc::clone(&self.shared);
    let on_tick = self.on_tick.clone();
    let on_finish = self.on_finish.clone();
    self.task = Some(tokio::spawn(async move {
      let mut ticks = interval_at(Instant::now() + TICK, TICK);
      loop {
        ticks.tick().await;
        let mut state = shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if state.generation != generation || !state.running {
          return;
        }
        state.remaining = state.remaining.saturating_sub(1);
        let remaining = state.remaining;
        if let Some(hook) = &on_tick {
          hook(remaining);
        }
        if remaining == 0 {
          state.running = false;
          if let Some(hook) = &on_finish {
            hook();
          }
          return;
        }
      }
    }));
  }

  /// Halt ticking, keeping the current value.
  pub fn stop(&mut self) {
    {
      let mut shared = self.lock();
      shared.running = false;
      shared.generation += 1;
    }
    if let Some(task) = self.task.take() {
      task.abort();
    }
  }

  /// Stop and restore the configured initial value.
  pub fn reset(&mut self) {
    self.stop();
    self.lock().remaining = self.initial;
  }

  /// Stop and overwrite the current value. Used to re-seed a restored
  /// session before the caller starts the countdown again.
  pub fn set_to(&mut self, secs: u32) {
    self.stop();
    self.lock().remaining = secs;
  }
}

impl Drop for Countdown {
  fn drop(&mut self) { self.stop(); }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicU32, Ordering};

  use tokio::time::sleep;

  use super::*;

  fn secs(n: f64) -> Duration { Duration::from_secs_f64(n) }

  #[tokio::test(start_paused = true)]
  async fn ticks_once_per_second() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let mut countdown =
      Countdown::new(5).on_tick(move |remaining| sink.lock().unwrap().push(remaining));

    countdown.start();
    assert!(countdown.is_running());
    sleep(secs(3.5)).await;

    assert_eq!(countdown.time_remaining(), 2);
    assert_eq!(*seen.lock().unwrap(), vec![4, 3, 2]);
  }

  #[tokio::test(start_paused = true)]
  async fn floors_at_zero_and_finishes_once() {
    let finished = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&finished);
    let mut countdown =
      Countdown::new(3).on_finish(move || {
        counter.fetch_add(1, Ordering::SeqCst);
      });

    countdown.start();
    sleep(secs(10.5)).await;
    assert_eq!(countdown.time_remaining(), 0);
    assert!(!countdown.is_running());

    // Starting again at zero does nothing.
    countdown.start();
    sleep(secs(60.0)).await;
    assert_eq!(countdown.time_remaining(), 0);
    assert_eq!(finished.load(Ordering::SeqCst), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn double_start_does_not_double_tick() {
    let ticks = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&ticks);
    let mut countdown = Countdown::new(30).on_tick(move |_| {
      counter.fetch_add(1, Ordering::SeqCst);
    });

    countdown.start();
    countdown.start();
    sleep(secs(2.5)).await;

    assert_eq!(ticks.load(Ordering::SeqCst), 2);
    assert_eq!(countdown.time_remaining(), 28);
  }

  #[tokio::test(start_paused = true)]
  async fn stop_keeps_value_and_reset_restores_it() {
    let mut countdown = Countdown::new(10);
    countdown.start();
    sleep(secs(3.5)).await;

    countdown.stop();
    assert!(!countdown.is_running());
    sleep(secs(5.0)).await;
    assert_eq!(countdown.time_remaining(), 7);

    countdown.reset();
    assert_eq!(countdown.time_remaining(), 10);
    assert!(!countdown.is_running());
  }

  #[tokio::test(start_paused = true)]
  async fn set_to_reseeds_without_starting() {
    let mut countdown = Countdown::new(60);
    countdown.start();
    countdown.set_to(12);
    assert!(!countdown.is_running());

    sleep(secs(5.0)).await;
    assert_eq!(countdown.time_remaining(), 12);

    countdown.start();
    sleep(secs(2.5)).await;
    assert_eq!(countdown.time_remaining(), 10);
  }

  #[tokio::test(start_paused = true)]
  async fn no_tick_after_drop() {
    let ticks = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&ticks);
    let mut countdown = Countdown::new(30).on_tick(move |_| {
      counter.fetch_add(1, Ordering::SeqCst);
    });
    countdown.start();
    sleep(secs(1.5)).await;
    drop(countdown);

    sleep(secs(10.0)).await;
    assert_eq!(ticks.load(Ordering::SeqCst), 1);
  }
}
