//! Cancellable periodic timer that drives a poll callback on a fixed cadence.
//!
//! One spawned task delivers every firing, so ticks never overlap and a slow
//! callback simply delays the next firing instead of stacking invocations.
//! Stopping is cooperative: an in-flight callback runs to completion but is
//! never rescheduled.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::error::PollerError;

/// Outcome of one poll callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Keep the schedule alive.
    Continue,
    /// End the schedule after this firing.
    Stop,
}

/// Callback invoked on every poller firing.
#[async_trait]
pub trait PollHandler: Send + Sync + 'static {
    /// Handle one firing.
    ///
    /// An error is logged and the schedule stays alive; return
    /// [`Tick::Stop`] to end the schedule from inside the callback.
    async fn on_tick(&self) -> anyhow::Result<Tick>;
}

/// Fires a [`PollHandler`] on a fixed interval until stopped.
pub struct Poller {
    interval: Duration,
    handler: Arc<dyn PollHandler>,
    active: Option<ActivePoll>,
}

struct ActivePoll {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Poller {
    /// Create a poller for the given cadence and handler.
    ///
    /// # Errors
    ///
    /// Returns [`PollerError::InvalidInterval`] when `interval` is zero.
    pub fn new(interval: Duration, handler: Arc<dyn PollHandler>) -> Result<Self, PollerError> {
        if interval.is_zero() {
            return Err(PollerError::InvalidInterval);
        }
        Ok(Self {
            interval,
            handler,
            active: None,
        })
    }

    /// Begin scheduling; the first firing occurs one full interval from now,
    /// never immediately.
    ///
    /// Calling `start` while already running re-arms the poller: the previous
    /// schedule is stopped and the interval restarts from zero. Callers with
    /// a visibility lifecycle can therefore call `start` on every resume.
    pub fn start(&mut self) {
        self.stop();
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = spawn_poll_loop(self.interval, Arc::clone(&self.handler), stop_rx);
        self.active = Some(ActivePoll {
            stop: stop_tx,
            task,
        });
    }

    /// Cancel all future firings.
    ///
    /// Idempotent and safe to call before `start`. An in-flight callback
    /// completes, but no further firings occur afterwards.
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            let _ = active.stop.send(true);
        }
    }

    /// Whether a schedule is armed and its task is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| !active.task.is_finished())
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_poll_loop(
    interval: Duration,
    handler: Arc<dyn PollHandler>,
    mut stop: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                // The stop arm wins whenever both are ready, so a stop issued
                // during a callback takes effect before the next firing.
                _ = stop.changed() => break,
                _ = ticker.tick() => {
                    match handler.on_tick().await {
                        Ok(Tick::Continue) => {}
                        Ok(Tick::Stop) => {
                            debug!("poll handler ended the schedule");
                            break;
                        }
                        Err(err) => {
                            warn!(error = %err, "poll callback failed; schedule continues");
                        }
                    }
                }
            }
        }
    })
}
