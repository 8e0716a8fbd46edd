//! Midnight reset of notification markers.
//!
//! [`DayBoundaryScheduler::arm`] spawns one tokio task that sleeps until the
//! next local midnight, clears the shared [`PersistentFlagStore`], and re-arms
//! for the following midnight until its [`CancellationToken`] fires.
//!
//! A process that is not running at midnight simply misses that reset;
//! [`PersistentFlagStore::load_current`] covers the gap on the next cycle.
//!
//! [`PersistentFlagStore`]: crate::store::flag_store::PersistentFlagStore
//! [`PersistentFlagStore::load_current`]: crate::store::flag_store::PersistentFlagStore::load_current

use crate::store::flag_store::SharedFlagStore;
use chrono::{DateTime, Local, TimeDelta, TimeZone};
use log::{error, info};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Wall-clock source for deadline computation.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// Clock reading the system local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Returns the first instant of the calendar day after `now`.
///
/// When local midnight does not exist (a DST gap), the earliest valid
/// instant within the following hour is used. Ambiguous midnights resolve
/// to the earlier instant.
pub fn next_midnight<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    let timezone = now.timezone();
    let fallback = now.clone() + TimeDelta::hours(24);
    let Some(next_day) = now.date_naive().succ_opt() else {
        return fallback;
    };
    let Some(midnight) = next_day.and_hms_opt(0, 0, 0) else {
        return fallback;
    };

    timezone
        .from_local_datetime(&midnight)
        .earliest()
        .or_else(|| {
            timezone
                .from_local_datetime(&(midnight + TimeDelta::hours(1)))
                .earliest()
        })
        .unwrap_or(fallback)
}

/// Time left until [`next_midnight`], never negative.
pub fn delay_until_next_midnight<Tz: TimeZone>(now: &DateTime<Tz>) -> Duration {
    next_midnight(now)
        .signed_duration_since(now.clone())
        .to_std()
        .unwrap_or(Duration::ZERO)
}

/// Clears markers once per local calendar day.
pub struct DayBoundaryScheduler {
    flags: SharedFlagStore,
    clock: Arc<dyn Clock>,
}

impl DayBoundaryScheduler {
    pub fn new(flags: SharedFlagStore) -> Self {
        Self {
            flags,
            clock: Arc::new(SystemClock),
        }
    }

    /// Overrides the wall clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Spawns the reset task on the current tokio runtime.
    ///
    /// The task runs until `cancel` is cancelled or the runtime shuts down.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime, like `tokio::spawn`.
    pub fn arm(self, cancel: CancellationToken) -> DayBoundaryHandle {
        let next_deadline = Arc::new(Mutex::new(None));
        let firings = Arc::new(AtomicU64::new(0));
        let task = tokio::spawn(run_reset_loop(
            self.flags,
            self.clock,
            cancel.clone(),
            Arc::clone(&next_deadline),
            Arc::clone(&firings),
        ));

        DayBoundaryHandle {
            cancel,
            next_deadline,
            firings,
            task,
        }
    }
}

/// Handle to an armed reset task.
pub struct DayBoundaryHandle {
    cancel: CancellationToken,
    next_deadline: Arc<Mutex<Option<DateTime<Local>>>>,
    firings: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

impl DayBoundaryHandle {
    /// Deadline the task is currently sleeping towards.
    pub fn next_deadline(&self) -> Option<DateTime<Local>> {
        *self
            .next_deadline
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of resets performed so far.
    pub fn firings(&self) -> u64 {
        self.firings.load(Ordering::SeqCst)
    }

    /// Requests cancellation without waiting for the task.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancels the task and waits for it to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(err) = self.task.await {
            error!("event=day_boundary_stop module=schedule status=error error={err}");
        }
    }
}

async fn run_reset_loop(
    flags: SharedFlagStore,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
    next_deadline: Arc<Mutex<Option<DateTime<Local>>>>,
    firings: Arc<AtomicU64>,
) {
    let mut last_deadline: Option<DateTime<Local>> = None;

    loop {
        // A wall clock lagging the timer must not re-arm the same midnight.
        let now = match last_deadline {
            Some(previous) => clock.now().max(previous),
            None => clock.now(),
        };
        let deadline = next_midnight(&now);
        let delay = delay_until_next_midnight(&now);
        *next_deadline.lock().unwrap_or_else(PoisonError::into_inner) = Some(deadline);
        info!(
            "event=day_boundary_arm module=schedule status=ok deadline={} delay_ms={}",
            deadline.to_rfc3339(),
            delay.as_millis()
        );

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("event=day_boundary_stop module=schedule status=ok");
                break;
            }
            _ = tokio::time::sleep(delay) => {
                reset_markers(&flags);
                firings.fetch_add(1, Ordering::SeqCst);
                last_deadline = Some(deadline);
            }
        }
    }

    *next_deadline.lock().unwrap_or_else(PoisonError::into_inner) = None;
}

fn reset_markers(flags: &SharedFlagStore) {
    let store = flags.lock().unwrap_or_else(PoisonError::into_inner);
    match store.clear() {
        Ok(()) => info!("event=day_boundary_fire module=schedule status=ok"),
        Err(err) => error!(
            "event=day_boundary_fire module=schedule status=error error_code=marker_clear_failed error={err}"
        ),
    }
}
