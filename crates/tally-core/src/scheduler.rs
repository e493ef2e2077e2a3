//! Daily reset scheduler.
//!
//! A two-state machine driven by the wall clock:
//!
//! ```text
//!          now >= next_fire
//!   Idle ---------------------> Firing
//!    ^                            |
//!    |  next_fire = next_after(now)
//!    +----------------------------+
//! ```
//!
//! Firing goes through [`UpdateGateway::reset`], i.e. the same store write
//! path and the same hub publish as client requests. Races with in-flight
//! increments are settled by the store's own serialization order.
//!
//! A failed reset is logged and not retried; the next day's trigger is the
//! retry. The timer sleeps in bounded slices and re-reads the wall clock on
//! every wake, so clock adjustments and host suspends are picked up without
//! drift. A trigger that is noticed more than [`MISFIRE_GRACE_SECS`] late
//! (the host slept through it) is skipped rather than fired retroactively.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::gateway::UpdateGateway;
use crate::schedule::{DailySchedule, ScheduleError};

/// How late a trigger may be noticed and still fire.
pub const MISFIRE_GRACE_SECS: i64 = 900;

/// Longest single sleep before the wall clock is consulted again.
const MAX_SLEEP: Duration = Duration::from_secs(60);

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Waiting for `next_fire`.
    Idle {
        /// The next trigger instant.
        next_fire: DateTime<Utc>,
    },
    /// Executing the reset.
    Firing,
}

/// What a single [`ResetScheduler::step`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The trigger has not been reached yet.
    Waiting,
    /// The reset committed at this store revision.
    Fired {
        /// Revision of the committed reset.
        revision: u64,
    },
    /// The reset was attempted but the store write failed.
    Failed,
    /// The trigger was noticed too late and was skipped.
    Skipped {
        /// How many seconds late the trigger was noticed.
        late_secs: i64,
    },
}

/// Fires [`UpdateGateway::reset`] once per day at a fixed local time.
pub struct ResetScheduler {
    gateway: UpdateGateway,
    schedule: DailySchedule,
    state: SchedulerState,
}

impl ResetScheduler {
    /// Create a scheduler whose first trigger is strictly after `now`.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::OutOfRange`] if no next trigger exists.
    pub fn new(
        gateway: UpdateGateway,
        schedule: DailySchedule,
        now: DateTime<Utc>,
    ) -> Result<Self, ScheduleError> {
        let next_fire = schedule.next_after(now)?;
        Ok(Self {
            gateway,
            schedule,
            state: SchedulerState::Idle { next_fire },
        })
    }

    /// Current state.
    pub const fn state(&self) -> SchedulerState {
        self.state
    }

    /// The next trigger instant, if idle.
    pub const fn next_fire(&self) -> Option<DateTime<Utc>> {
        match self.state {
            SchedulerState::Idle { next_fire } => Some(next_fire),
            SchedulerState::Firing => None,
        }
    }

    /// Advance the state machine to `now`.
    ///
    /// Fires at most once per call, then schedules the next trigger
    /// strictly after `now`.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::OutOfRange`] if no next trigger exists.
    pub async fn step(&mut self, now: DateTime<Utc>) -> Result<StepOutcome, ScheduleError> {
        let SchedulerState::Idle { next_fire } = self.state else {
            return Ok(StepOutcome::Waiting);
        };
        if now < next_fire {
            return Ok(StepOutcome::Waiting);
        }

        let late_secs = now.signed_duration_since(next_fire).num_seconds();
        let outcome = if late_secs > MISFIRE_GRACE_SECS {
            warn!(
                trigger = %next_fire,
                late_secs,
                "Missed scheduled reset, waiting for the next one"
            );
            StepOutcome::Skipped { late_secs }
        } else {
            self.state = SchedulerState::Firing;
            self.fire(next_fire).await
        };

        let next_fire = self.schedule.next_after(now)?;
        self.state = SchedulerState::Idle { next_fire };
        info!(next_fire = %next_fire, "Next counter reset scheduled");
        Ok(outcome)
    }

    async fn fire(&self, trigger: DateTime<Utc>) -> StepOutcome {
        match self.gateway.reset().await {
            Ok(change) => {
                info!(
                    trigger = %trigger,
                    revision = change.revision,
                    "Counter reset to zero"
                );
                StepOutcome::Fired {
                    revision: change.revision,
                }
            }
            Err(e) => {
                error!(
                    trigger = %trigger,
                    error = %e,
                    "Scheduled counter reset failed, retrying at next trigger"
                );
                StepOutcome::Failed
            }
        }
    }

    /// Run until the task is aborted.
    pub async fn run(mut self) {
        info!(
            schedule = %self.schedule,
            next_fire = ?self.next_fire(),
            "Reset scheduler started"
        );

        loop {
            let wait = self
                .next_fire()
                .and_then(|next| next.signed_duration_since(Utc::now()).to_std().ok())
                .unwrap_or(Duration::ZERO)
                .min(MAX_SLEEP);
            tokio::time::sleep(wait).await;

            if let Err(e) = self.step(Utc::now()).await {
                error!(error = %e, "Reset scheduler stopped");
                return;
            }
        }
    }
}

/// Spawn the reset scheduler on a background Tokio task.
///
/// The caller should hold the returned handle and abort it on shutdown.
///
/// # Errors
///
/// Returns [`ScheduleError`] if the first trigger cannot be computed.
pub fn spawn_scheduler(
    gateway: UpdateGateway,
    schedule: DailySchedule,
) -> Result<JoinHandle<()>, ScheduleError> {
    let scheduler = ResetScheduler::new(gateway, schedule, Utc::now())?;
    Ok(tokio::spawn(scheduler.run()))
}
