// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;

use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, error, info, warn};

use crate::errors::Result;
use crate::notify::{Notification, Notifier};
use crate::shutdown::Shutdown;
use crate::target::Target;

use super::cycle::Watcher;
use super::{notification_for, CycleOutcome};

/// A target plus its single-flight guard.
#[derive(Debug)]
struct Slot {
    target: Target,
    running: Mutex<()>,
}

struct Shared {
    watcher: Watcher,
    notifiers: Vec<Arc<dyn Notifier>>,
    global_ignored: Vec<u16>,
    permits: Semaphore,
    capacity: usize,
    shutdown: Shutdown,
}

/// Counts of what a `--once` run produced.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub no_change: usize,
    pub changed: usize,
    pub new_targets: usize,
    pub failures: usize,
    pub timeouts: usize,
    pub cancelled: usize,
    pub errors: usize,
    /// Ticks skipped because the previous cycle was still running.
    pub skipped: usize,
}

impl RunSummary {
    fn record(&mut self, result: &TickOutcome) {
        match result {
            TickOutcome::Skipped => self.skipped += 1,
            TickOutcome::Failed => self.errors += 1,
            TickOutcome::Done(outcome) => match outcome {
                CycleOutcome::NoChange => self.no_change += 1,
                CycleOutcome::Changed { .. } => self.changed += 1,
                CycleOutcome::NewTarget { .. } => self.new_targets += 1,
                CycleOutcome::RecoverableFailure(_) => self.failures += 1,
                CycleOutcome::TransportTimeout => self.timeouts += 1,
                CycleOutcome::Cancelled => self.cancelled += 1,
            },
        }
    }
}

/// What one scheduled tick of a target did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Done(CycleOutcome),
    /// The cycle returned an error; an `Error` notification was sent.
    Failed,
    /// The target's previous cycle was still running.
    Skipped,
}

/// Schedules cycles and dispatches their outcomes.
pub struct Runtime {
    shared: Arc<Shared>,
    slots: Vec<Arc<Slot>>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("targets", &self.slots.len())
            .field("watcher", &self.shared.watcher)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new(
        watcher: Watcher,
        targets: Vec<Target>,
        notifiers: Vec<Arc<dyn Notifier>>,
        global_ignored: Vec<u16>,
        parallel_checks: usize,
        shutdown: Shutdown,
    ) -> Self {
        let slots = targets
            .into_iter()
            .map(|target| {
                Arc::new(Slot {
                    target,
                    running: Mutex::new(()),
                })
            })
            .collect();
        Self {
            shared: Arc::new(Shared {
                watcher,
                notifiers,
                global_ignored,
                permits: Semaphore::new(parallel_checks.max(1)),
                capacity: parallel_checks.max(1),
                shutdown,
            }),
            slots,
        }
    }

    /// Run every target once, concurrently (bounded by the admission limit),
    /// and wait for all of them.
    pub async fn run_once(&self) -> Result<RunSummary> {
        let mut set = JoinSet::new();
        for slot in self.slots.iter() {
            let shared = self.shared.clone();
            let slot = slot.clone();
            set.spawn(async move { run_slot(&shared, &slot).await });
        }

        let mut summary = RunSummary::default();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(result) => summary.record(&result),
                Err(e) => {
                    error!(error = %e, "cycle task panicked");
                    summary.errors += 1;
                }
            }
        }
        info!(?summary, "run finished");
        Ok(summary)
    }

    /// Run a single tick for the target called `name`, exactly as a cron
    /// firing would. `None` if no such target is scheduled.
    pub async fn tick(&self, name: &str) -> Option<TickOutcome> {
        let slot = self.slots.iter().find(|s| s.target.name == name)?;
        Some(run_slot(&self.shared, slot).await)
    }

    /// Register one cron job per target and run until shutdown.
    pub async fn run_scheduled(&self) -> Result<()> {
        let mut sched = JobScheduler::new().await?;

        for slot in self.slots.iter() {
            let shared = self.shared.clone();
            let slot_for_job = slot.clone();
            let job = Job::new_async(slot.target.cron.as_str(), move |_uuid, _l| {
                let shared = shared.clone();
                let slot = slot_for_job.clone();
                Box::pin(async move {
                    run_slot(&shared, &slot).await;
                })
            })?;
            sched.add(job).await?;
            info!(target_name = %slot.target.name, cron = %slot.target.cron, "scheduled");
        }

        sched.start().await?;
        info!(targets = self.slots.len(), "sitewatch runtime started");

        self.shared.shutdown.cancelled().await;
        info!("shutdown requested; stopping scheduler");
        sched.shutdown().await?;

        // Wait for in-flight cycles to observe the signal and finish.
        let all = u32::try_from(self.shared.capacity).unwrap_or(u32::MAX);
        let _ = self.shared.permits.acquire_many(all).await;
        info!("runtime exiting");
        Ok(())
    }
}

async fn run_slot(shared: &Shared, slot: &Slot) -> TickOutcome {
    let target = &slot.target;

    let Ok(_running) = slot.running.try_lock() else {
        warn!(target_name = %target.name, "previous cycle still running, skipping");
        return TickOutcome::Skipped;
    };

    let _permit = tokio::select! {
        _ = shared.shutdown.cancelled() => {
            return TickOutcome::Done(CycleOutcome::Cancelled);
        }
        permit = shared.permits.acquire() => match permit {
            Ok(p) => p,
            Err(_) => return TickOutcome::Done(CycleOutcome::Cancelled),
        },
    };

    debug!(target_name = %target.name, url = %target.url, "cycle started");
    match shared.watcher.run_cycle(target).await {
        Ok(outcome) => {
            info!(target_name = %target.name, outcome = outcome.label(), "cycle finished");
            if let Some(notification) = notification_for(&outcome, target, &shared.global_ignored)
            {
                dispatch(shared, target, &notification).await;
            }
            TickOutcome::Done(outcome)
        }
        Err(err) => {
            error!(target_name = %target.name, error = %err, "cycle failed");
            dispatch(shared, target, &Notification::Error(err.to_string())).await;
            TickOutcome::Failed
        }
    }
}

async fn dispatch(shared: &Shared, target: &Target, notification: &Notification) {
    for notifier in shared.notifiers.iter() {
        if let Err(err) = notifier.notify(target, notification).await {
            error!(
                target_name = %target.name,
                kind = notification.kind(),
                error = %err,
                "notification failed"
            );
        }
    }
}
