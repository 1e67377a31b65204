//! The flush engine: decides when pending sends are drained and waits for them

use std::{
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
    time::Duration,
};

use futures_util::future::join_all;
use tokio::{sync::Notify, time::Instant};

use crate::{
    dispatcher::{MailTask, Settlement},
    internal,
    registry::PendingTasks,
};

/// Result of one call to [`FlushEngine::flush`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was pending.
    Empty,
    /// A non-forced flush was requested while another was draining.
    InProgress,
    /// A snapshot was drained and every task in it settled.
    Drained(FlushReport),
}

impl FlushOutcome {
    pub const fn report(&self) -> Option<&FlushReport> {
        match self {
            Self::Drained(report) => Some(report),
            Self::Empty | Self::InProgress => None,
        }
    }

    /// Number of tasks drained, zero for no-op outcomes.
    pub const fn drained(&self) -> usize {
        match self {
            Self::Drained(report) => report.drained,
            Self::Empty | Self::InProgress => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    pub drained: usize,
    pub delivered: usize,
    pub rejected: usize,
    /// Rejections the relay refused outright, a subset of `rejected`
    pub permanent: usize,
    pub forced: bool,
    pub elapsed: Duration,
}

/// Cumulative counters across every drain of one engine.
#[derive(Debug, Default)]
struct FlushStats {
    flushes: AtomicU64,
    drained: AtomicU64,
    delivered: AtomicU64,
    rejected: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStatsSnapshot {
    pub flushes: u64,
    pub drained: u64,
    pub delivered: u64,
    pub rejected: u64,
}

/// Clears the in-progress mark on every exit path, but only if this flush set it.
struct FlushGuard<'a> {
    flushing: &'a AtomicBool,
    idle: &'a Notify,
    claimed: bool,
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        if self.claimed {
            self.flushing.store(false, Ordering::Release);
            self.idle.notify_waiters();
        }
    }
}

/// Owns the pending task registry and serializes drains of it.
///
/// At most one non-forced flush drains at a time. A forced flush skips that
/// gate, so shutdown can drain even while a regular flush is still waiting
/// on its own snapshot.
#[derive(Debug, Default)]
pub struct FlushEngine {
    pending: PendingTasks,
    flushing: AtomicBool,
    idle: Notify,
    stats: FlushStats,
}

impl FlushEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, task: MailTask) {
        self.pending.append(task);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Whether a flush currently holds the in-progress mark.
    pub fn is_flushing(&self) -> bool {
        self.flushing.load(Ordering::Acquire)
    }

    /// Wait until no flush holds the in-progress mark.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if !self.is_flushing() {
                return;
            }
            notified.await;
        }
    }

    pub fn stats(&self) -> FlushStatsSnapshot {
        FlushStatsSnapshot {
            flushes: self.stats.flushes.load(Ordering::Relaxed),
            drained: self.stats.drained.load(Ordering::Relaxed),
            delivered: self.stats.delivered.load(Ordering::Relaxed),
            rejected: self.stats.rejected.load(Ordering::Relaxed),
        }
    }

    /// Drain the tasks pending right now and wait for all of them to settle.
    ///
    /// Tasks appended while the drain is waiting belong to the next flush.
    /// Rejected sends are logged and counted; they never fail the flush.
    pub async fn flush(&self, force: bool) -> FlushOutcome {
        if self.pending.is_empty() {
            return FlushOutcome::Empty;
        }

        let claimed = self
            .flushing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();

        if !force && !claimed {
            internal!("Flush already in progress, skipping");
            return FlushOutcome::InProgress;
        }

        let _guard = FlushGuard {
            flushing: &self.flushing,
            idle: &self.idle,
            claimed,
        };

        let snapshot = self.pending.snapshot_and_clear();
        if snapshot.is_empty() {
            return FlushOutcome::Empty;
        }

        let started = Instant::now();
        let drained = snapshot.len();
        internal!(level = DEBUG, forced = force, "Flushing {drained} pending notifications");

        let settlements = join_all(snapshot.into_iter().map(MailTask::settle)).await;

        let mut rejected = 0;
        let mut permanent = 0;
        for (id, settlement) in &settlements {
            let Settlement::Rejected(e) = settlement else {
                continue;
            };

            rejected += 1;
            if e.is_permanent() {
                permanent += 1;
                internal!(level = WARN, task = id, error = %e, "Notification rejected permanently");
            } else {
                internal!(level = WARN, task = id, error = %e, "Notification send failed");
            }
        }

        let report = FlushReport {
            drained,
            delivered: drained - rejected,
            rejected,
            permanent,
            forced: force,
            elapsed: started.elapsed(),
        };

        self.stats.flushes.fetch_add(1, Ordering::Relaxed);
        self.stats.drained.fetch_add(drained as u64, Ordering::Relaxed);
        self.stats
            .delivered
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.stats
            .rejected
            .fetch_add(rejected as u64, Ordering::Relaxed);

        internal!(
            level = DEBUG,
            delivered = report.delivered,
            rejected = report.rejected,
            "Flush complete in {:.3}s",
            report.elapsed.as_secs_f64()
        );

        FlushOutcome::Drained(report)
    }
}
