//! Per-client performance counter.
//!
//! Every command the executor runs is bracketed by
//! [`PerfCounter::start_count`] and [`PerfCounter::stop_count`]. Aggregates
//! are plain atomics, so one counter can be shared by every task using the
//! client. A [`CountToken`] that is dropped without being stopped (for
//! example because the caller's future was cancelled mid-command) records
//! itself as a failed operation, so no sample is ever lost.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Running totals of operation counts and latency.
#[derive(Debug)]
pub struct PerfCounter {
    total: AtomicU64,
    reads: AtomicU64,
    writes: AtomicU64,
    failures: AtomicU64,
    total_micros: AtomicU64,
    min_micros: AtomicU64,
    max_micros: AtomicU64,
}

impl Default for PerfCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl PerfCounter {
    pub fn new() -> Self {
        Self {
            total: AtomicU64::new(0),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            total_micros: AtomicU64::new(0),
            min_micros: AtomicU64::new(u64::MAX),
            max_micros: AtomicU64::new(0),
        }
    }

    /// Captures the start of one operation.
    pub fn start_count(&self, write: bool) -> CountToken<'_> {
        CountToken {
            counter: self,
            started: Instant::now(),
            write,
            stopped: false,
        }
    }

    /// Folds the elapsed time of `token` into the totals. The sample always
    /// lands on the counter that issued `token`.
    pub fn stop_count(&self, token: CountToken<'_>, ok: bool) -> Duration {
        token.stop(ok)
    }

    fn record(&self, elapsed: Duration, write: bool, ok: bool) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);

        self.total.fetch_add(1, Ordering::Relaxed);
        if write {
            self.writes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.reads.fetch_add(1, Ordering::Relaxed);
        }
        if !ok {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
        self.total_micros.fetch_add(micros, Ordering::Relaxed);
        self.min_micros.fetch_min(micros, Ordering::Relaxed);
        self.max_micros.fetch_max(micros, Ordering::Relaxed);
    }

    /// Copies the current totals. Fields are read one by one, so a snapshot
    /// taken under load may be off by the operations in flight.
    pub fn snapshot(&self) -> PerfSnapshot {
        let min = self.min_micros.load(Ordering::Relaxed);
        PerfSnapshot {
            total: self.total.load(Ordering::Relaxed),
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            total_micros: self.total_micros.load(Ordering::Relaxed),
            min_micros: if min == u64::MAX { 0 } else { min },
            max_micros: self.max_micros.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.total.store(0, Ordering::Relaxed);
        self.reads.store(0, Ordering::Relaxed);
        self.writes.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
        self.total_micros.store(0, Ordering::Relaxed);
        self.min_micros.store(u64::MAX, Ordering::Relaxed);
        self.max_micros.store(0, Ordering::Relaxed);
    }
}

/// An operation in progress. Stop it with [`PerfCounter::stop_count`];
/// dropping it records a failed operation.
#[must_use = "dropping a CountToken records a failed operation"]
pub struct CountToken<'a> {
    counter: &'a PerfCounter,
    started: Instant,
    write: bool,
    stopped: bool,
}

impl CountToken<'_> {
    fn stop(mut self, ok: bool) -> Duration {
        self.stopped = true;
        let elapsed = self.started.elapsed();
        self.counter.record(elapsed, self.write, ok);
        elapsed
    }
}

impl Drop for CountToken<'_> {
    fn drop(&mut self) {
        if !self.stopped {
            self.counter
                .record(self.started.elapsed(), self.write, false);
        }
    }
}

/// Point-in-time copy of a [`PerfCounter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerfSnapshot {
    pub total: u64,
    pub reads: u64,
    pub writes: u64,
    pub failures: u64,
    pub total_micros: u64,
    pub min_micros: u64,
    pub max_micros: u64,
}

impl PerfSnapshot {
    pub fn avg_micros(&self) -> u64 {
        if self.total == 0 {
            0
        } else {
            self.total_micros / self.total
        }
    }
}

impl fmt::Display for PerfSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ops={} (reads={} writes={} failures={}) avg={}us min={}us max={}us",
            self.total,
            self.reads,
            self.writes,
            self.failures,
            self.avg_micros(),
            self.min_micros,
            self.max_micros
        )
    }
}
