//! Render worker counters for profiling.
//!
//! Lock-free atomics updated by the worker thread and read from anywhere
//! (the server, the shutdown path, tests). Relaxed ordering is enough: the
//! counters are independent and only ever reported, never used for control flow.
//!
//! # Usage
//!
//! ```ignore
//! let stats = handle.stats();
//! info!("{} renders, {} coalesced", stats.renders, stats.coalesced());
//! ```

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

/// Live render counters.
#[derive(Debug, Default)]
pub struct RenderStats {
    /// Display submissions received.
    submissions: AtomicU64,
    /// Render passes that pushed a frame successfully.
    renders: AtomicU64,
    /// Render passes whose device push failed.
    failures: AtomicU64,
    /// Composed frames dropped because newer content or a clear arrived first.
    superseded: AtomicU64,
    /// Device clears requested through the worker.
    clears: AtomicU64,
    /// Duration of the last successful render pass in microseconds.
    last_render_us: AtomicU32,
}

impl RenderStats {
    /// Create zeroed counters.
    pub const fn new() -> Self {
        Self {
            submissions: AtomicU64::new(0),
            renders: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            superseded: AtomicU64::new(0),
            clears: AtomicU64::new(0),
            last_render_us: AtomicU32::new(0),
        }
    }

    #[inline]
    pub(crate) fn inc_submissions(&self) { self.submissions.fetch_add(1, Ordering::Relaxed); }

    #[inline]
    pub(crate) fn inc_failures(&self) { self.failures.fetch_add(1, Ordering::Relaxed); }

    #[inline]
    pub(crate) fn inc_superseded(&self) { self.superseded.fetch_add(1, Ordering::Relaxed); }

    #[inline]
    pub(crate) fn inc_clears(&self) { self.clears.fetch_add(1, Ordering::Relaxed); }

    /// Record a successful render pass and its duration.
    pub(crate) fn record_render(
        &self,
        elapsed: Duration,
    ) {
        self.renders.fetch_add(1, Ordering::Relaxed);
        let micros = u32::try_from(elapsed.as_micros()).unwrap_or(u32::MAX);
        self.last_render_us.store(micros, Ordering::Relaxed);
    }

    /// Copy the counters out.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            submissions: self.submissions.load(Ordering::Relaxed),
            renders: self.renders.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            superseded: self.superseded.load(Ordering::Relaxed),
            clears: self.clears.load(Ordering::Relaxed),
            last_render_us: self.last_render_us.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`RenderStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub submissions: u64,
    pub renders: u64,
    pub failures: u64,
    pub superseded: u64,
    pub clears: u64,
    pub last_render_us: u32,
}

impl StatsSnapshot {
    /// Render passes attempted, successful or not.
    #[inline]
    pub const fn attempts(&self) -> u64 { self.renders + self.failures }

    /// Submissions that were overwritten before any render picked them up.
    #[inline]
    pub const fn coalesced(&self) -> u64 { self.submissions.saturating_sub(self.attempts() + self.superseded) }
}

impl core::fmt::Display for StatsSnapshot {
    fn fmt(
        &self,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        write!(
            f,
            "{} submissions, {} renders, {} failed, {} superseded, {} coalesced, {} clears, last render {}us",
            self.submissions,
            self.renders,
            self.failures,
            self.superseded,
            self.coalesced(),
            self.clears,
            self.last_render_us
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
