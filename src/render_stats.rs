//! Flush statistics for debugging and performance analysis.
//!
//! Enable with the `render-stats` feature:
//! ```bash
//! cargo test --features render-stats
//! ```
//!
//! Totals are logged at `info` level about once per second, showing:
//! - Flush counts (with work vs empty)
//! - Mounted and unmounted views
//! - Renders performed and skipped
//! - Layout passes and surface lease failures

use crate::render_manager::FlushStats;

/// Snapshot of accumulated flush statistics.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub flushes: u64,
    pub flushes_empty: u64,
    pub views_mounted: u64,
    pub views_unmounted: u64,
    pub renders: u64,
    pub renders_skipped: u64,
    pub layouts: u64,
    pub lease_failures: u64,
}

#[cfg(feature = "render-stats")]
mod inner {
    use super::StatsSnapshot;
    use crate::render_manager::FlushStats;
    use std::cell::RefCell;
    use std::time::Instant;

    thread_local! {
        static STATS: RefCell<RenderStats> = RefCell::new(RenderStats::new());
    }

    struct RenderStats {
        totals: StatsSnapshot,
        last_print: Instant,
    }

    impl RenderStats {
        fn new() -> Self {
            Self {
                totals: StatsSnapshot::default(),
                last_print: Instant::now(),
            }
        }

        fn reset(&mut self) {
            self.totals = StatsSnapshot::default();
            self.last_print = Instant::now();
        }
    }

    /// Record a surface the device refused to lease.
    #[inline]
    pub fn record_lease_failure() {
        STATS.with(|s| {
            s.borrow_mut().totals.lease_failures += 1;
        });
    }

    /// Return a snapshot of the current stats (for testing).
    pub fn get_stats() -> StatsSnapshot {
        STATS.with(|s| s.borrow().totals.clone())
    }

    /// Reset all stats to zero (for test isolation).
    pub fn reset_stats() {
        STATS.with(|s| {
            s.borrow_mut().reset();
        });
    }

    /// Called at the end of each flush to accumulate and potentially log.
    pub fn end_flush(flush: &FlushStats) {
        STATS.with(|s| {
            let mut stats = s.borrow_mut();
            let totals = &mut stats.totals;

            totals.flushes += 1;
            if flush.is_empty() {
                totals.flushes_empty += 1;
            }
            totals.views_mounted += flush.mounted as u64;
            totals.views_unmounted += flush.unmounted as u64;
            totals.renders += flush.rendered as u64;
            totals.renders_skipped += flush.skipped_renders as u64;
            totals.layouts += flush.laid_out as u64;

            if stats.last_print.elapsed().as_secs() >= 1 {
                let t = &stats.totals;
                log::info!(
                    "[Render Stats] flushes={} empty={} mounted={} unmounted={}",
                    t.flushes,
                    t.flushes_empty,
                    t.views_mounted,
                    t.views_unmounted
                );
                log::info!(
                    "  render: performed={} skipped={} layouts={} lease_failures={}",
                    t.renders,
                    t.renders_skipped,
                    t.layouts,
                    t.lease_failures
                );
                stats.reset();
            }
        });
    }
}

#[cfg(feature = "render-stats")]
pub use inner::*;

// No-op implementations when feature is disabled - these get completely inlined away

#[cfg(not(feature = "render-stats"))]
#[inline(always)]
pub fn get_stats() -> StatsSnapshot {
    StatsSnapshot::default()
}

#[cfg(not(feature = "render-stats"))]
#[inline(always)]
pub fn reset_stats() {}

#[cfg(not(feature = "render-stats"))]
#[inline(always)]
pub fn record_lease_failure() {}

#[cfg(not(feature = "render-stats"))]
#[inline(always)]
pub fn end_flush(_flush: &FlushStats) {}
