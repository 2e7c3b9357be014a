use std::sync::atomic::{AtomicU64, Ordering};

/// Counters describing kernel cache activity.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    builds: AtomicU64,
    benchmarked: AtomicU64,
    skipped: AtomicU64,
}

/// Point-in-time copy of [`CacheStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Lookups served by an existing entry.
    pub hits: u64,
    /// Lookups that ran the autotuning loop.
    pub misses: u64,
    /// Autotuning runs that stored an entry.
    pub builds: u64,
    /// Candidates compiled and benchmarked successfully.
    pub benchmarked: u64,
    /// Candidates dropped after a compile or launch failure.
    pub skipped: u64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_build(&self) {
        self.builds.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_benchmarked(&self) {
        self.benchmarked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            builds: self.builds.load(Ordering::Relaxed),
            benchmarked: self.benchmarked.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}
