use crate::backend::Backend;
use crate::config::AutotuneConfig;
use std::time::Duration;

/// Times repeated launches of one kernel on the backend's queue.
///
/// Every launch really runs, so any buffer the kernel writes is modified.
/// Callers own snapshot/restore of those buffers.
#[derive(Debug, Clone, Copy)]
pub struct Benchmarker {
    warmup_runs: usize,
    bench_runs: usize,
}

impl Benchmarker {
    pub fn new(warmup_runs: usize, bench_runs: usize) -> Self {
        Self {
            warmup_runs,
            bench_runs: bench_runs.max(1),
        }
    }

    pub fn from_config(config: &AutotuneConfig) -> Self {
        Self::new(config.warmup_runs, config.timed_runs())
    }

    /// Mean elapsed time of one launch.
    pub fn measure<B, F>(&self, backend: &B, mut launch: F) -> Result<Duration, B::Error>
    where
        B: Backend,
        F: FnMut(&B::Queue) -> Result<(), B::Error>,
    {
        let queue = backend.queue();
        for _ in 0..self.warmup_runs {
            launch(queue)?;
        }

        let start = backend.timestamp();
        for _ in 0..self.bench_runs {
            launch(queue)?;
        }
        let elapsed = backend.timestamp().saturating_sub(start);

        Ok(mean(elapsed, self.bench_runs))
    }
}

fn mean(total: Duration, runs: usize) -> Duration {
    let nanos = total.as_nanos() / runs.max(1) as u128;
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}
