use std::panic::{self, AssertUnwindSafe};
use std::thread;

use tracing::warn;

use crate::job::{AnalyticsJob, GroupFailure};

/// Outcome of one job: its output, or a tagged failure naming the group.
pub type GroupOutcome<J> = Result<<J as AnalyticsJob>::Output, GroupFailure>;

/// Executor for per-group jobs.
///
/// Implementations must return outcomes in the same order as the input jobs,
/// whatever order they actually ran in.
pub trait GroupScheduler: Send + Sync {
    fn run_all<J: AnalyticsJob>(&self, jobs: Vec<J>) -> Vec<GroupOutcome<J>>;
}

/// Run one job, turning both errors and panics into a [`GroupFailure`].
pub fn run_isolated<J: AnalyticsJob>(job: &J) -> GroupOutcome<J> {
    match panic::catch_unwind(AssertUnwindSafe(|| job.run())) {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(GroupFailure::new(job.key().clone(), e.to_string())),
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic payload".to_string());
            Err(GroupFailure::panicked(job.key().clone(), reason))
        }
    }
}

/// Runs jobs one after another on the calling thread.
#[derive(Debug, Copy, Clone, Default)]
pub struct LocalScheduler;

impl GroupScheduler for LocalScheduler {
    fn run_all<J: AnalyticsJob>(&self, jobs: Vec<J>) -> Vec<GroupOutcome<J>> {
        jobs.iter().map(run_isolated).collect()
    }
}

/// Spreads jobs over a fixed number of scoped worker threads.
#[derive(Debug, Copy, Clone)]
pub struct ThreadedScheduler {
    workers: usize,
}

impl ThreadedScheduler {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl GroupScheduler for ThreadedScheduler {
    fn run_all<J: AnalyticsJob>(&self, jobs: Vec<J>) -> Vec<GroupOutcome<J>> {
        if self.workers == 1 || jobs.len() < 2 {
            return LocalScheduler.run_all(jobs);
        }

        let workers = self.workers.min(jobs.len());
        let jobs = &jobs;
        let mut indexed: Vec<(usize, GroupOutcome<J>)> = thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|w| {
                    scope.spawn(move || {
                        (w..jobs.len())
                            .step_by(workers)
                            .map(|i| (i, run_isolated(&jobs[i])))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            let mut out = Vec::with_capacity(jobs.len());
            for (w, handle) in handles.into_iter().enumerate() {
                match handle.join() {
                    Ok(results) => out.extend(results),
                    // run_isolated catches job panics; reaching here means the worker itself died.
                    Err(_) => {
                        warn!(worker = w, "group worker thread died; its groups are marked failed");
                        out.extend((w..jobs.len()).step_by(workers).map(|i| {
                            (i, Err(GroupFailure::panicked(jobs[i].key().clone(), "worker thread died")))
                        }));
                    }
                }
            }
            out
        });

        indexed.sort_by_key(|(i, _)| *i);
        indexed.into_iter().map(|(_, outcome)| outcome).collect()
    }
}
