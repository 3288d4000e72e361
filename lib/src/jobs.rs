//! A simple job system: all jobs are added up front, then a fixed set of
//! workers drains them through a shared atomic index. Jobs synchronize any
//! shared output themselves.

use std::sync::atomic::{AtomicUsize, Ordering};

type Job<'env> = Box<dyn Fn() + Send + Sync + 'env>;

pub(crate) struct JobSystem<'env> {
    jobs: Vec<Job<'env>>,
}

impl<'env> JobSystem<'env> {
    pub fn new() -> Self {
        Self { jobs: Vec::new() }
    }

    pub fn add_job<F: Fn() + Send + Sync + 'env>(&mut self, job: F) {
        self.jobs.push(Box::new(job));
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Worker count for a given job count: half the hardware threads, at
    /// least one, never more workers than jobs.
    pub fn default_worker_count(job_count: usize) -> usize {
        (num_cpus::get() / 2).min(job_count).max(1)
    }

    /// Spawns `worker_count` workers, runs every job exactly once and joins.
    /// Completion order is unspecified.
    pub fn run(&self, worker_count: usize) {
        let worker_count = worker_count.min(self.jobs.len()).max(1);
        let next_job = AtomicUsize::new(0);

        crossbeam_utils::thread::scope(|scope| {
            for _ in 0..worker_count {
                scope.spawn(|_| loop {
                    let fetched = next_job.fetch_add(1, Ordering::Relaxed);
                    if fetched >= self.jobs.len() {
                        break;
                    }
                    (self.jobs[fetched])();
                });
            }
        })
        .unwrap();
    }
}
