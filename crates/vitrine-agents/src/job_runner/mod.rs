// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Background job runner.
//!
//! One crossbeam channel per job kind, drained by a pool of OS threads sized
//! per kind. A failing job whose error is transient is submitted again as a
//! fresh job after an exponential backoff, until its attempts run out.
//! A handler that panics fails its job and leaves the worker running.

mod job;

pub use job::{Job, JobKind, JobOptions, JobPayload};

use crate::error::PipelineError;
use crossbeam_channel::{Receiver, Sender};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

/// Work done for one kind of job. Receives the job with its attempt number.
pub type JobHandler = Arc<dyn Fn(&Job) -> Result<(), PipelineError> + Send + Sync>;

/// When and how often failed jobs are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per job, the first one included.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Whether attempt `attempt` (1-based) failing with `error` is retried.
    pub fn will_retry(&self, error: &PipelineError, attempt: u32) -> bool {
        error.is_transient() && attempt < self.max_attempts
    }

    /// Delay before attempt `attempt + 1`: `base × 2^(attempt - 1)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(1u32 << attempt.saturating_sub(1).min(16))
    }
}

/// Snapshot of the runner's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunnerStats {
    /// Jobs queued or waiting for a retry.
    pub waiting: usize,
    /// Jobs currently running.
    pub active: usize,
    /// Jobs that succeeded.
    pub completed: usize,
    /// Jobs that failed for good.
    pub failed: usize,
}

#[derive(Debug, Default)]
struct Counters {
    waiting: AtomicUsize,
    active: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
}

/// Sending side of one kind's queue. Emptied on shutdown, which disconnects
/// the channel once the workers have drained it.
#[derive(Debug, Default)]
struct Queue {
    tx: Mutex<Option<Sender<Job>>>,
}

impl Queue {
    fn send(&self, job: Job) -> Result<(), Job> {
        match lock(&self.tx).as_ref() {
            Some(tx) => tx.send(job).map_err(|e| e.into_inner()),
            None => Err(job),
        }
    }

    fn close(&self) {
        lock(&self.tx).take();
    }
}

/// Runs jobs on per-kind worker pools.
pub struct JobRunner {
    policy: RetryPolicy,
    queues: Mutex<HashMap<JobKind, Arc<Queue>>>,
    workers: Mutex<Vec<thread::JoinHandle<()>>>,
    counters: Arc<Counters>,
    next_id: AtomicU32,
}

impl std::fmt::Debug for JobRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRunner")
            .field("policy", &self.policy)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl JobRunner {
    /// Creates a runner with no registered kinds.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            queues: Mutex::new(HashMap::new()),
            workers: Mutex::new(Vec::new()),
            counters: Arc::new(Counters::default()),
            next_id: AtomicU32::new(1),
        }
    }

    /// The retry policy applied to failing jobs.
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Registers the handler of `kind` and starts `concurrency` workers for
    /// it. Registering a kind again replaces its queue; the old workers
    /// finish what they hold and exit.
    pub fn register(&self, kind: JobKind, concurrency: usize, handler: JobHandler) {
        let concurrency = concurrency.max(1);
        let (tx, rx) = crossbeam_channel::unbounded();
        let queue = Arc::new(Queue {
            tx: Mutex::new(Some(tx)),
        });
        let mut workers = lock(&self.workers);
        for index in 0..concurrency {
            let worker = Worker {
                kind,
                rx: rx.clone(),
                queue: Arc::clone(&queue),
                handler: Arc::clone(&handler),
                counters: Arc::clone(&self.counters),
                policy: self.policy,
            };
            let spawned = thread::Builder::new()
                .name(format!("vitrine-{}-{}", kind, index))
                .spawn(move || worker.run());
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => log::error!("JobRunner: failed to spawn a {} worker: {}", kind, e),
            }
        }
        if let Some(previous) = lock(&self.queues).insert(kind, queue) {
            previous.close();
        }
        log::info!("JobRunner: {} workers for {} jobs", concurrency, kind);
    }

    /// Queues a job of `kind`.
    pub fn enqueue(&self, kind: JobKind, payload: JobPayload) -> Result<u32, PipelineError> {
        let queue = lock(&self.queues)
            .get(&kind)
            .cloned()
            .ok_or(PipelineError::NoHandler(kind))?;
        let job = Job {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            kind,
            attempt: 1,
            payload,
        };
        let id = job.id;
        self.counters.waiting.fetch_add(1, Ordering::SeqCst);
        if queue.send(job).is_err() {
            self.counters.waiting.fetch_sub(1, Ordering::SeqCst);
            return Err(PipelineError::RunnerStopped);
        }
        log::debug!("JobRunner: queued {} job #{}", kind, id);
        Ok(id)
    }

    /// Current counters.
    pub fn stats(&self) -> RunnerStats {
        RunnerStats {
            waiting: self.counters.waiting.load(Ordering::SeqCst),
            active: self.counters.active.load(Ordering::SeqCst),
            completed: self.counters.completed.load(Ordering::SeqCst),
            failed: self.counters.failed.load(Ordering::SeqCst),
        }
    }

    /// Blocks until no job is waiting or running, or until `timeout`.
    /// Returns whether the runner went idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let stats = self.stats();
            if stats.waiting == 0 && stats.active == 0 {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    /// Stops accepting jobs, lets the workers drain what is already queued
    /// and joins them. Retries still waiting for their backoff are dropped
    /// and counted as failed.
    pub fn shutdown(&self) {
        self.close_queues();
        let workers: Vec<_> = lock(&self.workers).drain(..).collect();
        let current = thread::current().id();
        for handle in workers {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                log::error!("JobRunner: a worker panicked");
            }
        }
        log::info!("JobRunner: stopped");
    }

    fn close_queues(&self) {
        for (_, queue) in lock(&self.queues).drain() {
            queue.close();
        }
    }
}

impl Drop for JobRunner {
    fn drop(&mut self) {
        // Idle workers exit once their queue closes. Joining here could block
        // the worker that drops the last reference.
        self.close_queues();
    }
}

struct Worker {
    kind: JobKind,
    rx: Receiver<Job>,
    queue: Arc<Queue>,
    handler: JobHandler,
    counters: Arc<Counters>,
    policy: RetryPolicy,
}

impl Worker {
    fn run(self) {
        while let Ok(job) = self.rx.recv() {
            self.counters.active.fetch_add(1, Ordering::SeqCst);
            self.counters.waiting.fetch_sub(1, Ordering::SeqCst);
            log::debug!(
                "JobRunner: {} job #{} attempt {}",
                self.kind,
                job.id,
                job.attempt
            );

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| (self.handler)(&job)))
                .unwrap_or_else(|payload| Err(PipelineError::from_panic(payload)));
            match outcome {
                Ok(()) => {
                    self.counters.completed.fetch_add(1, Ordering::SeqCst);
                }
                Err(e) if self.policy.will_retry(&e, job.attempt) => {
                    let delay = self.policy.backoff(job.attempt);
                    log::warn!(
                        "JobRunner: {} job #{} failed ({}), retrying in {:?}",
                        self.kind,
                        job.id,
                        e,
                        delay
                    );
                    self.schedule_retry(job, delay);
                }
                Err(e) => {
                    log::error!("JobRunner: {} job #{} failed: {}", self.kind, job.id, e);
                    self.counters.failed.fetch_add(1, Ordering::SeqCst);
                }
            }
            self.counters.active.fetch_sub(1, Ordering::SeqCst);
        }
        log::debug!("JobRunner: {} worker exiting", self.kind);
    }

    fn schedule_retry(&self, job: Job, delay: Duration) {
        self.counters.waiting.fetch_add(1, Ordering::SeqCst);
        let retry = Job {
            attempt: job.attempt + 1,
            ..job
        };
        let queue = Arc::clone(&self.queue);
        let counters = Arc::clone(&self.counters);
        thread::spawn(move || {
            thread::sleep(delay);
            if let Err(job) = queue.send(retry) {
                log::warn!("JobRunner: runner stopped, dropping retry of job #{}", job.id);
                counters.waiting.fetch_sub(1, Ordering::SeqCst);
                counters.failed.fetch_add(1, Ordering::SeqCst);
            }
        });
    }
}
