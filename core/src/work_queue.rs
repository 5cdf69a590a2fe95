//! Fixed-size worker pool over one FIFO task queue, with a pending-work
//! counter so callers can wait for every submitted task (including tasks
//! submitted by other tasks) to complete.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::Dispatch;

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct Jobs {
    queue: VecDeque<Job>,
    shutdown: bool,
}

#[derive(Default)]
struct Inner {
    jobs: Mutex<Jobs>,
    available: Condvar,
    pending: Mutex<usize>,
    drained: Condvar,
}

impl Inner {
    fn execute(&self, job: Job) {
        let mut jobs = self.jobs.lock();
        if jobs.shutdown {
            tracing::warn!("work queue is shut down, dropping task");
            return;
        }
        *self.pending.lock() += 1;
        jobs.queue.push_back(job);
        self.available.notify_one();
    }

    fn finish(&self) {
        let mut pending = self.pending.lock();
        while *pending > 0 {
            self.drained.wait(&mut pending);
            tracing::debug!(pending = *pending, "woke up waiting for work");
        }
    }

    fn complete(&self, jobs: usize) {
        let mut pending = self.pending.lock();
        debug_assert!(*pending >= jobs);
        *pending -= jobs;
        if *pending == 0 {
            self.drained.notify_all();
        }
    }

    fn next(&self) -> Option<Job> {
        let mut jobs = self.jobs.lock();
        while jobs.queue.is_empty() && !jobs.shutdown {
            self.available.wait(&mut jobs);
        }
        if jobs.shutdown {
            None
        } else {
            jobs.queue.pop_front()
        }
    }

    fn run(&self) {
        while let Some(job) = self.next() {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(%message, "work queue task panicked");
            }
            self.complete(1);
        }
    }
}

/// A cloneable handle that can submit work to a [`WorkQueue`] and wait on it,
/// without owning the worker threads. Tasks that fan out further tasks
/// capture one of these.
#[derive(Clone)]
pub struct Submitter {
    inner: Arc<Inner>,
}

impl Submitter {
    /// Queues `task`. Never blocks on the task itself.
    pub fn execute<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.execute(Box::new(task));
    }

    /// Blocks until every submitted task has completed.
    pub fn finish(&self) {
        self.inner.finish();
    }

    pub fn pending(&self) -> usize {
        *self.inner.pending.lock()
    }
}

/// Pool of worker threads consuming a shared FIFO queue.
///
/// Dropping the queue shuts it down and joins the workers.
pub struct WorkQueue {
    inner: Arc<Inner>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkQueue {
    /// Starts `threads` workers that log through the caller's current
    /// `tracing` dispatcher.
    pub fn new(threads: NonZeroUsize) -> Self {
        let dispatch = tracing::dispatcher::get_default(Dispatch::clone);
        Self::with_dispatch(threads, dispatch)
    }

    /// Starts `threads` workers that log through `dispatch`.
    pub fn with_dispatch(threads: NonZeroUsize, dispatch: Dispatch) -> Self {
        let inner = Arc::new(Inner::default());
        let workers = (0..threads.get())
            .map(|id| {
                let inner = Arc::clone(&inner);
                let dispatch = dispatch.clone();
                thread::Builder::new()
                    .name(format!("worker-{id}"))
                    .spawn(move || {
                        let _logging = tracing::dispatcher::set_default(&dispatch);
                        inner.run();
                    })
                    .expect("failed to spawn work queue thread")
            })
            .collect();
        Self { inner, workers }
    }

    pub fn execute<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.execute(Box::new(task));
    }

    /// Waits for all pending work. Workers keep running and the queue stays
    /// usable afterwards.
    pub fn finish(&self) {
        self.inner.finish();
    }

    /// Stops the workers. Queued tasks that have not started are discarded
    /// (and no longer count as pending); running tasks complete.
    pub fn shutdown(&self) {
        let abandoned = {
            let mut jobs = self.inner.jobs.lock();
            jobs.shutdown = true;
            let abandoned = jobs.queue.len();
            jobs.queue.clear();
            self.inner.available.notify_all();
            abandoned
        };
        if abandoned > 0 {
            tracing::debug!(abandoned, "discarded queued work on shutdown");
            self.inner.complete(abandoned);
        }
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn pending(&self) -> usize {
        *self.inner.pending.lock()
    }

    pub fn submitter(&self) -> Submitter {
        Submitter { inner: Arc::clone(&self.inner) }
    }

    /// Waits for pending work, then shuts down and joins the workers.
    pub fn join(mut self) {
        tracing::debug!("waiting for work");
        self.finish();
        self.stop();
        tracing::debug!("work finished");
    }

    fn stop(&mut self) {
        self.shutdown();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::error!("work queue thread exited abnormally");
            }
        }
    }
}

impl Drop for WorkQueue {
    fn drop(&mut self) {
        self.stop();
    }
}
