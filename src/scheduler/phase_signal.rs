//! The phase signal wakes parallel GC workers when there is marking or sweeping to do.
//!
//! It consists of
//!
//! -   a counter of threads currently marking.  Marking is available while it is positive.
//! -   a mutex and a condition variable.  Parallel workers block on the condition variable while
//!     neither marking is available nor a sweep is requested for them.
//!
//! Sweep requests live in each worker's `CollectorTls`, not here.  The predicate a worker waits
//! on therefore depends on the worker, and every notification wakes all workers so that each one
//! can re-check its own predicate.

use crossbeam::utils::CachePadded;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use super::sweep_request::SweepRequests;
use super::worker::WorkerShouldExit;
use crate::util::ThreadIndex;

pub struct PhaseSignal {
    /// The synchronized part.
    sync: Mutex<PhaseSignalSync>,
    /// Parallel workers wait on this when idle.  Notified when marking starts, when a sweep is
    /// requested, and on shutdown.
    work_available: Condvar,
    /// Number of threads currently marking, including the initiator that started the phase.
    threads_marking: CachePadded<AtomicUsize>,
}

/// The synchronized part of `PhaseSignal`.
#[derive(Default)]
struct PhaseSignalSync {
    /// Set once.  Workers leave their loop when they observe it.
    shutdown: bool,
    /// Workers currently inside `wait_for_work`.
    parked_workers: usize,
}

/// Keeps marking available while alive.
///
/// The marking counter is only decremented by dropping a guard, so it can never go below the
/// number of guards alive.
#[must_use = "marking ends as soon as the guard is dropped"]
pub struct MarkingGuard {
    signal: Arc<PhaseSignal>,
}

impl Drop for MarkingGuard {
    fn drop(&mut self) {
        let old = self.signal.threads_marking.fetch_sub(1, Ordering::Release);
        debug_assert!(old > 0, "Marking counter underflow");
        trace!("Marking guard dropped.  Threads marking: {}", old - 1);
    }
}

impl PhaseSignal {
    pub fn new() -> Self {
        Self {
            sync: Mutex::new(PhaseSignalSync::default()),
            work_available: Condvar::new(),
            threads_marking: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    /// Start (or join) a marking phase and wake all parallel workers.
    pub fn begin_marking(self: &Arc<Self>) -> MarkingGuard {
        let guard = self.join_marking();
        self.notify_all();
        guard
    }

    /// Register the current thread as marking without waking anyone.  For mark routines that
    /// count themselves while a phase is already running.
    pub fn join_marking(self: &Arc<Self>) -> MarkingGuard {
        let old = self.threads_marking.fetch_add(1, Ordering::Release);
        trace!("Joined marking.  Threads marking: {}", old + 1);
        MarkingGuard {
            signal: self.clone(),
        }
    }

    /// Is marking available?
    pub fn has_mark_work(&self) -> bool {
        self.threads_marking() > 0
    }

    pub fn threads_marking(&self) -> usize {
        self.threads_marking.load(Ordering::Acquire)
    }

    /// Number of workers currently inside `wait_for_work`.
    pub fn parked_workers(&self) -> usize {
        self.sync.lock().unwrap().parked_workers
    }

    /// Wake every parallel worker so that it re-checks its predicate.
    ///
    /// The state a worker waits on is changed without holding the mutex, so the mutex must be
    /// acquired before notifying.  Otherwise a worker that has just evaluated its predicate to
    /// false, but has not started waiting yet, would miss this notification.
    pub fn notify_all(&self) {
        let _guard = self.sync.lock().unwrap();
        self.work_available.notify_all();
    }

    /// Run `f` while holding the mutex, so that no worker re-checks its predicate until `f` has
    /// returned.  `f` must not notify.
    #[cfg(test)]
    pub(crate) fn with_workers_held<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.sync.lock().unwrap();
        f()
    }

    /// Block until marking is available or a sweep is requested through `sweeps`.
    ///
    /// Returns `Ok(())` if the worker has something to do, or `Err(WorkerShouldExit)` if shutdown
    /// has been requested.
    pub(crate) fn wait_for_work(
        &self,
        ordinal: ThreadIndex,
        sweeps: &SweepRequests,
    ) -> Result<(), WorkerShouldExit> {
        let mut sync = self.sync.lock().unwrap();
        sync.parked_workers += 1;
        trace!(
            "Worker {} parked.  Parked workers: {}",
            ordinal,
            sync.parked_workers
        );

        // Spurious wake-ups are fine.  The predicate is checked again after every wake-up.
        while !sync.shutdown && !self.has_mark_work() && !sweeps.is_requested() {
            sync = self.work_available.wait(sync).unwrap();
        }

        sync.parked_workers -= 1;
        trace!(
            "Worker {} unparked.  Parked workers: {}",
            ordinal,
            sync.parked_workers
        );

        if sync.shutdown {
            return Err(WorkerShouldExit);
        }
        Ok(())
    }

    /// Ask all parallel workers to leave their loop.
    pub(crate) fn request_shutdown(&self) {
        let mut sync = self.sync.lock().unwrap();
        sync.shutdown = true;
        self.work_available.notify_all();
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.sync.lock().unwrap().shutdown
    }
}

impl Default for PhaseSignal {
    fn default() -> Self {
        Self::new()
    }
}
