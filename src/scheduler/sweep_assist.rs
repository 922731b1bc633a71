//! The sweep-assist signal: a counting semaphore handing out "run one reclamation pass" permits to
//! concurrent GC workers.

use std::sync::{Condvar, Mutex};

use super::worker::WorkerShouldExit;
use crate::util::ThreadIndex;

pub struct SweepAssist {
    sync: Mutex<SweepAssistSync>,
    /// Concurrent workers wait on this while there are no permits.
    permit_available: Condvar,
}

#[derive(Default)]
struct SweepAssistSync {
    /// Permits posted but not yet taken.
    permits: usize,
    /// Workers currently inside `wait`.
    waiting_workers: usize,
    shutdown: bool,
}

impl SweepAssist {
    pub fn new() -> Self {
        Self {
            sync: Mutex::new(SweepAssistSync::default()),
            permit_available: Condvar::new(),
        }
    }

    /// Post `n` permits.
    pub fn post(&self, n: usize) {
        if n == 0 {
            return;
        }
        let mut sync = self.sync.lock().unwrap();
        sync.permits += n;
        trace!("Posted {} sweep assist(s).  Available: {}", n, sync.permits);
        if n == 1 {
            self.permit_available.notify_one();
        } else {
            self.permit_available.notify_all();
        }
    }

    /// Block until a permit is available and take it.
    ///
    /// Returns `Err(WorkerShouldExit)` once shutdown has been requested, whether or not permits
    /// are left.
    pub(crate) fn wait(&self, ordinal: ThreadIndex) -> Result<(), WorkerShouldExit> {
        let mut sync = self.sync.lock().unwrap();
        sync.waiting_workers += 1;
        trace!("Worker {} waiting for a sweep assist", ordinal);

        while !sync.shutdown && sync.permits == 0 {
            sync = self.permit_available.wait(sync).unwrap();
        }

        sync.waiting_workers -= 1;
        if sync.shutdown {
            return Err(WorkerShouldExit);
        }
        sync.permits -= 1;
        trace!(
            "Worker {} took a sweep assist.  Remaining: {}",
            ordinal,
            sync.permits
        );
        Ok(())
    }

    /// Take a permit if one is available, without blocking.
    pub fn try_acquire(&self) -> bool {
        let mut sync = self.sync.lock().unwrap();
        if sync.permits > 0 {
            sync.permits -= 1;
            true
        } else {
            false
        }
    }

    pub fn available_permits(&self) -> usize {
        self.sync.lock().unwrap().permits
    }

    pub fn waiting_workers(&self) -> usize {
        self.sync.lock().unwrap().waiting_workers
    }

    pub(crate) fn request_shutdown(&self) {
        let mut sync = self.sync.lock().unwrap();
        sync.shutdown = true;
        self.permit_available.notify_all();
    }
}

impl Default for SweepAssist {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::SweepAssist;
    use crate::util::test_util::{panic_after, wait_until};

    #[test]
    fn permits_are_counted() {
        let assist = SweepAssist::new();
        assert!(!assist.try_acquire());
        assist.post(2);
        assert_eq!(assist.available_permits(), 2);
        assert!(assist.wait(0).is_ok());
        assert!(assist.try_acquire());
        assert!(!assist.try_acquire());
        assist.post(0);
        assert_eq!(assist.available_permits(), 0);
    }

    /// Each posted permit is taken by exactly one waiter.
    #[test]
    fn each_permit_wakes_one_pass() {
        panic_after(5000, || {
            let assist = SweepAssist::new();
            let passes = AtomicUsize::new(0);

            std::thread::scope(|scope| {
                for ordinal in 0..3 {
                    let (assist, passes) = (&assist, &passes);
                    scope.spawn(move || {
                        while assist.wait(ordinal).is_ok() {
                            passes.fetch_add(1, Ordering::SeqCst);
                        }
                    });
                }

                wait_until(|| assist.waiting_workers() == 3);
                assist.post(1);
                assist.post(4);
                wait_until(|| {
                    passes.load(Ordering::SeqCst) == 5 && assist.waiting_workers() == 3
                });
                assert_eq!(assist.available_permits(), 0);
                assist.request_shutdown();
            });

            assert_eq!(passes.load(Ordering::SeqCst), 5);
        });
    }

    #[test]
    fn shutdown_leaves_permits_unconsumed() {
        let assist = SweepAssist::new();
        assist.post(3);
        assist.request_shutdown();
        assert!(assist.wait(0).is_err());
        assert_eq!(assist.available_permits(), 3);
    }
}
