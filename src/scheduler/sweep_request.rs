use crossbeam::utils::CachePadded;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Outstanding sweep requests for one parallel worker.
///
/// Any thread may add requests.  Only the owning worker retires them, one at a time, and only
/// after the sweep pass for that request has completed.  Since the owner only retires a request it
/// has already observed, the counter never drops below zero.
pub struct SweepRequests {
    count: CachePadded<AtomicUsize>,
}

impl SweepRequests {
    pub fn new() -> Self {
        Self {
            count: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    /// Add one request.  Returns the number of outstanding requests after this one.
    ///
    /// This does not wake the worker.  Use the phase signal for that, or go through
    /// `GcThreads::request_sweep`.
    pub fn request(&self) -> usize {
        let old = self.count.fetch_add(1, Ordering::Release);
        debug_assert!(old != usize::MAX);
        old + 1
    }

    pub fn pending(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    pub fn is_requested(&self) -> bool {
        self.pending() > 0
    }

    /// Retire one request after its sweep pass finished.  Called by the owning worker only.
    pub(crate) fn complete_one(&self) {
        let old = self.count.fetch_sub(1, Ordering::Release);
        debug_assert!(old > 0, "Sweep request retired without a matching request");
    }
}

impl Default for SweepRequests {
    fn default() -> Self {
        Self::new()
    }
}
