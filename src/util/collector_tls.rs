//! Per-thread collector state.
//!
//! Every GC thread owns one `CollectorTls` for its entire lifetime.  The phase initiator reaches
//! into it through the thread group to request sweeps, and the runtime reads the GC state of each
//! thread for introspection.

use atomic::{Atomic, Ordering};
use bytemuck::NoUninit;

use crate::scheduler::stat::WorkerStat;
use crate::scheduler::SweepRequests;

/// The index of a GC thread.  Indices are dense: parallel workers take `0..P` and concurrent
/// workers take `P..P+C`.
pub type ThreadIndex = usize;

/// What a GC thread is currently doing, as reported to the runtime.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, NoUninit, strum_macros::Display, strum_macros::IntoStaticStr)]
pub enum GcState {
    /// The thread has not finished registering, or has exited its worker loop.
    Running,
    /// Blocked on the phase signal or on the sweep-assist semaphore.
    Waiting,
    /// Inside the parallel mark routine.
    Marking,
    /// Inside the parallel sweep routine or the page-reclamation routine.
    Sweeping,
}

/// The two kinds of GC threads.
#[derive(Copy, Clone, Debug, PartialEq, Eq, strum_macros::Display, strum_macros::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum WorkerKind {
    /// Woken by the phase signal.  Services marking and per-thread sweep requests.
    Parallel,
    /// Woken by sweep-assist permits.  Runs one page-reclamation pass per permit.
    Concurrent,
}

/// Thread-local collector state.
pub struct CollectorTls {
    tid: ThreadIndex,
    kind: WorkerKind,
    gc_state: Atomic<GcState>,
    sweeps_requested: SweepRequests,
    pub(crate) stat: WorkerStat,
}

static_assertions::assert_impl_all!(CollectorTls: Send, Sync);

impl CollectorTls {
    pub fn new(tid: ThreadIndex, kind: WorkerKind) -> Self {
        Self {
            tid,
            kind,
            gc_state: Atomic::new(GcState::Running),
            sweeps_requested: SweepRequests::new(),
            stat: WorkerStat::default(),
        }
    }

    pub fn tid(&self) -> ThreadIndex {
        self.tid
    }

    pub fn kind(&self) -> WorkerKind {
        self.kind
    }

    pub fn gc_state(&self) -> GcState {
        self.gc_state.load(Ordering::Acquire)
    }

    /// Record the current activity of this thread.  Returns the previous state.
    pub fn set_gc_state(&self, state: GcState) -> GcState {
        self.gc_state.swap(state, Ordering::AcqRel)
    }

    /// Outstanding sweep requests for this thread.  Only meaningful for parallel workers.
    pub fn sweeps_requested(&self) -> &SweepRequests {
        &self.sweeps_requested
    }

    pub fn stat(&self) -> &WorkerStat {
        &self.stat
    }
}

impl std::fmt::Debug for CollectorTls {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorTls")
            .field("tid", &self.tid)
            .field("kind", &self.kind)
            .field("gc_state", &self.gc_state())
            .field("sweeps_requested", &self.sweeps_requested.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_tls_is_running_with_no_requests() {
        let tls = CollectorTls::new(3, WorkerKind::Parallel);
        assert_eq!(tls.tid(), 3);
        assert_eq!(tls.kind(), WorkerKind::Parallel);
        assert_eq!(tls.gc_state(), GcState::Running);
        assert!(!tls.sweeps_requested().is_requested());
    }

    #[test]
    fn set_gc_state_returns_previous() {
        let tls = CollectorTls::new(0, WorkerKind::Concurrent);
        assert_eq!(tls.set_gc_state(GcState::Waiting), GcState::Running);
        assert_eq!(tls.set_gc_state(GcState::Sweeping), GcState::Waiting);
        assert_eq!(tls.gc_state(), GcState::Sweeping);
    }

    #[test]
    fn state_names() {
        assert_eq!(GcState::Waiting.to_string(), "Waiting");
        let kind: &'static str = WorkerKind::Concurrent.into();
        assert_eq!(kind, "concurrent");
    }
}
