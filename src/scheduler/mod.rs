//! Coordination of the GC thread pool.
//!
//! Parallel workers wait on the [`PhaseSignal`] and service marking and per-thread sweep
//! requests.  Concurrent workers wait on the [`SweepAssist`] semaphore and run one page
//! reclamation pass per permit.

mod phase_signal;
pub use phase_signal::{MarkingGuard, PhaseSignal};

mod sweep_assist;
pub use sweep_assist::SweepAssist;

mod sweep_request;
pub use sweep_request::SweepRequests;

pub(crate) mod stat;
pub use stat::{PassKind, WorkerStat};

mod thread_group;
pub(crate) use thread_group::ThreadGroup;
pub use thread_group::TlsInitError;

mod worker;
pub use worker::{
    start_concurrent_worker, start_parallel_worker, ThreadArgs, WorkerContext, WorkerShouldExit,
};
