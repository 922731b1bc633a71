//! Runtime-to-GC-threads interface.
//!
//! The runtime uses this module to create the GC thread pool, to start the threads, and, as the
//! phase initiator, to hand work to them.  The thread entry points are here too, for runtimes
//! that spawn GC threads themselves (see `GcBinding::spawn_gc_thread`).

use std::sync::Arc;

use crate::gc_threads::GcThreads;
use crate::scheduler::{MarkingGuard, ThreadArgs};
use crate::util::options::Options;
use crate::util::ThreadIndex;
use crate::vm::GcBinding;

/// Create the GC thread pool.  No thread is started until `initialize_collection` is called.
///
/// This function attempts to initialize a logger.  If the runtime would like to use its own
/// logger, it should initialize it before calling this function.
///
/// Arguments:
/// * `binding`: The runtime's implementation of the work routines.
/// * `options`: Thread counts and thread attributes.  `Options::default()` reads them from
///   `GC_`-prefixed environment variables.
pub fn gc_init<B: GcBinding>(binding: B, options: Options) -> Arc<GcThreads<B>> {
    match crate::util::logger::try_init() {
        Ok(_) => debug!("gc-threads initialized the logger."),
        Err(_) => debug!(
            "gc-threads failed to initialize the logger. Possibly a logger has been initialized by user."
        ),
    }
    info!(
        "Creating GC thread pool: {} parallel, {} concurrent",
        options.threads.parallel, options.threads.concurrent
    );
    GcThreads::new(binding, options)
}

/// Spawn all GC threads and wait until every one of them has passed the startup barrier.
/// The runtime should call this once its thread system is ready.
///
/// Arguments:
/// * `gc`: The pool created by `gc_init`.
pub fn initialize_collection<B: GcBinding>(gc: &Arc<GcThreads<B>>) {
    gc.initialize_collection();
}

/// Entry point of a parallel GC thread.  A thread spawned with `GcThreadContext::Parallel` shall
/// call this with the arguments it was given.  It does not return until `shutdown` is called.
pub fn start_parallel_worker<B: GcBinding>(args: Box<ThreadArgs<B>>) {
    crate::scheduler::start_parallel_worker(args)
}

/// Entry point of a concurrent GC thread.  A thread spawned with `GcThreadContext::Concurrent`
/// shall call this with the arguments it was given.  It does not return until `shutdown` is called.
pub fn start_concurrent_worker<B: GcBinding>(args: Box<ThreadArgs<B>>) {
    crate::scheduler::start_concurrent_worker(args)
}

/// Make marking available to parallel workers until the returned guard is dropped.
pub fn begin_marking<B: GcBinding>(gc: &GcThreads<B>) -> MarkingGuard {
    gc.begin_marking()
}

/// Request one sweep pass from parallel worker `tid`.
pub fn request_sweep<B: GcBinding>(gc: &GcThreads<B>, tid: ThreadIndex) -> usize {
    gc.request_sweep(tid)
}

/// Request one sweep pass from every parallel worker.
pub fn request_sweep_all<B: GcBinding>(gc: &GcThreads<B>) -> usize {
    gc.request_sweep_all()
}

/// Post `n` permits for concurrent page reclamation.
pub fn post_sweep_assists<B: GcBinding>(gc: &GcThreads<B>, n: usize) {
    gc.post_sweep_assists(n)
}

/// Stop all GC threads and wait for them to exit.  For process exit and test teardown.
pub fn shutdown<B: GcBinding>(gc: &GcThreads<B>) {
    gc.shutdown()
}
