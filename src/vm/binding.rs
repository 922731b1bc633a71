use std::sync::Arc;

use crate::scheduler::{
    start_concurrent_worker, start_parallel_worker, ThreadArgs, TlsInitError, WorkerContext,
};
use crate::util::{CollectorTls, GcState, ThreadIndex, WorkerKind};

/// Thread context for a GC thread to spawn.  It is passed to `GcBinding::spawn_gc_thread`.
pub enum GcThreadContext<B: GcBinding> {
    /// The thread shall call `memory_manager::start_parallel_worker`.
    Parallel(Box<ThreadArgs<B>>),
    /// The thread shall call `memory_manager::start_concurrent_worker`.
    Concurrent(Box<ThreadArgs<B>>),
}

impl<B: GcBinding> GcThreadContext<B> {
    pub fn kind(&self) -> WorkerKind {
        match self {
            GcThreadContext::Parallel(_) => WorkerKind::Parallel,
            GcThreadContext::Concurrent(_) => WorkerKind::Concurrent,
        }
    }

    pub fn args(&self) -> &ThreadArgs<B> {
        match self {
            GcThreadContext::Parallel(args) | GcThreadContext::Concurrent(args) => args,
        }
    }

    /// The OS thread name, e.g. `gc-parallel-0`.
    pub fn thread_name(&self) -> String {
        format!(
            "{}-{}-{}",
            self.args().gc().options().thread_name_prefix,
            self.kind(),
            self.args().tid
        )
    }

    /// Run the entry point for this context on the current thread.  Returns on shutdown.
    pub fn run(self) {
        match self {
            GcThreadContext::Parallel(args) => start_parallel_worker(args),
            GcThreadContext::Concurrent(args) => start_concurrent_worker(args),
        }
    }
}

/// The runtime side of the GC thread pool.
///
/// The three work routines are called from several GC threads at the same time, and
/// `free_pages` also runs while mutators run and while parallel workers sweep.  They must do
/// their own synchronization.
pub trait GcBinding
where
    Self: Sized + Send + Sync + 'static,
{
    /// Run the parallel mark routine once.  Return when no more mark work is available to the
    /// calling thread, which is not necessarily when marking has finished globally.
    fn mark_parallel(&self, ctx: &WorkerContext);

    /// Run one bounded pass of the parallel sweep routine.
    fn sweep_pool_parallel(&self, ctx: &WorkerContext);

    /// Run one pass of the concurrent page-reclamation routine, releasing fully free pages.
    fn free_pages(&self, ctx: &WorkerContext);

    /// Allocate the thread-local collector state of GC thread `tid`.  Called on that thread
    /// before the startup barrier.  An error is fatal.
    fn init_thread_tls(
        &self,
        tid: ThreadIndex,
        kind: WorkerKind,
    ) -> Result<Arc<CollectorTls>, TlsInitError> {
        Ok(Arc::new(CollectorTls::new(tid, kind)))
    }

    /// Record the current activity of a GC thread.  Runtimes that track thread states for
    /// safepoints or introspection hook in here.
    fn set_gc_state(&self, tls: &CollectorTls, state: GcState) {
        tls.set_gc_state(state);
    }

    /// Spawn a GC thread.  The default spawns a named OS thread that runs the context.  If the
    /// thread cannot be created, it reports `TlsInitError::SpawnFailed` through `fatal_error`.
    ///
    /// Runtimes that need to know about every OS thread override this and call
    /// `GcThreadContext::run` from a thread of their own.
    fn spawn_gc_thread(&self, ctx: GcThreadContext<Self>) {
        let mut builder = std::thread::Builder::new().name(ctx.thread_name());
        let stack_size = ctx.args().gc().options().stack_size;
        if stack_size != 0 {
            builder = builder.stack_size(stack_size);
        }
        let tid = ctx.args().tid;
        if let Err(e) = builder.spawn(move || ctx.run()) {
            // Threads spawned so far would wait at the startup barrier forever.
            self.fatal_error(
                tid,
                TlsInitError::SpawnFailed {
                    tid,
                    reason: e.to_string(),
                },
            )
        }
    }

    /// Called when GC thread `tid` cannot start or cannot install its state.  The collector cannot
    /// run with fewer threads than configured, so the default aborts the process.
    fn fatal_error(&self, tid: ThreadIndex, err: TlsInitError) -> ! {
        error!("Fatal error in GC thread {}: {}", tid, err);
        std::process::abort()
    }
}
