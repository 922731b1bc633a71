use std::sync::{Arc, Barrier};

use super::phase_signal::PhaseSignal;
use super::stat::PassKind;
use crate::gc_threads::GcThreads;
use crate::util::{CollectorTls, GcState, ThreadIndex, WorkerKind};
use crate::vm::GcBinding;

/// Returned from a wait when the worker should leave its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerShouldExit;

/// Startup arguments of one GC thread.  The thread consumes them and drops them as soon as it
/// has passed the startup barrier.
pub struct ThreadArgs<B: GcBinding> {
    pub tid: ThreadIndex,
    pub barrier: Arc<Barrier>,
    pub(crate) gc: Arc<GcThreads<B>>,
}

impl<B: GcBinding> ThreadArgs<B> {
    pub(crate) fn new(tid: ThreadIndex, barrier: Arc<Barrier>, gc: Arc<GcThreads<B>>) -> Self {
        Self { tid, barrier, gc }
    }

    pub fn gc(&self) -> &Arc<GcThreads<B>> {
        &self.gc
    }
}

/// What the mark, sweep and page-reclamation routines are given when a worker calls them.
pub struct WorkerContext {
    tls: Arc<CollectorTls>,
    phase_signal: Arc<PhaseSignal>,
}

impl WorkerContext {
    pub fn tid(&self) -> ThreadIndex {
        self.tls.tid()
    }

    pub fn kind(&self) -> WorkerKind {
        self.tls.kind()
    }

    pub fn tls(&self) -> &Arc<CollectorTls> {
        &self.tls
    }

    /// The phase signal, for mark routines that count themselves as marking with
    /// `PhaseSignal::join_marking`.
    pub fn phase_signal(&self) -> &Arc<PhaseSignal> {
        &self.phase_signal
    }
}

/// A GC thread after registration.  Privately owned by its thread.
pub(crate) struct GcWorker<B: GcBinding> {
    ctx: WorkerContext,
    gc: Arc<GcThreads<B>>,
}

impl<B: GcBinding> GcWorker<B> {
    /// Install thread-local state, report the thread as waiting, and block at the startup
    /// barrier until every peer and the spawning thread arrive.
    ///
    /// Failing to install the state is fatal and does not return.
    pub fn register(args: Box<ThreadArgs<B>>, kind: WorkerKind) -> Self {
        let tid = args.tid;
        let gc = args.gc.clone();
        let binding = gc.binding();

        let tls = match binding
            .init_thread_tls(tid, kind)
            .and_then(|tls| gc.thread_group().register(tls))
        {
            Ok(tls) => tls,
            Err(e) => {
                error!("Cannot start GC thread {}: {}", tid, e);
                binding.fatal_error(tid, e)
            }
        };

        binding.set_gc_state(&tls, GcState::Waiting);
        trace!("GC thread {} ({}) waiting at the startup barrier", tid, kind);
        args.barrier.wait();
        drop(args);
        debug!("GC thread {} ({}) started", tid, kind);

        Self {
            ctx: WorkerContext {
                tls,
                phase_signal: gc.phase_signal().clone(),
            },
            gc,
        }
    }

    fn tid(&self) -> ThreadIndex {
        self.ctx.tid()
    }

    fn tls(&self) -> &CollectorTls {
        &self.ctx.tls
    }

    fn set_gc_state(&self, state: GcState) {
        self.gc.binding().set_gc_state(&self.ctx.tls, state);
    }

    /// The parallel worker loop.  Returns only on shutdown.
    pub fn run_parallel(&self) -> WorkerShouldExit {
        let binding = self.gc.binding();
        let phase_signal = self.gc.phase_signal();
        let sweeps = self.tls().sweeps_requested();

        loop {
            if let Err(exit) = phase_signal.wait_for_work(self.tid(), sweeps) {
                return exit;
            }
            self.tls().stat.on_wakeup();

            if phase_signal.has_mark_work() {
                self.set_gc_state(GcState::Marking);
                self.tls()
                    .stat
                    .measure(PassKind::Mark, || binding.mark_parallel(&self.ctx));
            }
            // Not an else.  A single wake-up may carry both a marking and a sweeping obligation,
            // and both are serviced before waiting again.
            if sweeps.is_requested() {
                self.set_gc_state(GcState::Sweeping);
                self.tls()
                    .stat
                    .measure(PassKind::Sweep, || binding.sweep_pool_parallel(&self.ctx));
                sweeps.complete_one();
            }
            self.set_gc_state(GcState::Waiting);
        }
    }

    /// The concurrent worker loop.  Returns only on shutdown.
    pub fn run_concurrent(&self) -> WorkerShouldExit {
        let binding = self.gc.binding();
        let sweep_assist = self.gc.sweep_assist();

        loop {
            if let Err(exit) = sweep_assist.wait(self.tid()) {
                return exit;
            }
            self.tls().stat.on_wakeup();

            self.set_gc_state(GcState::Sweeping);
            self.tls()
                .stat
                .measure(PassKind::FreePages, || binding.free_pages(&self.ctx));
            self.set_gc_state(GcState::Waiting);
        }
    }

    pub fn exit(self) {
        self.set_gc_state(GcState::Running);
        debug!("GC thread {} ({}) exiting", self.tid(), self.ctx.kind());
        self.gc.thread_group().on_worker_exited(self.tid());
    }
}

/// Entry point of a parallel GC thread.  Runs until the coordination instance shuts down.
pub fn start_parallel_worker<B: GcBinding>(args: Box<ThreadArgs<B>>) {
    let worker = GcWorker::register(args, WorkerKind::Parallel);
    let WorkerShouldExit = worker.run_parallel();
    worker.exit();
}

/// Entry point of a concurrent GC thread.  Runs until the coordination instance shuts down.
pub fn start_concurrent_worker<B: GcBinding>(args: Box<ThreadArgs<B>>) {
    let worker = GcWorker::register(args, WorkerKind::Concurrent);
    let WorkerShouldExit = worker.run_concurrent();
    worker.exit();
}
