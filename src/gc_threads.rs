use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};

use crate::scheduler::stat::SchedulerStat;
use crate::scheduler::{MarkingGuard, PhaseSignal, SweepAssist, ThreadArgs, ThreadGroup};
use crate::util::options::Options;
use crate::util::{CollectorTls, GcState, ThreadIndex, WorkerKind};
use crate::vm::{GcBinding, GcThreadContext};

/// A pool of GC threads and the signals that drive them.
///
/// The phase initiator (the GC driver of the runtime) decides when marking or sweeping is
/// needed.  It uses the methods here to make that known to the workers; this type imposes no
/// policy of its own.
pub struct GcThreads<B: GcBinding> {
    options: Options,
    binding: B,
    phase_signal: Arc<PhaseSignal>,
    sweep_assist: SweepAssist,
    thread_group: ThreadGroup,
    /// Set when `initialize_collection` is called.
    initialized: AtomicBool,
}

impl<B: GcBinding> GcThreads<B> {
    /// # Panics
    ///
    /// If `options.threads` has no parallel worker, or the thread count overflows.
    pub fn new(binding: B, options: Options) -> Arc<Self> {
        assert!(
            options.threads.is_valid(),
            "Invalid GC thread counts: {}",
            options.threads
        );
        let thread_group = ThreadGroup::new(options.threads.parallel, options.threads.concurrent);
        Arc::new(Self {
            options,
            binding,
            phase_signal: Arc::new(PhaseSignal::new()),
            sweep_assist: SweepAssist::new(),
            thread_group,
            initialized: AtomicBool::new(false),
        })
    }

    /// Spawn every GC thread through the binding, and return once all of them have installed
    /// their state and passed the startup barrier together with the calling thread.
    ///
    /// # Panics
    ///
    /// If called more than once.
    pub fn initialize_collection(self: &Arc<Self>) {
        assert!(
            !self.initialized.swap(true, Ordering::SeqCst),
            "initialize_collection() has already been called"
        );

        let parallel = self.thread_group.parallel_threads();
        let concurrent = self.thread_group.concurrent_threads();
        let barrier = Arc::new(Barrier::new(parallel + concurrent + 1));

        for tid in 0..parallel + concurrent {
            let args = Box::new(ThreadArgs::new(tid, barrier.clone(), self.clone()));
            let ctx = match self.thread_group.kind_of(tid) {
                Some(WorkerKind::Parallel) => GcThreadContext::Parallel(args),
                _ => GcThreadContext::Concurrent(args),
            };
            self.binding.spawn_gc_thread(ctx);
        }

        barrier.wait();
        debug_assert_eq!(
            self.thread_group.registered_workers(),
            self.thread_group.worker_count()
        );
        info!(
            "Started {} parallel and {} concurrent GC threads",
            parallel, concurrent
        );
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn binding(&self) -> &B {
        &self.binding
    }

    pub fn phase_signal(&self) -> &Arc<PhaseSignal> {
        &self.phase_signal
    }

    pub fn sweep_assist(&self) -> &SweepAssist {
        &self.sweep_assist
    }

    pub(crate) fn thread_group(&self) -> &ThreadGroup {
        &self.thread_group
    }

    pub fn parallel_threads(&self) -> usize {
        self.thread_group.parallel_threads()
    }

    pub fn concurrent_threads(&self) -> usize {
        self.thread_group.concurrent_threads()
    }

    /// Make marking available and wake all parallel workers.  Marking stays available while the
    /// guard (or any guard from `PhaseSignal::join_marking`) is alive.
    pub fn begin_marking(&self) -> MarkingGuard {
        debug!("Marking requested");
        self.phase_signal.begin_marking()
    }

    pub fn has_mark_work(&self) -> bool {
        self.phase_signal.has_mark_work()
    }

    /// Ask parallel worker `tid` for one more sweep pass, and wake it.  Returns the number of
    /// passes now outstanding for that worker.
    ///
    /// # Panics
    ///
    /// If `tid` is not a registered parallel worker.
    pub fn request_sweep(&self, tid: ThreadIndex) -> usize {
        let tls = self.parallel_tls(tid).unwrap_or_else(|| {
            panic!("GC thread {} is not a registered parallel worker", tid)
        });
        let pending = tls.sweeps_requested().request();
        trace!("Sweep requested for GC thread {}.  Pending: {}", tid, pending);
        self.phase_signal.notify_all();
        pending
    }

    /// Ask every registered parallel worker for one more sweep pass.  Returns the number of
    /// workers asked.
    pub fn request_sweep_all(&self) -> usize {
        let mut requested = 0;
        for tls in self.thread_group.parallel_workers() {
            tls.sweeps_requested().request();
            requested += 1;
        }
        debug!("Sweep requested for {} parallel GC threads", requested);
        if requested > 0 {
            self.phase_signal.notify_all();
        }
        requested
    }

    /// Hand out `n` permits for concurrent page-reclamation passes.
    pub fn post_sweep_assists(&self, n: usize) {
        self.sweep_assist.post(n);
    }

    pub fn pending_sweep_assists(&self) -> usize {
        self.sweep_assist.available_permits()
    }

    pub fn tls(&self, tid: ThreadIndex) -> Option<&Arc<CollectorTls>> {
        self.thread_group.get(tid)
    }

    fn parallel_tls(&self, tid: ThreadIndex) -> Option<&Arc<CollectorTls>> {
        self.tls(tid).filter(|tls| tls.kind() == WorkerKind::Parallel)
    }

    pub fn gc_state(&self, tid: ThreadIndex) -> Option<GcState> {
        self.tls(tid).map(|tls| tls.gc_state())
    }

    /// Parallel workers currently blocked on the phase signal.
    pub fn parked_parallel_workers(&self) -> usize {
        self.phase_signal.parked_workers()
    }

    /// Concurrent workers currently blocked on the sweep-assist semaphore.
    pub fn waiting_concurrent_workers(&self) -> usize {
        self.sweep_assist.waiting_workers()
    }

    /// Start measuring pass durations on every worker.
    pub fn enable_stat(&self) {
        for tls in self.thread_group.workers() {
            tls.stat().enable();
        }
    }

    pub fn statistics(&self) -> HashMap<String, String> {
        let mut summary = SchedulerStat::default();
        for tls in self.thread_group.workers() {
            summary.merge(tls.stat());
        }
        summary.harness_stat()
    }

    /// Ask every worker to leave its loop, and wait until all of them have exited.  Pending sweep
    /// requests and sweep-assist permits are left unserviced.
    pub fn shutdown(&self) {
        info!("Shutting down GC threads");
        self.phase_signal.request_shutdown();
        self.sweep_assist.request_shutdown();
        self.thread_group.wait_for_all_exited();
        info!("All GC threads exited");
    }
}
