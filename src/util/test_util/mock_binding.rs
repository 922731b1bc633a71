//! A `GcBinding` for tests.  It counts and logs every call, and lets a test plug in what each work
//! routine does.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::scheduler::{PassKind, TlsInitError, WorkerContext};
use crate::util::{CollectorTls, ThreadIndex, WorkerKind};
use crate::vm::{GcBinding, GcThreadContext};

pub type MockRoutine = Box<dyn Fn(&WorkerContext) + Send + Sync>;

/// Something the mock observed, in the order it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockEvent {
    Spawned(ThreadIndex),
    Registered(ThreadIndex),
    Pass(PassKind, ThreadIndex),
}

#[derive(Default)]
struct MockRoutineSlot {
    calls: AtomicUsize,
    imp: Option<MockRoutine>,
}

impl MockRoutineSlot {
    fn call(&self, ctx: &WorkerContext) {
        if let Some(imp) = &self.imp {
            imp(ctx);
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct MockBinding {
    mark_parallel: MockRoutineSlot,
    sweep_pool_parallel: MockRoutineSlot,
    free_pages: MockRoutineSlot,
    fail_init_for: Option<ThreadIndex>,
    spawn_delay: Option<Duration>,
    registered: AtomicUsize,
    events: Mutex<Vec<MockEvent>>,
    fatal_errors: Mutex<Vec<(ThreadIndex, TlsInitError)>>,
}

impl MockBinding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_mark(mut self, f: impl Fn(&WorkerContext) + Send + Sync + 'static) -> Self {
        self.mark_parallel.imp = Some(Box::new(f));
        self
    }

    pub fn on_sweep(mut self, f: impl Fn(&WorkerContext) + Send + Sync + 'static) -> Self {
        self.sweep_pool_parallel.imp = Some(Box::new(f));
        self
    }

    pub fn on_free_pages(mut self, f: impl Fn(&WorkerContext) + Send + Sync + 'static) -> Self {
        self.free_pages.imp = Some(Box::new(f));
        self
    }

    /// Make `init_thread_tls` fail for thread `tid`.
    pub fn fail_init_for(mut self, tid: ThreadIndex) -> Self {
        self.fail_init_for = Some(tid);
        self
    }

    /// Sleep before spawning each GC thread.
    pub fn spawn_delay(mut self, delay: Duration) -> Self {
        self.spawn_delay = Some(delay);
        self
    }

    /// Completed calls of a work routine, over all threads.
    pub fn calls(&self, kind: PassKind) -> usize {
        let slot = match kind {
            PassKind::Mark => &self.mark_parallel,
            PassKind::Sweep => &self.sweep_pool_parallel,
            PassKind::FreePages => &self.free_pages,
        };
        slot.calls.load(Ordering::SeqCst)
    }

    /// Threads that got their collector state.
    pub fn registered(&self) -> usize {
        self.registered.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<MockEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn fatal_errors(&self) -> Vec<(ThreadIndex, TlsInitError)> {
        self.fatal_errors.lock().unwrap().clone()
    }

    fn log(&self, event: MockEvent) {
        self.events.lock().unwrap().push(event);
    }

    fn pass(&self, kind: PassKind, slot: &MockRoutineSlot, ctx: &WorkerContext) {
        self.log(MockEvent::Pass(kind, ctx.tid()));
        slot.call(ctx);
    }
}

impl GcBinding for MockBinding {
    fn mark_parallel(&self, ctx: &WorkerContext) {
        self.pass(PassKind::Mark, &self.mark_parallel, ctx);
    }

    fn sweep_pool_parallel(&self, ctx: &WorkerContext) {
        self.pass(PassKind::Sweep, &self.sweep_pool_parallel, ctx);
    }

    fn free_pages(&self, ctx: &WorkerContext) {
        self.pass(PassKind::FreePages, &self.free_pages, ctx);
    }

    fn init_thread_tls(
        &self,
        tid: ThreadIndex,
        kind: WorkerKind,
    ) -> Result<Arc<CollectorTls>, TlsInitError> {
        if self.fail_init_for == Some(tid) {
            return Err(TlsInitError::AllocationFailed {
                tid,
                reason: "injected by MockBinding".to_string(),
            });
        }
        self.log(MockEvent::Registered(tid));
        self.registered.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(CollectorTls::new(tid, kind)))
    }

    fn spawn_gc_thread(&self, ctx: GcThreadContext<Self>) {
        if let Some(delay) = self.spawn_delay {
            std::thread::sleep(delay);
        }
        self.log(MockEvent::Spawned(ctx.args().tid));
        std::thread::Builder::new()
            .name(ctx.thread_name())
            .spawn(move || ctx.run())
            .expect("Failed to spawn GC thread");
    }

    fn fatal_error(&self, tid: ThreadIndex, err: TlsInitError) -> ! {
        self.fatal_errors.lock().unwrap().push((tid, err.clone()));
        panic!("Fatal error in GC thread {}: {}", tid, err)
    }
}
