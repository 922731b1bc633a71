//! Drives a GC thread pool through the public interface only, the way a runtime would.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use gc_threads::memory_manager;
use gc_threads::scheduler::{PassKind, WorkerContext};
use gc_threads::util::options::{Options, ThreadCounts};
use gc_threads::util::{GcState, WorkerKind};
use gc_threads::vm::GcBinding;

#[derive(Default)]
struct CountingRuntime {
    marked: AtomicUsize,
    swept: AtomicUsize,
    pages_freed: AtomicUsize,
}

impl GcBinding for CountingRuntime {
    fn mark_parallel(&self, ctx: &WorkerContext) {
        assert_eq!(ctx.kind(), WorkerKind::Parallel);
        self.marked.fetch_add(1, Ordering::SeqCst);
        std::thread::yield_now();
    }

    fn sweep_pool_parallel(&self, ctx: &WorkerContext) {
        assert_eq!(ctx.kind(), WorkerKind::Parallel);
        assert_eq!(ctx.tls().gc_state(), GcState::Sweeping);
        self.swept.fetch_add(1, Ordering::SeqCst);
    }

    fn free_pages(&self, ctx: &WorkerContext) {
        assert_eq!(ctx.kind(), WorkerKind::Concurrent);
        self.pages_freed.fetch_add(1, Ordering::SeqCst);
    }
}

fn wait_until(cond: impl Fn() -> bool) {
    let start = Instant::now();
    while !cond() {
        assert!(
            start.elapsed() < Duration::from_secs(10),
            "Timed out waiting for GC threads"
        );
        std::thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn one_collection_cycle() {
    let mut options = Options::builtin_defaults();
    options.threads = ThreadCounts::new(2, 1);
    assert!(options.set_from_str("thread_name_prefix", "it"));

    let gc = memory_manager::gc_init(CountingRuntime::default(), options);
    memory_manager::initialize_collection(&gc);
    gc.enable_stat();

    // Mark.
    let marking = memory_manager::begin_marking(&gc);
    wait_until(|| gc.binding().marked.load(Ordering::SeqCst) >= 2);
    drop(marking);
    wait_until(|| gc.parked_parallel_workers() == 2);

    // Sweep.
    assert_eq!(memory_manager::request_sweep_all(&gc), 2);
    memory_manager::request_sweep(&gc, 0);
    wait_until(|| gc.binding().swept.load(Ordering::SeqCst) == 3);

    // Free pages in the background.
    memory_manager::post_sweep_assists(&gc, 4);
    wait_until(|| gc.binding().pages_freed.load(Ordering::SeqCst) == 4);
    assert_eq!(gc.pending_sweep_assists(), 0);

    let tls0 = gc.tls(0).unwrap();
    assert_eq!(tls0.stat().passes(PassKind::Sweep), 2);
    assert_eq!(gc.tls(2).unwrap().stat().passes(PassKind::FreePages), 4);

    let stats = gc.statistics();
    assert_eq!(stats["pass.sweep.count"], "3");
    assert_eq!(stats["pass.free_pages.count"], "4");

    memory_manager::shutdown(&gc);
    for tid in 0..3 {
        assert_eq!(gc.gc_state(tid), Some(GcState::Running));
    }
}

#[test]
fn mark_routine_joins_marking() {
    struct JoiningRuntime {
        joined: AtomicUsize,
    }

    impl GcBinding for JoiningRuntime {
        fn mark_parallel(&self, ctx: &WorkerContext) {
            // Each worker keeps marking available until it has finished its share.
            let _guard = ctx.phase_signal().join_marking();
            self.joined.fetch_add(1, Ordering::SeqCst);
        }
        fn sweep_pool_parallel(&self, _ctx: &WorkerContext) {}
        fn free_pages(&self, _ctx: &WorkerContext) {}
    }

    let mut options = Options::builtin_defaults();
    options.threads = ThreadCounts::new(3, 0);
    let gc = memory_manager::gc_init(
        JoiningRuntime {
            joined: AtomicUsize::new(0),
        },
        options,
    );
    memory_manager::initialize_collection(&gc);

    let marking = memory_manager::begin_marking(&gc);
    wait_until(|| gc.binding().joined.load(Ordering::SeqCst) >= 3);
    drop(marking);
    wait_until(|| gc.phase_signal().threads_marking() == 0);
    wait_until(|| gc.parked_parallel_workers() == 3);

    memory_manager::shutdown(&gc);
}
