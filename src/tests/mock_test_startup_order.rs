use std::time::Duration;

use super::{options, TEST_TIMEOUT_MS};
use crate::scheduler::PassKind;
use crate::util::test_util::mock_binding::{MockBinding, MockEvent};
use crate::util::test_util::{panic_after, wait_until};
use crate::GcThreads;

/// Work is pending before the threads start, and threads are spawned slowly.  No thread may run a
/// work routine before every thread has been spawned and has registered.
#[test]
pub fn no_work_before_startup_barrier() {
    panic_after(TEST_TIMEOUT_MS, || {
        let parallel = 3;
        let concurrent = 2;
        let binding = MockBinding::new().spawn_delay(Duration::from_millis(20));
        let gc = GcThreads::new(binding, options(parallel, concurrent));

        let marking = gc.begin_marking();
        gc.post_sweep_assists(concurrent);

        gc.initialize_collection();
        assert_eq!(gc.binding().registered(), parallel + concurrent);

        wait_until(|| {
            (0..parallel).all(|tid| gc.tls(tid).unwrap().stat().passes(PassKind::Mark) >= 1)
                && gc.binding().calls(PassKind::FreePages) == concurrent
        });
        drop(marking);

        let events = gc.binding().events();
        let first_pass = events
            .iter()
            .position(|e| matches!(e, MockEvent::Pass(..)))
            .unwrap();
        let last_startup = events
            .iter()
            .rposition(|e| matches!(e, MockEvent::Spawned(_) | MockEvent::Registered(_)))
            .unwrap();
        assert!(
            last_startup < first_pass,
            "A work routine ran before all GC threads started: {:?}",
            events
        );
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, MockEvent::Registered(_)))
                .count(),
            parallel + concurrent
        );

        gc.shutdown();
    })
}

/// Thread indices are dense, parallel first.
#[test]
pub fn thread_indices_and_names() {
    panic_after(TEST_TIMEOUT_MS, || {
        let thread_names = std::sync::Arc::new(std::sync::Mutex::new(vec![]));
        let binding = {
            let thread_names = thread_names.clone();
            MockBinding::new().on_free_pages(move |_| {
                let name = std::thread::current().name().map(str::to_owned);
                thread_names.lock().unwrap().push(name);
            })
        };
        let gc = GcThreads::new(binding, options(2, 1));
        gc.initialize_collection();

        assert_eq!(gc.parallel_threads(), 2);
        assert_eq!(gc.concurrent_threads(), 1);
        for tid in 0..2 {
            assert_eq!(gc.tls(tid).unwrap().kind(), crate::util::WorkerKind::Parallel);
        }
        assert_eq!(gc.tls(2).unwrap().kind(), crate::util::WorkerKind::Concurrent);
        assert!(gc.tls(3).is_none());

        gc.post_sweep_assists(1);
        wait_until(|| gc.binding().calls(PassKind::FreePages) == 1);
        assert_eq!(
            *thread_names.lock().unwrap(),
            vec![Some("gc-concurrent-2".to_string())]
        );

        gc.shutdown();
    })
}
