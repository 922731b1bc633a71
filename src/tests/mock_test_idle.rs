use std::time::Duration;

use super::{options, TEST_TIMEOUT_MS};
use crate::scheduler::PassKind;
use crate::util::test_util::mock_binding::MockBinding;
use crate::util::test_util::{panic_after, wait_until};
use crate::util::GcState;
use crate::GcThreads;

/// Idle workers stay blocked: they do not wake, do not call any routine, and report `Waiting`.
#[test]
pub fn idle_workers_stay_blocked() {
    panic_after(TEST_TIMEOUT_MS, || {
        let gc = GcThreads::new(MockBinding::new(), options(3, 1));
        gc.initialize_collection();
        wait_until(|| gc.parked_parallel_workers() == 3 && gc.waiting_concurrent_workers() == 1);

        // A notification without anything to do is only a predicate check for the workers.
        gc.phase_signal().notify_all();
        std::thread::sleep(Duration::from_millis(100));

        assert_eq!(gc.parked_parallel_workers(), 3);
        assert_eq!(gc.waiting_concurrent_workers(), 1);
        for tid in 0..4 {
            let tls = gc.tls(tid).unwrap();
            assert_eq!(tls.stat().wakeups(), 0);
            assert_eq!(tls.gc_state(), GcState::Waiting);
        }
        assert_eq!(gc.binding().calls(PassKind::Mark), 0);
        assert_eq!(gc.binding().calls(PassKind::Sweep), 0);
        assert_eq!(gc.binding().calls(PassKind::FreePages), 0);

        gc.shutdown();
    })
}
