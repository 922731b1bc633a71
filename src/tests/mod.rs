// NOTE: Tests in this module drive real GC threads through `MockBinding`.  Every test wraps its
// body in `panic_after`, so a lost wake-up fails the test instead of hanging it.

use crate::util::options::{Options, ThreadCounts};

mod mock_test_idle;
mod mock_test_startup_order;

/// Options for a pool with `parallel` parallel and `concurrent` concurrent workers.  Environment
/// variables are ignored so that tests which set them do not interfere.
fn options(parallel: usize, concurrent: usize) -> Options {
    let mut options = Options::builtin_defaults();
    options.threads = ThreadCounts::new(parallel, concurrent);
    options
}

const TEST_TIMEOUT_MS: u64 = 20_000;
