mod collector_tls;
pub use self::collector_tls::{CollectorTls, GcState, ThreadIndex, WorkerKind};

pub mod logger;
pub mod options;

#[cfg(any(test, feature = "test_private"))]
pub mod test_util;
