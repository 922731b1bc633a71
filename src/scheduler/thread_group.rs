use std::fmt;
use std::sync::{Arc, Condvar, Mutex, OnceLock};

use crate::util::{CollectorTls, ThreadIndex, WorkerKind};

/// Why a GC thread could not start, or could not install its thread-local collector state.
///
/// All of these are fatal: the collector cannot run with a gap in its thread index space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsInitError {
    /// The OS thread could not be created.
    SpawnFailed { tid: ThreadIndex, reason: String },
    /// The runtime could not allocate the state.
    AllocationFailed { tid: ThreadIndex, reason: String },
    /// The index is outside the thread group.
    IndexOutOfRange { tid: ThreadIndex, limit: usize },
    /// Another thread already registered with this index.
    AlreadyRegistered { tid: ThreadIndex },
    /// The state was created for the other kind of worker than the index belongs to.
    KindMismatch {
        tid: ThreadIndex,
        expected: WorkerKind,
        found: WorkerKind,
    },
}

impl fmt::Display for TlsInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TlsInitError::SpawnFailed { tid, reason } => {
                write!(f, "failed to spawn GC thread {}: {}", tid, reason)
            }
            TlsInitError::AllocationFailed { tid, reason } => {
                write!(f, "failed to allocate collector state for GC thread {}: {}", tid, reason)
            }
            TlsInitError::IndexOutOfRange { tid, limit } => {
                write!(f, "GC thread index {} out of range (limit {})", tid, limit)
            }
            TlsInitError::AlreadyRegistered { tid } => {
                write!(f, "GC thread {} is already registered", tid)
            }
            TlsInitError::KindMismatch {
                tid,
                expected,
                found,
            } => write!(
                f,
                "GC thread {} should be a {} worker, but its state is for a {} worker",
                tid, expected, found
            ),
        }
    }
}

impl std::error::Error for TlsInitError {}

/// The set of GC threads: one slot per thread index, and a count of live workers.
///
/// Parallel workers occupy indices `0..parallel`, concurrent workers the `concurrent` indices
/// after them.
pub(crate) struct ThreadGroup {
    parallel: usize,
    slots: Vec<OnceLock<Arc<CollectorTls>>>,
    live_workers: Mutex<usize>,
    all_exited: Condvar,
}

impl ThreadGroup {
    pub fn new(parallel: usize, concurrent: usize) -> Self {
        Self {
            parallel,
            slots: (0..parallel + concurrent).map(|_| OnceLock::new()).collect(),
            live_workers: Mutex::new(0),
            all_exited: Condvar::new(),
        }
    }

    pub fn parallel_threads(&self) -> usize {
        self.parallel
    }

    pub fn concurrent_threads(&self) -> usize {
        self.slots.len() - self.parallel
    }

    pub fn worker_count(&self) -> usize {
        self.slots.len()
    }

    /// The kind of worker that owns `tid`, if `tid` is in the group.
    pub fn kind_of(&self, tid: ThreadIndex) -> Option<WorkerKind> {
        if tid < self.parallel {
            Some(WorkerKind::Parallel)
        } else if tid < self.slots.len() {
            Some(WorkerKind::Concurrent)
        } else {
            None
        }
    }

    /// Install the state of a newly started worker and count it as live.
    pub fn register(&self, tls: Arc<CollectorTls>) -> Result<Arc<CollectorTls>, TlsInitError> {
        let tid = tls.tid();
        let expected = self.kind_of(tid).ok_or(TlsInitError::IndexOutOfRange {
            tid,
            limit: self.slots.len(),
        })?;
        if tls.kind() != expected {
            return Err(TlsInitError::KindMismatch {
                tid,
                expected,
                found: tls.kind(),
            });
        }
        self.slots[tid]
            .set(tls.clone())
            .map_err(|_| TlsInitError::AlreadyRegistered { tid })?;

        *self.live_workers.lock().unwrap() += 1;
        Ok(tls)
    }

    pub fn get(&self, tid: ThreadIndex) -> Option<&Arc<CollectorTls>> {
        self.slots.get(tid).and_then(OnceLock::get)
    }

    /// Registered parallel workers, in index order.
    pub fn parallel_workers(&self) -> impl Iterator<Item = &Arc<CollectorTls>> {
        self.slots[..self.parallel].iter().filter_map(OnceLock::get)
    }

    /// All registered workers, in index order.
    pub fn workers(&self) -> impl Iterator<Item = &Arc<CollectorTls>> {
        self.slots.iter().filter_map(OnceLock::get)
    }

    pub fn registered_workers(&self) -> usize {
        self.workers().count()
    }

    pub fn live_workers(&self) -> usize {
        *self.live_workers.lock().unwrap()
    }

    /// Called by a worker right before its thread returns.
    pub fn on_worker_exited(&self, tid: ThreadIndex) {
        let mut live = self.live_workers.lock().unwrap();
        debug_assert!(*live > 0);
        *live -= 1;
        trace!("GC thread {} exited.  Live workers: {}", tid, *live);
        if *live == 0 {
            self.all_exited.notify_all();
        }
    }

    /// Block until every registered worker has exited.
    pub fn wait_for_all_exited(&self) {
        let mut live = self.live_workers.lock().unwrap();
        while *live > 0 {
            live = self.all_exited.wait(live).unwrap();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_are_split_by_kind() {
        let group = ThreadGroup::new(2, 1);
        assert_eq!(group.kind_of(0), Some(WorkerKind::Parallel));
        assert_eq!(group.kind_of(1), Some(WorkerKind::Parallel));
        assert_eq!(group.kind_of(2), Some(WorkerKind::Concurrent));
        assert_eq!(group.kind_of(3), None);
        assert_eq!(group.concurrent_threads(), 1);
    }

    #[test]
    fn register_rejects_bad_indices() {
        let group = ThreadGroup::new(1, 1);

        let out_of_range = Arc::new(CollectorTls::new(2, WorkerKind::Concurrent));
        assert_eq!(
            group.register(out_of_range).unwrap_err(),
            TlsInitError::IndexOutOfRange { tid: 2, limit: 2 }
        );

        let wrong_kind = Arc::new(CollectorTls::new(0, WorkerKind::Concurrent));
        assert!(matches!(
            group.register(wrong_kind),
            Err(TlsInitError::KindMismatch { tid: 0, .. })
        ));

        group
            .register(Arc::new(CollectorTls::new(0, WorkerKind::Parallel)))
            .unwrap();
        assert_eq!(
            group
                .register(Arc::new(CollectorTls::new(0, WorkerKind::Parallel)))
                .unwrap_err(),
            TlsInitError::AlreadyRegistered { tid: 0 }
        );

        assert_eq!(group.registered_workers(), 1);
        assert_eq!(group.live_workers(), 1);
        assert!(group.get(1).is_none());
    }

    #[test]
    fn wait_for_all_exited() {
        let group = ThreadGroup::new(2, 0);
        for tid in 0..2 {
            group
                .register(Arc::new(CollectorTls::new(tid, WorkerKind::Parallel)))
                .unwrap();
        }
        assert_eq!(group.parallel_workers().count(), 2);

        std::thread::scope(|scope| {
            scope.spawn(|| group.on_worker_exited(0));
            scope.spawn(|| group.on_worker_exited(1));
            group.wait_for_all_exited();
        });
        assert_eq!(group.live_workers(), 0);
    }
}
