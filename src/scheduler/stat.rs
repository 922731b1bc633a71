use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use strum::IntoEnumIterator;

/// The kinds of passes a GC thread runs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, strum_macros::EnumIter, strum_macros::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum PassKind {
    /// One invocation of the parallel mark routine.
    Mark,
    /// One invocation of the parallel sweep routine.
    Sweep,
    /// One invocation of the concurrent page-reclamation routine.
    FreePages,
}

const NUM_PASS_KINDS: usize = 3;

#[derive(Copy, Clone)]
struct PassDuration {
    total: f64,
    min: f64,
    max: f64,
}

impl PassDuration {
    fn new() -> Self {
        PassDuration {
            total: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    fn process_duration(&mut self, duration: f64) {
        self.min = self.min.min(duration);
        self.max = self.max.max(duration);
        self.total += duration;
    }

    fn merge_duration_inplace(&mut self, other: &Self) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.total += other.total;
    }
}

/// Counters kept by one GC thread.
///
/// Counts are always kept.  Durations are only measured after `enable` is called, because they
/// cost two clock reads per pass.
pub struct WorkerStat {
    enabled: AtomicBool,
    wakeups: AtomicUsize,
    passes: [AtomicUsize; NUM_PASS_KINDS],
    durations: Mutex<[PassDuration; NUM_PASS_KINDS]>,
}

impl Default for WorkerStat {
    fn default() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            wakeups: AtomicUsize::new(0),
            passes: Default::default(),
            durations: Mutex::new([PassDuration::new(); NUM_PASS_KINDS]),
        }
    }
}

impl WorkerStat {
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// How many times this thread returned from its wait with something to do.
    pub fn wakeups(&self) -> usize {
        self.wakeups.load(Ordering::Relaxed)
    }

    pub fn passes(&self, kind: PassKind) -> usize {
        self.passes[kind as usize].load(Ordering::Relaxed)
    }

    pub(crate) fn on_wakeup(&self) {
        self.wakeups.fetch_add(1, Ordering::Relaxed);
    }

    /// Run `f` as one pass of `kind`, counting it and timing it if enabled.
    pub(crate) fn measure<R>(&self, kind: PassKind, f: impl FnOnce() -> R) -> R {
        let start = self.is_enabled().then(Instant::now);
        let result = f();
        if let Some(start) = start {
            let duration = start.elapsed().as_nanos() as f64;
            self.durations.lock().unwrap()[kind as usize].process_duration(duration);
        }
        self.passes[kind as usize].fetch_add(1, Ordering::Relaxed);
        result
    }
}

/// Statistics summed over a set of GC threads.
#[derive(Default)]
pub struct SchedulerStat {
    wakeups: usize,
    pass_counts: [usize; NUM_PASS_KINDS],
    pass_durations: Option<[PassDuration; NUM_PASS_KINDS]>,
}

impl SchedulerStat {
    pub fn merge(&mut self, stat: &WorkerStat) {
        self.wakeups += stat.wakeups();
        for kind in PassKind::iter() {
            self.pass_counts[kind as usize] += stat.passes(kind);
        }
        if stat.is_enabled() {
            let durations = stat.durations.lock().unwrap();
            let merged = self
                .pass_durations
                .get_or_insert([PassDuration::new(); NUM_PASS_KINDS]);
            for (acc, d) in merged.iter_mut().zip(durations.iter()) {
                acc.merge_duration_inplace(d);
            }
        }
    }

    pub fn harness_stat(&self) -> HashMap<String, String> {
        let mut stat = HashMap::new();
        stat.insert("wakeups.count".to_owned(), format!("{}", self.wakeups));
        for kind in PassKind::iter() {
            let name: &'static str = kind.into();
            stat.insert(
                format!("pass.{}.count", name),
                format!("{}", self.pass_counts[kind as usize]),
            );
            if let Some(durations) = &self.pass_durations {
                let d = &durations[kind as usize];
                if self.pass_counts[kind as usize] > 0 {
                    stat.insert(format!("pass.{}.time.total", name), format!("{:.2}", d.total));
                    stat.insert(format!("pass.{}.time.min", name), format!("{:.2}", d.min));
                    stat.insert(format!("pass.{}.time.max", name), format!("{:.2}", d.max));
                }
            }
        }
        stat
    }
}
