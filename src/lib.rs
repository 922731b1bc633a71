//! Worker-thread coordination for a tracing garbage collector.
//!
//! This crate drives a fixed pool of GC threads through two activities:
//!
//! -   *parallel* workers wake when marking is available or when a sweep pass is requested for
//!     them, and service both in the same wake-up if both are pending;
//! -   *concurrent* workers each run one page-reclamation pass per sweep-assist permit.
//!
//! The tracing, sweeping and page-reclamation routines themselves belong to the runtime, which
//! provides them through [`vm::GcBinding`].  Deciding when to mark or sweep is also up to the
//! runtime; it hands work to the threads through [`GcThreads`] or the functions in
//! [`memory_manager`].
//!
//! A runtime typically
//!
//! 1.  creates the pool with [`memory_manager::gc_init`],
//! 2.  starts the threads with [`memory_manager::initialize_collection`] once its thread system is
//!     ready, and
//! 3.  calls [`GcThreads::begin_marking`], [`GcThreads::request_sweep`] and
//!     [`GcThreads::post_sweep_assists`] as its GC driver needs.

#[macro_use]
extern crate log;

mod gc_threads;
pub use gc_threads::GcThreads;

pub mod memory_manager;
pub mod scheduler;
pub mod util;
pub mod vm;

#[cfg(test)]
mod tests;
