//! The interface the embedding runtime implements.
//!
//! The coordination core does not trace objects, sweep pools or release pages itself.  It calls
//! back into the runtime for these, and for allocating per-thread state and spawning threads.

mod binding;
pub use self::binding::GcBinding;
pub use self::binding::GcThreadContext;
