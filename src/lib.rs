//! uthreads: a cooperative-preemptive user-space thread library.
//!
//! Multiplexes many lightweight threads onto a single OS thread using a
//! fixed-quantum round-robin scheduler driven by `SIGVTALRM`/`ITIMER_VIRTUAL`.
//! There is no parallelism across CPUs and no priority scheme, just plain
//! FIFO round robin, exactly one thread running at any instant.
//!
//! The public API mirrors a small, C-shaped contract: every operation
//! returns either a non-negative success value (the new tid for [`spawn`],
//! otherwise `0`) or `-1`. [`mod@checked`] wraps the same operations with a
//! [`Result`]-returning surface for callers who'd rather match on a named
//! [`Error`] than a sentinel integer.
//!
//! # Example
//!
//! ```no_run
//! fn worker() {
//!     for _ in 0..3 {
//!         uthreads::sleep(1);
//!     }
//! }
//!
//! uthreads::init(100_000); // 100ms quantum
//! let tid = uthreads::spawn(worker);
//! assert!(tid >= 1);
//! ```

mod context;
mod error;
mod ready_queue;
mod scheduler;
mod signal;
mod thread;

pub use error::Error;
pub use thread::{ThreadSnapshot, ThreadState, Tid, MAX_THREAD_NUM, STACK_SIZE};

use scheduler::{BlockEffect, TerminateEffect};
use signal::SignalGuard;

/// Installs the `SIGVTALRM` handler, arms `ITIMER_VIRTUAL` for
/// `quantum_usecs`, and initializes slot 0 (the calling thread) as
/// `Running` with one quantum already credited. Must be called exactly
/// once, before any other operation.
///
/// Returns `0` on success, `-1` if `quantum_usecs` is not positive, `init`
/// was already called, or the underlying `sigaction`/`setitimer` call
/// fails.
pub fn init(quantum_usecs: i64) -> i32 {
    checked::init(quantum_usecs).map_or_else(Error::to_code, |()| 0)
}

/// Spawns a new thread running `entry`. Allocates the lowest-numbered free
/// slot (>= 1), bootstraps its stack, and marks it `Ready`.
///
/// Returns the new tid on success, `-1` if no slot is free.
pub fn spawn(entry: fn()) -> i32 {
    checked::spawn(entry).map_or_else(Error::to_code, |tid| tid)
}

/// Terminates the thread `tid`. `terminate(0)` ends the whole process
/// (exit status 0). Terminating the calling thread never returns.
///
/// Returns `0` on success, `-1` if `tid` is out of range or not live.
pub fn terminate(tid: Tid) -> i32 {
    match checked::terminate(tid) {
        Ok(()) => 0,
        Err(e) => e.to_code(),
    }
}

/// Blocks `tid`. A no-op success if it is already blocked. Blocking the
/// calling thread yields immediately.
///
/// Returns `0` on success, `-1` if `tid` is the primary thread, out of
/// range, or not live.
pub fn block(tid: Tid) -> i32 {
    checked::block(tid).map_or_else(Error::to_code, |()| 0)
}

/// Resumes `tid`. A no-op success if it is not blocked. Clears any pending
/// sleep and re-enqueues it as `Ready`.
///
/// Returns `0` on success, `-1` if `tid` is the primary thread, out of
/// range, or not live.
pub fn resume(tid: Tid) -> i32 {
    checked::resume(tid).map_or_else(Error::to_code, |()| 0)
}

/// Puts the calling thread to sleep for `num_quantums` whole quantums and
/// yields. Never called from the primary thread.
///
/// Returns `0` on success, `-1` if `num_quantums` is `0` or the caller is
/// the primary thread.
pub fn sleep(num_quantums: u64) -> i32 {
    checked::sleep(num_quantums).map_or_else(Error::to_code, |()| 0)
}

/// Returns the calling thread's tid.
pub fn get_tid() -> Tid {
    scheduler::with(|s| s.current_tid())
}

/// Returns the number of quantums elapsed since `init`.
pub fn get_total_quantums() -> u64 {
    scheduler::with(|s| s.total_quantums())
}

/// Returns the number of quantums during which `tid` was the running
/// thread.
///
/// Returns the count on success, `-1` if `tid` is out of range or not live.
pub fn get_quantums(tid: Tid) -> i64 {
    match checked::get_quantums(tid) {
        Ok(count) => count as i64,
        Err(e) => e.to_code() as i64,
    }
}

/// A point-in-time snapshot of every live thread's bookkeeping fields.
/// Not part of the stable state-machine contract, kept for tooling and tests.
pub fn debug_snapshot() -> Vec<ThreadSnapshot> {
    scheduler::with(|s| s.debug_snapshot())
}

/// The same nine operations (minus the trivial getters, which never fail)
/// with a [`Result<_, Error>`] surface instead of sentinel integers.
pub mod checked {
    use super::*;

    pub fn init(quantum_usecs: i64) -> Result<(), Error> {
        if quantum_usecs <= 0 {
            return Err(Error::InvalidArgument);
        }
        scheduler::install()?;
        if let Err(e) = signal::install_handler().and_then(|()| signal::arm_timer(quantum_usecs)) {
            scheduler::uninstall();
            return Err(e);
        }
        log::info!("uthreads initialized with a {quantum_usecs}us quantum");
        Ok(())
    }

    pub fn spawn(entry: fn()) -> Result<Tid, Error> {
        let _guard = SignalGuard::new();
        scheduler::try_with(|s| s.spawn(entry))
    }

    pub fn terminate(tid: Tid) -> Result<(), Error> {
        let _guard = SignalGuard::new();
        match scheduler::try_with(|s| s.terminate(tid))? {
            TerminateEffect::ExitProcess => std::process::exit(0),
            TerminateEffect::Done => Ok(()),
            TerminateEffect::DoneSelf => {
                scheduler::dispatch();
                unreachable!("a terminated thread's context is never switched back into")
            }
        }
    }

    pub fn block(tid: Tid) -> Result<(), Error> {
        let _guard = SignalGuard::new();
        match scheduler::try_with(|s| s.block(tid))? {
            BlockEffect::Done => Ok(()),
            BlockEffect::YieldSelf => {
                scheduler::dispatch();
                Ok(())
            }
        }
    }

    pub fn resume(tid: Tid) -> Result<(), Error> {
        let _guard = SignalGuard::new();
        scheduler::try_with(|s| s.resume(tid))
    }

    pub fn sleep(num_quantums: u64) -> Result<(), Error> {
        let _guard = SignalGuard::new();
        scheduler::try_with(|s| s.sleep(num_quantums))?;
        scheduler::dispatch();
        Ok(())
    }

    pub fn get_quantums(tid: Tid) -> Result<u64, Error> {
        scheduler::try_with(|s| s.get_quantums(tid))
    }
}
