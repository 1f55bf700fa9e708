//! Named failure causes behind the library's sentinel-integer return
//! convention.
//!
//! Every public API function still returns a plain `i32` (non-negative on
//! success, `-1` on failure) for fidelity with the source contract, but every
//! internal path that would produce `-1` first builds one of these variants
//! and logs it at `warn` level before collapsing it to `-1` at the API
//! boundary.

use thiserror::Error;

/// Failure causes for the thread library's internal operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("invalid argument")]
    InvalidArgument,

    #[error("tid {0} does not refer to a live thread")]
    UnknownThread(crate::thread::Tid),

    #[error("no free thread slot")]
    NoFreeSlot,

    #[error("uthreads::init was already called")]
    AlreadyInitialized,

    #[error("uthreads::init has not been called yet")]
    NotInitialized,

    #[error("operating system call failed")]
    OsCallFailed,
}

impl Error {
    /// Collapses any cause into the library's `-1` sentinel.
    pub fn to_code(self) -> i32 {
        log::warn!("uthreads operation failed: {self}");
        -1
    }
}
