//! The context-switch and stack-bootstrap primitive.
//!
//! This is the one place in the crate where ordinary function-call
//! semantics are subverted: [`switch`] is a function that, from the
//! machine's point of view, returns twice, once into whichever context
//! later switches back into its caller. Everything above this module only
//! ever calls [`switch`] and [`bootstrap`]; the rest of the scheduler is
//! architecture-agnostic.

#[cfg(target_arch = "x86_64")]
mod x86_64;
#[cfg(target_arch = "x86_64")]
pub use self::x86_64::Context;

#[cfg(target_arch = "aarch64")]
mod aarch64;
#[cfg(target_arch = "aarch64")]
pub use self::aarch64::Context;

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
compile_error!("uthreads' context primitive is only implemented for x86_64 and aarch64");

/// A nullary function supplied by user code as a thread's entry point.
pub type Entry = fn();

/// Builds the initial context for a thread whose stack is `stack` and whose
/// first instruction, once switched into, is the library's trampoline.
///
/// `stack` must outlive the returned `Context` and must not be touched by
/// anyone else for as long as the thread using it is alive. It becomes the
/// thread's execution stack the moment the first [`switch`] targets this
/// context.
pub fn bootstrap(stack: &mut [u8]) -> Context {
    let stack_top = unsafe { stack.as_mut_ptr().add(stack.len()) };
    // Safety: `stack_top` points one-past-the-end of `stack`, which is at
    // least `STACK_SIZE` (>=16) bytes and owned exclusively by this slot.
    unsafe { Context::bootstrap(stack_top, trampoline) }
}

/// Saves the running thread's machine context into `*prev` and transfers
/// control to `*next`. Returns once some later call to `switch` targets
/// `*prev` again.
///
/// # Safety
/// `prev` and `next` must point at distinct, live `Context`s (or, in the
/// `prev == next` no-op case, the same one) owned by thread records the
/// caller holds no other live reference into. The caller must have already
/// masked `SIGVTALRM`; the destination context's saved mask takes over once
/// control transfers.
pub unsafe fn switch(prev: *mut Context, next: *const Context) {
    #[cfg(target_arch = "x86_64")]
    unsafe {
        self::x86_64::switch_context(prev, next);
    }
    #[cfg(target_arch = "aarch64")]
    unsafe {
        self::aarch64::switch_context(prev, next);
    }
}

/// The library-owned entry point for every bootstrapped thread.
///
/// Runs with the timer signal still masked (inherited from whoever last
/// called [`switch`] into this context, for a brand new thread, that is
/// the spawning thread's `spawn` call). Unmasks it, runs the user's entry
/// function, then terminates the thread if that function returns.
extern "C" fn trampoline() -> ! {
    crate::signal::unmask_timer();

    let tid = crate::scheduler::with(|s| s.current_tid());
    let entry = crate::scheduler::with(|s| s.entry_of(tid))
        .expect("trampoline reached for a thread with no entry function");
    log::debug!("thread {tid} trampoline starting user entry");
    entry();
    log::debug!("thread {tid} entry function returned, self-terminating");

    let _ = crate::terminate(tid);
    unreachable!("terminate(self) never returns");
}
