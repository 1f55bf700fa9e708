//! The host timer driver: arming `ITIMER_VIRTUAL`, installing the
//! `SIGVTALRM` handler, and the `SignalGuard` that brackets every critical
//! section touching shared scheduler state.
//!
//! Masking is nesting-safe: a [`SignalGuard`] remembers whether `SIGVTALRM`
//! was already blocked when it was constructed, and only unblocks it on
//! drop if it wasn't. A short-lived guard taken inside a longer-lived one
//! (e.g. [`crate::scheduler::with`]'s own internal guard, nested inside the
//! guard a voluntary yield holds across its call to [`crate::scheduler::dispatch`])
//! is therefore a no-op on the way out, and only the outermost guard's drop
//! actually re-admits the signal.

use core::mem::MaybeUninit;

use crate::error::Error;

/// Blocks `SIGVTALRM` for the lifetime of the guard, restoring the prior
/// mask state (blocked or not) on drop.
pub(crate) struct SignalGuard {
    was_blocked: bool,
}

impl SignalGuard {
    pub fn new() -> Self {
        unsafe {
            let mut set = MaybeUninit::<libc::sigset_t>::uninit();
            libc::sigemptyset(set.as_mut_ptr());
            libc::sigaddset(set.as_mut_ptr(), libc::SIGVTALRM);

            let mut old = MaybeUninit::<libc::sigset_t>::uninit();
            libc::sigprocmask(libc::SIG_BLOCK, set.as_ptr(), old.as_mut_ptr());

            let was_blocked = libc::sigismember(old.as_ptr(), libc::SIGVTALRM) == 1;
            SignalGuard { was_blocked }
        }
    }
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        if self.was_blocked {
            return;
        }
        unsafe {
            let mut set = MaybeUninit::<libc::sigset_t>::uninit();
            libc::sigemptyset(set.as_mut_ptr());
            libc::sigaddset(set.as_mut_ptr(), libc::SIGVTALRM);
            libc::sigprocmask(libc::SIG_UNBLOCK, set.as_ptr(), core::ptr::null_mut());
        }
    }
}

/// Unconditionally unblocks `SIGVTALRM`. Used exactly once per thread: by
/// the bootstrap trampoline, whose context was switched into while masked
/// (by whichever `SignalGuard` drove the `spawn` call) and which has no
/// guard of its own to drop.
pub(crate) fn unmask_timer() {
    unsafe {
        let mut set = MaybeUninit::<libc::sigset_t>::uninit();
        libc::sigemptyset(set.as_mut_ptr());
        libc::sigaddset(set.as_mut_ptr(), libc::SIGVTALRM);
        libc::sigprocmask(libc::SIG_UNBLOCK, set.as_ptr(), core::ptr::null_mut());
    }
}

/// Installs the `SIGVTALRM` handler. Does not arm the timer.
pub(crate) fn install_handler() -> Result<(), Error> {
    unsafe {
        let mut action: libc::sigaction = core::mem::zeroed();
        action.sa_sigaction = timer_handler as usize;
        libc::sigemptyset(&mut action.sa_mask);
        action.sa_flags = libc::SA_RESTART;

        if libc::sigaction(libc::SIGVTALRM, &action, core::ptr::null_mut()) != 0 {
            return Err(Error::OsCallFailed);
        }
    }
    Ok(())
}

/// Arms `ITIMER_VIRTUAL` with both the initial delay and the repeat period
/// set to `quantum_usecs`.
pub(crate) fn arm_timer(quantum_usecs: i64) -> Result<(), Error> {
    let interval = libc::timeval { tv_sec: quantum_usecs / 1_000_000, tv_usec: quantum_usecs % 1_000_000 };
    let timer = libc::itimerval { it_interval: interval, it_value: interval };
    unsafe {
        if libc::setitimer(libc::ITIMER_VIRTUAL, &timer, core::ptr::null_mut()) != 0 {
            return Err(Error::OsCallFailed);
        }
    }
    Ok(())
}

/// `SIGVTALRM` is automatically re-blocked by the kernel for the duration
/// of this handler (no `SA_NODEFER`), so it can safely call into the
/// scheduler without risking a nested tick during its own critical section.
/// Returning from it lets the kernel's `sigreturn` restore whatever mask
/// was active before the signal arrived, the third of the three mask-
/// resumption paths described in `DESIGN.md`.
extern "C" fn timer_handler(_sig: libc::c_int) {
    crate::scheduler::with(|s| s.on_tick());
    crate::scheduler::dispatch();
}
