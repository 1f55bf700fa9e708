//! x86_64 register-level context switch.
//!
//! Only the registers the System V AMD64 ABI requires a callee to preserve
//! are saved: `rsp`, `rbx`, `rbp`, `r12`-`r15`. Everything else is caller-
//! saved and therefore already on the stack (or dead) by the time control
//! reaches `switch_context`.

use core::arch::naked_asm;

#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct Context {
    rsp: u64,
    rbx: u64,
    rbp: u64,
    r12: u64,
    r13: u64,
    r14: u64,
    r15: u64,
}

impl Context {
    pub const fn empty() -> Self {
        Context { rsp: 0, rbx: 0, rbp: 0, r12: 0, r13: 0, r14: 0, r15: 0 }
    }

    /// Builds the initial context for a brand-new thread: `stack_top` points
    /// one-past-the-end of the thread's stack buffer, `entry_fn` is the
    /// trampoline that becomes this thread's first instruction.
    ///
    /// # Safety
    /// `stack_top` must point one-past-the-end of a writable buffer at
    /// least 16 bytes long that is exclusively owned by this thread.
    pub unsafe fn bootstrap(stack_top: *mut u8, entry_fn: unsafe extern "C" fn() -> !) -> Context {
        // `switch_context`'s epilogue ends in `ret`, which pops the return
        // address off the top of the stack it just switched onto. Seeding
        // that slot with `entry_fn` makes the first switch into this
        // context land in the trampoline, exactly as if it had called it.
        let aligned = (stack_top as usize) & !0xf;
        let slot = aligned - 16;
        unsafe {
            *(slot as *mut u64) = entry_fn as usize as u64;
        }
        Context { rsp: slot as u64, ..Context::empty() }
    }
}

/// Saves the caller's callee-saved registers into `*from`, then restores
/// `*to`'s and returns into whatever context last called this function (or,
/// for a freshly bootstrapped context, into the trampoline).
///
/// # Safety
/// `from` and `to` must be valid, non-aliasing pointers into live
/// `Context`s. The timer signal must already be masked by the caller.
#[unsafe(naked)]
pub unsafe extern "C" fn switch_context(from: *mut Context, to: *const Context) {
    naked_asm!(
        "mov [rdi + 0], rsp",
        "mov [rdi + 8], rbx",
        "mov [rdi + 16], rbp",
        "mov [rdi + 24], r12",
        "mov [rdi + 32], r13",
        "mov [rdi + 40], r14",
        "mov [rdi + 48], r15",

        "mov rsp, [rsi + 0]",
        "mov rbx, [rsi + 8]",
        "mov rbp, [rsi + 16]",
        "mov r12, [rsi + 24]",
        "mov r13, [rsi + 32]",
        "mov r14, [rsi + 40]",
        "mov r15, [rsi + 48]",
        "ret",
    );
}
