//! The scheduler: owns the thread table, the ready queue, and the global
//! counters, and is the sole place that decides what runs next.
//!
//! A process-wide singleton behind a `spin::Mutex`, matching the teacher's
//! own `static SCHEDULER: Mutex<Option<Scheduler>>` pattern (see
//! `DESIGN.md`). The mutex is a correctness assertion against reentrant
//! misuse, not a concurrency primitive. Signal masking is what actually
//! prevents contention, since there is only ever one OS thread running this
//! code.

use crate::context::{self, Context, Entry};
use crate::error::Error;
use crate::ready_queue::ReadyQueue;
use crate::signal::SignalGuard;
use crate::thread::{ThreadRecord, ThreadSnapshot, ThreadState, Tid, MAX_THREAD_NUM};

static SCHEDULER: spin::Mutex<Option<Scheduler>> = spin::Mutex::new(None);

pub(crate) struct Scheduler {
    threads: Vec<ThreadRecord>,
    ready: ReadyQueue,
    total_quantums: u64,
    current: Tid,
}

/// What a yielding API entry (`terminate`, `block`, `sleep`) should do once
/// it releases the scheduler lock.
pub(crate) enum TerminateEffect {
    /// `terminate(0)`: the whole process exits, there is nothing to switch to.
    ExitProcess,
    /// A thread other than the caller was terminated; nothing to switch to.
    Done,
    /// The caller terminated itself; it must yield and never return.
    DoneSelf,
}

pub(crate) enum BlockEffect {
    Done,
    YieldSelf,
}

/// The outcome of one scheduling decision.
enum Dispatch {
    /// No ready thread and the caller is still `Running`: keep going.
    KeepRunning,
    /// Switch from `prev` to `next`.
    Switch { prev: *mut Context, next: *const Context },
    /// Nothing is runnable at all (Open Question 1, resolved in `DESIGN.md`).
    NoRunnableThread,
}

impl Scheduler {
    fn new() -> Self {
        let mut threads = Vec::with_capacity(MAX_THREAD_NUM);
        for tid in 0..MAX_THREAD_NUM as Tid {
            threads.push(ThreadRecord::empty(tid));
        }
        threads[0].state = ThreadState::Running;
        threads[0].quantums = 1;
        Scheduler { threads, ready: ReadyQueue::with_capacity(MAX_THREAD_NUM), total_quantums: 1, current: 0 }
    }

    pub fn current_tid(&self) -> Tid {
        self.current
    }

    pub fn total_quantums(&self) -> u64 {
        self.total_quantums
    }

    pub fn entry_of(&self, tid: Tid) -> Option<Entry> {
        self.threads[tid as usize].entry
    }

    pub fn get_quantums(&self, tid: Tid) -> Result<u64, Error> {
        let rec = self.slot(tid)?;
        Ok(rec.quantums)
    }

    pub fn debug_snapshot(&self) -> Vec<ThreadSnapshot> {
        self.threads.iter().filter(|t| t.state != ThreadState::Unused).map(ThreadRecord::snapshot).collect()
    }

    pub fn spawn(&mut self, entry: Entry) -> Result<Tid, Error> {
        let slot = self.threads[1..].iter().position(|t| t.state == ThreadState::Unused).map(|i| i + 1);
        let tid = slot.ok_or(Error::NoFreeSlot)? as Tid;
        self.threads[tid as usize].spawn_into(entry);
        self.ready.enqueue(tid);
        log::info!("spawned thread {tid}");
        Ok(tid)
    }

    pub fn terminate(&mut self, tid: Tid) -> Result<TerminateEffect, Error> {
        if tid == 0 {
            log::info!("terminate(0): exiting process");
            return Ok(TerminateEffect::ExitProcess);
        }
        self.slot(tid)?;
        log::info!("terminating thread {tid}");
        self.threads[tid as usize].state = ThreadState::Terminated;
        self.threads[tid as usize].reclaim();
        if tid == self.current {
            Ok(TerminateEffect::DoneSelf)
        } else {
            Ok(TerminateEffect::Done)
        }
    }

    pub fn block(&mut self, tid: Tid) -> Result<BlockEffect, Error> {
        if tid == 0 {
            return Err(Error::InvalidArgument);
        }
        let rec = self.slot_mut(tid)?;
        if rec.state == ThreadState::Blocked {
            return Ok(BlockEffect::Done);
        }
        log::debug!("blocking thread {tid}");
        rec.state = ThreadState::Blocked;
        if tid == self.current {
            Ok(BlockEffect::YieldSelf)
        } else {
            Ok(BlockEffect::Done)
        }
    }

    pub fn resume(&mut self, tid: Tid) -> Result<(), Error> {
        if tid == 0 {
            return Err(Error::InvalidArgument);
        }
        let rec = self.slot_mut(tid)?;
        if rec.state != ThreadState::Blocked {
            return Ok(());
        }
        log::debug!("resuming thread {tid}");
        rec.state = ThreadState::Ready;
        rec.sleep_until = 0;
        self.ready.enqueue(tid);
        Ok(())
    }

    pub fn sleep(&mut self, num_quantums: u64) -> Result<(), Error> {
        if self.current == 0 || num_quantums == 0 {
            return Err(Error::InvalidArgument);
        }
        let wake_at = self.total_quantums + num_quantums;
        let current = self.current;
        log::debug!("thread {current} sleeping until quantum {wake_at}");
        let rec = &mut self.threads[current as usize];
        rec.sleep_until = wake_at;
        rec.state = ThreadState::Blocked;
        Ok(())
    }

    pub fn on_tick(&mut self) {
        self.total_quantums += 1;
        let current = self.current;
        self.threads[current as usize].quantums += 1;
        log::trace!("tick: total_quantums={}, thread {current} quantums={}", self.total_quantums, self.threads[current as usize].quantums);
    }

    /// Wakes any sleeper whose time has come.
    fn sweep_sleepers(&mut self) {
        let total = self.total_quantums;
        for rec in self.threads.iter_mut() {
            if rec.state == ThreadState::Blocked && rec.sleep_until > 0 && rec.sleep_until <= total {
                log::debug!("waking thread {} at quantum {total}", rec.tid);
                rec.state = ThreadState::Ready;
                rec.sleep_until = 0;
                self.ready.enqueue(rec.tid);
            }
        }
    }

    /// The dispatch decision (§4.5): sweep sleepers, pop a ready tid
    /// (skipping stale entries), transition states, and hand back the raw
    /// context pointers to switch between. Does not perform the switch
    /// itself. That must happen with the lock released (see [`dispatch`]).
    fn schedule_next(&mut self) -> Dispatch {
        self.sweep_sleepers();

        let prev = self.current;
        let mut next = None;
        while let Some(candidate) = self.ready.dequeue() {
            if self.threads[candidate as usize].state == ThreadState::Ready {
                next = Some(candidate);
                break;
            }
        }

        let next = match next {
            Some(n) => n,
            None if self.threads[prev as usize].state == ThreadState::Running => return Dispatch::KeepRunning,
            None => return Dispatch::NoRunnableThread,
        };

        if self.threads[prev as usize].state == ThreadState::Running {
            self.threads[prev as usize].state = ThreadState::Ready;
            self.ready.enqueue(prev);
        }

        self.threads[next as usize].state = ThreadState::Running;
        self.current = next;
        log::debug!("switching from thread {prev} to thread {next}");

        let buf = self.threads.as_mut_ptr();
        // Safety: `prev` and `next` are distinct valid indices into `buf`
        // (or equal, in the no-op self-switch case), and no other live
        // reference into the table survives past this point, and the lock is
        // dropped by the caller immediately after this returns.
        let prev_ctx = unsafe { &mut (*buf.add(prev as usize)).context as *mut Context };
        let next_ctx = unsafe { &(*buf.add(next as usize)).context as *const Context };
        Dispatch::Switch { prev: prev_ctx, next: next_ctx }
    }

    fn slot(&self, tid: Tid) -> Result<&ThreadRecord, Error> {
        let rec = self.threads.get(tid as usize).ok_or(Error::InvalidArgument)?;
        if rec.state == ThreadState::Unused {
            return Err(Error::UnknownThread(tid));
        }
        Ok(rec)
    }

    fn slot_mut(&mut self, tid: Tid) -> Result<&mut ThreadRecord, Error> {
        let rec = self.threads.get_mut(tid as usize).ok_or(Error::InvalidArgument)?;
        if rec.state == ThreadState::Unused {
            return Err(Error::UnknownThread(tid));
        }
        Ok(rec)
    }
}

/// Installs the scheduler singleton (slot 0 `Running`, everything else
/// `Unused`). Fails if called more than once.
pub(crate) fn install() -> Result<(), Error> {
    let _guard = SignalGuard::new();
    let mut slot = SCHEDULER.lock();
    if slot.is_some() {
        return Err(Error::AlreadyInitialized);
    }
    *slot = Some(Scheduler::new());
    Ok(())
}

/// Tears the scheduler singleton back down. Used only when `init` fails
/// partway through (e.g. the timer handler installs but arming the
/// interval timer does not), so a half-initialized library can't be mistaken
/// for a working one.
pub(crate) fn uninstall() {
    *SCHEDULER.lock() = None;
}

/// Runs `f` against the live scheduler, masking `SIGVTALRM` for the
/// duration so a tick can never find the lock held (which would otherwise
/// deadlock this single OS thread against itself).
///
/// Panics if the library has not been initialized. Callers on paths that
/// can run before `init` must use [`try_with`] instead.
pub(crate) fn with<R>(f: impl FnOnce(&mut Scheduler) -> R) -> R {
    let _guard = SignalGuard::new();
    let mut slot = SCHEDULER.lock();
    f(slot.as_mut().expect("uthreads scheduler used before init"))
}

/// As [`with`], but returns `Error::NotInitialized` instead of panicking.
pub(crate) fn try_with<R>(f: impl FnOnce(&mut Scheduler) -> Result<R, Error>) -> Result<R, Error> {
    let _guard = SignalGuard::new();
    let mut slot = SCHEDULER.lock();
    f(slot.as_mut().ok_or(Error::NotInitialized)?)
}

/// Runs the dispatch loop until either the caller keeps running or a real
/// switch happens. Called both from the timer handler (preemption) and
/// from voluntary yields (`block`/`sleep`/`terminate` on self).
///
/// The caller is responsible for holding its own [`SignalGuard`] across
/// this call when yielding voluntarily, so the mask is only released once
/// this exact call site is reached again after being rescheduled.
pub(crate) fn dispatch() {
    loop {
        let action = with(Scheduler::schedule_next);
        match action {
            Dispatch::KeepRunning => return,
            Dispatch::Switch { prev, next } => {
                // Safety: pointers came from the scheduler's own table and
                // the lock that protected them has already been released.
                unsafe { context::switch(prev, next) };
                return;
            }
            Dispatch::NoRunnableThread => {
                log::warn!("no runnable thread; waiting for the timer to wake one");
                unsafe {
                    let mut empty = core::mem::MaybeUninit::<libc::sigset_t>::uninit();
                    libc::sigemptyset(empty.as_mut_ptr());
                    libc::sigsuspend(empty.as_ptr());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_scheduler_has_slot_zero_running_with_one_quantum() {
        let s = Scheduler::new();
        assert_eq!(s.current, 0);
        assert_eq!(s.total_quantums, 1);
        assert_eq!(s.threads[0].state, ThreadState::Running);
        assert_eq!(s.threads[0].quantums, 1);
        for t in &s.threads[1..] {
            assert_eq!(t.state, ThreadState::Unused);
        }
    }

    #[test]
    fn spawn_allocates_lowest_free_slot_and_enqueues() {
        fn noop() {}
        let mut s = Scheduler::new();
        assert_eq!(s.spawn(noop), Ok(1));
        assert_eq!(s.spawn(noop), Ok(2));
        assert_eq!(s.threads[1].state, ThreadState::Ready);
        assert_eq!(s.ready.len(), 2);
    }

    #[test]
    fn spawn_fails_when_table_is_full() {
        fn noop() {}
        let mut s = Scheduler::new();
        for _ in 1..MAX_THREAD_NUM {
            s.spawn(noop).unwrap();
        }
        assert_eq!(s.spawn(noop), Err(Error::NoFreeSlot));
    }

    #[test]
    fn terminate_reclaims_the_slot_for_reuse() {
        fn noop() {}
        let mut s = Scheduler::new();
        let a = s.spawn(noop).unwrap();
        let b = s.spawn(noop).unwrap();
        let c = s.spawn(noop).unwrap();
        assert!(matches!(s.terminate(b), Ok(TerminateEffect::Done)));
        assert_eq!(s.threads[b as usize].state, ThreadState::Unused);
        assert_eq!(s.spawn(noop), Ok(b));
        assert_ne!(a, c);
    }

    #[test]
    fn terminate_unknown_tid_is_an_error() {
        let mut s = Scheduler::new();
        assert_eq!(s.terminate(5), Err(Error::UnknownThread(5)));
    }

    #[test]
    fn block_of_the_primary_thread_is_rejected() {
        let mut s = Scheduler::new();
        assert_eq!(s.block(0), Err(Error::InvalidArgument));
    }

    #[test]
    fn resume_of_a_non_blocked_thread_is_a_no_op_success() {
        fn noop() {}
        let mut s = Scheduler::new();
        let a = s.spawn(noop).unwrap();
        assert_eq!(s.resume(a), Ok(()));
        assert_eq!(s.threads[a as usize].state, ThreadState::Ready);
    }

    #[test]
    fn resume_clears_sleep_until_and_enqueues() {
        let mut s = Scheduler::new();
        let a = s.spawn(|| {}).unwrap();
        s.threads[a as usize].state = ThreadState::Blocked;
        s.threads[a as usize].sleep_until = 99;
        assert_eq!(s.resume(a), Ok(()));
        assert_eq!(s.threads[a as usize].state, ThreadState::Ready);
        assert_eq!(s.threads[a as usize].sleep_until, 0);
    }

    #[test]
    fn sweep_sleepers_wakes_only_due_sleepers() {
        let mut s = Scheduler::new();
        let a = s.spawn(|| {}).unwrap();
        let b = s.spawn(|| {}).unwrap();
        s.threads[a as usize].state = ThreadState::Blocked;
        s.threads[a as usize].sleep_until = 3;
        s.threads[b as usize].state = ThreadState::Blocked;
        s.threads[b as usize].sleep_until = 100;
        s.total_quantums = 3;
        s.sweep_sleepers();
        assert_eq!(s.threads[a as usize].state, ThreadState::Ready);
        assert_eq!(s.threads[b as usize].state, ThreadState::Blocked);
    }

    #[test]
    fn get_quantums_of_unused_slot_is_an_error() {
        let s = Scheduler::new();
        assert_eq!(s.get_quantums(7), Err(Error::UnknownThread(7)));
    }
}
