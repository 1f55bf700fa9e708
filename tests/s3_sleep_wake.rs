//! S3/property 5: a thread that calls `sleep(k)` at `total_quantums = q`
//! must not run again until `total_quantums >= q + k`.

use std::sync::atomic::{AtomicU64, Ordering};

static WOKE_AT: AtomicU64 = AtomicU64::new(0);

fn sleeper() {
    uthreads::sleep(3);
    WOKE_AT.store(uthreads::get_total_quantums(), Ordering::Relaxed);
}

#[test]
fn sleeping_thread_does_not_run_before_its_wakeup_quantum() {
    const QUANTUM_USECS: i64 = 20_000;
    assert_eq!(uthreads::init(QUANTUM_USECS), 0);

    let q_at_spawn = uthreads::get_total_quantums();
    uthreads::spawn(sleeper);

    // Burn CPU on the primary thread so `ITIMER_VIRTUAL` actually ticks;
    // parking it in `std::thread::sleep` would starve every uthread,
    // including the sleeper waiting to be woken.
    let deadline = q_at_spawn + 200;
    while WOKE_AT.load(Ordering::Relaxed) == 0 && uthreads::get_total_quantums() < deadline {
        std::hint::spin_loop();
    }

    let woke_at = WOKE_AT.load(Ordering::Relaxed);
    assert!(woke_at > 0, "sleeper never woke");
    assert!(woke_at >= q_at_spawn + 3, "woke at {woke_at}, before q={q_at_spawn} + 3");
}
