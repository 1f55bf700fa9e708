//! Spawns two threads that each spin-increment their own counter and prints
//! the split after a short wall-clock delay. Demonstrates preemption
//! happening purely from `SIGVTALRM` ticks, with no voluntary yields at all.

use std::sync::atomic::{AtomicU64, Ordering};

static COUNT_A: AtomicU64 = AtomicU64::new(0);
static COUNT_B: AtomicU64 = AtomicU64::new(0);

fn spin_a() {
    loop {
        COUNT_A.fetch_add(1, Ordering::Relaxed);
    }
}

fn spin_b() {
    loop {
        COUNT_B.fetch_add(1, Ordering::Relaxed);
    }
}

fn main() {
    env_logger::init();

    const QUANTUM_USECS: i64 = 10_000;
    assert_eq!(uthreads::init(QUANTUM_USECS), 0);

    let a = uthreads::spawn(spin_a);
    let b = uthreads::spawn(spin_b);
    println!("spawned A={a} B={b}");

    // `ITIMER_VIRTUAL` only counts down while this thread is on CPU, so the
    // primary thread burns CPU here rather than sleeping, letting ticks
    // actually fire and preempt it into the spawned spinners.
    let target = uthreads::get_total_quantums() + 100;
    while uthreads::get_total_quantums() < target {
        std::hint::spin_loop();
    }

    let count_a = COUNT_A.load(Ordering::Relaxed);
    let count_b = COUNT_B.load(Ordering::Relaxed);
    println!(
        "total_quantums={} quantums(A)={} quantums(B)={} count_a={count_a} count_b={count_b}",
        uthreads::get_total_quantums(),
        uthreads::get_quantums(a),
        uthreads::get_quantums(b),
    );
}
