//! Demonstrates `sleep`/`resume` semantics: thread A sleeps for a few
//! quantums and wakes on its own; thread B is explicitly `block`ed and
//! later `resume`d externally.

/// Burns CPU on the primary thread until `total_quantums` advances by
/// `quantums`. `ITIMER_VIRTUAL` only counts down while this thread is
/// running, so `std::thread::sleep` here would starve every uthread.
fn burn_quantums(quantums: u64) {
    let target = uthreads::get_total_quantums() + quantums;
    while uthreads::get_total_quantums() < target {
        std::hint::spin_loop();
    }
}

fn sleepy() {
    let woke_at = {
        uthreads::sleep(3);
        uthreads::get_total_quantums()
    };
    println!("sleepy thread resumed at total_quantums={woke_at}");
}

fn waits_to_be_resumed() {
    println!("waiter thread blocking itself");
    uthreads::block(uthreads::get_tid());
    println!("waiter thread resumed externally at total_quantums={}", uthreads::get_total_quantums());
}

fn main() {
    env_logger::init();

    const QUANTUM_USECS: i64 = 20_000;
    assert_eq!(uthreads::init(QUANTUM_USECS), 0);

    let a = uthreads::spawn(sleepy);
    let b = uthreads::spawn(waits_to_be_resumed);
    println!("spawned sleepy={a} waiter={b}");

    burn_quantums(10);
    println!("resuming waiter thread {b}");
    uthreads::resume(b);

    burn_quantums(5);
    println!("final total_quantums={}", uthreads::get_total_quantums());
}
