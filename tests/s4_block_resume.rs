//! S4/property 8: externally blocking a running thread removes it from
//! scheduling; resuming it later lets it run again with its quantum count
//! otherwise undisturbed by the time spent blocked.

fn spin() {
    loop {}
}

/// Burns CPU on the primary thread until `total_quantums` advances by
/// `quantums`. `ITIMER_VIRTUAL` only counts down while this thread is
/// running, so `std::thread::sleep` here would starve every uthread,
/// spinner included, and no tick would ever preempt the primary thread.
fn burn_quantums(quantums: u64) {
    let target = uthreads::get_total_quantums() + quantums;
    while uthreads::get_total_quantums() < target {
        std::hint::spin_loop();
    }
}

#[test]
fn blocked_thread_stops_accumulating_quantums_until_resumed() {
    const QUANTUM_USECS: i64 = 10_000;
    assert_eq!(uthreads::init(QUANTUM_USECS), 0);

    let t = uthreads::spawn(spin);
    burn_quantums(20);

    assert_eq!(uthreads::block(t), 0);
    let quantums_at_block = uthreads::get_quantums(t);
    assert!(quantums_at_block >= 0);

    burn_quantums(20);
    assert_eq!(
        uthreads::get_quantums(t),
        quantums_at_block,
        "a blocked thread must not accumulate further quantums"
    );

    assert_eq!(uthreads::resume(t), 0);
    burn_quantums(20);
    assert!(
        uthreads::get_quantums(t) > quantums_at_block,
        "resumed thread should run again and accumulate more quantums"
    );
}
