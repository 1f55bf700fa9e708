//! Property 1: at every observation point exactly one thread is `Running`
//! and its tid matches `get_tid()`.

use uthreads::ThreadState;

fn spin() {
    loop {}
}

#[test]
fn exactly_one_thread_is_running_and_it_matches_get_tid() {
    assert_eq!(uthreads::init(30_000), 0);
    uthreads::spawn(spin);
    uthreads::spawn(spin);

    let snapshot = uthreads::debug_snapshot();
    let running: Vec<_> = snapshot.iter().filter(|t| t.state == ThreadState::Running).collect();
    assert_eq!(running.len(), 1, "expected exactly one Running thread, got {running:?}");
    assert_eq!(running[0].tid, uthreads::get_tid());
}
