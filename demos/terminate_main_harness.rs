//! Exercised only by `tests/s6_terminate_primary_exits_process.rs` as a
//! child process: `terminate(0)` must end the process with exit status 0,
//! which is not something a test can observe about its own process.

fn main() {
    assert_eq!(uthreads::init(50_000), 0);
    let _ = uthreads::terminate(0);
    unreachable!("terminate(0) must have exited the process by now");
}
