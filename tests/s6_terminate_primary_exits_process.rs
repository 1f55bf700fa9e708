//! S6/property 9 (process-exit half): `terminate(0)` ends the whole
//! process with exit status 0. That can't be observed from inside the
//! calling process, so it's driven through a child-process harness binary.

use std::process::Command;

#[test]
fn terminate_zero_exits_the_process_with_status_zero() {
    let exe = env!("CARGO_BIN_EXE_terminate-main-harness");
    let status = Command::new(exe).status().expect("failed to run terminate-main-harness");
    assert!(status.success(), "expected exit status 0, got {status:?}");
}
