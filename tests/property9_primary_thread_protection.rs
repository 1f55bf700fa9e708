//! Property 9 (in-process half): `block(0)` and `sleep(_)` called from the
//! primary thread itself return `-1` rather than blocking the process.

#[test]
fn blocking_or_sleeping_the_primary_thread_is_rejected() {
    assert_eq!(uthreads::init(50_000), 0);
    assert_eq!(uthreads::get_tid(), 0);

    assert_eq!(uthreads::block(0), -1);
    assert_eq!(uthreads::sleep(5), -1);

    // The primary thread must still be running normally afterward.
    assert_eq!(uthreads::get_tid(), 0);
}
