mod common;

use common::init_test_logging;
use fibril::time::delay;
use fibril::{BlockOnError, all, race};

use std::time::Duration;

#[fibril::test]
fn test_all_macro_single_future() {
    init_test_logging();

    let result = runtime.block_on(|cx| all!(cx.resolved(42)));

    assert_eq!(result, Ok((42,)));
}

#[fibril::test]
fn test_all_macro_different_types() {
    init_test_logging();

    let result = runtime.block_on(|cx| {
        all!(cx.resolved("hello"), cx.resolved(42), cx.resolved(true),)
    });

    assert_eq!(result, Ok(("hello", 42, true)));
}

#[fibril::test]
fn test_all_macro_waits_for_timers() {
    init_test_logging();

    let timers = runtime.timers().clone();
    let result = runtime.block_on(move |cx| {
        let slow = delay(cx, &timers, Duration::from_millis(20)).map(|()| 'b');
        let fast = delay(cx, &timers, Duration::from_millis(10)).map(|()| 1u8);
        all!(slow, fast)
    });

    assert_eq!(result, Ok(('b', 1)));
    assert_eq!(runtime.timers().now(), Duration::from_millis(20));
}

#[fibril::test]
fn test_all_macro_rejects() {
    init_test_logging();

    let result = runtime.block_on(|cx| all!(cx.resolved(1), cx.rejected::<bool>("boom")));

    assert_eq!(
        result,
        Err(BlockOnError::Rejected {
            name: "resolved&rejected".to_string(),
            error: "boom",
        })
    );
}

#[fibril::test]
fn test_race_macro_maps_the_winner() {
    init_test_logging();

    let timers = runtime.timers().clone();
    let result = runtime.block_on(move |cx| {
        let number = delay(cx, &timers, Duration::from_millis(20)).map(|()| 7);
        let word = delay(cx, &timers, Duration::from_millis(10)).map(|()| "seven");

        race!(
            number => |n: i32| n.to_string(),
            word => |w: &str| w.to_uppercase(),
        )
    });

    assert_eq!(result, Ok("SEVEN".to_string()));
}

#[fibril::test]
fn test_race_macro_without_handlers() {
    init_test_logging();

    let timers = runtime.timers().clone();
    let result = runtime.block_on(move |cx| {
        let slow = delay(cx, &timers, Duration::from_millis(20)).map(|()| 2);
        race!(slow, cx.resolved(1))
    });

    assert_eq!(result, Ok(1));
}

#[fibril::test(error = String)]
fn test_error_type_option() {
    init_test_logging();

    let result = runtime.block_on(|cx| cx.rejected::<()>(String::from("owned")));

    assert_eq!(
        result.map_err(BlockOnError::into_rejection),
        Err(Some("owned".to_string()))
    );
}

#[fibril::test(clock = system)]
fn test_system_clock_option() {
    init_test_logging();

    assert_eq!(runtime.timers().clock(), fibril::time::Clock::System);
}

#[fibril::test]
fn test_pending_timers_are_drained_at_exit() {
    init_test_logging();

    let fired = std::rc::Rc::new(std::cell::Cell::new(false));
    let flag = fired.clone();

    // Fires when the attribute drains the timer queue after this body.
    runtime
        .timers()
        .set_timeout(Duration::from_secs(60), move || flag.set(true));

    assert!(!fired.get());
    assert_eq!(runtime.timers().pending(), 1);
}
