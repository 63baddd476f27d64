mod common;

use common::{Log, init_test_logging};
use fibril::time::{Clock, delay};
use fibril::{BlockOnError, Future, RuntimeBuilder, SchedulerBuilder, State};

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

#[test]
fn test_block_on_drives_timers_until_settled() {
    init_test_logging();

    let runtime = RuntimeBuilder::new().build::<&str>();
    let timers = runtime.timers().clone();

    let result = runtime.block_on(|cx| {
        cx.resolved(1).chain(move |cx, v| {
            delay(cx, &timers, Duration::from_secs(1))
                .chain(move |cx, ()| cx.resolved(v + 1))
        })
    });

    assert_eq!(result, Ok(2));
    assert_eq!(runtime.timers().now(), Duration::from_secs(1));
    assert_eq!(runtime.scheduler().live_nodes(), 0);
}

#[test]
fn test_block_on_reports_rejection() {
    init_test_logging();

    let runtime = RuntimeBuilder::new().build::<String>();
    let result = runtime.block_on(|cx| cx.rejected::<()>("broken".to_string()));

    let Err(error) = result else {
        panic!("expected a rejection");
    };

    assert_eq!(error.name(), "rejected");
    assert_eq!(error.to_string(), "`rejected` was rejected: broken");
    assert_eq!(error.into_rejection(), Some("broken".to_string()));
}

#[test]
fn test_block_on_reports_stall() {
    init_test_logging();

    let runtime = RuntimeBuilder::new().build::<&str>();
    let result = runtime.block_on(|cx| cx.schedule::<(), _>("forever", |_, _| Ok(())));

    assert_eq!(
        result,
        Err(BlockOnError::Stalled {
            name: "forever".to_string()
        })
    );
}

#[test]
fn test_block_on_reports_cancellation() {
    init_test_logging();

    let runtime = RuntimeBuilder::new().build::<&str>();
    let stash: Rc<RefCell<Option<Future<i32, &str>>>> = Rc::default();

    let slot = stash.clone();
    let result = runtime.block_on(move |cx| {
        cx.schedule::<(), _>("parent", move |cx, _| {
            cx.rejected::<()>("boom");
            *slot.borrow_mut() = Some(cx.resolved(1));
            Ok(())
        });

        match stash.borrow_mut().take() {
            Some(victim) => victim,
            None => cx.rejected("body did not run"),
        }
    });

    assert_eq!(
        result,
        Err(BlockOnError::Cancelled {
            name: "resolved".to_string()
        })
    );
}

#[test]
fn test_run_drains_pending_timers() {
    init_test_logging();

    let runtime = RuntimeBuilder::new().build::<&str>();
    let timers = runtime.timers().clone();
    let root = runtime.scheduler().root();

    let log = Log::new();
    for millis in [30, 10, 20] {
        let seen = log.clone();
        delay(&root, &timers, Duration::from_millis(millis))
            .on_settle(move |_| seen.push(format!("{millis}ms")));
    }

    assert_eq!(runtime.run(), 3);
    assert_eq!(log.entries(), ["10ms", "20ms", "30ms"]);
    assert_eq!(runtime.scheduler().live_nodes(), 0);
}

#[test]
fn test_system_clock_sleeps_until_deadline() {
    init_test_logging();

    let runtime = RuntimeBuilder::new().clock(Clock::System).build::<&str>();
    let timers = runtime.timers().clone();

    let started = Instant::now();
    let result = runtime.block_on(move |cx| {
        delay(cx, &timers, Duration::from_millis(20)).map(|()| "woke up")
    });

    assert_eq!(result, Ok("woke up"));
    assert!(started.elapsed() >= Duration::from_millis(20));
}

#[test]
fn test_transition_hook_observes_lifecycle() {
    init_test_logging();

    let transitions = Rc::new(RefCell::new(Vec::new()));
    let sink = transitions.clone();

    let runtime = RuntimeBuilder::new()
        .capacity(4)
        .on_transition(move |t| {
            sink.borrow_mut().push((t.name.to_string(), t.from, t.to));
        })
        .build::<&str>();

    let result = runtime.block_on(|cx| cx.resolved(5));
    assert_eq!(result, Ok(5));

    let expected = [
        ("resolved".to_string(), State::Waiting, State::Running),
        ("resolved".to_string(), State::Running, State::Resolved),
        ("resolved".to_string(), State::Resolved, State::Committed),
    ];
    assert_eq!(*transitions.borrow(), expected);
}

#[test]
fn test_transition_hook_sees_cascade() {
    init_test_logging();

    let skipped = Rc::new(RefCell::new(Vec::new()));
    let sink = skipped.clone();

    let scheduler = SchedulerBuilder::new()
        .on_transition(move |t| {
            if t.from == State::Waiting && t.to == State::Committed {
                sink.borrow_mut().push(t.name.to_string());
            }
        })
        .build::<&str>();

    scheduler.schedule::<(), _>("parent", |cx, _| {
        cx.rejected::<()>("boom");
        cx.resolved(1);
        cx.resolved(2);
        Ok(())
    });

    assert_eq!(*skipped.borrow(), ["resolved", "resolved"]);
}

#[test]
fn test_arena_slots_are_reused_after_reclaim() {
    init_test_logging();

    let scheduler = SchedulerBuilder::new().capacity(2).build::<&str>();

    for round in 0..100 {
        let value = scheduler
            .resolved(round)
            .map(|v| v + 1)
            .chain(|cx, v| cx.resolved(v * 2));

        assert_eq!(value.peek(), Some(Ok((round + 1) * 2)));
        assert_eq!(scheduler.live_nodes(), 0);
    }
}

#[test]
fn test_dropped_scheduler_makes_scopes_inert() {
    init_test_logging();

    let runtime = RuntimeBuilder::new().build::<&str>();
    let root = runtime.scheduler().root();
    drop(runtime);

    let orphan = root.schedule("orphan", |_, done| {
        done.resolve(1);
        Ok(())
    });

    assert!(orphan.is_cancelled());
    assert_eq!(orphan.peek(), None);
}
