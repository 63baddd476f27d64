mod common;

use common::{Log, init_test_logging};
use fibril::Scheduler;
use fibril::time::{Timers, delay};

use std::time::Duration;

#[test]
fn test_fork_lets_next_sibling_begin_first() {
    init_test_logging();

    let scheduler = Scheduler::<&str>::new();
    let timers = Timers::default();
    let log = Log::new();

    let (outer, clock) = (log.clone(), timers.clone());
    let parent = scheduler.schedule("parent", move |cx, done| {
        let finished = outer.clone();
        let slow = clock.clone();
        cx.fork("slow", move |_, done| {
            slow.set_timeout(Duration::from_secs(1), move || {
                finished.push("slow finished");
                done.resolve(1);
            });
            Ok(())
        })
        .on_settle({
            let settled = outer.clone();
            move |outcome| settled.push(format!("slow settled {outcome:?}"))
        });

        let next = outer.clone();
        cx.schedule("next", move |_, done| {
            next.push("next began");
            done.resolve(());
            Ok(())
        });

        done.resolve(());
        Ok(())
    });

    // The fork node resolved at launch, so nothing holds the parent back.
    assert_eq!(log.entries(), ["next began"]);
    assert_eq!(parent.peek(), Some(Ok(())));
    assert_eq!(scheduler.live_nodes(), 0);

    timers.run();
    assert_eq!(
        log.entries(),
        ["next began", "slow finished", "slow settled Ok(1)"]
    );
}

#[test]
fn test_forked_delay_does_not_hold_up_next_sibling() {
    init_test_logging();

    let scheduler = Scheduler::<&str>::new();
    let timers = Timers::default();
    let log = Log::new();

    let (outer, clock) = (log.clone(), timers.clone());
    let parent = scheduler.schedule("parent", move |cx, done| {
        let finished = outer.clone();
        let slow = clock.clone();
        cx.fork("slow", move |cx, done| {
            delay(cx, &slow, Duration::from_secs(1)).on_settle(move |outcome| {
                finished.push("slow finished");
                done.settle(outcome);
            });
            Ok(())
        });

        let next = outer.clone();
        cx.schedule("next", move |_, done| {
            next.push("next began");
            done.resolve(());
            Ok(())
        });

        done.resolve(());
        Ok(())
    });

    assert_eq!(log.entries(), ["next began"]);
    assert_eq!(parent.peek(), Some(Ok(())));
    assert_eq!(scheduler.live_nodes(), 2);

    timers.run();
    assert_eq!(log.entries(), ["next began", "slow finished"]);
    assert_eq!(scheduler.live_nodes(), 0);
}

#[test]
fn test_forked_rejection_from_scheduled_node_stays_in_its_future() {
    init_test_logging();

    let scheduler = Scheduler::<&str>::new();
    let timers = Timers::default();

    let clock = timers.clone();
    let parent = scheduler.schedule("parent", move |cx, done| {
        let failing = clock.clone();
        let forked = cx.fork::<(), _>("failing", move |cx, done| {
            delay(cx, &failing, Duration::from_millis(10))
                .chain(|cx, ()| cx.rejected::<()>("nested failure"))
                .on_settle(move |outcome| done.settle(outcome));
            Ok(())
        });

        forked.on_settle(move |outcome| match outcome {
            Ok(()) => done.resolve("no failure"),
            Err(error) => done.resolve(error),
        });
        Ok(())
    });

    assert_eq!(parent.peek(), None);

    timers.run();
    assert_eq!(parent.peek(), Some(Ok("nested failure")));
    assert_eq!(scheduler.live_nodes(), 0);
}

#[test]
fn test_schedule_blocks_next_sibling_where_fork_does_not() {
    init_test_logging();

    let scheduler = Scheduler::<&str>::new();
    let timers = Timers::default();
    let log = Log::new();

    let (outer, clock) = (log.clone(), timers.clone());
    scheduler.schedule("parent", move |cx, done| {
        delay(cx, &clock, Duration::from_millis(10));

        let next = outer.clone();
        cx.schedule("next", move |_, done| {
            next.push("next began");
            done.resolve(());
            Ok(())
        });

        done.resolve(());
        Ok(())
    });

    assert!(log.entries().is_empty());

    timers.run();
    assert_eq!(log.entries(), ["next began"]);
}

#[test]
fn test_forked_rejection_stays_in_its_future() {
    init_test_logging();

    let scheduler = Scheduler::<&str>::new();
    let timers = Timers::default();
    let log = Log::new();

    let (outer, clock) = (log.clone(), timers.clone());
    let parent = scheduler.schedule("parent", move |cx, done| {
        let failing = clock.clone();
        let forked = cx.fork::<(), _>("failing", move |_, done| {
            failing.set_timeout(Duration::from_millis(10), move || done.reject("forked failure"));
            Ok(())
        });

        let seen = outer.clone();
        forked.on_settle(move |outcome| seen.push(format!("{outcome:?}")));

        let next = outer.clone();
        cx.schedule("next", move |_, done| {
            next.push("next began");
            done.resolve(());
            Ok(())
        });

        done.resolve("parent");
        Ok(())
    });

    timers.run();
    assert_eq!(log.entries(), ["next began", "Err(\"forked failure\")"]);
    assert_eq!(parent.peek(), Some(Ok("parent")));
}

#[test]
fn test_fork_body_error_rejects_its_future() {
    init_test_logging();

    let scheduler = Scheduler::<&str>::new();
    let forked = scheduler.fork::<i32, _>("eager failure", |_, _| Err("at launch"));

    assert_eq!(forked.peek(), Some(Err("at launch")));
    assert_eq!(scheduler.live_nodes(), 0);
}

#[test]
fn test_fork_subtree_outlives_fork_node() {
    init_test_logging();

    let scheduler = Scheduler::<&str>::new();
    let timers = Timers::default();

    let clock = timers.clone();
    let forked = scheduler.fork("launcher", move |cx, done| {
        delay(cx, &clock, Duration::from_millis(10)).on_settle(move |_| done.resolve("child done"));
        Ok(())
    });

    // The fork node is gone; the launch node and its delay are still live.
    assert_eq!(forked.peek(), None);
    assert_eq!(scheduler.live_nodes(), 2);

    timers.run();
    assert_eq!(forked.peek(), Some(Ok("child done")));
    assert_eq!(scheduler.live_nodes(), 0);
}

#[test]
fn test_action_forks_a_named_node_per_call() {
    init_test_logging();

    let scheduler = Scheduler::<&str>::new();
    let timers = Timers::default();
    let log = Log::new();

    let clock = timers.clone();
    let hook_log = log.clone();
    let double = scheduler.root().action("double", move |cx, millis: u64| {
        hook_log.push(format!("call {millis}"));
        delay(cx, &clock, Duration::from_millis(millis)).map(move |()| millis * 2)
    });

    assert_eq!(double.name(), "double");

    let slow = double.call(20);
    let fast = double.call(10);
    assert_eq!(log.entries(), ["call 20", "call 10"]);

    let cx = scheduler.root();
    let both = cx.all([slow, fast]);

    timers.run();
    assert_eq!(both.peek(), Some(Ok(vec![40, 20])));
}

#[test]
fn test_action_called_in_a_body_does_not_hold_up_next_sibling() {
    init_test_logging();

    let scheduler = Scheduler::<&str>::new();
    let timers = Timers::default();
    let log = Log::new();

    let (outer, clock) = (log.clone(), timers.clone());
    let parent = scheduler.schedule("parent", move |cx, done| {
        let slow = cx.action("slow", move |cx, millis: u64| {
            delay(cx, &clock, Duration::from_millis(millis)).map(move |()| millis)
        });

        let settled = outer.clone();
        slow.call(1000)
            .on_settle(move |outcome| settled.push(format!("slow settled {outcome:?}")));

        let next = outer.clone();
        cx.schedule("next", move |_, done| {
            next.push("next began");
            done.resolve(());
            Ok(())
        });

        done.resolve(());
        Ok(())
    });

    assert_eq!(log.entries(), ["next began"]);
    assert_eq!(parent.peek(), Some(Ok(())));

    timers.run();
    assert_eq!(log.entries(), ["next began", "slow settled Ok(1000)"]);
    assert_eq!(scheduler.live_nodes(), 0);
}
