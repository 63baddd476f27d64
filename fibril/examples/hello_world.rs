//! Example: timed greetings on the task tree
//!
//! Run with `FIBRIL_LOG=fibril=debug` to watch the walk.

use fibril::time::{Timers, delay};
use fibril::{Future, Scope};
use std::time::Duration;

use tracing_subscriber::EnvFilter;

fn greet(cx: &Scope<&'static str>, timers: &Timers) -> Future<(), &'static str> {
    let timers = timers.clone();

    cx.resolved(1).chain(move |cx, _| {
        let clock = timers.clone();

        delay(cx, &timers, Duration::from_secs(1))
            .map(move |()| println!("[{:?}] Hello", clock.now()))
            .chain(move |cx, ()| delay(cx, &timers, Duration::from_secs(1)))
            .map(|()| println!("World!"))
    })
}

#[fibril::main]
fn main() {
    let filter = EnvFilter::try_from_env("FIBRIL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let timers = runtime.timers().clone();
    let cx = runtime.scheduler().root();

    cx.all([
        delay(&cx, &timers, Duration::from_secs(5)),
        delay(&cx, &timers, Duration::from_secs(10)),
    ])
    .on_settle({
        let timers = timers.clone();
        move |_| println!("[{:?}] Done!", timers.now())
    });

    if let Err(error) = runtime.block_on(|cx| greet(cx, &timers)) {
        eprintln!("greeting failed: {error}");
    }
}
