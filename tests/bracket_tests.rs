//! Resource safety of `bracket`.

use effio::effect::{Effect, EffectError};
use effio::resource::bracket;
use rstest::rstest;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

fn acquire(counter: &Arc<AtomicI32>) -> Effect<Arc<AtomicI32>> {
    let counter = counter.clone();
    Effect::from_effectful(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        counter
    })
}

fn release(counter: Arc<AtomicI32>) -> Effect<()> {
    Effect::from_effectful(move || {
        counter.fetch_sub(1, Ordering::SeqCst);
    })
}

#[rstest]
fn release_runs_after_use_fails() {
    let counter = Arc::new(AtomicI32::new(0));
    let effect: Effect<()> = bracket(acquire(&counter), release, |resource| {
        Effect::from_effectful(move || {
            resource.fetch_add(1, Ordering::SeqCst);
            panic!("use raised");
        })
    });

    let result = effect.try_run();

    assert_eq!(
        result,
        Err(EffectError::Panicked {
            message: "use raised".to_string()
        })
    );
    // acquire +1, use +1, release -1
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[rstest]
fn release_runs_after_asynchronous_use_fails() {
    let counter = Arc::new(AtomicI32::new(0));
    let effect: Effect<()> = bracket(acquire(&counter), release, |_| {
        Effect::sleep(Duration::from_millis(2)).map(|()| panic!("late failure"))
    });

    assert!(effect.try_run().is_err());
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[rstest]
fn failure_unwinds_out_of_run() {
    let counter = Arc::new(AtomicI32::new(0));
    let shared = counter.clone();
    let outcome = std::panic::catch_unwind(move || {
        bracket(acquire(&shared), release, |_| -> Effect<i32> {
            Effect::from_effectful(|| panic!("unwinds"))
        })
        .run()
    });

    assert!(outcome.is_err());
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[rstest]
fn successful_use_returns_its_value() {
    let counter = Arc::new(AtomicI32::new(0));
    let effect = bracket(acquire(&counter), release, |resource| {
        Effect::from_effectful(move || resource.load(Ordering::SeqCst) + 41)
    });
    assert_eq!(effect.run(), 42);
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[rstest]
fn nested_brackets_release_in_reverse_order() {
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));
    let (outer_log, inner_log) = (order.clone(), order.clone());

    let effect = bracket(
        Effect::pure("outer"),
        move |name| Effect::from_effectful(move || outer_log.lock().unwrap().push(name)),
        move |_| {
            bracket(
                Effect::pure("inner"),
                move |name| Effect::from_effectful(move || inner_log.lock().unwrap().push(name)),
                |_| Effect::pure(()),
            )
        },
    );

    effect.run();
    assert_eq!(*order.lock().unwrap(), vec!["inner", "outer"]);
}

#[rstest]
fn failing_acquire_skips_use_and_release() {
    let effect: Effect<()> = bracket(
        Effect::from_effectful(|| -> i32 { panic!("acquire failed") }),
        |_| -> Effect<()> { panic!("release must not run") },
        |_| -> Effect<()> { panic!("use must not run") },
    );
    assert_eq!(
        effect.try_run(),
        Err(EffectError::Panicked {
            message: "acquire failed".to_string()
        })
    );
}
