//! Fork/await and parallel fan-out from synchronous and asynchronous callers.

use effio::effect::{Effect, EffectError};
use effio::parallel::{self, TaskOutcome, await_task, fork_io, fork_task};
use rstest::rstest;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

fn delayed(millis: u64, log: &Arc<Mutex<Vec<u64>>>) -> Effect<u64> {
    let log = log.clone();
    Effect::sleep(Duration::from_millis(millis)).map(move |()| {
        log.lock().unwrap().push(millis);
        millis
    })
}

#[rstest]
fn fork_returns_before_the_effect_finishes() {
    let handle = fork_task(Effect::sleep(Duration::from_millis(100)).map(|()| "late"));
    assert!(!handle.is_finished());
    assert_eq!(await_task(&handle).run(), "late");
    assert!(handle.is_finished());
}

#[rstest]
fn forked_side_effects_run_without_awaiting() {
    let counter = Arc::new(AtomicUsize::new(0));
    let shared = counter.clone();
    let handle = fork_io(Effect::from_effectful(move || shared.fetch_add(1, Ordering::SeqCst)));

    let deadline = Instant::now() + Duration::from_secs(5);
    while !handle.is_finished() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(handle.outcome(), Some(&TaskOutcome::Completed(())));
}

#[rstest]
fn failure_in_forked_task_surfaces_on_await() {
    let handle: parallel::TaskHandle<String> =
        fork_task(Effect::lift_async(async { panic!("remote failure") }));

    assert_eq!(
        await_task(&handle).try_run(),
        Err(EffectError::Panicked {
            message: "remote failure".to_string()
        })
    );
}

#[rstest]
fn sequence_results_follow_input_order() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let effects = vec![delayed(90, &log), delayed(10, &log), delayed(50, &log)];

    assert_eq!(parallel::sequence(effects).run(), vec![90, 10, 50]);
    assert_eq!(*log.lock().unwrap(), vec![10, 50, 90]);
}

#[rstest]
fn sequence_forks_only_when_run() {
    let counter = Arc::new(AtomicUsize::new(0));
    let effects: Vec<Effect<usize>> = (0..4)
        .map(|_| {
            let counter = counter.clone();
            Effect::from_effectful(move || counter.fetch_add(1, Ordering::SeqCst))
        })
        .collect();

    let effect = parallel::sequence(effects);
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    let mut values = effect.run();
    values.sort_unstable();
    assert_eq!(values, vec![0, 1, 2, 3]);
}

#[rstest]
fn iter_sequence_waits_for_every_effect() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let effects = vec![delayed(30, &log), delayed(5, &log)];
    parallel::iter_sequence(effects).run();
    assert_eq!(log.lock().unwrap().len(), 2);
}

#[rstest]
fn traverse_fans_out_over_items() {
    let started = Instant::now();
    let effect = parallel::traverse(1..=6_u64, |x| {
        Effect::sleep(Duration::from_millis(100)).map(move |()| x * x)
    });
    assert_eq!(effect.run(), vec![1, 4, 9, 16, 25, 36]);
    assert!(started.elapsed() < Duration::from_millis(500));
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn resolve_awaits_forked_tasks_inside_a_runtime() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let effects = vec![delayed(20, &log), delayed(1, &log)];
    assert_eq!(parallel::sequence(effects).resolve().await, vec![20, 1]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn run_blocks_in_place_inside_a_multi_thread_runtime() {
    let handle = fork_task(Effect::sleep(Duration::from_millis(5)).map(|()| 11));
    assert_eq!(await_task(&handle).run(), 11);
}

#[rstest]
#[tokio::test(flavor = "current_thread")]
async fn awaiting_inside_a_current_thread_runtime_uses_resolve() {
    let handle = fork_task(Effect::lift_async(async { 3 }));
    assert_eq!(await_task(&handle).await, 3);
}

#[rstest]
#[tokio::test(flavor = "current_thread")]
async fn fork_inside_a_current_thread_runtime_runs_on_a_worker() {
    let ran = Arc::new(AtomicBool::new(false));
    let flag = ran.clone();
    let handle = fork_task(Effect::from_effectful(move || {
        flag.store(true, Ordering::SeqCst);
        std::thread::current().id()
    }));

    // The caller's only thread is blocked, so progress must come from elsewhere.
    std::thread::sleep(Duration::from_millis(300));
    assert!(ran.load(Ordering::SeqCst));

    let worker = await_task(&handle).await;
    assert_ne!(worker, std::thread::current().id());
}

#[rstest]
fn forked_task_outlives_the_runtime_that_forked_it() {
    let handle = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(async {
            fork_task(Effect::sleep(Duration::from_millis(20)).map(|()| "done"))
        });

    assert_eq!(await_task(&handle).run(), "done");
}
