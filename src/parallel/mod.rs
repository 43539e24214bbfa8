//! Fork/await concurrency and parallel fan-out.
//!
//! Forking is the only source of concurrency: [`fork_task`] hands an effect
//! to the worker runtime and returns a [`TaskHandle`] immediately. Awaiting
//! the handle with [`await_task`] suspends the awaiting effect, without
//! holding a worker thread, until the forked effect has finished.
//!
//! # Examples
//!
//! ```rust
//! use effio::effect::Effect;
//! use effio::parallel::{await_task, fork_task};
//!
//! let handle = fork_task(Effect::from_effectful(|| 6 * 7));
//! assert_eq!(await_task(&handle).run(), 42);
//! // A handle can be awaited any number of times.
//! assert_eq!(await_task(&handle).run(), 42);
//! ```

pub mod runtime;

use std::fmt;
use std::panic::{AssertUnwindSafe, resume_unwind};
use std::sync::{Arc, OnceLock};

use futures::FutureExt;
use tokio::sync::Notify;

use crate::combinators;
use crate::effect::{Effect, panic_message};

// =============================================================================
// Task Handle
// =============================================================================

/// Final state of a forked effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome<T> {
    /// The effect produced a value.
    Completed(T),
    /// The effect panicked with the given message.
    Failed(String),
}

struct TaskCell<T> {
    slot: OnceLock<TaskOutcome<T>>,
    notify: Notify,
}

/// An awaitable reference to the eventual result of a forked effect.
///
/// The handle is completed at most once, by the worker running the effect.
/// Clones share the same result slot.
pub struct TaskHandle<T> {
    cell: Arc<TaskCell<T>>,
}

impl<T> Clone for TaskHandle<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TaskHandle")
            .field("finished", &self.is_finished())
            .finish()
    }
}

impl<T> TaskHandle<T> {
    fn pending() -> Self {
        Self {
            cell: Arc::new(TaskCell {
                slot: OnceLock::new(),
                notify: Notify::new(),
            }),
        }
    }

    fn completed(value: T) -> Self {
        Self {
            cell: Arc::new(TaskCell {
                slot: OnceLock::from(TaskOutcome::Completed(value)),
                notify: Notify::new(),
            }),
        }
    }

    fn complete(&self, outcome: TaskOutcome<T>) {
        if self.cell.slot.set(outcome).is_err() {
            tracing::warn!("task handle completed twice; keeping the first outcome");
        }
        self.cell.notify.notify_waiters();
    }

    /// Returns `true` once the forked effect has completed or failed.
    pub fn is_finished(&self) -> bool {
        self.cell.slot.get().is_some()
    }

    /// Returns the outcome if the forked effect has finished.
    pub fn outcome(&self) -> Option<&TaskOutcome<T>> {
        self.cell.slot.get()
    }
}

impl<T: Clone> TaskHandle<T> {
    async fn wait(self) -> TaskOutcome<T> {
        loop {
            let notified = self.cell.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if let Some(outcome) = self.cell.slot.get() {
                return outcome.clone();
            }
            notified.await;
        }
    }
}

impl<T> TaskOutcome<T> {
    /// Yields the value, or re-raises the task's panic.
    fn into_value(self) -> T {
        match self {
            Self::Completed(value) => value,
            Self::Failed(message) => resume_unwind(Box::new(message)),
        }
    }
}

// =============================================================================
// Fork and Await
// =============================================================================

/// Starts evaluating `effect` on the worker runtime and returns its handle.
///
/// A pure effect needs no work, so its handle is completed immediately and
/// nothing is scheduled. A panic inside the forked effect is stored in the
/// handle and re-raised by every [`await_task`] on it.
pub fn fork_task<T>(effect: Effect<T>) -> TaskHandle<T>
where
    T: Send + Sync + 'static,
{
    if let Effect::Pure(value) = effect {
        tracing::trace!("fork of a pure effect; handle pre-completed");
        return TaskHandle::completed(value);
    }

    let handle = TaskHandle::pending();
    let completion = handle.clone();
    tracing::trace!("forking effect onto the worker runtime");
    runtime::worker_handle().spawn(async move {
        let outcome = match AssertUnwindSafe(effect.resolve()).catch_unwind().await {
            Ok(value) => TaskOutcome::Completed(value),
            Err(payload) => TaskOutcome::Failed(panic_message(payload.as_ref())),
        };
        completion.complete(outcome);
    });
    handle
}

/// Starts evaluating `effect` on the worker runtime, discarding its value.
///
/// The returned handle only reports completion.
pub fn fork_io<T: Send + 'static>(effect: Effect<T>) -> TaskHandle<()> {
    fork_task(effect.map(|_| ()))
}

/// An effect that waits for `handle` and yields its value.
///
/// Waiting is a suspension point, so no worker thread is held while the
/// forked effect runs. A finished handle yields without suspending.
///
/// # Panics
///
/// Evaluating the returned effect re-raises the forked effect's panic.
pub fn await_task<T>(handle: &TaskHandle<T>) -> Effect<T>
where
    T: Clone + Send + Sync + 'static,
{
    let handle = handle.clone();
    Effect::defer(move || match handle.outcome() {
        Some(outcome) => Effect::pure(outcome.clone().into_value()),
        None => Effect::from_async(move || handle.wait()).map(TaskOutcome::into_value),
    })
}

impl<T: Send + Sync + 'static> Effect<T> {
    /// An effect that forks this effect when evaluated and yields the handle.
    ///
    /// Unlike [`fork_task`], nothing starts until the returned effect runs.
    pub fn fork(self) -> Effect<TaskHandle<T>> {
        Effect::from_effectful(move || fork_task(self))
    }
}

// =============================================================================
// Parallel Fan-out
// =============================================================================

/// Forks `effect` for a single owner and returns the effect that awaits it.
///
/// The result is moved out of the spawned task rather than shared, so no
/// `Clone` or `Sync` bound is needed. A panic in the task is re-raised with
/// its original payload.
fn fork_owned<T: Send + 'static>(effect: Effect<T>) -> Effect<T> {
    if let Effect::Pure(value) = effect {
        return Effect::Pure(value);
    }

    let join = runtime::worker_handle().spawn(effect.resolve());
    Effect::lift_async(async move {
        match join.await {
            Ok(value) => value,
            Err(error) => match error.try_into_panic() {
                Ok(payload) => resume_unwind(payload),
                Err(error) => panic!("forked task did not complete: {error}"),
            },
        }
    })
}

/// Runs all effects concurrently and collects their results in input order.
///
/// Every effect is forked when the returned effect is evaluated; results are
/// then awaited in input order, whatever order the tasks finish in. Each
/// result is moved to the caller, so `T` need not be `Clone`.
///
/// # Examples
///
/// ```rust
/// use effio::effect::Effect;
/// use effio::parallel;
/// use std::time::Duration;
///
/// let effects = [30_u64, 10, 20].map(|delay| {
///     Effect::sleep(Duration::from_millis(delay)).map(move |()| delay)
/// });
/// assert_eq!(parallel::sequence(effects).run(), vec![30, 10, 20]);
/// ```
pub fn sequence<T, I>(effects: I) -> Effect<Vec<T>>
where
    T: Send + 'static,
    I: IntoIterator<Item = Effect<T>>,
{
    let effects: Vec<Effect<T>> = effects.into_iter().collect();
    Effect::defer(move || {
        let pending: Vec<Effect<T>> = effects.into_iter().map(fork_owned).collect();
        combinators::sequence(pending)
    })
}

/// Runs all effects concurrently and waits for all of them, discarding the
/// results.
pub fn iter_sequence<T, I>(effects: I) -> Effect<()>
where
    T: Send + 'static,
    I: IntoIterator<Item = Effect<T>>,
{
    let effects: Vec<Effect<T>> = effects.into_iter().collect();
    Effect::defer(move || {
        let handles: Vec<TaskHandle<()>> = effects.into_iter().map(fork_io).collect();
        combinators::iter_m(handles, |handle| await_task(&handle))
    })
}

/// Maps every item to an effect and runs those effects concurrently,
/// collecting the results in input order.
///
/// `function` is applied when the returned effect is evaluated.
pub fn traverse<T, I, F>(items: I, function: F) -> Effect<Vec<T>>
where
    T: Send + 'static,
    I: IntoIterator,
    I::IntoIter: Send + 'static,
    F: FnMut(I::Item) -> Effect<T> + Send + 'static,
{
    let items = items.into_iter();
    Effect::defer(move || sequence(items.map(function)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[rstest]
    fn fork_of_pure_is_pre_completed() {
        let handle = fork_task(Effect::pure(5));
        assert!(handle.is_finished());
        assert_eq!(handle.outcome(), Some(&TaskOutcome::Completed(5)));
        assert_eq!(await_task(&handle).run(), 5);
    }

    #[rstest]
    fn fork_runs_the_effect_without_awaiting() {
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = ran.clone();
        let handle = fork_io(Effect::from_effectful(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        await_task(&handle).run();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[rstest]
    fn await_task_can_be_repeated() {
        let handle = fork_task(Effect::sleep(Duration::from_millis(5)).map(|()| "slow"));
        assert_eq!(await_task(&handle).run(), "slow");
        assert!(handle.is_finished());
        assert_eq!(await_task(&handle.clone()).run(), "slow");
    }

    #[rstest]
    fn failed_task_reraises_on_every_await() {
        let handle: TaskHandle<i32> = fork_task(Effect::from_effectful(|| panic!("worker died")));

        for _ in 0..2 {
            let error = await_task(&handle).try_run().unwrap_err();
            assert_eq!(error.to_string(), "effect panicked: worker died");
        }
        assert_eq!(
            handle.outcome(),
            Some(&TaskOutcome::Failed("worker died".to_string()))
        );
    }

    #[rstest]
    fn effect_fork_is_lazy() {
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = ran.clone();
        let forking = Effect::from_effectful(move || counter.fetch_add(1, Ordering::SeqCst)).fork();
        assert_eq!(ran.load(Ordering::SeqCst), 0);

        let value = forking.bind(|handle| await_task(&handle)).run();
        assert_eq!(value, 0);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[rstest]
    fn parallel_sequence_preserves_input_order() {
        let finished = Arc::new(Mutex::new(Vec::new()));
        let effects: Vec<Effect<u64>> = [60_u64, 5, 30]
            .into_iter()
            .map(|delay| {
                let finished = finished.clone();
                Effect::sleep(Duration::from_millis(delay)).map(move |()| {
                    finished.lock().unwrap().push(delay);
                    delay
                })
            })
            .collect();

        assert_eq!(sequence(effects).run(), vec![60, 5, 30]);
        assert_eq!(*finished.lock().unwrap(), vec![5, 30, 60]);
    }

    #[rstest]
    fn parallel_sequence_runs_concurrently() {
        let started = std::time::Instant::now();
        let effects = (0..8).map(|_| Effect::sleep(Duration::from_millis(100)));
        iter_sequence(effects).run();
        assert!(started.elapsed() < Duration::from_millis(700));
    }

    struct Connection {
        id: usize,
    }

    #[rstest]
    fn parallel_sequence_moves_non_clone_results() {
        let effects = (0..3).map(|id| Effect::from_effectful(move || Connection { id }));
        let ids: Vec<usize> = sequence(effects)
            .run()
            .into_iter()
            .map(|connection| connection.id)
            .collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[rstest]
    fn parallel_sequence_reraises_the_task_panic() {
        let effects: Vec<Effect<i32>> = vec![
            Effect::pure(1),
            Effect::from_effectful(|| panic!("fan-out failure")),
        ];
        let error = sequence(effects).try_run().unwrap_err();
        assert_eq!(error.to_string(), "effect panicked: fan-out failure");
    }

    #[rstest]
    fn parallel_traverse_maps_then_sequences() {
        let effect = traverse(vec![1, 2, 3], |x| Effect::from_effectful(move || x * x));
        assert_eq!(effect.run(), vec![1, 4, 9]);
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn await_inside_async_context_does_not_block() {
        let handle = fork_task(Effect::sleep(Duration::from_millis(10)).map(|()| 7));
        assert_eq!(await_task(&handle).resolve().await, 7);
    }
}
