//! Trampoline evaluator for [`Effect`].
//!
//! The evaluator unwinds chained steps with an explicit loop and an explicit
//! continuation queue, never with host recursion:
//!
//! - [`Effect::drive_to_suspension`] runs synchronous steps until it reaches
//!   either a value or a real asynchronous suspension point. It never blocks.
//! - [`Effect::resolve`] keeps going through suspension points by awaiting
//!   them, producing one future for the whole chain.
//! - [`Effect::run`] is the blocking entry point. It is the only place where a
//!   thread waits for an effect to finish.

use std::future::IntoFuture;
use std::panic::{AssertUnwindSafe, catch_unwind};

use futures::future::BoxFuture;

use super::continuation::{Continuations, Erased, reveal};
use super::error::EffectError;
use super::{Deferred, Effect, Suspended};
use crate::parallel::runtime::{self, BlockingError};

/// Outcome of driving an effect until it can no longer make synchronous
/// progress.
///
/// # Examples
///
/// ```rust
/// use effio::effect::{Effect, Step};
///
/// match Effect::from_effectful(|| 3).drive_to_suspension() {
///     Step::Complete(value) => assert_eq!(value, 3),
///     Step::Pending(_) => unreachable!("no asynchronous step involved"),
/// }
/// ```
pub enum Step<T> {
    /// Evaluation reached a value.
    Complete(T),
    /// Evaluation reached an asynchronous operation that has to be awaited.
    Pending(Suspended<T>),
}

impl<T> std::fmt::Debug for Step<T> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Complete(_) => formatter.write_str("Complete(..)"),
            Self::Pending(_) => formatter.write_str("Pending(..)"),
        }
    }
}

/// Internal result of [`drive`].
enum Progress {
    Done(Erased),
    Blocked {
        pending: BoxFuture<'static, Effect<Erased>>,
        continuations: Continuations,
    },
}

/// Unwinds synchronous steps of an erased effect.
///
/// `continuations` are the arrows still to be applied after `current`
/// produces a value.
fn drive(mut current: Effect<Erased>, mut continuations: Continuations) -> Progress {
    loop {
        match current {
            Effect::Pure(value) => match continuations.pop() {
                None => return Progress::Done(value),
                Some(arrow) => current = arrow.apply(value),
            },
            Effect::Deferred(Deferred {
                thunk,
                continuations: inner,
                ..
            }) => {
                continuations.prepend(inner);
                current = thunk();
            }
            Effect::Suspended(Suspended {
                pending,
                continuations: inner,
                ..
            }) => {
                continuations.prepend(inner);
                return Progress::Blocked {
                    pending,
                    continuations,
                };
            }
        }
    }
}

impl<T: Send + 'static> Effect<T> {
    /// Splits this effect into an erased step and its continuations.
    fn into_machine(self) -> (Effect<Erased>, Continuations) {
        let erased = match self {
            Self::Pure(value) => Effect::Pure(Box::new(value) as Erased),
            Self::Deferred(deferred) => Effect::Deferred(deferred.retype()),
            Self::Suspended(suspended) => Effect::Suspended(suspended.retype()),
        };
        (erased, Continuations::new())
    }

    /// Runs synchronous steps until a value or an asynchronous suspension
    /// point is reached.
    ///
    /// Never blocks. A pure effect is returned as [`Step::Complete`] and a
    /// suspended one is returned unchanged as [`Step::Pending`].
    pub fn drive_to_suspension(self) -> Step<T> {
        match self {
            Self::Pure(value) => Step::Complete(value),
            Self::Suspended(suspended) => Step::Pending(suspended),
            Self::Deferred(deferred) => {
                match drive(Effect::Deferred(deferred.retype()), Continuations::new()) {
                    Progress::Done(value) => Step::Complete(reveal::<T>(value)),
                    Progress::Blocked {
                        pending,
                        continuations,
                    } => Step::Pending(Suspended {
                        pending,
                        continuations,
                        _result: std::marker::PhantomData,
                    }),
                }
            }
        }
    }

    /// Evaluates the whole effect asynchronously.
    ///
    /// Suspension points are awaited cooperatively, so the returned future
    /// does not hold a worker thread while waiting.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effio::effect::Effect;
    ///
    /// # tokio::runtime::Runtime::new().unwrap().block_on(async {
    /// let effect = Effect::lift_async(async { 20 }).map(|x| x + 22);
    /// assert_eq!(effect.resolve().await, 42);
    /// # });
    /// ```
    pub async fn resolve(self) -> T {
        let (mut current, mut continuations) = self.into_machine();
        loop {
            match drive(current, continuations) {
                Progress::Done(value) => return reveal::<T>(value),
                Progress::Blocked {
                    pending,
                    continuations: rest,
                } => {
                    current = pending.await;
                    continuations = rest;
                }
            }
        }
    }

    /// Evaluates the effect on the calling thread, blocking at suspension
    /// points.
    fn evaluate(self) -> Result<T, BlockingError> {
        let (mut current, mut continuations) = self.into_machine();
        loop {
            match drive(current, continuations) {
                Progress::Done(value) => return Ok(reveal::<T>(value)),
                Progress::Blocked {
                    pending,
                    continuations: rest,
                } => {
                    current = runtime::try_run_blocking(pending)?;
                    continuations = rest;
                }
            }
        }
    }

    /// Runs the effect to completion and returns its value.
    ///
    /// Synchronous steps run on the calling thread. At an asynchronous
    /// suspension point the calling thread blocks until the operation
    /// completes. A failure anywhere in the chain unwinds out of `run`.
    ///
    /// # Panics
    ///
    /// - Re-raises any panic raised while evaluating the effect.
    /// - Panics if the effect suspends while `run` is called from inside a
    ///   current-thread tokio runtime. Use [`Effect::resolve`] there.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effio::effect::Effect;
    ///
    /// assert_eq!(Effect::pure(42).run(), 42);
    /// ```
    pub fn run(self) -> T {
        match self.evaluate() {
            Ok(value) => value,
            Err(error) => panic!("Effect::run: {error}"),
        }
    }

    /// Runs the effect to completion, reporting failures as [`EffectError`].
    ///
    /// # Errors
    ///
    /// - [`EffectError::Panicked`] if any step panicked.
    /// - [`EffectError::Blocking`] if the effect suspended inside a runtime
    ///   that cannot be blocked.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effio::effect::{Effect, EffectError};
    ///
    /// let failing: Effect<i32> = Effect::from_effectful(|| panic!("disk on fire"));
    /// assert_eq!(
    ///     failing.try_run(),
    ///     Err(EffectError::Panicked { message: "disk on fire".to_string() })
    /// );
    /// ```
    pub fn try_run(self) -> Result<T, EffectError> {
        match catch_unwind(AssertUnwindSafe(move || self.evaluate())) {
            Ok(result) => result.map_err(EffectError::from),
            Err(payload) => Err(EffectError::from_panic(payload.as_ref())),
        }
    }
}

impl<T: Send + 'static> IntoFuture for Effect<T> {
    type Output = T;
    type IntoFuture = BoxFuture<'static, T>;

    /// Allows `effect.await` as a shorthand for `effect.resolve().await`.
    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.resolve())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::{Arc, Mutex};

    fn count_down(n: u64) -> Effect<u64> {
        if n == 0 {
            Effect::pure(0)
        } else {
            Effect::defer(move || count_down(n - 1))
        }
    }

    #[rstest]
    fn drive_to_suspension_completes_synchronous_chains() {
        let step = Effect::from_effectful(|| 2).map(|x| x * 21).drive_to_suspension();
        assert!(matches!(step, Step::Complete(42)));
    }

    #[rstest]
    fn drive_to_suspension_stops_at_asynchronous_steps() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let before = log.clone();
        let after = log.clone();

        let effect = Effect::from_effectful(move || before.lock().unwrap().push("before"))
            .then(Effect::lift_async(async { 1 }))
            .map(move |x| {
                after.lock().unwrap().push("after");
                x + 1
            });

        let step = effect.drive_to_suspension();
        assert!(matches!(step, Step::Pending(_)));
        assert_eq!(*log.lock().unwrap(), vec!["before"]);

        let Step::Pending(suspended) = step else {
            unreachable!()
        };
        assert_eq!(Effect::Suspended(suspended).run(), 2);
        assert_eq!(*log.lock().unwrap(), vec!["before", "after"]);
    }

    #[rstest]
    fn run_is_stack_safe_for_deep_deferral() {
        assert_eq!(count_down(200_000).run(), 0);
    }

    #[rstest]
    fn run_crosses_many_suspension_points() {
        fn ping(n: u32) -> Effect<u32> {
            if n == 0 {
                Effect::pure(0)
            } else {
                Effect::lift_async(async move { n - 1 }).bind(ping)
            }
        }
        assert_eq!(ping(1_000).run(), 0);
    }

    #[rstest]
    #[tokio::test]
    async fn resolve_awaits_without_blocking() {
        let effect =
            Effect::lift_async(async { 40 }).bind(|x| Effect::from_effectful(move || x + 2));
        assert_eq!(effect.resolve().await, 42);
    }

    #[rstest]
    #[tokio::test]
    async fn effects_can_be_awaited_directly() {
        assert_eq!(Effect::from_effectful(|| "awaited").await, "awaited");
    }

    #[rstest]
    fn try_run_reports_panics() {
        let effect: Effect<()> = Effect::from_effectful(|| panic!("boom"));
        assert_eq!(
            effect.try_run(),
            Err(EffectError::Panicked {
                message: "boom".to_string()
            })
        );
    }

    #[rstest]
    #[tokio::test(flavor = "current_thread")]
    async fn try_run_reports_blocking_inside_current_thread_runtime() {
        let effect = Effect::lift_async(async { 1 });
        assert_eq!(
            effect.try_run(),
            Err(EffectError::Blocking(BlockingError::CurrentThreadRuntime))
        );
    }

    #[rstest]
    #[tokio::test(flavor = "current_thread")]
    async fn synchronous_effects_run_inside_current_thread_runtime() {
        assert_eq!(Effect::from_effectful(|| 7).run(), 7);
    }
}
