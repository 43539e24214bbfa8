//! Panic recovery for [`Effect`].
//!
//! A panic raised by any step of an effect, synchronous or asynchronous,
//! aborts the remaining chain. The combinators here observe that abort and
//! turn it into a value.

use std::panic::{AssertUnwindSafe, catch_unwind};

use futures::FutureExt;

use super::error::panic_message;
use super::{Effect, Step};

impl<T: Send + 'static> Effect<T> {
    /// Captures a panic raised while evaluating this effect.
    ///
    /// Yields `Ok(value)` on success and `Err(payload)` with the original
    /// panic payload otherwise. Steps attached after `attempt` keep running.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effio::effect::Effect;
    ///
    /// let failing: Effect<i32> = Effect::from_effectful(|| panic!("nope"));
    /// assert!(failing.attempt().run().is_err());
    /// assert_eq!(Effect::pure(1).attempt().run().ok(), Some(1));
    /// ```
    pub fn attempt(self) -> Effect<std::thread::Result<T>> {
        Effect::defer(move || {
            match catch_unwind(AssertUnwindSafe(move || self.drive_to_suspension())) {
                Err(payload) => Effect::Pure(Err(payload)),
                Ok(Step::Complete(value)) => Effect::Pure(Ok(value)),
                Ok(Step::Pending(suspended)) => Effect::lift_async(async move {
                    AssertUnwindSafe(Effect::Suspended(suspended).resolve())
                        .catch_unwind()
                        .await
                }),
            }
        })
    }

    /// Recovers from a panic by mapping its message to a value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effio::effect::Effect;
    ///
    /// let failing: Effect<String> = Effect::from_effectful(|| panic!("bad input"));
    /// let recovered = failing.catch(|message| format!("recovered: {message}"));
    /// assert_eq!(recovered.run(), "recovered: bad input");
    /// ```
    pub fn catch<F>(self, handler: F) -> Self
    where
        F: FnOnce(String) -> T + Send + 'static,
    {
        self.attempt().map(move |result| match result {
            Ok(value) => value,
            Err(payload) => handler(panic_message(payload.as_ref())),
        })
    }
}
