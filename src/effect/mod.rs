//! Deferred effects.
//!
//! An [`Effect<T>`] is an immutable description of a computation that may
//! perform side effects and eventually produces a `T`. Building or composing
//! effects never performs anything; only the evaluator ([`Effect::run`],
//! [`Effect::try_run`] or awaiting [`Effect::resolve`]) does.
//!
//! # Representation
//!
//! An effect is exactly one of three steps:
//!
//! - [`Effect::Pure`]: a completed value.
//! - [`Effect::Deferred`]: a suspended synchronous step. Evaluating it
//!   performs a side effect and yields the next step.
//! - [`Effect::Suspended`]: a suspended asynchronous step. Awaiting it yields
//!   the next step without occupying a worker thread.
//!
//! # Examples
//!
//! ```rust
//! use effio::effect::Effect;
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicBool, Ordering};
//!
//! let executed = Arc::new(AtomicBool::new(false));
//! let flag = executed.clone();
//!
//! let effect = Effect::from_effectful(move || {
//!     flag.store(true, Ordering::SeqCst);
//!     20
//! })
//! .map(|x| x + 1)
//! .bind(|x| Effect::pure(x * 2));
//!
//! // Nothing has run yet
//! assert!(!executed.load(Ordering::SeqCst));
//!
//! assert_eq!(effect.run(), 42);
//! assert!(executed.load(Ordering::SeqCst));
//! ```

mod continuation;
mod eff_macro;
mod error;
mod evaluator;
mod monad;
mod recover;

pub use error::{EffectError, panic_message};
pub use evaluator::Step;

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::time::Duration;

use futures::future::BoxFuture;

use continuation::{Continuations, Erased};

// =============================================================================
// Effect Definition
// =============================================================================

/// A deferred, possibly asynchronous, side-effecting computation.
///
/// # Type Parameters
///
/// - `T`: The type of the value produced when the effect is run.
///
/// # Laws
///
/// Observed through [`Effect::run`], `Effect` satisfies the monad laws:
///
/// - **Left Identity**: `Effect::pure(a).bind(f).run() == f(a).run()`
/// - **Right Identity**: `m.bind(Effect::pure).run() == m.run()`
/// - **Associativity**: `m.bind(f).bind(g).run() == m.bind(|x| f(x).bind(g)).run()`
///
/// # Stack Safety
///
/// Chains of any length, nested either way, evaluate in constant stack
/// depth. `bind` on a deferred or suspended step appends to a queue of
/// type-erased continuations instead of wrapping closures in closures.
///
/// # Single Use
///
/// Effects own `FnOnce` steps, so an effect value is consumed by running it.
/// Combinators that repeat an effect take a factory closure instead.
pub enum Effect<T> {
    /// A completed value requiring no further work.
    Pure(T),
    /// A suspended synchronous step.
    Deferred(Deferred<T>),
    /// A suspended asynchronous step.
    Suspended(Suspended<T>),
}

/// Payload of [`Effect::Deferred`].
///
/// Holds the thunk to invoke and the continuations to apply to its outcome.
pub struct Deferred<T> {
    thunk: Box<dyn FnOnce() -> Effect<Erased> + Send>,
    continuations: Continuations,
    _result: PhantomData<fn() -> T>,
}

/// Payload of [`Effect::Suspended`].
///
/// Holds the pending asynchronous operation and the continuations to apply
/// to the step it yields.
pub struct Suspended<T> {
    pending: BoxFuture<'static, Effect<Erased>>,
    continuations: Continuations,
    _result: PhantomData<fn() -> T>,
}

impl<T> Deferred<T> {
    fn from_thunk(thunk: Box<dyn FnOnce() -> Effect<Erased> + Send>) -> Self {
        Self {
            thunk,
            continuations: Continuations::new(),
            _result: PhantomData,
        }
    }

    #[inline]
    fn retype<U>(self) -> Deferred<U> {
        Deferred {
            thunk: self.thunk,
            continuations: self.continuations,
            _result: PhantomData,
        }
    }
}

impl<T> Suspended<T> {
    fn from_pending(pending: BoxFuture<'static, Effect<Erased>>) -> Self {
        Self {
            pending,
            continuations: Continuations::new(),
            _result: PhantomData,
        }
    }

    #[inline]
    fn retype<U>(self) -> Suspended<U> {
        Suspended {
            pending: self.pending,
            continuations: self.continuations,
            _result: PhantomData,
        }
    }
}

// =============================================================================
// Construction Primitives
// =============================================================================

impl<T: Send + 'static> Effect<T> {
    /// Wraps a value in a completed effect.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effio::effect::Effect;
    ///
    /// assert_eq!(Effect::pure(42).run(), 42);
    /// ```
    #[inline]
    pub const fn pure(value: T) -> Self {
        Self::Pure(value)
    }

    /// Wraps a synchronous side-effecting function.
    ///
    /// The function runs exactly once, when the effect is evaluated, and never
    /// at construction time.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effio::effect::Effect;
    ///
    /// let effect = Effect::from_effectful(|| 1 + 1);
    /// assert_eq!(effect.run(), 2);
    /// ```
    pub fn from_effectful<F>(action: F) -> Self
    where
        F: FnOnce() -> T + Send + 'static,
    {
        Self::Deferred(Deferred::from_thunk(Box::new(move || {
            Effect::Pure(Box::new(action()) as Erased)
        })))
    }

    /// Defers the construction of an effect until evaluation.
    ///
    /// This is the general `Deferred` constructor; loop bodies use it so they
    /// are not built eagerly.
    pub fn defer<F>(thunk: F) -> Self
    where
        F: FnOnce() -> Self + Send + 'static,
    {
        Self::Deferred(Deferred::from_thunk(Box::new(move || thunk().erase())))
    }

    /// Lifts an asynchronous operation into an effect.
    ///
    /// The future is only polled when the effect is evaluated. Futures that
    /// need an ambient runtime at creation time (timers, sockets) should go
    /// through [`Effect::from_async`] instead.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effio::effect::Effect;
    ///
    /// let effect = Effect::lift_async(async { 6 * 7 });
    /// assert_eq!(effect.run(), 42);
    /// ```
    pub fn lift_async<Fut>(future: Fut) -> Self
    where
        Fut: Future<Output = T> + Send + 'static,
    {
        Self::Suspended(Suspended::from_pending(Box::pin(async move {
            Effect::Pure(Box::new(future.await) as Erased)
        })))
    }

    /// Lifts an asynchronous operation whose future is created on first poll.
    ///
    /// The closure is invoked inside the async context that drives the effect,
    /// so it may create runtime-bound resources.
    pub fn from_async<F, Fut>(action: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        Self::lift_async(async move { action().await })
    }

    /// Suspends on a future that yields the next step of the computation.
    ///
    /// This is the general `Suspended` constructor.
    pub fn suspend<Fut>(future: Fut) -> Self
    where
        Fut: Future<Output = Self> + Send + 'static,
    {
        Self::Suspended(Suspended::from_pending(Box::pin(async move {
            future.await.erase()
        })))
    }

    /// Converts this effect into its type-erased form.
    ///
    /// Deferred and suspended steps are already erased internally, so only a
    /// pure value needs boxing.
    pub(crate) fn erase(self) -> Effect<Erased> {
        match self {
            Self::Pure(value) => Effect::Pure(Box::new(value) as Erased),
            Self::Deferred(deferred) => Effect::Deferred(deferred.retype()),
            Self::Suspended(suspended) => Effect::Suspended(suspended.retype()),
        }
    }
}

impl Effect<()> {
    /// The effect that does nothing and yields `()`.
    #[inline]
    pub const fn unit() -> Self {
        Self::Pure(())
    }

    /// Waits for `duration` without blocking a worker thread.
    ///
    /// The timer is created when the effect is evaluated.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effio::effect::Effect;
    /// use std::time::Duration;
    ///
    /// Effect::sleep(Duration::from_millis(5)).run();
    /// ```
    pub fn sleep(duration: Duration) -> Self {
        Self::from_async(move || tokio::time::sleep(duration))
    }
}

// =============================================================================
// Debug Implementation
// =============================================================================

impl<T: fmt::Debug> fmt::Debug for Effect<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pure(value) => formatter.debug_tuple("Pure").field(value).finish(),
            Self::Deferred(deferred) => formatter
                .debug_struct("Deferred")
                .field("thunk", &"<thunk>")
                .field("continuations", &deferred.continuations.len())
                .finish(),
            Self::Suspended(suspended) => formatter
                .debug_struct("Suspended")
                .field("pending", &"<pending>")
                .field("continuations", &suspended.continuations.len())
                .finish(),
        }
    }
}
