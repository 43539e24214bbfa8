//! Sequencing façade.
//!
//! Small free functions that read like the steps of a computation
//! expression. They are thin names over [`Effect`] operations, meant for code
//! that prefers `bind(effect, f)` over `effect.bind(f)`, together with the
//! [`eff!`](crate::eff) macro.
//!
//! # Examples
//!
//! ```rust
//! use effio::effect::Effect;
//! use effio::sequencing::{bind, combine, delay, ret, while_loop};
//! use std::sync::{Arc, Mutex};
//!
//! let total = Arc::new(Mutex::new(0));
//! let (guard, body) = (total.clone(), total.clone());
//!
//! let effect = combine(
//!     while_loop(
//!         move || *guard.lock().unwrap() < 10,
//!         move || {
//!             let body = body.clone();
//!             Effect::from_effectful(move || *body.lock().unwrap() += 3)
//!         },
//!     ),
//!     delay(move || bind(ret(*total.lock().unwrap()), |x| ret(x * 2))),
//! );
//! assert_eq!(effect.run(), 24);
//! ```

use crate::combinators;
use crate::effect::Effect;

/// Wraps a value in a completed effect (`return`).
#[inline]
pub const fn ret<T: Send + 'static>(value: T) -> Effect<T> {
    Effect::pure(value)
}

/// Returns an existing effect unchanged (`return!`).
#[inline]
pub const fn ret_from<T: Send + 'static>(effect: Effect<T>) -> Effect<T> {
    effect
}

/// Chains `function` after `effect`.
#[inline]
pub fn bind<T, U, F>(effect: Effect<T>, function: F) -> Effect<U>
where
    T: Send + 'static,
    U: Send + 'static,
    F: FnOnce(T) -> Effect<U> + Send + 'static,
{
    effect.bind(function)
}

/// Defers building an effect until it is evaluated.
#[inline]
pub fn delay<T, F>(thunk: F) -> Effect<T>
where
    T: Send + 'static,
    F: FnOnce() -> Effect<T> + Send + 'static,
{
    Effect::defer(thunk)
}

/// The effect that does nothing.
#[inline]
pub const fn zero() -> Effect<()> {
    Effect::unit()
}

/// Runs `first` for its side effects, then `second`.
#[inline]
pub fn combine<T: Send + 'static>(first: Effect<()>, second: Effect<T>) -> Effect<T> {
    first.then(second)
}

/// Runs `body` while `guard` returns `true`.
///
/// The guard is a plain function and is re-checked before every iteration,
/// at evaluation time.
pub fn while_loop<G, B>(mut guard: G, mut body: B) -> Effect<()>
where
    G: FnMut() -> bool + Send + 'static,
    B: FnMut() -> Effect<()> + Send + 'static,
{
    delay(move || {
        if guard() {
            body().bind(move |()| while_loop(guard, body))
        } else {
            zero()
        }
    })
}

/// Runs `body` for every item in order, discarding the results.
#[inline]
pub fn for_each<T, I, F>(items: I, body: F) -> Effect<()>
where
    T: Send + 'static,
    I: IntoIterator,
    I::IntoIter: Send + 'static,
    F: FnMut(I::Item) -> Effect<T> + Send + 'static,
{
    combinators::iter_m(items, body)
}
