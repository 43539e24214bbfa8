//! Effect-level loops.
//!
//! Effects are consumed by evaluation, so anything that is evaluated more
//! than once (loop predicates, bodies, producers) is passed as a factory
//! closure returning a fresh effect. Each iteration is chained with `bind`
//! from a deferred step, so loops run in constant stack depth no matter how
//! many times they iterate.

use std::convert::Infallible;

use crate::effect::Effect;

// =============================================================================
// Over a pure input sequence
// =============================================================================

/// Collects items while the effectful predicate holds.
///
/// Stops at the first item that fails the predicate; items after it are not
/// tested.
///
/// # Examples
///
/// ```rust
/// use effio::combinators::take_while_m;
/// use effio::effect::Effect;
///
/// let taken = take_while_m(vec![1, 2, 5, 1], |x| Effect::pure(*x < 3));
/// assert_eq!(taken.run(), vec![1, 2]);
/// ```
pub fn take_while_m<I, P>(items: I, predicate: P) -> Effect<Vec<I::Item>>
where
    I: IntoIterator,
    I::IntoIter: Send + 'static,
    I::Item: Send + 'static,
    P: FnMut(&I::Item) -> Effect<bool> + Send + 'static,
{
    let items = items.into_iter();
    Effect::defer(move || take_from(items, predicate, Vec::new()))
}

fn take_from<I, P>(
    mut items: I,
    mut predicate: P,
    mut taken: Vec<I::Item>,
) -> Effect<Vec<I::Item>>
where
    I: Iterator + Send + 'static,
    I::Item: Send + 'static,
    P: FnMut(&I::Item) -> Effect<bool> + Send + 'static,
{
    match items.next() {
        None => Effect::pure(taken),
        Some(item) => predicate(&item).bind(move |holds| {
            if holds {
                taken.push(item);
                take_from(items, predicate, taken)
            } else {
                Effect::pure(taken)
            }
        }),
    }
}

/// Drops the leading items for which the effectful predicate holds.
///
/// Returns the suffix starting at the first failing item; that suffix is not
/// tested further.
///
/// # Examples
///
/// ```rust
/// use effio::combinators::skip_while_m;
/// use effio::effect::Effect;
///
/// let rest = skip_while_m(vec![1, 2, 5, 1], |x| Effect::pure(*x < 3));
/// assert_eq!(rest.run(), vec![5, 1]);
/// ```
pub fn skip_while_m<I, P>(items: I, predicate: P) -> Effect<Vec<I::Item>>
where
    I: IntoIterator,
    I::IntoIter: Send + 'static,
    I::Item: Send + 'static,
    P: FnMut(&I::Item) -> Effect<bool> + Send + 'static,
{
    let items = items.into_iter();
    Effect::defer(move || skip_from(items, predicate))
}

fn skip_from<I, P>(mut items: I, mut predicate: P) -> Effect<Vec<I::Item>>
where
    I: Iterator + Send + 'static,
    I::Item: Send + 'static,
    P: FnMut(&I::Item) -> Effect<bool> + Send + 'static,
{
    match items.next() {
        None => Effect::pure(Vec::new()),
        Some(item) => predicate(&item).bind(move |holds| {
            if holds {
                skip_from(items, predicate)
            } else {
                Effect::pure(std::iter::once(item).chain(items).collect())
            }
        }),
    }
}

// =============================================================================
// Predicate driven loops
// =============================================================================

fn while_fold<S, T, P, B, F>(
    mut predicate: P,
    mut body: B,
    state: S,
    mut step: F,
) -> Effect<S>
where
    S: Send + 'static,
    T: Send + 'static,
    P: FnMut() -> Effect<bool> + Send + 'static,
    B: FnMut() -> Effect<T> + Send + 'static,
    F: FnMut(S, T) -> S + Send + 'static,
{
    predicate().bind(move |holds| {
        if holds {
            body().bind(move |value| {
                let next = step(state, value);
                while_fold(predicate, body, next, step)
            })
        } else {
            Effect::pure(state)
        }
    })
}

/// Runs `body` while `predicate` yields `true`, collecting the results.
///
/// # Examples
///
/// ```rust
/// use effio::combinators::while_m;
/// use effio::effect::Effect;
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicI32, Ordering};
///
/// let counter = Arc::new(AtomicI32::new(0));
/// let (read, bump) = (counter.clone(), counter.clone());
///
/// let effect = while_m(
///     move || {
///         let read = read.clone();
///         Effect::from_effectful(move || read.load(Ordering::SeqCst) < 5)
///     },
///     move || {
///         let bump = bump.clone();
///         Effect::from_effectful(move || bump.fetch_add(1, Ordering::SeqCst))
///     },
/// );
/// assert_eq!(effect.run(), vec![0, 1, 2, 3, 4]);
/// ```
pub fn while_m<T, P, B>(predicate: P, body: B) -> Effect<Vec<T>>
where
    T: Send + 'static,
    P: FnMut() -> Effect<bool> + Send + 'static,
    B: FnMut() -> Effect<T> + Send + 'static,
{
    Effect::defer(move || {
        while_fold(predicate, body, Vec::new(), |mut results, value| {
            results.push(value);
            results
        })
    })
}

/// Runs `body` while `predicate` yields `true`, discarding the results.
pub fn iter_while_m<T, P, B>(predicate: P, body: B) -> Effect<()>
where
    T: Send + 'static,
    P: FnMut() -> Effect<bool> + Send + 'static,
    B: FnMut() -> Effect<T> + Send + 'static,
{
    Effect::defer(move || while_fold(predicate, body, (), |(), _| ()))
}

fn negated<P>(mut predicate: P) -> impl FnMut() -> Effect<bool> + Send + 'static
where
    P: FnMut() -> Effect<bool> + Send + 'static,
{
    move || predicate().map(|holds| !holds)
}

/// Runs `body` until `predicate` yields `true`, collecting the results.
pub fn until_m<T, P, B>(predicate: P, body: B) -> Effect<Vec<T>>
where
    T: Send + 'static,
    P: FnMut() -> Effect<bool> + Send + 'static,
    B: FnMut() -> Effect<T> + Send + 'static,
{
    while_m(negated(predicate), body)
}

/// Runs `body` until `predicate` yields `true`, discarding the results.
pub fn iter_until_m<T, P, B>(predicate: P, body: B) -> Effect<()>
where
    T: Send + 'static,
    P: FnMut() -> Effect<bool> + Send + 'static,
    B: FnMut() -> Effect<T> + Send + 'static,
{
    iter_while_m(negated(predicate), body)
}

/// Feeds values from `source` to `binder` until `source` yields `None`.
///
/// The binder results are collected in order; the final `None` is dropped.
///
/// # Examples
///
/// ```rust
/// use effio::combinators::while_some;
/// use effio::effect::Effect;
/// use std::sync::{Arc, Mutex};
///
/// let queue = Arc::new(Mutex::new(vec![3, 2, 1]));
/// let effect = while_some(
///     move || {
///         let queue = queue.clone();
///         Effect::from_effectful(move || queue.lock().unwrap().pop())
///     },
///     |x| Effect::pure(x * 10),
/// );
/// assert_eq!(effect.run(), vec![10, 20, 30]);
/// ```
pub fn while_some<A, B, S, F>(source: S, binder: F) -> Effect<Vec<B>>
where
    A: Send + 'static,
    B: Send + 'static,
    S: FnMut() -> Effect<Option<A>> + Send + 'static,
    F: FnMut(A) -> Effect<B> + Send + 'static,
{
    Effect::defer(move || while_some_from(source, binder, Vec::new()))
}

fn while_some_from<A, B, S, F>(
    mut source: S,
    mut binder: F,
    mut results: Vec<B>,
) -> Effect<Vec<B>>
where
    A: Send + 'static,
    B: Send + 'static,
    S: FnMut() -> Effect<Option<A>> + Send + 'static,
    F: FnMut(A) -> Effect<B> + Send + 'static,
{
    source().bind(move |next| match next {
        None => Effect::pure(results),
        Some(value) => binder(value).bind(move |result| {
            results.push(result);
            while_some_from(source, binder, results)
        }),
    })
}

// =============================================================================
// Iteration towards a value
// =============================================================================

/// Applies `step` repeatedly, starting from `seed`, until `predicate` holds.
///
/// The predicate is tested before each step, so a seed that already
/// satisfies it is returned without running `step`.
///
/// # Examples
///
/// ```rust
/// use effio::combinators::iterate_until_m;
/// use effio::effect::Effect;
///
/// let effect = iterate_until_m(|x: &u32| *x > 100, |x| Effect::pure(x * 3), 1);
/// assert_eq!(effect.run(), 243);
/// ```
pub fn iterate_until_m<A, P, F>(predicate: P, step: F, seed: A) -> Effect<A>
where
    A: Send + 'static,
    P: FnMut(&A) -> bool + Send + 'static,
    F: FnMut(A) -> Effect<A> + Send + 'static,
{
    Effect::defer(move || iterate_from(seed, predicate, step))
}

fn iterate_from<A, P, F>(current: A, mut predicate: P, mut step: F) -> Effect<A>
where
    A: Send + 'static,
    P: FnMut(&A) -> bool + Send + 'static,
    F: FnMut(A) -> Effect<A> + Send + 'static,
{
    if predicate(&current) {
        Effect::pure(current)
    } else {
        step(current).bind(move |next| iterate_from(next, predicate, step))
    }
}

/// Re-runs a fresh effect from `factory` until its value satisfies
/// `predicate`, returning that value.
///
/// The effect runs at least once.
pub fn iterate_until<T, P, F>(mut predicate: P, mut factory: F) -> Effect<T>
where
    T: Send + 'static,
    P: FnMut(&T) -> bool + Send + 'static,
    F: FnMut() -> Effect<T> + Send + 'static,
{
    Effect::defer(move || {
        factory().bind(move |first| iterate_from(first, predicate, move |_| factory()))
    })
}

/// Re-runs a fresh effect from `factory` while its value satisfies
/// `predicate`, returning the first value that does not.
///
/// The effect runs at least once.
pub fn iterate_while<T, P, F>(mut predicate: P, factory: F) -> Effect<T>
where
    T: Send + 'static,
    P: FnMut(&T) -> bool + Send + 'static,
    F: FnMut() -> Effect<T> + Send + 'static,
{
    iterate_until(move |value| !predicate(value), factory)
}

/// Collects values from `factory` while they satisfy `predicate`.
///
/// The first value failing the predicate ends the loop and is discarded.
///
/// # Examples
///
/// ```rust
/// use effio::combinators::unfold_while_m;
/// use effio::effect::Effect;
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU32, Ordering};
///
/// let counter = Arc::new(AtomicU32::new(0));
/// let effect = unfold_while_m(
///     |x: &u32| *x < 3,
///     move || {
///         let counter = counter.clone();
///         Effect::from_effectful(move || counter.fetch_add(1, Ordering::SeqCst))
///     },
/// );
/// assert_eq!(effect.run(), vec![0, 1, 2]);
/// ```
pub fn unfold_while_m<T, P, F>(predicate: P, factory: F) -> Effect<Vec<T>>
where
    T: Send + 'static,
    P: FnMut(&T) -> bool + Send + 'static,
    F: FnMut() -> Effect<T> + Send + 'static,
{
    Effect::defer(move || unfold_from(predicate, factory, Vec::new()))
}

fn unfold_from<T, P, F>(mut predicate: P, mut factory: F, mut values: Vec<T>) -> Effect<Vec<T>>
where
    T: Send + 'static,
    P: FnMut(&T) -> bool + Send + 'static,
    F: FnMut() -> Effect<T> + Send + 'static,
{
    factory().bind(move |value| {
        if predicate(&value) {
            values.push(value);
            unfold_from(predicate, factory, values)
        } else {
            Effect::pure(values)
        }
    })
}

/// Repeats a fresh effect from `factory` forever.
///
/// The resulting effect never completes normally; the only way out is a
/// panic raised by one of the iterations.
///
/// # Examples
///
/// ```rust
/// use effio::combinators::forever;
/// use effio::effect::Effect;
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU32, Ordering};
///
/// let ticks = Arc::new(AtomicU32::new(0));
/// let counter = ticks.clone();
/// let looping = forever(move || {
///     let counter = counter.clone();
///     Effect::from_effectful(move || {
///         assert!(counter.fetch_add(1, Ordering::SeqCst) < 9, "stop");
///     })
/// });
///
/// assert!(looping.try_run().is_err());
/// assert_eq!(ticks.load(Ordering::SeqCst), 10);
/// ```
pub fn forever<T, F>(factory: F) -> Effect<Infallible>
where
    T: Send + 'static,
    F: FnMut() -> Effect<T> + Send + 'static,
{
    Effect::defer(move || forever_from(factory))
}

fn forever_from<T, F>(mut factory: F) -> Effect<Infallible>
where
    T: Send + 'static,
    F: FnMut() -> Effect<T> + Send + 'static,
{
    factory().bind(move |_| forever_from(factory))
}
