//! Combinators over ordered sequences of inputs.
//!
//! Every combinator runs the per-item effects strictly left to right: the
//! effect for an item starts only after the effect for the previous item
//! has completed, including any suspension. Iteration is driven through
//! `bind` one item at a time, so input length never affects stack depth.

use crate::effect::Effect;

/// Effectful left fold.
///
/// `step(accumulator, item)` produces the next accumulator.
///
/// # Examples
///
/// ```rust
/// use effio::combinators::fold_m;
/// use effio::effect::Effect;
///
/// let sum = fold_m(0, vec![1, 2, 3], |total, item| Effect::pure(total + item));
/// assert_eq!(sum.run(), 6);
/// ```
pub fn fold_m<S, I, F>(initial: S, items: I, step: F) -> Effect<S>
where
    S: Send + 'static,
    I: IntoIterator,
    I::IntoIter: Send + 'static,
    F: FnMut(S, I::Item) -> Effect<S> + Send + 'static,
{
    let items = items.into_iter();
    Effect::defer(move || fold_from(initial, items, step))
}

fn fold_from<S, I, F>(state: S, mut items: I, mut step: F) -> Effect<S>
where
    S: Send + 'static,
    I: Iterator + Send + 'static,
    F: FnMut(S, I::Item) -> Effect<S> + Send + 'static,
{
    match items.next() {
        None => Effect::pure(state),
        Some(item) => step(state, item).bind(move |next| fold_from(next, items, step)),
    }
}

/// Runs `function` over every item and collects the results in order.
///
/// # Examples
///
/// ```rust
/// use effio::combinators::traverse;
/// use effio::effect::Effect;
///
/// let effect = traverse(vec![1, 2, 3], |x| Effect::from_effectful(move || x * 10));
/// assert_eq!(effect.run(), vec![10, 20, 30]);
/// ```
pub fn traverse<B, I, F>(items: I, mut function: F) -> Effect<Vec<B>>
where
    B: Send + 'static,
    I: IntoIterator,
    I::IntoIter: Send + 'static,
    F: FnMut(I::Item) -> Effect<B> + Send + 'static,
{
    fold_m(Vec::new(), items, move |mut results, item| {
        function(item).map(move |value| {
            results.push(value);
            results
        })
    })
}

/// Runs every effect in order and collects the results.
pub fn sequence<T, I>(effects: I) -> Effect<Vec<T>>
where
    T: Send + 'static,
    I: IntoIterator<Item = Effect<T>>,
    I::IntoIter: Send + 'static,
{
    traverse(effects, |effect| effect)
}

/// Like [`traverse`] but keeps only the present results.
///
/// # Examples
///
/// ```rust
/// use effio::combinators::choose_m;
/// use effio::effect::Effect;
///
/// let evens = choose_m(1..=6, |x| Effect::pure((x % 2 == 0).then_some(x)));
/// assert_eq!(evens.run(), vec![2, 4, 6]);
/// ```
pub fn choose_m<B, I, F>(items: I, mut function: F) -> Effect<Vec<B>>
where
    B: Send + 'static,
    I: IntoIterator,
    I::IntoIter: Send + 'static,
    F: FnMut(I::Item) -> Effect<Option<B>> + Send + 'static,
{
    fold_m(Vec::new(), items, move |mut chosen, item| {
        function(item).map(move |maybe| {
            chosen.extend(maybe);
            chosen
        })
    })
}

/// Keeps the items whose effectful predicate yields `true`.
pub fn filter_m<I, P>(items: I, mut predicate: P) -> Effect<Vec<I::Item>>
where
    I: IntoIterator,
    I::IntoIter: Send + 'static,
    I::Item: Send + 'static,
    P: FnMut(&I::Item) -> Effect<bool> + Send + 'static,
{
    fold_m(Vec::new(), items, move |mut kept, item| {
        predicate(&item).map(move |keep| {
            if keep {
                kept.push(item);
            }
            kept
        })
    })
}

/// Runs `function` over every item, discarding the results.
///
/// # Examples
///
/// ```rust
/// use effio::combinators::iter_m;
/// use effio::effect::Effect;
/// use std::sync::{Arc, Mutex};
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let log = seen.clone();
/// iter_m(vec!['a', 'b'], move |c| {
///     let log = log.clone();
///     Effect::from_effectful(move || log.lock().unwrap().push(c))
/// })
/// .run();
/// assert_eq!(*seen.lock().unwrap(), vec!['a', 'b']);
/// ```
pub fn iter_m<B, I, F>(items: I, mut function: F) -> Effect<()>
where
    B: Send + 'static,
    I: IntoIterator,
    I::IntoIter: Send + 'static,
    F: FnMut(I::Item) -> Effect<B> + Send + 'static,
{
    fold_m((), items, move |(), item| function(item).map(|_| ()))
}

/// Runs a fresh effect from `factory` `count` times, collecting the results.
pub fn replicate_m<T, F>(count: usize, mut factory: F) -> Effect<Vec<T>>
where
    T: Send + 'static,
    F: FnMut() -> Effect<T> + Send + 'static,
{
    traverse(0..count, move |_| factory())
}

/// Runs a fresh effect from `factory` `count` times, discarding the results.
pub fn repeat_m<T, F>(count: usize, mut factory: F) -> Effect<()>
where
    T: Send + 'static,
    F: FnMut() -> Effect<T> + Send + 'static,
{
    iter_m(0..count, move |_| factory())
}
