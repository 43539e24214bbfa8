//! Type-erased continuation storage for [`Effect`].
//!
//! Every non-pure effect carries a queue of continuations that still have to
//! be applied to its eventual value. Because the intermediate types of a
//! `bind` chain differ from step to step, continuations are stored as arrows
//! from `Box<dyn Any + Send>` to an erased effect, in the same spirit as the
//! arrows of a Freer monad ("Reflection without Remorse").
//!
//! Appending a continuation is O(1) and applying one never recurses, which is
//! what keeps arbitrarily long `bind` chains evaluable in constant stack depth.

use std::any::Any;
use std::collections::VecDeque;
use std::marker::PhantomData;

use super::Effect;

/// A value whose concrete type has been erased.
pub(crate) type Erased = Box<dyn Any + Send>;

/// Unboxes an erased value back into its concrete type.
///
/// # Panics
///
/// Panics if `value` does not hold an `A`. The evaluator only ever hands an
/// arrow the value produced by the step it was attached to, so a mismatch is
/// an internal invariant violation.
#[inline]
pub(crate) fn reveal<A: 'static>(value: Erased) -> A {
    *value
        .downcast::<A>()
        .expect("effio internal error: continuation received a value of an unexpected type")
}

// =============================================================================
// Arrows
// =============================================================================

/// A single type-erased continuation step.
pub(crate) trait Arrow: Send {
    fn apply(self: Box<Self>, input: Erased) -> Effect<Erased>;
}

struct BindArrow<A, B, F> {
    function: F,
    _phantom: PhantomData<fn(A) -> B>,
}

impl<A, B, F> Arrow for BindArrow<A, B, F>
where
    A: Send + 'static,
    B: Send + 'static,
    F: FnOnce(A) -> Effect<B> + Send + 'static,
{
    fn apply(self: Box<Self>, input: Erased) -> Effect<Erased> {
        (self.function)(reveal::<A>(input)).erase()
    }
}

struct MapArrow<A, B, F> {
    function: F,
    _phantom: PhantomData<fn(A) -> B>,
}

impl<A, B, F> Arrow for MapArrow<A, B, F>
where
    A: Send + 'static,
    B: Send + 'static,
    F: FnOnce(A) -> B + Send + 'static,
{
    #[inline]
    fn apply(self: Box<Self>, input: Erased) -> Effect<Erased> {
        Effect::Pure(Box::new((self.function)(reveal::<A>(input))) as Erased)
    }
}

// =============================================================================
// Continuations
// =============================================================================

/// An ordered queue of pending continuations.
///
/// The front of the queue is applied first.
#[derive(Default)]
pub(crate) struct Continuations {
    arrows: VecDeque<Box<dyn Arrow>>,
}

impl Continuations {
    #[inline]
    pub(crate) fn new() -> Self {
        Self {
            arrows: VecDeque::new(),
        }
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.arrows.is_empty()
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.arrows.len()
    }

    pub(crate) fn push_bind<A, B, F>(&mut self, function: F)
    where
        A: Send + 'static,
        B: Send + 'static,
        F: FnOnce(A) -> Effect<B> + Send + 'static,
    {
        self.arrows.push_back(Box::new(BindArrow {
            function,
            _phantom: PhantomData,
        }));
    }

    pub(crate) fn push_map<A, B, F>(&mut self, function: F)
    where
        A: Send + 'static,
        B: Send + 'static,
        F: FnOnce(A) -> B + Send + 'static,
    {
        self.arrows.push_back(Box::new(MapArrow {
            function,
            _phantom: PhantomData,
        }));
    }

    #[inline]
    pub(crate) fn pop(&mut self) -> Option<Box<dyn Arrow>> {
        self.arrows.pop_front()
    }

    /// Places `earlier` in front of the continuations already queued.
    ///
    /// Moves whichever side is shorter, so every arrow is moved a bounded
    /// number of times over a whole evaluation.
    pub(crate) fn prepend(&mut self, mut earlier: Self) {
        if earlier.is_empty() {
            return;
        }
        if self.arrows.len() < earlier.arrows.len() {
            earlier.arrows.append(&mut self.arrows);
            *self = earlier;
        } else {
            while let Some(arrow) = earlier.arrows.pop_back() {
                self.arrows.push_front(arrow);
            }
        }
    }
}
