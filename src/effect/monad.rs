//! Functor, applicative and monad operations for [`Effect`].
//!
//! Every operation here only rearranges data: it returns a new effect and
//! never runs a user function at construction time.

use super::Effect;

// =============================================================================
// Monad Operations
// =============================================================================

impl<T: Send + 'static> Effect<T> {
    /// Chains a computation that depends on the value of this effect.
    ///
    /// This is the monadic `bind` (>>=). A pure effect becomes a deferred step
    /// that calls `function` when evaluated; any other step gets `function`
    /// appended to its continuation queue.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effio::effect::Effect;
    ///
    /// let effect = Effect::pure(10).bind(|x| Effect::from_effectful(move || x * 2));
    /// assert_eq!(effect.run(), 20);
    /// ```
    pub fn bind<U, F>(self, function: F) -> Effect<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Effect<U> + Send + 'static,
    {
        match self {
            Self::Pure(value) => Effect::defer(move || function(value)),
            Self::Deferred(mut deferred) => {
                deferred.continuations.push_bind::<T, U, F>(function);
                Effect::Deferred(deferred.retype())
            }
            Self::Suspended(mut suspended) => {
                suspended.continuations.push_bind::<T, U, F>(function);
                Effect::Suspended(suspended.retype())
            }
        }
    }

    /// Alias for [`Effect::bind`].
    #[inline]
    pub fn and_then<U, F>(self, function: F) -> Effect<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Effect<U> + Send + 'static,
    {
        self.bind(function)
    }

    /// Transforms the value of this effect.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effio::effect::Effect;
    ///
    /// assert_eq!(Effect::pure(21).map(|x| x * 2).run(), 42);
    /// ```
    pub fn map<U, F>(self, function: F) -> Effect<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> U + Send + 'static,
    {
        match self {
            Self::Pure(value) => Effect::from_effectful(move || function(value)),
            Self::Deferred(mut deferred) => {
                deferred.continuations.push_map::<T, U, F>(function);
                Effect::Deferred(deferred.retype())
            }
            Self::Suspended(mut suspended) => {
                suspended.continuations.push_map::<T, U, F>(function);
                Effect::Suspended(suspended.retype())
            }
        }
    }

    /// Sequences two effects, discarding the value of the first.
    ///
    /// The first effect still runs for its side effects.
    #[inline]
    pub fn then<U: Send + 'static>(self, next: Effect<U>) -> Effect<U> {
        self.bind(move |_| next)
    }

    /// Runs this effect, then `other`, and combines both values.
    pub fn map2<U, V, F>(self, other: Effect<U>, function: F) -> Effect<V>
    where
        U: Send + 'static,
        V: Send + 'static,
        F: FnOnce(T, U) -> V + Send + 'static,
    {
        self.bind(move |first| other.map(move |second| function(first, second)))
    }

    /// Runs this effect, then `other`, and pairs both values.
    #[inline]
    pub fn product<U: Send + 'static>(self, other: Effect<U>) -> Effect<(T, U)> {
        self.map2(other, |first, second| (first, second))
    }
}

// =============================================================================
// Applicative and Join
// =============================================================================

impl<F: Send + 'static> Effect<F> {
    /// Applies the function produced by this effect to the value produced by
    /// `value`.
    ///
    /// The function-producing effect runs first.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effio::effect::Effect;
    ///
    /// let function = Effect::pure(|x: i32| x + 1);
    /// assert_eq!(function.apply(Effect::pure(41)).run(), 42);
    /// ```
    pub fn apply<A, B>(self, value: Effect<A>) -> Effect<B>
    where
        F: FnOnce(A) -> B,
        A: Send + 'static,
        B: Send + 'static,
    {
        self.bind(move |function| value.map(function))
    }
}

impl<T: Send + 'static> Effect<Effect<T>> {
    /// Flattens a nested effect.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use effio::effect::Effect;
    ///
    /// let nested = Effect::from_effectful(|| Effect::pure(42));
    /// assert_eq!(nested.join().run(), 42);
    /// ```
    pub fn join(self) -> Effect<T> {
        self.bind(|inner| inner)
    }
}
