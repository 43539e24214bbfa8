//! `eff!` macro for do-notation style effect composition.
//!
//! # Syntax
//!
//! - `pattern <= effect;` binds the value produced by `effect`
//! - `let pattern = expression;` is a pure let binding
//! - a final expression must itself be an [`Effect`](crate::effect::Effect)
//!
//! `<=` stands in for Haskell's `<-`, which is not a valid macro token.
//!
//! # Examples
//!
//! ```rust
//! use effio::eff;
//! use effio::effect::Effect;
//!
//! let effect = eff! {
//!     x <= Effect::from_effectful(|| 5);
//!     y <= Effect::lift_async(async { 10 });
//!     let z = x + y;
//!     Effect::pure(z * 2)
//! };
//! assert_eq!(effect.run(), 30);
//! ```
//!
//! `pattern <= effect; rest` expands to
//! ```rust,ignore
//! effect.bind(move |pattern| { /* rest */ })
//! ```
//! so nothing inside the block runs until the resulting effect is evaluated,
//! except the first bound expression, which only builds an effect.

/// Do-notation for [`Effect`](crate::effect::Effect).
///
/// ```text
/// eff! {
///     pattern <= effect_expression;   // bind
///     let pattern = expression;        // pure let binding
///     effect_expression                // final effect
/// }
/// ```
#[macro_export]
macro_rules! eff {
    ($result:expr) => {
        $result
    };

    ($pattern:ident <= $effect:expr ; $($rest:tt)+) => {
        $effect.bind(move |$pattern| {
            $crate::eff!($($rest)+)
        })
    };

    (($($pattern:tt)*) <= $effect:expr ; $($rest:tt)+) => {
        $effect.bind(move |($($pattern)*)| {
            $crate::eff!($($rest)+)
        })
    };

    (_ <= $effect:expr ; $($rest:tt)+) => {
        $effect.bind(move |_| {
            $crate::eff!($($rest)+)
        })
    };

    (let $pattern:ident = $expr:expr ; $($rest:tt)+) => {
        {
            let $pattern = $expr;
            $crate::eff!($($rest)+)
        }
    };

    (let ($($pattern:tt)*) = $expr:expr ; $($rest:tt)+) => {
        {
            let ($($pattern)*) = $expr;
            $crate::eff!($($rest)+)
        }
    };
}
