//! # effio
//!
//! A deferred-effect execution core: side-effecting computations are built
//! as immutable values and only performed when explicitly run.
//!
//! ## Overview
//!
//! - **Effects**: [`Effect<T>`](effect::Effect), a stack-safe trampoline over
//!   pure values, deferred synchronous steps and suspended asynchronous steps
//! - **Sequencing**: monadic operations, the [`eff!`] macro and a small
//!   [`sequencing`] façade
//! - **Combinators**: traversals, folds, filters and effect-level loops
//! - **Parallelism**: fork/await on a worker runtime and parallel fan-out
//! - **Resources**: [`bracket`](resource::bracket) for acquire/use/release
//!
//! ## Example
//!
//! ```rust
//! use effio::prelude::*;
//!
//! let effect = traverse(vec![1, 2, 3], |x| Effect::from_effectful(move || x * 2))
//!     .map(|doubled| doubled.into_iter().sum::<i32>());
//! assert_eq!(effect.run(), 12);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// ```rust
/// use effio::prelude::*;
/// ```
pub mod prelude {
    pub use crate::combinators::*;
    pub use crate::effect::{Effect, EffectError, Step};
    pub use crate::parallel::{TaskHandle, await_task, fork_io, fork_task};
    pub use crate::resource::bracket;
}

pub mod combinators;
pub mod config;
pub mod effect;
pub mod parallel;
pub mod resource;
pub mod sequencing;
