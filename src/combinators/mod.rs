//! Monadic combinators built on [`Effect`](crate::effect::Effect).
//!
//! - [`bulk`]: traversals, folds and filters over input sequences.
//! - [`loops`]: predicate driven loops and iteration towards a value.
//!
//! All of them only compose effects through `bind`, `map` and
//! [`Effect::defer`](crate::effect::Effect::defer); none of them run anything
//! at construction time.

pub mod bulk;
pub mod loops;

pub use bulk::{choose_m, filter_m, fold_m, iter_m, repeat_m, replicate_m, sequence, traverse};
pub use loops::{
    forever, iter_until_m, iter_while_m, iterate_until, iterate_until_m, iterate_while,
    skip_while_m, take_while_m, unfold_while_m, until_m, while_m, while_some,
};
