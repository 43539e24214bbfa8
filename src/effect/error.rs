//! Error types for the effect system.
//!
//! Failures inside an effect are panics. They unwind out of [`Effect::run`]
//! unchanged; [`Effect::try_run`] and the recovery combinators turn them into
//! values of the types defined here.
//!
//! [`Effect::run`]: super::Effect::run
//! [`Effect::try_run`]: super::Effect::try_run

use std::any::Any;

use thiserror::Error;

use crate::parallel::runtime::BlockingError;

/// Errors reported by [`Effect::try_run`](super::Effect::try_run).
///
/// # Examples
///
/// ```rust
/// use effio::effect::EffectError;
///
/// let error = EffectError::Panicked {
///     message: "connection reset".to_string(),
/// };
/// assert_eq!(error.to_string(), "effect panicked: connection reset");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EffectError {
    /// A step of the effect panicked.
    #[error("effect panicked: {message}")]
    Panicked {
        /// The panic message, or `"unknown panic"` for non-string payloads.
        message: String,
    },

    /// The effect suspended in a context where the calling thread cannot
    /// block.
    #[error(transparent)]
    Blocking(#[from] BlockingError),
}

impl EffectError {
    /// Builds an [`EffectError::Panicked`] from a caught panic payload.
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        Self::Panicked {
            message: panic_message(payload),
        }
    }
}

/// Extracts a human readable message from a panic payload.
///
/// `panic!` payloads are either `&'static str` or `String`; anything else is
/// reported as `"unknown panic"`.
///
/// # Examples
///
/// ```rust
/// use effio::effect::panic_message;
///
/// let payload = std::panic::catch_unwind(|| panic!("value was {}", 3)).unwrap_err();
/// assert_eq!(panic_message(payload.as_ref()), "value was 3");
/// ```
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
