//! Scoped acquire/use/release.

use std::panic::resume_unwind;

use crate::effect::{Effect, panic_message};

/// Safely acquires, uses, and releases a resource.
///
/// Runs `acquire`, passes the resource to `use_resource`, then runs
/// `release` on it whether or not `use_resource` (or the effect it returned)
/// panicked.
///
/// # Failure handling
///
/// | use       | release   | outcome                                        |
/// |-----------|-----------|------------------------------------------------|
/// | succeeded | succeeded | the value of use                               |
/// | panicked  | succeeded | the use panic is re-raised                     |
/// | succeeded | panicked  | the release panic is re-raised                 |
/// | panicked  | panicked  | the use panic is re-raised, release is logged  |
///
/// A panic in `acquire` skips both use and release.
///
/// # Examples
///
/// ```rust
/// use effio::effect::Effect;
/// use effio::resource::bracket;
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicI32, Ordering};
///
/// let open = Arc::new(AtomicI32::new(0));
/// let counter = open.clone();
///
/// let effect = bracket(
///     Effect::from_effectful(move || {
///         counter.fetch_add(1, Ordering::SeqCst);
///         counter
///     }),
///     |counter| Effect::from_effectful(move || {
///         counter.fetch_sub(1, Ordering::SeqCst);
///     }),
///     |counter| Effect::from_effectful(move || counter.load(Ordering::SeqCst) * 10),
/// );
///
/// assert_eq!(effect.run(), 10);
/// assert_eq!(open.load(Ordering::SeqCst), 0);
/// ```
pub fn bracket<R, T, Release, Use>(
    acquire: Effect<R>,
    release: Release,
    use_resource: Use,
) -> Effect<T>
where
    R: Clone + Send + 'static,
    T: Send + 'static,
    Release: FnOnce(R) -> Effect<()> + Send + 'static,
    Use: FnOnce(R) -> Effect<T> + Send + 'static,
{
    acquire.bind(move |resource| {
        let resource_for_use = resource.clone();
        Effect::defer(move || use_resource(resource_for_use))
            .attempt()
            .bind(move |used| {
                Effect::defer(move || release(resource))
                    .attempt()
                    .map(move |released| match (used, released) {
                        (Ok(value), Ok(())) => value,
                        (Err(use_panic), Ok(())) => resume_unwind(use_panic),
                        (Ok(_), Err(release_panic)) => resume_unwind(release_panic),
                        (Err(use_panic), Err(release_panic)) => {
                            tracing::warn!(
                                release_error = %panic_message(release_panic.as_ref()),
                                "release panicked while use had already failed; \
                                 suppressing release panic in favor of use panic"
                            );
                            resume_unwind(use_panic)
                        }
                    })
            })
    })
}
