//! Worker runtime shared by forked tasks and the blocking bridge.
//!
//! This module owns a lazily built multi-thread tokio runtime and the helpers
//! that let synchronous code wait on asynchronous steps:
//!
//! 1. **Global Runtime**: built once, on first use, from the installed
//!    [`RuntimeConfig`] (or from the environment) and never dropped.
//! 2. **Handle Caching**: [`worker_handle`] caches the global handle per
//!    thread and is where forked work is spawned. [`handle`] prefers the
//!    ambient runtime when called from inside one.
//! 3. **Blocking Execution**: [`try_run_blocking`] waits for a future from
//!    synchronous code, using `block_in_place` inside multi-thread runtimes.
//!
//! # Runtime Flavor Considerations
//!
//! - **Multi-thread runtime**: `block_in_place` hands the worker's other
//!   tasks to another thread while the caller blocks.
//! - **Current-thread runtime**: blocking would deadlock the only thread, so
//!   [`BlockingError::CurrentThreadRuntime`] is returned instead.
//!
//! # Examples
//!
//! ```rust
//! use effio::parallel::runtime::{handle, run_blocking};
//!
//! let task = handle().spawn(async { 40 + 2 });
//! assert_eq!(run_blocking(task).unwrap(), 42);
//! ```

use std::cell::RefCell;
use std::future::Future;
use std::sync::{LazyLock, OnceLock};

use thiserror::Error;
use tokio::runtime::{Builder, Handle, Runtime, RuntimeFlavor};

use crate::config::{ConfigError, RuntimeConfig};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration the global runtime is (or will be) built from.
static CONFIG: OnceLock<RuntimeConfig> = OnceLock::new();

/// Installs the configuration used to build the global runtime.
///
/// Must be called before anything forks a task or blocks on an asynchronous
/// step.
///
/// # Errors
///
/// - `ConfigError::InvalidValue` if `worker_threads` is zero.
/// - `ConfigError::AlreadyInitialized` if a configuration was already
///   installed or the runtime has already been built.
///
/// # Examples
///
/// ```rust
/// use effio::config::{ConfigError, RuntimeConfig};
/// use effio::parallel::runtime::{configure, global};
///
/// let _ = global();
/// assert_eq!(
///     configure(RuntimeConfig::default()),
///     Err(ConfigError::AlreadyInitialized)
/// );
/// ```
pub fn configure(config: RuntimeConfig) -> Result<(), ConfigError> {
    if config.worker_threads == 0 {
        return Err(ConfigError::InvalidValue {
            key: "worker_threads".to_string(),
            message: "must be at least 1".to_string(),
        });
    }
    CONFIG
        .set(config)
        .map_err(|_| ConfigError::AlreadyInitialized)
}

/// Returns the configuration in effect.
///
/// Loads it from the environment the first time if none was installed.
pub fn config() -> &'static RuntimeConfig {
    CONFIG.get_or_init(|| {
        RuntimeConfig::from_env().unwrap_or_else(|error| {
            tracing::warn!("Failed to load runtime configuration from environment: {error}");
            tracing::warn!("Using default runtime configuration");
            RuntimeConfig::default()
        })
    })
}

// =============================================================================
// Global Runtime
// =============================================================================

/// Global tokio runtime initialized lazily on first access.
static GLOBAL_RUNTIME: LazyLock<Runtime> = LazyLock::new(|| {
    let config = config();
    tracing::debug!(
        worker_threads = config.worker_threads,
        thread_name = %config.thread_name,
        "building global effio runtime"
    );
    Builder::new_multi_thread()
        .worker_threads(config.worker_threads)
        .thread_name(config.thread_name.clone())
        .enable_all()
        .build()
        .expect("Failed to create global tokio runtime")
});

/// Returns a reference to the global runtime, building it on first call.
#[inline]
#[must_use]
pub fn global() -> &'static Runtime {
    &GLOBAL_RUNTIME
}

// =============================================================================
// Handle Caching
// =============================================================================

thread_local! {
    static CACHED_HANDLE: RefCell<Option<Handle>> = const { RefCell::new(None) };
}

/// Returns the global runtime's handle, cached per thread.
///
/// Forked effects are always spawned here, never on an ambient runtime, so
/// they run on a worker thread and outlive the caller's runtime.
#[inline]
#[must_use]
pub fn worker_handle() -> Handle {
    CACHED_HANDLE.with(|cached| {
        cached
            .borrow_mut()
            .get_or_insert_with(|| global().handle().clone())
            .clone()
    })
}

/// Returns a handle to the current or global runtime.
///
/// Inside a tokio runtime this is `Handle::current()`. Outside, it is
/// [`worker_handle`].
#[inline]
#[must_use]
pub fn handle() -> Handle {
    Handle::try_current().unwrap_or_else(|_| worker_handle())
}

// =============================================================================
// Blocking Error
// =============================================================================

/// Reasons a synchronous caller cannot wait for a future.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BlockingError {
    /// Called from inside a current-thread runtime, which cannot run
    /// `block_in_place`.
    #[error(
        "cannot execute blocking operation in current-thread runtime: \
         block_in_place is only supported in multi-thread runtimes"
    )]
    CurrentThreadRuntime,

    /// Called from inside a runtime of a flavor this crate does not know.
    #[error(
        "cannot execute blocking operation: \
         the runtime flavor is not supported for blocking execution"
    )]
    UnsupportedRuntimeFlavor,
}

// =============================================================================
// Blocking Execution
// =============================================================================

/// Executes a future synchronously, blocking the current thread.
///
/// - Inside a multi-thread runtime: `block_in_place` on the current handle.
/// - Inside a current-thread runtime: `Err(BlockingError::CurrentThreadRuntime)`.
/// - Outside any runtime: `block_on` of the global runtime.
///
/// # Errors
///
/// Returns a [`BlockingError`] when the calling context cannot block.
#[inline]
pub fn try_run_blocking<F, T>(future: F) -> Result<T, BlockingError>
where
    F: Future<Output = T>,
{
    let Ok(current_handle) = Handle::try_current() else {
        return Ok(global().block_on(future));
    };

    match current_handle.runtime_flavor() {
        RuntimeFlavor::MultiThread => Ok(tokio::task::block_in_place(|| {
            current_handle.block_on(future)
        })),
        RuntimeFlavor::CurrentThread => Err(BlockingError::CurrentThreadRuntime),
        _ => Err(BlockingError::UnsupportedRuntimeFlavor),
    }
}

/// Like [`try_run_blocking`] but panics when the context cannot block.
///
/// # Panics
///
/// - Panics if called from within a current-thread runtime.
/// - Panics if the future panics.
#[inline]
pub fn run_blocking<F, T>(future: F) -> T
where
    F: Future<Output = T>,
{
    match try_run_blocking(future) {
        Ok(value) => value,
        Err(error) => panic!("run_blocking failed: {error}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::ptr;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[rstest]
    fn global_returns_same_instance() {
        assert!(ptr::eq(global(), global()));
    }

    #[rstest]
    fn global_runtime_runs_concurrent_tasks() {
        let counter = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counter = counter.clone();
                global().spawn(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();

        global().block_on(async {
            for handle in handles {
                handle.await.unwrap();
            }
        });

        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[rstest]
    fn configure_after_start_is_rejected() {
        let _ = global();
        assert_eq!(
            configure(RuntimeConfig::default()),
            Err(ConfigError::AlreadyInitialized)
        );
    }

    #[rstest]
    fn configure_rejects_zero_workers() {
        assert!(matches!(
            configure(RuntimeConfig::default().with_worker_threads(0)),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[rstest]
    fn config_reports_a_usable_worker_count() {
        assert!(config().worker_threads >= 1);
    }

    #[rstest]
    fn handle_works_from_outside_runtime() {
        assert_eq!(handle().block_on(async { 42 }), 42);
    }

    #[rstest]
    #[tokio::test]
    async fn handle_prefers_the_ambient_runtime() {
        assert_eq!(
            handle().runtime_flavor(),
            Handle::current().runtime_flavor()
        );
        assert_eq!(handle().spawn(async { 42 }).await.unwrap(), 42);
    }

    #[rstest]
    #[tokio::test(flavor = "current_thread")]
    async fn worker_handle_ignores_the_ambient_runtime() {
        assert_eq!(worker_handle().runtime_flavor(), RuntimeFlavor::MultiThread);
        let caller = thread::current().id();
        let worker = worker_handle()
            .spawn(async { thread::current().id() })
            .await
            .unwrap();
        assert_ne!(worker, caller);
    }

    #[rstest]
    #[case(BlockingError::CurrentThreadRuntime, "current-thread runtime")]
    #[case(BlockingError::UnsupportedRuntimeFlavor, "not supported")]
    fn blocking_error_display(#[case] error: BlockingError, #[case] fragment: &str) {
        assert!(error.to_string().contains(fragment));
    }

    #[rstest]
    fn try_run_blocking_from_outside_runtime() {
        assert_eq!(try_run_blocking(async { 42 }), Ok(42));
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn try_run_blocking_inside_multi_thread_runtime() {
        assert_eq!(try_run_blocking(async { 42 }), Ok(42));
    }

    #[rstest]
    #[tokio::test(flavor = "current_thread")]
    async fn try_run_blocking_inside_current_thread_runtime() {
        let result = tokio::task::spawn_blocking(|| try_run_blocking(async { 42 }))
            .await
            .unwrap();
        assert_eq!(result, Err(BlockingError::CurrentThreadRuntime));
    }

    #[rstest]
    fn run_blocking_from_many_threads() {
        let results: Vec<i32> = (0..4)
            .map(|i| thread::spawn(move || run_blocking(async move { i })))
            .map(|handle| handle.join().unwrap())
            .collect();
        assert_eq!(results, vec![0, 1, 2, 3]);
    }
}
