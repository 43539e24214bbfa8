//! Runtime configuration.
//!
//! Controls the worker pool that runs forked tasks and the blocking bridge
//! used by [`Effect::run`](crate::effect::Effect::run).
//!
//! Configuration is read once, before the worker runtime is first used:
//! either installed explicitly with
//! [`runtime::configure`](crate::parallel::runtime::configure) or loaded from
//! the environment.
//!
//! # Example
//!
//! ```rust
//! use effio::config::RuntimeConfig;
//!
//! let config = RuntimeConfig::default().with_worker_threads(2);
//! assert_eq!(config.worker_threads, 2);
//! assert_eq!(config.thread_name, "effio-worker");
//! ```

use std::env;

use thiserror::Error;

/// Environment variable holding the number of worker threads.
pub const WORKER_THREADS_VAR: &str = "EFFIO_WORKER_THREADS";

/// Environment variable holding the worker thread name.
pub const THREAD_NAME_VAR: &str = "EFFIO_THREAD_NAME";

/// Default worker thread name.
pub const DEFAULT_THREAD_NAME: &str = "effio-worker";

/// Configuration error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A configuration value could not be used.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue {
        /// The name of the setting (environment variable).
        key: String,
        /// Description of why the value is invalid.
        message: String,
    },

    /// The worker runtime was already built, so configuration can no longer
    /// change.
    #[error("runtime already initialized: configuration must be installed before first use")]
    AlreadyInitialized,
}

/// Settings for the global worker runtime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Number of worker threads. Defaults to the number of CPUs.
    pub worker_threads: usize,
    /// Name given to worker threads.
    pub thread_name: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: num_cpus::get(),
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Returns a copy with `worker_threads` replaced.
    #[must_use]
    pub fn with_worker_threads(mut self, worker_threads: usize) -> Self {
        self.worker_threads = worker_threads;
        self
    }

    /// Returns a copy with `thread_name` replaced.
    #[must_use]
    pub fn with_thread_name(mut self, thread_name: impl Into<String>) -> Self {
        self.thread_name = thread_name.into();
        self
    }

    /// Loads configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `EFFIO_WORKER_THREADS`: worker count, a positive integer
    ///   (optional, default: number of CPUs)
    /// - `EFFIO_THREAD_NAME`: worker thread name (optional, default:
    ///   `"effio-worker"`)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a variable is set to an
    /// unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key/value source.
    ///
    /// `lookup` returns the raw value for a setting, or `None` when unset.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a value is set but unusable.
    ///
    /// # Example
    ///
    /// ```rust
    /// use effio::config::RuntimeConfig;
    ///
    /// let config = RuntimeConfig::from_lookup(|key| match key {
    ///     "EFFIO_WORKER_THREADS" => Some("3".to_string()),
    ///     _ => None,
    /// })
    /// .unwrap();
    /// assert_eq!(config.worker_threads, 3);
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let worker_threads = match lookup(WORKER_THREADS_VAR) {
            None => defaults.worker_threads,
            Some(value) => parse_worker_threads(&value)?,
        };
        let thread_name = match lookup(THREAD_NAME_VAR) {
            None => defaults.thread_name,
            Some(value) if value.trim().is_empty() => {
                return Err(ConfigError::InvalidValue {
                    key: THREAD_NAME_VAR.to_string(),
                    message: "must not be empty".to_string(),
                });
            }
            Some(value) => value,
        };

        Ok(Self {
            worker_threads,
            thread_name,
        })
    }
}

fn parse_worker_threads(value: &str) -> Result<usize, ConfigError> {
    let invalid = |message: String| ConfigError::InvalidValue {
        key: WORKER_THREADS_VAR.to_string(),
        message,
    };

    match value.trim().parse::<usize>() {
        Ok(0) => Err(invalid("must be at least 1".to_string())),
        Ok(count) => Ok(count),
        Err(error) => Err(invalid(error.to_string())),
    }
}
