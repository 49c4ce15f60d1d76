//! Explicit configuration for the lifecycle engine.
//!
//! Values are read once at start-up and passed into the workflow service and
//! the reconciliation job at construction.
//!
//! | Env var                      | Default                   |
//! |------------------------------|---------------------------|
//! | `HIRELOOP_GRACE_PERIOD_DAYS` | `7`                       |
//! | `HIRELOOP_IO_TIMEOUT_SECS`   | `30`                      |
//! | `HIRELOOP_BATCH_SIZE`        | unset (one unit per pass) |
//! | `HIRELOOP_RUN_INTERVAL_SECS` | `60`                      |
//! | `HIRELOOP_LEASE_SECS`        | `300`                     |

use crate::project::domain::GracePeriod;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const GRACE_PERIOD_DAYS_VAR: &str = "HIRELOOP_GRACE_PERIOD_DAYS";
const IO_TIMEOUT_SECS_VAR: &str = "HIRELOOP_IO_TIMEOUT_SECS";
const BATCH_SIZE_VAR: &str = "HIRELOOP_BATCH_SIZE";
const RUN_INTERVAL_SECS_VAR: &str = "HIRELOOP_RUN_INTERVAL_SECS";
const LEASE_SECS_VAR: &str = "HIRELOOP_LEASE_SECS";

/// Tunables of the lifecycle engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// Days an `Expired` project waits before automatic cancellation.
    pub grace_period: GracePeriod,
    /// Upper bound on every store, lock and emitter call.
    pub io_timeout: Duration,
    /// Projects committed per unit of work; `None` commits a whole pass at
    /// once.
    pub batch_size: Option<NonZeroUsize>,
    /// Interval between scheduled reconciliation passes.
    pub run_interval: Duration,
    /// How long a pass holds the run lease before another instance may take
    /// it over.
    pub lease_duration: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            grace_period: GracePeriod::from_days(7),
            io_timeout: Duration::from_secs(30),
            batch_size: None,
            run_interval: Duration::from_secs(60),
            lease_duration: Duration::from_secs(300),
        }
    }
}

impl LifecycleConfig {
    /// Loads configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a variable is set to a value that
    /// does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults for
    /// unset variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a variable is set to a value that
    /// does not parse, or [`ConfigError::Zero`] when a duration or batch size
    /// is zero.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let grace_period = parse_var::<u32>(&lookup, GRACE_PERIOD_DAYS_VAR)?
            .map_or(defaults.grace_period, GracePeriod::from_days);
        let io_timeout =
            seconds_var(&lookup, IO_TIMEOUT_SECS_VAR)?.unwrap_or(defaults.io_timeout);
        let run_interval =
            seconds_var(&lookup, RUN_INTERVAL_SECS_VAR)?.unwrap_or(defaults.run_interval);
        let lease_duration =
            seconds_var(&lookup, LEASE_SECS_VAR)?.unwrap_or(defaults.lease_duration);
        let batch_size = parse_var::<usize>(&lookup, BATCH_SIZE_VAR)?
            .map(|size| NonZeroUsize::new(size).ok_or(ConfigError::Zero(BATCH_SIZE_VAR)))
            .transpose()?;

        Ok(Self {
            grace_period,
            io_timeout,
            batch_size,
            run_interval,
            lease_duration,
        })
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|_| ConfigError::Invalid { name, value: raw })
}

fn seconds_var(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<Duration>, ConfigError> {
    match parse_var::<u64>(lookup, name)? {
        Some(0) => Err(ConfigError::Zero(name)),
        other => Ok(other.map(Duration::from_secs)),
    }
}

/// Errors returned while loading configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable holds a value that does not parse.
    #[error("invalid value '{value}' for {name}")]
    Invalid {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
    },

    /// A variable that must be positive is zero.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}
