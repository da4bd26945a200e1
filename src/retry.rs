//! Automatic re-execution of conflicting transactions
//!
//! Optimistic transactions trade locking for the occasional conflict; the
//! retry driver turns a conflict-prone closure into a loop with exponential
//! backoff. The closure must be side-effect-free outside its transaction
//! handle, since it may run several times before a commit lands.

use crate::db::Db;
use crate::error::{Error, Result};
use crate::handle::Txn;
use std::hash::Hash;
use std::time::Duration;
use tracing::trace;

/// Configuration for transaction retry behavior.
///
/// Delays grow geometrically: the first conflict sleeps `base_delay`, and
/// each further conflict multiplies the delay by `backoff_factor`, capped
/// at `max_delay`.
///
/// # Example
/// ```
/// use optikv::RetryConfig;
/// use std::time::Duration;
///
/// let config = RetryConfig::new()
///     .with_max_retries(10)
///     .with_base_delay(Duration::from_millis(1));
/// ```
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts before the conflict is returned to the
    /// caller.
    pub max_retries: usize,
    /// Delay before the first re-attempt.
    pub base_delay: Duration,
    /// Multiplier applied to the delay after each conflicting attempt.
    pub backoff_factor: f64,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 100,
            base_delay: Duration::from_millis(5),
            backoff_factor: 1.5,
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of attempts.
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the delay before the first re-attempt.
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Set the backoff multiplier.
    pub fn with_backoff_factor(mut self, backoff_factor: f64) -> Self {
        self.backoff_factor = backoff_factor;
        self
    }

    /// Set the upper bound on any single delay.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }
}

/// Run `body` in a transaction, retrying on conflict with
/// [`RetryConfig::default`].
///
/// See [`retry_with`].
pub fn retry<K, V, T, E, F>(db: &Db<K, V>, body: F) -> Result<T, E>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: From<Error>,
    F: FnMut(&mut Txn<'_, K, V>) -> Result<T, E>,
{
    retry_with(db, &RetryConfig::default(), body)
}

/// Run `body` in a transaction, retrying on conflict.
///
/// Each attempt begins a fresh transaction, runs `body` against it, and
/// commits. A commit conflict sleeps the current backoff delay and tries
/// again; the conflict from the final attempt is returned to the caller.
/// Any error from `body` itself propagates immediately without retry,
/// since conflicts only arise at commit.
///
/// `body` may run several times, so it must not have side effects outside
/// the transaction handle. Writes to process-external state inside `body`
/// are the caller's responsibility.
pub fn retry_with<K, V, T, E, F>(db: &Db<K, V>, config: &RetryConfig, mut body: F) -> Result<T, E>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: From<Error>,
    F: FnMut(&mut Txn<'_, K, V>) -> Result<T, E>,
{
    let mut delay = config.base_delay;

    for attempt in 0..config.max_retries {
        let mut txn = db.begin();
        let value = body(&mut txn)?;

        match txn.commit() {
            Ok(()) => return Ok(value),
            Err(e) if e.is_conflict() && attempt + 1 < config.max_retries => {
                trace!(
                    attempt = attempt as u64,
                    delay_ms = delay.as_millis() as u64,
                    "commit conflicted, backing off"
                );
                std::thread::sleep(delay);
                delay = delay.mul_f64(config.backoff_factor).min(config.max_delay);
            }
            Err(e) => return Err(e.into()),
        }
    }

    // Only reachable with max_retries == 0: the loop otherwise returns on
    // success, on a non-conflict error, or on the final attempt's conflict.
    Err(Error::internal("no attempts were made: max_retries is 0").into())
}
