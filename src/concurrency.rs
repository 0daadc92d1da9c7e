//! Connection pooling and concurrency governance
//!
//! The benchmark runs a fixed number of worker threads against one binding.
//! Pool limits are derived from that thread count:
//! - at most `2 * threads` requests are in flight at once
//! - up to `threads + 1` idle keep-alive connections are kept per host
//!
//! # Example
//!
//! ```
//! use ycsb_ydb::concurrency::{PoolConfig, QueryGovernor};
//!
//! let pool = PoolConfig::for_threads(4);
//! assert_eq!(pool.max_open(), 8);
//! assert_eq!(pool.max_idle(), 5);
//!
//! let governor = QueryGovernor::new(pool.max_open());
//! let permit = governor.try_acquire().expect("permit available");
//! assert_eq!(governor.in_flight(), 1);
//! drop(permit);
//! assert_eq!(governor.in_flight(), 0);
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::{Error, Result};

/// Default request timeout for the HTTP transport
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Pool sizing derived from the harness thread count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    max_open: usize,
    max_idle: usize,
}

impl PoolConfig {
    /// Size the pool for `threads` benchmark workers
    pub fn for_threads(threads: usize) -> Self {
        let threads = threads.max(1);
        Self {
            max_open: threads * 2,
            max_idle: threads + 1,
        }
    }

    /// Maximum number of requests in flight
    pub fn max_open(&self) -> usize {
        self.max_open
    }

    /// Maximum number of idle keep-alive connections per host
    pub fn max_idle(&self) -> usize {
        self.max_idle
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::for_threads(1)
    }
}

/// Limits the number of in-flight requests
///
/// Clones share the same permits.
#[derive(Debug, Clone)]
pub struct QueryGovernor {
    semaphore: Arc<Semaphore>,
    max_in_flight: usize,
}

impl QueryGovernor {
    /// Create a governor allowing `max_in_flight` concurrent requests
    pub fn new(max_in_flight: usize) -> Self {
        let max_in_flight = max_in_flight.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight,
        }
    }

    /// Maximum number of concurrent requests
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Current number of held permits
    pub fn in_flight(&self) -> usize {
        self.max_in_flight - self.semaphore.available_permits()
    }

    /// Take a permit without waiting
    pub fn try_acquire(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.semaphore).try_acquire_owned().ok()
    }

    /// Wait for a permit; released when the permit is dropped
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| Error::Closed)
    }

    /// Refuse all further permits; waiters fail with `Error::Closed`
    pub fn close(&self) {
        self.semaphore.close();
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }
}

/// HTTP transport settings
///
/// `pool_idle_connections` sizes the keep-alive pool; it does not cap
/// concurrency. Pair it with a `QueryGovernor` for that.
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct HttpTransportPolicy {
    pool_idle_connections: usize,
    request_timeout: Duration,
}

#[cfg(feature = "http")]
impl Default for HttpTransportPolicy {
    fn default() -> Self {
        Self {
            pool_idle_connections: PoolConfig::default().max_idle(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[cfg(feature = "http")]
impl HttpTransportPolicy {
    /// Create a policy from pool sizing and a request timeout
    pub fn new(pool: PoolConfig, request_timeout: Duration) -> Self {
        Self {
            pool_idle_connections: pool.max_idle(),
            request_timeout,
        }
    }

    /// Maximum number of idle connections per host
    pub fn pool_idle_connections(&self) -> usize {
        self.pool_idle_connections
    }

    /// Per-request timeout
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Build a reqwest client configured by this policy
    pub fn create_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.request_timeout)
            .pool_max_idle_per_host(self.pool_idle_connections)
            .build()
            .map_err(Error::from)
    }
}
