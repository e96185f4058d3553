//! # Instance Pool Module
//!
//! A concurrent object pool with idle-timeout eviction. Object bindings keep
//! one pool per handler type so handler instances are built once and reused
//! across requests, while each borrowed instance stays exclusive to one
//! request.
//!
//! ## Semantics
//!
//! - [`Pool::get`] hands out an idle value or builds a new one with the factory
//! - [`Pool::put`] makes a value available again; after [`Pool::close`] it is dropped
//! - Values idle for longer than the timeout are evicted on `get`/`put` and
//!   by [`Pool::sweep`], which the server's sweeper thread calls periodically;
//!   evicted values go to the expire callback
//! - The most recently returned value is reused first
//!
//! ## Configuration
//!
//! The idle timeout comes from
//! [`ServerConfig::pool_idle_timeout`](crate::config::ServerConfig::pool_idle_timeout)
//! (`OBJR_POOL_IDLE_SECS`, default 300 seconds).

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Default idle timeout for pooled values.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Counters for a pool
#[derive(Debug, Default)]
pub struct PoolMetrics {
    created: AtomicU64,
    borrowed: AtomicU64,
    returned: AtomicU64,
    expired: AtomicU64,
}

impl PoolMetrics {
    fn record_created(&self) {
        self.created.fetch_add(1, Ordering::Relaxed);
    }

    fn record_borrow(&self) {
        self.borrowed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_return(&self) {
        self.returned.fetch_add(1, Ordering::Relaxed);
    }

    fn record_expired(&self, count: usize) {
        self.expired.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Values built by the factory
    pub fn get_created_count(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }

    /// Successful `get` calls
    pub fn get_borrowed_count(&self) -> u64 {
        self.borrowed.load(Ordering::Relaxed)
    }

    /// `put` calls, including those evicted by a closed pool
    pub fn get_returned_count(&self) -> u64 {
        self.returned.load(Ordering::Relaxed)
    }

    /// Values evicted by idle timeout, `clear` or `close`
    pub fn get_expired_count(&self) -> u64 {
        self.expired.load(Ordering::Relaxed)
    }
}

/// Point-in-time view of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PoolStats {
    pub idle: usize,
    pub created: u64,
    pub borrowed: u64,
    pub returned: u64,
    pub expired: u64,
}

impl PoolStats {
    /// Values currently held by callers (borrowed and not yet returned).
    #[must_use]
    pub fn in_use(&self) -> u64 {
        self.borrowed.saturating_sub(self.returned)
    }
}

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;
type ExpireFn<T> = Box<dyn Fn(T) + Send + Sync>;

struct Idle<T> {
    value: T,
    since: Instant,
}

/// Concurrent pool of reusable values.
pub struct Pool<T> {
    idle: Mutex<VecDeque<Idle<T>>>,
    idle_timeout: Duration,
    factory: Factory<T>,
    on_expire: Option<ExpireFn<T>>,
    closed: AtomicBool,
    metrics: PoolMetrics,
}

impl<T: Send> Pool<T> {
    /// Create a pool building new values with `factory`.
    pub fn new<F>(idle_timeout: Duration, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            idle: Mutex::new(VecDeque::new()),
            idle_timeout,
            factory: Box::new(factory),
            on_expire: None,
            closed: AtomicBool::new(false),
            metrics: PoolMetrics::default(),
        }
    }

    /// Call `on_expire` with every value the pool evicts.
    #[must_use]
    pub fn with_expire<F>(mut self, on_expire: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.on_expire = Some(Box::new(on_expire));
        self
    }

    /// Borrow a value. The caller owns it exclusively until it is `put` back.
    pub fn get(&self) -> T {
        self.sweep();
        let reused = self.idle.lock().pop_back();
        let value = match reused {
            Some(idle) => idle.value,
            None => {
                // Built outside the lock; the value is invisible to other
                // callers until it is returned.
                let value = (self.factory)();
                self.metrics.record_created();
                value
            }
        };
        self.metrics.record_borrow();
        value
    }

    /// Return a borrowed value. A closed pool evicts it immediately.
    pub fn put(&self, value: T) {
        {
            let mut idle = self.idle.lock();
            self.metrics.record_return();
            if !self.closed.load(Ordering::Acquire) {
                idle.push_back(Idle {
                    value,
                    since: Instant::now(),
                });
                drop(idle);
                self.sweep();
                return;
            }
        }
        self.expire(vec![value]);
    }

    /// Evict values idle for at least the timeout; returns how many.
    pub fn sweep(&self) -> usize {
        let expired: Vec<T> = {
            let mut idle = self.idle.lock();
            let mut expired = Vec::new();
            while idle
                .front()
                .is_some_and(|item| item.since.elapsed() >= self.idle_timeout)
            {
                if let Some(item) = idle.pop_front() {
                    expired.push(item.value);
                }
            }
            expired
        };
        self.expire(expired)
    }

    /// Evict every idle value.
    pub fn clear(&self) -> usize {
        let drained: Vec<T> = self.idle.lock().drain(..).map(|item| item.value).collect();
        self.expire(drained)
    }

    /// Stop accepting returned values and evict the idle ones.
    pub fn close(&self) {
        let drained: Vec<T> = {
            let mut idle = self.idle.lock();
            self.closed.store(true, Ordering::Release);
            idle.drain(..).map(|item| item.value).collect()
        };
        self.expire(drained);
    }

    fn expire(&self, values: Vec<T>) -> usize {
        let count = values.len();
        if count > 0 {
            self.metrics.record_expired(count);
        }
        for value in values {
            if let Some(on_expire) = &self.on_expire {
                on_expire(value);
            }
        }
        count
    }

    /// Number of idle values.
    pub fn len(&self) -> usize {
        self.idle.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    pub fn metrics(&self) -> &PoolMetrics {
        &self.metrics
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            idle: self.len(),
            created: self.metrics.get_created_count(),
            borrowed: self.metrics.get_borrowed_count(),
            returned: self.metrics.get_returned_count(),
            expired: self.metrics.get_expired_count(),
        }
    }
}
