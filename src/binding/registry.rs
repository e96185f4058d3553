//! Per-type instance pools.

use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::pool::{Pool, PoolStats, DEFAULT_IDLE_TIMEOUT};

/// Type-independent operations on a registered pool.
trait PoolControl: Send + Sync {
    fn stats(&self) -> PoolStats;
    fn sweep(&self) -> usize;
    fn close(&self);
}

impl<V: Send> PoolControl for Pool<V> {
    fn stats(&self) -> PoolStats {
        Pool::stats(self)
    }

    fn sweep(&self) -> usize {
        Pool::sweep(self)
    }

    fn close(&self) {
        Pool::close(self)
    }
}

struct RegisteredPool {
    type_name: &'static str,
    pool: Arc<dyn Any + Send + Sync>,
    control: Arc<dyn PoolControl>,
}

/// Mapping from pooled value type to its pool.
///
/// Owned by the [`Server`](crate::server::Server) and shared with every
/// dispatch function it creates. Pools are created on the first request that
/// needs one; concurrent first requests agree on a single pool.
pub struct PoolRegistry {
    pools: DashMap<TypeId, RegisteredPool>,
    idle_timeout: Duration,
}

impl Default for PoolRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_TIMEOUT)
    }
}

impl PoolRegistry {
    #[must_use]
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            pools: DashMap::new(),
            idle_timeout,
        }
    }

    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// The pool for values of type `V`, created with `make_pool` if absent.
    ///
    /// `make_pool` receives the registry's idle timeout and runs at most once
    /// per type. Returns `None` only if a pool of a different value type was
    /// registered under the same key, which cannot happen through this API.
    pub fn pool_for<V, F>(&self, type_name: &'static str, make_pool: F) -> Option<Arc<Pool<V>>>
    where
        V: Send + 'static,
        F: FnOnce(Duration) -> Pool<V>,
    {
        let type_id = TypeId::of::<V>();
        if let Some(entry) = self.pools.get(&type_id) {
            return Arc::clone(&entry.pool).downcast::<Pool<V>>().ok();
        }
        let entry = self.pools.entry(type_id).or_insert_with(|| {
            let pool = Arc::new(make_pool(self.idle_timeout));
            info!(
                type_name = type_name,
                idle_timeout_secs = self.idle_timeout.as_secs(),
                "Instance pool created"
            );
            RegisteredPool {
                type_name,
                pool: Arc::clone(&pool) as Arc<dyn Any + Send + Sync>,
                control: pool,
            }
        });
        Arc::clone(&entry.pool).downcast::<Pool<V>>().ok()
    }

    /// Snapshot of every pool, by type name.
    #[must_use]
    pub fn metrics(&self) -> BTreeMap<&'static str, PoolStats> {
        self.pools
            .iter()
            .map(|entry| (entry.type_name, entry.control.stats()))
            .collect()
    }

    /// Evict expired idle instances from every pool.
    pub fn sweep_all(&self) -> usize {
        let controls: Vec<Arc<dyn PoolControl>> = self
            .pools
            .iter()
            .map(|entry| Arc::clone(&entry.control))
            .collect();
        let expired: usize = controls.iter().map(|c| c.sweep()).sum();
        if expired > 0 {
            debug!(expired = expired, "Idle instances evicted");
        }
        expired
    }

    /// Close every pool; instances still borrowed are dropped when returned.
    pub fn close_all(&self) {
        for entry in self.pools.iter() {
            entry.control.close();
        }
    }

    /// Start a background thread calling [`sweep_all`](Self::sweep_all)
    /// every `interval`, so idle instances expire without traffic.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> std::io::Result<Sweeper> {
        let (stop, stopped) = mpsc::channel::<()>();
        let registry = Arc::clone(self);
        let handle = thread::Builder::new()
            .name("objroute-pool-sweeper".to_string())
            .spawn(move || loop {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        registry.sweep_all();
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;
        debug!(interval_ms = interval.as_millis() as u64, "Pool sweeper started");
        Ok(Sweeper {
            stop: Some(stop),
            handle: Some(handle),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}

/// Sweep period for an idle timeout: half the timeout, kept between 100 ms
/// and 60 s.
#[must_use]
pub fn sweep_interval(idle_timeout: Duration) -> Duration {
    (idle_timeout / 2).clamp(Duration::from_millis(100), Duration::from_secs(60))
}

/// Handle to the thread started by [`PoolRegistry::spawn_sweeper`].
/// Stopped on [`stop`](Self::stop) or drop.
pub struct Sweeper {
    stop: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    /// Signal the thread and wait for it to exit.
    pub fn stop(&mut self) {
        // Dropping the sender wakes the thread with `Disconnected`.
        self.stop.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Pool sweeper thread panicked");
            }
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_is_created_once_per_type() {
        let registry = PoolRegistry::new(Duration::from_secs(5));
        let mut calls = 0;
        let a = registry
            .pool_for::<u32, _>("u32", |t| {
                calls += 1;
                Pool::new(t, || 7)
            })
            .unwrap();
        let b = registry
            .pool_for::<u32, _>("u32", |t| Pool::new(t, || 9))
            .unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls, 1);
        assert_eq!(b.get(), 7);
        assert_eq!(a.idle_timeout(), Duration::from_secs(5));

        registry.pool_for::<String, _>("String", |t| Pool::new(t, String::new));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_sweep_interval_bounds() {
        assert_eq!(sweep_interval(Duration::ZERO), Duration::from_millis(100));
        assert_eq!(sweep_interval(Duration::from_secs(4)), Duration::from_secs(2));
        assert_eq!(sweep_interval(Duration::from_secs(300)), Duration::from_secs(60));
    }

    #[test]
    fn test_sweeper_evicts_idle_values() {
        let registry = Arc::new(PoolRegistry::new(Duration::from_millis(30)));
        let pool = registry
            .pool_for::<u8, _>("u8", |t| Pool::new(t, || 1))
            .unwrap();
        let v = pool.get();
        pool.put(v);

        let mut sweeper = registry.spawn_sweeper(Duration::from_millis(10)).unwrap();
        std::thread::sleep(Duration::from_millis(200));
        assert_eq!(registry.metrics()["u8"].expired, 1);
        assert!(pool.is_empty());

        sweeper.stop();
        assert!(!sweeper.is_running());
    }

    #[test]
    fn test_metrics_by_type_name() {
        let registry = PoolRegistry::default();
        let pool = registry
            .pool_for::<u8, _>("u8", |t| Pool::new(t, || 1))
            .unwrap();
        let v = pool.get();
        pool.put(v);
        let metrics = registry.metrics();
        assert_eq!(metrics["u8"].created, 1);
        assert_eq!(metrics["u8"].idle, 1);

        registry.close_all();
        assert!(pool.is_closed());
        assert_eq!(registry.metrics()["u8"].idle, 0);
    }
}
