use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Mutex;

use futures::future::{BoxFuture, FutureExt, Shared};

/// Coalesces concurrent runs of the same operation, per key.
///
/// While a run for a key is in flight, further [`SingleFlight::run`] callers
/// with that key await it and receive a clone of its output instead of
/// starting another one.
pub struct SingleFlight<K, T: Clone> {
    inflight: Mutex<HashMap<K, Shared<BoxFuture<'static, T>>>>,
}

impl<K, T> SingleFlight<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Run `start()` unless a run for `key` is already in flight, then await
    /// the result.
    pub async fn run<F, Fut>(&self, key: K, start: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let flight = {
            let mut slots = self.inflight.lock().unwrap_or_else(|p| p.into_inner());
            match slots.get(&key) {
                Some(existing) if existing.peek().is_none() => existing.clone(),
                _ => {
                    let flight = start().boxed().shared();
                    slots.insert(key.clone(), flight.clone());
                    flight
                }
            }
        };
        self.settle(key, flight).await
    }

    /// Always start a new run for `key`.
    ///
    /// The new run replaces any in-flight one as the run later callers join,
    /// so a caller that needs output reflecting its own earlier writes never
    /// receives a run that began before them.
    pub async fn run_fresh<F, Fut>(&self, key: K, start: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let flight = start().boxed().shared();
        {
            let mut slots = self.inflight.lock().unwrap_or_else(|p| p.into_inner());
            slots.insert(key.clone(), flight.clone());
        }
        self.settle(key, flight).await
    }

    async fn settle(&self, key: K, flight: Shared<BoxFuture<'static, T>>) -> T {
        let output = flight.clone().await;

        let mut slots = self.inflight.lock().unwrap_or_else(|p| p.into_inner());
        if slots.get(&key).is_some_and(|current| current.ptr_eq(&flight)) {
            slots.remove(&key);
        }
        output
    }
}

impl<K, T> Default for SingleFlight<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
