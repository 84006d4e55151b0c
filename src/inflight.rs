//! Registry of pending fetches, one per key.
//!
//! A flight is a `Shared` boxed future; every caller that finds it joins the same
//! result. Registration happens under the registry lock in the same critical
//! section as the lookup, so two callers can never both see an empty slot.

use futures::future::{BoxFuture, Shared};
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, Weak};

/// Shared handle to one pending fetch.
pub(crate) type SharedFetch<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

struct Flight {
    id: u64,
    handle: Box<dyn Any + Send + Sync>,
}

#[derive(Default)]
pub(crate) struct InFlight {
    flights: Mutex<HashMap<String, Flight>>,
    next_id: AtomicU64,
    settled: AtomicU64,
}

/// Locked view of the registry.
pub(crate) struct Flights<'a> {
    map: MutexGuard<'a, HashMap<String, Flight>>,
    next_id: &'a AtomicU64,
    settled: &'a AtomicU64,
}

impl InFlight {
    pub(crate) fn lock(&self) -> Flights<'_> {
        Flights {
            map: self.flights.lock().unwrap_or_else(PoisonError::into_inner),
            next_id: &self.next_id,
            settled: &self.settled,
        }
    }

    /// Whether `id` still owns the slot for `key`.
    pub(crate) fn is_current(&self, key: &str, id: u64) -> bool {
        self.lock().owns(key, id)
    }

    /// Settle sequence the next settling flight will receive.
    ///
    /// A caller that reads this before its storage lookups can tell, once it
    /// holds the lock, whether a flight settled in between.
    pub(crate) fn settled(&self) -> u64 {
        self.settled.load(Ordering::SeqCst)
    }

    /// Drop the slot for `key` if it still belongs to flight `id`.
    pub(crate) fn release(&self, key: &str, id: u64) {
        let mut flights = self.lock();
        if flights.owns(key, id) {
            flights.map.remove(key);
        }
    }

    /// Forget the flight for `key`. A running fetch keeps running for its joiners.
    pub(crate) fn forget(&self, key: &str) {
        self.lock().map.remove(key);
    }

    pub(crate) fn forget_all(&self) {
        self.lock().map.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().map.len()
    }
}

impl Flights<'_> {
    /// Join the flight for `key`, if one is registered with matching types.
    pub(crate) fn join<V, E>(&self, key: &str) -> Option<SharedFetch<V, E>>
    where
        V: Clone + Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
    {
        let flight = self.map.get(key)?;
        match flight.handle.downcast_ref::<SharedFetch<V, E>>() {
            Some(shared) => Some(shared.clone()),
            None => {
                tracing::warn!(
                    "In-flight fetch has a different type, not joining: key={}",
                    key
                );
                None
            }
        }
    }

    pub(crate) fn owns(&self, key: &str, id: u64) -> bool {
        self.map.get(key).is_some_and(|f| f.id == id)
    }

    /// Take the next settle sequence number.
    pub(crate) fn settle(&self) -> u64 {
        self.settled.fetch_add(1, Ordering::SeqCst)
    }

    /// Reserve an id for a flight about to be registered.
    pub(crate) fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Register `shared` as the flight for `key`, replacing any previous one.
    pub(crate) fn register<V, E>(&mut self, key: &str, id: u64, shared: SharedFetch<V, E>)
    where
        V: Clone + Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
    {
        self.map.insert(
            key.to_string(),
            Flight {
                id,
                handle: Box::new(shared),
            },
        );
    }
}

/// Releases a flight's slot when the flight body finishes or unwinds.
pub(crate) struct FlightGuard {
    registry: Weak<InFlight>,
    key: String,
    id: u64,
}

impl FlightGuard {
    pub(crate) fn new(registry: Weak<InFlight>, key: String, id: u64) -> Self {
        FlightGuard { registry, key, id }
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.release(&self.key, self.id);
        }
    }
}
