//! Typed fan-out event channels.
//!
//! Channels are addressed by a structured key instead of a formatted string
//! name, so two different `(kind, service, node)` triples can never collide.
//! Emission is synchronous: every listener registered for the key runs on the
//! emitting thread, in subscription order, before `emit` returns.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::mpsc;
use tracing::trace;

/// Handle identifying one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Delivered,
    Closed,
}

type Listener<E> = Arc<dyn Fn(&E) -> Delivery + Send + Sync>;

struct Registration<E> {
    id: ListenerId,
    listener: Listener<E>,
}

impl<E> Clone for Registration<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            listener: Arc::clone(&self.listener),
        }
    }
}

/// Registry mapping a channel key to the listeners subscribed to it.
pub struct EventChannels<K, E> {
    listeners: RwLock<HashMap<K, Vec<Registration<E>>>>,
    next_id: AtomicU64,
}

impl<K, E> Default for EventChannels<K, E>
where
    K: Eq + Hash + Clone,
    E: 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, E> std::fmt::Debug for EventChannels<K, E>
where
    K: Eq + Hash + Clone,
    E: 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventChannels")
            .field("channels", &self.read().len())
            .finish()
    }
}

impl<K, E> EventChannels<K, E>
where
    K: Eq + Hash + Clone,
    E: 'static,
{
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a callback for `key`.
    pub fn subscribe<F>(&self, key: K, listener: F) -> ListenerId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.register(
            key,
            Arc::new(move |event: &E| {
                listener(event);
                Delivery::Delivered
            }),
        )
    }

    /// Register a channel-backed listener for async consumers.
    ///
    /// Once the receiver is dropped the listener is pruned on the next emit
    /// for the same key.
    pub fn subscribe_stream(&self, key: K) -> (ListenerId, mpsc::UnboundedReceiver<E>)
    where
        E: Clone + Send,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self.register(
            key,
            Arc::new(move |event: &E| match sender.send(event.clone()) {
                Ok(()) => Delivery::Delivered,
                Err(_) => Delivery::Closed,
            }),
        );
        (id, receiver)
    }

    /// Remove a listener. Returns `false` if it was not registered under `key`.
    pub fn unsubscribe(&self, key: &K, id: ListenerId) -> bool {
        let mut guard = self.write();
        let (removed, now_empty) = match guard.get_mut(key) {
            Some(registrations) => {
                let before = registrations.len();
                registrations.retain(|registration| registration.id != id);
                (registrations.len() != before, registrations.is_empty())
            }
            None => (false, false),
        };
        if now_empty {
            guard.remove(key);
        }
        removed
    }

    /// Deliver `event` to every listener of `key` and return how many were reached.
    ///
    /// Emitting on a key nobody listens to is a no-op.
    pub fn emit(&self, key: &K, event: &E) -> usize {
        // Listeners run without the lock held so they may subscribe or emit.
        let snapshot = match self.read().get(key) {
            Some(registrations) => registrations.clone(),
            None => return 0,
        };

        let mut delivered = 0;
        let mut closed = Vec::new();
        for registration in &snapshot {
            match (registration.listener)(event) {
                Delivery::Delivered => delivered += 1,
                Delivery::Closed => closed.push(registration.id),
            }
        }

        if !closed.is_empty() {
            trace!(count = closed.len(), "pruning closed event listeners");
            let mut guard = self.write();
            let now_empty = match guard.get_mut(key) {
                Some(registrations) => {
                    registrations.retain(|registration| !closed.contains(&registration.id));
                    registrations.is_empty()
                }
                None => false,
            };
            if now_empty {
                guard.remove(key);
            }
        }

        delivered
    }

    pub fn listener_count(&self, key: &K) -> usize {
        self.read().get(key).map_or(0, Vec::len)
    }

    fn register(&self, key: K, listener: Listener<E>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.write()
            .entry(key)
            .or_default()
            .push(Registration { id, listener });
        id
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<K, Vec<Registration<E>>>> {
        self.listeners.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<K, Vec<Registration<E>>>> {
        self.listeners.write().unwrap_or_else(PoisonError::into_inner)
    }
}
