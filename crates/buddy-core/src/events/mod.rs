//! Session update broadcasting
//!
//! [`UpdateBroadcaster`] fans session snapshots out to any number of
//! subscribers. Each subscriber owns a bounded queue; publishing never waits on
//! a slow subscriber. When a queue is full the oldest non-terminal snapshot is
//! dropped, so the terminal snapshot of a session survives unless the queue is
//! entirely made of terminal snapshots.

use crate::session::{SessionId, SessionUpdate};
use futures::Stream;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::Notify;
use tracing::debug;

/// Identifier handed out by [`UpdateBroadcaster::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

#[derive(Debug)]
struct SubscriberQueue {
    updates: Mutex<VecDeque<SessionUpdate>>,
    filter: UpdateFilter,
    notify: Notify,
    dropped: AtomicU64,
    closed: AtomicBool,
}

impl SubscriberQueue {
    fn new(capacity: usize, filter: UpdateFilter) -> Self {
        Self {
            updates: Mutex::new(VecDeque::with_capacity(capacity)),
            filter,
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Queue `update` if it passes the filter; false if filtered out
    fn push(&self, update: &SessionUpdate, capacity: usize) -> bool {
        if !self.filter.matches(update) {
            return false;
        }
        let mut updates = self.updates.lock();
        if updates.len() >= capacity {
            let victim = updates
                .iter()
                .position(|queued| !queued.is_terminal())
                .unwrap_or(0);
            updates.remove(victim);
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        updates.push_back(update.clone());
        drop(updates);
        self.notify.notify_one();
        true
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_one();
    }
}

/// Publish/subscribe hub for [`SessionUpdate`]s
#[derive(Debug)]
pub struct UpdateBroadcaster {
    subscribers: Mutex<HashMap<SubscriberId, Arc<SubscriberQueue>>>,
    next_id: AtomicU64,
    capacity: usize,
    published: AtomicU64,
}

impl UpdateBroadcaster {
    /// Create a broadcaster whose subscribers buffer up to `capacity` updates
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            capacity: capacity.max(1),
            published: AtomicU64::new(0),
        })
    }

    /// Deliver an update to every current subscriber
    ///
    /// Returns the number of subscribers the update was queued for.
    pub fn publish(&self, update: SessionUpdate) -> usize {
        self.published.fetch_add(1, Ordering::Relaxed);
        let subscribers = self.subscribers.lock();
        let mut queued = 0;
        for queue in subscribers.values() {
            if queue.push(&update, self.capacity) {
                queued += 1;
            }
        }
        queued
    }

    /// Subscribe to every update published from now on
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        self.subscribe_filtered(UpdateFilter::default())
    }

    /// Subscribe to the updates passing `filter`
    ///
    /// Filtered-out updates never occupy queue space.
    pub fn subscribe_filtered(self: &Arc<Self>, filter: UpdateFilter) -> Subscription {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let queue = Arc::new(SubscriberQueue::new(self.capacity, filter));
        self.subscribers.lock().insert(id, queue.clone());
        debug!("Subscriber {} attached", id);
        Subscription {
            id,
            queue,
            broadcaster: Arc::downgrade(self),
        }
    }

    /// Detach a subscriber; its pending `recv` returns `None`
    ///
    /// Returns false if the id was unknown.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        match self.subscribers.lock().remove(&id) {
            Some(queue) => {
                queue.close();
                debug!("Subscriber {} detached", id);
                true
            }
            None => false,
        }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Total number of updates published
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

/// Filter applied on the receiving side of a [`Subscription`]
#[derive(Debug, Clone, Default)]
pub struct UpdateFilter {
    session: Option<SessionId>,
}

impl UpdateFilter {
    /// Only pass updates for `session_id`
    pub fn session(session_id: SessionId) -> Self {
        Self {
            session: Some(session_id),
        }
    }

    /// Check if an update matches the filter
    pub fn matches(&self, update: &SessionUpdate) -> bool {
        self.session.is_none_or(|id| update.session.id == id)
    }
}

/// Receiving end of a subscription; unsubscribes on drop
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    queue: Arc<SubscriberQueue>,
    broadcaster: Weak<UpdateBroadcaster>,
}

impl Subscription {
    /// Identifier usable with [`UpdateBroadcaster::unsubscribe`]
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next update; `None` once unsubscribed and drained
    pub async fn recv(&mut self) -> Option<SessionUpdate> {
        loop {
            if let Some(update) = self.try_recv() {
                return Some(update);
            }
            if self.queue.closed.load(Ordering::Acquire) {
                return self.try_recv();
            }
            self.queue.notify.notified().await;
        }
    }

    /// Take the next queued update without waiting
    pub fn try_recv(&mut self) -> Option<SessionUpdate> {
        self.queue.updates.lock().pop_front()
    }

    /// Number of updates discarded because this subscriber fell behind
    pub fn dropped(&self) -> u64 {
        self.queue.dropped.load(Ordering::Relaxed)
    }

    /// Turn the subscription into a stream of updates
    pub fn into_stream(self) -> impl Stream<Item = SessionUpdate> + Send {
        futures::stream::unfold(self, |mut subscription| async move {
            subscription
                .recv()
                .await
                .map(|update| (update, subscription))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(broadcaster) = self.broadcaster.upgrade() {
            broadcaster.unsubscribe(self.id);
        }
    }
}
