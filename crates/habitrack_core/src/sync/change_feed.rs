//! In-process snapshot feed backing collection subscriptions.
//!
//! # Responsibility
//! - Track live subscribers and their cancellation handles.
//! - Queue full-collection snapshots in commit order until the host event
//!   loop drains them.
//!
//! # Invariants
//! - A subscriber first receives the snapshot current at subscribe time, then
//!   one snapshot per later commit, in commit order.
//! - A subscriber never receives a snapshot committed before it subscribed.
//! - A delivery that starts after `cancel` returns never invokes the handler.
//!   A handler call already running on another thread may still finish;
//!   consumers that need a hard cutoff check their own generation.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Callback receiving either a full snapshot or the error that prevented it.
pub type SnapshotHandler<T, E> = Box<dyn FnMut(Result<&[T], &E>) + Send>;

type SharedHandler<T, E> = Arc<Mutex<SnapshotHandler<T, E>>>;

/// Cancellation handle returned by `subscribe`.
///
/// Dropping the handle cancels the subscription as well.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    active: Arc<AtomicBool>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Stops deliveries to this subscriber. Safe to call repeatedly.
    ///
    /// Does not wait for a handler call in flight on another thread.
    pub fn cancel(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

struct Subscriber<T, E> {
    id: u64,
    since_seq: u64,
    active: Arc<AtomicBool>,
    handler: SharedHandler<T, E>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    One(u64),
    All,
}

struct PendingSnapshot<T, E> {
    seq: u64,
    target: Target,
    payload: Arc<Result<Vec<T>, E>>,
}

/// One queued snapshot paired with the handlers it is addressed to.
///
/// Produced while the feed is locked and delivered after the lock is
/// released, so handlers may write to the collection.
pub struct Delivery<T, E> {
    payload: Arc<Result<Vec<T>, E>>,
    recipients: Vec<(Arc<AtomicBool>, SharedHandler<T, E>)>,
}

impl<T, E> Delivery<T, E> {
    /// Invokes every still-active recipient; returns the invocation count.
    pub fn deliver(self) -> usize {
        let mut delivered = 0;
        for (active, handler) in self.recipients {
            if !active.load(Ordering::SeqCst) {
                continue;
            }
            let mut handler = handler.lock().unwrap_or_else(PoisonError::into_inner);
            // Re-check under the handler lock: the subscription may have been
            // cancelled by an earlier recipient of this same delivery.
            if !active.load(Ordering::SeqCst) {
                continue;
            }
            let snapshot = match &*self.payload {
                Ok(records) => Ok(records.as_slice()),
                Err(err) => Err(err),
            };
            let callback = &mut *handler;
            callback(snapshot);
            delivered += 1;
        }
        delivered
    }
}

/// Subscriber registry plus ordered queue of undelivered snapshots.
pub struct ChangeFeed<T, E> {
    next_subscriber_id: u64,
    commit_seq: u64,
    subscribers: Vec<Subscriber<T, E>>,
    pending: VecDeque<PendingSnapshot<T, E>>,
}

impl<T, E> Default for ChangeFeed<T, E> {
    fn default() -> Self {
        Self {
            next_subscriber_id: 1,
            commit_seq: 0,
            subscribers: Vec::new(),
            pending: VecDeque::new(),
        }
    }
}

impl<T, E> ChangeFeed<T, E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` and queues `initial` as its first snapshot.
    pub fn subscribe(
        &mut self,
        handler: SnapshotHandler<T, E>,
        initial: Result<Vec<T>, E>,
    ) -> Subscription {
        self.prune_cancelled();

        let id = self.next_subscriber_id;
        self.next_subscriber_id += 1;
        let active = Arc::new(AtomicBool::new(true));

        self.subscribers.push(Subscriber {
            id,
            since_seq: self.commit_seq,
            active: Arc::clone(&active),
            handler: Arc::new(Mutex::new(handler)),
        });
        self.pending.push_back(PendingSnapshot {
            seq: self.commit_seq,
            target: Target::One(id),
            payload: Arc::new(initial),
        });

        Subscription { id, active }
    }

    /// Records one committed change and queues its snapshot for everyone
    /// subscribed at commit time.
    pub fn publish(&mut self, snapshot: Result<Vec<T>, E>) {
        self.prune_cancelled();
        self.commit_seq += 1;
        if self.subscribers.is_empty() {
            return;
        }
        self.pending.push_back(PendingSnapshot {
            seq: self.commit_seq,
            target: Target::All,
            payload: Arc::new(snapshot),
        });
    }

    /// Pops the oldest queued snapshot with its current recipients.
    pub fn next_delivery(&mut self) -> Option<Delivery<T, E>> {
        let pending = self.pending.pop_front()?;
        let recipients = self
            .subscribers
            .iter()
            .filter(|subscriber| subscriber.active.load(Ordering::SeqCst))
            .filter(|subscriber| match pending.target {
                Target::One(id) => subscriber.id == id,
                Target::All => subscriber.since_seq < pending.seq,
            })
            .map(|subscriber| {
                (
                    Arc::clone(&subscriber.active),
                    Arc::clone(&subscriber.handler),
                )
            })
            .collect();

        Some(Delivery {
            payload: pending.payload,
            recipients,
        })
    }

    /// Number of live (not cancelled) subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .iter()
            .filter(|subscriber| subscriber.active.load(Ordering::SeqCst))
            .count()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Commit counter; increments once per published change.
    pub fn commit_seq(&self) -> u64 {
        self.commit_seq
    }

    fn prune_cancelled(&mut self) {
        self.subscribers
            .retain(|subscriber| subscriber.active.load(Ordering::SeqCst));
    }
}
