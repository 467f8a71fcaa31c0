//! Snapshot fan-out to store observers.
//!
//! Every observer gets its own channel. Publishing sends the shared snapshot
//! handle, never a diff. Observers that dropped their receiver are pruned on
//! the next publish.

use crate::model::todo::Todo;
use std::sync::mpsc::{self, Receiver, RecvError, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

/// Immutable view of the full todo list at one commit point.
pub type Snapshot = Arc<[Todo]>;

/// Observer handle returned by `TodoStore::subscribe`.
///
/// Dropping the handle unsubscribes. The queue is unbounded: a held but
/// undrained subscription retains one snapshot per publish, so observers that
/// only render the newest state should call `latest`.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    receiver: Receiver<Snapshot>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Blocks until the next snapshot arrives.
    pub fn recv(&self) -> Result<Snapshot, RecvError> {
        self.receiver.recv()
    }

    pub fn try_recv(&self) -> Result<Snapshot, TryRecvError> {
        self.receiver.try_recv()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<Snapshot, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drains queued snapshots and returns the newest one, if any.
    pub fn latest(&self) -> Option<Snapshot> {
        self.receiver.try_iter().last()
    }

    /// Drains and returns every queued snapshot in publish order.
    pub fn drain(&self) -> Vec<Snapshot> {
        self.receiver.try_iter().collect()
    }
}

#[derive(Debug, Default)]
pub(crate) struct SubscriberRegistry {
    next_id: u64,
    senders: Vec<(u64, Sender<Snapshot>)>,
}

impl SubscriberRegistry {
    /// Registers an observer and primes it with `current`.
    pub(crate) fn subscribe(&mut self, current: &Snapshot) -> Subscription {
        let (sender, receiver) = mpsc::channel();
        let id = self.next_id;
        self.next_id += 1;

        // Receiver is alive here; send cannot fail.
        let _ = sender.send(Arc::clone(current));
        self.senders.push((id, sender));
        Subscription { id, receiver }
    }

    pub(crate) fn unsubscribe(&mut self, id: u64) -> bool {
        let before = self.senders.len();
        self.senders.retain(|(subscriber_id, _)| *subscriber_id != id);
        self.senders.len() != before
    }

    /// Sends `snapshot` to every live observer; returns how many got it.
    pub(crate) fn publish(&mut self, snapshot: &Snapshot) -> usize {
        self.senders
            .retain(|(_, sender)| sender.send(Arc::clone(snapshot)).is_ok());
        self.senders.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.senders.len()
    }
}
