// Queue Registry - identity -> weakly held Queue

use super::queue::{Queue, QueueCell};
use crate::domain::QueueIdentity;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::{Arc, Weak};
use tracing::debug;

struct Slot {
    cell: Arc<QueueCell>,
    queue: Weak<Queue>,
}

impl Slot {
    fn publish(queue: &Arc<Queue>) -> Self {
        Self {
            cell: queue.cell().clone(),
            queue: Arc::downgrade(queue),
        }
    }

    /// No handle is alive and none is still releasing its rule
    fn is_reclaimable(&self) -> bool {
        self.queue.strong_count() == 0 && Arc::strong_count(&self.cell) == 1
    }
}

/// Process-wide map from queue identity to the live `Queue` for it.
///
/// The registry never keeps a queue alive: destinations hold the strong
/// references, so a queue disappears (and releases its rule) as soon as the
/// last binding to it goes away. Dead entries are swept by `prune`.
#[derive(Default)]
pub struct QueueRegistry {
    queues: DashMap<QueueIdentity, Slot>,
}

impl QueueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live queue for `identity`, if any destination still holds it
    pub fn get(&self, identity: &QueueIdentity) -> Option<Arc<Queue>> {
        self.queues.get(identity).and_then(|slot| slot.queue.upgrade())
    }

    /// Return the live queue for `identity`, publishing a fresh one if the
    /// slot is empty or its queue has been dropped.
    pub fn get_or_create(&self, identity: &QueueIdentity) -> Arc<Queue> {
        let existing = self.get(identity);
        if let Some(queue) = existing {
            return queue;
        }

        // The entry guard locks this identity's slot, so two callers cannot
        // publish two different queues for it
        match self.queues.entry(identity.clone()) {
            Entry::Occupied(mut slot) => match slot.get().queue.upgrade() {
                Some(queue) => queue,
                None => {
                    // Same cell: a predecessor still releasing finishes first
                    let queue = Arc::new(Queue::successor(&slot.get().cell));
                    slot.get_mut().queue = Arc::downgrade(&queue);
                    debug!(queue = %identity, "Replaced reclaimed delegation queue");
                    queue
                }
            },
            Entry::Vacant(slot) => {
                let queue = Arc::new(Queue::new(identity.clone()));
                slot.insert(Slot::publish(&queue));
                debug!(queue = %identity, "Registered delegation queue");
                queue
            }
        }
    }

    /// Drop entries whose queue is gone. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let before = self.queues.len();
        self.queues.retain(|_, slot| !slot.is_reclaimable());
        let removed = before.saturating_sub(self.queues.len());
        if removed > 0 {
            debug!(removed, remaining = self.queues.len(), "Pruned delegation queues");
        }
        removed
    }

    /// Every queue that is still alive
    pub fn live_queues(&self) -> Vec<Arc<Queue>> {
        self.queues
            .iter()
            .filter_map(|entry| entry.value().queue.upgrade())
            .collect()
    }

    /// Number of entries, including ones not yet pruned
    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}
