// Destination Bindings - destination -> Queue it delegates to

use super::queue::Queue;
use crate::domain::DestinationKey;
use dashmap::DashMap;
use std::sync::Arc;

/// Strong side of the queue lifetime: each bound destination holds one
/// reference, so a queue lives exactly as long as some destination uses it.
///
/// Entries are replaced atomically; a concurrent reader sees either the old
/// or the new queue, never a partial binding.
#[derive(Default)]
pub struct DestinationBindings {
    bindings: DashMap<DestinationKey, Arc<Queue>>,
}

impl DestinationBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, destination: &DestinationKey) -> Option<Arc<Queue>> {
        self.bindings.get(destination).map(|queue| queue.value().clone())
    }

    pub fn contains(&self, destination: &DestinationKey) -> bool {
        self.bindings.contains_key(destination)
    }

    /// Bind `destination` to `queue`, returning the queue it used before
    pub fn bind(&self, destination: DestinationKey, queue: Arc<Queue>) -> Option<Arc<Queue>> {
        self.bindings.insert(destination, queue)
    }

    pub fn unbind(&self, destination: &DestinationKey) -> Option<Arc<Queue>> {
        self.bindings.remove(destination).map(|(_, queue)| queue)
    }

    /// Drop bindings of `cluster_id` whose destination fails `keep`.
    /// Returns how many were removed.
    ///
    /// Each removed queue is dropped after its shard guard is released, so a
    /// slow rule release never holds up lookups of other destinations.
    pub fn retain_cluster(&self, cluster_id: &str, keep: impl Fn(&str) -> bool) -> usize {
        let doomed = |key: &DestinationKey| {
            key.cluster_id == cluster_id && !keep(key.destination_id.as_str())
        };
        let candidates: Vec<DestinationKey> = self
            .bindings
            .iter()
            .filter(|entry| doomed(entry.key()))
            .map(|entry| entry.key().clone())
            .collect();

        candidates
            .iter()
            .filter_map(|key| self.bindings.remove_if(key, |key, _| doomed(key)))
            .count()
    }

    pub fn remove_cluster(&self, cluster_id: &str) -> usize {
        self.retain_cluster(cluster_id, |_| false)
    }

    /// Number of destinations currently bound to `queue`
    pub fn count_for(&self, queue: &Arc<Queue>) -> usize {
        self.bindings
            .iter()
            .filter(|entry| Arc::ptr_eq(entry.value(), queue))
            .count()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
