// Queue - per-identity state machine guarding one delegation rule

use crate::domain::{QueueIdentity, QueueState};
use crate::port::DelegationCapability;
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// State shared by every `Queue` handle ever published for one identity.
///
/// The registry keeps the cell for as long as any handle (live or still
/// dropping) refers to it, so a rule released by a dying handle and a rule
/// created by its successor are serialized by the same `transition` lock.
pub(crate) struct QueueCell {
    identity: QueueIdentity,
    /// Generation of the newest handle
    generation: AtomicU64,
    transition: Mutex<()>,
    current: ArcSwap<QueueState>,
}

impl QueueCell {
    fn new(identity: QueueIdentity) -> Self {
        Self {
            identity,
            generation: AtomicU64::new(0),
            transition: Mutex::new(()),
            current: ArcSwap::from_pointee(QueueState::empty()),
        }
    }
}

/// Mutable owner of the current `QueueState` for one identity.
///
/// Readers load the current state without locking. Every transition happens
/// under the cell's transition lock, which is held for at most one
/// capability call.
pub struct Queue {
    cell: Arc<QueueCell>,
    generation: u64,
}

impl Queue {
    /// Create an empty queue. Never creates a rule; a queue built here and
    /// then discarded by a lost publish race holds nothing to release.
    pub fn new(identity: QueueIdentity) -> Self {
        Self {
            cell: Arc::new(QueueCell::new(identity)),
            generation: 0,
        }
    }

    /// Next handle for a cell whose previous handle is gone.
    ///
    /// Never blocks. A predecessor that has not reached its release yet hands
    /// its ready rule to the new handle; one that is mid-release finishes
    /// before the new handle can create a rule, since creation needs the
    /// same transition lock.
    pub(crate) fn successor(cell: &Arc<QueueCell>) -> Self {
        let generation = cell.generation.fetch_add(1, Ordering::SeqCst) + 1;

        // A busy lock means the predecessor is dropping and resets it itself
        if let Some(_guard) = cell.transition.try_lock() {
            if !cell.current.load().is_ready() {
                cell.current.store(Arc::new(QueueState::empty()));
            }
        }

        Self {
            cell: cell.clone(),
            generation,
        }
    }

    pub(crate) fn cell(&self) -> &Arc<QueueCell> {
        &self.cell
    }

    pub fn identity(&self) -> &QueueIdentity {
        &self.cell.identity
    }

    /// Current state (lock-free, acquire load)
    pub fn state(&self) -> Arc<QueueState> {
        self.cell.current.load_full()
    }

    /// Make sure a rule exists, creating one if the queue is empty or its
    /// last failure was transient. Returns the state current afterwards.
    pub fn initialize(&self, capability: &dyn DelegationCapability) -> Arc<QueueState> {
        let observed = self.state();
        if !observed.needs_initialization() {
            return observed;
        }

        let _guard = self.cell.transition.lock();

        let observed = self.state();
        if !observed.needs_initialization() {
            return observed;
        }

        let identity = self.identity();
        let next = match capability.create_rule(identity.queue_name(), identity.url_prefix()) {
            Ok(rule) => {
                let state = QueueState::ready(rule);
                debug!(
                    queue_name = %identity.queue_name(),
                    url_prefix = %identity.url_prefix(),
                    correlation_id = %state.correlation_id(),
                    "Delegation queue initialized"
                );
                state
            }
            Err(e) => {
                let state = QueueState::failed(e);
                warn!(
                    queue_name = %identity.queue_name(),
                    url_prefix = %identity.url_prefix(),
                    correlation_id = %state.correlation_id(),
                    error = %state,
                    "Delegation queue initialization failed"
                );
                state
            }
        };

        let next = Arc::new(next);
        self.cell.current.store(next.clone());
        next
    }

    /// Release the rule and return to `Empty`.
    ///
    /// With `expected`, the detach only happens if the current state is that
    /// exact instance; otherwise someone already moved the queue on and this
    /// returns `None` without touching it. Returns the detached state.
    pub fn detach(&self, expected: Option<&Arc<QueueState>>) -> Option<Arc<QueueState>> {
        if !self.is_current(expected) {
            return None;
        }

        let _guard = self.cell.transition.lock();

        if !self.is_current(expected) {
            return None;
        }

        let detached = self.cell.current.swap(Arc::new(QueueState::empty()));
        detached.release_rule();

        debug!(
            queue_name = %self.identity().queue_name(),
            url_prefix = %self.identity().url_prefix(),
            correlation_id = %detached.correlation_id(),
            previous_state = detached.kind(),
            "Delegation queue detached"
        );

        Some(detached)
    }

    fn is_current(&self, expected: Option<&Arc<QueueState>>) -> bool {
        match expected {
            Some(expected) => Arc::ptr_eq(expected, &self.cell.current.load()),
            None => true,
        }
    }
}

impl Drop for Queue {
    // Last binding gone: release whatever rule is still held, unless a
    // successor has already taken the cell over
    fn drop(&mut self) {
        let _guard = self.cell.transition.lock();
        if self.cell.generation.load(Ordering::SeqCst) != self.generation {
            // The successor keeps a ready rule but never a stale failure
            if !self.cell.current.load().is_ready() {
                self.cell.current.store(Arc::new(QueueState::empty()));
            }
            return;
        }

        let state = self.cell.current.swap(Arc::new(QueueState::empty()));
        if state.is_ready() {
            state.release_rule();
            debug!(
                queue_name = %self.identity().queue_name(),
                url_prefix = %self.identity().url_prefix(),
                correlation_id = %state.correlation_id(),
                "Released delegation queue with no remaining destinations"
            );
        }
    }
}

impl std::fmt::Debug for Queue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue")
            .field("identity", self.identity())
            .field("generation", &self.generation)
            .field("state", &self.state().kind())
            .finish()
    }
}
