// Queue State - immutable snapshot of one queue generation

use crate::port::{CreateRuleError, DelegationRule};
use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// Condition of a queue at one instant.
#[derive(Debug)]
pub enum QueueStatus {
    /// No rule and no error (initial state, or after detach)
    Empty,
    /// Last initialization attempt failed
    Failed {
        error: CreateRuleError,
        retryable: bool,
    },
    /// A rule was created and is held until detach or drop
    Ready { rule: Box<dyn DelegationRule> },
}

/// Immutable queue state.
///
/// A `Queue` never mutates a state in place; it publishes a new
/// `Arc<QueueState>` instead. Callers that captured an `Arc` can compare it
/// with the current one by pointer to find out whether the queue has moved
/// on since they looked.
#[derive(Debug)]
pub struct QueueState {
    status: QueueStatus,
    correlation_id: Uuid,
    entered_at: DateTime<Utc>,
}

impl QueueState {
    pub fn empty() -> Self {
        Self::with_status(QueueStatus::Empty)
    }

    /// Build a failed state. Only "queue not found" is retryable: the
    /// counterpart process may simply not have registered the queue yet.
    pub fn failed(error: CreateRuleError) -> Self {
        let retryable = error.is_transient();
        Self::with_status(QueueStatus::Failed { error, retryable })
    }

    pub fn ready(rule: Box<dyn DelegationRule>) -> Self {
        Self::with_status(QueueStatus::Ready { rule })
    }

    fn with_status(status: QueueStatus) -> Self {
        Self {
            status,
            correlation_id: Uuid::new_v4(),
            entered_at: Utc::now(),
        }
    }

    pub fn status(&self) -> &QueueStatus {
        &self.status
    }

    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    pub fn entered_at(&self) -> DateTime<Utc> {
        self.entered_at
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.status, QueueStatus::Ready { .. })
    }

    /// True while an initialize call should still attempt rule creation.
    pub fn needs_initialization(&self) -> bool {
        match &self.status {
            QueueStatus::Empty => true,
            QueueStatus::Failed { retryable, .. } => *retryable,
            QueueStatus::Ready { .. } => false,
        }
    }

    pub fn rule(&self) -> Option<&dyn DelegationRule> {
        match &self.status {
            QueueStatus::Ready { rule } => Some(rule.as_ref()),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&CreateRuleError> {
        match &self.status {
            QueueStatus::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self.status {
            QueueStatus::Empty => "empty",
            QueueStatus::Failed { .. } => "failed",
            QueueStatus::Ready { .. } => "ready",
        }
    }

    /// Release the held rule, if any. Callers guarantee this runs once per
    /// ready state: under the queue lock right before the state is replaced,
    /// or when the owning queue is dropped.
    pub(crate) fn release_rule(&self) {
        if let QueueStatus::Ready { rule } = &self.status {
            rule.release();
        }
    }
}

impl Default for QueueState {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for QueueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            QueueStatus::Empty => write!(f, "empty [{}]", self.correlation_id),
            QueueStatus::Ready { .. } => write!(f, "ready [{}]", self.correlation_id),
            QueueStatus::Failed { error, retryable } => write!(
                f,
                "failed (retryable: {}) [{}]: {}",
                retryable, self.correlation_id, error
            ),
        }
    }
}
