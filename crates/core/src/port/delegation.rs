// Delegation Capability Port
// Abstraction over the host's kernel-level request delegation mechanism

use crate::domain::RequestContext;
use std::fmt;
use thiserror::Error;

/// Rule creation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CreateRuleError {
    /// The counterpart process has not registered the queue yet
    #[error("Delegation queue not found: {0}")]
    NotFound(String),

    #[error("Failed to create delegation rule: {0}")]
    Failed(String),
}

impl CreateRuleError {
    /// Only a missing queue is worth retrying before an explicit detach.
    pub fn is_transient(&self) -> bool {
        matches!(self, CreateRuleError::NotFound(_))
    }
}

/// Per-request delegation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DelegateError {
    #[error("Delegation rule has been disposed")]
    Disposed,

    /// The kernel object behind the rule no longer exists
    #[error("Delegation queue no longer exists: {0}")]
    Stale(String),

    #[error("Delegation failed: {0}")]
    Failed(String),
}

impl DelegateError {
    /// True when the held rule is unusable and the queue should be reset.
    pub fn is_rule_gone(&self) -> bool {
        matches!(self, DelegateError::Disposed | DelegateError::Stale(_))
    }
}

/// A created delegation rule bound to one queue identity.
pub trait DelegationRule: Send + Sync + fmt::Debug {
    /// Release the kernel resource backing this rule
    fn release(&self);
}

/// Delegation Capability trait
///
/// Implementations wrap the platform mechanism that hands a request over to
/// another process. Calls are synchronous and must not block on I/O beyond
/// the kernel call itself.
pub trait DelegationCapability: Send + Sync {
    /// Create a delegation rule for `(queue_name, url_prefix)`
    ///
    /// # Errors
    /// - CreateRuleError::NotFound if the target queue is not registered yet
    /// - CreateRuleError::Failed for anything else
    fn create_rule(
        &self,
        queue_name: &str,
        url_prefix: &str,
    ) -> Result<Box<dyn DelegationRule>, CreateRuleError>;

    /// Hand `request` off through `rule`
    ///
    /// # Errors
    /// - DelegateError::Disposed if the rule was already released
    /// - DelegateError::Stale if the queue object vanished
    /// - DelegateError::Failed for anything else
    fn delegate(
        &self,
        request: &mut RequestContext,
        rule: &dyn DelegationRule,
    ) -> Result<(), DelegateError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Rule handed out by the mock capability
    #[derive(Debug)]
    pub struct MockRule {
        pub id: u64,
        pub queue_name: String,
        pub url_prefix: String,
        releases: Arc<AtomicUsize>,
        live: Arc<AtomicUsize>,
        release_delay: Option<Duration>,
    }

    impl MockRule {
        /// A rule not tied to any capability, with its own release counter
        pub fn detached(
            queue_name: impl Into<String>,
            url_prefix: impl Into<String>,
        ) -> (Self, Arc<AtomicUsize>) {
            let releases = Arc::new(AtomicUsize::new(0));
            let rule = Self {
                id: 0,
                queue_name: queue_name.into(),
                url_prefix: url_prefix.into(),
                releases: releases.clone(),
                live: Arc::new(AtomicUsize::new(1)),
                release_delay: None,
            };
            (rule, releases)
        }
    }

    impl DelegationRule for MockRule {
        fn release(&self) {
            if let Some(delay) = self.release_delay {
                std::thread::sleep(delay);
            }
            // Still live until the release call returns
            self.live.fetch_sub(1, Ordering::SeqCst);
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Mock Delegation Capability for testing
    ///
    /// Results are scripted per call; once a script runs dry every call
    /// succeeds.
    #[derive(Default)]
    pub struct MockDelegationCapability {
        create_script: Mutex<VecDeque<Result<(), CreateRuleError>>>,
        delegate_script: Mutex<VecDeque<Result<(), DelegateError>>>,
        create_delay: Option<Duration>,
        release_delay: Option<Duration>,
        delegate_delay: Option<Duration>,
        create_calls: AtomicUsize,
        delegate_calls: AtomicUsize,
        releases: Arc<AtomicUsize>,
        live: Arc<AtomicUsize>,
        max_live: AtomicUsize,
        next_rule_id: AtomicU64,
        delegated: Mutex<Vec<String>>,
    }

    impl MockDelegationCapability {
        pub fn new() -> Self {
            Self::default()
        }

        /// Sleep inside every create call (widens race windows)
        pub fn with_create_delay(mut self, delay: Duration) -> Self {
            self.create_delay = Some(delay);
            self
        }

        /// Sleep inside every rule release (a slow kernel teardown)
        pub fn with_release_delay(mut self, delay: Duration) -> Self {
            self.release_delay = Some(delay);
            self
        }

        /// Sleep inside every delegate call (keeps a request in flight)
        pub fn with_delegate_delay(mut self, delay: Duration) -> Self {
            self.delegate_delay = Some(delay);
            self
        }

        pub fn script_create(
            self,
            results: impl IntoIterator<Item = Result<(), CreateRuleError>>,
        ) -> Self {
            self.create_script.lock().extend(results);
            self
        }

        pub fn script_delegate(
            self,
            results: impl IntoIterator<Item = Result<(), DelegateError>>,
        ) -> Self {
            self.delegate_script.lock().extend(results);
            self
        }

        pub fn create_calls(&self) -> usize {
            self.create_calls.load(Ordering::SeqCst)
        }

        pub fn delegate_calls(&self) -> usize {
            self.delegate_calls.load(Ordering::SeqCst)
        }

        pub fn release_calls(&self) -> usize {
            self.releases.load(Ordering::SeqCst)
        }

        /// Rules created and not yet released
        pub fn live_rules(&self) -> usize {
            self.live.load(Ordering::SeqCst)
        }

        /// Highest number of rules that were live at the same time
        pub fn max_live_rules(&self) -> usize {
            self.max_live.load(Ordering::SeqCst)
        }

        /// Request ids that were handed off successfully
        pub fn delegated_requests(&self) -> Vec<String> {
            self.delegated.lock().clone()
        }
    }

    impl DelegationCapability for MockDelegationCapability {
        fn create_rule(
            &self,
            queue_name: &str,
            url_prefix: &str,
        ) -> Result<Box<dyn DelegationRule>, CreateRuleError> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.create_delay {
                std::thread::sleep(delay);
            }

            let scripted = self.create_script.lock().pop_front().unwrap_or(Ok(()));
            scripted?;

            let live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_live.fetch_max(live, Ordering::SeqCst);

            Ok(Box::new(MockRule {
                id: self.next_rule_id.fetch_add(1, Ordering::SeqCst) + 1,
                queue_name: queue_name.to_string(),
                url_prefix: url_prefix.to_string(),
                releases: self.releases.clone(),
                live: self.live.clone(),
                release_delay: self.release_delay,
            }))
        }

        fn delegate(
            &self,
            request: &mut RequestContext,
            _rule: &dyn DelegationRule,
        ) -> Result<(), DelegateError> {
            self.delegate_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delegate_delay {
                std::thread::sleep(delay);
            }

            let scripted = self.delegate_script.lock().pop_front().unwrap_or(Ok(()));
            scripted?;

            self.delegated.lock().push(request.request_id.clone());
            Ok(())
        }
    }
}
