// Delegator - configuration sync and the per-request delegation path

use super::binding::DestinationBindings;
use super::constants::MAX_DELEGATION_ATTEMPTS;
use super::registry::QueueRegistry;
use crate::config::DelegationSettings;
use crate::domain::{
    ClusterConfig, DelegationError, DelegationOutcome, DestinationKey, ForwarderError,
    QueueIdentity, QueueState, QueueStatus, RequestContext,
};
use crate::port::{CreateRuleError, DelegationCapability};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Point-in-time view of one live queue (for operators)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub queue_name: String,
    pub url_prefix: String,
    pub state: String,
    pub retryable: bool,
    pub last_error: Option<String>,
    pub correlation_id: Uuid,
    pub since: DateTime<Utc>,
    pub bound_destinations: usize,
}

/// Delegator counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegatorStats {
    pub capability_available: bool,
    pub live_queues: usize,
    pub bindings: usize,
}

/// Request delegation orchestrator
///
/// Reacts to cluster configuration changes by binding destinations to
/// shared queues, and hands requests off through those queues.
/// Without a capability every operation is a no-op and every request fails
/// with "no available destination".
pub struct Delegator {
    capability: Option<Arc<dyn DelegationCapability>>,
    registry: QueueRegistry,
    bindings: DestinationBindings,
}

impl Delegator {
    pub fn new(capability: Option<Arc<dyn DelegationCapability>>) -> Self {
        Self {
            capability,
            registry: QueueRegistry::new(),
            bindings: DestinationBindings::new(),
        }
    }

    pub fn from_settings(
        settings: &DelegationSettings,
        capability: Option<Arc<dyn DelegationCapability>>,
    ) -> Self {
        if !settings.enabled {
            info!("Request delegation disabled by configuration");
            return Self::new(None);
        }
        if capability.is_none() {
            warn!("Request delegation capability not available on this host");
        }
        Self::new(capability)
    }

    pub fn is_available(&self) -> bool {
        self.capability.is_some()
    }

    /// Whether requests routed to `destination` should be delegated
    pub fn is_delegation_destination(&self, destination: &DestinationKey) -> bool {
        self.is_available() && self.bindings.contains(destination)
    }

    pub fn on_cluster_added(&self, cluster: &ClusterConfig) -> usize {
        self.on_cluster_changed(cluster)
    }

    /// Refresh bindings for every destination of `cluster`, then prune.
    /// Returns the number of destinations bound to a queue.
    pub fn on_cluster_changed(&self, cluster: &ClusterConfig) -> usize {
        let Some(capability) = self.capability.as_deref() else {
            return 0;
        };

        let bound = self.synchronize(capability, cluster);
        self.registry.prune();
        bound
    }

    /// Unbind every destination of a removed cluster, then prune.
    /// Returns the number of bindings removed.
    pub fn on_cluster_removed(&self, cluster_id: &str) -> usize {
        if !self.is_available() {
            return 0;
        }

        let removed = self.bindings.remove_cluster(cluster_id);
        debug!(cluster_id = %cluster_id, removed, "Cluster removed; destinations unbound");
        self.registry.prune();
        removed
    }

    fn synchronize(&self, capability: &dyn DelegationCapability, cluster: &ClusterConfig) -> usize {
        let mut present = HashSet::new();
        let mut bound = 0;

        for destination in &cluster.destinations {
            present.insert(destination.destination_id.as_str());
            let key = cluster.key_for(destination);

            let Some(identity) = destination.delegation_identity() else {
                if self.bindings.unbind(&key).is_some() {
                    debug!(
                        cluster_id = %key.cluster_id,
                        destination_id = %key.destination_id,
                        "Delegation no longer configured; destination unbound"
                    );
                }
                continue;
            };
            bound += 1;

            let unchanged = self
                .bindings
                .get(&key)
                .is_some_and(|queue| queue.identity() == &identity);
            if unchanged {
                continue;
            }

            let queue = self.registry.get_or_create(&identity);
            let state = queue.initialize(capability);
            if !state.is_ready() {
                // Not fatal: the request path initializes again
                warn!(
                    cluster_id = %key.cluster_id,
                    destination_id = %key.destination_id,
                    queue_name = %identity.queue_name(),
                    url_prefix = %identity.url_prefix(),
                    correlation_id = %state.correlation_id(),
                    error = %state,
                    "Failed to initialize delegation queue for destination"
                );
            }

            debug!(
                cluster_id = %key.cluster_id,
                destination_id = %key.destination_id,
                queue = %identity,
                "Destination bound to delegation queue"
            );
            self.bindings.bind(key, queue);
        }

        let removed = self
            .bindings
            .retain_cluster(&cluster.cluster_id, |id| present.contains(id));
        if removed > 0 {
            debug!(
                cluster_id = %cluster.cluster_id,
                removed,
                "Unbound destinations no longer in cluster"
            );
        }

        bound
    }

    /// Drop registry entries whose queue has no destination left
    pub fn prune(&self) -> usize {
        self.registry.prune()
    }

    /// Force a queue back to empty regardless of what state it is in.
    ///
    /// Returns the detached state, or `None` when no live queue exists for
    /// the identity.
    pub fn reset_queue(&self, queue_name: &str, url_prefix: &str) -> Option<Arc<QueueState>> {
        if !self.is_available() {
            return None;
        }

        let identity = QueueIdentity::new(queue_name, url_prefix);
        let queue = self.registry.get(&identity)?;
        let previous = queue.detach(None)?;

        info!(
            queue_name = %queue_name,
            url_prefix = %url_prefix,
            correlation_id = %previous.correlation_id(),
            previous_state = %previous,
            "Delegation queue reset"
        );

        Some(previous)
    }

    /// Hand `request` off to the queue bound to `destination`.
    ///
    /// On failure the request's status and forwarder error are set; on
    /// success the capability owns the response.
    pub fn delegate_request(
        &self,
        request: &mut RequestContext,
        destination: &DestinationKey,
    ) -> DelegationOutcome {
        let Some(capability) = self.capability.as_deref() else {
            return no_available_destination(request, None, DelegationError::CapabilityUnavailable);
        };
        let Some(queue) = self.bindings.get(destination) else {
            return no_available_destination(
                request,
                None,
                DelegationError::NotBound(destination.to_string()),
            );
        };

        let mut attempt: u8 = 1;
        loop {
            let state = queue.initialize(capability);
            let correlation_id = state.correlation_id();

            let Some(rule) = state.rule() else {
                let cause = state.error().cloned().unwrap_or_else(|| {
                    CreateRuleError::Failed("delegation queue holds no rule".to_string())
                });
                warn!(
                    request_id = %request.request_id,
                    destination = %destination,
                    queue = %queue.identity(),
                    correlation_id = %correlation_id,
                    error = %cause,
                    "Delegation queue not initialized"
                );
                return no_available_destination(
                    request,
                    Some(correlation_id),
                    DelegationError::QueueNotInitialized(cause),
                );
            };

            match capability.delegate(request, rule) {
                Ok(()) => {
                    return DelegationOutcome::Delegated {
                        correlation_id,
                        attempts: attempt,
                    };
                }
                Err(e) if e.is_rule_gone() => {
                    warn!(
                        request_id = %request.request_id,
                        destination = %destination,
                        queue = %queue.identity(),
                        correlation_id = %correlation_id,
                        attempt,
                        error = %e,
                        "Delegation rule is gone; detaching queue"
                    );
                    // No-op if another request already reset this generation
                    queue.detach(Some(&state));

                    if attempt < MAX_DELEGATION_ATTEMPTS {
                        attempt += 1;
                        continue;
                    }
                    return request_error(request, destination, correlation_id, e.into());
                }
                Err(e) => {
                    return request_error(request, destination, correlation_id, e.into());
                }
            }
        }
    }

    /// Snapshot every live queue
    pub fn queue_snapshots(&self) -> Vec<QueueSnapshot> {
        self.registry
            .live_queues()
            .into_iter()
            .map(|queue| {
                let state = queue.state();
                let (retryable, last_error) = match state.status() {
                    QueueStatus::Failed { error, retryable } => (*retryable, Some(error.to_string())),
                    _ => (false, None),
                };
                QueueSnapshot {
                    queue_name: queue.identity().queue_name().to_string(),
                    url_prefix: queue.identity().url_prefix().to_string(),
                    state: state.kind().to_string(),
                    retryable,
                    last_error,
                    correlation_id: state.correlation_id(),
                    since: state.entered_at(),
                    bound_destinations: self.bindings.count_for(&queue),
                }
            })
            .collect()
    }

    pub fn stats(&self) -> DelegatorStats {
        DelegatorStats {
            capability_available: self.is_available(),
            live_queues: self.registry.live_queues().len(),
            bindings: self.bindings.len(),
        }
    }
}

fn no_available_destination(
    request: &mut RequestContext,
    correlation_id: Option<Uuid>,
    error: DelegationError,
) -> DelegationOutcome {
    request.fail(
        ForwarderError::NoAvailableDestinations,
        error.clone(),
        correlation_id,
    );
    DelegationOutcome::NoAvailableDestination {
        correlation_id,
        error,
    }
}

fn request_error(
    request: &mut RequestContext,
    destination: &DestinationKey,
    correlation_id: Uuid,
    error: DelegationError,
) -> DelegationOutcome {
    error!(
        request_id = %request.request_id,
        destination = %destination,
        correlation_id = %correlation_id,
        error = %error,
        "Request delegation failed"
    );
    request.fail(ForwarderError::Request, error.clone(), Some(correlation_id));
    DelegationOutcome::RequestError {
        correlation_id,
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DestinationConfig;
    use crate::port::delegation::mocks::MockDelegationCapability;
    use crate::port::DelegateError;

    const PREFIX: &str = "http://+:80/orders/";

    fn delegator(capability: &Arc<MockDelegationCapability>) -> Delegator {
        let capability: Arc<dyn DelegationCapability> = capability.clone();
        Delegator::new(Some(capability))
    }

    fn cluster(destinations: Vec<DestinationConfig>) -> ClusterConfig {
        ClusterConfig::new("c1", destinations)
    }

    fn orders(id: &str) -> DestinationConfig {
        DestinationConfig::new(id).with_delegation("orders", PREFIX)
    }

    fn request() -> RequestContext {
        RequestContext::new("req-1", "GET", "/orders/1")
    }

    #[test]
    fn test_shared_identity_resolves_to_one_queue() {
        let capability = Arc::new(MockDelegationCapability::new());
        let delegator = delegator(&capability);

        let bound = delegator.on_cluster_added(&cluster(vec![
            orders("d1"),
            DestinationConfig::new("d2").with_delegation("ORDERS", PREFIX),
            DestinationConfig::new("d3"),
        ]));

        assert_eq!(bound, 2);
        let a = delegator.bindings.get(&DestinationKey::new("c1", "d1")).unwrap();
        let b = delegator.bindings.get(&DestinationKey::new("c1", "d2")).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!delegator.is_delegation_destination(&DestinationKey::new("c1", "d3")));
        assert_eq!(capability.create_calls(), 1);
    }

    #[test]
    fn test_delegate_success() {
        let capability = Arc::new(MockDelegationCapability::new());
        let delegator = delegator(&capability);
        delegator.on_cluster_added(&cluster(vec![orders("d1")]));

        let mut req = request();
        let outcome = delegator.delegate_request(&mut req, &DestinationKey::new("c1", "d1"));

        assert!(matches!(outcome, DelegationOutcome::Delegated { attempts: 1, .. }));
        assert!(req.status.is_none());
        assert_eq!(capability.delegated_requests(), vec!["req-1".to_string()]);
    }

    #[test]
    fn test_unavailable_capability_fails_without_side_effects() {
        let delegator = Delegator::new(None);

        assert_eq!(delegator.on_cluster_added(&cluster(vec![orders("d1")])), 0);
        assert!(delegator.reset_queue("orders", PREFIX).is_none());

        let mut req = request();
        let outcome = delegator.delegate_request(&mut req, &DestinationKey::new("c1", "d1"));

        assert_eq!(
            outcome,
            DelegationOutcome::NoAvailableDestination {
                correlation_id: None,
                error: DelegationError::CapabilityUnavailable,
            }
        );
        assert_eq!(req.status, Some(503));
    }

    #[test]
    fn test_unbound_destination_is_no_available_destination() {
        let capability = Arc::new(MockDelegationCapability::new());
        let delegator = delegator(&capability);

        let mut req = request();
        let outcome = delegator.delegate_request(&mut req, &DestinationKey::new("c1", "nope"));

        assert_eq!(
            outcome.forwarder_error(),
            Some(ForwarderError::NoAvailableDestinations)
        );
        assert_eq!(capability.delegate_calls(), 0);
    }

    #[test]
    fn test_transient_not_found_then_success_on_later_request() {
        let capability = Arc::new(MockDelegationCapability::new().script_create([
            Err(CreateRuleError::NotFound("orders".into())),
            Err(CreateRuleError::NotFound("orders".into())),
        ]));
        let delegator = delegator(&capability);
        let key = DestinationKey::new("c1", "d1");
        // Eager initialization during sync consumes the first failure
        delegator.on_cluster_added(&cluster(vec![orders("d1")]));

        let mut first = request();
        let outcome = delegator.delegate_request(&mut first, &key);
        assert!(matches!(
            outcome,
            DelegationOutcome::NoAvailableDestination {
                correlation_id: Some(_),
                error: DelegationError::QueueNotInitialized(CreateRuleError::NotFound(_)),
            }
        ));
        assert_eq!(first.status, Some(503));
        let feature = first.forwarder_error.unwrap();
        assert_eq!(feature.error, ForwarderError::NoAvailableDestinations);
        assert_eq!(feature.correlation_id, outcome.correlation_id());

        let mut second = request();
        assert!(delegator.delegate_request(&mut second, &key).is_delegated());
        assert_eq!(capability.create_calls(), 3);
        assert_eq!(capability.delegate_calls(), 1);
    }

    #[test]
    fn test_stale_rule_is_retried_once() {
        let capability = Arc::new(
            MockDelegationCapability::new()
                .script_delegate([Err(DelegateError::Stale("object no longer exists".into()))]),
        );
        let delegator = delegator(&capability);
        delegator.on_cluster_added(&cluster(vec![orders("d1")]));

        let mut req = request();
        let outcome = delegator.delegate_request(&mut req, &DestinationKey::new("c1", "d1"));

        assert!(matches!(outcome, DelegationOutcome::Delegated { attempts: 2, .. }));
        assert_eq!(capability.delegate_calls(), 2);
        assert_eq!(capability.release_calls(), 1);
        assert_eq!(capability.create_calls(), 2);
        assert!(req.forwarder_error.is_none());
    }

    #[test]
    fn test_stale_rule_twice_is_request_error() {
        let capability = Arc::new(MockDelegationCapability::new().script_delegate([
            Err(DelegateError::Stale("gone".into())),
            Err(DelegateError::Disposed),
        ]));
        let delegator = delegator(&capability);
        delegator.on_cluster_added(&cluster(vec![orders("d1")]));

        let mut req = request();
        let outcome = delegator.delegate_request(&mut req, &DestinationKey::new("c1", "d1"));

        assert_eq!(
            outcome.forwarder_error(),
            Some(ForwarderError::Request)
        );
        assert!(matches!(
            outcome,
            DelegationOutcome::RequestError {
                error: DelegationError::Delegate(DelegateError::Disposed),
                ..
            }
        ));
        assert_eq!(capability.delegate_calls(), 2);
        assert_eq!(req.status, Some(502));
    }

    #[test]
    fn test_other_delegate_failure_is_not_retried() {
        let capability = Arc::new(
            MockDelegationCapability::new()
                .script_delegate([Err(DelegateError::Failed("access denied".into()))]),
        );
        let delegator = delegator(&capability);
        delegator.on_cluster_added(&cluster(vec![orders("d1")]));

        let mut req = request();
        let outcome = delegator.delegate_request(&mut req, &DestinationKey::new("c1", "d1"));

        assert_eq!(outcome.forwarder_error(), Some(ForwarderError::Request));
        assert_eq!(capability.delegate_calls(), 1);
        assert_eq!(capability.release_calls(), 0);
    }

    #[test]
    fn test_reset_queue() {
        let capability = Arc::new(MockDelegationCapability::new());
        let delegator = delegator(&capability);

        assert!(delegator.reset_queue("orders", PREFIX).is_none());

        delegator.on_cluster_added(&cluster(vec![orders("d1")]));
        let previous = delegator.reset_queue("Orders", PREFIX).unwrap();

        assert!(previous.is_ready());
        assert_eq!(capability.release_calls(), 1);
        assert_eq!(delegator.queue_snapshots()[0].state, "empty");
    }

    #[test]
    fn test_prefix_change_keeps_shared_rule() {
        let capability = Arc::new(MockDelegationCapability::new());
        let delegator = delegator(&capability);
        delegator.on_cluster_added(&cluster(vec![orders("d1"), orders("d2")]));

        let moved = DestinationConfig::new("d2").with_delegation("orders", "http://+:80/v2/orders/");
        delegator.on_cluster_changed(&cluster(vec![orders("d1"), moved]));

        assert_eq!(capability.release_calls(), 0);
        assert_eq!(capability.create_calls(), 2);
        let d2 = delegator.bindings.get(&DestinationKey::new("c1", "d2")).unwrap();
        assert_eq!(d2.identity().url_prefix(), "http://+:80/v2/orders/");
        assert_eq!(delegator.stats().live_queues, 2);
    }

    #[test]
    fn test_last_destination_leaving_releases_rule() {
        let capability = Arc::new(MockDelegationCapability::new());
        let delegator = delegator(&capability);
        delegator.on_cluster_added(&cluster(vec![orders("d1"), orders("d2")]));

        delegator.on_cluster_changed(&cluster(vec![orders("d1"), DestinationConfig::new("d2")]));
        assert_eq!(capability.release_calls(), 0);

        delegator.on_cluster_changed(&cluster(vec![]));
        assert_eq!(capability.release_calls(), 1);
        assert_eq!(
            delegator.stats(),
            DelegatorStats {
                capability_available: true,
                live_queues: 0,
                bindings: 0,
            }
        );
        assert!(delegator.registry.is_empty());
    }

    #[test]
    fn test_cluster_removed_unbinds_only_that_cluster() {
        let capability = Arc::new(MockDelegationCapability::new());
        let delegator = delegator(&capability);
        delegator.on_cluster_added(&cluster(vec![orders("d1")]));
        delegator.on_cluster_added(&ClusterConfig::new("c2", vec![orders("d1")]));

        assert_eq!(delegator.on_cluster_removed("c1"), 1);
        assert_eq!(capability.release_calls(), 0);

        let snapshots = delegator.queue_snapshots();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].bound_destinations, 1);

        assert_eq!(delegator.on_cluster_removed("c2"), 1);
        assert_eq!(capability.release_calls(), 1);
    }

    #[test]
    fn test_disabled_settings_ignore_capability() {
        let capability: Arc<dyn DelegationCapability> = Arc::new(MockDelegationCapability::new());
        let settings = DelegationSettings {
            enabled: false,
            ..Default::default()
        };

        let delegator = Delegator::from_settings(&settings, Some(capability));
        assert!(!delegator.is_available());
    }
}
