// Request Context & Delegation Outcome

use super::error::DelegationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Forwarder error classification recorded on a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ForwarderError {
    NoAvailableDestinations,
    Request,
}

impl ForwarderError {
    /// HTTP status written to the response for this classification
    pub fn status_code(self) -> u16 {
        match self {
            ForwarderError::NoAvailableDestinations => 503,
            ForwarderError::Request => 502,
        }
    }
}

impl fmt::Display for ForwarderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForwarderError::NoAvailableDestinations => write!(f, "NO_AVAILABLE_DESTINATIONS"),
            ForwarderError::Request => write!(f, "REQUEST"),
        }
    }
}

/// Structured failure descriptor attached to the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwarderErrorFeature {
    pub error: ForwarderError,
    pub detail: DelegationError,
    pub correlation_id: Option<Uuid>,
}

/// The slice of an in-flight HTTP request the delegation core touches.
///
/// The forwarding pipeline owns the real request; the capability receives
/// this context when it hands the request off.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub request_id: String,
    pub method: String,
    pub path: String,
    pub status: Option<u16>,
    pub forwarder_error: Option<ForwarderErrorFeature>,
}

impl RequestContext {
    pub fn new(
        request_id: impl Into<String>,
        method: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    pub(crate) fn fail(
        &mut self,
        error: ForwarderError,
        detail: DelegationError,
        correlation_id: Option<Uuid>,
    ) {
        self.status = Some(error.status_code());
        self.forwarder_error = Some(ForwarderErrorFeature {
            error,
            detail,
            correlation_id,
        });
    }
}

/// Closed set of results a delegation attempt can produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DelegationOutcome {
    /// The request was handed off; the destination owns the response now
    Delegated { correlation_id: Uuid, attempts: u8 },
    NoAvailableDestination {
        correlation_id: Option<Uuid>,
        error: DelegationError,
    },
    RequestError {
        correlation_id: Uuid,
        error: DelegationError,
    },
}

impl DelegationOutcome {
    pub fn is_delegated(&self) -> bool {
        matches!(self, DelegationOutcome::Delegated { .. })
    }

    pub fn correlation_id(&self) -> Option<Uuid> {
        match self {
            DelegationOutcome::Delegated { correlation_id, .. } => Some(*correlation_id),
            DelegationOutcome::NoAvailableDestination { correlation_id, .. } => *correlation_id,
            DelegationOutcome::RequestError { correlation_id, .. } => Some(*correlation_id),
        }
    }

    pub fn forwarder_error(&self) -> Option<ForwarderError> {
        match self {
            DelegationOutcome::Delegated { .. } => None,
            DelegationOutcome::NoAvailableDestination { .. } => {
                Some(ForwarderError::NoAvailableDestinations)
            }
            DelegationOutcome::RequestError { .. } => Some(ForwarderError::Request),
        }
    }
}
