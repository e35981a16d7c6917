//! Reconciliation error types.

use acvp_definition::DefinitionError;

use crate::options::EntityKind;
use crate::transport::{Method, TransportError};

/// Errors that can occur while reconciling entities with the server.
#[derive(Debug, thiserror::Error)]
pub enum MetaError {
    /// The transport failed; see [`TransportError`] for the class.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The server answered with an unexpected HTTP status.
    #[error("{method} {path} returned HTTP status {status}")]
    Status {
        method: Method,
        path: String,
        status: u16,
    },

    /// The server response could not be interpreted.
    #[error("malformed server response: {detail}")]
    Protocol { detail: String },

    /// An earlier request for this entity is still being processed.
    #[error("{kind} request {request} still pending, retry later")]
    Pending { kind: EntityKind, request: u32 },

    /// No matching entity exists and registration is not permitted.
    #[error("no {kind} definition found for '{name}', registration required")]
    NotFound { kind: EntityKind, name: String },

    /// The server copy differs from the local definition and updating it is
    /// not permitted.
    #[error("{kind} {id} on server differs from local definition, update required")]
    Mismatch { kind: EntityKind, id: u32 },

    /// A prerequisite entity has no usable ID yet.
    #[error("{kind} ID required by {needed_by} is not available")]
    MissingPrerequisite {
        kind: EntityKind,
        needed_by: EntityKind,
    },

    /// Local definition handling failed.
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MetaError {
    /// Whether re-invoking the reconciliation later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MetaError::Transport(TransportError::Transient { .. }) | MetaError::Pending { .. }
        )
    }

    pub(crate) fn protocol(detail: impl Into<String>) -> Self {
        MetaError::Protocol {
            detail: detail.into(),
        }
    }
}

/// Result type alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, MetaError>;
