//! Generic search / match / register / update / delete workflow.
//!
//! ```text
//! pending gate ──► ID known? ──yes──► FETCH_BY_ID ──┐
//!                      │                            ├──► DECIDE ──► no-op
//!                      └──no──► SEARCH_REMOTE ──────┘        │
//!                                                            └──► CREATE / UPDATE / DELETE
//! ```
//! The caller persists the resulting IDs.

use acvp_definition::id;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::{Fetched, MetaClient};
use crate::entity::RemoteEntity;
use crate::error::{MetaError, Result};
use crate::options::{EntityKind, ReconcileOptions};
use crate::paging::{self, PageSearch};
use crate::protocol::{self, RequestStatus};
use crate::transport::Method;

/// What reconciliation did to the server copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Action {
    NoOp,
    Create,
    Update,
    Delete,
}

/// Result of reconciling one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub kind: EntityKind,
    pub action: Action,
    /// Primary ID after reconciliation, possibly flagged.
    pub id: u32,
}

/// Outbound request a dry run would have issued.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Registration {
    pub kind: EntityKind,
    pub method: String,
    pub path: String,
    pub body: Value,
}

/// The registration request for `entity`, built without contacting the
/// server.
pub fn dry_run<E: RemoteEntity>(entity: &E) -> Registration {
    Registration {
        kind: E::KIND,
        method: Method::Post.to_string(),
        path: protocol::collection(E::ENDPOINT),
        body: protocol::wrap(entity.representation()),
    }
}

/// Converge one entity with the server.
pub fn reconcile<E: RemoteEntity>(
    client: &MetaClient,
    entity: &mut E,
    opts: &ReconcileOptions,
) -> Result<Outcome> {
    pending_gate(client, entity)?;

    let action = if id::is_assigned(entity.id()) {
        decide_by_id(client, entity, opts)?
    } else {
        decide_by_search(client, entity, opts)?
    };
    info!(kind = %E::KIND, id = entity.id(), ?action, "reconciled");

    match action {
        Action::NoOp => {}
        Action::Create => {
            let path = protocol::collection(E::ENDPOINT);
            let new = client.submit(Method::Post, &path, Some(entity.representation()))?;
            entity.set_id(new);
            refresh(client, entity)?;
        }
        Action::Update => {
            let path = protocol::entity(E::ENDPOINT, entity.id());
            let new = client.submit(Method::Put, &path, Some(entity.representation()))?;
            entity.set_id(new);
            refresh(client, entity)?;
        }
        Action::Delete => {
            let path = protocol::entity(E::ENDPOINT, entity.id());
            let record = client.submit_request(Method::Delete, &path, None)?;
            match record.status {
                RequestStatus::Approved(_) => {
                    for tracked in entity.tracked_ids() {
                        *tracked = id::REQUEST_REJECTED;
                    }
                }
                // The entity still exists on the server.
                RequestStatus::Rejected => {
                    warn!(kind = %E::KIND, id = entity.id(), "deletion rejected");
                }
                RequestStatus::Initial | RequestStatus::Processing => {
                    entity.set_id(record.request_id | id::REQUEST_PENDING);
                }
            }
        }
    }

    Ok(Outcome {
        kind: E::KIND,
        action,
        id: entity.id(),
    })
}

/// Resolve outstanding requests; abort if any is still outstanding.
fn pending_gate<E: RemoteEntity>(client: &MetaClient, entity: &mut E) -> Result<()> {
    for tracked in entity.tracked_ids() {
        if !id::is_pending(*tracked) {
            continue;
        }
        let resolved = client.resolve_request(*tracked)?;
        if id::is_pending(resolved) {
            return Err(MetaError::Pending {
                kind: E::KIND,
                request: id::numeric(resolved),
            });
        }
        debug!(kind = %E::KIND, request = id::numeric(*tracked), resolved, "request resolved");
        *tracked = resolved;
    }
    Ok(())
}

fn decide_by_id<E: RemoteEntity>(
    client: &MetaClient,
    entity: &mut E,
    opts: &ReconcileOptions,
) -> Result<Action> {
    let path = protocol::entity(E::ENDPOINT, entity.id());
    match client.get(&path)? {
        Fetched::Missing if opts.delete.contains(E::KIND) => {
            // Nothing left to delete.
            entity.set_id(id::REQUEST_REJECTED);
            Ok(Action::NoOp)
        }
        Fetched::Missing if opts.register.contains(E::KIND) => Ok(Action::Create),
        Fetched::Missing => Err(MetaError::NotFound {
            kind: E::KIND,
            name: entity.search_term().to_string(),
        }),
        Fetched::Found(_) if opts.delete.contains(E::KIND) => Ok(Action::Delete),
        Fetched::Found(remote) => {
            if entity.matches(&remote)? {
                Ok(Action::NoOp)
            } else if opts.update.contains(E::KIND) {
                Ok(Action::Update)
            } else {
                Err(MetaError::Mismatch {
                    kind: E::KIND,
                    id: entity.id(),
                })
            }
        }
    }
}

fn decide_by_search<E: RemoteEntity>(
    client: &MetaClient,
    entity: &mut E,
    opts: &ReconcileOptions,
) -> Result<Action> {
    let path = protocol::search(E::ENDPOINT, E::SEARCH_FIELD, entity.search_term());
    let found = paging::search_pages(client, &path, |remote| {
        if entity.matches(remote)? {
            Ok(Some(protocol::url_id(remote)?))
        } else {
            Ok(None)
        }
    })?;

    match found {
        PageSearch::Matched(remote_id) => {
            entity.set_id(remote_id);
            if opts.delete.contains(E::KIND) {
                Ok(Action::Delete)
            } else {
                Ok(Action::NoOp)
            }
        }
        PageSearch::Exhausted if opts.delete.contains(E::KIND) => Ok(Action::NoOp),
        PageSearch::Exhausted if opts.register.contains(E::KIND) => Ok(Action::Create),
        PageSearch::Exhausted => Err(MetaError::NotFound {
            kind: E::KIND,
            name: entity.search_term().to_string(),
        }),
    }
}

/// Re-read an approved submission so secondary IDs get captured.
fn refresh<E: RemoteEntity>(client: &MetaClient, entity: &mut E) -> Result<()> {
    if !id::is_assigned(entity.id()) {
        return Ok(());
    }
    let remote = client.get_existing(&protocol::entity(E::ENDPOINT, entity.id()))?;
    if !entity.matches(&remote)? {
        return Err(MetaError::protocol(format!(
            "{} {} does not match the submitted definition",
            E::KIND,
            entity.id()
        )));
    }
    Ok(())
}
