//! Request helpers on top of a [`Transport`].

use std::sync::Arc;

use acvp_definition::id;
use serde_json::Value;
use tracing::debug;

use crate::error::{MetaError, Result};
use crate::protocol::{self, RequestRecord, RequestStatus};
use crate::transport::{Method, Transport};

/// Result of fetching one entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    Found(Value),
    /// The server does not know the ID.
    Missing,
}

/// Server client shared by all reconcilers.
#[derive(Clone)]
pub struct MetaClient {
    transport: Arc<dyn Transport>,
}

impl MetaClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        MetaClient { transport }
    }

    /// GET a path and return its payload.
    pub fn get(&self, path: &str) -> Result<Fetched> {
        let response = self.transport.issue(Method::Get, path, None)?;
        match response.status {
            404 => Ok(Fetched::Missing),
            _ if response.is_success() => {
                Ok(Fetched::Found(protocol::strip_version(&response.body)?))
            }
            status => Err(MetaError::Status {
                method: Method::Get,
                path: path.to_string(),
                status,
            }),
        }
    }

    /// GET a path that must exist.
    pub fn get_existing(&self, path: &str) -> Result<Value> {
        match self.get(path)? {
            Fetched::Found(payload) => Ok(payload),
            Fetched::Missing => Err(MetaError::Status {
                method: Method::Get,
                path: path.to_string(),
                status: 404,
            }),
        }
    }

    /// Submit a change and return the resulting ID.
    ///
    /// An approved request yields the entity ID. A request still being
    /// processed yields its request ID flagged pending. A rejected request
    /// yields the rejected flag.
    pub fn submit(&self, method: Method, path: &str, payload: Option<Value>) -> Result<u32> {
        Ok(id_for(&self.submit_request(method, path, payload)?))
    }

    /// Submit a change and return the request record the server answered
    /// with.
    pub fn submit_request(
        &self,
        method: Method,
        path: &str,
        payload: Option<Value>,
    ) -> Result<RequestRecord> {
        let body = payload.map(protocol::wrap);
        let response = self.transport.issue(method, path, body.as_ref())?;
        if !response.is_success() {
            return Err(MetaError::Status {
                method,
                path: path.to_string(),
                status: response.status,
            });
        }
        let record = RequestRecord::parse(&protocol::strip_version(&response.body)?)?;
        debug!(%method, path, request = record.request_id, status = ?record.status, "submitted");
        Ok(record)
    }

    /// Look up an outstanding request. Returns the entity ID if approved,
    /// the rejected flag if rejected, and `pending` itself otherwise.
    pub fn resolve_request(&self, pending: u32) -> Result<u32> {
        let path = protocol::entity(protocol::REQUESTS, id::numeric(pending));
        let payload = self.get_existing(&path)?;
        let record = RequestRecord::parse(&payload)?;
        Ok(match record.status {
            RequestStatus::Initial | RequestStatus::Processing => pending,
            _ => id_for(&record),
        })
    }
}

fn id_for(record: &RequestRecord) -> u32 {
    match record.status {
        RequestStatus::Approved(id) => id,
        RequestStatus::Rejected => id::REQUEST_REJECTED,
        RequestStatus::Initial | RequestStatus::Processing => {
            record.request_id | id::REQUEST_PENDING
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Response, ScriptedTransport};
    use serde_json::json;

    fn client(transport: ScriptedTransport) -> (MetaClient, Arc<ScriptedTransport>) {
        let transport = Arc::new(transport);
        (MetaClient::new(transport.clone()), transport)
    }

    #[test]
    fn get_distinguishes_missing() {
        let (client, _) = client(
            ScriptedTransport::new()
                .expect(Method::Get, "/acvp/v1/vendors/1", Response::not_found())
                .expect(Method::Get, "/acvp/v1/vendors/2", Response::new(500, "")),
        );
        assert_eq!(client.get("/acvp/v1/vendors/1").unwrap(), Fetched::Missing);
        assert!(matches!(
            client.get("/acvp/v1/vendors/2"),
            Err(MetaError::Status { status: 500, .. })
        ));
    }

    #[test]
    fn submit_pending_request_flags_id() {
        let (client, transport) = client(ScriptedTransport::new().expect(
            Method::Post,
            "/acvp/v1/vendors",
            Response::ok(json!({ "url": "/acvp/v1/requests/9", "status": "initial" })),
        ));
        let id = client
            .submit(Method::Post, "/acvp/v1/vendors", Some(json!({ "name": "Acme" })))
            .unwrap();
        assert!(id::is_pending(id));
        assert_eq!(id::numeric(id), 9);
        // Outbound body is enveloped.
        let body = transport.calls()[0].body.clone().unwrap();
        assert_eq!(body[0]["acvVersion"], "1.0");
        assert_eq!(body[1]["name"], "Acme");
    }

    #[test]
    fn processing_delete_stays_pending() {
        let (client, _) = client(ScriptedTransport::new().expect(
            Method::Delete,
            "/acvp/v1/oes/3",
            Response::ok(json!({ "url": "/acvp/v1/requests/4", "status": "processing" })),
        ));
        let id = client
            .submit(Method::Delete, "/acvp/v1/oes/3", None)
            .unwrap();
        assert!(id::is_pending(id));
        assert_eq!(id::numeric(id), 4);
    }

    #[test]
    fn submit_request_returns_record() {
        let (client, _) = client(ScriptedTransport::new().expect(
            Method::Delete,
            "/acvp/v1/oes/3",
            Response::ok(json!({ "url": "/acvp/v1/requests/4", "status": "rejected" })),
        ));
        let record = client
            .submit_request(Method::Delete, "/acvp/v1/oes/3", None)
            .unwrap();
        assert_eq!(record.request_id, 4);
        assert_eq!(record.status, RequestStatus::Rejected);
    }

    #[test]
    fn resolve_request_outcomes() {
        let (client, _) = client(
            ScriptedTransport::new()
                .expect(
                    Method::Get,
                    "/acvp/v1/requests/9",
                    Response::ok(json!({ "url": "/acvp/v1/requests/9", "status": "processing" })),
                )
                .expect(
                    Method::Get,
                    "/acvp/v1/requests/9",
                    Response::ok(json!({
                        "url": "/acvp/v1/requests/9",
                        "status": "approved",
                        "approvedUrl": "/acvp/v1/vendors/42"
                    })),
                ),
        );
        let pending = 9 | id::REQUEST_PENDING;
        assert_eq!(client.resolve_request(pending).unwrap(), pending);
        assert_eq!(client.resolve_request(pending).unwrap(), 42);
    }
}
