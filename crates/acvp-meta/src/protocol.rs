//! Protocol envelope, URL and request-record handling.
//!
//! Every message to and from the server is a two-element array: a version
//! object followed by the payload.
//! ```text
//! [ { "acvVersion": "1.0" }, { ...payload... } ]
//! ```
//! Submissions that change server state are answered with a request record
//! rather than the entity itself:
//! ```text
//! { "url": "/acvp/v1/requests/17", "status": "approved",
//!   "approvedUrl": "/acvp/v1/vendors/42" }
//! ```

use serde_json::{json, Value};

use crate::error::{MetaError, Result};

/// Protocol version sent and expected.
pub const ACV_VERSION: &str = "1.0";

/// Path prefix of every endpoint.
pub const API_BASE: &str = "/acvp/v1";

/// Endpoint for asynchronous request records.
pub const REQUESTS: &str = "requests";

/// Absolute path of a collection endpoint.
pub fn collection(endpoint: &str) -> String {
    format!("{API_BASE}/{endpoint}")
}

/// Absolute path of one entity.
pub fn entity(endpoint: &str, id: u32) -> String {
    format!("{API_BASE}/{endpoint}/{id}")
}

/// Collection path filtered by a `contains` predicate on `field`.
pub fn search(endpoint: &str, field: &str, needle: &str) -> String {
    format!(
        "{}?{field}[0]=contains:{}",
        collection(endpoint),
        urlencoding::encode(needle)
    )
}

/// Wrap a payload in the protocol envelope.
pub fn wrap(payload: Value) -> Value {
    json!([{ "acvVersion": ACV_VERSION }, payload])
}

/// Parse a response body and return its payload.
pub fn strip_version(body: &str) -> Result<Value> {
    let doc: Value = serde_json::from_str(body)
        .map_err(|e| MetaError::protocol(format!("response is not JSON: {e}")))?;
    let Value::Array(mut parts) = doc else {
        return Err(MetaError::protocol("response is not an envelope array"));
    };
    if parts.len() != 2 {
        return Err(MetaError::protocol(format!(
            "envelope has {} elements, expected 2",
            parts.len()
        )));
    }
    if parts[0].get("acvVersion").and_then(Value::as_str).is_none() {
        return Err(MetaError::protocol("envelope carries no acvVersion"));
    }
    Ok(parts.swap_remove(1))
}

/// The numeric last path component of an entity URL.
pub fn trailing_id(url: &str) -> Result<u32> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|last| last.parse().ok())
        .ok_or_else(|| MetaError::protocol(format!("no trailing ID in URL '{url}'")))
}

/// A string field of a server object.
pub fn str_field<'a>(obj: &'a Value, key: &str) -> Result<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| MetaError::protocol(format!("field '{key}' missing or not a string")))
}

/// The ID carried in the `url` field of a server object.
pub fn url_id(obj: &Value) -> Result<u32> {
    trailing_id(str_field(obj, "url")?)
}

/// Processing state of an asynchronous request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Initial,
    Processing,
    /// Approved; carries the ID of the resulting entity.
    Approved(u32),
    Rejected,
}

/// A parsed request record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestRecord {
    pub request_id: u32,
    pub status: RequestStatus,
}

impl RequestRecord {
    pub fn parse(payload: &Value) -> Result<Self> {
        let request_id = url_id(payload)?;
        let status = match str_field(payload, "status")? {
            "initial" => RequestStatus::Initial,
            "processing" => RequestStatus::Processing,
            "approved" => RequestStatus::Approved(trailing_id(str_field(payload, "approvedUrl")?)?),
            "rejected" => RequestStatus::Rejected,
            other => {
                return Err(MetaError::protocol(format!(
                    "unknown request status '{other}'"
                )))
            }
        };
        Ok(RequestRecord { request_id, status })
    }
}
