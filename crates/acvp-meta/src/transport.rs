//! Transport trait and a scripted in-memory implementation.
//!
//! The `Transport` trait abstracts over the HTTP layer. Implementations own
//! connection handling and retries and report each failure once, classified
//! as transient or fatal. The `ScriptedTransport` replays canned responses
//! for development and testing.

use std::collections::VecDeque;
use std::fmt;

use parking_lot::Mutex;
use serde_json::Value;

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Whether the method changes server state.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Method::Get)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        })
    }
}

/// A server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Response {
            status,
            body: body.into(),
        }
    }

    /// A 200 response carrying `payload` in a protocol envelope.
    pub fn ok(payload: Value) -> Self {
        Response::new(200, crate::protocol::wrap(payload).to_string())
    }

    pub fn not_found() -> Self {
        Response::new(404, "")
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A request that could not be completed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The request may succeed if repeated later.
    #[error("transient transport failure: {detail}")]
    Transient { detail: String },

    /// The request cannot succeed.
    #[error("transport failure: {detail}")]
    Fatal { detail: String },
}

/// Abstract transport to the server.
pub trait Transport: Send + Sync {
    /// Issue one request. `path` is absolute on the server and may carry a
    /// query string. `body` is sent as JSON.
    fn issue(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Response, TransportError>;
}

/// A request seen by a [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

/// Transport that answers requests from a script, in order.
///
/// Each request must match the next expected method and path exactly, or it
/// fails with a fatal error. Every request is recorded.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<(Method, String, Result<Response, TransportError>)>>,
    calls: Mutex<Vec<Recorded>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the answer to the next request.
    pub fn expect(self, method: Method, path: &str, response: Response) -> Self {
        self.script
            .lock()
            .push_back((method, path.to_string(), Ok(response)));
        self
    }

    /// Queue a transport failure for the next request.
    pub fn fail(self, method: Method, path: &str, error: TransportError) -> Self {
        self.script
            .lock()
            .push_back((method, path.to_string(), Err(error)));
        self
    }

    /// All requests issued so far.
    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().clone()
    }

    /// Number of requests that change server state.
    pub fn mutating_calls(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.method.is_mutating())
            .count()
    }

    /// Number of scripted answers not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

impl Transport for ScriptedTransport {
    fn issue(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Response, TransportError> {
        self.calls.lock().push(Recorded {
            method,
            path: path.to_string(),
            body: body.cloned(),
        });

        let mut script = self.script.lock();
        match script.front() {
            Some((m, p, _)) if *m == method && p == path => {}
            Some((m, p, _)) => {
                return Err(TransportError::Fatal {
                    detail: format!("unexpected {method} {path}, expected {m} {p}"),
                });
            }
            None => {
                return Err(TransportError::Fatal {
                    detail: format!("unexpected {method} {path}, script exhausted"),
                });
            }
        }
        match script.pop_front() {
            Some((_, _, answer)) => answer,
            None => Err(TransportError::Fatal {
                detail: "script exhausted".to_string(),
            }),
        }
    }
}
