//! Paginated listing search.
//!
//! A listing page looks like:
//! ```text
//! { "totalCount": 3, "incomplete": true,
//!   "links": { "next": "/acvp/v1/vendors?offset=2&..." },
//!   "data": [ ... ] }
//! ```

use serde_json::Value;

use crate::client::MetaClient;
use crate::error::{MetaError, Result};

/// Outcome of walking a listing.
#[derive(Debug, Clone, PartialEq)]
pub enum PageSearch<T> {
    /// The predicate accepted an entry; remaining pages were not fetched.
    Matched(T),
    /// Every page was inspected without a match.
    Exhausted,
}

/// Walk the pages starting at `path` until `predicate` accepts an entry.
pub fn search_pages<T, F>(client: &MetaClient, path: &str, mut predicate: F) -> Result<PageSearch<T>>
where
    F: FnMut(&Value) -> Result<Option<T>>,
{
    let mut next = Some(path.to_string());
    let mut visited = Vec::new();

    while let Some(path) = next.take() {
        if visited.contains(&path) {
            return Err(MetaError::protocol(format!("paging loops back to {path}")));
        }
        let page = client.get_existing(&path)?;
        let data = page
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| MetaError::protocol("listing page carries no data array"))?;
        for entry in data {
            if let Some(found) = predicate(entry)? {
                return Ok(PageSearch::Matched(found));
            }
        }

        let incomplete = page
            .get("incomplete")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if incomplete {
            next = page
                .pointer("/links/next")
                .and_then(Value::as_str)
                .map(str::to_string);
        }
        visited.push(path);
    }
    Ok(PageSearch::Exhausted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Method, Response, ScriptedTransport};
    use serde_json::json;
    use std::sync::Arc;

    fn page(data: Value, next: Option<&str>) -> Response {
        let mut payload = json!({
            "totalCount": 3,
            "incomplete": next.is_some(),
            "data": data
        });
        if let Some(next) = next {
            payload["links"] = json!({ "next": next });
        }
        Response::ok(payload)
    }

    #[test]
    fn match_stops_paging() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .expect(
                    Method::Get,
                    "/acvp/v1/vendors",
                    page(json!([{ "id": 1 }]), Some("/acvp/v1/vendors?offset=1")),
                )
                .expect(
                    Method::Get,
                    "/acvp/v1/vendors?offset=1",
                    page(json!([{ "id": 2 }]), Some("/acvp/v1/vendors?offset=2")),
                ),
        );
        let client = MetaClient::new(transport.clone());

        let found = search_pages(&client, "/acvp/v1/vendors", |e| {
            Ok((e["id"] == 2).then_some(2))
        })
        .unwrap();
        assert_eq!(found, PageSearch::Matched(2));
        assert_eq!(transport.calls().len(), 2);
    }

    #[test]
    fn exhausted_without_match() {
        let transport = Arc::new(ScriptedTransport::new().expect(
            Method::Get,
            "/acvp/v1/oes",
            page(json!([]), None),
        ));
        let client = MetaClient::new(transport);
        let found: PageSearch<()> = search_pages(&client, "/acvp/v1/oes", |_| Ok(None)).unwrap();
        assert_eq!(found, PageSearch::Exhausted);
    }

    #[test]
    fn self_referencing_next_rejected() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .expect(Method::Get, "/acvp/v1/oes", page(json!([]), Some("/acvp/v1/oes"))),
        );
        let client = MetaClient::new(transport);
        let err = search_pages::<(), _>(&client, "/acvp/v1/oes", |_| Ok(None)).unwrap_err();
        assert!(matches!(err, MetaError::Protocol { .. }));
    }
}
