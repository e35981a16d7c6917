//! The seam between the generic reconciler and each entity kind.

use serde_json::Value;

use crate::error::Result;
use crate::options::EntityKind;

/// A local entity that can be compared with and pushed to the server.
///
/// Implementations are short-lived working copies: they borrow the local
/// record and carry the IDs checked out for it, and the reconciler updates
/// those IDs in place.
pub trait RemoteEntity {
    const KIND: EntityKind;

    /// Collection endpoint below the API base, e.g. `vendors`.
    const ENDPOINT: &'static str;

    /// Listing field the `contains` search filters on.
    const SEARCH_FIELD: &'static str = "name";

    /// Value searched for when no ID is known.
    fn search_term(&self) -> &str;

    /// Outbound representation for registration and update.
    fn representation(&self) -> Value;

    /// Structural comparison against a server copy. A match may capture
    /// secondary IDs from the server copy.
    fn matches(&mut self, remote: &Value) -> Result<bool>;

    /// Primary ID; zero if unknown.
    fn id(&self) -> u32;

    fn set_id(&mut self, id: u32);

    /// Every ID field belonging to this entity, primary first.
    fn tracked_ids(&mut self) -> Vec<&mut u32>;
}

/// Whether `remote` carries the same values as `local` for every key of
/// `local`, which must be an object.
pub fn same_fields(local: &Value, remote: &Value) -> bool {
    let Some(local) = local.as_object() else {
        return false;
    };
    local.iter().all(|(key, value)| remote.get(key) == Some(value))
}

/// The URLs listed in a server array field, in any order.
pub fn url_set(remote: &Value, key: &str) -> Option<Vec<String>> {
    let mut urls: Vec<String> = remote
        .get(key)?
        .as_array()?
        .iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s.clone()),
            other => other.get("url").and_then(Value::as_str).map(str::to_string),
        })
        .collect();
    urls.sort();
    Some(urls)
}
