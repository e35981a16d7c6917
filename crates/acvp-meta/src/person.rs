//! Contact person entities. A person belongs to a vendor, so the vendor ID
//! must be known before a person can be reconciled.

use acvp_definition::Vendor;
use serde_json::{json, Value};

use crate::entity::RemoteEntity;
use crate::error::Result;
use crate::options::EntityKind;
use crate::protocol::{self, str_field};

pub const ENDPOINT: &str = "persons";

/// Working copy of a vendor's contact and its server ID.
#[derive(Debug)]
pub struct PersonEntity<'a> {
    vendor: &'a Vendor,
    vendor_url: String,
    pub id: u32,
}

impl<'a> PersonEntity<'a> {
    pub fn new(vendor: &'a Vendor, vendor_id: u32, id: u32) -> Self {
        PersonEntity {
            vendor,
            vendor_url: protocol::entity(crate::vendor::ENDPOINT, vendor_id),
            id,
        }
    }
}

impl RemoteEntity for PersonEntity<'_> {
    const KIND: EntityKind = EntityKind::Person;
    const ENDPOINT: &'static str = ENDPOINT;
    const SEARCH_FIELD: &'static str = "fullName";

    fn search_term(&self) -> &str {
        &self.vendor.contact_name
    }

    fn representation(&self) -> Value {
        let mut rep = json!({
            "fullName": self.vendor.contact_name,
            "vendorUrl": self.vendor_url,
            "emails": [self.vendor.contact_email],
        });
        if let Some(phone) = &self.vendor.contact_phone {
            rep["phoneNumbers"] = json!([{ "number": phone, "type": "voice" }]);
        }
        rep
    }

    fn matches(&mut self, remote: &Value) -> Result<bool> {
        if str_field(remote, "fullName")? != self.vendor.contact_name
            || str_field(remote, "vendorUrl")? != self.vendor_url
        {
            return Ok(false);
        }
        let emails = remote.get("emails").and_then(Value::as_array);
        Ok(emails.is_some_and(|emails| {
            emails
                .iter()
                .any(|e| e.as_str() == Some(self.vendor.contact_email.as_str()))
        }))
    }

    fn id(&self) -> u32 {
        self.id
    }

    fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    fn tracked_ids(&mut self) -> Vec<&mut u32> {
        vec![&mut self.id]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vendor::tests::acme;

    fn remote(vendor_id: u32) -> Value {
        json!({
            "url": "/acvp/v1/persons/5",
            "fullName": "Jane Doe",
            "vendorUrl": format!("/acvp/v1/vendors/{vendor_id}"),
            "emails": ["jane@acme.example"]
        })
    }

    #[test]
    fn representation_links_vendor() {
        let vendor = acme();
        let rep = PersonEntity::new(&vendor, 42, 0).representation();
        assert_eq!(rep["vendorUrl"], "/acvp/v1/vendors/42");
        assert_eq!(rep["phoneNumbers"][0]["type"], "voice");
    }

    #[test]
    fn match_requires_same_vendor() {
        let vendor = acme();
        let mut entity = PersonEntity::new(&vendor, 42, 0);
        assert!(entity.matches(&remote(42)).unwrap());
        assert!(!entity.matches(&remote(43)).unwrap());
    }
}
