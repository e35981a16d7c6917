//! Vendor entities.
//!
//! A vendor on the server owns a list of addresses. A server vendor matches
//! the local one if the names are equal and one of its addresses starts with
//! the local street, locality and postal code; that address's ID is captured.

use acvp_definition::Vendor;
use serde_json::{json, Value};
use tracing::debug;

use crate::entity::RemoteEntity;
use crate::error::{MetaError, Result};
use crate::options::EntityKind;
use crate::protocol::{str_field, url_id};

pub const ENDPOINT: &str = "vendors";

/// Working copy of a vendor and its server IDs.
#[derive(Debug)]
pub struct VendorEntity<'a> {
    vendor: &'a Vendor,
    pub id: u32,
    pub address_id: u32,
}

impl<'a> VendorEntity<'a> {
    pub fn new(vendor: &'a Vendor, id: u32, address_id: u32) -> Self {
        VendorEntity {
            vendor,
            id,
            address_id,
        }
    }

    fn address_matches(&self, address: &Value) -> Result<bool> {
        let local = &self.vendor.address;
        Ok(str_field(address, "street1")?.starts_with(&local.street)
            && str_field(address, "locality")?.starts_with(&local.locality)
            && str_field(address, "postalCode")?.starts_with(&local.postal_code))
    }
}

impl RemoteEntity for VendorEntity<'_> {
    const KIND: EntityKind = EntityKind::Vendor;
    const ENDPOINT: &'static str = ENDPOINT;

    fn search_term(&self) -> &str {
        &self.vendor.name
    }

    fn representation(&self) -> Value {
        let a = &self.vendor.address;
        json!({
            "name": self.vendor.name,
            "website": self.vendor.url,
            "addresses": [{
                "street1": a.street,
                "locality": a.locality,
                "region": a.region,
                "country": a.country,
                "postalCode": a.postal_code
            }]
        })
    }

    fn matches(&mut self, remote: &Value) -> Result<bool> {
        let vendor_id = url_id(remote)?;
        if str_field(remote, "name")? != self.vendor.name {
            return Ok(false);
        }
        let addresses = remote
            .get("addresses")
            .and_then(Value::as_array)
            .ok_or_else(|| MetaError::protocol("vendor carries no addresses array"))?;
        for address in addresses {
            if self.address_matches(address)? {
                self.address_id = url_id(address)?;
                return Ok(true);
            }
        }
        debug!(vendor_id, "vendor address not found");
        Ok(false)
    }

    fn id(&self) -> u32 {
        self.id
    }

    fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    fn tracked_ids(&mut self) -> Vec<&mut u32> {
        vec![&mut self.id, &mut self.address_id]
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use acvp_definition::{Address, DefLock};
    use std::path::PathBuf;

    pub(crate) fn acme() -> Vendor {
        Vendor {
            name: "Acme".to_string(),
            url: "https://acme.example".to_string(),
            contact_name: "Jane Doe".to_string(),
            contact_email: "jane@acme.example".to_string(),
            contact_phone: Some("555-0100".to_string()),
            address: Address {
                street: "1 Main St".to_string(),
                locality: "Springfield".to_string(),
                region: "IL".to_string(),
                country: "USA".to_string(),
                postal_code: "62701".to_string(),
            },
            file: PathBuf::from("vendor.json"),
            lock: DefLock::allocate().adopt(),
        }
    }

    pub(crate) fn remote_acme(id: u32, address_id: u32) -> Value {
        json!({
            "url": format!("/acvp/v1/vendors/{id}"),
            "name": "Acme",
            "website": "https://acme.example",
            "addresses": [
                {
                    "url": format!("/acvp/v1/vendors/{id}/addresses/{}", address_id + 1),
                    "street1": "9 Side Rd", "locality": "Springfield",
                    "region": "IL", "country": "USA", "postalCode": "62701"
                },
                {
                    "url": format!("/acvp/v1/vendors/{id}/addresses/{address_id}"),
                    "street1": "1 Main St, Suite 2", "locality": "Springfield",
                    "region": "IL", "country": "USA", "postalCode": "62701-1234"
                }
            ]
        })
    }

    #[test]
    fn representation_shape() {
        let vendor = acme();
        let rep = VendorEntity::new(&vendor, 0, 0).representation();
        assert_eq!(rep["name"], "Acme");
        assert_eq!(rep["website"], "https://acme.example");
        assert_eq!(rep["addresses"][0]["postalCode"], "62701");
    }

    #[test]
    fn match_captures_address_id() {
        let vendor = acme();
        let mut entity = VendorEntity::new(&vendor, 0, 0);
        assert!(entity.matches(&remote_acme(42, 7)).unwrap());
        assert_eq!(entity.address_id, 7);
    }

    #[test]
    fn other_name_or_address_does_not_match() {
        let vendor = acme();
        let mut entity = VendorEntity::new(&vendor, 0, 0);
        let mut other = remote_acme(42, 7);
        other["name"] = json!("Acme Corp");
        assert!(!entity.matches(&other).unwrap());

        let mut moved = remote_acme(42, 7);
        moved["addresses"] = json!([]);
        assert!(!entity.matches(&moved).unwrap());
    }

    #[test]
    fn malformed_vendor_is_protocol_error() {
        let vendor = acme();
        let mut entity = VendorEntity::new(&vendor, 0, 0);
        let err = entity.matches(&json!({ "name": "Acme" })).unwrap_err();
        assert!(matches!(err, MetaError::Protocol { .. }));
    }
}
