//! Module entities.

use acvp_definition::Info;
use serde_json::{json, Value};

use crate::entity::{url_set, RemoteEntity};
use crate::error::Result;
use crate::options::EntityKind;
use crate::protocol::{self, str_field};
use crate::{person, vendor};

pub const ENDPOINT: &str = "modules";

/// Working copy of a bound module and its server ID.
///
/// The vendor, address and person IDs must be assigned before the module
/// is constructed.
#[derive(Debug)]
pub struct ModuleEntity<'a> {
    info: &'a Info,
    vendor_url: String,
    address_url: String,
    contact_urls: Vec<String>,
    pub id: u32,
}

impl<'a> ModuleEntity<'a> {
    pub fn new(info: &'a Info, vendor_id: u32, address_id: u32, person_id: u32, id: u32) -> Self {
        let vendor_url = protocol::entity(vendor::ENDPOINT, vendor_id);
        ModuleEntity {
            info,
            address_url: format!("{vendor_url}/addresses/{address_id}"),
            vendor_url,
            contact_urls: vec![protocol::entity(person::ENDPOINT, person_id)],
            id,
        }
    }
}

impl RemoteEntity for ModuleEntity<'_> {
    const KIND: EntityKind = EntityKind::Module;
    const ENDPOINT: &'static str = ENDPOINT;

    fn search_term(&self) -> &str {
        &self.info.module_name
    }

    fn representation(&self) -> Value {
        json!({
            "name": self.info.module_name,
            "version": self.info.module_version,
            "type": self.info.module_type.as_str(),
            "description": self.info.module_description,
            "vendorUrl": self.vendor_url,
            "addressUrl": self.address_url,
            "contactUrls": self.contact_urls,
        })
    }

    fn matches(&mut self, remote: &Value) -> Result<bool> {
        let info = self.info;
        if str_field(remote, "name")? != info.module_name
            || str_field(remote, "version")? != info.module_version
            || str_field(remote, "type")? != info.module_type.as_str()
            || str_field(remote, "vendorUrl")? != self.vendor_url
            || str_field(remote, "addressUrl")? != self.address_url
        {
            return Ok(false);
        }
        let mut local = self.contact_urls.clone();
        local.sort();
        Ok(url_set(remote, "contactUrls") == Some(local))
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
