//! Operational environment entities and their dependencies.
//!
//! An OE is registered as a name plus a list of dependency URLs. Each local
//! OE yields a processor dependency and, when it names an execution
//! environment, a software dependency. Both are registered first.

use acvp_definition::definition::feature_names;
use acvp_definition::Oe;
use serde_json::{json, Value};

use crate::entity::{same_fields, url_set, RemoteEntity};
use crate::error::Result;
use crate::options::EntityKind;
use crate::protocol::{self, str_field};

pub const DEPENDENCY_ENDPOINT: &str = "dependencies";
pub const OE_ENDPOINT: &str = "oes";

/// Which dependency of an OE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    Processor,
    Software,
}

/// Working copy of one OE dependency and its server ID.
#[derive(Debug)]
pub struct DependencyEntity<'a> {
    oe: &'a Oe,
    kind: DependencyKind,
    name: String,
    pub id: u32,
}

impl<'a> DependencyEntity<'a> {
    pub fn processor(oe: &'a Oe, id: u32) -> Self {
        DependencyEntity {
            oe,
            kind: DependencyKind::Processor,
            name: oe.proc_name.clone(),
            id,
        }
    }

    /// The software dependency, if the OE names an execution environment.
    pub fn software(oe: &'a Oe, id: u32) -> Option<Self> {
        oe.env_name.as_ref().map(|env| DependencyEntity {
            oe,
            kind: DependencyKind::Software,
            name: env.clone(),
            id,
        })
    }

    pub fn kind(&self) -> DependencyKind {
        self.kind
    }
}

impl RemoteEntity for DependencyEntity<'_> {
    const KIND: EntityKind = EntityKind::Dependency;
    const ENDPOINT: &'static str = DEPENDENCY_ENDPOINT;

    fn search_term(&self) -> &str {
        &self.name
    }

    fn representation(&self) -> Value {
        let oe = self.oe;
        match self.kind {
            DependencyKind::Processor => json!({
                "type": "processor",
                "name": oe.proc_name,
                "manufacturer": oe.manufacturer,
                "family": oe.proc_family,
                "series": oe.proc_series,
                "features": feature_names(oe.features),
                "description": format!("{} {}", oe.manufacturer, oe.proc_name),
            }),
            DependencyKind::Software => {
                let mut rep = json!({
                    "type": "software",
                    "name": self.name,
                    "description": oe.description.clone().unwrap_or_else(|| self.name.clone()),
                });
                if let Some(cpe) = &oe.cpe {
                    rep["cpe"] = json!(cpe);
                }
                if let Some(swid) = &oe.swid {
                    rep["swid"] = json!(swid);
                }
                rep
            }
        }
    }

    fn matches(&mut self, remote: &Value) -> Result<bool> {
        Ok(same_fields(&self.representation(), remote))
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

/// Registered name of an OE.
pub fn oe_name(oe: &Oe) -> String {
    match &oe.env_name {
        Some(env) => format!("{env} on {} {}", oe.manufacturer, oe.proc_name),
        None => format!("{} {}", oe.manufacturer, oe.proc_name),
    }
}

/// Working copy of an OE and its server ID.
#[derive(Debug)]
pub struct OeEntity {
    name: String,
    dependency_urls: Vec<String>,
    pub id: u32,
}

impl OeEntity {
    /// `dependency_ids` are the server IDs of the OE's dependencies.
    pub fn new(oe: &Oe, dependency_ids: &[u32], id: u32) -> Self {
        OeEntity {
            name: oe_name(oe),
            dependency_urls: dependency_ids
                .iter()
                .map(|id| protocol::entity(DEPENDENCY_ENDPOINT, *id))
                .collect(),
            id,
        }
    }
}

impl RemoteEntity for OeEntity {
    const KIND: EntityKind = EntityKind::Oe;
    const ENDPOINT: &'static str = OE_ENDPOINT;

    fn search_term(&self) -> &str {
        &self.name
    }

    fn representation(&self) -> Value {
        json!({
            "name": self.name,
            "dependencyUrls": self.dependency_urls,
        })
    }

    fn matches(&mut self, remote: &Value) -> Result<bool> {
        if str_field(remote, "name")? != self.name {
            return Ok(false);
        }
        let remote_urls = url_set(remote, "dependencyUrls").or_else(|| url_set(remote, "dependencies"));
        let mut local = self.dependency_urls.clone();
        local.sort();
        Ok(remote_urls == Some(local))
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
pub(crate) mod tests {
    use super::*;
    use acvp_definition::{DefLock, ModuleType};
    use std::path::PathBuf;

    pub(crate) fn linux() -> Oe {
        Oe {
            env_name: Some("Linux 6.1".to_string()),
            env_type: ModuleType::Software,
            cpe: Some("cpe:/o:linux:linux_kernel:6.1".to_string()),
            swid: None,
            description: None,
            manufacturer: "Intel".to_string(),
            proc_family: "X86".to_string(),
            proc_family_internal: None,
            proc_name: "Xeon".to_string(),
            proc_series: "Gold".to_string(),
            features: 1 << 1,
            file: PathBuf::from("oe.json"),
            lock: DefLock::allocate().adopt(),
        }
    }

    #[test]
    fn processor_dependency_lists_features() {
        let oe = linux();
        let rep = DependencyEntity::processor(&oe, 0).representation();
        assert_eq!(rep["type"], "processor");
        assert_eq!(rep["features"], json!(["aes-ni"]));
    }

    #[test]
    fn software_dependency_needs_env() {
        let mut oe = linux();
        let rep = DependencyEntity::software(&oe, 0).unwrap().representation();
        assert_eq!(rep["name"], "Linux 6.1");
        assert_eq!(rep["cpe"], "cpe:/o:linux:linux_kernel:6.1");
        assert!(rep.get("swid").is_none());

        oe.env_name = None;
        assert!(DependencyEntity::software(&oe, 0).is_none());
    }

    #[test]
    fn oe_match_ignores_dependency_order() {
        let oe = linux();
        let mut entity = OeEntity::new(&oe, &[3, 4], 0);
        let remote = json!({
            "url": "/acvp/v1/oes/9",
            "name": "Linux 6.1 on Intel Xeon",
            "dependencies": [
                { "url": "/acvp/v1/dependencies/4" },
                { "url": "/acvp/v1/dependencies/3" }
            ]
        });
        assert!(entity.matches(&remote).unwrap());

        let mut fewer = OeEntity::new(&oe, &[3], 0);
        assert!(!fewer.matches(&remote).unwrap());
    }
}
