//! On-disk config file schemas and their validation into records.
//!
//! Every field is optional at the serde level; [`VendorFile::into_vendor`]
//! and friends decide which ones are required so that a missing field is
//! reported by name together with the file it is missing from.

use std::path::Path;

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::definition::{
    known_features, Address, DependencyEdge, Info, ModuleType, Oe, Resolution, Vendor,
};
use crate::error::{DefinitionError, Result};
use crate::lock::LockRef;

/// Dependency declarations any config file may carry, keyed by
/// implementation name and valued as `{cipher: implementation}` maps.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DependencySections {
    #[serde(rename = "dependencies-internal", default)]
    pub internal: Option<Map<String, Value>>,
    #[serde(rename = "dependencies-external", default)]
    pub external: Option<Map<String, Value>>,
}

impl DependencySections {
    /// Edges declared for `impl_name`: internal ones first, then external,
    /// each in file order.
    pub fn edges_for(&self, impl_name: &str, path: &Path) -> Result<Vec<DependencyEdge>> {
        let mut edges = Vec::new();
        for (section, resolution, name) in [
            (&self.internal, Resolution::Automatic, "dependencies-internal"),
            (&self.external, Resolution::Manual, "dependencies-external"),
        ] {
            let Some(entry) = section.as_ref().and_then(|s| s.get(impl_name)) else {
                continue;
            };
            let Value::Object(ciphers) = entry else {
                return Err(invalid(path, name, "implementation entry is not an object"));
            };
            for (cipher, required) in ciphers {
                let required = required.as_str().ok_or_else(|| {
                    invalid(path, name, &format!("dependency for {cipher} is not a string"))
                })?;
                edges.push(DependencyEdge::new(cipher, required, resolution));
            }
        }
        Ok(edges)
    }
}

/// A number or a name encoding a [`ModuleType`].
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TypeCode {
    Number(u64),
    Name(String),
}

impl TypeCode {
    fn resolve(&self, path: &Path, field: &str) -> Result<ModuleType> {
        let ty = match self {
            TypeCode::Number(n) => ModuleType::from_number(*n),
            TypeCode::Name(s) => ModuleType::from_name(s),
        };
        ty.ok_or_else(|| invalid(path, field, &format!("unknown type {self:?}")))
    }
}

/// Vendor config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorFile {
    pub vendor_name: Option<String>,
    pub vendor_url: Option<String>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub address_street: Option<String>,
    pub address_city: Option<String>,
    pub address_state: Option<String>,
    pub address_country: Option<String>,
    pub address_zip: Option<String>,
    #[serde(flatten)]
    pub deps: DependencySections,
}

impl VendorFile {
    pub fn into_vendor(self, path: &Path, lock: LockRef) -> Result<Vendor> {
        Ok(Vendor {
            name: required(path, "vendorName", self.vendor_name)?,
            url: required(path, "vendorUrl", self.vendor_url)?,
            contact_name: required(path, "contactName", self.contact_name)?,
            contact_email: required(path, "contactEmail", self.contact_email)?,
            contact_phone: self.contact_phone,
            address: Address {
                street: required(path, "addressStreet", self.address_street)?,
                locality: required(path, "addressCity", self.address_city)?,
                region: required(path, "addressState", self.address_state)?,
                country: required(path, "addressCountry", self.address_country)?,
                postal_code: required(path, "addressZip", self.address_zip)?,
            },
            file: path.to_path_buf(),
            lock,
        })
    }
}

/// Module information config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoFile {
    pub module_name: Option<String>,
    pub module_name_internal: Option<String>,
    pub module_version: Option<String>,
    pub module_description: Option<String>,
    pub module_type: Option<TypeCode>,
    #[serde(flatten)]
    pub deps: DependencySections,
}

impl InfoFile {
    pub fn into_info(self, path: &Path, lock: LockRef) -> Result<Info> {
        let module_name = required(path, "moduleName", self.module_name)?;
        let module_type = self
            .module_type
            .ok_or_else(|| missing(path, "moduleType"))?
            .resolve(path, "moduleType")?;
        Ok(Info {
            module_name: module_name.clone(),
            orig_module_name: module_name,
            module_name_internal: self.module_name_internal,
            module_version: required(path, "moduleVersion", self.module_version)?,
            module_description: required(path, "moduleDescription", self.module_description)?,
            module_type,
            impl_name: None,
            impl_description: None,
            file: path.to_path_buf(),
            lock,
        })
    }
}

/// Operational environment config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OeFile {
    /// Outer `None`: absent. Inner `None`: explicit `null`.
    #[serde(default, deserialize_with = "present_or_null")]
    pub oe_env_name: Option<Option<String>>,
    pub env_type: Option<TypeCode>,
    pub cpe: Option<String>,
    pub swid: Option<String>,
    pub oe_description: Option<String>,
    pub manufacturer: Option<String>,
    pub proc_family: Option<String>,
    pub proc_family_internal: Option<String>,
    pub proc_name: Option<String>,
    pub proc_series: Option<String>,
    pub features: Option<u64>,
    #[serde(flatten)]
    pub deps: DependencySections,
}

fn present_or_null<'de, D>(deserializer: D) -> std::result::Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl OeFile {
    pub fn into_oe(self, path: &Path, lock: LockRef) -> Result<Oe> {
        let env_name = self.oe_env_name.ok_or_else(|| missing(path, "oeEnvName"))?;
        let env_type = self
            .env_type
            .ok_or_else(|| missing(path, "envType"))?
            .resolve(path, "envType")?;
        let features = self.features.ok_or_else(|| missing(path, "features"))?;
        if features & !known_features() != 0 {
            return Err(invalid(
                path,
                "features",
                &format!("unknown processor feature bits {:#x}", features & !known_features()),
            ));
        }
        Ok(Oe {
            env_name,
            env_type,
            cpe: self.cpe,
            swid: self.swid,
            description: self.oe_description,
            manufacturer: required(path, "manufacturer", self.manufacturer)?,
            proc_family: required(path, "procFamily", self.proc_family)?,
            proc_family_internal: self.proc_family_internal,
            proc_name: required(path, "procName", self.proc_name)?,
            proc_series: required(path, "procSeries", self.proc_series)?,
            features,
            file: path.to_path_buf(),
            lock,
        })
    }
}

/// Implementation list config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImplementationFile {
    pub implementations: Option<Vec<String>>,
    #[serde(flatten)]
    pub deps: DependencySections,
}

impl ImplementationFile {
    pub fn implementations(&self, path: &Path) -> Result<&[String]> {
        self.implementations
            .as_deref()
            .ok_or_else(|| missing(path, "implementations"))
    }
}

/// Parse a config document into one of the file schemas.
pub fn parse<T: for<'de> Deserialize<'de>>(path: &Path, doc: Value) -> Result<T> {
    serde_json::from_value(doc).map_err(|e| DefinitionError::ConfigParse {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

fn required(path: &Path, field: &str, value: Option<String>) -> Result<String> {
    value.ok_or_else(|| missing(path, field))
}

fn missing(path: &Path, field: &str) -> DefinitionError {
    DefinitionError::MissingField {
        path: path.to_path_buf(),
        field: field.to_string(),
    }
}

fn invalid(path: &Path, field: &str, detail: &str) -> DefinitionError {
    DefinitionError::InvalidField {
        path: path.to_path_buf(),
        field: field.to_string(),
        detail: detail.to_string(),
    }
}
