//! Instantiated module definitions and their sub-records.
//!
//! A [`Definition`] is one (vendor, module info, OE, algorithm map)
//! combination. Its three sub-records are owned copies of the load-time
//! records, so later changes to those are invisible here, but each carries a
//! [`LockRef`] adopted from the lock of the file it was read from.

use std::path::PathBuf;
use std::sync::{Arc, OnceLock, Weak};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::algo_map::AlgoMap;
use crate::lock::LockRef;

/// Processor feature bits accepted in the OE `features` field.
pub const PROC_FEATURES: &[(u64, &str)] = &[
    (1 << 0, "rdrand"),
    (1 << 1, "aes-ni"),
    (1 << 2, "pclmulqdq"),
    (1 << 3, "avx2"),
    (1 << 4, "avx512"),
    (1 << 5, "sha-ni"),
    (1 << 6, "cpacf"),
    (1 << 7, "asimd"),
];

/// Union of all known processor feature bits.
pub fn known_features() -> u64 {
    PROC_FEATURES.iter().fold(0, |acc, (bit, _)| acc | bit)
}

/// Names of the feature bits set in `features`.
pub fn feature_names(features: u64) -> Vec<&'static str> {
    PROC_FEATURES
        .iter()
        .filter(|(bit, _)| features & bit != 0)
        .map(|(_, name)| *name)
        .collect()
}

/// Module / environment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleType {
    Hardware,
    Software,
    Firmware,
}

impl ModuleType {
    /// Map the numeric config encoding.
    pub fn from_number(n: u64) -> Option<Self> {
        match n {
            1 => Some(ModuleType::Hardware),
            2 => Some(ModuleType::Software),
            3 => Some(ModuleType::Firmware),
            _ => None,
        }
    }

    /// Map the textual config encoding.
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "Hardware" => Some(ModuleType::Hardware),
            "Software" => Some(ModuleType::Software),
            "Firmware" => Some(ModuleType::Firmware),
            _ => None,
        }
    }

    /// The name used by the server.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleType::Hardware => "Hardware",
            ModuleType::Software => "Software",
            ModuleType::Firmware => "Firmware",
        }
    }
}

/// Vendor postal address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub street: String,
    pub locality: String,
    pub region: String,
    pub country: String,
    pub postal_code: String,
}

/// Vendor and contact record.
#[derive(Debug, Clone)]
pub struct Vendor {
    pub name: String,
    pub url: String,
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: Option<String>,
    pub address: Address,
    /// Backing config file.
    pub file: PathBuf,
    /// Lock shared by every record read from `file`.
    pub lock: LockRef,
}

/// Module information record.
#[derive(Debug, Clone)]
pub struct Info {
    /// Module name as registered: `"<name> (<impl>)"` once bound.
    pub module_name: String,
    /// Module name exactly as configured.
    pub orig_module_name: String,
    /// Name used for algorithm map lookup, if different.
    pub module_name_internal: Option<String>,
    pub module_version: String,
    pub module_description: String,
    pub module_type: ModuleType,
    /// Implementation name of the bound algorithm map.
    pub impl_name: Option<String>,
    pub impl_description: Option<String>,
    pub file: PathBuf,
    pub lock: LockRef,
}

impl Info {
    /// The name algorithm maps are matched against.
    pub fn lookup_name(&self) -> &str {
        self.module_name_internal
            .as_deref()
            .unwrap_or(&self.orig_module_name)
    }

    /// Copy this record for one bound implementation.
    pub fn bind(&self, impl_name: Option<&str>, impl_description: Option<&str>) -> Info {
        let mut info = self.clone();
        info.module_name = compose_module_name(&self.orig_module_name, impl_name);
        info.impl_name = impl_name.map(str::to_string);
        info.impl_description = impl_description.map(str::to_string);
        info
    }
}

/// Build the registered module name for an implementation.
pub fn compose_module_name(module_name: &str, impl_name: Option<&str>) -> String {
    match impl_name {
        Some(impl_name) => format!("{module_name} ({impl_name})"),
        None => module_name.to_string(),
    }
}

/// Operational environment record.
#[derive(Debug, Clone)]
pub struct Oe {
    /// Execution environment; `None` for bare-metal environments.
    pub env_name: Option<String>,
    pub env_type: ModuleType,
    pub cpe: Option<String>,
    pub swid: Option<String>,
    pub description: Option<String>,
    pub manufacturer: String,
    pub proc_family: String,
    pub proc_family_internal: Option<String>,
    pub proc_name: String,
    pub proc_series: String,
    pub features: u64,
    pub file: PathBuf,
    pub lock: LockRef,
}

impl Oe {
    /// The processor family algorithm maps are matched against.
    pub fn lookup_family(&self) -> &str {
        self.proc_family_internal
            .as_deref()
            .unwrap_or(&self.proc_family)
    }
}

/// How a dependency is satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    /// Wired to another registered definition after loading.
    Automatic,
    /// Satisfied by an external certificate reference; never searched.
    Manual,
}

/// A declared requirement on another cipher implementation.
#[derive(Debug)]
pub struct DependencyEdge {
    /// Cipher the dependency is needed for.
    pub cipher: String,
    /// Implementation name that fulfils it.
    pub required_impl: String,
    pub resolution: Resolution,
    target: OnceLock<Weak<Definition>>,
}

impl DependencyEdge {
    pub fn new(cipher: &str, required_impl: &str, resolution: Resolution) -> Self {
        DependencyEdge {
            cipher: cipher.to_string(),
            required_impl: required_impl.to_string(),
            resolution,
            target: OnceLock::new(),
        }
    }

    /// The wired provider, if resolved and still registered.
    pub fn target(&self) -> Option<Arc<Definition>> {
        self.target.get().and_then(Weak::upgrade)
    }

    /// Whether wiring has assigned a provider.
    pub fn is_resolved(&self) -> bool {
        self.target.get().is_some()
    }

    /// Wire the edge. Returns false if it was already wired.
    pub(crate) fn resolve(&self, provider: &Arc<Definition>) -> bool {
        self.target.set(Arc::downgrade(provider)).is_ok()
    }
}

/// One instantiated combination eligible for validation testing.
#[derive(Debug)]
pub struct Definition {
    pub vendor: Vendor,
    pub info: Info,
    pub oe: Oe,
    /// Dependencies in declaration order.
    pub deps: Vec<DependencyEdge>,
    pub algo_map: Arc<AlgoMap>,
}

impl Definition {
    /// Implementation name of the bound algorithm map.
    pub fn impl_name(&self) -> &str {
        &self.algo_map.impl_name
    }

    /// Number of algorithm capabilities; one vsID is expected for each.
    pub fn num_algos(&self) -> usize {
        self.algo_map.algos.len()
    }

    /// Search record that identifies this definition unambiguously.
    pub fn search_reference(&self) -> Value {
        let mut s = serde_json::Map::new();
        s.insert("moduleName".into(), self.info.module_name.clone().into());
        s.insert(
            "moduleVersion".into(),
            self.info.module_version.clone().into(),
        );
        s.insert("vendorName".into(), self.vendor.name.clone().into());
        if let Some(env) = &self.oe.env_name {
            s.insert("execenv".into(), env.clone().into());
        }
        s.insert("processor".into(), self.oe.proc_name.clone().into());
        s.insert(
            "processorFamily".into(),
            self.oe.proc_family.clone().into(),
        );
        s.insert(
            "processorSeries".into(),
            self.oe.proc_series.clone().into(),
        );
        Value::Object(s)
    }
}
