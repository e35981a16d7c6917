//! Uninstantiated algorithm capability maps.
//!
//! The [`MapTable`] is filled once at startup and only read afterwards. The
//! loader binds each map to every vendor/info/OE combination it fits.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{DefinitionError, Result};

/// One algorithm implementation's capabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgoMap {
    /// Prefix of the module name this map applies to.
    pub algo_name: String,
    /// Prefix of the processor family this map applies to.
    pub processor: String,
    pub impl_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impl_description: Option<String>,
    /// Capability records, one per algorithm.
    #[serde(default)]
    pub algos: Vec<Value>,
}

impl AlgoMap {
    /// Whether this map applies to a module and processor family.
    pub fn fits(&self, module_name: &str, proc_family: &str) -> bool {
        module_name.starts_with(&self.algo_name) && proc_family.starts_with(&self.processor)
    }
}

/// Process-wide table of algorithm maps.
#[derive(Debug, Default)]
pub struct MapTable {
    maps: RwLock<Vec<Arc<AlgoMap>>>,
}

impl MapTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON array of maps.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let maps: Vec<AlgoMap> =
            serde_json::from_str(&data).map_err(|e| DefinitionError::ConfigParse {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;
        let table = MapTable::new();
        for map in maps {
            table.register(map);
        }
        Ok(table)
    }

    /// Add a map. A map with the same algorithm name, processor and
    /// implementation name as one already present is ignored.
    pub fn register(&self, map: AlgoMap) -> bool {
        let mut maps = self.maps.write();
        if maps.iter().any(|m| {
            m.algo_name == map.algo_name
                && m.processor == map.processor
                && m.impl_name == map.impl_name
        }) {
            warn!(
                algo = %map.algo_name,
                processor = %map.processor,
                implementation = %map.impl_name,
                "duplicate algorithm map ignored"
            );
            return false;
        }
        debug!(algo = %map.algo_name, implementation = %map.impl_name, "registered algorithm map");
        maps.push(Arc::new(map));
        true
    }

    /// Maps that fit the module and processor family and whose
    /// implementation name is listed in `implementations`.
    pub fn matching(
        &self,
        module_name: &str,
        proc_family: &str,
        implementations: &[String],
    ) -> Vec<Arc<AlgoMap>> {
        self.maps
            .read()
            .iter()
            .filter(|m| m.fits(module_name, proc_family))
            .filter(|m| implementations.iter().any(|i| *i == m.impl_name))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.maps.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.read().is_empty()
    }

    /// Human-readable listing of all maps.
    pub fn format_table(&self) -> String {
        let maps = self.maps.read();
        let header = ("Algo Name", "Processor", "Implementation Name");
        let w0 = maps
            .iter()
            .map(|m| m.algo_name.len())
            .chain([header.0.len()])
            .max()
            .unwrap_or(0);
        let w1 = maps
            .iter()
            .map(|m| m.processor.len())
            .chain([header.1.len()])
            .max()
            .unwrap_or(0);

        let mut out = format!("{:<w0$} | {:<w1$} | {}\n", header.0, header.1, header.2);
        out.push_str(&format!("{}\n", "-".repeat(w0 + w1 + 6 + header.2.len())));
        for m in maps.iter() {
            out.push_str(&format!(
                "{:<w0$} | {:<w1$} | {}\n",
                m.algo_name, m.processor, m.impl_name
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tracing_test::traced_test;

    fn map(algo: &str, proc_: &str, imp: &str) -> AlgoMap {
        AlgoMap {
            algo_name: algo.to_string(),
            processor: proc_.to_string(),
            impl_name: imp.to_string(),
            impl_description: None,
            algos: vec![serde_json::json!({ "algorithm": "SHA2-256" })],
        }
    }

    fn impls(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn prefix_match_on_name_and_family() {
        let table = MapTable::new();
        table.register(map("OpenSSL", "X86", "AESNI"));

        assert_eq!(
            table
                .matching("OpenSSL FIPS", "X86_64", &impls(&["AESNI"]))
                .len(),
            1
        );
        assert!(table
            .matching("BoringSSL", "X86_64", &impls(&["AESNI"]))
            .is_empty());
        assert!(table
            .matching("OpenSSL", "ARM64", &impls(&["AESNI"]))
            .is_empty());
    }

    #[test]
    fn implementation_must_be_listed_exactly() {
        let table = MapTable::new();
        table.register(map("OpenSSL", "X86", "AESNI"));
        assert!(table
            .matching("OpenSSL", "X86", &impls(&["AESNI_ASM"]))
            .is_empty());
    }

    #[traced_test]
    #[test]
    fn duplicate_map_ignored() {
        let table = MapTable::new();
        assert!(table.register(map("OpenSSL", "X86", "AESNI")));
        assert!(!table.register(map("OpenSSL", "X86", "AESNI")));
        assert_eq!(table.len(), 1);
        assert!(logs_contain("duplicate algorithm map ignored"));
    }

    #[test]
    fn load_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("maps.json");
        std::fs::write(
            &path,
            r#"[{"algoName":"OpenSSL","processor":"X86","implName":"C","algos":[{},{}]}]"#,
        )
        .unwrap();
        let table = MapTable::from_json_file(&path).unwrap();
        let found = table.matching("OpenSSL", "X86", &impls(&["C"]));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].algos.len(), 2);
    }

    #[test]
    fn table_lists_every_map() {
        let table = MapTable::new();
        table.register(map("OpenSSL", "X86", "AESNI"));
        table.register(map("Linux Kernel", "ARM64", "CE"));
        let out = table.format_table();
        assert!(out.starts_with("Algo Name"));
        assert!(out.contains("Implementation Name"));
        assert!(out.contains("Linux Kernel | ARM64     | CE"));
    }
}
