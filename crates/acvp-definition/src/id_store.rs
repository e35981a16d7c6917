//! Persistent, idempotent storage of server-assigned identifiers.
//!
//! IDs live next to the descriptive fields in the same JSON config files the
//! loader reads. Every read-modify-write cycle is done under the owning
//! record's entity lock, then under the [`FileAccess`] gate. A file is only
//! rewritten when a merge actually changes its content.
//!
//! Callers do not mutate records. They take a [`Checkout`] of the IDs for
//! one entity, change the `ids` it carries and [`Checkout::commit`] them.
//! The entity lock is held for the lifetime of the checkout.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::MutexGuard;
use serde_json::{Map, Value};
use tracing::debug;

use crate::definition::{Info, Oe, Vendor};
use crate::error::{DefinitionError, Result};
use crate::files::FileAccess;
use crate::id;
use crate::namespace::Namespace;

const VENDOR_ID: &str = "acvpVendorId";
const ADDRESS_ID: &str = "acvpAddressId";
const PERSON_ID: &str = "acvpPersonId";
const OE_ID: &str = "acvpOeId";
const OE_DEP_PROC_ID: &str = "acvpOeDepProcId";
const OE_DEP_SW_ID: &str = "acvpOeDepSwId";
const MODULE_IDS: &str = "acvpModuleIds";
const MODULE_NAME: &str = "acvpModuleName";
const MODULE_ID: &str = "acvpModuleId";

/// Merge integer IDs into a JSON object.
///
/// Absent keys are inserted, differing values overwritten, and a value
/// flagged rejected removes its key. Returns whether anything changed.
pub fn merge_ids_into(obj: &mut Map<String, Value>, pairs: &[(String, u32)]) -> bool {
    let mut changed = false;
    for (key, value) in pairs {
        if id::is_rejected(*value) {
            changed |= obj.remove(key).is_some();
            continue;
        }
        if obj.get(key).and_then(Value::as_u64) != Some(u64::from(*value)) {
            obj.insert(key.clone(), Value::from(*value));
            changed = true;
        }
    }
    changed
}

/// Merge string fields into a JSON object.
///
/// `Some` sets the value if it differs. `None` turns an existing string into
/// `null` but never adds or removes a key. Stored values of any other type
/// count as absent. Returns whether anything changed.
pub fn merge_strings_into(obj: &mut Map<String, Value>, pairs: &[(&str, Option<&str>)]) -> bool {
    let mut changed = false;
    for (key, value) in pairs {
        match (obj.get(*key), value) {
            (Some(Value::String(cur)), Some(v)) if cur == v => {}
            (_, Some(v)) => {
                obj.insert(key.to_string(), Value::from(*v));
                changed = true;
            }
            (Some(Value::String(_)), None) => {
                obj.insert(key.to_string(), Value::Null);
                changed = true;
            }
            (_, None) => {}
        }
    }
    changed
}

/// Module ID stored for `name`: the first entry of the namespaced module ID
/// array whose stored name is a prefix of `name`.
pub fn module_id_lookup(doc: &Value, name: &str, ns: Namespace) -> Option<u32> {
    module_entry(doc, name, ns)
        .and_then(|entry| entry.get(ns.key(MODULE_ID)))
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
}

fn module_entry<'a>(doc: &'a Value, name: &str, ns: Namespace) -> Option<&'a Value> {
    doc.get(ns.key(MODULE_IDS))?
        .as_array()?
        .iter()
        .find(|entry| entry_matches(entry, name))
}

fn entry_matches(entry: &Value, name: &str) -> bool {
    entry
        .get(MODULE_NAME)
        .and_then(Value::as_str)
        .is_some_and(|stored| name.starts_with(stored))
}

fn as_object<'a>(doc: &'a mut Value, path: &Path) -> Result<&'a mut Map<String, Value>> {
    doc.as_object_mut()
        .ok_or_else(|| DefinitionError::ConfigParse {
            path: path.to_path_buf(),
            detail: "top level is not a JSON object".to_string(),
        })
}

fn read_u32(doc: &Value, key: &str) -> u32 {
    doc.get(key)
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0)
}

/// A set of IDs that can be written back into its config document.
pub trait IdRecord {
    /// Merge into `doc`. Returns whether anything changed.
    fn store(&self, doc: &mut Value, path: &Path, ns: Namespace) -> Result<bool>;
}

/// IDs kept in a vendor file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VendorIds {
    pub vendor: u32,
    pub address: u32,
    pub person: u32,
}

impl VendorIds {
    pub fn load(doc: &Value, ns: Namespace) -> Self {
        VendorIds {
            vendor: read_u32(doc, &ns.key(VENDOR_ID)),
            address: read_u32(doc, &ns.key(ADDRESS_ID)),
            person: read_u32(doc, &ns.key(PERSON_ID)),
        }
    }
}

impl IdRecord for VendorIds {
    fn store(&self, doc: &mut Value, path: &Path, ns: Namespace) -> Result<bool> {
        Ok(merge_ids_into(
            as_object(doc, path)?,
            &[
                (ns.key(VENDOR_ID), self.vendor),
                (ns.key(ADDRESS_ID), self.address),
                (ns.key(PERSON_ID), self.person),
            ],
        ))
    }
}

/// IDs kept in an OE file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OeIds {
    pub oe: u32,
    pub dep_proc: u32,
    pub dep_sw: u32,
}

impl OeIds {
    pub fn load(doc: &Value, ns: Namespace) -> Self {
        OeIds {
            oe: read_u32(doc, &ns.key(OE_ID)),
            dep_proc: read_u32(doc, &ns.key(OE_DEP_PROC_ID)),
            dep_sw: read_u32(doc, &ns.key(OE_DEP_SW_ID)),
        }
    }
}

impl IdRecord for OeIds {
    fn store(&self, doc: &mut Value, path: &Path, ns: Namespace) -> Result<bool> {
        Ok(merge_ids_into(
            as_object(doc, path)?,
            &[
                (ns.key(OE_ID), self.oe),
                (ns.key(OE_DEP_PROC_ID), self.dep_proc),
                (ns.key(OE_DEP_SW_ID), self.dep_sw),
            ],
        ))
    }
}

/// One module's entry in an info file's module ID array.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleIdEntry {
    pub name: String,
    pub id: u32,
}

impl ModuleIdEntry {
    pub fn load(doc: &Value, name: &str, ns: Namespace) -> Self {
        ModuleIdEntry {
            name: name.to_string(),
            id: module_id_lookup(doc, name, ns).unwrap_or(0),
        }
    }
}

impl IdRecord for ModuleIdEntry {
    fn store(&self, doc: &mut Value, path: &Path, ns: Namespace) -> Result<bool> {
        let obj = as_object(doc, path)?;
        let array_key = ns.key(MODULE_IDS);
        let id_key = ns.key(MODULE_ID);

        if let Some(Value::Array(entries)) = obj.get_mut(&array_key) {
            if let Some(pos) = entries.iter().position(|e| entry_matches(e, &self.name)) {
                if id::is_rejected(self.id) {
                    entries.remove(pos);
                    return Ok(true);
                }
                if let Some(entry) = entries[pos].as_object_mut() {
                    return Ok(merge_ids_into(entry, &[(id_key, self.id)]));
                }
            }
        }
        if id::is_rejected(self.id) {
            return Ok(false);
        }

        let mut entry = Map::new();
        entry.insert(MODULE_NAME.to_string(), Value::from(self.name.as_str()));
        entry.insert(id_key, Value::from(self.id));
        match obj.get_mut(&array_key) {
            Some(Value::Array(entries)) => entries.push(Value::Object(entry)),
            _ => {
                obj.insert(array_key, Value::Array(vec![Value::Object(entry)]));
            }
        }
        Ok(true)
    }
}

/// IDs of one entity, checked out under its entity lock.
///
/// Dropping a checkout without committing writes nothing.
pub struct Checkout<'a, T: IdRecord> {
    _guard: MutexGuard<'a, ()>,
    files: &'a FileAccess,
    path: PathBuf,
    ns: Namespace,
    /// The IDs as read; modify and commit to persist.
    pub ids: T,
}

impl<T: IdRecord> Checkout<'_, T> {
    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist `ids`. Returns whether the file was rewritten.
    pub fn commit(self) -> Result<bool> {
        let changed = self
            .files
            .update_json(&self.path, |doc| self.ids.store(doc, &self.path, self.ns))?;
        debug!(path = %self.path.display(), changed, "committed IDs");
        Ok(changed)
    }
}

/// ID store bound to one file gate.
#[derive(Debug, Clone, Default)]
pub struct IdStore {
    files: Arc<FileAccess>,
}

impl IdStore {
    pub fn new(files: Arc<FileAccess>) -> Self {
        IdStore { files }
    }

    pub fn files(&self) -> &FileAccess {
        &self.files
    }

    /// Merge integer IDs into the document at `path`.
    ///
    /// The caller must hold the entity lock for `path`. The file is written
    /// at most once, and only if content changed.
    pub fn merge_ids(&self, path: &Path, pairs: &[(String, u32)]) -> Result<bool> {
        self.files
            .update_json(path, |doc| Ok(merge_ids_into(as_object(doc, path)?, pairs)))
    }

    /// Merge string fields into the document at `path`. Same locking rules
    /// as [`IdStore::merge_ids`].
    pub fn merge_strings(&self, path: &Path, pairs: &[(&str, Option<&str>)]) -> Result<bool> {
        self.files
            .update_json(path, |doc| Ok(merge_strings_into(as_object(doc, path)?, pairs)))
    }

    /// Module ID recorded for `name` in the info file at `path`.
    pub fn module_id(&self, path: &Path, name: &str, ns: Namespace) -> Result<u32> {
        let doc = self.files.read_json(path)?;
        module_id_lookup(&doc, name, ns).ok_or_else(|| DefinitionError::ModuleIdNotFound {
            path: path.to_path_buf(),
            name: name.to_string(),
        })
    }

    fn checkout<'a, T: IdRecord>(
        &'a self,
        guard: MutexGuard<'a, ()>,
        path: &Path,
        ns: Namespace,
        load: impl FnOnce(&Value) -> T,
    ) -> Result<Checkout<'a, T>> {
        let doc = self.files.read_json(path)?;
        Ok(Checkout {
            _guard: guard,
            files: self.files.as_ref(),
            path: path.to_path_buf(),
            ns,
            ids: load(&doc),
        })
    }

    /// Check out vendor, address and person IDs.
    pub fn checkout_vendor<'a>(
        &'a self,
        vendor: &'a Vendor,
        ns: Namespace,
    ) -> Result<Checkout<'a, VendorIds>> {
        self.checkout(vendor.lock.lock(), &vendor.file, ns, |doc| {
            VendorIds::load(doc, ns)
        })
    }

    /// Check out OE and OE dependency IDs.
    pub fn checkout_oe<'a>(&'a self, oe: &'a Oe, ns: Namespace) -> Result<Checkout<'a, OeIds>> {
        self.checkout(oe.lock.lock(), &oe.file, ns, |doc| OeIds::load(doc, ns))
    }

    /// Check out the module ID of a bound module.
    pub fn checkout_module<'a>(
        &'a self,
        info: &'a Info,
        ns: Namespace,
    ) -> Result<Checkout<'a, ModuleIdEntry>> {
        self.checkout(info.lock.lock(), &info.file, ns, |doc| {
            ModuleIdEntry::load(doc, &info.module_name, ns)
        })
    }

    /// Write the descriptive OE fields back to its config file.
    pub fn update_oe_config(&self, oe: &Oe) -> Result<bool> {
        let _guard = oe.lock.lock();
        self.merge_strings(
            &oe.file,
            &[
                ("oeEnvName", oe.env_name.as_deref()),
                ("cpe", oe.cpe.as_deref()),
                ("swid", oe.swid.as_deref()),
                ("manufacturer", Some(oe.manufacturer.as_str())),
                ("procFamily", Some(oe.proc_family.as_str())),
                ("procName", Some(oe.proc_name.as_str())),
                ("procSeries", Some(oe.proc_series.as_str())),
            ],
        )
    }

    /// Write the module name and version back to the info config file.
    pub fn update_module_config(&self, info: &Info) -> Result<bool> {
        let _guard = info.lock.lock();
        self.merge_strings(
            &info.file,
            &[
                ("moduleName", Some(info.orig_module_name.as_str())),
                ("moduleVersion", Some(info.module_version.as_str())),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tests::sample;
    use serde_json::json;

    fn write(dir: &Path, name: &str, doc: Value) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();
        path
    }

    #[test]
    fn repeated_merge_writes_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "vendor.json", json!({ "vendorName": "Acme" }));
        let store = IdStore::default();
        let pairs = [("acvpVendorId".to_string(), 42)];

        assert!(store.merge_ids(&path, &pairs).unwrap());
        assert!(!store.merge_ids(&path, &pairs).unwrap());
        assert_eq!(store.files().writes(), 1);
        assert_eq!(store.files().read_json(&path).unwrap()["acvpVendorId"], 42);
    }

    #[test]
    fn rejected_absent_key_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "vendor.json", json!({ "vendorName": "Acme" }));
        let store = IdStore::default();

        let pairs = [("acvpVendorId".to_string(), id::REQUEST_REJECTED)];
        assert!(!store.merge_ids(&path, &pairs).unwrap());
        assert_eq!(store.files().writes(), 0);
    }

    #[test]
    fn rejected_present_key_is_deleted() {
        let mut obj = json!({ "acvpOeId": 7, "procName": "Xeon" })
            .as_object()
            .cloned()
            .unwrap();
        let changed = merge_ids_into(
            &mut obj,
            &[("acvpOeId".to_string(), id::REQUEST_REJECTED | 7)],
        );
        assert!(changed);
        assert!(!obj.contains_key("acvpOeId"));
        assert!(obj.contains_key("procName"));
    }

    #[test]
    fn string_merge_null_semantics() {
        let mut obj = json!({ "cpe": null, "swid": "swid-1", "oeEnvName": "Linux" })
            .as_object()
            .cloned()
            .unwrap();

        // Null stays null, absent stays absent.
        assert!(!merge_strings_into(&mut obj, &[("cpe", None), ("missing", None)]));
        assert!(!obj.contains_key("missing"));

        // A null replacement keeps the key.
        assert!(merge_strings_into(&mut obj, &[("swid", None)]));
        assert_eq!(obj["swid"], Value::Null);

        // Non-null replaces null; equal values do not count as a change.
        assert!(merge_strings_into(&mut obj, &[("cpe", Some("cpe:/o:linux"))]));
        assert!(!merge_strings_into(&mut obj, &[("oeEnvName", Some("Linux"))]));
    }

    #[test]
    fn null_replacement_leaves_non_strings_alone() {
        let mut obj = json!({ "cpe": 5, "swid": ["a"] }).as_object().cloned().unwrap();
        assert!(!merge_strings_into(&mut obj, &[("cpe", None), ("swid", None)]));
        assert_eq!(obj["cpe"], 5);
        assert_eq!(obj["swid"], json!(["a"]));

        // A string replaces a value of the wrong type.
        assert!(merge_strings_into(&mut obj, &[("cpe", Some("cpe:/o:linux"))]));
        assert_eq!(obj["cpe"], "cpe:/o:linux");
    }

    #[test]
    fn module_lookup_uses_prefix() {
        let doc = json!({ "acvpModuleIds": [{ "acvpModuleName": "OpenSSL", "acvpModuleId": 7 }] });
        assert_eq!(
            module_id_lookup(&doc, "OpenSSL FIPS Provider", Namespace::Sandbox),
            Some(7)
        );
        assert_eq!(module_id_lookup(&doc, "BoringSSL", Namespace::Sandbox), None);
        assert_eq!(
            module_id_lookup(&doc, "OpenSSL", Namespace::Production),
            None
        );
    }

    #[test]
    fn module_entry_appended_then_merged() {
        let mut doc = json!({ "moduleName": "OpenSSL" });
        let path = Path::new("info.json");
        let entry = ModuleIdEntry {
            name: "OpenSSL (C)".to_string(),
            id: 11,
        };
        assert!(entry.store(&mut doc, path, Namespace::Production).unwrap());
        assert_eq!(
            module_id_lookup(&doc, "OpenSSL (C)", Namespace::Production),
            Some(11)
        );
        assert!(!entry.store(&mut doc, path, Namespace::Production).unwrap());

        let other = ModuleIdEntry {
            name: "OpenSSL (AESNI)".to_string(),
            id: 12,
        };
        assert!(other.store(&mut doc, path, Namespace::Production).unwrap());
        assert_eq!(doc["acvpModuleIdsProduction"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn rejected_module_id_drops_its_entry() {
        let mut doc = json!({
            "acvpModuleIds": [
                { "acvpModuleName": "OpenSSL (C)", "acvpModuleId": 11 },
                { "acvpModuleName": "OpenSSL (AESNI)", "acvpModuleId": 12 }
            ]
        });
        let path = Path::new("info.json");
        let rejected = ModuleIdEntry {
            name: "OpenSSL (C)".to_string(),
            id: id::REQUEST_REJECTED,
        };
        assert!(rejected.store(&mut doc, path, Namespace::Sandbox).unwrap());
        assert_eq!(
            doc["acvpModuleIds"],
            json!([{ "acvpModuleName": "OpenSSL (AESNI)", "acvpModuleId": 12 }])
        );
        assert_eq!(module_id_lookup(&doc, "OpenSSL (C)", Namespace::Sandbox), None);
        assert!(!rejected.store(&mut doc, path, Namespace::Sandbox).unwrap());
    }

    #[test]
    fn missing_module_id_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "info.json", json!({ "moduleName": "OpenSSL" }));
        let err = IdStore::default()
            .module_id(&path, "OpenSSL", Namespace::Sandbox)
            .unwrap_err();
        assert!(matches!(err, DefinitionError::ModuleIdNotFound { .. }));
    }

    #[test]
    fn vendor_checkout_commits_namespaced_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "vendor.json", json!({ "acvpVendorId": 3 }));
        let mut def = sample("OpenSSL", "C", "Acme");
        def.vendor.file = path.clone();
        let store = IdStore::default();

        let mut checkout = store.checkout_vendor(&def.vendor, Namespace::Production).unwrap();
        assert_eq!(checkout.ids, VendorIds::default());
        checkout.ids.vendor = 9;
        checkout.ids.address = 10;
        assert!(checkout.commit().unwrap());

        let doc = store.files().read_json(&path).unwrap();
        assert_eq!(doc["acvpVendorId"], 3);
        assert_eq!(doc["acvpVendorIdProduction"], 9);
        assert_eq!(doc["acvpAddressIdProduction"], 10);
        assert_eq!(doc["acvpPersonIdProduction"], 0);
    }

    #[test]
    fn dropped_checkout_writes_nothing_and_unlocks() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "oe.json", json!({}));
        let mut def = sample("OpenSSL", "C", "Acme");
        def.oe.file = path;
        let store = IdStore::default();

        {
            let mut checkout = store.checkout_oe(&def.oe, Namespace::Sandbox).unwrap();
            checkout.ids.oe = 5;
        }
        assert_eq!(store.files().writes(), 0);
        // The entity lock was released with the checkout.
        let checkout = store.checkout_oe(&def.oe, Namespace::Sandbox).unwrap();
        assert_eq!(checkout.ids.oe, 0);
    }

    #[test]
    fn oe_config_write_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "oe.json",
            json!({ "oeEnvName": "Linux 5", "procName": "Xeon", "cpe": "old" }),
        );
        let mut def = sample("OpenSSL", "C", "Acme");
        def.oe.file = path.clone();
        let store = IdStore::default();

        assert!(store.update_oe_config(&def.oe).unwrap());
        let doc = store.files().read_json(&path).unwrap();
        assert_eq!(doc["oeEnvName"], "Linux");
        assert_eq!(doc["cpe"], Value::Null);
        assert!(doc.get("swid").is_none());
        assert!(!store.update_oe_config(&def.oe).unwrap());
    }
}
