//! Binding config files and algorithm maps into definitions.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::algo_map::MapTable;
use crate::config::{self, ImplementationFile, InfoFile, OeFile, VendorFile};
use crate::definition::Definition;
use crate::error::Result;
use crate::files::FileAccess;
use crate::lock::DefLock;
use crate::registry::DefinitionRegistry;
use crate::resolution::{self, WireReport};
use crate::scan::{self, ConfigTuple, ConfigTuples};

/// Directory searched by [`Loader::load_default_config`] when no other base
/// directory is configured.
pub const DEFAULT_DEFINITIONS_DIR: &str = "module_definitions";

/// Locks allocated for the files of one load batch, one per path.
///
/// Locks that no definition adopted are freed when the batch drops this.
#[derive(Debug, Default)]
pub struct LockCache {
    locks: HashMap<PathBuf, DefLock>,
}

impl LockCache {
    /// The lock for `path`, allocating it on first use.
    pub fn lock_for(&mut self, path: &Path) -> DefLock {
        self.locks
            .entry(path.to_path_buf())
            .or_insert_with(DefLock::allocate)
            .clone()
    }
}

/// Loads definitions into a registry.
#[derive(Debug, Clone)]
pub struct Loader {
    maps: Arc<MapTable>,
    registry: Arc<DefinitionRegistry>,
    files: Arc<FileAccess>,
}

impl Loader {
    pub fn new(
        maps: Arc<MapTable>,
        registry: Arc<DefinitionRegistry>,
        files: Arc<FileAccess>,
    ) -> Self {
        Loader {
            maps,
            registry,
            files,
        }
    }

    pub fn registry(&self) -> &Arc<DefinitionRegistry> {
        &self.registry
    }

    /// Bind one file combination and register the resulting definitions.
    ///
    /// Returns how many definitions were registered. On error nothing from
    /// this combination is registered; earlier combinations stay.
    pub fn load_tuple(&self, tuple: &ConfigTuple, locks: &mut LockCache) -> Result<usize> {
        let impl_file: ImplementationFile = self.parse(&tuple.implementation)?;
        let implementations = impl_file.implementations(&tuple.implementation)?;

        let mut oe_file: OeFile = self.parse(&tuple.oe)?;
        let oe_deps = std::mem::take(&mut oe_file.deps);
        let oe = oe_file.into_oe(&tuple.oe, locks.lock_for(&tuple.oe).adopt())?;

        let mut vendor_file: VendorFile = self.parse(&tuple.vendor)?;
        let vendor_deps = std::mem::take(&mut vendor_file.deps);
        let vendor =
            vendor_file.into_vendor(&tuple.vendor, locks.lock_for(&tuple.vendor).adopt())?;

        let mut info_file: InfoFile = self.parse(&tuple.info)?;
        let info_deps = std::mem::take(&mut info_file.deps);
        let info = info_file.into_info(&tuple.info, locks.lock_for(&tuple.info).adopt())?;

        let maps = self
            .maps
            .matching(info.lookup_name(), oe.lookup_family(), implementations);

        let mut defs = Vec::with_capacity(maps.len());
        for map in maps {
            let mut deps = Vec::new();
            for (sections, path) in [
                (&impl_file.deps, &tuple.implementation),
                (&oe_deps, &tuple.oe),
                (&vendor_deps, &tuple.vendor),
                (&info_deps, &tuple.info),
            ] {
                deps.extend(sections.edges_for(&map.impl_name, path)?);
            }
            let impl_name = (!map.impl_name.is_empty()).then_some(map.impl_name.as_str());
            let def = Definition {
                vendor: vendor.clone(),
                info: info.bind(impl_name, map.impl_description.as_deref()),
                oe: oe.clone(),
                deps,
                algo_map: Arc::clone(&map),
            };
            debug!(
                module = %def.info.module_name,
                processor = %def.oe.proc_family,
                dependencies = def.deps.len(),
                "bound definition"
            );
            defs.push(def);
        }

        let count = defs.len();
        for def in defs {
            self.registry.register(Arc::new(def));
        }
        Ok(count)
    }

    /// Load every combination in a definitions directory, then wire
    /// dependencies across the whole registry.
    pub fn load_config(&self, dir: &Path) -> Result<WireReport> {
        let mut locks = LockCache::default();
        let mut loaded = 0;
        for tuple in ConfigTuples::scan(dir)? {
            loaded += self.load_tuple(&tuple, &mut locks)?;
        }
        let report = resolution::wire(&self.registry)?;
        info!(
            dir = %dir.display(),
            definitions = loaded,
            wired = report.resolved,
            "loaded definitions"
        );
        Ok(report)
    }

    /// Run [`Loader::load_config`] on every non-hidden sub-directory of
    /// `basedir`.
    pub fn load_default_config(&self, basedir: &Path) -> Result<WireReport> {
        let mut report = WireReport::default();
        for dir in scan::definition_dirs(basedir)? {
            report.absorb(&self.load_config(&dir)?);
        }
        Ok(report)
    }

    fn parse<T: for<'de> serde::Deserialize<'de>>(&self, path: &Path) -> Result<T> {
        config::parse(path, self.files.read_json(path)?)
    }
}
