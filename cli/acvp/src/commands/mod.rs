//! CLI command implementations.

pub mod dump_register;
pub mod list;
pub mod maps;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use acvp_definition::{
    DefinitionRegistry, FileAccess, Loader, MapTable, Namespace, DEFAULT_DEFINITIONS_DIR,
};
use acvp_meta::ReconcileOptions;
use anyhow::{Context, Result};
use tracing::debug;

use crate::config::AcvpConfig;

/// Where definitions and maps come from, after command-line overrides.
#[derive(Debug, Clone)]
pub struct Sources {
    pub definitions: PathBuf,
    pub maps: Option<PathBuf>,
    pub namespace: Namespace,
    /// Permissions from the configuration. Commands here never contact the
    /// server, so these are always dry-run options.
    pub options: ReconcileOptions,
}

impl Sources {
    pub fn new(
        config: &AcvpConfig,
        cwd: &Path,
        definitions: Option<PathBuf>,
        production: bool,
    ) -> Self {
        Sources {
            definitions: definitions
                .or_else(|| config.definitions.directory.clone())
                .unwrap_or_else(|| cwd.join(DEFAULT_DEFINITIONS_DIR)),
            maps: config.definitions.maps.clone(),
            namespace: Namespace::from_production(production || config.server.production),
            options: config.reconcile_options(true),
        }
    }

    pub fn map_table(&self) -> Result<MapTable> {
        match &self.maps {
            Some(path) => MapTable::from_json_file(path)
                .with_context(|| format!("loading algorithm maps from {}", path.display())),
            None => Ok(MapTable::new()),
        }
    }
}

/// Definitions loaded from [`Sources`].
pub struct Session {
    pub registry: Arc<DefinitionRegistry>,
    pub files: Arc<FileAccess>,
    pub namespace: Namespace,
    pub options: ReconcileOptions,
}

impl Session {
    pub fn load(sources: &Sources) -> Result<Self> {
        let maps = Arc::new(sources.map_table()?);
        let registry = Arc::new(DefinitionRegistry::new());
        let files = Arc::new(FileAccess::new());
        let loader = Loader::new(maps, Arc::clone(&registry), Arc::clone(&files));
        let report = loader
            .load_default_config(&sources.definitions)
            .with_context(|| format!("loading definitions from {}", sources.definitions.display()))?;
        debug!(
            definitions = registry.len(),
            resolved = report.resolved,
            manual = report.manual,
            "definitions loaded"
        );
        Ok(Session {
            registry,
            files,
            namespace: sources.namespace,
            options: sources.options.clone(),
        })
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.registry.release_all();
    }
}
