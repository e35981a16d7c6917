//! `acvp.toml` configuration.

use std::path::{Path, PathBuf};

use acvp_meta::{KindSet, ReconcileOptions};
use anyhow::{Context, Result};
use serde::Deserialize;

pub const CONFIG_FILE: &str = "acvp.toml";

/// The top-level configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AcvpConfig {
    pub server: ServerConfig,
    pub definitions: DefinitionsConfig,
    /// Entity kinds that may be registered when not found on the server.
    /// Every kind when the table is absent.
    pub register: KindSet,
    /// Entity kinds whose server copy may be updated on mismatch.
    pub update: KindSet,
    /// Entity kinds to delete from the server.
    pub delete: KindSet,
}

impl Default for AcvpConfig {
    fn default() -> Self {
        AcvpConfig {
            server: ServerConfig::default(),
            definitions: DefinitionsConfig::default(),
            register: KindSet::all(),
            update: KindSet::default(),
            delete: KindSet::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Use the production namespace for stored IDs.
    pub production: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DefinitionsConfig {
    /// Base directory holding one sub-directory per definition set.
    pub directory: Option<PathBuf>,
    /// JSON file with the algorithm map table.
    pub maps: Option<PathBuf>,
}

impl AcvpConfig {
    /// Search upward from `start_dir` for an `acvp.toml` file, parse and
    /// return it along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                return Ok(Some((Self::load(&candidate)?, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Parse the file at `path`. Relative paths inside it are resolved
    /// against its directory.
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let config: AcvpConfig =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(config.relative_to(base))
    }

    fn relative_to(mut self, base: &Path) -> Self {
        let resolve = |p: Option<PathBuf>| p.map(|p| if p.is_relative() { base.join(p) } else { p });
        self.definitions.directory = resolve(self.definitions.directory.take());
        self.definitions.maps = resolve(self.definitions.maps.take());
        self
    }

    pub fn reconcile_options(&self, dry_run: bool) -> ReconcileOptions {
        ReconcileOptions {
            dry_run,
            register: self.register,
            update: self.update,
            delete: self.delete,
        }
    }

    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing acvp.toml")
    }
}
