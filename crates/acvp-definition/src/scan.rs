//! Discovery of config file combinations in a definitions directory.
//!
//! A definitions directory looks like:
//! ```text
//! <dir>/
//!   vendor/*.json
//!   module_info/*.json
//!   oe/*.json
//!   implementations/*.json
//! ```
//! Every combination of one file from each sub-directory is a candidate.

use std::path::{Path, PathBuf};

use crate::error::{DefinitionError, Result};

pub const VENDOR_DIR: &str = "vendor";
pub const INFO_DIR: &str = "module_info";
pub const OE_DIR: &str = "oe";
pub const IMPL_DIR: &str = "implementations";

/// One candidate combination of config files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigTuple {
    pub vendor: PathBuf,
    pub info: PathBuf,
    pub oe: PathBuf,
    pub implementation: PathBuf,
}

/// Cross product of the four file sets, vendor varying slowest and
/// implementation fastest.
#[derive(Debug, Clone)]
pub struct ConfigTuples {
    vendors: Vec<PathBuf>,
    infos: Vec<PathBuf>,
    oes: Vec<PathBuf>,
    impls: Vec<PathBuf>,
    next: usize,
}

impl ConfigTuples {
    pub fn new(
        vendors: Vec<PathBuf>,
        infos: Vec<PathBuf>,
        oes: Vec<PathBuf>,
        impls: Vec<PathBuf>,
    ) -> Self {
        ConfigTuples {
            vendors,
            infos,
            oes,
            impls,
            next: 0,
        }
    }

    /// Scan a definitions directory.
    pub fn scan(dir: &Path) -> Result<Self> {
        Ok(ConfigTuples::new(
            json_files(&dir.join(VENDOR_DIR))?,
            json_files(&dir.join(INFO_DIR))?,
            json_files(&dir.join(OE_DIR))?,
            json_files(&dir.join(IMPL_DIR))?,
        ))
    }

    fn total(&self) -> usize {
        self.vendors.len() * self.infos.len() * self.oes.len() * self.impls.len()
    }
}

impl Iterator for ConfigTuples {
    type Item = ConfigTuple;

    fn next(&mut self) -> Option<ConfigTuple> {
        if self.next >= self.total() {
            return None;
        }
        let mut n = self.next;
        self.next += 1;

        let i = n % self.impls.len();
        n /= self.impls.len();
        let o = n % self.oes.len();
        n /= self.oes.len();
        let m = n % self.infos.len();
        n /= self.infos.len();

        Some(ConfigTuple {
            vendor: self.vendors[n].clone(),
            info: self.infos[m].clone(),
            oe: self.oes[o].clone(),
            implementation: self.impls[i].clone(),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.total().saturating_sub(self.next);
        (left, Some(left))
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

/// Sorted, non-hidden `*.json` files in `dir`.
pub fn json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(DefinitionError::MissingDirectory {
            path: dir.to_path_buf(),
        });
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file()
            && !is_hidden(&path)
            && path.extension().is_some_and(|ext| ext == "json")
        {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Sorted, non-hidden sub-directories of a definitions root.
pub fn definition_dirs(basedir: &Path) -> Result<Vec<PathBuf>> {
    if !basedir.is_dir() {
        return Err(DefinitionError::MissingDirectory {
            path: basedir.to_path_buf(),
        });
    }
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(basedir)? {
        let path = entry?.path();
        if path.is_dir() && !is_hidden(&path) {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}
