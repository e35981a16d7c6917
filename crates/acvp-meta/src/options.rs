//! Reconciliation options.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of server-side entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Vendor,
    Person,
    Dependency,
    Oe,
    Module,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Vendor => "vendor",
            EntityKind::Person => "person",
            EntityKind::Dependency => "dependency",
            EntityKind::Oe => "OE",
            EntityKind::Module => "module",
        })
    }
}

/// Per-kind permission flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KindSet {
    pub vendor: bool,
    pub person: bool,
    pub dependency: bool,
    pub oe: bool,
    pub module: bool,
}

impl KindSet {
    /// Every kind permitted.
    pub fn all() -> Self {
        KindSet {
            vendor: true,
            person: true,
            dependency: true,
            oe: true,
            module: true,
        }
    }

    pub fn contains(&self, kind: EntityKind) -> bool {
        match kind {
            EntityKind::Vendor => self.vendor,
            EntityKind::Person => self.person,
            EntityKind::Dependency => self.dependency,
            EntityKind::Oe => self.oe,
            EntityKind::Module => self.module,
        }
    }

    pub fn with(mut self, kind: EntityKind) -> Self {
        match kind {
            EntityKind::Vendor => self.vendor = true,
            EntityKind::Person => self.person = true,
            EntityKind::Dependency => self.dependency = true,
            EntityKind::Oe => self.oe = true,
            EntityKind::Module => self.module = true,
        }
        self
    }
}

/// What a reconciliation run may do.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileOptions {
    /// Only build the outbound representations.
    pub dry_run: bool,
    /// Kinds that may be registered when no server copy exists.
    pub register: KindSet,
    /// Kinds whose server copy may be updated when it differs.
    pub update: KindSet,
    /// Kinds whose server copy is to be deleted.
    pub delete: KindSet,
}
