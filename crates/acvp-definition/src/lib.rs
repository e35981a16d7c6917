//! Module definition engine for the ACVP proxy.
//!
//! Loads vendor, module information, operational environment and
//! implementation config files, binds them to algorithm capability maps and
//! keeps the resulting definitions in a registry. Dependencies between
//! definitions are wired once a directory has been loaded.
//!
//! # Architecture
//!
//! - **Locks**: records read from the same config file share one
//!   reference-counted lock ([`lock`])
//! - **ID store**: idempotent merge of server-assigned IDs back into those
//!   files ([`id_store`])
//! - **Registry**: insertion-ordered definitions with criteria search
//!   ([`registry`], [`search`])
//! - **Loader**: config discovery and binding ([`scan`], [`loader`]),
//!   followed by dependency wiring ([`resolution`])

pub mod algo_map;
pub mod config;
pub mod definition;
pub mod error;
pub mod files;
pub mod id;
pub mod id_store;
pub mod loader;
pub mod lock;
pub mod namespace;
pub mod registry;
pub mod resolution;
pub mod scan;
pub mod search;
pub mod table;

// Re-exports for convenience.
pub use algo_map::{AlgoMap, MapTable};
pub use definition::{
    Address, DependencyEdge, Definition, Info, ModuleType, Oe, Resolution, Vendor,
};
pub use error::{DefinitionError, Result};
pub use files::FileAccess;
pub use id_store::{Checkout, IdRecord, IdStore, ModuleIdEntry, OeIds, VendorIds};
pub use loader::{Loader, LockCache, DEFAULT_DEFINITIONS_DIR};
pub use lock::{DefLock, LockRef, WeakLock};
pub use namespace::Namespace;
pub use registry::DefinitionRegistry;
pub use resolution::{wire, WireReport};
pub use scan::{ConfigTuple, ConfigTuples};
pub use search::{Criterion, SearchCriteria};
pub use table::format_definitions;
