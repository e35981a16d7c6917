//! Reconciliation of module definitions against an ACVP server.
//!
//! Every server-side entity kind (vendor, person, OE dependency, OE and
//! module) goes through the same workflow in [`reconcile`]: resolve
//! outstanding requests, look the entity up by ID or by search, then leave
//! it alone, register it, update it or delete it as permitted by
//! [`ReconcileOptions`]. [`Synchronizer`] runs that workflow for each
//! entity of a [`Definition`](acvp_definition::Definition) and writes the
//! resulting IDs back through the ID store.
//!
//! HTTP is kept behind the [`Transport`] trait.

pub mod client;
pub mod entity;
pub mod error;
pub mod module;
pub mod oe;
pub mod options;
pub mod paging;
pub mod person;
pub mod protocol;
pub mod reconcile;
pub mod sync;
pub mod transport;
pub mod vendor;

pub use client::{Fetched, MetaClient};
pub use entity::RemoteEntity;
pub use error::{MetaError, Result};
pub use module::ModuleEntity;
pub use oe::{DependencyEntity, DependencyKind, OeEntity};
pub use options::{EntityKind, KindSet, ReconcileOptions};
pub use person::PersonEntity;
pub use reconcile::{dry_run, reconcile, Action, Outcome, Registration};
pub use sync::{registrations, SyncReport, SyncResult, Synchronizer};
pub use transport::{Method, Response, ScriptedTransport, Transport, TransportError};
pub use vendor::VendorEntity;
