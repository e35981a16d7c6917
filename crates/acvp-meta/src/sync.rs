//! Per-definition synchronisation.
//!
//! A definition is synchronised in dependency order: vendor, person, OE
//! dependencies, OE, module. Each step checks out the IDs it needs from
//! the ID store, reconciles, and commits before the next step starts, so
//! no two entity locks are ever held at once. Deletion runs the same steps
//! in reverse.

use acvp_definition::{id, Checkout, Definition, IdRecord, IdStore, Namespace};
use tracing::{debug, info};

use crate::client::MetaClient;
use crate::error::{MetaError, Result};
use crate::module::ModuleEntity;
use crate::oe::{DependencyEntity, OeEntity};
use crate::options::{EntityKind, KindSet, ReconcileOptions};
use crate::person::PersonEntity;
use crate::reconcile::{dry_run, reconcile, Outcome, Registration};
use crate::vendor::VendorEntity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Vendor,
    Person,
    Dependencies,
    Oe,
    Module,
}

const ORDER: [Step; 5] = [
    Step::Vendor,
    Step::Person,
    Step::Dependencies,
    Step::Oe,
    Step::Module,
];

/// Outcomes of one synchronised definition, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub outcomes: Vec<Outcome>,
}

impl SyncReport {
    /// Number of outcomes that changed the server.
    pub fn changes(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.action != crate::reconcile::Action::NoOp)
            .count()
    }
}

/// Result of [`Synchronizer::run`].
#[derive(Debug, Clone, PartialEq)]
pub enum SyncResult {
    Reconciled(SyncReport),
    DryRun(Vec<Registration>),
}

/// Drives definitions through reconciliation and persists the IDs.
pub struct Synchronizer {
    client: MetaClient,
    store: IdStore,
    ns: Namespace,
    opts: ReconcileOptions,
}

impl Synchronizer {
    pub fn new(client: MetaClient, store: IdStore, ns: Namespace, opts: ReconcileOptions) -> Self {
        Synchronizer {
            client,
            store,
            ns,
            opts,
        }
    }

    /// Synchronise one definition, or describe the registrations it
    /// permits if this is a dry run.
    pub fn run(&self, def: &Definition) -> Result<SyncResult> {
        if self.opts.dry_run {
            let mut regs = registrations(&self.store, def, self.ns)?;
            regs.retain(|r| self.opts.register.contains(r.kind));
            return Ok(SyncResult::DryRun(regs));
        }

        let mut steps = ORDER.to_vec();
        if self.opts.delete != KindSet::default() {
            steps.reverse();
        }

        let mut report = SyncReport::default();
        for step in steps {
            debug!(module = %def.info.module_name, ?step, "sync step");
            match step {
                Step::Vendor => self.sync_vendor(def, &mut report)?,
                Step::Person => self.sync_person(def, &mut report)?,
                Step::Dependencies => self.sync_dependencies(def, &mut report)?,
                Step::Oe => self.sync_oe(def, &mut report)?,
                Step::Module => self.sync_module(def, &mut report)?,
            }
        }
        info!(
            module = %def.info.module_name,
            changes = report.changes(),
            "definition synchronised"
        );
        Ok(SyncResult::Reconciled(report))
    }

    fn sync_vendor(&self, def: &Definition, report: &mut SyncReport) -> Result<()> {
        let checkout = self.store.checkout_vendor(&def.vendor, self.ns)?;
        committed(checkout, |ids| {
            let mut entity = VendorEntity::new(&def.vendor, ids.vendor, ids.address);
            let outcome = reconcile(&self.client, &mut entity, &self.opts);
            ids.vendor = entity.id;
            ids.address = entity.address_id;
            report.outcomes.push(outcome?);
            Ok(())
        })
    }

    fn sync_person(&self, def: &Definition, report: &mut SyncReport) -> Result<()> {
        let checkout = self.store.checkout_vendor(&def.vendor, self.ns)?;
        committed(checkout, |ids| {
            let vendor_id = prerequisite(ids.vendor, EntityKind::Vendor, EntityKind::Person)?;
            let mut entity = PersonEntity::new(&def.vendor, vendor_id, ids.person);
            let outcome = reconcile(&self.client, &mut entity, &self.opts);
            ids.person = entity.id;
            report.outcomes.push(outcome?);
            Ok(())
        })
    }

    fn sync_dependencies(&self, def: &Definition, report: &mut SyncReport) -> Result<()> {
        let checkout = self.store.checkout_oe(&def.oe, self.ns)?;
        committed(checkout, |ids| {
            let mut processor = DependencyEntity::processor(&def.oe, ids.dep_proc);
            let outcome = reconcile(&self.client, &mut processor, &self.opts);
            ids.dep_proc = processor.id;
            report.outcomes.push(outcome?);

            if let Some(mut software) = DependencyEntity::software(&def.oe, ids.dep_sw) {
                let outcome = reconcile(&self.client, &mut software, &self.opts);
                ids.dep_sw = software.id;
                report.outcomes.push(outcome?);
            }
            Ok(())
        })
    }

    fn sync_oe(&self, def: &Definition, report: &mut SyncReport) -> Result<()> {
        let checkout = self.store.checkout_oe(&def.oe, self.ns)?;
        committed(checkout, |ids| {
            let mut deps = vec![prerequisite(
                ids.dep_proc,
                EntityKind::Dependency,
                EntityKind::Oe,
            )?];
            if def.oe.env_name.is_some() {
                deps.push(prerequisite(ids.dep_sw, EntityKind::Dependency, EntityKind::Oe)?);
            }
            let mut entity = OeEntity::new(&def.oe, &deps, ids.oe);
            let outcome = reconcile(&self.client, &mut entity, &self.opts);
            ids.oe = entity.id;
            report.outcomes.push(outcome?);
            Ok(())
        })
    }

    fn sync_module(&self, def: &Definition, report: &mut SyncReport) -> Result<()> {
        // Copied out so the vendor lock is released before the module lock
        // is taken.
        let vendor = self.store.checkout_vendor(&def.vendor, self.ns)?.ids;
        let vendor_id = prerequisite(vendor.vendor, EntityKind::Vendor, EntityKind::Module)?;
        let address_id = prerequisite(vendor.address, EntityKind::Vendor, EntityKind::Module)?;
        let person_id = prerequisite(vendor.person, EntityKind::Person, EntityKind::Module)?;

        let checkout = self.store.checkout_module(&def.info, self.ns)?;
        committed(checkout, |ids| {
            let mut entity =
                ModuleEntity::new(&def.info, vendor_id, address_id, person_id, ids.id);
            let outcome = reconcile(&self.client, &mut entity, &self.opts);
            ids.id = entity.id;
            report.outcomes.push(outcome?);
            Ok(())
        })
    }
}

/// Run `step` on the checked-out IDs and commit them, whether or not the
/// step succeeded. A commit failure takes precedence.
fn committed<T: IdRecord>(
    mut checkout: Checkout<'_, T>,
    step: impl FnOnce(&mut T) -> Result<()>,
) -> Result<()> {
    let result = step(&mut checkout.ids);
    checkout.commit()?;
    result
}

fn prerequisite(value: u32, kind: EntityKind, needed_by: EntityKind) -> Result<u32> {
    if id::is_assigned(value) {
        Ok(value)
    } else if id::is_pending(value) {
        Err(MetaError::Pending {
            kind,
            request: id::numeric(value),
        })
    } else {
        Err(MetaError::MissingPrerequisite { kind, needed_by })
    }
}

/// The registration requests for every entity of `def`, using whatever IDs
/// are already stored. Nothing is sent and nothing is written.
pub fn registrations(store: &IdStore, def: &Definition, ns: Namespace) -> Result<Vec<Registration>> {
    let vendor = store.checkout_vendor(&def.vendor, ns)?.ids;
    let oe = store.checkout_oe(&def.oe, ns)?.ids;
    let module = store.checkout_module(&def.info, ns)?.ids;

    let mut out = vec![
        dry_run(&VendorEntity::new(&def.vendor, vendor.vendor, vendor.address)),
        dry_run(&PersonEntity::new(&def.vendor, vendor.vendor, vendor.person)),
        dry_run(&DependencyEntity::processor(&def.oe, oe.dep_proc)),
    ];
    let mut deps = vec![oe.dep_proc];
    if let Some(software) = DependencyEntity::software(&def.oe, oe.dep_sw) {
        out.push(dry_run(&software));
        deps.push(oe.dep_sw);
    }
    out.push(dry_run(&OeEntity::new(&def.oe, &deps, oe.oe)));
    out.push(dry_run(&ModuleEntity::new(
        &def.info,
        vendor.vendor,
        vendor.address,
        vendor.person,
        module.id,
    )));
    Ok(out)
}
