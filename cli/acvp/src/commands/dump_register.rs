//! `acvp dump-register`: registration requests that would be sent for
//! each matching definition, as JSON. Only kinds permitted by the
//! `[register]` table are included. Nothing is sent.

use acvp_definition::{IdStore, SearchCriteria};
use acvp_meta::registrations;
use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::Value;

use super::{Session, Sources};

#[derive(Serialize)]
struct Dump {
    module: String,
    processor: String,
    registrations: Vec<acvp_meta::Registration>,
}

pub fn run(sources: &Sources, criteria: &SearchCriteria) -> Result<()> {
    let session = Session::load(sources)?;
    let dump = collect(&session, criteria)?;
    println!("{}", serde_json::to_string_pretty(&dump)?);
    Ok(())
}

pub fn collect(session: &Session, criteria: &SearchCriteria) -> Result<Value> {
    let store = IdStore::new(session.files.clone());
    let mut out = Vec::new();
    for def in session.registry.list(criteria) {
        let def = def?;
        let mut regs = registrations(&store, &def, session.namespace)
            .with_context(|| format!("building registrations for {}", def.info.module_name))?;
        regs.retain(|r| session.options.register.contains(r.kind));
        out.push(Dump {
            module: def.info.module_name.clone(),
            processor: def.oe.proc_name.clone(),
            registrations: regs,
        });
    }
    if out.is_empty() {
        bail!("no definition matches the given filters");
    }
    Ok(serde_json::to_value(out)?)
}
