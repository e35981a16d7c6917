//! `acvp list`: table of loaded definitions.

use acvp_definition::{format_definitions, SearchCriteria};
use anyhow::Result;

use super::{Session, Sources};

pub fn run(sources: &Sources, criteria: &SearchCriteria) -> Result<()> {
    let session = Session::load(sources)?;
    print!("{}", render(&session, criteria)?);
    Ok(())
}

pub fn render(session: &Session, criteria: &SearchCriteria) -> Result<String> {
    Ok(format_definitions(&session.registry, criteria)?)
}
