//! `acvp maps`: the algorithm map table.

use anyhow::{bail, Result};

use super::Sources;

pub fn run(sources: &Sources) -> Result<()> {
    if sources.maps.is_none() {
        bail!("no algorithm map table configured (set [definitions] maps in acvp.toml)");
    }
    let table = sources.map_table()?;
    print!("{}", table.format_table());
    println!();
    println!("{} maps", table.len());
    Ok(())
}
