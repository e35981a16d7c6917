//! Tabular listing of registered definitions.
//!
//! ```text
//! Vendor Name | OE    | Proc | Module Name | Version | vsIDs
//! ----------------------------------------------------------
//! Acme        | Linux | Xeon | OpenSSL (C) | 1.0     | 2
//! ----------------------------------------------------------
//! Expected vsIDs: 2
//! ```

use crate::error::{DefinitionError, Result};
use crate::registry::DefinitionRegistry;
use crate::search::SearchCriteria;

const HEADER: [&str; 6] = ["Vendor Name", "OE", "Proc", "Module Name", "Version", "vsIDs"];

/// Render every definition matching `criteria`.
///
/// Fails with [`DefinitionError::NoDefinition`] if nothing matches, and
/// with [`DefinitionError::StaleCursor`] if the registry changed while
/// rendering.
pub fn format_definitions(
    registry: &DefinitionRegistry,
    criteria: &SearchCriteria,
) -> Result<String> {
    let mut rows = Vec::new();
    let mut total = 0;
    for def in registry.list(criteria) {
        let def = def?;
        total += def.num_algos();
        rows.push([
            def.vendor.name.clone(),
            def.oe.env_name.clone().unwrap_or_else(|| "-".to_string()),
            def.oe.proc_name.clone(),
            def.info.module_name.clone(),
            def.info.module_version.clone(),
            def.num_algos().to_string(),
        ]);
    }
    if rows.is_empty() {
        return Err(DefinitionError::NoDefinition);
    }

    let mut widths = HEADER.map(str::len);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.len());
        }
    }
    let rule = "-".repeat(widths.iter().sum::<usize>() + 3 * (widths.len() - 1));

    let mut out = String::new();
    push_row(&mut out, &HEADER, &widths);
    out.push_str(&rule);
    out.push('\n');
    for row in &rows {
        push_row(&mut out, row, &widths);
    }
    out.push_str(&rule);
    out.push('\n');
    out.push_str(&format!("Expected vsIDs: {total}\n"));
    Ok(out)
}

fn push_row<S: AsRef<str>>(out: &mut String, cells: &[S], widths: &[usize]) {
    let last = cells.len() - 1;
    for (i, (cell, w)) in cells.iter().zip(widths).enumerate() {
        if i == last {
            out.push_str(cell.as_ref());
        } else {
            out.push_str(&format!("{:<w$} | ", cell.as_ref()));
        }
    }
    out.push('\n');
}
