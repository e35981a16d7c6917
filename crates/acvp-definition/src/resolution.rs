//! Dependency wiring across registered definitions.
//!
//! Dependency edges are collected while binding. Once a whole directory has
//! been loaded, [`wire`] points every automatically resolved edge at a
//! provider: another definition whose implementation name contains the
//! required name (case-insensitively) and which lives in exactly the same
//! environment, meaning the same original module name, version, vendor,
//! execution environment and processor.
//!
//! The first qualifying provider in registry order wins. Registry order is
//! an artifact of directory scanning, so when several providers qualify the
//! choice is not meaningful; a warning is logged for each such edge.
//! Manually resolved edges are never searched.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::definition::{Definition, Resolution};
use crate::error::{DefinitionError, Result};
use crate::registry::DefinitionRegistry;
use crate::search::SearchCriteria;

/// Summary of one wiring pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WireReport {
    /// Edges wired during this pass.
    pub resolved: usize,
    /// Edges left to external certificate references.
    pub manual: usize,
    /// Wired edges that had more than one qualifying provider.
    pub ambiguous: usize,
}

impl WireReport {
    pub fn absorb(&mut self, other: &WireReport) {
        self.resolved += other.resolved;
        self.manual += other.manual;
        self.ambiguous += other.ambiguous;
    }
}

/// Wire every unresolved automatic edge in the registry.
///
/// Fails on the first edge without a provider. Edges already wired by an
/// earlier pass are left alone.
pub fn wire(registry: &DefinitionRegistry) -> Result<WireReport> {
    let defs = registry.snapshot();
    let mut report = WireReport::default();

    for def in &defs {
        for edge in &def.deps {
            if edge.resolution == Resolution::Manual {
                report.manual += 1;
                continue;
            }
            if edge.is_resolved() {
                continue;
            }

            let candidates = providers(&defs, def, &edge.required_impl);
            let Some(provider) = candidates.first() else {
                return Err(DefinitionError::UnmatchedDependency {
                    impl_name: def.impl_name().to_string(),
                    cipher: edge.cipher.clone(),
                    required: edge.required_impl.clone(),
                    vendor: def.vendor.name.clone(),
                    execenv: def.oe.env_name.clone().unwrap_or_default(),
                    processor: def.oe.proc_name.clone(),
                });
            };
            if candidates.len() > 1 {
                warn!(
                    implementation = %def.impl_name(),
                    cipher = %edge.cipher,
                    required = %edge.required_impl,
                    candidates = candidates.len(),
                    chosen = %provider.info.module_name,
                    "multiple definitions satisfy dependency, using the first"
                );
                report.ambiguous += 1;
            }
            if edge.resolve(provider) {
                debug!(
                    module = %def.info.module_name,
                    cipher = %edge.cipher,
                    provider = %provider.info.module_name,
                    "wired dependency"
                );
                report.resolved += 1;
            }
        }
    }
    Ok(report)
}

/// Definitions other than `def` that can provide `required`.
fn providers<'a>(
    defs: &'a [Arc<Definition>],
    def: &Arc<Definition>,
    required: &str,
) -> Vec<&'a Arc<Definition>> {
    let criteria = SearchCriteria::environment_of(def);
    let required = required.to_lowercase();
    defs.iter()
        .filter(|c| !Arc::ptr_eq(c, def))
        .filter(|c| c.impl_name().to_lowercase().contains(&required))
        .filter(|c| criteria.matches(c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::DependencyEdge;
    use crate::registry::tests::sample;
    use tracing_test::traced_test;

    fn with_dep(mut def: Definition, cipher: &str, required: &str, r: Resolution) -> Definition {
        def.deps.push(DependencyEdge::new(cipher, required, r));
        def
    }

    #[test]
    fn wires_single_provider() {
        let registry = DefinitionRegistry::new();
        let dependent = Arc::new(with_dep(
            sample("OpenSSL", "AESNI", "Acme"),
            "SHA",
            "c",
            Resolution::Automatic,
        ));
        let provider = Arc::new(sample("OpenSSL", "C", "Acme"));
        registry.register(Arc::clone(&dependent));
        registry.register(Arc::clone(&provider));

        let report = wire(&registry).unwrap();
        assert_eq!(report.resolved, 1);
        let target = dependent.deps[0].target().unwrap();
        assert!(Arc::ptr_eq(&target, &provider));
    }

    #[test]
    fn self_is_never_a_provider() {
        let registry = DefinitionRegistry::new();
        registry.register(Arc::new(with_dep(
            sample("OpenSSL", "C", "Acme"),
            "DRBG",
            "C",
            Resolution::Automatic,
        )));
        let err = wire(&registry).unwrap_err();
        assert!(matches!(err, DefinitionError::UnmatchedDependency { .. }));
    }

    #[test]
    fn environment_must_match_exactly() {
        let registry = DefinitionRegistry::new();
        registry.register(Arc::new(with_dep(
            sample("OpenSSL", "AESNI", "Acme"),
            "SHA",
            "C",
            Resolution::Automatic,
        )));
        registry.register(Arc::new(sample("OpenSSL", "C", "Other Vendor")));

        let err = wire(&registry).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("AESNI"));
        assert!(msg.contains("SHA"));
        assert!(msg.contains("Acme"));
    }

    #[test]
    fn manual_edges_left_unresolved() {
        let registry = DefinitionRegistry::new();
        let def = Arc::new(with_dep(
            sample("OpenSSL", "C", "Acme"),
            "SHA",
            "cert-1234",
            Resolution::Manual,
        ));
        registry.register(Arc::clone(&def));

        let report = wire(&registry).unwrap();
        assert_eq!(report.manual, 1);
        assert!(!def.deps[0].is_resolved());
    }

    #[traced_test]
    #[test]
    fn multiple_candidates_warn_and_take_first() {
        let registry = DefinitionRegistry::new();
        let dependent = Arc::new(with_dep(
            sample("OpenSSL", "AESNI", "Acme"),
            "DRBG",
            "C",
            Resolution::Automatic,
        ));
        let first = Arc::new(sample("OpenSSL", "C", "Acme"));
        registry.register(Arc::clone(&dependent));
        registry.register(Arc::clone(&first));
        registry.register(Arc::new(sample("OpenSSL", "C_ASM", "Acme")));

        let report = wire(&registry).unwrap();
        assert_eq!(report.ambiguous, 1);
        assert!(Arc::ptr_eq(&dependent.deps[0].target().unwrap(), &first));
        assert!(logs_contain("multiple definitions satisfy dependency"));
    }

    #[test]
    fn second_pass_keeps_existing_wiring() {
        let registry = DefinitionRegistry::new();
        registry.register(Arc::new(with_dep(
            sample("OpenSSL", "AESNI", "Acme"),
            "SHA",
            "C",
            Resolution::Automatic,
        )));
        registry.register(Arc::new(sample("OpenSSL", "C", "Acme")));

        assert_eq!(wire(&registry).unwrap().resolved, 1);
        assert_eq!(wire(&registry).unwrap().resolved, 0);
    }
}
