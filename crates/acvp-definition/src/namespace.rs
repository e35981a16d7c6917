//! Production / sandbox key namespacing.

use serde::{Deserialize, Serialize};

/// Which identifier space an ID belongs to.
///
/// Every logical ID key in a config file has two physical spellings: the
/// bare name for the sandbox server and the name suffixed with `Production`
/// for the production server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// Pre-release test server.
    #[default]
    Sandbox,
    /// Production server.
    Production,
}

impl Namespace {
    /// Select the namespace from a production flag.
    pub fn from_production(production: bool) -> Self {
        if production {
            Namespace::Production
        } else {
            Namespace::Sandbox
        }
    }

    /// The physical key for a logical key name.
    pub fn key(&self, base: &str) -> String {
        match self {
            Namespace::Sandbox => base.to_string(),
            Namespace::Production => format!("{base}Production"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_spellings() {
        assert_eq!(Namespace::Sandbox.key("acvpVendorId"), "acvpVendorId");
        assert_eq!(
            Namespace::Production.key("acvpVendorId"),
            "acvpVendorIdProduction"
        );
    }

    #[test]
    fn from_flag() {
        assert_eq!(Namespace::from_production(true), Namespace::Production);
        assert_eq!(Namespace::from_production(false), Namespace::Sandbox);
        assert_eq!(Namespace::default(), Namespace::Sandbox);
    }
}
