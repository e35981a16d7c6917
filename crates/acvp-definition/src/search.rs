//! Search criteria for registry lookup and dependency environment matching.

use serde_json::Value;

use crate::definition::Definition;

/// One field filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Criterion {
    pub pattern: String,
    /// Case-insensitive substring instead of exact equality.
    pub fuzzy: bool,
}

impl Criterion {
    pub fn exact(pattern: impl Into<String>) -> Self {
        Criterion {
            pattern: pattern.into(),
            fuzzy: false,
        }
    }

    pub fn fuzzy(pattern: impl Into<String>) -> Self {
        Criterion {
            pattern: pattern.into(),
            fuzzy: true,
        }
    }
}

/// Projection of a definition's identifying fields.
///
/// A field left at `None` matches every definition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCriteria {
    pub module_name: Option<Criterion>,
    pub orig_module_name: Option<Criterion>,
    pub module_version: Option<Criterion>,
    pub vendor_name: Option<Criterion>,
    pub execenv: Option<Criterion>,
    pub processor: Option<Criterion>,
}

/// Match one value against an optional filter.
///
/// No filter always matches; a filter never matches a missing value.
pub fn find_match(criterion: Option<&Criterion>, value: Option<&str>) -> bool {
    let Some(criterion) = criterion else {
        return true;
    };
    let Some(value) = value else {
        return false;
    };
    if criterion.fuzzy {
        value
            .to_lowercase()
            .contains(&criterion.pattern.to_lowercase())
    } else {
        value == criterion.pattern
    }
}

impl SearchCriteria {
    /// Criteria that match everything.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn module_name(mut self, c: Criterion) -> Self {
        self.module_name = Some(c);
        self
    }

    pub fn orig_module_name(mut self, c: Criterion) -> Self {
        self.orig_module_name = Some(c);
        self
    }

    pub fn module_version(mut self, c: Criterion) -> Self {
        self.module_version = Some(c);
        self
    }

    pub fn vendor_name(mut self, c: Criterion) -> Self {
        self.vendor_name = Some(c);
        self
    }

    pub fn execenv(mut self, c: Criterion) -> Self {
        self.execenv = Some(c);
        self
    }

    pub fn processor(mut self, c: Criterion) -> Self {
        self.processor = Some(c);
        self
    }

    /// Exact criteria for the environment a dependency must live in: same
    /// original module name, version, vendor, execution environment and
    /// processor as `def`. A definition without an execution environment
    /// leaves that field unconstrained.
    pub fn environment_of(def: &Definition) -> Self {
        SearchCriteria {
            module_name: None,
            orig_module_name: Some(Criterion::exact(&def.info.orig_module_name)),
            module_version: Some(Criterion::exact(&def.info.module_version)),
            vendor_name: Some(Criterion::exact(&def.vendor.name)),
            execenv: def.oe.env_name.as_deref().map(Criterion::exact),
            processor: Some(Criterion::exact(&def.oe.proc_name)),
        }
    }

    /// Exact criteria built from a search record as produced by
    /// [`Definition::search_reference`].
    pub fn from_reference(reference: &Value) -> Self {
        let field = |key: &str| {
            reference
                .get(key)
                .and_then(Value::as_str)
                .map(Criterion::exact)
        };
        SearchCriteria {
            module_name: field("moduleName"),
            orig_module_name: field("origModuleName"),
            module_version: field("moduleVersion"),
            vendor_name: field("vendorName"),
            execenv: field("execenv"),
            processor: field("processor"),
        }
    }

    /// Whether `def` satisfies every filter.
    pub fn matches(&self, def: &Definition) -> bool {
        find_match(self.module_name.as_ref(), Some(&def.info.module_name))
            && find_match(
                self.orig_module_name.as_ref(),
                Some(&def.info.orig_module_name),
            )
            && find_match(
                self.module_version.as_ref(),
                Some(&def.info.module_version),
            )
            && find_match(self.vendor_name.as_ref(), Some(&def.vendor.name))
            && find_match(self.execenv.as_ref(), def.oe.env_name.as_deref())
            && find_match(self.processor.as_ref(), Some(&def.oe.proc_name))
    }
}

impl Definition {
    /// Whether this definition is the one a search record describes.
    pub fn matches_reference(&self, reference: &Value) -> bool {
        SearchCriteria::from_reference(reference).matches(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_filter_matches_anything() {
        assert!(find_match(None, Some("OpenSSL")));
        assert!(find_match(None, None));
    }

    #[test]
    fn filter_rejects_missing_value() {
        assert!(!find_match(Some(&Criterion::exact("Linux")), None));
        assert!(!find_match(Some(&Criterion::fuzzy("Linux")), None));
    }

    #[test]
    fn fuzzy_is_case_insensitive_substring() {
        let c = Criterion::fuzzy("openssl");
        assert!(find_match(Some(&c), Some("My OpenSSL Module")));
        assert!(!find_match(Some(&c), Some("BoringSSL")));
    }

    #[test]
    fn exact_requires_equality() {
        let c = Criterion::exact("OpenSSL");
        assert!(find_match(Some(&c), Some("OpenSSL")));
        assert!(!find_match(Some(&c), Some("openssl")));
        assert!(!find_match(Some(&c), Some("OpenSSL 3")));
    }

    #[test]
    fn builder_sets_fields() {
        let c = SearchCriteria::any()
            .vendor_name(Criterion::fuzzy("acme"))
            .processor(Criterion::exact("Xeon"));
        assert_eq!(c.vendor_name, Some(Criterion::fuzzy("acme")));
        assert_eq!(c.processor, Some(Criterion::exact("Xeon")));
        assert!(c.module_name.is_none());
    }

    #[test]
    fn reference_without_execenv_leaves_it_open() {
        let c = SearchCriteria::from_reference(&serde_json::json!({
            "moduleName": "M (impl)",
            "vendorName": "Acme",
        }));
        assert_eq!(c.module_name, Some(Criterion::exact("M (impl)")));
        assert!(c.execenv.is_none());
    }
}
