//! The definition registry.
//!
//! Holds every instantiated [`Definition`] in insertion order. Mutation takes
//! the write side of a reader/writer lock, lookup and enumeration the read
//! side.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{error, warn};

use crate::definition::Definition;
use crate::error::{DefinitionError, Result};
use crate::search::SearchCriteria;

/// Ordered collection of registered definitions.
#[derive(Debug, Default)]
pub struct DefinitionRegistry {
    defs: RwLock<Vec<Arc<Definition>>>,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a definition. Registering the same instance twice is logged
    /// and ignored.
    pub fn register(&self, def: Arc<Definition>) {
        let mut defs = self.defs.write();
        if defs.iter().any(|d| Arc::ptr_eq(d, &def)) {
            error!(
                module = %def.info.module_name,
                "definition already registered, ignoring"
            );
            return;
        }
        defs.push(def);
    }

    /// First definition after `cursor` (or from the start) matching
    /// `criteria`.
    ///
    /// Pass the previous result back as `cursor` to continue an
    /// enumeration. If `cursor` is no longer registered the call fails with
    /// [`DefinitionError::StaleCursor`] instead of restarting. Enumeration is
    /// not consistent across concurrent registration.
    pub fn find(
        &self,
        criteria: &SearchCriteria,
        cursor: Option<&Arc<Definition>>,
    ) -> Result<Option<Arc<Definition>>> {
        let defs = self.defs.read();
        let start = match cursor {
            None => 0,
            Some(cursor) => match defs.iter().position(|d| Arc::ptr_eq(d, cursor)) {
                Some(pos) => pos + 1,
                None => {
                    warn!(
                        module = %cursor.info.module_name,
                        "search cursor not found in registry"
                    );
                    return Err(DefinitionError::StaleCursor);
                }
            },
        };
        Ok(defs[start..]
            .iter()
            .find(|d| criteria.matches(d))
            .cloned())
    }

    /// Lazy enumeration of all definitions matching `criteria`.
    ///
    /// Each call starts from the beginning. If the last yielded definition
    /// is removed from the registry mid-enumeration, the iterator yields one
    /// [`DefinitionError::StaleCursor`] and then ends.
    pub fn list<'a>(&'a self, criteria: &'a SearchCriteria) -> Matches<'a> {
        Matches {
            registry: self,
            criteria,
            cursor: None,
            done: false,
        }
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> Vec<Arc<Definition>> {
        self.defs.read().clone()
    }

    /// Drop every definition and empty the registry.
    pub fn release_all(&self) {
        self.defs.write().clear();
    }

    pub fn len(&self) -> usize {
        self.defs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.read().is_empty()
    }
}

/// Iterator returned by [`DefinitionRegistry::list`].
pub struct Matches<'a> {
    registry: &'a DefinitionRegistry,
    criteria: &'a SearchCriteria,
    cursor: Option<Arc<Definition>>,
    done: bool,
}

impl Iterator for Matches<'_> {
    type Item = Result<Arc<Definition>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.registry.find(self.criteria, self.cursor.as_ref()) {
            Ok(Some(def)) => {
                self.cursor = Some(Arc::clone(&def));
                Some(Ok(def))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
