//! The needed-module set.
//!
//! Records every module identity known to be required. The set only grows:
//! once a module is needed it is built eagerly on every later pass. Over-
//! approximating is safe, forgetting a module is not, so there is no removal.
//!
//! Inserts are commutative and idempotent, which lets concurrent requests
//! share one set without any locking beyond the map's own sharding.

use std::fmt;
use std::sync::Arc;

use dashmap::DashSet;
use rustc_hash::FxBuildHasher;

use crate::ids::ModuleId;

/// Shared, grow-only set of needed module identities.
///
/// Cloning is cheap and yields a handle to the same set.
#[derive(Clone, Default)]
pub struct NeededModules(Arc<DashSet<ModuleId, FxBuildHasher>>);

impl NeededModules {
    pub fn new() -> Self {
        NeededModules::default()
    }

    /// Mark `id` as needed. Returns `true` if it was not needed before.
    pub fn mark(&self, id: &ModuleId) -> bool {
        if self.0.contains(id) {
            return false;
        }
        self.0.insert(id.clone())
    }

    /// Mark every identity in `ids`, returning how many were newly inserted.
    pub fn mark_all<'a>(&self, ids: impl IntoIterator<Item = &'a ModuleId>) -> usize {
        ids.into_iter().filter(|id| self.mark(id)).count()
    }

    pub fn is_needed(&self, id: &ModuleId) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All needed identities, sorted.
    pub fn to_sorted_vec(&self) -> Vec<ModuleId> {
        let mut ids: Vec<ModuleId> = self.0.iter().map(|id| id.key().clone()).collect();
        ids.sort();
        ids
    }
}

impl fmt::Debug for NeededModules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.to_sorted_vec()).finish()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test assertions use unwrap/expect for clarity"
)]
