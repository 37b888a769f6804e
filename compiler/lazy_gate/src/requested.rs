//! The requested-artifact set.
//!
//! Remembers which artifact paths already had a rebuild scheduled for them.
//! Such a path is forwarded without being inspected again. A path that
//! matched no chunk, or whose rebuild could not be scheduled, is not
//! recorded and gets inspected again on its next request.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rustc_hash::FxBuildHasher;

/// Shared map from artifact path to the stats generation its rebuild was
/// scheduled from.
#[derive(Clone, Debug, Default)]
pub struct RequestedArtifacts(Arc<DashMap<String, u64, FxBuildHasher>>);

impl RequestedArtifacts {
    pub fn new() -> Self {
        RequestedArtifacts::default()
    }

    /// Record that a rebuild for `artifact` was scheduled at `generation`.
    ///
    /// Returns `false` if it was already recorded. The first generation is
    /// kept.
    pub fn record(&self, artifact: &str, generation: u64) -> bool {
        match self.0.entry(artifact.to_owned()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(generation);
                true
            }
        }
    }

    pub fn contains(&self, artifact: &str) -> bool {
        self.0.contains_key(artifact)
    }

    /// Generation the rebuild for `artifact` was scheduled from.
    pub fn recorded_at(&self, artifact: &str) -> Option<u64> {
        self.0.get(artifact).map(|generation| *generation)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
