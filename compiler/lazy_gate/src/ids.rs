//! Identities shared between the gate and the build pipeline.
//!
//! Module identities must be stable across passes: a module rebuilt in a
//! later pass has to map to the same [`ModuleId`] so that its needed-status
//! carries over. Build units and passes get small copyable ids.

use std::fmt;
use std::sync::Arc;

/// Stable key for a unit of source within a compilation.
///
/// Most modules are keyed by their resource path. Modules without a backing
/// file (virtual or concatenated modules) use a synthetic name instead.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModuleId {
    /// Module backed by a resource on disk.
    Resource(Arc<str>),
    /// Module with no resource path, keyed by a pipeline-chosen name.
    Synthetic(Arc<str>),
}

impl ModuleId {
    /// Identity for a module backed by `path`.
    pub fn resource(path: impl Into<Arc<str>>) -> Self {
        ModuleId::Resource(path.into())
    }

    /// Identity for a module without a resource path.
    pub fn synthetic(name: impl Into<Arc<str>>) -> Self {
        ModuleId::Synthetic(name.into())
    }

    /// The resource path, if this module has one.
    pub fn resource_path(&self) -> Option<&str> {
        match self {
            ModuleId::Resource(path) => Some(path),
            ModuleId::Synthetic(_) => None,
        }
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleId::Resource(path) => f.write_str(path),
            ModuleId::Synthetic(name) => write!(f, "synthetic:{name}"),
        }
    }
}

/// Identifies one build unit (compiler) in a possibly multi-unit swarm.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct UnitId(u32);

impl UnitId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        UnitId(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit#{}", self.0)
    }
}

/// Identifies one compilation pass of one build unit.
///
/// Pass ids only need to be unique per build unit; the gate uses them to keep
/// suspensions from different passes apart.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct PassId(u64);

impl PassId {
    #[inline]
    pub const fn new(raw: u64) -> Self {
        PassId(raw)
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// The pass that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        PassId(self.0 + 1)
    }
}

impl fmt::Display for PassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pass#{}", self.0)
    }
}
