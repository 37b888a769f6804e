//! Build graph data exposed by the pipeline after each pass.
//!
//! These types are produced fresh by every compilation pass and are treated
//! as read-only by the gate. Only module identities outlive a pass, through
//! the needed-module set.

use std::borrow::Cow;
use std::sync::Arc;

use crate::ids::{ModuleId, PassId, UnitId};

/// Classification of an edge into a module.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// Static import; the consumer needs the target as soon as it loads.
    Normal,
    /// Deferred import; the consumer may load the target at runtime.
    DynamicImport,
    /// The module is an entry point of its build unit.
    Entry,
}

/// A directed edge from a consumer (or entry) to a module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleReason {
    /// The consuming module. `None` for entry edges.
    pub origin: Option<ModuleId>,
    pub kind: DependencyKind,
}

impl ModuleReason {
    pub fn normal(origin: ModuleId) -> Self {
        ModuleReason {
            origin: Some(origin),
            kind: DependencyKind::Normal,
        }
    }

    pub fn dynamic(origin: ModuleId) -> Self {
        ModuleReason {
            origin: Some(origin),
            kind: DependencyKind::DynamicImport,
        }
    }

    pub fn entry() -> Self {
        ModuleReason {
            origin: None,
            kind: DependencyKind::Entry,
        }
    }
}

/// A module as seen by the build hook, right before its build step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModuleDescriptor {
    pub id: ModuleId,
    /// Every incoming edge known at the time the build step is entered.
    pub reasons: Vec<ModuleReason>,
}

impl ModuleDescriptor {
    pub fn new(id: ModuleId, reasons: Vec<ModuleReason>) -> Self {
        ModuleDescriptor { id, reasons }
    }
}

/// An emitted grouping of modules mapped to one or more output files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub name: String,
    /// Emitted file names, relative to the unit's output directory.
    pub files: Vec<String>,
    /// Every module the compilation assigned to this chunk.
    pub modules: Vec<ModuleId>,
}

impl Chunk {
    pub fn new(name: impl Into<String>) -> Self {
        Chunk {
            name: name.into(),
            files: Vec::new(),
            modules: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.files.push(file.into());
        self
    }

    #[must_use]
    pub fn with_module(mut self, module: ModuleId) -> Self {
        self.modules.push(module);
        self
    }

    /// Whether this chunk emits `file`.
    pub fn emits(&self, file: &str) -> bool {
        self.files.iter().any(|f| f == file)
    }
}

/// The result of one build pass of one build unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompilationSnapshot {
    pub unit: UnitId,
    pub pass: PassId,
    /// The unit's configured output directory, as configured.
    pub output_path: String,
    pub chunks: Vec<Chunk>,
}

impl CompilationSnapshot {
    pub fn new(unit: UnitId, pass: PassId, output_path: impl Into<String>) -> Self {
        CompilationSnapshot {
            unit,
            pass,
            output_path: output_path.into(),
            chunks: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_chunk(mut self, chunk: Chunk) -> Self {
        self.chunks.push(chunk);
        self
    }

    /// The output directory with a guaranteed trailing separator.
    pub fn output_prefix(&self) -> Cow<'_, str> {
        if self.output_path.ends_with('/') {
            Cow::Borrowed(&self.output_path)
        } else {
            Cow::Owned(format!("{}/", self.output_path))
        }
    }

    /// Chunks that emit `file` (relative to the output directory).
    pub fn chunks_emitting<'a>(&'a self, file: &'a str) -> impl Iterator<Item = &'a Chunk> + 'a {
        self.chunks.iter().filter(move |chunk| chunk.emits(file))
    }
}

/// The compilation state currently installed in the artifact server.
///
/// `generation` changes every time a new set of snapshots is installed, so it
/// identifies "the current compilation" across the whole swarm.
#[derive(Clone, Debug, Default)]
pub struct CompilationStats {
    pub generation: u64,
    /// One snapshot per build unit, in swarm order.
    pub snapshots: Vec<Arc<CompilationSnapshot>>,
}

impl CompilationStats {
    pub fn new(generation: u64, snapshots: Vec<Arc<CompilationSnapshot>>) -> Self {
        CompilationStats {
            generation,
            snapshots,
        }
    }
}

#[cfg(test)]
mod tests;
