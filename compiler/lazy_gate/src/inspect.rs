//! The chunk inspector.
//!
//! Given an artifact path and the installed compilation snapshots, finds the
//! chunks that emit the artifact and marks every module they contain as
//! needed.

use std::sync::Arc;

use crate::graph::CompilationSnapshot;
use crate::ids::UnitId;
use crate::needed::NeededModules;

/// Outcome of inspecting one artifact against one snapshot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Inspection {
    /// The build unit owning the matched snapshot.
    pub unit: UnitId,
    /// Number of chunks emitting the artifact.
    pub chunks: usize,
    /// Module identities that were not needed before this inspection.
    pub newly_needed: usize,
}

#[derive(Clone, Debug)]
pub struct ChunkInspector {
    needed: NeededModules,
}

impl ChunkInspector {
    pub fn new(needed: NeededModules) -> Self {
        ChunkInspector { needed }
    }

    /// Inspect `artifact` against `snapshots` in swarm order.
    ///
    /// The first snapshot whose output directory contains the artifact and
    /// which has a chunk emitting it is the one acted on. Returns `None` when
    /// no snapshot owns the artifact.
    #[tracing::instrument(level = "debug", skip_all, fields(artifact = %artifact))]
    pub fn inspect(
        &self,
        artifact: &str,
        snapshots: &[Arc<CompilationSnapshot>],
    ) -> Option<Inspection> {
        let inspection = snapshots
            .iter()
            .find_map(|snapshot| self.inspect_snapshot(artifact, snapshot));
        if inspection.is_none() {
            tracing::debug!("no chunk emits artifact");
        }
        inspection
    }

    fn inspect_snapshot(
        &self,
        artifact: &str,
        snapshot: &CompilationSnapshot,
    ) -> Option<Inspection> {
        let prefix = snapshot.output_prefix();
        let file = artifact.strip_prefix(prefix.as_ref())?;

        let mut chunks = 0;
        let mut newly_needed = 0;
        for chunk in snapshot.chunks_emitting(file) {
            chunks += 1;
            newly_needed += self.needed.mark_all(&chunk.modules);
        }
        if chunks == 0 {
            return None;
        }

        tracing::debug!(
            unit = %snapshot.unit,
            chunks,
            newly_needed,
            "artifact owned by compilation"
        );
        Some(Inspection {
            unit: snapshot.unit,
            chunks,
            newly_needed,
        })
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
