//! The gate: shared state plus the inspect-then-rebuild step.

use std::sync::Arc;

use crate::config::GateConfig;
use crate::error::GateResult;
use crate::hook::{BuildModuleHook, LazyBuildHook, PipelineHooks};
use crate::inspect::ChunkInspector;
use crate::needed::NeededModules;
use crate::recompile::recompile;
use crate::requested::RequestedArtifacts;
use crate::server::ArtifactServer;

struct GateInner {
    config: GateConfig,
    needed: NeededModules,
    requested: RequestedArtifacts,
    inspector: ChunkInspector,
    hook: Arc<LazyBuildHook>,
}

/// A lazy compilation gate.
///
/// Attach it to every build unit with [`attach`](Self::attach) and put
/// [`handle`](Self::handle) in front of the artifact server. Clones share the
/// same state; the needed-module and requested-artifact sets live as long as
/// any clone does.
#[derive(Clone)]
pub struct LazyGate {
    inner: Arc<GateInner>,
}

impl Default for LazyGate {
    fn default() -> Self {
        LazyGate::new()
    }
}

impl LazyGate {
    pub fn new() -> Self {
        LazyGate::with_config(GateConfig::default())
    }

    pub fn with_config(config: GateConfig) -> Self {
        let needed = NeededModules::new();
        let hook = Arc::new(LazyBuildHook::new(needed.clone(), config.policy));
        LazyGate {
            inner: Arc::new(GateInner {
                inspector: ChunkInspector::new(needed.clone()),
                requested: RequestedArtifacts::new(),
                needed,
                hook,
                config,
            }),
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.inner.config
    }

    pub fn needed(&self) -> &NeededModules {
        &self.inner.needed
    }

    pub fn requested(&self) -> &RequestedArtifacts {
        &self.inner.requested
    }

    pub fn inspector(&self) -> &ChunkInspector {
        &self.inner.inspector
    }

    /// The build hook shared by every unit this gate is attached to.
    pub fn hook(&self) -> Arc<dyn BuildModuleHook> {
        self.inner.hook.clone()
    }

    /// Register the build hook with a pipeline.
    pub fn attach<P: PipelineHooks + ?Sized>(&self, pipeline: &mut P) {
        pipeline.register_build_hook(self.hook());
    }

    /// Inspect `artifact` against the server's installed compilation and
    /// schedule a rebuild of the unit owning it.
    ///
    /// Every chunk match schedules a rebuild of its unit, since a module
    /// needed through one unit may still be suspended in another. Returns
    /// `true` iff a rebuild was scheduled. An artifact that already had a
    /// rebuild scheduled is not inspected again. On error nothing is
    /// recorded, so the next request for the artifact retries.
    pub fn inspect_artifact<S: ArtifactServer + ?Sized>(
        &self,
        server: &S,
        artifact: &str,
    ) -> GateResult<bool> {
        let Some(stats) = server.stats() else {
            tracing::trace!(artifact, "no compilation installed yet");
            return Ok(false);
        };
        if self.inner.requested.contains(artifact) {
            tracing::trace!(artifact, "rebuild already scheduled");
            return Ok(false);
        }

        let Some(inspection) = self.inner.inspector.inspect(artifact, &stats.snapshots) else {
            return Ok(false);
        };

        recompile(server, inspection.unit)?;
        self.inner.requested.record(artifact, stats.generation);
        Ok(true)
    }
}

impl std::fmt::Debug for LazyGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyGate")
            .field("config", &self.inner.config)
            .field("needed", &self.inner.needed.len())
            .field("requested", &self.inner.requested.len())
            .field("pending", &self.inner.hook.pending())
            .finish()
    }
}
