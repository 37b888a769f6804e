//! The recompile trigger.
//!
//! Restarts exactly one build unit of the swarm. Sibling units keep building
//! (or idling) undisturbed.

use crate::error::{GateError, GateResult};
use crate::ids::UnitId;
use crate::server::ArtifactServer;

/// Schedule a scoped incremental rebuild of `unit`.
///
/// Finds the watch process belonging to `unit`, pauses its watcher (keeping
/// it alive so no filesystem events are lost), installs the watcher's
/// modification times on the unit as the next pass's baseline, marks the
/// unit invalid and invalidates it. Does not wait for the rebuild.
#[tracing::instrument(level = "debug", skip_all, fields(%unit))]
pub fn recompile<S: ArtifactServer + ?Sized>(server: &S, unit: UnitId) -> GateResult<()> {
    let Some(watching) = server.watchings().into_iter().find(|w| w.unit() == unit) else {
        tracing::warn!("no watch process for build unit");
        return Err(GateError::MissingWatcher { unit });
    };

    let Some(times) = watching.slot().pause() else {
        tracing::warn!("watch process has no watcher to pause");
        return Err(GateError::WatcherDetached { unit });
    };
    tracing::debug!(
        files = times.files.len(),
        contexts = times.contexts.len(),
        "paused watcher"
    );

    server.mark_invalid(unit);
    watching.install_timestamps(times);
    watching.invalidate();
    tracing::debug!("rebuild scheduled");
    Ok(())
}
