//! Development asset server over the reference pipeline's output.
//!
//! Serves emitted files from the output filesystem and holds requests while
//! any build unit is rebuilding. Stats are published once every unit has
//! finished at least one pass.

use std::sync::{Arc, Weak};

use lazy_gate::{
    ArtifactServer, CompilationSnapshot, CompilationStats, Continuation, GateError, GateResult,
    Next, Request, UnitId, Watching,
};
use parking_lot::Mutex;

use crate::app::{Response, ResponseSlot};
use crate::compiler::Compilation;
use crate::event_loop::EventLoop;
use crate::fs::{join, MemoryFs};
use crate::watching::UnitWatching;

/// Where one build unit's artifacts live.
#[derive(Debug)]
struct ServedUnit {
    watching: Arc<UnitWatching>,
    public_path: String,
    output_path: String,
}

#[derive(Default)]
struct ServerState {
    valid: bool,
    generation: u64,
    snapshots: Vec<Option<Arc<CompilationSnapshot>>>,
    stats: Option<Arc<CompilationStats>>,
    waiters: Vec<Continuation>,
}

pub struct DevServer {
    units: Vec<ServedUnit>,
    output: MemoryFs,
    event_loop: EventLoop,
    state: Mutex<ServerState>,
}

impl DevServer {
    /// Serve the units behind `watchings`, reading artifacts from `output`.
    ///
    /// Subscribes to every unit's sealed passes.
    pub fn new(
        watchings: Vec<Arc<UnitWatching>>,
        output: MemoryFs,
        event_loop: EventLoop,
    ) -> Arc<Self> {
        let units: Vec<ServedUnit> = watchings
            .into_iter()
            .map(|watching| {
                let config = watching.compiler().config();
                ServedUnit {
                    public_path: config.public_path.clone(),
                    output_path: config.output_path.clone(),
                    watching,
                }
            })
            .collect();
        let state = ServerState {
            snapshots: vec![None; units.len()],
            ..ServerState::default()
        };
        let server = Arc::new(DevServer {
            units,
            output,
            event_loop,
            state: Mutex::new(state),
        });

        for (index, unit) in server.units.iter().enumerate() {
            let weak: Weak<DevServer> = Arc::downgrade(&server);
            unit.watching.on_done(Arc::new(move |_, compilation| {
                if let Some(server) = weak.upgrade() {
                    server.compilation_done(index, compilation);
                }
            }));
        }
        server
    }

    pub fn is_valid(&self) -> bool {
        self.state.lock().valid
    }

    /// Stats generation currently published. Zero before the first build.
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    fn compilation_done(&self, index: usize, compilation: &Arc<Compilation>) {
        let waiters = {
            let mut state = self.state.lock();
            state.snapshots[index] = Some(Arc::clone(&compilation.snapshot));

            let snapshots: Option<Vec<_>> = state.snapshots.iter().cloned().collect();
            if let Some(snapshots) = snapshots {
                state.generation += 1;
                state.stats = Some(Arc::new(CompilationStats::new(state.generation, snapshots)));
                tracing::debug!(generation = state.generation, "stats published");
            }

            let building = self.units.iter().any(|unit| unit.watching.is_building());
            if building || state.stats.is_none() {
                return;
            }
            state.valid = true;
            std::mem::take(&mut state.waiters)
        };

        for waiter in waiters {
            self.event_loop.spawn(waiter);
        }
    }

    /// Strip query and fragment from a request URL.
    fn url_path(url: &str) -> &str {
        let end = url.find(['?', '#']).unwrap_or(url.len());
        &url[..end]
    }
}

/// `path` with `prefix` removed, if `prefix` ends at a segment boundary.
fn strip_public_path<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let prefix = prefix.trim_end_matches('/');
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest.trim_start_matches('/'))
    } else {
        None
    }
}

impl ArtifactServer for DevServer {
    type Response = ResponseSlot;

    fn resolve_artifact_path(&self, url: &str) -> GateResult<Option<String>> {
        if !url.starts_with('/') {
            return Err(GateError::resolve(url, "request URL is not absolute"));
        }
        let path = DevServer::url_path(url);
        let resolved = self.units.iter().find_map(|unit| {
            let rest = strip_public_path(path, &unit.public_path)?;
            if rest.is_empty() {
                return None;
            }
            Some(join(&unit.output_path, rest))
        });
        Ok(resolved)
    }

    fn stats(&self) -> Option<Arc<CompilationStats>> {
        self.state.lock().stats.clone()
    }

    fn watchings(&self) -> Vec<Arc<dyn Watching>> {
        self.units
            .iter()
            .map(|unit| Arc::clone(&unit.watching) as Arc<dyn Watching>)
            .collect()
    }

    fn mark_invalid(&self, unit: UnitId) {
        tracing::debug!(%unit, "server invalid");
        self.state.lock().valid = false;
    }

    fn wait_until_valid(&self, then: Continuation) {
        let mut state = self.state.lock();
        if state.valid {
            drop(state);
            self.event_loop.spawn(then);
        } else {
            state.waiters.push(then);
        }
    }

    fn serve(&self, request: Request, response: ResponseSlot, next: Next) {
        let artifact = self.resolve_artifact_path(&request.url);
        let output = self.output.clone();
        self.wait_until_valid(Box::new(move || match artifact {
            Ok(Some(path)) => match output.read(&path) {
                Some(body) => response.fill(Response::ok(body)),
                None => next(None),
            },
            Ok(None) => next(None),
            Err(err) => next(Some(err)),
        }));
    }
}

impl std::fmt::Debug for DevServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("DevServer")
            .field("units", &self.units)
            .field("valid", &state.valid)
            .field("generation", &state.generation)
            .field("waiters", &state.waiters.len())
            .finish_non_exhaustive()
    }
}
