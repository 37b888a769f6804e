//! A complete dev setup: build units, watch processes, the dev server and
//! optionally the lazy gate in front of it.

use std::sync::Arc;

use lazy_gate::{ArtifactServer, GateConfig, LazyGate, Method, Next, Request, UnitId};
use parking_lot::Mutex;

use crate::compiler::{Compiler, CompilerConfig};
use crate::event_loop::EventLoop;
use crate::fs::MemoryFs;
use crate::server::DevServer;
use crate::watching::UnitWatching;

/// HTTP response as seen by a test client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn ok(body: impl Into<String>) -> Self {
        Response {
            status: 200,
            body: body.into(),
        }
    }

    pub fn not_found() -> Self {
        Response {
            status: 404,
            body: String::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Response {
            status: 500,
            body: message.into(),
        }
    }

    /// No handler answered before the event loop went idle.
    pub fn pending() -> Self {
        Response {
            status: 503,
            body: String::new(),
        }
    }
}

/// Where a handler writes its response. The first write wins.
#[derive(Clone, Debug, Default)]
pub struct ResponseSlot(Arc<Mutex<Option<Response>>>);

impl ResponseSlot {
    pub fn fill(&self, response: Response) {
        let mut slot = self.0.lock();
        if slot.is_none() {
            *slot = Some(response);
        }
    }

    pub fn take(&self) -> Option<Response> {
        self.0.lock().take()
    }
}

struct UnitSetup {
    config: CompilerConfig,
    fs: MemoryFs,
}

#[derive(Default)]
pub struct AppBuilder {
    units: Vec<UnitSetup>,
    gate: Option<GateConfig>,
}

impl AppBuilder {
    /// Add a build unit reading its sources from `fs`.
    #[must_use]
    pub fn unit(mut self, config: CompilerConfig, fs: &MemoryFs) -> Self {
        self.units.push(UnitSetup {
            config,
            fs: fs.clone(),
        });
        self
    }

    /// Put a lazy gate with `config` in front of the dev server.
    #[must_use]
    pub fn lazy(mut self, config: GateConfig) -> Self {
        self.gate = Some(config);
        self
    }

    /// Build everything up front; requests go straight to the dev server.
    #[must_use]
    pub fn eager(mut self) -> Self {
        self.gate = None;
        self
    }

    /// Wire up the units, start watching and run the initial builds.
    pub fn build(self) -> App {
        let event_loop = EventLoop::new();
        let output = MemoryFs::new();
        let gate = self.gate.map(LazyGate::with_config);

        let mut compilers = Vec::with_capacity(self.units.len());
        let mut watchings = Vec::with_capacity(self.units.len());
        for (index, setup) in self.units.into_iter().enumerate() {
            let unit = UnitId::new(u32::try_from(index).unwrap_or(u32::MAX));
            let mut compiler = Compiler::new(unit, setup.config, setup.fs, output.clone());
            if let Some(gate) = &gate {
                gate.attach(&mut compiler);
            }
            let compiler = Arc::new(compiler);
            watchings.push(UnitWatching::new(Arc::clone(&compiler), event_loop.clone()));
            compilers.push(compiler);
        }

        let server = DevServer::new(watchings.clone(), output.clone(), event_loop.clone());
        for watching in &watchings {
            watching.start();
        }
        let ticks = event_loop.run_until_idle();
        tracing::debug!(units = compilers.len(), ticks, "initial build done");

        App {
            gate,
            server,
            event_loop,
            compilers,
            watchings,
            output,
        }
    }
}

pub struct App {
    gate: Option<LazyGate>,
    server: Arc<DevServer>,
    event_loop: EventLoop,
    compilers: Vec<Arc<Compiler>>,
    watchings: Vec<Arc<UnitWatching>>,
    output: MemoryFs,
}

impl App {
    pub fn builder() -> AppBuilder {
        AppBuilder::default()
    }

    pub fn gate(&self) -> Option<&LazyGate> {
        self.gate.as_ref()
    }

    pub fn server(&self) -> &Arc<DevServer> {
        &self.server
    }

    pub fn compiler(&self, index: usize) -> Option<&Arc<Compiler>> {
        self.compilers.get(index)
    }

    pub fn watching(&self, index: usize) -> Option<&Arc<UnitWatching>> {
        self.watchings.get(index)
    }

    /// Everything emitted so far, across all units.
    pub fn output(&self) -> &MemoryFs {
        &self.output
    }

    pub fn get(&self, url: &str) -> Response {
        self.request(Method::Get, url)
    }

    /// Dispatch one request and run the event loop until it settles.
    pub fn request(&self, method: Method, url: &str) -> Response {
        let slot = ResponseSlot::default();
        let fallback = slot.clone();
        let next: Next = Box::new(move |err| {
            fallback.fill(match err {
                None => Response::not_found(),
                Some(err) => Response::error(err.to_string()),
            });
        });

        let request = Request::new(method, url);
        match &self.gate {
            Some(gate) => gate.handle(&self.server, request, slot.clone(), next),
            None => self.server.serve(request, slot.clone(), next),
        }
        self.event_loop.run_until_idle();

        slot.take().unwrap_or_else(Response::pending)
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("gate", &self.gate)
            .field("server", &self.server)
            .field("units", &self.compilers.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn first_response_wins() {
        let slot = ResponseSlot::default();
        slot.fill(Response::ok("body"));
        slot.fill(Response::not_found());
        assert_eq!(slot.take(), Some(Response::ok("body")));
        assert_eq!(slot.take(), None);
    }
}
