//! Interfaces the gate consumes from the build pipeline and artifact server.
//!
//! The HTTP server, the artifact server and the build units all live outside
//! this crate. The gate is written against these traits only.

use std::fmt;
use std::sync::Arc;

use crate::error::{GateError, GateResult};
use crate::graph::CompilationStats;
use crate::hook::Continuation;
use crate::ids::UnitId;
use crate::watch::{WatchSlot, WatchTimes};

/// HTTP request method.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Other(String),
}

impl Method {
    pub fn parse(method: &str) -> Self {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Method::Get,
            "HEAD" => Method::Head,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            _ => Method::Other(method.to_owned()),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Other(other) => other,
        })
    }
}

/// The parts of an inbound request the gate looks at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub url: String,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Request {
            method,
            url: url.into(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Request::new(Method::Get, url)
    }
}

/// "Continue to the next handler". `Some` routes to the error path.
pub type Next = Box<dyn FnOnce(Option<GateError>) + Send>;

/// One build unit's watch process.
pub trait Watching: Send + Sync {
    fn unit(&self) -> UnitId;

    /// The slot holding this process's filesystem watcher.
    fn slot(&self) -> &WatchSlot;

    /// Install `times` on the build unit as the baseline for its next pass.
    fn install_timestamps(&self, times: WatchTimes);

    /// Schedule a new incremental pass. Must not wait for it.
    fn invalidate(&self);
}

/// The downstream artifact server (dev middleware) the gate sits in front of.
pub trait ArtifactServer: Send + Sync + 'static {
    /// Response handle of the HTTP layer, passed through to [`serve`](Self::serve).
    type Response: Send + 'static;

    /// Map a request URL to the artifact path the pipeline would emit for it.
    ///
    /// `Ok(None)` means the URL is not under any configured output.
    fn resolve_artifact_path(&self, url: &str) -> GateResult<Option<String>>;

    /// The compilation state currently installed, if any build finished yet.
    fn stats(&self) -> Option<Arc<CompilationStats>>;

    /// Watch processes of every build unit in the swarm.
    fn watchings(&self) -> Vec<Arc<dyn Watching>>;

    /// Record that `unit` is about to rebuild, so readers wait for it.
    fn mark_invalid(&self, unit: UnitId);

    /// Run `then` once every build unit is valid again.
    fn wait_until_valid(&self, then: Continuation);

    /// Produce the response for `request`, or call `next` if there is none.
    fn serve(&self, request: Request, response: Self::Response, next: Next);
}
