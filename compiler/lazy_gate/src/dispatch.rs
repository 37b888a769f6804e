//! The request dispatcher.
//!
//! Sits in front of the artifact server. For every GET request it resolves
//! the artifact path, processes a companion artifact first when one applies,
//! inspects the requested artifact and finally hands the request to the
//! artifact server, which holds the response until the build is valid.

use std::sync::Arc;

use crate::gate::LazyGate;
use crate::server::{ArtifactServer, Method, Next, Request};

impl LazyGate {
    /// Handle one request and delegate the response to `server`.
    ///
    /// Non-GET requests and URLs with no artifact mapping go straight to
    /// `next`. Errors (resolution failures, a unit without a watch process)
    /// are passed to `next` as well. The gate never writes a response itself.
    #[tracing::instrument(level = "debug", skip_all, fields(method = %request.method, url = %request.url))]
    pub fn handle<S: ArtifactServer>(
        &self,
        server: &Arc<S>,
        request: Request,
        response: S::Response,
        next: Next,
    ) {
        if request.method != Method::Get {
            tracing::trace!("not a GET request; bypassing gate");
            next(None);
            return;
        }

        let artifact = match server.resolve_artifact_path(&request.url) {
            Ok(Some(artifact)) => artifact,
            Ok(None) => {
                tracing::trace!("no artifact mapping");
                next(None);
                return;
            }
            Err(err) => {
                next(Some(err));
                return;
            }
        };

        if let Some(companion) = self.companion_artifact(server.as_ref(), &request.url) {
            match self.inspect_artifact(server.as_ref(), &companion) {
                Ok(true) => {
                    // The companion's rebuild must be valid before the
                    // requested artifact is looked at.
                    tracing::debug!(%companion, "waiting for companion rebuild");
                    let gate = self.clone();
                    let deferred_server = Arc::clone(server);
                    server.wait_until_valid(Box::new(move || {
                        gate.finish(&deferred_server, &artifact, request, response, next);
                    }));
                    return;
                }
                Ok(false) => {}
                Err(err) => {
                    next(Some(err));
                    return;
                }
            }
        }

        self.finish(server, &artifact, request, response, next);
    }

    fn finish<S: ArtifactServer>(
        &self,
        server: &Arc<S>,
        artifact: &str,
        request: Request,
        response: S::Response,
        next: Next,
    ) {
        if let Err(err) = self.inspect_artifact(server.as_ref(), artifact) {
            next(Some(err));
            return;
        }
        server.serve(request, response, next);
    }

    /// The artifact path of the first companion rule that applies to `url`
    /// and resolves.
    fn companion_artifact<S: ArtifactServer>(&self, server: &S, url: &str) -> Option<String> {
        self.config()
            .companions
            .iter()
            .filter_map(|rule| rule.companion_url(url))
            .find_map(|companion_url| match server.resolve_artifact_path(&companion_url) {
                Ok(resolved) => resolved,
                Err(err) => {
                    tracing::debug!(%err, "companion does not resolve");
                    None
                }
            })
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
