//! Lazy Compilation Gate
//!
//! A demand-driven gate between a development asset server and an
//! incremental, multi-unit build pipeline. Modules nobody has asked for are
//! not compiled; any artifact that is requested becomes available, including
//! modules reachable only through dynamic imports.
//!
//! # Overview
//!
//! ```text
//! HTTP request
//!     │
//!     ▼
//! LazyGate::handle ──► companion artifact first (styles.css ─► styles.js)
//!     │
//!     ▼
//! ChunkInspector ──► NeededModules (grow-only)
//!     │
//!     ▼
//! recompile(unit) ──► pause watcher, install timestamps, invalidate
//!     │
//!     ▼
//! pipeline pass ──► LazyBuildHook: Build or Suspend each module
//! ```
//!
//! The gate changes only *when* a module is built, never *what* is built.
//!
//! # Example
//!
//! ```ignore
//! let gate = LazyGate::new();
//! for compiler in &mut compilers {
//!     gate.attach(compiler);
//! }
//!
//! // In the HTTP layer:
//! gate.handle(&dev_server, request, response, next);
//! ```
//!
//! Tracing output is enabled with `RUST_LOG=lazy_gate=debug` after calling
//! [`init_tracing`].

pub mod config;
pub mod dispatch;
pub mod error;
pub mod gate;
pub mod graph;
pub mod hook;
pub mod ids;
pub mod inspect;
pub mod needed;
pub mod recompile;
pub mod requested;
pub mod server;
pub mod watch;

pub use config::{CompanionRule, GateConfig, SuspensionPolicy};
pub use error::{GateError, GateResult};
pub use gate::LazyGate;
pub use graph::{
    Chunk, CompilationSnapshot, CompilationStats, DependencyKind, ModuleDescriptor, ModuleReason,
};
pub use hook::{BuildDecision, BuildModuleHook, Continuation, LazyBuildHook, PipelineHooks};
pub use ids::{ModuleId, PassId, UnitId};
pub use inspect::{ChunkInspector, Inspection};
pub use needed::NeededModules;
pub use recompile::recompile;
pub use requested::RequestedArtifacts;
pub use server::{ArtifactServer, Method, Next, Request, Watching};
pub use watch::{FsWatcher, Timestamps, WatchSlot, WatchState, WatchTimes};

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Safe to call multiple times. Does nothing unless `RUST_LOG` is set, e.g.
/// `RUST_LOG=lazy_gate=debug` or `RUST_LOG=lazy_gate=trace`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
