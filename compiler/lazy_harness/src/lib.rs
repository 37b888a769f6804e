//! In-memory reference pipeline for the lazy compilation gate.
//!
//! Provides just enough of a bundler and a dev server to drive
//! [`lazy_gate`] end to end: a [`MemoryFs`], an import scanner, a
//! [`Compiler`] that emits one chunk per entry and per dynamic import, watch
//! processes on a single-threaded [`EventLoop`], and a [`DevServer`] that
//! holds requests while a rebuild is running.
//!
//! ```ignore
//! let app = App::builder()
//!     .unit(CompilerConfig::new("/in"), &fs)
//!     .lazy(GateConfig::default())
//!     .build();
//! assert_eq!(app.get("/main.js").status, 200);
//! ```

pub mod app;
pub mod compiler;
pub mod event_loop;
pub mod fs;
pub mod scan;
pub mod server;
pub mod watching;

pub use app::{App, AppBuilder, Response, ResponseSlot};
pub use compiler::{Compilation, Compiler, CompilerConfig, PendingCompilation, NO_SOURCE};
pub use event_loop::EventLoop;
pub use fs::MemoryFs;
pub use scan::{scan_imports, Import, ImportKind};
pub use server::DevServer;
pub use watching::{MemoryWatcher, UnitWatching};
