//! Watch processes for reference build units.
//!
//! A [`UnitWatching`] owns the compile/watch cycle of one [`Compiler`]: it
//! schedules passes on the event loop, runs suspended completions on the
//! following tick, seals the pass once they have all run, and then
//! (re)activates its filesystem watcher for the next cycle.

use std::sync::{Arc, Weak};

use lazy_gate::{FsWatcher, UnitId, WatchSlot, WatchTimes, Watching};
use parking_lot::Mutex;

use crate::compiler::{Compilation, Compiler, PendingCompilation};
use crate::event_loop::EventLoop;
use crate::fs::MemoryFs;

/// Filesystem watcher over a [`MemoryFs`].
#[derive(Debug)]
pub struct MemoryWatcher {
    fs: MemoryFs,
}

impl MemoryWatcher {
    pub fn new(fs: MemoryFs) -> Self {
        MemoryWatcher { fs }
    }
}

impl FsWatcher for MemoryWatcher {
    fn times(&self) -> WatchTimes {
        self.fs.times()
    }
}

/// Called with each sealed compilation.
pub type DoneListener = Arc<dyn Fn(UnitId, &Arc<Compilation>) + Send + Sync>;

#[derive(Debug, Default)]
struct CycleState {
    building: bool,
    /// Invalidated while building; run again once the current pass seals.
    rerun: bool,
}

pub struct UnitWatching {
    this: Weak<UnitWatching>,
    compiler: Arc<Compiler>,
    slot: WatchSlot,
    event_loop: EventLoop,
    cycle: Mutex<CycleState>,
    listeners: Mutex<Vec<DoneListener>>,
}

impl UnitWatching {
    pub fn new(compiler: Arc<Compiler>, event_loop: EventLoop) -> Arc<Self> {
        Arc::new_cyclic(|this| UnitWatching {
            this: this.clone(),
            compiler,
            slot: WatchSlot::new(),
            event_loop,
            cycle: Mutex::new(CycleState::default()),
            listeners: Mutex::new(Vec::new()),
        })
    }

    pub fn compiler(&self) -> &Arc<Compiler> {
        &self.compiler
    }

    pub fn on_done(&self, listener: DoneListener) {
        self.listeners.lock().push(listener);
    }

    /// Begin watching: schedule the first pass.
    pub fn start(&self) {
        self.schedule();
    }

    pub fn is_building(&self) -> bool {
        self.cycle.lock().building
    }

    fn schedule(&self) {
        {
            let mut cycle = self.cycle.lock();
            if cycle.building {
                cycle.rerun = true;
                return;
            }
            cycle.building = true;
        }
        let Some(this) = self.this.upgrade() else {
            return;
        };
        self.event_loop.spawn(move || this.run_pass());
    }

    fn run_pass(self: Arc<Self>) {
        let pending = self.compiler.compile();
        self.settle(pending);
    }

    /// Run deferred completions on the next tick, then try to seal.
    fn settle(self: Arc<Self>, pending: PendingCompilation) {
        let compiler = Arc::clone(&self.compiler);
        self.event_loop.spawn(move || {
            compiler.drain_deferred();
        });
        let this = Arc::clone(&self);
        self.event_loop.spawn(move || this.finish(pending));
    }

    fn finish(self: Arc<Self>, pending: PendingCompilation) {
        if !pending.is_settled() {
            self.settle(pending);
            return;
        }

        let compilation = self.compiler.seal(pending);
        self.slot.activate(Box::new(MemoryWatcher::new(
            self.compiler.input_fs().clone(),
        )));

        let rerun = {
            let mut cycle = self.cycle.lock();
            cycle.building = false;
            std::mem::take(&mut cycle.rerun)
        };
        if rerun {
            self.schedule();
        }

        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            listener(self.compiler.unit(), &compilation);
        }
    }
}

impl Watching for UnitWatching {
    fn unit(&self) -> UnitId {
        self.compiler.unit()
    }

    fn slot(&self) -> &WatchSlot {
        &self.slot
    }

    fn install_timestamps(&self, times: WatchTimes) {
        self.compiler.install_timestamps(times);
    }

    fn invalidate(&self) {
        tracing::debug!(unit = %self.compiler.unit(), "invalidated");
        self.schedule();
    }
}

impl std::fmt::Debug for UnitWatching {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitWatching")
            .field("unit", &self.compiler.unit())
            .field("slot", &self.slot)
            .field("cycle", &*self.cycle.lock())
            .finish()
    }
}
