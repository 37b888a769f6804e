//! Watcher slots for build units.
//!
//! A build unit's watch process holds its filesystem watcher in a
//! [`WatchSlot`]. Scheduling a scoped rebuild pauses the watcher rather than
//! discarding it, so filesystem events that arrive during the rebuild are not
//! lost, and reads its modification times so the next pass starts from them
//! as a baseline instead of rescanning.
//!
//! ```text
//!           activate            pause
//!   Idle ───────────► Active ───────────► Paused
//!                       ▲                   │
//!                       └───────────────────┘
//!                         resume / activate
//! ```

use std::fmt;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

/// Modification stamps keyed by path.
pub type Timestamps = FxHashMap<String, u64>;

/// File and context (directory) modification times captured from a watcher.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WatchTimes {
    pub files: Timestamps,
    pub contexts: Timestamps,
}

/// A running filesystem watcher.
pub trait FsWatcher: Send {
    /// Current modification times of everything being watched.
    fn times(&self) -> WatchTimes;
}

/// State of a watcher slot.
pub enum WatchState {
    /// No watcher installed.
    Idle,
    Active(Box<dyn FsWatcher>),
    /// Paused by a scoped rebuild. The watcher is kept alive here.
    Paused(Box<dyn FsWatcher>),
}

impl fmt::Debug for WatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WatchState::Idle => "Idle",
            WatchState::Active(_) => "Active",
            WatchState::Paused(_) => "Paused",
        })
    }
}

/// The exclusive-access slot holding one build unit's watcher.
///
/// Every transition happens under the slot's lock, so a pause requested by
/// the gate cannot interleave with the pipeline installing a new watcher.
pub struct WatchSlot {
    state: Mutex<WatchState>,
}

impl Default for WatchSlot {
    fn default() -> Self {
        WatchSlot::new()
    }
}

impl WatchSlot {
    pub fn new() -> Self {
        WatchSlot {
            state: Mutex::new(WatchState::Idle),
        }
    }

    /// Install `watcher` as the active watcher.
    ///
    /// A paused watcher takes precedence: it is reactivated and `watcher` is
    /// dropped, so events recorded while paused are kept.
    pub fn activate(&self, watcher: Box<dyn FsWatcher>) {
        let mut state = self.state.lock();
        *state = match std::mem::replace(&mut *state, WatchState::Idle) {
            WatchState::Paused(paused) => WatchState::Active(paused),
            WatchState::Idle | WatchState::Active(_) => WatchState::Active(watcher),
        };
    }

    /// Pause the active watcher and return its current modification times.
    ///
    /// An already paused slot stays paused and reports the paused watcher's
    /// times again. Returns `None` if no watcher is installed.
    pub fn pause(&self) -> Option<WatchTimes> {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, WatchState::Idle) {
            WatchState::Active(watcher) | WatchState::Paused(watcher) => {
                let times = watcher.times();
                *state = WatchState::Paused(watcher);
                Some(times)
            }
            WatchState::Idle => None,
        }
    }

    /// Reactivate a paused watcher. Returns `false` if the slot was not paused.
    pub fn resume(&self) -> bool {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, WatchState::Idle) {
            WatchState::Paused(watcher) => {
                *state = WatchState::Active(watcher);
                true
            }
            other => {
                *state = other;
                false
            }
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(*self.state.lock(), WatchState::Active(_))
    }

    pub fn is_paused(&self) -> bool {
        matches!(*self.state.lock(), WatchState::Paused(_))
    }
}

impl fmt::Debug for WatchSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WatchSlot({:?})", &*self.state.lock())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
