//! Single-threaded scheduler driving the reference pipeline.
//!
//! Tasks run in FIFO order, one per tick. Work spawned while a task runs
//! lands behind everything already queued, which is what gives "later tick"
//! its meaning.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

pub type Task = Box<dyn FnOnce() + Send>;

/// Upper bound on ticks per `run_until_idle`, guarding against livelock.
const MAX_TICKS: usize = 100_000;

#[derive(Clone, Default)]
pub struct EventLoop {
    queue: Arc<Mutex<VecDeque<Task>>>,
}

impl EventLoop {
    pub fn new() -> Self {
        EventLoop::default()
    }

    pub fn spawn(&self, task: impl FnOnce() + Send + 'static) {
        self.queue.lock().push_back(Box::new(task));
    }

    /// Run the next task. Returns `false` if there was none.
    pub fn tick(&self) -> bool {
        let task = self.queue.lock().pop_front();
        match task {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Run tasks until the queue is empty. Returns how many ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.tick() {
            ran += 1;
            if ran >= MAX_TICKS {
                tracing::warn!(ran, "event loop did not go idle");
                break;
            }
        }
        ran
    }

    pub fn is_idle(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EventLoop({} queued)", self.queue.lock().len())
    }
}
