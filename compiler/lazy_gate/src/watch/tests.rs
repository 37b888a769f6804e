use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use pretty_assertions::assert_eq;

use super::*;

/// Watcher reporting a single file whose stamp the test controls.
struct StubWatcher {
    tag: u64,
    stamp: Arc<AtomicU64>,
}

impl FsWatcher for StubWatcher {
    fn times(&self) -> WatchTimes {
        let mut files = Timestamps::default();
        files.insert(format!("/w{}.js", self.tag), self.stamp.load(Ordering::SeqCst));
        WatchTimes {
            files,
            contexts: Timestamps::default(),
        }
    }
}

fn stub(tag: u64, stamp: &Arc<AtomicU64>) -> Box<dyn FsWatcher> {
    Box::new(StubWatcher {
        tag,
        stamp: Arc::clone(stamp),
    })
}

#[test]
fn pause_idle_slot_fails() {
    let slot = WatchSlot::new();
    assert_eq!(slot.pause(), None);
    assert!(!slot.is_active());
    assert!(!slot.is_paused());
}

#[test]
fn pause_keeps_watcher_and_reports_times() {
    let stamp = Arc::new(AtomicU64::new(7));
    let slot = WatchSlot::new();
    slot.activate(stub(1, &stamp));

    let times = slot.pause().unwrap();
    assert_eq!(times.files.get("/w1.js"), Some(&7));
    assert!(slot.is_paused());

    // The paused watcher still observes changes.
    stamp.store(9, Ordering::SeqCst);
    let again = slot.pause().unwrap();
    assert_eq!(again.files.get("/w1.js"), Some(&9));
}

#[test]
fn resume_reactivates_paused_watcher() {
    let stamp = Arc::new(AtomicU64::new(1));
    let slot = WatchSlot::new();
    assert!(!slot.resume());

    slot.activate(stub(1, &stamp));
    slot.pause();
    assert!(slot.resume());
    assert!(slot.is_active());
    assert!(!slot.resume());
}

#[test]
fn activate_prefers_paused_watcher() {
    let stamp = Arc::new(AtomicU64::new(1));
    let slot = WatchSlot::new();
    slot.activate(stub(1, &stamp));
    slot.pause();

    slot.activate(stub(2, &stamp));
    let times = slot.pause().unwrap();
    assert!(times.files.contains_key("/w1.js"));
    assert!(!times.files.contains_key("/w2.js"));
}

#[test]
fn activate_replaces_active_watcher() {
    let stamp = Arc::new(AtomicU64::new(1));
    let slot = WatchSlot::new();
    slot.activate(stub(1, &stamp));
    slot.activate(stub(2, &stamp));

    let times = slot.pause().unwrap();
    assert!(times.files.contains_key("/w2.js"));
}
