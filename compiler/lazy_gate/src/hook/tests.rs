use std::sync::atomic::{AtomicUsize, Ordering};

use pretty_assertions::assert_eq;

use super::*;
use crate::graph::ModuleReason;

fn m(path: &str) -> ModuleId {
    ModuleId::resource(path)
}

fn hook(policy: SuspensionPolicy) -> (LazyBuildHook, NeededModules) {
    let needed = NeededModules::new();
    (LazyBuildHook::new(needed.clone(), policy), needed)
}

fn counter() -> (Arc<AtomicUsize>, impl Fn() -> Continuation) {
    let count = Arc::new(AtomicUsize::new(0));
    let make = {
        let count = Arc::clone(&count);
        move || -> Continuation {
            let count = Arc::clone(&count);
            Box::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            })
        }
    };
    (count, make)
}

// ── Decisions ───────────────────────────────────────────────────

#[test]
fn dynamic_only_module_is_suspended() {
    let (hook, needed) = hook(SuspensionPolicy::DynamicImportOnly);
    let module = ModuleDescriptor::new(m("/1.js"), vec![ModuleReason::dynamic(m("/in.js"))]);

    assert_eq!(hook.before_build(PassId::new(1), &module), BuildDecision::Suspend);
    assert!(!needed.is_needed(&module.id));
}

#[test]
fn statically_imported_module_builds_and_becomes_needed() {
    let (hook, needed) = hook(SuspensionPolicy::DynamicImportOrEntry);
    let module = ModuleDescriptor::new(
        m("/util.js"),
        vec![
            ModuleReason::dynamic(m("/in.js")),
            ModuleReason::normal(m("/other.js")),
        ],
    );

    assert_eq!(hook.before_build(PassId::new(1), &module), BuildDecision::Build);
    assert!(needed.is_needed(&module.id));
}

#[test]
fn needed_module_always_builds() {
    let (hook, needed) = hook(SuspensionPolicy::DynamicImportOrEntry);
    let module = ModuleDescriptor::new(m("/in.js"), vec![ModuleReason::entry()]);
    assert_eq!(hook.before_build(PassId::new(1), &module), BuildDecision::Suspend);

    needed.mark(&module.id);
    for pass in 2..5 {
        assert_eq!(
            hook.before_build(PassId::new(pass), &module),
            BuildDecision::Build
        );
    }
}

#[test]
fn entry_policy_decides_entry_modules() {
    let entry = ModuleDescriptor::new(m("/in.js"), vec![ModuleReason::entry()]);

    let (lazy_entries, _) = hook(SuspensionPolicy::DynamicImportOrEntry);
    assert_eq!(
        lazy_entries.before_build(PassId::new(1), &entry),
        BuildDecision::Suspend
    );

    let (eager_entries, needed) = hook(SuspensionPolicy::DynamicImportOnly);
    assert_eq!(
        eager_entries.before_build(PassId::new(1), &entry),
        BuildDecision::Build
    );
    assert!(needed.is_needed(&entry.id));
}

// ── Deferred completions ────────────────────────────────────────

#[test]
fn deferred_completion_runs_on_next_tick_only() {
    let (hook, _) = hook(SuspensionPolicy::default());
    let (count, completion) = counter();

    hook.defer(PassId::new(1), m("/1.js"), completion());
    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert_eq!(hook.pending(), 1);

    assert_eq!(hook.run_deferred(), 1);
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(hook.pending(), 0);
    assert_eq!(hook.run_deferred(), 0);
}

#[test]
fn suspensions_from_different_passes_complete_independently() {
    let (hook, _) = hook(SuspensionPolicy::default());
    let (count, completion) = counter();

    hook.defer(PassId::new(1), m("/1.js"), completion());
    hook.defer(PassId::new(2), m("/1.js"), completion());
    assert_eq!(hook.pending_in(PassId::new(1)), 1);
    assert_eq!(hook.pending_in(PassId::new(2)), 1);

    assert_eq!(hook.run_deferred(), 2);
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[test]
fn completion_queued_while_draining_waits_for_next_tick() {
    let (hook, _) = hook(SuspensionPolicy::default());
    let hook = Arc::new(hook);
    let (count, completion) = counter();

    let inner_hook = Arc::clone(&hook);
    let inner = completion();
    hook.defer(
        PassId::new(1),
        m("/a.js"),
        Box::new(move || inner_hook.defer(PassId::new(1), m("/b.js"), inner)),
    );

    assert_eq!(hook.run_deferred(), 1);
    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert_eq!(hook.pending(), 1);

    assert_eq!(hook.run_deferred(), 1);
    assert_eq!(count.load(Ordering::SeqCst), 1);
}
