//! The build hook.
//!
//! The pipeline consults a [`BuildModuleHook`] for every module that is about
//! to enter its build step. [`LazyBuildHook`] answers `Build` for modules in
//! the needed-module set (and for modules that cannot be deferred, which it
//! adds to the set), and `Suspend` for everything else.
//!
//! A suspended module still has to satisfy the pipeline's contract that every
//! build step eventually completes. The pipeline hands its completion
//! callback to [`BuildModuleHook::defer`]; the hook queues it and invokes it
//! from [`BuildModuleHook::run_deferred`], which the pipeline calls on its
//! next scheduler tick. No transform work is done for the module.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::SuspensionPolicy;
use crate::graph::ModuleDescriptor;
use crate::ids::{ModuleId, PassId};
use crate::needed::NeededModules;

/// Callback run once a deferred piece of work may proceed.
pub type Continuation = Box<dyn FnOnce() + Send>;

/// What the pipeline should do with a module about to build.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BuildDecision {
    /// Run the module's real build work now.
    Build,
    /// Mark the module in progress, skip its build work and hand the
    /// completion callback to [`BuildModuleHook::defer`].
    Suspend,
}

/// Interception point for the "module is about to build" event.
pub trait BuildModuleHook: Send + Sync {
    /// Decide, synchronously, whether `module` builds now.
    fn before_build(&self, pass: PassId, module: &ModuleDescriptor) -> BuildDecision;

    /// Queue the completion callback of a suspended module.
    fn defer(&self, pass: PassId, module: ModuleId, completion: Continuation);

    /// Invoke the completions queued before this call. Returns how many ran.
    fn run_deferred(&self) -> usize;
}

/// The capability a build pipeline offers for attaching build hooks.
///
/// Pipelines with different plugin registration styles provide an adapter
/// implementing this trait; the gate only talks to the trait.
pub trait PipelineHooks {
    fn register_build_hook(&mut self, hook: Arc<dyn BuildModuleHook>);
}

struct SuspendedModule {
    pass: PassId,
    module: ModuleId,
    completion: Continuation,
}

/// Build hook that defers modules nobody has asked for yet.
pub struct LazyBuildHook {
    needed: NeededModules,
    policy: SuspensionPolicy,
    deferred: Mutex<VecDeque<SuspendedModule>>,
}

impl LazyBuildHook {
    pub fn new(needed: NeededModules, policy: SuspensionPolicy) -> Self {
        LazyBuildHook {
            needed,
            policy,
            deferred: Mutex::new(VecDeque::new()),
        }
    }

    pub fn policy(&self) -> SuspensionPolicy {
        self.policy
    }

    /// Number of suspended modules whose completion has not run yet.
    pub fn pending(&self) -> usize {
        self.deferred.lock().len()
    }

    /// Number of pending completions queued by `pass`.
    pub fn pending_in(&self, pass: PassId) -> usize {
        self.deferred.lock().iter().filter(|s| s.pass == pass).count()
    }
}

impl BuildModuleHook for LazyBuildHook {
    fn before_build(&self, pass: PassId, module: &ModuleDescriptor) -> BuildDecision {
        if self.needed.is_needed(&module.id) {
            return BuildDecision::Build;
        }
        if self.policy.is_eligible(&module.reasons) {
            tracing::debug!(module = %module.id, %pass, "suspending module build");
            return BuildDecision::Suspend;
        }
        if self.needed.mark(&module.id) {
            tracing::debug!(module = %module.id, %pass, "module reached eagerly; marked needed");
        }
        BuildDecision::Build
    }

    fn defer(&self, pass: PassId, module: ModuleId, completion: Continuation) {
        self.deferred.lock().push_back(SuspendedModule {
            pass,
            module,
            completion,
        });
    }

    fn run_deferred(&self) -> usize {
        // Completions run outside the lock; they may suspend more modules.
        let batch = std::mem::take(&mut *self.deferred.lock());
        let count = batch.len();
        for suspended in batch {
            tracing::trace!(module = %suspended.module, pass = %suspended.pass, "completing suspended build");
            (suspended.completion)();
        }
        count
    }
}

#[cfg(test)]
mod tests;
