//! Gate configuration.

use crate::graph::{DependencyKind, ModuleReason};

/// Which incoming edges allow a module's build to be suspended.
///
/// A module is eligible for suspension only if every incoming reason is of an
/// allowed kind. A normal (static) import always forces an eager build.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SuspensionPolicy {
    /// Only modules reached exclusively through dynamic imports are deferred.
    /// Entry modules always build eagerly.
    DynamicImportOnly,
    /// Modules reached exclusively through dynamic imports or as entries are
    /// deferred. Entry bundles are built on their first request.
    #[default]
    DynamicImportOrEntry,
}

impl SuspensionPolicy {
    /// Whether an edge of `kind` permits suspension.
    pub fn allows(self, kind: DependencyKind) -> bool {
        match kind {
            DependencyKind::Normal => false,
            DependencyKind::DynamicImport => true,
            DependencyKind::Entry => self == SuspensionPolicy::DynamicImportOrEntry,
        }
    }

    /// Whether a module with these incoming reasons may be suspended.
    ///
    /// A module with no reasons is reached only as an entry.
    pub fn is_eligible(self, reasons: &[ModuleReason]) -> bool {
        if reasons.is_empty() {
            return self.allows(DependencyKind::Entry);
        }
        reasons.iter().all(|reason| self.allows(reason.kind))
    }
}

/// Maps a requested asset to the script artifact that produces it.
///
/// With the default `.css -> .js` rule, a request for `/styles.css` first
/// processes `/styles.js`, whose execution is what emits the stylesheet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompanionRule {
    pub requested_suffix: String,
    pub companion_suffix: String,
}

impl CompanionRule {
    pub fn new(requested_suffix: impl Into<String>, companion_suffix: impl Into<String>) -> Self {
        CompanionRule {
            requested_suffix: requested_suffix.into(),
            companion_suffix: companion_suffix.into(),
        }
    }

    /// The companion URL for `url`, or `None` if the rule does not apply.
    ///
    /// Only the path part is rewritten; a query string is carried over.
    pub fn companion_url(&self, url: &str) -> Option<String> {
        let (path, query) = match url.find(['?', '#']) {
            Some(at) => url.split_at(at),
            None => (url, ""),
        };
        let stem = path.strip_suffix(self.requested_suffix.as_str())?;
        Some(format!("{stem}{}{query}", self.companion_suffix))
    }
}

/// Configuration for a [`LazyGate`](crate::LazyGate).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GateConfig {
    pub policy: SuspensionPolicy,
    /// Companion-asset rules, tried in order. Empty disables correlation.
    pub companions: Vec<CompanionRule>,
}

impl Default for GateConfig {
    fn default() -> Self {
        GateConfig {
            policy: SuspensionPolicy::default(),
            companions: vec![CompanionRule::new(".css", ".js")],
        }
    }
}

impl GateConfig {
    pub fn new() -> Self {
        GateConfig::default()
    }

    #[must_use]
    pub fn with_policy(mut self, policy: SuspensionPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_companion(mut self, rule: CompanionRule) -> Self {
        self.companions.push(rule);
        self
    }

    #[must_use]
    pub fn without_companions(mut self) -> Self {
        self.companions.clear();
        self
    }
}
