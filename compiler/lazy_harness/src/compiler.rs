//! The reference build unit.
//!
//! A [`Compiler`] walks the module graph from its entries, asks every
//! registered build hook before building each module, and groups the result
//! into chunks: one per entry and one per dynamic import of a built module.
//! Modules that were suspended stay in their chunk but render without source.

use std::collections::{BTreeMap, VecDeque};
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use lazy_gate::{
    BuildDecision, BuildModuleHook, Chunk, CompilationSnapshot, ModuleDescriptor, ModuleId,
    ModuleReason, PassId, PipelineHooks, UnitId, WatchTimes,
};
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::fs::{basename, join, resolve_specifier, MemoryFs};
use crate::scan::{scan_imports, ImportKind};

/// Rendered in place of a module whose build was suspended.
pub const NO_SOURCE: &str = "/* No source available */";

/// Configuration of one build unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Entry name and entry request, e.g. `("main", "/in")`.
    pub entries: Vec<(String, String)>,
    pub output_path: String,
    /// Output file name template; `[name]` is replaced by the chunk name.
    pub filename: String,
    pub public_path: String,
}

impl CompilerConfig {
    /// A unit with a single entry named `main`.
    pub fn new(entry: &str) -> Self {
        CompilerConfig {
            entries: vec![("main".to_string(), entry.to_string())],
            output_path: "/".to_string(),
            filename: "[name].js".to_string(),
            public_path: "/".to_string(),
        }
    }

    /// A unit with one entry per `(name, request)` pair.
    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        CompilerConfig {
            entries: entries
                .into_iter()
                .map(|(name, entry)| (name.to_string(), entry.to_string()))
                .collect(),
            ..CompilerConfig::new("")
        }
    }

    #[must_use]
    pub fn with_output_path(mut self, path: &str) -> Self {
        self.output_path = path.to_string();
        self
    }

    #[must_use]
    pub fn with_filename(mut self, filename: &str) -> Self {
        self.filename = filename.to_string();
        self
    }

    #[must_use]
    pub fn with_public_path(mut self, path: &str) -> Self {
        self.public_path = path.to_string();
        self
    }

    fn file_name(&self, chunk: &str) -> String {
        self.filename.replace("[name]", chunk)
    }
}

/// Result of one sealed pass.
#[derive(Clone, Debug)]
pub struct Compilation {
    pub snapshot: Arc<CompilationSnapshot>,
    /// Emitted assets by file name, relative to the output path.
    pub assets: BTreeMap<String, String>,
    pub errors: Vec<String>,
}

impl Compilation {
    pub fn asset_names(&self) -> Vec<&str> {
        self.assets.keys().map(String::as_str).collect()
    }

    pub fn asset(&self, name: &str) -> Option<&str> {
        self.assets.get(name).map(String::as_str)
    }
}

/// A pass whose suspended modules may still be waiting for their completion.
pub struct PendingCompilation {
    outstanding: Arc<AtomicUsize>,
    compilation: Compilation,
}

impl PendingCompilation {
    /// Whether every suspended module's completion has run.
    pub fn is_settled(&self) -> bool {
        self.outstanding.load(Ordering::SeqCst) == 0
    }
}

#[derive(Debug)]
enum ModuleState {
    /// Queued for a build decision.
    Pending,
    Built(String),
    Suspended,
    Failed,
}

/// A loader result kept for reuse while the file is unchanged.
#[derive(Debug)]
struct LoadedSource {
    mtime: u64,
    source: String,
}

#[derive(Debug)]
struct ModuleRecord {
    id: ModuleId,
    path: String,
    reasons: Vec<ModuleReason>,
    state: ModuleState,
    imports: Vec<ResolvedImport>,
}

#[derive(Debug)]
struct ResolvedImport {
    target: usize,
    kind: ImportKind,
    chunk_name: Option<String>,
}

#[derive(Debug, Default)]
struct ModuleGraph {
    records: Vec<ModuleRecord>,
    by_path: FxHashMap<String, usize>,
}

impl ModuleGraph {
    /// Index of the module at `path`, and whether it was just created.
    fn intern(&mut self, path: &str) -> (usize, bool) {
        if let Some(&idx) = self.by_path.get(path) {
            return (idx, false);
        }
        let idx = self.records.len();
        self.records.push(ModuleRecord {
            id: ModuleId::resource(path),
            path: path.to_owned(),
            reasons: Vec::new(),
            state: ModuleState::Pending,
            imports: Vec::new(),
        });
        self.by_path.insert(path.to_owned(), idx);
        (idx, true)
    }

    /// `root` plus everything it reaches through static imports.
    fn static_closure(&self, root: usize) -> Vec<usize> {
        let mut seen = FxHashSet::default();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([root]);
        while let Some(idx) = queue.pop_front() {
            if !seen.insert(idx) {
                continue;
            }
            order.push(idx);
            for import in &self.records[idx].imports {
                if import.kind == ImportKind::Static {
                    queue.push_back(import.target);
                }
            }
        }
        order
    }
}

/// One build unit of the reference pipeline.
pub struct Compiler {
    unit: UnitId,
    config: CompilerConfig,
    fs: MemoryFs,
    output: MemoryFs,
    hooks: Vec<Arc<dyn BuildModuleHook>>,
    next_pass: AtomicU64,
    sealed: AtomicUsize,
    loader_calls: Mutex<FxHashMap<String, usize>>,
    loaded: Mutex<FxHashMap<String, LoadedSource>>,
    baseline: Mutex<Option<WatchTimes>>,
    last: Mutex<Option<Arc<Compilation>>>,
}

impl PipelineHooks for Compiler {
    fn register_build_hook(&mut self, hook: Arc<dyn BuildModuleHook>) {
        self.hooks.push(hook);
    }
}

impl Compiler {
    /// A unit reading sources from `fs` and emitting into `output`.
    pub fn new(unit: UnitId, config: CompilerConfig, fs: MemoryFs, output: MemoryFs) -> Self {
        Compiler {
            unit,
            config,
            fs,
            output,
            hooks: Vec::new(),
            next_pass: AtomicU64::new(1),
            sealed: AtomicUsize::new(0),
            loader_calls: Mutex::new(FxHashMap::default()),
            loaded: Mutex::new(FxHashMap::default()),
            baseline: Mutex::new(None),
            last: Mutex::new(None),
        }
    }

    pub fn unit(&self) -> UnitId {
        self.unit
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn input_fs(&self) -> &MemoryFs {
        &self.fs
    }

    /// Number of passes sealed so far.
    pub fn passes(&self) -> usize {
        self.sealed.load(Ordering::SeqCst)
    }

    /// How often the loader ran for the module at `path`.
    pub fn loader_calls(&self, path: &str) -> usize {
        self.loader_calls.lock().get(path).copied().unwrap_or(0)
    }

    pub fn last_compilation(&self) -> Option<Arc<Compilation>> {
        self.last.lock().clone()
    }

    /// Timestamps installed as the baseline for the next pass.
    ///
    /// A module whose file still carries its baseline time reuses the
    /// previous loader result instead of being read and loaded again.
    /// Without a baseline every pass loads every built module.
    pub fn baseline_times(&self) -> Option<WatchTimes> {
        self.baseline.lock().clone()
    }

    pub fn install_timestamps(&self, times: WatchTimes) {
        *self.baseline.lock() = Some(times);
    }

    /// Walk the module graph and plan chunks for a new pass.
    ///
    /// Suspended modules hand their completion to the hook that suspended
    /// them; the pass is settled once all of those have run.
    pub fn compile(&self) -> PendingCompilation {
        let pass = PassId::new(self.next_pass.fetch_add(1, Ordering::SeqCst));
        let outstanding = Arc::new(AtomicUsize::new(0));
        let mut graph = ModuleGraph::default();
        let mut errors = Vec::new();
        let mut queue = VecDeque::new();

        let mut entries = Vec::new();
        for (name, request) in &self.config.entries {
            let Some(path) = resolve_specifier("/", request) else {
                errors.push(format!("entry '{name}': cannot resolve '{request}'"));
                continue;
            };
            let (idx, created) = graph.intern(&path);
            graph.records[idx].reasons.push(ModuleReason::entry());
            if created {
                queue.push_back(idx);
            }
            entries.push((name.clone(), idx));
        }

        while let Some(idx) = queue.pop_front() {
            let record = &graph.records[idx];
            let descriptor = ModuleDescriptor::new(record.id.clone(), record.reasons.clone());
            let suspender = self
                .hooks
                .iter()
                .find(|hook| hook.before_build(pass, &descriptor) == BuildDecision::Suspend);

            if let Some(hook) = suspender {
                outstanding.fetch_add(1, Ordering::SeqCst);
                let settled = Arc::clone(&outstanding);
                hook.defer(
                    pass,
                    descriptor.id,
                    Box::new(move || {
                        settled.fetch_sub(1, Ordering::SeqCst);
                    }),
                );
                graph.records[idx].state = ModuleState::Suspended;
                continue;
            }

            self.build_module(&mut graph, idx, &mut queue, &mut errors);
        }

        let compilation = self.plan_chunks(pass, &graph, &entries, errors);
        tracing::debug!(
            unit = %self.unit,
            %pass,
            modules = graph.records.len(),
            chunks = compilation.snapshot.chunks.len(),
            "compiled"
        );
        PendingCompilation {
            outstanding,
            compilation,
        }
    }

    /// Run the hooks' deferred completions. Called on the tick after a pass.
    pub fn drain_deferred(&self) -> usize {
        self.hooks.iter().map(|hook| hook.run_deferred()).sum()
    }

    /// Emit a settled pass into the output filesystem.
    pub fn seal(&self, pending: PendingCompilation) -> Arc<Compilation> {
        let compilation = Arc::new(pending.compilation);
        for (name, contents) in &compilation.assets {
            self.output
                .write(&join(&self.config.output_path, name), contents.clone());
        }
        self.sealed.fetch_add(1, Ordering::SeqCst);
        *self.last.lock() = Some(Arc::clone(&compilation));
        compilation
    }

    /// Run one pass to completion without an event loop.
    pub fn run(&self) -> Arc<Compilation> {
        let pending = self.compile();
        while !pending.is_settled() {
            if self.drain_deferred() == 0 {
                break;
            }
        }
        self.seal(pending)
    }

    fn build_module(
        &self,
        graph: &mut ModuleGraph,
        idx: usize,
        queue: &mut VecDeque<usize>,
        errors: &mut Vec<String>,
    ) {
        let path = graph.records[idx].path.clone();
        let Some(source) = self.load(&path) else {
            errors.push(format!("module not found: {path}"));
            graph.records[idx].state = ModuleState::Failed;
            return;
        };

        let origin = graph.records[idx].id.clone();
        let mut imports = Vec::new();
        for import in scan_imports(&source) {
            let Some(target_path) = resolve_specifier(&path, &import.specifier) else {
                errors.push(format!("{path}: cannot resolve '{}'", import.specifier));
                continue;
            };
            let (target, created) = graph.intern(&target_path);
            let reason = match import.kind {
                ImportKind::Static => ModuleReason::normal(origin.clone()),
                ImportKind::Dynamic => ModuleReason::dynamic(origin.clone()),
            };
            let target_record = &mut graph.records[target];
            target_record.reasons.push(reason);
            if created {
                queue.push_back(target);
            } else if import.kind == ImportKind::Static
                && matches!(target_record.state, ModuleState::Suspended)
            {
                // Suspended on its earlier reasons; a static import must get
                // a fresh decision in this pass.
                target_record.state = ModuleState::Pending;
                queue.push_back(target);
            }
            imports.push(ResolvedImport {
                target,
                kind: import.kind,
                chunk_name: import.chunk_name,
            });
        }

        let record = &mut graph.records[idx];
        record.imports = imports;
        record.state = ModuleState::Built(source);
    }

    /// Run the loader for `path`, or reuse its last result if the file is
    /// unchanged since the installed baseline.
    fn load(&self, path: &str) -> Option<String> {
        let mtime = self.fs.mtime(path)?;
        let unchanged = self
            .baseline
            .lock()
            .as_ref()
            .and_then(|baseline| baseline.files.get(path).copied())
            == Some(mtime);
        if unchanged {
            if let Some(loaded) = self.loaded.lock().get(path) {
                if loaded.mtime == mtime {
                    tracing::trace!(path, "reusing loaded module");
                    return Some(loaded.source.clone());
                }
            }
        }

        let source = self.fs.read(path)?;
        *self.loader_calls.lock().entry(path.to_owned()).or_insert(0) += 1;
        self.loaded.lock().insert(
            path.to_owned(),
            LoadedSource {
                mtime,
                source: source.clone(),
            },
        );
        Some(source)
    }

    fn plan_chunks(
        &self,
        pass: PassId,
        graph: &ModuleGraph,
        entries: &[(String, usize)],
        errors: Vec<String>,
    ) -> Compilation {
        let mut planned: Vec<(String, Vec<usize>)> = Vec::new();
        let mut names = FxHashSet::default();
        for (name, root) in entries {
            if names.insert(name.clone()) {
                planned.push((name.clone(), graph.static_closure(*root)));
            }
        }

        let mut next = 0;
        while next < planned.len() {
            let mut children = Vec::new();
            for &idx in &planned[next].1 {
                for import in &graph.records[idx].imports {
                    if import.kind != ImportKind::Dynamic {
                        continue;
                    }
                    let name = import.chunk_name.clone().unwrap_or_else(|| {
                        let file = basename(&graph.records[import.target].path);
                        file.split('.').next().unwrap_or(file).to_owned()
                    });
                    if names.insert(name.clone()) {
                        children.push((name, graph.static_closure(import.target)));
                    }
                }
            }
            planned.extend(children);
            next += 1;
        }

        let mut snapshot =
            CompilationSnapshot::new(self.unit, pass, self.config.output_path.clone());
        let mut assets = BTreeMap::new();
        for (name, modules) in &planned {
            let file = self.config.file_name(name);
            let mut chunk = Chunk::new(name.clone()).with_file(file.clone());
            let mut rendered = String::new();
            for &idx in modules {
                let record = &graph.records[idx];
                chunk.modules.push(record.id.clone());
                let _ = writeln!(rendered, "/* {} */", record.id);
                match &record.state {
                    ModuleState::Built(source) => {
                        rendered.push_str(source);
                        if record.path.ends_with(".css") {
                            assets.insert(basename(&record.path).to_owned(), source.clone());
                        }
                    }
                    ModuleState::Pending | ModuleState::Suspended | ModuleState::Failed => {
                        rendered.push_str(NO_SOURCE);
                    }
                }
                rendered.push('\n');
            }
            assets.insert(file, rendered);
            snapshot.chunks.push(chunk);
        }

        Compilation {
            snapshot: Arc::new(snapshot),
            assets,
            errors,
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
