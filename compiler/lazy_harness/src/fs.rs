//! In-memory filesystem.
//!
//! Every write advances a logical clock and stamps the file with it, so
//! modification times are strictly increasing and deterministic.

use std::collections::BTreeMap;
use std::sync::Arc;

use lazy_gate::{Timestamps, WatchTimes};
use parking_lot::RwLock;

#[derive(Debug, Default)]
struct FsInner {
    files: BTreeMap<String, FileEntry>,
    clock: u64,
}

#[derive(Debug)]
struct FileEntry {
    contents: String,
    mtime: u64,
}

/// Shared in-memory filesystem. Clones refer to the same files.
#[derive(Clone, Debug, Default)]
pub struct MemoryFs {
    inner: Arc<RwLock<FsInner>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        MemoryFs::default()
    }

    /// Create a filesystem holding `files`.
    pub fn with_files<'a>(files: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let fs = MemoryFs::new();
        for (path, contents) in files {
            fs.write(path, contents);
        }
        fs
    }

    pub fn write(&self, path: &str, contents: impl Into<String>) {
        let mut inner = self.inner.write();
        inner.clock += 1;
        let mtime = inner.clock;
        inner.files.insert(
            path.to_owned(),
            FileEntry {
                contents: contents.into(),
                mtime,
            },
        );
    }

    pub fn read(&self, path: &str) -> Option<String> {
        self.inner.read().files.get(path).map(|f| f.contents.clone())
    }

    pub fn exists(&self, path: &str) -> bool {
        self.inner.read().files.contains_key(path)
    }

    pub fn mtime(&self, path: &str) -> Option<u64> {
        self.inner.read().files.get(path).map(|f| f.mtime)
    }

    /// All file paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        self.inner.read().files.keys().cloned().collect()
    }

    /// File stamps plus, per directory, the newest stamp beneath it.
    pub fn times(&self) -> WatchTimes {
        let inner = self.inner.read();
        let mut files = Timestamps::default();
        let mut contexts = Timestamps::default();
        for (path, entry) in &inner.files {
            files.insert(path.clone(), entry.mtime);
            let mut dir = dirname(path);
            loop {
                let stamp = contexts.entry(dir.to_owned()).or_insert(0);
                *stamp = (*stamp).max(entry.mtime);
                if dir == "/" {
                    break;
                }
                dir = dirname(dir);
            }
        }
        WatchTimes { files, contexts }
    }
}

/// Directory part of an absolute path. The root's directory is the root.
pub fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(at) => &path[..at],
    }
}

/// Last path segment.
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Join `rest` onto directory `base`. An empty `rest` yields `base`.
pub fn join(base: &str, rest: &str) -> String {
    let rest = rest.trim_start_matches('/');
    if rest.is_empty() {
        return base.to_owned();
    }
    format!("{}/{rest}", base.trim_end_matches('/'))
}

/// Resolve an import specifier against the importing module's path.
///
/// Relative (`./`, `../`) and absolute specifiers are supported. `.js` is
/// appended when the last segment has no extension. Bare specifiers do not
/// resolve.
pub fn resolve_specifier(importer: &str, specifier: &str) -> Option<String> {
    let joined = if specifier.starts_with('/') {
        specifier.to_owned()
    } else if specifier.starts_with("./") || specifier.starts_with("../") {
        join(dirname(importer), specifier)
    } else {
        return None;
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    let mut path = format!("/{}", segments.join("/"));
    if !basename(&path).contains('.') {
        path.push_str(".js");
    }
    Some(path)
}
