//! Watch descriptor to path registry.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Maps live watch descriptors to the normalized paths they watch.
///
/// The kernel recycles descriptor numbers once a watch is gone, so
/// [`insert`](Self::insert) always replaces and [`remove`](Self::remove)
/// never depends on the kernel agreeing.
#[derive(Debug, Default, Clone)]
pub struct WatchRegistry {
    watches: HashMap<i32, PathBuf>,
}

impl WatchRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `wd -> path`, replacing any previous entry for `wd`.
    ///
    /// Returns the path the descriptor used to resolve to.
    pub fn insert(&mut self, wd: i32, path: PathBuf) -> Option<PathBuf> {
        self.watches.insert(wd, path)
    }

    /// Forget `wd`. Unknown descriptors are ignored.
    pub fn remove(&mut self, wd: i32) -> Option<PathBuf> {
        self.watches.remove(&wd)
    }

    /// Path registered for `wd`, if any.
    #[must_use]
    pub fn resolve(&self, wd: i32) -> Option<&Path> {
        self.watches.get(&wd).map(PathBuf::as_path)
    }

    /// Number of registered watches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.watches.len()
    }

    /// Check if no watches are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }

    /// Iterate over `(descriptor, path)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &Path)> {
        self.watches.iter().map(|(wd, path)| (*wd, path.as_path()))
    }
}

/// Lexically normalize a path without touching the filesystem.
///
/// Collapses repeated separators, `.` components and `dir/..` pairs. An
/// empty path becomes `.`. Symlinks are not resolved.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    path_clean::clean(path)
}
