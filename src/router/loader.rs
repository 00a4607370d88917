//! Handler module cache
//!
//! Modules are cached by absolute path together with the file's modification
//! time. Under [`ReloadPolicy::Always`] every load evicts the cached entry and
//! parses the file again, so edits show up on the next request.

use super::fs::RouteFs;
use super::module::{HandlerModule, ModuleLoadError};
use crate::logger;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

/// When a cached module is parsed again
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReloadPolicy {
    /// Evict and reload on every dispatch
    #[default]
    Always,
    /// Reload only when the modification time changed
    Modified,
}

struct CachedModule {
    modified: Option<SystemTime>,
    module: Arc<HandlerModule>,
}

/// Process-wide module cache keyed by absolute path
pub struct ModuleCache {
    policy: ReloadPolicy,
    entries: Mutex<HashMap<PathBuf, CachedModule>>,
}

impl ModuleCache {
    pub fn new(policy: ReloadPolicy) -> Self {
        Self {
            policy,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<PathBuf, CachedModule>> {
        // A panic while holding the lock cannot leave a half-written entry
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load the module at `path`, honouring the reload policy
    pub async fn load<F: RouteFs>(
        &self,
        fs: &F,
        path: &Path,
    ) -> Result<Arc<HandlerModule>, ModuleLoadError> {
        let absolute = fs
            .canonicalize(path)
            .await
            .map_err(|source| ModuleLoadError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        if self.policy == ReloadPolicy::Modified {
            let modified = fs.modified(&absolute).await.ok();
            let cached = self.entries().get(&absolute).and_then(|entry| {
                (entry.modified.is_some() && entry.modified == modified)
                    .then(|| Arc::clone(&entry.module))
            });
            if let Some(module) = cached {
                return Ok(module);
            }
        }

        self.reload(fs, &absolute).await
    }

    /// Evict `path` and parse it from the file system again
    pub async fn reload<F: RouteFs>(
        &self,
        fs: &F,
        absolute: &Path,
    ) -> Result<Arc<HandlerModule>, ModuleLoadError> {
        if self.invalidate(absolute) {
            logger::log_debug(&format!("Evicted cached module '{}'", absolute.display()));
        }

        let modified = fs.modified(absolute).await.ok();
        let bytes = fs
            .read(absolute)
            .await
            .map_err(|source| ModuleLoadError::Read {
                path: absolute.to_path_buf(),
                source,
            })?;
        let source = String::from_utf8(bytes).map_err(|e| ModuleLoadError::Parse {
            path: absolute.to_path_buf(),
            message: e.to_string(),
        })?;

        let module = Arc::new(HandlerModule::parse(absolute, &source)?);
        self.entries().insert(
            absolute.to_path_buf(),
            CachedModule {
                modified,
                module: Arc::clone(&module),
            },
        );
        Ok(module)
    }

    /// Drop the cached module for `absolute`, returning whether one was cached
    pub fn invalidate(&self, absolute: &Path) -> bool {
        self.entries().remove(absolute).is_some()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    #[cfg(test)]
    pub fn contains(&self, absolute: &Path) -> bool {
        self.entries().contains_key(absolute)
    }
}
