//! Request dispatcher
//!
//! Resolution runs static lookup, then dynamic lookup, then module loading
//! and invocation. Every failure is reported as a [`DispatchError`]; turning
//! those into a uniform 404 is left to the HTTP boundary.

use super::fs::RouteFs;
use super::loader::{ModuleCache, ReloadPolicy};
use super::module::{HandlerOutput, InvocationContext, InvocationError, ModuleLoadError};
use super::resolve::{resolve_dynamic, resolve_static, Params, ResolvedRoute};
use super::translate::PathTranslator;
use crate::config::RoutesConfig;
use crate::logger;
use std::fmt;
use std::path::{Path, PathBuf};

/// Method and path of an incoming request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRequest {
    pub method: String,
    pub url_path: String,
}

impl RouteRequest {
    pub fn new(method: impl Into<String>, url_path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url_path: url_path.into(),
        }
    }
}

/// Why a request did not produce a handler result
#[derive(Debug)]
pub enum DispatchError {
    /// No static, index or dynamic file matched
    Miss,
    /// The module has no export for the method, `handler` or `default`
    NoMatchingExport { file_path: PathBuf, method: String },
    LoadFailure(ModuleLoadError),
    InvocationFailure {
        file_path: PathBuf,
        source: InvocationError,
    },
}

impl DispatchError {
    /// Failures worth an error log line, as opposed to plain misses
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::LoadFailure(_) | Self::InvocationFailure { .. })
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Miss => write!(f, "no route matched"),
            Self::NoMatchingExport { file_path, method } => write!(
                f,
                "'{}' has no export for {method}, handler or default",
                file_path.display()
            ),
            Self::LoadFailure(e) => write!(f, "module load failed: {e}"),
            Self::InvocationFailure { file_path, source } => {
                write!(f, "handler '{}' failed: {source}", file_path.display())
            }
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::LoadFailure(e) => Some(e),
            Self::InvocationFailure { source, .. } => Some(source),
            Self::Miss | Self::NoMatchingExport { .. } => None,
        }
    }
}

/// A handler that ran, with the route it was resolved from
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    pub route: ResolvedRoute,
    pub output: HandlerOutput,
}

/// Resolves requests against a routes tree and runs the matched handler
pub struct Dispatcher<F: RouteFs> {
    fs: F,
    translator: PathTranslator,
    extension: String,
    modules: ModuleCache,
}

impl<F: RouteFs> Dispatcher<F> {
    pub fn new(fs: F, routes: &RoutesConfig) -> Self {
        Self::with_parts(fs, &routes.root, &routes.extension, routes.reload)
    }

    pub fn with_parts(fs: F, root: &str, extension: &str, reload: ReloadPolicy) -> Self {
        Self {
            fs,
            translator: PathTranslator::new(root),
            extension: extension.trim_start_matches('.').to_string(),
            modules: ModuleCache::new(reload),
        }
    }

    /// Find the handler file for a request
    ///
    /// Static matches always win over the dynamic file of the same directory.
    pub async fn resolve(&self, req: &RouteRequest) -> Result<ResolvedRoute, DispatchError> {
        if req.url_path.split('/').any(|segment| segment == "..") {
            logger::log_debug(&format!("Rejected path with parent segment: {}", req.url_path));
            return Err(DispatchError::Miss);
        }

        let base = self.translator.translate(&req.url_path);

        if let Some(file_path) = resolve_static(&self.fs, &base, &self.extension).await {
            return Ok(ResolvedRoute {
                file_path,
                params: Params::new(),
            });
        }

        let root = self.translator.root();
        let Some(parent) = base.parent().filter(|p| within_root(p, &root)) else {
            return Err(DispatchError::Miss);
        };

        resolve_dynamic(&self.fs, parent, &req.url_path, &self.extension)
            .await
            .ok_or(DispatchError::Miss)
    }

    /// Resolve, load and invoke the handler for a request
    pub async fn dispatch(&self, req: &RouteRequest) -> Result<Dispatched, DispatchError> {
        let route = self.resolve(req).await?;
        logger::log_route_resolved(&req.method, &req.url_path, &route.file_path, &route.params);

        let module = self
            .modules
            .load(&self.fs, &route.file_path)
            .await
            .map_err(DispatchError::LoadFailure)?;

        let ctx = InvocationContext {
            method: &req.method,
            path: &req.url_path,
            params: &route.params,
        };
        let output = module
            .invoke(&self.fs, &ctx)
            .await
            .ok_or_else(|| DispatchError::NoMatchingExport {
                file_path: route.file_path.clone(),
                method: req.method.clone(),
            })?
            .map_err(|source| DispatchError::InvocationFailure {
                file_path: route.file_path.clone(),
                source,
            })?;

        Ok(Dispatched { route, output })
    }
}

fn within_root(dir: &Path, root: &Path) -> bool {
    dir.starts_with(root)
}
