//! Static and dynamic route resolution
//!
//! Static resolution looks for `<base>.<ext>` and then `<base>/index.<ext>`.
//! Dynamic resolution runs only when both are missing and scans the parent
//! directory of the base path for a single `[param].<ext>` file.

use super::fs::RouteFs;
use crate::logger;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Parameters extracted from the URL (at most one entry)
pub type Params = BTreeMap<String, String>;

/// A handler file matched for a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoute {
    pub file_path: PathBuf,
    pub params: Params,
}

/// A `[param].<ext>` file found in a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicSegment {
    pub file_name: String,
    pub param_name: String,
}

impl DynamicSegment {
    /// Recognise `[identifier].<ext>` where the identifier is ASCII alphanumeric
    pub fn parse(file_name: &str, extension: &str) -> Option<Self> {
        let inner = file_name
            .strip_prefix('[')?
            .strip_suffix(extension)?
            .strip_suffix('.')?
            .strip_suffix(']')?;

        if inner.is_empty() || !inner.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }

        Some(Self {
            file_name: file_name.to_string(),
            param_name: inner.to_string(),
        })
    }
}

/// Exact file first, then the directory's index file
pub async fn resolve_static<F: RouteFs>(fs: &F, base: &Path, extension: &str) -> Option<PathBuf> {
    let mut exact = base.as_os_str().to_owned();
    exact.push(".");
    exact.push(extension);
    let exact = PathBuf::from(exact);
    if fs.is_file(&exact).await {
        return Some(exact);
    }

    let index = base.join(format!("index.{extension}"));
    if fs.is_file(&index).await {
        return Some(index);
    }

    None
}

/// Match the single dynamic file of `parent_dir`
///
/// The parameter value is always the last non-empty segment of `url_path`,
/// whatever depth the dynamic file sits at.
pub async fn resolve_dynamic<F: RouteFs>(
    fs: &F,
    parent_dir: &Path,
    url_path: &str,
    extension: &str,
) -> Option<ResolvedRoute> {
    let mut names = match fs.read_dir_names(parent_dir).await {
        Ok(names) => names,
        Err(e) => {
            logger::log_debug(&format!(
                "Dynamic lookup skipped, cannot read '{}': {e}",
                parent_dir.display()
            ));
            return None;
        }
    };
    names.sort();

    let mut candidates = Vec::new();
    for segment in names
        .iter()
        .filter_map(|name| DynamicSegment::parse(name, extension))
    {
        // Directories can carry bracket names too
        if fs.is_file(&parent_dir.join(&segment.file_name)).await {
            candidates.push(segment);
        }
    }
    let mut candidates = candidates.into_iter();
    let segment = candidates.next()?;
    let ignored: Vec<String> = candidates.map(|c| c.file_name).collect();
    if !ignored.is_empty() {
        logger::log_warning(&format!(
            "Multiple dynamic routes in '{}', using '{}' and ignoring {ignored:?}",
            parent_dir.display(),
            segment.file_name
        ));
    }

    let value = last_segment(url_path)?;

    let mut params = Params::new();
    params.insert(segment.param_name, value.to_string());

    Some(ResolvedRoute {
        file_path: parent_dir.join(&segment.file_name),
        params,
    })
}

/// Last non-empty `/`-separated segment of a URL path
pub fn last_segment(url_path: &str) -> Option<&str> {
    url_path.split('/').rfind(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::fs::MemoryFs;

    #[test]
    fn test_parse_dynamic_segment() {
        let seg = DynamicSegment::parse("[id].toml", "toml").unwrap();
        assert_eq!(seg.param_name, "id");
        assert_eq!(seg.file_name, "[id].toml");

        assert!(DynamicSegment::parse("[userId2].toml", "toml").is_some());
        assert!(DynamicSegment::parse("[].toml", "toml").is_none());
        assert!(DynamicSegment::parse("[id].js", "toml").is_none());
        assert!(DynamicSegment::parse("[user-id].toml", "toml").is_none());
        assert!(DynamicSegment::parse("id.toml", "toml").is_none());
        assert!(DynamicSegment::parse("x[id].toml", "toml").is_none());
    }

    #[test]
    fn test_last_segment() {
        assert_eq!(last_segment("/users/42"), Some("42"));
        assert_eq!(last_segment("/users/42/"), Some("42"));
        assert_eq!(last_segment("//a//b//"), Some("b"));
        assert_eq!(last_segment("/"), None);
    }

    #[tokio::test]
    async fn test_static_exact_before_index() {
        let fs = MemoryFs::with_files(&[
            ("api/users.toml", ""),
            ("api/users/index.toml", ""),
        ]);
        let found = resolve_static(&fs, Path::new("api/users"), "toml").await;
        assert_eq!(found, Some(PathBuf::from("api/users.toml")));
    }

    #[tokio::test]
    async fn test_static_index_fallback() {
        let fs = MemoryFs::with_files(&[("api/users/index.toml", "")]);
        let found = resolve_static(&fs, Path::new("api/users"), "toml").await;
        assert_eq!(found, Some(PathBuf::from("api/users/index.toml")));

        let found = resolve_static(&fs, Path::new("api/"), "toml").await;
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn test_static_ignores_other_extensions() {
        let fs = MemoryFs::with_files(&[("api/users.js", "")]);
        assert_eq!(resolve_static(&fs, Path::new("api/users"), "toml").await, None);
    }

    #[tokio::test]
    async fn test_dynamic_extracts_last_segment() {
        let fs = MemoryFs::with_files(&[("api/users/[id].toml", ""), ("api/users/index.toml", "")]);
        let route = resolve_dynamic(&fs, Path::new("api/users"), "/users/42", "toml")
            .await
            .unwrap();
        assert_eq!(route.file_path, PathBuf::from("api/users/[id].toml"));
        assert_eq!(route.params.get("id").map(String::as_str), Some("42"));
        assert_eq!(route.params.len(), 1);
    }

    #[tokio::test]
    async fn test_dynamic_first_match_wins() {
        let fs = MemoryFs::with_files(&[("api/posts/[slug].toml", ""), ("api/posts/[id].toml", "")]);
        let route = resolve_dynamic(&fs, Path::new("api/posts"), "/posts/hello", "toml")
            .await
            .unwrap();
        assert_eq!(route.file_path, PathBuf::from("api/posts/[id].toml"));
        assert_eq!(route.params.get("id").map(String::as_str), Some("hello"));
    }

    #[tokio::test]
    async fn test_dynamic_skips_bracket_directories() {
        let fs = MemoryFs::with_files(&[
            ("api/users/[a].toml/index.toml", ""),
            ("api/users/[b].toml", ""),
        ]);
        let route = resolve_dynamic(&fs, Path::new("api/users"), "/users/5", "toml")
            .await
            .unwrap();
        assert_eq!(route.file_path, PathBuf::from("api/users/[b].toml"));
        assert_eq!(route.params.get("b").map(String::as_str), Some("5"));

        let fs = MemoryFs::with_files(&[("api/users/[a].toml/index.toml", "")]);
        assert!(resolve_dynamic(&fs, Path::new("api/users"), "/users/5", "toml")
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_dynamic_missing_directory_is_a_miss() {
        let fs = MemoryFs::with_files(&[("api/index.toml", "")]);
        assert!(resolve_dynamic(&fs, Path::new("api/nope"), "/nope/1", "toml")
            .await
            .is_none());
        assert!(resolve_dynamic(&fs, Path::new("api"), "/1", "toml").await.is_none());
    }
}
