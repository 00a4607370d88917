//! URL path to filesystem path translation

use std::path::PathBuf;

/// Maps request paths onto the routes root
#[derive(Debug, Clone)]
pub struct PathTranslator {
    root: String,
}

impl PathTranslator {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> PathBuf {
        PathBuf::from(&self.root)
    }

    /// Base path for `url_path`, without any extension
    ///
    /// The routes root and the URL are joined with a separator and every run
    /// of separators is collapsed. A trailing separator is kept, so
    /// `/users/` only ever resolves to `users/index.<ext>`.
    pub fn translate(&self, url_path: &str) -> PathBuf {
        let joined = format!("{}/{}", self.root, url_path);
        let mut collapsed = String::with_capacity(joined.len());
        for c in joined.chars() {
            if c == '/' && collapsed.ends_with('/') {
                continue;
            }
            collapsed.push(c);
        }
        PathBuf::from(collapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_nested_path() {
        let t = PathTranslator::new("./api");
        assert_eq!(t.translate("/users/42"), PathBuf::from("./api/users/42"));
    }

    #[test]
    fn test_translate_collapses_separators() {
        let t = PathTranslator::new("./api/");
        assert_eq!(t.translate("//users///42"), PathBuf::from("./api/users/42"));
    }

    #[test]
    fn test_translate_root_and_trailing_slash() {
        let t = PathTranslator::new("./api");
        assert_eq!(t.translate("/").to_str(), Some("./api/"));
        assert_eq!(t.translate("/users/").to_str(), Some("./api/users/"));
    }
}
