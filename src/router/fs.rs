//! Route filesystem capability
//!
//! Everything the resolvers and the module loader need from the file system,
//! behind a trait so the routes tree can be served from disk or from memory.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// File system operations used during route resolution and module loading
#[allow(async_fn_in_trait)]
pub trait RouteFs {
    /// Whether `path` exists and is a regular file
    async fn is_file(&self, path: &Path) -> bool;

    /// Names of the entries directly inside `dir`, in listing order
    async fn read_dir_names(&self, dir: &Path) -> io::Result<Vec<String>>;

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    async fn modified(&self, path: &Path) -> io::Result<SystemTime>;

    async fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;
}

/// Real file system, backed by `tokio::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskFs;

impl RouteFs for DiskFs {
    async fn is_file(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .is_ok_and(|meta| meta.is_file())
    }

    async fn read_dir_names(&self, dir: &Path) -> io::Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            // Non UTF-8 names can never match a route file
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }
        Ok(names)
    }

    async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }

    async fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        tokio::fs::metadata(path).await?.modified()
    }

    async fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        tokio::fs::canonicalize(path).await
    }
}

#[cfg(test)]
pub use memory::MemoryFs;


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disk_fs_lists_and_reads() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.toml"), "[GET]\nreturns = 1\n").unwrap();
        std::fs::create_dir(dir.path().join("users")).unwrap();

        let fs = DiskFs;
        assert!(fs.is_file(&dir.path().join("index.toml")).await);
        assert!(!fs.is_file(&dir.path().join("users")).await);
        assert!(!fs.is_file(&dir.path().join("missing.toml")).await);

        let mut names = fs.read_dir_names(dir.path()).await.unwrap();
        names.sort();
        assert_eq!(names, vec!["index.toml".to_string(), "users".to_string()]);

        let contents = fs.read(&dir.path().join("index.toml")).await.unwrap();
        assert!(contents.starts_with(b"[GET]"));
        assert!(fs.read_dir_names(&dir.path().join("nope")).await.is_err());
    }

    #[tokio::test]
    async fn test_memory_fs_implicit_directories() {
        let fs = MemoryFs::with_files(&[
            ("api/index.toml", ""),
            ("api/users/[id].toml", ""),
            ("api/users/index.toml", ""),
        ]);

        assert!(fs.is_file(Path::new("./api//users/index.toml")).await);
        assert!(!fs.is_file(Path::new("api/users")).await);

        let names = fs.read_dir_names(Path::new("api")).await.unwrap();
        assert_eq!(names, vec!["index.toml".to_string(), "users".to_string()]);
        assert!(fs.read_dir_names(Path::new("api/posts")).await.is_err());
    }

    #[tokio::test]
    async fn test_memory_fs_write_bumps_modified() {
        let fs = MemoryFs::with_files(&[("api/a.toml", "one")]);
        let first = fs.modified(Path::new("api/a.toml")).await.unwrap();
        fs.write("api/a.toml", "two");
        let second = fs.modified(Path::new("api/a.toml")).await.unwrap();
        assert!(second > first);

        fs.remove("api/a.toml");
        assert!(fs.modified(Path::new("api/a.toml")).await.is_err());
    }
}
