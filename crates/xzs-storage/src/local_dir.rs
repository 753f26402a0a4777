//! Local output directory backed by `tokio::fs`.

use async_trait::async_trait;
use std::io;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use crate::ArtifactStore;

/// Output directory on the local filesystem.
///
/// Relative paths that would leave the directory (absolute paths, `..`
/// components) are refused with `InvalidInput`.
#[derive(Debug, Clone)]
pub struct LocalDir {
    root: PathBuf,
}

impl LocalDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map a relative path into the directory.
    pub fn resolve(&self, relative: &Path) -> io::Result<PathBuf> {
        let escapes = relative.components().any(|c| {
            matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_))
        });
        if escapes || relative.as_os_str().is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not inside the output directory", relative.display()),
            ));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ArtifactStore for LocalDir {
    fn root(&self) -> &Path {
        &self.root
    }

    async fn exists(&self, relative: &Path) -> io::Result<bool> {
        let path = self.resolve(relative)?;
        fs::try_exists(&path).await
    }

    async fn remove(&self, relative: &Path) -> io::Result<()> {
        let path = self.resolve(relative)?;
        fs::remove_file(&path).await
    }
}
