//! Output-directory access for delete mode.

pub mod local_dir;
pub mod reconcile;

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};

pub use local_dir::LocalDir;
pub use reconcile::{ReconcileOutcome, StaleArtifactReconciler};

/// Filesystem collaborator scoped to one output directory. Paths are
/// relative to [`ArtifactStore::root`].
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    fn root(&self) -> &Path;

    async fn exists(&self, relative: &Path) -> io::Result<bool>;

    /// Remove a file. Reports `NotFound` when it is already gone.
    async fn remove(&self, relative: &Path) -> io::Result<()>;

    /// Full path of `relative` inside the store, for reporting.
    fn display_path(&self, relative: &Path) -> PathBuf {
        self.root().join(relative)
    }
}
