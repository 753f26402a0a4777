//! Delete mode: pruning compressed artifacts of entries that are no longer
//! compressed.
//!
//! Builds are incremental. When a source file drops below the threshold, or
//! stops shrinking under compression, the `.xz` written by an earlier run
//! would otherwise stay in the output directory next to the new plain file.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use xzs_core::{NamePolicy, ReconcileError};

use crate::{ArtifactStore, LocalDir};

/// What the reconciler did for one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A stale artifact was deleted.
    Removed(PathBuf),
    /// No artifact existed.
    Absent,
    /// The compressed name equals the plain name, so the destination writer
    /// overwrites the old artifact; nothing was touched.
    Shadowed,
}

#[derive(Clone)]
pub struct StaleArtifactReconciler {
    store: Arc<dyn ArtifactStore>,
}

impl std::fmt::Debug for StaleArtifactReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaleArtifactReconciler")
            .field("root", &self.store.root())
            .finish()
    }
}

impl StaleArtifactReconciler {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store }
    }

    /// Reconciler over a local output directory.
    pub fn local(dir: impl Into<PathBuf>) -> Self {
        Self::new(Arc::new(LocalDir::new(dir)))
    }

    pub fn root(&self) -> &Path {
        self.store.root()
    }

    /// Remove the artifact `relative` would have produced had it been
    /// compressed under `naming`.
    pub async fn reconcile(
        &self,
        relative: &Path,
        naming: &NamePolicy,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let candidate = naming.output_name(relative, true);
        if candidate == relative {
            return Ok(ReconcileOutcome::Shadowed);
        }

        let fail = |source: io::Error| ReconcileError {
            path: self.store.display_path(&candidate),
            source,
        };

        if !self.store.exists(&candidate).await.map_err(fail)? {
            return Ok(ReconcileOutcome::Absent);
        }

        match self.store.remove(&candidate).await {
            Ok(()) => {
                let path = self.store.display_path(&candidate);
                tracing::info!(path = %path.display(), "removed stale artifact");
                Ok(ReconcileOutcome::Removed(path))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ReconcileOutcome::Absent),
            Err(e) => Err(fail(e)),
        }
    }
}
