//! Pipeline stage: gates, compresses, guards, renames and reconciles one
//! entry at a time.

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use xzs_codec::{ByteStream, Codec, XzCodec};
use xzs_core::{
    Config, ConfigError, FileEntry, Options, Payload, ReconcileError, StageError,
};
use xzs_storage::{ArtifactStore, ReconcileOutcome, StaleArtifactReconciler};

use crate::decision::should_compress;
use crate::guard::maybe_revert;

/// Path an entry took through the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Emitted compressed and renamed.
    Compressed,
    /// Below the threshold; codec never ran.
    PassedThrough,
    /// Compressed, but the result was not smaller and was discarded.
    Reverted,
}

/// Delete-mode result for one entry.
#[derive(Debug)]
pub enum Cleanup {
    /// Delete mode off, or the entry was compressed.
    Skipped,
    Removed(PathBuf),
    Absent,
    /// Compressed and plain names coincide; nothing to remove.
    Shadowed,
    /// Removal failed. The entry is still emitted.
    Failed(ReconcileError),
}

impl Cleanup {
    pub fn error(&self) -> Option<&ReconcileError> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Entry leaving the stage.
#[derive(Debug)]
pub struct Emitted<M = ()> {
    pub entry: FileEntry<M>,
    pub action: Action,
    pub cleanup: Cleanup,
}

impl<M> Emitted<M> {
    pub fn compressed(&self) -> bool {
        self.action == Action::Compressed
    }
}

/// Counters collected by [`PipelineStage::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub compressed: usize,
    pub passed_through: usize,
    pub reverted: usize,
    pub failed: usize,
    pub removed_artifacts: usize,
    pub cleanup_failures: usize,
}

impl RunSummary {
    pub fn record<M>(&mut self, result: &Result<Emitted<M>, StageError>) {
        let emitted = match result {
            Ok(emitted) => emitted,
            Err(_) => {
                self.failed += 1;
                return;
            }
        };
        match emitted.action {
            Action::Compressed => self.compressed += 1,
            Action::PassedThrough => self.passed_through += 1,
            Action::Reverted => self.reverted += 1,
        }
        match emitted.cleanup {
            Cleanup::Removed(_) => self.removed_artifacts += 1,
            Cleanup::Failed(_) => self.cleanup_failures += 1,
            _ => {}
        }
    }

    pub fn total(&self) -> usize {
        self.compressed + self.passed_through + self.reverted + self.failed
    }
}

/// The compression stage. Cheap to clone; clones share the read-only
/// config, the codec and the delete-mode store.
#[derive(Clone)]
pub struct PipelineStage {
    config: Arc<Config>,
    codec: Arc<dyn Codec>,
    reconciler: Option<StaleArtifactReconciler>,
}

impl std::fmt::Debug for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineStage")
            .field("config", &self.config)
            .field("codec", &self.codec.name())
            .field("reconciler", &self.reconciler)
            .finish()
    }
}

impl PipelineStage {
    /// Build a stage from caller options. Invalid options fail here, before
    /// any entry is seen.
    pub fn new(options: &Options) -> Result<Self, ConfigError> {
        Ok(Self::from_config(Config::from_options(options)?))
    }

    pub fn from_json_str(options: &str) -> Result<Self, ConfigError> {
        Ok(Self::from_config(Config::from_json_str(options)?))
    }

    pub fn from_config(config: Config) -> Self {
        let reconciler = config.delete_mode.clone().map(StaleArtifactReconciler::local);
        Self {
            config: Arc::new(config),
            codec: Arc::new(XzCodec::new()),
            reconciler,
        }
    }

    /// Swap the codec. The `append` naming rule follows its suffix.
    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        let naming = self.config.naming.clone().with_suffix(codec.suffix());
        Arc::make_mut(&mut self.config).naming = naming;
        self.codec = codec;
        self
    }

    /// Use `store` for delete mode, enabling it if the options did not.
    pub fn with_artifact_store(mut self, store: Arc<dyn ArtifactStore>) -> Self {
        self.reconciler = Some(StaleArtifactReconciler::new(store));
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn codec(&self) -> &dyn Codec {
        self.codec.as_ref()
    }

    /// Run one entry through the stage.
    ///
    /// Buffers come out as buffers and streams as streams. On a codec error
    /// the entry is consumed and the error names it; the stage itself stays
    /// usable.
    pub async fn process<M>(&self, entry: FileEntry<M>) -> Result<Emitted<M>, StageError> {
        let FileEntry {
            base,
            relative,
            payload,
            mut content_encoding,
            metadata,
        } = entry;
        let path = base.join(&relative);

        let (payload, action) = match payload {
            Payload::Buffer(bytes) => {
                let (bytes, action) = self.transform_buffer(&path, bytes).await?;
                (Payload::Buffer(bytes), action)
            }
            Payload::Stream(reader) if self.config.buffer_streams => {
                let bytes = drain(&path, reader).await?;
                let (bytes, action) = self.transform_buffer(&path, bytes).await?;
                (Payload::stream(Cursor::new(bytes)), action)
            }
            Payload::Stream(reader) => {
                let reader = self.transform_stream(&path, reader)?;
                (Payload::Stream(reader), Action::Compressed)
            }
        };

        let did_compress = action == Action::Compressed;
        let cleanup = if did_compress {
            Cleanup::Skipped
        } else {
            self.reconcile(&relative).await
        };

        let relative = self.config.naming.output_name(&relative, did_compress);
        if did_compress {
            content_encoding.push(self.codec.name().to_string());
        }
        debug!(path = %path.display(), ?action, output = %relative.display(), "entry processed");

        Ok(Emitted {
            entry: FileEntry {
                base,
                relative,
                payload,
                content_encoding,
                metadata,
            },
            action,
            cleanup,
        })
    }

    /// Process entries one after another, keeping input order.
    pub async fn process_all<M, I>(&self, entries: I) -> Vec<Result<Emitted<M>, StageError>>
    where
        I: IntoIterator<Item = FileEntry<M>>,
    {
        let mut out = Vec::new();
        for entry in entries {
            out.push(self.process(entry).await);
        }
        out
    }

    /// Process up to `limit` entries at once. Results come back in input
    /// order.
    pub async fn process_concurrent<M, I>(
        &self,
        entries: I,
        limit: usize,
    ) -> Vec<Result<Emitted<M>, StageError>>
    where
        M: Send + 'static,
        I: IntoIterator<Item = FileEntry<M>>,
    {
        let limit = limit.max(1);
        let mut pending = entries.into_iter().enumerate();
        let mut paths = Vec::new();
        let mut slots: Vec<Option<Result<Emitted<M>, StageError>>> = Vec::new();
        let mut set = JoinSet::new();

        loop {
            while set.len() < limit {
                let Some((idx, entry)) = pending.next() else { break };
                paths.push(entry.path());
                slots.push(None);
                let stage = self.clone();
                set.spawn(async move { (idx, stage.process(entry).await) });
            }
            let Some(joined) = set.join_next().await else { break };
            match joined {
                Ok((idx, result)) => slots[idx] = Some(result),
                Err(e) => warn!(error = %e, "stage task did not complete"),
            }
        }

        slots
            .into_iter()
            .zip(paths)
            .map(|(slot, entry)| {
                slot.unwrap_or_else(|| {
                    Err(StageError::Worker {
                        entry,
                        reason: "task aborted".into(),
                    })
                })
            })
            .collect()
    }

    /// Drive the stage between a source and a sink channel.
    ///
    /// Entries are emitted in the order received. Per-entry errors are sent
    /// downstream and processing continues. Returns once the source is
    /// exhausted or the sink is closed.
    pub async fn run<M>(
        &self,
        mut source: mpsc::Receiver<FileEntry<M>>,
        sink: mpsc::Sender<Result<Emitted<M>, StageError>>,
    ) -> RunSummary {
        let mut summary = RunSummary::default();
        while let Some(entry) = source.recv().await {
            let result = self.process(entry).await;
            summary.record(&result);
            if sink.send(result).await.is_err() {
                debug!("sink closed, stopping stage");
                break;
            }
        }
        info!(
            compressed = summary.compressed,
            passed_through = summary.passed_through,
            reverted = summary.reverted,
            failed = summary.failed,
            removed_artifacts = summary.removed_artifacts,
            "stage run finished"
        );
        summary
    }

    async fn transform_buffer(&self, path: &Path, bytes: Vec<u8>) -> Result<(Vec<u8>, Action), StageError> {
        let size = bytes.len() as u64;
        if !should_compress(size, self.config.threshold) {
            debug!(path = %path.display(), size, threshold = %self.config.threshold, "below threshold");
            return Ok((bytes, Action::PassedThrough));
        }

        let codec = Arc::clone(&self.codec);
        let config = Arc::clone(&self.config);
        let (original, compressed) = tokio::task::spawn_blocking(move || {
            let compressed = codec.compress_buffer(&bytes, &config.lzma_options);
            (bytes, compressed)
        })
        .await
        .map_err(|e| StageError::Worker {
            entry: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let compressed = compressed.map_err(|source| {
            warn!(path = %path.display(), error = %source, "compression failed");
            StageError::Codec {
                entry: path.to_path_buf(),
                source,
            }
        })?;

        if !self.config.skip_growing_files {
            return Ok((compressed, Action::Compressed));
        }

        let compressed_len = compressed.len();
        let guarded = maybe_revert(original, compressed);
        if guarded.did_compress {
            Ok((guarded.payload, Action::Compressed))
        } else {
            debug!(path = %path.display(), size, compressed_len, "compression grew entry, keeping original");
            Ok((guarded.payload, Action::Reverted))
        }
    }

    fn transform_stream(&self, path: &Path, reader: ByteStream) -> Result<ByteStream, StageError> {
        self.codec
            .compress_stream(reader, &self.config.lzma_options)
            .map_err(|source| {
                warn!(path = %path.display(), error = %source, "stream compression failed");
                StageError::Codec {
                    entry: path.to_path_buf(),
                    source,
                }
            })
    }

    async fn reconcile(&self, relative: &Path) -> Cleanup {
        let Some(reconciler) = &self.reconciler else {
            return Cleanup::Skipped;
        };
        match reconciler.reconcile(relative, &self.config.naming).await {
            Ok(ReconcileOutcome::Removed(path)) => Cleanup::Removed(path),
            Ok(ReconcileOutcome::Absent) => Cleanup::Absent,
            Ok(ReconcileOutcome::Shadowed) => Cleanup::Shadowed,
            Err(e) => {
                warn!(path = %e.path.display(), error = %e.source, "stale artifact cleanup failed");
                Cleanup::Failed(e)
            }
        }
    }
}

/// Read a stream to the end on a blocking worker. The reader is dropped
/// on every path.
async fn drain(path: &Path, mut reader: ByteStream) -> Result<Vec<u8>, StageError> {
    tokio::task::spawn_blocking(move || {
        let mut out = Vec::new();
        reader.read_to_end(&mut out).map(|_| out)
    })
    .await
    .map_err(|e| StageError::Worker {
        entry: path.to_path_buf(),
        reason: e.to_string(),
    })?
    .map_err(|source| StageError::Read {
        entry: path.to_path_buf(),
        source,
    })
}
