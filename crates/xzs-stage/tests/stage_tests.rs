//! End-to-end runs of the stage against a real output directory.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use xzs_stage::{Action, Cleanup, Codec, FileEntry, Options, PipelineStage, XzCodec};
use xzs_storage::ArtifactStore;

fn text(size: usize) -> Vec<u8> {
    b"lorem ipsum dolor sit amet ".iter().copied().cycle().take(size).collect()
}

fn stage_for(options: serde_json::Value) -> Result<PipelineStage> {
    Ok(PipelineStage::new(&Options::from_json_value(options)?)?)
}

/// Write emitted entries into `out`, as a destination step would.
async fn write_out(out: &Path, entry: FileEntry) -> Result<PathBuf> {
    let target = out.join(&entry.relative);
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let bytes = entry.payload.into_bytes()?;
    tokio::fs::write(&target, bytes).await?;
    Ok(target)
}

#[tokio::test]
async fn delete_mode_removes_artifact_of_shrunk_file() -> Result<()> {
    let tmp = TempDir::new()?;
    let out = tmp.path().join("out");

    let first = stage_for(json!({ "threshold": "1kb", "deleteMode": out }))?;
    let emitted = first.process(FileEntry::buffer("report.txt", text(5000))).await?;
    assert_eq!(emitted.action, Action::Compressed);
    assert!(matches!(emitted.cleanup, Cleanup::Skipped));
    let artifact = write_out(&out, emitted.entry).await?;
    assert_eq!(artifact, out.join("report.txt.xz"));

    let emitted = first.process(FileEntry::buffer("report.txt", text(100))).await?;
    assert_eq!(emitted.action, Action::PassedThrough);
    match &emitted.cleanup {
        Cleanup::Removed(path) => assert_eq!(path, &out.join("report.txt.xz")),
        other => panic!("expected removal, got {other:?}"),
    }
    assert!(!artifact.exists());
    write_out(&out, emitted.entry).await?;
    assert!(out.join("report.txt").exists());
    Ok(())
}

#[tokio::test]
async fn delete_mode_relative_to_cwd_option() -> Result<()> {
    let tmp = TempDir::new()?;
    std::fs::create_dir_all(tmp.path().join("dist/css"))?;
    std::fs::write(tmp.path().join("dist/css/site.css.xz"), b"stale")?;

    let stage = stage_for(json!({
        "threshold": 1024,
        "deleteMode": "dist",
        "deleteModeCwd": tmp.path(),
    }))?;
    assert_eq!(stage.config().delete_mode.as_deref(), Some(tmp.path().join("dist").as_path()));

    let emitted = stage.process(FileEntry::buffer("css/site.css", text(200))).await?;
    assert!(matches!(emitted.cleanup, Cleanup::Removed(_)));
    assert!(!tmp.path().join("dist/css/site.css.xz").exists());
    Ok(())
}

#[tokio::test]
async fn artifact_survives_without_delete_mode() -> Result<()> {
    let tmp = TempDir::new()?;
    std::fs::write(tmp.path().join("report.txt.xz"), b"stale")?;

    let stage = stage_for(json!({ "threshold": "1kb" }))?;
    let emitted = stage.process(FileEntry::buffer("report.txt", text(100))).await?;
    assert_eq!(emitted.action, Action::PassedThrough);
    assert!(matches!(emitted.cleanup, Cleanup::Skipped));
    assert!(tmp.path().join("report.txt.xz").exists());
    Ok(())
}

#[tokio::test]
async fn growth_guard_revert_removes_artifact() -> Result<()> {
    let tmp = TempDir::new()?;
    std::fs::write(tmp.path().join("tiny.txt.xz"), b"stale")?;

    let stage = stage_for(json!({ "skipGrowingFiles": true, "deleteMode": tmp.path() }))?;
    let emitted = stage.process(FileEntry::buffer("tiny.txt", b"0123456789".to_vec())).await?;
    assert_eq!(emitted.action, Action::Reverted);
    assert_eq!(emitted.entry.relative, PathBuf::from("tiny.txt"));
    assert!(matches!(emitted.cleanup, Cleanup::Removed(_)));
    assert!(!tmp.path().join("tiny.txt.xz").exists());
    Ok(())
}

#[tokio::test]
async fn missing_artifact_is_absent() -> Result<()> {
    let tmp = TempDir::new()?;
    let stage = stage_for(json!({ "threshold": "1kb", "deleteMode": tmp.path().join("never") }))?;
    let emitted = stage.process(FileEntry::buffer("a.txt", text(10))).await?;
    assert!(matches!(emitted.cleanup, Cleanup::Absent));
    Ok(())
}

#[tokio::test]
async fn pre_extension_artifact_removed() -> Result<()> {
    let tmp = TempDir::new()?;
    std::fs::write(tmp.path().join("app.xz.js"), b"stale")?;
    let stage = stage_for(json!({
        "threshold": "1kb",
        "preExtension": "xz",
        "deleteMode": tmp.path(),
    }))?;
    let emitted = stage.process(FileEntry::buffer("app.js", text(10))).await?;
    assert!(matches!(emitted.cleanup, Cleanup::Removed(_)));
    assert!(!tmp.path().join("app.xz.js").exists());
    Ok(())
}

#[tokio::test]
async fn failed_cleanup_still_emits_entry() -> Result<()> {
    struct Locked;

    #[async_trait]
    impl ArtifactStore for Locked {
        fn root(&self) -> &Path {
            Path::new("/locked")
        }
        async fn exists(&self, _relative: &Path) -> io::Result<bool> {
            Ok(true)
        }
        async fn remove(&self, _relative: &Path) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::PermissionDenied))
        }
    }

    let stage = stage_for(json!({ "threshold": "1kb" }))?.with_artifact_store(Arc::new(Locked));
    let input = text(100);
    let emitted = stage.process(FileEntry::buffer("a.txt", input.clone())).await?;
    assert_eq!(emitted.action, Action::PassedThrough);
    assert_eq!(emitted.entry.payload.as_bytes(), Some(input.as_slice()));
    let err = emitted.cleanup.error().expect("cleanup should fail");
    assert_eq!(err.path, PathBuf::from("/locked/a.txt.xz"));
    assert_eq!(err.source.kind(), io::ErrorKind::PermissionDenied);
    Ok(())
}

#[tokio::test]
async fn stream_mode_never_reconciles() -> Result<()> {
    let tmp = TempDir::new()?;
    std::fs::write(tmp.path().join("a.txt.xz"), b"stale")?;
    let stage = stage_for(json!({ "threshold": "1kb", "deleteMode": tmp.path() }))?;

    let emitted = stage.process(FileEntry::stream("a.txt", Cursor::new(text(10)))).await?;
    assert_eq!(emitted.action, Action::Compressed);
    assert!(matches!(emitted.cleanup, Cleanup::Skipped));
    assert!(tmp.path().join("a.txt.xz").exists());
    Ok(())
}

#[tokio::test]
async fn buffered_streams_reconcile() -> Result<()> {
    let tmp = TempDir::new()?;
    std::fs::write(tmp.path().join("a.txt.xz"), b"stale")?;
    let stage = stage_for(json!({
        "threshold": "1kb",
        "deleteMode": tmp.path(),
        "bufferStreams": true,
    }))?;

    let emitted = stage.process(FileEntry::stream("a.txt", Cursor::new(text(10)))).await?;
    assert_eq!(emitted.action, Action::PassedThrough);
    assert!(matches!(emitted.cleanup, Cleanup::Removed(_)));
    Ok(())
}

#[tokio::test]
async fn threshold_sweep() -> Result<()> {
    let stage = stage_for(json!({ "threshold": 2048 }))?;
    for size in [0usize, 1, 2047, 2048, 2049, 10_000] {
        let input = text(size);
        let emitted = stage.process(FileEntry::buffer("f.bin", input.clone())).await?;
        if size >= 2048 {
            assert_eq!(emitted.action, Action::Compressed, "size {size}");
            assert_eq!(emitted.entry.relative, PathBuf::from("f.bin.xz"));
            let bytes = emitted.entry.payload.as_bytes().unwrap_or_default();
            assert_eq!(XzCodec.decompress(bytes)?, input);
        } else {
            assert_eq!(emitted.action, Action::PassedThrough, "size {size}");
            assert_eq!(emitted.entry.payload.as_bytes(), Some(input.as_slice()));
        }
    }
    Ok(())
}

#[tokio::test]
async fn rejects_bad_options_up_front() {
    for bad in [
        json!({ "threshold": 1.5 }),
        json!({ "threshold": "lots" }),
        json!({ "deleteMode": true }),
        json!({ "extension": ".xz" }),
        json!({ "compressionLevel": 9 }),
    ] {
        let result = Options::from_json_value(bad.clone()).and_then(|o| PipelineStage::new(&o));
        assert!(result.is_err(), "{bad}");
    }
}
