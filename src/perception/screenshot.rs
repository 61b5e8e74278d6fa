use std::path::PathBuf;

use crate::browser::driver::PageDriver;
use crate::errors::ScoutResult;
use crate::perception::types::{artifact_stem, ProfileView};

const SNAPSHOT_EXT: &str = "png";

/// Transient per-profile snapshots plus the durable acceptance archive.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    work_dir: PathBuf,
    archive_dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(work_dir: PathBuf, archive_dir: PathBuf) -> Self {
        Self {
            work_dir,
            archive_dir,
        }
    }

    /// Screenshots the current page into the work dir. The returned view
    /// deletes the file when dropped.
    pub async fn capture<D: PageDriver>(&self, driver: &D, key: &str) -> ScoutResult<ProfileView> {
        let png = driver.screenshot().await?;
        tokio::fs::create_dir_all(&self.work_dir).await?;
        let path = self
            .work_dir
            .join(format!("{}.{SNAPSHOT_EXT}", artifact_stem(key)));
        tokio::fs::write(&path, &png).await?;
        tracing::debug!(path = %path.display(), bytes = png.len(), "snapshot captured");
        Ok(ProfileView::new(key.to_string(), path))
    }

    /// Copies a view's snapshot into the acceptance archive. The transient
    /// copy stays owned by the view.
    pub async fn archive(&self, view: &ProfileView) -> ScoutResult<PathBuf> {
        tokio::fs::create_dir_all(&self.archive_dir).await?;
        let file_name = view
            .snapshot_path()
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(format!("{}.{SNAPSHOT_EXT}", artifact_stem(&view.key))));
        let dest = self.archive_dir.join(file_name);
        tokio::fs::copy(view.snapshot_path(), &dest).await?;
        tracing::info!(key = %view.key, path = %dest.display(), "snapshot archived");
        Ok(dest)
    }
}

/// Post-mortem page captures written before a fatal error propagates.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticCapture {
    dir: Option<PathBuf>,
}

impl DiagnosticCapture {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir: Some(dir) }
    }

    pub fn disabled() -> Self {
        Self { dir: None }
    }

    /// Best effort: a failed capture is logged and yields `None` so the
    /// original error still reaches the caller.
    pub async fn capture<D: PageDriver>(&self, driver: &D, label: &str) -> Option<PathBuf> {
        let dir = self.dir.as_ref()?;
        let path = dir.join(format!("{label}_debug.{SNAPSHOT_EXT}"));
        let result: ScoutResult<()> = async {
            let png = driver.screenshot().await?;
            tokio::fs::create_dir_all(dir).await?;
            tokio::fs::write(&path, &png).await?;
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                tracing::info!(path = %path.display(), "diagnostic capture written");
                Some(path)
            }
            Err(e) => {
                tracing::warn!(error = %e, label, "diagnostic capture failed");
                None
            }
        }
    }
}
