use crate::core::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Scratch directory owned by exactly one run.
///
/// Everything the download tool writes lands under `<temp root>/<id>/`.
#[derive(Debug)]
pub struct TempWorkspace {
    id: String,
    root: PathBuf,
    dir: PathBuf,
}

impl TempWorkspace {
    pub async fn create(temp_root: &Path) -> Result<Self> {
        let id = Uuid::new_v4().to_string();
        let dir = temp_root.join(&id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| Error::io(&dir, e))?;
        debug!("created temp workspace {}", dir.display());

        Ok(Self {
            id,
            root: temp_root.to_path_buf(),
            dir,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the download template puts the info json.
    pub fn sidecar_path(&self) -> PathBuf {
        self.dir.join("video.info.json")
    }

    /// Regular files currently in the workspace, sorted by name.
    pub async fn files(&self) -> Result<Vec<PathBuf>> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| Error::io(&self.dir, e))?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| Error::io(&self.dir, e))? {
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if is_file {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    /// Remove the workspace and anything in the temp root carrying its id.
    ///
    /// Never fails; leftovers are logged.
    pub async fn cleanup(self) {
        if let Err(e) = tokio::fs::remove_dir_all(&self.dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("could not remove {}: {}", self.dir.display(), e);
            }
        }

        let Ok(mut entries) = tokio::fs::read_dir(&self.root).await else {
            return;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            if !entry.file_name().to_string_lossy().starts_with(&self.id) {
                continue;
            }
            let path = entry.path();
            let removed = match entry.file_type().await {
                Ok(t) if t.is_dir() => tokio::fs::remove_dir_all(&path).await,
                _ => tokio::fs::remove_file(&path).await,
            };
            if let Err(e) = removed {
                warn!("could not remove {}: {}", path.display(), e);
            }
        }
        debug!("cleared temp workspace {}", self.id);
    }
}
