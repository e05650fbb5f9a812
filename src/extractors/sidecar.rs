use crate::core::error::{Error, Result};
use crate::core::metadata::{RetrievedMetadata, Sidecar};
use crate::core::workspace::TempWorkspace;
use crate::core::MetadataExtractor;
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const THUMBNAIL_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "gif"];
const THUMBNAIL_STEM: &str = "thumbnail";

/// Reads yt-dlp's info json from the workspace.
#[derive(Debug, Default, Clone)]
pub struct SidecarJsonExtractor;

impl SidecarJsonExtractor {
    pub fn new() -> Self {
        Self
    }

    pub async fn read_sidecar(workspace: &TempWorkspace) -> Result<Sidecar> {
        let path = workspace.sidecar_path();
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(Error::DownloadArtifactMissing(
                "no sidecar metadata produced, download probably failed".to_string(),
            ));
        }
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| Error::io(&path, e))?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[async_trait]
impl MetadataExtractor for SidecarJsonExtractor {
    fn name(&self) -> &'static str {
        "sidecar-json"
    }

    fn uses_sidecar(&self) -> bool {
        true
    }

    async fn extract(&self, workspace: &TempWorkspace) -> Result<RetrievedMetadata> {
        let sidecar = Self::read_sidecar(workspace).await?;
        let files = workspace.files().await?;

        let reported = sidecar
            .filename
            .as_deref()
            .filter(|f| !f.is_empty())
            .map(|f| resolve_in(workspace.dir(), f));
        let source_file = locate_media(reported.as_deref(), &files).ok_or_else(|| {
            Error::DownloadArtifactMissing(format!(
                "sidecar names {:?} but no media file was produced",
                sidecar.filename
            ))
        })?;
        debug!("media file: {}", source_file.display());

        let thumbnail = if sidecar.thumbnail.is_some() {
            let found = find_thumbnail(&files, &source_file);
            if found.is_none() {
                warn!("sidecar lists a thumbnail but none was written");
            }
            found
        } else {
            None
        };

        Ok(RetrievedMetadata {
            title: sidecar.title_or_unknown(),
            id: sidecar.id_or_unknown(),
            source_file,
            thumbnail,
            sidecar: Some(workspace.sidecar_path()),
            auxiliary: None,
        })
    }
}

/// Relative names are taken inside the workspace, never the process
/// working directory.
fn resolve_in(dir: &Path, reported: &str) -> PathBuf {
    let path = PathBuf::from(reported);
    if path.is_absolute() {
        return path;
    }
    let nested = dir.join(&path);
    if nested.exists() {
        return nested;
    }
    dir.join(path.file_name().map(PathBuf::from).unwrap_or(path))
}

/// The reported file if it exists, else a workspace file with the same stem
/// (yt-dlp may report the pre-merge extension).
fn locate_media(reported: Option<&Path>, files: &[PathBuf]) -> Option<PathBuf> {
    let reported = reported?;
    if reported.is_file() {
        return Some(reported.to_path_buf());
    }
    let stem = reported.file_stem()?;
    files
        .iter()
        .filter(|f| f.file_stem() == Some(stem))
        .find(|f| !is_auxiliary_file(f))
        .cloned()
}

fn is_auxiliary_file(path: &Path) -> bool {
    let name = path.file_name().map(|n| n.to_string_lossy().to_lowercase()).unwrap_or_default();
    name.ends_with(".json") || name.ends_with(".part") || name.ends_with(".ytdl") || is_image(path)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .map(|e| THUMBNAIL_EXTENSIONS.contains(&e.as_str()))
        .unwrap_or(false)
}

fn find_thumbnail(files: &[PathBuf], media: &Path) -> Option<PathBuf> {
    let media_stem = media.file_stem();
    files
        .iter()
        .filter(|f| is_image(f))
        .find(|f| {
            let stem = f.file_stem();
            stem == Some(OsStr::new(THUMBNAIL_STEM)) || stem == media_stem
        })
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_sidecar_is_fatal() {
        let root = tempfile::tempdir().unwrap();
        let ws = TempWorkspace::create(root.path()).await.unwrap();

        let err = SidecarJsonExtractor::new().extract(&ws).await.unwrap_err();
        assert!(matches!(err, Error::DownloadArtifactMissing(_)));
        assert!(err.to_string().contains("download probably failed"));
    }

    #[tokio::test]
    async fn test_reads_sidecar_and_thumbnail() {
        let root = tempfile::tempdir().unwrap();
        let ws = TempWorkspace::create(root.path()).await.unwrap();
        let media = ws.dir().join("video.mkv");
        std::fs::write(&media, b"media").unwrap();
        std::fs::write(ws.dir().join("thumbnail.webp"), b"img").unwrap();
        let sidecar = serde_json::json!({
            "_filename": media.display().to_string(),
            "title": "Example: Video",
            "id": "abc123",
            "thumbnail": "https://i.ytimg.com/vi/abc123/maxresdefault.webp",
        });
        std::fs::write(ws.sidecar_path(), sidecar.to_string()).unwrap();

        let meta = SidecarJsonExtractor::new().extract(&ws).await.unwrap();
        assert_eq!(meta.title, "Example: Video");
        assert_eq!(meta.id, "abc123");
        assert_eq!(meta.source_file, media);
        assert_eq!(meta.thumbnail, Some(ws.dir().join("thumbnail.webp")));
        assert_eq!(meta.sidecar, Some(ws.sidecar_path()));
    }

    #[tokio::test]
    async fn test_merged_extension_and_missing_fields() {
        let root = tempfile::tempdir().unwrap();
        let ws = TempWorkspace::create(root.path()).await.unwrap();
        std::fs::write(ws.dir().join("video.mkv"), b"media").unwrap();
        let sidecar = serde_json::json!({
            "_filename": ws.dir().join("video.webm").display().to_string(),
        });
        std::fs::write(ws.sidecar_path(), sidecar.to_string()).unwrap();

        let meta = SidecarJsonExtractor::new().extract(&ws).await.unwrap();
        assert_eq!(meta.source_file, ws.dir().join("video.mkv"));
        assert_eq!(meta.title, "unknown");
        assert_eq!(meta.id, "unknown");
        assert_eq!(meta.thumbnail, None);
    }

    #[tokio::test]
    async fn test_sidecar_without_media() {
        let root = tempfile::tempdir().unwrap();
        let ws = TempWorkspace::create(root.path()).await.unwrap();
        std::fs::write(ws.sidecar_path(), r#"{"_filename": "video.mkv", "id": "x"}"#).unwrap();

        let err = SidecarJsonExtractor::new().extract(&ws).await.unwrap_err();
        assert!(matches!(err, Error::DownloadArtifactMissing(_)));
    }

    #[tokio::test]
    async fn test_relative_filename_stays_in_workspace() {
        let root = tempfile::tempdir().unwrap();
        let ws = TempWorkspace::create(root.path()).await.unwrap();
        let media = ws.dir().join("Cargo.toml");
        std::fs::write(&media, b"media").unwrap();
        // Same name as a file in the test's working directory.
        std::fs::write(ws.sidecar_path(), r#"{"_filename": "Cargo.toml", "id": "x"}"#).unwrap();

        assert_eq!(resolve_in(ws.dir(), "Cargo.toml"), media);
        assert_eq!(resolve_in(ws.dir(), "./sub/Cargo.toml"), media);
        let meta = SidecarJsonExtractor::new().extract(&ws).await.unwrap();
        assert_eq!(meta.source_file, media);
    }
}
