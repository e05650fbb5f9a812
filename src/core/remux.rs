use crate::core::error::{Error, Result};
use crate::core::process::{ProcessOutcome, ProcessRunner};
use crate::core::request::OutputFormat;
use crate::core::tags::TagSet;
use crate::utils::resolve_collision;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Copies streams into the final container and writes the tags, via ffmpeg.
pub struct Remuxer {
    runner: ProcessRunner,
    executable: String,
    timeout: Duration,
}

/// Inputs for one remux.
#[derive(Debug, Clone)]
pub struct RemuxJob<'a> {
    pub source: &'a Path,
    pub destination: &'a Path,
    pub format: OutputFormat,
    pub tags: &'a TagSet,
    pub thumbnail: Option<&'a Path>,
}

impl Remuxer {
    pub fn new(runner: ProcessRunner, executable: impl Into<String>, timeout: Duration) -> Self {
        Self {
            runner,
            executable: executable.into(),
            timeout,
        }
    }

    /// Remux `job.source` into a free name at or next to `job.destination`
    /// and return the path actually written.
    ///
    /// The output must exist and be non-empty afterwards, whatever ffmpeg's
    /// exit status. It then takes the source's modification time and the
    /// source is removed.
    pub async fn remux(&self, job: &RemuxJob<'_>) -> Result<PathBuf> {
        // The name may have been taken since it was resolved.
        let destination = absolute(&resolve_collision(job.destination));
        let source = absolute(job.source);

        let args = remux_args(&source, &destination, job);
        info!("remuxing into {}", destination.display());

        let outcome = self
            .runner
            .run(&self.executable, &args, source.parent(), Some(self.timeout))
            .await?;
        match outcome {
            ProcessOutcome::TimedOut => {
                discard(&destination).await;
                return Err(Error::RemuxTimeout(self.timeout));
            }
            ProcessOutcome::Exited(status) if !status.success() => {
                warn!("{} exited with {}", self.executable, status);
            }
            ProcessOutcome::Exited(_) => {}
        }

        let size = tokio::fs::metadata(&destination).await.map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            discard(&destination).await;
            return Err(Error::RemuxOutputInvalid(destination));
        }
        debug!("remux wrote {} bytes", size);

        copy_modified_time(&source, &destination)?;
        tokio::fs::remove_file(&source)
            .await
            .map_err(|e| Error::io(&source, e))?;

        Ok(destination)
    }
}

pub fn remux_args(source: &Path, destination: &Path, job: &RemuxJob<'_>) -> Vec<String> {
    let mut args: Vec<String> = ["-hide_banner", "-nostdin", "-n", "-i"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    args.push(source.display().to_string());

    let attachment = job.thumbnail.filter(|_| job.format.supports_attachments());
    if let Some(thumbnail) = attachment {
        let mime = mime_guess::from_path(thumbnail).first_or_octet_stream();
        let extension = thumbnail
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_else(|| "jpg".to_string());
        args.push("-attach".to_string());
        args.push(thumbnail.display().to_string());
        args.push("-metadata:s:t".to_string());
        args.push(format!("mimetype={}", mime.essence_str()));
        args.push("-metadata:s:t".to_string());
        args.push(format!("filename=cover.{}", extension));
    }

    args.push("-map".to_string());
    args.push("0".to_string());
    if job.format == OutputFormat::Mp4 {
        // mp4 cannot carry attachments, data streams or srt subtitles.
        for negative in ["-0:s?", "-0:t?", "-0:d?"] {
            args.push("-map".to_string());
            args.push(negative.to_string());
        }
    }
    args.push("-c".to_string());
    args.push("copy".to_string());
    if job.format == OutputFormat::Mp4 {
        args.push("-movflags".to_string());
        args.push("+faststart".to_string());
    }

    for (key, value) in job.tags.iter() {
        args.push("-metadata".to_string());
        args.push(format!("{}={}", key, value));
    }

    args.push(destination.display().to_string());
    args
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

async fn discard(path: &Path) {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!("could not remove {}: {}", path.display(), e);
        }
    }
}

fn copy_modified_time(source: &Path, destination: &Path) -> Result<()> {
    let modified = std::fs::metadata(source)
        .and_then(|m| m.modified())
        .map_err(|e| Error::io(source, e))?;
    std::fs::File::options()
        .write(true)
        .open(destination)
        .and_then(|f| f.set_modified(modified))
        .map_err(|e| Error::io(destination, e))
}
