use crate::config::Config;
use crate::core::error::{Error, Result};
use crate::core::log::LogSink;
use crate::core::metadata::RetrievedMetadata;
use crate::core::process::{ProcessOutcome, ProcessRunner};
use crate::core::remux::{RemuxJob, Remuxer};
use crate::core::request::{CommentsMode, Request};
use crate::core::tags::build_tags;
use crate::core::templates::{Placeholder, Template, TemplateValues};
use crate::core::workspace::TempWorkspace;
use crate::core::MetadataExtractor;
use crate::extractors;
use crate::utils::{resolve_collision, resolve_destination};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Runs one request from URL to tagged file in the output directory.
pub struct Downloader {
    config: Config,
    runner: ProcessRunner,
}

impl Downloader {
    pub fn new(config: Config, log: Arc<dyn LogSink>) -> Self {
        Self {
            config,
            runner: ProcessRunner::new(log),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Download `request` and return the path of the produced file.
    ///
    /// The temp workspace is removed whether or not the run succeeds.
    pub async fn download(&self, request: &Request) -> Result<PathBuf> {
        let template = Template::for_site(request.site);
        let extractor = extractors::for_request(request, &self.config)?;
        check_comments_supported(request, template, extractor.as_ref())?;

        let workspace = TempWorkspace::create(&self.config.temp_dir).await?;
        let result = self.run(request, template, extractor.as_ref(), &workspace).await;

        info!("clearing temp workspace");
        workspace.cleanup().await;
        result
    }

    async fn run(
        &self,
        request: &Request,
        template: Template,
        extractor: &dyn MetadataExtractor,
        workspace: &TempWorkspace,
    ) -> Result<PathBuf> {
        let values = TemplateValues::for_request(request, workspace.dir())?;
        let args = template.render(&values)?;

        info!(
            "downloading {} ({}) to {}",
            request.url,
            request.site,
            workspace.dir().display()
        );
        let retrieved_at = Utc::now();
        self.run_download(request, &args).await?;

        let meta = extractor.extract(workspace).await?;
        info!("title: {}", meta.title);

        let tags = build_tags(request, &meta, retrieved_at);
        let destination = resolve_destination(
            &self.config.output_dir,
            &meta.title,
            &meta.id,
            request.output_format.extension(),
        );
        info!("setting tags and copying to {}", destination.display());
        tokio::fs::create_dir_all(&self.config.output_dir)
            .await
            .map_err(|e| Error::io(&self.config.output_dir, e))?;

        let remuxer = Remuxer::new(
            self.runner.clone(),
            self.config.remux_executable.clone(),
            self.config.remux_timeout(),
        );
        let produced = remuxer
            .remux(&RemuxJob {
                source: &meta.source_file,
                destination: &destination,
                format: request.output_format,
                tags: &tags,
                thumbnail: meta.thumbnail.as_deref(),
            })
            .await?;

        let mut written = vec![produced.clone()];
        if let Err(e) = copy_companions(request, &meta, &produced, &mut written).await {
            // Keep the output folder all-or-nothing.
            for path in &written {
                warn!("removing {} after failed copy", path.display());
                if let Err(remove_err) = tokio::fs::remove_file(path).await {
                    warn!("could not remove {}: {}", path.display(), remove_err);
                }
            }
            return Err(e);
        }

        Ok(produced)
    }

    async fn run_download(&self, request: &Request, args: &[String]) -> Result<()> {
        let program = if request.use_alternate_executable {
            &self.config.alternate_download_executable
        } else {
            &self.config.download_executable
        };
        let timeout = self.config.download_timeout();

        // Success is judged by what lands in the workspace, not the exit code.
        match self.runner.run(program, args, None, timeout).await? {
            ProcessOutcome::Exited(status) if !status.success() => {
                warn!("{} exited with {}", program, status);
                Ok(())
            }
            ProcessOutcome::Exited(_) => Ok(()),
            ProcessOutcome::TimedOut => Err(Error::DownloadTimeout {
                program: program.clone(),
                timeout: timeout.unwrap_or_default(),
            }),
        }
    }
}

/// Comments can only be kept where the sidecar is both written and read.
fn check_comments_supported(
    request: &Request,
    template: Template,
    extractor: &dyn MetadataExtractor,
) -> Result<()> {
    if request.comments == CommentsMode::None {
        return Ok(());
    }
    if !extractor.uses_sidecar() || !template.uses(Placeholder::Comments) {
        return Err(Error::Configuration(format!(
            "comments are not supported for {} ({} metadata)",
            request.site,
            extractor.name()
        )));
    }
    Ok(())
}

/// Copy the kept sidecar and thumbnail next to `produced`, recording each
/// file in `written` once it exists.
async fn copy_companions(
    request: &Request,
    meta: &RetrievedMetadata,
    produced: &Path,
    written: &mut Vec<PathBuf>,
) -> Result<()> {
    if request.retain_sidecar() {
        if let Some(sidecar) = &meta.sidecar {
            let target = resolve_collision(&produced.with_extension("info.json"));
            copy_file(sidecar, &target).await?;
            written.push(target.clone());
            info!("kept sidecar metadata at {}", target.display());
        }
    }

    if request.keep_thumbnail {
        match &meta.thumbnail {
            Some(thumbnail) => {
                let extension = thumbnail
                    .extension()
                    .map(|e| e.to_string_lossy().to_string())
                    .unwrap_or_else(|| "jpg".to_string());
                let target = resolve_collision(&produced.with_extension(extension));
                copy_file(thumbnail, &target).await?;
                written.push(target.clone());
                info!("kept thumbnail at {}", target.display());
            }
            None => warn!("no thumbnail to keep"),
        }
    }
    Ok(())
}

async fn copy_file(from: &Path, to: &Path) -> Result<()> {
    tokio::fs::copy(from, to)
        .await
        .map(|_| ())
        .map_err(|e| Error::io(to, e))
}
