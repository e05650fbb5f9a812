use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can end a retrieval run.
///
/// Each variant is fatal to the current run; the orchestrator still clears
/// its temp workspace before handing the error back.
#[derive(Debug, Error)]
pub enum Error {
    #[error("could not classify {url}: {reason}")]
    Classification { url: String, reason: String },

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("template error: {0}")]
    Template(String),

    #[error("failed to launch {program}: {source}")]
    Process {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} did not exit within {}s", .timeout.as_secs())]
    DownloadTimeout { program: String, timeout: Duration },

    #[error("{0}")]
    DownloadArtifactMissing(String),

    #[error("could not parse metadata: {0}")]
    MetadataParse(String),

    #[error("metadata not found for {id}: no usable page among {tried:?}")]
    AuxiliaryFetch { id: String, tried: Vec<String> },

    #[error("remux took longer than {}s", .0.as_secs())]
    RemuxTimeout(Duration),

    #[error("remux produced no usable output at {}", .0.display())]
    RemuxOutputInvalid(PathBuf),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Short name of the failure class, used in the final log line.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Classification { .. } => "ClassificationError",
            Error::Configuration(_) => "ConfigurationError",
            Error::Template(_) => "TemplateError",
            Error::Process { .. } => "ProcessError",
            Error::DownloadTimeout { .. } => "DownloadTimeout",
            Error::DownloadArtifactMissing(_) => "DownloadArtifactMissing",
            Error::MetadataParse(_) => "MetadataParseError",
            Error::AuxiliaryFetch { .. } => "AuxiliaryFetchError",
            Error::RemuxTimeout(_) => "RemuxTimeout",
            Error::RemuxOutputInvalid(_) => "RemuxOutputInvalid",
            Error::Io { .. } => "IoError",
            Error::Json(_) => "JsonError",
            Error::Http(_) => "HttpError",
        }
    }
}
