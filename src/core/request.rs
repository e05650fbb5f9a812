use crate::core::error::{Error, Result};
use crate::core::site::{classify, Site};
use clap::ValueEnum;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use url::Url;

/// Upper bound on the downloaded video height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxResolution {
    Max,
    Height(u32),
}

impl MaxResolution {
    /// yt-dlp format filter for this bound, empty when unbounded.
    pub fn height_filter(&self) -> String {
        match self {
            MaxResolution::Max => String::new(),
            MaxResolution::Height(h) => format!("[height<={}]", h),
        }
    }
}

impl Default for MaxResolution {
    fn default() -> Self {
        MaxResolution::Height(1080)
    }
}

impl FromStr for MaxResolution {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("max") {
            return Ok(MaxResolution::Max);
        }
        match s.trim_end_matches(|c: char| c == 'p' || c == 'P').parse::<u32>() {
            Ok(0) => Err("resolution must be greater than zero".to_string()),
            Ok(h) => Ok(MaxResolution::Height(h)),
            Err(_) => Err(format!("expected a height or \"max\", got {:?}", s)),
        }
    }
}

impl fmt::Display for MaxResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaxResolution::Max => f.write_str("max"),
            MaxResolution::Height(h) => write!(f, "{}", h),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PreferredCodec {
    Any,
    #[default]
    #[value(alias = "vp9")]
    Webm,
    #[value(alias = "h264")]
    Mp4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Mkv,
    /// Experimental: attachments are dropped.
    Mp4,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Mkv => ".mkv",
            OutputFormat::Mp4 => ".mp4",
        }
    }

    pub fn supports_attachments(&self) -> bool {
        matches!(self, OutputFormat::Mkv)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CommentsMode {
    #[default]
    None,
    Limited,
    All,
}

/// One retrieval, fixed at startup.
#[derive(Debug, Clone)]
pub struct Request {
    pub url: String,
    pub uri: Url,
    pub site: Site,
    pub id: Option<String>,
    pub max_resolution: MaxResolution,
    pub preferred_codec: PreferredCodec,
    pub output_format: OutputFormat,
    pub comments: CommentsMode,
    pub keep_info: bool,
    pub keep_thumbnail: bool,
    pub cookies_file: Option<PathBuf>,
    pub po_token: Option<String>,
    pub use_alternate_executable: bool,
}

impl Request {
    /// Parse and classify `url`, leaving every option at its default.
    pub fn new(url: &str) -> Result<Self> {
        let url = url.trim().trim_matches(|c: char| c == '\'' || c == '"').to_string();
        let uri = Url::parse(&url).map_err(|e| Error::Classification {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        let (site, id) = classify(&uri)?;

        Ok(Self {
            url,
            uri,
            site,
            id,
            max_resolution: MaxResolution::default(),
            preferred_codec: PreferredCodec::default(),
            output_format: OutputFormat::default(),
            comments: CommentsMode::default(),
            keep_info: false,
            keep_thumbnail: false,
            cookies_file: None,
            po_token: None,
            use_alternate_executable: false,
        })
    }

    /// Comments only live inside the sidecar metadata, so asking for them
    /// implies keeping it.
    pub fn retain_sidecar(&self) -> bool {
        self.keep_info || self.comments != CommentsMode::None
    }
}
