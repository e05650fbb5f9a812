use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use std::path::PathBuf;

pub const UNKNOWN: &str = "unknown";

/// What a run knows about the media once the download tool is done.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedMetadata {
    pub title: String,
    pub id: String,
    /// The media file actually produced, not the one the template asked for.
    pub source_file: PathBuf,
    pub thumbnail: Option<PathBuf>,
    pub sidecar: Option<PathBuf>,
    pub auxiliary: Option<AuxiliaryMetadata>,
}

/// Fields scraped from a site's own page when the download tool has none.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuxiliaryMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub created_at: Option<String>,
    pub url: Option<String>,
    pub account_id: Option<String>,
    /// ID the download tool reported, kept next to the scraped one.
    pub tool_id: String,
}

impl AuxiliaryMetadata {
    /// Creation day, accepting either a full timestamp or a bare date.
    pub fn creation_date(&self) -> Option<NaiveDate> {
        let raw = self.created_at.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.date_naive())
            .or_else(|_| NaiveDate::parse_from_str(raw.get(..10).unwrap_or(raw), "%Y-%m-%d"))
            .ok()
    }
}

/// The subset of yt-dlp's info json the pipeline reads.
#[derive(Debug, Clone, Deserialize)]
pub struct Sidecar {
    #[serde(rename = "_filename")]
    pub filename: Option<String>,
    pub title: Option<String>,
    pub id: Option<String>,
    pub thumbnail: Option<String>,
}

impl Sidecar {
    pub fn title_or_unknown(&self) -> String {
        non_empty(self.title.as_deref()).unwrap_or(UNKNOWN).to_string()
    }

    pub fn id_or_unknown(&self) -> String {
        non_empty(self.id.as_deref()).unwrap_or(UNKNOWN).to_string()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
