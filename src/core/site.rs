use crate::core::error::{Error, Result};
use std::fmt;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Site {
    Unknown,
    YouTube,
    Imgur,
    Twitter,
    Reddit,
    Facebook,
}

impl Site {
    pub fn name(&self) -> &'static str {
        match self {
            Site::Unknown => "Unknown",
            Site::YouTube => "YouTube",
            Site::Imgur => "Imgur",
            Site::Twitter => "Twitter",
            Site::Reddit => "Reddit",
            Site::Facebook => "Facebook",
        }
    }

    /// Lower-cased name written into the `MTOOL_SITE` tag.
    pub fn tag_name(&self) -> String {
        self.name().to_lowercase()
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Map a URL onto a known site and, where the URL carries one, its content ID.
///
/// Sites whose downstream handling depends on the ID fail here rather than
/// guessing when the expected path or query component is absent.
pub fn classify(url: &Url) -> Result<(Site, Option<String>)> {
    let host = url
        .host_str()
        .ok_or_else(|| classification_error(url, "URL has no host"))?
        .to_lowercase();

    if host == "youtu.be" {
        let id = first_segment(url).ok_or_else(|| classification_error(url, "no video ID in short link"))?;
        return Ok((Site::YouTube, Some(id)));
    }

    if host.contains("youtube") {
        let id = url
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.to_string())
            .filter(|value| !value.is_empty())
            .or_else(|| segment_after(url, "shorts"))
            .or_else(|| segment_after(url, "live"))
            .or_else(|| segment_after(url, "embed"))
            .ok_or_else(|| classification_error(url, "no video ID (expected ?v=...)"))?;
        return Ok((Site::YouTube, Some(id)));
    }

    if host.contains("twitter") || host == "x.com" || host.ends_with(".x.com") {
        let id = segment_after(url, "status")
            .ok_or_else(|| classification_error(url, "no path segment following status/"))?;
        return Ok((Site::Twitter, Some(id)));
    }

    if host == "redd.it" {
        let id = first_segment(url).ok_or_else(|| classification_error(url, "no post ID in short link"))?;
        return Ok((Site::Reddit, Some(id)));
    }

    if host.contains("reddit") {
        let id = segment_after(url, "comments")
            .ok_or_else(|| classification_error(url, "no path segment following comments/"))?;
        return Ok((Site::Reddit, Some(id)));
    }

    if host.contains("imgur") {
        let last = last_segment(url).ok_or_else(|| classification_error(url, "no path segment to take the ID from"))?;
        // Direct media links carry an extension: `i.imgur.com/<id>.mp4`.
        let last = strip_extension(last);
        // Gallery pages are addressed as `<slug>-<id>`; bare IDs never contain a dash.
        let id = match last.rsplit_once('-') {
            Some((_, tail)) if !tail.is_empty() => tail.to_string(),
            _ => last,
        };
        return Ok((Site::Imgur, Some(id)));
    }

    if host.contains("facebook") || host == "fb.watch" {
        return Ok((Site::Facebook, None));
    }

    Ok((Site::Unknown, None))
}

fn strip_extension(segment: String) -> String {
    match segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) => {
            stem.to_string()
        }
        _ => segment,
    }
}

fn classification_error(url: &Url, reason: &str) -> Error {
    Error::Classification {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}

fn segments(url: &Url) -> Vec<String> {
    url.path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).map(|s| s.to_string()).collect())
        .unwrap_or_default()
}

fn first_segment(url: &Url) -> Option<String> {
    segments(url).into_iter().next()
}

fn last_segment(url: &Url) -> Option<String> {
    segments(url).pop()
}

fn segment_after(url: &Url, marker: &str) -> Option<String> {
    let segments = segments(url);
    segments
        .iter()
        .position(|s| s.eq_ignore_ascii_case(marker))
        .and_then(|i| segments.get(i + 1).cloned())
}
