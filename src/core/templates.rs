//! yt-dlp argument templates.
//!
//! Templates are stored one token per argv element, so nothing here ever
//! goes through a shell. A token that is exactly `{Name}` expands to the
//! clause's zero or more arguments; a placeholder embedded in a longer token
//! must resolve to exactly one value.

use crate::core::error::{Error, Result};
use crate::core::request::{CommentsMode, PreferredCodec, Request};
use crate::core::site::Site;
use std::path::Path;
use std::str::FromStr;

const DEFAULT: &[&str] = &[
    "--compat-options", "embed-metadata,no-clean-infojson,no-keep-subs",
    "{Cookies}",
    "--force-ipv4", "-ciw",
    "-o", "{OutputPath}/video.%(ext)s",
    "-o", "thumbnail:{OutputPath}/thumbnail.%(ext)s",
    "--check-formats",
    "--socket-timeout", "2",
    "--parse-metadata", "title:%(meta_title)s",
    "--parse-metadata", "uploader:%(meta_artist)s",
    "--parse-metadata", "%(channel_id)s:%(meta_channel_id)s",
    "--write-info-json", "--add-metadata", "--write-thumbnail",
    "--merge-output-format", "mkv",
    "{Url}",
];

const YOUTUBE: &[&str] = &[
    "--compat-options", "embed-metadata,no-clean-infojson,no-keep-subs",
    "{Cookies}",
    "--force-ipv4", "-ciw",
    "-o", "{OutputPath}/video.%(ext)s",
    "-o", "thumbnail:{OutputPath}/thumbnail.%(ext)s",
    "{Format}",
    "--check-formats",
    "--socket-timeout", "2",
    "--parse-metadata", "title:%(meta_title)s",
    "--parse-metadata", "uploader:%(meta_artist)s",
    "--parse-metadata", "%(channel_id)s:%(meta_channel_id)s",
    "--write-info-json", "--add-metadata",
    "--write-sub", "--embed-subs", "--all-subs", "--convert-subs=srt",
    "--write-thumbnail",
    "--merge-output-format", "mkv",
    "{Comments}",
    "{ExtractorArgs}",
    "{Url}",
];

// No info json from this extractor; the filename carries title and id instead.
const FACEBOOK: &[&str] = &[
    "--compat-options", "embed-metadata,no-clean-infojson,no-keep-subs",
    "{Cookies}",
    "--force-ipv4", "-ciw",
    "-o", "{OutputPath}/%(title).64s [%(id)s].%(ext)s",
    "--windows-filenames", "--restrict-filenames",
    "--add-metadata",
    "--merge-output-format", "mkv",
    "{Url}",
];

const FORMAT_ANY: &str = "((bestvideo{Height})+(bestaudio))/best";
const FORMAT_WEBM: &str = "((bestvideo[vcodec^=vp]{Height})+(bestaudio[acodec=opus]/bestaudio))/best";
const FORMAT_MP4: &str = "((bestvideo[vcodec^=avc]{Height})+(bestaudio[acodec^=mp4a]))/best[ext=mp4]{Height}";

const COMMENTS_ALL: &str = "max_comments=all,all,all,all;comment_sort=top";
const COMMENTS_LIMITED: &str = "max_comments=2000,100,all,100;comment_sort=top";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    OutputPath,
    Cookies,
    Format,
    Height,
    Comments,
    ExtractorArgs,
    Url,
}

impl FromStr for Placeholder {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "OutputPath" => Ok(Placeholder::OutputPath),
            "Cookies" => Ok(Placeholder::Cookies),
            "Format" => Ok(Placeholder::Format),
            "Height" => Ok(Placeholder::Height),
            "Comments" => Ok(Placeholder::Comments),
            "ExtractorArgs" => Ok(Placeholder::ExtractorArgs),
            "Url" => Ok(Placeholder::Url),
            other => Err(Error::Template(format!("unknown placeholder {{{}}}", other))),
        }
    }
}

/// Every value a template may ask for. Clauses that can be absent are
/// empty vectors, never missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateValues {
    pub output_path: String,
    pub cookies: Vec<String>,
    pub format: Vec<String>,
    pub height: String,
    pub comments: Vec<String>,
    pub extractor_args: Vec<String>,
    pub url: String,
}

impl TemplateValues {
    pub fn for_request(request: &Request, output_path: &Path) -> Result<Self> {
        let height = request.max_resolution.height_filter();
        let format_template = match request.preferred_codec {
            PreferredCodec::Any => FORMAT_ANY,
            PreferredCodec::Webm => FORMAT_WEBM,
            PreferredCodec::Mp4 => FORMAT_MP4,
        };
        let inner = TemplateValues {
            height: height.clone(),
            ..Default::default()
        };
        let format = vec!["-f".to_string(), interpolate(format_template, &inner)?];

        let cookies = match &request.cookies_file {
            Some(path) => vec!["--cookies".to_string(), path.display().to_string()],
            None => Vec::new(),
        };

        let comments = match request.comments {
            CommentsMode::None => Vec::new(),
            _ => vec!["--write-comments".to_string()],
        };

        let output_path = output_path
            .display()
            .to_string()
            .trim_end_matches(['/', '\\'])
            .to_string();

        Ok(Self {
            output_path,
            cookies,
            format,
            height,
            comments,
            extractor_args: extractor_args(request.comments, request.po_token.as_deref()),
            url: request.url.clone(),
        })
    }

    fn resolve(&self, placeholder: Placeholder) -> Vec<String> {
        match placeholder {
            Placeholder::OutputPath => vec![self.output_path.clone()],
            Placeholder::Cookies => self.cookies.clone(),
            Placeholder::Format => self.format.clone(),
            Placeholder::Height => vec![self.height.clone()],
            Placeholder::Comments => self.comments.clone(),
            Placeholder::ExtractorArgs => self.extractor_args.clone(),
            Placeholder::Url => vec![self.url.clone()],
        }
    }
}

/// `--extractor-args youtube:<...>` combining the comment limits and the PO token.
fn extractor_args(comments: CommentsMode, po_token: Option<&str>) -> Vec<String> {
    let mut options = Vec::new();
    match comments {
        CommentsMode::None => {}
        CommentsMode::Limited => options.push(COMMENTS_LIMITED.to_string()),
        CommentsMode::All => options.push(COMMENTS_ALL.to_string()),
    }
    if let Some(token) = po_token.filter(|t| !t.is_empty()) {
        options.push(format!("player-client=web,default;po_token=web+{}", token));
    }

    if options.is_empty() {
        return Vec::new();
    }
    vec![
        "--extractor-args".to_string(),
        format!("youtube:{}", options.join(";")),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    Default,
    YouTube,
    Facebook,
}

impl Template {
    pub const ALL: [Template; 3] = [Template::Default, Template::YouTube, Template::Facebook];

    pub fn for_site(site: Site) -> Self {
        match site {
            Site::YouTube => Template::YouTube,
            Site::Facebook => Template::Facebook,
            _ => Template::Default,
        }
    }

    pub fn tokens(&self) -> &'static [&'static str] {
        match self {
            Template::Default => DEFAULT,
            Template::YouTube => YOUTUBE,
            Template::Facebook => FACEBOOK,
        }
    }

    pub fn placeholders(&self) -> Result<Vec<Placeholder>> {
        let mut found = Vec::new();
        for token in self.tokens() {
            found.extend(placeholders_in(token)?);
        }
        Ok(found)
    }

    pub fn uses(&self, placeholder: Placeholder) -> bool {
        self.placeholders()
            .map(|found| found.contains(&placeholder))
            .unwrap_or(false)
    }

    pub fn render(&self, values: &TemplateValues) -> Result<Vec<String>> {
        let mut args = Vec::new();
        for token in self.tokens() {
            if let Some(placeholder) = whole_placeholder(token) {
                args.extend(values.resolve(placeholder?));
            } else {
                args.push(interpolate(token, values)?);
            }
        }
        Ok(args)
    }
}

fn whole_placeholder(token: &str) -> Option<Result<Placeholder>> {
    let name = token.strip_prefix('{')?.strip_suffix('}')?;
    if name.contains(['{', '}']) {
        return None;
    }
    Some(name.parse())
}

fn placeholders_in(token: &str) -> Result<Vec<Placeholder>> {
    let mut found = Vec::new();
    let mut rest = token;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let end = after
            .find('}')
            .ok_or_else(|| Error::Template(format!("unterminated placeholder in {:?}", token)))?;
        found.push(after[..end].parse()?);
        rest = &after[end + 1..];
    }
    Ok(found)
}

/// Substitute every placeholder inside `token` with its single value.
fn interpolate(token: &str, values: &TemplateValues) -> Result<String> {
    let mut out = String::with_capacity(token.len());
    let mut rest = token;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after
            .find('}')
            .ok_or_else(|| Error::Template(format!("unterminated placeholder in {:?}", token)))?;
        let placeholder: Placeholder = after[..end].parse()?;
        let mut value = values.resolve(placeholder);
        if value.len() != 1 {
            return Err(Error::Template(format!(
                "{{{:?}}} expands to {} arguments and cannot be embedded in {:?}",
                placeholder,
                value.len(),
                token
            )));
        }
        out.push_str(&value.remove(0));
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
