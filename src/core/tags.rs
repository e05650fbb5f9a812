use crate::core::metadata::{AuxiliaryMetadata, RetrievedMetadata};
use crate::core::request::Request;
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeMap;

pub const RETRIEVAL_DATE: &str = "EZDL_RETRIEVAL_DATE";
pub const SOURCE_URL: &str = "EZDL_SOURCE_URL";
pub const ID: &str = "MTOOL_ID";
pub const SITE: &str = "MTOOL_SITE";
pub const IMGUR_DOWNLOAD_ID: &str = "IMGUR_DL_ID";

/// Container-level metadata written by the remux step. Keys are unique and
/// a later insert replaces an earlier one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    tags: BTreeMap<String, String>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Build the tags for a finished download.
pub fn build_tags(request: &Request, meta: &RetrievedMetadata, retrieved_at: DateTime<Utc>) -> TagSet {
    let mut tags = TagSet::new();
    tags.insert(RETRIEVAL_DATE, retrieved_at.to_rfc3339_opts(SecondsFormat::Millis, true));
    tags.insert(SOURCE_URL, request.url.as_str());

    match &meta.auxiliary {
        Some(aux) => add_auxiliary(&mut tags, aux, &meta.id, &request.site.tag_name()),
        None => {
            tags.insert(ID, meta.id.as_str());
            tags.insert(SITE, request.site.tag_name());
        }
    }
    tags
}

fn add_auxiliary(tags: &mut TagSet, aux: &AuxiliaryMetadata, id: &str, site: &str) {
    let optional = [
        ("title", &aux.title),
        ("COMMENT", &aux.description),
        ("DESCRIPTION", &aux.description),
        ("ARTIST", &aux.author),
        ("PURL", &aux.url),
        ("UPLOADER_ID", &aux.account_id),
        ("MTOOL_RAW_DATE", &aux.created_at),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            tags.insert(key, value.as_str());
        }
    }
    if let Some(date) = aux.creation_date() {
        tags.insert("DATE", date.format("%Y%m%d").to_string());
    }
    tags.insert(ID, id);
    tags.insert(SITE, site);
    tags.insert(IMGUR_DOWNLOAD_ID, aux.tool_id.as_str());
}
