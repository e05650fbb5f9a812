use crate::config::Config;
use crate::core::error::{Error, Result};
use crate::core::metadata::{AuxiliaryMetadata, RetrievedMetadata};
use crate::core::workspace::TempWorkspace;
use crate::core::MetadataExtractor;
use crate::extractors::SidecarJsonExtractor;
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Imgur posts come down without a usable title or description, so the
/// post page is scraped for the JSON blob it embeds.
pub struct ImgurExtractor {
    client: reqwest::Client,
    id: String,
    url_forms: Vec<String>,
    blob_pattern: Regex,
    sidecar: SidecarJsonExtractor,
}

impl ImgurExtractor {
    pub fn new(id: &str, config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.http_timeout())
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self {
            client,
            id: id.to_string(),
            url_forms: config.auxiliary_url_forms.clone(),
            blob_pattern: blob_pattern()?,
            sidecar: SidecarJsonExtractor::new(),
        })
    }

    /// Try each page form in turn; the first body carrying the blob wins.
    pub async fn fetch(&self) -> Result<AuxiliaryMetadata> {
        let encoded = urlencoding::encode(&self.id);
        let mut tried = Vec::new();

        for form in &self.url_forms {
            let url = form.replace("{id}", &encoded);
            debug!("fetching metadata page {}", url);
            tried.push(url.clone());

            let body = match self.get(&url).await {
                Ok(body) => body,
                Err(e) => {
                    warn!("metadata request to {} failed: {}", url, e);
                    continue;
                }
            };

            match find_embedded_json(&self.blob_pattern, &body) {
                Some(json) => {
                    info!("found embedded metadata at {}", url);
                    return parse_post(&json);
                }
                None => debug!("no embedded metadata at {}", url),
            }
        }

        Err(Error::AuxiliaryFetch {
            id: self.id.clone(),
            tried,
        })
    }

    async fn get(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header("Accept-Language", "en-US,en;q=0.5")
            .send()
            .await?;
        Ok(response.text().await?)
    }
}

fn blob_pattern() -> Result<Regex> {
    Regex::new(r#"<script>[^"]+"\{.*\}"</script>"#).map_err(|e| Error::Configuration(e.to_string()))
}

/// Pull the escaped JSON object out of a `<script>...="{...}"</script>` block.
pub fn find_embedded_json(pattern: &Regex, html: &str) -> Option<String> {
    if html.trim().is_empty() {
        return None;
    }
    let block = pattern.find(html)?.as_str();
    let start = block.find('{')?;
    let end = block.rfind('}')?;
    if end < start {
        return None;
    }
    Some(block[start..=end].replace("\\\"", "\"").replace("\\\\", "\\"))
}

fn parse_post(json: &str) -> Result<AuxiliaryMetadata> {
    let post: Value = serde_json::from_str(json)
        .map_err(|e| Error::MetadataParse(format!("embedded metadata is not valid JSON: {}", e)))?;

    Ok(AuxiliaryMetadata {
        title: string_field(&post, &["title"]),
        description: string_field(&post, &["description"]),
        author: string_field(&post, &["account", "username"]),
        created_at: string_field(&post, &["created_at"]),
        url: string_field(&post, &["url"]),
        account_id: string_field(&post, &["account_id"]),
        tool_id: String::new(),
    })
}

/// A nested field rendered as text; numbers are accepted, null and empty are not.
fn string_field(value: &Value, path: &[&str]) -> Option<String> {
    let field = path.iter().try_fold(value, |v, key| v.get(key))?;
    match field {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[async_trait]
impl MetadataExtractor for ImgurExtractor {
    fn name(&self) -> &'static str {
        "auxiliary-fetch"
    }

    fn uses_sidecar(&self) -> bool {
        true
    }

    async fn extract(&self, workspace: &TempWorkspace) -> Result<RetrievedMetadata> {
        let mut meta = self.sidecar.extract(workspace).await?;
        let mut aux = self.fetch().await?;

        aux.tool_id = std::mem::take(&mut meta.id);
        if let Some(title) = &aux.title {
            meta.title = title.clone();
        }
        meta.id = self.id.clone();
        meta.auxiliary = Some(aux);
        Ok(meta)
    }
}
