use crate::core::error::{Error, Result};
use crate::core::metadata::{RetrievedMetadata, UNKNOWN};
use crate::core::workspace::TempWorkspace;
use crate::core::MetadataExtractor;
use async_trait::async_trait;

/// For extractors that never write an info json: the single produced file
/// is named `<title> [<id>]<ext>` and that name is all there is to go on.
#[derive(Debug, Default, Clone)]
pub struct FilenamePatternExtractor;

impl FilenamePatternExtractor {
    pub fn new() -> Self {
        Self
    }
}

/// Split `<title> [<id>]<ext>` into title and id.
///
/// The title is everything before the first `[`; the id sits between the
/// last `[` and the `]` after it.
pub fn parse_title_and_id(file_name: &str) -> Result<(String, String)> {
    let malformed = || Error::MetadataParse(format!("{:?} does not look like \"<title> [<id>].<ext>\"", file_name));

    let first_open = file_name.find('[').ok_or_else(malformed)?;
    let last_open = file_name.rfind('[').ok_or_else(malformed)?;
    let close = file_name[last_open..].find(']').ok_or_else(malformed)? + last_open;

    let id = file_name[last_open + 1..close].trim();
    if id.is_empty() {
        return Err(malformed());
    }
    let title = file_name[..first_open].trim();
    let title = if title.is_empty() { UNKNOWN } else { title };

    Ok((title.to_string(), id.to_string()))
}

#[async_trait]
impl MetadataExtractor for FilenamePatternExtractor {
    fn name(&self) -> &'static str {
        "filename-pattern"
    }

    fn uses_sidecar(&self) -> bool {
        false
    }

    async fn extract(&self, workspace: &TempWorkspace) -> Result<RetrievedMetadata> {
        let files: Vec<_> = workspace
            .files()
            .await?
            .into_iter()
            .filter(|f| {
                let name = f.to_string_lossy();
                !name.ends_with(".part") && !name.ends_with(".ytdl")
            })
            .collect();

        let source_file = match files.as_slice() {
            [] => {
                return Err(Error::DownloadArtifactMissing(
                    "download produced no file".to_string(),
                ))
            }
            [single] => single.clone(),
            many => {
                return Err(Error::MetadataParse(format!(
                    "expected exactly one produced file, found {}",
                    many.len()
                )))
            }
        };

        let file_name = source_file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let (title, id) = parse_title_and_id(&file_name)?;

        Ok(RetrievedMetadata {
            title,
            id,
            source_file,
            thumbnail: None,
            sidecar: None,
            auxiliary: None,
        })
    }
}
