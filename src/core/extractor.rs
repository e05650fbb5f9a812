use crate::core::error::Result;
use crate::core::metadata::RetrievedMetadata;
use crate::core::workspace::TempWorkspace;
use async_trait::async_trait;

/// Recovers title, ID and produced files from a finished download.
///
/// One implementation is picked per run, before the download starts.
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this strategy reads yt-dlp's info json (and so can carry comments).
    fn uses_sidecar(&self) -> bool;

    async fn extract(&self, workspace: &TempWorkspace) -> Result<RetrievedMetadata>;
}
