pub mod filename;
pub mod imgur;
pub mod sidecar;

pub use filename::FilenamePatternExtractor;
pub use imgur::ImgurExtractor;
pub use sidecar::SidecarJsonExtractor;

use crate::config::Config;
use crate::core::error::{Error, Result};
use crate::core::{MetadataExtractor, Request, Site};

/// Pick the metadata strategy for a request's site.
pub fn for_request(request: &Request, config: &Config) -> Result<Box<dyn MetadataExtractor>> {
    let extractor: Box<dyn MetadataExtractor> = match request.site {
        Site::Facebook => Box::new(FilenamePatternExtractor::new()),
        Site::Imgur => {
            let id = request.id.as_deref().ok_or_else(|| Error::Classification {
                url: request.url.clone(),
                reason: "no post ID to fetch metadata for".to_string(),
            })?;
            Box::new(ImgurExtractor::new(id, config)?)
        }
        _ => Box::new(SidecarJsonExtractor::new()),
    };
    Ok(extractor)
}
