pub mod downloader;
pub mod error;
pub mod extractor;
pub mod log;
pub mod metadata;
pub mod process;
pub mod remux;
pub mod request;
pub mod site;
pub mod tags;
pub mod templates;
pub mod workspace;

pub use downloader::Downloader;
pub use error::{Error, Result};
pub use extractor::MetadataExtractor;
pub use log::{LogSink, MemorySink, Severity, TracingSink};
pub use metadata::{AuxiliaryMetadata, RetrievedMetadata};
pub use request::{CommentsMode, MaxResolution, OutputFormat, PreferredCodec, Request};
pub use site::{classify, Site};
pub use tags::TagSet;
