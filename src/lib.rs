pub mod cli;
pub mod config;
pub mod core;
pub mod extractors;
pub mod utils;

pub use config::Config;
pub use core::{Downloader, Error, MetadataExtractor, Request, RetrievedMetadata, Site, TagSet};
