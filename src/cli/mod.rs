use crate::config::{discover_cookies, Config};
use crate::core::{
    CommentsMode, Downloader, MaxResolution, OutputFormat, PreferredCodec, Request, TracingSink,
};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "ezdl")]
#[command(about = "Download a single video with yt-dlp and remux it into a tagged container")]
#[command(version)]
pub struct Cli {
    /// URL to download
    #[arg(value_name = "URL")]
    pub url: String,

    /// Output directory (defaults to the config file's, then the current directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Maximum video height, or "max"
    #[arg(short = 'r', long = "max-resolution", default_value = "1080")]
    pub max_resolution: MaxResolution,

    /// Preferred codec family
    #[arg(short, long, value_enum, default_value_t = PreferredCodec::Webm)]
    pub format: PreferredCodec,

    /// Output container
    #[arg(long, value_enum, default_value_t = OutputFormat::Mkv)]
    pub output_format: OutputFormat,

    /// Also retrieve comments (kept inside the info json)
    #[arg(long, value_enum, default_value_t = CommentsMode::None)]
    pub comments: CommentsMode,

    /// Keep yt-dlp's info json next to the output
    #[arg(long)]
    pub keep_info: bool,

    /// Keep the thumbnail next to the output
    #[arg(long)]
    pub keep_thumbnail: bool,

    /// Use the alternate (nightly) yt-dlp executable
    #[arg(long)]
    pub nightly: bool,

    /// Netscape cookies file; searched for as cookies.txt when omitted
    #[arg(long)]
    pub cookies: Option<PathBuf>,

    /// Proof-of-origin token passed to the YouTube extractor
    #[arg(long)]
    pub po_token: Option<String>,

    /// Temp directory root
    #[arg(long)]
    pub temp_dir: Option<PathBuf>,

    /// Config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if let Some(temp) = &self.temp_dir {
            config.temp_dir = temp.clone();
        }
        Ok(config)
    }

    pub fn request(&self) -> Result<Request> {
        let mut request = Request::new(&self.url)?;
        request.max_resolution = self.max_resolution;
        request.preferred_codec = self.format;
        request.output_format = self.output_format;
        request.comments = self.comments;
        request.keep_info = self.keep_info;
        request.keep_thumbnail = self.keep_thumbnail;
        request.use_alternate_executable = self.nightly;
        request.po_token = self.po_token.clone();
        request.cookies_file = self.cookies.clone().or_else(discover_cookies);
        Ok(request)
    }

    /// Run the download and return the produced path.
    pub async fn run(&self) -> Result<PathBuf> {
        let config = self.load_config()?;
        let request = self.request()?;

        info!("URL: {}", request.url);
        info!("site: {} (id {})", request.site, request.id.as_deref().unwrap_or("-"));
        info!("max resolution: {}", request.max_resolution);
        if let Some(cookies) = &request.cookies_file {
            info!("using cookies file: {}", cookies.display());
        }

        let downloader = Downloader::new(config, Arc::new(TracingSink));
        let produced = downloader.download(&request).await?;
        info!("saved {}", produced.display());
        Ok(produced)
    }
}
