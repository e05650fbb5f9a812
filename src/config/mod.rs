use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "ezdl";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub output_dir: PathBuf,
    pub temp_dir: PathBuf,
    pub download_executable: String,
    /// Used instead of `download_executable` when a run asks for it (e.g. a nightly build).
    pub alternate_download_executable: String,
    pub remux_executable: String,
    pub remux_timeout: u64,
    /// No limit when unset; the download tool has its own socket timeouts.
    pub download_timeout: Option<u64>,
    pub user_agent: String,
    pub timeout: u64,
    /// Page URLs tried in order for sites that need their metadata scraped.
    /// `{id}` is replaced by the content ID.
    pub auxiliary_url_forms: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            temp_dir: data_dir().join("temp"),
            download_executable: "yt-dlp".to_string(),
            alternate_download_executable: "yt-dlp-nightly".to_string(),
            remux_executable: "ffmpeg".to_string(),
            remux_timeout: 30,
            download_timeout: None,
            user_agent: format!("ezdl/{}", env!("CARGO_PKG_VERSION")),
            timeout: 30,
            auxiliary_url_forms: vec![
                "https://imgur.com/gallery/{id}".to_string(),
                "https://imgur.com/{id}".to_string(),
            ],
        }
    }
}

impl Config {
    /// Read `path` if given, else the per-user config file if it exists,
    /// else fall back to defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml")) {
                Some(p) if p.is_file() => p,
                _ => return Ok(Self::default()),
            },
        };

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(raw)?;
        if config.auxiliary_url_forms.iter().any(|form| !form.contains("{id}")) {
            anyhow::bail!("every auxiliary_url_forms entry needs an {{id}} placeholder");
        }
        Ok(config)
    }

    pub fn remux_timeout(&self) -> Duration {
        Duration::from_secs(self.remux_timeout)
    }

    pub fn download_timeout(&self) -> Option<Duration> {
        self.download_timeout.map(Duration::from_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

/// Per-user data directory holding the temp root and an optional cookies file.
pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}

/// First `cookies.txt` found in the working directory, the data directory,
/// or next to the executable.
pub fn discover_cookies() -> Option<PathBuf> {
    let mut candidates = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        candidates.push(cwd.join("cookies.txt"));
    }
    candidates.push(data_dir().join("cookies.txt"));
    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
        candidates.push(exe_dir.join("cookies.txt"));
    }

    candidates
        .into_iter()
        .find(|p| p.is_file())
        .map(|p| std::fs::canonicalize(&p).unwrap_or(p))
}
