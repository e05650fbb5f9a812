use anyhow::Result;
use ezdl::core::{MemorySink, Request, Severity, Site};
use ezdl::extractors::ImgurExtractor;
use ezdl::{Config, Downloader, Error};
use httpmock::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const IMGUR_PAGE: &str = r#"<html><script>window.postDataJSON="{\"id\":\"Xy12AbC\",\"title\":\"Cat\",\"description\":\"a cat\",\"account\":{\"username\":\"catfan\"},\"account_id\":4242,\"created_at\":\"2023-04-05T10:11:12Z\",\"url\":\"https://imgur.com/gallery/Xy12AbC\"}"</script></html>"#;

struct Fixture {
    _root: tempfile::TempDir,
    temp: PathBuf,
    out: PathBuf,
    bin: PathBuf,
}

impl Fixture {
    fn new() -> Result<Self> {
        let root = tempfile::tempdir()?;
        let temp = root.path().join("temp");
        let out = root.path().join("out");
        let bin = root.path().join("bin");
        for dir in [&temp, &out, &bin] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(Self {
            _root: root,
            temp,
            out,
            bin,
        })
    }

    fn config(&self, download: &Path, remux: &Path) -> Config {
        Config {
            output_dir: self.out.clone(),
            temp_dir: self.temp.clone(),
            download_executable: download.display().to_string(),
            remux_executable: remux.display().to_string(),
            ..Config::default()
        }
    }

    fn remux_log(&self) -> PathBuf {
        self.bin.join("remux-args.txt")
    }

    fn temp_is_empty(&self) -> Result<bool> {
        Ok(std::fs::read_dir(&self.temp)?.next().is_none())
    }

    fn outputs(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = std::fs::read_dir(&self.out)?
            .map(|e| e.map(|e| e.file_name().to_string_lossy().to_string()))
            .collect::<std::io::Result<_>>()?;
        names.sort();
        Ok(names)
    }
}

#[cfg(unix)]
fn write_script(dir: &Path, name: &str, body: &str) -> Result<PathBuf> {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}", body))?;
    let mut perms = std::fs::metadata(&path)?.permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms)?;
    Ok(path)
}

/// Stand-in for yt-dlp: writes into the directory of the first `-o` value.
#[cfg(unix)]
fn fake_download_tool(fixture: &Fixture, produce: &str) -> Result<PathBuf> {
    let body = format!(
        r#"out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-o" ] && [ -z "$out" ]; then
    out="$2"
    shift
  fi
  shift
done
dir=$(dirname "$out")
echo "[download] Destination: $dir"
{}
"#,
        produce
    );
    write_script(&fixture.bin, "fake-yt-dlp", &body)
}

#[cfg(unix)]
fn sidecar_download_tool(fixture: &Fixture) -> Result<PathBuf> {
    fake_download_tool(
        fixture,
        r#"printf 'media-bytes' > "$dir/video.mkv"
printf 'thumb' > "$dir/thumbnail.jpg"
printf '{"_filename": "%s/video.mkv", "title": "Example: Video", "id": "abc123", "thumbnail": "https://example.com/t.jpg"}' "$dir" > "$dir/video.info.json""#,
    )
}

/// Stand-in for ffmpeg: records its arguments and copies input to output.
#[cfg(unix)]
fn copying_remux_tool(fixture: &Fixture) -> Result<PathBuf> {
    let body = format!(
        r#"printf '%s\n' "$@" > "{}"
prev=""
for a in "$@"; do
  if [ "$prev" = "-i" ]; then src="$a"; fi
  prev="$a"
  last="$a"
done
cp "$src" "$last"
"#,
        fixture.remux_log().display()
    );
    write_script(&fixture.bin, "fake-ffmpeg", &body)
}

#[cfg(unix)]
#[tokio::test]
async fn test_sidecar_pipeline_produces_tagged_file() -> Result<()> {
    let fixture = Fixture::new()?;
    let config = fixture.config(&sidecar_download_tool(&fixture)?, &copying_remux_tool(&fixture)?);
    let sink = MemorySink::new();
    let downloader = Downloader::new(config, Arc::new(sink.clone()));

    let mut request = Request::new("https://www.reddit.com/r/videos/comments/abc123/example/")?;
    request.keep_info = true;
    request.keep_thumbnail = true;
    let produced = downloader.download(&request).await?;

    assert_eq!(produced, fixture.out.join("Example_ Video - abc123.mkv"));
    assert_eq!(std::fs::read(&produced)?, b"media-bytes");
    assert_eq!(
        fixture.outputs()?,
        vec![
            "Example_ Video - abc123.info.json".to_string(),
            "Example_ Video - abc123.jpg".to_string(),
            "Example_ Video - abc123.mkv".to_string(),
        ]
    );

    let args = std::fs::read_to_string(fixture.remux_log())?;
    let args: Vec<&str> = args.lines().collect();
    assert!(args.contains(&"MTOOL_ID=abc123"));
    assert!(args.contains(&"MTOOL_SITE=reddit"));
    assert!(args.contains(&"EZDL_SOURCE_URL=https://www.reddit.com/r/videos/comments/abc123/example/"));
    assert!(args.iter().any(|a| a.starts_with("EZDL_RETRIEVAL_DATE=")));
    assert!(args.contains(&"-attach"));

    // Tool output went through the injected sink.
    assert!(sink.contains(Severity::Info, "[download] Destination"));
    assert!(fixture.temp_is_empty()?);
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_existing_output_gets_a_counter() -> Result<()> {
    let fixture = Fixture::new()?;
    let config = fixture.config(&sidecar_download_tool(&fixture)?, &copying_remux_tool(&fixture)?);
    std::fs::write(fixture.out.join("Example_ Video - abc123.mkv"), b"old")?;
    std::fs::write(fixture.out.join("Example_ Video - abc123 (1).mkv"), b"old")?;

    let downloader = Downloader::new(config, Arc::new(MemorySink::new()));
    let request = Request::new("https://example.com/watch/1")?;
    let produced = downloader.download(&request).await?;

    assert_eq!(produced, fixture.out.join("Example_ Video - abc123 (2).mkv"));
    let args = std::fs::read_to_string(fixture.remux_log())?;
    assert!(args.lines().any(|a| a == "MTOOL_SITE=unknown"));
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_filename_pattern_pipeline() -> Result<()> {
    let fixture = Fixture::new()?;
    let download = fake_download_tool(&fixture, r#"printf 'fb' > "$dir/My Title [xyz789].mp4""#)?;
    let config = fixture.config(&download, &copying_remux_tool(&fixture)?);
    let downloader = Downloader::new(config, Arc::new(MemorySink::new()));

    let request = Request::new("https://www.facebook.com/watch/?v=10001")?;
    assert_eq!(request.site, Site::Facebook);
    let produced = downloader.download(&request).await?;

    assert_eq!(produced, fixture.out.join("My Title - xyz789.mkv"));
    let args = std::fs::read_to_string(fixture.remux_log())?;
    assert!(args.lines().any(|a| a == "MTOOL_ID=xyz789"));
    assert!(args.lines().any(|a| a == "MTOOL_SITE=facebook"));
    assert!(fixture.temp_is_empty()?);
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_failed_download_leaves_nothing_behind() -> Result<()> {
    let fixture = Fixture::new()?;
    let download = write_script(&fixture.bin, "failing-yt-dlp", "echo 'ERROR: Unsupported URL' 1>&2\nexit 1\n")?;
    let config = fixture.config(&download, &copying_remux_tool(&fixture)?);
    let sink = MemorySink::new();
    let downloader = Downloader::new(config, Arc::new(sink.clone()));

    let request = Request::new("https://example.com/nothing")?;
    let err = downloader.download(&request).await.unwrap_err();

    assert!(matches!(err, Error::DownloadArtifactMissing(_)));
    assert!(sink.contains(Severity::Error, "Unsupported URL"));
    assert!(fixture.outputs()?.is_empty());
    assert!(fixture.temp_is_empty()?);
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_failed_companion_copy_rolls_back_every_output() -> Result<()> {
    let fixture = Fixture::new()?;
    let config = fixture.config(&sidecar_download_tool(&fixture)?, &copying_remux_tool(&fixture)?);
    // A dangling link is a free name that cannot be written through.
    let blocked = fixture.out.join("Example_ Video - abc123.jpg");
    std::os::unix::fs::symlink(fixture.out.join("missing").join("cover.jpg"), &blocked)?;

    let downloader = Downloader::new(config, Arc::new(MemorySink::new()));
    let mut request = Request::new("https://www.reddit.com/r/videos/comments/abc123/example/")?;
    request.keep_info = true;
    request.keep_thumbnail = true;
    let err = downloader.download(&request).await.unwrap_err();

    assert!(matches!(err, Error::Io { .. }));
    // Only the pre-existing link is left; no media, no info json.
    assert_eq!(fixture.outputs()?, vec!["Example_ Video - abc123.jpg".to_string()]);
    assert!(fixture.temp_is_empty()?);
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_download_timeout_is_fatal() -> Result<()> {
    let fixture = Fixture::new()?;
    let download = write_script(&fixture.bin, "stuck-yt-dlp", "sleep 10\n")?;
    let mut config = fixture.config(&download, &copying_remux_tool(&fixture)?);
    config.download_timeout = Some(1);
    let downloader = Downloader::new(config, Arc::new(MemorySink::new()));

    let request = Request::new("https://example.com/watch/1")?;
    let err = downloader.download(&request).await.unwrap_err();

    assert!(matches!(err, Error::DownloadTimeout { .. }));
    assert!(fixture.outputs()?.is_empty());
    assert!(fixture.temp_is_empty()?);
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_remux_without_output_is_invalid() -> Result<()> {
    let fixture = Fixture::new()?;
    let remux = write_script(&fixture.bin, "silent-ffmpeg", "exit 0\n")?;
    let config = fixture.config(&sidecar_download_tool(&fixture)?, &remux);
    let downloader = Downloader::new(config, Arc::new(MemorySink::new()));

    let request = Request::new("https://example.com/watch/1")?;
    let err = downloader.download(&request).await.unwrap_err();

    assert!(matches!(err, Error::RemuxOutputInvalid(_)));
    assert!(fixture.outputs()?.is_empty());
    assert!(fixture.temp_is_empty()?);
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_zero_byte_remux_output_is_removed() -> Result<()> {
    let fixture = Fixture::new()?;
    let remux = write_script(
        &fixture.bin,
        "empty-ffmpeg",
        "for a in \"$@\"; do last=\"$a\"; done\n: > \"$last\"\n",
    )?;
    let config = fixture.config(&sidecar_download_tool(&fixture)?, &remux);
    let downloader = Downloader::new(config, Arc::new(MemorySink::new()));

    let request = Request::new("https://example.com/watch/1")?;
    let err = downloader.download(&request).await.unwrap_err();

    assert!(matches!(err, Error::RemuxOutputInvalid(_)));
    assert!(fixture.outputs()?.is_empty());
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_remux_timeout_is_fatal() -> Result<()> {
    let fixture = Fixture::new()?;
    let remux = write_script(&fixture.bin, "slow-ffmpeg", "sleep 10\n")?;
    let mut config = fixture.config(&sidecar_download_tool(&fixture)?, &remux);
    config.remux_timeout = 1;
    let downloader = Downloader::new(config, Arc::new(MemorySink::new()));

    let request = Request::new("https://example.com/watch/1")?;
    let err = downloader.download(&request).await.unwrap_err();

    assert!(matches!(err, Error::RemuxTimeout(_)));
    assert!(fixture.temp_is_empty()?);
    Ok(())
}

fn imgur_config(server: &MockServer) -> Config {
    Config {
        auxiliary_url_forms: vec![
            format!("{}/gallery/{{id}}", server.base_url()),
            format!("{}/{{id}}", server.base_url()),
        ],
        ..Config::default()
    }
}

#[tokio::test]
async fn test_auxiliary_fetch_falls_back_to_second_form() -> Result<()> {
    let server = MockServer::start_async().await;
    let first = server
        .mock_async(|when, then| {
            when.method(GET).path("/gallery/Xy12AbC");
            then.status(200).body("<html><body>nothing here</body></html>");
        })
        .await;
    let second = server
        .mock_async(|when, then| {
            when.method(GET).path("/Xy12AbC");
            then.status(200).body(IMGUR_PAGE);
        })
        .await;

    let extractor = ImgurExtractor::new("Xy12AbC", &imgur_config(&server))?;
    let aux = extractor.fetch().await?;

    first.assert_async().await;
    second.assert_async().await;
    assert_eq!(aux.title.as_deref(), Some("Cat"));
    assert_eq!(aux.author.as_deref(), Some("catfan"));
    assert_eq!(aux.account_id.as_deref(), Some("4242"));
    Ok(())
}

#[tokio::test]
async fn test_auxiliary_fetch_fails_when_no_form_has_metadata() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET);
            then.status(404).body("");
        })
        .await;

    let extractor = ImgurExtractor::new("Xy12AbC", &imgur_config(&server))?;
    let err = extractor.fetch().await.unwrap_err();

    match err {
        Error::AuxiliaryFetch { id, tried } => {
            assert_eq!(id, "Xy12AbC");
            assert_eq!(tried.len(), 2);
        }
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn test_imgur_pipeline_uses_scraped_metadata() -> Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/gallery/Xy12AbC");
            then.status(200).body(IMGUR_PAGE);
        })
        .await;

    let fixture = Fixture::new()?;
    let mut config = fixture.config(&sidecar_download_tool(&fixture)?, &copying_remux_tool(&fixture)?);
    config.auxiliary_url_forms = imgur_config(&server).auxiliary_url_forms;
    let downloader = Downloader::new(config, Arc::new(MemorySink::new()));

    let request = Request::new("https://imgur.com/gallery/cute-cat-Xy12AbC")?;
    let produced = downloader.download(&request).await?;

    assert_eq!(produced, fixture.out.join("Cat - Xy12AbC.mkv"));
    let args = std::fs::read_to_string(fixture.remux_log())?;
    let args: Vec<&str> = args.lines().collect();
    assert!(args.contains(&"MTOOL_ID=Xy12AbC"));
    assert!(args.contains(&"IMGUR_DL_ID=abc123"));
    assert!(args.contains(&"ARTIST=catfan"));
    assert!(args.contains(&"DATE=20230405"));
    assert!(fixture.temp_is_empty()?);
    Ok(())
}
