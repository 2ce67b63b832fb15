//! Durable storage for remote assets embedded in response content.
//!
//! Chat platforms hand out short-lived media URLs. Before a raw (unescaped)
//! respondent is stored, every `src="http…"` / `url="…"` attribute is
//! downloaded into the assets directory and rewritten to point at the copy.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::AssetsConfig;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to download {url}: {message}")]
    Download { url: String, message: String },
    #[error("failed to store asset: {0}")]
    Io(#[from] std::io::Error),
}

/// Rewrites content before it is stored.
#[async_trait]
pub trait ContentTransformer: Send + Sync {
    /// Whether the transformer can currently accept work.
    fn is_available(&self) -> bool;
    async fn transform(&self, content: &str) -> Result<String, AssetError>;
}

static ASSET_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(src|url)="(https?://[^"\s]+)""#).expect("asset attribute regex is valid")
});

/// Stores assets as content-addressed files in a local directory.
#[derive(Debug, Clone)]
pub struct LocalAssets {
    dir: PathBuf,
    base_url: Option<String>,
    timeout: Duration,
    max_bytes: u64,
}

impl LocalAssets {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            base_url: None,
            timeout: Duration::from_secs(30),
            max_bytes: 10 * 1024 * 1024,
        }
    }

    pub fn from_config(config: &AssetsConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            base_url: config.base_url.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            max_bytes: config.max_bytes,
        }
    }

    /// Public URL prefix for stored files. Without one, `file://` URLs are used.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = Some(base_url.trim_end_matches('/').to_string());
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, AssetError> {
        let owned_url = url.to_string();
        let timeout = self.timeout;
        let limit = self.max_bytes;
        let fetched = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, ureq::Error> {
            let agent: ureq::Agent = ureq::Agent::config_builder()
                .timeout_global(Some(timeout))
                .build()
                .into();
            agent
                .get(&owned_url)
                .call()?
                .into_body()
                .with_config()
                .limit(limit)
                .read_to_vec()
        })
        .await;
        match fetched {
            Ok(Ok(bytes)) => Ok(bytes),
            Ok(Err(e)) => Err(AssetError::Download {
                url: url.to_string(),
                message: e.to_string(),
            }),
            Err(e) => Err(AssetError::Download {
                url: url.to_string(),
                message: e.to_string(),
            }),
        }
    }

    /// Write `bytes` under their content hash and return the public location.
    async fn store(&self, url: &str, bytes: &[u8]) -> Result<String, AssetError> {
        let file_name = format!("{}{}", hex_digest(bytes), extension_of(url));
        let path = self.dir.join(&file_name);
        if tokio::fs::try_exists(&path).await? {
            tracing::debug!(file = %path.display(), "asset already stored");
        } else {
            tokio::fs::create_dir_all(&self.dir).await?;
            tokio::fs::write(&path, bytes).await?;
            tracing::info!(url, file = %path.display(), "asset stored");
        }
        Ok(match &self.base_url {
            Some(base) => format!("{base}/{file_name}"),
            None => format!("file://{}", std::path::absolute(&path)?.display()),
        })
    }
}

#[async_trait]
impl ContentTransformer for LocalAssets {
    fn is_available(&self) -> bool {
        self.dir.is_dir() || std::fs::create_dir_all(&self.dir).is_ok()
    }

    async fn transform(&self, content: &str) -> Result<String, AssetError> {
        let found: Vec<(std::ops::Range<usize>, &str, &str)> = ASSET_ATTR
            .captures_iter(content)
            .filter_map(|caps| {
                let (whole, attr, url) = (caps.get(0)?, caps.get(1)?, caps.get(2)?);
                Some((whole.range(), attr.as_str(), url.as_str()))
            })
            .collect();

        let mut output = String::with_capacity(content.len());
        let mut last = 0;
        for (range, attr, url) in found {
            let bytes = self.download(url).await?;
            let location = self.store(url, &bytes).await?;
            output.push_str(&content[last..range.start]);
            let _ = write!(output, "{attr}=\"{location}\"");
            last = range.end;
        }
        output.push_str(&content[last..]);
        Ok(output)
    }
}

fn hex_digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

/// File extension of the URL path, including the dot, if it looks like one.
fn extension_of(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let last_segment = path.rsplit('/').next().unwrap_or(path);
    match last_segment.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && !ext.is_empty()
                && ext.len() <= 5
                && ext.bytes().all(|b| b.is_ascii_alphanumeric()) =>
        {
            format!(".{}", ext.to_ascii_lowercase())
        }
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_from_url_path() {
        assert_eq!(extension_of("https://cdn.example/a/cat.PNG?size=2"), ".png");
        assert_eq!(extension_of("https://cdn.example/a/cat"), "");
        assert_eq!(extension_of("https://cdn.example/a/.hidden"), "");
        assert_eq!(extension_of("https://cdn.example/download.php#x"), ".php");
    }

    #[test]
    fn digest_is_stable_hex() {
        assert_eq!(
            hex_digest(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn attribute_regex_finds_remote_sources_only() {
        let content = r#"<img src="https://x.test/a.png"/><img src="file:///tmp/b.png"/><audio url="http://x.test/c.mp3"/>"#;
        let urls: Vec<&str> = ASSET_ATTR
            .captures_iter(content)
            .filter_map(|c| c.get(2).map(|m| m.as_str()))
            .collect();
        assert_eq!(urls, vec!["https://x.test/a.png", "http://x.test/c.mp3"]);
    }

    #[tokio::test]
    async fn content_without_assets_is_unchanged() {
        let dir = tempfile::tempdir().expect("tempdir");
        let assets = LocalAssets::new(dir.path().join("assets"));
        assert!(assets.is_available());
        let content = "<b>no remote media</b> src=\"relative.png\"";
        assert_eq!(assets.transform(content).await.expect("transform"), content);
    }

    #[tokio::test]
    async fn stores_bytes_under_content_hash() {
        let dir = tempfile::tempdir().expect("tempdir");
        let assets = LocalAssets::new(dir.path()).with_base_url("https://media.test/assets/");

        let location = assets
            .store("https://cdn.test/cat.png", b"abc")
            .await
            .expect("store");
        assert_eq!(
            location,
            "https://media.test/assets/ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad.png"
        );
        let stored = std::fs::read(
            dir.path()
                .join("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad.png"),
        )
        .expect("read stored asset");
        assert_eq!(stored, b"abc");

        // Second copy of the same bytes reuses the file.
        let again = assets.store("https://other.test/x.png", b"abc").await.expect("store");
        assert_eq!(again, location);
    }

    #[tokio::test]
    async fn unreachable_asset_fails_the_transform() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut assets = LocalAssets::new(dir.path());
        assets.timeout = Duration::from_secs(2);
        let result = assets
            .transform(r#"<img src="http://127.0.0.1:9/missing.png"/>"#)
            .await;
        assert!(matches!(result, Err(AssetError::Download { .. })));
    }
}
