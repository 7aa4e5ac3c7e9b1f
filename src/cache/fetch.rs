//! Remote source fetching
//!
//! [`Fetcher`] is the seam between the cache and the outside world. The
//! production [`SourceFetcher`] downloads HTTP(S) sources with `ureq` on the
//! blocking pool and copies `file://` sources locally. Both write into a
//! `.part` sibling and rename it over the destination once the transfer is
//! complete, so a file at the destination path is never a partial download.

use crate::cache::key::{CacheKey, SourceScheme};
use crate::config::schema::FetchConfig;
use crate::error::{StashError, StashResult};
use async_trait::async_trait;
use std::ffi::OsString;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::debug;

const COPY_BUFFER_BYTES: usize = 64 * 1024;

/// Downloads a source into a local file
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `key` into `dest`, replacing any existing file. Returns bytes written.
    async fn fetch(&self, key: &CacheKey, dest: &Path) -> StashResult<u64>;

    /// Human-readable name for logs
    fn name(&self) -> &'static str;
}

/// Path of the in-progress download for `dest`
pub(crate) fn partial_path(dest: &Path) -> PathBuf {
    let mut name: OsString = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

/// Fetcher for `http`, `https` and `file` sources
#[derive(Debug, Clone)]
pub struct SourceFetcher {
    agent: ureq::Agent,
    timeout: Duration,
    user_agent: String,
}

impl SourceFetcher {
    /// Build a fetcher from the `[fetch]` config section
    pub fn new(config: &FetchConfig) -> Self {
        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();

        Self {
            agent,
            timeout,
            user_agent: config.user_agent.clone(),
        }
    }

    async fn fetch_http(&self, key: &CacheKey, part: &Path) -> StashResult<u64> {
        let agent = self.agent.clone();
        let url = key.as_str().to_string();
        let user_agent = self.user_agent.clone();
        let secs = self.timeout.as_secs();
        let part = part.to_path_buf();

        tokio::task::spawn_blocking(move || download_blocking(&agent, &url, &user_agent, secs, &part))
            .await
            .map_err(|e| StashError::Internal(format!("download task failed: {}", e)))?
    }

    async fn fetch_file(&self, key: &CacheKey, part: &Path) -> StashResult<u64> {
        let source = key
            .file_path()
            .ok_or_else(|| StashError::fetch(key.as_str(), "not a file:// source"))?;

        let meta = fs::metadata(&source)
            .await
            .map_err(|e| StashError::fetch(key.as_str(), format!("source not readable: {}", e)))?;
        if !meta.is_file() {
            return Err(StashError::fetch(key.as_str(), "source is not a regular file"));
        }

        fs::copy(&source, part).await.map_err(|e| {
            StashError::io(
                format!("copying {} to {}", source.display(), part.display()),
                e,
            )
        })
    }
}

#[async_trait]
impl Fetcher for SourceFetcher {
    async fn fetch(&self, key: &CacheKey, dest: &Path) -> StashResult<u64> {
        let part = partial_path(dest);

        let result = match key.scheme() {
            SourceScheme::Http | SourceScheme::Https => self.fetch_http(key, &part).await,
            SourceScheme::File => self.fetch_file(key, &part).await,
        };

        let bytes = match result {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = fs::remove_file(&part).await;
                return Err(e);
            }
        };

        fs::rename(&part, dest).await.map_err(|e| {
            StashError::io(
                format!("moving {} into place at {}", part.display(), dest.display()),
                e,
            )
        })?;

        debug!("Fetched {} ({} bytes) -> {}", key, bytes, dest.display());
        Ok(bytes)
    }

    fn name(&self) -> &'static str {
        "source"
    }
}

/// Stream an HTTP response body into `part`
fn download_blocking(
    agent: &ureq::Agent,
    url: &str,
    user_agent: &str,
    timeout_secs: u64,
    part: &Path,
) -> StashResult<u64> {
    let response = agent
        .get(url)
        .header("User-Agent", user_agent)
        .call()
        .map_err(|e| map_ureq_error(url, timeout_secs, e))?;

    let expected = response
        .headers()
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    let mut reader = response.into_body().into_reader();
    // File::create truncates whatever an earlier interrupted attempt left behind
    let mut file = File::create(part)
        .map_err(|e| StashError::io(format!("creating {}", part.display()), e))?;

    let mut buf = vec![0u8; COPY_BUFFER_BYTES];
    let mut written: u64 = 0;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                return Err(StashError::FetchTimeout {
                    url: url.to_string(),
                    secs: timeout_secs,
                })
            }
            Err(e) => return Err(StashError::fetch(url, format!("transfer interrupted: {}", e))),
        };
        file.write_all(&buf[..n])
            .map_err(|e| StashError::io(format!("writing {}", part.display()), e))?;
        written += n as u64;
    }

    file.sync_all()
        .map_err(|e| StashError::io(format!("flushing {}", part.display()), e))?;

    if let Some(expected) = expected {
        if expected != written {
            return Err(StashError::FetchTruncated {
                url: url.to_string(),
                expected,
                actual: written,
            });
        }
    }

    Ok(written)
}

fn map_ureq_error(url: &str, timeout_secs: u64, err: ureq::Error) -> StashError {
    match err {
        ureq::Error::StatusCode(status) => StashError::FetchStatus {
            url: url.to_string(),
            status,
        },
        ureq::Error::Timeout(_) => StashError::FetchTimeout {
            url: url.to_string(),
            secs: timeout_secs,
        },
        other => StashError::fetch(url, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fetcher() -> SourceFetcher {
        SourceFetcher::new(&FetchConfig::default())
    }

    #[test]
    fn partial_path_appends_suffix() {
        assert_eq!(
            partial_path(Path::new("/cache/image_0.jpg")),
            PathBuf::from("/cache/image_0.jpg.part")
        );
    }

    #[tokio::test]
    async fn fetch_file_source() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source.jpg");
        std::fs::write(&source, b"jpeg bytes").unwrap();
        let key = CacheKey::parse(&format!("file://{}", source.display())).unwrap();
        let dest = dir.path().join("image_0.jpg");

        let bytes = fetcher().fetch(&key, &dest).await.unwrap();

        assert_eq!(bytes, 10);
        assert_eq!(std::fs::read(&dest).unwrap(), b"jpeg bytes");
        assert!(!partial_path(&dest).exists());
    }

    #[tokio::test]
    async fn fetch_file_overwrites_stale_partial() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source.jpg");
        std::fs::write(&source, b"full").unwrap();
        let dest = dir.path().join("image_0.jpg");
        std::fs::write(partial_path(&dest), b"stale partial download").unwrap();
        let key = CacheKey::parse(&format!("file://{}", source.display())).unwrap();

        fetcher().fetch(&key, &dest).await.unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"full");
    }

    #[tokio::test]
    async fn fetch_missing_file_source_is_fetch_error() {
        let dir = TempDir::new().unwrap();
        let key = CacheKey::parse(&format!("file://{}/missing.jpg", dir.path().display())).unwrap();
        let dest = dir.path().join("image_0.jpg");

        let err = fetcher().fetch(&key, &dest).await.unwrap_err();

        assert_eq!(err.kind(), crate::error::ErrorKind::Fetch);
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn fetch_unreachable_http_is_fetch_error() {
        let dir = TempDir::new().unwrap();
        // Port 9 (discard) on localhost is closed in test environments
        let key = CacheKey::parse("http://127.0.0.1:9/image.jpg").unwrap();
        let dest = dir.path().join("image_0.jpg");

        let err = fetcher().fetch(&key, &dest).await.unwrap_err();

        assert_eq!(err.kind(), crate::error::ErrorKind::Fetch);
        assert!(!dest.exists());
        assert!(!partial_path(&dest).exists());
    }
}
