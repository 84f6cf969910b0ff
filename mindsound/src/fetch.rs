//! Downloads the shared-folder sounds into the local sounds directory
//!
//! Only sounds with an external-folder file id can be fetched. A sound whose
//! file already exists on disk is skipped unless `force` is set, and one
//! failed download never stops the others.

use crate::error::{Error, Result};
use crate::sound_id::SoundId;
use crate::sources::AudioSourceConfig;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// Default timeout for one download (30 seconds)
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 30;

/// Outcome of a fetch run, one entry per sound
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FetchReport {
    pub downloaded: Vec<SoundId>,
    pub skipped: Vec<SoundId>,
    /// No file id configured for the sound
    pub unconfigured: Vec<SoundId>,
    pub failed: Vec<(SoundId, String)>,
}

impl FetchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Sound downloader
#[derive(Debug, Clone)]
pub struct SoundFetcher {
    client: Client,
    sources: AudioSourceConfig,
    directory: PathBuf,
    force: bool,
}

impl SoundFetcher {
    pub fn new(sources: AudioSourceConfig, directory: impl Into<PathBuf>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT_SECS))
            .build()?;
        Ok(Self::with_client(client, sources, directory))
    }

    /// Create a fetcher with a custom reqwest::Client
    pub fn with_client(client: Client, sources: AudioSourceConfig, directory: impl Into<PathBuf>) -> Self {
        Self {
            client,
            sources,
            directory: directory.into(),
            force: false,
        }
    }

    /// Re-download files that already exist
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Local file a sound is written to: its bundled filename, or `{id}.mp3`
    pub fn destination(&self, id: SoundId) -> PathBuf {
        let name = self
            .sources
            .local
            .file_name(id)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{id}.mp3"));
        self.directory.join(name)
    }

    /// Fetches every sound of the catalogue
    pub async fn fetch_all(&self) -> Result<FetchReport> {
        fs::create_dir_all(&self.directory).await?;

        let mut report = FetchReport::default();
        for id in SoundId::ALL {
            let Some(url) = self.sources.external_folder.url(id) else {
                report.unconfigured.push(id);
                continue;
            };

            let destination = self.destination(id);
            if !self.force && fs::try_exists(&destination).await.unwrap_or(false) {
                info!(sound = %id, path = %destination.display(), "Already present, skipping");
                report.skipped.push(id);
                continue;
            }

            match self.download(&url, &destination).await {
                Ok(bytes) => {
                    info!(sound = %id, bytes, "Downloaded");
                    report.downloaded.push(id);
                }
                Err(e) => {
                    warn!(sound = %id, error = %e, "Download failed");
                    report.failed.push((id, e.to_string()));
                }
            }
        }

        Ok(report)
    }

    /// Streams `url` into `destination` through a `.part` file, removed
    /// again when the transfer fails
    async fn download(&self, url: &str, destination: &Path) -> Result<u64> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(Error::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let partial = partial_path(destination);
        let written = match write_body(response, &partial).await {
            Ok(written) => written,
            Err(e) => {
                fs::remove_file(&partial).await.ok();
                return Err(e);
            }
        };

        fs::rename(&partial, destination).await?;
        Ok(written)
    }
}

/// `rain.mp3` downloads into `rain.mp3.part`
fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    destination.with_file_name(name)
}

async fn write_body(mut response: reqwest::Response, partial: &Path) -> Result<u64> {
    let mut file = fs::File::create(partial).await?;
    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_destination_uses_local_name() {
        let sources = AudioSourceConfig::new().with_local_file(SoundId::Rain, "rain-loop.mp3");
        let fetcher = SoundFetcher::with_client(Client::new(), sources, "/tmp/sounds");

        assert_eq!(fetcher.destination(SoundId::Rain), PathBuf::from("/tmp/sounds/rain-loop.mp3"));
        assert_eq!(fetcher.destination(SoundId::Wind), PathBuf::from("/tmp/sounds/wind.mp3"));
    }

    #[test]
    fn test_partial_file_keeps_extension() {
        assert_eq!(
            partial_path(Path::new("/tmp/sounds/rain.mp3")),
            PathBuf::from("/tmp/sounds/rain.mp3.part")
        );
        assert_eq!(
            partial_path(Path::new("/tmp/sounds/Evening(chosic.com).mp3")),
            PathBuf::from("/tmp/sounds/Evening(chosic.com).mp3.part")
        );
    }

    /// Serves one response announcing more bytes than it sends, then hangs up
    async fn truncated_server() -> String {
        use tokio::io::AsyncReadExt;
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 4096\r\n\r\nonly a few bytes")
                .await
                .unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{addr}/rain.mp3")
    }

    #[tokio::test]
    async fn test_interrupted_download_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("rain.mp3");
        let client = Client::builder().no_proxy().build().unwrap();
        let fetcher = SoundFetcher::with_client(client, AudioSourceConfig::new(), dir.path());

        let url = truncated_server().await;
        assert!(fetcher.download(&url, &destination).await.is_err());

        assert!(!destination.exists());
        assert!(!dir.path().join("rain.mp3.part").exists());
    }

    #[tokio::test]
    async fn test_nothing_configured_touches_no_network() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = SoundFetcher::with_client(Client::new(), AudioSourceConfig::new(), dir.path());

        let report = fetcher.fetch_all().await.unwrap();
        assert_eq!(report.unconfigured.len(), SoundId::ALL.len());
        assert!(report.downloaded.is_empty());
        assert!(report.is_success());
    }

    #[tokio::test]
    async fn test_existing_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("rain.mp3"), b"already here").unwrap();

        let sources = AudioSourceConfig::new()
            .with_local_file(SoundId::Rain, "rain.mp3")
            .with_external_file(SoundId::Rain, "abc123");
        let fetcher = SoundFetcher::with_client(Client::new(), sources, dir.path());

        let report = fetcher.fetch_all().await.unwrap();
        assert_eq!(report.skipped, vec![SoundId::Rain]);
        assert!(report.failed.is_empty());
        assert_eq!(
            std::fs::read(dir.path().join("rain.mp3")).unwrap(),
            b"already here"
        );
    }
}
