//! Remote tile source.
//!
//! This module is only available when the `download` feature is enabled.
//!
//! [`HttpSource`] fetches `base_url + address + suffix` with a blocking HTTP
//! client. Requests run on worker threads submitted through a shared
//! [`Reactor`], so every tile of a mosaic is in flight at once while promise
//! continuations stay on the pipeline thread.
//!
//! ```ignore
//! use std::rc::Rc;
//! use demgrid::{download::{DownloadConfig, HttpSource}, Reactor};
//!
//! let reactor = Rc::new(Reactor::new());
//! let source = HttpSource::new(
//!     DownloadConfig::new("https://example.com/srtm/").with_suffix(".zip"),
//!     Rc::clone(&reactor),
//! )?
//! .with_data_dir("/data/srtm");
//! ```

use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use flate2::read::GzDecoder;
use reqwest::blocking::Client;
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::error::{DemError, Result};
use crate::promise::Promise;
use crate::reactor::Reactor;
use crate::source::{map_file, TileBytes, TileSource};

/// Compression format of downloaded files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// Raw tile bytes.
    #[default]
    None,
    /// Gzip compressed (`.gz`).
    Gzip,
    /// ZIP archive holding the tile (`.zip`).
    Zip,
}

impl Compression {
    /// Detect compression format from a URL's extension.
    ///
    /// # Examples
    ///
    /// ```
    /// use demgrid::download::Compression;
    ///
    /// assert_eq!(Compression::from_url("https://x/N35E138.hgt.gz"), Compression::Gzip);
    /// assert_eq!(Compression::from_url("https://x/N35E138.hgt.ZIP"), Compression::Zip);
    /// assert_eq!(Compression::from_url("https://x/N35E138.hgt"), Compression::None);
    /// ```
    pub fn from_url(url: &str) -> Self {
        let lower = url.to_lowercase();
        if lower.ends_with(".gz") {
            Compression::Gzip
        } else if lower.ends_with(".zip") {
            Compression::Zip
        } else {
            Compression::None
        }
    }
}

/// Default timeout for HTTP requests (5 minutes for large SRTM1 files).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Where and how to download tiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadConfig {
    /// Prefix the tile address is appended to.
    pub base_url: String,
    /// Appended after the address, e.g. `.zip` for zipped mirrors.
    pub suffix: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Additional attempts after the first failure.
    pub max_retries: u32,
}

impl DownloadConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            suffix: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: 3,
        }
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set the maximum number of retries.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// URL of the tile at `address`.
    pub fn url_for(&self, address: &str) -> String {
        format!("{}{}{}", self.base_url, address, self.suffix)
    }
}

/// Downloads tiles over HTTP through a [`Reactor`].
///
/// With a data directory set, tiles already on disk are memory-mapped without
/// any request, and downloaded tiles are written there (decompressed) for
/// later runs.
pub struct HttpSource {
    client: Client,
    config: DownloadConfig,
    reactor: Rc<Reactor>,
    data_dir: Option<PathBuf>,
}

impl HttpSource {
    /// Create a source submitting its requests to `reactor`.
    ///
    /// # Errors
    ///
    /// Returns [`DemError::InvalidConfig`] if the HTTP client cannot be built
    /// (e.g. TLS initialization failure) or the base URL is empty.
    pub fn new(config: DownloadConfig, reactor: Rc<Reactor>) -> Result<Self> {
        if config.base_url.is_empty() {
            return Err(DemError::InvalidConfig {
                reason: "no download URL configured".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DemError::InvalidConfig {
                reason: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            config,
            reactor,
            data_dir: None,
        })
    }

    pub fn with_data_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.data_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn config(&self) -> &DownloadConfig {
        &self.config
    }
}

impl TileSource for HttpSource {
    fn fetch(&self, address: &str) -> Promise<TileBytes, DemError> {
        let dest = self.data_dir.as_ref().map(|dir| dir.join(address));
        if let Some(path) = dest.as_deref().filter(|p| p.is_file()) {
            return match map_file(path) {
                Ok(bytes) => Promise::resolved(bytes),
                Err(e) => Promise::rejected(DemError::fetch_failed(address, e)),
            };
        }

        let client = self.client.clone();
        let config = self.config.clone();
        let owned = address.to_string();
        self.reactor.submit(address, move || {
            let bytes = download_with_retries(&client, &config, &owned)?;
            if let Some(path) = dest {
                keep_copy(&path, &owned, &bytes);
            }
            Ok(bytes)
        })
    }
}

fn download_with_retries(
    client: &Client,
    config: &DownloadConfig,
    address: &str,
) -> Result<Vec<u8>> {
    let url = config.url_for(address);
    let mut last_error = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            std::thread::sleep(Duration::from_millis(500 * attempt as u64));
        }

        debug!(%url, attempt, "Downloading tile");
        match download(client, &url) {
            Ok(body) => return decompress(&body, Compression::from_url(&url), address),
            Err(reason) => {
                warn!(%url, attempt, %reason, "Tile download failed");
                last_error = Some(reason);
            }
        }
    }

    Err(DemError::fetch_failed(
        address,
        last_error.unwrap_or_else(|| "unknown error".to_string()),
    ))
}

fn download(client: &Client, url: &str) -> std::result::Result<Vec<u8>, String> {
    let response = client.get(url).send().map_err(|e| e.to_string())?;
    if !response.status().is_success() {
        return Err(format!("HTTP {}", response.status()));
    }
    let body = response.bytes().map_err(|e| e.to_string())?;
    Ok(body.to_vec())
}

/// Decompress a downloaded body according to its URL suffix.
pub(crate) fn decompress(body: &[u8], compression: Compression, address: &str) -> Result<Vec<u8>> {
    match compression {
        Compression::None => Ok(body.to_vec()),
        Compression::Gzip => {
            let mut data = Vec::new();
            GzDecoder::new(body).read_to_end(&mut data).map_err(|e| {
                DemError::fetch_failed(address, format!("failed to decompress gzip: {}", e))
            })?;
            Ok(data)
        }
        Compression::Zip => extract_from_zip(body, address),
    }
}

/// Take the archive entry named like the tile, else the first file entry.
fn extract_from_zip(body: &[u8], address: &str) -> Result<Vec<u8>> {
    let zip_error = |e: zip::result::ZipError| {
        DemError::fetch_failed(address, format!("failed to read ZIP archive: {}", e))
    };
    let mut archive = ZipArchive::new(Cursor::new(body)).map_err(zip_error)?;

    let wanted = address.rsplit('/').next().unwrap_or(address).to_lowercase();
    let mut chosen = None;
    for i in 0..archive.len() {
        let entry = archive.by_index(i).map_err(zip_error)?;
        if entry.is_dir() {
            continue;
        }
        if entry.name().to_lowercase().ends_with(&wanted) {
            chosen = Some(i);
            break;
        }
        chosen.get_or_insert(i);
    }

    let index =
        chosen.ok_or_else(|| DemError::fetch_failed(address, "no tile found in ZIP archive"))?;
    let mut entry = archive.by_index(index).map_err(zip_error)?;
    let mut contents = Vec::new();
    entry
        .read_to_end(&mut contents)
        .map_err(|e| DemError::fetch_failed(address, format!("failed to extract tile: {}", e)))?;
    Ok(contents)
}

/// Store a downloaded tile for later runs. A failed write is logged and
/// otherwise ignored; the caller still has the bytes.
fn keep_copy(path: &Path, address: &str, bytes: &[u8]) -> bool {
    match persist(path, bytes) {
        Ok(()) => {
            debug!(address, path = %path.display(), "Stored downloaded tile");
            true
        }
        Err(e) => {
            warn!(address, path = %path.display(), error = %e, "Failed to store downloaded tile");
            false
        }
    }
}

fn persist(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        for (name, data) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_keep_copy_writes_tile() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("srtm").join("N00E000.hgt");

        assert!(keep_copy(&path, "N00E000.hgt", &[1, 2, 3, 4]));
        assert_eq!(fs::read(&path).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_keep_copy_tolerates_unwritable_dir() {
        let temp_dir = TempDir::new().unwrap();
        // A regular file where the data directory should be.
        let blocker = temp_dir.path().join("data");
        fs::write(&blocker, b"not a directory").unwrap();
        let path = blocker.join("N00E000.hgt");

        assert!(persist(&path, &[1, 2]).is_err());
        assert!(!keep_copy(&path, "N00E000.hgt", &[1, 2]));
        assert!(!path.exists());
    }

    #[test]
    fn test_url_for() {
        let config = DownloadConfig::new("https://example.com/srtm/").with_suffix(".zip");
        assert_eq!(
            config.url_for("N35E138.hgt"),
            "https://example.com/srtm/N35E138.hgt.zip"
        );
        assert_eq!(Compression::from_url(&config.url_for("N35E138.hgt")), Compression::Zip);
    }

    #[test]
    fn test_download_config_builder() {
        let config = DownloadConfig::new("http://x/")
            .with_timeout(60)
            .with_max_retries(5);
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.max_retries, 5);
    }

    #[test]
    fn test_decompress_gzip() {
        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&[1, 2, 3, 4]).unwrap();
        let body = encoder.finish().unwrap();

        assert_eq!(decompress(&body, Compression::Gzip, "t").unwrap(), vec![1, 2, 3, 4]);
        assert!(decompress(&[0, 1, 2], Compression::Gzip, "t").is_err());
    }

    #[test]
    fn test_extract_matching_zip_entry() {
        let body = zip_bytes(&[("readme.txt", b"hello"), ("N35E138.hgt", &[7, 7])]);
        let data = decompress(&body, Compression::Zip, "srtm/N35E138.hgt").unwrap();
        assert_eq!(data, vec![7, 7]);
    }

    #[test]
    fn test_extract_falls_back_to_first_file() {
        let body = zip_bytes(&[("tile.bin", &[5, 6])]);
        assert_eq!(decompress(&body, Compression::Zip, "N00E000.hgt").unwrap(), vec![5, 6]);
    }

    #[test]
    fn test_empty_base_url_rejected() {
        let result = HttpSource::new(DownloadConfig::new(""), Rc::new(Reactor::new()));
        assert!(matches!(result, Err(DemError::InvalidConfig { .. })));
    }

    #[test]
    fn test_local_file_skips_request() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("N01E001.hgt"), [0u8, 9]).unwrap();

        let reactor = Rc::new(Reactor::new());
        let config = DownloadConfig::new("http://127.0.0.1:1/");
        let source = HttpSource::new(config, Rc::clone(&reactor))
            .unwrap()
            .with_data_dir(dir.path());

        let bytes = source.fetch("N01E001.hgt").settlement().unwrap().ok().unwrap();
        assert_eq!(&bytes[..], &[0, 9]);
        assert_eq!(reactor.in_flight(), 0);
    }

    #[test]
    fn test_unreachable_server_rejects() {
        let reactor = Rc::new(Reactor::new());
        let config = DownloadConfig::new("http://127.0.0.1:1/")
            .with_timeout(5)
            .with_max_retries(0);
        let source = HttpSource::new(config, Rc::clone(&reactor)).unwrap();

        let promise = source.fetch("N02E002.hgt");
        assert!(promise.is_pending());
        let outcome = reactor.run_until_settled(&promise).unwrap();
        assert!(matches!(
            outcome.err(),
            Some(DemError::TileFetchFailed { address, .. }) if address == "N02E002.hgt"
        ));
    }
}
