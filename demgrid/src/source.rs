//! Byte-fetch collaborators.
//!
//! A [`TileSource`] turns a tile address into a promise of the tile's raw
//! bytes. The pipeline requests every tile of a mosaic at once and only cares
//! about when each promise settles, so a source may answer synchronously
//! (a local file) or later (a download completing through the
//! [`Reactor`](crate::Reactor)).

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memmap2::Mmap;
use zip::ZipArchive;

use crate::error::{DemError, Result};
use crate::promise::Promise;

/// Immutable tile bytes, cheap to clone and safe to share between threads.
#[derive(Clone)]
pub enum TileBytes {
    /// A read-only memory map of a tile file.
    Mapped(Arc<Mmap>),
    /// Bytes held in memory (downloads, archives, tests).
    Owned(Arc<[u8]>),
}

impl Deref for TileBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            TileBytes::Mapped(mmap) => mmap,
            TileBytes::Owned(bytes) => bytes,
        }
    }
}

impl AsRef<[u8]> for TileBytes {
    fn as_ref(&self) -> &[u8] {
        self
    }
}

impl From<Vec<u8>> for TileBytes {
    fn from(bytes: Vec<u8>) -> Self {
        TileBytes::Owned(bytes.into())
    }
}

impl From<&[u8]> for TileBytes {
    fn from(bytes: &[u8]) -> Self {
        TileBytes::Owned(bytes.into())
    }
}

impl fmt::Debug for TileBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            TileBytes::Mapped(_) => "Mapped",
            TileBytes::Owned(_) => "Owned",
        };
        f.debug_struct("TileBytes")
            .field("kind", &kind)
            .field("len", &self.len())
            .finish()
    }
}

/// Asynchronously fetches the raw bytes of a tile.
pub trait TileSource {
    /// Request the bytes stored at `address`.
    ///
    /// Failures reject with [`DemError::TileFetchFailed`].
    fn fetch(&self, address: &str) -> Promise<TileBytes, DemError>;
}

impl<F> TileSource for F
where
    F: Fn(&str) -> Promise<TileBytes, DemError>,
{
    fn fetch(&self, address: &str) -> Promise<TileBytes, DemError> {
        self(address)
    }
}

/// Reads tiles from a local directory.
///
/// Addresses are joined onto the root directory. A missing file falls back to
/// a sibling `<address>.zip` archive holding the tile. Files are memory-mapped
/// and the returned promise is already settled.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read a tile synchronously.
    pub fn read(&self, address: &str) -> Result<TileBytes> {
        let path = self.root.join(address);
        if path.is_file() {
            return map_file(&path).map_err(|e| DemError::fetch_failed(address, e));
        }

        let zip_path = zip_sibling(&path);
        if zip_path.is_file() {
            return read_from_zip(&zip_path, &path)
                .map_err(|reason| DemError::fetch_failed(address, reason));
        }

        Err(DemError::fetch_failed(
            address,
            format!("file not found: {}", path.display()),
        ))
    }

    /// Tile files in the root directory with the given extension.
    ///
    /// Zipped tiles (`<name><extension>.zip`) are listed under their unzipped
    /// name. The result is sorted and deduplicated.
    pub fn scan(&self, extension: &str) -> Vec<String> {
        let extension = extension.to_lowercase();
        let zipped = format!("{}.zip", extension);

        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        let mut names = BTreeSet::new();
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            let lower = name.to_lowercase();
            if lower.ends_with(&zipped) {
                names.insert(name[..name.len() - 4].to_string());
            } else if lower.ends_with(&extension) {
                names.insert(name);
            }
        }
        names.into_iter().collect()
    }
}

impl TileSource for DirectorySource {
    fn fetch(&self, address: &str) -> Promise<TileBytes, DemError> {
        match self.read(address) {
            Ok(bytes) => Promise::resolved(bytes),
            Err(e) => Promise::rejected(e),
        }
    }
}

/// Memory-map a file read-only.
pub(crate) fn map_file(path: &Path) -> std::io::Result<TileBytes> {
    let file = File::open(path)?;

    // SAFETY: the mapping is read-only and never exposed mutably. Tile files
    // are expected not to change while a mosaic is being assembled.
    let mmap = unsafe { Mmap::map(&file)? };
    Ok(TileBytes::Mapped(Arc::new(mmap)))
}

fn zip_sibling(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".zip");
    PathBuf::from(name)
}

/// Extract the tile entry from an archive.
///
/// The entry whose file name matches the tile is preferred; otherwise the
/// first entry with the tile's extension is used.
fn read_from_zip(zip_path: &Path, tile_path: &Path) -> std::result::Result<TileBytes, String> {
    let file = File::open(zip_path).map_err(|e| e.to_string())?;
    let mut archive = ZipArchive::new(file).map_err(|e| format!("invalid archive: {}", e))?;

    let wanted = tile_path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let extension = tile_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()));

    let mut fallback = None;
    for i in 0..archive.len() {
        let entry = archive.by_index(i).map_err(|e| e.to_string())?;
        let name = entry.name().to_lowercase();
        let base = name.rsplit('/').next().unwrap_or(&name);
        if base == wanted {
            fallback = Some(i);
            break;
        }
        if fallback.is_none() && extension.as_deref().is_some_and(|ext| base.ends_with(ext)) {
            fallback = Some(i);
        }
    }

    let index = fallback.ok_or_else(|| format!("no tile entry in {}", zip_path.display()))?;
    let mut entry = archive.by_index(index).map_err(|e| e.to_string())?;
    let mut contents = Vec::with_capacity(entry.size() as usize);
    entry
        .read_to_end(&mut contents)
        .map_err(|e| format!("failed to extract {}: {}", entry.name(), e))?;
    Ok(contents.into())
}

/// Serves tiles from memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    tiles: HashMap<String, TileBytes>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tile, replacing any previous bytes at the same address.
    pub fn insert(&mut self, address: impl Into<String>, bytes: impl Into<TileBytes>) {
        self.tiles.insert(address.into(), bytes.into());
    }

    pub fn with_tile(mut self, address: impl Into<String>, bytes: impl Into<TileBytes>) -> Self {
        self.insert(address, bytes);
        self
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

impl TileSource for MemorySource {
    fn fetch(&self, address: &str) -> Promise<TileBytes, DemError> {
        match self.tiles.get(address) {
            Some(bytes) => Promise::resolved(bytes.clone()),
            None => Promise::rejected(DemError::fetch_failed(address, "no such tile in memory")),
        }
    }
}
