//! Where raw reference files come from.
//!
//! Ingestion only sees the [`ByteSource`] trait. [`HttpSource`] downloads from
//! GeoNames with one reused client, [`DirSource`] serves an offline mirror and
//! [`MemorySource`] holds the files in memory.

use std::io::{Cursor, Read};
use std::path::PathBuf;

use rustc_hash::FxHashMap;

use crate::error::{GeocodeError, Result};

/// Fetches the raw bytes behind a URL.
pub trait ByteSource {
    /// Returns the complete content behind `url`.
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

impl<S: ByteSource + ?Sized> ByteSource for &S {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        (**self).fetch(url)
    }
}

/// Downloads over HTTP(S), reusing one connection pool for every file.
#[cfg(feature = "builder")]
pub struct HttpSource {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "builder")]
impl HttpSource {
    /// Creates a source with its own HTTP client.
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("revgeo/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[cfg(feature = "builder")]
impl ByteSource for HttpSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        log::info!("Downloading {url}");
        let response = self.client.get(url).send()?;

        if !response.status().is_success() {
            return Err(GeocodeError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let bytes = response.bytes()?;
        log::debug!("  {} bytes", bytes.len());
        Ok(bytes.to_vec())
    }
}

/// Serves files from a local directory by the last path segment of the URL,
/// so `https://download.geonames.org/export/dump/cities1000.zip` is read from
/// `<root>/cities1000.zip`.
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    /// Creates a source reading from `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ByteSource for DirSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let path = self.root.join(file_name(url));
        std::fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => GeocodeError::SourceNotFound(url.to_string()),
            _ => GeocodeError::io(path, e),
        })
    }
}

/// In-memory files keyed by URL.
#[derive(Default)]
pub struct MemorySource {
    files: FxHashMap<String, Vec<u8>>,
}

impl MemorySource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the bytes served for `url`.
    pub fn insert(&mut self, url: impl Into<String>, bytes: impl Into<Vec<u8>>) -> &mut Self {
        self.files.insert(url.into(), bytes.into());
        self
    }
}

impl ByteSource for MemorySource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.files
            .get(url)
            .cloned()
            .ok_or_else(|| GeocodeError::SourceNotFound(url.to_string()))
    }
}

fn file_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Returns `member` from a zip archive, or `bytes` unchanged when they are not
/// a zip archive.
pub fn unpack_member(bytes: Vec<u8>, member: &str) -> Result<Vec<u8>> {
    if !bytes.starts_with(ZIP_MAGIC) {
        return Ok(bytes);
    }

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut file = archive.by_name(member)?;
    let mut content = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut content)
        .map_err(|e| GeocodeError::io(member, e))?;
    Ok(content)
}
