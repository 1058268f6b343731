//! Decodes attached file handles into UTF-8 text.
//!
//! Each file is read independently. Results land in a pre-sized slot vector by
//! index, so completion order never changes which content belongs to which file.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt as _;
use futures::stream;
use tracing::{debug, warn};

use crate::errors::FileDecodeError;

/// Source of raw bytes for one attached file.
#[async_trait::async_trait]
pub trait ByteSource: Send + Sync {
    async fn read_bytes(&self) -> io::Result<Vec<u8>>;
}

/// Reads bytes from a path on disk.
#[derive(Debug, Clone)]
pub struct PathSource {
    path: PathBuf,
}

impl PathSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl ByteSource for PathSource {
    async fn read_bytes(&self) -> io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}

/// Bytes already held in memory.
#[derive(Debug, Clone)]
pub struct MemorySource {
    bytes: bytes::Bytes,
}

impl MemorySource {
    pub fn new(bytes: impl Into<bytes::Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }
}

#[async_trait::async_trait]
impl ByteSource for MemorySource {
    async fn read_bytes(&self) -> io::Result<Vec<u8>> {
        Ok(self.bytes.to_vec())
    }
}

/// An attached file: a display name, an optional declared media type, and a
/// byte source.
#[derive(Clone)]
pub struct FileHandle {
    name: String,
    media_type: Option<String>,
    source: Arc<dyn ByteSource>,
}

impl FileHandle {
    pub fn new(name: impl Into<String>, source: Arc<dyn ByteSource>) -> Self {
        Self {
            name: name.into(),
            media_type: None,
            source,
        }
    }

    /// Handle for a file on disk, named after its final path component.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::new(name, Arc::new(PathSource::new(path)))
    }

    /// Handle for in-memory bytes.
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<bytes::Bytes>) -> Self {
        Self::new(name, Arc::new(MemorySource::new(bytes)))
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    /// Reads the file and decodes it as UTF-8.
    ///
    /// Invalid sequences become U+FFFD and a leading byte order mark is
    /// dropped, so only a failed read is an error.
    pub async fn decode(&self) -> Result<String, FileDecodeError> {
        let bytes = self
            .source
            .read_bytes()
            .await
            .map_err(|e| FileDecodeError::Read {
                name: self.name.clone(),
                message: e.to_string(),
            })?;
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    event = "loader.lossy_decode",
                    domain = "loader",
                    file = self.name.as_str(),
                    valid_up_to = e.utf8_error().valid_up_to() as u64,
                    "invalid UTF-8 replaced"
                );
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };
        Ok(match text.strip_prefix('\u{feff}') {
            Some(rest) => rest.to_string(),
            None => text,
        })
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .finish_non_exhaustive()
    }
}

/// A file that failed to decode, by position in the file sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDecodeFailure {
    pub index: usize,
    pub error: FileDecodeError,
}

/// Output of one loader pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Decoded text, index-aligned with the input handles. Failed slots are empty.
    pub contents: Vec<String>,
    /// Per-file failures in index order.
    pub failures: Vec<FileDecodeFailure>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Concurrent, order-preserving file decoder.
#[derive(Debug, Clone)]
pub struct FileTextLoader {
    concurrency: usize,
}

impl Default for FileTextLoader {
    fn default() -> Self {
        Self::new(8)
    }
}

impl FileTextLoader {
    /// Creates a loader that decodes at most `concurrency` files at once.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub async fn load(&self, files: &[FileHandle]) -> LoadReport {
        let mut contents = vec![String::new(); files.len()];
        let mut failures = Vec::new();

        let mut decoded = stream::iter(files.iter().cloned().enumerate())
            .map(|(index, file)| async move { (index, file.decode().await) })
            .buffer_unordered(self.concurrency);

        while let Some((index, result)) = decoded.next().await {
            match result {
                Ok(text) => {
                    debug!(
                        event = "loader.file_decoded",
                        domain = "loader",
                        index = index as u64,
                        file = files[index].name(),
                        bytes = text.len() as u64
                    );
                    contents[index] = text;
                }
                Err(error) => {
                    warn!(
                        event = "loader.file_failed",
                        domain = "loader",
                        index = index as u64,
                        file = error.file_name(),
                        error = %error
                    );
                    failures.push(FileDecodeFailure { index, error });
                }
            }
        }
        failures.sort_by_key(|f| f.index);

        LoadReport { contents, failures }
    }
}
