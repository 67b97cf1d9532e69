//! Upload sources and URI resolution.

use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use tokio::io::AsyncRead;
use tusbridge_protocol::constants::UNKNOWN_FILENAME;

use crate::TransferError;
use crate::engine::EngineFuture;

/// Byte stream handed to the transfer engine.
pub type UploadReader = Box<dyn AsyncRead + Send + Unpin>;

/// A readable source plus what is known about it up front.
pub struct UploadSource {
    pub reader: UploadReader,
    /// Total length, if the provider could report it before the first read.
    pub len: Option<u64>,
    /// Name used for the `filename` metadata entry and the fingerprint.
    pub display_name: String,
}

impl fmt::Debug for UploadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadSource")
            .field("len", &self.len)
            .field("display_name", &self.display_name)
            .finish_non_exhaustive()
    }
}

impl UploadSource {
    /// Wraps an arbitrary reader.
    pub fn from_reader(
        display_name: impl Into<String>,
        reader: impl AsyncRead + Send + Unpin + 'static,
        len: Option<u64>,
    ) -> Self {
        Self {
            reader: Box::new(reader),
            len,
            display_name: display_name.into(),
        }
    }

    /// In-memory source of known length.
    pub fn from_bytes(display_name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let data = data.into();
        let len = data.len() as u64;
        Self::from_reader(display_name, Cursor::new(data), Some(len))
    }

    /// Opens a file. A size that cannot be read is not fatal.
    pub async fn open_file(path: &Path) -> Result<Self, TransferError> {
        let file = tokio::fs::File::open(path).await.map_err(|e| {
            TransferError::Stream(format!(
                "Unable to open file stream for {}: {e}",
                path.display()
            ))
        })?;

        let len = match file.metadata().await {
            Ok(meta) if meta.is_file() => Some(meta.len()),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to determine source size, proceeding without size"
                );
                None
            }
        };

        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| UNKNOWN_FILENAME.to_string());

        Ok(Self::from_reader(display_name, file, len))
    }
}

/// Turns a caller-supplied URI into an open source.
pub trait SourceResolver: Send + Sync {
    fn resolve<'a>(&'a self, uri: &'a str) -> EngineFuture<'a, UploadSource>;
}

/// Resolves `file://` URIs and plain filesystem paths.
///
/// Relative paths are joined onto `base_dir` when one is set.
#[derive(Debug, Clone, Default)]
pub struct FileSourceResolver {
    base_dir: Option<PathBuf>,
}

impl FileSourceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    /// Maps a URI to a local path without touching the filesystem.
    pub fn to_path(&self, uri: &str) -> Result<PathBuf, TransferError> {
        let raw = uri.trim();
        if raw.is_empty() {
            return Err(TransferError::InvalidArgument(
                "The 'uri' provided is null or empty.".into(),
            ));
        }

        let path_str = match raw.strip_prefix("file://") {
            // file://localhost/tmp/a and file:///tmp/a both name /tmp/a.
            Some(rest) => rest.strip_prefix("localhost").unwrap_or(rest),
            None if raw.contains("://") => {
                return Err(TransferError::InvalidArgument(format!(
                    "The 'uri' could not be parsed: unsupported scheme in {raw}"
                )));
            }
            None => raw,
        };

        if path_str.is_empty() {
            return Err(TransferError::InvalidArgument(format!(
                "The 'uri' could not be parsed: {raw}"
            )));
        }

        let path = PathBuf::from(path_str);
        match &self.base_dir {
            Some(base) if path.is_relative() => Ok(base.join(path)),
            _ => Ok(path),
        }
    }
}

impl SourceResolver for FileSourceResolver {
    fn resolve<'a>(&'a self, uri: &'a str) -> EngineFuture<'a, UploadSource> {
        Box::pin(async move {
            let path = self.to_path(uri)?;
            UploadSource::open_file(&path).await
        })
    }
}
