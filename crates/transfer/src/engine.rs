//! Transfer engine seam.
//!
//! The engine performs the actual chunked HTTP transfer (creation, PATCH,
//! offset negotiation) and persists whatever it needs to resume. The
//! coordinator only drives it through these two traits, which keeps the
//! session state machine testable with in-memory engines.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use tusbridge_protocol::Context;

use crate::TransferError;
use crate::source::UploadReader;

/// Boxed future returned by engine operations.
pub type EngineFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, TransferError>> + Send + 'a>>;

/// Parameters for creating or resuming a remote upload.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateRequest {
    /// Upload creation URL.
    pub endpoint: String,
    /// Extra request headers, sent with every request.
    pub headers: HashMap<String, String>,
    /// Metadata attached to the remote upload.
    pub metadata: Context,
    /// Stable key used to find resumable state.
    pub fingerprint: String,
    /// Total length of the source, if known.
    pub size: Option<u64>,
}

/// Creates or resumes remote uploads.
pub trait TransferEngine: Send + Sync {
    /// Resumes the upload matching `request.fingerprint`, or creates a new one.
    ///
    /// The returned uploader reads from `source`, skipping whatever the
    /// server already acknowledged.
    fn resume_or_create<'a>(
        &'a self,
        request: &'a CreateRequest,
        source: UploadReader,
    ) -> EngineFuture<'a, Box<dyn ChunkUploader>>;
}

/// Sends one upload's data chunk by chunk.
pub trait ChunkUploader: Send {
    fn set_chunk_size(&mut self, size: usize);

    fn chunk_size(&self) -> usize;

    /// Bytes acknowledged by the server so far.
    fn offset(&self) -> u64;

    /// URL of the remote upload resource.
    fn upload_url(&self) -> &str;

    /// Sends the next chunk. Returns `None` once the source is exhausted.
    fn upload_chunk(&mut self) -> EngineFuture<'_, Option<usize>>;

    /// Finalizes the upload. No chunks may be sent afterwards.
    fn finish(&mut self) -> EngineFuture<'_, ()>;
}
