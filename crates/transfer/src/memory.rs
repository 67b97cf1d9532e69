//! In-process transfer engine.
//!
//! Keeps every upload in memory keyed by fingerprint, so a second
//! `resume_or_create` with the same fingerprint continues from the stored
//! offset the way a TUS server would. Used by tests and the demo binary;
//! delays and failures can be injected to exercise the coordinator.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;
use tokio::sync::Mutex;
use tracing::debug;
use tusbridge_protocol::Context;

use crate::TransferError;
use crate::engine::{ChunkUploader, CreateRequest, EngineFuture, TransferEngine};
use crate::source::UploadReader;

/// Server-side view of one upload.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredUpload {
    pub url: String,
    pub fingerprint: String,
    pub data: Vec<u8>,
    pub size: Option<u64>,
    pub metadata: Context,
    pub headers: HashMap<String, String>,
    pub finished: bool,
}

impl StoredUpload {
    /// Bytes received so far.
    pub fn offset(&self) -> u64 {
        self.data.len() as u64
    }

    /// SHA-256 hex digest of the received bytes.
    pub fn checksum(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.data);
        hex::encode(hasher.finalize())
    }
}

#[derive(Default)]
struct Shared {
    uploads: Mutex<HashMap<String, StoredUpload>>,
    next_id: AtomicU64,
    active: AtomicUsize,
    peak: AtomicUsize,
}

/// Transfer engine backed by process memory.
#[derive(Clone, Default)]
pub struct MemoryEngine {
    shared: Arc<Shared>,
    chunk_delay: Option<Duration>,
    fail_at_chunk: Option<usize>,
    fail_finish: bool,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleeps for `delay` after every chunk.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }

    /// Fails the chunk send once an uploader has sent `chunks` chunks.
    pub fn with_failure_at_chunk(mut self, chunks: usize) -> Self {
        self.fail_at_chunk = Some(chunks);
        self
    }

    /// Makes every finalize call fail.
    pub fn with_finish_failure(mut self) -> Self {
        self.fail_finish = true;
        self
    }

    /// Returns the upload stored under `url`.
    pub async fn upload(&self, url: &str) -> Option<StoredUpload> {
        let uploads = self.shared.uploads.lock().await;
        uploads.values().find(|u| u.url == url).cloned()
    }

    /// Returns every stored upload.
    pub async fn uploads(&self) -> Vec<StoredUpload> {
        self.shared.uploads.lock().await.values().cloned().collect()
    }

    /// Number of uploaders currently alive.
    pub fn active(&self) -> usize {
        self.shared.active.load(Ordering::SeqCst)
    }

    /// Highest number of uploaders alive at the same time.
    pub fn peak_active(&self) -> usize {
        self.shared.peak.load(Ordering::SeqCst)
    }
}

impl TransferEngine for MemoryEngine {
    fn resume_or_create<'a>(
        &'a self,
        request: &'a CreateRequest,
        mut source: UploadReader,
    ) -> EngineFuture<'a, Box<dyn ChunkUploader>> {
        Box::pin(async move {
            if request.endpoint.trim().is_empty() {
                return Err(TransferError::Transfer("missing upload creation URL".into()));
            }

            let (url, offset) = {
                let mut uploads = self.shared.uploads.lock().await;
                match uploads.get(&request.fingerprint) {
                    Some(existing) => (existing.url.clone(), existing.offset()),
                    None => {
                        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                        let url = format!("{}/{id}", request.endpoint.trim_end_matches('/'));
                        uploads.insert(
                            request.fingerprint.clone(),
                            StoredUpload {
                                url: url.clone(),
                                fingerprint: request.fingerprint.clone(),
                                data: Vec::new(),
                                size: request.size,
                                metadata: request.metadata.clone(),
                                headers: request.headers.clone(),
                                finished: false,
                            },
                        );
                        (url, 0)
                    }
                }
            };

            if offset > 0 {
                let skipped =
                    tokio::io::copy(&mut (&mut source).take(offset), &mut tokio::io::sink())
                        .await?;
                if skipped < offset {
                    return Err(TransferError::Transfer(format!(
                        "source ended at {skipped} bytes, server offset is {offset}"
                    )));
                }
                debug!(url = %url, offset, "resuming stored upload");
            } else {
                debug!(url = %url, "created upload");
            }

            let active = self.shared.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.shared.peak.fetch_max(active, Ordering::SeqCst);

            Ok(Box::new(MemoryUploader {
                shared: Arc::clone(&self.shared),
                fingerprint: request.fingerprint.clone(),
                url,
                source,
                offset,
                chunk_size: crate::config::default_chunk_size(),
                chunks_sent: 0,
                chunk_delay: self.chunk_delay,
                fail_at_chunk: self.fail_at_chunk,
                fail_finish: self.fail_finish,
            }) as Box<dyn ChunkUploader>)
        })
    }
}

struct MemoryUploader {
    shared: Arc<Shared>,
    fingerprint: String,
    url: String,
    source: UploadReader,
    offset: u64,
    chunk_size: usize,
    chunks_sent: usize,
    chunk_delay: Option<Duration>,
    fail_at_chunk: Option<usize>,
    fail_finish: bool,
}

impl Drop for MemoryUploader {
    fn drop(&mut self) {
        self.shared.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ChunkUploader for MemoryUploader {
    fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size = size.max(1);
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn offset(&self) -> u64 {
        self.offset
    }

    fn upload_url(&self) -> &str {
        &self.url
    }

    fn upload_chunk(&mut self) -> EngineFuture<'_, Option<usize>> {
        Box::pin(async move {
            if self.fail_at_chunk == Some(self.chunks_sent) {
                return Err(TransferError::Transfer(format!(
                    "simulated network failure after {} chunks",
                    self.chunks_sent
                )));
            }

            let mut buf = vec![0u8; self.chunk_size];
            let mut filled = 0;
            while filled < buf.len() {
                let n = self.source.read(&mut buf[filled..]).await?;
                if n == 0 {
                    break;
                }
                filled += n;
            }
            if filled == 0 {
                return Ok(None);
            }
            buf.truncate(filled);

            {
                let mut uploads = self.shared.uploads.lock().await;
                let stored = uploads.get_mut(&self.fingerprint).ok_or_else(|| {
                    TransferError::Transfer(format!("upload {} no longer exists", self.url))
                })?;
                if stored.finished {
                    return Err(TransferError::Transfer(format!(
                        "upload {} is already finished",
                        self.url
                    )));
                }
                stored.data.extend_from_slice(&buf);
            }

            self.offset += filled as u64;
            self.chunks_sent += 1;

            if let Some(delay) = self.chunk_delay {
                tokio::time::sleep(delay).await;
            }
            Ok(Some(filled))
        })
    }

    fn finish(&mut self) -> EngineFuture<'_, ()> {
        Box::pin(async move {
            if self.fail_finish {
                return Err(TransferError::Finalize(format!(
                    "server rejected finalize for {}",
                    self.url
                )));
            }
            let mut uploads = self.shared.uploads.lock().await;
            if let Some(stored) = uploads.get_mut(&self.fingerprint) {
                stored.finished = true;
            }
            Ok(())
        })
    }
}
