//! Process-wide transfer settings.
//!
//! The default chunk size is a single process-wide value. It is read once by
//! each session when its transfer starts, so changing it only affects
//! sessions that start afterwards.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::TransferError;

/// Default chunk size: 6 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 6 * 1024 * 1024;

static CHUNK_SIZE: AtomicUsize = AtomicUsize::new(DEFAULT_CHUNK_SIZE);

/// Returns the current process-wide default chunk size.
pub fn default_chunk_size() -> usize {
    CHUNK_SIZE.load(Ordering::Relaxed)
}

/// Replaces the process-wide default chunk size. Zero is rejected.
pub fn set_default_chunk_size(size: usize) -> Result<(), TransferError> {
    if size == 0 {
        return Err(TransferError::InvalidArgument(
            "chunk size must be positive".into(),
        ));
    }
    let previous = CHUNK_SIZE.swap(size, Ordering::Relaxed);
    if previous != size {
        tracing::debug!(previous, chunk_size = size, "default chunk size changed");
    }
    Ok(())
}

/// Restores [`DEFAULT_CHUNK_SIZE`].
pub fn reset_default_chunk_size() {
    CHUNK_SIZE.store(DEFAULT_CHUNK_SIZE, Ordering::Relaxed);
}

/// Number of concurrent transfers when no bound is configured:
/// one per available CPU.
pub fn default_pool_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
