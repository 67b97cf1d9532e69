//! Upload session coordinator.
//!
//! Tracks in-flight uploads by identifier, mediates pause/resume/abort
//! commands against background transfer loops, and turns engine state into
//! an ordered event stream. The chunked wire protocol itself is provided by a
//! [`TransferEngine`] implementation.

pub mod config;
mod engine;
pub mod events;
mod memory;
mod pool;
mod registry;
mod session;
mod source;

pub use config::{
    DEFAULT_CHUNK_SIZE, default_chunk_size, default_pool_size, reset_default_chunk_size,
    set_default_chunk_size,
};
pub use engine::{ChunkUploader, CreateRequest, EngineFuture, TransferEngine};
pub use events::{EventBus, EventSink, Subscription};
pub use memory::{MemoryEngine, StoredUpload};
pub use pool::WorkerPool;
pub use registry::{NewUpload, SessionRegistry};
pub use session::{SessionOptions, UploadSession};
pub use source::{FileSourceResolver, SourceResolver, UploadReader, UploadSource};

/// Errors produced by the coordinator.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("upload not found: {0}")]
    NotFound(String),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("transfer failed: {0}")]
    Transfer(String),

    #[error("finalize failed: {0}")]
    Finalize(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
