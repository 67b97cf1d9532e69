//! Payload types exchanged between the upload coordinator and the host shell.
//!
//! Every type serializes to camelCase JSON so it can be handed to a
//! JavaScript bridge unchanged.

pub mod constants;
pub mod envelope;
pub mod events;
pub mod messages;
pub mod types;

// Re-export primary types for convenience.
pub use constants::{EventKind, UnknownEventKind};
pub use envelope::Rejection;
pub use events::{ErrorEvent, ProgressEvent, StartEvent, SuccessEvent, UploadEvent};
pub use messages::{
    AbortResponse, PauseResponse, ResumeResponse, UploadIdRequest, UploadRequest, UploadResponse,
};
pub use types::{Context, SessionInfo, SessionStatus};
