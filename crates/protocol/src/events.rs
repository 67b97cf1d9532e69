//! Listener payloads.
//!
//! Every payload carries the `uploadId` it belongs to and the session's
//! metadata as `context`, since all uploads share one event stream.

use serde::{Deserialize, Serialize};

use crate::constants::EventKind;
use crate::types::Context;

/// Emitted once when a session's transfer loop begins, before any network call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartEvent {
    pub upload_id: String,
    pub context: Context,
}

/// Emitted before each chunk is sent.
///
/// `progress` is omitted when the total size of the source is unknown,
/// in which case `totalBytes` is `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub upload_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    pub bytes_uploaded: u64,
    pub total_bytes: Option<u64>,
    pub context: Context,
}

impl ProgressEvent {
    /// Builds a progress payload, deriving the percentage from the totals.
    pub fn new(
        upload_id: impl Into<String>,
        bytes_uploaded: u64,
        total_bytes: Option<u64>,
        context: Context,
    ) -> Self {
        Self {
            upload_id: upload_id.into(),
            progress: percentage(bytes_uploaded, total_bytes),
            bytes_uploaded,
            total_bytes,
            context,
        }
    }
}

/// Returns `uploaded / total * 100`, or `None` when the total is unknown.
///
/// A known total of zero bytes counts as complete.
pub fn percentage(uploaded: u64, total: Option<u64>) -> Option<f64> {
    match total {
        None => None,
        Some(0) => Some(100.0),
        Some(total) => Some(uploaded as f64 / total as f64 * 100.0),
    }
}

/// Emitted after the engine finalized the upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessEvent {
    pub upload_id: String,
    pub upload_url: String,
    pub context: Context,
}

/// Emitted when the transfer failed. Terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEvent {
    pub upload_id: String,
    pub error: String,
    pub context: Context,
}

/// Any listener event, tagged with its listener name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum UploadEvent {
    #[serde(rename = "onStart")]
    Start(StartEvent),
    #[serde(rename = "onProgress")]
    Progress(ProgressEvent),
    #[serde(rename = "onSuccess")]
    Success(SuccessEvent),
    #[serde(rename = "onError")]
    Error(ErrorEvent),
}

impl UploadEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            UploadEvent::Start(_) => EventKind::Start,
            UploadEvent::Progress(_) => EventKind::Progress,
            UploadEvent::Success(_) => EventKind::Success,
            UploadEvent::Error(_) => EventKind::Error,
        }
    }

    pub fn upload_id(&self) -> &str {
        match self {
            UploadEvent::Start(e) => &e.upload_id,
            UploadEvent::Progress(e) => &e.upload_id,
            UploadEvent::Success(e) => &e.upload_id,
            UploadEvent::Error(e) => &e.upload_id,
        }
    }

    pub fn context(&self) -> &Context {
        match self {
            UploadEvent::Start(e) => &e.context,
            UploadEvent::Progress(e) => &e.context,
            UploadEvent::Success(e) => &e.context,
            UploadEvent::Error(e) => &e.context,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.kind().is_terminal()
    }

    /// Serializes only the payload, as handed to a listener of [`kind`](Self::kind).
    pub fn payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            UploadEvent::Start(e) => serde_json::to_value(e),
            UploadEvent::Progress(e) => serde_json::to_value(e),
            UploadEvent::Success(e) => serde_json::to_value(e),
            UploadEvent::Error(e) => serde_json::to_value(e),
        }
    }
}
