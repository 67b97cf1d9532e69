use tusbridge_protocol::Rejection;
use tusbridge_transfer::TransferError;

/// Errors returned to callers of [`TusClient`](crate::TusClient).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("Invalid or missing uploadId")]
    UnknownUpload(String),

    #[error("Unable to open file stream for the Uri. {0}")]
    Stream(String),

    #[error("Error aborting upload: {0}")]
    Abort(String),

    #[error("{0}")]
    Transfer(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Stable machine-readable code for the host bridge.
    pub fn code(&self) -> &'static str {
        match self {
            ClientError::InvalidArgument(_) => "INVALID_ARGUMENT",
            ClientError::UnknownUpload(_) => "NOT_FOUND",
            ClientError::Stream(_) => "STREAM_ERROR",
            ClientError::Abort(_) => "ABORT_FAILED",
            ClientError::Transfer(_) => "TRANSFER_ERROR",
            ClientError::Config(_) => "CONFIG_ERROR",
            ClientError::Io(_) => "IO_ERROR",
        }
    }

    pub fn to_rejection(&self) -> Rejection {
        Rejection::new(self.code(), self.to_string())
    }
}

impl From<TransferError> for ClientError {
    fn from(e: TransferError) -> Self {
        match e {
            TransferError::InvalidArgument(m) => ClientError::InvalidArgument(m),
            TransferError::NotFound(id) => ClientError::UnknownUpload(id),
            TransferError::Stream(m) => ClientError::Stream(m),
            TransferError::Finalize(m) => ClientError::Abort(m),
            TransferError::Transfer(m) => ClientError::Transfer(m),
            TransferError::Io(e) => ClientError::Io(e),
        }
    }
}

impl From<ClientError> for Rejection {
    fn from(e: ClientError) -> Self {
        e.to_rejection()
    }
}
