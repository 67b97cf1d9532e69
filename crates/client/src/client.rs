use std::sync::Arc;

use tracing::{debug, info};
use tusbridge_protocol::{
    AbortResponse, EventKind, PauseResponse, ResumeResponse, SessionInfo, UploadIdRequest,
    UploadRequest, UploadResponse,
};
use tusbridge_transfer::{
    EventBus, FileSourceResolver, NewUpload, SessionRegistry, SourceResolver, Subscription,
    TransferEngine, set_default_chunk_size,
};

use crate::{ClientConfig, ClientError};

const PAUSED_MESSAGE: &str = "Upload paused successfully";
const RESUMED_MESSAGE: &str = "Upload resumed successfully";
const FINISHED_MESSAGE: &str = "Upload already finished";

/// Asynchronous upload API over a transfer engine.
///
/// Commands validate synchronously and return at once; transfer outcomes
/// arrive only as events on subscriptions from [`add_listener`](Self::add_listener).
pub struct TusClient {
    registry: SessionRegistry,
    bus: EventBus,
}

impl TusClient {
    /// Applies `config` and starts an empty coordinator.
    ///
    /// The configured chunk size becomes the process-wide default.
    pub fn new(
        engine: Arc<dyn TransferEngine>,
        resolver: Arc<dyn SourceResolver>,
        config: &ClientConfig,
    ) -> Result<Self, ClientError> {
        config.validate()?;
        set_default_chunk_size(config.default_chunk_size)?;

        let bus = EventBus::new();
        let registry = SessionRegistry::new(
            engine,
            resolver,
            Arc::new(bus.clone()),
            config.pool_size,
        );
        info!(
            pool_size = config.pool_size,
            chunk_size = config.default_chunk_size,
            "upload client ready"
        );
        Ok(Self { registry, bus })
    }

    /// Client reading local files.
    pub fn with_file_resolver(
        engine: Arc<dyn TransferEngine>,
        config: &ClientConfig,
    ) -> Result<Self, ClientError> {
        Self::new(engine, Arc::new(FileSourceResolver::new()), config)
    }

    /// Starts a new upload and returns its identifier.
    pub async fn upload(&self, request: UploadRequest) -> Result<UploadResponse, ClientError> {
        let chunk_size = match request.chunk_size {
            Some(n) if n > 0 => usize::try_from(n).ok(),
            Some(n) => {
                debug!(chunk_size = n, "ignoring non-positive chunk size");
                None
            }
            None => None,
        };

        let upload_id = self
            .registry
            .create(NewUpload {
                uri: request.uri,
                endpoint: request.endpoint,
                headers: request.headers,
                metadata: request.metadata,
                chunk_size,
            })
            .await?;
        Ok(UploadResponse { upload_id })
    }

    pub fn pause(&self, request: &UploadIdRequest) -> Result<PauseResponse, ClientError> {
        let id = upload_id(request)?;
        self.registry.pause(id)?;
        Ok(PauseResponse {
            success: true,
            message: PAUSED_MESSAGE.into(),
        })
    }

    pub fn resume(&self, request: &UploadIdRequest) -> Result<ResumeResponse, ClientError> {
        let id = upload_id(request)?;
        if self.registry.get(id)?.status().is_terminal() {
            return Ok(ResumeResponse {
                success: false,
                message: FINISHED_MESSAGE.into(),
            });
        }
        self.registry.resume(id)?;
        Ok(ResumeResponse {
            success: true,
            message: RESUMED_MESSAGE.into(),
        })
    }

    /// Stops the upload gracefully: the engine finalizes what was sent.
    pub async fn abort(&self, request: &UploadIdRequest) -> Result<AbortResponse, ClientError> {
        let id = upload_id(request)?;
        self.registry.abort(id).await?;
        Ok(AbortResponse::default())
    }

    pub fn status(&self, request: &UploadIdRequest) -> Result<SessionInfo, ClientError> {
        Ok(self.registry.info(upload_id(request)?)?)
    }

    /// Every known upload, terminal ones included until disposed.
    pub fn uploads(&self) -> Vec<SessionInfo> {
        self.registry.list()
    }

    /// Forgets a finished upload.
    pub fn dispose(&self, request: &UploadIdRequest) -> Result<SessionInfo, ClientError> {
        Ok(self.registry.dispose(upload_id(request)?)?)
    }

    pub fn dispose_finished(&self) -> usize {
        self.registry.dispose_finished()
    }

    pub fn add_listener(&self, kind: EventKind) -> Subscription {
        self.bus.subscribe(kind)
    }

    /// Subscribes by wire name (`"onProgress"` etc).
    pub fn add_listener_by_name(&self, name: &str) -> Result<Subscription, ClientError> {
        let kind: EventKind = name
            .parse()
            .map_err(|e: tusbridge_protocol::UnknownEventKind| {
                ClientError::InvalidArgument(e.to_string())
            })?;
        Ok(self.bus.subscribe(kind))
    }

    /// Subscribes to every event kind.
    pub fn events(&self) -> Subscription {
        self.bus.subscribe_all()
    }

    /// Aborts every live upload and waits for their workers.
    pub async fn shutdown(&self) {
        self.registry.shutdown().await;
    }
}

fn upload_id(request: &UploadIdRequest) -> Result<&str, ClientError> {
    let id = request.upload_id.trim();
    if id.is_empty() {
        return Err(ClientError::UnknownUpload(String::new()));
    }
    Ok(id)
}
