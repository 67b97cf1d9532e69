//! Session registry: identifier → live session.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info};
use tusbridge_protocol::{Context, SessionInfo};

use crate::TransferError;
use crate::engine::TransferEngine;
use crate::events::EventSink;
use crate::pool::WorkerPool;
use crate::session::{SessionOptions, UploadSession};
use crate::source::SourceResolver;

/// Parameters for a new upload.
#[derive(Debug, Clone, Default)]
pub struct NewUpload {
    pub uri: String,
    pub endpoint: String,
    pub headers: HashMap<String, String>,
    pub metadata: Context,
    pub chunk_size: Option<usize>,
}

/// Owns every session and the pool that runs them.
///
/// Lookups and mutations are lock-free per entry, so commands for different
/// sessions never contend.
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<UploadSession>>,
    engine: Arc<dyn TransferEngine>,
    resolver: Arc<dyn SourceResolver>,
    sink: Arc<dyn EventSink>,
    pool: WorkerPool,
}

impl SessionRegistry {
    pub fn new(
        engine: Arc<dyn TransferEngine>,
        resolver: Arc<dyn SourceResolver>,
        sink: Arc<dyn EventSink>,
        pool_size: usize,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            engine,
            resolver,
            sink,
            pool: WorkerPool::new(pool_size),
        }
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Validates the request, opens the source, registers a session under a
    /// fresh identifier and submits it. Nothing is registered on failure.
    pub async fn create(&self, request: NewUpload) -> Result<String, TransferError> {
        if request.uri.trim().is_empty() {
            return Err(TransferError::InvalidArgument(
                "The 'uri' provided is null or empty.".into(),
            ));
        }
        if request.endpoint.trim().is_empty() {
            return Err(TransferError::InvalidArgument(
                "Missing endpoint in options.".into(),
            ));
        }
        if request.chunk_size == Some(0) {
            return Err(TransferError::InvalidArgument(
                "chunkSize must be positive".into(),
            ));
        }

        let source = self.resolver.resolve(&request.uri).await?;
        let id = uuid::Uuid::new_v4().to_string();
        let session = Arc::new(UploadSession::new(
            id.clone(),
            source,
            SessionOptions {
                endpoint: request.endpoint,
                headers: request.headers,
                metadata: request.metadata,
                chunk_size: request.chunk_size,
            },
            Arc::clone(&self.engine),
            Arc::clone(&self.sink),
        ));

        self.sessions.insert(id.clone(), Arc::clone(&session));
        if !self.pool.submit(session) {
            self.sessions.remove(&id);
            return Err(TransferError::InvalidArgument(
                "upload coordinator is shut down".into(),
            ));
        }
        info!(upload_id = %id, uri = %request.uri, "upload registered");
        Ok(id)
    }

    pub fn get(&self, id: &str) -> Result<Arc<UploadSession>, TransferError> {
        self.sessions
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| TransferError::NotFound(id.to_string()))
    }

    pub fn pause(&self, id: &str) -> Result<(), TransferError> {
        self.get(id)?.pause();
        Ok(())
    }

    /// Clears the pause flag and resubmits the session when no worker is
    /// driving it.
    pub fn resume(&self, id: &str) -> Result<(), TransferError> {
        let session = self.get(id)?;
        session.resume();
        if !session.status().is_terminal() && !session.is_executing() && !session.is_scheduled() {
            debug!(upload_id = %id, "resubmitting idle session");
            self.pool.submit(session);
        }
        Ok(())
    }

    pub async fn abort(&self, id: &str) -> Result<(), TransferError> {
        let session = self.get(id)?;
        session.abort().await
    }

    pub fn info(&self, id: &str) -> Result<SessionInfo, TransferError> {
        Ok(self.get(id)?.info())
    }

    /// Snapshot of every registered session.
    pub fn list(&self) -> Vec<SessionInfo> {
        self.sessions.iter().map(|entry| entry.info()).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Removes a terminal session. Live sessions cannot be disposed.
    pub fn dispose(&self, id: &str) -> Result<SessionInfo, TransferError> {
        let info = self.info(id)?;
        if !info.status.is_terminal() {
            return Err(TransferError::InvalidArgument(format!(
                "upload {id} is still {}",
                info.status
            )));
        }
        self.sessions.remove(id);
        debug!(upload_id = %id, "session disposed");
        Ok(info)
    }

    /// Removes every terminal session. Returns how many were removed.
    pub fn dispose_finished(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| !s.status().is_terminal());
        before - self.sessions.len()
    }

    /// Aborts every live session and waits for the pool to drain.
    pub async fn shutdown(&self) {
        // Failed sessions keep their engine upload open for a later resume.
        let live: Vec<_> = self
            .sessions
            .iter()
            .filter(|entry| !entry.status().is_terminal())
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        info!(sessions = live.len(), "shutting down upload coordinator");

        for session in &live {
            if let Err(e) = session.abort().await {
                debug!(upload_id = %session.id(), error = %e, "abort during shutdown failed");
            }
        }
        self.pool.shutdown().await;
    }
}
