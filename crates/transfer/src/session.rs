//! Upload session state machine.
//!
//! One session wraps a single upload's lifecycle:
//!
//! ```text
//! Idle → Running ⇄ Paused → Finishing → {Succeeded, Failed}
//! ```
//!
//! Run state lives in a `watch` channel so that command handlers on other
//! tasks can flip `paused` / `should_finish` and wake the transfer loop
//! without polling. The loop only parks at chunk boundaries; a chunk that is
//! already in flight always completes first.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};
use tusbridge_protocol::constants::FILENAME_METADATA_KEY;
use tusbridge_protocol::{
    Context, ErrorEvent, ProgressEvent, SessionInfo, SessionStatus, StartEvent, SuccessEvent,
    UploadEvent,
};

use crate::TransferError;
use crate::engine::{ChunkUploader, CreateRequest, TransferEngine};
use crate::events::EventSink;
use crate::source::{UploadReader, UploadSource};

/// Caller-supplied settings for one upload.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub endpoint: String,
    pub headers: HashMap<String, String>,
    pub metadata: Context,
    /// Overrides the process-wide default when set.
    pub chunk_size: Option<usize>,
}

#[derive(Debug, Clone)]
struct RunState {
    status: SessionStatus,
    paused: bool,
    should_finish: bool,
    bytes_uploaded: u64,
    upload_url: Option<String>,
    error: Option<String>,
}

/// Where the session is in its use of the engine.
enum Transport {
    /// Source not yet handed to the engine.
    Pending(UploadReader),
    Ready(Box<dyn ChunkUploader>),
    Closed,
}

/// A single upload's lifecycle.
pub struct UploadSession {
    id: String,
    endpoint: String,
    headers: HashMap<String, String>,
    metadata: Context,
    fingerprint: String,
    total_bytes: Option<u64>,
    chunk_size: Option<usize>,
    transport: Mutex<Transport>,
    state: watch::Sender<RunState>,
    /// A worker is currently driving `run`.
    executing: AtomicBool,
    /// Submitted to the pool and not yet returned from `run`.
    scheduled: AtomicBool,
    started: AtomicBool,
    concluded: AtomicBool,
    engine: Arc<dyn TransferEngine>,
    sink: Arc<dyn EventSink>,
}

impl UploadSession {
    /// Builds an idle session.
    ///
    /// A `filename` metadata entry is injected from the source's display
    /// name unless the caller already supplied one.
    pub fn new(
        id: impl Into<String>,
        source: UploadSource,
        options: SessionOptions,
        engine: Arc<dyn TransferEngine>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let id = id.into();
        let mut metadata = options.metadata;
        metadata
            .entry(FILENAME_METADATA_KEY.to_string())
            .or_insert_with(|| source.display_name.clone());
        let fingerprint = format!("{}-{}", source.display_name, id);

        let (state, _) = watch::channel(RunState {
            status: SessionStatus::Idle,
            paused: false,
            should_finish: false,
            bytes_uploaded: 0,
            upload_url: None,
            error: None,
        });

        Self {
            id,
            endpoint: options.endpoint,
            headers: options.headers,
            metadata,
            fingerprint,
            total_bytes: source.len,
            chunk_size: options.chunk_size.filter(|n| *n > 0),
            transport: Mutex::new(Transport::Pending(source.reader)),
            state,
            executing: AtomicBool::new(false),
            scheduled: AtomicBool::new(false),
            started: AtomicBool::new(false),
            concluded: AtomicBool::new(false),
            engine,
            sink,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn metadata(&self) -> &Context {
        &self.metadata
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn total_bytes(&self) -> Option<u64> {
        self.total_bytes
    }

    pub fn status(&self) -> SessionStatus {
        self.state.borrow().status
    }

    pub fn is_paused(&self) -> bool {
        self.state.borrow().paused
    }

    /// `true` while a worker is driving the session and it is not paused.
    pub fn is_active(&self) -> bool {
        self.executing.load(Ordering::Acquire) && !self.is_paused()
    }

    pub fn is_executing(&self) -> bool {
        self.executing.load(Ordering::Acquire)
    }

    /// `true` from pool submission until `run` returns.
    pub fn is_scheduled(&self) -> bool {
        self.scheduled.load(Ordering::Acquire)
    }

    /// Claims the session for a pool submission. Returns `false` if it is
    /// already queued or executing.
    pub(crate) fn mark_scheduled(&self) -> bool {
        !self.scheduled.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn clear_scheduled(&self) {
        self.scheduled.store(false, Ordering::Release);
    }

    /// Point-in-time view for status queries.
    ///
    /// A pause requested before a worker picks the session up is reported as
    /// `status: idle, paused: true`. Once running, the loop parks at its first
    /// chunk boundary and the status becomes `paused`.
    pub fn info(&self) -> SessionInfo {
        let s = self.state.borrow();
        SessionInfo {
            upload_id: self.id.clone(),
            status: s.status,
            paused: s.paused,
            bytes_uploaded: s.bytes_uploaded,
            total_bytes: self.total_bytes,
            upload_url: s.upload_url.clone(),
            error: s.error.clone(),
            context: self.metadata.clone(),
        }
    }

    /// Requests a pause at the next chunk boundary. Idempotent.
    pub fn pause(&self) {
        let changed = self.state.send_if_modified(|s| {
            if s.status.is_terminal() || s.paused {
                return false;
            }
            s.paused = true;
            true
        });
        if changed {
            debug!(upload_id = %self.id, "upload paused");
        }
    }

    /// Clears the pause flag. A parked loop continues immediately; a session
    /// with no worker must be resubmitted by the caller.
    pub fn resume(&self) {
        let changed = self.state.send_if_modified(|s| {
            if !s.paused {
                return false;
            }
            s.paused = false;
            if s.status == SessionStatus::Paused {
                s.status = SessionStatus::Running;
            }
            true
        });
        if changed {
            debug!(upload_id = %self.id, "upload resumed");
        }
    }

    /// Requests graceful termination.
    ///
    /// While a worker drives the session this only sets the flag and returns;
    /// the loop stops before the next chunk and finalizes, emitting the
    /// terminal event itself. Otherwise an existing engine upload is
    /// finalized right here and a failure is returned to the caller.
    pub async fn abort(&self) -> Result<(), TransferError> {
        let concluded = self.concluded.load(Ordering::Acquire);
        if !concluded {
            self.state.send_modify(|s| s.should_finish = true);
        }

        if self.is_executing() {
            debug!(upload_id = %self.id, "abort requested, transfer loop will finish");
            return Ok(());
        }

        // A worker that grabs the transport first handles the flag itself.
        let Ok(mut transport) = self.transport.try_lock() else {
            return Ok(());
        };
        let Transport::Ready(uploader) = &mut *transport else {
            debug!(upload_id = %self.id, "abort requested with no open engine upload");
            return Ok(());
        };

        self.set_status(SessionStatus::Finishing);
        let result = uploader.finish().await;
        let url = uploader.upload_url().to_string();
        let offset = uploader.offset();
        *transport = Transport::Closed;
        drop(transport);

        self.state.send_modify(|s| s.bytes_uploaded = offset);
        // A session that already failed keeps its single terminal event.
        match result {
            Ok(()) => {
                info!(upload_id = %self.id, url = %url, "engine upload finalized on abort");
                if !concluded {
                    self.conclude(Ok(url));
                }
                Ok(())
            }
            Err(e) => {
                let message = error_message(&e);
                if !concluded {
                    self.conclude(Err(TransferError::Finalize(message.clone())));
                }
                Err(TransferError::Finalize(message))
            }
        }
    }

    /// Alias for [`abort`](Self::abort).
    pub async fn finish(&self) -> Result<(), TransferError> {
        self.abort().await
    }

    /// Drives the transfer loop to a terminal state.
    ///
    /// Emits `onStart` before any engine call, `onProgress` before every
    /// chunk, then exactly one of `onSuccess` / `onError`. Transfer failures
    /// never propagate out of here; they only travel as `onError`.
    pub async fn run(&self) {
        if self.concluded.load(Ordering::Acquire) {
            self.clear_scheduled();
            return;
        }
        if self.executing.swap(true, Ordering::AcqRel) {
            warn!(upload_id = %self.id, "session is already executing");
            return;
        }

        self.state.send_if_modified(|s| {
            if s.status.is_terminal() {
                return false;
            }
            s.status = if s.paused {
                SessionStatus::Paused
            } else {
                SessionStatus::Running
            };
            true
        });
        self.emit_start();
        info!(upload_id = %self.id, endpoint = %self.endpoint, "upload started");

        // A failed engine upload stays open so a later abort can finalize it.
        let outcome = self.transfer().await;
        self.conclude(outcome);

        self.executing.store(false, Ordering::Release);
        self.clear_scheduled();
    }

    async fn transfer(&self) -> Result<String, TransferError> {
        let mut transport = self.transport.lock().await;
        if self.concluded.load(Ordering::Acquire) {
            // Finalized by a synchronous abort while this worker was waiting.
            return Err(TransferError::Finalize("upload already finalized".into()));
        }
        let uploader = self.ensure_uploader(&mut transport).await?;

        let mut finishing = false;
        loop {
            if !self.wait_while_paused().await {
                finishing = true;
                break;
            }

            let offset = uploader.offset();
            self.state.send_modify(|s| s.bytes_uploaded = offset);
            self.emit(UploadEvent::Progress(ProgressEvent::new(
                self.id.clone(),
                offset,
                self.total_bytes,
                self.metadata.clone(),
            )));

            match uploader.upload_chunk().await? {
                Some(sent) => debug!(upload_id = %self.id, sent, "chunk sent"),
                None => break,
            }
        }

        if finishing {
            self.set_status(SessionStatus::Finishing);
            info!(upload_id = %self.id, offset = uploader.offset(), "finishing upload early");
        }

        let finished = uploader.finish().await;
        let url = uploader.upload_url().to_string();
        let offset = uploader.offset();
        self.state.send_modify(|s| s.bytes_uploaded = offset);
        *transport = Transport::Closed;
        finished?;
        Ok(url)
    }

    /// Hands the source to the engine on first use. The chunk size is read
    /// here, once per session.
    async fn ensure_uploader<'t>(
        &self,
        transport: &'t mut Transport,
    ) -> Result<&'t mut Box<dyn ChunkUploader>, TransferError> {
        match std::mem::replace(transport, Transport::Closed) {
            Transport::Pending(reader) => {
                let request = CreateRequest {
                    endpoint: self.endpoint.clone(),
                    headers: self.headers.clone(),
                    metadata: self.metadata.clone(),
                    fingerprint: self.fingerprint.clone(),
                    size: self.total_bytes,
                };
                let mut uploader = self.engine.resume_or_create(&request, reader).await?;
                let chunk_size = self
                    .chunk_size
                    .unwrap_or_else(crate::config::default_chunk_size);
                uploader.set_chunk_size(chunk_size);

                let url = uploader.upload_url().to_string();
                let offset = uploader.offset();
                debug!(upload_id = %self.id, url = %url, offset, chunk_size, "engine upload ready");
                self.state.send_modify(|s| {
                    s.upload_url = Some(url);
                    s.bytes_uploaded = offset;
                });
                *transport = Transport::Ready(uploader);
            }
            other => *transport = other,
        }

        match transport {
            Transport::Ready(uploader) => Ok(uploader),
            _ => Err(TransferError::Transfer("upload is already closed".into())),
        }
    }

    /// Parks while paused. Returns `false` when the loop should finish.
    async fn wait_while_paused(&self) -> bool {
        let mut rx = self.state.subscribe();
        let parked = self.state.send_if_modified(|s| {
            if s.paused && !s.should_finish && s.status == SessionStatus::Running {
                s.status = SessionStatus::Paused;
                return true;
            }
            false
        });
        if parked {
            debug!(upload_id = %self.id, "transfer loop parked");
        }

        let should_finish = match rx.wait_for(|s| !s.paused || s.should_finish).await {
            Ok(s) => s.should_finish,
            Err(_) => true,
        };

        if !should_finish {
            self.state.send_if_modified(|s| {
                if s.status == SessionStatus::Paused {
                    s.status = SessionStatus::Running;
                    return true;
                }
                false
            });
        }
        !should_finish
    }

    fn set_status(&self, status: SessionStatus) {
        self.state.send_if_modified(|s| {
            if s.status.is_terminal() || s.status == status {
                return false;
            }
            s.status = status;
            true
        });
    }

    fn emit_start(&self) {
        if self.started.swap(true, Ordering::AcqRel) {
            return;
        }
        self.emit(UploadEvent::Start(StartEvent {
            upload_id: self.id.clone(),
            context: self.metadata.clone(),
        }));
    }

    /// Records the terminal state and emits the terminal event, once.
    fn conclude(&self, outcome: Result<String, TransferError>) {
        if self.concluded.swap(true, Ordering::AcqRel) {
            return;
        }
        self.emit_start();

        match outcome {
            Ok(url) => {
                self.state.send_modify(|s| {
                    s.status = SessionStatus::Succeeded;
                    s.upload_url = Some(url.clone());
                });
                info!(upload_id = %self.id, url = %url, "upload finished");
                self.emit(UploadEvent::Success(SuccessEvent {
                    upload_id: self.id.clone(),
                    upload_url: url,
                    context: self.metadata.clone(),
                }));
            }
            Err(e) => {
                let message = error_message(&e);
                self.state.send_modify(|s| {
                    s.status = SessionStatus::Failed;
                    s.error = Some(message.clone());
                });
                warn!(upload_id = %self.id, error = %message, "upload failed");
                self.emit(UploadEvent::Error(ErrorEvent {
                    upload_id: self.id.clone(),
                    error: message,
                    context: self.metadata.clone(),
                }));
            }
        }
    }

    fn emit(&self, event: UploadEvent) {
        self.sink.emit(event);
    }
}

/// Message reported to listeners: the engine's own text without our prefix.
fn error_message(e: &TransferError) -> String {
    match e {
        TransferError::InvalidArgument(m)
        | TransferError::NotFound(m)
        | TransferError::Stream(m)
        | TransferError::Transfer(m)
        | TransferError::Finalize(m) => m.clone(),
        TransferError::Io(e) => e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventBus, Subscription};
    use crate::memory::MemoryEngine;
    use std::time::Duration;
    use tusbridge_protocol::EventKind;

    fn session(
        engine: &MemoryEngine,
        bus: &EventBus,
        data: Vec<u8>,
        chunk_size: usize,
    ) -> Arc<UploadSession> {
        Arc::new(UploadSession::new(
            "s1",
            UploadSource::from_bytes("clip.mp4", data),
            SessionOptions {
                endpoint: "memory://uploads".into(),
                chunk_size: Some(chunk_size),
                ..Default::default()
            },
            Arc::new(engine.clone()),
            Arc::new(bus.clone()),
        ))
    }

    async fn drain(sub: &mut Subscription) -> Vec<UploadEvent> {
        let mut events = Vec::new();
        while let Some(e) = sub.recv().await {
            let terminal = e.is_terminal();
            events.push(e);
            if terminal {
                break;
            }
        }
        events
    }

    fn kinds(events: &[UploadEvent]) -> Vec<EventKind> {
        events.iter().map(|e| e.kind()).collect()
    }

    #[test]
    fn new_session_is_idle_with_filename() {
        let engine = MemoryEngine::new();
        let bus = EventBus::new();
        let s = session(&engine, &bus, vec![0; 10], 4);
        assert_eq!(s.status(), SessionStatus::Idle);
        assert!(!s.is_active());
        assert_eq!(s.metadata()["filename"], "clip.mp4");
        assert_eq!(s.fingerprint(), "clip.mp4-s1");
        assert_eq!(s.total_bytes(), Some(10));
    }

    #[test]
    fn caller_filename_is_kept() {
        let engine = MemoryEngine::new();
        let s = UploadSession::new(
            "s2",
            UploadSource::from_bytes("raw.bin", vec![1]),
            SessionOptions {
                endpoint: "memory://uploads".into(),
                metadata: Context::from([("filename".to_string(), "custom.bin".to_string())]),
                ..Default::default()
            },
            Arc::new(engine),
            Arc::new(EventBus::new()),
        );
        assert_eq!(s.metadata()["filename"], "custom.bin");
    }

    #[tokio::test]
    async fn run_emits_ordered_events() {
        let engine = MemoryEngine::new();
        let bus = EventBus::new();
        let mut sub = bus.subscribe_all();
        let s = session(&engine, &bus, vec![5; 10], 4);

        s.run().await;
        let events = drain(&mut sub).await;

        // 0, 4, 8, 10 bytes: three chunks, then the empty read.
        assert_eq!(
            kinds(&events),
            vec![
                EventKind::Start,
                EventKind::Progress,
                EventKind::Progress,
                EventKind::Progress,
                EventKind::Progress,
                EventKind::Success,
            ]
        );
        let uploaded: Vec<u64> = events
            .iter()
            .filter_map(|e| match e {
                UploadEvent::Progress(p) => Some(p.bytes_uploaded),
                _ => None,
            })
            .collect();
        assert_eq!(uploaded, vec![0, 4, 8, 10]);

        assert_eq!(s.status(), SessionStatus::Succeeded);
        let info = s.info();
        assert_eq!(info.bytes_uploaded, 10);
        let url = info.upload_url.unwrap();
        let stored = engine.upload(&url).await.unwrap();
        assert!(stored.finished);
        assert_eq!(stored.data, vec![5; 10]);
    }

    #[tokio::test]
    async fn chunk_failure_emits_single_error() {
        let engine = MemoryEngine::new().with_failure_at_chunk(1);
        let bus = EventBus::new();
        let mut sub = bus.subscribe_all();
        let s = session(&engine, &bus, vec![1; 10], 4);

        s.run().await;
        let events = drain(&mut sub).await;
        assert_eq!(events.first().unwrap().kind(), EventKind::Start);
        let last = events.last().unwrap();
        assert_eq!(last.kind(), EventKind::Error);
        if let UploadEvent::Error(e) = last {
            assert!(e.error.contains("simulated network failure"));
        }
        assert!(!events.iter().any(|e| e.kind() == EventKind::Success));
        assert_eq!(s.status(), SessionStatus::Failed);
        assert!(s.info().error.is_some());
    }

    #[tokio::test]
    async fn finalize_failure_emits_error() {
        let engine = MemoryEngine::new().with_finish_failure();
        let bus = EventBus::new();
        let mut sub = bus.subscribe_all();
        let s = session(&engine, &bus, vec![1; 3], 4);

        s.run().await;
        let events = drain(&mut sub).await;
        assert_eq!(events.last().unwrap().kind(), EventKind::Error);
        assert_eq!(s.status(), SessionStatus::Failed);
    }

    #[tokio::test]
    async fn pause_parks_and_resume_continues() {
        let engine = MemoryEngine::new().with_chunk_delay(Duration::from_millis(5));
        let bus = EventBus::new();
        let mut sub = bus.subscribe_all();
        let s = session(&engine, &bus, vec![1; 40], 4);

        s.pause();
        assert!(s.is_paused());
        let worker = {
            let s = Arc::clone(&s);
            tokio::spawn(async move { s.run().await })
        };

        // Start is emitted, then the loop parks before the first chunk.
        assert_eq!(sub.recv().await.unwrap().kind(), EventKind::Start);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(sub.try_recv().is_none());
        assert_eq!(s.status(), SessionStatus::Paused);
        assert!(s.is_executing());
        assert!(!s.is_active());

        s.resume();
        worker.await.unwrap();
        let rest = drain(&mut sub).await;
        assert_eq!(rest.last().unwrap().kind(), EventKind::Success);
        assert!(!rest.iter().any(|e| e.kind() == EventKind::Start));
    }

    #[tokio::test]
    async fn abort_while_running_finishes_early() {
        let engine = MemoryEngine::new().with_chunk_delay(Duration::from_millis(20));
        let bus = EventBus::new();
        let mut sub = bus.subscribe_all();
        let s = session(&engine, &bus, vec![1; 400], 4);

        let worker = {
            let s = Arc::clone(&s);
            tokio::spawn(async move { s.run().await })
        };
        assert_eq!(sub.recv().await.unwrap().kind(), EventKind::Start);
        assert_eq!(sub.recv().await.unwrap().kind(), EventKind::Progress);

        s.abort().await.unwrap();
        worker.await.unwrap();

        let rest = drain(&mut sub).await;
        assert_eq!(rest.last().unwrap().kind(), EventKind::Success);
        let info = s.info();
        assert!(info.bytes_uploaded < 400);
        let stored = engine.upload(&info.upload_url.unwrap()).await.unwrap();
        assert!(stored.finished);
    }

    #[tokio::test]
    async fn abort_while_paused_wakes_loop() {
        let engine = MemoryEngine::new();
        let bus = EventBus::new();
        let mut sub = bus.subscribe_all();
        let s = session(&engine, &bus, vec![1; 40], 4);

        s.pause();
        let worker = {
            let s = Arc::clone(&s);
            tokio::spawn(async move { s.run().await })
        };
        assert_eq!(sub.recv().await.unwrap().kind(), EventKind::Start);

        s.abort().await.unwrap();
        worker.await.unwrap();
        let rest = drain(&mut sub).await;
        assert_eq!(kinds(&rest), vec![EventKind::Success]);
        assert_eq!(s.info().bytes_uploaded, 0);
    }

    #[tokio::test]
    async fn abort_before_run_stops_before_first_chunk() {
        let engine = MemoryEngine::new();
        let bus = EventBus::new();
        let mut sub = bus.subscribe_all();
        let s = session(&engine, &bus, vec![1; 40], 4);

        s.abort().await.unwrap();
        assert_eq!(s.status(), SessionStatus::Idle);

        s.run().await;
        let events = drain(&mut sub).await;
        assert_eq!(kinds(&events), vec![EventKind::Start, EventKind::Success]);
    }

    #[tokio::test]
    async fn terminal_session_ignores_commands() {
        let engine = MemoryEngine::new();
        let bus = EventBus::new();
        let mut sub = bus.subscribe_all();
        let s = session(&engine, &bus, vec![1; 4], 4);

        s.run().await;
        drain(&mut sub).await;

        s.pause();
        assert!(!s.is_paused());
        s.abort().await.unwrap();
        s.run().await;
        assert!(sub.try_recv().is_none());
        assert_eq!(s.status(), SessionStatus::Succeeded);
    }

    #[tokio::test]
    async fn abort_after_failure_finalizes_without_new_event() {
        let engine = MemoryEngine::new().with_failure_at_chunk(1);
        let bus = EventBus::new();
        let mut sub = bus.subscribe_all();
        let s = session(&engine, &bus, vec![1; 12], 4);

        s.run().await;
        let events = drain(&mut sub).await;
        assert_eq!(events.last().unwrap().kind(), EventKind::Error);
        let url = s.info().upload_url.unwrap();
        assert!(!engine.upload(&url).await.unwrap().finished);

        s.abort().await.unwrap();
        let stored = engine.upload(&url).await.unwrap();
        assert!(stored.finished);
        assert_eq!(stored.data, vec![1; 4]);
        assert!(sub.try_recv().is_none());
        assert_eq!(s.status(), SessionStatus::Failed);

        // Already closed now.
        s.abort().await.unwrap();
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn abort_after_failure_reports_finalize_error() {
        let engine = MemoryEngine::new()
            .with_failure_at_chunk(1)
            .with_finish_failure();
        let bus = EventBus::new();
        let mut sub = bus.subscribe_all();
        let s = session(&engine, &bus, vec![1; 12], 4);

        s.run().await;
        drain(&mut sub).await;

        let err = s.abort().await.unwrap_err();
        assert!(matches!(err, TransferError::Finalize(_)));
        assert!(err.to_string().contains("server rejected finalize"));
        assert!(sub.try_recv().is_none());
        assert_eq!(s.status(), SessionStatus::Failed);
    }

    #[tokio::test]
    async fn pause_before_start_is_reported_while_queued() {
        let engine = MemoryEngine::new();
        let bus = EventBus::new();
        let mut sub = bus.subscribe_all();
        let s = session(&engine, &bus, vec![1; 8], 4);

        s.pause();
        let info = s.info();
        assert_eq!(info.status, SessionStatus::Idle);
        assert!(info.paused);

        let worker = {
            let s = Arc::clone(&s);
            tokio::spawn(async move { s.run().await })
        };
        assert_eq!(sub.recv().await.unwrap().kind(), EventKind::Start);
        let info = s.info();
        assert_eq!(info.status, SessionStatus::Paused);
        assert!(info.paused);

        s.resume();
        worker.await.unwrap();
        assert_eq!(s.status(), SessionStatus::Succeeded);
    }

    #[tokio::test]
    async fn unknown_size_omits_percentage() {
        let engine = MemoryEngine::new();
        let bus = EventBus::new();
        let mut sub = bus.subscribe(EventKind::Progress);
        let s = Arc::new(UploadSession::new(
            "s3",
            UploadSource::from_reader("pipe", std::io::Cursor::new(vec![1u8; 6]), None),
            SessionOptions {
                endpoint: "memory://uploads".into(),
                chunk_size: Some(4),
                ..Default::default()
            },
            Arc::new(engine),
            Arc::new(bus.clone()),
        ));

        s.run().await;
        let UploadEvent::Progress(p) = sub.recv().await.unwrap() else {
            panic!("expected progress");
        };
        assert!(p.progress.is_none());
        assert!(p.total_bytes.is_none());
    }
}
