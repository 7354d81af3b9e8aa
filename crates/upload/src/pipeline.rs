//! Caller-facing upload operations.

use std::sync::Arc;

use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use vox_drive::DocumentStore;
use vox_protocol::{CreateSessionRequest, DriveItem, ResumableSession, Stage};
use vox_transfer::{ChunkReader, UploadTarget};

use crate::error::UploadError;
use crate::negotiator::SessionNegotiator;
use crate::resolver::FolderPathResolver;
use crate::sequencer::ChunkSequencer;
use crate::state::{UploadPhase, UploadState};
use crate::types::{UploadEvent, UploadOptions, UploadOutcome};

const DEFAULT_CATEGORY: &str = "videos";

/// Drives uploads into `project/stage/category` folders.
///
/// Each upload is one logical stream on the caller's task. Independent
/// uploads may share an `Uploader` and run concurrently; every call takes
/// its own [`CancellationToken`], so stopping one leaves the others running.
pub struct Uploader {
    store: Arc<dyn DocumentStore>,
    options: UploadOptions,
    events_tx: mpsc::Sender<UploadEvent>,
    events_rx: Option<mpsc::Receiver<UploadEvent>>,
}

impl Uploader {
    pub fn new(store: Arc<dyn DocumentStore>, options: UploadOptions) -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);
        Self {
            store,
            options,
            events_tx,
            events_rx: Some(events_rx),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<UploadEvent>> {
        self.events_rx.take()
    }

    pub fn options(&self) -> &UploadOptions {
        &self.options
    }

    /// Opens a resumable session for a file in `project/stage/videos`.
    pub async fn create_upload_session(
        &self,
        project_name: &str,
        stage: Stage,
        file_name: &str,
        file_size: Option<u64>,
    ) -> Result<ResumableSession, UploadError> {
        let request = CreateSessionRequest {
            project_name: project_name.to_string(),
            stage,
            file_name: file_name.to_string(),
            file_size,
            category: DEFAULT_CATEGORY.to_string(),
        };
        self.create_session_for(&request).await
    }

    /// Opens a resumable session for the destination named in `request`.
    pub async fn create_session_for(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<ResumableSession, UploadError> {
        let mut state = UploadState::new();
        let result = self.negotiate(request, &mut state).await;
        if result.is_err() {
            state.fail();
        }
        result
    }

    async fn negotiate(
        &self,
        request: &CreateSessionRequest,
        state: &mut UploadState,
    ) -> Result<ResumableSession, UploadError> {
        // An unknown size is validated as one byte; the store learns the
        // real size from the first Content-Range.
        let target = UploadTarget::new(
            destination(request),
            request.file_name.clone(),
            request.file_size.unwrap_or(1),
        )?;

        state.advance(UploadPhase::SessionRequested)?;
        let parent = FolderPathResolver::new(self.store.as_ref())
            .resolve(target.destination())
            .await?;
        self.emit(UploadEvent::Resolved {
            path: target.destination().join("/"),
        });
        let session = SessionNegotiator::new(self.store.as_ref(), self.options.conflict)
            .open(&parent, target.file_name(), request.file_size)
            .await?;
        state.advance(UploadPhase::SessionOpen)?;
        Ok(session)
    }

    /// Streams `total_size` bytes of `source` to an upload URL.
    ///
    /// The URL's expiry is unknown here, so failures are reported as chunk
    /// errors. Use [`upload_to_session`](Self::upload_to_session) when the
    /// session is at hand or the upload must be cancellable.
    pub async fn upload_chunks<R, F>(
        &self,
        upload_url: &str,
        source: R,
        total_size: u64,
        on_progress: F,
    ) -> Result<Option<DriveItem>, UploadError>
    where
        R: AsyncRead + Unpin,
        F: FnMut(u8),
    {
        let session = ResumableSession::without_expiry(upload_url);
        let cancel = CancellationToken::new();
        self.upload_to_session(&session, source, total_size, &cancel, on_progress)
            .await
    }

    /// Streams `total_size` bytes of `source` to an open session, stopping
    /// between chunks once `cancel` fires.
    pub async fn upload_to_session<R, F>(
        &self,
        session: &ResumableSession,
        source: R,
        total_size: u64,
        cancel: &CancellationToken,
        on_progress: F,
    ) -> Result<Option<DriveItem>, UploadError>
    where
        R: AsyncRead + Unpin,
        F: FnMut(u8),
    {
        let mut reader = ChunkReader::new(source, total_size, self.options.chunk_size);
        let mut state = UploadState::with_open_session();
        ChunkSequencer::new(self.store.as_ref(), cancel.clone())
            .transmit(session, &mut reader, &mut state, on_progress)
            .await
    }

    /// Runs resolve, negotiate and transmit for one file, emitting events.
    ///
    /// `cancel` belongs to this upload only. A token that already fired
    /// stops the upload before any folder or session is created.
    pub async fn upload<R>(
        &self,
        request: &CreateSessionRequest,
        source: R,
        total_size: u64,
        cancel: &CancellationToken,
    ) -> Result<UploadOutcome, UploadError>
    where
        R: AsyncRead + Unpin,
    {
        let path = UploadTarget::new(destination(request), request.file_name.clone(), total_size)
            .map(|target| target.display_path())
            .unwrap_or_else(|_| format!("{}/{}", destination(request).join("/"), request.file_name));
        let request = CreateSessionRequest {
            file_size: Some(total_size),
            ..request.clone()
        };

        let result = self
            .run_upload(&request, &path, source, total_size, cancel)
            .await;
        match &result {
            Ok(outcome) => {
                self.emit(UploadEvent::Completed { path: path.clone() });
                info!(path = %path, bytes = outcome.bytes, "upload completed");
            }
            Err(e) => {
                self.emit(UploadEvent::Failed {
                    path: path.clone(),
                    error: e.to_string(),
                });
                error!(path = %path, error = %e, "upload failed");
            }
        }
        result
    }

    async fn run_upload<R>(
        &self,
        request: &CreateSessionRequest,
        path: &str,
        source: R,
        total_size: u64,
        cancel: &CancellationToken,
    ) -> Result<UploadOutcome, UploadError>
    where
        R: AsyncRead + Unpin,
    {
        if cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }
        let mut state = UploadState::new();
        let session = match self.negotiate(request, &mut state).await {
            Ok(session) => session,
            Err(e) => {
                state.fail();
                return Err(e);
            }
        };
        self.emit(UploadEvent::SessionOpened {
            path: path.to_string(),
        });

        let mut reader = ChunkReader::new(source, total_size, self.options.chunk_size);
        let item = ChunkSequencer::new(self.store.as_ref(), cancel.clone())
            .transmit(&session, &mut reader, &mut state, |percent| {
                self.emit(UploadEvent::Progress {
                    path: path.to_string(),
                    percent,
                });
            })
            .await?;

        Ok(UploadOutcome {
            path: path.to_string(),
            bytes: total_size,
            item,
        })
    }

    /// Events are dropped when nobody drains the channel fast enough.
    fn emit(&self, event: UploadEvent) {
        let _ = self.events_tx.try_send(event);
    }
}

/// `[project, stage, category]` of a session request.
pub fn destination(request: &CreateSessionRequest) -> Vec<String> {
    vec![
        request.project_name.clone(),
        request.stage.as_str().to_string(),
        request.category.clone(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use vox_drive::{MemoryStore, StoreCall, StoreError};
    use vox_protocol::FolderHandle;
    use vox_transfer::TransferError;

    fn uploader(store: &Arc<MemoryStore>, chunk_size: u64) -> Uploader {
        let store: Arc<dyn DocumentStore> = store.clone();
        Uploader::new(
            store,
            UploadOptions {
                chunk_size,
                ..UploadOptions::default()
            },
        )
    }

    fn request(project: &str, stage: Stage, category: &str, file: &str) -> CreateSessionRequest {
        CreateSessionRequest {
            project_name: project.into(),
            stage,
            file_name: file.into(),
            file_size: None,
            category: category.into(),
        }
    }

    #[tokio::test]
    async fn session_defaults_to_videos_folder() {
        let store = Arc::new(MemoryStore::new());
        let session = uploader(&store, 4)
            .create_upload_session("p1", Stage::Stage1, "cut.mp4", Some(10))
            .await
            .unwrap();
        assert!(!session.upload_url.is_empty());

        let videos = store.seed_path(&["p1", "stage1", "videos"]);
        assert!(store.calls().contains(&StoreCall::CreateSession {
            parent: videos.id().into(),
            file_name: "cut.mp4".into(),
        }));
    }

    #[tokio::test]
    async fn session_in_existing_project() {
        let store = Arc::new(MemoryStore::new());
        store.seed_path(&["acme"]);
        let req = request("acme", Stage::Stage2, "voices", "take.wav");
        uploader(&store, 4).create_session_for(&req).await.unwrap();

        // Only stage2 and voices were created.
        assert_eq!(store.create_count(), 2);
        assert_eq!(store.folder_count(&FolderHandle::root(), "acme"), 1);
    }

    #[tokio::test]
    async fn validation_rejects_before_network() {
        let store = Arc::new(MemoryStore::new());
        let up = uploader(&store, 4);

        let err = up
            .create_upload_session("", Stage::Stage1, "cut.mp4", Some(1))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Invalid(TransferError::InvalidSegment(_))));

        let err = up
            .create_upload_session("p1", Stage::Stage1, "", Some(1))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Invalid(TransferError::InvalidFileName(_))));

        let err = up
            .create_upload_session("p1", Stage::Stage1, "cut.mp4", Some(0))
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Invalid(TransferError::EmptyFile)));

        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn create_then_upload_chunks() {
        let store = Arc::new(MemoryStore::new());
        let up = uploader(&store, 4);
        let data = b"0123456789".to_vec();
        let session = up
            .create_upload_session("p1", Stage::Stage4, "final.mp4", Some(10))
            .await
            .unwrap();

        let mut progress = Vec::new();
        let item = up
            .upload_chunks(&session.upload_url, data.as_slice(), 10, |p| progress.push(p))
            .await
            .unwrap();

        assert_eq!(item.unwrap().name, "final.mp4");
        assert_eq!(progress, vec![40, 80, 100]);
        assert_eq!(
            store.file_content(&["p1", "stage4", "videos", "final.mp4"]).unwrap(),
            data
        );
    }

    #[tokio::test]
    async fn upload_emits_events_in_order() {
        let store = Arc::new(MemoryStore::new());
        let mut up = uploader(&store, 4);
        let mut events = up.take_events().unwrap();
        let data = b"abcdefgh".to_vec();
        let req = request("p1", Stage::Stage1, "videos", "clip.mp4");

        let outcome = up
            .upload(&req, data.as_slice(), 8, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.path, "p1/stage1/videos/clip.mp4");
        assert_eq!(outcome.bytes, 8);
        drop(up);

        let mut seen = Vec::new();
        while let Some(event) = events.recv().await {
            seen.push(event);
        }
        let path = "p1/stage1/videos/clip.mp4".to_string();
        assert_eq!(
            seen,
            vec![
                UploadEvent::Resolved {
                    path: "p1/stage1/videos".into()
                },
                UploadEvent::SessionOpened { path: path.clone() },
                UploadEvent::Progress {
                    path: path.clone(),
                    percent: 50
                },
                UploadEvent::Progress {
                    path: path.clone(),
                    percent: 100
                },
                UploadEvent::Completed { path },
            ]
        );
    }

    #[tokio::test]
    async fn upload_failure_emits_failed() {
        let store = Arc::new(MemoryStore::new());
        store.fail_chunk(
            0,
            StoreError::Status {
                status: 500,
                code: "generalException".into(),
                message: "boom".into(),
            },
        );
        let mut up = uploader(&store, 4);
        let mut events = up.take_events().unwrap();
        let data = b"abcdefgh".to_vec();
        let req = request("p1", Stage::Stage1, "videos", "clip.mp4");

        let err = up
            .upload(&req, data.as_slice(), 8, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(store.put_ranges(), vec![(0, 4)]);
        drop(up);

        let mut last = None;
        while let Some(event) = events.recv().await {
            last = Some(event);
        }
        match last {
            Some(UploadEvent::Failed { error, .. }) => assert!(error.contains("boom")),
            other => panic!("unexpected last event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancelled_upload_touches_nothing() {
        let store = Arc::new(MemoryStore::new());
        let up = uploader(&store, 4);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let data = b"abcdefgh".to_vec();
        let req = request("p1", Stage::Stage1, "videos", "clip.mp4");

        let err = up.upload(&req, data.as_slice(), 8, &cancel).await.unwrap_err();
        assert!(matches!(err, UploadError::Cancelled));
        // No folders, no session, no chunks.
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn cancelling_one_upload_leaves_later_uploads_running() {
        let store = Arc::new(MemoryStore::new());
        let up = uploader(&store, 4);
        let data = b"abcdefgh".to_vec();

        let first = up
            .create_upload_session("p1", Stage::Stage1, "a.mp4", Some(8))
            .await
            .unwrap();
        let cancel = CancellationToken::new();
        let err = up
            .upload_to_session(&first, data.as_slice(), 8, &cancel, |_| cancel.cancel())
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::Cancelled));
        assert_eq!(store.put_ranges(), vec![(0, 4)]);

        let req = request("p1", Stage::Stage1, "videos", "b.mp4");
        let outcome = up
            .upload(&req, data.as_slice(), 8, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.path, "p1/stage1/videos/b.mp4");
        assert_eq!(store.put_ranges(), vec![(0, 4), (0, 4), (4, 8)]);
        assert_eq!(
            store.file_content(&["p1", "stage1", "videos", "b.mp4"]).unwrap(),
            data
        );
    }

    #[tokio::test]
    async fn concurrent_uploads_cancel_independently() {
        let store = Arc::new(MemoryStore::new());
        let up = uploader(&store, 4);
        let data = b"abcdefgh".to_vec();
        let stopped = CancellationToken::new();
        stopped.cancel();

        let a = request("p1", Stage::Stage1, "videos", "a.mp4");
        let b = request("p1", Stage::Stage1, "videos", "b.mp4");
        let running = CancellationToken::new();
        let (first, second) = tokio::join!(
            up.upload(&a, data.as_slice(), 8, &stopped),
            up.upload(&b, data.as_slice(), 8, &running),
        );

        assert!(matches!(first, Err(UploadError::Cancelled)));
        assert_eq!(second.unwrap().bytes, 8);
        assert!(store.file_content(&["p1", "stage1", "videos", "a.mp4"]).is_none());
    }

    #[tokio::test]
    async fn take_events_once() {
        let store = Arc::new(MemoryStore::new());
        let mut up = uploader(&store, 4);
        assert!(up.take_events().is_some());
        assert!(up.take_events().is_none());
    }

    #[test]
    fn destination_segments() {
        let req = request("acme", Stage::Stage3, "feedback", "notes.txt");
        assert_eq!(destination(&req), vec!["acme", "stage3", "feedback"]);
    }
}
