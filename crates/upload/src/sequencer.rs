//! Ordered transmission of byte ranges to a resumable session.

use chrono::Utc;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use vox_drive::{DocumentStore, StoreError};
use vox_protocol::{ChunkAck, DriveItem, ResumableSession};
use vox_transfer::{ChunkReader, ProgressMeter, TransferError};

use crate::error::UploadError;
use crate::state::{UploadPhase, UploadState};

/// Streams a source to a resumable session one chunk at a time.
///
/// Chunks are strictly sequential: the next range is read only after the
/// store acknowledged the previous one. The first failure ends the upload.
/// Cancellation is observed between chunks; a PUT already sent runs to
/// its acknowledgment.
pub struct ChunkSequencer<'a> {
    store: &'a dyn DocumentStore,
    cancel: CancellationToken,
}

impl<'a> ChunkSequencer<'a> {
    pub fn new(store: &'a dyn DocumentStore, cancel: CancellationToken) -> Self {
        Self { store, cancel }
    }

    /// Transmits every chunk of `reader` to `session`.
    ///
    /// `on_progress` receives `floor(100 * acked / total)`, capped at 99,
    /// after each intermediate acknowledgment and 100 after the final one.
    /// Returns the item descriptor the store sent with the final
    /// acknowledgment.
    pub async fn transmit<R, F>(
        &self,
        session: &ResumableSession,
        reader: &mut ChunkReader<R>,
        state: &mut UploadState,
        on_progress: F,
    ) -> Result<Option<DriveItem>, UploadError>
    where
        R: AsyncRead + Unpin,
        F: FnMut(u8),
    {
        let result = self.run(session, reader, state, on_progress).await;
        if let Err(e) = &result {
            warn!(offset = reader.offset(), error = %e, "upload aborted");
            state.fail();
        }
        result
    }

    async fn run<R, F>(
        &self,
        session: &ResumableSession,
        reader: &mut ChunkReader<R>,
        state: &mut UploadState,
        mut on_progress: F,
    ) -> Result<Option<DriveItem>, UploadError>
    where
        R: AsyncRead + Unpin,
        F: FnMut(u8),
    {
        let total = reader.total_size();
        if total == 0 {
            return Err(TransferError::EmptyFile.into());
        }
        let mut meter = ProgressMeter::new(total);

        loop {
            self.check_cancelled()?;

            let Some(chunk) = reader.next_chunk().await? else {
                break;
            };
            let range = chunk.state;

            let ack = self
                .store
                .put_chunk(&session.upload_url, range, chunk.data)
                .await
                .map_err(|source| classify_failure(session, range.offset, source))?;

            match ack {
                ChunkAck::Accepted {
                    next_expected_ranges,
                } => {
                    if range.is_final() {
                        return Err(UploadError::Incomplete {
                            next_expected: next_expected_ranges,
                        });
                    }
                    state.advance(UploadPhase::Transmitting {
                        offset: range.end(),
                    })?;
                    let percent = meter.advance(range.end());
                    debug!(range = %range.content_range(), percent, "chunk accepted");
                    on_progress(percent);
                }
                ChunkAck::Completed { item } => {
                    if !range.is_final() {
                        return Err(UploadError::EarlyCompletion {
                            offset: range.end(),
                            total,
                        });
                    }
                    state.advance(UploadPhase::Transmitting {
                        offset: range.end(),
                    })?;
                    state.advance(UploadPhase::Completed)?;
                    debug!(range = %range.content_range(), "upload completed");
                    on_progress(meter.complete());
                    return Ok(item);
                }
            }
        }

        Err(UploadError::Incomplete {
            next_expected: vec![format!("{}-", reader.offset())],
        })
    }

    fn check_cancelled(&self) -> Result<(), UploadError> {
        if self.cancel.is_cancelled() {
            Err(UploadError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A failure once the session has expired is reported as expiry.
fn classify_failure(session: &ResumableSession, offset: u64, source: StoreError) -> UploadError {
    if session.is_expired_at(Utc::now()) {
        UploadError::SessionExpired {
            expired_at: session.expires_at,
            offset,
            source,
        }
    } else {
        UploadError::Chunk { offset, source }
    }
}
