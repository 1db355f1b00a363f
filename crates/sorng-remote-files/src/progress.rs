// ──────────────────────────────────────────────────────────────────────────────
// sorng-remote-files · progress
// ──────────────────────────────────────────────────────────────────────────────
// Upload progress as a single-consumer event stream:
//  • `ProgressSink`: handed to the transport, clonable into body streams
//  • `ProgressStream`: consumed by the caller
// Percentages are non-decreasing; the stream ends with `Completed` or `Failed`
// and nothing is delivered after either.
// ──────────────────────────────────────────────────────────────────────────────

use crate::error::RemoteFsError;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// One event on an upload's progress channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    /// Percentage of bytes sent, 0..=100.
    Progress(u8),
    Completed,
    Failed(RemoteFsError),
}

/// Receiving half; yields events until the upload settles.
pub type ProgressStream = UnboundedReceiverStream<UploadEvent>;

/// Create a connected sink/stream pair for one upload.
pub fn progress_channel() -> (ProgressSink, ProgressStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sink = ProgressSink {
        inner: Some(Arc::new(SinkInner {
            tx,
            state: Mutex::new(SinkState::default()),
        })),
    };
    (sink, UnboundedReceiverStream::new(rx))
}

/// Sending half of an upload progress channel.
#[derive(Debug, Clone, Default)]
pub struct ProgressSink {
    inner: Option<Arc<SinkInner>>,
}

#[derive(Debug)]
struct SinkInner {
    tx: mpsc::UnboundedSender<UploadEvent>,
    state: Mutex<SinkState>,
}

#[derive(Debug, Default)]
struct SinkState {
    last: Option<u8>,
    finished: bool,
}

impl ProgressSink {
    /// A sink that drops every event.
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Report `loaded` of `total` bytes. Ignored when the total is unknown
    /// (zero), after the upload settled, or when it would go backwards.
    pub fn report(&self, loaded: u64, total: u64) {
        if total == 0 {
            return;
        }
        let pct = percent(loaded, total);
        self.emit_progress(pct);
    }

    /// Highest percentage delivered so far.
    pub fn last_percent(&self) -> Option<u8> {
        self.inner
            .as_ref()
            .and_then(|inner| lock(&inner.state).last)
    }

    pub(crate) fn complete(&self) {
        let Some(inner) = self.inner.as_ref() else {
            return;
        };
        let mut state = lock(&inner.state);
        if state.finished {
            return;
        }
        // Everything was accepted: a length-computable upload ends at 100.
        if matches!(state.last, Some(p) if p < 100) {
            state.last = Some(100);
            let _ = inner.tx.send(UploadEvent::Progress(100));
        }
        state.finished = true;
        let _ = inner.tx.send(UploadEvent::Completed);
    }

    pub(crate) fn fail(&self, err: &RemoteFsError) {
        let Some(inner) = self.inner.as_ref() else {
            return;
        };
        let mut state = lock(&inner.state);
        if state.finished {
            return;
        }
        state.finished = true;
        let _ = inner.tx.send(UploadEvent::Failed(err.clone()));
    }

    fn emit_progress(&self, pct: u8) {
        let Some(inner) = self.inner.as_ref() else {
            return;
        };
        let mut state = lock(&inner.state);
        if state.finished || matches!(state.last, Some(last) if last >= pct) {
            return;
        }
        state.last = Some(pct);
        // A dropped receiver just means nobody is listening.
        let _ = inner.tx.send(UploadEvent::Progress(pct));
    }
}

fn lock(state: &Mutex<SinkState>) -> std::sync::MutexGuard<'_, SinkState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Rounded percentage, clamped to 100.
pub fn percent(loaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let loaded = u128::from(loaded.min(total));
    let total = u128::from(total);
    ((loaded * 100 + total / 2) / total) as u8
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    async fn drain(stream: ProgressStream) -> Vec<UploadEvent> {
        stream.collect().await
    }

    #[test]
    fn percent_rounds_and_clamps() {
        assert_eq!(percent(0, 10), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(10, 10), 100);
        assert_eq!(percent(20, 10), 100);
        assert_eq!(percent(5, 0), 0);
        assert_eq!(percent(u64::MAX, u64::MAX), 100);
    }

    #[tokio::test]
    async fn events_are_non_decreasing_and_terminated() {
        let (sink, stream) = progress_channel();
        sink.report(50, 100);
        sink.report(20, 100);
        sink.report(50, 100);
        sink.report(100, 100);
        sink.complete();
        sink.report(100, 100);
        drop(sink);

        let events = drain(stream).await;
        assert_eq!(
            events,
            vec![
                UploadEvent::Progress(50),
                UploadEvent::Progress(100),
                UploadEvent::Completed
            ]
        );
    }

    #[tokio::test]
    async fn unknown_length_emits_no_progress() {
        let (sink, stream) = progress_channel();
        sink.report(10, 0);
        sink.complete();
        drop(sink);
        assert_eq!(drain(stream).await, vec![UploadEvent::Completed]);
    }

    #[tokio::test]
    async fn complete_tops_up_to_hundred() {
        let (sink, stream) = progress_channel();
        sink.report(99, 100);
        sink.complete();
        drop(sink);
        let events = drain(stream).await;
        assert_eq!(events[events.len() - 2], UploadEvent::Progress(100));
    }

    #[tokio::test]
    async fn nothing_after_failure() {
        let (sink, stream) = progress_channel();
        let clone = sink.clone();
        sink.report(30, 100);
        sink.fail(&RemoteFsError::from_status(507, "Insufficient Storage"));
        clone.report(90, 100);
        clone.complete();
        drop(sink);
        drop(clone);

        let events = drain(stream).await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], UploadEvent::Progress(30));
        match &events[1] {
            UploadEvent::Failed(err) => assert_eq!(err.status, Some(507)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn disabled_sink_is_silent() {
        let sink = ProgressSink::disabled();
        sink.report(1, 2);
        sink.complete();
        assert!(!sink.is_enabled());
        assert_eq!(sink.last_percent(), None);
    }
}
